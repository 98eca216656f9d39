use errinfo::{DeferredNameErrorMessage, MAX_RECEIVER_INSPECT, Message, OpaqueObject, Value};
use pretty_assertions::assert_eq;

const UNDEFINED: &str = "undefined local variable or method `%s' for %s";

fn render(receiver: Value) -> String {
    DeferredNameErrorMessage::new(UNDEFINED, receiver, Value::symbol("foo"))
        .render()
        .unwrap()
        .unwrap()
}

#[test]
fn receiver_descriptions() {
    assert_eq!(render(Value::Nil), "undefined local variable or method `foo' for nil:NilClass");
    assert_eq!(render(Value::True), "undefined local variable or method `foo' for true:TrueClass");
    assert_eq!(render(Value::Int(3)), "undefined local variable or method `foo' for 3:Integer");
    assert_eq!(
        render(Value::str("abc")),
        r#"undefined local variable or method `foo' for "abc":String"#
    );
}

#[test]
fn hash_prefixed_inspect_is_not_qualified() {
    let receiver = Value::Object(OpaqueObject::new("Point", Some("#<Point x=1>".to_owned())));
    assert_eq!(render(receiver), "undefined local variable or method `foo' for #<Point x=1>");
}

#[test]
fn failing_inspect_uses_generic_form() {
    let receiver = Value::Object(OpaqueObject::new("Broken", None));
    assert_eq!(render(receiver), "undefined local variable or method `foo' for #<Broken>");
}

#[test]
fn oversized_inspect_uses_generic_form() {
    let inspect = format!("[{}]", "1, ".repeat(MAX_RECEIVER_INSPECT));
    let receiver = Value::Object(OpaqueObject::new("Bag", Some(inspect)));
    assert_eq!(render(receiver), "undefined local variable or method `foo' for #<Bag>");
}

#[test]
fn rendering_is_repeatable_and_does_not_mutate() {
    let msg = DeferredNameErrorMessage::new(UNDEFINED, Value::Nil, Value::symbol("foo"));
    let before = msg.clone();
    assert_eq!(msg.render().unwrap(), msg.render().unwrap());
    assert_eq!(msg, before);
}

#[test]
fn structural_equality() {
    let a = DeferredNameErrorMessage::new(UNDEFINED, Value::Nil, Value::symbol("foo"));
    let b = DeferredNameErrorMessage::new(UNDEFINED, Value::Nil, Value::symbol("foo"));
    let c = DeferredNameErrorMessage::new(UNDEFINED, Value::Nil, Value::symbol("bar"));
    let d = DeferredNameErrorMessage::new(UNDEFINED, Value::False, Value::symbol("foo"));
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, d);
    assert_eq!(a.member(), &Value::symbol("foo"));
    assert_eq!(a.receiver(), &Value::Nil);
    assert_eq!(a.template(), &Value::str(UNDEFINED));
}

#[test]
fn missing_template_renders_nothing() {
    let msg = DeferredNameErrorMessage::new(Value::Nil, Value::Nil, Value::symbol("foo"));
    assert_eq!(msg.render().unwrap(), None);
    assert_eq!(Message::from(msg).render().unwrap(), None);
}

#[test]
fn dump_and_load_produce_the_rendered_string() {
    let msg = DeferredNameErrorMessage::new(UNDEFINED, Value::Nil, Value::symbol("foo"));
    let expected = "undefined local variable or method `foo' for nil:NilClass";

    assert_eq!(msg.dump().unwrap().as_deref(), Some(expected));

    let json = serde_json::to_string(&msg).unwrap();
    assert_eq!(json, format!("\"{expected}\""));
    let dumped: String = serde_json::from_str(&json).unwrap();
    assert_eq!(DeferredNameErrorMessage::load(dumped), expected);
}

#[test]
fn message_as_value_round_trips_the_lazy_form() {
    let msg = DeferredNameErrorMessage::new(UNDEFINED, Value::Nil, Value::symbol("foo"));
    let message = Message::from(msg.clone());
    assert_eq!(message.to_value(), Value::from(msg));
    assert_eq!(Message::from_value(message.to_value()), Some(message));
}
