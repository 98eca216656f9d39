use std::{io, sync::Arc, thread};

use errinfo::{
    BuiltinClass, Capability, ErrorLike, ErrorRuntime, NOERROR, SystemErrorRegistry, Taxonomy, Value,
    os_error::strerror,
};
use pretty_assertions::assert_eq;

/// An object outside the exception tree that exposes an errno.
struct Errnoish(Option<i32>);

impl ErrorLike for Errnoish {
    fn renders_message(&self) -> Capability<String> {
        Capability::Absent
    }

    fn renders_backtrace(&self) -> Capability<Option<Vec<String>>> {
        Capability::Absent
    }

    fn errno_field(&self) -> Capability<Option<i32>> {
        Capability::Present(self.0)
    }
}

#[cfg(unix)]
fn known(name: &str) -> Option<i32> {
    errinfo::known_errors().find_map(|(n, errno)| (n == name).then_some(errno)).flatten()
}

#[test]
fn lookup_is_idempotent_and_distinct() {
    let rt = ErrorRuntime::global();
    let errnos = [1, 2, 13, 5101, 5102];
    let classes: Vec<_> = errnos
        .iter()
        .map(|&errno| {
            let first = rt.errno_class(errno).unwrap();
            let second = rt.errno_class(errno).unwrap();
            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!(first.errno_constant(), Some(errno));
            first
        })
        .collect();

    for (i, a) in classes.iter().enumerate() {
        for b in &classes[i + 1..] {
            assert!(!Arc::ptr_eq(a, b), "{a} and {b} share a class");
        }
    }
}

#[test]
fn unknown_errno_gets_padded_name() {
    let rt = ErrorRuntime::global();
    let class = rt.errno_class(5103).unwrap();
    assert_eq!(class.name(), "Errno::E5103");
    assert!(class.is_kind_of_builtin(BuiltinClass::SystemCallError));
    assert!(Arc::ptr_eq(&rt.syserr().const_get("E5103").unwrap(), &class));
}

#[test]
fn noerror_entry() {
    let rt = ErrorRuntime::global();
    let noerror = rt.syserr().const_get(NOERROR).unwrap();
    assert_eq!(noerror.errno_constant(), Some(0));
    assert!(Arc::ptr_eq(&rt.errno_class(0).unwrap(), &noerror));
}

#[test]
fn generic_constructor_selects_errno_class() {
    let rt = ErrorRuntime::global();
    let generic = rt.class(BuiltinClass::SystemCallError);
    for errno in [2, 5104] {
        let err = rt
            .construct(&generic, &[Value::str("boom"), Value::Int(i64::from(errno))])
            .unwrap();
        assert!(Arc::ptr_eq(err.class(), &rt.errno_class(errno).unwrap()));
        assert_eq!(err.errno(), Some(errno));
        assert_eq!(err.render_message().unwrap(), format!("{} - boom", strerror(errno)));
    }
}

#[test]
fn lone_integer_is_the_errno() {
    let rt = ErrorRuntime::global();
    let err = rt
        .construct(&rt.class(BuiltinClass::SystemCallError), &[Value::Int(2)])
        .unwrap();
    assert_eq!(err.errno(), Some(2));
    assert_eq!(err.render_message().unwrap(), strerror(2));
}

#[test]
fn without_errno_the_class_stays_generic() {
    let rt = ErrorRuntime::global();
    let generic = rt.class(BuiltinClass::SystemCallError);
    let err = rt.construct(&generic, &[Value::str("x")]).unwrap();
    assert!(Arc::ptr_eq(err.class(), &generic));
    assert_eq!(err.errno(), None);
    assert_eq!(err.render_message().unwrap(), "unknown error - x");

    let err = rt.construct(&generic, &[Value::Nil, Value::Nil]).unwrap();
    assert_eq!(err.render_message().unwrap(), "unknown error");
}

#[test]
fn generic_constructor_arity() {
    let rt = ErrorRuntime::global();
    let err = rt
        .construct(&rt.class(BuiltinClass::SystemCallError), &[])
        .unwrap_err();
    assert!(err.is_exception_type(BuiltinClass::ArgumentError));
    assert_eq!(
        err.into_error().render_message().unwrap(),
        "wrong number of arguments (0 for 1..2)"
    );
}

#[test]
fn errno_must_be_an_integer() {
    let rt = ErrorRuntime::global();
    let err = rt
        .construct(
            &rt.class(BuiltinClass::SystemCallError),
            &[Value::str("x"), Value::str("2")],
        )
        .unwrap_err();
    assert!(err.is_exception_type(BuiltinClass::TypeError));
}

#[cfg(unix)]
#[test]
fn specific_class_uses_its_constant() {
    let rt = ErrorRuntime::global();
    let enoent_errno = known("ENOENT").unwrap();
    let enoent = rt.syserr().const_get("ENOENT").unwrap();
    assert_eq!(enoent.name(), "Errno::ENOENT");

    let err = rt.construct(&enoent, &[]).unwrap();
    assert_eq!(err.errno(), Some(enoent_errno));
    assert_eq!(err.render_message().unwrap(), strerror(enoent_errno));

    let err = rt.construct(&enoent, &[Value::str("/etc/missing")]).unwrap();
    assert_eq!(
        err.render_message().unwrap(),
        format!("{} - /etc/missing", strerror(enoent_errno))
    );

    let err = rt.construct(&enoent, &[Value::Nil, Value::Nil]).unwrap_err();
    assert!(err.is_exception_type(BuiltinClass::ArgumentError));
}

#[cfg(unix)]
#[test]
fn aliases_resolve_to_one_class() {
    let rt = ErrorRuntime::global();
    let eagain = rt.syserr().const_get("EAGAIN").unwrap();
    let ewouldblock = rt.syserr().const_get("EWOULDBLOCK").unwrap();
    assert!(Arc::ptr_eq(&eagain, &ewouldblock));
}

#[test]
fn subclasses_inherit_or_miss_the_errno_constant() {
    let rt = ErrorRuntime::global();
    let errno_class = rt.errno_class(5105).unwrap();
    let custom = rt.define_class("CustomE5105", &errno_class).unwrap();
    let err = rt.construct(&custom, &[]).unwrap();
    assert!(Arc::ptr_eq(err.class(), &custom));
    assert_eq!(err.errno(), Some(5105));

    let bare = rt
        .define_class("BareSysError", &rt.class(BuiltinClass::SystemCallError))
        .unwrap();
    let err = rt.construct(&bare, &[]).unwrap_err().into_error();
    assert!(err.is_kind_of(BuiltinClass::NameError));
    assert_eq!(err.name(), Some(&Value::symbol("Errno")));
    assert_eq!(
        err.render_message().unwrap(),
        "uninitialized constant BareSysError::Errno"
    );
}

#[test]
fn case_match_on_the_generic_class() {
    let rt = ErrorRuntime::global();
    let generic = rt.class(BuiltinClass::SystemCallError);
    let errno_err = rt.construct(&rt.errno_class(2).unwrap(), &[]).unwrap();
    let type_err = rt.new_error(BuiltinClass::TypeError, "x");

    assert!(rt.case_match(&generic, &errno_err).unwrap());
    assert!(rt.case_match(&generic, &Errnoish(Some(2))).unwrap());
    assert!(!rt.case_match(&generic, &type_err).unwrap());
    assert!(!rt.case_match(&generic, &Value::Int(2)).unwrap());
}

#[test]
fn case_match_on_an_errno_class_compares_numbers() {
    let rt = ErrorRuntime::global();
    let class = rt.errno_class(5106).unwrap();
    let same = rt.construct(&class, &[]).unwrap();
    let other = rt.construct(&rt.errno_class(5107).unwrap(), &[]).unwrap();

    assert!(rt.case_match(&class, &same).unwrap());
    assert!(!rt.case_match(&class, &other).unwrap());
    assert!(rt.case_match(&class, &Errnoish(Some(5106))).unwrap());
    assert!(!rt.case_match(&class, &Errnoish(None)).unwrap());
}

#[test]
fn case_match_on_other_classes_is_kind_of() {
    let rt = ErrorRuntime::global();
    let index_error = rt.class(BuiltinClass::IndexError);
    assert!(rt.case_match(&index_error, &rt.new_error(BuiltinClass::KeyError, "k")).unwrap());
    assert!(!rt.case_match(&index_error, &rt.new_error(BuiltinClass::TypeError, "t")).unwrap());
}

#[test]
fn io_errors_map_through_the_registry() {
    let rt = ErrorRuntime::global();
    let err = rt
        .from_io_error(&io::Error::from_raw_os_error(2), "reading config")
        .into_error();
    assert!(Arc::ptr_eq(err.class(), &rt.errno_class(2).unwrap()));
    assert_eq!(err.render_message().unwrap(), format!("{} - reading config", strerror(2)));

    let err = rt.from_io_error(&io::Error::other("boom"), "reading config").into_error();
    assert!(Arc::ptr_eq(err.class(), &rt.class(BuiltinClass::SystemCallError)));
    assert_eq!(err.errno(), None);
    assert_eq!(err.render_message().unwrap(), "unknown error - reading config");
}

#[test]
fn concurrent_misses_converge_on_one_class() {
    let taxonomy = Taxonomy::with_builtins().unwrap();
    let registry = SystemErrorRegistry::new(&taxonomy).unwrap();

    let classes: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| registry.lookup(&taxonomy, 6001).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for class in &classes[1..] {
        assert!(Arc::ptr_eq(class, &classes[0]));
    }
    assert!(Arc::ptr_eq(&taxonomy.get("Errno::E6001").unwrap(), &classes[0]));
    assert_eq!(
        taxonomy.names().iter().filter(|name| name.as_str() == "Errno::E6001").count(),
        1
    );
}

#[cfg(unix)]
#[test]
fn socket_errors_have_named_classes() {
    let rt = ErrorRuntime::global();
    for (name, errno) in [
        ("EMSGSIZE", libc::EMSGSIZE),
        ("EPROTO", libc::EPROTO),
        ("ECANCELED", libc::ECANCELED),
        ("EOVERFLOW", libc::EOVERFLOW),
    ] {
        let by_name = rt.syserr().const_get(name).unwrap();
        let by_errno = rt.errno_class(errno).unwrap();
        assert!(Arc::ptr_eq(&by_name, &by_errno));
        assert_eq!(by_errno.name(), format!("Errno::{name}"));
        assert_eq!(by_errno.errno_constant(), Some(errno));
    }
}

#[test]
fn predefined_errno_class_gets_its_constant() {
    let rt = ErrorRuntime::global();
    let generic = rt.class(BuiltinClass::SystemCallError);
    let predefined = rt.define_class("Errno::E4321", &generic).unwrap();

    let class = rt.errno_class(4321).unwrap();
    assert!(Arc::ptr_eq(&class, &predefined));
    assert_eq!(predefined.errno_constant(), Some(4321));

    let err = rt.construct(&predefined, &[Value::Nil]).unwrap();
    assert_eq!(err.errno(), Some(4321));
    assert_eq!(err.render_message().unwrap(), strerror(4321));
}
