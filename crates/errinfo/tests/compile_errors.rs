use errinfo::{
    BuiltinClass, COMPILE_ERROR_PLACEHOLDER, CollectStringWriter, CompileErrorMode, ErrorConfig, ExecutionContext,
    Verbosity,
};
use pretty_assertions::assert_eq;

fn context(mode: CompileErrorMode) -> ExecutionContext<CollectStringWriter> {
    ExecutionContext::new(ErrorConfig::default().with_compile_mode(mode), CollectStringWriter::new())
}

#[test]
fn lenient_mode_merges_into_one_syntax_error() {
    let mut ctx = context(CompileErrorMode::Lenient);
    ctx.compile_error(Some("f"), 1, format_args!("a"));
    ctx.compile_error_append(format_args!("b"));
    ctx.compile_error_append(format_args!("c"));

    let mut pending = ctx.take_errinfo().unwrap();
    assert!(pending.is_kind_of(BuiltinClass::SyntaxError));
    assert_eq!(pending.message().unwrap(), "f:1: a\nb\nc");
    assert_eq!(ctx.into_stream().output(), "");
}

#[test]
fn lenient_mode_positions_every_compile_error() {
    let mut ctx = context(CompileErrorMode::Lenient);
    ctx.compile_error(Some("f"), 1, format_args!("a"));
    ctx.compile_error(Some("f"), 4, format_args!("unexpected {}", "end"));
    assert_eq!(
        ctx.take_errinfo().unwrap().message().unwrap(),
        "f:1: a\nf:4: unexpected end"
    );
}

#[test]
fn lenient_mode_absorbs_an_existing_error() {
    let mut ctx = context(CompileErrorMode::Lenient);
    let prior = ctx.runtime().new_error(BuiltinClass::RuntimeError, "earlier");
    ctx.set_errinfo(Some(prior));
    ctx.compile_error(Some("f"), 2, format_args!("x"));

    let mut pending = ctx.take_errinfo().unwrap();
    assert!(pending.is_kind_of(BuiltinClass::SyntaxError));
    assert_eq!(pending.message().unwrap(), "earlier\nf:2: x");
}

#[test]
fn strict_mode_streams_and_records_a_placeholder() {
    let mut ctx = context(CompileErrorMode::Strict);
    ctx.compile_error(Some("f"), 1, format_args!("x"));

    let mut pending = ctx.errinfo_mut().unwrap().clone();
    assert!(pending.is_kind_of(BuiltinClass::SyntaxError));
    assert_eq!(pending.message().unwrap(), COMPILE_ERROR_PLACEHOLDER);
    assert_eq!(ctx.stream().output(), "f:1: x\n");
}

#[test]
fn strict_mode_keeps_the_first_pending_error() {
    let mut ctx = context(CompileErrorMode::Strict);
    ctx.compile_error(Some("f"), 1, format_args!("x"));
    ctx.compile_error(Some("f"), 2, format_args!("y"));
    ctx.compile_error_append(format_args!("detail"));

    assert_eq!(ctx.take_errinfo().unwrap().message().unwrap(), COMPILE_ERROR_PLACEHOLDER);
    assert_eq!(ctx.into_stream().into_output(), "f:1: x\nf:2: y\ndetail\n");
}

#[test]
fn strict_mode_does_not_replace_an_existing_error() {
    let mut ctx = context(CompileErrorMode::Strict);
    let prior = ctx.runtime().new_error(BuiltinClass::RuntimeError, "earlier");
    ctx.set_errinfo(Some(prior));
    ctx.compile_error(Some("f"), 1, format_args!("x"));

    assert!(ctx.errinfo().unwrap().is_kind_of(BuiltinClass::RuntimeError));
    assert_eq!(ctx.stream().output(), "f:1: x\n");
}

#[test]
fn position_prefixes() {
    let mut ctx = context(CompileErrorMode::Strict);
    ctx.compile_error(None, 9, format_args!("x"));
    ctx.compile_error(Some("f"), 0, format_args!("x"));
    assert_eq!(ctx.stream().output(), "x\nf: x\n");
}

#[test]
fn mode_can_be_switched_between_units() {
    let mut ctx = context(CompileErrorMode::Strict);
    assert_eq!(ctx.compile_mode(), CompileErrorMode::Strict);
    ctx.set_compile_mode(CompileErrorMode::Lenient);
    assert_eq!(ctx.compile_mode(), CompileErrorMode::Lenient);

    ctx.compile_error(Some("f"), 1, format_args!("x"));
    assert_eq!(ctx.stream().output(), "");
}

#[test]
fn compile_warn_is_gated_on_warnings() {
    let mut ctx = ExecutionContext::new(
        ErrorConfig::default().with_verbosity(Verbosity::Off),
        CollectStringWriter::new(),
    );
    ctx.compile_warn(Some("f"), 3, format_args!("unused"));
    assert_eq!(ctx.stream().output(), "");

    ctx.set_verbosity(Verbosity::Default);
    ctx.compile_warn(Some("f"), 3, format_args!("unused"));
    assert_eq!(ctx.stream().output(), "f:3: warning: unused\n");
}

#[test]
fn compile_warning_needs_verbose() {
    let mut ctx = context(CompileErrorMode::Strict);
    ctx.compile_warning(Some("f"), 3, format_args!("shadowed"));
    assert_eq!(ctx.stream().output(), "");

    ctx.set_verbosity(Verbosity::Verbose);
    ctx.compile_warning(Some("f"), 3, format_args!("shadowed"));
    assert_eq!(ctx.stream().output(), "f:3: warning: shadowed\n");
    assert!(ctx.errinfo().is_none());
}
