mod common;

use pretty_assertions::assert_eq;

use rox::error::{LoxError, RuntimeError};

fn resolve_errors(source: &str) -> (Vec<String>, Vec<RuntimeError>) {
    let (lines, result) = common::run(source);

    match result {
        Err(LoxError::Resolve(errors)) => (lines, errors),
        other => panic!("expected resolve errors, got {:?}", other),
    }
}

fn messages(source: &str) -> Vec<String> {
    resolve_errors(source)
        .1
        .into_iter()
        .map(|e| e.message)
        .collect()
}

#[test]
fn top_level_return_blocks_execution() {
    let (lines, errors) = resolve_errors("print \"never\"; return 1;");

    assert!(lines.is_empty());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Can't return from top-level code.");
    assert_eq!(errors[0].token.lexeme, "return");
}

#[test]
fn every_static_error_is_reported() {
    let found = messages(
        r#"
        return;
        { var a = 1; var a = 2; }
        { var b = b; }
        print this;
        "#,
    );

    assert_eq!(
        found,
        [
            "Can't return from top-level code.",
            "Already a variable with this name in this scope.",
            "Can't read local variable in its own initializer.",
            "Can't use 'this' outside of a class.",
        ]
    );
}

#[test]
fn class_rules() {
    assert_eq!(messages("class A < A {}"), ["A class can't inherit from itself."]);
    assert_eq!(
        messages("class A { f() { super.f(); } }"),
        ["Can't use 'super' in a class with no superclass."]
    );
    assert_eq!(
        messages("fun f() { super.g(); }"),
        ["Can't use 'super' outside of a class."]
    );
    assert_eq!(
        messages("class A { init() { return 1; } }"),
        ["Can't return a value from an initializer."]
    );
}

#[test]
fn bare_return_in_initializer_is_allowed() {
    let (lines, result) = common::run(
        r#"
        class A { init() { this.ok = true; return; } }
        print A().ok;
        "#,
    );

    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(lines, ["true"]);
}

#[test]
fn globals_may_be_redeclared() {
    let (lines, result) = common::run("var a = 1; var a = 2; print a;");

    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(lines, ["2"]);
}

#[test]
fn resolve_errors_exit_with_65() {
    let (_, result) = common::run("return;");
    assert_eq!(result.map_err(|e| e.exit_code()), Err(65));
}
