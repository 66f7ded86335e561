mod common;

use pretty_assertions::assert_eq;

use rox::error::LoxError;

fn output(source: &str) -> Vec<String> {
    let (lines, result) = common::run(source);
    assert!(result.is_ok(), "program failed: {:?}", result);
    lines
}

#[test]
fn numbers_print_without_trailing_zero() {
    assert_eq!(output("print 9.0; print 45.67; print -0.5;"), ["9", "45.67", "-0.5"]);
}

#[test]
fn strings_concatenate_and_compare() {
    let lines = output(
        r#"
        var a = "foo" + "bar";
        print a;
        print a == "foobar";
        print "x" != "y";
        print nil == false;
        "#,
    );

    assert_eq!(lines, ["foobar", "true", "true", "false"]);
}

#[test]
fn truthiness_and_logical_operators() {
    let lines = output(
        r#"
        print !nil;
        print !0;
        print nil or "default";
        print "left" and "right";
        print false and undefined_is_never_read;
        "#,
    );

    assert_eq!(lines, ["true", "false", "default", "right", "false"]);
}

#[test]
fn while_countdown_with_branches() {
    let lines = output(
        r#"
        var a = 10;
        while (a > 0) {
            if (a > 2) { print a; } else { print "a<=2"; }
            a = a - 1;
        }
        "#,
    );

    assert_eq!(
        lines,
        ["10", "9", "8", "7", "6", "5", "4", "3", "a<=2", "a<=2"]
    );
}

#[test]
fn for_loop_scopes_its_variable() {
    let lines = output(
        r#"
        var i = "outer";
        for (var i = 0; i < 3; i = i + 1) print i;
        print i;
        "#,
    );

    assert_eq!(lines, ["0", "1", "2", "outer"]);
}

#[test]
fn closures_bind_statically() {
    let lines = output(
        r#"
        var a = "global";
        {
            fun showA() { print a; }
            showA();
            var a = "block";
            showA();
        }
        "#,
    );

    assert_eq!(lines, ["global", "global"]);
}

#[test]
fn closures_keep_captured_state() {
    let lines = output(
        r#"
        fun makeCounter() {
            var i = 0;
            fun count() { i = i + 1; return i; }
            return count;
        }
        var counter = makeCounter();
        print counter();
        print counter();
        print counter;
        "#,
    );

    assert_eq!(lines, ["1", "2", "<fn count>"]);
}

#[test]
fn recursive_fibonacci() {
    let lines = output(
        r#"
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        for (var i = 0; i < 20; i = i + 1) print fib(i);
        "#,
    );

    let expected = [
        "0", "1", "1", "2", "3", "5", "8", "13", "21", "34", "55", "89", "144", "233", "377",
        "610", "987", "1597", "2584", "4181",
    ];
    assert_eq!(lines, expected);
}

#[test]
fn return_unwinds_nested_loops() {
    let lines = output(
        r#"
        fun find() {
            var i = 0;
            while (true) {
                { if (i == 3) return i; }
                i = i + 1;
            }
        }
        print find();
        fun nothing() { return; }
        print nothing();
        "#,
    );

    assert_eq!(lines, ["3", "nil"]);
}

#[test]
fn super_dispatches_to_lexical_ancestor() {
    let lines = output(
        r#"
        class A { method() { print "A method"; } }
        class B < A {
            method() { print "B method"; }
            test() { super.method(); }
        }
        class C < B {}
        C().test();
        "#,
    );

    assert_eq!(lines, ["A method"]);
}

#[test]
fn initializer_sets_fields_and_returns_this() {
    let lines = output(
        r#"
        class Point {
            init(x, y) { this.x = x; this.y = y; }
            sum() { return this.x + this.y; }
        }
        var p = Point(1, 2);
        print p.sum();
        print p.init(3, 4) == p;
        print p.x;
        print Point;
        print p;
        "#,
    );

    assert_eq!(lines, ["3", "true", "3", "Point", "Point instance"]);
}

#[test]
fn fields_shadow_methods() {
    let lines = output(
        r#"
        class Box { name() { return "method"; } }
        var b = Box();
        print b.name();
        b.name = "field";
        print b.name;
        "#,
    );

    assert_eq!(lines, ["method", "field"]);
}

#[test]
fn bound_methods_remember_receiver() {
    let lines = output(
        r#"
        class Greeter {
            init(who) { this.who = who; }
            greet() { print "hi " + this.who; }
        }
        var g = Greeter("there").greet;
        g();
        "#,
    );

    assert_eq!(lines, ["hi there"]);
}

#[test]
fn inherited_initializer_sets_arity() {
    let lines = output(
        r#"
        class Base { init(v) { this.v = v; } }
        class Derived < Base {}
        print Derived(7).v;
        "#,
    );

    assert_eq!(lines, ["7"]);
}

#[test]
fn native_clock_returns_a_number() {
    let lines = output("print clock() > 0; print clock;");
    assert_eq!(lines, ["true", "<native fn>"]);
}

#[test]
fn calling_a_non_callable_stops_execution() {
    let (lines, result) = common::run(
        r#"
        print "before";
        "not a function"();
        print "after";
        "#,
    );

    assert_eq!(lines, ["before"]);

    let Err(LoxError::Runtime(e)) = result else {
        panic!("expected runtime error, got {:?}", result);
    };
    assert_eq!(e.message, "Can only call functions and classes.");
    assert_eq!(e.token.lexeme, ")");
    assert_eq!(e.token.line, 3);
}

#[test]
fn wrong_arity_reports_counts() {
    let (lines, result) = common::run("fun f(a, b) {} f(1); print \"unreached\";");

    assert!(lines.is_empty());

    let Err(LoxError::Runtime(e)) = result else {
        panic!("expected runtime error, got {:?}", result);
    };
    assert_eq!(e.message, "Expected 2 arguments but got 1.");
    assert_eq!(e.to_string(), "Expected 2 arguments but got 1.\n[line 1]");
}

#[test]
fn type_errors_name_the_operator() {
    let runtime_message = |source: &str| match common::run(source).1 {
        Err(LoxError::Runtime(e)) => e.message,
        other => panic!("expected runtime error, got {:?}", other),
    };

    assert_eq!(runtime_message("print -\"x\";"), "Operand must be a number.");
    assert_eq!(runtime_message("print 1 < \"2\";"), "Operands must be numbers.");
    assert_eq!(
        runtime_message("print 1 + \"2\";"),
        "Operands must be two numbers or two strings."
    );
    assert_eq!(runtime_message("print missing;"), "Undefined variable 'missing'.");
    assert_eq!(runtime_message("missing = 1;"), "Undefined variable 'missing'.");
    assert_eq!(runtime_message("print 3.x;"), "Only instances have properties.");
    assert_eq!(runtime_message("var s = \"s\"; s.f = 1;"), "Only instances have fields.");
    assert_eq!(
        runtime_message("class A {} print A().nope;"),
        "Undefined property 'nope'."
    );
    assert_eq!(
        runtime_message("var NotClass = 1; class B < NotClass {}"),
        "Superclass must be a class."
    );
}

#[test]
fn runtime_error_keeps_earlier_output() {
    let (lines, result) = common::run("print 1; print 2; print nil + 1; print 3;");

    assert_eq!(lines, ["1", "2"]);
    assert_eq!(result.map_err(|e| e.exit_code()), Err(70));
}

#[test]
fn globals_persist_across_runs() {
    let (mut interpreter, capture) = common::interpreter();

    rox::run("var greeting = \"hello\";", &mut interpreter).unwrap();
    rox::run("fun shout() { return greeting + \"!\"; }", &mut interpreter).unwrap();
    rox::run("print shout();", &mut interpreter).unwrap();

    assert_eq!(capture.lines(), ["hello!"]);
}

#[test]
fn environment_slots_are_released_after_calls() {
    let (mut interpreter, _capture) = common::interpreter();
    let baseline: usize = interpreter.environments().live();

    rox::run(
        r#"
        fun work(n) {
            var total = 0;
            for (var i = 0; i < n; i = i + 1) { var step = i; total = total + step; }
            return total;
        }
        work(10);
        work(20);
        "#,
        &mut interpreter,
    )
    .unwrap();

    assert_eq!(interpreter.environments().live(), baseline);
}

#[test]
fn runaway_recursion_is_a_runtime_error() {
    let (mut interpreter, capture) = common::interpreter();
    interpreter.set_max_call_depth(64);

    let result = rox::run("fun f() { f(); } f(); print \"unreached\";", &mut interpreter);

    let Err(LoxError::Runtime(e)) = result else {
        panic!("expected runtime error, got {:?}", result);
    };
    assert_eq!(e.message, "Stack overflow.");
    assert_eq!(e.token.lexeme, ")");

    // The depth counter unwinds with the error, so the session stays usable.
    rox::run(
        "fun down(n) { if (n == 0) return 0; return down(n - 1) + 1; } print down(60);",
        &mut interpreter,
    )
    .unwrap();
    assert_eq!(capture.lines(), ["60"]);
}

#[test]
fn default_call_depth_limit() {
    let source = |n: usize| {
        format!(
            "fun f(n) {{ if (n == 0) return 0; return f(n - 1) + 1; }} print f({});",
            n
        )
    };

    let worker = std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(move || (common::run(&source(900)), common::run(&source(3000))))
        .unwrap();
    let ((shallow_lines, shallow), (deep_lines, deep)) = worker.join().unwrap();

    assert!(shallow.is_ok(), "{:?}", shallow);
    assert_eq!(shallow_lines, ["900"]);

    assert!(deep_lines.is_empty());
    let Err(LoxError::Runtime(e)) = deep else {
        panic!("expected runtime error, got {:?}", deep);
    };
    assert_eq!(e.message, "Stack overflow.");
}

#[test]
fn numbers_keep_their_reference_spelling() {
    assert_eq!(
        output("print 0 / 0; print 1 / 0; print 10000000000000000 * 100000; print -0;"),
        ["nan", "inf", "1e+21", "-0"]
    );
}

#[test]
fn functions_from_earlier_runs_keep_resolved_locals() {
    let (mut interpreter, capture) = common::interpreter();

    rox::run(
        "fun adder(a) { fun add(b) { return a + b; } return add; }",
        &mut interpreter,
    )
    .unwrap();
    rox::run("var add2 = adder(2);", &mut interpreter).unwrap();
    rox::run("print add2(40);", &mut interpreter).unwrap();

    assert_eq!(capture.lines(), ["42"]);
}
