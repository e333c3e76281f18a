use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use lark::interpreter::Interpreter;
use lark::parser::Parser;
use lark::resolver::Resolver;
use lark::scanner::Scanner;
use lark::token::Token;

/// Run a source through the whole pipeline, capturing `print` output and any
/// resolver/runtime diagnostics.
fn run(source: &str) -> (String, Vec<String>) {
    let tokens: Vec<Token> = Scanner::new(source.as_bytes())
        .map(|r| r.expect("scan error"))
        .collect();

    let mut parser = Parser::new(tokens);
    let statements = parser.parse();

    assert!(
        !parser.had_error(),
        "unexpected parse errors: {:?}",
        parser.errors()
    );

    let sink: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    let out: Rc<RefCell<dyn Write>> = sink.clone();

    let mut interpreter = Interpreter::with_output(out);

    if let Err(e) = Resolver::new(&mut interpreter).resolve(&statements) {
        return (String::new(), vec![e.to_string()]);
    }

    let mut errors: Vec<String> = Vec::new();

    for stmt in &statements {
        if let Err(e) = interpreter.run(stmt) {
            errors.push(e.to_string());
        }
    }

    let output = String::from_utf8(sink.borrow().clone()).expect("utf-8 output");

    (output, errors)
}

fn run_ok(source: &str) -> String {
    let (output, errors) = run(source);

    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);

    output
}

// ─────────────────────────────────────────────────────────────────────────
// End-to-end scenarios
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn arithmetic_over_variables() {
    assert_eq!(run_ok("let a = 1; let b = 2; print(a + b);"), "3\n");
}

#[test]
fn function_call_with_return() {
    assert_eq!(
        run_ok("function add(x,y){ return x+y; } print(add(40,2));"),
        "42\n"
    );
}

#[test]
fn closure_reads_the_live_variable() {
    let source = "let c = 0; \
                  function mk(){ let x = 10; function get(){ return x; } x = x + 1; return get; } \
                  print(mk()());";

    assert_eq!(run_ok(source), "11\n");
}

#[test]
fn constructor_and_method_dispatch() {
    let source = "class Car { constructor(n){ this.n = n; } name(){ return this.n; } } \
                  let r = new Car(\"F1\"); print(r.name());";

    assert_eq!(run_ok(source), "F1\n");
}

#[test]
fn super_calls_the_overridden_method() {
    let source = "class A { greet(){ return \"A\"; } } \
                  class B extends A { greet(){ return super.greet() + \"B\"; } } \
                  print(new B().greet());";

    assert_eq!(run_ok(source), "AB\n");
}

#[test]
fn while_loop_counts() {
    assert_eq!(
        run_ok("let i = 0; while (i < 3) { print(i); i = i + 1; }"),
        "0\n1\n2\n"
    );
}

#[test]
fn undefined_variable_is_a_runtime_error() {
    let (output, errors) = run("print(z);");

    assert_eq!(output, "");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Runtime Error: undefined variable 'z'"));
}

#[test]
fn reading_a_variable_in_its_own_initializer_is_rejected() {
    let (_, errors) = run("{ let a = a; }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Syntax Error: cannot use same variable for initialization"));
}

// ─────────────────────────────────────────────────────────────────────────
// Scoping and closures
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn shadowing_restores_the_outer_binding() {
    assert_eq!(
        run_ok("{ let a = 1; { let a = 2; print(a); } print(a); }"),
        "2\n1\n"
    );
}

#[test]
fn closures_share_their_captured_environment() {
    let source = "function mk(){ let n = 0; function inc(){ n = n + 1; return n; } return inc; } \
                  let c = mk(); print(c()); print(c()); \
                  let d = mk(); print(d());";

    // Two counters from two invocations are independent.
    assert_eq!(run_ok(source), "1\n2\n1\n");
}

#[test]
fn duplicate_declaration_in_a_block_is_a_runtime_error() {
    let (_, errors) = run("{ let a = 1; let a = 2; }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("'a' is already declared in this scope"));
}

#[test]
fn global_redefinition_is_allowed() {
    assert_eq!(run_ok("let a = 1; let a = 2; print(a);"), "2\n");
}

#[test]
fn later_statements_run_after_a_runtime_error() {
    let (output, errors) = run("print(boom); print(1);");

    assert_eq!(errors.len(), 1);
    assert_eq!(output, "1\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn assignment_is_an_expression_yielding_its_value() {
    assert_eq!(run_ok("let a = 0; print(a = 5);"), "5\n");
}

#[test]
fn compound_assignment_updates_in_place() {
    assert_eq!(
        run_ok("let x = 10; x += 5; print(x); x *= 2; print(x); x -= 10; print(x); x /= 4; print(x);"),
        "15\n30\n20\n5\n"
    );
}

#[test]
fn increment_and_decrement_orderings() {
    assert_eq!(
        run_ok("let i = 5; print(i++); print(i); print(++i); print(--i); print(i--); print(i);"),
        "5\n6\n7\n6\n6\n5\n"
    );
}

#[test]
fn increment_requires_a_variable_operand() {
    let (_, errors) = run("++5;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("must be a variable"));
}

#[test]
fn power_operator() {
    assert_eq!(run_ok("print(2 ^ 10); print(2 * 3 ^ 2);"), "1024\n18\n");
}

#[test]
fn ternary_evaluates_only_the_selected_branch() {
    // The untaken branch names an undefined variable; selecting the other
    // branch must not touch it.
    assert_eq!(run_ok("print(1 ? \"yes\" : missing);"), "yes\n");
    assert_eq!(run_ok("print(0 ? missing : \"no\");"), "no\n");
}

#[test]
fn truthiness_of_zero_none_and_strings() {
    assert_eq!(run_ok("print(0 ? \"t\" : \"f\");"), "f\n");
    assert_eq!(run_ok("print(none ? \"t\" : \"f\");"), "f\n");
    assert_eq!(run_ok("print(false ? \"t\" : \"f\");"), "f\n");
    assert_eq!(run_ok("print(\"\" ? \"t\" : \"f\");"), "t\n");
}

#[test]
fn string_concatenation_with_mixed_operands() {
    assert_eq!(run_ok("print(\"a\" + 1); print(1 + \"a\");"), "a1\n1a\n");
}

#[test]
fn cross_type_equality_is_false() {
    assert_eq!(
        run_ok("print(\"1\" == 1 ? \"eq\" : \"ne\"); print(1 == 1 ? \"eq\" : \"ne\");"),
        "ne\neq\n"
    );
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let (_, errors) = run("print(1 / 0);");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("division by zero"));
}

#[test]
fn comparison_requires_numbers() {
    let (_, errors) = run("print(\"a\" < 1);");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("must be numbers"));
}

// ─────────────────────────────────────────────────────────────────────────
// Functions
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn arity_mismatch_reports_without_running_the_body() {
    let (output, errors) = run("function f(a){ print(a); } f(1,2);");

    assert_eq!(output, "");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("expected 1 arguments but got 2"));
}

#[test]
fn recursion_works_through_the_enclosing_scope() {
    assert_eq!(
        run_ok("function fib(n){ return n < 2 ? n : fib(n-1) + fib(n-2); } print(fib(10));"),
        "55\n"
    );
}

#[test]
fn a_function_without_return_yields_none() {
    assert_eq!(run_ok("function f(){} print(f());"), "none\n");
}

#[test]
fn return_outside_a_function_is_a_runtime_error() {
    let (_, errors) = run("return 5;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("'return' used outside of a function"));
}

#[test]
fn print_returns_none() {
    assert_eq!(run_ok("print(print(1));"), "1\nnone\n");
}

#[test]
fn clock_yields_a_number() {
    assert_eq!(run_ok("print(clock() > 0 ? \"ok\" : \"bad\");"), "ok\n");
}

#[test]
fn calling_a_non_callable_is_a_runtime_error() {
    let (_, errors) = run("let x = 1; x();");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("is not callable"));
}

// ─────────────────────────────────────────────────────────────────────────
// Classes
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn calling_a_class_without_new_is_rejected() {
    let (_, errors) = run("class C {} let x = C();");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("can only be instantiated using the 'new' operator"));
}

#[test]
fn fields_are_created_on_assignment() {
    assert_eq!(run_ok("class P {} let p = new P(); p.x = 3; print(p.x);"), "3\n");
}

#[test]
fn undefined_property_is_a_runtime_error() {
    let (_, errors) = run("class P {} print(new P().missing);");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("undefined property 'missing'"));
}

#[test]
fn this_is_bound_to_the_receiver() {
    let source = "class C { self(){ return this; } } \
                  let i = new C(); \
                  print(i.self() == i ? \"same\" : \"diff\");";

    assert_eq!(run_ok(source), "same\n");
}

#[test]
fn methods_are_inherited_through_the_superclass_chain() {
    let source = "class A { hi(){ return \"hi\"; } } \
                  class B extends A {} \
                  print(new B().hi());";

    assert_eq!(run_ok(source), "hi\n");
}

#[test]
fn constructor_arity_is_enforced() {
    let (_, errors) = run("class C { constructor(a){ this.a = a; } } new C();");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("expected 1 arguments but got 0"));
}

#[test]
fn constructor_return_value_is_discarded() {
    let source = "class C { constructor(){ this.v = 7; return 99; } } \
                  let c = new C(); print(c.v);";

    assert_eq!(run_ok(source), "7\n");
}

#[test]
fn instantiating_a_non_class_is_rejected() {
    let (_, errors) = run("function f(){} let x = new f();");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("'new' requires a class"));
}

#[test]
fn fields_shadow_methods() {
    let source = "class C { tag(){ return \"method\"; } } \
                  let c = new C(); \
                  c.tag = \"field\"; \
                  print(c.tag);";

    assert_eq!(run_ok(source), "field\n");
}

#[test]
fn superclass_must_be_a_class() {
    let (_, errors) = run("let A = 1; class B extends A {}");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("superclass must be a class"));
}

#[test]
fn methods_see_locals_from_the_declaration_site() {
    let source = "{ let tag = \"site\"; class C { read(){ return tag; } } \
                  print(new C().read()); }";

    assert_eq!(run_ok(source), "site\n");
}
