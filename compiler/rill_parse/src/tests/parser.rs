//! Grammar-level tests: token handling, precedence, resolution order,
//! arity validation and error positions.

use pretty_assertions::assert_eq;

use rill_context::Context;
use rill_diagnostic::ParseErrorKind;
use rill_ir::{Arity, FunctionRef, Value};

use super::{bare, bindings, implicit_context, number, string, with_default};
use crate::{compile, ParseMode};

#[test]
fn empty_source_compiles_to_the_empty_string() {
    let expr = bare("");
    assert_eq!(expr.debug_dump(), "\"\"");
    assert_eq!(expr.run(&bindings(&[])), string(""));

    let blank = bare("   \t ");
    assert_eq!(blank.run(&bindings(&[])), string(""));
}

#[test]
fn literals() {
    assert_eq!(bare("42").run(&bindings(&[])), number(42.0));
    assert_eq!(bare("2.5").run(&bindings(&[])), number(2.5));
    assert_eq!(bare("'hi'").run(&bindings(&[])), string("hi"));
    assert_eq!(bare("'it''s'").debug_dump(), "\"it's\"");
}

#[test]
fn power_is_left_associative() {
    let expr = bare("4 ^ 3 ^ 2");
    assert_eq!(expr.debug_dump(), "(const 4096)");
    assert_eq!(expr.run(&bindings(&[])), number(4096.0));
}

#[test]
fn double_star_is_power_too() {
    assert_eq!(bare("2 ** 10").run(&bindings(&[])), number(1024.0));
}

#[test]
fn multiplicative_binds_tighter_than_additive() {
    assert_eq!(bare("1 + 2 * 3").run(&bindings(&[])), number(7.0));
    assert_eq!(bare("(1 + 2) * 3").run(&bindings(&[])), number(9.0));
}

#[test]
fn comparisons_bind_below_arithmetic() {
    assert_eq!(bare("1 + 1 = 2").run(&bindings(&[])), Value::Bool(true));
    assert_eq!(bare("2 < 1 + 2").run(&bindings(&[])), Value::Bool(true));
}

#[test]
fn explicit_concat_binds_above_multiplicative() {
    // x # 2 * 3 parses as (x # 2) * 3.
    let expr = bare("x # 2 * 3");
    assert_eq!(expr.debug_dump(), "(CONCAT({x}, (const 2)) * (const 3))");
    // "a2" coerces to 0.
    assert_eq!(
        expr.run(&bindings(&[("x", string("a"))])),
        number(0.0)
    );
    assert_eq!(
        bare("x # 7").run(&bindings(&[("x", string("n="))])),
        string("n=7")
    );
}

#[test]
fn logical_operator_tiers() {
    // & binds tighter than |, which binds tighter than ^^.
    let expr = bare("a ^^ b | c & d");
    assert_eq!(expr.debug_dump(), "({a} ^^ ORCHAIN({b}, ({c} & {d})))");
}

#[test]
fn unary_binds_tighter_than_power() {
    // -x ^ 2 is (-x) ^ 2, the unary applying to the value only.
    assert_eq!(
        bare("-x ^ 2").run(&bindings(&[("x", number(3.0))])),
        number(9.0)
    );
}

#[test]
fn variables_record_first_occurrence_offsets_lowercased() {
    let expr = bare("x + Y + x + y");
    assert_eq!(expr.variables(), vec![("x", 0), ("y", 4)]);
}

#[test]
fn ternary_chains_through_the_else_branch() {
    let expr = bare("x > 100 ? 100 : x < 0 ? 0 : x");
    let run = |x: f64| expr.run(&bindings(&[("x", number(x))]));
    assert_eq!(run(10.0), number(10.0));
    assert_eq!(run(150.0), number(100.0));
    assert_eq!(run(-5.0), number(0.0));
}

#[test]
fn ternary_else_defaults_to_the_empty_string() {
    let expr = bare("x = 1 ? 'one'");
    assert_eq!(expr.run(&bindings(&[("x", number(1.0))])), string("one"));
    assert_eq!(expr.run(&bindings(&[("x", number(2.0))])), string(""));
}

#[test]
fn missing_closing_parenthesis() {
    let err = compile("(1 + 2", None, ParseMode::Single).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::ExpectedClosingParen);
    assert_eq!(err.offset, 6);
}

#[test]
fn missing_expression_after_operator() {
    let err = compile("1 +", None, ParseMode::Single).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::ExpectedRightOperand { op: "+" });
    assert_eq!(err.offset, 3);
}

#[test]
fn missing_operand_after_unary() {
    let err = compile("!", None, ParseMode::Single).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::ExpectedUnaryOperand { op: "!" });
}

#[test]
fn trailing_tokens_are_rejected_without_implicit_concatenation() {
    let err = compile("1 2", None, ParseMode::Single).unwrap_err();
    assert_eq!(err.offset, 2);
    assert_eq!(err.kind, ParseErrorKind::TrailingInput { found: "2".into() });
}

#[test]
fn implicit_concatenation_toggles_parseability() {
    let ctx = implicit_context();
    let expr = compile("1 2", Some(&ctx), ParseMode::Single).unwrap();
    assert_eq!(expr.run(&bindings(&[])), string("12"));

    // The same source fails against a context with the option off.
    let plain = Context::new();
    assert!(compile("1 2", Some(&plain), ParseMode::Single).is_err());
}

#[test]
fn function_calls_resolve_case_insensitively() {
    let expr = with_default("SQRT(x)");
    assert_eq!(expr.run(&bindings(&[("x", number(16.0))])), number(4.0));
}

#[test]
fn function_lookup_requires_a_following_parenthesis() {
    // `sqrt` not followed by `(` is an ordinary variable.
    let expr = with_default("sqrt + 1");
    assert_eq!(expr.variables(), vec![("sqrt", 0)]);
    assert_eq!(
        expr.run(&bindings(&[("sqrt", number(9.0))])),
        number(10.0)
    );
}

#[test]
fn unknown_function_name_falls_back_to_a_variable() {
    // With implicit concatenation off, `foo(1)` is the variable foo
    // followed by a parenthesized group: trailing input.
    let err = compile("foo(1)", None, ParseMode::Single).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::TrailingInput { found: "(".into() });
    assert_eq!(err.offset, 3);
}

#[test]
fn arity_too_few_names_function_and_counts() {
    let err = compile(
        "atan2(1)",
        Some(rill_context::default_context().as_ref()),
        ParseMode::Single,
    )
    .unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::TooFewArguments {
            name: "atan2".into(),
            provided: 1,
            expected: 2,
        }
    );
    assert_eq!(err.offset, 0);
}

#[test]
fn arity_too_many_respects_variadic_functions() {
    let ctx = rill_context::default_context();
    let err = compile("1 + sin(1, 2)", Some(ctx.as_ref()), ParseMode::Single).unwrap_err();
    assert_eq!(
        err.kind,
        ParseErrorKind::TooManyArguments {
            name: "sin".into(),
            provided: 2,
            expected: 1,
        }
    );
    assert_eq!(err.offset, 4);

    // min is variadic: any count from one up is fine.
    let expr = compile("min(5, 3, 9, 1)", Some(ctx.as_ref()), ParseMode::Single).unwrap();
    assert_eq!(expr.run(&bindings(&[])), number(1.0));
}

#[test]
fn call_arguments_allow_a_trailing_comma() {
    let expr = with_default("max(1, 2,)");
    assert_eq!(expr.run(&bindings(&[])), number(2.0));
}

#[test]
fn call_with_missing_separator_errors() {
    let ctx = rill_context::default_context();
    let err = compile("max(1 2)", Some(ctx.as_ref()), ParseMode::Single).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::ExpectedClosingParenOrComma);
}

#[test]
fn constants_resolve_before_variables_and_fold() {
    let mut ctx = Context::new();
    ctx.register_constant("WIDTH", Value::Number(128.0));
    let expr = compile("width / 2", Some(&ctx), ParseMode::Single).unwrap();
    assert_eq!(expr.debug_dump(), "(const 64)");
    assert!(expr.variables().is_empty());
}

#[test]
fn absent_mask_turns_a_constant_into_a_variable() {
    let mut root = Context::new();
    root.register_constant("LIMIT", Value::Number(10.0));
    let mut child = std::sync::Arc::new(root).derive();
    child.register_constant("LIMIT", None);

    let expr = compile("limit + 1", Some(&child), ParseMode::Single).unwrap();
    assert_eq!(expr.variables(), vec![("limit", 0)]);
    assert_eq!(expr.run(&bindings(&[("limit", number(4.0))])), number(5.0));
}

#[test]
fn custom_functions_and_nested_calls() {
    let mut ctx = Context::new();
    ctx.register_function(
        FunctionRef::from_fn(Arity::exact(2), |args| {
            Value::Number(args[0].to_number() - args[1].to_number() * 2.0)
        }),
        "my_func",
        false,
    );
    ctx.register_function(
        FunctionRef::from_fn(Arity::exact(1), |args| {
            let x = args[0].to_number();
            Value::Number(x * x * 2.0)
        }),
        "second_func",
        false,
    );
    let expr = compile("my_func(second_func(x), 5)", Some(&ctx), ParseMode::Single).unwrap();
    assert_eq!(expr.run(&bindings(&[("x", number(20.0))])), number(790.0));
}

#[test]
fn enclosed_mode_mixes_text_and_expressions() {
    let ctx = rill_context::default_context();
    let expr = compile(
        "Expression: [x / 4], done",
        Some(ctx.as_ref()),
        ParseMode::Enclosed,
    )
    .unwrap();
    assert_eq!(
        expr.run(&bindings(&[("x", number(10.0))])),
        string("Expression: 2.5, done")
    );
}

#[test]
fn enclosed_mode_requires_closing_brackets() {
    let err = compile("text [x + 1", None, ParseMode::Enclosed).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::ExpectedClosingBracket);
}

#[test]
fn enclosed_mode_empty_source_is_the_empty_string() {
    let expr = compile("", None, ParseMode::Enclosed).unwrap();
    assert_eq!(expr.run(&bindings(&[])), string(""));
}

#[test]
fn deep_nesting_is_a_resource_error_not_a_crash() {
    let mut source = "(".repeat(20_000);
    source.push('x');
    source.push_str(&")".repeat(20_000));
    let err = compile(&source, None, ParseMode::Single).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::NestedTooDeeply);
}

#[test]
fn lexical_errors_surface_through_compile() {
    let err = compile("1 + $", None, ParseMode::Single).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnexpectedSymbol { symbol: '$' });
    assert_eq!(err.offset, 4);

    let err = compile("'oops", None, ParseMode::Single).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnterminatedString);
}
