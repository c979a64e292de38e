//! Parser, optimizer and end-to-end pipeline tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod parser;

use rill_context::{default_context, Context};
use rill_eval::Bindings;
use rill_ir::Value;

use crate::{compile, CompiledExpression, ParseMode};

/// Compile a single expression without any context.
fn bare(source: &str) -> CompiledExpression {
    compile(source, None, ParseMode::Single).unwrap()
}

/// Compile a single expression against the default context.
fn with_default(source: &str) -> CompiledExpression {
    let ctx = default_context();
    compile(source, Some(ctx.as_ref()), ParseMode::Single).unwrap()
}

/// A child of the default context with implicit concatenation enabled.
fn implicit_context() -> Context {
    let mut ctx = default_context().derive();
    ctx.set_implicit_concatenation(true);
    ctx
}

fn bindings(pairs: &[(&str, Value)]) -> Bindings {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_owned(), value.clone()))
        .collect()
}

fn number(n: f64) -> Value {
    Value::Number(n)
}

fn string(s: &str) -> Value {
    Value::Str(s.to_owned())
}
