//! Rill Parse - compile formula text into runnable expressions.
//!
//! The public entry point is [`compile`]: it turns a source string plus an
//! optional [`Context`](rill_context::Context) into a
//! [`CompiledExpression`], an immutable, optimized AST together with the
//! set of referenced variables, or a positioned
//! [`ParseError`](rill_diagnostic::ParseError).
//!
//! Compilation is single-threaded, synchronous and deterministic; its only
//! side effects are the compile-time invocations of non-volatile functions
//! on constant arguments. The result may be evaluated concurrently from
//! many threads, each with its own bindings.
//!
//! ```
//! use rill_context::default_context;
//! use rill_eval::Bindings;
//! use rill_ir::Value;
//! use rill_parse::{compile, ParseMode};
//!
//! let ctx = default_context();
//! let expr = compile("x ^ 2 + sqrt(y) * 4", Some(ctx.as_ref()), ParseMode::Single)?;
//! let mut vars = Bindings::default();
//! vars.insert("x".into(), Value::Number(3.0));
//! vars.insert("y".into(), Value::Number(4.0));
//! assert_eq!(expr.run(&vars), Value::Number(17.0));
//! # Ok::<(), rill_diagnostic::ParseError>(())
//! ```

mod compiled;
mod optimize;
mod parser;
mod stack;

#[cfg(test)]
mod tests;

pub use compiled::CompiledExpression;
pub use parser::{compile, ParseMode};
