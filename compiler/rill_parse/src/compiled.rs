//! The product of compilation.
//!
//! A [`CompiledExpression`] owns its optimized AST exclusively plus the map
//! of variables the source referenced. It is immutable, cheap to evaluate
//! repeatedly, and safe to share across threads as long as each evaluation
//! brings its own bindings.

use rustc_hash::{FxHashMap, FxHashSet};

use rill_diagnostic::{ParseError, ParseErrorKind};
use rill_eval::{evaluate, Bindings};
use rill_ir::{format_number, Expr, UnaryOp, Value};

/// A parsed, optimized, ready-to-run expression.
#[derive(Clone, Debug)]
pub struct CompiledExpression {
    root: Expr,
    /// Lower-cased variable name -> first occurrence byte offset.
    variables: FxHashMap<String, u32>,
}

impl CompiledExpression {
    pub(crate) fn new(root: Expr, variables: FxHashMap<String, u32>) -> Self {
        CompiledExpression { root, variables }
    }

    /// Evaluate against one set of variable bindings.
    ///
    /// Never fails: unbound variables read as `Null` and numeric domain
    /// issues surface as NaN or signed infinities.
    pub fn run(&self, vars: &Bindings) -> Value {
        evaluate(&self.root, vars)
    }

    /// The optimized tree.
    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Every referenced variable with its first-occurrence byte offset,
    /// ordered by offset.
    pub fn variables(&self) -> Vec<(&str, u32)> {
        let mut list: Vec<(&str, u32)> = self
            .variables
            .iter()
            .map(|(name, &offset)| (name.as_str(), offset))
            .collect();
        list.sort_by_key(|&(_, offset)| offset);
        list
    }

    /// Check that every referenced variable is in `allowed`
    /// (case-insensitively).
    ///
    /// Fails with `UndefinedVariable` positioned at the earliest recorded
    /// first use of a name outside the set.
    pub fn check_variables<S: AsRef<str>>(&self, allowed: &[S]) -> Result<(), ParseError> {
        let allowed: FxHashSet<String> = allowed
            .iter()
            .map(|name| name.as_ref().to_lowercase())
            .collect();
        let mut offender: Option<(&String, u32)> = None;
        for (name, &offset) in &self.variables {
            if allowed.contains(name) {
                continue;
            }
            if offender.is_none_or(|(_, seen)| offset < seen) {
                offender = Some((name, offset));
            }
        }
        match offender {
            Some((name, offset)) => Err(ParseError::new(
                offset,
                ParseErrorKind::UndefinedVariable { name: name.clone() },
            )),
            None => Ok(()),
        }
    }

    /// Canonical re-serialization of the optimized tree, for debugging and
    /// tests.
    pub fn debug_dump(&self) -> String {
        dump(&self.root)
    }
}

fn dump(expr: &Expr) -> String {
    match expr {
        Expr::Constant(value) => dump_constant(value),
        Expr::Variable(name) => format!("{{{name}}}"),
        Expr::Unary { op, operand } => {
            let inner = dump(operand);
            match op {
                UnaryOp::Negate => format!("-{inner}"),
                UnaryOp::Not => format!("!{inner}"),
                UnaryOp::NumCast => format!("(NUM){inner}"),
                UnaryOp::BoolCast => format!("(BOOL){inner}"),
            }
        }
        Expr::Binary { op, left, right } => {
            format!("({} {} {})", dump(left), op.as_symbol(), dump(right))
        }
        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => format!(
            "({} ? {} : {})",
            dump(condition),
            dump(then_branch),
            dump(else_branch)
        ),
        Expr::Concat(parts) => format!("CONCAT({})", dump_list(parts)),
        Expr::OrChain(parts) => format!("ORCHAIN({})", dump_list(parts)),
        Expr::Call { name, args, .. } => format!("@{name}({})", dump_list(args)),
    }
}

fn dump_list(parts: &[Expr]) -> String {
    parts.iter().map(dump).collect::<Vec<_>>().join(", ")
}

fn dump_constant(value: &Value) -> String {
    match value {
        Value::Null => "(const NULL)".to_owned(),
        Value::Bool(true) => "(const TRUE)".to_owned(),
        Value::Bool(false) => "(const FALSE)".to_owned(),
        Value::Number(n) => format!("(const {})", format_number(*n)),
        Value::Str(s) => format!("\"{}\"", s.replace('"', "\"\"")),
    }
}
