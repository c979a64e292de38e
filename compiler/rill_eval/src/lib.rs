//! Rill Eval - Tree-walking evaluator.
//!
//! [`evaluate`] maps an AST node and a set of variable bindings to a
//! [`Value`] by structural recursion. Evaluation is pure (apart from
//! whatever registered callables do) and **total**: missing variables read
//! as `Null` and numeric domain issues produce NaN or signed infinities,
//! never errors. Cost is linear in node count; deep trees are handled by
//! growing the stack rather than by a depth limit, since there is no error
//! channel to report one through.
//!
//! The same entry point performs the optimizer's constant folding: a node
//! whose children are all constants references no variables, so folding is
//! just evaluation against empty bindings.

mod ops;
mod stack;

pub use ops::{apply_binary, apply_unary};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use rill_ir::{BinaryOp, Expr, Value};

/// Variable bindings for one evaluation. Keys are lower-case names.
pub type Bindings = FxHashMap<String, Value>;

/// Evaluate `expr` against `vars`.
pub fn evaluate(expr: &Expr, vars: &Bindings) -> Value {
    stack::ensure_sufficient_stack(|| match expr {
        Expr::Constant(value) => value.clone(),
        Expr::Variable(name) => vars.get(name).cloned().unwrap_or(Value::Null),
        Expr::Unary { op, operand } => ops::apply_unary(*op, &evaluate(operand, vars)),
        Expr::Binary { op, left, right } => match op {
            // `and`/`or` only evaluate the right operand when the left
            // does not already decide the result.
            BinaryOp::And => {
                let l = evaluate(left, vars);
                if l.truthy() { evaluate(right, vars) } else { l }
            }
            BinaryOp::Or => {
                let l = evaluate(left, vars);
                if l.truthy() { l } else { evaluate(right, vars) }
            }
            _ => ops::apply_binary(*op, &evaluate(left, vars), &evaluate(right, vars)),
        },
        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            if evaluate(condition, vars).truthy() {
                evaluate(then_branch, vars)
            } else {
                evaluate(else_branch, vars)
            }
        }
        Expr::Concat(parts) => {
            let mut out = String::new();
            for part in parts {
                out.push_str(&evaluate(part, vars).as_text());
            }
            Value::Str(out)
        }
        Expr::OrChain(parts) => {
            let mut result = Value::Str(String::new());
            for part in parts {
                result = evaluate(part, vars);
                if result.truthy() {
                    break;
                }
            }
            result
        }
        Expr::Call { function, args, .. } => {
            let values: SmallVec<[Value; 4]> =
                args.iter().map(|arg| evaluate(arg, vars)).collect();
            function.invoke(&values)
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use pretty_assertions::assert_eq;
    use rill_ir::{Arity, FunctionRef, UnaryOp};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_owned())
    }

    fn constant(value: impl Into<Value>) -> Expr {
        Expr::Constant(value.into())
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn bindings(pairs: &[(&str, Value)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn missing_variables_read_as_null() {
        let vars = Bindings::default();
        assert_eq!(evaluate(&var("x"), &vars), Value::Null);
        // Null coerces to 0 in arithmetic.
        let sum = binary(BinaryOp::Add, var("x"), constant(2.0));
        assert_eq!(evaluate(&sum, &vars), Value::Number(2.0));
    }

    #[test]
    fn arithmetic_coerces_operands() {
        let vars = bindings(&[("s", Value::Str("10".into())), ("b", Value::Bool(true))]);
        let sum = binary(BinaryOp::Add, var("s"), var("b"));
        assert_eq!(evaluate(&sum, &vars), Value::Number(11.0));
    }

    #[test]
    fn conditional_evaluates_only_the_selected_branch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let probe = FunctionRef::from_fn(Arity::exact(0), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Value::Number(1.0)
        });
        let tree = Expr::Conditional {
            condition: Box::new(constant(true)),
            then_branch: Box::new(constant("yes")),
            else_branch: Box::new(Expr::Call {
                function: probe,
                name: "probe".into(),
                args: vec![],
            }),
        };
        assert_eq!(evaluate(&tree, &Bindings::default()), Value::Str("yes".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn and_or_short_circuit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let probe = FunctionRef::from_fn(Arity::exact(0), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Value::Number(1.0)
        });
        let call = Expr::Call {
            function: probe,
            name: "probe".into(),
            args: vec![],
        };
        let and = binary(BinaryOp::And, constant(0.0), call.clone());
        assert_eq!(evaluate(&and, &Bindings::default()), Value::Number(0.0));
        let or = binary(BinaryOp::Or, constant(7.0), call);
        assert_eq!(evaluate(&or, &Bindings::default()), Value::Number(7.0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn or_chain_returns_first_truthy_else_last() {
        let vars = bindings(&[
            ("a", Value::Number(0.0)),
            ("b", Value::Str(String::new())),
            ("c", Value::Number(5.0)),
        ]);
        let chain = Expr::OrChain(vec![var("a"), var("b"), var("c")]);
        assert_eq!(evaluate(&chain, &vars), Value::Number(5.0));

        let vars = bindings(&[("a", Value::Number(0.0)), ("b", Value::Number(3.0))]);
        let chain = Expr::OrChain(vec![var("a"), var("b"), var("c")]);
        assert_eq!(evaluate(&chain, &vars), Value::Number(3.0));

        let all_falsy = Expr::OrChain(vec![var("a"), constant("")]);
        let vars = bindings(&[("a", Value::Number(0.0))]);
        assert_eq!(evaluate(&all_falsy, &vars), Value::Str(String::new()));
    }

    #[test]
    fn or_chain_stops_evaluating_after_a_truthy_operand() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let probe = FunctionRef::from_fn(Arity::exact(0), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Value::Number(9.0)
        });
        let chain = Expr::OrChain(vec![
            constant(4.0),
            Expr::Call {
                function: probe,
                name: "probe".into(),
                args: vec![],
            },
        ]);
        assert_eq!(evaluate(&chain, &Bindings::default()), Value::Number(4.0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn concat_coerces_every_part() {
        let vars = bindings(&[("n", Value::Number(5.0)), ("t", Value::Bool(true))]);
        let tree = Expr::Concat(vec![
            constant("n="),
            var("n"),
            constant(" t="),
            var("t"),
            var("missing"),
            Expr::Constant(Value::Bool(false)),
        ]);
        assert_eq!(evaluate(&tree, &vars), Value::Str("n=5 t=1".into()));
    }

    #[test]
    fn call_evaluates_arguments_left_to_right() {
        let f = FunctionRef::from_fn(Arity::at_least(0), |args| {
            let joined: Vec<String> = args.iter().map(|a| a.as_text().into_owned()).collect();
            Value::Str(joined.join("-"))
        });
        let tree = Expr::Call {
            function: f,
            name: "join".into(),
            args: vec![constant(1.0), constant(2.0), constant(3.0)],
        };
        assert_eq!(evaluate(&tree, &Bindings::default()), Value::Str("1-2-3".into()));
    }

    #[test]
    fn unary_through_the_tree() {
        let vars = bindings(&[("x", Value::Str("4".into()))]);
        let tree = Expr::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(var("x")),
        };
        assert_eq!(evaluate(&tree, &vars), Value::Number(-4.0));
    }

    #[test]
    fn deeply_nested_trees_do_not_overflow() {
        let mut tree = constant(0.0);
        for _ in 0..50_000 {
            tree = binary(BinaryOp::Add, tree, constant(1.0));
        }
        assert_eq!(evaluate(&tree, &Bindings::default()), Value::Number(50_000.0));
        // Dismantle iteratively: the automatic drop glue would recurse as
        // deep as the tree itself.
        while let Expr::Binary { left, .. } = tree {
            tree = *left;
        }
    }
}
