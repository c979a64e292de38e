//! Construction-time rewrite rules.
//!
//! The optimizer is not a pass: every function here is a *constructor* that
//! the parser calls as soon as it has the operands for a compound node, and
//! each returns an already-simplified node. Rewrites only ever replace a
//! node wholesale or recurse through these same constructors, so a node is
//! immutable the moment a constructor returns it and re-running a
//! constructor over its own output is the identity.
//!
//! Every rule preserves observable behavior, including the NaN/infinity
//! edge cases: most prominently, multiplication by a constant zero is left
//! as a runtime multiply so a non-finite operand still poisons the result.
//!
//! Constant folding is literal evaluation: a node whose children are all
//! constants references no variables, so it is handed to `rill_eval`
//! against empty bindings and replaced by the resulting constant.

use rill_eval::{apply_unary, evaluate, Bindings};
use rill_ir::{BinaryOp, Expr, UnaryOp, Value};

/// Evaluate a node whose operands are known to be constants.
fn fold(expr: Expr) -> Expr {
    Expr::Constant(evaluate(&expr, &Bindings::default()))
}

fn boxed(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Remove a top-level numeric cast; arithmetic operators coerce anyway.
fn strip_num_cast(expr: Expr) -> Expr {
    match expr {
        Expr::Unary {
            op: UnaryOp::NumCast,
            operand,
        } => *operand,
        other => other,
    }
}

/// Build a unary node.
pub(crate) fn unary(op: UnaryOp, operand: Expr) -> Expr {
    if let Expr::Constant(value) = &operand {
        return Expr::Constant(apply_unary(op, value));
    }
    match (op, operand) {
        // A cast over a node that already has the target type is a no-op.
        (UnaryOp::NumCast, operand) if classify::is_numeric(&operand) => operand,
        (UnaryOp::BoolCast, operand) if classify::is_boolean(&operand) => operand,

        // `!!x` asks only for booleanness.
        (
            UnaryOp::Not,
            Expr::Unary {
                op: UnaryOp::Not,
                operand: inner,
            },
        ) => unary(UnaryOp::BoolCast, *inner),
        // `!` coerces its operand itself; an inner bool cast is noise.
        (
            UnaryOp::Not,
            Expr::Unary {
                op: UnaryOp::BoolCast,
                operand: inner,
            },
        ) => unary(UnaryOp::Not, *inner),
        // `!` over a comparison flips the comparison.
        (
            UnaryOp::Not,
            Expr::Binary {
                op: cmp,
                left,
                right,
            },
        ) if cmp.is_comparison() => match cmp.negated() {
            Some(flipped) => binary(flipped, *left, *right),
            None => Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(boxed(cmp, *left, *right)),
            },
        },

        (
            UnaryOp::Negate,
            Expr::Unary {
                op: UnaryOp::Negate,
                operand: inner,
            },
        ) => unary(UnaryOp::NumCast, *inner),
        (
            UnaryOp::Negate,
            Expr::Unary {
                op: UnaryOp::NumCast,
                operand: inner,
            },
        ) => unary(UnaryOp::Negate, *inner),

        (op, operand) => Expr::Unary {
            op,
            operand: Box::new(operand),
        },
    }
}

/// Build a binary node. `Or` is routed through [`or_chain`].
pub(crate) fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    if op == BinaryOp::Or {
        return or_chain(vec![left, right]);
    }

    let (left, right) = if op.is_arithmetic() {
        (strip_num_cast(left), strip_num_cast(right))
    } else {
        (left, right)
    };

    if left.is_constant() && right.is_constant() {
        return fold(boxed(op, left, right));
    }

    if let Expr::Constant(lv) = &left {
        match op {
            // Value-semantics `and`: a falsy left IS the result, a truthy
            // left defers entirely to the right operand.
            BinaryOp::And => {
                return if lv.truthy() { right } else { left };
            }
            // `false ^^ X` is X.
            BinaryOp::Xor if !lv.truthy() => return right,
            BinaryOp::Add | BinaryOp::Sub => {
                if lv.loose_eq(&Value::Number(0.0)) {
                    let cast = if op == BinaryOp::Add {
                        UnaryOp::NumCast
                    } else {
                        UnaryOp::Negate
                    };
                    return unary(cast, right);
                }
                // c1 +- (c2 +- x)  =>  (c1 +- c2) +- x
                if let Expr::Binary {
                    op: inner @ (BinaryOp::Add | BinaryOp::Sub),
                    left: inner_left,
                    right: inner_right,
                } = &right
                {
                    if let Expr::Constant(c2) = inner_left.as_ref() {
                        let constant = if op == BinaryOp::Add {
                            lv.to_number() + c2.to_number()
                        } else {
                            lv.to_number() - c2.to_number()
                        };
                        let outer = if *inner == op { BinaryOp::Add } else { BinaryOp::Sub };
                        let rest = inner_right.as_ref().clone();
                        return binary(outer, Expr::Constant(Value::Number(constant)), rest);
                    }
                }
            }
            BinaryOp::Mul => {
                if lv.loose_eq(&Value::Number(1.0)) {
                    return unary(UnaryOp::NumCast, right);
                }
                // c1 * (c2 */ x)  =>  (c1 * c2) */ x
                if let Expr::Binary {
                    op: inner @ (BinaryOp::Mul | BinaryOp::Div),
                    left: inner_left,
                    right: inner_right,
                } = &right
                {
                    if let Expr::Constant(c2) = inner_left.as_ref() {
                        let constant = lv.to_number() * c2.to_number();
                        let rest = inner_right.as_ref().clone();
                        return binary(*inner, Expr::Constant(Value::Number(constant)), rest);
                    }
                }
            }
            _ => {}
        }
    }

    if let Expr::Constant(rv) = &right {
        match op {
            BinaryOp::Add | BinaryOp::Sub => {
                if rv.loose_eq(&Value::Number(0.0)) {
                    return unary(UnaryOp::NumCast, left);
                }
                // (x +- c1) +- c2  =>  x +- (c1 +- c2)
                if let Expr::Binary {
                    op: inner @ (BinaryOp::Add | BinaryOp::Sub),
                    left: inner_left,
                    right: inner_right,
                } = &left
                {
                    if let Expr::Constant(c1) = inner_right.as_ref() {
                        let constant = if *inner == op {
                            c1.to_number() + rv.to_number()
                        } else {
                            c1.to_number() - rv.to_number()
                        };
                        let rest = inner_left.as_ref().clone();
                        return binary(*inner, rest, Expr::Constant(Value::Number(constant)));
                    }
                }
            }
            BinaryOp::Mul | BinaryOp::Div => {
                if rv.loose_eq(&Value::Number(1.0)) {
                    return unary(UnaryOp::NumCast, left);
                }
                // (x */ c1) */ c2  =>  x */ (c1 */ c2), with the division
                // of the two constants going through the runtime rule so a
                // zero divisor folds to the same NaN/infinity it would
                // produce when evaluated.
                if let Expr::Binary {
                    op: inner @ (BinaryOp::Mul | BinaryOp::Div),
                    left: inner_left,
                    right: inner_right,
                } = &left
                {
                    if let Expr::Constant(c1) = inner_right.as_ref() {
                        let rest = inner_left.as_ref().clone();
                        if *inner == op {
                            let constant = c1.to_number() * rv.to_number();
                            return binary(*inner, rest, Expr::Constant(Value::Number(constant)));
                        }
                        let (numerator, denominator) = if *inner == BinaryOp::Div {
                            // (x / c1) * c2  =>  x * (c2 / c1)
                            (rv.clone(), c1.clone())
                        } else {
                            // (x * c1) / c2  =>  x * (c1 / c2)
                            (c1.clone(), rv.clone())
                        };
                        let ratio = binary(
                            BinaryOp::Div,
                            Expr::Constant(numerator),
                            Expr::Constant(denominator),
                        );
                        return binary(BinaryOp::Mul, rest, ratio);
                    }
                }
            }
            BinaryOp::Pow => {
                if rv.loose_eq(&Value::Number(1.0)) {
                    return unary(UnaryOp::NumCast, left);
                }
                if rv.loose_eq(&Value::Number(-1.0)) {
                    return binary(BinaryOp::Div, Expr::Constant(Value::Number(1.0)), left);
                }
            }
            _ => {}
        }
    }

    if matches!(op, BinaryOp::Add | BinaryOp::Sub) {
        return match right {
            // x +- (-y)  =>  x -+ y
            Expr::Unary {
                op: UnaryOp::Negate,
                operand,
            } => {
                let flipped = if op == BinaryOp::Add {
                    BinaryOp::Sub
                } else {
                    BinaryOp::Add
                };
                binary(flipped, left, *operand)
            }
            // x + x  =>  x * 2
            right if op == BinaryOp::Add && left == right => {
                binary(BinaryOp::Mul, left, Expr::Constant(Value::Number(2.0)))
            }
            right => boxed(op, left, right),
        };
    }

    boxed(op, left, right)
}

/// Build an n-ary `|` chain: first truthy operand wins, else the last.
///
/// Nested chains flatten; a falsy constant anywhere but last is dropped; a
/// provably-true constant truncates the chain. A chain left with a single
/// operand is that operand.
pub(crate) fn or_chain(parts: Vec<Expr>) -> Expr {
    let mut flat = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            Expr::OrChain(sub) => flat.extend(sub),
            other => flat.push(other),
        }
    }

    let total = flat.len();
    let mut out: Vec<Expr> = Vec::with_capacity(total);
    for (index, part) in flat.into_iter().enumerate() {
        match classify::truthiness(&part) {
            Some(true) => {
                out.push(part);
                break;
            }
            Some(false) if index + 1 < total => {}
            _ => out.push(part),
        }
    }

    if out.len() == 1 {
        if let Some(single) = out.pop() {
            return single;
        }
    }
    if out.is_empty() {
        return Expr::Constant(Value::Str(String::new()));
    }
    Expr::OrChain(out)
}

/// Build a concatenation node.
///
/// Nested concatenations flatten, empty-string constants are dropped and
/// adjacent constants merge through string coercion. A single remaining
/// operand stands alone when it is provably a string; otherwise a
/// one-operand concatenation remains as the string cast it is.
pub(crate) fn concat(parts: Vec<Expr>) -> Expr {
    fn absorb(merged: &mut Vec<Expr>, part: Expr) {
        match part {
            Expr::Concat(sub) => {
                for inner in sub {
                    absorb(merged, inner);
                }
            }
            Expr::Constant(value) => {
                if matches!(&value, Value::Str(s) if s.is_empty()) {
                    return;
                }
                if let Some(Expr::Constant(previous)) = merged.last_mut() {
                    let mut joined = previous.as_text().into_owned();
                    joined.push_str(&value.as_text());
                    *previous = Value::Str(joined);
                    return;
                }
                merged.push(Expr::Constant(value));
            }
            other => merged.push(other),
        }
    }

    let mut merged = Vec::with_capacity(parts.len());
    for part in parts {
        absorb(&mut merged, part);
    }

    match merged.len() {
        0 => Expr::Constant(Value::Str(String::new())),
        1 => {
            let single = merged.swap_remove(0);
            match single {
                // A lone constant is the whole (string) result.
                Expr::Constant(value) => Expr::Constant(Value::Str(value.as_text().into_owned())),
                single if classify::is_string(&single) => single,
                other => Expr::Concat(vec![other]),
            }
        }
        _ => Expr::Concat(merged),
    }
}

/// Build a conditional node.
pub(crate) fn conditional(condition: Expr, then_branch: Expr, else_branch: Expr) -> Expr {
    // Pruning discards the condition entirely, so its truthiness must be
    // provable and it must not hide a call whose effects would be lost.
    if !classify::contains_call(&condition) {
        if let Some(known) = classify::truthiness(&condition) {
            return if known { then_branch } else { else_branch };
        }
        // Identical branches make the outcome independent of the condition.
        if then_branch == else_branch {
            return then_branch;
        }
    }

    let mut then_branch = then_branch;
    let mut else_branch = else_branch;

    // The conditional coerces its condition itself.
    let condition = match condition {
        Expr::Unary {
            op: UnaryOp::BoolCast,
            operand,
        } => *operand,
        other => other,
    };
    // Instead of negating the condition, swap the branches.
    let condition = match condition {
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => {
            std::mem::swap(&mut then_branch, &mut else_branch);
            *operand
        }
        other => other,
    };

    // `a ? a : b` keeps a truthy `a`, else `b`: exactly an or-chain.
    if then_branch == condition {
        return or_chain(vec![condition, else_branch]);
    }
    // `a ? b : a` keeps a falsy `a`, else `b`: exactly value-`and`.
    if else_branch == condition {
        return binary(BinaryOp::And, condition, then_branch);
    }

    Expr::Conditional {
        condition: Box::new(condition),
        then_branch: Box::new(then_branch),
        else_branch: Box::new(else_branch),
    }
}

/// Structural type/truthiness classification.
///
/// Answers are conservative: a wrong `unknown` only costs a missed rewrite,
/// while a wrong classification would change behavior. Rewrites that
/// discard a subtree on the strength of a truthiness answer must also check
/// [`classify::contains_call`] so they never drop a volatile invocation.
pub(crate) mod classify {
    use super::{BinaryOp, Expr, UnaryOp, Value};

    /// Does this node provably produce a boolean?
    pub(crate) fn is_boolean(expr: &Expr) -> bool {
        match expr {
            Expr::Constant(Value::Bool(_)) => true,
            Expr::Unary { op, .. } => matches!(op, UnaryOp::BoolCast | UnaryOp::Not),
            Expr::Binary { op, left, right } => {
                op.is_comparison()
                    || (*op == BinaryOp::And && is_boolean(left) && is_boolean(right))
            }
            Expr::OrChain(parts) => parts.iter().all(is_boolean),
            Expr::Conditional {
                then_branch,
                else_branch,
                ..
            } => is_boolean(then_branch) && is_boolean(else_branch),
            _ => false,
        }
    }

    /// Does this node provably produce a number?
    pub(crate) fn is_numeric(expr: &Expr) -> bool {
        match expr {
            Expr::Constant(Value::Number(_)) => true,
            Expr::Unary { op, .. } => matches!(op, UnaryOp::NumCast | UnaryOp::Negate),
            Expr::Binary { op, left, right } => {
                op.is_arithmetic()
                    || (*op == BinaryOp::And && is_numeric(left) && is_numeric(right))
            }
            Expr::OrChain(parts) => parts.iter().all(is_numeric),
            Expr::Conditional {
                then_branch,
                else_branch,
                ..
            } => is_numeric(then_branch) && is_numeric(else_branch),
            _ => false,
        }
    }

    /// Does this node provably produce a string?
    pub(crate) fn is_string(expr: &Expr) -> bool {
        match expr {
            Expr::Constant(Value::Str(_)) => true,
            Expr::Concat(_) => true,
            Expr::Binary { op, left, right } => match op {
                // Value-`and` returns one of its operands.
                BinaryOp::And => is_string(left) && is_string(right),
                // `xor` returns an operand or the empty string.
                BinaryOp::Xor => is_string(left) && is_string(right),
                _ => false,
            },
            Expr::OrChain(parts) => parts.iter().all(is_string),
            Expr::Conditional {
                then_branch,
                else_branch,
                ..
            } => is_string(then_branch) && is_string(else_branch),
            _ => false,
        }
    }

    /// Does any call node occur in this tree?
    ///
    /// Rewrites that would skip evaluating a subtree must keep it when it
    /// calls out: the callee may be volatile.
    pub(crate) fn contains_call(expr: &Expr) -> bool {
        match expr {
            Expr::Call { .. } => true,
            Expr::Constant(_) | Expr::Variable(_) => false,
            Expr::Unary { operand, .. } => contains_call(operand),
            Expr::Binary { left, right, .. } => contains_call(left) || contains_call(right),
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                contains_call(condition)
                    || contains_call(then_branch)
                    || contains_call(else_branch)
            }
            Expr::Concat(parts) | Expr::OrChain(parts) => parts.iter().any(contains_call),
        }
    }

    /// Static truthiness: `Some` only when provable without evaluation.
    pub(crate) fn truthiness(expr: &Expr) -> Option<bool> {
        match expr {
            Expr::Constant(value) => Some(value.truthy()),
            // A concatenation holding a non-empty constant segment cannot
            // produce an empty string.
            Expr::Concat(parts) => parts
                .iter()
                .any(|part| {
                    matches!(part, Expr::Constant(value) if !value.as_text().is_empty())
                })
                .then_some(true),
            _ => None,
        }
    }
}
