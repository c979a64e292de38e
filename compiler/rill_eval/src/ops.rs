//! Operator application over values.
//!
//! These functions are the single source of operator semantics: the
//! evaluator calls them at runtime and the optimizer calls them (through
//! whole-node evaluation) when folding constants, so both sides always
//! agree.
//!
//! Everything here is total. Division and modulo never raise on a zero
//! divisor:
//!
//! - `a / 0` is NaN when the numerator is NaN, non-numeric or zero, else a
//!   signed infinity following the numerator's sign.
//! - `a % 0` is NaN under the same numerator condition, else `0`. Modulo
//!   otherwise truncates both operands to integers and keeps the
//!   dividend's sign; a divisor that truncates to zero falls back to the
//!   by-zero rule.
//!
//! The logical operators use operand-value semantics: `and` yields the
//! left operand when falsy else the right, `or` the first truthy operand
//! else the last, `xor` the sole truthy operand (`""` when both are
//! truthy, the right operand when the left is falsy).

use std::cmp::Ordering;

use rill_ir::{BinaryOp, UnaryOp, Value};

/// Apply a unary operator to an evaluated operand.
pub fn apply_unary(op: UnaryOp, value: &Value) -> Value {
    match op {
        UnaryOp::Negate => Value::Number(-value.to_number()),
        UnaryOp::NumCast => Value::Number(value.to_number()),
        UnaryOp::BoolCast => Value::Bool(value.truthy()),
        UnaryOp::Not => Value::Bool(!value.truthy()),
    }
}

/// Apply a binary operator to evaluated operands.
///
/// `And`/`Or` are included for completeness; the evaluator short-circuits
/// them before reaching this function, with identical results.
pub fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => Value::Number(left.to_number() + right.to_number()),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => divide(left, right),
        BinaryOp::Mod => modulo(left, right),
        BinaryOp::Pow => Value::Number(left.to_number().powf(right.to_number())),
        BinaryOp::And => {
            if left.truthy() { right.clone() } else { left.clone() }
        }
        BinaryOp::Or => {
            if left.truthy() { left.clone() } else { right.clone() }
        }
        BinaryOp::Xor => {
            if left.truthy() {
                if right.truthy() { Value::Str(String::new()) } else { left.clone() }
            } else {
                right.clone()
            }
        }
        BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_eq(right)),
        BinaryOp::Gt => Value::Bool(left.loose_cmp(right) == Some(Ordering::Greater)),
        BinaryOp::GtEq => Value::Bool(matches!(
            left.loose_cmp(right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Lt => Value::Bool(left.loose_cmp(right) == Some(Ordering::Less)),
        BinaryOp::LtEq => Value::Bool(matches!(
            left.loose_cmp(right),
            Some(Ordering::Less | Ordering::Equal)
        )),
    }
}

/// NaN when the by-zero numerator cannot carry a sign, per the module docs.
fn zero_divisor_nan(numerator: &Value) -> bool {
    let n = numerator.to_number();
    n.is_nan() || !numerator.is_numeric() || n == 0.0
}

fn divide(left: &Value, right: &Value) -> Value {
    let divisor = right.to_number();
    if divisor == 0.0 {
        if zero_divisor_nan(left) {
            return Value::Number(f64::NAN);
        }
        let inf = if left.to_number() < 0.0 {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        return Value::Number(inf);
    }
    Value::Number(left.to_number() / divisor)
}

fn modulo(left: &Value, right: &Value) -> Value {
    let divisor = right.to_number().trunc();
    if divisor == 0.0 {
        if zero_divisor_nan(left) {
            return Value::Number(f64::NAN);
        }
        return Value::Number(0.0);
    }
    Value::Number(left.to_number().trunc() % divisor)
}
