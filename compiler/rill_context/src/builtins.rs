//! The default context's builtin functions.
//!
//! Math and string helpers over the `Value` model, all non-volatile and all
//! total: domain violations surface as NaN, never as errors. Argument
//! counts are validated by the parser against each [`Arity`]; the
//! implementations still treat missing arguments as `Null` so direct
//! `invoke` calls cannot panic.

use std::borrow::Cow;

use rill_ir::{Arity, FunctionRef, Value};

use crate::Context;

static NULL: Value = Value::Null;

fn arg<'a>(args: &'a [Value], index: usize) -> &'a Value {
    args.get(index).unwrap_or(&NULL)
}

fn num(args: &[Value], index: usize) -> f64 {
    arg(args, index).to_number()
}

fn text(args: &[Value], index: usize) -> Cow<'_, str> {
    arg(args, index).as_text()
}

/// Wrap a one-argument float function.
fn unary(f: fn(f64) -> f64) -> FunctionRef {
    FunctionRef::from_fn(Arity::exact(1), move |args| Value::Number(f(num(args, 0))))
}

/// Wrap a two-argument float function.
fn binary(f: fn(f64, f64) -> f64) -> FunctionRef {
    FunctionRef::from_fn(Arity::exact(2), move |args| {
        Value::Number(f(num(args, 0), num(args, 1)))
    })
}

/// Register every builtin plus the `PI` constant into `context`.
pub(crate) fn install(context: &mut Context) {
    context.register_functions(
        [
            ("sin", unary(f64::sin)),
            ("asin", unary(f64::asin)),
            ("cos", unary(f64::cos)),
            ("acos", unary(f64::acos)),
            ("tan", unary(f64::tan)),
            ("atan", unary(f64::atan)),
            ("atan2", binary(f64::atan2)),
            ("deg2rad", unary(f64::to_radians)),
            ("rad2deg", unary(f64::to_degrees)),
            ("abs", unary(f64::abs)),
            ("floor", unary(f64::floor)),
            ("ceil", unary(f64::ceil)),
            ("exp", unary(f64::exp)),
            ("sqrt", unary(f64::sqrt)),
            ("hypot", binary(f64::hypot)),
            ("ln", unary(f64::ln)),
            ("lg", unary(f64::log10)),
            ("log10", unary(f64::log10)),
            ("log", FunctionRef::from_fn(Arity::range(1, 2), log)),
            ("round", FunctionRef::from_fn(Arity::range(1, 2), round)),
            ("min", FunctionRef::from_fn(Arity::at_least(1), min)),
            ("max", FunctionRef::from_fn(Arity::at_least(1), max)),
            ("substr", FunctionRef::from_fn(Arity::range(2, 3), substr)),
            ("strlen", FunctionRef::from_fn(Arity::exact(1), strlen)),
            ("upper", FunctionRef::from_fn(Arity::exact(1), upper)),
            ("lower", FunctionRef::from_fn(Arity::exact(1), lower)),
            ("replace", FunctionRef::from_fn(Arity::exact(3), replace)),
            (
                "number_format",
                FunctionRef::from_fn(Arity::range(1, 4), number_format),
            ),
        ],
        false,
    );

    context.register_constant("PI", Value::Number(std::f64::consts::PI));
}

/// Natural logarithm, or logarithm to an arbitrary base with two arguments.
fn log(args: &[Value]) -> Value {
    let x = num(args, 0);
    let result = if args.len() > 1 {
        x.ln() / num(args, 1).ln()
    } else {
        x.ln()
    };
    Value::Number(result)
}

/// Round half away from zero, optionally to a digit precision.
fn round(args: &[Value]) -> Value {
    let x = num(args, 0);
    if args.len() > 1 {
        #[allow(clippy::cast_possible_truncation)]
        let precision = num(args, 1).trunc() as i32;
        let factor = 10f64.powi(precision);
        Value::Number((x * factor).round() / factor)
    } else {
        Value::Number(x.round())
    }
}

fn min(args: &[Value]) -> Value {
    pick(args, std::cmp::Ordering::Less)
}

fn max(args: &[Value]) -> Value {
    pick(args, std::cmp::Ordering::Greater)
}

/// First argument winning every loose comparison in `direction`.
/// Incomparable candidates (NaN) never replace the current best.
fn pick(args: &[Value], direction: std::cmp::Ordering) -> Value {
    let mut best = arg(args, 0);
    for candidate in args.iter().skip(1) {
        if candidate.loose_cmp(best) == Some(direction) {
            best = candidate;
        }
    }
    best.clone()
}

/// Character-based substring with negative offsets counting from the end.
fn substr(args: &[Value]) -> Value {
    let subject = text(args, 0);
    let chars: Vec<char> = subject.chars().collect();
    let total = chars.len() as i64;

    #[allow(clippy::cast_possible_truncation)]
    let mut start = num(args, 1).trunc() as i64;
    if start < 0 {
        start = (total + start).max(0);
    }
    if start >= total {
        return Value::Str(String::new());
    }

    let end = if args.len() > 2 {
        #[allow(clippy::cast_possible_truncation)]
        let len = num(args, 2).trunc() as i64;
        if len < 0 { total + len } else { start + len }
    } else {
        total
    };
    let end = end.clamp(start, total);

    #[allow(clippy::cast_sign_loss)]
    let slice: String = chars[start as usize..end as usize].iter().collect();
    Value::Str(slice)
}

/// Byte length of the string coercion.
fn strlen(args: &[Value]) -> Value {
    #[allow(clippy::cast_precision_loss)]
    Value::Number(text(args, 0).len() as f64)
}

fn upper(args: &[Value]) -> Value {
    Value::Str(text(args, 0).to_uppercase())
}

fn lower(args: &[Value]) -> Value {
    Value::Str(text(args, 0).to_lowercase())
}

/// `replace(search, replacement, subject)`.
fn replace(args: &[Value]) -> Value {
    let search = text(args, 0);
    let replacement = text(args, 1);
    let subject = text(args, 2);
    if search.is_empty() {
        return Value::Str(subject.into_owned());
    }
    Value::Str(subject.replace(search.as_ref(), replacement.as_ref()))
}

/// `number_format(n, decimals = 0, dec_point = ".", thousands_sep = ",")`.
fn number_format(args: &[Value]) -> Value {
    let n = num(args, 0);
    if !n.is_finite() {
        return Value::Str(rill_ir::format_number(n));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let decimals = num(args, 1).trunc().clamp(0.0, 64.0) as usize;
    let dec_point = if args.len() > 2 { text(args, 2).into_owned() } else { ".".to_owned() };
    let thousands_sep = if args.len() > 3 { text(args, 3).into_owned() } else { ",".to_owned() };

    let formatted = format!("{:.*}", decimals, n.abs());
    let rounds_to_zero = !formatted.bytes().any(|b| b.is_ascii_digit() && b != b'0');
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_owned(), Some(f.to_owned())),
        None => (formatted, None),
    };

    let mut grouped = String::new();
    let digits = int_part.as_bytes();
    for (i, b) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push_str(&thousands_sep);
        }
        grouped.push(*b as char);
    }

    let mut out = String::new();
    if n < 0.0 && !rounds_to_zero {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push_str(&dec_point);
        out.push_str(&frac);
    }
    Value::Str(out)
}
