// Value helpers shared by the keyword implementations

use serde_json::{Number, Value};
use std::cmp::Ordering;

fn as_i128(number: &Number) -> Option<i128> {
    number
        .as_i64()
        .map(i128::from)
        .or_else(|| number.as_u64().map(i128::from))
}

/// Numeric comparison across integer and float representations.
pub(crate) fn compare(left: &Number, right: &Number) -> Option<Ordering> {
    if let (Some(left), Some(right)) = (as_i128(left), as_i128(right)) {
        return Some(left.cmp(&right));
    }
    left.as_f64()?.partial_cmp(&right.as_f64()?)
}

/// JSON equality: `1` equals `1.0`, `true` never equals `1`.
pub(crate) fn json_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => compare(left, right) == Some(Ordering::Equal),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| json_equal(l, r))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, l)| right.get(key).is_some_and(|r| json_equal(l, r)))
        }
        _ => left == right,
    }
}

pub(crate) fn has_duplicates(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, item)| items[i + 1..].iter().any(|other| json_equal(item, other)))
}

/// Integer-valued schema limits such as `minLength: 2` or `minLength: 2.0`.
pub(crate) fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        _ => None,
    }
}

/// Divisibility check used by `multipleOf` and `divisibleBy`.
///
/// Integers use exact remainders. Otherwise the quotient must be finite and
/// integral.
pub(crate) fn is_multiple_of(value: &Number, divisor: &Number) -> bool {
    if let (Some(value), Some(divisor)) = (as_i128(value), as_i128(divisor)) {
        return divisor != 0 && value % divisor == 0;
    }
    match (value.as_f64(), divisor.as_f64()) {
        (Some(value), Some(divisor)) => {
            let quotient = value / divisor;
            quotient.is_finite() && quotient.trunc() == quotient
        }
        _ => false,
    }
}

/// Number of Unicode code points in `text`
pub(crate) fn code_points(text: &str) -> u64 {
    text.chars().count() as u64
}
