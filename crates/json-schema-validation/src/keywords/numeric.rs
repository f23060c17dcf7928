// Numeric keywords

use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

use super::{ErrorIterator, no_errors, single};
use crate::error::{ValidationError, ValidationErrorKind};
use crate::helpers::{compare, is_multiple_of};
use crate::validator::ValidationContext;

fn numbers<'a>(instance: &'a Value, limit: &'a Value) -> Option<(&'a Number, &'a Number)> {
    match (instance, limit) {
        (Value::Number(instance), Value::Number(limit)) => Some((instance, limit)),
        _ => None,
    }
}

fn below(instance: &Value, minimum: &Value, exclusive: bool) -> ErrorIterator<'static> {
    let Some((value, limit)) = numbers(instance, minimum) else {
        return no_errors();
    };
    let failed = match compare(value, limit) {
        Some(Ordering::Less) => true,
        Some(Ordering::Equal) => exclusive,
        _ => false,
    };
    if !failed {
        return no_errors();
    }
    single(ValidationError::new(
        ValidationErrorKind::Minimum {
            limit: minimum.clone(),
            exclusive,
        },
        instance,
    ))
}

fn above(instance: &Value, maximum: &Value, exclusive: bool) -> ErrorIterator<'static> {
    let Some((value, limit)) = numbers(instance, maximum) else {
        return no_errors();
    };
    let failed = match compare(value, limit) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Equal) => exclusive,
        _ => false,
    };
    if !failed {
        return no_errors();
    }
    single(ValidationError::new(
        ValidationErrorKind::Maximum {
            limit: maximum.clone(),
            exclusive,
        },
        instance,
    ))
}

/// `minimum` with the boolean `exclusiveMinimum` modifier
pub(crate) fn minimum_draft3_draft4<'a>(
    _ctx: &ValidationContext<'a>,
    minimum: &'a Value,
    instance: &'a Value,
    schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let exclusive = schema
        .get("exclusiveMinimum")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    below(instance, minimum, exclusive)
}

/// `maximum` with the boolean `exclusiveMaximum` modifier
pub(crate) fn maximum_draft3_draft4<'a>(
    _ctx: &ValidationContext<'a>,
    maximum: &'a Value,
    instance: &'a Value,
    schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let exclusive = schema
        .get("exclusiveMaximum")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    above(instance, maximum, exclusive)
}

pub(crate) fn minimum<'a>(
    _ctx: &ValidationContext<'a>,
    minimum: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    below(instance, minimum, false)
}

pub(crate) fn maximum<'a>(
    _ctx: &ValidationContext<'a>,
    maximum: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    above(instance, maximum, false)
}

pub(crate) fn exclusive_minimum<'a>(
    _ctx: &ValidationContext<'a>,
    minimum: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    below(instance, minimum, true)
}

pub(crate) fn exclusive_maximum<'a>(
    _ctx: &ValidationContext<'a>,
    maximum: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    above(instance, maximum, true)
}

/// `multipleOf`, and Draft 3's `divisibleBy`
pub(crate) fn multiple_of<'a>(
    _ctx: &ValidationContext<'a>,
    divisor: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let Some((value, by)) = numbers(instance, divisor) else {
        return no_errors();
    };
    if is_multiple_of(value, by) {
        return no_errors();
    }
    single(ValidationError::new(
        ValidationErrorKind::MultipleOf {
            multiple_of: divisor.clone(),
        },
        instance,
    ))
}
