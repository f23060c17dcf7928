// String keywords

use serde_json::{Map, Value};

use super::{ErrorIterator, failure, no_errors, single};
use crate::error::{ValidationError, ValidationErrorKind};
use crate::helpers::{as_count, code_points};
use crate::validator::ValidationContext;

pub(crate) fn min_length<'a>(
    _ctx: &ValidationContext<'a>,
    min: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    if let (Some(text), Some(limit)) = (instance.as_str(), as_count(min))
        && code_points(text) < limit
    {
        return single(ValidationError::new(
            ValidationErrorKind::MinLength { limit },
            instance,
        ));
    }
    no_errors()
}

pub(crate) fn max_length<'a>(
    _ctx: &ValidationContext<'a>,
    max: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    if let (Some(text), Some(limit)) = (instance.as_str(), as_count(max))
        && code_points(text) > limit
    {
        return single(ValidationError::new(
            ValidationErrorKind::MaxLength { limit },
            instance,
        ));
    }
    no_errors()
}

// Unanchored search, as ECMA 262 patterns are.
pub(crate) fn pattern<'a>(
    ctx: &ValidationContext<'a>,
    pattern: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let (Some(text), Some(pattern)) = (instance.as_str(), pattern.as_str()) else {
        return no_errors();
    };
    match ctx.regex(pattern) {
        Ok(regex) if regex.is_match(text) => no_errors(),
        Ok(_) => single(ValidationError::new(
            ValidationErrorKind::Pattern {
                pattern: pattern.to_string(),
            },
            instance,
        )),
        Err(error) => failure(error),
    }
}
