// Keywords that apply to every instance type

use serde_json::{Map, Value};

use super::{ErrorIterator, failure, no_errors, single};
use crate::error::{EvaluationError, ValidationError, ValidationErrorKind};
use crate::format::FormatCheckError;
use crate::helpers::json_equal;
use crate::validator::ValidationContext;

pub(crate) fn type_<'a>(
    ctx: &ValidationContext<'a>,
    types: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let names: Vec<&str> = match types {
        Value::String(name) => vec![name.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => return no_errors(),
    };

    for name in &names {
        match ctx.is_type(instance, name) {
            Ok(true) => return no_errors(),
            Ok(false) => {}
            Err(error) => return failure(error),
        }
    }

    let expected = names.iter().map(|name| Value::from(*name)).collect();
    single(ValidationError::new(
        ValidationErrorKind::Type { expected },
        instance,
    ))
}

pub(crate) fn enumeration<'a>(
    _ctx: &ValidationContext<'a>,
    options: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let Some(items) = options.as_array() else {
        return no_errors();
    };
    if items.iter().any(|option| json_equal(option, instance)) {
        return no_errors();
    }
    single(ValidationError::new(
        ValidationErrorKind::Enum {
            options: options.clone(),
        },
        instance,
    ))
}

pub(crate) fn constant<'a>(
    _ctx: &ValidationContext<'a>,
    expected: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    if json_equal(expected, instance) {
        return no_errors();
    }
    single(ValidationError::new(
        ValidationErrorKind::Const {
            expected: expected.clone(),
        },
        instance,
    ))
}

// Only checked when the validator has a format checker.
pub(crate) fn format<'a>(
    ctx: &ValidationContext<'a>,
    format: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let (Some(checker), Some(name)) = (ctx.format_checker(), format.as_str()) else {
        return no_errors();
    };
    match checker.check(instance, name) {
        Ok(()) => no_errors(),
        Err(FormatCheckError::Invalid(error)) => {
            let mut violation = ValidationError::new(
                ValidationErrorKind::Format {
                    format: name.to_string(),
                },
                instance,
            );
            violation.message = error.message;
            match error.cause {
                Some(cause) => single(violation.with_cause(cause)),
                None => single(violation),
            }
        }
        Err(FormatCheckError::Unhandled { format, source }) => {
            failure(EvaluationError::UnhandledFormat { format, source })
        }
    }
}
