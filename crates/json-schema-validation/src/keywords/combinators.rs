// Schema combinators: allOf, anyOf, oneOf, not

use serde_json::{Map, Value};

use super::{ErrorIterator, failure, no_errors, single};
use crate::error::{PathSegment, ValidationError, ValidationErrorKind};
use crate::validator::ValidationContext;

pub(crate) fn all_of<'a>(
    ctx: &ValidationContext<'a>,
    all_of: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let Some(branches) = all_of.as_array() else {
        return no_errors();
    };
    let ctx = ctx.clone();
    Box::new(branches.iter().enumerate().flat_map(move |(index, subschema)| {
        ctx.descend(instance, subschema, None, Some(PathSegment::Index(index)))
    }))
}

/// Branch errors become the context of the single `anyOf` error.
pub(crate) fn any_of<'a>(
    ctx: &ValidationContext<'a>,
    any_of: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let Some(branches) = any_of.as_array() else {
        return no_errors();
    };
    let mut all_errors = Vec::new();
    for (index, subschema) in branches.iter().enumerate() {
        match ctx.collect_errors(instance, subschema, Some(PathSegment::Index(index))) {
            Ok(errors) if errors.is_empty() => return no_errors(),
            Ok(errors) => all_errors.extend(errors),
            Err(error) => return failure(error),
        }
    }
    single(ValidationError::new(ValidationErrorKind::AnyOf, instance).with_context(all_errors))
}

pub(crate) fn one_of<'a>(
    ctx: &ValidationContext<'a>,
    one_of: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let Some(branches) = one_of.as_array() else {
        return no_errors();
    };

    let mut all_errors = Vec::new();
    let mut first_valid = None;
    for (index, subschema) in branches.iter().enumerate() {
        match ctx.collect_errors(instance, subschema, Some(PathSegment::Index(index))) {
            Ok(errors) if errors.is_empty() => {
                first_valid = Some(index);
                break;
            }
            Ok(errors) => all_errors.extend(errors),
            Err(error) => return failure(error),
        }
    }

    let Some(first) = first_valid else {
        return single(
            ValidationError::new(ValidationErrorKind::OneOfNotValid, instance)
                .with_context(all_errors),
        );
    };

    let mut valid = Vec::new();
    for subschema in &branches[first + 1..] {
        match ctx.is_valid(instance, subschema) {
            Ok(true) => valid.push(subschema.clone()),
            Ok(false) => {}
            Err(error) => return failure(error),
        }
    }
    if valid.is_empty() {
        return no_errors();
    }
    valid.insert(0, branches[first].clone());
    single(ValidationError::new(
        ValidationErrorKind::OneOfMultipleValid { valid },
        instance,
    ))
}

pub(crate) fn not<'a>(
    ctx: &ValidationContext<'a>,
    not_schema: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    match ctx.is_valid(instance, not_schema) {
        Ok(true) => single(ValidationError::new(
            ValidationErrorKind::Not {
                schema: not_schema.clone(),
            },
            instance,
        )),
        Ok(false) => no_errors(),
        Err(error) => failure(error),
    }
}
