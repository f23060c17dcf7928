// Array keywords

use serde_json::{Map, Value};

use super::{ErrorIterator, failure, no_errors, single};
use crate::error::{PathSegment, ValidationError, ValidationErrorKind};
use crate::helpers::{as_count, has_duplicates};
use crate::validator::ValidationContext;

fn each_item<'a>(
    ctx: &ValidationContext<'a>,
    elements: &'a [Value],
    schema: &'a Value,
    skip: usize,
) -> ErrorIterator<'a> {
    let ctx = ctx.clone();
    Box::new(
        elements
            .iter()
            .enumerate()
            .skip(skip)
            .flat_map(move |(index, item)| {
                ctx.descend(item, schema, Some(PathSegment::Index(index)), None)
            }),
    )
}

fn positional<'a>(
    ctx: &ValidationContext<'a>,
    elements: &'a [Value],
    schemas: &'a [Value],
) -> ErrorIterator<'a> {
    let ctx = ctx.clone();
    Box::new(
        elements
            .iter()
            .zip(schemas)
            .enumerate()
            .flat_map(move |(index, (item, schema))| {
                ctx.descend(
                    item,
                    schema,
                    Some(PathSegment::Index(index)),
                    Some(PathSegment::Index(index)),
                )
            }),
    )
}

/// `items` as an object schema or a positional array
pub(crate) fn items_draft3_draft4<'a>(
    ctx: &ValidationContext<'a>,
    items: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let Some(elements) = instance.as_array() else {
        return no_errors();
    };
    match items {
        Value::Object(_) => each_item(ctx, elements, items, 0),
        Value::Array(schemas) => positional(ctx, elements, schemas),
        _ => no_errors(),
    }
}

/// `items` where booleans are schemas too
pub(crate) fn items<'a>(
    ctx: &ValidationContext<'a>,
    items: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let Some(elements) = instance.as_array() else {
        return no_errors();
    };
    match items {
        Value::Array(schemas) => positional(ctx, elements, schemas),
        Value::Object(_) | Value::Bool(_) => each_item(ctx, elements, items, 0),
        _ => no_errors(),
    }
}

// Only meaningful next to a positional `items` array.
pub(crate) fn additional_items<'a>(
    ctx: &ValidationContext<'a>,
    additional: &'a Value,
    instance: &'a Value,
    schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let (Some(elements), Some(Value::Array(items))) = (instance.as_array(), schema.get("items"))
    else {
        return no_errors();
    };
    let covered = items.len();
    match additional {
        Value::Object(_) => each_item(ctx, elements, additional, covered),
        Value::Bool(false) if elements.len() > covered => single(ValidationError::new(
            ValidationErrorKind::AdditionalItems {
                unexpected: elements[covered..].to_vec(),
            },
            instance,
        )),
        _ => no_errors(),
    }
}

pub(crate) fn min_items<'a>(
    _ctx: &ValidationContext<'a>,
    min: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    if let (Some(elements), Some(limit)) = (instance.as_array(), as_count(min))
        && (elements.len() as u64) < limit
    {
        return single(ValidationError::new(
            ValidationErrorKind::MinItems { limit },
            instance,
        ));
    }
    no_errors()
}

pub(crate) fn max_items<'a>(
    _ctx: &ValidationContext<'a>,
    max: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    if let (Some(elements), Some(limit)) = (instance.as_array(), as_count(max))
        && (elements.len() as u64) > limit
    {
        return single(ValidationError::new(
            ValidationErrorKind::MaxItems { limit },
            instance,
        ));
    }
    no_errors()
}

pub(crate) fn unique_items<'a>(
    _ctx: &ValidationContext<'a>,
    unique: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    if unique.as_bool() == Some(true)
        && let Some(elements) = instance.as_array()
        && has_duplicates(elements)
    {
        return single(ValidationError::new(
            ValidationErrorKind::UniqueItems,
            instance,
        ));
    }
    no_errors()
}

pub(crate) fn contains<'a>(
    ctx: &ValidationContext<'a>,
    contains: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let Some(elements) = instance.as_array() else {
        return no_errors();
    };
    for element in elements {
        match ctx.is_valid(element, contains) {
            Ok(true) => return no_errors(),
            Ok(false) => {}
            Err(error) => return failure(error),
        }
    }
    single(ValidationError::new(ValidationErrorKind::Contains, instance))
}
