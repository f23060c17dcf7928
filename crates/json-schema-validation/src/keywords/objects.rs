// Object keywords

use serde_json::{Map, Value};

use super::{ErrorIterator, failure, no_errors, single};
use crate::error::{EvaluationError, PathSegment, ValidationError, ValidationErrorKind};
use crate::helpers::as_count;
use crate::validator::ValidationContext;

pub(crate) fn properties<'a>(
    ctx: &ValidationContext<'a>,
    properties: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let (Some(object), Some(properties)) = (instance.as_object(), properties.as_object()) else {
        return no_errors();
    };
    let ctx = ctx.clone();
    Box::new(
        properties
            .iter()
            .filter_map(move |(name, subschema)| object.get(name).map(|value| (name, value, subschema)))
            .flat_map(move |(name, value, subschema)| {
                ctx.descend(
                    value,
                    subschema,
                    Some(PathSegment::Key(name.clone())),
                    Some(PathSegment::Key(name.clone())),
                )
            }),
    )
}

pub(crate) fn pattern_properties<'a>(
    ctx: &ValidationContext<'a>,
    patterns: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let (Some(object), Some(patterns)) = (instance.as_object(), patterns.as_object()) else {
        return no_errors();
    };
    let ctx = ctx.clone();
    Box::new(patterns.iter().flat_map(move |(pattern, subschema)| -> ErrorIterator<'a> {
        let regex = match ctx.regex(pattern) {
            Ok(regex) => regex,
            Err(error) => return failure(error),
        };
        let ctx = ctx.clone();
        Box::new(
            object
                .iter()
                .filter(move |(key, _)| regex.is_match(key))
                .flat_map(move |(key, value)| {
                    ctx.descend(
                        value,
                        subschema,
                        Some(PathSegment::Key(key.clone())),
                        Some(PathSegment::Key(pattern.clone())),
                    )
                }),
        )
    }))
}

// Instance properties matched by neither `properties` nor `patternProperties`.
fn find_additional<'a>(
    ctx: &ValidationContext<'a>,
    object: &'a Map<String, Value>,
    schema: &'a Map<String, Value>,
) -> Result<Vec<(&'a String, &'a Value)>, EvaluationError> {
    let properties = schema.get("properties").and_then(Value::as_object);
    let patterns = match schema.get("patternProperties").and_then(Value::as_object) {
        Some(patterns) => patterns
            .keys()
            .map(|pattern| ctx.regex(pattern))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    Ok(object
        .iter()
        .filter(|(key, _)| !properties.is_some_and(|properties| properties.contains_key(*key)))
        .filter(|(key, _)| !patterns.iter().any(|regex| regex.is_match(key)))
        .collect())
}

pub(crate) fn additional_properties<'a>(
    ctx: &ValidationContext<'a>,
    additional: &'a Value,
    instance: &'a Value,
    schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let Some(object) = instance.as_object() else {
        return no_errors();
    };
    let extras = match find_additional(ctx, object, schema) {
        Ok(extras) => extras,
        Err(error) => return failure(error),
    };

    match additional {
        Value::Object(_) => {
            let ctx = ctx.clone();
            Box::new(extras.into_iter().flat_map(move |(key, value)| {
                ctx.descend(value, additional, Some(PathSegment::Key(key.clone())), None)
            }))
        }
        Value::Bool(false) if !extras.is_empty() => {
            let mut unexpected: Vec<String> = extras.iter().map(|(key, _)| (*key).clone()).collect();
            let patterns = schema
                .get("patternProperties")
                .and_then(Value::as_object)
                .filter(|patterns| !patterns.is_empty())
                .map(|patterns| {
                    let mut patterns: Vec<String> = patterns.keys().cloned().collect();
                    patterns.sort();
                    unexpected.sort();
                    patterns
                });
            single(ValidationError::new(
                ValidationErrorKind::AdditionalProperties {
                    unexpected,
                    patterns,
                },
                instance,
            ))
        }
        _ => no_errors(),
    }
}

pub(crate) fn required<'a>(
    _ctx: &ValidationContext<'a>,
    required: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let (Some(object), Some(required)) = (instance.as_object(), required.as_array()) else {
        return no_errors();
    };
    Box::new(
        required
            .iter()
            .filter_map(Value::as_str)
            .filter(move |property| !object.contains_key(*property))
            .map(move |property| {
                Ok::<_, EvaluationError>(ValidationError::new(
                    ValidationErrorKind::Required {
                        property: property.to_string(),
                    },
                    instance,
                ))
            }),
    )
}

pub(crate) fn min_properties<'a>(
    _ctx: &ValidationContext<'a>,
    min: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    if let (Some(object), Some(limit)) = (instance.as_object(), as_count(min))
        && (object.len() as u64) < limit
    {
        return single(ValidationError::new(
            ValidationErrorKind::MinProperties { limit },
            instance,
        ));
    }
    no_errors()
}

pub(crate) fn max_properties<'a>(
    _ctx: &ValidationContext<'a>,
    max: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    if let (Some(object), Some(limit)) = (instance.as_object(), as_count(max))
        && (object.len() as u64) > limit
    {
        return single(ValidationError::new(
            ValidationErrorKind::MaxProperties { limit },
            instance,
        ));
    }
    no_errors()
}

pub(crate) fn missing_dependencies<'a>(
    property: &'a str,
    names: impl Iterator<Item = &'a str> + 'a,
    object: &'a Map<String, Value>,
    instance: &'a Value,
) -> ErrorIterator<'a> {
    Box::new(
        names
            .filter(move |name| !object.contains_key(*name))
            .map(move |name| {
                Ok::<_, EvaluationError>(ValidationError::new(
                    ValidationErrorKind::Dependency {
                        property: property.to_string(),
                        dependency: name.to_string(),
                    },
                    instance,
                ))
            }),
    )
}

/// Property dependencies (arrays of names) and schema dependencies
pub(crate) fn dependencies<'a>(
    ctx: &ValidationContext<'a>,
    dependencies: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let (Some(object), Some(dependencies)) = (instance.as_object(), dependencies.as_object()) else {
        return no_errors();
    };
    let ctx = ctx.clone();
    Box::new(
        dependencies
            .iter()
            .filter(move |(property, _)| object.contains_key(*property))
            .flat_map(move |(property, dependency)| match dependency {
                Value::Array(names) => missing_dependencies(
                    property,
                    names.iter().filter_map(Value::as_str),
                    object,
                    instance,
                ),
                _ => ctx.descend(
                    instance,
                    dependency,
                    None,
                    Some(PathSegment::Key(property.clone())),
                ),
            }),
    )
}

// Property names are validated as string instances; errors carry no instance path.
pub(crate) fn property_names<'a>(
    ctx: &ValidationContext<'a>,
    property_names: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let Some(object) = instance.as_object() else {
        return no_errors();
    };
    let ctx = ctx.clone();
    Box::new(object.keys().flat_map(move |key| {
        let name = Value::String(key.clone());
        let errors: Vec<_> = ctx.scoped().iter_errors(&name, property_names).collect();
        errors
    }))
}
