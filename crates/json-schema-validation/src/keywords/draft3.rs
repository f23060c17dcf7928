// Keywords with Draft 3 semantics

use serde_json::{Map, Value, json};

use super::objects::missing_dependencies;
use super::{ErrorIterator, failure, no_errors, single};
use crate::error::{PathSegment, SchemaPath, ValidationError, ValidationErrorKind};
use crate::validator::ValidationContext;

fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// `type` with `any` and schema entries (union types)
pub(crate) fn type_<'a>(
    ctx: &ValidationContext<'a>,
    types: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let types = as_list(types);
    let mut all_errors = Vec::new();

    for (index, &entry) in types.iter().enumerate() {
        match entry {
            Value::String(name) if name == "any" => return no_errors(),
            Value::String(name) => match ctx.is_type(instance, name) {
                Ok(true) => return no_errors(),
                Ok(false) => {}
                Err(error) => return failure(error),
            },
            Value::Object(_) => {
                match ctx.collect_errors(instance, entry, Some(PathSegment::Index(index))) {
                    Ok(errors) if errors.is_empty() => return no_errors(),
                    Ok(errors) => all_errors.extend(errors),
                    Err(error) => return failure(error),
                }
            }
            _ => {}
        }
    }

    let expected = types.into_iter().cloned().collect();
    single(
        ValidationError::new(ValidationErrorKind::Type { expected }, instance)
            .with_context(all_errors),
    )
}

/// The inverse of `type`: fails when any listed type matches
pub(crate) fn disallow<'a>(
    ctx: &ValidationContext<'a>,
    disallow: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    let mut errors = Vec::new();
    for disallowed in as_list(disallow) {
        let as_type = json!({ "type": [disallowed] });
        match ctx.scoped().is_valid(instance, &as_type) {
            Ok(true) => errors.push(Ok(ValidationError::new(
                ValidationErrorKind::Disallowed {
                    disallowed: disallowed.clone(),
                },
                instance,
            ))),
            Ok(false) => {}
            Err(error) => {
                errors.push(Err(error));
                break;
            }
        }
    }
    Box::new(errors.into_iter())
}

pub(crate) fn extends<'a>(
    ctx: &ValidationContext<'a>,
    extends: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    match extends {
        Value::Object(_) => ctx.descend(instance, extends, None, None),
        Value::Array(parents) => {
            let ctx = ctx.clone();
            Box::new(parents.iter().enumerate().flat_map(move |(index, parent)| {
                ctx.descend(instance, parent, None, Some(PathSegment::Index(index)))
            }))
        }
        _ => no_errors(),
    }
}

/// `properties`, where a subschema's `"required": true` makes its property mandatory
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
    Box::new(properties.iter().flat_map(move |(property, subschema)| -> ErrorIterator<'a> {
        if let Some(value) = object.get(property) {
            return ctx.descend(
                value,
                subschema,
                Some(PathSegment::Key(property.clone())),
                Some(PathSegment::Key(property.clone())),
            );
        }
        match subschema.get("required") {
            Some(required @ Value::Bool(true)) => single(
                ValidationError::new(
                    ValidationErrorKind::Required {
                        property: property.clone(),
                    },
                    instance,
                )
                .with_keyword("required", required)
                .with_schema_path(SchemaPath::from(vec![
                    PathSegment::Key(property.clone()),
                    PathSegment::Key("required".to_string()),
                ])),
            ),
            _ => no_errors(),
        }
    }))
}

/// `dependencies`, where a dependency may also be a single property name
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
            .flat_map(move |(property, dependency)| -> ErrorIterator<'a> {
                match dependency {
                    Value::Object(_) => ctx.descend(
                        instance,
                        dependency,
                        None,
                        Some(PathSegment::Key(property.clone())),
                    ),
                    Value::String(name) => missing_dependencies(
                        property,
                        std::iter::once(name.as_str()),
                        object,
                        instance,
                    ),
                    Value::Array(names) => missing_dependencies(
                        property,
                        names.iter().filter_map(Value::as_str),
                        object,
                        instance,
                    ),
                    _ => no_errors(),
                }
            }),
    )
}
