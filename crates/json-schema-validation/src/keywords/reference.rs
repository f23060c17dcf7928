// $ref

use serde_json::{Map, Value};

use super::{ErrorIterator, no_errors};
use crate::validator::ValidationContext;

/// Validate against the referenced schema in the reference's own scope.
pub(crate) fn reference<'a>(
    ctx: &ValidationContext<'a>,
    reference: &'a Value,
    instance: &'a Value,
    _schema: &'a Map<String, Value>,
) -> ErrorIterator<'a> {
    match reference.as_str() {
        Some(reference) => ctx.follow(reference, instance),
        None => no_errors(),
    }
}
