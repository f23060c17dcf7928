//! Keyword implementations and per-draft keyword tables.
//!
//! Every keyword is a [`KeywordFn`]: it receives the validation context, the
//! keyword's value, the instance and the enclosing schema object, and
//! returns a lazy iterator of errors. The dispatcher fills in each error's
//! keyword and prepends the keyword to its schema path.

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::draft::Draft;
use crate::error::{EvaluationError, ValidationError};
use crate::validator::ValidationContext;

mod arrays;
mod combinators;
mod draft3;
mod generic;
mod numeric;
mod objects;
mod reference;
mod strings;

/// Lazy stream of validation errors. `Err` items mean evaluation itself failed.
pub type ErrorIterator<'a> =
    Box<dyn Iterator<Item = Result<ValidationError, EvaluationError>> + 'a>;

/// Signature shared by every keyword implementation
pub type KeywordFn = for<'a> fn(
    &ValidationContext<'a>,
    &'a Value,
    &'a Value,
    &'a Map<String, Value>,
) -> ErrorIterator<'a>;

/// Keyword name to implementation
pub type KeywordTable = HashMap<String, KeywordFn>;

/// No errors
pub fn no_errors<'a>() -> ErrorIterator<'a> {
    Box::new(std::iter::empty())
}

/// Exactly one error
pub fn single<'a>(error: ValidationError) -> ErrorIterator<'a> {
    Box::new(std::iter::once(Ok(error)))
}

/// Evaluation failed
pub fn failure<'a>(error: impl Into<EvaluationError>) -> ErrorIterator<'a> {
    Box::new(std::iter::once(Err(error.into())))
}

macro_rules! keyword_table {
    ($($name:literal => $function:path),* $(,)?) => {{
        let mut table = KeywordTable::new();
        $(table.insert($name.to_string(), $function as KeywordFn);)*
        table
    }};
}

static DRAFT3_KEYWORDS: Lazy<Arc<KeywordTable>> = Lazy::new(|| {
    Arc::new(keyword_table! {
        "$ref" => reference::reference,
        "additionalItems" => arrays::additional_items,
        "additionalProperties" => objects::additional_properties,
        "dependencies" => draft3::dependencies,
        "disallow" => draft3::disallow,
        "divisibleBy" => numeric::multiple_of,
        "enum" => generic::enumeration,
        "extends" => draft3::extends,
        "format" => generic::format,
        "items" => arrays::items_draft3_draft4,
        "maxItems" => arrays::max_items,
        "maxLength" => strings::max_length,
        "maximum" => numeric::maximum_draft3_draft4,
        "minItems" => arrays::min_items,
        "minLength" => strings::min_length,
        "minimum" => numeric::minimum_draft3_draft4,
        "pattern" => strings::pattern,
        "patternProperties" => objects::pattern_properties,
        "properties" => draft3::properties,
        "type" => draft3::type_,
        "uniqueItems" => arrays::unique_items,
    })
});

static DRAFT4_KEYWORDS: Lazy<Arc<KeywordTable>> = Lazy::new(|| {
    Arc::new(keyword_table! {
        "$ref" => reference::reference,
        "additionalItems" => arrays::additional_items,
        "additionalProperties" => objects::additional_properties,
        "allOf" => combinators::all_of,
        "anyOf" => combinators::any_of,
        "dependencies" => objects::dependencies,
        "enum" => generic::enumeration,
        "format" => generic::format,
        "items" => arrays::items_draft3_draft4,
        "maxItems" => arrays::max_items,
        "maxLength" => strings::max_length,
        "maxProperties" => objects::max_properties,
        "maximum" => numeric::maximum_draft3_draft4,
        "minItems" => arrays::min_items,
        "minLength" => strings::min_length,
        "minProperties" => objects::min_properties,
        "minimum" => numeric::minimum_draft3_draft4,
        "multipleOf" => numeric::multiple_of,
        "not" => combinators::not,
        "oneOf" => combinators::one_of,
        "pattern" => strings::pattern,
        "patternProperties" => objects::pattern_properties,
        "properties" => objects::properties,
        "required" => objects::required,
        "type" => generic::type_,
        "uniqueItems" => arrays::unique_items,
    })
});

static DRAFT6_KEYWORDS: Lazy<Arc<KeywordTable>> = Lazy::new(|| {
    Arc::new(keyword_table! {
        "$ref" => reference::reference,
        "additionalItems" => arrays::additional_items,
        "additionalProperties" => objects::additional_properties,
        "allOf" => combinators::all_of,
        "anyOf" => combinators::any_of,
        "const" => generic::constant,
        "contains" => arrays::contains,
        "dependencies" => objects::dependencies,
        "enum" => generic::enumeration,
        "exclusiveMaximum" => numeric::exclusive_maximum,
        "exclusiveMinimum" => numeric::exclusive_minimum,
        "format" => generic::format,
        "items" => arrays::items,
        "maxItems" => arrays::max_items,
        "maxLength" => strings::max_length,
        "maxProperties" => objects::max_properties,
        "maximum" => numeric::maximum,
        "minItems" => arrays::min_items,
        "minLength" => strings::min_length,
        "minProperties" => objects::min_properties,
        "minimum" => numeric::minimum,
        "multipleOf" => numeric::multiple_of,
        "oneOf" => combinators::one_of,
        "not" => combinators::not,
        "pattern" => strings::pattern,
        "patternProperties" => objects::pattern_properties,
        "properties" => objects::properties,
        "propertyNames" => objects::property_names,
        "required" => objects::required,
        "type" => generic::type_,
        "uniqueItems" => arrays::unique_items,
    })
});

/// The keyword table of `draft`
pub(crate) fn table(draft: Draft) -> Arc<KeywordTable> {
    match draft {
        Draft::Draft3 => DRAFT3_KEYWORDS.clone(),
        Draft::Draft4 => DRAFT4_KEYWORDS.clone(),
        Draft::Draft6 => DRAFT6_KEYWORDS.clone(),
    }
}
