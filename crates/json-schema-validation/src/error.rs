// Error types for JSON Schema validation

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::resolver::RefResolutionError;
use crate::types::UnknownTypeError;

/// Boxed error returned by user-supplied callbacks (format checks, retrievers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared error cause attached to validation and evaluation errors.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, Error>;

/// Top-level error for the one-shot validation entry points.
#[derive(Debug, Error)]
pub enum Error {
    /// The instance violates the schema; carries the first error found.
    #[error(transparent)]
    Validation(Box<ValidationError>),

    /// The schema itself is not valid under its metaschema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Validation could not run to completion.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl From<ValidationError> for Error {
    fn from(error: ValidationError) -> Self {
        Error::Validation(Box::new(error))
    }
}

/// Errors that stop validation itself, as opposed to describing a violation.
///
/// These surface through the error iterator as `Err` items. `is_valid`
/// treats them as a failed validation.
#[derive(Debug, Clone, Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Resolution(#[from] RefResolutionError),

    #[error(transparent)]
    UnknownType(#[from] UnknownTypeError),

    /// A format checker raised an error it did not declare.
    #[error("format checker for '{format}' raised an undeclared error: {source}")]
    UnhandledFormat { format: String, source: SharedError },

    #[error("invalid regular expression '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Errors describing a schema that is not valid under its metaschema.
#[derive(Debug)]
pub enum SchemaError {
    /// The schema violates its metaschema. Never empty.
    Invalid { violations: Vec<ValidationError> },

    /// The metaschema check could not run to completion.
    Unevaluable(EvaluationError),
}

impl SchemaError {
    /// Every metaschema violation found, in evaluation order
    pub fn violations(&self) -> &[ValidationError] {
        match self {
            SchemaError::Invalid { violations } => violations,
            SchemaError::Unevaluable(_) => &[],
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Invalid { violations } => {
                let Some(first) = violations.first() else {
                    return write!(f, "Invalid schema");
                };
                write!(f, "Invalid schema: {} (at {})", first.message, first.schema_path)?;
                if violations.len() > 1 {
                    write!(f, " and {} more", violations.len() - 1)?;
                }
                Ok(())
            }
            SchemaError::Unevaluable(e) => write!(f, "Schema could not be checked: {}", e),
        }
    }
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchemaError::Invalid { violations } => violations
                .first()
                .map(|e| e as &(dyn std::error::Error + 'static)),
            SchemaError::Unevaluable(e) => Some(e),
        }
    }
}

impl From<Vec<ValidationError>> for SchemaError {
    fn from(violations: Vec<ValidationError>) -> Self {
        SchemaError::Invalid { violations }
    }
}

impl From<EvaluationError> for SchemaError {
    fn from(e: EvaluationError) -> Self {
        SchemaError::Unevaluable(e)
    }
}

/// The specific constraint a validation error reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ValidationErrorKind {
    /// The schema is the boolean `false`.
    FalseSchema,

    /// The instance matched none of the allowed types.
    ///
    /// Entries are type names, or whole schemas for Draft 3 union types.
    Type { expected: Vec<Value> },

    /// The instance matched a Draft 3 `disallow` entry.
    Disallowed { disallowed: Value },

    Required { property: String },

    Dependency { property: String, dependency: String },

    /// Extra properties were present. `patterns` is set when the schema
    /// declared `patternProperties`.
    AdditionalProperties {
        unexpected: Vec<String>,
        patterns: Option<Vec<String>>,
    },

    AdditionalItems { unexpected: Vec<Value> },

    Enum { options: Value },

    Const { expected: Value },

    Minimum { limit: Value, exclusive: bool },

    Maximum { limit: Value, exclusive: bool },

    MultipleOf { multiple_of: Value },

    MinLength { limit: u64 },

    MaxLength { limit: u64 },

    MinItems { limit: u64 },

    MaxItems { limit: u64 },

    MinProperties { limit: u64 },

    MaxProperties { limit: u64 },

    UniqueItems,

    Pattern { pattern: String },

    Format { format: String },

    AnyOf,

    OneOfNotValid,

    /// More than one `oneOf` branch matched; holds the matching subschemas.
    OneOfMultipleValid { valid: Vec<Value> },

    Not { schema: Value },

    Contains,

    /// Raised by a user-defined keyword.
    Custom { message: String },
}

impl ValidationErrorKind {
    /// Stable code for this kind of error
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationErrorKind::FalseSchema => "JS-1-01",
            ValidationErrorKind::Type { .. } => "JS-1-02",
            ValidationErrorKind::Disallowed { .. } => "JS-1-03",
            ValidationErrorKind::Required { .. } => "JS-1-04",
            ValidationErrorKind::Dependency { .. } => "JS-1-05",
            ValidationErrorKind::AdditionalProperties { .. } => "JS-1-06",
            ValidationErrorKind::AdditionalItems { .. } => "JS-1-07",
            ValidationErrorKind::Enum { .. } => "JS-1-08",
            ValidationErrorKind::Const { .. } => "JS-1-09",
            ValidationErrorKind::Minimum { .. } => "JS-1-10",
            ValidationErrorKind::Maximum { .. } => "JS-1-11",
            ValidationErrorKind::MultipleOf { .. } => "JS-1-12",
            ValidationErrorKind::MinLength { .. } => "JS-1-13",
            ValidationErrorKind::MaxLength { .. } => "JS-1-14",
            ValidationErrorKind::MinItems { .. } => "JS-1-15",
            ValidationErrorKind::MaxItems { .. } => "JS-1-16",
            ValidationErrorKind::MinProperties { .. } => "JS-1-17",
            ValidationErrorKind::MaxProperties { .. } => "JS-1-18",
            ValidationErrorKind::UniqueItems => "JS-1-19",
            ValidationErrorKind::Pattern { .. } => "JS-1-20",
            ValidationErrorKind::Format { .. } => "JS-1-21",
            ValidationErrorKind::AnyOf => "JS-1-22",
            ValidationErrorKind::OneOfNotValid => "JS-1-23",
            ValidationErrorKind::OneOfMultipleValid { .. } => "JS-1-24",
            ValidationErrorKind::Not { .. } => "JS-1-25",
            ValidationErrorKind::Contains => "JS-1-26",
            ValidationErrorKind::Custom { .. } => "JS-1-99",
        }
    }

    /// Human-readable message for this error against `instance`
    pub fn message(&self, instance: &Value) -> String {
        match self {
            ValidationErrorKind::FalseSchema => {
                format!("False schema does not allow {}", instance)
            }
            ValidationErrorKind::Type { expected } => {
                let names: Vec<String> = expected.iter().map(type_repr).collect();
                format!("{} is not of type {}", instance, names.join(", "))
            }
            ValidationErrorKind::Disallowed { disallowed } => {
                format!("{} is disallowed for {}", disallowed, instance)
            }
            ValidationErrorKind::Required { property } => {
                format!("{} is a required property", quoted(property))
            }
            ValidationErrorKind::Dependency {
                property,
                dependency,
            } => format!(
                "{} is a dependency of {}",
                quoted(dependency),
                quoted(property)
            ),
            ValidationErrorKind::AdditionalProperties {
                unexpected,
                patterns: None,
            } => {
                let unexpected: Vec<String> = unexpected.iter().map(|p| quoted(p)).collect();
                format!(
                    "Additional properties are not allowed ({} {} unexpected)",
                    unexpected.join(", "),
                    if unexpected.len() == 1 { "was" } else { "were" }
                )
            }
            ValidationErrorKind::AdditionalProperties {
                unexpected,
                patterns: Some(patterns),
            } => {
                let unexpected: Vec<String> = unexpected.iter().map(|p| quoted(p)).collect();
                let patterns: Vec<String> = patterns.iter().map(|p| quoted(p)).collect();
                format!(
                    "{} {} not match any of the regexes: {}",
                    unexpected.join(", "),
                    if unexpected.len() == 1 { "does" } else { "do" },
                    patterns.join(", ")
                )
            }
            ValidationErrorKind::AdditionalItems { unexpected } => {
                let items: Vec<String> = unexpected.iter().map(Value::to_string).collect();
                format!(
                    "Additional items are not allowed ({} {} unexpected)",
                    items.join(", "),
                    if items.len() == 1 { "was" } else { "were" }
                )
            }
            ValidationErrorKind::Enum { options } => {
                format!("{} is not one of {}", instance, options)
            }
            ValidationErrorKind::Const { expected } => format!("{} was expected", expected),
            ValidationErrorKind::Minimum { limit, exclusive } => format!(
                "{} is less than {}the minimum of {}",
                instance,
                if *exclusive { "or equal to " } else { "" },
                limit
            ),
            ValidationErrorKind::Maximum { limit, exclusive } => format!(
                "{} is greater than {}the maximum of {}",
                instance,
                if *exclusive { "or equal to " } else { "" },
                limit
            ),
            ValidationErrorKind::MultipleOf { multiple_of } => {
                format!("{} is not a multiple of {}", instance, multiple_of)
            }
            ValidationErrorKind::MinLength { .. } | ValidationErrorKind::MinItems { .. } => {
                format!("{} is too short", instance)
            }
            ValidationErrorKind::MaxLength { .. } | ValidationErrorKind::MaxItems { .. } => {
                format!("{} is too long", instance)
            }
            ValidationErrorKind::MinProperties { .. } => {
                format!("{} does not have enough properties", instance)
            }
            ValidationErrorKind::MaxProperties { .. } => {
                format!("{} has too many properties", instance)
            }
            ValidationErrorKind::UniqueItems => format!("{} has non-unique elements", instance),
            ValidationErrorKind::Pattern { pattern } => {
                format!("{} does not match {}", instance, quoted(pattern))
            }
            ValidationErrorKind::Format { format } => {
                format!("{} is not a {}", instance, quoted(format))
            }
            ValidationErrorKind::AnyOf | ValidationErrorKind::OneOfNotValid => {
                format!("{} is not valid under any of the given schemas", instance)
            }
            ValidationErrorKind::OneOfMultipleValid { valid } => {
                let valid: Vec<String> = valid.iter().map(Value::to_string).collect();
                format!("{} is valid under each of {}", instance, valid.join(", "))
            }
            ValidationErrorKind::Not { schema } => {
                format!("{} is not allowed for {}", schema, instance)
            }
            ValidationErrorKind::Contains => {
                format!("None of {} are valid under the given schema", instance)
            }
            ValidationErrorKind::Custom { message } => message.clone(),
        }
    }
}

fn quoted(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

// Draft 3 union types may name a schema; prefer its "name" when present.
fn type_repr(expected: &Value) -> String {
    match expected.get("name") {
        Some(name) => name.to_string(),
        None => expected.to_string(),
    }
}

/// A single violation of a schema by an instance.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// What went wrong
    pub kind: ValidationErrorKind,
    /// The error message
    pub message: String,
    /// Path from the root instance to the failing value (e.g., ["items", 0])
    pub instance_path: InstancePath,
    /// Path from the root schema to the failing keyword (e.g., ["properties", "foo", "type"])
    pub schema_path: SchemaPath,
    /// The keyword that failed; `None` for a `false` schema
    pub keyword: Option<String>,
    /// The failing keyword's value in the schema
    pub keyword_value: Value,
    /// The instance value that failed
    pub instance: Value,
    /// Per-branch errors for `anyOf`, `oneOf` and Draft 3 `type`
    pub context: Vec<ValidationError>,
    /// Underlying error, e.g. from a format checker
    pub cause: Option<SharedError>,
    origin_set: bool,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Validation error at {}: {}",
            self.instance_path, self.message
        )
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl ValidationError {
    /// Create a new validation error for `instance`
    pub fn new(kind: ValidationErrorKind, instance: &Value) -> Self {
        let message = kind.message(instance);
        Self {
            kind,
            message,
            instance_path: InstancePath::new(),
            schema_path: SchemaPath::new(),
            keyword: None,
            keyword_value: Value::Null,
            instance: instance.clone(),
            context: Vec::new(),
            cause: None,
            origin_set: false,
        }
    }

    /// Error for a `false` schema. Its keyword stays unset.
    pub fn false_schema(instance: &Value) -> Self {
        let mut error = Self::new(ValidationErrorKind::FalseSchema, instance);
        error.origin_set = true;
        error
    }

    /// Set the failing keyword explicitly.
    ///
    /// Once set, the keyword is not overwritten as the error bubbles up
    /// through the schema.
    pub fn with_keyword(mut self, keyword: impl Into<String>, value: &Value) -> Self {
        self.keyword = Some(keyword.into());
        self.keyword_value = value.clone();
        self.origin_set = true;
        self
    }

    /// Set the schema path for this error
    pub fn with_schema_path(mut self, schema_path: SchemaPath) -> Self {
        self.schema_path = schema_path;
        self
    }

    pub fn with_context(mut self, context: Vec<ValidationError>) -> Self {
        self.context = context;
        self
    }

    pub fn with_cause(mut self, cause: SharedError) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Get the error code
    pub fn error_code(&self) -> &'static str {
        self.kind.error_code()
    }

    pub(crate) fn set_origin(&mut self, keyword: &str, value: &Value) {
        if !self.origin_set {
            self.keyword = Some(keyword.to_string());
            self.keyword_value = value.clone();
            self.origin_set = true;
        }
    }

    pub(crate) fn prepend_instance_path(&mut self, segment: PathSegment) {
        for child in &mut self.context {
            child.prepend_instance_path(segment.clone());
        }
        self.instance_path.push_front(segment);
    }

    pub(crate) fn prepend_schema_path(&mut self, segment: PathSegment) {
        for child in &mut self.context {
            child.prepend_schema_path(segment.clone());
        }
        self.schema_path.push_front(segment);
    }

    /// Structured JSON form of this error, context included
    pub fn to_json(&self) -> Value {
        json!({
            "code": self.error_code(),
            "kind": serde_json::to_value(&self.kind).unwrap_or(Value::Null),
            "message": self.message,
            "instance_path": self.instance_path.to_json_pointer(),
            "schema_path": self.schema_path.to_json_pointer(),
            "keyword": self.keyword,
            "context": self.context.iter().map(ValidationError::to_json).collect::<Vec<_>>(),
        })
    }

    fn relevance(&self) -> (isize, bool) {
        let weak = matches!(self.keyword.as_deref(), Some("anyOf" | "oneOf"));
        (-(self.instance_path.len() as isize), !weak)
    }
}

/// Pick the error most likely to explain why an instance failed.
///
/// Shallow errors beat deep ones and `anyOf`/`oneOf` failures rank below
/// everything else. When the winner carries context, the best context
/// error is chosen, recursively.
pub fn best_match<I>(errors: I) -> Option<ValidationError>
where
    I: IntoIterator<Item = ValidationError>,
{
    let mut best: Option<ValidationError> = None;
    for error in errors {
        match &best {
            Some(current) if error.relevance() <= current.relevance() => {}
            _ => best = Some(error),
        }
    }

    let mut best = best?;
    while !best.context.is_empty() {
        let context = std::mem::take(&mut best.context);
        let mut chosen: Option<ValidationError> = None;
        for error in context {
            match &chosen {
                Some(current) if error.relevance() >= current.relevance() => {}
                _ => chosen = Some(error),
            }
        }
        match chosen {
            Some(error) => best = error,
            None => break,
        }
    }
    Some(best)
}

/// Instance path (e.g., ["items", 0, "name"])
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstancePath {
    segments: Vec<PathSegment>,
}

impl InstancePath {
    /// Create a new empty instance path
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Push a key segment onto the path
    pub fn push_key(&mut self, key: impl Into<String>) {
        self.segments.push(PathSegment::Key(key.into()));
    }

    /// Push an index segment onto the path
    pub fn push_index(&mut self, index: usize) {
        self.segments.push(PathSegment::Index(index));
    }

    pub fn push_front(&mut self, segment: PathSegment) {
        self.segments.insert(0, segment);
    }

    /// Get the segments as a slice
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Check if the path is empty
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Get the length of the path
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// RFC 6901 rendering, e.g. `/items/0/name`
    pub fn to_json_pointer(&self) -> String {
        json_pointer(&self.segments)
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "(root)")
        } else {
            for (i, segment) in self.segments.iter().enumerate() {
                if i > 0 {
                    write!(f, ".")?;
                }
                write!(f, "{}", segment)?;
            }
            Ok(())
        }
    }
}

impl From<Vec<PathSegment>> for InstancePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }
}

/// Schema path (e.g., ["properties", "foo", "items", 0, "type"])
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaPath {
    segments: Vec<PathSegment>,
}

impl SchemaPath {
    /// Create a new empty schema path
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Push a segment onto the path
    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.segments.push(segment.into());
    }

    pub fn push_front(&mut self, segment: PathSegment) {
        self.segments.insert(0, segment);
    }

    /// Get the segments as a slice
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Check if the path is empty
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Get the length of the path
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// RFC 6901 rendering, e.g. `/properties/foo/type`
    pub fn to_json_pointer(&self) -> String {
        json_pointer(&self.segments)
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "(root)")
        } else {
            let parts: Vec<String> = self.segments.iter().map(PathSegment::raw).collect();
            write!(f, "{}", parts.join(" > "))
        }
    }
}

impl From<Vec<PathSegment>> for SchemaPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }
}

fn json_pointer(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(|segment| format!("/{}", segment.raw().replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// A segment in an instance or schema path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key
    Key(String),
    /// Array index
    Index(usize),
}

impl PathSegment {
    fn raw(&self) -> String {
        match self {
            PathSegment::Key(key) => key.clone(),
            PathSegment::Index(index) => index.to_string(),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}
