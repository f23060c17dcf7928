// JSON Schema validation
//
// This crate validates JSON instances against JSON Schema Drafts 3, 4
// and 6, with pluggable type checking, format checking and `$ref`
// resolution.

pub mod draft;
pub mod error;
pub mod format;
mod helpers;
pub mod keywords;
pub mod resolver;
pub mod scope;
pub mod types;
pub mod validator;

pub use draft::{Dialect, Draft};
pub use error::{
    BoxError, Error, EvaluationError, InstancePath, PathSegment, SchemaError, SchemaPath,
    ValidationError, ValidationErrorKind, ValidationResult, best_match,
};
pub use format::{FormatCheckError, FormatChecker, FormatError, raises};
pub use resolver::{DEFAULT_BASE_URI, DefaultRetriever, RefResolutionError, RefResolver, Retrieve};
pub use types::{TypeChecker, UnknownTypeError};
pub use validator::{ErrorIter, ValidationContext, Validator, ValidatorOptions, validate};
