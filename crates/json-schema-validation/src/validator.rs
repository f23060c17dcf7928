// JSON Schema validation engine

use regex::Regex;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use crate::draft::{Dialect, Draft};
use crate::error::{EvaluationError, PathSegment, SchemaError, ValidationError, ValidationResult};
use crate::format::FormatChecker;
use crate::keywords::{ErrorIterator, failure, no_errors, single};
use crate::resolver::{RefResolutionError, RefResolver};
use crate::scope::ResolutionScope;
use crate::types::{TypeChecker, UnknownTypeError};

/// Validation context carried through one validation call.
///
/// Holds the validator and the current resolution scope. Cloning is cheap;
/// entering a new scope produces a new context and leaves this one alone.
#[derive(Clone)]
pub struct ValidationContext<'a> {
    validator: &'a Validator,
    scope: ResolutionScope,
}

impl<'a> ValidationContext<'a> {
    fn new(validator: &'a Validator, scope: ResolutionScope) -> Self {
        Self { validator, scope }
    }

    pub fn validator(&self) -> &'a Validator {
        self.validator
    }

    pub fn scope(&self) -> &ResolutionScope {
        &self.scope
    }

    /// The same context usable with shorter-lived instances and schemas
    pub fn scoped<'b>(&self) -> ValidationContext<'b>
    where
        'a: 'b,
    {
        ValidationContext {
            validator: self.validator,
            scope: self.scope.clone(),
        }
    }

    fn with_scope(&self, scope: ResolutionScope) -> Self {
        Self {
            validator: self.validator,
            scope,
        }
    }

    /// Validate `instance` against `schema`, lazily.
    pub fn iter_errors(&self, instance: &'a Value, schema: &'a Value) -> ErrorIterator<'a> {
        match self.validator.dialect.id_of(schema) {
            Some(id) => self
                .with_scope(self.scope.enter_id(id))
                .iter_keywords(instance, schema),
            None => self.iter_keywords(instance, schema),
        }
    }

    // Validate against `schema` in the current scope, ignoring any id it declares.
    fn iter_keywords(&self, instance: &'a Value, schema: &'a Value) -> ErrorIterator<'a> {
        let object = match schema {
            Value::Bool(true) => return no_errors(),
            Value::Bool(false) => return single(ValidationError::false_schema(instance)),
            Value::Object(object) => object,
            // Not a schema; nothing here constrains the instance.
            _ => return no_errors(),
        };

        if let Some(reference) = object.get("$ref") {
            return self.apply_keyword("$ref", reference, instance, object);
        }

        let ctx = self.clone();
        Box::new(
            object
                .iter()
                .flat_map(move |(keyword, value)| ctx.apply_keyword(keyword, value, instance, object)),
        )
    }

    fn apply_keyword(
        &self,
        keyword: &'a str,
        value: &'a Value,
        instance: &'a Value,
        schema: &'a Map<String, Value>,
    ) -> ErrorIterator<'a> {
        let Some(function) = self.validator.dialect.keyword(keyword) else {
            return no_errors();
        };
        let errors = function(self, value, instance, schema);
        Box::new(errors.map(move |item| {
            item.map(|mut error| {
                error.set_origin(keyword, value);
                if keyword != "$ref" {
                    error.prepend_schema_path(PathSegment::Key(keyword.to_string()));
                }
                error
            })
        }))
    }

    /// Validate a child of the current instance, prefixing error paths.
    ///
    /// `path` is prepended to instance paths, `schema_path` to schema paths.
    pub fn descend(
        &self,
        instance: &'a Value,
        schema: &'a Value,
        path: Option<PathSegment>,
        schema_path: Option<PathSegment>,
    ) -> ErrorIterator<'a> {
        let errors = self.iter_errors(instance, schema);
        if path.is_none() && schema_path.is_none() {
            return errors;
        }
        Box::new(errors.map(move |item| {
            item.map(|mut error| {
                if let Some(segment) = &path {
                    error.prepend_instance_path(segment.clone());
                }
                if let Some(segment) = &schema_path {
                    error.prepend_schema_path(segment.clone());
                }
                error
            })
        }))
    }

    /// Collect every error of [`descend`](Self::descend), stopping at the first evaluation failure.
    pub fn collect_errors(
        &self,
        instance: &'a Value,
        schema: &'a Value,
        schema_path: Option<PathSegment>,
    ) -> Result<Vec<ValidationError>, EvaluationError> {
        self.descend(instance, schema, None, schema_path).collect()
    }

    pub fn is_valid(&self, instance: &'a Value, schema: &'a Value) -> Result<bool, EvaluationError> {
        match self.iter_errors(instance, schema).next() {
            None => Ok(true),
            Some(Ok(_)) => Ok(false),
            Some(Err(error)) => Err(error),
        }
    }

    pub fn is_type(&self, instance: &Value, type_name: &str) -> Result<bool, EvaluationError> {
        Ok(self.validator.dialect.type_checker().is_type(instance, type_name)?)
    }

    pub fn format_checker(&self) -> Option<&'a FormatChecker> {
        self.validator.format_checker.as_ref()
    }

    /// Resolve `reference` against the current scope.
    pub fn resolve(&self, reference: &str) -> Result<(Url, Arc<Value>), RefResolutionError> {
        self.validator
            .resolver
            .resolve_against(self.scope.base(), reference)
    }

    /// Validate `instance` against the target of `reference`.
    ///
    /// The target is borrowed from the resolver and validated lazily in its
    /// own scope. Following the same reference again for the same instance
    /// is a cycle and yields nothing.
    pub(crate) fn follow(&self, reference: &str, instance: &'a Value) -> ErrorIterator<'a> {
        let validator = self.validator;
        let target = match validator.resolver.target(self.scope.base(), reference) {
            Ok(target) => target,
            Err(error) => return failure(error),
        };
        if self.scope.is_cycle(&target.url, instance) {
            tracing::debug!(reference = %target.url, "reference cycle, stopping here");
            return no_errors();
        }
        self.with_scope(self.scope.enter_ref(target.url, target.base, instance))
            .iter_keywords(instance, target.schema)
    }

    /// Compiled regex for `pattern`, cached per validator
    pub(crate) fn regex(&self, pattern: &str) -> Result<Regex, EvaluationError> {
        self.validator.regex(pattern)
    }
}

/// Lazy iterator over a validator's errors for one instance.
pub struct ErrorIter<'a> {
    inner: ErrorIterator<'a>,
}

impl Iterator for ErrorIter<'_> {
    type Item = Result<ValidationError, EvaluationError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// A schema bound to a dialect, ready to validate instances.
///
/// A validator is cheap to reuse but not `Sync`: it owns the resolver's
/// caches and its scope stack.
pub struct Validator {
    schema: Arc<Value>,
    dialect: Dialect,
    format_checker: Option<FormatChecker>,
    resolver: RefResolver,
    scope: Option<Url>,
    patterns: RefCell<HashMap<String, Regex>>,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("schema", &self.schema)
            .field("dialect", &self.dialect.name())
            .field("format_checker", &self.format_checker)
            .finish()
    }
}

impl Validator {
    /// Validator for `schema` under `draft`, with default options
    pub fn new(draft: Draft, schema: Value) -> Self {
        Self::options().draft(draft).build(schema)
    }

    pub fn options() -> ValidatorOptions {
        ValidatorOptions::default()
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn type_checker(&self) -> &TypeChecker {
        self.dialect.type_checker()
    }

    pub fn format_checker(&self) -> Option<&FormatChecker> {
        self.format_checker.as_ref()
    }

    pub fn resolver(&self) -> &RefResolver {
        &self.resolver
    }

    /// Check the bound schema against the dialect's metaschema
    pub fn validate_schema(&self) -> Result<(), SchemaError> {
        self.dialect.check_schema(&self.schema)
    }

    /// Lazily yield every error `instance` has against the bound schema
    pub fn iter_errors<'a>(&'a self, instance: &'a Value) -> ErrorIter<'a> {
        let base = self
            .scope
            .clone()
            .unwrap_or_else(|| self.resolver.resolution_scope());
        let ctx = ValidationContext::new(self, ResolutionScope::new(base));
        ErrorIter {
            inner: ctx.iter_errors(instance, &self.schema),
        }
    }

    /// Validate `instance`, reporting the first error found
    pub fn validate(&self, instance: &Value) -> ValidationResult<()> {
        match self.iter_errors(instance).next() {
            None => Ok(()),
            Some(Ok(error)) => Err(error.into()),
            Some(Err(error)) => Err(error.into()),
        }
    }

    /// Whether `instance` is valid.
    ///
    /// Stops at the first error. Evaluation failures count as invalid.
    pub fn is_valid(&self, instance: &Value) -> bool {
        match self.iter_errors(instance).next() {
            None => true,
            Some(Ok(_)) => false,
            Some(Err(error)) => {
                tracing::debug!(%error, "validation could not complete; treating instance as invalid");
                false
            }
        }
    }

    /// Check `instance` against a type name using this validator's type checker
    pub fn is_type(&self, instance: &Value, type_name: &str) -> Result<bool, UnknownTypeError> {
        self.dialect.type_checker().is_type(instance, type_name)
    }

    fn regex(&self, pattern: &str) -> Result<Regex, EvaluationError> {
        if let Some(regex) = self.patterns.borrow().get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern).map_err(|source| EvaluationError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.patterns
            .borrow_mut()
            .insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }
}

/// Builder for [`Validator`].
///
/// Without an explicit draft or dialect, the schema's `$schema` picks the
/// draft, falling back to the latest.
#[derive(Default)]
pub struct ValidatorOptions {
    dialect: Option<Dialect>,
    type_checker: Option<TypeChecker>,
    legacy_types: bool,
    format_checker: Option<FormatChecker>,
    resolver: Option<RefResolver>,
    scope: Option<Url>,
}

impl ValidatorOptions {
    pub fn draft(mut self, draft: Draft) -> Self {
        self.dialect = Some(draft.dialect());
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Replace the dialect's type checker
    pub fn type_checker(mut self, type_checker: TypeChecker) -> Self {
        self.type_checker = Some(type_checker);
        self
    }

    /// Use the fixed type table of older releases instead of the dialect's.
    ///
    /// Ignored when an explicit type checker is set.
    pub fn legacy_types(mut self, legacy: bool) -> Self {
        self.legacy_types = legacy;
        self
    }

    /// Enable `format` checking. Off by default.
    pub fn format_checker(mut self, format_checker: FormatChecker) -> Self {
        self.format_checker = Some(format_checker);
        self
    }

    pub fn resolver(mut self, resolver: RefResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Resolve the root schema's references against `scope` instead of the resolver's scope
    pub fn scope(mut self, scope: Url) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn build(self, schema: Value) -> Validator {
        self.build_shared(Arc::new(schema))
    }

    pub(crate) fn build_shared(self, schema: Arc<Value>) -> Validator {
        let dialect = self
            .dialect
            .unwrap_or_else(|| Draft::from_schema(&schema).unwrap_or_default().dialect());
        let dialect = match (self.type_checker, self.legacy_types) {
            (Some(type_checker), _) => dialect.with_type_checker(type_checker),
            (None, true) => dialect.with_type_checker(TypeChecker::legacy()),
            (None, false) => dialect,
        };
        let resolver = self
            .resolver
            .unwrap_or_else(|| RefResolver::from_shared(schema.clone(), dialect.id_reader()));

        tracing::trace!(dialect = dialect.name(), "building validator");
        Validator {
            schema,
            dialect,
            format_checker: self.format_checker,
            resolver,
            scope: self.scope,
            patterns: RefCell::new(HashMap::new()),
        }
    }
}

/// Validate `instance` against `schema` in one call.
///
/// The schema is checked against its metaschema first. Without an explicit
/// draft, `$schema` decides, falling back to the latest draft.
pub fn validate(instance: &Value, schema: &Value, draft: Option<Draft>) -> ValidationResult<()> {
    let draft = draft
        .or_else(|| Draft::from_schema(schema))
        .unwrap_or_default();
    draft.check_schema(schema)?;
    Validator::new(draft, schema.clone()).validate(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ValidationErrorKind};
    use serde_json::json;

    #[test]
    fn test_boolean_schemas() {
        let always = Validator::new(Draft::Draft6, json!(true));
        assert!(always.is_valid(&json!({"anything": [1, 2]})));

        let never = Validator::new(Draft::Draft6, json!(false));
        let errors: Vec<_> = never.iter_errors(&json!(1)).collect();
        assert_eq!(errors.len(), 1);
        let error = errors[0].as_ref().unwrap();
        assert_eq!(error.kind, ValidationErrorKind::FalseSchema);
        assert_eq!(error.keyword, None);
        assert!(error.schema_path.is_empty());
    }

    #[test]
    fn test_unknown_keywords_are_ignored() {
        let validator = Validator::new(Draft::Draft4, json!({"foo": {"type": "string"}, "x-note": 1}));
        assert!(validator.is_valid(&json!(12)));
    }

    #[test]
    fn test_ref_overrides_siblings() {
        let validator = Validator::new(
            Draft::Draft4,
            json!({
                "definitions": {"reffed": {"type": "array"}},
                "properties": {"foo": {"$ref": "#/definitions/reffed", "maxItems": 2}}
            }),
        );
        assert!(validator.is_valid(&json!({"foo": [1, 2, 3]})));
        assert!(!validator.is_valid(&json!({"foo": "string"})));
    }

    #[test]
    fn test_error_origin_and_paths() {
        let validator = Validator::new(
            Draft::Draft6,
            json!({"properties": {"foo": {"items": {"type": "string"}}}}),
        );
        let instance = json!({"foo": ["a", 2]});
        let error = validator.iter_errors(&instance).next().unwrap().unwrap();
        assert_eq!(error.keyword.as_deref(), Some("type"));
        assert_eq!(error.keyword_value, json!("string"));
        assert_eq!(error.instance, json!(2));
        assert_eq!(error.instance_path.to_json_pointer(), "/foo/1");
        assert_eq!(error.schema_path.to_json_pointer(), "/properties/foo/items/type");
    }

    #[test]
    fn test_iteration_is_lazy_and_restartable() {
        let validator = Validator::new(Draft::Draft6, json!({"minimum": 10, "multipleOf": 3}));
        let instance = json!(5);
        assert_eq!(validator.iter_errors(&instance).count(), 2);
        assert!(validator.iter_errors(&instance).next().is_some());
        assert_eq!(validator.iter_errors(&instance).count(), 2);
    }

    #[test]
    fn test_invalid_pattern_is_an_evaluation_error() {
        let validator = Validator::new(Draft::Draft4, json!({"pattern": "^(abc]"}));
        let first = validator.iter_errors(&json!("abc")).next().unwrap();
        assert!(matches!(first, Err(EvaluationError::InvalidPattern { .. })));
        assert!(!validator.is_valid(&json!("abc")));
        assert!(validator.is_valid(&json!(1)));
    }

    #[test]
    fn test_unknown_type_is_an_evaluation_error() {
        let validator = Validator::new(Draft::Draft4, json!({"type": "foo"}));
        let first = validator.iter_errors(&json!(1)).next().unwrap();
        assert!(matches!(first, Err(EvaluationError::UnknownType(_))));
        assert!(matches!(validator.validate(&json!(1)), Err(Error::Evaluation(_))));
    }

    #[test]
    fn test_options_pick_draft_from_schema() {
        let validator = Validator::options()
            .build(json!({"$schema": "http://json-schema.org/draft-04/schema#", "type": "integer"}));
        assert_eq!(validator.dialect().draft(), Some(Draft::Draft4));
        assert!(!validator.is_valid(&json!(1.0)));

        let latest = Validator::options().build(json!({"type": "integer"}));
        assert_eq!(latest.dialect().draft(), Some(Draft::Draft6));
        assert!(latest.is_valid(&json!(1.0)));
    }

    #[test]
    fn test_one_shot_validate_checks_schema_first() {
        let result = validate(&json!(1), &json!({"minItems": "1"}), Some(Draft::Draft4));
        assert!(matches!(result, Err(Error::Schema(_))));

        let result = validate(&json!("x"), &json!({"type": "integer"}), None);
        assert!(matches!(result, Err(Error::Validation(_))));

        validate(&json!(3), &json!({"type": "integer"}), None).unwrap();
    }
}
