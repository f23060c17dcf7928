//! Type checking for the `type` and `disallow` keywords.
//!
//! A [`TypeChecker`] maps type names to predicates. Checkers are immutable:
//! [`TypeChecker::redefine`] and friends return a new checker and leave the
//! original untouched.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A type predicate. Receives the checker it belongs to, so predicates may
/// defer to other types.
pub type TypeCheck = Arc<dyn Fn(&TypeChecker, &Value) -> bool + Send + Sync>;

/// Raised when asked about a type name the checker does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown type '{type_name}'")]
pub struct UnknownTypeError {
    pub type_name: String,
}

/// Registry of type name to predicate.
#[derive(Clone, Default)]
pub struct TypeChecker {
    checkers: HashMap<String, TypeCheck>,
}

impl fmt::Debug for TypeChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeChecker")
            .field("types", &self.type_names())
            .finish()
    }
}

impl TypeChecker {
    /// Create a checker that knows no types
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `instance` is of type `type_name`
    pub fn is_type(&self, instance: &Value, type_name: &str) -> Result<bool, UnknownTypeError> {
        match self.checkers.get(type_name) {
            Some(check) => Ok(check(self, instance)),
            None => Err(UnknownTypeError {
                type_name: type_name.to_string(),
            }),
        }
    }

    pub fn is_known(&self, type_name: &str) -> bool {
        self.checkers.contains_key(type_name)
    }

    /// Known type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.checkers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Return a new checker with `type_name` bound to `check`
    pub fn redefine<F>(&self, type_name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&TypeChecker, &Value) -> bool + Send + Sync + 'static,
    {
        let mut checkers = self.checkers.clone();
        checkers.insert(type_name.into(), Arc::new(check));
        Self { checkers }
    }

    /// Return a new checker with every given binding applied
    pub fn redefine_many<I, S>(&self, definitions: I) -> Self
    where
        I: IntoIterator<Item = (S, TypeCheck)>,
        S: Into<String>,
    {
        let mut checkers = self.checkers.clone();
        checkers.extend(
            definitions
                .into_iter()
                .map(|(name, check)| (name.into(), check)),
        );
        Self { checkers }
    }

    /// Return a new checker without the given types.
    ///
    /// Fails if any of them is unknown.
    pub fn remove<I, S>(&self, type_names: I) -> Result<Self, UnknownTypeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut checkers = self.checkers.clone();
        for name in type_names {
            let name = name.as_ref();
            if checkers.remove(name).is_none() {
                return Err(UnknownTypeError {
                    type_name: name.to_string(),
                });
            }
        }
        Ok(Self { checkers })
    }

    /// Draft 3 types, including `any`
    pub fn draft3() -> Self {
        Self::draft4().redefine("any", is_any)
    }

    /// Draft 4 types. Integers must be integral in representation.
    pub fn draft4() -> Self {
        Self::new().redefine_many(vec![
            ("array", check(is_array)),
            ("boolean", check(is_bool)),
            ("integer", check(is_integer)),
            ("object", check(is_object)),
            ("null", check(is_null)),
            ("number", check(is_number)),
            ("string", check(is_string)),
        ])
    }

    /// Draft 6 types: `integer` also accepts floats with no fractional part
    pub fn draft6() -> Self {
        Self::draft4().redefine("integer", |_, instance| {
            instance.is_i64()
                || instance.is_u64()
                || instance
                    .as_f64()
                    .is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        })
    }

    /// The fixed type table older releases used for every draft.
    ///
    /// Same as [`draft4`](Self::draft4): no `any`, and integers must be
    /// integral in representation. Selecting it changes Draft 3 (`any` is
    /// unknown) and Draft 6 (`1.0` is not an integer); Draft 4 is unaffected.
    pub fn legacy() -> Self {
        Self::draft4()
    }
}

fn check(predicate: fn(&TypeChecker, &Value) -> bool) -> TypeCheck {
    Arc::new(predicate)
}

fn is_any(_: &TypeChecker, _: &Value) -> bool {
    true
}

fn is_array(_: &TypeChecker, instance: &Value) -> bool {
    instance.is_array()
}

fn is_bool(_: &TypeChecker, instance: &Value) -> bool {
    instance.is_boolean()
}

fn is_integer(_: &TypeChecker, instance: &Value) -> bool {
    instance.is_i64() || instance.is_u64()
}

fn is_null(_: &TypeChecker, instance: &Value) -> bool {
    instance.is_null()
}

fn is_number(_: &TypeChecker, instance: &Value) -> bool {
    instance.is_number()
}

fn is_object(_: &TypeChecker, instance: &Value) -> bool {
    instance.is_object()
}

fn is_string(_: &TypeChecker, instance: &Value) -> bool {
    instance.is_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_booleans_are_not_numbers() {
        let checker = TypeChecker::draft4();
        assert!(!checker.is_type(&json!(true), "number").unwrap());
        assert!(!checker.is_type(&json!(false), "integer").unwrap());
        assert!(checker.is_type(&json!(true), "boolean").unwrap());
    }

    #[test]
    fn test_integer_per_draft() {
        assert!(!TypeChecker::draft4().is_type(&json!(1.0), "integer").unwrap());
        assert!(TypeChecker::draft6().is_type(&json!(1.0), "integer").unwrap());
        assert!(!TypeChecker::draft6().is_type(&json!(1.5), "integer").unwrap());
        assert!(TypeChecker::draft3().is_type(&json!(-4), "integer").unwrap());
    }

    #[test]
    fn test_any_only_in_draft3() {
        assert!(TypeChecker::draft3().is_type(&json!(null), "any").unwrap());
        assert!(!TypeChecker::draft4().is_known("any"));
        assert!(!TypeChecker::legacy().is_known("any"));
    }

    #[test]
    fn test_legacy_table_is_the_draft4_table() {
        let legacy = TypeChecker::legacy();
        assert_eq!(legacy.type_names(), TypeChecker::draft4().type_names());
        assert!(!legacy.is_type(&json!(1.0), "integer").unwrap());
        assert!(legacy.is_type(&json!(1), "integer").unwrap());
    }

    #[test]
    fn test_unknown_type() {
        let err = TypeChecker::draft6().is_type(&json!(1), "foo").unwrap_err();
        assert_eq!(err.type_name, "foo");
        assert_eq!(err.to_string(), "Unknown type 'foo'");
    }

    #[test]
    fn test_redefine_leaves_original_untouched() {
        let original = TypeChecker::draft4();
        let extended = original.redefine("number", |checker, instance| {
            checker.is_type(instance, "integer").unwrap_or(false)
                || instance.is_number()
                || instance.as_str().is_some_and(|s| s.parse::<f64>().is_ok())
        });
        assert!(extended.is_type(&json!("1.5"), "number").unwrap());
        assert!(!original.is_type(&json!("1.5"), "number").unwrap());
    }

    #[test]
    fn test_remove() {
        let checker = TypeChecker::draft6().remove(["null"]).unwrap();
        assert!(!checker.is_known("null"));
        assert!(TypeChecker::draft6().remove(["nope"]).is_err());
    }

    #[test]
    fn test_type_names_sorted() {
        assert_eq!(
            TypeChecker::draft4().type_names(),
            vec!["array", "boolean", "integer", "null", "number", "object", "string"]
        );
    }
}
