//! Draft versions and dialects.
//!
//! A [`Dialect`] bundles everything that makes a validator flavor: its
//! metaschema, keyword table, default type checker and id keyword. The
//! three supported drafts each have a built-in dialect; [`Dialect::extend`]
//! derives new ones with extra or replaced keywords.

use once_cell::sync::Lazy;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::format::FormatChecker;
use crate::keywords::{self, KeywordFn, KeywordTable};
use crate::resolver::IdOf;
use crate::types::TypeChecker;
use crate::validator::Validator;

static DRAFT3_META_SCHEMA: Lazy<Arc<Value>> = Lazy::new(|| {
    Arc::new(
        serde_json::from_str(include_str!("../metaschemas/draft3.json"))
            .expect("Failed to parse embedded draft 3 metaschema"),
    )
});

static DRAFT4_META_SCHEMA: Lazy<Arc<Value>> = Lazy::new(|| {
    Arc::new(
        serde_json::from_str(include_str!("../metaschemas/draft4.json"))
            .expect("Failed to parse embedded draft 4 metaschema"),
    )
});

static DRAFT6_META_SCHEMA: Lazy<Arc<Value>> = Lazy::new(|| {
    Arc::new(
        serde_json::from_str(include_str!("../metaschemas/draft6.json"))
            .expect("Failed to parse embedded draft 6 metaschema"),
    )
});

/// Supported JSON Schema drafts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Draft {
    Draft3,
    Draft4,
    #[default]
    Draft6,
}

impl fmt::Display for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn id_keyword(schema: &Value) -> Option<&str> {
    schema.as_object()?.get("id")?.as_str()
}

fn dollar_id_keyword(schema: &Value) -> Option<&str> {
    schema.as_object()?.get("$id")?.as_str()
}

impl Draft {
    pub const ALL: [Draft; 3] = [Draft::Draft3, Draft::Draft4, Draft::Draft6];

    pub fn name(self) -> &'static str {
        match self {
            Draft::Draft3 => "draft3",
            Draft::Draft4 => "draft4",
            Draft::Draft6 => "draft6",
        }
    }

    /// The metaschema's own id
    pub fn meta_schema_uri(self) -> &'static str {
        match self {
            Draft::Draft3 => "http://json-schema.org/draft-03/schema#",
            Draft::Draft4 => "http://json-schema.org/draft-04/schema#",
            Draft::Draft6 => "http://json-schema.org/draft-06/schema#",
        }
    }

    pub fn meta_schema(self) -> &'static Value {
        match self {
            Draft::Draft3 => DRAFT3_META_SCHEMA.as_ref(),
            Draft::Draft4 => DRAFT4_META_SCHEMA.as_ref(),
            Draft::Draft6 => DRAFT6_META_SCHEMA.as_ref(),
        }
    }

    pub(crate) fn shared_meta_schema(self) -> Arc<Value> {
        match self {
            Draft::Draft3 => DRAFT3_META_SCHEMA.clone(),
            Draft::Draft4 => DRAFT4_META_SCHEMA.clone(),
            Draft::Draft6 => DRAFT6_META_SCHEMA.clone(),
        }
    }

    /// How this draft reads a schema's id (`id` before Draft 6, `$id` after)
    pub fn id_of(self) -> IdOf {
        match self {
            Draft::Draft3 | Draft::Draft4 => id_keyword,
            Draft::Draft6 => dollar_id_keyword,
        }
    }

    pub fn type_checker(self) -> TypeChecker {
        match self {
            Draft::Draft3 => TypeChecker::draft3(),
            Draft::Draft4 => TypeChecker::draft4(),
            Draft::Draft6 => TypeChecker::draft6(),
        }
    }

    /// Built-in format checks under this draft's names
    pub fn format_checker(self) -> FormatChecker {
        FormatChecker::for_draft(self)
    }

    pub fn dialect(self) -> Dialect {
        Dialect {
            name: self.name().to_string(),
            draft: Some(self),
            meta_schema: self.shared_meta_schema(),
            keywords: keywords::table(self),
            type_checker: self.type_checker(),
            id_of: self.id_of(),
        }
    }

    /// Draft named by a metaschema URI. A trailing empty fragment is ignored.
    pub fn from_meta_schema_uri(uri: &str) -> Option<Draft> {
        let wanted = uri.trim_end_matches('#');
        Draft::ALL
            .into_iter()
            .find(|draft| draft.meta_schema_uri().trim_end_matches('#') == wanted)
    }

    /// Draft declared by the schema's `$schema`, if it names a known draft
    pub fn from_schema(schema: &Value) -> Option<Draft> {
        let uri = schema.as_object()?.get("$schema")?.as_str()?;
        Draft::from_meta_schema_uri(uri)
    }

    /// Check `schema` against this draft's metaschema
    pub fn check_schema(self, schema: &Value) -> Result<(), SchemaError> {
        self.dialect().check_schema(schema)
    }

    /// Validator for `schema` under this draft, with no format checking
    pub fn validator(self, schema: Value) -> Validator {
        Validator::new(self, schema)
    }
}

/// A validator flavor: metaschema, keywords, types and id keyword.
#[derive(Clone)]
pub struct Dialect {
    name: String,
    draft: Option<Draft>,
    meta_schema: Arc<Value>,
    keywords: Arc<KeywordTable>,
    type_checker: TypeChecker,
    id_of: IdOf,
}

impl fmt::Debug for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keywords: Vec<&str> = self.keywords.keys().map(String::as_str).collect();
        keywords.sort_unstable();
        f.debug_struct("Dialect")
            .field("name", &self.name)
            .field("keywords", &keywords)
            .field("type_checker", &self.type_checker)
            .finish()
    }
}

impl Dialect {
    /// Create a dialect from scratch
    pub fn new(
        name: impl Into<String>,
        meta_schema: Value,
        keywords: KeywordTable,
        type_checker: TypeChecker,
        id_of: IdOf,
    ) -> Self {
        Self {
            name: name.into(),
            draft: None,
            meta_schema: Arc::new(meta_schema),
            keywords: Arc::new(keywords),
            type_checker,
            id_of,
        }
    }

    /// Derive a dialect with `keywords` added or replaced
    pub fn extend<I, S>(&self, name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = (S, KeywordFn)>,
        S: Into<String>,
    {
        let mut table = KeywordTable::clone(&self.keywords);
        table.extend(keywords.into_iter().map(|(name, f)| (name.into(), f)));
        Self {
            name: name.into(),
            draft: self.draft,
            meta_schema: self.meta_schema.clone(),
            keywords: Arc::new(table),
            type_checker: self.type_checker.clone(),
            id_of: self.id_of,
        }
    }

    /// Derive a dialect with a different default type checker
    pub fn with_type_checker(&self, type_checker: TypeChecker) -> Self {
        Self {
            type_checker,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The draft this dialect derives from, if any
    pub fn draft(&self) -> Option<Draft> {
        self.draft
    }

    pub fn meta_schema(&self) -> &Value {
        &self.meta_schema
    }

    pub fn type_checker(&self) -> &TypeChecker {
        &self.type_checker
    }

    pub fn keyword(&self, name: &str) -> Option<KeywordFn> {
        self.keywords.get(name).copied()
    }

    pub fn id_of<'v>(&self, schema: &'v Value) -> Option<&'v str> {
        (self.id_of)(schema)
    }

    pub(crate) fn id_reader(&self) -> IdOf {
        self.id_of
    }

    /// Check `schema` against this dialect's metaschema.
    ///
    /// The metaschema is evaluated with this dialect's own keywords and no
    /// format checking. Dialects derived from a draft evaluate it with that
    /// draft's types, whatever type checker they carry. Every violation is
    /// reported.
    pub fn check_schema(&self, schema: &Value) -> Result<(), SchemaError> {
        let meta_dialect = match self.draft {
            Some(draft) => self.with_type_checker(draft.type_checker()),
            None => self.clone(),
        };
        let meta = Validator::options()
            .dialect(meta_dialect)
            .build_shared(self.meta_schema.clone());
        let violations = meta
            .iter_errors(schema)
            .collect::<Result<Vec<_>, _>>()?;
        if violations.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            dialect = %self.name,
            violations = violations.len(),
            "schema failed its metaschema"
        );
        Err(SchemaError::from(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_metaschemas_parse() {
        for draft in Draft::ALL {
            assert!(draft.meta_schema().is_object(), "{} metaschema", draft);
        }
        assert_eq!(
            Draft::Draft6.meta_schema()["$id"],
            json!("http://json-schema.org/draft-06/schema#")
        );
    }

    #[test]
    fn test_from_schema() {
        assert_eq!(
            Draft::from_schema(&json!({"$schema": "http://json-schema.org/draft-03/schema#"})),
            Some(Draft::Draft3)
        );
        assert_eq!(
            Draft::from_schema(&json!({"$schema": "http://json-schema.org/draft-04/schema"})),
            Some(Draft::Draft4)
        );
        assert_eq!(Draft::from_schema(&json!({"$schema": "http://example.com/mine"})), None);
        assert_eq!(Draft::from_schema(&json!({})), None);
        assert_eq!(Draft::default(), Draft::Draft6);
    }

    #[test]
    fn test_id_keyword_per_draft() {
        let schema = json!({"id": "a", "$id": "b"});
        assert_eq!((Draft::Draft4.id_of())(&schema), Some("a"));
        assert_eq!((Draft::Draft6.id_of())(&schema), Some("b"));
        assert_eq!((Draft::Draft3.id_of())(&json!(true)), None);
    }

    #[test]
    fn test_dialect_id_borrows_from_the_schema() {
        let schema = json!({"$id": "http://example.com/root.json"});
        let id = {
            let dialect = Draft::Draft6.dialect();
            dialect.id_of(&schema)
        };
        assert_eq!(id, Some("http://example.com/root.json"));
    }

    #[test]
    fn test_metaschemas_are_valid_under_themselves() {
        for draft in Draft::ALL {
            draft.check_schema(draft.meta_schema()).unwrap();
        }
    }
}
