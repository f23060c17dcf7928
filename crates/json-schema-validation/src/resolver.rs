//! `$ref` resolution.
//!
//! A [`RefResolver`] turns reference strings into schema values. It owns a
//! store of known documents keyed by URI (seeded with the draft
//! metaschemas, the root document and every subschema that declares its own
//! id), a cache of resolved URLs, and a stack of resolution scopes.
//!
//! Documents that are not in the store are fetched through a [`Retrieve`]
//! implementation. The default retriever only reads `file://` URIs.

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::draft::Draft;
use crate::error::{BoxError, SharedError};

/// Base URI for schemas that do not declare one
pub const DEFAULT_BASE_URI: &str = "json-schema:///";

static DEFAULT_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse(DEFAULT_BASE_URI).expect("default base URI is valid"));

/// Reads the id a schema declares (`id` or `$id` depending on the draft).
pub type IdOf = fn(&Value) -> Option<&str>;

#[derive(Debug, Clone, Error)]
pub enum RefResolutionError {
    #[error("invalid reference '{reference}': {source}")]
    InvalidReference {
        reference: String,
        source: url::ParseError,
    },

    #[error("unresolvable JSON pointer: '{pointer}'")]
    UnresolvablePointer { pointer: String },

    #[error("failed to retrieve '{uri}': {source}")]
    Retrieval { uri: String, source: SharedError },

    #[error("document at '{uri}' is not a schema")]
    NotASchema { uri: String },

    #[error("cannot pop the resolution scope: the scope stack is empty")]
    EmptyScopeStack,
}

/// Fetches documents that are not in the resolver's store.
pub trait Retrieve {
    fn retrieve(&self, uri: &Url) -> Result<Value, BoxError>;
}

impl<F> Retrieve for F
where
    F: Fn(&Url) -> Result<Value, BoxError>,
{
    fn retrieve(&self, uri: &Url) -> Result<Value, BoxError> {
        self(uri)
    }
}

/// Reads `file://` documents from disk; every other scheme fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRetriever;

impl Retrieve for DefaultRetriever {
    fn retrieve(&self, uri: &Url) -> Result<Value, BoxError> {
        match uri.scheme() {
            "file" => {
                let path = uri
                    .to_file_path()
                    .map_err(|()| format!("'{}' is not a local file path", uri))?;
                let text = std::fs::read_to_string(&path)?;
                Ok(serde_json::from_str(&text)?)
            }
            scheme => Err(format!("no retriever configured for '{}' URIs", scheme).into()),
        }
    }
}

/// Parse `uri` as an absolute URI, resolving relative forms against the default base.
pub(crate) fn parse_uri(uri: &str) -> Result<Url, url::ParseError> {
    DEFAULT_BASE.join(uri)
}

pub(crate) fn default_base() -> Url {
    DEFAULT_BASE.clone()
}

// Store keys drop an empty fragment so `http://x/s#` and `http://x/s` coincide.
fn store_key(url: &Url) -> String {
    if url.fragment() == Some("") {
        let mut url = url.clone();
        url.set_fragment(None);
        url.into()
    } else {
        url.as_str().to_string()
    }
}

// A resolved URL: the target and the base URI its contents resolve against.
#[derive(Debug, Clone)]
struct Resolution {
    base: Url,
    schema: Arc<Value>,
}

/// A `$ref` target borrowed from the resolver.
#[derive(Debug)]
pub(crate) struct Target<'r> {
    /// The reference, resolved against its scope
    pub url: Url,
    /// Base URI for the target's contents, its own id included
    pub base: Url,
    pub schema: &'r Value,
}

/// Resolves `$ref` strings against a scope stack and a document store.
pub struct RefResolver {
    scopes: RefCell<Vec<Url>>,
    store: RefCell<HashMap<String, Arc<Value>>>,
    // Entries are inserted once and never replaced or removed.
    resolved: RefCell<HashMap<String, Resolution>>,
    retriever: Box<dyn Retrieve>,
    id_of: IdOf,
    cache_remote: bool,
}

impl std::fmt::Debug for RefResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefResolver")
            .field("scopes", &self.scopes.borrow())
            .field("documents", &self.store.borrow().len())
            .field("cache_remote", &self.cache_remote)
            .finish()
    }
}

impl RefResolver {
    /// Create a resolver for `referrer`, the document found at `base_uri`.
    ///
    /// An empty `base_uri` means the default base.
    pub fn new(base_uri: &str, referrer: Value) -> Result<Self, RefResolutionError> {
        let base = parse_uri(base_uri).map_err(|source| RefResolutionError::InvalidReference {
            reference: base_uri.to_string(),
            source,
        })?;
        Ok(Self::with_base(base, Arc::new(referrer), Draft::Draft6.id_of()))
    }

    /// Create a resolver whose base URI is the id `schema` declares.
    pub fn from_schema(schema: &Value, id_of: IdOf) -> Self {
        Self::from_shared(Arc::new(schema.clone()), id_of)
    }

    pub(crate) fn from_shared(schema: Arc<Value>, id_of: IdOf) -> Self {
        let base = match id_of(&schema).map(parse_uri) {
            Some(Ok(base)) => base,
            Some(Err(error)) => {
                tracing::debug!(%error, "schema id is not a valid URI, using the default base");
                default_base()
            }
            None => default_base(),
        };
        Self::with_base(base, schema, id_of)
    }

    fn with_base(base: Url, referrer: Arc<Value>, id_of: IdOf) -> Self {
        let mut store = HashMap::new();
        for draft in Draft::ALL {
            if let Ok(uri) = parse_uri(draft.meta_schema_uri()) {
                store.insert(store_key(&uri), draft.shared_meta_schema());
            }
        }
        index_embedded(&mut store, &base, &referrer, id_of, true);
        store.insert(store_key(&base), referrer);

        Self {
            scopes: RefCell::new(vec![base]),
            store: RefCell::new(store),
            resolved: RefCell::new(HashMap::new()),
            retriever: Box::new(DefaultRetriever),
            id_of,
            cache_remote: true,
        }
    }

    /// Use `retriever` for documents missing from the store
    pub fn with_retriever(mut self, retriever: impl Retrieve + 'static) -> Self {
        self.retriever = Box::new(retriever);
        self
    }

    /// Add documents to the store under the given URIs
    pub fn with_documents<I, S>(self, documents: I) -> Result<Self, RefResolutionError>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        for (uri, document) in documents {
            let uri = uri.as_ref();
            let url = parse_uri(uri).map_err(|source| RefResolutionError::InvalidReference {
                reference: uri.to_string(),
                source,
            })?;
            let document = Arc::new(document);
            let mut store = self.store.borrow_mut();
            index_embedded(&mut store, &url, &document, self.id_of, true);
            store.insert(store_key(&url), document);
        }
        Ok(self)
    }

    /// Whether retrieved documents are kept in the store. Defaults to true.
    pub fn cache_remote(mut self, cache: bool) -> Self {
        self.cache_remote = cache;
        self
    }

    /// Current resolution scope
    pub fn resolution_scope(&self) -> Url {
        self.scopes.borrow().last().cloned().unwrap_or_else(default_base)
    }

    /// Current resolution scope without its fragment
    pub fn base_uri(&self) -> Url {
        let mut uri = self.resolution_scope();
        uri.set_fragment(None);
        uri
    }

    /// Push `scope`, resolved against the current scope.
    pub fn push_scope(&self, scope: &str) -> Result<(), RefResolutionError> {
        let url = self.join(&self.resolution_scope(), scope)?;
        tracing::trace!(scope = %url, "pushing resolution scope");
        self.scopes.borrow_mut().push(url);
        Ok(())
    }

    /// Pop the innermost scope.
    pub fn pop_scope(&self) -> Result<Url, RefResolutionError> {
        let popped = self
            .scopes
            .borrow_mut()
            .pop()
            .ok_or(RefResolutionError::EmptyScopeStack)?;
        tracing::trace!(scope = %popped, "popped resolution scope");
        Ok(popped)
    }

    /// Push `scope` for as long as the returned guard lives.
    pub fn in_scope(&self, scope: &str) -> Result<ScopeGuard<'_>, RefResolutionError> {
        self.push_scope(scope)?;
        Ok(ScopeGuard { resolver: self })
    }

    /// Resolve `reference` and enter the target's base URI as the scope while
    /// the guard lives.
    ///
    /// The base accounts for every id declared on the way to the target,
    /// the target's own id included.
    pub fn resolving(
        &self,
        reference: &str,
    ) -> Result<(Arc<Value>, ScopeGuard<'_>), RefResolutionError> {
        let url = self.join(&self.resolution_scope(), reference)?;
        let resolution = self.lookup(&url)?;
        tracing::trace!(scope = %resolution.base, "pushing resolution scope");
        self.scopes.borrow_mut().push(resolution.base);
        Ok((resolution.schema, ScopeGuard { resolver: self }))
    }

    /// Resolve `reference` against the current scope.
    pub fn resolve(&self, reference: &str) -> Result<(Url, Arc<Value>), RefResolutionError> {
        self.resolve_against(&self.resolution_scope(), reference)
    }

    /// Resolve `reference` against an explicit scope.
    pub fn resolve_against(
        &self,
        scope: &Url,
        reference: &str,
    ) -> Result<(Url, Arc<Value>), RefResolutionError> {
        let url = self.join(scope, reference)?;
        let resolved = self.resolve_from_url(&url)?;
        Ok((url, resolved))
    }

    /// Resolve an absolute URL, fragment included.
    pub fn resolve_from_url(&self, url: &Url) -> Result<Arc<Value>, RefResolutionError> {
        Ok(self.lookup(url)?.schema)
    }

    /// Resolve `reference` against `scope`, borrowing the target for as long
    /// as the resolver lives.
    pub(crate) fn target(&self, scope: &Url, reference: &str) -> Result<Target<'_>, RefResolutionError> {
        let url = self.join(scope, reference)?;
        let resolution = self.lookup(&url)?;
        let schema = Arc::as_ptr(&resolution.schema);
        // SAFETY: `lookup` leaves an entry for `url` in `resolved`, and entries
        // there are never replaced or removed while the resolver is alive. The
        // entry's `Arc` keeps the value at a fixed heap address, so the
        // pointer stays valid for the `&self` borrow.
        let schema = unsafe { &*schema };
        Ok(Target {
            url,
            base: resolution.base,
            schema,
        })
    }

    fn lookup(&self, url: &Url) -> Result<Resolution, RefResolutionError> {
        let key = store_key(url);
        let cached = self.resolved.borrow().get(&key).cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        // Embedded ids with fragments (`#foo`) are stored under the full URL.
        let stored = self.store.borrow().get(&key).cloned();
        let resolution = match stored {
            Some(schema) => Resolution {
                base: url.clone(),
                schema,
            },
            None => {
                let mut document_url = url.clone();
                document_url.set_fragment(None);
                let document = self.document(&document_url)?;
                let fragment = url.fragment().unwrap_or("");
                let (base, node) = self.walk_pointer(&document, document_url, fragment)?;
                let schema = if std::ptr::eq(node, document.as_ref()) {
                    document.clone()
                } else {
                    Arc::new(node.clone())
                };
                Resolution { base, schema }
            }
        };

        tracing::trace!(uri = %url, base = %resolution.base, "resolved reference");
        Ok(self
            .resolved
            .borrow_mut()
            .entry(key)
            .or_insert(resolution)
            .clone())
    }

    /// Follow a JSON pointer fragment (`/definitions/a~1b/0`) inside `document`.
    pub fn resolve_fragment<'d>(
        &self,
        document: &'d Value,
        fragment: &str,
    ) -> Result<&'d Value, RefResolutionError> {
        let (_, node) = self.walk_pointer(document, default_base(), fragment)?;
        Ok(node)
    }

    // Follow `fragment` from the root of the document found at `base`,
    // joining the id of every node below the root into the base.
    fn walk_pointer<'d>(
        &self,
        document: &'d Value,
        mut base: Url,
        fragment: &str,
    ) -> Result<(Url, &'d Value), RefResolutionError> {
        let unresolvable = || RefResolutionError::UnresolvablePointer {
            pointer: fragment.to_string(),
        };
        let decoded = percent_decode_str(fragment)
            .decode_utf8()
            .map_err(|_| unresolvable())?;
        if decoded.is_empty() {
            return Ok((base, document));
        }
        if !decoded.starts_with('/') {
            return Err(unresolvable());
        }

        let mut node = document;
        for token in decoded[1..].split('/') {
            let token = token.replace("~1", "/").replace("~0", "~");
            node = match node {
                Value::Object(map) => map.get(&token),
                Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            }
            .ok_or_else(unresolvable)?;
            if let Some(id) = (self.id_of)(node)
                && let Ok(url) = base.join(id)
            {
                base = url;
            }
        }
        Ok((base, node))
    }

    fn join(&self, scope: &Url, reference: &str) -> Result<Url, RefResolutionError> {
        scope
            .join(reference)
            .map_err(|source| RefResolutionError::InvalidReference {
                reference: reference.to_string(),
                source,
            })
    }

    fn document(&self, url: &Url) -> Result<Arc<Value>, RefResolutionError> {
        let key = store_key(url);
        let stored = self.store.borrow().get(&key).cloned();
        if let Some(document) = stored {
            return Ok(document);
        }

        tracing::debug!(uri = %url, "retrieving remote schema document");
        let document = self
            .retriever
            .retrieve(url)
            .map_err(|source| RefResolutionError::Retrieval {
                uri: url.to_string(),
                source: Arc::from(source),
            })?;
        if !(document.is_object() || document.is_boolean()) {
            return Err(RefResolutionError::NotASchema {
                uri: url.to_string(),
            });
        }

        let document = Arc::new(document);
        if self.cache_remote {
            let mut store = self.store.borrow_mut();
            index_embedded(&mut store, url, &document, self.id_of, true);
            store.insert(key, document.clone());
        }
        Ok(document)
    }
}

/// Pops the scope pushed by [`RefResolver::in_scope`] or
/// [`RefResolver::resolving`] when dropped.
#[must_use = "the scope is popped as soon as the guard is dropped"]
pub struct ScopeGuard<'r> {
    resolver: &'r RefResolver,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        let _ = self.resolver.pop_scope();
    }
}

// Register every subschema that declares its own id, keyed by the id
// resolved against the enclosing scope.
fn index_embedded(
    store: &mut HashMap<String, Arc<Value>>,
    scope: &Url,
    schema: &Value,
    id_of: IdOf,
    is_root: bool,
) {
    let mut scope = scope.clone();
    if let Some(id) = id_of(schema)
        && let Ok(url) = scope.join(id)
    {
        if !is_root {
            store
                .entry(store_key(&url))
                .or_insert_with(|| Arc::new(schema.clone()));
        }
        scope = url;
    }
    for child in subschemas(schema) {
        index_embedded(store, &scope, child, id_of, false);
    }
}

/// Values in schema position directly below `schema`.
///
/// Keywords holding plain data (`enum`, `const`, `default`, `examples`) are
/// never walked, so ids inside them are not registered.
pub(crate) fn subschemas(schema: &Value) -> Vec<&Value> {
    let Some(object) = schema.as_object() else {
        return Vec::new();
    };
    let mut found = Vec::new();
    for (keyword, value) in object {
        match keyword.as_str() {
            "additionalItems" | "additionalProperties" | "not" | "contains" | "propertyNames" => {
                found.push(value)
            }
            "items" | "extends" | "type" | "disallow" | "allOf" | "anyOf" | "oneOf" => match value
            {
                Value::Array(items) => found.extend(items),
                other => found.push(other),
            },
            "properties" | "patternProperties" | "definitions" | "dependencies" => {
                if let Value::Object(map) = value {
                    found.extend(map.values());
                }
            }
            _ => {}
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn resolver(schema: Value) -> RefResolver {
        RefResolver::from_schema(&schema, Draft::Draft6.id_of())
    }

    #[test]
    fn test_local_pointer() {
        let resolver = resolver(json!({"definitions": {"a": {"type": "integer"}}}));
        let (url, resolved) = resolver.resolve("#/definitions/a").unwrap();
        assert_eq!(url.as_str(), "json-schema:///#/definitions/a");
        assert_eq!(*resolved, json!({"type": "integer"}));
    }

    #[test]
    fn test_pointer_escapes() {
        let resolver = resolver(json!({
            "tilde~field": {"type": "integer"},
            "slash/field": {"type": "string"},
            "percent%field": {"type": "null"},
            "items": [{"type": "boolean"}]
        }));
        assert_eq!(*resolver.resolve("#/tilde~0field").unwrap().1, json!({"type": "integer"}));
        assert_eq!(*resolver.resolve("#/slash~1field").unwrap().1, json!({"type": "string"}));
        assert_eq!(*resolver.resolve("#/percent%25field").unwrap().1, json!({"type": "null"}));
        assert_eq!(*resolver.resolve("#/items/0").unwrap().1, json!({"type": "boolean"}));
    }

    #[test]
    fn test_unresolvable_pointer() {
        let resolver = resolver(json!({}));
        let err = resolver.resolve("#/definitions/missing").unwrap_err();
        assert!(matches!(err, RefResolutionError::UnresolvablePointer { .. }));
    }

    #[test]
    fn test_metaschemas_are_preloaded() {
        let resolver = resolver(json!({}));
        let (_, resolved) = resolver
            .resolve("http://json-schema.org/draft-04/schema#")
            .unwrap();
        assert_eq!(resolved.get("id"), Some(&json!("http://json-schema.org/draft-04/schema#")));
    }

    #[test]
    fn test_embedded_ids_are_indexed() {
        let resolver = resolver(json!({
            "$id": "http://localhost:1234/tree",
            "definitions": {
                "node": {"$id": "http://localhost:1234/node", "type": "object"},
                "named": {"$id": "#named", "type": "string"}
            }
        }));
        let (_, node) = resolver.resolve("node").unwrap();
        assert_eq!(node["type"], json!("object"));
        let (_, named) = resolver.resolve("#named").unwrap();
        assert_eq!(named["type"], json!("string"));
    }

    #[test]
    fn test_ids_inside_enum_are_not_indexed() {
        let resolver = resolver(json!({
            "enum": [{"$id": "http://example.com/fake", "type": "null"}]
        }));
        let err = resolver.resolve("http://example.com/fake").unwrap_err();
        assert!(matches!(err, RefResolutionError::Retrieval { .. }));
    }

    #[test]
    fn test_scope_stack() {
        let resolver = RefResolver::new("http://example.com/root.json", json!({})).unwrap();
        {
            let _guard = resolver.in_scope("folder/").unwrap();
            assert_eq!(resolver.resolution_scope().as_str(), "http://example.com/folder/");
        }
        assert_eq!(resolver.resolution_scope().as_str(), "http://example.com/root.json");

        resolver.pop_scope().unwrap();
        assert!(matches!(
            resolver.pop_scope(),
            Err(RefResolutionError::EmptyScopeStack)
        ));
    }

    #[test]
    fn test_retriever_and_cache() {
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = calls.clone();
        let resolver = resolver(json!({})).with_retriever(move |uri: &Url| -> Result<Value, BoxError> {
            counter.set(counter.get() + 1);
            assert_eq!(uri.as_str(), "http://localhost:1234/integer.json");
            Ok(json!({"type": "integer"}))
        });

        for _ in 0..2 {
            let (_, resolved) = resolver.resolve("http://localhost:1234/integer.json").unwrap();
            assert_eq!(*resolved, json!({"type": "integer"}));
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_retrieved_document_must_be_a_schema() {
        let resolver = resolver(json!({}))
            .with_retriever(|_: &Url| -> Result<Value, BoxError> { Ok(json!([1, 2])) });
        let err = resolver.resolve("http://localhost:1234/list.json").unwrap_err();
        assert!(matches!(err, RefResolutionError::NotASchema { .. }));
    }

    #[test]
    fn test_resolving_pushes_the_reference_scope() {
        let resolver = resolver(json!({"definitions": {"a": {}}}))
            .with_documents([("http://localhost:1234/folder/item.json", json!({"type": "integer"}))])
            .unwrap();
        {
            let (resolved, _guard) = resolver
                .resolving("http://localhost:1234/folder/item.json")
                .unwrap();
            assert_eq!(*resolved, json!({"type": "integer"}));
            assert_eq!(resolver.base_uri().as_str(), "http://localhost:1234/folder/item.json");
        }
        assert_eq!(resolver.resolution_scope().as_str(), DEFAULT_BASE_URI);
    }

    #[test]
    fn test_resolving_applies_ids_along_the_pointer() {
        let resolver = RefResolver::new(
            "http://localhost:1234/scope_change_defs2.json",
            json!({
                "definitions": {
                    "baz": {"$id": "folder/", "definitions": {"bar": {"type": "array"}}}
                }
            }),
        )
        .unwrap();
        let (resolved, _guard) = resolver.resolving("#/definitions/baz/definitions/bar").unwrap();
        assert_eq!(*resolved, json!({"type": "array"}));
        assert_eq!(resolver.base_uri().as_str(), "http://localhost:1234/folder/");
    }

    #[test]
    fn test_target_borrows_from_the_cache() {
        let resolver = resolver(json!({"definitions": {"a": {"$id": "#anchor", "minimum": 1}}}));
        let scope = resolver.resolution_scope();
        let first = resolver.target(&scope, "#/definitions/a").unwrap();
        let again = resolver.target(&scope, "#/definitions/a").unwrap();
        assert!(std::ptr::eq(first.schema, again.schema));
        assert_eq!(first.schema["minimum"], json!(1));
        assert_eq!(first.base.as_str(), "json-schema:///#anchor");

        let named = resolver.target(&scope, "#anchor").unwrap();
        assert_eq!(named.base.as_str(), "json-schema:///#anchor");
    }

    #[test]
    fn test_subschemas_skip_data_keywords() {
        let schema = json!({
            "properties": {"a": {"type": "string"}},
            "items": [{"type": "integer"}],
            "enum": [{"type": "null"}],
            "default": {"type": "boolean"}
        });
        assert_eq!(subschemas(&schema).len(), 2);
    }
}
