use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// A stored document: top-level field name to JSON value
pub type Document = Map<String, Value>;

/// Errors surfaced by the document store and the swipe store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network or backend failure; the caller may retry
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store rejected request: {0}")]
    Rejected(String),

    #[error("Invalid store response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Inclusive range filter on one numeric field, evaluated by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    pub field: String,
    pub min: i64,
    pub max: i64,
    pub limit: usize,
}

impl RangeQuery {
    pub fn new(field: impl Into<String>, min: i64, max: i64, limit: usize) -> Self {
        Self {
            field: field.into(),
            min,
            max,
            limit,
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        doc.get(&self.field)
            .and_then(Value::as_i64)
            .map(|v| v >= self.min && v <= self.max)
            .unwrap_or(false)
    }
}

/// Id of the single document describing the ordered pair `(first, second)`.
///
/// Deterministic, so writing the same pair again overwrites in place. Kept to
/// 36 characters, the longest custom id the document database accepts.
pub fn pair_document_id(first: &str, second: &str) -> String {
    let name = format!("{}\u{1f}{}", first, second);
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

/// Remote document database contract.
///
/// No transactions: every call is independent. `patch` is the only write
/// path and merges top-level fields into the document, creating it when
/// absent, so concurrent writers touching different fields or different
/// documents never clobber each other. Collections have fixed schemas:
/// documents hold scalars and arrays of scalars only.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document; `Ok(None)` when it does not exist
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create-or-merge the given top-level fields
    async fn patch(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError>;

    /// Documents whose `query.field` lies in `[min, max]`, as `(id, doc)`
    async fn query_range(
        &self,
        collection: &str,
        query: &RangeQuery,
    ) -> Result<Vec<(String, Document)>, StoreError>;

    /// Up to `limit` documents whose string field `field` equals `value`
    async fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<(String, Document)>, StoreError>;

    /// Up to `limit` documents of a collection, as `(id, doc)`
    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<(String, Document)>, StoreError>;
}

/// Process-local document store for development and tests
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, HashMap<String, Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn patch(&self, collection: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_default();
        doc.extend(fields);
        Ok(())
    }

    async fn query_range(
        &self,
        collection: &str,
        query: &RangeQuery,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let collections = self.collections.read().await;
        let mut hits: Vec<(String, Document)> = collections
            .get(collection)
            .map(|c| {
                c.iter()
                    .filter(|(_, doc)| query.matches(doc))
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default();
        // HashMap order is arbitrary; sort so limits are stable between calls
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        hits.truncate(query.limit);
        Ok(hits)
    }

    async fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let collections = self.collections.read().await;
        let mut hits: Vec<(String, Document)> = collections
            .get(collection)
            .map(|c| {
                c.iter()
                    .filter(|(_, doc)| doc.get(field).and_then(Value::as_str) == Some(value))
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default();
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn list(&self, collection: &str, limit: usize) -> Result<Vec<(String, Document)>, StoreError> {
        let collections = self.collections.read().await;
        let mut docs: Vec<(String, Document)> = collections
            .get(collection)
            .map(|c| c.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
            .unwrap_or_default();
        docs.sort_by(|a, b| a.0.cmp(&b.0));
        docs.truncate(limit);
        Ok(docs)
    }
}
