//! Document store used by every service.
//!
//! Documents are schemaless JSON objects grouped into named collections and
//! addressed by a store-assigned UUID. The trait exposes only the primitives
//! the services need: filtered/ordered reads, inserts, relative counter
//! updates, partial field writes and deletes. Each primitive is atomic for a
//! single document and nothing more.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::Result;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

pub mod collections {
    pub const VOTES: &str = "votes";
    pub const POSTS: &str = "posts";
    pub const COMMENTS: &str = "comments";
    pub const VIDEO_SUBMISSIONS: &str = "videoSubmissions";
    pub const NEPO_ENTRIES: &str = "nepoEntries";
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub data: Value,
}

impl Document {
    /// Decode into a model, exposing the document id as the `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let mut data = self.data.clone();
        if let Value::Object(ref mut map) = data {
            map.insert("id".to_string(), Value::String(self.id.to_string()));
        }
        Ok(serde_json::from_value(data)?)
    }

    pub fn field(&self, name: &str) -> &Value {
        self.data.get(name).unwrap_or(&Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Missing fields compare equal to `null`.
    Eq(String, Value),
    Gte(String, Value),
    Lt(String, Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    /// Ordering field, interpreted as a timestamp.
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.to_string(), value.into()));
        self
    }

    /// `field >= value`, comparing RFC 3339 timestamps. Documents without a
    /// timestamp in `field` never match a range filter.
    pub fn gte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(field.to_string(), value.into()));
        self
    }

    /// `field < value`, comparing RFC 3339 timestamps.
    pub fn lt(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lt(field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>>;

    async fn insert(&self, collection: &str, data: Value) -> Result<Uuid>;

    /// Add each delta to its integer field in one atomic document update.
    /// Missing fields count as zero. Fails with `NotFound` for unknown ids.
    async fn update_counters(&self, collection: &str, id: Uuid, deltas: &[(&str, i64)])
    -> Result<()>;

    /// Overwrite the given top-level fields, leaving the rest untouched.
    async fn set_fields(&self, collection: &str, id: Uuid, fields: Map<String, Value>)
    -> Result<()>;

    /// Deleting an unknown id is not an error.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<()>;
}

/// Collapse repeated fields so each counter appears once.
pub(crate) fn merge_deltas<'a>(deltas: &[(&'a str, i64)]) -> Vec<(&'a str, i64)> {
    let mut merged: Vec<(&str, i64)> = Vec::with_capacity(deltas.len());
    for &(field, delta) in deltas {
        match merged.iter_mut().find(|(existing, _)| *existing == field) {
            Some(entry) => entry.1 += delta,
            None => merged.push((field, delta)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Named {
        id: Uuid,
        name: String,
    }

    #[test]
    fn decode_injects_document_id() {
        let id = Uuid::new_v4();
        let doc = Document {
            id,
            data: json!({ "name": "Brave Yak" }),
        };
        let named: Named = doc.decode().unwrap();
        assert_eq!(named.id, id);
        assert_eq!(named.name, "Brave Yak");
    }

    #[test]
    fn repeated_deltas_are_merged() {
        let merged = merge_deltas(&[("upvotes", 1), ("downvotes", -1), ("upvotes", 1)]);
        assert_eq!(merged, vec![("upvotes", 2), ("downvotes", -1)]);
    }
}
