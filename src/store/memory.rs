use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Direction, Document, DocumentStore, Filter, Query, merge_deltas};
use crate::error::{AppError, Result};

/// In-process store backing tests and `STORAGE_BACKEND=memory`.
///
/// Documents keep insertion order, so unordered queries return them oldest
/// first. `set_unavailable(true)` makes every call fail with a transient
/// error, which is how callers exercise their rollback paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    pub async fn count(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, Vec::len)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(AppError::Unavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => Some(x.with_timezone(&Utc).cmp(&y.with_timezone(&Utc))),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Range filters only match when both sides are RFC 3339 timestamps.
fn compare_timestamps(a: &Value, b: &Value) -> Option<Ordering> {
    Some(timestamp(a)?.cmp(&timestamp(b)?))
}

fn matches(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(field, value) => doc.field(field) == value,
        Filter::Gte(field, value) => matches!(
            compare_timestamps(doc.field(field), value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Filter::Lt(field, value) => {
            compare_timestamps(doc.field(field), value) == Some(Ordering::Less)
        }
    }
}

fn object_mut<'a>(doc: &'a mut Document, collection: &str) -> Result<&'a mut Map<String, Value>> {
    let id = doc.id;
    doc.data.as_object_mut().ok_or_else(|| {
        AppError::Internal(format!(
            "document {} in {} is not an object",
            id, collection
        ))
    })
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        self.check_available()?;
        let collections = self.collections.read().await;
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| query.filters.iter().all(|filter| matches(doc, filter)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, direction)) = &query.order_by {
            // Stable sort: ties keep insertion order.
            docs.sort_by(|a, b| {
                let ordering = compare_values(a.field(field), b.field(field))
                    .unwrap_or(Ordering::Equal);
                match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }

        Ok(docs)
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>> {
        self.check_available()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id))
            .cloned())
    }

    async fn insert(&self, collection: &str, data: Value) -> Result<Uuid> {
        self.check_available()?;
        if !data.is_object() {
            return Err(AppError::Internal(format!(
                "cannot insert non-object document into {}",
                collection
            )));
        }

        let id = Uuid::new_v4();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(Document { id, data });
        Ok(id)
    }

    async fn update_counters(
        &self,
        collection: &str,
        id: Uuid,
        deltas: &[(&str, i64)],
    ) -> Result<()> {
        self.check_available()?;
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", collection, id)))?;

        let fields = object_mut(doc, collection)?;
        for (field, delta) in merge_deltas(deltas) {
            let current = fields.get(field).and_then(Value::as_i64).unwrap_or(0);
            fields.insert(field.to_string(), Value::from(current + delta));
        }
        Ok(())
    }

    async fn set_fields(
        &self,
        collection: &str,
        id: Uuid,
        fields: Map<String, Value>,
    ) -> Result<()> {
        self.check_available()?;
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", collection, id)))?;

        object_mut(doc, collection)?.extend(fields);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<()> {
        self.check_available()?;
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.retain(|doc| doc.id != id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn find_filters_orders_and_limits() {
        let store = MemoryStore::new();
        store
            .insert("posts", json!({ "status": "active", "createdAt": "2025-09-08T10:00:00Z" }))
            .await
            .unwrap();
        store
            .insert("posts", json!({ "status": "hidden", "createdAt": "2025-09-08T11:00:00Z" }))
            .await
            .unwrap();
        let newest = store
            .insert("posts", json!({ "status": "active", "createdAt": "2025-09-08T12:00:00.5Z" }))
            .await
            .unwrap();

        let docs = store
            .find(
                "posts",
                &Query::new()
                    .eq("status", "active")
                    .order_by("createdAt", Direction::Desc)
                    .limit(1),
            )
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, newest);
    }

    #[tokio::test]
    async fn range_filters_compare_timestamps() {
        let store = MemoryStore::new();
        store
            .insert("posts", json!({ "createdAt": "2025-09-08T10:00:00Z" }))
            .await
            .unwrap();
        store
            .insert("posts", json!({ "createdAt": "2025-09-09T10:00:00Z" }))
            .await
            .unwrap();

        let docs = store
            .find(
                "posts",
                &Query::new()
                    .gte("createdAt", "2025-09-08T12:00:00Z")
                    .lt("createdAt", "2025-09-10T00:00:00Z"),
            )
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn range_filters_ignore_fractional_second_text_order() {
        let store = MemoryStore::new();
        let fractional = store
            .insert("posts", json!({ "createdAt": "2025-09-08T12:00:00.5Z" }))
            .await
            .unwrap();
        store
            .insert("posts", json!({ "createdAt": "2025-09-08T11:59:59.9Z" }))
            .await
            .unwrap();
        store.insert("posts", json!({ "title": "undated" })).await.unwrap();

        let docs = store
            .find("posts", &Query::new().gte("createdAt", "2025-09-08T12:00:00Z"))
            .await
            .unwrap();
        assert_eq!(docs.iter().map(|doc| doc.id).collect::<Vec<_>>(), vec![fractional]);

        let earlier = store
            .find("posts", &Query::new().lt("createdAt", "2025-09-08T12:00:00Z"))
            .await
            .unwrap();
        assert_eq!(earlier.len(), 1);
    }

    #[tokio::test]
    async fn missing_fields_match_null() {
        let store = MemoryStore::new();
        store.insert("comments", json!({ "content": "root" })).await.unwrap();
        store
            .insert("comments", json!({ "content": "reply", "parentId": "abc" }))
            .await
            .unwrap();

        let roots = store
            .find("comments", &Query::new().eq("parentId", Value::Null))
            .await
            .unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].field("content"), "root");
    }

    #[tokio::test]
    async fn counters_apply_relative_deltas() {
        let store = MemoryStore::new();
        let id = store
            .insert("posts", json!({ "upvotes": 2, "downvotes": 0 }))
            .await
            .unwrap();

        store
            .update_counters("posts", id, &[("upvotes", -1), ("downvotes", 1), ("commentCount", 1)])
            .await
            .unwrap();

        let doc = store.get("posts", id).await.unwrap().unwrap();
        assert_eq!(doc.data, json!({ "upvotes": 1, "downvotes": 1, "commentCount": 1 }));
    }

    #[tokio::test]
    async fn counters_on_unknown_document_fail() {
        let store = MemoryStore::new();
        let err = store
            .update_counters("posts", Uuid::new_v4(), &[("upvotes", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn offline_store_reports_transient_errors() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.insert("votes", json!({})).await.unwrap_err();
        assert!(err.is_transient());

        store.set_unavailable(false);
        assert!(store.insert("votes", json!({})).await.is_ok());
    }
}
