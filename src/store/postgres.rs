use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, types::Json};
use uuid::Uuid;

use super::{Direction, Document, DocumentStore, Filter, Query, merge_deltas};
use crate::error::{AppError, Result};

/// JSONB-backed store: one `documents` row per document.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    db: PgPool,
}

impl PgDocumentStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Builds the SELECT for `find`. Placeholders start at $2; $1 is the
/// collection. Field names are bound as parameters, never interpolated.
fn select_sql(query: &Query) -> String {
    let mut sql = String::from("SELECT id, data FROM documents WHERE collection = $1");
    let mut next = 2;

    for filter in &query.filters {
        let (field_param, value_param) = (next, next + 1);
        let condition = match filter {
            Filter::Eq(..) => format!(
                "COALESCE(data -> ${}, 'null'::jsonb) = ${}",
                field_param, value_param
            ),
            // Range filters compare instants, not the jsonb text.
            Filter::Gte(..) | Filter::Lt(..) => {
                let op = if matches!(filter, Filter::Gte(..)) { ">=" } else { "<" };
                format!(
                    "(data ->> ${})::timestamptz {} (${} #>> '{{}}')::timestamptz",
                    field_param, op, value_param
                )
            }
        };
        sql.push_str(" AND ");
        sql.push_str(&condition);
        next += 2;
    }

    match &query.order_by {
        Some((_, direction)) => {
            let direction = match direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            sql.push_str(&format!(
                " ORDER BY (data ->> ${})::timestamptz {} NULLS LAST, created_at ASC",
                next, direction
            ));
            next += 1;
        }
        None => sql.push_str(" ORDER BY created_at ASC"),
    }

    if query.limit.is_some() {
        sql.push_str(&format!(" LIMIT ${}", next));
    }

    sql
}

/// Nested `jsonb_set` applying every delta in a single UPDATE. Placeholders
/// start at $3 after collection and id.
fn counters_sql(fields: usize) -> String {
    let mut expr = String::from("data");
    for i in 0..fields {
        let field = 3 + i * 2;
        let delta = field + 1;
        expr = format!(
            "jsonb_set({expr}, ARRAY[${field}]::text[], to_jsonb(COALESCE((data ->> ${field})::bigint, 0) + ${delta}), true)"
        );
    }
    format!("UPDATE documents SET data = {expr} WHERE collection = $1 AND id = $2")
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let sql = select_sql(query);
        let mut statement = sqlx::query_as::<_, (Uuid, Json<Value>)>(&sql).bind(collection);

        for filter in &query.filters {
            let (Filter::Eq(field, value) | Filter::Gte(field, value) | Filter::Lt(field, value)) =
                filter;
            statement = statement.bind(field.as_str()).bind(Json(value.clone()));
        }
        if let Some((field, _)) = &query.order_by {
            statement = statement.bind(field.as_str());
        }
        if let Some(limit) = query.limit {
            statement = statement.bind(limit as i64);
        }

        let rows = statement.fetch_all(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(|(id, Json(data))| Document { id, data })
            .collect())
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, (Uuid, Json<Value>)>(
            "SELECT id, data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(id, Json(data))| Document { id, data }))
    }

    async fn insert(&self, collection: &str, data: Value) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO documents (id, collection, data, created_at)
            VALUES ($1, $2, $3, NOW())
            "#,
        )
        .bind(id)
        .bind(collection)
        .bind(Json(data))
        .execute(&self.db)
        .await?;

        Ok(id)
    }

    async fn update_counters(
        &self,
        collection: &str,
        id: Uuid,
        deltas: &[(&str, i64)],
    ) -> Result<()> {
        let deltas = merge_deltas(deltas);
        if deltas.is_empty() {
            return Ok(());
        }

        let sql = counters_sql(deltas.len());
        let mut statement = sqlx::query(&sql).bind(collection).bind(id);
        for (field, delta) in &deltas {
            statement = statement.bind(*field).bind(*delta);
        }

        let result = statement.execute(&self.db).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} {} not found", collection, id)));
        }
        Ok(())
    }

    async fn set_fields(
        &self,
        collection: &str,
        id: Uuid,
        fields: Map<String, Value>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE documents SET data = data || $3 WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(fields)))
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} {} not found", collection, id)));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
