use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::MySqlArguments;
use sqlx::types::Json;
use sqlx::{Arguments, FromRow, MySqlPool};
use tracing::debug;

use super::{Condition, Document, DocumentStore, Filter, StoreError};

/// Every collection shares one table; the document body is a JSON column
/// and filters run through `JSON_EXTRACT` / `JSON_CONTAINS`.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
    collection VARCHAR(64) NOT NULL,
    version BIGINT UNSIGNED NOT NULL DEFAULT 1,
    body JSON NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
    KEY idx_documents_collection (collection)
)
"#;

#[derive(FromRow)]
struct DocumentRow {
    id: u64,
    version: u64,
    body: Json<Value>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            version: row.version,
            body: row.body.0,
        }
    }
}

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// `owner.kind` -> `$.owner.kind`
fn json_path(field: &str) -> String {
    format!("$.{field}")
}

/// Renders the filter as a `WHERE` tail (after `collection = ?`) plus the
/// values to bind, in order.
fn where_clause(filter: &Filter) -> (String, Vec<String>) {
    let mut sql = String::new();
    let mut binds = Vec::with_capacity(filter.conditions().len() * 2);

    for condition in filter.conditions() {
        let predicate = match condition {
            Condition::Eq(..) => "JSON_EXTRACT(body, ?) = CAST(? AS JSON)",
            Condition::Gte(..) => "JSON_EXTRACT(body, ?) >= CAST(? AS JSON)",
            Condition::Lte(..) => "JSON_EXTRACT(body, ?) <= CAST(? AS JSON)",
            Condition::Contains(..) => "JSON_CONTAINS(JSON_EXTRACT(body, ?), CAST(? AS JSON))",
        };
        sql.push_str(" AND ");
        sql.push_str(predicate);
        binds.push(json_path(condition.field()));
        binds.push(condition.value().to_string());
    }

    (sql, binds)
}

/// Arguments for a filtered query: the collection, then the filter binds.
fn bind_all(collection: &str, binds: &[String]) -> MySqlArguments {
    let mut args = MySqlArguments::default();
    args.add(collection);
    for value in binds {
        args.add(value.as_str());
    }
    args
}

#[async_trait]
impl DocumentStore for MySqlStore {
    async fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError> {
        let result = sqlx::query("INSERT INTO documents (collection, version, body) VALUES (?, 1, ?)")
            .bind(collection)
            .bind(Json(&body))
            .execute(&self.pool)
            .await?;

        Ok(Document {
            id: result.last_insert_id(),
            version: 1,
            body,
        })
    }

    async fn get(&self, collection: &str, id: u64) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, version, body FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let (tail, binds) = where_clause(filter);
        let sql = format!(
            "SELECT id, version, body FROM documents WHERE collection = ?{tail} ORDER BY id"
        );
        debug!(sql = %sql, collection, "Finding documents");

        let rows = sqlx::query_as_with::<_, DocumentRow, _>(&sql, bind_all(collection, &binds))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn replace(
        &self,
        collection: &str,
        id: u64,
        expected_version: u64,
        body: Value,
    ) -> Result<Option<Document>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = ?, version = version + 1
            WHERE collection = ? AND id = ? AND version = ?
            "#,
        )
        .bind(Json(&body))
        .bind(collection)
        .bind(id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(Some(Document {
                id,
                version: expected_version + 1,
                body,
            }));
        }

        // Either the row is gone or the version moved on.
        match self.get(collection, id).await? {
            None => Ok(None),
            Some(_) => Err(StoreError::VersionConflict {
                collection: collection.to_string(),
                id,
            }),
        }
    }

    async fn delete(&self, collection: &str, id: u64) -> Result<Option<Document>, StoreError> {
        let Some(doc) = self.get(collection, id).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Some(doc))
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let (tail, binds) = where_clause(filter);
        let sql = format!("DELETE FROM documents WHERE collection = ?{tail}");
        debug!(sql = %sql, collection, "Deleting documents");

        let result = sqlx::query_with(&sql, bind_all(collection, &binds))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_clause_binds_path_then_value() {
        let filter = Filter::new()
            .eq("owner.kind", "user")
            .gte("date", "2025-04-20")
            .contains("students", 3u64);

        let (sql, binds) = where_clause(&filter);

        let expected = [
            " AND JSON_EXTRACT(body, ?) = CAST(? AS JSON)",
            " AND JSON_EXTRACT(body, ?) >= CAST(? AS JSON)",
            " AND JSON_CONTAINS(JSON_EXTRACT(body, ?), CAST(? AS JSON))",
        ]
        .concat();
        assert_eq!(sql, expected);
        assert_eq!(
            binds,
            vec![
                "$.owner.kind",
                "\"user\"",
                "$.date",
                "\"2025-04-20\"",
                "$.students",
                "3"
            ]
        );
    }

    #[test]
    fn empty_filter_has_no_tail() {
        let (sql, binds) = where_clause(&Filter::new());
        assert!(sql.is_empty());
        assert!(binds.is_empty());
    }
}
