// Vector-Store Gateway (C4): vector insert and cosine-distance top-k
// search, implemented against the row store's pgvector extension (the
// spec allows "uses row store's vector extension where available"; this
// implementation takes that option rather than standing up a separate
// vector database, keeping the dependency surface aligned with the
// teacher's single-Postgres-instance deployment model).

use async_trait::async_trait;
use gateway_core::traits::{VectorMatch, VectorStore, VectorStoreError};
use pgvector::Vector;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgVectorStore {
    pool: PgPool,
    table: &'static str,
}

impl PgVectorStore {
    /// `table` must be a compile-time-trusted identifier (never derived
    /// from request input) since it is interpolated into the query text;
    /// sqlx has no placeholder syntax for identifiers.
    pub fn new(pool: PgPool, table: &'static str) -> Self {
        Self { pool, table }
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn upsert(&self, id: Uuid, vector: &[f32]) -> Result<(), VectorStoreError> {
        let embedding = Vector::from(vector.to_vec());
        let query = format!(
            "INSERT INTO {table} (id, embedding) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET embedding = EXCLUDED.embedding",
            table = self.table
        );
        sqlx::query(&query)
            .bind(id)
            .bind(embedding)
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::Operation(e.to_string()))?;
        Ok(())
    }

    async fn search_top_k(
        &self,
        query_vector: &[f32],
        k: usize,
        filter_sql: &str,
    ) -> Result<Vec<VectorMatch>, VectorStoreError> {
        let embedding = Vector::from(query_vector.to_vec());
        let where_clause = if filter_sql.is_empty() {
            String::new()
        } else {
            format!("WHERE {filter_sql}")
        };
        let query = format!(
            "SELECT id, embedding <=> $1 AS distance FROM {table} {where_clause}
             ORDER BY embedding <=> $1 ASC LIMIT $2",
            table = self.table
        );

        let rows: Vec<(Uuid, f32)> = sqlx::query_as(&query)
            .bind(embedding)
            .bind(k as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VectorStoreError::Operation(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, distance)| VectorMatch { id, distance })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_clause_is_empty_when_no_filter_given() {
        // Documents the expected query shape without needing a live pool;
        // the `WHERE` clause must be entirely absent, not `WHERE `.
        let filter_sql = "";
        let where_clause = if filter_sql.is_empty() {
            String::new()
        } else {
            format!("WHERE {filter_sql}")
        };
        assert_eq!(where_clause, "");
    }
}
