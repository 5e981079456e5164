use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::models::ProgramMatch;
use crate::search::store::{ProgramFilter, ProgramStore};

pub const EMBEDDING_TABLE: &str = "gold_program_embedding";
pub const PROFILE_TABLE: &str = "gold_program_profile";
pub const GEO_SUMMARY_TABLE: &str = "gold_geo_summary";

/// `$1` query vector, `$2` province, `$3` discipline ILIKE pattern, `$4` limit.
const NEAREST_SQL: &str = "\
SELECT
    program_stream_id::bigint AS program_stream_id,
    program_name,
    program_stream_name,
    discipline_name,
    province,
    description_text,
    (1 - (embedding <=> $1::text::vector))::float8 AS similarity
FROM gold_program_embedding
WHERE ($2::text IS NULL OR province = $2)
  AND ($3::text IS NULL OR discipline_name ILIKE $3)
ORDER BY embedding <=> $1::text::vector
LIMIT $4";

/// pgvector-backed program store.
///
/// Each query checks a connection out of the pool; it goes back when the
/// query future completes or is dropped.
pub struct PgProgramStore {
    pool: PgPool,
}

impl PgProgramStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;
        Ok(Self { pool })
    }

    /// Warn about declared tables that are missing, and fail if stored
    /// embeddings don't have `dim` dimensions. The tables are created by the
    /// ingestion pipeline, not here.
    pub async fn check_schema(&self, dim: usize) -> Result<()> {
        for table in [EMBEDDING_TABLE, PROFILE_TABLE, GEO_SUMMARY_TABLE] {
            let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
                .bind(table)
                .fetch_one(&self.pool)
                .await
                .with_context(|| format!("Failed to inspect table {table}"))?;
            if !exists {
                tracing::warn!("Table {table} not found");
                if table == EMBEDDING_TABLE {
                    return Ok(());
                }
            }
        }

        let stored: Option<i32> =
            sqlx::query_scalar("SELECT vector_dims(embedding) FROM gold_program_embedding LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .context("Failed to read stored embedding dimension")?;
        if let Some(stored) = stored {
            ensure_dimension(stored, dim)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProgramStore for PgProgramStore {
    async fn nearest(
        &self,
        query_embedding: &[f32],
        filter: &ProgramFilter,
        top_k: usize,
    ) -> Result<Vec<ProgramMatch>> {
        let rows = sqlx::query_as::<_, ProgramMatch>(NEAREST_SQL)
            .bind(vector_to_pg(query_embedding))
            .bind(filter.province.as_deref())
            .bind(filter.discipline.as_deref().map(contains_pattern))
            .bind(i64::try_from(top_k).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .context("Nearest-neighbour query failed")?;
        Ok(rows)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn ensure_dimension(stored: i32, expected: usize) -> Result<()> {
    if usize::try_from(stored).ok() != Some(expected) {
        anyhow::bail!(
            "{EMBEDDING_TABLE} holds {stored}-dimensional embeddings but the embedder produces {expected}"
        );
    }
    Ok(())
}

/// Render a vector in pgvector's text input format: `[0.1,0.2,...]`.
pub fn vector_to_pg(v: &[f32]) -> String {
    let mut out = String::with_capacity(v.len() * 10 + 2);
    out.push('[');
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&x.to_string());
    }
    out.push(']');
    out
}

/// ILIKE pattern matching `needle` anywhere. LIKE metacharacters in the
/// needle are escaped so it matches literally.
fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
