use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

use crate::models::{ProgramEmbedding, ProgramMatch};
use crate::search::store::{ProgramFilter, ProgramStore};

/// In-memory program store with cosine similarity search.
///
/// Loaded from a JSON snapshot of `gold_program_embedding` rows, or built
/// directly from records in tests. Rows are fixed after construction.
pub struct VectorStore {
    entries: Vec<ProgramEmbedding>,
    dim: usize,
}

impl VectorStore {
    /// Build a store, rejecting any record whose embedding has the wrong dimension.
    pub fn from_records(dim: usize, records: Vec<ProgramEmbedding>) -> Result<Self> {
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != dim) {
            anyhow::bail!(
                "Program {} has a {}-dimensional embedding, expected {}",
                bad.program_stream_id,
                bad.embedding.len(),
                dim
            );
        }
        Ok(Self {
            entries: records,
            dim,
        })
    }

    /// Load a snapshot written as a JSON array of program embedding records.
    pub fn open(snapshot: &Path, dim: usize) -> Result<Self> {
        let data = std::fs::read_to_string(snapshot)
            .with_context(|| format!("Failed to read snapshot {}", snapshot.display()))?;
        let records: Vec<ProgramEmbedding> =
            serde_json::from_str(&data).context("Failed to parse snapshot")?;
        Self::from_records(dim, records)
    }

    /// Search by cosine similarity against a query embedding.
    pub fn search(
        &self,
        query_embedding: &[f32],
        filter: &ProgramFilter,
        limit: usize,
    ) -> Vec<ProgramMatch> {
        let mut scored: Vec<(f32, &ProgramEmbedding)> = self
            .entries
            .iter()
            .filter(|e| filter.matches(&e.province, &e.discipline_name))
            .map(|e| (cosine_similarity(query_embedding, &e.embedding), e))
            .collect();

        // Descending by score; ties keep a stable id order
        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then(a.1.program_stream_id.cmp(&b.1.program_stream_id))
        });
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(score, e)| ProgramMatch {
                program_stream_id: e.program_stream_id,
                program_name: e.program_name.clone(),
                program_stream_name: e.program_stream_name.clone(),
                discipline_name: e.discipline_name.clone(),
                province: e.province.clone(),
                description_text: e.description_text.clone(),
                similarity: f64::from(score),
            })
            .collect()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl ProgramStore for VectorStore {
    async fn nearest(
        &self,
        query_embedding: &[f32],
        filter: &ProgramFilter,
        top_k: usize,
    ) -> Result<Vec<ProgramMatch>> {
        if query_embedding.len() != self.dim {
            anyhow::bail!(
                "Query embedding has {} dimensions, store expects {}",
                query_embedding.len(),
                self.dim
            );
        }
        Ok(self.search(query_embedding, filter, top_k))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// `1 - cosine_distance`, matching pgvector's `<=>` operator. Clamped to
/// [-1, 1] since f32 rounding can push parallel vectors just past 1.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}
