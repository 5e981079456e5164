use serde::{Deserialize, Serialize};

/// Number of description characters kept in a hit snippet.
pub const SNIPPET_CHARS: usize = 320;
/// Appended to a snippet when the description was cut.
pub const SNIPPET_MARKER: &str = "...";

pub const MIN_TOP_K: i64 = 1;
pub const MAX_TOP_K: i64 = 20;

/// One row of `gold_program_embedding`: a program stream and its
/// unit-normalized description embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramEmbedding {
    pub program_stream_id: i64,
    pub program_name: String,
    pub program_stream_name: String,
    pub discipline_name: String,
    pub province: String,
    pub description_text: Option<String>,
    pub embedding: Vec<f32>,
}

/// A row of `gold_program_profile`. Shares the schema with the embedding
/// table but is not read by the query path.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgramProfile {
    pub program_stream_id: i64,
    pub program_name: String,
    pub program_stream_name: String,
    pub program_stream: String,
    pub discipline_name: String,
    #[serde(default = "unknown_province")]
    pub province: String,
    pub school_name: String,
    pub program_site: String,
    pub program_url: Option<String>,
    pub description_text: Option<String>,
    #[serde(default = "default_true")]
    pub is_valid: bool,
}

/// A row of `gold_geo_summary`, keyed by (province, discipline_name).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeoSummary {
    pub province: String,
    pub discipline_name: String,
    pub program_count: i64,
    pub avg_quota: Option<f64>,
}

fn unknown_province() -> String {
    "UNKNOWN".to_string()
}

fn default_true() -> bool {
    true
}

/// A store row that survived filtering, with its similarity to the query.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ProgramMatch {
    pub program_stream_id: i64,
    pub program_name: String,
    pub program_stream_name: String,
    pub discipline_name: String,
    pub province: String,
    pub description_text: Option<String>,
    pub similarity: f64,
}

/// Semantic query request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticQueryRequest {
    pub query: String,
    pub top_k: i64,
    /// Exact match on province
    #[serde(default)]
    pub province: Option<String>,
    /// Case-insensitive substring match on discipline name
    #[serde(default)]
    pub discipline: Option<String>,
}

/// A ranked search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticHit {
    pub program_stream_id: i64,
    pub program_name: String,
    pub program_stream_name: String,
    pub discipline_name: String,
    pub province: String,
    pub similarity: f64,
    pub description_snippet: Option<String>,
}

impl From<ProgramMatch> for SemanticHit {
    fn from(row: ProgramMatch) -> Self {
        Self {
            description_snippet: row.description_text.as_deref().map(snippet),
            program_stream_id: row.program_stream_id,
            program_name: row.program_name,
            program_stream_name: row.program_stream_name,
            discipline_name: row.discipline_name,
            province: row.province,
            similarity: row.similarity,
        }
    }
}

/// Semantic query response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticQueryResponse {
    pub hits: Vec<SemanticHit>,
    pub answer: Option<String>,
    pub top_k: i64,
}

/// Cut `text` to [`SNIPPET_CHARS`] characters, appending [`SNIPPET_MARKER`]
/// when anything was dropped. Counts chars, not bytes.
pub fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((end, _)) => format!("{}{SNIPPET_MARKER}", &text[..end]),
        None => text.to_string(),
    }
}
