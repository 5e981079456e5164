//! # program-search
//!
//! A small web service that answers natural-language questions about
//! residency program offerings with a vector-similarity search over
//! pre-computed description embeddings.
//!
//! ## Request flow
//!
//! ```text
//!     POST /semantic/query
//!              │
//!              ▼
//!     ┌──────────────────┐   top_k ∉ [1, 20] → 422
//!     │  Validate input  │──────────────────────────▶
//!     └────────┬─────────┘
//!              ▼
//!     ┌──────────────────┐
//!     │  Embed query     │  384-dim, unit length
//!     └────────┬─────────┘
//!              ▼
//!     ┌──────────────────┐
//!     │ Nearest-neighbour│  province = ?, discipline ILIKE ?
//!     │ search, top_k    │  ORDER BY cosine distance
//!     └────────┬─────────┘
//!              ▼
//!     ┌──────────────────┐
//!     │ Grounded answer  │  only with an API key; failures or
//!     │                  │  running out of time → null
//!     └────────┬─────────┘
//!              ▼
//!     { hits, answer, top_k }
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, storage, and model settings
//! - [`models`] - Table rows, request/response types, snippet truncation
//! - [`error`] - HTTP error type and status mapping
//! - [`llm::embeddings`] - Query embedding via Ollama or OpenAI-compatible APIs
//! - [`llm::answer`] - Optional grounded answers from a hosted chat model
//! - [`search::store`] - Store trait and row filters
//! - [`search::postgres`] - pgvector-backed store
//! - [`search::vector`] - In-memory cosine store loaded from a JSON snapshot
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state built once at startup

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod search;
pub mod state;

use state::AppState;

/// Build the HTTP router for the given state.
///
/// The semantic handler enforces `request_timeout_secs` itself so that a slow
/// answer model only drops the answer instead of failing the request.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health::health))
        .route("/semantic/query", post(api::semantic::semantic_query))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
