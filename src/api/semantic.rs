use std::time::{Duration, Instant};

use axum::extract::State;
use axum::Json;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    SemanticHit, SemanticQueryRequest, SemanticQueryResponse, MAX_TOP_K, MIN_TOP_K,
};
use crate::search::store::ProgramFilter;
use crate::state::AppState;

/// POST /semantic/query - Semantic program search:
///   1. Validate top_k (no backend work on failure)
///   2. Embed the query
///   3. Filtered nearest-neighbour search, top_k rows
///   4. Optional grounded answer (best effort)
///
/// Steps 2-3 and step 4 share one budget of `request_timeout_secs`. Running
/// out during the search is a 504; running out during the answer only drops
/// the answer.
pub async fn semantic_query(
    State(state): State<AppState>,
    Json(req): Json<SemanticQueryRequest>,
) -> ApiResult<Json<SemanticQueryResponse>> {
    run_semantic_query(&state, req).await.map(Json)
}

pub async fn run_semantic_query(
    state: &AppState,
    req: SemanticQueryRequest,
) -> ApiResult<SemanticQueryResponse> {
    if !(MIN_TOP_K..=MAX_TOP_K).contains(&req.top_k) {
        return Err(ApiError::InvalidArgument(format!(
            "top_k must be between {MIN_TOP_K} and {MAX_TOP_K}"
        )));
    }
    if req.query.trim().is_empty() {
        return Err(ApiError::InvalidArgument(
            "query must not be empty".to_string(),
        ));
    }
    let top_k = req.top_k as usize;
    let started = Instant::now();
    let budget = Duration::from_secs(state.config.request_timeout_secs);

    let filter = ProgramFilter {
        province: req.province,
        discipline: req.discipline,
    };

    let search = async {
        let query_embedding = state
            .embedder
            .embed(&req.query)
            .await
            .map_err(ApiError::Embedding)?;

        state
            .store
            .nearest(&query_embedding, &filter, top_k)
            .await
            .map_err(ApiError::Store)
    };
    let rows = tokio::time::timeout(budget, search)
        .await
        .map_err(|_| ApiError::BackendTimeout(budget))??;

    let hits: Vec<SemanticHit> = rows.into_iter().map(SemanticHit::from).collect();
    tracing::debug!(
        "Semantic query returned {} hits from {} (filter: {:?})",
        hits.len(),
        state.store.backend_name(),
        filter
    );

    let remaining = budget.saturating_sub(started.elapsed());
    let answer_limit = remaining.min(Duration::from_secs(state.config.answer.timeout_secs));
    let answer = maybe_generate_answer(state, &req.query, &hits, answer_limit).await;

    Ok(SemanticQueryResponse {
        hits,
        answer,
        top_k: req.top_k,
    })
}

/// Ask the answer model for a grounded summary. Never fails the request:
/// no generator, no hits, a generator error, or running past `limit` all
/// yield `None`.
async fn maybe_generate_answer(
    state: &AppState,
    question: &str,
    hits: &[SemanticHit],
    limit: Duration,
) -> Option<String> {
    if hits.is_empty() {
        return None;
    }
    let answerer = state.answerer.as_ref()?;

    match tokio::time::timeout(limit, answerer.answer(question, hits)).await {
        Ok(Ok(answer)) => Some(answer),
        Ok(Err(e)) => {
            tracing::warn!("Answer generation failed: {e:#}");
            None
        }
        Err(_) => {
            tracing::warn!("Answer generation timed out after {limit:?}");
            None
        }
    }
}
