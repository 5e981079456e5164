use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::llm::answer::{AnswerGenerator, OpenAiAnswerer};
use crate::llm::embeddings::{Embedder, HttpEmbedder};
use crate::search::postgres::PgProgramStore;
use crate::search::store::ProgramStore;
use crate::search::vector::VectorStore;

/// Shared application state.
///
/// Everything here is built once at startup and read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn ProgramStore>,
    /// Present only when an answer-model credential is configured.
    pub answerer: Option<Arc<dyn AnswerGenerator>>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;

        let embedder = HttpEmbedder::new(http_client.clone(), config.embedding.clone())?;
        let dim = embedder.dimensions();

        let store: Arc<dyn ProgramStore> = match (&config.database_url, &config.snapshot_path) {
            (Some(url), _) => {
                let store = PgProgramStore::connect(url, config.db_max_connections).await?;
                store.check_schema(dim).await?;
                Arc::new(store)
            }
            (None, Some(path)) => {
                let store = VectorStore::open(path, dim)?;
                tracing::info!(
                    "Loaded {} programs from {}",
                    store.entry_count(),
                    path.display()
                );
                Arc::new(store)
            }
            (None, None) => {
                anyhow::bail!("No program store configured: set DATABASE_URL or PROGRAM_SEARCH_SNAPSHOT")
            }
        };

        let answerer = OpenAiAnswerer::from_config(http_client, &config.answer)
            .map(|a| Arc::new(a) as Arc<dyn AnswerGenerator>);
        if answerer.is_none() {
            tracing::info!("No answer-model key configured; answers disabled");
        }

        Ok(Self::with_components(config, Arc::new(embedder), store, answerer))
    }

    pub fn with_components(
        config: Config,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ProgramStore>,
        answerer: Option<Arc<dyn AnswerGenerator>>,
    ) -> Self {
        Self {
            config,
            embedder,
            store,
            answerer,
        }
    }
}
