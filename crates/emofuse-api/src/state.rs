//! Application state.

use std::sync::Arc;

use emofuse_media::{EmotionEngine, EngineConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub engine: Arc<EmotionEngine>,
}

impl AppState {
    /// Wrap an already loaded engine.
    pub fn new(config: ApiConfig, engine: EmotionEngine) -> Self {
        Self {
            config,
            engine: Arc::new(engine),
        }
    }

    /// Load the engine described by the environment.
    ///
    /// Model loading is blocking work, so it runs off the async runtime.
    pub async fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let engine_config = EngineConfig::from_env();
        let engine =
            tokio::task::spawn_blocking(move || EmotionEngine::from_config(&engine_config))
                .await??;
        Ok(Self::new(config, engine))
    }
}
