use std::env;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::lib::engine::docker::{ContainerEngine, DockerEngine};
use crate::lib::engine::types::EngineError;

/// Listen address, overridable through the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        ServerConfig {
            address: env::var("DOCKHAND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("DOCKHAND_PORT").unwrap_or_else(|_| "8080".to_string()),
        }
    }
}

/// Shared request state. The engine connection is established lazily on
/// the first request that needs it and handed to sessions as an explicit
/// capability object.
#[derive(Default)]
pub struct AppState {
    engine: OnceCell<Arc<DockerEngine>>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            engine: OnceCell::new(),
        }
    }

    pub async fn engine(&self) -> Result<Arc<dyn ContainerEngine>, EngineError> {
        let engine = self
            .engine
            .get_or_try_init(|| async { DockerEngine::connect().map(Arc::new) })
            .await?;
        Ok(engine.clone())
    }
}
