use std::collections::HashMap;
use std::pin::Pin;

use futures_util::Stream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("container engine unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Api(#[from] bollard::errors::Error),
    #[error("{0}")]
    Other(String),
}

/// Raw pull progress, one relayed line per stream item.
pub type PullStream = Pin<Box<dyn Stream<Item = Result<String, EngineError>> + Send>>;

/// A (host_port, protocol) pair already bound on the host, with the
/// container holding it. Consumed by validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPortBinding {
    pub host_port: u16,
    pub protocol: String,
    pub owner: String,
}

/// An image's configuration as the engine reports it, before projection.
/// Port and volume tokens keep the engine's raw `port/proto` and path
/// syntax; env entries keep the raw `KEY=value` form.
#[derive(Debug, Clone, Default)]
pub struct RawImageConfig {
    pub exposed_ports: Vec<String>,
    pub env: Vec<String>,
    pub volumes: Vec<String>,
    pub labels: HashMap<String, String>,
    pub working_dir: Option<String>,
    pub user: Option<String>,
    pub entrypoint: Option<Vec<String>>,
    pub cmd: Option<Vec<String>>,
}
