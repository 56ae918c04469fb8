//! Scripted engine used by the controller/inspector tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;

use super::docker::ContainerEngine;
use super::types::{EngineError, HostPortBinding, PullStream, RawImageConfig};
use crate::lib::spec::types::ContainerSpec;

pub struct FakeEngine {
    pub images: Mutex<HashSet<String>>,
    pub pull_lines: Vec<String>,
    pub pull_error: Option<String>,
    pub volumes: Mutex<Vec<String>>,
    pub raw_config: RawImageConfig,
    pub port_bindings: Vec<HostPortBinding>,
    pub fail_stop: bool,
    pub fail_remove: bool,
    pub fail_create: bool,
    pub fail_start: bool,
    /// Name of the managed volume whose creation should fail, if any.
    pub fail_volume: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        FakeEngine {
            images: Mutex::new(HashSet::new()),
            pull_lines: vec!["Pulling fs layer".to_string(), "Download complete".to_string()],
            pull_error: None,
            volumes: Mutex::new(Vec::new()),
            raw_config: RawImageConfig::default(),
            port_bindings: Vec::new(),
            fail_stop: false,
            fail_remove: false,
            fail_create: false,
            fail_start: false,
            fail_volume: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeEngine {
    pub fn with_image(image: &str) -> Self {
        let fake = FakeEngine::default();
        fake.images.lock().unwrap().insert(image.to_string());
        fake
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn image_exists(&self, image: &str) -> bool {
        self.images.lock().unwrap().contains(image)
    }

    fn pull(&self, image: &str) -> PullStream {
        self.record(format!("pull {}", image));
        let mut items: Vec<Result<String, EngineError>> =
            self.pull_lines.iter().cloned().map(Ok).collect();
        match &self.pull_error {
            Some(err) => items.push(Err(EngineError::Other(err.clone()))),
            None => {
                self.images.lock().unwrap().insert(image.to_string());
            }
        }
        Box::pin(stream::iter(items))
    }

    async fn volume_list(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.volumes.lock().unwrap().clone())
    }

    async fn volume_create(&self, name: &str) -> Result<(), EngineError> {
        self.record(format!("volume_create {}", name));
        if self.fail_volume.as_deref() == Some(name) {
            return Err(EngineError::Other(format!("volume {} rejected", name)));
        }
        self.volumes.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        self.record(format!("create {}", spec.image));
        if self.fail_create {
            return Err(EngineError::Other("create rejected by engine".to_string()));
        }
        Ok("cafebabe1234".to_string())
    }

    async fn start(&self, id: &str) -> Result<(), EngineError> {
        self.record(format!("start {}", id));
        if self.fail_start {
            return Err(EngineError::Other("start rejected by engine".to_string()));
        }
        Ok(())
    }

    async fn stop(&self, id: &str) -> Result<(), EngineError> {
        self.record(format!("stop {}", id));
        if self.fail_stop {
            return Err(EngineError::Other("container already stopped".to_string()));
        }
        Ok(())
    }

    async fn remove(&self, id: &str, force: bool) -> Result<(), EngineError> {
        self.record(format!("remove {} force={}", id, force));
        if self.fail_remove {
            return Err(EngineError::Other("container is locked".to_string()));
        }
        Ok(())
    }

    async fn inspect_image(&self, image: &str) -> Result<RawImageConfig, EngineError> {
        self.record(format!("inspect_image {}", image));
        if !self.image_exists(image).await {
            return Err(EngineError::Other(format!("no such image: {}", image)));
        }
        Ok(self.raw_config.clone())
    }

    async fn active_port_bindings(&self) -> Result<Vec<HostPortBinding>, EngineError> {
        Ok(self.port_bindings.clone())
    }
}
