use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const NETWORK_MODES: &[&str] = &["bridge", "host", "none"];
pub const RESTART_POLICIES: &[&str] = &["no", "always", "unless-stopped", "on-failure"];

/// One host-port to container-port mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortMapping {
    pub host_port: u16,
    pub container_port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeKind {
    /// Host path mounted into the container.
    Bind,
    /// Engine-managed named volume.
    Volume,
}

/// A single mount. `source` is a host path for binds and a volume
/// name for managed volumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    #[serde(rename = "type")]
    pub kind: VolumeKind,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub read_only: bool,
}

/// The canonical container specification every other component consumes.
///
/// `network_mode` and `restart_policy` stay strings so that out-of-set
/// values survive deserialization and get reported by validation instead
/// of being rejected at the serde layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub image: String,
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub network_mode: String,
    #[serde(default)]
    pub restart_policy: String,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub volumes: Vec<VolumeMount>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub entrypoint: Option<Vec<String>>,
    #[serde(default)]
    pub work_dir: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub cpu_limit: Option<f64>,
    #[serde(default)]
    pub memory_limit: Option<i64>,
    // Desktop-integration metadata, carried opaquely through deploy.
    #[serde(default)]
    pub has_web_ui: bool,
    #[serde(default)]
    pub web_ui_port: Option<u16>,
    #[serde(default)]
    pub web_ui_path: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub icon_light: Option<String>,
    #[serde(default)]
    pub icon_dark: Option<String>,
}

impl Default for ContainerSpec {
    fn default() -> Self {
        ContainerSpec {
            name: None,
            image: String::new(),
            auto_start: false,
            privileged: false,
            network_mode: String::new(),
            restart_policy: String::new(),
            ports: Vec::new(),
            volumes: Vec::new(),
            environment: HashMap::new(),
            command: None,
            entrypoint: None,
            work_dir: None,
            user: None,
            hostname: None,
            cpu_limit: None,
            memory_limit: None,
            has_web_ui: false,
            web_ui_port: None,
            web_ui_path: None,
            icon: None,
            icon_light: None,
            icon_dark: None,
        }
    }
}

/// One declared port from an image, e.g. "6379/tcp" split apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedPort {
    pub port: u16,
    pub protocol: String,
}

/// One environment entry declared by an image. `has_value` is false only
/// for a bare `KEY` token; `KEY=` means an explicit empty default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEnvVar {
    pub key: String,
    pub value: String,
    pub has_value: bool,
}

/// An image's configuration projected into the shape the UI edits.
/// Produced once per inspection, never persisted. Absent fields keep
/// their zero value rather than being omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub exposed_ports: Vec<ExposedPort>,
    pub environment: Vec<ImageEnvVar>,
    pub volumes: Vec<String>,
    pub labels: HashMap<String, String>,
    pub working_dir: String,
    pub user: String,
    pub entrypoint: Vec<String>,
    pub cmd: Vec<String>,
}
