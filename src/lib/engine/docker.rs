use std::collections::HashMap;

use async_trait::async_trait;
use bollard::{
    Docker,
    container::{
        Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
        StartContainerOptions,
    },
    image::CreateImageOptions,
    secret::{HostConfig, PortBinding, PortTypeEnum, RestartPolicy, RestartPolicyNameEnum},
    volume::CreateVolumeOptions,
};
use futures_util::stream::StreamExt;
use tracing::debug;

use super::types::{EngineError, HostPortBinding, PullStream, RawImageConfig};
use crate::lib::spec::types::ContainerSpec;

/// The engine capability object. Everything the deploy controller, the
/// image inspector and the validation plumbing need from the container
/// engine goes through this trait, so all of them run against a fake in
/// tests.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    async fn image_exists(&self, image: &str) -> bool;
    fn pull(&self, image: &str) -> PullStream;
    async fn volume_list(&self) -> Result<Vec<String>, EngineError>;
    async fn volume_create(&self, name: &str) -> Result<(), EngineError>;
    async fn create(&self, spec: &ContainerSpec) -> Result<String, EngineError>;
    async fn start(&self, id: &str) -> Result<(), EngineError>;
    async fn stop(&self, id: &str) -> Result<(), EngineError>;
    async fn remove(&self, id: &str, force: bool) -> Result<(), EngineError>;
    async fn inspect_image(&self, image: &str) -> Result<RawImageConfig, EngineError>;
    async fn active_port_bindings(&self) -> Result<Vec<HostPortBinding>, EngineError>;
}

#[derive(Debug, Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    pub fn connect() -> Result<Self, EngineError> {
        let docker = Docker::connect_with_unix_defaults()
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        Ok(DockerEngine { docker })
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn image_exists(&self, image: &str) -> bool {
        self.docker.inspect_image(image).await.is_ok()
    }

    fn pull(&self, image: &str) -> PullStream {
        let stream = self.docker.create_image(
            Some(CreateImageOptions {
                from_image: image.to_string(),
                ..Default::default()
            }),
            None,
            None,
        );

        Box::pin(stream.filter_map(|msg| async move {
            match msg {
                Ok(info) => {
                    let mut line = info.status.unwrap_or_default();
                    if let Some(progress) = info.progress {
                        line = format!("{} {}", line, progress);
                    }
                    if line.is_empty() {
                        None
                    } else {
                        Some(Ok(line))
                    }
                }
                Err(e) => Some(Err(EngineError::from(e))),
            }
        }))
    }

    async fn volume_list(&self) -> Result<Vec<String>, EngineError> {
        let resp = self.docker.list_volumes::<String>(None).await?;
        Ok(resp
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(|v| v.name)
            .collect())
    }

    async fn volume_create(&self, name: &str) -> Result<(), EngineError> {
        debug!(volume = name, "creating managed volume");
        self.docker
            .create_volume(CreateVolumeOptions {
                name: name.to_string(),
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        let mut env: Vec<String> = spec
            .environment
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        env.sort();

        let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
        let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        for port in &spec.ports {
            let key = format!("{}/{}", port.container_port, port.protocol);
            exposed_ports.insert(key.clone(), HashMap::new());
            let bindings = port_bindings.entry(key).or_insert_with(|| Some(Vec::new()));
            if let Some(bindings) = bindings {
                bindings.push(PortBinding {
                    host_ip: None,
                    host_port: Some(port.host_port.to_string()),
                });
            }
        }

        let binds: Vec<String> = spec
            .volumes
            .iter()
            .map(|v| {
                if v.read_only {
                    format!("{}:{}:ro", v.source, v.target)
                } else {
                    format!("{}:{}", v.source, v.target)
                }
            })
            .collect();

        let host_config = HostConfig {
            binds: (!binds.is_empty()).then_some(binds),
            port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
            network_mode: Some(spec.network_mode.clone()),
            restart_policy: Some(RestartPolicy {
                name: Some(restart_policy_name(&spec.restart_policy)),
                maximum_retry_count: None,
            }),
            privileged: Some(spec.privileged),
            nano_cpus: spec.cpu_limit.map(|cores| (cores * 1_000_000_000.0) as i64),
            memory: spec.memory_limit,
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(env),
            cmd: spec.command.clone(),
            entrypoint: spec.entrypoint.clone(),
            working_dir: spec.work_dir.clone(),
            user: spec.user.clone(),
            hostname: spec.hostname.clone(),
            exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
            labels: Some(metadata_labels(spec)),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = spec.name.as_ref().map(|name| CreateContainerOptions {
            name: name.clone(),
            platform: None,
        });

        let resp = self.docker.create_container(options, config).await?;
        Ok(resp.id)
    }

    async fn start(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop(&self, id: &str) -> Result<(), EngineError> {
        self.docker.stop_container(id, None).await?;
        Ok(())
    }

    async fn remove(&self, id: &str, force: bool) -> Result<(), EngineError> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    async fn inspect_image(&self, image: &str) -> Result<RawImageConfig, EngineError> {
        let inspect = self.docker.inspect_image(image).await?;
        let config = inspect.config.unwrap_or_default();

        // The engine hands ports and volumes back as map keys; sort them
        // so repeated inspections report a stable order.
        let mut exposed_ports: Vec<String> =
            config.exposed_ports.unwrap_or_default().into_keys().collect();
        exposed_ports.sort();
        let mut volumes: Vec<String> = config.volumes.unwrap_or_default().into_keys().collect();
        volumes.sort();

        Ok(RawImageConfig {
            exposed_ports,
            env: config.env.unwrap_or_default(),
            volumes,
            labels: config.labels.unwrap_or_default(),
            working_dir: config.working_dir,
            user: config.user,
            entrypoint: config.entrypoint,
            cmd: config.cmd,
        })
    }

    async fn active_port_bindings(&self) -> Result<Vec<HostPortBinding>, EngineError> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: false,
                ..Default::default()
            }))
            .await?;

        let mut bindings = Vec::new();
        for container in containers {
            let owner = container
                .names
                .as_ref()
                .and_then(|names| names.first())
                .map(|name| name.trim_start_matches('/').to_string())
                .or(container.id)
                .unwrap_or_default();

            for port in container.ports.unwrap_or_default() {
                if let Some(public) = port.public_port {
                    bindings.push(HostPortBinding {
                        host_port: public as u16,
                        protocol: port_type_str(port.typ).to_string(),
                        owner: owner.clone(),
                    });
                }
            }
        }
        Ok(bindings)
    }
}

fn restart_policy_name(policy: &str) -> RestartPolicyNameEnum {
    match policy {
        "always" => RestartPolicyNameEnum::ALWAYS,
        "unless-stopped" => RestartPolicyNameEnum::UNLESS_STOPPED,
        "on-failure" => RestartPolicyNameEnum::ON_FAILURE,
        _ => RestartPolicyNameEnum::NO,
    }
}

fn port_type_str(typ: Option<PortTypeEnum>) -> &'static str {
    match typ {
        Some(PortTypeEnum::UDP) => "udp",
        Some(PortTypeEnum::SCTP) => "sctp",
        _ => "tcp",
    }
}

/// Desktop-integration metadata rides along as namespaced labels; the
/// engine never interprets it.
fn metadata_labels(spec: &ContainerSpec) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    labels.insert("dockhand.managed".to_string(), "true".to_string());
    labels.insert(
        "dockhand.has_web_ui".to_string(),
        spec.has_web_ui.to_string(),
    );
    if let Some(port) = spec.web_ui_port {
        labels.insert("dockhand.web_ui_port".to_string(), port.to_string());
    }
    if let Some(path) = &spec.web_ui_path {
        labels.insert("dockhand.web_ui_path".to_string(), path.clone());
    }
    if let Some(icon) = &spec.icon {
        labels.insert("dockhand.icon".to_string(), icon.clone());
    }
    if let Some(icon) = &spec.icon_light {
        labels.insert("dockhand.icon_light".to_string(), icon.clone());
    }
    if let Some(icon) = &spec.icon_dark {
        labels.insert("dockhand.icon_dark".to_string(), icon.clone());
    }
    labels
}
