use std::sync::Arc;

use futures_util::stream::StreamExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::types::{InspectMessage, InspectRequest, InspectStatus};
use crate::lib::engine::docker::ContainerEngine;
use crate::lib::engine::types::RawImageConfig;
use crate::lib::spec::types::{ExposedPort, ImageConfig, ImageEnvVar};

/// One inspect session: ensure the image is present (pulling only when
/// asked to), read its configuration from the engine and project it into
/// the shape the UI edits. Messages mirror the deploy session's streamed
/// contract.
pub async fn run_inspect(
    engine: Arc<dyn ContainerEngine>,
    request: InspectRequest,
    tx: mpsc::Sender<InspectMessage>,
) {
    info!(image = %request.image, pull = request.pull, "inspect session started");

    let send = |msg: InspectMessage| {
        let tx = tx.clone();
        async move { tx.send(msg).await.is_ok() }
    };

    if !send(
        InspectMessage::status(InspectStatus::Connecting)
            .with_message(format!("looking up {}", request.image)),
    )
    .await
    {
        return;
    }

    let mut present = engine.image_exists(&request.image).await;

    if !present {
        if !request.pull {
            let _ = send(InspectMessage::not_found()).await;
            return;
        }

        if !send(
            InspectMessage::status(InspectStatus::Pulling)
                .with_message(format!("pulling {}", request.image)),
        )
        .await
        {
            return;
        }

        let mut lines = engine.pull(&request.image);
        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => {
                    if !send(InspectMessage::output(line)).await {
                        return;
                    }
                }
                Err(e) => {
                    warn!(image = %request.image, %e, "inspect pull failed");
                    let _ = send(InspectMessage::error(format!("pull failed: {}", e))).await;
                    return;
                }
            }
        }

        present = true;
        if !send(InspectMessage::status(InspectStatus::Pulled)).await {
            return;
        }
    }

    debug_assert!(present);
    if !send(InspectMessage::status(InspectStatus::Inspecting)).await {
        return;
    }

    match engine.inspect_image(&request.image).await {
        Ok(raw) => {
            let _ = send(InspectMessage::complete(project(raw))).await;
        }
        Err(e) => {
            warn!(image = %request.image, %e, "image inspect failed");
            let _ = send(InspectMessage::error(e.to_string())).await;
        }
    }
}

/// Project the engine's raw image configuration into the contract shape.
/// Malformed entries are dropped, the rest of the inspection continues;
/// partial discovery beats an aborted one.
pub fn project(raw: RawImageConfig) -> ImageConfig {
    let exposed_ports = raw
        .exposed_ports
        .iter()
        .filter_map(|token| parse_port_token(token))
        .collect();

    let environment = raw.env.iter().map(|token| parse_env_token(token)).collect();

    let mut volumes: Vec<String> = Vec::new();
    for path in raw.volumes {
        if !volumes.contains(&path) {
            volumes.push(path);
        }
    }

    ImageConfig {
        exposed_ports,
        environment,
        volumes,
        labels: raw.labels,
        working_dir: raw.working_dir.unwrap_or_default(),
        user: raw.user.unwrap_or_default(),
        entrypoint: raw.entrypoint.unwrap_or_default(),
        cmd: raw.cmd.unwrap_or_default(),
    }
}

/// Split a declared `port/protocol` token, e.g. "6379/tcp". A bare port
/// defaults to tcp; an unparseable port drops the entry.
fn parse_port_token(token: &str) -> Option<ExposedPort> {
    let (port, protocol) = match token.split_once('/') {
        Some((port, protocol)) => (port, protocol),
        None => (token, "tcp"),
    };
    let port = port.parse::<u16>().ok()?;
    Some(ExposedPort {
        port,
        protocol: protocol.to_lowercase(),
    })
}

/// Split a `KEY` or `KEY=value` token. `has_value` is false only for a
/// bare `KEY`; `KEY=` is an explicit empty default, which callers treat
/// differently when deciding whether to prompt.
fn parse_env_token(token: &str) -> ImageEnvVar {
    match token.split_once('=') {
        Some((key, value)) => ImageEnvVar {
            key: key.to_string(),
            value: value.to_string(),
            has_value: true,
        },
        None => ImageEnvVar {
            key: token.to_string(),
            value: String::new(),
            has_value: false,
        },
    }
}
