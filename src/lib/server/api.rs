use std::error::Error;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State as AxumState, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::types::{AppState, ServerConfig};
use crate::lib::deploy::session::DeploySession;
use crate::lib::deploy::types::DeployStep;
use crate::lib::inspect::inspect::run_inspect;
use crate::lib::inspect::types::{InspectMessage, InspectRequest};
use crate::lib::spec::normalize::normalize;
use crate::lib::spec::types::ContainerSpec;
use crate::lib::validate::types::{EngineState, ValidationResult};
use crate::lib::validate::validate::validate;

pub struct ApiServer {
    pub state: Arc<AppState>,
    pub address: String,
    pub port: String,
}

#[derive(Debug, Deserialize)]
struct DeployParams {
    /// Id of the container this deploy replaces in place, if any.
    replace: Option<String>,
}

impl ApiServer {
    pub fn new(config: ServerConfig) -> Self {
        ApiServer {
            state: Arc::new(AppState::new()),
            address: config.address,
            port: config.port,
        }
    }

    async fn validate_spec(
        AxumState(state): AxumState<Arc<AppState>>,
        Json(spec): Json<ContainerSpec>,
    ) -> Result<Json<Vec<ValidationResult>>, (StatusCode, String)> {
        let engine = state
            .engine()
            .await
            .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;

        // Validation stays useful even when the binding query fails; the
        // local checks still run against an empty engine state.
        let port_bindings = match engine.active_port_bindings().await {
            Ok(bindings) => bindings,
            Err(e) => {
                warn!(%e, "could not list active port bindings");
                Vec::new()
            }
        };

        let spec = normalize(spec);
        Ok(Json(validate(&spec, &EngineState { port_bindings })))
    }

    async fn deploy(
        AxumState(state): AxumState<Arc<AppState>>,
        Query(params): Query<DeployParams>,
        ws: WebSocketUpgrade,
    ) -> impl IntoResponse {
        ws.on_upgrade(move |socket| Self::handle_deploy(state, params.replace, socket))
    }

    async fn handle_deploy(state: Arc<AppState>, replace: Option<String>, mut socket: WebSocket) {
        // The first frame must be the spec; anything else drops the
        // connection without emitting a step.
        let Some(spec) = read_request::<ContainerSpec>(&mut socket).await else {
            warn!("deploy request was not a valid container spec");
            return;
        };
        let engine = match state.engine().await {
            Ok(engine) => engine,
            Err(e) => {
                warn!(%e, "engine unavailable, closing deploy session");
                return;
            }
        };

        // The session runs in its own task so engine I/O never blocks
        // step emission; a failed send tells it the observer is gone.
        let (tx, mut rx) = mpsc::channel::<DeployStep>(32);
        let session = DeploySession::new(engine, tx);
        let task = tokio::spawn(session.run(spec, replace));

        while let Some(step) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&step) else {
                break;
            };
            if socket.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }

        drop(rx);
        let _ = task.await;
    }

    async fn inspect(
        AxumState(state): AxumState<Arc<AppState>>,
        ws: WebSocketUpgrade,
    ) -> impl IntoResponse {
        ws.on_upgrade(move |socket| Self::handle_inspect(state, socket))
    }

    async fn handle_inspect(state: Arc<AppState>, mut socket: WebSocket) {
        let Some(request) = read_request::<InspectRequest>(&mut socket).await else {
            warn!("inspect request was malformed");
            return;
        };
        let engine = match state.engine().await {
            Ok(engine) => engine,
            Err(e) => {
                warn!(%e, "engine unavailable, closing inspect session");
                return;
            }
        };

        let (tx, mut rx) = mpsc::channel::<InspectMessage>(32);
        let task = tokio::spawn(run_inspect(engine, request, tx));

        while let Some(message) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&message) else {
                break;
            };
            if socket.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }

        drop(rx);
        let _ = task.await;
    }

    pub async fn start_server(self) -> Result<(), Box<dyn Error>> {
        let address = self.address.clone();
        let port = self.port.clone();

        let app = Router::new()
            .route("/api/validate", post(ApiServer::validate_spec))
            .route("/api/deploy", get(ApiServer::deploy))
            .route("/api/inspect", get(ApiServer::inspect))
            .with_state(self.state);

        let listener = TcpListener::bind(format!("{}:{}", address, port)).await?;
        info!("listening on {}:{}", address, port);
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Read the session's opening request frame. Returns None on a closed
/// socket or a frame that does not parse, which ends the session before
/// any step is emitted.
async fn read_request<T: DeserializeOwned>(socket: &mut WebSocket) -> Option<T> {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(text) => return decode_request(&text),
            Message::Ping(_) | Message::Pong(_) => continue,
            _ => return None,
        }
    }
    None
}

/// Decode a session's opening frame. None means the frame was not the
/// expected request type and the connection gets dropped with no step
/// emitted.
fn decode_request<T: DeserializeOwned>(text: &str) -> Option<T> {
    serde_json::from_str(text).ok()
}
