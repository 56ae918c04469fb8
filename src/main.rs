use std::error::Error;

use tracing_subscriber::EnvFilter;

use crate::lib::server::{api::ApiServer, types::ServerConfig};

mod lib {
    pub mod deploy;
    pub mod engine;
    pub mod inspect;
    pub mod server;
    pub mod spec;
    pub mod validate;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dockhand=info")),
        )
        .init();

    let server = ApiServer::new(ServerConfig::from_env());
    server.start_server().await
}
