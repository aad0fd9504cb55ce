//! BACH AI relay server.
//!
//! Usage:
//!   API_KEY=<key> bach-relay
//!
//! Environment:
//!   API_KEY                  Upstream credential (required)
//!   PORT                     Listen port (default 5000)
//!   BACH_HOST                Bind address (default 0.0.0.0)
//!   BACH_TEXT_MODEL          Chat model
//!   BACH_IMAGE_MODEL         Image model
//!   BACH_UPSTREAM_URL        Upstream API base URL
//!   BACH_HTTP_TIMEOUT_SECS   Upstream request timeout
//!   BACH_BODY_LIMIT_MB       Request body limit (default 50)
//!   RUST_LOG                 Log filter (default info,bach_relay=debug)

use anyhow::Context;
use bach_relay::{server, GeminiBackend, RelayConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bach_relay=debug".into()),
        )
        .with_target(false)
        .with_line_number(true)
        .init();

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("Set API_KEY before starting the relay.");
            std::process::exit(1);
        }
    };

    let backend = GeminiBackend::new(&config).context("failed to build upstream client")?;
    server::serve(&config, Arc::new(backend))
        .await
        .context("relay server stopped with an error")?;
    Ok(())
}
