//! HTTP server bootstrap for the registry.
//!
//! This module wires together:
//! - configuration
//! - the ledger backend (EVM or in-memory)
//! - the encryption gateway
//! - the record orchestrator
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::api::{router, AppState};
use crate::gateway::{EncryptionGateway, LocalBackend};
use crate::infra::{InMemoryLedger, LedgerRead, LedgerWrite};
use crate::ledger::{EvmLedger, LedgerConfig};
use crate::orchestrator::RecordOrchestrator;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Whether to back the registry with the EVM ledger or the in-memory
    /// ledger (local development).
    pub use_evm_ledger: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .expect("Invalid listen address");

        let use_evm_ledger = std::env::var("REGISTRY_CONTRACT_ADDRESS").is_ok();

        Self {
            listen_addr,
            use_evm_ledger,
        }
    }
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env();
    info!(
        "Starting sealed-registry v{} on {}",
        env!("CARGO_PKG_VERSION"),
        config.listen_addr
    );

    let (reader, writer, contract): (Arc<dyn LedgerRead>, Option<Arc<dyn LedgerWrite>>, String) =
        if config.use_evm_ledger {
            let ledger_config = LedgerConfig::from_env()?;
            let contract = ledger_config.contract_address.to_string();
            let reader = Arc::new(EvmLedger::read_only(ledger_config.clone()));
            let writer: Option<Arc<dyn LedgerWrite>> = match ledger_config.private_key {
                Some(_) => Some(Arc::new(EvmLedger::with_signer(ledger_config)?)),
                None => {
                    warn!("REGISTRY_PRIVATE_KEY not set; running read-only");
                    None
                }
            };
            (reader, writer, contract)
        } else {
            warn!("REGISTRY_CONTRACT_ADDRESS not set; using the in-memory ledger");
            let ledger = InMemoryLedger::new("0x0000000000000000000000000000000000000001");
            (
                Arc::new(ledger.clone()),
                Some(Arc::new(ledger)),
                "in-memory".to_string(),
            )
        };

    let gateway = Arc::new(EncryptionGateway::new(Arc::new(LocalBackend::new()), contract));
    let orchestrator = Arc::new(RecordOrchestrator::new(reader, writer, gateway));

    // The encryption context must be up before any encrypt call; the
    // record list is primed best-effort and degrades to empty on failure.
    orchestrator.initialize_encryption().await?;
    orchestrator.refresh().await;

    let state = AppState { orchestrator };
    let mut app = router(state).layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors_layer_from_env()? {
        app = app.layer(cors_layer);
    }

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

fn cors_layer_from_env() -> anyhow::Result<Option<CorsLayer>> {
    let origins = match std::env::var("CORS_ALLOW_ORIGINS") {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };

    let origins = origins.trim();
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]),
    ))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
