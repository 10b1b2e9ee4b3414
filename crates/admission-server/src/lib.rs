mod api;
pub mod certs;
pub mod cli;
pub mod config;
pub mod metrics;
pub mod tracing;

use admission_evaluator::{policy::PolicyTable, DecisionEngine};
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::trace::{self, TraceLayer};

use ::tracing::{info, warn, Level};

use crate::api::{
    handlers::{readiness_handler, validate_handler},
    state::ApiServerState,
};
use crate::config::Config;

/// Time given to in-flight requests to complete once a shutdown signal is received
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AdmissionServer {
    router: Router,
    addr: SocketAddr,
    tls_config: Option<RustlsConfig>,
}

impl AdmissionServer {
    pub async fn new_from_config(config: Config) -> Result<Self> {
        let policies = match &config.policies {
            Some(rules) => PolicyTable::from_config(rules)?,
            None => PolicyTable::default(),
        };
        for rule in policies.rules() {
            info!(
                rule = rule.name.as_str(),
                kind = rule.matcher.kind.as_str(),
                group = rule.matcher.group.as_deref().unwrap_or("*"),
                "policy rule loaded"
            );
        }
        if policies.is_empty() {
            warn!("no policy rules configured, every request is going to be allowed");
        }

        let state = Arc::new(ApiServerState {
            engine: DecisionEngine::new(policies),
        });

        let tls_config = match &config.tls_config {
            Some(tls_config) => Some(certs::create_tls_config(tls_config).await?),
            None => None,
        };

        let router = Router::new()
            .route("/validate", post(validate_handler))
            .route("/readiness", get(readiness_handler))
            .with_state(state)
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
            );

        Ok(Self {
            router,
            addr: config.addr,
            tls_config,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run(self) -> Result<()> {
        let handle = Handle::new();
        tokio::spawn(shutdown_signal(handle.clone()));

        match self.tls_config {
            Some(tls_config) => {
                info!(address = %self.addr, "started HTTPS server");
                axum_server::bind_rustls(self.addr, tls_config)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await?;
            }
            None => {
                info!(address = %self.addr, "started HTTP server");
                axum_server::bind(self.addr)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await?;
            }
        }
        info!("server stopped");

        Ok(())
    }
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
    handle.graceful_shutdown(Some(GRACEFUL_SHUTDOWN_TIMEOUT));
}
