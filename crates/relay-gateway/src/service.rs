//! Relay service: builds the shared state and the HTTP router, and runs the
//! server until shutdown.

use crate::adapters::notifier_from_config;
use crate::domain::access::IpGate;
use crate::domain::admin::AdminControl;
use crate::domain::config::RelayConfig;
use crate::domain::error::RelayError;
use crate::domain::ledger::TransactionLedger;
use crate::domain::secret::SharedSecret;
use crate::handlers::{admin, events, system, AppState};
use crate::middleware::{
    create_cors_layer, rate_limit, ApiKeyLayer, ClientAddrLayer, IpGateLayer, RateLimitLayer,
    RelayMetrics, TimeoutLayer, TracingLayer,
};
use crate::ports::Notifier;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{info, warn};

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

pub struct RelayService {
    config: RelayConfig,
    state: AppState,
    rate_limit: RateLimitLayer,
}

impl RelayService {
    /// Create a relay with an explicit notifier.
    pub fn new(config: RelayConfig, notifier: Arc<dyn Notifier>) -> Result<Self, RelayError> {
        config.validate()?;

        let metrics = Arc::new(RelayMetrics::new());
        let gate = Arc::new(IpGate::with_policy(config.access.initial_policy()));
        let admin = Arc::new(AdminControl::new(
            Arc::clone(&gate),
            SharedSecret::new(config.auth.admin_key.clone()),
        ));

        let state = AppState {
            ledger: Arc::new(TransactionLedger::new()),
            gate,
            admin,
            notifier,
            metrics: Arc::clone(&metrics),
        };
        let rate_limit = RateLimitLayer::new(config.rate_limit.clone(), metrics);

        Ok(Self {
            config,
            state,
            rate_limit,
        })
    }

    /// Create a relay whose notifier is chosen from `config.notify`.
    pub fn from_config(config: RelayConfig) -> Result<Self, RelayError> {
        let notifier =
            notifier_from_config(&config.notify).map_err(|e| RelayError::Notifier(e.to_string()))?;
        Self::new(config, notifier)
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Build the HTTP router with the full middleware stack.
    pub fn router(&self) -> Router {
        let metrics = Arc::clone(&self.state.metrics);

        let ledger_routes = Router::new()
            .route("/api/checkout", post(events::checkout))
            .route("/api/payment", post(events::payment))
            .route_layer(ApiKeyLayer::new(
                SharedSecret::new(self.config.auth.api_key.clone()),
                Arc::clone(&metrics),
            ));

        let gated_routes = Router::new()
            .route("/api/webhook", post(events::webhook))
            .route("/metrics", get(system::metrics))
            .merge(ledger_routes)
            .route_layer(IpGateLayer::new(
                Arc::clone(&self.state.gate),
                Arc::clone(&metrics),
            ));

        // Admin routes are not gated
        let admin_routes = Router::new()
            .route("/api/admin/ip-status", get(admin::ip_status))
            .route("/api/admin/block-ip", post(admin::block_ip))
            .route("/api/admin/allow-ip", post(admin::allow_ip))
            .route("/api/admin/remove-ip", post(admin::remove_ip))
            .route("/api/admin/ip-mode", post(admin::ip_mode));

        let middleware = ServiceBuilder::new()
            .layer(ClientAddrLayer::new())
            .layer(TracingLayer::new(metrics))
            .layer(create_cors_layer(&self.config.cors))
            .layer(TimeoutLayer::new(self.config.http.request_timeout))
            .layer(self.rate_limit.clone());

        Router::new()
            .route("/health", get(system::health_check))
            .merge(gated_routes)
            .merge(admin_routes)
            .layer(DefaultBodyLimit::max(self.config.http.max_body_bytes))
            .with_state(self.state.clone())
            .layer(middleware)
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RelayError::Bind(format!("{}: {}", addr, e)))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.log_surface();

        let cleanup = tokio::spawn(rate_limit::cleanup_task(
            self.rate_limit.state(),
            RATE_LIMIT_CLEANUP_INTERVAL,
        ));

        let router = self.router();
        info!(addr = %listener.local_addr()?, "Relay listening");

        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        cleanup.abort();
        info!("Relay stopped");
        result.map_err(RelayError::from)
    }

    fn log_surface(&self) {
        if self.config.auth.api_key.is_none() {
            warn!("No API key configured; checkout and payment accept unauthenticated requests");
        }
        if self.config.auth.admin_key.is_none() {
            warn!("No admin key configured; admin endpoints will reject every request");
        }
        info!(
            mode = %self.state.gate.mode(),
            notifier = self.state.notifier.name(),
            rate_limit = self.config.rate_limit.enabled,
            "Relay configured"
        );
    }
}
