//! Gateway server and router

use adgate_auth::HmacAuth;
use adgate_core::config::DirectoryBackend;
use adgate_core::{AdgateConfig, Directory, Result};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{info, warn};

use crate::metrics::{metrics_handler, metrics_middleware, MetricsRecorder};
use crate::middleware::hmac_auth;
use crate::routes::{groups, ous, search, status, users};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AdgateConfig>,
    pub directory: Arc<dyn Directory>,
    pub auth: Arc<HmacAuth>,
    pub start_time: Instant,
    pub metrics: Option<Arc<MetricsRecorder>>,
}

impl AppState {
    pub fn new(config: AdgateConfig, directory: Arc<dyn Directory>) -> Result<Self> {
        let auth = HmacAuth::from_config(&config.auth)?;

        Ok(Self {
            config: Arc::new(config),
            directory,
            auth: Arc::new(auth),
            start_time: Instant::now(),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Directory gateway server
pub struct GatewayServer {
    config: AdgateConfig,
    directory: Arc<dyn Directory>,
}

impl GatewayServer {
    pub fn new(config: AdgateConfig, directory: Arc<dyn Directory>) -> Self {
        Self { config, directory }
    }

    pub async fn run(self) -> Result<()> {
        self.config.validate()?;

        let directory = &self.config.directory;
        if directory.backend == DirectoryBackend::Ldap && !directory.is_secure() {
            warn!("Directory connection is not encrypted; password changes will be refused");
        }

        let addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );
        let metrics_enabled = self.config.metrics.enabled;

        let mut state = AppState::new(self.config, self.directory)?;
        if metrics_enabled {
            state = state.with_metrics(Arc::new(MetricsRecorder::install()?));
            info!("Prometheus metrics initialized");
        }

        let app = build_router(state);
        let listener = TcpListener::bind(&addr).await?;

        info!("Adgate listening on http://{}", addr);
        if metrics_enabled {
            info!("Prometheus metrics at http://{}/metrics", addr);
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Adgate stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Assemble every route; all but `/status` and `/metrics` require a signature
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        // Users
        .route("/users", get(users::list_users).post(users::add_user))
        .route(
            "/users/{user}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::remove_user),
        )
        .route("/users/{user}/exists", get(users::user_exists))
        .route("/users/{user}/member-of/{group}", get(users::is_member_of))
        .route("/users/{user}/authenticate", post(users::authenticate))
        .route("/users/{user}/password", put(users::set_password))
        .route(
            "/users/{user}/password-never-expires",
            put(users::set_password_never_expires),
        )
        .route(
            "/users/{user}/password-expires",
            put(users::set_password_expires),
        )
        .route("/users/{user}/enable", put(users::enable_user))
        .route("/users/{user}/disable", put(users::disable_user))
        .route("/users/{user}/move", put(users::move_user))
        .route("/users/{user}/unlock", put(users::unlock_user))
        // Groups
        .route("/group", get(groups::list_groups).post(groups::add_group))
        .route(
            "/group/{group}",
            get(groups::get_group).delete(groups::remove_group),
        )
        .route("/group/{group}/exists", get(groups::group_exists))
        .route(
            "/group/{group}/users/{user}",
            post(groups::add_user_to_group).delete(groups::remove_user_from_group),
        )
        // Organizational units
        .route("/ou", get(ous::list_ous).post(ous::add_ou))
        .route("/ou/{ou}", get(ous::get_ou).delete(ous::remove_ou))
        .route("/ou/{ou}/exists", get(ous::ou_exists))
        // Everything else
        .route("/other", get(search::list_other))
        .route("/all", get(search::list_all))
        .route("/find/{filter}", get(search::find))
        .route_layer(middleware::from_fn_with_state(state.clone(), hmac_auth));

    let mut router = Router::new()
        .route("/status", get(status::status))
        .merge(protected);

    if let Some(metrics) = state.metrics.clone() {
        router = router
            .route("/metrics", get(metrics_handler))
            .layer(middleware::from_fn_with_state(metrics, metrics_middleware));
    }

    router
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}
