use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use reqwest::Client;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    api, auth,
    config::{AppConfig, BaseLinkerConfig, ImporterConfig},
    feed::FeedTransformer,
    middleware::assign_trace_id,
};

#[derive(Clone)]
pub struct AppState {
    pub admin: auth::AdminManager,
    pub transformer: FeedTransformer,
    pub importer: ImporterConfig,
    pub baselinker: BaseLinkerConfig,
    pub http_client: Client,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.importer.request_timeout_secs.max(1));
        let http_client = Client::builder()
            .user_agent(concat!("FeedCleaner/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        let admin = auth::AdminManager::new(
            config.admin.username.clone(),
            config.admin.password.clone(),
            Duration::from_secs(std::cmp::max(60_u64, config.admin.session_ttl_secs)),
        );

        Ok(Self {
            admin,
            transformer: config.feed.transformer()?,
            importer: config.importer.clone(),
            baselinker: config.baselinker.clone(),
            http_client,
        })
    }
}

pub fn build_router(config: &AppConfig) -> anyhow::Result<Router> {
    let state = AppState::from_config(config)?;
    tracing::info!(
        legacy_encoding = state.transformer.legacy_encoding().name(),
        admin_enabled = state.admin.is_configured(),
        "application state ready"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(assign_trace_id));

    let admin_api = Router::new()
        .route("/feed/import", post(api::feeds::import_feed))
        .route("/baselinker", post(api::baselinker::proxy))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    let router = Router::new()
        .route("/healthz", get(api::health::health_check))
        .route("/api/sanitize", post(api::sanitize::sanitize_fragment))
        .route("/api/feed/clean", post(api::feeds::clean_feed))
        .route("/admin/login", post(api::admin::login))
        .route("/admin/logout", post(api::admin::logout))
        .nest("/admin/api", admin_api)
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(layers)
        .with_state(state);

    Ok(router)
}
