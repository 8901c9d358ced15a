//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use inspector_types::DashboardRepository;

use super::auth::session_middleware;
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use super::session::SessionManager;
use crate::InspectorService;
use crate::openapi::ApiDoc;

/// HTTP Server for the dashboard API.
pub struct HttpServer<R: DashboardRepository> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimiterState>,
    cors_origins: Vec<HeaderValue>,
}

impl<R: DashboardRepository> HttpServer<R> {
    /// Creates a server with the default rate limit (120 requests per minute).
    pub fn new(service: InspectorService<R>, sessions: SessionManager) -> Self {
        Self {
            state: Arc::new(AppState { service, sessions }),
            rate_limiter: Arc::new(RateLimiterState::default()),
            cors_origins: Vec::new(),
        }
    }

    pub fn with_rate_limit(
        service: InspectorService<R>,
        sessions: SessionManager,
        requests_per_minute: u32,
    ) -> Self {
        Self {
            rate_limiter: Arc::new(RateLimiterState::per_minute(requests_per_minute)),
            ..Self::new(service, sessions)
        }
    }

    /// Origins allowed to call the API with credentials from a browser.
    pub fn with_cors_origins(mut self, origins: Vec<HeaderValue>) -> Self {
        self.cors_origins = origins;
        self
    }

    fn cors(&self) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .allow_headers([CONTENT_TYPE]);
        if self.cors_origins.is_empty() {
            layer
        } else {
            layer
                .allow_origin(self.cors_origins.clone())
                .allow_credentials(true)
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Uses the globally set MeterProvider; a no-op until OTel is configured.
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let api = Router::new()
            .route("/health", get(handlers::health))
            // Public
            .route("/api/site", get(handlers::site_settings::<R>))
            .route("/api/auth/signup-status", get(handlers::signup_status::<R>))
            .route("/api/auth/signup", post(handlers::signup::<R>))
            .route("/api/auth/login", post(handlers::login::<R>))
            .route("/api/auth/logout", post(handlers::logout::<R>))
            // Signed-in user
            .route("/api/auth/me", get(handlers::me))
            .route("/api/profile", put(handlers::update_profile::<R>))
            .route("/api/sms/search", post(handlers::search_sms::<R>))
            .route("/api/sms/analyze", post(handlers::analyze_message::<R>))
            .route("/api/sms/summarize", post(handlers::summarize_message::<R>))
            .route(
                "/api/numbers",
                get(handlers::list_numbers::<R>).post(handlers::add_numbers::<R>),
            )
            // Admin
            .route("/api/admin/login", post(handlers::admin_login::<R>))
            .route("/api/admin/logout", post(handlers::admin_logout::<R>))
            .route(
                "/api/admin/settings",
                get(handlers::get_settings::<R>).put(handlers::update_settings::<R>),
            )
            .route("/api/admin/users", get(handlers::list_users::<R>))
            .route(
                "/api/admin/users/{id}/status",
                put(handlers::set_user_status::<R>),
            )
            .route(
                "/api/admin/users/{id}/number-permission",
                put(handlers::set_number_permission::<R>),
            )
            .route("/api/admin/numbers", put(handlers::replace_numbers::<R>));

        api.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                session_middleware::<R>,
            ))
            .layer(middleware::from_fn_with_state(
                (self.rate_limiter.clone(), self.state.sessions.clone()),
                rate_limit_middleware,
            ))
            .layer(self.cors())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
