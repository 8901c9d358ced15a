//! # Inspector Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter
//! - Build the billing gateway and the message analyzer
//! - Seed the admin account and API key
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use axum::http::HeaderValue;
use opentelemetry::global;
use opentelemetry_sdk::{
    metrics::SdkMeterProvider, propagation::TraceContextPropagator, trace as sdktrace,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inspector_hex::inbound::{HttpServer, SessionManager};
use inspector_hex::outbound::{GeminiAnalyzer, PatternAnalyzer};
use inspector_hex::{AdminCredentials, InspectorService};
use inspector_repo::build_repo;
use inspector_types::MessageAnalyzer;
use premiumy::{PremiumyClient, PremiumyConfig};

use config::Config;

struct Telemetry {
    tracer_provider: sdktrace::SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl Telemetry {
    fn shutdown(self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            eprintln!("Failed to flush traces: {}", e);
        }
        if let Err(e) = self.meter_provider.shutdown() {
            eprintln!("Failed to flush metrics: {}", e);
        }
    }
}

/// OTLP trace and metric export over gRPC. The endpoint is read by the exporter
/// from `OTEL_EXPORTER_OTLP_ENDPOINT`.
fn init_telemetry() -> anyhow::Result<(sdktrace::Tracer, Telemetry)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Batch processing keeps export off the request path
    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;
    let tracer_provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(span_exporter)
        .build();
    global::set_tracer_provider(tracer_provider.clone());

    // Feeds the HTTP metrics layer of the router
    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()?;
    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .build();
    global::set_meter_provider(meter_provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    let tracer = tracer_provider.tracer("sms-inspector");
    Ok((
        tracer,
        Telemetry {
            tracer_provider,
            meter_provider,
        },
    ))
}

fn build_analyzer(config: &Config) -> anyhow::Result<Arc<dyn MessageAnalyzer>> {
    match &config.gemini_api_key {
        Some(key) => Ok(Arc::new(GeminiAnalyzer::new(
            config.gemini_api_url.as_str(),
            config.gemini_model.as_str(),
            key.as_str(),
            config.upstream_timeout,
        )?)),
        None => Ok(Arc::new(PatternAnalyzer::new())),
    }
}

fn cors_origins(config: &Config) -> anyhow::Result<Vec<HeaderValue>> {
    config
        .cors_allowed_origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin {:?}: {}", o, e))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // OpenTelemetry only when a collector is configured
    let (otel_layer, telemetry) = if config.otlp_endpoint.is_some() {
        let (tracer, telemetry) = init_telemetry()?;
        (
            Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Some(telemetry),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,inspector_app=debug,inspector_hex=debug,premiumy=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .init();

    if config.jwt_secret_generated {
        tracing::warn!("JWT_SECRET is not set; using a random secret, sessions end on restart");
    }
    if config.default_admin_password() {
        tracing::warn!("ADMIN_PASSWORD is not set; the admin panel uses the default password");
    }

    tracing::info!("Starting SMS inspector on port {}", config.port);

    // Build repository (handles connection and schema)
    let repo = build_repo(&config.database_url).await?;
    tracing::info!("Using {} database", repo.backend());

    let gateway = PremiumyClient::new(PremiumyConfig {
        api_url: config.premiumy_api_url.clone(),
        probe_url: config.proxy_probe_url.clone(),
        timeout: config.upstream_timeout,
    })?;
    let analyzer = build_analyzer(&config)?;
    tracing::info!("Message analyzer: {}", analyzer.name());

    let service = InspectorService::new(
        repo,
        Arc::new(gateway),
        analyzer,
        AdminCredentials {
            username: config.admin_username.clone(),
            password: config.admin_password.clone(),
        },
    );

    if service
        .ensure_admin(&config.seed_admin_email, &config.seed_admin_password)
        .await?
    {
        tracing::info!(email = %config.seed_admin_email, "Created admin user");
    }
    if let Some(key) = &config.premiumy_api_key {
        if service.seed_api_key(key).await? {
            tracing::info!("Stored API key from PREMIUMY_API_KEY");
        }
    }

    let sessions = SessionManager::new(&config.jwt_secret, config.secure_cookies);
    let server = HttpServer::with_rate_limit(service, sessions, config.rate_limit_per_minute)
        .with_cors_origins(cors_origins(&config)?);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Flush telemetry before exit
    if let Some(telemetry) = telemetry {
        telemetry.shutdown();
    }
    Ok(())
}
