use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use once_cell::sync::Lazy;
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::{
    SCHEMA_URL,
    attribute::{SERVICE_NAME, SERVICE_VERSION},
    resource::DEPLOYMENT_ENVIRONMENT_NAME,
};
use rocket::{
    Data, Request, Response,
    fairing::{Fairing, Info, Kind},
};
use tonic::metadata::MetadataMap;
use tracing::{field, info_span};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const HONEYCOMB_ENDPOINT: &str = "https://api.honeycomb.io:443";

pub static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct TelemetryFairing;

#[rocket::async_trait]
impl Fairing for TelemetryFairing {
    fn info(&self) -> Info {
        Info {
            name: "OpenTelemetry",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let method = request.method().to_string();
        let uri = request.uri().to_string();

        let span = info_span!(
            "http_request",
            otel.name = format!("{} {}", method, uri),
            http.method = method,
            http.uri = uri,
            http.route = request.route().map(|r| r.uri.to_string()),
            http.status_code = field::Empty,
            http.duration_ms = field::Empty,
        );

        request.local_cache(|| (span, Instant::now()));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let (span, started) = request.local_cache(|| (info_span!("http_request"), Instant::now()));

        let elapsed_ms = started.elapsed().as_millis() as i64;
        let status = response.status().code;

        span.record("http.status_code", status);
        span.record("http.duration_ms", elapsed_ms);

        let _entered = span.enter();
        tracing::info!(status, elapsed_ms, "Request completed");
    }
}

/// Where spans are exported, if anywhere.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySettings {
    pub endpoint: Option<String>,
    pub honeycomb_api_key: Option<String>,
    pub environment: String,
}

impl TelemetrySettings {
    pub fn from_env() -> Self {
        let honeycomb_api_key = dotenvy::var("HONEYCOMB_API_KEY").ok();
        let endpoint = dotenvy::var("OTLP_ENDPOINT").ok().or_else(|| {
            honeycomb_api_key
                .as_ref()
                .map(|_| HONEYCOMB_ENDPOINT.to_string())
        });

        Self {
            endpoint,
            honeycomb_api_key,
            environment: dotenvy::var("DEPLOYMENT_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }
}

fn resource(settings: &TelemetrySettings) -> Resource {
    Resource::builder()
        .with_schema_url(
            [
                KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
                KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, settings.environment.clone()),
            ],
            SCHEMA_URL,
        )
        .build()
}

fn init_tracer_provider(
    settings: &TelemetrySettings,
    endpoint: &str,
) -> Result<SdkTracerProvider, BoxError> {
    let mut metadata = MetadataMap::new();
    if let Some(api_key) = &settings.honeycomb_api_key {
        metadata.insert("x-honeycomb-team", api_key.parse()?);
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_tls_config(tonic::transport::ClientTlsConfig::new().with_native_roots())
        .with_protocol(Protocol::Grpc)
        .with_metadata(metadata)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource(settings))
        .with_batch_exporter(exporter)
        .build())
}

pub struct OtelGuard {
    tracer_provider: SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(err) = self.tracer_provider.shutdown() {
            eprintln!("Failed to shut down tracer provider: {:?}", err);
        }
    }
}

/// Installs the global subscriber: `RUST_LOG` filtering, console output and,
/// when configured, OTLP span export.
pub fn init_tracing() {
    let settings = TelemetrySettings::from_env();

    let tracer_provider = settings.endpoint.as_deref().and_then(|endpoint| {
        match init_tracer_provider(&settings, endpoint) {
            Ok(provider) => Some(provider),
            Err(e) => {
                eprintln!("Span export to {} disabled: {}", endpoint, e);
                None
            }
        }
    });

    let otel_layer = tracer_provider
        .as_ref()
        .map(|provider| OpenTelemetryLayer::new(provider.tracer("progress-tracker")));

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .try_init();

    if let Err(e) = installed {
        eprintln!("Tracing subscriber already installed: {}", e);
    }

    if let Some(tracer_provider) = tracer_provider {
        *TELEMETRY_GUARD
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(OtelGuard { tracer_provider });
        tracing::info!("OTLP span export enabled");
    }
}

pub fn shutdown_telemetry() {
    let guard = TELEMETRY_GUARD
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    drop(guard);
}
