//! Process-wide logging and tracing setup for Portkey binaries.

pub mod error;

pub use error::{Result, TelemetryError};

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct TelemetryConfig {
    #[builder(default = "portkey".to_string(), setter(into))]
    pub service_name: String,
    #[builder(default)]
    pub log_format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    #[builder(default = "info".to_string(), setter(into))]
    pub default_directive: String,
    /// OTLP gRPC endpoint; spans are only exported when set.
    #[builder(default, setter(strip_option, into))]
    pub otlp_endpoint: Option<String>,
}

/// Flushes and shuts down the span exporter when dropped.
#[must_use = "dropping the guard stops span export"]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("failed to shut down tracer provider: {e}");
            }
        }
    }
}

/// Installs the global subscriber and bridges `log` records into it.
///
/// Can only succeed once per process.
pub fn init(config: TelemetryConfig) -> Result<TelemetryGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_directive)?,
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    layers.push(match config.log_format {
        LogFormat::Plain => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    });

    let provider = match &config.otlp_endpoint {
        Some(endpoint) => {
            let provider = tracer_provider(&config.service_name, endpoint)?;
            let tracer = provider.tracer(config.service_name.clone());
            layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());
            Some(provider)
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry().with(layers).with(filter);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    tracing::debug!(
        service_name = %config.service_name,
        otlp = config.otlp_endpoint.is_some(),
        "telemetry initialised"
    );

    Ok(TelemetryGuard { provider })
}

fn tracer_provider(service_name: &str, endpoint: &str) -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_service_name(service_name.to_string())
                .build(),
        )
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = TelemetryConfig::builder().build();
        assert_eq!(config.service_name, "portkey");
        assert_eq!(config.log_format, LogFormat::Plain);
        assert_eq!(config.default_directive, "info");
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn invalid_directive_is_rejected_before_install() {
        // Only reached when RUST_LOG is unset or itself invalid.
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = TelemetryConfig::builder()
            .default_directive("portkey=notalevel")
            .build();
        assert!(matches!(init(config), Err(TelemetryError::Filter(_))));
    }

    #[test]
    fn second_init_fails() {
        let first = init(TelemetryConfig::builder().log_format(LogFormat::Json).build());
        let second = init(TelemetryConfig::builder().build());

        assert!(first.is_ok());
        assert!(matches!(second, Err(TelemetryError::Subscriber(_))));
    }
}
