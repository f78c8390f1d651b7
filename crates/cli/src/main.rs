use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;

use sk_cli::cli::{Cli, Command, ConfigCommand};
use sk_domain::config::ObservabilityConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Simulate { steps, json } => {
            let (config, _config_path) = sk_cli::cli::load_config()?;
            let tracer_provider = init_tracing(&config.observability);
            let result = sk_cli::cli::simulate::run(&config, &steps, json);

            // Flush pending spans before the process exits.
            if let Some(provider) = tracer_provider {
                if let Err(e) = provider.shutdown() {
                    tracing::warn!(error = ?e, "OpenTelemetry tracer provider shutdown failed");
                }
            }
            result
        }
        Command::Config(ConfigCommand::Validate) => {
            init_cli_tracing();
            let (config, config_path) = sk_cli::cli::load_config()?;
            if !sk_cli::cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            init_cli_tracing();
            let (config, _config_path) = sk_cli::cli::load_config()?;
            sk_cli::cli::config::show(&config)
        }
        Command::Version => {
            println!("sessionkeeper {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Initialize structured JSON tracing on stderr for `simulate`.
///
/// When `otlp_endpoint` is configured, an OpenTelemetry layer is added so
/// the simulated telemetry spans (each carrying `session.id`) are exported
/// via OTLP/gRPC.  The returned provider must be shut down on exit.
fn init_tracing(
    obs: &ObservabilityConfig,
) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sk_sessions=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr);

    let tracer_provider = build_tracer_provider(obs);
    let otel_layer = tracer_provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer("sessionkeeper"))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    tracer_provider
}

/// OTLP/gRPC tracer provider, or `None` when export is disabled or the
/// exporter cannot be created.
fn build_tracer_provider(
    obs: &ObservabilityConfig,
) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let endpoint = obs
        .otlp_endpoint
        .as_deref()
        .filter(|_| obs.export_enabled())?;

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(e) => e,
        Err(e) => {
            eprintln!(
                "WARNING: failed to create OTLP exporter for {endpoint}: {e}; \
                 continuing without OpenTelemetry"
            );
            return None;
        }
    };

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(obs.service_name.clone())
        .build();

    let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(
            obs.sample_rate,
        ))
        .with_resource(resource)
        .build();

    Some(tracer_provider)
}

/// Compact stderr-only tracing for one-shot commands, `warn` by default so
/// diagnostics do not mix with stdout output.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
