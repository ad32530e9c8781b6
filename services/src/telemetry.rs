use crate::config::Config;
use anyhow::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing_stackdriver::CloudTraceConfiguration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,zkt_admin_services=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    if !config.is_prod() {
        // Local development and tests: pretty printing
        tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer())
            .init();
        return Ok(());
    }

    // Production: JSON logging with Stackdriver & Cloud Trace
    let project_id = config
        .google_cloud_project()
        .context("GOOGLE_CLOUD_PROJECT is required in production")?
        .to_owned();

    // Set the global propagator to trace-context (W3C)
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    let stackdriver_layer =
        tracing_stackdriver::layer().with_cloud_trace(CloudTraceConfiguration { project_id });

    let otel_layer = tracing_opentelemetry::layer();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(otel_layer)
        .with(stackdriver_layer)
        .init();

    Ok(())
}
