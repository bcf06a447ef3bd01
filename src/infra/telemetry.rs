//! Tracing subscriber setup and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global tracing subscriber and register metric descriptions.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    // Stdout carries transport frames, so logs go to stderr.
    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "kurohelper_cache_hit_total",
            Unit::Count,
            "Total number of cache lookups answered from a live entry."
        );
        describe_counter!(
            "kurohelper_cache_miss_total",
            Unit::Count,
            "Total number of cache lookups for absent keys."
        );
        describe_counter!(
            "kurohelper_cache_expired_total",
            Unit::Count,
            "Total number of cache lookups that found an entry past its ttl."
        );
        describe_counter!(
            "kurohelper_cache_evict_total",
            Unit::Count,
            "Total number of cache evictions due to capacity."
        );
        describe_counter!(
            "kurohelper_session_minted_total",
            Unit::Count,
            "Total number of navigation sessions opened."
        );
        describe_counter!(
            "kurohelper_dispatch_total",
            Unit::Count,
            "Total number of interactions dispatched, labelled by outcome."
        );
        describe_histogram!(
            "kurohelper_fetch_ms",
            Unit::Milliseconds,
            "Catalog fetch latency on cache misses in milliseconds."
        );
    });
}
