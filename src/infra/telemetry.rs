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

pub const LIST_CACHE_HIT: &str = "backoffice_list_cache_hit_total";
pub const LIST_CACHE_MISS: &str = "backoffice_list_cache_miss_total";
pub const LIST_DEDUP: &str = "backoffice_list_dedup_total";
pub const LIST_FETCH_MS: &str = "backoffice_list_fetch_ms";
pub const UPLOAD_DISCARDED: &str = "backoffice_upload_discarded_total";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            LIST_CACHE_HIT,
            Unit::Count,
            "List pages served from the fresh cache."
        );
        describe_counter!(
            LIST_CACHE_MISS,
            Unit::Count,
            "List pages that required a network request."
        );
        describe_counter!(
            LIST_DEDUP,
            Unit::Count,
            "List fetches that joined an identical in-flight request."
        );
        describe_histogram!(
            LIST_FETCH_MS,
            Unit::Milliseconds,
            "Latency of list page requests in milliseconds."
        );
        describe_counter!(
            UPLOAD_DISCARDED,
            Unit::Count,
            "Editor uploads whose result arrived after the editor was closed."
        );
    });
}
