use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    cache::{METRIC_INDEX_CACHE_EXPIRED, METRIC_INDEX_CACHE_HIT, METRIC_INDEX_CACHE_MISS},
    config::{LogFormat, LoggingSettings},
};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(InfraError::Telemetry)
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_INDEX_CACHE_HIT,
            Unit::Count,
            "Index pages served from the page cache."
        );
        describe_counter!(
            METRIC_INDEX_CACHE_MISS,
            Unit::Count,
            "Index pages rendered because no cache entry existed."
        );
        describe_counter!(
            METRIC_INDEX_CACHE_EXPIRED,
            Unit::Count,
            "Index cache entries dropped after their lifetime elapsed."
        );
    });
}
