use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

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
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "stormo_fanout_push_total",
            Unit::Count,
            "Total number of publishes distributed via push fan-out."
        );
        describe_counter!(
            "stormo_fanout_pull_total",
            Unit::Count,
            "Total number of publishes parked in a broadcast cache."
        );
        describe_histogram!(
            "stormo_fanout_recipients",
            Unit::Count,
            "Follower home caches written per push fan-out."
        );
        describe_counter!(
            "stormo_retract_total",
            Unit::Count,
            "Total number of deleted posts withdrawn from caches."
        );
        describe_counter!(
            "stormo_posts_published_total",
            Unit::Count,
            "Total number of posts accepted for publication."
        );
        describe_counter!(
            "stormo_posts_deleted_total",
            Unit::Count,
            "Total number of posts deleted by their authors."
        );
        describe_counter!(
            "stormo_timeline_cache_hit_total",
            Unit::Count,
            "Home timeline reads served from a warm cache entry."
        );
        describe_counter!(
            "stormo_timeline_cache_miss_total",
            Unit::Count,
            "Home timeline reads that found no cached ids."
        );
        describe_counter!(
            "stormo_timeline_rebuild_total",
            Unit::Count,
            "Home timeline rebuilds triggered by an empty merge."
        );
        describe_histogram!(
            "stormo_timeline_assemble_ms",
            Unit::Milliseconds,
            "Timeline page assembly latency in milliseconds."
        );
        describe_counter!(
            "stormo_follows_total",
            Unit::Count,
            "Total number of follow-graph mutations."
        );
        describe_counter!(
            "stormo_engagement_total",
            Unit::Count,
            "Total number of like and repost mutations."
        );
        describe_counter!(
            "stormo_realtime_events_total",
            Unit::Count,
            "Realtime events enqueued for the relay."
        );
        describe_counter!(
            "stormo_realtime_delivered_total",
            Unit::Count,
            "Frames delivered to connected live subscribers."
        );
        describe_counter!(
            "stormo_realtime_pruned_total",
            Unit::Count,
            "Dead live connections pruned during delivery."
        );
        describe_gauge!(
            "stormo_live_connections",
            Unit::Count,
            "Currently registered live connections."
        );
        describe_gauge!(
            "stormo_live_users",
            Unit::Count,
            "Accounts with at least one live connection."
        );
    });
}
