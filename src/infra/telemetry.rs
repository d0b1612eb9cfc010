use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::notify;
use crate::cache::listing;
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;
use super::http;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the process-wide subscriber. `RUST_LOG` refines `logging.level`;
/// `logging.format` picks compact or JSON lines.
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

/// Register units and help text for every counter SkyStore emits.
///
/// Listing counters carry a `namespace` label (`home:products`, `blog:posts`,
/// `category_products`), notification counters a `kind` label (`welcome`,
/// `view_milestone`) and access denials the failing `gate`.
fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            listing::HIT_TOTAL,
            Unit::Count,
            "Product and post listings answered from a cached snapshot."
        );
        describe_counter!(
            listing::MISS_TOTAL,
            Unit::Count,
            "Product and post listings rebuilt from Postgres."
        );
        describe_counter!(
            listing::INVALIDATE_TOTAL,
            Unit::Count,
            "Listing slots dropped after a product, category or post write."
        );
        describe_counter!(
            notify::SENT_TOTAL,
            Unit::Count,
            "Welcome and view-milestone mails handed to the mailer."
        );
        describe_counter!(
            notify::FAILED_TOTAL,
            Unit::Count,
            "Welcome and view-milestone mails the mailer rejected."
        );
        describe_counter!(
            http::error::ACCESS_DENIED_TOTAL,
            Unit::Count,
            "Catalog, blog and account requests stopped by an access gate."
        );
    });
}
