//! Tracing setup and per-route outcome logging

use std::future::Future;
use std::time::{Duration, Instant};

use steeple_domain::{Result as DomainResult, SteepleError};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::ApiResult;

const DEFAULT_FILTER: &str = "info,tower_http=info";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default filter. With `json` set, events are
/// written as one JSON object per line.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    if let Err(err) = result {
        warn!(error = %err, "tracing subscriber already installed");
    }
}

/// Log the outcome of a route with structured fields.
///
/// `route` should be a stable identifier such as
/// `"recurring_patterns::lookup"`.
pub fn log_route_outcome(route: &str, elapsed: Duration, error: Option<&SteepleError>) {
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match error {
        None => info!(route, duration_ms, "route_success"),
        Some(err) => {
            warn!(route, duration_ms, error_type = err.label(), error = %err, "route_failure");
        }
    }
}

/// Run a service call, log how it went and lift its error into an
/// [`ApiError`](crate::error::ApiError).
pub async fn logged<T, Fut>(route: &'static str, call: Fut) -> ApiResult<T>
where
    Fut: Future<Output = DomainResult<T>>,
{
    let started = Instant::now();
    let result = call.await;
    log_route_outcome(route, started.elapsed(), result.as_ref().err());
    result.map_err(Into::into)
}
