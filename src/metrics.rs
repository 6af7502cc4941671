use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("markets_indexed_total").absolute(0);
    counter!("index_errors_total").absolute(0);
    counter!("resolve_errors_total").absolute(0);
    counter!("likes_synced_total").absolute(0);
    counter!("casts_healed_total").absolute(0);
    counter!("markets_created_total").absolute(0);

    Ok(handle)
}

/// A handle backed by a recorder that is not installed globally.
/// Used where several routers live in one process (tests).
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
