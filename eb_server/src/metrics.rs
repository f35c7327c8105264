//! Prometheus metrics for bracket activity.
//!
//! Counters are recorded through the `metrics` facade and are no-ops until
//! [`init_metrics`] installs the exporter.

use event_bracket::bracket::{BracketType, RoundOutcome};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Serve Prometheus text format at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

/// Increment brackets created, labelled by format.
pub fn brackets_created(bracket_type: BracketType) {
    metrics::counter!("brackets_created_total",
        "bracket_type" => bracket_type.as_str()
    )
    .increment(1);
}

/// Increment recorded match results.
pub fn match_results_recorded() {
    metrics::counter!("match_results_recorded_total").increment(1);
}

/// Increment generated rounds.
pub fn rounds_advanced() {
    metrics::counter!("rounds_advanced_total").increment(1);
}

/// Increment decided champions; `manual` marks hand-set champions.
pub fn champions_decided(manual: bool) {
    metrics::counter!("champions_decided_total",
        "manual" => manual.to_string()
    )
    .increment(1);
}

/// Record what a result or manual advance did to its bracket.
pub fn round_outcome(outcome: &RoundOutcome) {
    match outcome {
        RoundOutcome::Advanced { .. } => rounds_advanced(),
        RoundOutcome::Champion { .. } => champions_decided(false),
        RoundOutcome::InProgress { .. }
        | RoundOutcome::AlreadyAdvanced { .. }
        | RoundOutcome::Unchanged => {}
    }
}

/// Increment API errors, labelled by error code.
pub fn api_errors(code: &'static str) {
    metrics::counter!("api_errors_total", "code" => code).increment(1);
}
