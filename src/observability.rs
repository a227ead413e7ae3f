//! Gauges and counters describing what the providers report.
//!
//! Recording is a no-op unless the embedding process installs a `metrics`
//! recorder (e.g. a Prometheus exporter).

use crate::error::ScalerError;
use metrics::{counter, gauge};

/// Records the unprocessed-event estimate of one partition.
pub fn record_partition_lag(scaler: &'static str, trigger_index: usize, partition_id: &str, count: i64) {
  gauge!(
    "streamweave_scaler_partition_unprocessed_events",
    "scaler" => scaler,
    "trigger_index" => trigger_index.to_string(),
    "partition_id" => partition_id.to_string()
  )
  .set(count as f64);
}

/// Records the value a provider returned to the control loop.
pub fn record_scaler_metric(scaler: &'static str, metric_name: &str, value: i64, active: bool) {
  gauge!(
    "streamweave_scaler_metric_value",
    "scaler" => scaler,
    "metric_name" => metric_name.to_string()
  )
  .set(value as f64);
  gauge!(
    "streamweave_scaler_active",
    "scaler" => scaler,
    "metric_name" => metric_name.to_string()
  )
  .set(if active { 1.0 } else { 0.0 });
}

/// Counts queries answered with the checkpoint-less estimate for a partition.
pub fn record_checkpoint_fallback(scaler: &'static str, partition_id: &str) {
  counter!(
    "streamweave_scaler_checkpoint_fallback_total",
    "scaler" => scaler,
    "partition_id" => partition_id.to_string()
  )
  .increment(1);
}

/// Counts a failed query and returns whether it counted as a failure.
///
/// Cancellations are requested by the caller and are not counted.
pub fn record_query_error(
  scaler: &'static str,
  trigger_index: usize,
  error: &ScalerError,
) -> bool {
  if error.is_cancelled() {
    return false;
  }
  counter!(
    "streamweave_scaler_query_errors_total",
    "scaler" => scaler,
    "trigger_index" => trigger_index.to_string()
  )
  .increment(1);
  true
}
