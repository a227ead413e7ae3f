//! The contract every metric provider implements.
//!
//! An external control loop holds one [`MetricsProvider`] per configured
//! trigger. On each poll it calls [`MetricsProvider::metrics_and_activity`]
//! and sizes the workload from the returned value and activation flag; when the
//! trigger is removed it calls [`MetricsProvider::close`].
//!
//! Providers hold only immutable metadata and their injected clients, so
//! repeated or concurrent polls of different instances never interfere.

use crate::config::MetricTargetType;
use crate::error::{ScalerError, ScalerResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Metric source type reported for every provider in this crate.
pub const EXTERNAL_METRIC_TYPE: &str = "External";

/// Target the autoscaler compares the metric against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricTarget {
  /// Per-replica average target.
  AverageValue(i64),
  /// Absolute target.
  Value(i64),
}

impl MetricTarget {
  /// Builds the target for a threshold under the given target type.
  ///
  /// `Utilization` is rejected earlier by
  /// [`ScalerConfig::metric_target_type`](crate::config::ScalerConfig::metric_target_type);
  /// it maps to an average here.
  pub fn new(target_type: MetricTargetType, threshold: i64) -> Self {
    match target_type {
      MetricTargetType::Value => MetricTarget::Value(threshold),
      MetricTargetType::AverageValue | MetricTargetType::Utilization => {
        MetricTarget::AverageValue(threshold)
      }
    }
  }

  /// Returns the threshold regardless of target type.
  pub fn threshold(&self) -> i64 {
    match self {
      MetricTarget::AverageValue(v) | MetricTarget::Value(v) => *v,
    }
  }
}

/// Descriptor of the metric a provider reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
  /// Trigger-index-qualified metric name.
  pub metric_name: String,
  /// Target value and type.
  pub target: MetricTarget,
  /// Metric source type, always [`EXTERNAL_METRIC_TYPE`].
  pub metric_type: String,
}

impl MetricSpec {
  /// Creates an external metric spec.
  pub fn external(metric_name: impl Into<String>, target: MetricTarget) -> Self {
    Self {
      metric_name: metric_name.into(),
      target,
      metric_type: EXTERNAL_METRIC_TYPE.to_string(),
    }
  }
}

/// One metric sample in milli-units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricValue {
  /// Metric name the sample belongs to.
  pub metric_name: String,
  /// Value multiplied by 1000.
  pub milli_value: i64,
  /// When the sample was taken.
  pub timestamp: DateTime<Utc>,
}

impl MetricValue {
  /// Returns the value in whole units.
  pub fn value(&self) -> f64 {
    self.milli_value as f64 / 1000.0
  }
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricQueryResult {
  /// The metric sample.
  pub value: MetricValue,
  /// Whether the workload should be active (scaled from zero).
  pub is_active: bool,
}

/// Capability set shared by all providers.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
  /// Returns the descriptor of the reported metric.
  fn metric_spec(&self) -> MetricSpec;

  /// Computes the current metric value and activation flag.
  ///
  /// Returns [`ScalerError::Cancelled`](crate::error::ScalerError::Cancelled)
  /// promptly when `cancel` fires; collaborator failures abort the query.
  async fn metrics_and_activity(
    &self,
    cancel: &CancellationToken,
    metric_name: &str,
  ) -> ScalerResult<MetricQueryResult>;

  /// Releases the provider's clients. Calling it twice must not panic.
  async fn close(&self, cancel: &CancellationToken) -> ScalerResult<()>;
}

/// Runs `query` until it completes or `cancel` fires.
///
/// On cancellation the query future is dropped, which aborts its in-flight
/// collaborator calls.
pub async fn run_cancellable<T, F>(cancel: &CancellationToken, query: F) -> ScalerResult<T>
where
  F: Future<Output = ScalerResult<T>>,
{
  tokio::select! {
    biased;
    _ = cancel.cancelled() => Err(ScalerError::Cancelled),
    result = query => result,
  }
}

/// Prefixes a metric name with its trigger index, e.g. `s0-aws-kinesis-orders`.
pub fn generate_metric_name_with_index(trigger_index: usize, metric_name: &str) -> String {
  format!("s{trigger_index}-{metric_name}")
}

/// Replaces characters that are invalid in metric names with `-`.
pub fn normalize_string(s: &str) -> String {
  s.chars()
    .map(|c| match c {
      '/' | '.' | ':' | '%' | '(' | ')' | '"' | ' ' | '<' | '>' | '$' => '-',
      other => other,
    })
    .collect()
}

/// Builds a milli-unit sample; values beyond the `i64` range saturate.
pub fn generate_metric_in_milli(metric_name: &str, value: f64) -> MetricValue {
  MetricValue {
    metric_name: metric_name.to_string(),
    milli_value: (value * 1000.0) as i64,
    timestamp: Utc::now(),
  }
}
