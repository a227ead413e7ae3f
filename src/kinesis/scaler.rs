//! Shard-count metric provider for Kinesis streams.

use super::client::KinesisClient;
use super::metadata::KinesisMetadata;
use crate::config::{MetricTargetType, ScalerConfig};
use crate::error::{ScalerError, ScalerResult};
use crate::observability;
use crate::provider::{
  MetricQueryResult, MetricSpec, MetricTarget, MetricsProvider, generate_metric_in_milli,
  generate_metric_name_with_index, normalize_string, run_cancellable,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, error, info_span};

const SCALER_NAME: &str = "aws_kinesis_stream";

/// Reports a Kinesis stream's open shard count.
pub struct KinesisScaler {
  metric_type: MetricTargetType,
  metadata: KinesisMetadata,
  client: Arc<dyn KinesisClient>,
  span: Span,
}

impl KinesisScaler {
  /// Parses `config` and builds the client with `connect`, which receives the
  /// region, endpoint and authorization to resolve credentials from.
  pub fn new<F>(config: &ScalerConfig, connect: F) -> ScalerResult<Self>
  where
    F: FnOnce(&KinesisMetadata) -> ScalerResult<Arc<dyn KinesisClient>>,
  {
    let metric_type = config.metric_target_type()?;
    let metadata = KinesisMetadata::parse(config)?;
    let client = connect(&metadata)?;
    let span = info_span!(
      "aws_kinesis_stream_scaler",
      trigger_index = metadata.trigger_index,
      stream_name = %metadata.stream_name,
    );

    Ok(Self {
      metric_type,
      metadata,
      client,
      span,
    })
  }

  /// Returns the parsed trigger metadata.
  pub fn metadata(&self) -> &KinesisMetadata {
    &self.metadata
  }

  /// Fetches the stream's open shard count.
  pub async fn open_shard_count(&self) -> ScalerResult<i64> {
    let summary = self
      .client
      .describe_stream_summary(&self.metadata.stream_name)
      .await
      .map_err(|e| ScalerError::fetch("unable to describe kinesis stream", e))?;
    Ok(summary.open_shard_count)
  }
}

#[async_trait]
impl MetricsProvider for KinesisScaler {
  fn metric_spec(&self) -> MetricSpec {
    let name = normalize_string(&format!("aws-kinesis-{}", self.metadata.stream_name));
    MetricSpec::external(
      generate_metric_name_with_index(self.metadata.trigger_index, &name),
      MetricTarget::new(self.metric_type, self.metadata.target_shard_count),
    )
  }

  async fn metrics_and_activity(
    &self,
    cancel: &CancellationToken,
    metric_name: &str,
  ) -> ScalerResult<MetricQueryResult> {
    let shard_count =
      match run_cancellable(cancel, self.open_shard_count().instrument(self.span.clone())).await {
        Ok(count) => count,
        Err(e) => {
          if observability::record_query_error(SCALER_NAME, self.metadata.trigger_index, &e) {
            error!(parent: &self.span, error = %e, "error getting shard count");
          }
          return Err(e);
        }
      };

    let is_active = shard_count > self.metadata.activation_target_shard_count;
    observability::record_scaler_metric(SCALER_NAME, metric_name, shard_count, is_active);

    Ok(MetricQueryResult {
      value: generate_metric_in_milli(metric_name, shard_count as f64),
      is_active,
    })
  }

  async fn close(&self, cancel: &CancellationToken) -> ScalerResult<()> {
    run_cancellable(cancel, async {
      self
        .client
        .close()
        .await
        .map_err(|e| ScalerError::fetch("unable to close kinesis client", e))
    })
    .await
  }
}
