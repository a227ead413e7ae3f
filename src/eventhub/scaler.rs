//! Partition-lag metric provider for event hubs.

use super::client::EventHubClient;
use super::metadata::EventHubMetadata;
use crate::checkpoint::{BlobCheckpointSource, BlobStore, CheckpointSource};
use crate::config::{MetricTargetType, ScalerConfig};
use crate::error::{ScalerError, ScalerResult};
use crate::lag::{
  Checkpoint, PartitionRuntimeState, lag_related_to_partition_count, total_unprocessed,
  unprocessed_count, unprocessed_count_without_checkpoint,
};
use crate::observability;
use crate::provider::{
  MetricQueryResult, MetricSpec, MetricTarget, MetricsProvider, generate_metric_in_milli,
  generate_metric_name_with_index, normalize_string, run_cancellable,
};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info_span, warn};

const SCALER_NAME: &str = "azure_eventhub";

/// Clients an [`EventHubScaler`] owns for its lifetime.
#[derive(Clone)]
pub struct EventHubClients {
  /// Runtime-information client of the hub.
  pub hub: Arc<dyn EventHubClient>,
  /// Checkpoint read path.
  pub checkpoints: Arc<dyn CheckpointSource>,
}

impl EventHubClients {
  /// Pairs a hub client with checkpoints read from `store` at the location
  /// described by `metadata`.
  pub fn with_blob_store(
    hub: Arc<dyn EventHubClient>,
    store: Arc<dyn BlobStore>,
    metadata: &EventHubMetadata,
  ) -> ScalerResult<Self> {
    let location = metadata.event_hub_info.checkpoint_location()?;
    Ok(Self {
      hub,
      checkpoints: Arc::new(BlobCheckpointSource::new(store, location)),
    })
  }
}

/// Backlog of one poll before and after the partition cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagSummary {
  /// Number of partitions in the hub.
  pub partition_count: i64,
  /// Sum of per-partition estimates, clamped to `i64::MAX`.
  pub total_unprocessed: i64,
  /// Backlog reported to the autoscaler.
  pub reported_lag: i64,
}

/// Reports the unprocessed events of a consumer group across an event hub.
///
/// Each poll lists the partitions, reads every partition's runtime state and
/// checkpoint, estimates its backlog and reports the sum, capped at
/// `partitions × threshold`. The workload is active while the uncapped sum
/// exceeds the activation threshold.
pub struct EventHubScaler {
  metric_type: MetricTargetType,
  metadata: EventHubMetadata,
  clients: EventHubClients,
  partition_concurrency: usize,
  span: Span,
}

impl EventHubScaler {
  /// Parses `config` and connects the clients with `connect`.
  ///
  /// Configuration errors and connection failures abort construction.
  pub fn new<F>(config: &ScalerConfig, connect: F) -> ScalerResult<Self>
  where
    F: FnOnce(&EventHubMetadata) -> ScalerResult<EventHubClients>,
  {
    let metric_type = config.metric_target_type()?;
    let metadata = EventHubMetadata::parse(config)?;
    let clients = connect(&metadata)?;
    let span = info_span!(
      "azure_eventhub_scaler",
      trigger_index = metadata.trigger_index,
      consumer_group = %metadata.event_hub_info.consumer_group,
    );

    Ok(Self {
      metric_type,
      metadata,
      clients,
      partition_concurrency: 1,
      span,
    })
  }

  /// Processes up to `concurrency` partitions at once. Results are still
  /// reduced in partition order.
  #[must_use]
  pub fn with_partition_concurrency(mut self, concurrency: usize) -> Self {
    self.partition_concurrency = concurrency.max(1);
    self
  }

  /// Returns the parsed trigger metadata.
  pub fn metadata(&self) -> &EventHubMetadata {
    &self.metadata
  }

  /// Estimates the unprocessed events of one partition.
  ///
  /// Falls back to [`unprocessed_count_without_checkpoint`] when the
  /// checkpoint container or blob does not exist; any other checkpoint failure
  /// is an error.
  pub async fn unprocessed_event_count_in_partition(
    &self,
    state: &PartitionRuntimeState,
  ) -> ScalerResult<(i64, Checkpoint)> {
    if state.is_empty() {
      return Ok((0, Checkpoint::none()));
    }

    match self.clients.checkpoints.get_checkpoint(&state.partition_id).await {
      Ok(checkpoint) => {
        let count = unprocessed_count(
          state,
          &checkpoint,
          self.metadata.stale_partition_info_threshold,
        );
        Ok((count, checkpoint))
      }
      Err(e) if e.is_not_found() => {
        warn!(
          partition_id = %state.partition_id,
          blob_container = %self.metadata.event_hub_info.blob_container,
          error = %e,
          "checkpoint not found, estimating unprocessed events without checkpoint"
        );
        observability::record_checkpoint_fallback(SCALER_NAME, &state.partition_id);
        Ok((unprocessed_count_without_checkpoint(state), Checkpoint::none()))
      }
      Err(e) => Err(ScalerError::fetch("unable to get checkpoint from storage", e)),
    }
  }

  async fn partition_lag(&self, partition_id: &str) -> ScalerResult<i64> {
    let state = self
      .clients
      .hub
      .partition_runtime_state(partition_id)
      .await
      .map_err(|e| {
        ScalerError::fetch(
          format!("unable to get runtime info of partition {partition_id}"),
          e,
        )
      })?;

    let (count, checkpoint) = self.unprocessed_event_count_in_partition(&state).await?;

    debug!(
      partition_id = %state.partition_id,
      last_sequence_number = state.last_sequence_number,
      checkpoint_sequence_number = checkpoint.sequence_number,
      unprocessed_events = count,
      "partition lag"
    );
    observability::record_partition_lag(
      SCALER_NAME,
      self.metadata.trigger_index,
      &state.partition_id,
      count,
    );
    Ok(count)
  }

  /// Computes the hub's backlog for one poll.
  pub async fn lag(&self) -> ScalerResult<LagSummary> {
    let partition_ids = self
      .clients
      .hub
      .partition_ids()
      .await
      .map_err(|e| ScalerError::fetch("unable to get partition ids", e))?;

    // Owned ids: borrowing them from the iterator makes the query non-`Send`.
    let counts: Vec<i64> = stream::iter(partition_ids.iter().cloned())
      .map(|id| async move { self.partition_lag(&id).await })
      .buffered(self.partition_concurrency)
      .try_collect()
      .await?;

    let partition_count = i64::try_from(partition_ids.len()).unwrap_or(i64::MAX);
    let total_unprocessed = total_unprocessed(counts);
    let reported_lag =
      lag_related_to_partition_count(total_unprocessed, partition_count, self.metadata.threshold);

    debug!(
      total_unprocessed,
      reported_lag, partition_count, "unprocessed events in event hub"
    );

    Ok(LagSummary {
      partition_count,
      total_unprocessed,
      reported_lag,
    })
  }
}

#[async_trait]
impl MetricsProvider for EventHubScaler {
  fn metric_spec(&self) -> MetricSpec {
    let name = normalize_string(&format!(
      "azure-eventhub-{}",
      self.metadata.event_hub_info.consumer_group
    ));
    MetricSpec::external(
      generate_metric_name_with_index(self.metadata.trigger_index, &name),
      MetricTarget::new(self.metric_type, self.metadata.threshold),
    )
  }

  async fn metrics_and_activity(
    &self,
    cancel: &CancellationToken,
    metric_name: &str,
  ) -> ScalerResult<MetricQueryResult> {
    let summary = match run_cancellable(cancel, self.lag().instrument(self.span.clone())).await {
      Ok(summary) => summary,
      Err(e) => {
        if observability::record_query_error(SCALER_NAME, self.metadata.trigger_index, &e) {
          error!(parent: &self.span, error = %e, "error getting unprocessed event count");
        }
        return Err(e);
      }
    };

    let is_active = summary.total_unprocessed > self.metadata.activation_threshold;
    observability::record_scaler_metric(SCALER_NAME, metric_name, summary.reported_lag, is_active);

    Ok(MetricQueryResult {
      value: generate_metric_in_milli(metric_name, summary.reported_lag as f64),
      is_active,
    })
  }

  async fn close(&self, cancel: &CancellationToken) -> ScalerResult<()> {
    let closed = run_cancellable(cancel, async {
      // Release both clients even when the first one fails.
      let hub = self
        .clients
        .hub
        .close()
        .await
        .map_err(|e| ScalerError::fetch("unable to close event hub client", e));
      let checkpoints = self
        .clients
        .checkpoints
        .close()
        .await
        .map_err(|e| ScalerError::fetch("unable to close checkpoint client", e));
      hub.and(checkpoints)
    })
    .await;

    if let Err(e) = &closed {
      error!(parent: &self.span, error = %e, "error closing azure event hub client");
    }
    closed
  }
}
