//! Event hub stream client seam.

use crate::error::StreamClientError;
use crate::lag::PartitionRuntimeState;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Runtime-information client of an event hub.
#[async_trait]
pub trait EventHubClient: Send + Sync {
  /// Lists the hub's partition identifiers.
  async fn partition_ids(&self) -> Result<Vec<String>, StreamClientError>;

  /// Fetches the live runtime state of one partition.
  async fn partition_runtime_state(
    &self,
    partition_id: &str,
  ) -> Result<PartitionRuntimeState, StreamClientError>;

  /// Releases the underlying connection.
  async fn close(&self) -> Result<(), StreamClientError>;
}

/// In-memory event hub.
///
/// Partitions keep their insertion order. Failures and latency can be
/// injected to exercise a provider's error and cancellation paths.
#[derive(Debug, Default)]
pub struct InMemoryEventHubClient {
  partitions: RwLock<Vec<PartitionRuntimeState>>,
  list_failure: RwLock<Option<StreamClientError>>,
  partition_failures: RwLock<HashMap<String, StreamClientError>>,
  latency: Option<Duration>,
  closed: AtomicBool,
}

impl InMemoryEventHubClient {
  /// Creates a hub with the given partitions.
  pub fn new(partitions: Vec<PartitionRuntimeState>) -> Self {
    Self {
      partitions: RwLock::new(partitions),
      ..Default::default()
    }
  }

  /// Delays every call by `latency`.
  #[must_use]
  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = Some(latency);
    self
  }

  /// Replaces or adds a partition's runtime state.
  pub fn set_partition(&self, state: PartitionRuntimeState) {
    if let Ok(mut partitions) = self.partitions.write() {
      match partitions
        .iter_mut()
        .find(|p| p.partition_id == state.partition_id)
      {
        Some(existing) => *existing = state,
        None => partitions.push(state),
      }
    }
  }

  /// Makes partition listing fail with `error`, or succeed again with `None`.
  pub fn set_list_failure(&self, error: Option<StreamClientError>) {
    if let Ok(mut failure) = self.list_failure.write() {
      *failure = error;
    }
  }

  /// Makes runtime-state reads of `partition_id` fail with `error`.
  pub fn fail_partition(&self, partition_id: &str, error: StreamClientError) {
    if let Ok(mut failures) = self.partition_failures.write() {
      failures.insert(partition_id.to_string(), error);
    }
  }

  /// Returns true once [`EventHubClient::close`] was called.
  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::SeqCst)
  }

  async fn enter(&self) -> Result<(), StreamClientError> {
    if let Some(latency) = self.latency {
      tokio::time::sleep(latency).await;
    }
    if self.is_closed() {
      return Err(StreamClientError::Closed);
    }
    Ok(())
  }
}

fn lock_error(e: impl ToString) -> StreamClientError {
  StreamClientError::Request(e.to_string())
}

#[async_trait]
impl EventHubClient for InMemoryEventHubClient {
  async fn partition_ids(&self) -> Result<Vec<String>, StreamClientError> {
    self.enter().await?;
    if let Some(error) = self.list_failure.read().map_err(lock_error)?.as_ref() {
      return Err(error.clone());
    }
    let partitions = self.partitions.read().map_err(lock_error)?;
    Ok(partitions.iter().map(|p| p.partition_id.clone()).collect())
  }

  async fn partition_runtime_state(
    &self,
    partition_id: &str,
  ) -> Result<PartitionRuntimeState, StreamClientError> {
    self.enter().await?;
    if let Some(error) = self.partition_failures.read().map_err(lock_error)?.get(partition_id) {
      return Err(error.clone());
    }
    let partitions = self.partitions.read().map_err(lock_error)?;
    partitions
      .iter()
      .find(|p| p.partition_id == partition_id)
      .cloned()
      .ok_or_else(|| StreamClientError::NotFound(format!("partition {partition_id}")))
  }

  async fn close(&self) -> Result<(), StreamClientError> {
    self.closed.store(true, Ordering::SeqCst);
    Ok(())
  }
}
