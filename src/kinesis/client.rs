//! Kinesis stream client seam.

use crate::error::StreamClientError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Summary of a Kinesis stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamSummary {
  /// Number of open shards.
  pub open_shard_count: i64,
}

/// The slice of the Kinesis API the shard-count provider uses.
#[async_trait]
pub trait KinesisClient: Send + Sync {
  /// Describes the named stream.
  async fn describe_stream_summary(
    &self,
    stream_name: &str,
  ) -> Result<StreamSummary, StreamClientError>;

  /// Releases cached credentials and connections.
  async fn close(&self) -> Result<(), StreamClientError> {
    Ok(())
  }
}

/// In-memory Kinesis service.
#[derive(Debug, Default)]
pub struct InMemoryKinesisClient {
  streams: RwLock<HashMap<String, StreamSummary>>,
  failure: RwLock<Option<StreamClientError>>,
  latency: Option<Duration>,
  closed: AtomicBool,
}

impl InMemoryKinesisClient {
  /// Creates a service without streams.
  pub fn new() -> Self {
    Self::default()
  }

  /// Delays every call by `latency`.
  #[must_use]
  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = Some(latency);
    self
  }

  /// Sets the open shard count of a stream, creating it if needed.
  pub fn set_open_shard_count(&self, stream_name: &str, open_shard_count: i64) {
    if let Ok(mut streams) = self.streams.write() {
      streams.insert(stream_name.to_string(), StreamSummary { open_shard_count });
    }
  }

  /// Makes every call fail with `error`, or succeed again with `None`.
  pub fn set_failure(&self, error: Option<StreamClientError>) {
    if let Ok(mut failure) = self.failure.write() {
      *failure = error;
    }
  }

  /// Returns true once [`KinesisClient::close`] was called.
  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl KinesisClient for InMemoryKinesisClient {
  async fn describe_stream_summary(
    &self,
    stream_name: &str,
  ) -> Result<StreamSummary, StreamClientError> {
    if let Some(latency) = self.latency {
      tokio::time::sleep(latency).await;
    }
    if self.is_closed() {
      return Err(StreamClientError::Closed);
    }
    if let Some(error) = self
      .failure
      .read()
      .map_err(|e| StreamClientError::Request(e.to_string()))?
      .as_ref()
    {
      return Err(error.clone());
    }
    let streams = self
      .streams
      .read()
      .map_err(|e| StreamClientError::Request(e.to_string()))?;
    streams
      .get(stream_name)
      .copied()
      .ok_or_else(|| StreamClientError::NotFound(format!("stream {stream_name}")))
  }

  async fn close(&self) -> Result<(), StreamClientError> {
    self.closed.store(true, Ordering::SeqCst);
    Ok(())
  }
}
