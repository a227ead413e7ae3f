//! Error types shared by the metric providers and their collaborators.
//!
//! Errors are split by where they surface:
//!
//! - [`ScalerError`] is what a provider returns to the control loop. A
//!   `Configuration` error stops the provider from being built; `Fetch` aborts
//!   one query; `Cancelled` means the caller's token fired first.
//! - [`CheckpointError`] comes from a [`CheckpointSource`](crate::checkpoint::CheckpointSource).
//!   The two not-found variants are the only ones that trigger the degraded
//!   lag calculation, so callers match on the variant, never on the message.
//! - [`StreamClientError`] comes from a vendor stream client.
//!
//! Staleness and overflow anomalies in the lag calculation are normalized in
//! place and never become errors.

use thiserror::Error;

/// Error returned by a metric provider.
#[derive(Error, Debug)]
pub enum ScalerError {
  /// Missing or invalid configuration; the provider is never started.
  #[error("configuration error: {0}")]
  Configuration(String),
  /// A collaborator call failed during a query.
  #[error("{context}: {source}")]
  Fetch {
    /// What the provider was doing when the call failed.
    context: String,
    /// The underlying failure.
    #[source]
    source: FetchSource,
  },
  /// The caller's cancellation token fired before the query finished.
  #[error("query cancelled")]
  Cancelled,
}

impl ScalerError {
  /// Creates a configuration error.
  pub fn config(message: impl Into<String>) -> Self {
    ScalerError::Configuration(message.into())
  }

  /// Wraps a collaborator failure with the operation that produced it.
  pub fn fetch(context: impl Into<String>, source: impl Into<FetchSource>) -> Self {
    ScalerError::Fetch {
      context: context.into(),
      source: source.into(),
    }
  }

  /// Returns true for configuration errors.
  pub fn is_configuration(&self) -> bool {
    matches!(self, ScalerError::Configuration(_))
  }

  /// Returns true if the query was cancelled.
  pub fn is_cancelled(&self) -> bool {
    matches!(self, ScalerError::Cancelled)
  }
}

/// The collaborator failure behind a [`ScalerError::Fetch`].
#[derive(Error, Debug)]
pub enum FetchSource {
  /// Checkpoint store failure.
  #[error(transparent)]
  Checkpoint(#[from] CheckpointError),
  /// Stream service failure.
  #[error(transparent)]
  StreamClient(#[from] StreamClientError),
}

/// Error type for checkpoint lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckpointError {
  /// The checkpoint container does not exist.
  #[error("checkpoint container not found: {0}")]
  ContainerNotFound(String),
  /// The container exists but holds no checkpoint blob for the partition.
  #[error("checkpoint blob not found: {0}")]
  BlobNotFound(String),
  /// The blob exists but its content could not be decoded.
  #[error("malformed checkpoint: {0}")]
  Malformed(String),
  /// Network, authorization or any other store failure.
  #[error("checkpoint store error: {0}")]
  Other(String),
}

impl CheckpointError {
  /// Returns true when the checkpoint storage itself is absent.
  ///
  /// Only these failures allow falling back to a checkpoint-less estimate.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      CheckpointError::ContainerNotFound(_) | CheckpointError::BlobNotFound(_)
    )
  }
}

/// Error type for stream service clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamClientError {
  /// The requested stream or partition does not exist.
  #[error("not found: {0}")]
  NotFound(String),
  /// The service rejected the caller's credentials.
  #[error("unauthorized: {0}")]
  Unauthorized(String),
  /// Transport or service failure.
  #[error("request failed: {0}")]
  Request(String),
  /// The client was already closed.
  #[error("client closed")]
  Closed,
}

/// Result type for provider operations.
pub type ScalerResult<T> = Result<T, ScalerError>;
