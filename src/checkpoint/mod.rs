//! Read path for consumer checkpoints.
//!
//! The provider asks a [`CheckpointSource`] for one partition's committed
//! position on every query. The bundled [`BlobCheckpointSource`] resolves where
//! a given consumer framework stores its checkpoints (see [`CheckpointStrategy`])
//! and reads them through a [`BlobStore`] key lookup, which is the seam to the
//! actual storage service.
//!
//! A missing container or blob is reported as
//! [`CheckpointError::ContainerNotFound`] / [`CheckpointError::BlobNotFound`],
//! never folded into [`CheckpointError::Other`].

mod strategy;

#[cfg(test)]
mod strategy_test;

pub use strategy::{AZURE_FUNCTION_CONTAINER, CheckpointLocation, CheckpointStrategy};

pub use crate::error::CheckpointError;
use crate::lag::Checkpoint;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Fetches the committed checkpoint of a partition.
#[async_trait]
pub trait CheckpointSource: Send + Sync {
  /// Returns the checkpoint for `partition_id`.
  async fn get_checkpoint(&self, partition_id: &str) -> Result<Checkpoint, CheckpointError>;

  /// Releases connections to the checkpoint store.
  async fn close(&self) -> Result<(), CheckpointError> {
    Ok(())
  }
}

/// A stored blob: body plus user metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
  /// Blob content.
  pub body: Vec<u8>,
  /// User-defined metadata headers.
  pub metadata: HashMap<String, String>,
}

impl Blob {
  /// Creates a blob with the given body and no metadata.
  pub fn from_body(body: impl Into<Vec<u8>>) -> Self {
    Self {
      body: body.into(),
      metadata: HashMap::new(),
    }
  }

  /// Adds a metadata entry.
  #[must_use]
  pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.metadata.insert(key.into(), value.into());
    self
  }
}

/// Key lookup into a blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
  /// Reads the blob at `path` in `container`.
  async fn get_blob(&self, container: &str, path: &str) -> Result<Blob, CheckpointError>;

  /// Releases connections to the store.
  async fn close(&self) -> Result<(), CheckpointError> {
    Ok(())
  }
}

/// [`CheckpointSource`] reading checkpoints written by a consumer framework.
pub struct BlobCheckpointSource {
  store: Arc<dyn BlobStore>,
  location: CheckpointLocation,
}

impl BlobCheckpointSource {
  /// Creates a source reading from `store` at `location`.
  pub fn new(store: Arc<dyn BlobStore>, location: CheckpointLocation) -> Self {
    Self { store, location }
  }
}

#[async_trait]
impl CheckpointSource for BlobCheckpointSource {
  async fn get_checkpoint(&self, partition_id: &str) -> Result<Checkpoint, CheckpointError> {
    let container = self.location.container();
    let path = self.location.blob_path(partition_id);
    let blob = self.store.get_blob(container, &path).await?;
    self.location.strategy.decode(&blob)
  }

  async fn close(&self) -> Result<(), CheckpointError> {
    self.store.close().await
  }
}

/// In-memory blob store.
///
/// Useful for tests and for embedding the provider next to a process that
/// already holds checkpoints in memory.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
  containers: RwLock<HashMap<String, HashMap<String, Blob>>>,
  failure: RwLock<Option<CheckpointError>>,
  closed: AtomicBool,
}

impl InMemoryBlobStore {
  /// Creates an empty store.
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates an empty container.
  pub fn create_container(&self, container: &str) {
    if let Ok(mut containers) = self.containers.write() {
      containers.entry(container.to_string()).or_default();
    }
  }

  /// Stores a blob, creating its container if needed.
  pub fn put_blob(&self, container: &str, path: &str, blob: Blob) {
    if let Ok(mut containers) = self.containers.write() {
      containers
        .entry(container.to_string())
        .or_default()
        .insert(path.to_string(), blob);
    }
  }

  /// Makes every subsequent read fail with `error`, or clears the failure with `None`.
  pub fn set_failure(&self, error: Option<CheckpointError>) {
    if let Ok(mut failure) = self.failure.write() {
      *failure = error;
    }
  }

  /// Returns true once [`BlobStore::close`] was called.
  pub fn is_closed(&self) -> bool {
    self.closed.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
  async fn get_blob(&self, container: &str, path: &str) -> Result<Blob, CheckpointError> {
    if self.is_closed() {
      return Err(CheckpointError::Other("blob store closed".to_string()));
    }
    let failure = self
      .failure
      .read()
      .map_err(|e| CheckpointError::Other(e.to_string()))?;
    if let Some(error) = failure.as_ref() {
      return Err(error.clone());
    }

    let containers = self
      .containers
      .read()
      .map_err(|e| CheckpointError::Other(e.to_string()))?;
    let blobs = containers
      .get(container)
      .ok_or_else(|| CheckpointError::ContainerNotFound(container.to_string()))?;
    blobs
      .get(path)
      .cloned()
      .ok_or_else(|| CheckpointError::BlobNotFound(format!("{container}/{path}")))
  }

  async fn close(&self) -> Result<(), CheckpointError> {
    self.closed.store(true, Ordering::SeqCst);
    Ok(())
  }
}
