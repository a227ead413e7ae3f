//! Where consumer frameworks store checkpoints, and how to read them.

use super::Blob;
use crate::error::{CheckpointError, ScalerError, ScalerResult};
use crate::lag::Checkpoint;
use serde::Deserialize;
use std::str::FromStr;

/// Container used by Azure Functions' Event Hubs trigger.
pub const AZURE_FUNCTION_CONTAINER: &str = "azure-webjobs-eventhub";

/// Checkpoint layout written by a consumer framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckpointStrategy {
  /// Legacy layout: `<consumer group>/<partition>` with a JSON body.
  ///
  /// Without a configured container this falls back to the Azure Functions layout.
  #[default]
  Default,
  /// Azure Functions: fixed container, JSON body.
  AzureFunction,
  /// Event Hubs processor SDKs storing the position in blob metadata.
  BlobMetadata,
  /// Go SDK processor: one blob per partition with a nested JSON body.
  GoSdk,
}

impl FromStr for CheckpointStrategy {
  type Err = ScalerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "" => Ok(CheckpointStrategy::Default),
      s if s.eq_ignore_ascii_case("azureFunction") => Ok(CheckpointStrategy::AzureFunction),
      s if s.eq_ignore_ascii_case("blobMetadata") => Ok(CheckpointStrategy::BlobMetadata),
      s if s.eq_ignore_ascii_case("goSdk") => Ok(CheckpointStrategy::GoSdk),
      other => Err(ScalerError::config(format!(
        "unknown checkpointStrategy '{other}'"
      ))),
    }
  }
}

#[derive(Deserialize)]
struct FunctionCheckpoint {
  #[serde(rename = "Offset", default)]
  offset: Option<String>,
  #[serde(rename = "SequenceNumber", default)]
  sequence_number: i64,
}

#[derive(Deserialize)]
struct GoSdkCheckpoint {
  checkpoint: GoSdkPosition,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoSdkPosition {
  #[serde(default)]
  offset: Option<String>,
  #[serde(default)]
  sequence_number: i64,
}

impl CheckpointStrategy {
  /// Decodes a checkpoint blob.
  ///
  /// An empty body means the consumer created the blob but has not
  /// committed yet.
  pub fn decode(self, blob: &Blob) -> Result<Checkpoint, CheckpointError> {
    match self {
      CheckpointStrategy::BlobMetadata => decode_metadata(blob),
      _ if blob.body.iter().all(u8::is_ascii_whitespace) => Ok(Checkpoint::none()),
      CheckpointStrategy::GoSdk => {
        let parsed: GoSdkCheckpoint = serde_json::from_slice(&blob.body)
          .map_err(|e| CheckpointError::Malformed(e.to_string()))?;
        Ok(Checkpoint::new(
          parsed.checkpoint.offset.unwrap_or_default(),
          parsed.checkpoint.sequence_number,
        ))
      }
      CheckpointStrategy::Default | CheckpointStrategy::AzureFunction => {
        let parsed: FunctionCheckpoint = serde_json::from_slice(&blob.body)
          .map_err(|e| CheckpointError::Malformed(e.to_string()))?;
        Ok(Checkpoint::new(
          parsed.offset.unwrap_or_default(),
          parsed.sequence_number,
        ))
      }
    }
  }
}

fn decode_metadata(blob: &Blob) -> Result<Checkpoint, CheckpointError> {
  let lookup = |key: &str| {
    blob
      .metadata
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(key))
      .map(|(_, v)| v.as_str())
  };

  let offset = lookup("offset").unwrap_or_default();
  let sequence_number = match lookup("sequencenumber") {
    Some(raw) => raw
      .trim()
      .parse::<i64>()
      .map_err(|e| CheckpointError::Malformed(format!("sequencenumber '{raw}': {e}")))?,
    None => 0,
  };
  Ok(Checkpoint::new(offset, sequence_number))
}

/// Resolved checkpoint location for one event hub and consumer group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointLocation {
  /// Layout in use.
  pub strategy: CheckpointStrategy,
  /// Configured container, may be empty for the Azure Functions layout.
  pub container: String,
  /// Fully qualified namespace host, e.g. `ns.servicebus.windows.net`.
  pub namespace_host: String,
  /// Event hub name.
  pub event_hub_name: String,
  /// Consumer group.
  pub consumer_group: String,
}

impl CheckpointLocation {
  /// Validates that the layout can be resolved.
  pub fn validate(&self) -> ScalerResult<()> {
    let needs_container = matches!(
      self.strategy,
      CheckpointStrategy::BlobMetadata | CheckpointStrategy::GoSdk
    );
    if needs_container && self.container.is_empty() {
      return Err(ScalerError::config(format!(
        "blobContainer is required for checkpointStrategy {:?}",
        self.strategy
      )));
    }
    Ok(())
  }

  fn uses_function_layout(&self) -> bool {
    self.strategy == CheckpointStrategy::AzureFunction
      || (self.strategy == CheckpointStrategy::Default && self.container.is_empty())
  }

  /// Container holding the checkpoint blobs.
  pub fn container(&self) -> &str {
    if self.uses_function_layout() {
      AZURE_FUNCTION_CONTAINER
    } else {
      &self.container
    }
  }

  /// Path of the checkpoint blob for a partition.
  pub fn blob_path(&self, partition_id: &str) -> String {
    let group = self.consumer_group.to_lowercase();
    if self.uses_function_layout() {
      return format!(
        "{}/{}/{}/{}",
        self.namespace_host, self.event_hub_name, group, partition_id
      );
    }
    match self.strategy {
      CheckpointStrategy::BlobMetadata => format!(
        "{}/{}/{}/checkpoint/{}",
        self.namespace_host, self.event_hub_name, group, partition_id
      ),
      CheckpointStrategy::GoSdk => partition_id.to_string(),
      _ => format!("{}/{}", self.consumer_group, partition_id),
    }
  }
}
