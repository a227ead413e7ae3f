//! Typed Event Hub trigger metadata.

use crate::azure::{
  self, AzureCloud, DEFAULT_EVENTHUB_RESOURCE_URL, ENDPOINT_SUFFIX_KEY, STORAGE_SUFFIX_KEY,
};
use crate::checkpoint::{CheckpointLocation, CheckpointStrategy};
use crate::config::{PodIdentityProvider, ScalerConfig};
use crate::error::{ScalerError, ScalerResult};
use std::fmt;
use tracing::info;

/// Default target of unprocessed events per replica.
pub const DEFAULT_MESSAGE_THRESHOLD: i64 = 64;
/// Default activation threshold.
pub const DEFAULT_ACTIVATION_THRESHOLD: i64 = 0;
/// Default slack below `i64::MAX` treated as stale partition info.
pub const DEFAULT_STALE_PARTITION_INFO_THRESHOLD: i64 = 10_000;
/// Consumer group used when none is configured.
pub const DEFAULT_CONSUMER_GROUP: &str = "$Default";

/// Metadata key of the target threshold.
pub const THRESHOLD_KEY: &str = "unprocessedEventThreshold";
/// Metadata key of the activation threshold.
pub const ACTIVATION_THRESHOLD_KEY: &str = "activationUnprocessedEventThreshold";
/// Metadata key of the stale-partition slack.
pub const STALE_THRESHOLD_KEY: &str = "stalePartitionInfoThreshold";

/// Connection and checkpoint settings of an event hub.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EventHubInfo {
  /// Event hub connection string including `EntityPath`, when not using an identity.
  pub connection: Option<String>,
  /// Storage account connection string for checkpoints.
  pub storage_connection: Option<String>,
  /// Consumer group whose lag is measured.
  pub consumer_group: String,
  /// Checkpoint layout.
  pub checkpoint_strategy: CheckpointStrategy,
  /// Configured checkpoint container, possibly empty.
  pub blob_container: String,
  /// Token audience for identity-based access.
  pub resource_url: String,
  /// Service Bus endpoint suffix of the cloud.
  pub service_bus_endpoint_suffix: String,
  /// Active Directory authority of the cloud.
  pub active_directory_endpoint: String,
  /// Storage account for identity-based blob access.
  pub storage_account_name: Option<String>,
  /// Blob endpoint suffix, e.g. `blob.core.windows.net`.
  pub blob_storage_endpoint: Option<String>,
  /// Namespace name for identity-based access.
  pub namespace: Option<String>,
  /// Event hub name for identity-based access.
  pub event_hub_name: Option<String>,
  /// Identity provider in use.
  pub pod_identity: PodIdentityProvider,
}

// Connection strings carry keys.
impl fmt::Debug for EventHubInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventHubInfo")
      .field("consumer_group", &self.consumer_group)
      .field("checkpoint_strategy", &self.checkpoint_strategy)
      .field("blob_container", &self.blob_container)
      .field("namespace", &self.namespace)
      .field("event_hub_name", &self.event_hub_name)
      .field("pod_identity", &self.pod_identity)
      .finish_non_exhaustive()
  }
}

impl EventHubInfo {
  /// Fully qualified namespace host and event hub name.
  pub fn namespace_and_hub(&self) -> ScalerResult<(String, String)> {
    if let Some(connection) = &self.connection {
      let parsed = azure::parse_event_hub_connection_string(connection)?;
      let hub = parsed
        .entity_path
        .ok_or_else(|| ScalerError::config("event hub connection string has no EntityPath"))?;
      return Ok((parsed.namespace_host, hub));
    }

    match (&self.namespace, &self.event_hub_name) {
      (Some(namespace), Some(hub)) => Ok((
        format!("{namespace}.{}", self.service_bus_endpoint_suffix),
        hub.clone(),
      )),
      _ => Err(ScalerError::config(
        "no event hub namespace or name to locate checkpoints",
      )),
    }
  }

  /// Resolves where the consumer group's checkpoints live.
  pub fn checkpoint_location(&self) -> ScalerResult<CheckpointLocation> {
    let (namespace_host, event_hub_name) = self.namespace_and_hub()?;
    let location = CheckpointLocation {
      strategy: self.checkpoint_strategy,
      container: self.blob_container.clone(),
      namespace_host,
      event_hub_name,
      consumer_group: self.consumer_group.clone(),
    };
    location.validate()?;
    Ok(location)
  }
}

/// Parsed Event Hub trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHubMetadata {
  /// Connection and checkpoint settings.
  pub event_hub_info: EventHubInfo,
  /// Target unprocessed events per replica; always positive.
  pub threshold: i64,
  /// Backlog above which the workload is active.
  pub activation_threshold: i64,
  /// Slack below `i64::MAX` treated as a stale reading.
  pub stale_partition_info_threshold: i64,
  /// Trigger index for metric naming.
  pub trigger_index: usize,
}

impl EventHubMetadata {
  /// Parses and validates an Event Hub trigger.
  pub fn parse(config: &ScalerConfig) -> ScalerResult<Self> {
    let mut meta = parse_common(config)?;
    parse_authentication(config, &mut meta)?;
    // Fail at construction, not at the first poll.
    meta.event_hub_info.checkpoint_location()?;
    Ok(meta)
  }
}

fn parse_common(config: &ScalerConfig) -> ScalerResult<EventHubMetadata> {
  let threshold = config.parse_i64(THRESHOLD_KEY, DEFAULT_MESSAGE_THRESHOLD)?;
  if threshold <= 0 {
    return Err(ScalerError::config(format!(
      "{THRESHOLD_KEY} must be greater than 0, got {threshold}"
    )));
  }
  let activation_threshold =
    config.parse_i64(ACTIVATION_THRESHOLD_KEY, DEFAULT_ACTIVATION_THRESHOLD)?;
  let stale_partition_info_threshold =
    config.parse_i64(STALE_THRESHOLD_KEY, DEFAULT_STALE_PARTITION_INFO_THRESHOLD)?;

  let resource_url = if azure::is_private_cloud(config) {
    config
      .non_empty_metadata("eventHubResourceURL")
      .map(str::to_string)
      .ok_or_else(|| {
        ScalerError::config(format!(
          "eventHubResourceURL must be provided for {} cloud type",
          azure::PRIVATE_CLOUD
        ))
      })?
  } else {
    DEFAULT_EVENTHUB_RESOURCE_URL.to_string()
  };

  let event_hub_info = EventHubInfo {
    storage_connection: config.auth_param_or_env("storageConnection").map(str::to_string),
    consumer_group: config
      .non_empty_metadata("consumerGroup")
      .unwrap_or(DEFAULT_CONSUMER_GROUP)
      .to_string(),
    checkpoint_strategy: config
      .metadata("checkpointStrategy")
      .unwrap_or_default()
      .parse()?,
    blob_container: config.metadata("blobContainer").unwrap_or_default().to_string(),
    resource_url,
    service_bus_endpoint_suffix: azure::parse_environment_property(
      config,
      ENDPOINT_SUFFIX_KEY,
      AzureCloud::service_bus_endpoint_suffix,
    )?,
    active_directory_endpoint: azure::parse_active_directory_endpoint(config)?,
    pod_identity: config.pod_identity,
    ..Default::default()
  };

  Ok(EventHubMetadata {
    event_hub_info,
    threshold,
    activation_threshold,
    stale_partition_info_threshold,
    trigger_index: config.trigger_index,
  })
}

fn parse_authentication(config: &ScalerConfig, meta: &mut EventHubMetadata) -> ScalerResult<()> {
  let info = &mut meta.event_hub_info;

  if !config.pod_identity.is_azure() {
    if info.storage_connection.is_none() {
      return Err(ScalerError::config("no storage connection string given"));
    }

    let mut connection = config
      .auth_param_or_env("connection")
      .ok_or_else(|| ScalerError::config("no event hub connection string given"))?
      .to_string();

    if !connection.contains("EntityPath") {
      let hub = config.metadata_or_env("eventHubName").ok_or_else(|| {
        ScalerError::config(
          "connection string does not contain event hub name, and parameter eventHubName not provided",
        )
      })?;
      connection = format!("{};EntityPath={hub}", connection.trim_end_matches(';'));
    }

    info.connection = Some(connection);
    return Ok(());
  }

  info.storage_account_name = config
    .non_empty_metadata("storageAccountName")
    .map(str::to_string);
  match info.storage_account_name {
    Some(_) => {
      let suffix = azure::parse_environment_property(
        config,
        STORAGE_SUFFIX_KEY,
        AzureCloud::storage_endpoint_suffix,
      )?;
      info.blob_storage_endpoint = Some(format!("blob.{suffix}"));
    }
    None => info!(
      "no 'storageAccountName' provided to enable identity based authentication to Blob Storage, attempting to use connection string instead"
    ),
  }

  if info.storage_connection.is_none() && info.storage_account_name.is_none() {
    return Err(ScalerError::config(
      "no storage connection string or storage account name for pod identity based authentication given",
    ));
  }

  info.namespace = Some(
    config
      .metadata_or_env("eventHubNamespace")
      .ok_or_else(|| ScalerError::config("no event hub namespace string given"))?
      .to_string(),
  );
  info.event_hub_name = Some(
    config
      .metadata_or_env("eventHubName")
      .ok_or_else(|| ScalerError::config("no event hub name string given"))?
      .to_string(),
  );

  Ok(())
}
