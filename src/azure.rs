//! Azure cloud environments and connection-string helpers.
//!
//! Endpoint suffixes depend on which Azure cloud hosts the namespace. Trigger
//! metadata selects the cloud with the `cloud` key; a `Private` cloud supplies
//! every suffix explicitly.

use crate::config::ScalerConfig;
use crate::error::{ScalerError, ScalerResult};

/// Metadata key selecting the Azure cloud.
pub const CLOUD_KEY: &str = "cloud";
/// Cloud name for explicitly configured endpoints.
pub const PRIVATE_CLOUD: &str = "Private";
/// Metadata key overriding the Service Bus endpoint suffix.
pub const ENDPOINT_SUFFIX_KEY: &str = "endpointSuffix";
/// Metadata key overriding the storage endpoint suffix.
pub const STORAGE_SUFFIX_KEY: &str = "storageEndpointSuffix";
/// Metadata key overriding the Active Directory endpoint.
pub const ACTIVE_DIRECTORY_ENDPOINT_KEY: &str = "activeDirectoryEndpoint";
/// Token audience for Event Hubs in public clouds.
pub const DEFAULT_EVENTHUB_RESOURCE_URL: &str = "https://eventhubs.azure.net/";

/// A well-known Azure cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AzureCloud {
  /// Azure public cloud.
  Public,
  /// Azure US Government.
  UsGovernment,
  /// Azure China.
  China,
  /// Azure Germany.
  Germany,
}

impl AzureCloud {
  /// Looks a cloud up by its environment name, case-insensitively.
  pub fn from_name(name: &str) -> Option<Self> {
    [
      ("AzurePublicCloud", AzureCloud::Public),
      ("AzureUSGovernmentCloud", AzureCloud::UsGovernment),
      ("AzureChinaCloud", AzureCloud::China),
      ("AzureGermanCloud", AzureCloud::Germany),
    ]
    .into_iter()
    .find(|(n, _)| n.eq_ignore_ascii_case(name))
    .map(|(_, cloud)| cloud)
  }

  /// Service Bus (Event Hubs) endpoint suffix.
  pub fn service_bus_endpoint_suffix(self) -> &'static str {
    match self {
      AzureCloud::Public => "servicebus.windows.net",
      AzureCloud::UsGovernment => "servicebus.usgovcloudapi.net",
      AzureCloud::China => "servicebus.chinacloudapi.cn",
      AzureCloud::Germany => "servicebus.cloudapi.de",
    }
  }

  /// Storage endpoint suffix.
  pub fn storage_endpoint_suffix(self) -> &'static str {
    match self {
      AzureCloud::Public => "core.windows.net",
      AzureCloud::UsGovernment => "core.usgovcloudapi.net",
      AzureCloud::China => "core.chinacloudapi.cn",
      AzureCloud::Germany => "core.cloudapi.de",
    }
  }

  /// Active Directory authority.
  pub fn active_directory_endpoint(self) -> &'static str {
    match self {
      AzureCloud::Public => "https://login.microsoftonline.com/",
      AzureCloud::UsGovernment => "https://login.microsoftonline.us/",
      AzureCloud::China => "https://login.chinacloudapi.cn/",
      AzureCloud::Germany => "https://login.microsoftonline.de/",
    }
  }
}

/// Returns true if the trigger selects the private cloud.
pub fn is_private_cloud(config: &ScalerConfig) -> bool {
  config
    .non_empty_metadata(CLOUD_KEY)
    .is_some_and(|c| c.eq_ignore_ascii_case(PRIVATE_CLOUD))
}

/// Resolves a cloud-dependent property.
///
/// With no `cloud` key the public cloud is used. A private cloud requires
/// `property_key` to be set; unknown cloud names are rejected.
pub fn parse_environment_property(
  config: &ScalerConfig,
  property_key: &str,
  property: fn(AzureCloud) -> &'static str,
) -> ScalerResult<String> {
  let Some(cloud) = config.non_empty_metadata(CLOUD_KEY) else {
    return Ok(property(AzureCloud::Public).to_string());
  };

  if cloud.eq_ignore_ascii_case(PRIVATE_CLOUD) {
    return config
      .non_empty_metadata(property_key)
      .map(str::to_string)
      .ok_or_else(|| {
        ScalerError::config(format!(
          "{property_key} must be provided for {PRIVATE_CLOUD} cloud type"
        ))
      });
  }

  AzureCloud::from_name(cloud)
    .map(|c| property(c).to_string())
    .ok_or_else(|| ScalerError::config(format!("invalid cloud environment {cloud}")))
}

/// Resolves the Active Directory endpoint for the configured cloud.
pub fn parse_active_directory_endpoint(config: &ScalerConfig) -> ScalerResult<String> {
  parse_environment_property(
    config,
    ACTIVE_DIRECTORY_ENDPOINT_KEY,
    AzureCloud::active_directory_endpoint,
  )
}

/// Fields of an Event Hubs connection string relevant to scaling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventHubConnection {
  /// Namespace host, e.g. `ns.servicebus.windows.net`.
  pub namespace_host: String,
  /// Event hub name from `EntityPath`, if present.
  pub entity_path: Option<String>,
  /// Shared access key name, if present.
  pub shared_access_key_name: Option<String>,
}

/// Parses `Endpoint=sb://host/;SharedAccessKeyName=…;SharedAccessKey=…;EntityPath=…`.
pub fn parse_event_hub_connection_string(connection: &str) -> ScalerResult<EventHubConnection> {
  let mut parsed = EventHubConnection::default();
  for part in connection.split(';').filter(|p| !p.trim().is_empty()) {
    let Some((key, value)) = part.split_once('=') else {
      return Err(ScalerError::config(
        "event hub connection string has a segment without '='",
      ));
    };
    match key.trim() {
      k if k.eq_ignore_ascii_case("Endpoint") => {
        parsed.namespace_host = value
          .trim()
          .trim_start_matches("sb://")
          .trim_start_matches("https://")
          .trim_end_matches('/')
          .to_string();
      }
      k if k.eq_ignore_ascii_case("EntityPath") => {
        parsed.entity_path = Some(value.trim().to_string());
      }
      k if k.eq_ignore_ascii_case("SharedAccessKeyName") => {
        parsed.shared_access_key_name = Some(value.trim().to_string());
      }
      _ => {}
    }
  }

  if parsed.namespace_host.is_empty() {
    return Err(ScalerError::config(
      "event hub connection string does not contain an Endpoint",
    ));
  }
  Ok(parsed)
}
