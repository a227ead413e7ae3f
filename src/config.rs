//! Configuration handed to a provider at construction.
//!
//! A [`ScalerConfig`] is produced by an external loader (it derives serde's
//! `Deserialize`) and holds the raw, string-typed trigger metadata. Each
//! provider parses it into its own typed metadata once, in its constructor;
//! nothing reads the raw config after that.

use crate::error::{ScalerError, ScalerResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::str::FromStr;

/// Identity provider used to authenticate against cloud services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PodIdentityProvider {
  /// No workload identity; connection strings or keys are used.
  #[default]
  #[serde(rename = "none")]
  None,
  /// Azure AD pod identity.
  #[serde(rename = "azure")]
  Azure,
  /// Azure AD workload identity.
  #[serde(rename = "azure-workload")]
  AzureWorkload,
  /// AWS pod identity.
  #[serde(rename = "aws")]
  Aws,
  /// AWS EKS IAM roles for service accounts.
  #[serde(rename = "aws-eks")]
  AwsEks,
}

impl PodIdentityProvider {
  /// Returns true for the Azure identity providers.
  pub fn is_azure(self) -> bool {
    matches!(self, PodIdentityProvider::Azure | PodIdentityProvider::AzureWorkload)
  }

  /// Returns true for the AWS identity providers.
  pub fn is_aws(self) -> bool {
    matches!(self, PodIdentityProvider::Aws | PodIdentityProvider::AwsEks)
  }
}

impl FromStr for PodIdentityProvider {
  type Err = ScalerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "" | "none" => Ok(PodIdentityProvider::None),
      "azure" => Ok(PodIdentityProvider::Azure),
      "azure-workload" => Ok(PodIdentityProvider::AzureWorkload),
      "aws" => Ok(PodIdentityProvider::Aws),
      "aws-eks" => Ok(PodIdentityProvider::AwsEks),
      other => Err(ScalerError::config(format!(
        "unknown pod identity provider '{other}'"
      ))),
    }
  }
}

/// How the autoscaler compares the metric against the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MetricTargetType {
  /// Target is divided across replicas.
  #[default]
  AverageValue,
  /// Target is compared with the raw value.
  Value,
  /// Resource utilization; not meaningful for external metrics.
  Utilization,
}

impl Display for MetricTargetType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MetricTargetType::AverageValue => write!(f, "AverageValue"),
      MetricTargetType::Value => write!(f, "Value"),
      MetricTargetType::Utilization => write!(f, "Utilization"),
    }
  }
}

/// Raw configuration of one trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalerConfig {
  /// Trigger metadata keys and values.
  #[serde(default)]
  pub trigger_metadata: HashMap<String, String>,
  /// Secrets resolved from the trigger's authentication reference.
  #[serde(default)]
  pub auth_params: HashMap<String, String>,
  /// Environment of the scaled workload, for `*FromEnv` keys.
  #[serde(default)]
  pub resolved_env: HashMap<String, String>,
  /// Position of the trigger in the workload's trigger list.
  #[serde(default)]
  pub trigger_index: usize,
  /// Identity provider for cloud authentication.
  #[serde(default)]
  pub pod_identity: PodIdentityProvider,
  /// Requested metric target type, `None` for the default.
  #[serde(default)]
  pub metric_type: Option<MetricTargetType>,
}

impl ScalerConfig {
  /// Creates an empty config.
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets a trigger metadata value.
  #[must_use]
  pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.trigger_metadata.insert(key.into(), value.into());
    self
  }

  /// Sets an authentication parameter.
  #[must_use]
  pub fn with_auth_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.auth_params.insert(key.into(), value.into());
    self
  }

  /// Sets a resolved environment variable.
  #[must_use]
  pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.resolved_env.insert(key.into(), value.into());
    self
  }

  /// Sets the trigger index.
  #[must_use]
  pub fn with_trigger_index(mut self, index: usize) -> Self {
    self.trigger_index = index;
    self
  }

  /// Sets the pod identity provider.
  #[must_use]
  pub fn with_pod_identity(mut self, provider: PodIdentityProvider) -> Self {
    self.pod_identity = provider;
    self
  }

  /// Sets the metric target type.
  #[must_use]
  pub fn with_metric_type(mut self, metric_type: MetricTargetType) -> Self {
    self.metric_type = Some(metric_type);
    self
  }

  /// Returns a trigger metadata value.
  pub fn metadata(&self, key: &str) -> Option<&str> {
    self.trigger_metadata.get(key).map(String::as_str)
  }

  /// Returns a non-empty trigger metadata value.
  pub fn non_empty_metadata(&self, key: &str) -> Option<&str> {
    self.metadata(key).filter(|v| !v.is_empty())
  }

  /// Returns a non-empty authentication parameter.
  pub fn auth_param(&self, key: &str) -> Option<&str> {
    self
      .auth_params
      .get(key)
      .map(String::as_str)
      .filter(|v| !v.is_empty())
  }

  /// Resolves `key` from metadata, falling back to the env var named by `{key}FromEnv`.
  pub fn metadata_or_env(&self, key: &str) -> Option<&str> {
    self
      .non_empty_metadata(key)
      .or_else(|| self.env_value(key))
  }

  /// Resolves `key` from auth params, falling back to the env var named by `{key}FromEnv`.
  pub fn auth_param_or_env(&self, key: &str) -> Option<&str> {
    self.auth_param(key).or_else(|| self.env_value(key))
  }

  fn env_value(&self, key: &str) -> Option<&str> {
    let env_key = self.non_empty_metadata(&format!("{key}FromEnv"))?;
    self
      .resolved_env
      .get(env_key)
      .map(String::as_str)
      .filter(|v| !v.is_empty())
  }

  /// Parses an integer metadata value, returning `default` when the key is absent or empty.
  ///
  /// Unparseable values are configuration errors.
  pub fn parse_i64(&self, key: &str, default: i64) -> ScalerResult<i64> {
    match self.non_empty_metadata(key) {
      Some(raw) => raw.trim().parse::<i64>().map_err(|e| {
        ScalerError::config(format!("error parsing metadata {key} '{raw}': {e}"))
      }),
      None => Ok(default),
    }
  }

  /// Resolves the metric target type; external metrics cannot use `Utilization`.
  pub fn metric_target_type(&self) -> ScalerResult<MetricTargetType> {
    match self.metric_type.unwrap_or_default() {
      MetricTargetType::Utilization => Err(ScalerError::config(format!(
        "'{}' metric type is unsupported for external metrics, allowed values are '{}' or '{}'",
        MetricTargetType::Utilization,
        MetricTargetType::Value,
        MetricTargetType::AverageValue,
      ))),
      other => Ok(other),
    }
  }
}
