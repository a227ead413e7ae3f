//! AWS authorization metadata.
//!
//! The scaler never resolves credentials itself; it parses which mechanism the
//! trigger asked for and hands the result to the client factory.

use crate::config::ScalerConfig;
use crate::error::{ScalerError, ScalerResult};
use std::fmt;

/// How the stream client should obtain AWS credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum AwsAuthorization {
  /// Credentials come from the workload's pod identity.
  PodIdentity,
  /// Credentials come from the operator's own identity.
  OperatorIdentity,
  /// Assume the given role.
  AssumeRole {
    /// Role ARN.
    role_arn: String,
  },
  /// Static access keys.
  AccessKeys {
    /// Access key id.
    access_key_id: String,
    /// Secret access key.
    secret_access_key: String,
    /// Optional session token for temporary credentials.
    session_token: Option<String>,
  },
}

// Keys are secrets; keep them out of logs.
impl fmt::Debug for AwsAuthorization {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AwsAuthorization::PodIdentity => write!(f, "PodIdentity"),
      AwsAuthorization::OperatorIdentity => write!(f, "OperatorIdentity"),
      AwsAuthorization::AssumeRole { role_arn } => {
        f.debug_struct("AssumeRole").field("role_arn", role_arn).finish()
      }
      AwsAuthorization::AccessKeys { access_key_id, .. } => f
        .debug_struct("AccessKeys")
        .field("access_key_id", access_key_id)
        .finish_non_exhaustive(),
    }
  }
}

impl AwsAuthorization {
  /// Parses the authorization mechanism from a trigger config.
  ///
  /// Precedence: AWS pod identity, `identityOwner: operator`, `awsRoleArn`,
  /// then `awsAccessKeyID` with `awsSecretAccessKey`.
  pub fn from_config(config: &ScalerConfig) -> ScalerResult<Self> {
    if config.pod_identity.is_aws() {
      return Ok(AwsAuthorization::PodIdentity);
    }

    if config
      .non_empty_metadata("identityOwner")
      .is_some_and(|owner| owner.eq_ignore_ascii_case("operator"))
    {
      return Ok(AwsAuthorization::OperatorIdentity);
    }

    if let Some(role_arn) = config.auth_param("awsRoleArn") {
      return Ok(AwsAuthorization::AssumeRole {
        role_arn: role_arn.to_string(),
      });
    }

    let access_key_id = config
      .auth_param_or_env("awsAccessKeyID")
      .ok_or_else(|| ScalerError::config("awsAccessKeyID not found"))?;
    let secret_access_key = config
      .auth_param_or_env("awsSecretAccessKey")
      .ok_or_else(|| ScalerError::config("awsSecretAccessKey not found"))?;

    Ok(AwsAuthorization::AccessKeys {
      access_key_id: access_key_id.to_string(),
      secret_access_key: secret_access_key.to_string(),
      session_token: config.auth_param("awsSessionToken").map(str::to_string),
    })
  }
}
