//! Typed Kinesis trigger metadata.

use crate::aws::AwsAuthorization;
use crate::config::ScalerConfig;
use crate::error::{ScalerError, ScalerResult};

/// Default target shard count per replica.
pub const DEFAULT_TARGET_SHARD_COUNT: i64 = 2;
/// Default activation shard count.
pub const DEFAULT_ACTIVATION_TARGET_SHARD_COUNT: i64 = 0;

/// Parsed Kinesis trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KinesisMetadata {
  /// Target shards per replica.
  pub target_shard_count: i64,
  /// Shard count above which the workload is active.
  pub activation_target_shard_count: i64,
  /// Stream to describe.
  pub stream_name: String,
  /// AWS region of the stream.
  pub aws_region: String,
  /// Endpoint override, e.g. for a local Kinesis emulator.
  pub aws_endpoint: Option<String>,
  /// How the client obtains credentials.
  pub aws_authorization: AwsAuthorization,
  /// Trigger index for metric naming.
  pub trigger_index: usize,
}

impl KinesisMetadata {
  /// Parses and validates a Kinesis trigger.
  ///
  /// Unparseable shard counts are configuration errors, as for Event Hub
  /// thresholds.
  pub fn parse(config: &ScalerConfig) -> ScalerResult<Self> {
    let target_shard_count = config.parse_i64("shardCount", DEFAULT_TARGET_SHARD_COUNT)?;
    let activation_target_shard_count =
      config.parse_i64("activationShardCount", DEFAULT_ACTIVATION_TARGET_SHARD_COUNT)?;

    let stream_name = config
      .non_empty_metadata("streamName")
      .ok_or_else(|| ScalerError::config("no streamName given"))?
      .to_string();
    let aws_region = config
      .non_empty_metadata("awsRegion")
      .ok_or_else(|| ScalerError::config("no awsRegion given"))?
      .to_string();

    Ok(Self {
      target_shard_count,
      activation_target_shard_count,
      stream_name,
      aws_region,
      aws_endpoint: config.non_empty_metadata("awsEndpoint").map(str::to_string),
      aws_authorization: AwsAuthorization::from_config(config)?,
      trigger_index: config.trigger_index,
    })
  }
}
