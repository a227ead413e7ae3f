//! AWS Kinesis shard-count provider.
//!
//! The service already exposes one authoritative number, so [`KinesisScaler`]
//! reports it as-is: no aggregation or staleness handling is involved.

mod client;
mod metadata;
mod scaler;

#[cfg(test)]
mod scaler_test;

pub use client::{InMemoryKinesisClient, KinesisClient, StreamSummary};
pub use metadata::{
  DEFAULT_ACTIVATION_TARGET_SHARD_COUNT, DEFAULT_TARGET_SHARD_COUNT, KinesisMetadata,
};
pub use scaler::KinesisScaler;
