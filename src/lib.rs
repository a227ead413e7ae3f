//! # StreamWeave Scalers
//!
//! Event-driven autoscaling metrics for partitioned streams.
//!
//! An external control loop polls a [`MetricsProvider`] on an interval and
//! turns the returned value and activity flag into replica decisions. Two
//! providers are included:
//!
//! - [`EventHubScaler`]: estimates unprocessed events per Azure Event Hubs
//!   partition from the live sequence numbers and the consumer group's
//!   checkpoints, then sums and caps the backlog.
//! - [`KinesisScaler`]: reports the open shard count of an AWS Kinesis stream.
//!
//! Stream services and checkpoint stores are reached through traits
//! ([`EventHubClient`], [`CheckpointSource`], [`KinesisClient`]) injected at
//! construction. In-memory implementations are provided for tests and local
//! runs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamweave_scalers::config::ScalerConfig;
//! use streamweave_scalers::kinesis::{InMemoryKinesisClient, KinesisClient, KinesisScaler};
//! use streamweave_scalers::provider::MetricsProvider;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), streamweave_scalers::error::ScalerError> {
//! let config = ScalerConfig::new()
//!   .with_metadata("streamName", "clicks")
//!   .with_metadata("awsRegion", "eu-west-1")
//!   .with_auth_param("awsRoleArn", "arn:aws:iam::123456789012:role/scaler");
//!
//! let client: Arc<dyn KinesisClient> = Arc::new(InMemoryKinesisClient::new());
//! let scaler = KinesisScaler::new(&config, |_| Ok(client))?;
//! let spec = scaler.metric_spec();
//! let result = scaler
//!   .metrics_and_activity(&CancellationToken::new(), &spec.metric_name)
//!   .await?;
//! println!("{} active={}", result.value.value(), result.is_active);
//! # Ok(())
//! # }
//! ```

// Documentation enforcement - treat missing docs as errors
#![deny(missing_docs)]

/// AWS authorization metadata.
pub mod aws;
/// Azure cloud environments and connection strings.
pub mod azure;
/// Checkpoint sources and blob layouts.
pub mod checkpoint;
/// Trigger configuration handed over by the control loop.
pub mod config;
/// Error taxonomy shared by all providers.
pub mod error;
/// Azure Event Hubs partition-lag provider.
pub mod eventhub;
/// AWS Kinesis shard-count provider.
pub mod kinesis;
/// Unprocessed-event arithmetic.
pub mod lag;
/// Metrics emitted while answering queries.
pub mod observability;
/// The metric-provider contract.
pub mod provider;

#[cfg(test)]
mod aws_test;

pub use checkpoint::CheckpointSource;
pub use config::ScalerConfig;
pub use error::{ScalerError, ScalerResult};
pub use eventhub::{EventHubClient, EventHubScaler};
pub use kinesis::{KinesisClient, KinesisScaler};
pub use provider::{MetricQueryResult, MetricSpec, MetricsProvider};
