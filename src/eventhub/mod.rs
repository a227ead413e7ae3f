//! Azure Event Hubs partition-lag provider.
//!
//! [`EventHubScaler`] measures how far a consumer group's checkpoints trail
//! each partition of an event hub and reports the capped total as a scaling
//! metric. The stream service is reached through [`EventHubClient`] and the
//! checkpoints through a [`CheckpointSource`](crate::checkpoint::CheckpointSource);
//! both are injected at construction.

mod client;
mod metadata;
mod scaler;


pub use client::{EventHubClient, InMemoryEventHubClient};
pub use metadata::{
  ACTIVATION_THRESHOLD_KEY, DEFAULT_ACTIVATION_THRESHOLD, DEFAULT_CONSUMER_GROUP,
  DEFAULT_MESSAGE_THRESHOLD, DEFAULT_STALE_PARTITION_INFO_THRESHOLD, EventHubInfo,
  EventHubMetadata, STALE_THRESHOLD_KEY, THRESHOLD_KEY,
};
pub use scaler::{EventHubClients, EventHubScaler, LagSummary};
