use std::sync::Arc;
use streamweave_scalers::checkpoint::{Blob, InMemoryBlobStore};
use streamweave_scalers::config::{PodIdentityProvider, ScalerConfig};
use streamweave_scalers::eventhub::{EventHubClients, EventHubScaler, InMemoryEventHubClient};
use streamweave_scalers::kinesis::{InMemoryKinesisClient, KinesisClient, KinesisScaler};
use streamweave_scalers::lag::PartitionRuntimeState;
use streamweave_scalers::provider::MetricsProvider;
use tokio_util::sync::CancellationToken;

fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_test_writer()
    .try_init();
}

fn event_hub_provider(
  hub: Arc<InMemoryEventHubClient>,
  store: Arc<InMemoryBlobStore>,
) -> Box<dyn MetricsProvider> {
  // Workload identity without a storage connection uses the Functions layout.
  let config = ScalerConfig::new()
    .with_pod_identity(PodIdentityProvider::AzureWorkload)
    .with_metadata("storageAccountName", "checkpointstore")
    .with_metadata("eventHubNamespace", "orders")
    .with_metadata("eventHubName", "orders-hub")
    .with_metadata("consumerGroup", "Billing")
    .with_metadata("unprocessedEventThreshold", "50")
    .with_metadata("activationUnprocessedEventThreshold", "20");
  let scaler = EventHubScaler::new(&config, |meta| {
    EventHubClients::with_blob_store(hub, store, meta)
  })
  .unwrap()
  .with_partition_concurrency(4);
  Box::new(scaler)
}

fn kinesis_provider(client: Arc<InMemoryKinesisClient>) -> Box<dyn MetricsProvider> {
  let config = ScalerConfig::new()
    .with_metadata("streamName", "clicks")
    .with_metadata("awsRegion", "us-east-1")
    .with_metadata("shardCount", "1")
    .with_metadata("activationShardCount", "1")
    .with_trigger_index(1)
    .with_pod_identity(PodIdentityProvider::Aws);
  let scaler = KinesisScaler::new(&config, move |_| {
    let client: Arc<dyn KinesisClient> = client;
    Ok(client)
  })
  .unwrap();
  Box::new(scaler)
}

#[tokio::test]
async fn test_providers_share_one_contract() {
  init_tracing();

  let hub = Arc::new(InMemoryEventHubClient::new(vec![
    PartitionRuntimeState::new("0", 0, 120, "4096"),
    PartitionRuntimeState::new("1", 0, 40, "2048"),
    PartitionRuntimeState::new("2", 0, 0, "0"),
  ]));
  let store = Arc::new(InMemoryBlobStore::new());
  let prefix = "orders.servicebus.windows.net/orders-hub/billing";
  store.put_blob(
    "azure-webjobs-eventhub",
    &format!("{prefix}/0"),
    Blob::from_body(r#"{"Offset":"1024","SequenceNumber":20}"#),
  );
  store.put_blob(
    "azure-webjobs-eventhub",
    &format!("{prefix}/1"),
    Blob::from_body(r#"{"Offset":"2048","SequenceNumber":40}"#),
  );

  let kinesis = Arc::new(InMemoryKinesisClient::new());
  kinesis.set_open_shard_count("clicks", 4);

  let providers = vec![
    event_hub_provider(hub.clone(), store.clone()),
    kinesis_provider(kinesis.clone()),
  ];
  let cancel = CancellationToken::new();

  let mut reported = Vec::new();
  for provider in &providers {
    let spec = provider.metric_spec();
    let result = provider
      .metrics_and_activity(&cancel, &spec.metric_name)
      .await
      .unwrap();
    reported.push((spec.metric_name, result.value.milli_value, result.is_active));
  }

  // Partition 2 has never been checkpointed and holds 0..=0, so it counts 1.
  assert_eq!(
    reported,
    vec![
      ("s0-azure-eventhub-Billing".to_string(), 101_000, true),
      ("s1-aws-kinesis-clicks".to_string(), 4_000, true),
    ]
  );

  for provider in &providers {
    provider.close(&cancel).await.unwrap();
  }
  assert!(hub.is_closed());
  assert!(store.is_closed());
  assert!(kinesis.is_closed());
}

#[tokio::test]
async fn test_cancelled_token_stops_every_provider() {
  init_tracing();

  let hub = Arc::new(InMemoryEventHubClient::new(vec![PartitionRuntimeState::new(
    "0", 0, 10, "0",
  )]));
  let kinesis = Arc::new(InMemoryKinesisClient::new());
  kinesis.set_open_shard_count("clicks", 2);

  let providers = vec![
    event_hub_provider(hub, Arc::new(InMemoryBlobStore::new())),
    kinesis_provider(kinesis),
  ];
  let cancel = CancellationToken::new();
  cancel.cancel();

  for provider in &providers {
    let spec = provider.metric_spec();
    let err = provider
      .metrics_and_activity(&cancel, &spec.metric_name)
      .await
      .unwrap_err();
    assert!(err.is_cancelled());
  }
}
