use crate::config::{MetricTargetType, ScalerConfig};
use crate::error::{ScalerError, StreamClientError};
use crate::kinesis::{InMemoryKinesisClient, KinesisClient, KinesisScaler};
use crate::provider::{MetricTarget, MetricsProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const METRIC: &str = "s0-aws-kinesis-clicks";

fn config() -> ScalerConfig {
  ScalerConfig::new()
    .with_metadata("streamName", "clicks")
    .with_metadata("awsRegion", "eu-west-1")
    .with_metadata("activationShardCount", "2")
    .with_auth_param("awsRoleArn", "arn:aws:iam::123456789012:role/keda")
}

fn scaler(client: &Arc<InMemoryKinesisClient>, config: &ScalerConfig) -> KinesisScaler {
  let client: Arc<dyn KinesisClient> = client.clone();
  KinesisScaler::new(config, move |_| Ok(client)).unwrap()
}

// ============================================================================
// Metric query
// ============================================================================

#[tokio::test]
async fn test_reports_open_shard_count() {
  let client = Arc::new(InMemoryKinesisClient::new());
  client.set_open_shard_count("clicks", 5);
  let scaler = scaler(&client, &config());

  let result = scaler
    .metrics_and_activity(&CancellationToken::new(), METRIC)
    .await
    .unwrap();
  assert_eq!(result.value.metric_name, METRIC);
  assert_eq!(result.value.milli_value, 5_000);
  assert!(result.is_active);
}

#[tokio::test]
async fn test_activation_is_strict() {
  let client = Arc::new(InMemoryKinesisClient::new());
  client.set_open_shard_count("clicks", 2);
  let scaler = scaler(&client, &config());
  let cancel = CancellationToken::new();

  let result = scaler.metrics_and_activity(&cancel, METRIC).await.unwrap();
  assert_eq!(result.value.milli_value, 2_000);
  assert!(!result.is_active);

  client.set_open_shard_count("clicks", 3);
  let result = scaler.metrics_and_activity(&cancel, METRIC).await.unwrap();
  assert!(result.is_active);
}

#[tokio::test]
async fn test_fetch_error_is_surfaced() {
  let client = Arc::new(InMemoryKinesisClient::new());
  client.set_open_shard_count("clicks", 4);
  client.set_failure(Some(StreamClientError::Unauthorized("expired".to_string())));
  let scaler = scaler(&client, &config());

  let err = scaler
    .metrics_and_activity(&CancellationToken::new(), METRIC)
    .await
    .unwrap_err();
  assert!(matches!(err, ScalerError::Fetch { .. }));
  assert!(err.to_string().contains("unable to describe kinesis stream"));

  client.set_failure(None);
  assert_eq!(scaler.open_shard_count().await.unwrap(), 4);
}

#[tokio::test]
async fn test_unknown_stream() {
  let client = Arc::new(InMemoryKinesisClient::new());
  let scaler = scaler(&client, &config());
  let err = scaler.open_shard_count().await.unwrap_err();
  assert!(matches!(err, ScalerError::Fetch { .. }));
}

#[tokio::test]
async fn test_cancellation() {
  let client = Arc::new(InMemoryKinesisClient::new().with_latency(Duration::from_secs(30)));
  client.set_open_shard_count("clicks", 1);
  let scaler = scaler(&client, &config());

  let cancel = CancellationToken::new();
  let canceller = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    canceller.cancel();
  });

  let err = tokio::time::timeout(
    Duration::from_secs(5),
    scaler.metrics_and_activity(&cancel, METRIC),
  )
  .await
  .expect("query should stop on cancellation")
  .unwrap_err();
  assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_cancellation_is_not_a_failed_query() {
  let client = Arc::new(InMemoryKinesisClient::new());
  client.set_open_shard_count("clicks", 1);
  let scaler = scaler(&client, &config());
  let cancel = CancellationToken::new();
  cancel.cancel();

  let err = scaler.metrics_and_activity(&cancel, METRIC).await.unwrap_err();
  assert!(err.is_cancelled());
  assert!(!crate::observability::record_query_error("aws_kinesis_stream", 0, &err));
}

// ============================================================================
// Descriptor and lifecycle
// ============================================================================

#[test]
fn test_metric_spec() {
  let client = Arc::new(InMemoryKinesisClient::new());
  let spec = scaler(&client, &config()).metric_spec();
  assert_eq!(spec.metric_name, METRIC);
  assert_eq!(spec.target, MetricTarget::AverageValue(2));

  let config = config()
    .with_metadata("streamName", "app/events.v1")
    .with_metadata("shardCount", "8")
    .with_metric_type(MetricTargetType::Value)
    .with_trigger_index(1);
  let spec = scaler(&client, &config).metric_spec();
  assert_eq!(spec.metric_name, "s1-aws-kinesis-app-events-v1");
  assert_eq!(spec.target, MetricTarget::Value(8));
}

#[test]
fn test_construction_errors() {
  let client = Arc::new(InMemoryKinesisClient::new());

  let utilization = config().with_metric_type(MetricTargetType::Utilization);
  let err = KinesisScaler::new(&utilization, |_| {
    let client: Arc<dyn KinesisClient> = client.clone();
    Ok(client)
  })
  .err()
  .unwrap();
  assert!(err.is_configuration());

  let err = KinesisScaler::new(&config_without_stream(), |_| {
    let client: Arc<dyn KinesisClient> = client.clone();
    Ok(client)
  })
  .err()
  .unwrap();
  assert!(err.to_string().contains("streamName"));

  let err = KinesisScaler::new(&config(), |_| {
    Err(ScalerError::config("no credentials"))
  })
  .err()
  .unwrap();
  assert!(err.is_configuration());
}

fn config_without_stream() -> ScalerConfig {
  ScalerConfig::new()
    .with_metadata("awsRegion", "eu-west-1")
    .with_auth_param("awsRoleArn", "arn")
}

#[tokio::test]
async fn test_close_releases_client() {
  let client = Arc::new(InMemoryKinesisClient::new());
  client.set_open_shard_count("clicks", 3);
  let scaler = scaler(&client, &config());
  let cancel = CancellationToken::new();

  scaler.close(&cancel).await.unwrap();
  assert!(client.is_closed());
  scaler.close(&cancel).await.unwrap();

  let err = scaler.metrics_and_activity(&cancel, METRIC).await.unwrap_err();
  assert!(matches!(err, ScalerError::Fetch { .. }));
}
