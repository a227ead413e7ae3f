use crate::checkpoint::{AZURE_FUNCTION_CONTAINER, Blob, CheckpointLocation, CheckpointStrategy};
use crate::error::CheckpointError;
use crate::lag::Checkpoint;

fn location(strategy: CheckpointStrategy, container: &str) -> CheckpointLocation {
  CheckpointLocation {
    strategy,
    container: container.to_string(),
    namespace_host: "orders.servicebus.windows.net".to_string(),
    event_hub_name: "orders".to_string(),
    consumer_group: "$Default".to_string(),
  }
}

#[test]
fn test_strategy_from_str() {
  assert_eq!("".parse::<CheckpointStrategy>().unwrap(), CheckpointStrategy::Default);
  assert_eq!(
    "azureFunction".parse::<CheckpointStrategy>().unwrap(),
    CheckpointStrategy::AzureFunction
  );
  assert_eq!(
    "blobmetadata".parse::<CheckpointStrategy>().unwrap(),
    CheckpointStrategy::BlobMetadata
  );
  assert_eq!("goSdk".parse::<CheckpointStrategy>().unwrap(), CheckpointStrategy::GoSdk);
  assert!("dapr2".parse::<CheckpointStrategy>().unwrap_err().is_configuration());
}

#[test]
fn test_azure_function_layout() {
  let loc = location(CheckpointStrategy::AzureFunction, "ignored");
  assert_eq!(loc.container(), AZURE_FUNCTION_CONTAINER);
  assert_eq!(
    loc.blob_path("3"),
    "orders.servicebus.windows.net/orders/$default/3"
  );
}

#[test]
fn test_default_without_container_uses_function_layout() {
  let loc = location(CheckpointStrategy::Default, "");
  assert_eq!(loc.container(), AZURE_FUNCTION_CONTAINER);
  assert_eq!(
    loc.blob_path("0"),
    "orders.servicebus.windows.net/orders/$default/0"
  );
}

#[test]
fn test_default_with_container() {
  let loc = location(CheckpointStrategy::Default, "checkpoints");
  assert_eq!(loc.container(), "checkpoints");
  assert_eq!(loc.blob_path("0"), "$Default/0");
}

#[test]
fn test_blob_metadata_layout() {
  let loc = location(CheckpointStrategy::BlobMetadata, "checkpoints");
  assert_eq!(
    loc.blob_path("1"),
    "orders.servicebus.windows.net/orders/$default/checkpoint/1"
  );
}

#[test]
fn test_go_sdk_layout() {
  let loc = location(CheckpointStrategy::GoSdk, "checkpoints");
  assert_eq!(loc.container(), "checkpoints");
  assert_eq!(loc.blob_path("7"), "7");
}

#[test]
fn test_validate_requires_container() {
  assert!(location(CheckpointStrategy::GoSdk, "").validate().is_err());
  assert!(location(CheckpointStrategy::BlobMetadata, "").validate().is_err());
  assert!(location(CheckpointStrategy::Default, "").validate().is_ok());
  assert!(location(CheckpointStrategy::AzureFunction, "").validate().is_ok());
}

#[test]
fn test_decode_function_json() {
  let blob = Blob::from_body(r#"{"Offset":"4096","SequenceNumber":77,"PartitionId":"0"}"#);
  assert_eq!(
    CheckpointStrategy::AzureFunction.decode(&blob).unwrap(),
    Checkpoint::new("4096", 77)
  );
}

#[test]
fn test_decode_function_json_null_offset() {
  let blob = Blob::from_body(r#"{"Offset":null,"SequenceNumber":0}"#);
  let checkpoint = CheckpointStrategy::Default.decode(&blob).unwrap();
  assert!(!checkpoint.is_committed());
}

#[test]
fn test_decode_empty_body() {
  let blob = Blob::from_body("  ");
  assert_eq!(CheckpointStrategy::GoSdk.decode(&blob).unwrap(), Checkpoint::none());
}

#[test]
fn test_decode_go_sdk() {
  let blob = Blob::from_body(r#"{"checkpoint":{"offset":"12","sequenceNumber":3}}"#);
  assert_eq!(
    CheckpointStrategy::GoSdk.decode(&blob).unwrap(),
    Checkpoint::new("12", 3)
  );
}

#[test]
fn test_decode_blob_metadata() {
  let blob = Blob::default()
    .with_metadata("Offset", "900")
    .with_metadata("sequencenumber", "41");
  assert_eq!(
    CheckpointStrategy::BlobMetadata.decode(&blob).unwrap(),
    Checkpoint::new("900", 41)
  );
}

#[test]
fn test_decode_malformed() {
  let err = CheckpointStrategy::GoSdk
    .decode(&Blob::from_body("{not json"))
    .unwrap_err();
  assert!(matches!(err, CheckpointError::Malformed(_)));
  assert!(!err.is_not_found());

  let err = CheckpointStrategy::BlobMetadata
    .decode(&Blob::default().with_metadata("sequencenumber", "x"))
    .unwrap_err();
  assert!(matches!(err, CheckpointError::Malformed(_)));
}
