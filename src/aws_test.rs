use crate::aws::AwsAuthorization;
use crate::config::{PodIdentityProvider, ScalerConfig};

#[test]
fn test_pod_identity_wins() {
  let config = ScalerConfig::new()
    .with_pod_identity(PodIdentityProvider::AwsEks)
    .with_auth_param("awsRoleArn", "arn:aws:iam::1:role/r");
  assert_eq!(
    AwsAuthorization::from_config(&config).unwrap(),
    AwsAuthorization::PodIdentity
  );
}

#[test]
fn test_operator_identity() {
  let config = ScalerConfig::new().with_metadata("identityOwner", "operator");
  assert_eq!(
    AwsAuthorization::from_config(&config).unwrap(),
    AwsAuthorization::OperatorIdentity
  );
}

#[test]
fn test_role_arn() {
  let config = ScalerConfig::new().with_auth_param("awsRoleArn", "arn:aws:iam::1:role/r");
  assert_eq!(
    AwsAuthorization::from_config(&config).unwrap(),
    AwsAuthorization::AssumeRole {
      role_arn: "arn:aws:iam::1:role/r".to_string()
    }
  );
}

#[test]
fn test_access_keys_with_session_token() {
  let config = ScalerConfig::new()
    .with_auth_param("awsAccessKeyID", "AKIA")
    .with_auth_param("awsSecretAccessKey", "secret")
    .with_auth_param("awsSessionToken", "token");
  let auth = AwsAuthorization::from_config(&config).unwrap();
  assert_eq!(
    auth,
    AwsAuthorization::AccessKeys {
      access_key_id: "AKIA".to_string(),
      secret_access_key: "secret".to_string(),
      session_token: Some("token".to_string()),
    }
  );
  assert!(!format!("{auth:?}").contains("secret"));
}

#[test]
fn test_access_keys_from_env() {
  let config = ScalerConfig::new()
    .with_metadata("awsAccessKeyIDFromEnv", "AWS_KEY")
    .with_metadata("awsSecretAccessKeyFromEnv", "AWS_SECRET")
    .with_env("AWS_KEY", "AKIA")
    .with_env("AWS_SECRET", "s");
  assert!(matches!(
    AwsAuthorization::from_config(&config).unwrap(),
    AwsAuthorization::AccessKeys { .. }
  ));
}

#[test]
fn test_missing_credentials() {
  let err = AwsAuthorization::from_config(&ScalerConfig::new()).unwrap_err();
  assert!(err.to_string().contains("awsAccessKeyID"));

  let err = AwsAuthorization::from_config(
    &ScalerConfig::new().with_auth_param("awsAccessKeyID", "AKIA"),
  )
  .unwrap_err();
  assert!(err.to_string().contains("awsSecretAccessKey"));
}
