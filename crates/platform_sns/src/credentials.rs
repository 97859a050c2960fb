use aws_config::BehaviorVersion;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{self, future, ProvideCredentials};
use aws_credential_types::Credentials;
use aws_sdk_cognitoidentity::operation::get_credentials_for_identity::GetCredentialsForIdentityOutput;
use aws_sdk_cognitoidentity::operation::get_id::GetIdOutput;
use aws_types::region::Region;
use std::time::SystemTime;

const PROVIDER_NAME: &str = "CognitoIdentity";

/// Credentials for an unauthenticated identity from a Cognito identity pool.
#[derive(Debug, Clone)]
pub struct CognitoCredentialsProvider {
    cognito: aws_sdk_cognitoidentity::Client,
    identity_pool_id: String,
}

impl CognitoCredentialsProvider {
    pub fn new(region: Region, identity_pool_id: impl Into<String>) -> Self {
        // GetId and GetCredentialsForIdentity don't require signed requests
        let config: aws_sdk_cognitoidentity::Config = aws_sdk_cognitoidentity::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .build();

        Self::with_client(
            aws_sdk_cognitoidentity::Client::from_conf(config),
            identity_pool_id,
        )
    }

    pub fn with_client(
        cognito: aws_sdk_cognitoidentity::Client,
        identity_pool_id: impl Into<String>,
    ) -> Self {
        CognitoCredentialsProvider {
            cognito,
            identity_pool_id: identity_pool_id.into(),
        }
    }

    async fn load_credentials(&self) -> provider::Result {
        let identity: GetIdOutput = self
            .cognito
            .get_id()
            .identity_pool_id(&self.identity_pool_id)
            .send()
            .await
            .map_err(CredentialsError::provider_error)?;

        let identity_id: &str = identity
            .identity_id()
            .ok_or_else(|| CredentialsError::not_loaded("Cognito returned no identity id"))?;

        tracing::debug!(identity_id, "Fetching credentials for Cognito identity");

        let output: GetCredentialsForIdentityOutput = self
            .cognito
            .get_credentials_for_identity()
            .identity_id(identity_id)
            .send()
            .await
            .map_err(CredentialsError::provider_error)?;

        let credentials = output
            .credentials()
            .ok_or_else(|| CredentialsError::not_loaded("Cognito returned no credentials"))?;

        let access_key_id: &str = credentials
            .access_key_id()
            .ok_or_else(|| CredentialsError::invalid_configuration("Missing access key id"))?;
        let secret_key: &str = credentials
            .secret_key()
            .ok_or_else(|| CredentialsError::invalid_configuration("Missing secret key"))?;
        let expiry: Option<SystemTime> = credentials
            .expiration()
            .and_then(|expiration| SystemTime::try_from(*expiration).ok());

        Ok(Credentials::new(
            access_key_id,
            secret_key,
            credentials.session_token().map(str::to_string),
            expiry,
            PROVIDER_NAME,
        ))
    }
}

impl ProvideCredentials for CognitoCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.load_credentials())
    }
}
