use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sns::config::http::HttpResponse;
use aws_sdk_sns::error::{DisplayErrorContext, SdkError};
use aws_sdk_sns::operation::create_platform_endpoint::{
    CreatePlatformEndpointError, CreatePlatformEndpointOutput,
};
use aws_sdk_sns::operation::get_endpoint_attributes::{
    GetEndpointAttributesError, GetEndpointAttributesOutput,
};
use aws_sdk_sns::operation::set_endpoint_attributes::SetEndpointAttributesError;
use aws_types::region::Region;
use model::config::RegistrationConfig;
use model::{DeviceToken, EndpointAttributes};
use platform::{PlatformError, PushPlatform};
use std::collections::HashMap;

mod credentials;

pub use credentials::CognitoCredentialsProvider;

/// Endpoint attribute names used by SNS.
pub const TOKEN_ATTRIBUTE: &str = "Token";
pub const ENABLED_ATTRIBUTE: &str = "Enabled";

/// Push platform backed by SNS mobile push endpoints.
#[derive(Clone, Debug)]
pub struct SnsPushPlatform {
    sns: aws_sdk_sns::Client,
    platform_application_arn: String,
    custom_user_data: Option<String>,
}

impl SnsPushPlatform {
    pub fn new(sns: aws_sdk_sns::Client, platform_application_arn: impl Into<String>) -> Self {
        SnsPushPlatform {
            sns,
            platform_application_arn: platform_application_arn.into(),
            custom_user_data: None,
        }
    }

    /// User data attached to every endpoint this platform creates.
    pub fn with_custom_user_data(mut self, custom_user_data: Option<String>) -> Self {
        self.custom_user_data = custom_user_data;
        self
    }

    /// Build a client for the configured region.
    /// Credentials come from Cognito when an identity pool is set, otherwise the default chain.
    pub async fn from_config(config: &RegistrationConfig) -> Self {
        let region: Region = Region::new(config.region.clone());
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region.clone());

        if let Some(identity_pool_id) = &config.identity_pool_id {
            tracing::debug!(%identity_pool_id, "Using Cognito identity pool credentials");

            loader = loader.credentials_provider(CognitoCredentialsProvider::new(
                region,
                identity_pool_id.clone(),
            ));
        }

        let sns: aws_sdk_sns::Client = aws_sdk_sns::Client::new(&loader.load().await);

        SnsPushPlatform::new(sns, config.platform_application_arn.clone())
            .with_custom_user_data(config.custom_user_data.clone())
    }
}

#[async_trait]
impl PushPlatform for SnsPushPlatform {
    async fn create_endpoint(&self, token: &DeviceToken) -> Result<String, PlatformError> {
        tracing::debug!(
            platform_application_arn = %self.platform_application_arn,
            "Creating platform endpoint"
        );

        let output: CreatePlatformEndpointOutput = self
            .sns
            .create_platform_endpoint()
            .platform_application_arn(&self.platform_application_arn)
            .token(token.as_str())
            .set_custom_user_data(self.custom_user_data.clone())
            .send()
            .await
            .map_err(|err| classify(err, create_endpoint_error))?;

        output
            .endpoint_arn()
            .map(str::to_string)
            .ok_or_else(|| PlatformError::Transient("Response had no endpoint ARN".to_string()))
    }

    async fn get_endpoint_attributes(
        &self,
        endpoint_arn: &str,
    ) -> Result<EndpointAttributes, PlatformError> {
        tracing::debug!(endpoint_arn, "Getting endpoint attributes");

        let output: GetEndpointAttributesOutput = self
            .sns
            .get_endpoint_attributes()
            .endpoint_arn(endpoint_arn)
            .send()
            .await
            .map_err(|err| classify(err, get_attributes_error))?;

        Ok(attributes_from_sns(
            output.attributes().cloned().unwrap_or_default(),
        ))
    }

    async fn set_endpoint_attributes(
        &self,
        endpoint_arn: &str,
        attributes: &EndpointAttributes,
    ) -> Result<(), PlatformError> {
        tracing::debug!(endpoint_arn, "Setting endpoint attributes");

        self.sns
            .set_endpoint_attributes()
            .endpoint_arn(endpoint_arn)
            .set_attributes(Some(attributes_to_sns(attributes)))
            .send()
            .await
            .map_err(|err| classify(err, set_attributes_error))?;

        Ok(())
    }
}

fn attributes_from_sns(mut attributes: HashMap<String, String>) -> EndpointAttributes {
    // A missing token never matches, so the endpoint gets rewritten
    let token: String = attributes.remove(TOKEN_ATTRIBUTE).unwrap_or_default();
    let enabled: bool = attributes
        .remove(ENABLED_ATTRIBUTE)
        .is_some_and(|value| value.eq_ignore_ascii_case("true"));

    EndpointAttributes {
        token,
        enabled,
        extra: attributes.into_iter().collect(),
    }
}

fn attributes_to_sns(attributes: &EndpointAttributes) -> HashMap<String, String> {
    let mut merged: HashMap<String, String> = attributes.extra.clone().into_iter().collect();

    merged.insert(TOKEN_ATTRIBUTE.to_string(), attributes.token.clone());
    merged.insert(ENABLED_ATTRIBUTE.to_string(), attributes.enabled.to_string());

    merged
}

/// Split SDK failures into service errors, which each operation classifies,
/// and transport failures, which are always transient.
fn classify<E>(
    err: SdkError<E, HttpResponse>,
    service_error: impl FnOnce(E) -> PlatformError,
) -> PlatformError
where
    E: std::error::Error + Send + Sync + 'static,
{
    match err {
        SdkError::ServiceError(context) => service_error(context.into_err()),
        err @ SdkError::ConstructionFailure(_) => {
            PlatformError::Invalid(DisplayErrorContext(&err).to_string())
        }
        err => PlatformError::Transient(DisplayErrorContext(&err).to_string()),
    }
}

fn create_endpoint_error(err: CreatePlatformEndpointError) -> PlatformError {
    let detail: String = err.to_string();

    match err {
        // The platform application is missing, retrying won't help
        CreatePlatformEndpointError::NotFoundException(_)
        | CreatePlatformEndpointError::InvalidParameterException(_)
        | CreatePlatformEndpointError::AuthorizationErrorException(_) => {
            PlatformError::Invalid(detail)
        }
        _ => PlatformError::Transient(detail),
    }
}

fn get_attributes_error(err: GetEndpointAttributesError) -> PlatformError {
    let detail: String = err.to_string();

    match err {
        GetEndpointAttributesError::NotFoundException(_) => PlatformError::NotFound(detail),
        GetEndpointAttributesError::InvalidParameterException(_)
        | GetEndpointAttributesError::AuthorizationErrorException(_) => {
            PlatformError::Invalid(detail)
        }
        _ => PlatformError::Transient(detail),
    }
}

fn set_attributes_error(err: SetEndpointAttributesError) -> PlatformError {
    let detail: String = err.to_string();

    match err {
        SetEndpointAttributesError::NotFoundException(_) => PlatformError::NotFound(detail),
        SetEndpointAttributesError::InvalidParameterException(_)
        | SetEndpointAttributesError::AuthorizationErrorException(_) => {
            PlatformError::Invalid(detail)
        }
        _ => PlatformError::Transient(detail),
    }
}
