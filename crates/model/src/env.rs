/// Region of the push platform account
pub const PUSH_AWS_REGION: &str = "PUSH_AWS_REGION";
/// Platform application endpoints are registered against
pub const PUSH_PLATFORM_APPLICATION_ARN: &str = "PUSH_SNS_PLATFORM_APPLICATION_ARN";
/// Optional Cognito identity pool used to obtain credentials
pub const PUSH_IDENTITY_POOL_ID: &str = "PUSH_COGNITO_IDENTITY_POOL_ID";
/// Optional user data attached to newly created endpoints
pub const PUSH_CUSTOM_USER_DATA: &str = "PUSH_SNS_CUSTOM_USER_DATA";
/// Location of the persisted endpoint record
pub const PUSH_ENDPOINT_STATE_PATH: &str = "PUSH_ENDPOINT_STATE_PATH";

pub const DEFAULT_ENDPOINT_STATE_PATH: &str = "endpoint.json";

/// Device token handed to the `register_device` demo
pub const PUSH_DEVICE_TOKEN: &str = "PUSH_DEVICE_TOKEN";
