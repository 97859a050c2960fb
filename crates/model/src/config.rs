use crate::env::{
    DEFAULT_ENDPOINT_STATE_PATH, PUSH_AWS_REGION, PUSH_CUSTOM_USER_DATA,
    PUSH_ENDPOINT_STATE_PATH, PUSH_IDENTITY_POOL_ID, PUSH_PLATFORM_APPLICATION_ARN,
};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Settings needed to reach the push platform account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConfig {
    pub region: String,
    pub platform_application_arn: String,
    pub identity_pool_id: Option<String>,
    pub custom_user_data: Option<String>,
    pub endpoint_state_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingVariable(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(name) => {
                write!(f, "Missing {} environment variable", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl RegistrationConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Empty values are treated the same as unset ones
        let optional = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let required = |name: &'static str| optional(name).ok_or(ConfigError::MissingVariable(name));

        Ok(RegistrationConfig {
            region: required(PUSH_AWS_REGION)?,
            platform_application_arn: required(PUSH_PLATFORM_APPLICATION_ARN)?,
            identity_pool_id: optional(PUSH_IDENTITY_POOL_ID),
            custom_user_data: optional(PUSH_CUSTOM_USER_DATA),
            endpoint_state_path: optional(PUSH_ENDPOINT_STATE_PATH)
                .unwrap_or_else(|| DEFAULT_ENDPOINT_STATE_PATH.to_string())
                .into(),
        })
    }
}
