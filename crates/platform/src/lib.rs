use async_trait::async_trait;
use model::{DeviceToken, EndpointAttributes, ErrorKind};
use std::fmt::{Display, Formatter};

/// Remote push-delivery platform holding one endpoint per device.
///
/// Implementations are a pure I/O boundary and never touch local state.
#[async_trait]
pub trait PushPlatform: Send + Sync {
    /// Register `token` with the platform application, returning the new endpoint ARN.
    async fn create_endpoint(&self, token: &DeviceToken) -> Result<String, PlatformError>;

    async fn get_endpoint_attributes(
        &self,
        endpoint_arn: &str,
    ) -> Result<EndpointAttributes, PlatformError>;

    /// Write `attributes` to the endpoint. Attributes not present are left as they are.
    async fn set_endpoint_attributes(
        &self,
        endpoint_arn: &str,
        attributes: &EndpointAttributes,
    ) -> Result<(), PlatformError>;
}

/// Errors returned from the push platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    // The endpoint no longer exists remotely
    NotFound(String),
    // Network or service fault, worth retrying later
    Transient(String),
    // Malformed or unauthorized request, never retried
    Invalid(String),
}

impl PlatformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlatformError::NotFound(_) => ErrorKind::NotFound,
            PlatformError::Transient(_) => ErrorKind::Transient,
            PlatformError::Invalid(_) => ErrorKind::Invalid,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            PlatformError::NotFound(detail)
            | PlatformError::Transient(detail)
            | PlatformError::Invalid(detail) => detail,
        }
    }
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.detail())
    }
}

impl std::error::Error for PlatformError {}
