use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub mod config;
pub mod env;
pub mod token;

pub use token::{DeviceToken, TokenError};

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// The locally known registration of this installation with the push platform.
/// At most one of these exists per installation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EndpointRecord {
    pub endpoint_arn: String,
    // Last token known to be registered remotely
    pub token: String,
    pub enabled: bool,
}

impl EndpointRecord {
    /// A record for an endpoint which is confirmed enabled with `token`.
    pub fn enabled(endpoint_arn: impl Into<String>, token: &DeviceToken) -> Self {
        EndpointRecord {
            endpoint_arn: endpoint_arn.into(),
            token: token.as_str().to_string(),
            enabled: true,
        }
    }
}

/// Attributes of a remote endpoint.
///
/// Anything other than the token and enabled flag is carried in `extra` so that
/// updates can write it back untouched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct EndpointAttributes {
    pub token: String,
    pub enabled: bool,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl EndpointAttributes {
    /// True when the remote endpoint already delivers to `token`.
    pub fn matches(&self, token: &DeviceToken) -> bool {
        self.enabled && self.token == token.as_str()
    }

    /// Copy of these attributes pointing at `token` and enabled.
    pub fn converged(&self, token: &DeviceToken) -> Self {
        EndpointAttributes {
            token: token.as_str().to_string(),
            enabled: true,
            extra: self.extra.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // The remote endpoint no longer exists
    NotFound,
    // Network or service fault, may succeed on a later trigger
    Transient,
    // Malformed or unauthorized request
    Invalid,
    LocalStoreCorrupt,
    // The endpoint store could not be read or written
    LocalStoreUnavailable,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name: &str = match self {
            ErrorKind::NotFound => "endpoint not found",
            ErrorKind::Transient => "transient failure",
            ErrorKind::Invalid => "invalid request",
            ErrorKind::LocalStoreCorrupt => "local store corrupt",
            ErrorKind::LocalStoreUnavailable => "local store unavailable",
        };

        f.write_str(name)
    }
}

/// Result of a single reconciliation run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered(String),
    Updated(String),
    Unchanged(String),
    Failed { kind: ErrorKind, detail: String },
}

impl RegistrationOutcome {
    pub fn failed(kind: ErrorKind, detail: impl Into<String>) -> Self {
        RegistrationOutcome::Failed {
            kind,
            detail: detail.into(),
        }
    }

    pub fn endpoint_arn(&self) -> Option<&str> {
        match self {
            RegistrationOutcome::Registered(arn)
            | RegistrationOutcome::Updated(arn)
            | RegistrationOutcome::Unchanged(arn) => Some(arn),
            RegistrationOutcome::Failed { .. } => None,
        }
    }
}

/// Whether push notifications are currently enabled for this installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationStatus {
    Enabled,
    #[default]
    Disabled,
}
