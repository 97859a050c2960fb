use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque identifier issued by the OS push service for this installation.
/// A new token replaces the old one wholesale.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct DeviceToken(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Empty,
}

impl Display for TokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("device token is empty")
    }
}

impl std::error::Error for TokenError {}

impl DeviceToken {
    pub fn new(token: impl Into<String>) -> Result<Self, TokenError> {
        let token: String = token.into();

        if token.is_empty() {
            return Err(TokenError::Empty);
        }

        Ok(DeviceToken(token))
    }

    /// Token from the raw bytes handed over by the OS, rendered as lowercase hex.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TokenError> {
        let token: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();

        Self::new(token)
    }

    /// Token from its printed description, e.g. `<740f4707 bebcf74f>`.
    pub fn from_description(description: &str) -> Result<Self, TokenError> {
        let token: String = description
            .trim_matches(|c| c == '<' || c == '>')
            .chars()
            .filter(|c| *c != ' ')
            .collect();

        Self::new(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DeviceToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
