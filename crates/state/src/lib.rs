use async_trait::async_trait;
use model::{EndpointRecord, Error};
use std::fmt::{Debug, Display, Formatter};

/// Holds the single endpoint record of this installation.
///
/// Writes replace the record atomically, a partially written record is never
/// observable through `get`.
#[async_trait]
pub trait EndpointStore: Send + Sync {
    async fn get(&self) -> Result<Option<EndpointRecord>, StateError>;
    async fn set(&self, record: EndpointRecord) -> Result<(), StateError>;
    async fn clear(&self) -> Result<(), StateError>;
}

/// Errors arising from reading or writing state.
#[derive(Debug)]
pub struct StateError {
    pub state_key: String,

    pub operation: StateOperation,
    pub reason: StateErrorReason,
}

#[derive(Debug)]
pub enum StateErrorReason {
    // The stored record could not be decoded
    Corrupt(String),
    // An error from the underlying state store
    BackendFailure(Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOperation {
    Get,
    Set,
    Clear,
}

impl StateError {
    pub fn new(
        state_key: impl Into<String>,
        operation: StateOperation,
        reason: StateErrorReason,
    ) -> Self {
        StateError {
            state_key: state_key.into(),
            operation,
            reason,
        }
    }

    pub fn corrupt(state_key: impl Into<String>, detail: impl Display) -> Self {
        Self::new(
            state_key,
            StateOperation::Get,
            StateErrorReason::Corrupt(detail.to_string()),
        )
    }

    pub fn backend(
        state_key: impl Into<String>,
        operation: StateOperation,
        err: impl Into<Error>,
    ) -> Self {
        Self::new(state_key, operation, StateErrorReason::BackendFailure(err.into()))
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self.reason, StateErrorReason::Corrupt(_))
    }
}

impl Display for StateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            StateErrorReason::Corrupt(detail) => write!(
                f,
                "{:?} of {} failed, record is corrupt: {}",
                self.operation, self.state_key, detail
            ),
            StateErrorReason::BackendFailure(err) => write!(
                f,
                "{:?} of {} failed: {}",
                self.operation, self.state_key, err
            ),
        }
    }
}

impl std::error::Error for StateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.reason {
            StateErrorReason::Corrupt(_) => None,
            StateErrorReason::BackendFailure(err) => Some(&**err),
        }
    }
}
