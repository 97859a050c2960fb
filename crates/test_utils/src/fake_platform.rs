use async_trait::async_trait;
use model::{DeviceToken, EndpointAttributes};
use platform::{PlatformError, PushPlatform};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformOperation {
    Create,
    Get,
    Set,
}

/// A call received by the fake platform, recorded whether or not it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Create { token: String },
    Get { endpoint_arn: String },
    Set {
        endpoint_arn: String,
        attributes: EndpointAttributes,
    },
}

impl PlatformCall {
    pub fn operation(&self) -> PlatformOperation {
        match self {
            PlatformCall::Create { .. } => PlatformOperation::Create,
            PlatformCall::Get { .. } => PlatformOperation::Get,
            PlatformCall::Set { .. } => PlatformOperation::Set,
        }
    }
}

#[derive(Default)]
struct FakeState {
    endpoints: HashMap<String, EndpointAttributes>,
    calls: Vec<PlatformCall>,
    failures: HashMap<PlatformOperation, VecDeque<PlatformError>>,
    gate: Option<Arc<Notify>>,
    next_endpoint: usize,
}

/// In-memory push platform which behaves like SNS.
/// Creating an endpoint for a token which is already registered returns the existing endpoint.
#[derive(Default)]
pub struct FakePushPlatform {
    state: Mutex<FakeState>,
}

impl FakePushPlatform {
    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn insert_endpoint(&self, endpoint_arn: &str, attributes: EndpointAttributes) {
        self.lock()
            .endpoints
            .insert(endpoint_arn.to_string(), attributes);
    }

    /// Remove an endpoint, as the platform does when a token is rejected by the OS push service.
    pub fn delete_endpoint(&self, endpoint_arn: &str) {
        self.lock().endpoints.remove(endpoint_arn);
    }

    pub fn attributes(&self, endpoint_arn: &str) -> Option<EndpointAttributes> {
        self.lock().endpoints.get(endpoint_arn).cloned()
    }

    pub fn endpoint_count(&self) -> usize {
        self.lock().endpoints.len()
    }

    /// Fail the next call of `operation` with `err`. Queued failures are used in order.
    pub fn fail_next(&self, operation: PlatformOperation, err: PlatformError) {
        self.lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(err);
    }

    /// Block the next call until the returned `Notify` is notified.
    pub fn hold_next_call(&self) -> Arc<Notify> {
        let gate: Arc<Notify> = Arc::new(Notify::new());
        self.lock().gate = Some(gate.clone());

        gate
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, operation: PlatformOperation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Calls which could change remote state.
    pub fn writes(&self) -> usize {
        self.count(PlatformOperation::Create) + self.count(PlatformOperation::Set)
    }

    async fn enter(&self, call: PlatformCall) -> Result<(), PlatformError> {
        let operation: PlatformOperation = call.operation();

        let (gate, failure) = {
            let mut state = self.lock();
            state.calls.push(call);

            let failure: Option<PlatformError> = state
                .failures
                .get_mut(&operation)
                .and_then(VecDeque::pop_front);

            (state.gate.take(), failure)
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PushPlatform for FakePushPlatform {
    async fn create_endpoint(&self, token: &DeviceToken) -> Result<String, PlatformError> {
        self.enter(PlatformCall::Create {
            token: token.to_string(),
        })
        .await?;

        let mut state = self.lock();

        let existing: Option<String> = state
            .endpoints
            .iter()
            .find(|(_, attributes)| attributes.token == token.as_str())
            .map(|(endpoint_arn, _)| endpoint_arn.clone());

        if let Some(endpoint_arn) = existing {
            return Ok(endpoint_arn);
        }

        state.next_endpoint += 1;
        let endpoint_arn: String = format!("arn:fake:endpoint/{}", state.next_endpoint);

        state.endpoints.insert(
            endpoint_arn.clone(),
            EndpointAttributes {
                token: token.to_string(),
                enabled: true,
                extra: Default::default(),
            },
        );

        Ok(endpoint_arn)
    }

    async fn get_endpoint_attributes(
        &self,
        endpoint_arn: &str,
    ) -> Result<EndpointAttributes, PlatformError> {
        self.enter(PlatformCall::Get {
            endpoint_arn: endpoint_arn.to_string(),
        })
        .await?;

        self.attributes(endpoint_arn)
            .ok_or_else(|| PlatformError::NotFound(format!("No endpoint {endpoint_arn}")))
    }

    async fn set_endpoint_attributes(
        &self,
        endpoint_arn: &str,
        attributes: &EndpointAttributes,
    ) -> Result<(), PlatformError> {
        self.enter(PlatformCall::Set {
            endpoint_arn: endpoint_arn.to_string(),
            attributes: attributes.clone(),
        })
        .await?;

        let mut state = self.lock();
        let stored: &mut EndpointAttributes = state
            .endpoints
            .get_mut(endpoint_arn)
            .ok_or_else(|| PlatformError::NotFound(format!("No endpoint {endpoint_arn}")))?;

        stored.token = attributes.token.clone();
        stored.enabled = attributes.enabled;
        stored.extra.extend(attributes.extra.clone());

        Ok(())
    }
}
