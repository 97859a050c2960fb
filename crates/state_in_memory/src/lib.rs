use async_trait::async_trait;
use model::EndpointRecord;
use state::{EndpointStore, StateError, StateOperation};
use std::sync::{Arc, Mutex, MutexGuard};

const STATE_KEY: &str = "in_memory";

/// Endpoint store which lives as long as the process, for tests and ephemeral use.
#[derive(Clone, Default)]
pub struct InMemoryEndpointStore {
    record: Arc<Mutex<Option<EndpointRecord>>>,
}

impl InMemoryEndpointStore {
    /// A store already holding `record`.
    pub fn with_record(record: EndpointRecord) -> Self {
        InMemoryEndpointStore {
            record: Arc::new(Mutex::new(Some(record))),
        }
    }

    fn lock(
        &self,
        operation: StateOperation,
    ) -> Result<MutexGuard<'_, Option<EndpointRecord>>, StateError> {
        self.record
            .lock()
            .map_err(|err| StateError::backend(STATE_KEY, operation, err.to_string()))
    }
}

#[async_trait]
impl EndpointStore for InMemoryEndpointStore {
    async fn get(&self) -> Result<Option<EndpointRecord>, StateError> {
        Ok(self.lock(StateOperation::Get)?.clone())
    }

    async fn set(&self, record: EndpointRecord) -> Result<(), StateError> {
        *self.lock(StateOperation::Set)? = Some(record);

        Ok(())
    }

    async fn clear(&self) -> Result<(), StateError> {
        self.lock(StateOperation::Clear)?.take();

        Ok(())
    }
}
