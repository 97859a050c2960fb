use async_trait::async_trait;
use aws_sdk_sns::operation::create_platform_endpoint::CreatePlatformEndpointOutput;
use aws_sdk_sns::operation::get_endpoint_attributes::GetEndpointAttributesOutput;
use aws_sdk_sns::operation::set_endpoint_attributes::SetEndpointAttributesOutput;
use aws_smithy_mocks::{mock, mock_client, Rule, RuleMode};
use model::{DeviceToken, EndpointRecord};
use presenter::{NotificationPayload, NotificationPresenter};
use state::{EndpointStore, StateError, StateOperation};
use state_in_memory::InMemoryEndpointStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

mod fake_platform;

pub use fake_platform::{FakePushPlatform, PlatformCall, PlatformOperation};

pub const TEST_APPLICATION_ARN: &str = "arn:aws:sns:eu-west-1:123456789012:app/APNS_SANDBOX/test";
pub const TEST_ENDPOINT_ARN: &str =
    "arn:aws:sns:eu-west-1:123456789012:endpoint/APNS_SANDBOX/test/1";

pub fn token(value: &str) -> DeviceToken {
    DeviceToken::new(value).expect("Test tokens are not empty")
}

pub fn enabled_record(endpoint_arn: &str, token: &str) -> EndpointRecord {
    EndpointRecord {
        endpoint_arn: endpoint_arn.to_string(),
        token: token.to_string(),
        enabled: true,
    }
}

/// Something shown by a `RecordingPresenter`.
#[derive(Debug, Clone, PartialEq)]
pub enum Presented {
    Notification(NotificationPayload),
    Alert(String),
    Error(String),
}

/// Presenter which keeps everything it was asked to show.
#[derive(Default)]
pub struct RecordingPresenter {
    presented: Mutex<Vec<Presented>>,
}

impl RecordingPresenter {
    pub fn presented(&self) -> Vec<Presented> {
        self.presented.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.presented()
            .into_iter()
            .filter_map(|presented| match presented {
                Presented::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl NotificationPresenter for RecordingPresenter {
    fn present_notification(&self, payload: &NotificationPayload) {
        self.presented
            .lock()
            .unwrap()
            .push(Presented::Notification(payload.clone()));
    }

    fn present_alert(&self, message: &str) {
        self.presented
            .lock()
            .unwrap()
            .push(Presented::Alert(message.to_string()));
    }

    fn present_error(&self, message: &str) {
        self.presented
            .lock()
            .unwrap()
            .push(Presented::Error(message.to_string()));
    }
}

/// In-memory endpoint store whose reads and writes can be made to fail.
#[derive(Clone, Default)]
pub struct FaultyEndpointStore {
    pub inner: InMemoryEndpointStore,
    corrupt_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl FaultyEndpointStore {
    pub fn with_record(record: EndpointRecord) -> Self {
        FaultyEndpointStore {
            inner: InMemoryEndpointStore::with_record(record),
            ..Default::default()
        }
    }

    pub fn corrupt_reads(&self, corrupt: bool) {
        self.corrupt_reads.store(corrupt, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set` calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EndpointStore for FaultyEndpointStore {
    async fn get(&self) -> Result<Option<EndpointRecord>, StateError> {
        if self.corrupt_reads.load(Ordering::SeqCst) {
            return Err(StateError::corrupt("faulty", "unexpected end of input"));
        }

        self.inner.get().await
    }

    async fn set(&self, record: EndpointRecord) -> Result<(), StateError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StateError::backend("faulty", StateOperation::Set, "disk full"));
        }

        self.inner.set(record).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }

    async fn clear(&self) -> Result<(), StateError> {
        self.inner.clear().await
    }
}

/// A mock SNS client with the rules backing it, so call counts can be checked.
pub struct MockSns {
    pub client: aws_sdk_sns::Client,
    pub create_rule: Rule,
    pub get_rule: Rule,
    pub set_rule: Rule,
}

/// A mock SNS client where endpoints are created as `endpoint_arn` and
/// report `remote_token` as their enabled token.
pub fn create_mock_sns(endpoint_arn: &str, remote_token: &str) -> MockSns {
    let created_arn: String = endpoint_arn.to_string();
    let create_rule: Rule = mock!(aws_sdk_sns::Client::create_platform_endpoint)
        .match_requests(|_| true)
        .sequence()
        .output(move || {
            CreatePlatformEndpointOutput::builder()
                .endpoint_arn(created_arn.clone())
                .build()
        })
        .repeatedly()
        .build();

    let remote_token: String = remote_token.to_string();
    let get_rule: Rule = mock!(aws_sdk_sns::Client::get_endpoint_attributes)
        .match_requests(|_| true)
        .sequence()
        .output(move || {
            GetEndpointAttributesOutput::builder()
                .attributes("Token", remote_token.clone())
                .attributes("Enabled", "true")
                .build()
        })
        .repeatedly()
        .build();

    let set_rule: Rule = mock!(aws_sdk_sns::Client::set_endpoint_attributes)
        .match_requests(|_| true)
        .sequence()
        .output(|| SetEndpointAttributesOutput::builder().build())
        .repeatedly()
        .build();

    let client: aws_sdk_sns::Client = mock_client!(
        aws_sdk_sns,
        RuleMode::MatchAny,
        [&create_rule, &get_rule, &set_rule]
    );

    MockSns {
        client,
        create_rule,
        get_rule,
        set_rule,
    }
}
