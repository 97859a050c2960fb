use model::{EndpointRecord, RegistrationOutcome, RegistrationStatus};
use platform_sns::SnsPushPlatform;
use registration::{Reconciler, RegistrationOrchestrator, TriggerResult};
use state::EndpointStore;
use state_file::FileEndpointStore;
use std::path::PathBuf;
use std::sync::Arc;
use test_utils::{
    create_mock_sns, enabled_record, token, MockSns, RecordingPresenter, TEST_APPLICATION_ARN,
    TEST_ENDPOINT_ARN,
};

fn orchestrator(mock: &MockSns, path: PathBuf) -> RegistrationOrchestrator {
    let platform: SnsPushPlatform = SnsPushPlatform::new(mock.client.clone(), TEST_APPLICATION_ARN);
    let reconciler: Reconciler =
        Reconciler::new(Arc::new(platform), Arc::new(FileEndpointStore::new(path)));

    RegistrationOrchestrator::new(reconciler, Arc::new(RecordingPresenter::default()))
}

#[tokio::test]
async fn registers_once_and_is_unchanged_after_restart() {
    let dir: tempfile::TempDir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("endpoint.json");
    let mock: MockSns = create_mock_sns(TEST_ENDPOINT_ARN, "t1");

    let first: TriggerResult = orchestrator(&mock, path.clone())
        .on_device_token(token("t1"))
        .await;

    assert_eq!(
        TriggerResult::Completed(RegistrationOutcome::Registered(
            TEST_ENDPOINT_ARN.to_string()
        )),
        first
    );

    // A fresh orchestrator reads the record the previous one persisted
    let restarted: RegistrationOrchestrator = orchestrator(&mock, path.clone());
    let second: TriggerResult = restarted.on_device_token(token("t1")).await;

    assert_eq!(
        TriggerResult::Completed(RegistrationOutcome::Unchanged(
            TEST_ENDPOINT_ARN.to_string()
        )),
        second
    );
    assert_eq!(RegistrationStatus::Enabled, restarted.status());
    assert_eq!(1, mock.create_rule.num_calls());
    assert_eq!(1, mock.get_rule.num_calls());
    assert_eq!(0, mock.set_rule.num_calls());
}

#[tokio::test]
async fn changed_token_updates_stored_endpoint() {
    let dir: tempfile::TempDir = tempfile::tempdir().unwrap();
    let store: FileEndpointStore = FileEndpointStore::new(dir.path().join("endpoint.json"));
    store
        .set(enabled_record(TEST_ENDPOINT_ARN, "t1"))
        .await
        .unwrap();
    let mock: MockSns = create_mock_sns(TEST_ENDPOINT_ARN, "t1");

    let result: TriggerResult = orchestrator(&mock, store.path().to_path_buf())
        .on_device_token(token("t2"))
        .await;

    assert_eq!(
        TriggerResult::Completed(RegistrationOutcome::Updated(TEST_ENDPOINT_ARN.to_string())),
        result
    );
    assert_eq!(1, mock.set_rule.num_calls());
    assert_eq!(0, mock.create_rule.num_calls());

    let stored: Option<EndpointRecord> = store.get().await.unwrap();
    assert_eq!(Some(enabled_record(TEST_ENDPOINT_ARN, "t2")), stored);
}
