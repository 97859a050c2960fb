use model::{DeviceToken, EndpointAttributes, EndpointRecord, ErrorKind, RegistrationOutcome};
use platform::{PlatformError, PushPlatform};
use state::{EndpointStore, StateError};
use std::sync::Arc;

/// Steps of a single reconciliation run.
#[derive(Debug)]
enum ReconcileState {
    // Nothing stored locally, the endpoint must be created
    NoRecord,
    // A stored endpoint which must be checked against the platform
    Verifying(EndpointRecord),
    // The stored endpoint was deleted remotely
    Recreating(EndpointRecord),
    Updating {
        endpoint_arn: String,
        attributes: EndpointAttributes,
    },
    Done(RegistrationOutcome),
    Failed {
        kind: ErrorKind,
        detail: String,
    },
}

impl ReconcileState {
    fn platform_failure(err: PlatformError) -> Self {
        ReconcileState::Failed {
            kind: err.kind(),
            detail: err.detail().to_string(),
        }
    }

    fn store_failure(err: StateError) -> Self {
        ReconcileState::Failed {
            kind: ErrorKind::LocalStoreUnavailable,
            detail: err.to_string(),
        }
    }
}

/// Converges the remote endpoint with the current device token.
///
/// The store is read once at the start of a run and written only after the platform
/// confirms a change. Errors are never retried here, each run ends in exactly one
/// `RegistrationOutcome`.
pub struct Reconciler {
    platform: Arc<dyn PushPlatform>,
    store: Arc<dyn EndpointStore>,
}

impl Reconciler {
    pub fn new(platform: Arc<dyn PushPlatform>, store: Arc<dyn EndpointStore>) -> Self {
        Reconciler { platform, store }
    }

    pub async fn reconcile(&self, token: &DeviceToken) -> RegistrationOutcome {
        let mut state: ReconcileState = self.load().await;

        loop {
            tracing::trace!(?state, "Reconciliation step");

            state = match state {
                ReconcileState::NoRecord => {
                    tracing::info!("No endpoint registered yet, creating one");

                    self.create(token).await
                }
                ReconcileState::Verifying(record) => self.verify(token, record).await,
                ReconcileState::Recreating(stale) => {
                    tracing::info!(
                        endpoint_arn = %stale.endpoint_arn,
                        "Endpoint was deleted, registering again"
                    );

                    self.create(token).await
                }
                ReconcileState::Updating {
                    endpoint_arn,
                    attributes,
                } => self.update(token, endpoint_arn, attributes).await,
                ReconcileState::Done(outcome) => return outcome,
                ReconcileState::Failed { kind, detail } => {
                    tracing::warn!(%kind, detail, "Reconciliation failed");

                    return RegistrationOutcome::Failed { kind, detail };
                }
            };
        }
    }

    async fn load(&self) -> ReconcileState {
        match self.store.get().await {
            Ok(Some(record)) => ReconcileState::Verifying(record),
            Ok(None) => ReconcileState::NoRecord,
            // An unreadable record is as good as none, the endpoint gets recreated
            Err(err) if err.is_corrupt() => {
                tracing::warn!(error = %err, "Discarding corrupt endpoint record");

                ReconcileState::NoRecord
            }
            Err(err) => ReconcileState::store_failure(err),
        }
    }

    async fn create(&self, token: &DeviceToken) -> ReconcileState {
        let endpoint_arn: String = match self.platform.create_endpoint(token).await {
            Ok(endpoint_arn) => endpoint_arn,
            Err(err) => return ReconcileState::platform_failure(err),
        };

        tracing::info!(endpoint_arn, "Registered endpoint");

        self.record(
            EndpointRecord::enabled(endpoint_arn.clone(), token),
            RegistrationOutcome::Registered(endpoint_arn),
        )
        .await
    }

    async fn verify(&self, token: &DeviceToken, record: EndpointRecord) -> ReconcileState {
        let attributes: EndpointAttributes =
            match self.platform.get_endpoint_attributes(&record.endpoint_arn).await {
                Ok(attributes) => attributes,
                Err(PlatformError::NotFound(_)) => return ReconcileState::Recreating(record),
                // Anything else leaves the stored record as it is
                Err(err) => return ReconcileState::platform_failure(err),
            };

        if !attributes.matches(token) {
            tracing::info!(
                endpoint_arn = %record.endpoint_arn,
                remote_enabled = attributes.enabled,
                "Endpoint registration out of date, updating"
            );

            return ReconcileState::Updating {
                attributes: attributes.converged(token),
                endpoint_arn: record.endpoint_arn,
            };
        }

        let expected: EndpointRecord = EndpointRecord::enabled(record.endpoint_arn.clone(), token);
        let outcome: RegistrationOutcome = RegistrationOutcome::Unchanged(record.endpoint_arn.clone());

        if record == expected {
            return ReconcileState::Done(outcome);
        }

        // Remote is already right, only the local copy lags behind
        self.record(expected, outcome).await
    }

    async fn update(
        &self,
        token: &DeviceToken,
        endpoint_arn: String,
        attributes: EndpointAttributes,
    ) -> ReconcileState {
        if let Err(err) = self
            .platform
            .set_endpoint_attributes(&endpoint_arn, &attributes)
            .await
        {
            return ReconcileState::platform_failure(err);
        }

        self.record(
            EndpointRecord::enabled(endpoint_arn.clone(), token),
            RegistrationOutcome::Updated(endpoint_arn),
        )
        .await
    }

    async fn record(&self, record: EndpointRecord, outcome: RegistrationOutcome) -> ReconcileState {
        match self.store.set(record).await {
            Ok(()) => ReconcileState::Done(outcome),
            Err(err) => ReconcileState::store_failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{
        enabled_record, token, FakePushPlatform, FaultyEndpointStore, PlatformCall,
        PlatformOperation,
    };

    fn reconciler(platform: &Arc<FakePushPlatform>, store: &FaultyEndpointStore) -> Reconciler {
        Reconciler::new(platform.clone(), Arc::new(store.clone()))
    }

    fn remote(token: &str, enabled: bool) -> EndpointAttributes {
        EndpointAttributes {
            token: token.to_string(),
            enabled,
            extra: Default::default(),
        }
    }

    #[tokio::test]
    async fn first_run_registers_and_stores_endpoint() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        let store: FaultyEndpointStore = FaultyEndpointStore::default();

        let outcome: RegistrationOutcome = reconciler(&platform, &store)
            .reconcile(&token("t1"))
            .await;

        let RegistrationOutcome::Registered(endpoint_arn) = outcome else {
            panic!("Expected a registered endpoint, got {outcome:?}");
        };
        assert_eq!(
            Some(enabled_record(&endpoint_arn, "t1")),
            store.get().await.unwrap()
        );
        assert_eq!(1, platform.count(PlatformOperation::Create));
    }

    #[tokio::test]
    async fn second_run_with_same_token_is_unchanged_without_writes() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        let store: FaultyEndpointStore = FaultyEndpointStore::default();
        let reconciler: Reconciler = reconciler(&platform, &store);

        let first: RegistrationOutcome = reconciler.reconcile(&token("t1")).await;
        let writes_after_first: usize = platform.writes();
        let store_writes_after_first: usize = store.writes();

        let second: RegistrationOutcome = reconciler.reconcile(&token("t1")).await;

        assert_eq!(
            RegistrationOutcome::Unchanged(first.endpoint_arn().unwrap().to_string()),
            second
        );
        assert_eq!(writes_after_first, platform.writes());
        assert_eq!(store_writes_after_first, store.writes());
    }

    #[tokio::test]
    async fn deleted_endpoint_is_recreated_with_current_token() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        // Stored record points at an endpoint the platform no longer has
        let store: FaultyEndpointStore =
            FaultyEndpointStore::with_record(enabled_record("arn:fake:endpoint/gone", "t0"));

        let outcome: RegistrationOutcome = reconciler(&platform, &store)
            .reconcile(&token("t1"))
            .await;

        let RegistrationOutcome::Registered(endpoint_arn) = outcome else {
            panic!("Expected a recreated endpoint, got {outcome:?}");
        };
        assert_ne!("arn:fake:endpoint/gone", endpoint_arn);
        assert_eq!(
            Some(enabled_record(&endpoint_arn, "t1")),
            store.get().await.unwrap()
        );
        assert_eq!(Some(remote("t1", true)), platform.attributes(&endpoint_arn));
    }

    #[tokio::test]
    async fn endpoint_deleted_after_registration_is_recreated() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        let store: FaultyEndpointStore = FaultyEndpointStore::default();
        let reconciler: Reconciler = reconciler(&platform, &store);

        let first: RegistrationOutcome = reconciler.reconcile(&token("t1")).await;
        let first_arn: String = first.endpoint_arn().unwrap().to_string();
        platform.delete_endpoint(&first_arn);

        let second: RegistrationOutcome = reconciler.reconcile(&token("t1")).await;

        let RegistrationOutcome::Registered(second_arn) = second else {
            panic!("Expected a recreated endpoint, got {second:?}");
        };
        assert_ne!(first_arn, second_arn);
        assert_eq!(
            Some(enabled_record(&second_arn, "t1")),
            store.get().await.unwrap()
        );
        assert_eq!(1, platform.endpoint_count());
        assert_eq!(2, platform.count(PlatformOperation::Create));
    }

    #[tokio::test]
    async fn changed_token_issues_exactly_one_update() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        platform.insert_endpoint("arn:1", remote("t1", true));
        let store: FaultyEndpointStore =
            FaultyEndpointStore::with_record(enabled_record("arn:1", "t1"));

        let outcome: RegistrationOutcome = reconciler(&platform, &store)
            .reconcile(&token("t2"))
            .await;

        assert_eq!(RegistrationOutcome::Updated("arn:1".to_string()), outcome);
        assert_eq!(
            vec![
                PlatformCall::Get {
                    endpoint_arn: "arn:1".to_string()
                },
                PlatformCall::Set {
                    endpoint_arn: "arn:1".to_string(),
                    attributes: remote("t2", true),
                },
            ],
            platform.calls()
        );
        assert_eq!(
            Some(enabled_record("arn:1", "t2")),
            store.get().await.unwrap()
        );
    }

    #[tokio::test]
    async fn disabled_endpoint_is_enabled_with_same_token() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        platform.insert_endpoint("arn:1", remote("t1", false));
        let store: FaultyEndpointStore =
            FaultyEndpointStore::with_record(enabled_record("arn:1", "t1"));

        let outcome: RegistrationOutcome = reconciler(&platform, &store)
            .reconcile(&token("t1"))
            .await;

        assert_eq!(RegistrationOutcome::Updated("arn:1".to_string()), outcome);
        assert_eq!(1, platform.count(PlatformOperation::Set));
        assert_eq!(Some(remote("t1", true)), platform.attributes("arn:1"));
    }

    #[tokio::test]
    async fn update_keeps_other_remote_attributes() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        let mut attributes: EndpointAttributes = remote("t1", true);
        attributes
            .extra
            .insert("CustomUserData".to_string(), "user 1".to_string());
        platform.insert_endpoint("arn:1", attributes);
        let store: FaultyEndpointStore =
            FaultyEndpointStore::with_record(enabled_record("arn:1", "t1"));

        reconciler(&platform, &store).reconcile(&token("t2")).await;

        let updated: EndpointAttributes = platform.attributes("arn:1").unwrap();
        assert_eq!("t2", updated.token);
        assert_eq!(
            Some("user 1"),
            updated.extra.get("CustomUserData").map(String::as_str)
        );
    }

    #[tokio::test]
    async fn failed_creation_leaves_store_empty_and_next_run_retries() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        platform.fail_next(
            PlatformOperation::Create,
            PlatformError::Transient("connection reset".to_string()),
        );
        let store: FaultyEndpointStore = FaultyEndpointStore::default();
        let reconciler: Reconciler = reconciler(&platform, &store);

        let first: RegistrationOutcome = reconciler.reconcile(&token("t1")).await;

        assert_eq!(
            RegistrationOutcome::failed(ErrorKind::Transient, "connection reset"),
            first
        );
        assert_eq!(None, store.get().await.unwrap());

        let second: RegistrationOutcome = reconciler.reconcile(&token("t1")).await;

        assert!(matches!(second, RegistrationOutcome::Registered(_)));
        assert_eq!(2, platform.count(PlatformOperation::Create));
    }

    #[tokio::test]
    async fn transient_verify_failure_keeps_stored_record() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        platform.insert_endpoint("arn:1", remote("t1", true));
        platform.fail_next(
            PlatformOperation::Get,
            PlatformError::Transient("throttled".to_string()),
        );
        let store: FaultyEndpointStore =
            FaultyEndpointStore::with_record(enabled_record("arn:1", "t1"));

        let outcome: RegistrationOutcome = reconciler(&platform, &store)
            .reconcile(&token("t2"))
            .await;

        assert_eq!(
            RegistrationOutcome::failed(ErrorKind::Transient, "throttled"),
            outcome
        );
        assert_eq!(
            Some(enabled_record("arn:1", "t1")),
            store.get().await.unwrap()
        );
        assert_eq!(0, platform.writes());
    }

    #[tokio::test]
    async fn failed_update_is_reported_and_record_untouched() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        platform.insert_endpoint("arn:1", remote("t1", true));
        platform.fail_next(
            PlatformOperation::Set,
            PlatformError::Invalid("token malformed".to_string()),
        );
        let store: FaultyEndpointStore =
            FaultyEndpointStore::with_record(enabled_record("arn:1", "t1"));

        let outcome: RegistrationOutcome = reconciler(&platform, &store)
            .reconcile(&token("t2"))
            .await;

        assert_eq!(
            RegistrationOutcome::failed(ErrorKind::Invalid, "token malformed"),
            outcome
        );
        assert_eq!(
            Some(enabled_record("arn:1", "t1")),
            store.get().await.unwrap()
        );
    }

    #[tokio::test]
    async fn corrupt_record_is_treated_as_missing() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        let store: FaultyEndpointStore = FaultyEndpointStore::default();
        store.corrupt_reads(true);

        let outcome: RegistrationOutcome = reconciler(&platform, &store)
            .reconcile(&token("t1"))
            .await;

        assert!(matches!(outcome, RegistrationOutcome::Registered(_)));
        assert_eq!(0, platform.count(PlatformOperation::Get));
    }

    #[tokio::test]
    async fn store_write_failure_after_creation_is_reported() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        let store: FaultyEndpointStore = FaultyEndpointStore::default();
        store.fail_writes(true);

        let outcome: RegistrationOutcome = reconciler(&platform, &store)
            .reconcile(&token("t1"))
            .await;

        assert!(matches!(
            outcome,
            RegistrationOutcome::Failed {
                kind: ErrorKind::LocalStoreUnavailable,
                ..
            }
        ));
        // Creation is idempotent for the same token, so the next run converges
        store.fail_writes(false);
        let retry: RegistrationOutcome = reconciler(&platform, &store)
            .reconcile(&token("t1"))
            .await;

        assert!(matches!(retry, RegistrationOutcome::Registered(_)));
        assert_eq!(1, platform.endpoint_count());
    }

    #[tokio::test]
    async fn stale_local_record_is_refreshed_without_remote_write() {
        let platform: Arc<FakePushPlatform> = Arc::new(FakePushPlatform::default());
        platform.insert_endpoint("arn:1", remote("t2", true));
        let store: FaultyEndpointStore = FaultyEndpointStore::with_record(EndpointRecord {
            endpoint_arn: "arn:1".to_string(),
            token: "t1".to_string(),
            enabled: false,
        });

        let outcome: RegistrationOutcome = reconciler(&platform, &store)
            .reconcile(&token("t2"))
            .await;

        assert_eq!(RegistrationOutcome::Unchanged("arn:1".to_string()), outcome);
        assert_eq!(0, platform.writes());
        assert_eq!(
            Some(enabled_record("arn:1", "t2")),
            store.get().await.unwrap()
        );
    }
}
