use crate::reconciler::Reconciler;
use model::{DeviceToken, ErrorKind, RegistrationOutcome, RegistrationStatus};
use presenter::NotificationPresenter;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{Instrument, Span};

/// What happened to a registration trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerResult {
    /// This call drove reconciliation, the outcome is from the last run it performed.
    Completed(RegistrationOutcome),
    /// Another call is reconciling and will run again with the latest token.
    Deferred,
}

#[derive(Default)]
struct TriggerSlot {
    running: bool,
    // Latest token received while a run was in flight
    pending: Option<DeviceToken>,
    latest_token: Option<DeviceToken>,
    status: RegistrationStatus,
    // Bumped on every declined registration
    declines: u64,
}

/// Holds the running flag for one caller and releases it however the run ends,
/// including a dropped future or a panic.
struct RunGuard<'a> {
    orchestrator: &'a RegistrationOrchestrator,
    released: bool,
}

impl RunGuard<'_> {
    /// Token of the coalesced follow-up run, or `None` after releasing the slot.
    fn next_token(&mut self) -> Option<DeviceToken> {
        let mut slot = self.orchestrator.lock();
        let next: Option<DeviceToken> = slot.pending.take();

        if next.is_none() {
            slot.running = false;
            self.released = true;
        }

        next
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        tracing::warn!("Reconciliation abandoned before completion");

        let mut slot = self.orchestrator.lock();
        slot.running = false;
        // No one is left to drive it, the token remains reachable through `latest_token`
        slot.pending = None;
    }
}

/// Entry point for device token events.
///
/// Only one reconciliation runs at a time. Triggers arriving meanwhile are coalesced
/// into a single follow-up run, performed by the caller which owns the active run.
pub struct RegistrationOrchestrator {
    reconciler: Reconciler,
    presenter: Arc<dyn NotificationPresenter>,
    slot: Mutex<TriggerSlot>,
}

impl RegistrationOrchestrator {
    pub fn new(reconciler: Reconciler, presenter: Arc<dyn NotificationPresenter>) -> Self {
        RegistrationOrchestrator {
            reconciler,
            presenter,
            slot: Mutex::new(TriggerSlot::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TriggerSlot> {
        // The slot holds plain flags, which stay consistent even if a holder panicked
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> RegistrationStatus {
        self.lock().status
    }

    pub fn latest_token(&self) -> Option<DeviceToken> {
        self.lock().latest_token.clone()
    }

    /// Called whenever the OS hands out a device token, new or unchanged.
    pub async fn on_device_token(&self, token: DeviceToken) -> TriggerResult {
        {
            let mut slot = self.lock();
            slot.latest_token = Some(token.clone());

            if slot.running {
                tracing::debug!(token = %token, "Reconciliation in flight, deferring");
                slot.pending = Some(token);

                return TriggerResult::Deferred;
            }

            slot.running = true;
        }

        let mut guard: RunGuard<'_> = RunGuard {
            orchestrator: self,
            released: false,
        };
        let mut token: DeviceToken = token;

        loop {
            let declines: u64 = self.lock().declines;
            let outcome: RegistrationOutcome = self.run(&token).await;
            self.report(&outcome, declines);

            match guard.next_token() {
                Some(next) => token = next,
                None => return TriggerResult::Completed(outcome),
            }
        }
    }

    /// Run again with the most recently received token.
    pub async fn request_reregistration(&self) -> TriggerResult {
        match self.latest_token() {
            Some(token) => self.on_device_token(token).await,
            None => {
                let outcome: RegistrationOutcome =
                    RegistrationOutcome::failed(ErrorKind::Invalid, "no device token received");
                let declines: u64 = self.lock().declines;
                self.report(&outcome, declines);

                TriggerResult::Completed(outcome)
            }
        }
    }

    /// The OS declined to hand out a token, e.g. the user refused notifications.
    ///
    /// A run already in flight cannot enable notifications afterwards, and deferred
    /// triggers are dropped. The next device token starts over.
    pub fn on_registration_failed(&self, reason: &str) {
        tracing::warn!(reason, "Device token registration declined");

        let mut slot = self.lock();
        slot.status = RegistrationStatus::Disabled;
        slot.declines = slot.declines.wrapping_add(1);
        slot.pending = None;
    }

    async fn run(&self, token: &DeviceToken) -> RegistrationOutcome {
        let span: Span = tracing::span!(tracing::Level::INFO, "Reconcile", token = %token);

        self.reconciler.reconcile(token).instrument(span).await
    }

    /// `declines` is the decline count observed when the run started.
    fn report(&self, outcome: &RegistrationOutcome, declines: u64) {
        match outcome {
            RegistrationOutcome::Failed { kind, detail } => {
                self.lock().status = RegistrationStatus::Disabled;

                self.presenter.present_error(&format!(
                    "Error registering for push notifications: {kind}: {detail}"
                ));
            }
            _ => {
                let mut slot = self.lock();

                if slot.declines != declines {
                    tracing::info!(?outcome, "Registration declined meanwhile, staying disabled");
                    return;
                }

                tracing::info!(?outcome, "Push notifications enabled");
                slot.status = RegistrationStatus::Enabled;
            }
        }
    }
}
