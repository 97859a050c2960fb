//! Keeps the push platform endpoint of this installation in line with its device token.
//!
//! ```ignore
//! let reconciler: Reconciler = Reconciler::new(Arc::new(platform), Arc::new(store));
//! let orchestrator: RegistrationOrchestrator =
//!     RegistrationOrchestrator::new(reconciler, Arc::new(TracingPresenter));
//!
//! match orchestrator.on_device_token(token).await {
//!     TriggerResult::Completed(outcome) => tracing::info!(?outcome, "Registered"),
//!     TriggerResult::Deferred => {}
//! }
//! ```

pub mod orchestrator;
pub mod reconciler;

pub use orchestrator::{RegistrationOrchestrator, TriggerResult};
pub use reconciler::Reconciler;
