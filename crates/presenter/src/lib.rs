use serde_json::{Map, Value};

pub mod actions;

pub use actions::{
    dispatch_action, ActionContext, ActivationMode, NotificationAction, NotificationCategory,
    MESSAGE_CATEGORY,
};

/// Payload of an incoming notification, an opaque key/value mapping.
pub type NotificationPayload = Map<String, Value>;

/// Shows notifications and registration problems to the user.
pub trait NotificationPresenter: Send + Sync {
    fn present_notification(&self, payload: &NotificationPayload);

    /// A short message, e.g. the result of a notification action.
    fn present_alert(&self, message: &str);

    /// A human readable summary of a failed registration.
    fn present_error(&self, message: &str);
}

/// Forward an incoming notification to the presenter for display.
pub fn present_incoming(presenter: &dyn NotificationPresenter, payload: &NotificationPayload) {
    tracing::info!(keys = payload.len(), "Received notification");

    presenter.present_notification(payload);
}

/// Presenter which writes everything to the log, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl NotificationPresenter for TracingPresenter {
    fn present_notification(&self, payload: &NotificationPayload) {
        let payload: Value = Value::Object(payload.clone());

        tracing::info!(payload = %payload, "Push notification");
    }

    fn present_alert(&self, message: &str) {
        tracing::info!(alert = message, "Push notification alert");
    }

    fn present_error(&self, message: &str) {
        tracing::error!(error = message, "Push notification error");
    }
}
