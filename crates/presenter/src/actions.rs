use crate::NotificationPresenter;

/// Whether an action brings the app to the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    Foreground,
    Background,
}

/// Amount of room the system gives a notification, which decides the actions shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionContext {
    Default,
    Minimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    Read,
    Ignore,
    Delete,
}

impl NotificationAction {
    pub const ALL: [NotificationAction; 3] = [
        NotificationAction::Read,
        NotificationAction::Ignore,
        NotificationAction::Delete,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            NotificationAction::Read => "READ_ACTION",
            NotificationAction::Ignore => "IGNORE_ACTION",
            NotificationAction::Delete => "DELETE_ACTION",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            NotificationAction::Read => "Read",
            NotificationAction::Ignore => "Ignore",
            NotificationAction::Delete => "Delete",
        }
    }

    pub fn activation_mode(&self) -> ActivationMode {
        match self {
            NotificationAction::Ignore => ActivationMode::Background,
            NotificationAction::Read | NotificationAction::Delete => ActivationMode::Foreground,
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, NotificationAction::Delete)
    }

    pub fn requires_authentication(&self) -> bool {
        !matches!(self, NotificationAction::Ignore)
    }

    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.identifier() == identifier)
    }
}

/// A group of actions offered on a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationCategory {
    pub identifier: &'static str,
    pub default_actions: &'static [NotificationAction],
    pub minimal_actions: &'static [NotificationAction],
}

impl NotificationCategory {
    pub fn actions(&self, context: ActionContext) -> &'static [NotificationAction] {
        match context {
            ActionContext::Default => self.default_actions,
            ActionContext::Minimal => self.minimal_actions,
        }
    }
}

pub const MESSAGE_CATEGORY: NotificationCategory = NotificationCategory {
    identifier: "MESSAGE_CATEGORY",
    default_actions: &[
        NotificationAction::Read,
        NotificationAction::Ignore,
        NotificationAction::Delete,
    ],
    minimal_actions: &[NotificationAction::Read, NotificationAction::Ignore],
};

/// Handle an action the user picked on a notification.
/// Unknown or missing identifiers are ignored.
pub fn dispatch_action(presenter: &dyn NotificationPresenter, identifier: Option<&str>) {
    tracing::info!(?identifier, "Handling notification action");

    match identifier.and_then(NotificationAction::from_identifier) {
        Some(NotificationAction::Read) => presenter.present_alert("Read"),
        Some(NotificationAction::Delete) => presenter.present_alert("Delete"),
        Some(NotificationAction::Ignore) => {}
        None => tracing::debug!(?identifier, "Ignoring unknown notification action"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotificationPayload;
    use std::sync::Mutex;

    #[derive(Default)]
    struct AlertLog(Mutex<Vec<String>>);

    impl NotificationPresenter for AlertLog {
        fn present_notification(&self, _: &NotificationPayload) {}

        fn present_alert(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }

        fn present_error(&self, _: &str) {}
    }

    #[test]
    fn identifiers_resolve_to_actions() {
        assert_eq!(
            Some(NotificationAction::Delete),
            NotificationAction::from_identifier("DELETE_ACTION")
        );
        assert_eq!(None, NotificationAction::from_identifier("ARCHIVE_ACTION"));
    }

    #[test]
    fn minimal_context_drops_destructive_action() {
        let minimal: &[NotificationAction] = MESSAGE_CATEGORY.actions(ActionContext::Minimal);

        assert_eq!(3, MESSAGE_CATEGORY.actions(ActionContext::Default).len());
        assert!(minimal.iter().all(|action| !action.is_destructive()));
    }

    #[test]
    fn only_ignore_runs_in_background_without_authentication() {
        let ignore: NotificationAction = NotificationAction::Ignore;

        assert_eq!(ActivationMode::Background, ignore.activation_mode());
        assert!(!ignore.requires_authentication());
        assert!(NotificationAction::Read.requires_authentication());
        assert_eq!(
            ActivationMode::Foreground,
            NotificationAction::Delete.activation_mode()
        );
    }

    #[test]
    fn read_and_delete_alert_while_ignore_and_unknown_do_nothing() {
        let presenter: AlertLog = AlertLog::default();

        dispatch_action(&presenter, Some("READ_ACTION"));
        dispatch_action(&presenter, Some("IGNORE_ACTION"));
        dispatch_action(&presenter, Some("DELETE_ACTION"));
        dispatch_action(&presenter, Some("UNKNOWN"));
        dispatch_action(&presenter, None);

        assert_eq!(vec!["Read", "Delete"], *presenter.0.lock().unwrap());
    }
}
