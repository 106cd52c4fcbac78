// src/install/events.rs

//! Lifecycle event reporting
//!
//! Every observable transition of an install or uninstall session is
//! emitted as a [`LifecycleEvent`] through a [`Notifier`]. Frontends pick
//! the notifier that fits: log lines for a CLI, a channel for anything
//! that wants to react to the stream programmatically.

use super::InterruptReason;
use crate::db::models::Apk;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use tracing::{info, warn};

/// What happened to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Session accepted; verification is about to begin
    InstallStarted,
    /// Binary verified and staged for handoff
    InstallStaged,
    /// Waiting on the user to approve newly requested permissions
    InstallUserInteraction { new_permissions: Vec<String> },
    /// Handed to the host installer
    Installing,
    InstallComplete,
    InstallInterrupted { reason: InterruptReason },
    UninstallStarted,
    UninstallComplete,
    UninstallInterrupted { reason: InterruptReason },
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::InstallStarted => write!(f, "install started"),
            EventKind::InstallStaged => write!(f, "staged"),
            EventKind::InstallUserInteraction { .. } => write!(f, "awaiting user confirmation"),
            EventKind::Installing => write!(f, "installing"),
            EventKind::InstallComplete => write!(f, "install complete"),
            EventKind::InstallInterrupted { reason } => write!(f, "install interrupted: {reason}"),
            EventKind::UninstallStarted => write!(f, "uninstall started"),
            EventKind::UninstallComplete => write!(f, "uninstall complete"),
            EventKind::UninstallInterrupted { reason } => {
                write!(f, "uninstall interrupted: {reason}")
            }
        }
    }
}

/// One lifecycle transition of a session
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    /// Stable id of the request: the download URI for installs, the
    /// package name for uninstalls
    pub request_id: String,
    pub package_name: String,
    pub kind: EventKind,
    /// Catalog row the session is installing, when there is one
    pub apk: Option<Apk>,
    /// Failure detail accompanying an interruption
    pub error: Option<String>,
}

/// Sink for session lifecycle events
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &LifecycleEvent);
}

/// Discards all events
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _event: &LifecycleEvent) {}
}

/// Reports events through the logging layer
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &LifecycleEvent) {
        let detail = event
            .error
            .as_ref()
            .map(|e| format!(" ({e})"))
            .unwrap_or_default();
        match &event.kind {
            EventKind::InstallInterrupted { .. } | EventKind::UninstallInterrupted { .. } => {
                warn!("{}: {}{}", event.package_name, event.kind, detail);
            }
            EventKind::InstallUserInteraction { new_permissions } => {
                info!(
                    "{}: awaiting user confirmation (new permissions: {})",
                    event.package_name,
                    new_permissions.join(", ")
                );
            }
            kind => {
                info!("{}: {}", event.package_name, kind);
            }
        }
    }
}

/// Forwards events over a channel
///
/// The receiver half is handed back at construction; dropping it is fine,
/// sends to a closed channel are silently discarded.
pub struct ChannelNotifier {
    sender: Mutex<Sender<LifecycleEvent>>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, Receiver<LifecycleEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: &LifecycleEvent) {
        if let Ok(sender) = self.sender.lock() {
            let _ = sender.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind) -> LifecycleEvent {
        LifecycleEvent {
            request_id: "https://repo.example.org/pkg_7.apk".to_string(),
            package_name: "org.example.app".to_string(),
            kind,
            apk: None,
            error: None,
        }
    }

    #[test]
    fn test_display_phrases() {
        assert_eq!(EventKind::InstallStarted.to_string(), "install started");
        assert_eq!(
            EventKind::InstallInterrupted {
                reason: InterruptReason::HashMismatch
            }
            .to_string(),
            "install interrupted: hash mismatch"
        );
        assert_eq!(
            EventKind::UninstallInterrupted {
                reason: InterruptReason::HostFailure
            }
            .to_string(),
            "uninstall interrupted: host failure"
        );
    }

    #[test]
    fn test_channel_notifier_forwards_in_order() {
        let (notifier, receiver) = ChannelNotifier::new();
        notifier.notify(&event(EventKind::InstallStarted));
        notifier.notify(&event(EventKind::InstallStaged));
        notifier.notify(&event(EventKind::InstallComplete));

        let kinds: Vec<EventKind> = receiver.try_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::InstallStarted,
                EventKind::InstallStaged,
                EventKind::InstallComplete,
            ]
        );
    }

    #[test]
    fn test_channel_notifier_survives_dropped_receiver() {
        let (notifier, receiver) = ChannelNotifier::new();
        drop(receiver);
        notifier.notify(&event(EventKind::InstallStarted));
    }

    #[test]
    fn test_silent_notifier_is_a_no_op() {
        SilentNotifier.notify(&event(EventKind::InstallComplete));
    }
}
