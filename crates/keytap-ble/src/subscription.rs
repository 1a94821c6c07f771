//! Subscription lifecycle state and the shared notifier slot.
//!
//! The state machine is deliberately independent of how the platform stack
//! delivers subscription events, so transitions can be tested without a
//! radio. The slot is the one piece of state shared between the advertiser
//! loop (writer) and HTTP request tasks (readers).

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};

use keytap_hid::KeyboardReport;

use crate::error::{BleError, Result};
use crate::service::AdvertiserCommand;

/// Per-subscription state: `Unsubscribed -> Subscribed -> Unsubscribed`.
///
/// At most one central is tracked; a second subscribe while subscribed is
/// not a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionState {
    /// No central is subscribed
    #[default]
    Unsubscribed,
    /// A central is subscribed to the Report characteristic
    Subscribed {
        /// When the subscription was established
        since: DateTime<Utc>,
    },
}

impl SubscriptionState {
    /// Apply a subscribe event. Returns `true` if this was a transition.
    pub fn on_subscribe(&mut self, now: DateTime<Utc>) -> bool {
        match self {
            SubscriptionState::Unsubscribed => {
                *self = SubscriptionState::Subscribed { since: now };
                true
            }
            SubscriptionState::Subscribed { .. } => false,
        }
    }

    /// Apply an unsubscribe event. Returns `true` if this was a transition.
    pub fn on_unsubscribe(&mut self) -> bool {
        match self {
            SubscriptionState::Subscribed { .. } => {
                *self = SubscriptionState::Unsubscribed;
                true
            }
            SubscriptionState::Unsubscribed => false,
        }
    }

    /// Whether a central is currently subscribed
    pub fn is_subscribed(&self) -> bool {
        matches!(self, SubscriptionState::Subscribed { .. })
    }

    /// When the current subscription was established, if any
    pub fn since(&self) -> Option<DateTime<Utc>> {
        match self {
            SubscriptionState::Subscribed { since } => Some(*since),
            SubscriptionState::Unsubscribed => None,
        }
    }
}

/// Capability to push input reports to the subscribed central.
///
/// A notifier is valid for the lifetime of one subscription; the advertiser
/// refuses sends once the central unsubscribes, so holding a stale clone is
/// harmless.
#[derive(Debug, Clone)]
pub struct ReportNotifier {
    command_tx: mpsc::Sender<AdvertiserCommand>,
}

impl ReportNotifier {
    pub(crate) fn new(command_tx: mpsc::Sender<AdvertiserCommand>) -> Self {
        Self { command_tx }
    }

    /// Send one input report to the subscribed central.
    ///
    /// The write is executed by the advertiser loop, so concurrent sends
    /// and subscription changes are linearized.
    pub async fn send_report(&self, report: KeyboardReport) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(AdvertiserCommand::NotifyReport {
                report,
                response: response_tx,
            })
            .await
            .map_err(|_| BleError::Channel("Advertiser loop is gone".into()))?;
        response_rx
            .await
            .map_err(|_| BleError::Channel("Advertiser dropped notify response".into()))?
    }
}

/// Shared slot holding the notifier for the active subscription.
///
/// Written only by the advertiser loop; read by HTTP request tasks. An
/// empty slot means "no subscribed central" and is surfaced to callers as
/// service-unavailable, never retried internally.
#[derive(Default)]
pub struct NotifierSlot {
    inner: RwLock<Option<ReportNotifier>>,
}

impl NotifierSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the notifier for a new subscription
    pub fn store(&self, notifier: ReportNotifier) {
        *self.inner.write() = Some(notifier);
    }

    /// Clear the slot when the subscription ends
    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    /// Get the current notifier, if a central is subscribed.
    ///
    /// Clones the handle out so the lock is never held across an await.
    pub fn current(&self) -> Option<ReportNotifier> {
        self.inner.read().clone()
    }

    /// Whether a notifier is currently installed
    pub fn is_populated(&self) -> bool {
        self.inner.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_then_unsubscribe_transitions() {
        let mut state = SubscriptionState::default();
        assert!(!state.is_subscribed());

        assert!(state.on_subscribe(Utc::now()));
        assert!(state.is_subscribed());
        assert!(state.since().is_some());

        assert!(state.on_unsubscribe());
        assert!(!state.is_subscribed());
        assert!(state.since().is_none());
    }

    #[test]
    fn repeated_subscribe_is_not_a_transition() {
        let mut state = SubscriptionState::default();
        let first = Utc::now();
        assert!(state.on_subscribe(first));
        assert!(!state.on_subscribe(Utc::now()));
        // original subscription time is retained
        assert_eq!(state.since(), Some(first));
    }

    #[test]
    fn unsubscribe_without_subscription_is_not_a_transition() {
        let mut state = SubscriptionState::default();
        assert!(!state.on_unsubscribe());
        assert!(!state.is_subscribed());
    }

    #[test]
    fn slot_store_and_clear() {
        let (command_tx, _command_rx) = mpsc::channel(1);
        let slot = NotifierSlot::new();
        assert!(slot.current().is_none());
        assert!(!slot.is_populated());

        slot.store(ReportNotifier::new(command_tx));
        assert!(slot.is_populated());
        assert!(slot.current().is_some());

        slot.clear();
        assert!(slot.current().is_none());
    }

    #[tokio::test]
    async fn notifier_errors_when_loop_is_gone() {
        let (command_tx, command_rx) = mpsc::channel(1);
        let notifier = ReportNotifier::new(command_tx);
        drop(command_rx);

        let err = notifier
            .send_report(KeyboardReport::release())
            .await
            .unwrap_err();
        assert!(matches!(err, BleError::Channel(_)));
    }
}
