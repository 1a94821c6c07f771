//! REST API endpoints

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

use keytap_hid::{usage, KeyboardReport};

use crate::AppState;

/// Success body for the trigger endpoint
pub const BODY_KEY_SENT: &str = "Key A sent";
/// Error body when no central is subscribed
pub const BODY_NOT_INITIALIZED: &str = "Notifier not initialized";
/// Error body when the key-down write fails
pub const BODY_PRESS_FAILED: &str = "Failed to send key press";
/// Error body when the key-up write fails
pub const BODY_RELEASE_FAILED: &str = "Failed to release key";

/// Trigger the scripted key sequence: press 'A', then release.
///
/// The release is only attempted after a successful press; a failed press
/// aborts the sequence. Nothing is retried here, the HTTP client decides
/// whether to trigger again.
pub async fn trigger(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    debug!("Trigger request: sending key press sequence");

    let Some(notifier) = state.slot.current() else {
        warn!("Trigger with no subscribed central");
        return (StatusCode::INTERNAL_SERVER_ERROR, BODY_NOT_INITIALIZED);
    };

    if let Err(e) = notifier
        .send_report(KeyboardReport::press(usage::KEY_A))
        .await
    {
        warn!("Key press failed: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, BODY_PRESS_FAILED);
    }

    if let Err(e) = notifier.send_report(KeyboardReport::release()).await {
        warn!("Key release failed: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, BODY_RELEASE_FAILED);
    }

    state.reports_sent.fetch_add(2, Ordering::Relaxed);
    (StatusCode::OK, BODY_KEY_SENT)
}

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Node status
#[derive(Serialize)]
pub struct NodeStatus {
    pub device_name: String,
    pub subscribed: bool,
    pub subscribed_since: Option<DateTime<Utc>>,
    pub reports_sent: u64,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<NodeStatus> {
    let subscribed_since = *state.subscribed_since.read();
    Json(NodeStatus {
        device_name: state.device_name.clone(),
        subscribed: subscribed_since.is_some(),
        subscribed_since,
        reports_sent: state.reports_sent.load(Ordering::Relaxed),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keytap_ble::testing::MockPeripheral;
    use keytap_ble::{
        AdvertiserConfig, AdvertiserEvent, AdvertiserHandle, AdvertiserService, NotifierSlot,
    };
    use parking_lot::RwLock;
    use std::sync::atomic::AtomicU64;
    use std::time::Instant;
    use tokio::sync::broadcast;

    const PRESS_A_FRAME: [u8; 10] = [0xA1, 0x01, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00];
    const RELEASE_FRAME: [u8; 10] = [0xA1, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

    fn app_state(slot: Arc<NotifierSlot>, advertiser: AdvertiserHandle) -> Arc<AppState> {
        Arc::new(AppState {
            device_name: "keytap-test".to_string(),
            slot,
            advertiser,
            reports_sent: AtomicU64::new(0),
            subscribed_since: RwLock::new(None),
            start_time: Instant::now(),
        })
    }

    async fn wait_subscribed(events: &mut broadcast::Receiver<AdvertiserEvent>) {
        loop {
            if matches!(
                events.recv().await.expect("event stream closed"),
                AdvertiserEvent::CentralSubscribed { .. }
            ) {
                return;
            }
        }
    }

    #[tokio::test]
    async fn trigger_without_subscription_returns_500() {
        let (peripheral, driver) = MockPeripheral::new();
        let slot = Arc::new(NotifierSlot::new());
        let (_service, handle, _events) =
            AdvertiserService::new(peripheral, AdvertiserConfig::local_test(), slot.clone());
        let state = app_state(slot, handle);

        let (status, body) = trigger(State(state)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, BODY_NOT_INITIALIZED);
        assert!(driver.writes().is_empty());
    }

    #[tokio::test]
    async fn trigger_sends_press_then_release() {
        let (peripheral, driver) = MockPeripheral::new();
        let slot = Arc::new(NotifierSlot::new());
        let (service, handle, mut events) =
            AdvertiserService::new(peripheral, AdvertiserConfig::local_test(), slot.clone());
        let state = app_state(slot, handle.clone());

        let test = async {
            driver.subscribe().await;
            wait_subscribed(&mut events).await;

            let (status, body) = trigger(State(state.clone())).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, BODY_KEY_SENT);

            let writes = driver.writes();
            assert_eq!(writes.len(), 2);
            assert_eq!(writes[0].1, PRESS_A_FRAME.to_vec());
            assert_eq!(writes[1].1, RELEASE_FRAME.to_vec());
            assert_eq!(state.reports_sent.load(Ordering::Relaxed), 2);

            handle.shutdown().await.unwrap();
        };

        let (result, _) = tokio::join!(service.run(), test);
        result.unwrap();
    }

    #[tokio::test]
    async fn failed_press_aborts_the_sequence() {
        let (peripheral, driver) = MockPeripheral::new();
        let slot = Arc::new(NotifierSlot::new());
        let (service, handle, mut events) =
            AdvertiserService::new(peripheral, AdvertiserConfig::local_test(), slot.clone());
        let state = app_state(slot, handle.clone());

        let test = async {
            driver.subscribe().await;
            wait_subscribed(&mut events).await;
            driver.fail_writes_after(0);

            let (status, body) = trigger(State(state.clone())).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, BODY_PRESS_FAILED);

            // The release was never attempted
            assert!(driver.writes().is_empty());
            assert_eq!(state.reports_sent.load(Ordering::Relaxed), 0);

            handle.shutdown().await.unwrap();
        };

        let (result, _) = tokio::join!(service.run(), test);
        result.unwrap();
    }

    #[tokio::test]
    async fn failed_release_leaves_exactly_one_write() {
        let (peripheral, driver) = MockPeripheral::new();
        let slot = Arc::new(NotifierSlot::new());
        let (service, handle, mut events) =
            AdvertiserService::new(peripheral, AdvertiserConfig::local_test(), slot.clone());
        let state = app_state(slot, handle.clone());

        let test = async {
            driver.subscribe().await;
            wait_subscribed(&mut events).await;
            driver.fail_writes_after(1);

            let (status, body) = trigger(State(state.clone())).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, BODY_RELEASE_FAILED);

            // Only the press reached the central
            let writes = driver.writes();
            assert_eq!(writes.len(), 1);
            assert_eq!(writes[0].1, PRESS_A_FRAME.to_vec());

            handle.shutdown().await.unwrap();
        };

        let (result, _) = tokio::join!(service.run(), test);
        result.unwrap();
    }

    #[tokio::test]
    async fn trigger_after_unsubscribe_matches_never_subscribed() {
        let (peripheral, driver) = MockPeripheral::new();
        let slot = Arc::new(NotifierSlot::new());
        let (service, handle, mut events) =
            AdvertiserService::new(peripheral, AdvertiserConfig::local_test(), slot.clone());
        let state = app_state(slot, handle.clone());

        let test = async {
            driver.subscribe().await;
            wait_subscribed(&mut events).await;

            driver.unsubscribe().await;
            loop {
                if matches!(
                    events.recv().await.expect("event stream closed"),
                    AdvertiserEvent::CentralUnsubscribed
                ) {
                    break;
                }
            }

            let (status, body) = trigger(State(state.clone())).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, BODY_NOT_INITIALIZED);
            assert!(driver.writes().is_empty());

            handle.shutdown().await.unwrap();
        };

        let (result, _) = tokio::join!(service.run(), test);
        result.unwrap();
    }

    #[tokio::test]
    async fn health_returns_ok() {
        assert_eq!(health().await, "OK");
    }

    #[tokio::test]
    async fn status_reflects_app_state() {
        let (peripheral, _driver) = MockPeripheral::new();
        let slot = Arc::new(NotifierSlot::new());
        let (_service, handle, _events) =
            AdvertiserService::new(peripheral, AdvertiserConfig::local_test(), slot.clone());
        let state = app_state(slot, handle);

        let now = Utc::now();
        *state.subscribed_since.write() = Some(now);
        state.reports_sent.fetch_add(4, Ordering::Relaxed);

        let Json(status) = status(State(state)).await;
        assert_eq!(status.device_name, "keytap-test");
        assert!(status.subscribed);
        assert_eq!(status.subscribed_since, Some(now));
        assert_eq!(status.reports_sent, 4);
    }
}
