//! Test utilities: an in-memory peripheral for driving the advertiser
//! without a radio.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ble_peripheral_rust::gatt::service::Service;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{BleError, Result};
use crate::gatt;
use crate::peripheral::{HidPeripheral, PeripheralSignal};

const SIGNAL_CAPACITY: usize = 16;

#[derive(Default)]
struct MockLogInner {
    writes: Mutex<Vec<(Uuid, Vec<u8>)>>,
    services: Mutex<Vec<Uuid>>,
    advertised_name: Mutex<Option<String>>,
    fail_advertising: AtomicBool,
    fail_writes_after: AtomicUsize,
}

/// In-memory peripheral that records what the advertiser does to it
pub struct MockPeripheral {
    signals: mpsc::Receiver<PeripheralSignal>,
    log: Arc<MockLogInner>,
}

/// Test-side handle for injecting platform signals and inspecting the mock
pub struct MockDriver {
    signals: mpsc::Sender<PeripheralSignal>,
    log: Arc<MockLogInner>,
}

impl MockPeripheral {
    /// Create a mock peripheral and its driver
    pub fn new() -> (Self, MockDriver) {
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_CAPACITY);
        let log = Arc::new(MockLogInner {
            fail_writes_after: AtomicUsize::new(usize::MAX),
            ..Default::default()
        });
        (
            Self {
                signals: signal_rx,
                log: log.clone(),
            },
            MockDriver {
                signals: signal_tx,
                log,
            },
        )
    }
}

impl MockDriver {
    /// Inject a subscribe event for the Report characteristic
    pub async fn subscribe(&self) {
        self.signals
            .send(PeripheralSignal::SubscriptionChanged {
                characteristic: gatt::REPORT_CHAR_UUID,
                subscribed: true,
            })
            .await
            .expect("mock peripheral dropped");
    }

    /// Inject an unsubscribe event for the Report characteristic
    pub async fn unsubscribe(&self) {
        self.signals
            .send(PeripheralSignal::SubscriptionChanged {
                characteristic: gatt::REPORT_CHAR_UUID,
                subscribed: false,
            })
            .await
            .expect("mock peripheral dropped");
    }

    /// Inject a subscription event for an arbitrary characteristic
    pub async fn subscribe_to(&self, characteristic: Uuid) {
        self.signals
            .send(PeripheralSignal::SubscriptionChanged {
                characteristic,
                subscribed: true,
            })
            .await
            .expect("mock peripheral dropped");
    }

    /// Inject an adapter power transition
    pub async fn set_power(&self, powered: bool) {
        self.signals
            .send(PeripheralSignal::PowerChanged { powered })
            .await
            .expect("mock peripheral dropped");
    }

    /// Close the platform event stream
    pub fn close(self) {
        drop(self.signals);
    }

    /// All notification writes the advertiser performed, in order
    pub fn writes(&self) -> Vec<(Uuid, Vec<u8>)> {
        self.log.writes.lock().clone()
    }

    /// UUIDs of the GATT services the advertiser registered
    pub fn services(&self) -> Vec<Uuid> {
        self.log.services.lock().clone()
    }

    /// The name the advertiser is advertising under, if any
    pub fn advertised_name(&self) -> Option<String> {
        self.log.advertised_name.lock().clone()
    }

    /// Make `start_advertising` fail
    pub fn fail_advertising(&self) {
        self.log.fail_advertising.store(true, Ordering::SeqCst);
    }

    /// Make notification writes fail once `n` writes have been recorded.
    ///
    /// `fail_writes_after(0)` fails every write; `fail_writes_after(1)`
    /// allows one write through.
    pub fn fail_writes_after(&self, n: usize) {
        self.log.fail_writes_after.store(n, Ordering::SeqCst);
    }
}

#[async_trait(?Send)]
impl HidPeripheral for MockPeripheral {
    async fn is_powered(&mut self) -> Result<bool> {
        Ok(true)
    }

    async fn add_service(&mut self, service: &Service) -> Result<()> {
        self.log.services.lock().push(service.uuid);
        Ok(())
    }

    async fn start_advertising(&mut self, device_name: &str, _services: &[Uuid]) -> Result<()> {
        if self.log.fail_advertising.load(Ordering::SeqCst) {
            return Err(BleError::AdvertiseFailed("mock advertising failure".into()));
        }
        *self.log.advertised_name.lock() = Some(device_name.to_string());
        Ok(())
    }

    async fn is_advertising(&mut self) -> Result<bool> {
        Ok(self.log.advertised_name.lock().is_some())
    }

    async fn notify(&mut self, characteristic: Uuid, value: Vec<u8>) -> Result<()> {
        let mut writes = self.log.writes.lock();
        if writes.len() >= self.log.fail_writes_after.load(Ordering::SeqCst) {
            return Err(BleError::NotifyFailed("mock write failure".into()));
        }
        writes.push((characteristic, value));
        Ok(())
    }

    async fn next_signal(&mut self) -> Option<PeripheralSignal> {
        self.signals.recv().await
    }
}
