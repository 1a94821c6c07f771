//! Platform peripheral seam.
//!
//! [`HidPeripheral`] abstracts the operations the advertiser needs from the
//! platform BLE stack, so the subscription logic can be driven without a
//! real radio. [`BlePeripheral`] is the production implementation over
//! `ble-peripheral-rust`; it answers attribute read/write plumbing itself
//! and surfaces only the events the advertiser cares about as
//! [`PeripheralSignal`]s.

use async_trait::async_trait;
use ble_peripheral_rust::{
    gatt::{
        peripheral_event::{
            PeripheralEvent, ReadRequestResponse, RequestResponse, WriteRequestResponse,
        },
        service::Service,
    },
    Peripheral, PeripheralImpl,
};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{BleError, Result};
use crate::gatt;

/// Capacity of the platform event channel
const EVENT_CAPACITY: usize = 256;

/// Events surfaced from the platform stack to the advertiser loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeripheralSignal {
    /// Adapter power state changed
    PowerChanged {
        /// Whether the adapter is now powered
        powered: bool,
    },
    /// A central subscribed to or unsubscribed from a characteristic
    SubscriptionChanged {
        /// The characteristic whose notify state changed
        characteristic: Uuid,
        /// Whether the central is now subscribed
        subscribed: bool,
    },
}

/// Operations the advertiser needs from the platform BLE stack
#[async_trait(?Send)]
pub trait HidPeripheral {
    /// Whether the adapter is powered on
    async fn is_powered(&mut self) -> Result<bool>;

    /// Register a GATT service
    async fn add_service(&mut self, service: &Service) -> Result<()>;

    /// Begin advertising under the given name with the given service UUIDs
    async fn start_advertising(&mut self, device_name: &str, services: &[Uuid]) -> Result<()>;

    /// Whether advertising is currently active
    async fn is_advertising(&mut self) -> Result<bool>;

    /// Push a notification value to the subscribed central
    async fn notify(&mut self, characteristic: Uuid, value: Vec<u8>) -> Result<()>;

    /// Wait for the next signal from the platform stack.
    ///
    /// Returns `None` when the platform event stream has closed. Must be
    /// cancel safe; the advertiser polls it inside a `select!`.
    async fn next_signal(&mut self) -> Option<PeripheralSignal>;
}

/// Production peripheral over `ble-peripheral-rust`
pub struct BlePeripheral {
    inner: Peripheral,
    events: mpsc::Receiver<PeripheralEvent>,
    /// Last report value pushed, served back on Report characteristic reads
    last_report: Vec<u8>,
}

impl BlePeripheral {
    /// Acquire the platform's default BLE adapter.
    pub async fn system() -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
        let inner = Peripheral::new(event_tx)
            .await
            .map_err(|e| BleError::AdapterUnavailable(e.to_string()))?;
        Ok(Self {
            inner,
            events: event_rx,
            last_report: Vec::new(),
        })
    }
}

#[async_trait(?Send)]
impl HidPeripheral for BlePeripheral {
    async fn is_powered(&mut self) -> Result<bool> {
        self.inner
            .is_powered()
            .await
            .map_err(|e| BleError::Platform(e.to_string()))
    }

    async fn add_service(&mut self, service: &Service) -> Result<()> {
        self.inner
            .add_service(service)
            .await
            .map_err(|e| BleError::Platform(e.to_string()))
    }

    async fn start_advertising(&mut self, device_name: &str, services: &[Uuid]) -> Result<()> {
        self.inner
            .start_advertising(device_name, services)
            .await
            .map_err(|e| BleError::AdvertiseFailed(e.to_string()))
    }

    async fn is_advertising(&mut self) -> Result<bool> {
        self.inner
            .is_advertising()
            .await
            .map_err(|e| BleError::Platform(e.to_string()))
    }

    async fn notify(&mut self, characteristic: Uuid, value: Vec<u8>) -> Result<()> {
        self.last_report = value.clone();
        self.inner
            .update_characteristic(characteristic, value.into())
            .await
            .map_err(|e| BleError::NotifyFailed(e.to_string()))
    }

    async fn next_signal(&mut self) -> Option<PeripheralSignal> {
        loop {
            // recv() is the only await point, keeping this cancel safe
            let event = self.events.recv().await?;
            match event {
                PeripheralEvent::StateUpdate { is_powered } => {
                    return Some(PeripheralSignal::PowerChanged {
                        powered: is_powered,
                    });
                }
                PeripheralEvent::CharacteristicSubscriptionUpdate {
                    request,
                    subscribed,
                } => {
                    return Some(PeripheralSignal::SubscriptionChanged {
                        characteristic: request.characteristic,
                        subscribed,
                    });
                }
                PeripheralEvent::ReadRequest {
                    request,
                    offset,
                    responder,
                } => {
                    trace!("Read request: {:?} offset={}", request, offset);
                    let response = if request.characteristic == gatt::REPORT_CHAR_UUID {
                        ReadRequestResponse {
                            value: self.last_report.clone().into(),
                            response: RequestResponse::Success,
                        }
                    } else {
                        ReadRequestResponse {
                            value: Vec::<u8>::new().into(),
                            response: RequestResponse::RequestNotSupported,
                        }
                    };
                    if responder.send(response).is_err() {
                        warn!("Read responder dropped by platform stack");
                    }
                }
                PeripheralEvent::WriteRequest {
                    request,
                    offset,
                    value,
                    responder,
                } => {
                    trace!(
                        "Write request: {:?} offset={} value={:?}",
                        request,
                        offset,
                        value
                    );
                    // HID Control Point and Protocol Mode writes are
                    // acknowledged and otherwise ignored; we only ever run
                    // in report protocol mode.
                    let response = if request.characteristic == gatt::HID_CONTROL_POINT_UUID
                        || request.characteristic == gatt::PROTOCOL_MODE_UUID
                    {
                        WriteRequestResponse {
                            response: RequestResponse::Success,
                        }
                    } else {
                        debug!("Write rejected: unknown characteristic");
                        WriteRequestResponse {
                            response: RequestResponse::RequestNotSupported,
                        }
                    };
                    if responder.send(response).is_err() {
                        warn!("Write responder dropped by platform stack");
                    }
                }
            }
        }
    }
}
