//! Advertiser service - main entry point for the BLE peripheral role.
//!
//! The AdvertiserService owns the platform peripheral, drives the
//! subscription lifecycle, and executes all notification writes, so slot
//! transitions and report sends are linearized through one event loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use keytap_hid::KeyboardReport;

use crate::config::AdvertiserConfig;
use crate::error::{BleError, Result};
use crate::event::{AdvertiserEvent, AdvertiserSnapshot};
use crate::gatt;
use crate::peripheral::{BlePeripheral, HidPeripheral, PeripheralSignal};
use crate::subscription::{NotifierSlot, ReportNotifier, SubscriptionState};

/// Capacity of the command channel
const COMMAND_CAPACITY: usize = 64;
/// Capacity of the event broadcast channel
const EVENT_CAPACITY: usize = 256;
/// How often to poll the adapter while waiting for power-on
const POWER_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Commands sent to the advertiser service
#[derive(Debug)]
pub enum AdvertiserCommand {
    /// Push an input report to the subscribed central
    NotifyReport {
        report: KeyboardReport,
        response: oneshot::Sender<Result<()>>,
    },
    /// Get a snapshot of the advertiser state
    GetSnapshot {
        response: oneshot::Sender<AdvertiserSnapshot>,
    },
    /// Shutdown
    Shutdown,
}

/// Handle for interacting with the advertiser service
#[derive(Clone)]
pub struct AdvertiserHandle {
    command_tx: mpsc::Sender<AdvertiserCommand>,
}

impl AdvertiserHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<AdvertiserCommand>) -> Self {
        Self { command_tx }
    }

    /// Push an input report to the subscribed central
    pub async fn notify_report(&self, report: KeyboardReport) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(AdvertiserCommand::NotifyReport {
                report,
                response: tx,
            })
            .await
            .map_err(|_| BleError::Channel("Failed to send notify command".into()))?;
        rx.await
            .map_err(|_| BleError::Channel("Failed to receive notify result".into()))?
    }

    /// Get a snapshot of the advertiser state
    pub async fn snapshot(&self) -> Result<AdvertiserSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(AdvertiserCommand::GetSnapshot { response: tx })
            .await
            .map_err(|_| BleError::Channel("Failed to send snapshot command".into()))?;
        rx.await
            .map_err(|_| BleError::Channel("Failed to receive snapshot".into()))
    }

    /// Shutdown the advertiser service
    pub async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(AdvertiserCommand::Shutdown)
            .await
            .map_err(|_| BleError::Channel("Failed to send shutdown command".into()))
    }
}

/// The advertiser service manages the BLE peripheral role
pub struct AdvertiserService<P: HidPeripheral> {
    /// The platform peripheral
    peripheral: P,
    /// Configuration
    config: AdvertiserConfig,
    /// Shared notifier slot, written here and read by request tasks
    slot: Arc<NotifierSlot>,
    /// Subscription lifecycle state
    state: SubscriptionState,
    /// Event broadcaster
    event_tx: broadcast::Sender<AdvertiserEvent>,
    /// Command receiver
    command_rx: mpsc::Receiver<AdvertiserCommand>,
    /// Command sender (for creating notifiers)
    command_tx: mpsc::Sender<AdvertiserCommand>,
    /// Whether advertising is active
    advertising: bool,
    /// Total reports pushed
    reports_sent: u64,
    /// Start time
    start_time: Instant,
}

impl<P: HidPeripheral> AdvertiserService<P> {
    /// Create a new advertiser service over the given peripheral
    pub fn new(
        peripheral: P,
        config: AdvertiserConfig,
        slot: Arc<NotifierSlot>,
    ) -> (
        Self,
        AdvertiserHandle,
        broadcast::Receiver<AdvertiserEvent>,
    ) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (event_tx, event_rx) = broadcast::channel(EVENT_CAPACITY);
        let handle = AdvertiserHandle::new(command_tx.clone());
        let service = Self {
            peripheral,
            config,
            slot,
            state: SubscriptionState::default(),
            event_tx,
            command_rx,
            command_tx,
            advertising: false,
            reports_sent: 0,
            start_time: Instant::now(),
        };
        (service, handle, event_rx)
    }

    pub(crate) fn from_parts(
        peripheral: P,
        config: AdvertiserConfig,
        slot: Arc<NotifierSlot>,
        command_tx: mpsc::Sender<AdvertiserCommand>,
        command_rx: mpsc::Receiver<AdvertiserCommand>,
        event_tx: broadcast::Sender<AdvertiserEvent>,
    ) -> Self {
        Self {
            peripheral,
            config,
            slot,
            state: SubscriptionState::default(),
            event_tx,
            command_rx,
            command_tx,
            advertising: false,
            reports_sent: 0,
            start_time: Instant::now(),
        }
    }

    /// Start the advertiser service.
    ///
    /// Runs until shutdown is requested or the platform event stream
    /// closes. The notifier slot is cleared on every exit path.
    pub async fn run(mut self) -> Result<()> {
        let result = self.run_inner().await;

        // Scoped release: the slot must never outlive the loop
        self.slot.clear();
        let _ = self.event_tx.send(AdvertiserEvent::Stopped);
        match &result {
            Ok(()) => info!("Advertiser stopped"),
            Err(e) => error!("Advertiser failed: {}", e),
        }
        result
    }

    async fn run_inner(&mut self) -> Result<()> {
        info!("Starting BLE advertiser: {}", self.config.device_name);

        self.wait_for_power().await?;

        for service in gatt::build_services(&self.config) {
            self.peripheral.add_service(&service).await?;
            debug!("Registered GATT service {}", service.uuid);
        }

        self.peripheral
            .start_advertising(&self.config.device_name, &[gatt::HID_SERVICE_UUID])
            .await?;
        if !self.peripheral.is_advertising().await? {
            return Err(BleError::AdvertiseFailed(
                "advertising did not become active".into(),
            ));
        }
        self.advertising = true;
        info!(
            "Advertising as \"{}\" with HID service {}",
            self.config.device_name,
            gatt::HID_SERVICE_UUID
        );
        let _ = self.event_tx.send(AdvertiserEvent::Started {
            device_name: self.config.device_name.clone(),
        });

        loop {
            tokio::select! {
                signal = self.peripheral.next_signal() => {
                    match signal {
                        Some(signal) => self.handle_signal(signal).await,
                        None => {
                            warn!("Platform event stream closed");
                            return Err(BleError::Platform(
                                "Platform event stream closed".into(),
                            ));
                        }
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Wait for the adapter to power on, bounded by the configured timeout
    async fn wait_for_power(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.config.power_timeout();
        while !self.peripheral.is_powered().await? {
            if Instant::now() >= deadline {
                return Err(BleError::PowerTimeout {
                    waited_secs: self.config.power_timeout_secs,
                });
            }
            tokio::time::sleep(POWER_POLL_INTERVAL).await;
        }
        debug!("Adapter powered on");
        Ok(())
    }

    /// Handle a signal from the platform stack
    async fn handle_signal(&mut self, signal: PeripheralSignal) {
        match signal {
            PeripheralSignal::SubscriptionChanged {
                characteristic,
                subscribed,
            } => {
                if characteristic != gatt::REPORT_CHAR_UUID {
                    debug!(
                        "Ignoring subscription change on characteristic {}",
                        characteristic
                    );
                    return;
                }
                if subscribed {
                    self.on_central_subscribed();
                } else {
                    self.on_central_unsubscribed();
                }
            }

            PeripheralSignal::PowerChanged { powered } => {
                if powered {
                    info!("Adapter powered on");
                    // Advertising does not survive a power cycle
                    match self
                        .peripheral
                        .start_advertising(&self.config.device_name, &[gatt::HID_SERVICE_UUID])
                        .await
                    {
                        Ok(()) => self.advertising = true,
                        Err(e) => warn!("Failed to restart advertising: {}", e),
                    }
                } else {
                    warn!("Adapter powered off");
                    self.advertising = false;
                    // Any subscription died with the adapter
                    self.on_central_unsubscribed();
                }
                let _ = self
                    .event_tx
                    .send(AdvertiserEvent::PowerChanged { powered });
            }
        }
    }

    fn on_central_subscribed(&mut self) {
        let now = Utc::now();
        if !self.state.on_subscribe(now) {
            debug!("Subscribe event while already subscribed");
            return;
        }
        info!("Central subscribed to Report characteristic");
        self.slot
            .store(ReportNotifier::new(self.command_tx.clone()));
        let _ = self
            .event_tx
            .send(AdvertiserEvent::CentralSubscribed { since: now });
    }

    fn on_central_unsubscribed(&mut self) {
        if !self.state.on_unsubscribe() {
            return;
        }
        info!("Central unsubscribed from Report characteristic");
        self.slot.clear();
        let _ = self.event_tx.send(AdvertiserEvent::CentralUnsubscribed);
    }

    /// Handle a command. Returns `false` when the service should stop.
    async fn handle_command(&mut self, cmd: AdvertiserCommand) -> bool {
        match cmd {
            AdvertiserCommand::NotifyReport { report, response } => {
                let result = self.send_report(&report).await;
                let _ = response.send(result);
            }

            AdvertiserCommand::GetSnapshot { response } => {
                let _ = response.send(self.snapshot());
            }

            AdvertiserCommand::Shutdown => {
                info!("Shutdown requested");
                return false;
            }
        }

        true
    }

    /// Push one report, refusing if no central is subscribed
    async fn send_report(&mut self, report: &KeyboardReport) -> Result<()> {
        if !self.state.is_subscribed() {
            return Err(BleError::NotSubscribed);
        }
        self.peripheral
            .notify(gatt::REPORT_CHAR_UUID, report.encode().to_vec())
            .await?;
        self.reports_sent += 1;
        debug!("Report sent ({} total)", self.reports_sent);
        Ok(())
    }

    fn snapshot(&self) -> AdvertiserSnapshot {
        AdvertiserSnapshot {
            device_name: self.config.device_name.clone(),
            advertising: self.advertising,
            subscribed: self.state.is_subscribed(),
            subscribed_since: self.state.since(),
            reports_sent: self.reports_sent,
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}

/// Spawn the advertiser over the system BLE adapter.
///
/// The peripheral runs on a dedicated thread with its own runtime because
/// the platform peripheral is not `Send` on every backend. The returned
/// receiver resolves with the loop's terminal result, so a fatal advertiser
/// error is observable instead of dying in a detached task.
pub fn spawn_system_advertiser(
    config: AdvertiserConfig,
    slot: Arc<NotifierSlot>,
) -> (
    AdvertiserHandle,
    broadcast::Receiver<AdvertiserEvent>,
    oneshot::Receiver<Result<()>>,
) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (event_tx, event_rx) = broadcast::channel(EVENT_CAPACITY);
    let (result_tx, result_rx) = oneshot::channel();
    let handle = AdvertiserHandle::new(command_tx.clone());

    std::thread::spawn(move || {
        let result = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BleError::Platform(e.to_string()))
            .and_then(|rt| {
                rt.block_on(async move {
                    let peripheral = BlePeripheral::system().await?;
                    let service = AdvertiserService::from_parts(
                        peripheral, config, slot, command_tx, command_rx, event_tx,
                    );
                    service.run().await
                })
            });
        let _ = result_tx.send(result);
    });

    (handle, event_rx, result_rx)
}
