//! Keytap BLE - HID keyboard peripheral advertiser
//!
//! This crate provides the BLE peripheral role for keytap: it registers a
//! HID-over-GATT keyboard service, advertises it, and tracks one central's
//! subscription to the input Report characteristic.
//!
//! # Overview
//!
//! The advertiser is built as a service with a command handle:
//!
//! - **AdvertiserService**: owns the platform peripheral and runs the event
//!   loop; all notification writes and subscription transitions execute here
//! - **AdvertiserHandle**: cloneable command sender for other tasks
//! - **NotifierSlot**: shared slot holding the live notifier while a
//!   central is subscribed
//! - **HidPeripheral**: seam over the platform stack so the lifecycle logic
//!   is testable without a radio
//!
//! # Example
//!
//! ```rust,no_run
//! use keytap_ble::{spawn_system_advertiser, AdvertiserConfig, NotifierSlot};
//! use keytap_hid::{usage, KeyboardReport};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let slot = Arc::new(NotifierSlot::new());
//!     let (handle, mut events, _fatal) =
//!         spawn_system_advertiser(AdvertiserConfig::default(), slot.clone());
//!
//!     // Wait for a central, then push a key press
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!         if let Some(notifier) = slot.current() {
//!             notifier.send_report(KeyboardReport::press(usage::KEY_A)).await?;
//!             notifier.send_report(KeyboardReport::release()).await?;
//!             break;
//!         }
//!     }
//!
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod gatt;
pub mod peripheral;
pub mod service;
pub mod subscription;

// Test utilities - available with test-utils feature or in tests
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;


// Re-exports
pub use config::AdvertiserConfig;
pub use error::{BleError, Result};
pub use event::{AdvertiserEvent, AdvertiserSnapshot};
pub use peripheral::{BlePeripheral, HidPeripheral, PeripheralSignal};
pub use service::{
    spawn_system_advertiser, AdvertiserCommand, AdvertiserHandle, AdvertiserService,
};
pub use subscription::{NotifierSlot, ReportNotifier, SubscriptionState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AdvertiserConfig::default();
        assert_eq!(config.device_name, "BLE Keyboard");
        assert_eq!(config.power_timeout_secs, 10);
    }

    #[test]
    fn test_report_uuid_is_short_2a4d() {
        assert_eq!(
            gatt::REPORT_CHAR_UUID.to_string(),
            "00002a4d-0000-1000-8000-00805f9b34fb"
        );
    }
}
