//! BLE-specific error types

use thiserror::Error;

/// BLE peripheral errors
#[derive(Error, Debug)]
pub enum BleError {
    /// The platform BLE adapter could not be acquired
    #[error("BLE adapter unavailable: {0}")]
    AdapterUnavailable(String),

    /// The adapter never reported powered-on
    #[error("BLE adapter did not power on within {waited_secs}s")]
    PowerTimeout { waited_secs: u64 },

    /// Advertising could not be started
    #[error("Failed to start advertising: {0}")]
    AdvertiseFailed(String),

    /// No central is subscribed to the Report characteristic
    #[error("No subscribed central")]
    NotSubscribed,

    /// A notification write failed
    #[error("Notification write failed: {0}")]
    NotifyFailed(String),

    /// Underlying platform stack error
    #[error("Platform error: {0}")]
    Platform(String),

    /// Channel error
    #[error("Channel error: {0}")]
    Channel(String),
}

/// Result type for BLE operations
pub type Result<T> = std::result::Result<T, BleError>;
