//! Advertiser events
//!
//! Events emitted by the advertiser for consumption by other parts of the
//! application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted by the advertiser
#[derive(Debug, Clone)]
pub enum AdvertiserEvent {
    /// Advertising has started
    Started {
        /// The advertised device name
        device_name: String,
    },

    /// Advertiser stopped
    Stopped,

    /// A central subscribed to the Report characteristic
    CentralSubscribed {
        /// When the subscription was established
        since: DateTime<Utc>,
    },

    /// The subscribed central unsubscribed or disconnected
    CentralUnsubscribed,

    /// Adapter power state changed
    PowerChanged {
        /// Whether the adapter is now powered
        powered: bool,
    },
}

/// Snapshot of the advertiser's current state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvertiserSnapshot {
    /// Advertised device name
    pub device_name: String,
    /// Whether advertising is active
    pub advertising: bool,
    /// Whether a central is subscribed
    pub subscribed: bool,
    /// When the current subscription was established
    pub subscribed_since: Option<DateTime<Utc>>,
    /// Total reports pushed to centrals
    pub reports_sent: u64,
    /// Uptime of the advertiser loop in seconds
    pub uptime_secs: u64,
}
