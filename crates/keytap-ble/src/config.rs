//! Advertiser configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Advertiser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvertiserConfig {
    /// Device name used in the advertisement
    pub device_name: String,
    /// How long to wait for the adapter to power on before giving up
    pub power_timeout_secs: u64,
    /// Whether to expose a Battery Service alongside the HID service
    pub include_battery_service: bool,
}

impl Default for AdvertiserConfig {
    fn default() -> Self {
        Self {
            device_name: "BLE Keyboard".to_string(),
            power_timeout_secs: 10,
            include_battery_service: true,
        }
    }
}

impl AdvertiserConfig {
    /// Create a configuration for local testing
    pub fn local_test() -> Self {
        Self {
            device_name: "keytap-test".to_string(),
            power_timeout_secs: 1,
            include_battery_service: false,
        }
    }

    /// Get the power-on timeout as a Duration
    pub fn power_timeout(&self) -> Duration {
        Duration::from_secs(self.power_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AdvertiserConfig::default();
        assert_eq!(config.device_name, "BLE Keyboard");
        assert!(config.include_battery_service);
    }

    #[test]
    fn test_local_test_config() {
        let config = AdvertiserConfig::local_test();
        assert_eq!(config.power_timeout(), Duration::from_secs(1));
    }
}
