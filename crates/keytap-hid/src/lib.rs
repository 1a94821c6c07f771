//! Keytap HID - Keyboard report layout and descriptor definitions
//!
//! This crate defines the HID boot-keyboard input report format sent over
//! the BLE Report characteristic, together with the report map descriptor
//! that describes it to connecting centrals.

pub mod descriptor;
pub mod report;

// Re-exports for convenience
pub use descriptor::KEYBOARD_REPORT_MAP;
pub use report::{usage, KeyboardReport, INPUT_REPORT_LEN};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        // VERSION is set at compile time from Cargo.toml
        assert!(VERSION.contains('.'), "VERSION should be semver format");
    }
}
