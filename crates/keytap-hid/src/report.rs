//! HID keyboard input report (boot protocol compatible).
//!
//! Wire layout (10 bytes), as emitted on the BLE Report characteristic:
//! ```text
//! Byte 0:   Report ID (0xA1)
//! Byte 1:   Report type (0x01 = input)
//! Byte 2:   Modifier keys (bitfield)
//!           Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!           Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!           Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!           Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 3:   Reserved (0x00)
//! Byte 4-9: Up to 6 simultaneous key codes (USB HID usage codes)
//! ```

/// Input report size in bytes.
pub const INPUT_REPORT_LEN: usize = 10;

/// Report ID prefix byte.
pub const REPORT_ID: u8 = 0xA1;

/// Report type byte for input reports.
pub const REPORT_TYPE_INPUT: u8 = 0x01;

/// USB HID keyboard usage codes (Keyboard/Keypad usage page).
pub mod usage {
    /// Usage code for the 'A' key.
    pub const KEY_A: u8 = 0x04;
}

/// Standard HID boot-protocol keyboard report.
///
/// BLE HID boot-protocol keyboard reports are identical in payload layout
/// to USB boot-protocol reports; the two-byte ID/type prefix is prepended
/// by [`KeyboardReport::encode`].
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct KeyboardReport {
    /// Modifier key bitfield.
    pub modifier: u8,
    /// Up to 6 simultaneously pressed key codes.
    pub keycodes: [u8; 6],
}

impl KeyboardReport {
    /// Create a report with a single pressed key and no modifiers.
    pub const fn press(keycode: u8) -> Self {
        Self {
            modifier: 0,
            keycodes: [keycode, 0, 0, 0, 0, 0],
        }
    }

    /// Create an all-keys-released report.
    pub const fn release() -> Self {
        Self {
            modifier: 0,
            keycodes: [0; 6],
        }
    }

    /// Serialise into the 10-byte wire frame for BLE transmission.
    pub fn encode(&self) -> [u8; INPUT_REPORT_LEN] {
        let mut frame = [0u8; INPUT_REPORT_LEN];
        frame[0] = REPORT_ID;
        frame[1] = REPORT_TYPE_INPUT;
        frame[2] = self.modifier;
        frame[3] = 0x00; // reserved
        frame[4..].copy_from_slice(&self.keycodes);
        frame
    }

    /// Returns `true` if no keys are pressed (release event).
    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keycodes.iter().all(|&k| k == 0)
    }
}
