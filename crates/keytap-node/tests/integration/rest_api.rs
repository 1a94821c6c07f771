//! REST API endpoint tests
//!
//! These tests verify the HTTP response formats and the wire frames the
//! trigger endpoint emits.

use serde_json::json;

use keytap_hid::{usage, KeyboardReport};

/// Test expected format for GET /api/status response
#[test]
fn test_status_response_format() {
    let response = json!({
        "device_name": "BLE Keyboard",
        "subscribed": true,
        "subscribed_since": "2026-08-07T10:00:00Z",
        "reports_sent": 12,
        "uptime_seconds": 3600,
        "version": "0.1.0"
    });

    assert!(response["device_name"].is_string());
    assert!(response["subscribed"].is_boolean());
    assert!(response["reports_sent"].is_number());
    assert!(response["uptime_seconds"].is_number());
    assert!(response["version"].as_str().unwrap().contains('.'));
}

/// A client distinguishes failure modes by body text alone, so the three
/// error bodies must stay distinct
#[test]
fn test_trigger_error_bodies_are_distinct() {
    let errors = [
        "Notifier not initialized",
        "Failed to send key press",
        "Failed to release key",
    ];
    let unique: std::collections::HashSet<_> = errors.iter().collect();
    assert_eq!(unique.len(), errors.len());
}

/// The trigger sends exactly these two frames, press before release
#[test]
fn test_trigger_wire_frames() {
    let press = KeyboardReport::press(usage::KEY_A).encode();
    let release = KeyboardReport::release().encode();

    assert_eq!(
        press,
        [0xA1, 0x01, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
    assert_eq!(
        release,
        [0xA1, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
}
