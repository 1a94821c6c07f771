//! GATT database for the HID-over-GATT keyboard profile.
//!
//! UUIDs are the Bluetooth SIG assigned numbers expanded against the
//! standard base UUID.

use ble_peripheral_rust::gatt::{
    characteristic::Characteristic,
    descriptor::Descriptor,
    properties::{AttributePermission, CharacteristicProperty},
    service::Service,
};
use uuid::Uuid;

use keytap_hid::KEYBOARD_REPORT_MAP;

use crate::config::AdvertiserConfig;

/// HID Service (0x1812)
pub const HID_SERVICE_UUID: Uuid = Uuid::from_u128(0x00001812_0000_1000_8000_00805f9b34fb);
/// Battery Service (0x180F)
pub const BATTERY_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);

/// HID Information characteristic (0x2A4A)
pub const HID_INFORMATION_UUID: Uuid = Uuid::from_u128(0x00002a4a_0000_1000_8000_00805f9b34fb);
/// HID Control Point characteristic (0x2A4C)
pub const HID_CONTROL_POINT_UUID: Uuid = Uuid::from_u128(0x00002a4c_0000_1000_8000_00805f9b34fb);
/// Protocol Mode characteristic (0x2A4E)
pub const PROTOCOL_MODE_UUID: Uuid = Uuid::from_u128(0x00002a4e_0000_1000_8000_00805f9b34fb);
/// Report Map characteristic (0x2A4B)
pub const REPORT_MAP_UUID: Uuid = Uuid::from_u128(0x00002a4b_0000_1000_8000_00805f9b34fb);
/// Report characteristic (0x2A4D)
pub const REPORT_CHAR_UUID: Uuid = Uuid::from_u128(0x00002a4d_0000_1000_8000_00805f9b34fb);
/// Battery Level characteristic (0x2A19)
pub const BATTERY_LEVEL_UUID: Uuid = Uuid::from_u128(0x00002a19_0000_1000_8000_00805f9b34fb);
/// Report Reference descriptor (0x2908): [report_id, report_type=1(Input)]
pub const REPORT_REFERENCE_UUID: Uuid = Uuid::from_u128(0x00002908_0000_1000_8000_00805f9b34fb);

/// Reported battery level; we have no battery to measure
const BATTERY_LEVEL_PERCENT: u8 = 100;

/// Build the GATT services to register for this advertiser.
pub fn build_services(config: &AdvertiserConfig) -> Vec<Service> {
    let mut services = vec![hid_service()];
    if config.include_battery_service {
        services.push(battery_service());
    }
    services
}

/// The HID service: information, control point, protocol mode, report map,
/// and the notify-capable input Report characteristic.
fn hid_service() -> Service {
    Service {
        uuid: HID_SERVICE_UUID,
        primary: true,
        characteristics: vec![
            Characteristic {
                uuid: HID_INFORMATION_UUID,
                properties: vec![CharacteristicProperty::Read],
                permissions: vec![AttributePermission::Readable],
                value: Some(vec![0x11, 0x01, 0x00, 0x00].into()), // bcdHID=0x0111, country=0, flags=0
                ..Default::default()
            },
            Characteristic {
                uuid: HID_CONTROL_POINT_UUID,
                properties: vec![CharacteristicProperty::Write],
                permissions: vec![AttributePermission::Writeable],
                value: None,
                ..Default::default()
            },
            Characteristic {
                uuid: PROTOCOL_MODE_UUID,
                properties: vec![CharacteristicProperty::Read, CharacteristicProperty::Write],
                permissions: vec![
                    AttributePermission::Readable,
                    AttributePermission::Writeable,
                ],
                value: Some(vec![0x01].into()), // Report Protocol
                ..Default::default()
            },
            Characteristic {
                uuid: REPORT_MAP_UUID,
                properties: vec![CharacteristicProperty::Read],
                permissions: vec![AttributePermission::Readable],
                value: Some(KEYBOARD_REPORT_MAP.to_vec().into()),
                ..Default::default()
            },
            // Input Report (notify + read) with Report Reference descriptor
            Characteristic {
                uuid: REPORT_CHAR_UUID,
                properties: vec![CharacteristicProperty::Read, CharacteristicProperty::Notify],
                permissions: vec![AttributePermission::Readable],
                value: None,
                descriptors: vec![Descriptor {
                    uuid: REPORT_REFERENCE_UUID,
                    value: Some(vec![0x01, 0x01].into()), // report_id=1, report_type=Input(1)
                    ..Default::default()
                }],
                ..Default::default()
            },
        ],
    }
}

fn battery_service() -> Service {
    Service {
        uuid: BATTERY_SERVICE_UUID,
        primary: true,
        characteristics: vec![Characteristic {
            uuid: BATTERY_LEVEL_UUID,
            properties: vec![CharacteristicProperty::Read, CharacteristicProperty::Notify],
            permissions: vec![AttributePermission::Readable],
            value: Some(vec![BATTERY_LEVEL_PERCENT].into()),
            ..Default::default()
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hid_service_exposes_report_characteristic() {
        let svc = hid_service();
        assert_eq!(svc.uuid, HID_SERVICE_UUID);
        assert!(svc
            .characteristics
            .iter()
            .any(|c| c.uuid == REPORT_CHAR_UUID));
    }

    #[test]
    fn battery_service_is_optional() {
        let without = AdvertiserConfig {
            include_battery_service: false,
            ..Default::default()
        };
        assert_eq!(build_services(&without).len(), 1);
        assert_eq!(build_services(&AdvertiserConfig::default()).len(), 2);
    }

    #[test]
    fn short_uuid_expansion_matches_sig_base() {
        // 0x1812 expanded against the Bluetooth base UUID
        assert_eq!(
            HID_SERVICE_UUID.to_string(),
            "00001812-0000-1000-8000-00805f9b34fb"
        );
    }
}
