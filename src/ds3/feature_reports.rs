//! Fixed DS3 feature reports (component C2).
//!
//! These 64-byte frames were captured from a genuine DS3 and are treated as
//! opaque constants (spec.md §9 Open Question): whether the console validates
//! any of the calibration-looking bytes in 0xF7 is not known, so they are
//! preserved byte-for-byte rather than recomputed.

use std::sync::Mutex;

use log::info;

use crate::config::pairing::PairingRecord;

pub const REPORT_0X01: u8 = 0x01;
pub const REPORT_0XF2: u8 = 0xF2;
pub const REPORT_0XF5: u8 = 0xF5;
pub const REPORT_0XF7: u8 = 0xF7;
pub const REPORT_0XF8: u8 = 0xF8;
pub const REPORT_0XEF: u8 = 0xEF;
pub const REPORT_0XF4: u8 = 0xF4;

/// Capabilities report. Returned on GET_REPORT(0x01); this is what the
/// console's driver probes during enumeration (spec.md §8 scenario 1).
const CAPABILITIES: [u8; 64] = [
    0x01, 0x04, 0x00, 0x0C, 0x01, 0x02, 0x18, 0x18, 0x18, 0x18, 0x09, 0x0A, 0x10, 0x11, 0x12, 0x13,
    0x14, 0x15, 0x16, 0x17, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Pairing info report. Bytes 4-9 are the emulator's own Bluetooth MAC
/// (spec.md §4.2 "set_local_bt_mac").
const PAIRING_INFO: [u8; 64] = [
    0xF2, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Host MAC report. Bytes 2-7 are filled in on SET_REPORT(0xF5) during
/// pairing (spec.md §4.2, §8 scenario 2).
const HOST_MAC: [u8; 64] = [
    0xF5, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Calibration-looking constant frame; left opaque per the Open Question.
const CALIBRATION: [u8; 64] = [
    0xF7, 0x00, 0x00, 0x02, 0xEE, 0xFB, 0x01, 0x00, 0x0A, 0x07, 0xF5, 0xFD, 0xFA, 0xFF, 0xF9, 0x01,
    0x06, 0x00, 0x00, 0x00, 0x1A, 0x02, 0x1F, 0x02, 0x1E, 0x02, 0xF4, 0xFD, 0x08, 0x00, 0x06, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

const UNKNOWN_F8: [u8; 64] = [
    0xF8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Echo slot for the last SET_REPORT(0xEF) payload; populated at runtime.
const EF_DEFAULT: [u8; 64] = {
    let mut bytes = [0u8; 64];
    bytes[0] = 0xEF;
    bytes
};

/// Host "enable" flag slot; populated at runtime.
const F4_DEFAULT: [u8; 64] = {
    let mut bytes = [0u8; 64];
    bytes[0] = 0xF4;
    bytes
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureEvent {
    ControllerEnabledByHost,
    PairingComplete,
}

struct Table {
    pairing_info: [u8; 64],
    host_mac: [u8; 64],
    ef_slot: [u8; 64],
    f4_slot: [u8; 64],
}

/// Owns the fixed and mutable DS3 feature reports and the pairing record.
pub struct FeatureReportTable {
    table: Mutex<Table>,
}

impl FeatureReportTable {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table {
                pairing_info: PAIRING_INFO,
                host_mac: HOST_MAC,
                ef_slot: EF_DEFAULT,
                f4_slot: F4_DEFAULT,
            }),
        }
    }

    /// Returns a copy of the 64-byte frame for `id`, plus a human-readable
    /// name for logging, or `None` if `id` is not one of the fixed reports.
    pub fn get(&self, id: u8) -> Option<([u8; 64], &'static str)> {
        let table = self.table.lock().unwrap();
        match id {
            REPORT_0X01 => Some((CAPABILITIES, "capabilities")),
            REPORT_0XF2 => Some((table.pairing_info, "pairing-info")),
            REPORT_0XF5 => Some((table.host_mac, "host-mac")),
            REPORT_0XF7 => Some((CALIBRATION, "calibration")),
            REPORT_0XF8 => Some((UNKNOWN_F8, "unknown-f8")),
            REPORT_0XEF => Some((table.ef_slot, "ef-echo")),
            REPORT_0XF4 => Some((table.f4_slot, "enable-flag")),
            _ => None,
        }
    }

    pub fn set_local_bt_mac(&self, mac: [u8; 6]) {
        let mut table = self.table.lock().unwrap();
        table.pairing_info[4..10].copy_from_slice(&mac);
    }

    /// Dispatches a SET_REPORT(id, payload) from the console. Returns any
    /// application event the orchestrator should act on.
    pub fn handle_set_report(&self, id: u8, payload: &[u8]) -> Option<FeatureEvent> {
        match id {
            REPORT_0XEF => {
                let mut table = self.table.lock().unwrap();
                table.ef_slot = [0u8; 64];
                table.ef_slot[0] = 0xEF;
                let rest = if payload.is_empty() { &payload[..] } else { &payload[1..] };
                let n = rest.len().min(63);
                table.ef_slot[1..1 + n].copy_from_slice(&rest[..n]);
                None
            }
            REPORT_0XF4 => {
                if payload.len() >= 2 && payload[0] == 0x42 {
                    let mut table = self.table.lock().unwrap();
                    table.f4_slot = [0u8; 64];
                    table.f4_slot[0] = 0xF4;
                    table.f4_slot[1] = payload[1];
                    info!("controller enabled by host");
                    Some(FeatureEvent::ControllerEnabledByHost)
                } else {
                    None
                }
            }
            REPORT_0XF5 => {
                if payload.len() >= 8 {
                    let mut mac = [0u8; 6];
                    mac.copy_from_slice(&payload[2..8]);
                    {
                        let mut table = self.table.lock().unwrap();
                        table.host_mac[2..8].copy_from_slice(&mac);
                    }
                    if let Err(err) = PairingRecord::load_or_default().with_ps3_mac(mac).save() {
                        log::warn!("failed to persist pairing record: {err}");
                    }
                    Some(FeatureEvent::PairingComplete)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl Default for FeatureReportTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_none_for_unknown_id() {
        let table = FeatureReportTable::new();
        assert!(table.get(0x02).is_none());
    }

    #[test]
    fn get_capabilities_report_has_byte0_0x01() {
        let table = FeatureReportTable::new();
        let (bytes, name) = table.get(REPORT_0X01).unwrap();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(name, "capabilities");
    }

    #[test]
    fn set_report_ef_echoes_payload() {
        let table = FeatureReportTable::new();
        let payload = [0xEF, 0x01, 0x02, 0x03];
        table.handle_set_report(REPORT_0XEF, &payload);
        let (bytes, _) = table.get(REPORT_0XEF).unwrap();
        assert_eq!(&bytes[0..4], &payload);
    }

    #[test]
    fn set_report_ef_empty_payload_does_not_panic() {
        let table = FeatureReportTable::new();
        table.handle_set_report(REPORT_0XEF, &[]);
        let (bytes, _) = table.get(REPORT_0XEF).unwrap();
        assert_eq!(bytes[0], 0xEF);
        assert_eq!(&bytes[1..], &[0u8; 63]);
    }

    #[test]
    fn set_report_f4_requires_magic_byte() {
        let table = FeatureReportTable::new();
        assert!(table
            .handle_set_report(REPORT_0XF4, &[0x00, 0x01])
            .is_none());
        let event = table.handle_set_report(REPORT_0XF4, &[0x42, 0x01]);
        assert_eq!(event, Some(FeatureEvent::ControllerEnabledByHost));
    }

    #[test]
    fn set_report_f5_short_payload_is_ignored() {
        let table = FeatureReportTable::new();
        assert!(table.handle_set_report(REPORT_0XF5, &[0x00; 4]).is_none());
    }

    #[test]
    fn set_local_bt_mac_updates_pairing_info_slot() {
        let table = FeatureReportTable::new();
        table.set_local_bt_mac([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        let (bytes, _) = table.get(REPORT_0XF2).unwrap();
        assert_eq!(&bytes[4..10], &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    }
}
