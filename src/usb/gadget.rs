//! The three cooperating ep0/ep1/ep2 loops of the USB gadget plant
//! (spec.md §4.5, §5).
//!
//! Endpoint files are expected to already be open on a mounted FunctionFS
//! instance; mounting and UDC binding are treated as an external "attach"
//! collaborator (spec.md §9).

use std::fs::File;
use std::io::{Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::ds3::feature_reports::{FeatureEvent, FeatureReportTable};
use crate::ds3::report_store::ReportStore;
use crate::ds3::INPUT_REPORT_LEN;
use crate::error::UsbError;
use crate::state::{Rumble, RumbleCell, RuntimeFlags};
use crate::translate;

use super::{FfsEventType, HidRequest, SetupPacket, UsbEvent};

const INPUT_PUMP_PERIOD: Duration = Duration::from_millis(4);

/// Opens the three FunctionFS endpoint files under `mount_path` and writes
/// the descriptor and strings blobs to ep0. Mounting the FunctionFS
/// instance itself is out of scope (spec.md §1).
pub struct Gadget {
    pub ep0: File,
    pub ep1: File,
    pub ep2: File,
}

impl Gadget {
    pub fn open(mount_path: &str) -> Result<Self, UsbError> {
        let mut ep0 = File::options()
            .read(true)
            .write(true)
            .open(format!("{mount_path}/ep0"))
            .map_err(UsbError::Control)?;

        ep0.write_all(&super::descriptors::descriptor_blob())
            .map_err(UsbError::Control)?;
        ep0.write_all(&super::descriptors::strings_blob())
            .map_err(UsbError::Control)?;

        let ep1 = File::options()
            .write(true)
            .open(format!("{mount_path}/ep1"))
            .map_err(UsbError::Control)?;
        let ep2 = File::options()
            .read(true)
            .open(format!("{mount_path}/ep2"))
            .map_err(UsbError::Control)?;

        info!("FunctionFS descriptors published at {mount_path}");
        Ok(Self { ep0, ep1, ep2 })
    }
}

fn parse_event(buf: &[u8]) -> Option<UsbEvent> {
    if buf.len() < 12 {
        return None;
    }
    let event_type = FfsEventType::from(buf[8]);
    match event_type {
        FfsEventType::Setup => {
            let setup = SetupPacket {
                request_type: buf[0],
                request: buf[1],
                value: u16::from_le_bytes([buf[2], buf[3]]),
                index: u16::from_le_bytes([buf[4], buf[5]]),
                length: u16::from_le_bytes([buf[6], buf[7]]),
            };
            Some(UsbEvent::Setup(setup))
        }
        FfsEventType::Enable => Some(UsbEvent::Enable),
        FfsEventType::Disable => Some(UsbEvent::Disable),
        FfsEventType::Unbind => Some(UsbEvent::Unbind),
        other => Some(UsbEvent::Other(other)),
    }
}

/// The ep0 control loop: blocks on FunctionFS event records and dispatches
/// SETUP/ENABLE/DISABLE/UNBIND (spec.md §4.5).
pub fn run_control_loop(
    mut ep0: File,
    feature_table: Arc<FeatureReportTable>,
    rumble: Arc<RumbleCell>,
    flags: Arc<RuntimeFlags>,
) {
    let mut buf = [0u8; 12];
    while flags.is_running() {
        let n = match ep0.read(&mut buf) {
            Ok(n) => n,
            Err(err) => {
                warn!("ep0 event read failed: {err}");
                continue;
            }
        };
        let Some(event) = parse_event(&buf[..n]) else {
            continue;
        };

        match event {
            UsbEvent::Setup(setup) => handle_setup(&mut ep0, setup, &feature_table, &flags),
            UsbEvent::Enable => {
                info!("USB gadget enabled");
                flags.set_usb_enabled(true);
            }
            UsbEvent::Disable => {
                info!("USB gadget disabled");
                flags.set_usb_enabled(false);
                rumble.set(Rumble::default());
            }
            UsbEvent::Unbind => {
                if !flags.is_mode_switching() {
                    info!("USB gadget unbound; requesting shutdown");
                    flags.stop();
                }
            }
            UsbEvent::Other(kind) => debug!("ep0 event ignored: {kind:?}"),
        }
    }
}

fn handle_setup(
    ep0: &mut File,
    setup: SetupPacket,
    feature_table: &FeatureReportTable,
    flags: &RuntimeFlags,
) {
    match HidRequest::from(setup) {
        HidRequest::GetReport { id, length } => match feature_table.get(id) {
            Some((bytes, name)) => {
                let n = (length as usize).min(64);
                debug!("GET_REPORT({id:#04x}) -> {name}");
                if let Err(err) = ep0.write_all(&bytes[..n]) {
                    warn!("ep0 GET_REPORT write failed: {err}");
                }
            }
            None => {
                debug!("GET_REPORT({id:#04x}) unknown; stalling");
                stall(ep0);
            }
        },
        HidRequest::SetReport { id, length } => {
            let n = (length as usize).min(64);
            let mut payload = vec![0u8; n];
            if let Err(err) = ep0.read_exact(&mut payload) {
                warn!("ep0 SET_REPORT read failed: {err}");
                return;
            }
            if let Some(FeatureEvent::PairingComplete) = feature_table.handle_set_report(id, &payload) {
                flags.set_pairing_complete(true);
            }
            ack_write(ep0);
        }
        HidRequest::SetIdle => ack_read(ep0),
        HidRequest::Other(request) => {
            debug!("unsupported ep0 request {request:#04x}; stalling");
            stall(ep0);
        }
    }
}

/// SET_IDLE's status stage is OUT-direction from the host's perspective and
/// is acked with a zero-length read (spec.md §4.5).
fn ack_read(ep0: &mut File) {
    if let Err(err) = ep0.read(&mut []) {
        warn!("ep0 ack failed: {err}");
    }
}

/// SET_REPORT's status stage is IN-direction and is acked with a
/// zero-length write, the opposite of [`ack_read`] (spec.md §4.5).
fn ack_write(ep0: &mut File) {
    if let Err(err) = ep0.write_all(&[]) {
        warn!("ep0 ack failed: {err}");
    }
}

fn stall(ep0: &mut File) {
    if let Err(err) = ep0.read(&mut []) {
        debug!("ep0 stall read returned: {err}");
    }
}

/// The ep1 input pump: at ~250 Hz, snapshots the Report Store and writes it
/// to the console. Quiescent until `usb_enabled` (spec.md §4.5).
pub fn run_input_pump(mut ep1: File, report_store: Arc<ReportStore>, flags: Arc<RuntimeFlags>) {
    let mut buf = [0u8; INPUT_REPORT_LEN];
    while flags.is_running() {
        if flags.usb_enabled() {
            report_store.snapshot(&mut buf);
            if let Err(err) = ep1.write_all(&buf) {
                debug!("ep1 write failed (host likely not reading yet): {err}");
            }
        }
        thread::sleep(INPUT_PUMP_PERIOD);
    }
}

/// The ep2 output sink: blocks on reads of up to 64 bytes; translates
/// console rumble commands into the shared rumble cell (spec.md §4.5).
pub fn run_output_sink(mut ep2: File, rumble: Arc<RumbleCell>, flags: Arc<RuntimeFlags>) {
    let mut buf = [0u8; 64];
    while flags.is_running() {
        let n = match ep2.read(&mut buf) {
            Ok(n) => n,
            Err(err) => {
                debug!("ep2 read failed: {err}");
                continue;
            }
        };
        if n >= 6 {
            if let Some((right, left)) = translate::translate_rumble(&buf[..n]) {
                rumble.set(Rumble { right, left });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_event_decodes_a_setup_stage() {
        let mut buf = [0u8; 12];
        buf[0] = 0xA1;
        buf[1] = 0x01;
        buf[2..4].copy_from_slice(&0x0301u16.to_le_bytes());
        buf[4..6].copy_from_slice(&0u16.to_le_bytes());
        buf[6..8].copy_from_slice(&64u16.to_le_bytes());
        buf[8] = 4; // SETUP
        let event = parse_event(&buf).unwrap();
        assert_eq!(
            event,
            UsbEvent::Setup(SetupPacket {
                request_type: 0xA1,
                request: 0x01,
                value: 0x0301,
                index: 0,
                length: 64,
            })
        );
    }

    #[test]
    fn parse_event_decodes_enable_and_unbind() {
        let mut buf = [0u8; 12];
        buf[8] = 2; // ENABLE
        assert_eq!(parse_event(&buf), Some(UsbEvent::Enable));
        buf[8] = 1; // UNBIND
        assert_eq!(parse_event(&buf), Some(UsbEvent::Unbind));
    }

    #[test]
    fn parse_event_rejects_short_buffers() {
        assert_eq!(parse_event(&[0u8; 4]), None);
    }

    #[test]
    fn handle_setup_set_report_0xf5_raises_pairing_complete() {
        let mut path = std::env::temp_dir();
        path.push(format!("rosettapad-test-ep0-{:?}", thread::current().id()));
        {
            let mut f = File::create(&path).unwrap();
            f.write_all(&[0x00, 0x00, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
                .unwrap();
        }
        let mut ep0 = File::options().read(true).write(true).open(&path).unwrap();

        let feature_table = FeatureReportTable::new();
        let flags = RuntimeFlags::new();
        let setup = SetupPacket {
            request_type: 0x21,
            request: super::super::HID_SET_REPORT,
            value: 0x03F5,
            index: 0,
            length: 8,
        };

        handle_setup(&mut ep0, setup, &feature_table, &flags);

        assert!(flags.pairing_complete());
        std::fs::remove_file(&path).ok();
    }
}
