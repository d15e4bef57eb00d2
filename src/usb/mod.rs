//! USB gadget plant (component C5): FunctionFS descriptor publication and
//! the three endpoint loops (spec.md §4.5, §6).

pub mod descriptors;
pub mod gadget;

/// USB control requests this gadget understands on ep0 (spec.md §4.5, §6).
pub const HID_GET_REPORT: u8 = 0x01;
pub const HID_SET_REPORT: u8 = 0x09;
pub const HID_SET_IDLE: u8 = 0x0A;

/// FunctionFS event types, as read from ep0 (`struct usb_functionfs_event`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfsEventType {
    Bind,
    Unbind,
    Enable,
    Disable,
    Setup,
    Suspend,
    Resume,
    Unknown(u8),
}

impl From<u8> for FfsEventType {
    fn from(value: u8) -> Self {
        match value {
            0 => FfsEventType::Bind,
            1 => FfsEventType::Unbind,
            2 => FfsEventType::Enable,
            3 => FfsEventType::Disable,
            4 => FfsEventType::Setup,
            5 => FfsEventType::Suspend,
            6 => FfsEventType::Resume,
            other => FfsEventType::Unknown(other),
        }
    }
}

/// A parsed ep0 SETUP stage (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub fn report_id(&self) -> u8 {
        (self.value & 0x00FF) as u8
    }

    pub fn is_device_to_host(&self) -> bool {
        self.request_type & 0x80 != 0
    }
}

/// Tagged ep0 control-loop event, replacing the source's dispatch-by-integer
/// (spec.md §9 "Polymorphism").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbEvent {
    Setup(SetupPacket),
    Enable,
    Disable,
    Unbind,
    Other(FfsEventType),
}

/// Tagged HID request, dispatched from a `Setup` event's `bRequest` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HidRequest {
    GetReport { id: u8, length: u16 },
    SetReport { id: u8, length: u16 },
    SetIdle,
    Other(u8),
}

impl From<SetupPacket> for HidRequest {
    fn from(setup: SetupPacket) -> Self {
        match setup.request {
            HID_GET_REPORT => HidRequest::GetReport {
                id: setup.report_id(),
                length: setup.length,
            },
            HID_SET_REPORT => HidRequest::SetReport {
                id: setup.report_id(),
                length: setup.length,
            },
            HID_SET_IDLE => HidRequest::SetIdle,
            other => HidRequest::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_packet_extracts_report_id_from_low_byte_of_value() {
        let setup = SetupPacket {
            request_type: 0xA1,
            request: HID_GET_REPORT,
            value: 0x0301,
            index: 0,
            length: 64,
        };
        assert_eq!(setup.report_id(), 0x01);
        assert!(setup.is_device_to_host());
    }

    #[test]
    fn hid_request_from_setup_dispatches_by_brequest() {
        let setup = SetupPacket {
            request_type: 0x21,
            request: HID_SET_REPORT,
            value: 0x03F5,
            index: 0,
            length: 8,
        };
        assert_eq!(
            HidRequest::from(setup),
            HidRequest::SetReport { id: 0xF5, length: 8 }
        );
    }
}
