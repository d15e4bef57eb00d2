//! DS3-over-USB device emulation: the wire format, constant tables and
//! mutable state the console's enumeration and HID transactions expect.

pub mod feature_reports;
pub mod report_store;

/// USB identity the console's driver matches against (spec.md §6).
pub const VENDOR_ID: u16 = 0x054C;
pub const PRODUCT_ID: u16 = 0x0268;
pub const BCD_DEVICE: u16 = 0x0100;
pub const BCD_USB: u16 = 0x0200;

pub const MANUFACTURER: &str = "Sony";
pub const PRODUCT: &str = "PLAYSTATION(R)3 Controller";
pub const SERIAL: &str = "123456";
pub const CONFIGURATION: &str = "DS3 Config";
pub const INTERFACE: &str = "DS3 Input";
pub const MAX_POWER_MA: u8 = 250; // 500mA in 2mA units, per the USB descriptor encoding

pub const EP_IN_ADDRESS: u8 = 0x81;
pub const EP_OUT_ADDRESS: u8 = 0x02;
pub const EP_MAX_PACKET_SIZE: u16 = 64;
pub const EP_INTERVAL: u8 = 1;

pub const LANGID_EN_US: u16 = 0x0409;

/// Length of the DS3 input report pushed on ep1 at ~250Hz.
pub const INPUT_REPORT_LEN: usize = 49;
pub const INPUT_REPORT_ID: u8 = 0x01;

/// Byte offsets into the 49-byte input report (spec.md §3).
pub mod offset {
    pub const REPORT_ID: usize = 0;
    pub const BUTTONS_1: usize = 2;
    pub const BUTTONS_2: usize = 3;
    pub const PS_BUTTON: usize = 4;
    pub const STICK_LX: usize = 6;
    pub const STICK_LY: usize = 7;
    pub const STICK_RX: usize = 8;
    pub const STICK_RY: usize = 9;
    pub const DPAD_PRESSURE: usize = 10; // 10..=13
    pub const FACE_PRESSURE: usize = 18; // 18..=25
    pub const PLUG_STATUS: usize = 29;
    pub const BATTERY: usize = 30;
    pub const CONNECTION: usize = 31;
    pub const MOTION: usize = 40; // 40..=47, little-endian u16 x4
    pub const TRAILER: usize = 48;
}

/// Bits within button bitfield 1 (byte 2).
pub mod button1 {
    pub const SELECT: u8 = 0x01;
    pub const L3: u8 = 0x02;
    pub const R3: u8 = 0x04;
    pub const START: u8 = 0x08;
    pub const DPAD_UP: u8 = 0x10;
    pub const DPAD_RIGHT: u8 = 0x20;
    pub const DPAD_DOWN: u8 = 0x40;
    pub const DPAD_LEFT: u8 = 0x80;
}

/// Bits within button bitfield 2 (byte 3).
pub mod button2 {
    pub const L2: u8 = 0x01;
    pub const R2: u8 = 0x02;
    pub const L1: u8 = 0x04;
    pub const R1: u8 = 0x08;
    pub const TRIANGLE: u8 = 0x10;
    pub const CIRCLE: u8 = 0x20;
    pub const CROSS: u8 = 0x40;
    pub const SQUARE: u8 = 0x80;
}

/// PS button bit (byte 4).
pub const PS_BIT: u8 = 0x01;

/// Plug/battery/connection constants (spec.md §3). The translator always
/// reports `PLUGGED`, since this bridge only runs while a DualSense is
/// actively connected; `UNPLUGGED` documents the wire value for a detached
/// controller, which this process has no occasion to emit.
pub mod plug {
    pub const PLUGGED: u8 = 0x02;
    pub const UNPLUGGED: u8 = 0x03;
}

/// Full spec.md §3 battery vocabulary. The translator (spec.md §4.4) only
/// ever emits `SHUTDOWN`..`FULL` and `CHARGING`/`CHARGED`; `ERROR` documents
/// a wire value the console's driver may send or expect but that this
/// bridge, always reading a live DualSense, never has reason to produce.
pub mod battery {
    pub const SHUTDOWN: u8 = 0x00;
    pub const DYING: u8 = 0x01;
    pub const LOW: u8 = 0x02;
    pub const MEDIUM: u8 = 0x03;
    pub const HIGH: u8 = 0x04;
    pub const FULL: u8 = 0x05;
    pub const CHARGING: u8 = 0xEE;
    pub const CHARGED: u8 = 0xEF;
    pub const ERROR: u8 = 0xF1;
}

/// Full spec.md §3 connection vocabulary. This bridge always presents the
/// DS3 as wired (`USB`/`USB_RUMBLE`); the `BT_*` values document what a
/// genuine wireless DS3 would send and are never emitted here.
pub mod connection {
    pub const USB_RUMBLE: u8 = 0x10;
    pub const USB: u8 = 0x12;
    pub const BT_RUMBLE: u8 = 0x14;
    pub const BT: u8 = 0x16;
}
