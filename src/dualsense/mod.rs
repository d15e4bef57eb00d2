//! DualSense-over-Bluetooth input decoding and output encoding, and the
//! plant that owns the hidraw device (components C3 and C6).

pub mod codec;
pub mod driver;
pub mod hid_report;

pub const VENDOR_ID: u16 = 0x054C;
pub const PRODUCT_ID: u16 = 0x0CE6;

pub const INPUT_REPORT_ID: u8 = 0x31;
pub const OUTPUT_REPORT_ID: u8 = 0x31;
pub const OUTPUT_REPORT_LEN: usize = 78;

/// Minimum frame length for each progressively richer subset of fields
/// (spec.md §4.3).
pub const MIN_LEN_CORE: usize = 12;
pub const MIN_LEN_MOTION: usize = 28;
pub const MIN_LEN_BATTERY: usize = 55;
pub const FULL_LEN: usize = 78;

/// The constant byte prefixed to an output report's payload before computing
/// its CRC-32 (spec.md §3, §6).
pub const OUTPUT_CRC_SEED: u8 = 0xA2;
