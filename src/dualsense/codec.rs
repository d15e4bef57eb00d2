//! CRC-32 and the DualSense input/output codec (component C3).
//!
//! The CRC is the reflected IEEE-802.3 polynomial (0xEDB88320), computed
//! over the seed byte 0xA2 followed by the report bytes that precede the
//! CRC field itself.

use crc::{Crc, CRC_32_ISO_HDLC};
use packed_struct::PackedStruct;

use super::hid_report::{DualSenseInputFrame, OutputReport};
use super::{OUTPUT_CRC_SEED, OUTPUT_REPORT_ID, OUTPUT_REPORT_LEN};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

fn crc32_seeded(payload: &[u8]) -> u32 {
    let mut digest = CRC32.digest();
    digest.update(&[OUTPUT_CRC_SEED]);
    digest.update(payload);
    digest.finalize()
}

/// Decodes a DualSense Bluetooth input report. Never allocates.
pub fn decode(buf: &[u8]) -> Option<DualSenseInputFrame> {
    DualSenseInputFrame::parse(buf)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputFields {
    pub rumble_right: u8,
    pub rumble_left: u8,
    pub lightbar_r: u8,
    pub lightbar_g: u8,
    pub lightbar_b: u8,
    pub player_leds: u8,
}

/// Owns the private, wrapping 4-bit output sequence counter. Exactly one
/// DualSense writer thread may hold this (spec.md §5).
pub struct Encoder {
    sequence: u8,
}

impl Encoder {
    pub fn new() -> Self {
        Self { sequence: 0 }
    }

    /// Builds a 78-byte output frame and increments the sequence counter
    /// after emission (spec.md §4.3).
    pub fn encode(&mut self, fields: OutputFields) -> [u8; OUTPUT_REPORT_LEN] {
        let report = OutputReport {
            report_id: OUTPUT_REPORT_ID,
            sequence_tag: self.sequence << 4,
            tag: 0x10,
            flag0: 0x03,
            flag1: 0x0C,
            rumble_right: fields.rumble_right,
            rumble_left: fields.rumble_left,
            flag2: 0x02,
            lightbar_setup: 0x02,
            lightbar_brightness: 0xFF,
            player_leds: fields.player_leds,
            lightbar_r: fields.lightbar_r,
            lightbar_g: fields.lightbar_g,
            lightbar_b: fields.lightbar_b,
            crc: 0,
        };
        let mut bytes = report.pack().expect("fixed-layout output report always packs");

        let crc = crc32_seeded(&bytes[0..74]);
        bytes[74..78].copy_from_slice(&crc.to_le_bytes());

        self.sequence = (self.sequence + 1) % 16;
        bytes
    }

    pub fn sequence(&self) -> u8 {
        self.sequence
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifies the trailing CRC-32 of a fully-built output frame. Used by
/// tests; the input decoder never checks a CRC (spec.md §7, taxonomy 6).
pub fn crc_is_valid(frame: &[u8; OUTPUT_REPORT_LEN]) -> bool {
    let expected = crc32_seeded(&frame[0..74]);
    let actual = u32::from_le_bytes(frame[74..78].try_into().unwrap());
    expected == actual
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_invalid_frames() {
        assert!(decode(&[0x00; 20]).is_none());
        assert!(decode(&[0x31; 4]).is_none());
    }

    #[test]
    fn encode_produces_a_bit_exact_crc() {
        let mut encoder = Encoder::new();
        let frame = encoder.encode(OutputFields::default());
        assert!(crc_is_valid(&frame));
    }

    #[test]
    fn sequence_counter_increments_mod_16_after_each_emission() {
        let mut encoder = Encoder::new();
        for expected in 0..20u8 {
            assert_eq!(encoder.sequence(), expected % 16);
            encoder.encode(OutputFields::default());
        }
    }

    #[test]
    fn encode_carries_rumble_and_lightbar_fields() {
        let mut encoder = Encoder::new();
        let frame = encoder.encode(OutputFields {
            rumble_right: 0xFF,
            rumble_left: 0x80,
            lightbar_r: 1,
            lightbar_g: 2,
            lightbar_b: 3,
            player_leds: 0x04,
        });
        assert_eq!(frame[5], 0xFF);
        assert_eq!(frame[6], 0x80);
        assert_eq!(frame[47], 1);
        assert_eq!(frame[48], 2);
        assert_eq!(frame[49], 3);
        assert_eq!(frame[46], 0x04);
        assert!(crc_is_valid(&frame));
    }
}
