//! Wire structures for DualSense Bluetooth HID reports (spec.md §3).
//!
//! The input frame is hand-parsed rather than `packed_struct`-derived because
//! it arrives in several valid truncated lengths (12/28/55/78 bytes,
//! spec.md §4.3); the output frame is always exactly 78 bytes and is built
//! with a packed layout.

use packed_struct::prelude::*;

/// A decoded subset of a DualSense Bluetooth input report. Fields beyond
/// what the source buffer's length supports are left at their default.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DualSenseInputFrame {
    pub stick_lx: u8,
    pub stick_ly: u8,
    pub stick_rx: u8,
    pub stick_ry: u8,
    pub trigger_l2: u8,
    pub trigger_r2: u8,
    pub button1: u8,
    pub button2: u8,
    pub button3: u8,
    pub has_motion: bool,
    pub gyro_x: i16,
    pub gyro_y: i16,
    pub gyro_z: i16,
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,
    pub touch1_context: u8,
    pub touch1_x: u16,
    pub touch1_y: u16,
    pub has_battery: bool,
    pub battery_byte: u8,
}

impl DualSenseInputFrame {
    /// Parses `buf` per spec.md §3/§4.3. Returns `None` if `buf` is shorter
    /// than the minimum core length or does not carry report id 0x31.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < super::MIN_LEN_CORE || buf[0] != super::INPUT_REPORT_ID {
            return None;
        }

        let mut frame = DualSenseInputFrame {
            stick_lx: buf[2],
            stick_ly: buf[3],
            stick_rx: buf[4],
            stick_ry: buf[5],
            trigger_l2: buf[6],
            trigger_r2: buf[7],
            button1: buf[9],
            button2: buf[10],
            button3: buf[11],
            ..Default::default()
        };

        if buf.len() >= 38 {
            frame.touch1_context = buf[34];
            frame.touch1_x = buf[35] as u16 | (((buf[36] & 0x0F) as u16) << 8);
            frame.touch1_y = ((buf[36] >> 4) as u16) | ((buf[37] as u16) << 4);
        }

        if buf.len() >= super::MIN_LEN_MOTION {
            frame.has_motion = true;
            frame.gyro_x = i16::from_le_bytes([buf[16], buf[17]]);
            frame.gyro_y = i16::from_le_bytes([buf[18], buf[19]]);
            frame.gyro_z = i16::from_le_bytes([buf[20], buf[21]]);
            frame.accel_x = i16::from_le_bytes([buf[22], buf[23]]);
            frame.accel_y = i16::from_le_bytes([buf[24], buf[25]]);
            frame.accel_z = i16::from_le_bytes([buf[26], buf[27]]);
        }

        if buf.len() >= super::MIN_LEN_BATTERY {
            frame.has_battery = true;
            frame.battery_byte = buf[54];
        }

        Some(frame)
    }

    /// Low nibble of button1: the d-pad hat, 0-7 clockwise from up, 8 = none.
    pub fn dpad_hat(&self) -> u8 {
        self.button1 & 0x0F
    }

    pub fn square(&self) -> bool {
        self.button1 & 0x10 != 0
    }
    pub fn cross(&self) -> bool {
        self.button1 & 0x20 != 0
    }
    pub fn circle(&self) -> bool {
        self.button1 & 0x40 != 0
    }
    pub fn triangle(&self) -> bool {
        self.button1 & 0x80 != 0
    }

    pub fn l1(&self) -> bool {
        self.button2 & 0x01 != 0
    }
    pub fn r1(&self) -> bool {
        self.button2 & 0x02 != 0
    }
    pub fn l2_digital(&self) -> bool {
        self.button2 & 0x04 != 0
    }
    pub fn r2_digital(&self) -> bool {
        self.button2 & 0x08 != 0
    }
    pub fn create(&self) -> bool {
        self.button2 & 0x10 != 0
    }
    pub fn options(&self) -> bool {
        self.button2 & 0x20 != 0
    }
    pub fn l3(&self) -> bool {
        self.button2 & 0x40 != 0
    }
    pub fn r3(&self) -> bool {
        self.button2 & 0x80 != 0
    }

    pub fn ps(&self) -> bool {
        self.button3 & 0x01 != 0
    }
    pub fn touchpad_click(&self) -> bool {
        self.button3 & 0x02 != 0
    }
    pub fn mute(&self) -> bool {
        self.button3 & 0x04 != 0
    }

    /// Bit 7 of the touch context byte is clear while a finger is in contact.
    pub fn touch1_active(&self) -> bool {
        self.touch1_context & 0x80 == 0
    }

    pub fn battery_level_percent(&self) -> u8 {
        ((self.battery_byte & 0x0F) as u32 * 10).min(100) as u8
    }

    pub fn battery_charging(&self) -> bool {
        self.battery_byte & 0x10 != 0
    }
}

/// The 78-byte DualSense output report, packed per spec.md §3. Bytes not
/// named here (including the unused low nibble of byte 1) default to zero.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Eq)]
#[packed_struct(endian = "lsb", size_bytes = "78")]
pub struct OutputReport {
    #[packed_field(bytes = "0")]
    pub report_id: u8,
    #[packed_field(bytes = "1")]
    pub sequence_tag: u8,
    #[packed_field(bytes = "2")]
    pub tag: u8,
    #[packed_field(bytes = "3")]
    pub flag0: u8,
    #[packed_field(bytes = "4")]
    pub flag1: u8,
    #[packed_field(bytes = "5")]
    pub rumble_right: u8,
    #[packed_field(bytes = "6")]
    pub rumble_left: u8,
    #[packed_field(bytes = "41")]
    pub flag2: u8,
    #[packed_field(bytes = "44")]
    pub lightbar_setup: u8,
    #[packed_field(bytes = "45")]
    pub lightbar_brightness: u8,
    #[packed_field(bytes = "46")]
    pub player_leds: u8,
    #[packed_field(bytes = "47")]
    pub lightbar_r: u8,
    #[packed_field(bytes = "48")]
    pub lightbar_g: u8,
    #[packed_field(bytes = "49")]
    pub lightbar_b: u8,
    #[packed_field(bytes = "74..=77")]
    pub crc: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_short_buffer() {
        assert!(DualSenseInputFrame::parse(&[0x31; 11]).is_none());
    }

    #[test]
    fn parse_rejects_wrong_report_id() {
        assert!(DualSenseInputFrame::parse(&[0x01; 20]).is_none());
    }

    #[test]
    fn parse_core_fields_from_minimum_length_buffer() {
        let mut buf = [0u8; super::super::MIN_LEN_CORE];
        buf[0] = 0x31;
        buf[2] = 0x40;
        buf[3] = 0xC0;
        let frame = DualSenseInputFrame::parse(&buf).unwrap();
        assert_eq!(frame.stick_lx, 0x40);
        assert_eq!(frame.stick_ly, 0xC0);
        assert!(!frame.has_motion);
        assert!(!frame.has_battery);
    }

    #[test]
    fn parse_picks_up_motion_and_battery_at_their_thresholds() {
        let mut buf = [0u8; super::super::FULL_LEN];
        buf[0] = 0x31;
        buf[54] = 0x15;
        let frame = DualSenseInputFrame::parse(&buf).unwrap();
        assert!(frame.has_motion);
        assert!(frame.has_battery);
        assert_eq!(frame.battery_level_percent(), 50);
        assert!(frame.battery_charging());
    }
}
