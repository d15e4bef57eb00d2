//! Pure field-by-field translation from a DualSense input frame into DS3
//! report mutations (component C4, spec.md §4.4).

use crate::ds3::{battery as ds3_battery, button1, button2, connection, plug};
use crate::dualsense::hid_report::DualSenseInputFrame;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Buttons {
    pub button1: u8,
    pub button2: u8,
    pub ps: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sticks {
    pub lx: u8,
    pub ly: u8,
    pub rx: u8,
    pub ry: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Triggers {
    pub l2: u8,
    pub r2: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShoulderPressures {
    pub l1: u8,
    pub r1: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FacePressures {
    pub triangle: u8,
    pub circle: u8,
    pub cross: u8,
    pub square: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Motion {
    pub accel_x: u16,
    pub accel_y: u16,
    pub accel_z: u16,
    pub gyro_z: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Battery {
    pub plug: u8,
    pub level: u8,
    pub connection: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Translated {
    pub buttons: Buttons,
    pub sticks: Sticks,
    pub triggers: Triggers,
    pub shoulder_pressures: ShoulderPressures,
    pub face_pressures: FacePressures,
    pub motion: Option<Motion>,
    pub battery: Option<Battery>,
}

/// Tracks the origin of a touchpad-as-right-stick gesture (spec.md §4.4,
/// §9 "Touchpad origin tracking").
#[derive(Debug, Clone, Copy, Default)]
pub struct TouchpadOrigin {
    active: bool,
    origin_x: u16,
    origin_y: u16,
}

/// Maps a DualSense d-pad hat (0-8, clockwise from up) onto the DS3
/// direction bitmask. Diagonal hats set two bits; 8 and above set none
/// (spec.md §4.4, §8).
pub fn dpad_mask(hat: u8) -> u8 {
    match hat {
        0 => button1::DPAD_UP,
        1 => button1::DPAD_UP | button1::DPAD_RIGHT,
        2 => button1::DPAD_RIGHT,
        3 => button1::DPAD_RIGHT | button1::DPAD_DOWN,
        4 => button1::DPAD_DOWN,
        5 => button1::DPAD_DOWN | button1::DPAD_LEFT,
        6 => button1::DPAD_LEFT,
        7 => button1::DPAD_LEFT | button1::DPAD_UP,
        _ => 0,
    }
}

fn pressure(pressed: bool) -> u8 {
    if pressed {
        0xFF
    } else {
        0
    }
}

/// `ds3_accel_axis = 512 + ds_accel_axis / 16` (spec.md §4.4), clamped to the
/// 16-bit range the DS3 report field actually carries.
fn scale_accel(axis: i16) -> u16 {
    (512 + axis as i32 / 16).clamp(0, u16::MAX as i32) as u16
}

/// `ds3_gyro_z = 498 + ds_gyro_z / 32`.
fn scale_gyro_z(axis: i16) -> u16 {
    (498 + axis as i32 / 32).clamp(0, u16::MAX as i32) as u16
}

fn map_battery(frame: &DualSenseInputFrame, rumble_nonzero: bool) -> Battery {
    let level = frame.battery_level_percent();
    let charging = frame.battery_charging();

    let level_byte = if charging && level >= 100 {
        ds3_battery::CHARGED
    } else if charging {
        ds3_battery::CHARGING
    } else if level <= 5 {
        ds3_battery::SHUTDOWN
    } else if level <= 15 {
        ds3_battery::DYING
    } else if level <= 35 {
        ds3_battery::LOW
    } else if level <= 60 {
        ds3_battery::MEDIUM
    } else if level <= 85 {
        ds3_battery::HIGH
    } else {
        ds3_battery::FULL
    };

    Battery {
        plug: plug::PLUGGED,
        level: level_byte,
        connection: if rumble_nonzero {
            connection::USB_RUMBLE
        } else {
            connection::USB
        },
    }
}

/// Translates one DualSense frame into DS3 report fields. `touchpad_as_stick`
/// enables the optional touchpad-as-right-stick mode; `origin` carries
/// gesture state across calls and must be the same instance for a given
/// controller across frames. `rumble_nonzero` feeds the battery
/// connection-mode bit (spec.md §4.4).
pub fn translate(
    frame: &DualSenseInputFrame,
    touchpad_as_stick: bool,
    origin: &mut TouchpadOrigin,
    rumble_nonzero: bool,
) -> Translated {
    let mut button1_bits = dpad_mask(frame.dpad_hat());
    if frame.create() {
        button1_bits |= button1::SELECT;
    }
    if frame.options() {
        button1_bits |= button1::START;
    }
    if frame.l3() {
        button1_bits |= button1::L3;
    }
    if frame.r3() {
        button1_bits |= button1::R3;
    }
    if !touchpad_as_stick && frame.touchpad_click() {
        button1_bits |= button1::SELECT;
    }

    let mut button2_bits = 0u8;
    if frame.square() {
        button2_bits |= button2::SQUARE;
    }
    if frame.cross() {
        button2_bits |= button2::CROSS;
    }
    if frame.circle() {
        button2_bits |= button2::CIRCLE;
    }
    if frame.triangle() {
        button2_bits |= button2::TRIANGLE;
    }
    if frame.l1() {
        button2_bits |= button2::L1;
    }
    if frame.r1() {
        button2_bits |= button2::R1;
    }
    if frame.l2_digital() {
        button2_bits |= button2::L2;
    }
    if frame.r2_digital() {
        button2_bits |= button2::R2;
    }

    let mut rx = frame.stick_rx;
    let mut ry = frame.stick_ry;
    if touchpad_as_stick {
        let touching = frame.touch1_active();
        if touching {
            if !origin.active {
                origin.active = true;
                origin.origin_x = frame.touch1_x;
                origin.origin_y = frame.touch1_y;
            }
            let dx = frame.touch1_x as i32 - origin.origin_x as i32;
            let dy = frame.touch1_y as i32 - origin.origin_y as i32;
            rx = (128 + dx * 127 / 400).clamp(0, 255) as u8;
            ry = (128 + dy * 127 / 400).clamp(0, 255) as u8;
        } else {
            origin.active = false;
        }
    }

    Translated {
        buttons: Buttons {
            button1: button1_bits,
            button2: button2_bits,
            ps: frame.ps(),
        },
        sticks: Sticks {
            lx: frame.stick_lx,
            ly: frame.stick_ly,
            rx,
            ry,
        },
        triggers: Triggers {
            l2: frame.trigger_l2,
            r2: frame.trigger_r2,
        },
        shoulder_pressures: ShoulderPressures {
            l1: pressure(frame.l1()),
            r1: pressure(frame.r1()),
        },
        face_pressures: FacePressures {
            triangle: pressure(frame.triangle()),
            circle: pressure(frame.circle()),
            cross: pressure(frame.cross()),
            square: pressure(frame.square()),
        },
        motion: frame.has_motion.then(|| Motion {
            accel_x: scale_accel(frame.accel_x),
            accel_y: scale_accel(frame.accel_y),
            accel_z: scale_accel(frame.accel_z),
            gyro_z: scale_gyro_z(frame.gyro_z),
        }),
        battery: frame.has_battery.then(|| map_battery(frame, rumble_nonzero)),
    }
}

/// Reverse rumble mapping: console output report `(id, dur_weak, pow_weak,
/// dur_strong, pow_strong)` at offsets 0..5 (spec.md §4.4).
pub fn translate_rumble(report: &[u8]) -> Option<(u8, u8)> {
    if report.len() < 5 {
        return None;
    }
    let power_weak = report[2];
    let power_strong = report[4];
    let right = if power_weak != 0 { 0xFF } else { 0 };
    Some((right, power_strong))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_button1(byte: u8) -> DualSenseInputFrame {
        DualSenseInputFrame {
            button1: byte,
            ..Default::default()
        }
    }

    #[test]
    fn dpad_mask_matches_the_clockwise_table() {
        assert_eq!(dpad_mask(0), button1::DPAD_UP);
        assert_eq!(dpad_mask(2), button1::DPAD_RIGHT);
        assert_eq!(dpad_mask(3), button1::DPAD_RIGHT | button1::DPAD_DOWN);
        assert_eq!(dpad_mask(4), button1::DPAD_DOWN);
        assert_eq!(dpad_mask(8), 0);
        assert_eq!(dpad_mask(15), 0);
    }

    #[test]
    fn face_button_pressure_is_synthesized_digitally() {
        let mut origin = TouchpadOrigin::default();
        let frame = frame_with_button1(0x10); // square pressed
        let out = translate(&frame, false, &mut origin, false);
        assert_eq!(out.face_pressures.square, 0xFF);
        assert_eq!(out.face_pressures.cross, 0);
    }

    #[test]
    fn shoulder_pressure_is_synthesized_digitally() {
        let mut origin = TouchpadOrigin::default();
        let frame = DualSenseInputFrame {
            button2: 0x01, // L1 pressed
            ..Default::default()
        };
        let out = translate(&frame, false, &mut origin, false);
        assert_eq!(out.shoulder_pressures.l1, 0xFF);
        assert_eq!(out.shoulder_pressures.r1, 0);
    }

    #[test]
    fn stick_bytes_pass_through_unchanged() {
        let frame = DualSenseInputFrame {
            stick_lx: 0x40,
            stick_ly: 0xC0,
            ..Default::default()
        };
        let mut origin = TouchpadOrigin::default();
        let out = translate(&frame, false, &mut origin, false);
        assert_eq!(out.sticks.lx, 0x40);
        assert_eq!(out.sticks.ly, 0xC0);
    }

    #[test]
    fn battery_mapping_charging_and_full_yields_charged() {
        let frame = DualSenseInputFrame {
            has_battery: true,
            battery_byte: 0x1A, // decile 10 -> 100%, charging bit set
            ..Default::default()
        };
        let mut origin = TouchpadOrigin::default();
        let out = translate(&frame, false, &mut origin, false);
        assert_eq!(out.battery.unwrap().level, ds3_battery::CHARGED);
    }

    #[test]
    fn battery_mapping_charging_below_full_yields_charging() {
        let frame = DualSenseInputFrame {
            has_battery: true,
            battery_byte: 0x15,
            ..Default::default()
        };
        let mut origin = TouchpadOrigin::default();
        let out = translate(&frame, false, &mut origin, false);
        assert_eq!(out.battery.unwrap().level, ds3_battery::CHARGING);
    }

    #[test]
    fn battery_mapping_buckets_without_charging() {
        let cases = [
            (0x00, ds3_battery::SHUTDOWN),
            (0x01, ds3_battery::DYING),
            (0x03, ds3_battery::LOW),
            (0x05, ds3_battery::MEDIUM),
            (0x07, ds3_battery::HIGH),
            (0x0A, ds3_battery::FULL),
        ];
        for (byte, expected) in cases {
            let frame = DualSenseInputFrame {
                has_battery: true,
                battery_byte: byte,
                ..Default::default()
            };
            let mut origin = TouchpadOrigin::default();
            let out = translate(&frame, false, &mut origin, false);
            assert_eq!(out.battery.unwrap().level, expected, "byte={byte:#04x}");
        }
    }

    #[test]
    fn touchpad_origin_is_set_on_first_contact_and_stick_centers() {
        let mut origin = TouchpadOrigin::default();
        let frame = DualSenseInputFrame {
            touch1_context: 0x00, // active (bit 7 clear)
            touch1_x: 500,
            touch1_y: 500,
            ..Default::default()
        };
        let out = translate(&frame, true, &mut origin, false);
        assert_eq!(out.sticks.rx, 128);
        assert_eq!(out.sticks.ry, 128);
        assert!(origin.active);
    }

    #[test]
    fn touchpad_release_clears_origin() {
        let mut origin = TouchpadOrigin {
            active: true,
            origin_x: 500,
            origin_y: 500,
        };
        let frame = DualSenseInputFrame {
            touch1_context: 0x80, // inactive
            stick_rx: 0x99,
            ..Default::default()
        };
        let out = translate(&frame, true, &mut origin, false);
        assert!(!origin.active);
        assert_eq!(out.sticks.rx, 0x99);
    }

    #[test]
    fn rumble_reverse_mapping() {
        let report = [0x01, 0x00, 0xFF, 0x00, 0x80];
        assert_eq!(translate_rumble(&report), Some((0xFF, 0x80)));
        let report_off = [0x01, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(translate_rumble(&report_off), Some((0x00, 0x00)));
    }

    #[test]
    fn rumble_reverse_mapping_rejects_short_reports() {
        assert_eq!(translate_rumble(&[0x01, 0x00]), None);
    }
}
