//! Small shared cells used to hand data between plant threads without the
//! two-locks-at-once hazard described in spec.md §5: each cell guards exactly
//! one piece of state and no component holds more than one lock at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Process-wide booleans, set from one writer at a time and observed by any
/// thread. No ordering guarantees beyond "monotonic set-once after initial
/// false" (spec.md §3).
#[derive(Debug, Default)]
pub struct RuntimeFlags {
    running: AtomicBool,
    usb_enabled: AtomicBool,
    mode_switching: AtomicBool,
    pairing_complete: AtomicBool,
}

impl RuntimeFlags {
    pub fn new() -> Self {
        let flags = Self::default();
        flags.running.store(true, Ordering::SeqCst);
        flags
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn usb_enabled(&self) -> bool {
        self.usb_enabled.load(Ordering::SeqCst)
    }

    pub fn set_usb_enabled(&self, enabled: bool) {
        self.usb_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_mode_switching(&self) -> bool {
        self.mode_switching.load(Ordering::SeqCst)
    }

    pub fn set_mode_switching(&self, switching: bool) {
        self.mode_switching.store(switching, Ordering::SeqCst);
    }

    pub fn pairing_complete(&self) -> bool {
        self.pairing_complete.load(Ordering::SeqCst)
    }

    pub fn set_pairing_complete(&self, complete: bool) {
        self.pairing_complete.store(complete, Ordering::SeqCst);
    }
}

/// Single-writer, single-reader rumble slot (right/left motor power).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Rumble {
    pub right: u8,
    pub left: u8,
}

impl Rumble {
    pub fn is_zero(&self) -> bool {
        self.right == 0 && self.left == 0
    }
}

#[derive(Debug, Default)]
pub struct RumbleCell(Mutex<Rumble>);

impl RumbleCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, rumble: Rumble) {
        *self.0.lock().unwrap() = rumble;
    }

    pub fn get(&self) -> Rumble {
        *self.0.lock().unwrap()
    }
}

/// Single-writer, single-reader lightbar slot (R, G, B, player LED bitmap,
/// player brightness).
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Lightbar {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub player_leds: u8,
    pub player_led_brightness: f32,
}

#[derive(Debug, Default)]
pub struct LightbarCell(Mutex<Lightbar>);

impl LightbarCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, lightbar: Lightbar) {
        *self.0.lock().unwrap() = lightbar;
    }

    pub fn get(&self) -> Lightbar {
        *self.0.lock().unwrap()
    }
}
