//! Lightbar IPC file: a flat, key-order-independent JSON object read by the
//! DualSense plant roughly every 500 ms (spec.md §4.6, §6).

use serde::Deserialize;

use crate::error::ConfigError;
use crate::state::Lightbar;

use super::LIGHTBAR_STATE_PATH;

#[derive(Debug, Deserialize)]
struct LightbarState {
    #[serde(default)]
    r: i64,
    #[serde(default)]
    g: i64,
    #[serde(default)]
    b: i64,
    #[serde(default)]
    player_leds: i64,
    #[serde(default = "default_brightness")]
    player_led_brightness: f32,
}

fn default_brightness() -> f32 {
    1.0
}

/// Clamps an out-of-range JSON integer into a valid byte rather than
/// rejecting the whole file (spec.md §6 "tolerant").
fn clamp_byte(value: i64) -> u8 {
    value.clamp(0, u8::MAX as i64) as u8
}

/// Reads and parses the lightbar IPC file. A missing file is not an error;
/// callers should keep the previous lightbar value in that case.
pub fn read() -> Result<Option<Lightbar>, ConfigError> {
    let content = match std::fs::read_to_string(LIGHTBAR_STATE_PATH) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: LIGHTBAR_STATE_PATH.to_string(),
                source,
            })
        }
    };
    let parsed: LightbarState = serde_json::from_str(&content)?;
    Ok(Some(Lightbar {
        r: clamp_byte(parsed.r),
        g: clamp_byte(parsed.g),
        b: clamp_byte(parsed.b),
        player_leds: clamp_byte(parsed.player_leds),
        player_led_brightness: parsed.player_led_brightness.clamp(0.0, 1.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_regardless_of_key_order() {
        let json = r#"{"b": 10, "r": 5, "player_led_brightness": 0.5, "g": 7, "player_leds": 3}"#;
        let parsed: LightbarState = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.r, 5);
        assert_eq!(parsed.g, 7);
        assert_eq!(parsed.b, 10);
        assert_eq!(parsed.player_leds, 3);
        assert_eq!(parsed.player_led_brightness, 0.5);
    }

    #[test]
    fn missing_fields_default_to_zero_and_full_brightness() {
        let parsed: LightbarState = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.r, 0);
        assert_eq!(parsed.player_led_brightness, 1.0);
    }

    #[test]
    fn out_of_range_values_are_clamped_not_rejected() {
        let json = r#"{"r": 999, "g": -5, "player_led_brightness": 4.0}"#;
        let parsed: LightbarState = serde_json::from_str(json).unwrap();
        assert_eq!(clamp_byte(parsed.r), 255);
        assert_eq!(clamp_byte(parsed.g), 0);
        assert_eq!(parsed.player_led_brightness.clamp(0.0, 1.0), 1.0);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let json = r#"{"r": 5, "unexpected_key": "whatever"}"#;
        let parsed: LightbarState = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.r, 5);
    }
}
