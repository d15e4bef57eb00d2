//! The pairing record: `PS3_MAC` and `LOCAL_MAC`, persisted as key=value text
//! at [`super::PAIRING_RECORD_PATH`] (spec.md §3, §6).

use std::fs;
use std::io::Read;

use crate::error::ConfigError;

use super::PAIRING_RECORD_PATH;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairingRecord {
    pub ps3_mac: Option<[u8; 6]>,
    pub local_mac: Option<[u8; 6]>,
}

impl PairingRecord {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(PAIRING_RECORD_PATH)
    }

    /// Loads the record, falling back to an empty one if the file is absent
    /// or unparseable rather than failing the caller.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    fn load_from(path: &str) -> Result<Self, ConfigError> {
        let file = fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;

        // Bounded read: this is a small hand-written file, not an attacker
        // controlled upload, but there is no reason to trust its size.
        const MAX_SIZE: u64 = 64 * 1024;
        let mut content = String::new();
        file.take(MAX_SIZE)
            .read_to_string(&mut content)
            .map_err(|source| ConfigError::Io {
                path: path.to_string(),
                source,
            })?;

        let mut record = PairingRecord::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::PairingFormat(line.to_string()));
            };
            let mac = parse_mac(value.trim())
                .ok_or_else(|| ConfigError::PairingFormat(value.to_string()))?;
            match key.trim() {
                "PS3_MAC" => record.ps3_mac = Some(mac),
                "LOCAL_MAC" => record.local_mac = Some(mac),
                _ => {}
            }
        }
        Ok(record)
    }

    pub fn with_ps3_mac(mut self, mac: [u8; 6]) -> Self {
        self.ps3_mac = Some(mac);
        self
    }

    pub fn with_local_mac(mut self, mac: [u8; 6]) -> Self {
        self.local_mac = Some(mac);
        self
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(PAIRING_RECORD_PATH)
    }

    fn save_to(&self, path: &str) -> Result<(), ConfigError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: path.to_string(),
                source,
            })?;
        }
        let mut content = String::from("# rosettapad pairing record\n");
        if let Some(mac) = self.ps3_mac {
            content.push_str(&format!("PS3_MAC={}\n", format_mac(mac)));
        }
        if let Some(mac) = self.local_mac {
            content.push_str(&format!("LOCAL_MAC={}\n", format_mac(mac)));
        }
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })
    }
}

pub fn format_mac(mac: [u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

pub fn parse_mac(s: &str) -> Option<[u8; 6]> {
    let mut mac = [0u8; 6];
    let mut parts = s.split(':');
    for slot in mac.iter_mut() {
        let part = parts.next()?;
        *slot = u8::from_str_radix(part, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_and_parse_round_trip() {
        let mac = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
        let formatted = format_mac(mac);
        assert_eq!(formatted, "AA:BB:CC:DD:EE:FF");
        assert_eq!(parse_mac(&formatted), Some(mac));
    }

    #[test]
    fn parse_mac_rejects_malformed_input() {
        assert_eq!(parse_mac("AA:BB:CC"), None);
        assert_eq!(parse_mac("not-a-mac"), None);
        assert_eq!(parse_mac("AA:BB:CC:DD:EE:FF:00"), None);
    }

    #[test]
    fn save_and_load_round_trip_an_identical_mac() {
        let dir = std::env::temp_dir().join(format!(
            "rosettapad-pairing-test-{:?}",
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pairing.conf");
        let path = path.to_str().unwrap();

        let record = PairingRecord::default().with_ps3_mac([1, 2, 3, 4, 5, 6]);
        record.save_to(path).unwrap();
        let loaded = PairingRecord::load_from(path).unwrap();
        assert_eq!(loaded.ps3_mac, Some([1, 2, 3, 4, 5, 6]));

        std::fs::remove_dir_all(&dir).ok();
    }
}
