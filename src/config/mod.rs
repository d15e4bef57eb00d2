//! Filesystem-backed configuration: the pairing record and the lightbar IPC
//! file (spec.md §6). Both are treated as byte-level contracts with external
//! collaborators, not as a general config framework.

pub mod lightbar;
pub mod pairing;

pub const PAIRING_RECORD_PATH: &str = "/etc/rosettapad/pairing.conf";
pub const LIGHTBAR_STATE_PATH: &str = "/tmp/rosettapad/lightbar_state.json";
