//! Crate-wide error taxonomy.
//!
//! Plant loops never propagate these upward (see the Orchestrator); they are
//! logged and the loop transitions its own local state instead. Only fatal
//! initialization failures reach `main` and turn into a process exit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse pairing record: {0}")]
    PairingFormat(String),
    #[error("could not parse lightbar state: {0}")]
    LightbarFormat(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum UsbError {
    #[error("FunctionFS mount or UDC bind failed: {0}")]
    Attach(String),
    #[error("ep0 control transfer failed: {0}")]
    Control(#[from] std::io::Error),
    #[error("usb gadget shut down")]
    Stopped,
}

#[derive(Debug, Error)]
pub enum DualSenseError {
    #[error("no DualSense controller found (vid/pid 054c/0ce6)")]
    NotFound,
    #[error("hidraw device error: {0}")]
    Hid(#[from] hidapi::HidError),
    #[error("short read from controller: got {0} bytes")]
    ShortRead(usize),
}

#[derive(Debug, Error)]
pub enum BluetoothError {
    #[error("no pairing record on file; pair with the console first")]
    NotPaired,
    #[error("L2CAP connect to PSM {psm:#06x} failed: {source}")]
    Connect {
        psm: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("peer relay I/O error: {0}")]
    Peer(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Usb(#[from] UsbError),
    #[error(transparent)]
    Bluetooth(#[from] BluetoothError),
    #[error("{0}")]
    Fatal(String),
}
