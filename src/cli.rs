//! Command-line surface for the relay variant (spec.md §6).

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "rosettapad",
    about = "Bridges a DualSense to a PS3 console as a wired DS3",
    version
)]
pub struct Args {
    /// Run as the USB adapter: emulate a DS3 gadget fed from a local DualSense.
    #[arg(long, conflicts_with = "relay")]
    pub usb: bool,

    /// Run as a debug relay: tunnel L2CAP to the console and proxy to HOST.
    #[arg(long, value_name = "HOST", conflicts_with = "usb")]
    pub relay: Option<String>,

    /// TCP port for the debug-relay peer connection.
    #[arg(long, default_value_t = 5555)]
    pub port: u16,

    /// Comma-separated debug logging categories.
    #[arg(long, value_delimiter = ',')]
    pub debug: Vec<String>,

    /// Mount point of the bound FunctionFS instance (adapter mode only).
    #[arg(long, default_value = "/dev/ffs-rosettapad")]
    pub ffs_mount: String,

    /// Enable the touchpad-as-right-stick translation mode.
    #[arg(long)]
    pub touchpad_as_stick: bool,
}

impl Args {
    /// Enforces "exactly one of `--usb` or `--relay <host>`" (spec.md §6),
    /// which `clap`'s `conflicts_with` alone does not guarantee requiredness
    /// for.
    pub fn validate(&self) -> Result<(), String> {
        match (self.usb, self.relay.is_some()) {
            (true, false) | (false, true) => Ok(()),
            (true, true) => Err("--usb and --relay are mutually exclusive".to_string()),
            (false, false) => Err("exactly one of --usb or --relay <host> is required".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_neither_flag() {
        let args = Args {
            usb: false,
            relay: None,
            port: 5555,
            debug: vec![],
            ffs_mount: String::new(),
            touchpad_as_stick: false,
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn validate_accepts_usb_alone() {
        let args = Args {
            usb: true,
            relay: None,
            port: 5555,
            debug: vec![],
            ffs_mount: String::new(),
            touchpad_as_stick: false,
        };
        assert!(args.validate().is_ok());
    }

    #[test]
    fn validate_accepts_relay_alone() {
        let args = Args {
            usb: false,
            relay: Some("192.168.1.2".to_string()),
            port: 5555,
            debug: vec![],
            ffs_mount: String::new(),
            touchpad_as_stick: false,
        };
        assert!(args.validate().is_ok());
    }
}
