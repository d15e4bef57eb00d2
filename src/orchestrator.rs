//! Lifecycle owner (component C8): starts the plant threads for the
//! selected mode, and drives a coordinated shutdown (spec.md §4.8, §5).

use std::fs;
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

use crate::bluetooth::relay::{self, Relay};
use crate::cli::Args;
use crate::ds3::feature_reports::FeatureReportTable;
use crate::ds3::report_store::ReportStore;
use crate::dualsense::driver as dualsense_driver;
use crate::error::OrchestratorError;
use crate::state::{LightbarCell, RumbleCell, RuntimeFlags};
use crate::usb::gadget::{self, Gadget};

const SHUTDOWN_DRAIN: Duration = Duration::from_secs(1);
const LOCAL_BT_ADDRESS_PATH: &str = "/sys/class/bluetooth/hci0/address";

pub struct Orchestrator {
    flags: Arc<RuntimeFlags>,
    handles: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    /// Starts the adapter: USB gadget plant plus DualSense plant, wired
    /// through the shared Report Store, rumble cell and lightbar cell
    /// (spec.md §4.8 control flow).
    pub fn start_adapter(args: &Args) -> Result<Self, OrchestratorError> {
        let flags = Arc::new(RuntimeFlags::new());
        let report_store = Arc::new(ReportStore::new());
        let rumble = Arc::new(RumbleCell::new());
        let lightbar = Arc::new(LightbarCell::new());
        let feature_table = Arc::new(FeatureReportTable::new());

        if let Ok(address) = fs::read_to_string(LOCAL_BT_ADDRESS_PATH) {
            if let Some(mac) = crate::config::pairing::parse_mac(address.trim()) {
                feature_table.set_local_bt_mac(mac);
            } else {
                warn!("could not parse local Bluetooth address {address:?}");
            }
        } else {
            warn!("could not read {LOCAL_BT_ADDRESS_PATH}; local MAC left at its default");
        }

        let gadget = Gadget::open(&args.ffs_mount).map_err(OrchestratorError::from)?;
        let dualsense_device: Arc<Mutex<Option<hidapi::HidDevice>>> = Arc::new(Mutex::new(None));

        let mut handles = Vec::new();

        {
            let flags = flags.clone();
            let feature_table = feature_table.clone();
            let rumble = rumble.clone();
            let ep0 = gadget.ep0;
            handles.push(thread::spawn(move || {
                gadget::run_control_loop(ep0, feature_table, rumble, flags);
            }));
        }
        {
            let flags = flags.clone();
            let report_store = report_store.clone();
            let ep1 = gadget.ep1;
            handles.push(thread::spawn(move || {
                gadget::run_input_pump(ep1, report_store, flags);
            }));
        }
        {
            let flags = flags.clone();
            let rumble = rumble.clone();
            let ep2 = gadget.ep2;
            handles.push(thread::spawn(move || {
                gadget::run_output_sink(ep2, rumble, flags);
            }));
        }
        {
            let flags = flags.clone();
            let report_store = report_store.clone();
            let rumble = rumble.clone();
            let device = dualsense_device.clone();
            let touchpad_as_stick = args.touchpad_as_stick;
            handles.push(thread::spawn(move || {
                dualsense_driver::run_reader(flags, report_store, rumble, device, touchpad_as_stick);
            }));
        }
        {
            let flags = flags.clone();
            let rumble = rumble.clone();
            let lightbar = lightbar.clone();
            let device = dualsense_device.clone();
            handles.push(thread::spawn(move || {
                dualsense_driver::run_writer(flags, rumble, lightbar, device);
            }));
        }

        info!("adapter mode started");
        Ok(Self { flags, handles })
    }

    /// Starts the debug-relay mode: loads pairing, connects the two L2CAP
    /// channels, then relays to a TCP peer (spec.md §4.7, §4.8).
    pub fn start_relay(args: &Args) -> Result<Self, OrchestratorError> {
        let flags = Arc::new(RuntimeFlags::new());
        let relay = Arc::new(Relay::new());
        relay.load_pairing();

        let host = args
            .relay
            .as_ref()
            .ok_or_else(|| OrchestratorError::Fatal("relay mode requires --relay <host>".to_string()))?;

        let (control, interrupt) = relay
            .connect()
            .map_err(|err| OrchestratorError::Fatal(format!("relay connect failed: {err}")))?;
        let control = Arc::new(control);
        let interrupt = Arc::new(interrupt);

        let peer_stream = TcpStream::connect((host.as_str(), args.port))
            .map_err(|err| OrchestratorError::Fatal(format!("failed to reach relay peer: {err}")))?;
        let peer_write = Arc::new(Mutex::new(
            peer_stream
                .try_clone()
                .map_err(|err| OrchestratorError::Fatal(err.to_string()))?,
        ));
        let peer_read = Arc::new(Mutex::new(peer_stream));

        let mut handles = Vec::new();
        {
            let flags = flags.clone();
            let control = control.clone();
            let interrupt = interrupt.clone();
            let peer = peer_write.clone();
            handles.push(thread::spawn(move || {
                relay::run_input_thread(flags, control, interrupt, peer);
            }));
        }
        {
            let flags = flags.clone();
            let control = control.clone();
            let interrupt = interrupt.clone();
            let peer = peer_read.clone();
            handles.push(thread::spawn(move || {
                relay::run_output_thread(flags, control, interrupt, peer);
            }));
        }

        info!("relay mode started");
        Ok(Self { flags, handles })
    }

    pub fn flags(&self) -> Arc<RuntimeFlags> {
        self.flags.clone()
    }

    /// Signals all plants to stop and waits up to [`SHUTDOWN_DRAIN`] before
    /// returning (spec.md §4.8, §5 "Cancellation").
    pub fn shutdown(mut self) {
        self.flags.stop();
        thread::sleep(SHUTDOWN_DRAIN);
        for handle in self.handles.drain(..) {
            if let Err(err) = handle.join() {
                error!("plant thread panicked during shutdown: {err:?}");
            }
        }
        info!("rosettapad stopped");
    }
}
