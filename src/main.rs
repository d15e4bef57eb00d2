use std::env;
use std::error::Error;
use std::process;

use clap::Parser;
use tokio::signal::unix::SignalKind;

use crate::cli::Args;
use crate::orchestrator::Orchestrator;

mod bluetooth;
mod cli;
mod config;
mod ds3;
mod dualsense;
mod error;
mod orchestrator;
mod state;
mod translate;
mod usb;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    env::set_var("RUST_LOG", log_level);
    env_logger::init();
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args = Args::parse();
    if let Err(message) = args.validate() {
        eprintln!("rosettapad: {message}");
        process::exit(1);
    }

    log::info!("Starting rosettapad v{VERSION}");

    let orchestrator = if args.usb {
        Orchestrator::start_adapter(&args)
    } else {
        Orchestrator::start_relay(&args)
    };

    let orchestrator = match orchestrator {
        Ok(orchestrator) => orchestrator,
        Err(err) => {
            log::error!("fatal startup error: {err}");
            process::exit(1);
        }
    };

    let flags = orchestrator.flags();

    let mut sig_term = tokio::signal::unix::signal(SignalKind::terminate())?;
    let mut sig_int = tokio::signal::unix::signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = wait_for_stop(flags) => {
            log::info!("gadget requested shutdown (UNBIND)");
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("received CTRL+C, shutting down");
        }
        _ = sig_int.recv() => {
            log::info!("received SIGINT, shutting down");
        }
        _ = sig_term.recv() => {
            log::info!("received SIGTERM, shutting down");
        }
    }

    orchestrator.shutdown();
    log::info!("rosettapad stopped");
    Ok(())
}

/// Polls the runtime flag so `main`'s `select!` notices an UNBIND-driven
/// shutdown, not just an external signal.
async fn wait_for_stop(flags: std::sync::Arc<state::RuntimeFlags>) {
    while flags.is_running() {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
}
