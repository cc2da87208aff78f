//! USB Sentry CLI
//!
//! Allow-list based USB device authorization monitor.

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use usb_sentry::{
    allowlist::{AllowList, AllowListStore},
    config::Config,
    monitor::{EventLog, Monitor, MonitorOptions},
    notify::{EmailNotifier, Notifier},
    register::{self, RegisterOutcome},
    source::PlatformSource,
    VERSION,
};

#[derive(Parser)]
#[command(name = "usb-sentry")]
#[command(version = VERSION)]
#[command(about = "Allow-list based USB device authorization monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor connected USB devices against an allow-list
    Monitor {
        /// Path to the authorized-device CSV file
        allow_list: PathBuf,

        /// Seconds between poll passes (overrides the config file)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Register a connected device into the allow-list
    Register {
        /// Path to the authorized-device CSV file (created if absent)
        allow_list: PathBuf,

        /// Operator recorded on the new entry
        #[arg(long, default_value = "admin")]
        added_by: String,
    },

    /// Print the entries of an allow-list
    List {
        /// Path to the authorized-device CSV file
        allow_list: PathBuf,
    },

    /// Show the resolved configuration
    Config,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Monitor { allow_list, interval } => cmd_monitor(&allow_list, interval),
        Commands::Register { allow_list, added_by } => cmd_register(&allow_list, &added_by),
        Commands::List { allow_list } => cmd_list(&allow_list),
        Commands::Config => cmd_config(),
    }
}

fn cmd_monitor(path: &Path, interval: Option<u64>) -> ExitCode {
    if !path.is_file() {
        error!("allow-list file {} not found", path.display());
        return ExitCode::FAILURE;
    }

    // Startup errors are fatal: without a trusted allow-list and
    // configuration, authorization decisions cannot be trusted.
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("could not load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.ensure_directories() {
        warn!("could not create data directories: {e}");
    }

    let store = AllowListStore::new(path);
    let entries = match store.load() {
        Ok(entries) => entries,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let allow_list = AllowList::new(entries);
    info!(
        "loaded {} authorized device(s) from {}",
        allow_list.len(),
        path.display()
    );

    let notifier: Option<Box<dyn Notifier>> = config
        .email
        .clone()
        .map(|email| Box::new(EmailNotifier::new(email)) as Box<dyn Notifier>);
    let event_log = EventLog::new(&config.event_log_path);
    let options = MonitorOptions {
        poll_interval: interval
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.poll_interval()),
    };

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    println!("USB Sentry v{VERSION}");
    println!("Press Ctrl+C to stop monitoring");
    println!();

    let mut monitor = Monitor::new(PlatformSource::new(), allow_list, event_log, notifier, options);
    monitor.run(&running);

    ExitCode::SUCCESS
}

fn cmd_register(path: &Path, added_by: &str) -> ExitCode {
    println!("USB Device Registration");
    println!("-----------------------");
    println!("Allow-list: {}", path.display());
    println!();

    let store = AllowListStore::new(path);
    // Registration wants serials for the audit trail, so the slower
    // serial-probing enumeration is worth it here.
    let source = PlatformSource::with_serial_probe();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    match register::run(&source, &store, added_by, &mut input, &mut out) {
        Ok(RegisterOutcome::Registered(entry)) => {
            println!();
            println!(
                "Authorized {} ({}) for department '{}'.",
                entry.identity.display_name(),
                entry.identity.key(),
                entry.department
            );
            ExitCode::SUCCESS
        }
        Ok(RegisterOutcome::Aborted) | Ok(RegisterOutcome::Declined) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_list(path: &Path) -> ExitCode {
    let store = AllowListStore::new(path);
    match store.load() {
        Ok(entries) => {
            if entries.is_empty() {
                println!("No authorized devices in {}", path.display());
                return ExitCode::SUCCESS;
            }

            println!("{} authorized device(s) in {}:", entries.len(), path.display());
            for entry in &entries {
                let department = if entry.department.is_empty() {
                    String::new()
                } else {
                    format!(", {}", entry.department)
                };
                println!(
                    "  {}  {} (s/n {}) - added {} by {}{}",
                    entry.identity.key(),
                    entry.identity.display_name(),
                    entry.identity.serial_number,
                    entry.date_added,
                    entry.added_by,
                    department
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_config() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // First run: materialize the defaults on disk so the operator has a
    // file to put the SMTP settings into.
    if !Config::config_path().exists() {
        if let Err(e) = config.save() {
            eprintln!("Error: could not write default configuration: {e}");
            return ExitCode::FAILURE;
        }
        println!("Wrote default configuration to {}", Config::config_path().display());
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {}", Config::config_path().display());
    println!();
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}
