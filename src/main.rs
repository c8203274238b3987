use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use droidbridge::listing::types::{LogRecord, Severity};
use droidbridge::log_stream::StreamFilter;
use droidbridge::mutations::Outcome;
use droidbridge::remote_control::KeyCode;
use droidbridge::{Bridge, BridgeConfig, BridgeError};
use log::{error, info, warn};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "droidbridge")]
#[command(version = "0.0.2")]
#[command(about = "Drive Android devices through the debug bridge")]
struct Args {
    /// TOML configuration file. Replaces the connection flags below when given.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Device to operate on. Required when more than one device is attached.
    #[arg(long, short = 's', env = "ANDROID_SERIAL", global = true)]
    serial: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(flatten)]
    bridge: BridgeConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover attached devices
    Devices,
    /// Extended information about one device
    Info,
    /// Attach a device over the network
    Connect { host: String, port: Option<u16> },
    /// Detach a network device
    Disconnect { address: String },
    /// List a remote directory
    Ls {
        #[arg(default_value = "/sdcard")]
        path: String,
        /// Include hidden entries
        #[arg(short = 'a', long)]
        all: bool,
    },
    /// Upload a file
    Push { local: PathBuf, remote: String },
    /// Download a file
    Pull { remote: String, local: PathBuf },
    /// Delete a remote file or directory
    Rm {
        path: String,
        #[arg(short = 'r', long)]
        recursive: bool,
    },
    /// Rename or move a remote path
    Mv { from: String, to: String },
    /// Create a remote directory and its parents
    Mkdir { path: String },
    /// List installed applications
    Apps {
        /// List system packages instead of third-party ones
        #[arg(long)]
        system: bool,
    },
    /// Install an APK
    Install { apk: PathBuf },
    Uninstall { package: String },
    /// Launch an application
    Start { package: String },
    /// Force-stop an application
    Stop { package: String },
    /// Clear an application's data
    Clear { package: String },
    /// Running application processes, or whether one package is running
    Running { package: Option<String> },
    /// Process table, or one process
    Ps { pid: Option<u32> },
    /// Signal a process
    Kill {
        pid: u32,
        /// Send SIGKILL instead of SIGTERM
        #[arg(short = 'f', long)]
        force: bool,
    },
    /// Stream the device log until interrupted
    Logcat {
        /// Lowest severity shown (V, D, I, W, E, F)
        #[arg(short = 'l', long, default_value = "V")]
        level: Severity,
        /// Only this tag
        #[arg(short = 't', long)]
        tag: Option<String>,
    },
    /// Clear the device log buffer
    LogcatClear,
    Tap { x: u32, y: u32 },
    Swipe {
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        /// Duration in milliseconds
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Type text into the focused field
    Text { text: String },
    /// Send a key event by name (home, back, volume_up) or code
    Key { key: KeyCode },
    /// Save a screenshot
    Screenshot {
        #[arg(default_value = "screenshot.png")]
        local: PathBuf,
    },
    ScreenSize,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(level);
    }
    logger.format_target(false).init();

    let config = match &args.config {
        Some(path) => match BridgeConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Unable to import configuration from {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => args.bridge.clone(),
    };

    let bridge = match Bridge::new(config) {
        Ok(bridge) => bridge,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    match run(&bridge, args.serial, args.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            std::process::exit(if e.is_transport_failure() { 2 } else { 1 });
        }
    }
}

/// Runs one command. `Ok(false)` means the device refused the operation.
async fn run(bridge: &Bridge, serial: Option<String>, command: Command) -> Result<bool, BridgeError> {
    match command {
        Command::Devices => {
            let devices = bridge.discover_devices().await;
            if devices.is_empty() {
                warn!("No devices found");
            }
            print_json(&devices);
            Ok(true)
        }
        Command::Connect { host, port } => {
            let connected = bridge.connect_network(&host, port).await?;
            print_json(&connected);
            Ok(connected)
        }
        Command::Disconnect { address } => {
            let detached = bridge.disconnect_network(&address).await?;
            print_json(&detached);
            Ok(detached)
        }
        Command::Logcat { level, tag } => {
            let serial = target(bridge, serial).await?;
            stream_log(bridge, &serial, StreamFilter::new(level, tag)).await?;
            Ok(true)
        }
        command => {
            let serial = target(bridge, serial).await?;
            device_command(bridge, &serial, command).await
        }
    }
}

async fn device_command(bridge: &Bridge, serial: &str, command: Command) -> Result<bool, BridgeError> {
    let outcome = match command {
        Command::Info => {
            print_json(&bridge.extended_device_info(serial).await?);
            return Ok(true);
        }
        Command::Ls { path, all } => {
            let listing = bridge.list_directory(serial, &path, all).await?;
            let clean = listing.rejection.is_none();
            print_json(&listing);
            return Ok(clean);
        }
        Command::Apps { system } => {
            print_json(&bridge.list_apps(serial, system).await?);
            return Ok(true);
        }
        Command::Running { package: Some(package) } => {
            let running = bridge.is_running(serial, &package).await?;
            print_json(&running);
            return Ok(true);
        }
        Command::Running { package: None } => {
            let mut running: Vec<_> = bridge.running_set(serial).await?.into_iter().collect();
            running.sort();
            print_json(&running);
            return Ok(true);
        }
        Command::Ps { pid: Some(pid) } => {
            let process = bridge.process_info(serial, pid).await?;
            let found = process.is_some();
            print_json(&process);
            return Ok(found);
        }
        Command::Ps { pid: None } => {
            print_json(&bridge.list_processes(serial).await?);
            return Ok(true);
        }
        Command::ScreenSize => {
            print_json(&bridge.screen_size(serial).await?);
            return Ok(true);
        }
        Command::Push { local, remote } => bridge.push(serial, &local, &remote).await?,
        Command::Pull { remote, local } => bridge.pull(serial, &remote, &local).await?,
        Command::Rm { path, recursive } => bridge.delete(serial, &path, recursive).await?,
        Command::Mv { from, to } => bridge.rename(serial, &from, &to).await?,
        Command::Mkdir { path } => bridge.make_directory(serial, &path).await?,
        Command::Install { apk } => bridge.install_apk(serial, &apk).await?,
        Command::Uninstall { package } => bridge.uninstall(serial, &package).await?,
        Command::Start { package } => bridge.start_app(serial, &package).await?,
        Command::Stop { package } => bridge.stop_app(serial, &package).await?,
        Command::Clear { package } => bridge.clear_app_data(serial, &package).await?,
        Command::Kill { pid, force: false } => bridge.kill(serial, pid).await?,
        Command::Kill { pid, force: true } => bridge.force_kill(serial, pid).await?,
        Command::LogcatClear => bridge.clear_log_buffer(serial).await?,
        Command::Tap { x, y } => bridge.tap(serial, x, y).await?,
        Command::Swipe { x1, y1, x2, y2, duration } => {
            bridge.swipe(serial, (x1, y1), (x2, y2), duration).await?
        }
        Command::Text { text } => bridge.send_text(serial, &text).await?,
        Command::Key { key } => bridge.send_key(serial, key).await?,
        Command::Screenshot { local } => bridge.screenshot(serial, &local).await?,
        Command::Devices
        | Command::Connect { .. }
        | Command::Disconnect { .. }
        | Command::Logcat { .. } => {
            return Err(BridgeError::InvalidOperation(
                "not a device command".to_string(),
            ))
        }
    };
    report(&outcome);
    Ok(outcome.is_success())
}

/// The explicit serial, or the only attached device.
async fn target(bridge: &Bridge, serial: Option<String>) -> Result<String, BridgeError> {
    if let Some(serial) = serial {
        return Ok(serial);
    }
    let sessions = bridge.registry().refresh().await?;
    match sessions.as_slice() {
        [only] => Ok(only.serial().to_string()),
        [] => Err(BridgeError::InvalidOperation("no device attached".to_string())),
        _ => Err(BridgeError::InvalidOperation(
            "more than one device attached, pass --serial".to_string(),
        )),
    }
}

async fn stream_log(bridge: &Bridge, serial: &str, filter: StreamFilter) -> Result<(), BridgeError> {
    let mut handle = bridge
        .start_log_stream(serial, filter, |record| match record {
            LogRecord::Entry(entry) => println!("{}", entry),
            LogRecord::Raw(line) => println!("{}", line),
        })
        .await?;
    info!("[{}] streaming log, press Ctrl-C to stop", serial);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                if handle.is_finished() {
                    warn!("[{}] log stream ended", serial);
                    break;
                }
            }
        }
    }
    bridge.stop_log_stream(&mut handle).await;
    Ok(())
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Success => info!("{}", outcome),
        Outcome::FallbackApplied(_) => warn!("{}", outcome),
        Outcome::Failed(_) => error!("{}", outcome),
    }
    print_json(outcome);
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Unable to serialize result: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_key_and_level() {
        let args = Args::try_parse_from(["droidbridge", "-s", "emulator-5554", "key", "home"]).unwrap();
        assert_eq!(args.serial.as_deref(), Some("emulator-5554"));
        assert!(matches!(args.command, Command::Key { key: KeyCode::Home }));

        let args = Args::try_parse_from(["droidbridge", "logcat", "-l", "W", "-t", "ActivityManager"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Logcat { level: Severity::Warn, tag: Some(_) }
        ));
        assert_eq!(args.bridge, BridgeConfig::default());
    }
}
