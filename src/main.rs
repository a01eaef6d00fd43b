//! `audioswitch` - Cycle audio devices from keyboard shortcuts
//!
//! `audioswitch daemon` runs the background service. Desktop keybindings call
//! `audioswitch cycle output` / `audioswitch cycle input`, which forward the
//! press to the daemon over its control socket. `set-cycled` and `reorder` go
//! through the daemon too, so it stays the only writer of the device list; with
//! no daemon running they edit the file directly.

use anyhow::{Context, Result, bail};
use audioswitch::{
    config::{ConfigManager, Direction},
    controller::AppController,
    error::{AudioSwitchError, get_user_friendly_error},
    mixer::{Mixer, PactlMixer},
    notify::notifier_for,
    registry::{ConfigStore, DeviceRegistry, PreferenceChange},
    utils::{self, ControlCommand, ControlSocket},
};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Cycle the default audio input/output device from keyboard shortcuts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "AUDIOSWITCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Path to the daemon control socket
    #[arg(long, env = "AUDIOSWITCH_SOCKET", global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the background service
    Daemon,
    #[command(flatten)]
    Client(ClientCommand),
}

#[derive(Subcommand, Debug)]
enum ClientCommand {
    /// Switch to the next cycled device (bind this to a shortcut)
    Cycle {
        /// input or output
        direction: Direction,
    },
    /// Stop the running daemon
    Stop,
    /// List present devices in cycling order
    List {
        /// input or output
        direction: Direction,
    },
    /// Include or exclude a device from cycling
    SetCycled {
        /// input or output
        direction: Direction,
        /// Device name as shown by `list`
        name: String,
        /// true or false
        #[arg(action = ArgAction::Set)]
        cycled: bool,
    },
    /// Move a device to a new position in the cycling order
    Reorder {
        /// input or output
        direction: Direction,
        /// Device name as shown by `list`
        name: String,
        /// 1-based position among present devices
        position: usize,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = match args.config {
        Some(path) => ConfigManager::new(path),
        None => ConfigManager::from_default_location(),
    };
    let socket_path = args.socket.unwrap_or_else(utils::default_socket_path);

    let result = match args.command {
        Command::Daemon => run_daemon(config_manager, &socket_path),
        Command::Client(command) => {
            utils::init_cli_logging().context("Failed to initialize logging")?;
            run_client(command, config_manager, &socket_path)
        }
    };

    if let Err(e) = &result {
        if let Some(app_error) = e.downcast_ref::<AudioSwitchError>() {
            eprintln!("{}", get_user_friendly_error(app_error));
        }
    }
    result
}

/// Run the daemon until `stop` or a fatal error
fn run_daemon(config_manager: ConfigManager, socket_path: &Path) -> Result<()> {
    utils::init_logging().context("Failed to initialize logging system")?;

    // Bind before touching the mixer so a second daemon exits immediately
    let socket = ControlSocket::bind(socket_path).context("Failed to bind control socket")?;

    let config = config_manager
        .load_logged()
        .context("Failed to load application configuration")?;

    let registry = DeviceRegistry::new(Arc::new(ConfigStore::new(config_manager)));
    let mixer: Arc<dyn Mixer> = Arc::new(PactlMixer::new());
    let notifier = notifier_for(config.preferences.feedback);
    let mut controller = AppController::new(registry, mixer, notifier, config.preferences);

    // Served before enable() so `stop` can abandon the mixer wait
    let _server = socket
        .serve(controller.command_handler())
        .context("Failed to start control socket thread")?;

    match controller.enable() {
        Ok(()) => {}
        Err(AudioSwitchError::Cancelled) => {
            info!("Stopped before the mixer became ready");
            return Ok(());
        }
        Err(e) => {
            error!("Startup failed: {e}");
            return Err(e).context("Failed to start audioswitch");
        }
    }

    controller.run().context("Event loop terminated with error")?;

    info!("audioswitch shutting down");
    Ok(())
}

/// Handle a one-shot command
fn run_client(
    command: ClientCommand,
    config_manager: ConfigManager,
    socket_path: &Path,
) -> Result<()> {
    match command {
        ClientCommand::Cycle { direction } => {
            utils::send_command(socket_path, &ControlCommand::Cycle(direction))
                .context("Failed to reach the audioswitch daemon")?;
        }
        ClientCommand::Stop => {
            utils::send_command(socket_path, &ControlCommand::Stop)
                .context("Failed to reach the audioswitch daemon")?;
        }
        ClientCommand::List { direction } => {
            let registry = open_registry(config_manager);
            let devices = registry
                .get_active(direction)
                .context("Failed to read device list")?;
            if devices.is_empty() {
                println!("No present {direction} devices known yet. Is the daemon running?");
            }
            for (index, device) in devices.iter().enumerate() {
                let marker = if device.cycled { "x" } else { " " };
                println!("{:>3}. [{marker}] {}", index + 1, device.name);
            }
        }
        ClientCommand::SetCycled {
            direction,
            name,
            cycled,
        } => {
            let change = PreferenceChange::SetCycled {
                direction,
                name,
                cycled,
            };
            apply_change(change, config_manager, socket_path)?;
        }
        ClientCommand::Reorder {
            direction,
            name,
            position,
        } => {
            if position == 0 {
                bail!("Positions start at 1");
            }
            let change = PreferenceChange::Reorder {
                direction,
                name,
                position: position - 1,
            };
            apply_change(change, config_manager, socket_path)?;
        }
    }
    Ok(())
}

/// Hand a preference edit to the daemon, or apply it locally when none runs
fn apply_change(
    change: PreferenceChange,
    config_manager: ConfigManager,
    socket_path: &Path,
) -> Result<()> {
    match utils::send_command(socket_path, &ControlCommand::Change(change.clone())) {
        Ok(()) => Ok(()),
        Err(AudioSwitchError::NotRunning(_)) => {
            info!("No daemon running, editing the device list directly");
            open_registry(config_manager)
                .apply_change(&change)
                .context("Failed to update device list")
        }
        Err(e) => Err(e).context("The daemon did not apply the change"),
    }
}

fn open_registry(config_manager: ConfigManager) -> DeviceRegistry {
    DeviceRegistry::new(Arc::new(ConfigStore::new(config_manager)))
}
