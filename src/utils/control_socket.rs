//! Control socket and single instance enforcement
//!
//! The daemon listens on a Unix domain socket for one-line commands from the
//! shortcut bindings (`audioswitch cycle output`) and the preference commands
//! (`audioswitch set-cycled ...`). Owning the socket is what makes a daemon the
//! running instance: a socket that still accepts connections means another
//! daemon is alive, a dead one is left over from a crash and gets replaced.
//!
//! # Protocol
//!
//! One command per connection, one reply line: `ok` or `error: <message>`.
//!
//! ```text
//! cycle <input|output>
//! stop
//! set-cycled <input|output> <true|false> <device name>
//! reorder <input|output> <position> <device name>
//! ```
//!
//! Device names may contain spaces, so they always come last and run to the
//! end of the line. Positions are zero-based.

use crate::config::Direction;
use crate::config::manager::APP_DIR_NAME;
use crate::error::{AudioSwitchError, Result};
use crate::registry::PreferenceChange;
use std::fmt;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::ops::ControlFlow;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client read/write timeout
const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Reply for an accepted command
const REPLY_OK: &str = "ok";

/// Command accepted on the control socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Shortcut press for one direction
    Cycle(Direction),
    /// Edit of the device list, applied by the daemon
    Change(PreferenceChange),
    /// Shut the daemon down
    Stop,
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle(direction) => write!(f, "cycle {direction}"),
            Self::Change(PreferenceChange::SetCycled {
                direction,
                name,
                cycled,
            }) => write!(f, "set-cycled {direction} {cycled} {name}"),
            Self::Change(PreferenceChange::Reorder {
                direction,
                name,
                position,
            }) => write!(f, "reorder {direction} {position} {name}"),
            Self::Stop => f.write_str("stop"),
        }
    }
}

impl FromStr for ControlCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut fields = line.splitn(4, ' ');
        let verb = fields.next().unwrap_or_default();

        match verb {
            "stop" | "cycle" => {
                let args: Vec<&str> = line.split_whitespace().skip(1).collect();
                match (verb, args.as_slice()) {
                    ("stop", []) => Ok(Self::Stop),
                    ("cycle", [direction]) => Ok(Self::Cycle(direction.parse()?)),
                    _ => Err(format!("unexpected arguments in '{}'", line.trim())),
                }
            }
            "set-cycled" | "reorder" => {
                let (Some(direction), Some(value), Some(name)) =
                    (fields.next(), fields.next(), fields.next())
                else {
                    return Err(format!("usage: {verb} <input|output> <value> <device name>"));
                };
                if name.trim().is_empty() || name.contains('\n') {
                    return Err(format!("invalid device name in '{verb}'"));
                }
                let direction: Direction = direction.parse()?;
                let name = name.to_string();

                let change = if verb == "set-cycled" {
                    PreferenceChange::SetCycled {
                        direction,
                        name,
                        cycled: value
                            .parse()
                            .map_err(|_| format!("expected true or false, got '{value}'"))?,
                    }
                } else {
                    PreferenceChange::Reorder {
                        direction,
                        name,
                        position: value
                            .parse()
                            .map_err(|_| format!("invalid position '{value}'"))?,
                    }
                };
                Ok(Self::Change(change))
            }
            _ => Err(format!("unknown command '{}'", line.trim())),
        }
    }
}

/// Default socket location
///
/// Returns: `audioswitch.sock` in the user's runtime directory
/// (`$XDG_RUNTIME_DIR`), falling back to the system temp directory.
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(format!("{APP_DIR_NAME}.sock"))
}

/// Bound control socket; removes its file on drop
pub struct ControlSocket {
    listener: UnixListener,
    path: PathBuf,
}

impl ControlSocket {
    /// Bind the socket, failing with `AlreadyRunning` if a daemon answers on it
    pub fn bind(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if path.exists() {
            if UnixStream::connect(&path).is_ok() {
                return Err(AudioSwitchError::AlreadyRunning);
            }
            warn!("Removing stale control socket {}", path.display());
            std::fs::remove_file(&path)?;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener =
            UnixListener::bind(&path).map_err(|e| AudioSwitchError::IpcError(Box::new(e)))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        info!("Control socket listening on {}", path.display());

        Ok(Self { listener, path })
    }

    /// Path the socket is bound to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serve connections on a background thread
    ///
    /// Each connection carries one command. `handler` returning `Break` stops
    /// the server after replying. An `Err` is sent back to the client and the
    /// server keeps going.
    pub fn serve<F>(self, mut handler: F) -> Result<JoinHandle<()>>
    where
        F: FnMut(ControlCommand) -> Result<ControlFlow<()>> + Send + 'static,
    {
        let handle = std::thread::Builder::new()
            .name("control-socket".to_string())
            .spawn(move || {
                let socket = self;
                for stream in socket.listener.incoming() {
                    let stream = match stream {
                        Ok(stream) => stream,
                        Err(e) => {
                            warn!("Failed to accept control connection: {e}");
                            continue;
                        }
                    };
                    if handle_connection(stream, &mut handler).is_break() {
                        break;
                    }
                }
                debug!("Control socket thread exiting");
            })?;
        Ok(handle)
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed control socket {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove control socket {}: {e}", self.path.display()),
        }
    }
}

fn handle_connection<F>(stream: UnixStream, handler: &mut F) -> ControlFlow<()>
where
    F: FnMut(ControlCommand) -> Result<ControlFlow<()>>,
{
    if let Err(e) = stream.set_read_timeout(Some(IO_TIMEOUT)) {
        warn!("Failed to set control socket timeout: {e}");
    }

    let mut line = String::new();
    if let Err(e) = BufReader::new(&stream).read_line(&mut line) {
        warn!("Failed to read control command: {e}");
        return ControlFlow::Continue(());
    }

    let (reply, flow) = match line.parse::<ControlCommand>() {
        Ok(command) => {
            debug!("Control command: {command}");
            match handler(command) {
                Ok(flow) => (REPLY_OK.to_string(), flow),
                Err(e) => (format!("error: {}", reply_message(&e)), ControlFlow::Continue(())),
            }
        }
        Err(e) => {
            warn!("Rejected control command: {e}");
            (format!("error: {e}"), ControlFlow::Continue(()))
        }
    };

    if let Err(e) = writeln!(&stream, "{reply}") {
        debug!("Control client went away before the reply: {e}");
    }
    flow
}

/// Text sent after `error: `; refusals go out without their prefix
fn reply_message(error: &AudioSwitchError) -> String {
    match error {
        AudioSwitchError::Rejected(reason) => reason.clone(),
        other => other.to_string(),
    }
}

/// Send `command` to the daemon listening on `path` and wait for its reply
///
/// Fails with `NotRunning` when nothing listens on `path`, and with
/// `Rejected` carrying the daemon's message when it answers with an error.
pub fn send_command(path: &Path, command: &ControlCommand) -> Result<()> {
    let stream = UnixStream::connect(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound | ErrorKind::ConnectionRefused => {
            AudioSwitchError::NotRunning(path.display().to_string())
        }
        _ => AudioSwitchError::IpcError(Box::new(e)),
    })?;
    stream.set_read_timeout(Some(IO_TIMEOUT))?;
    stream.set_write_timeout(Some(IO_TIMEOUT))?;

    writeln!(&stream, "{command}")?;

    let mut reply = String::new();
    BufReader::new(&stream).read_line(&mut reply)?;
    let reply = reply.trim();

    if reply == REPLY_OK {
        return Ok(());
    }
    let message = reply.strip_prefix("error: ").unwrap_or(reply);
    Err(AudioSwitchError::Rejected(if message.is_empty() {
        "daemon closed the connection without replying".to_string()
    } else {
        message.to_string()
    }))
}
