//! Utility modules
//!
//! Provides logging setup, the control socket (which doubles as single
//! instance enforcement) and a cancellable sleep for startup waits.

pub mod cancel;
pub mod control_socket;
pub mod logging;

pub use cancel::CancellationToken;
pub use control_socket::{ControlCommand, ControlSocket, default_socket_path, send_command};
pub use logging::{init_cli_logging, init_logging};
