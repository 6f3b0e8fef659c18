//! Error types for the Suricata socket client.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::socket::SessionState;

/// Broad category of a [`SocketError`].
///
/// Lets callers decide on recovery without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connecting failed or timed out.
    Connection,
    /// The server refused the handshake or command discovery.
    Handshake,
    /// The command is not in the server's advertised list.
    InvalidCommand,
    /// Arguments do not fit the command's schema.
    Validation,
    /// The command has no entry in the schema table.
    UnknownCommand,
    /// Reading or writing the socket failed.
    Transport,
    /// The server sent something that is not a valid response.
    Protocol,
    /// The session is in the wrong state for the operation.
    State,
}

/// Errors returned by the session, the message model and the argument validator.
#[derive(Debug, Error)]
pub enum SocketError {
    /// The socket could not be opened (missing file, nobody listening, permissions).
    #[error("Connection to {} failed: {source}", path.display())]
    ConnectionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The socket did not accept the connection in time.
    #[error("Connection to {} timed out after {}s", path.display(), timeout.as_secs())]
    ConnectTimeout { path: PathBuf, timeout: Duration },

    /// Handshake or discovery returned a non-OK status.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The command is not in the server's advertised command list.
    #[error("Command {0} is not valid")]
    InvalidCommand(String),

    /// The arguments do not fit the schema of a known command.
    #[error("Could not parse arguments for {command}: {reason}")]
    Validation { command: String, reason: String },

    /// The command has no entry in the static schema table.
    #[error("The command \"{command}\" with {count} arguments is unknown")]
    UnknownCommand { command: String, count: usize },

    /// Write or read failure on the live connection.
    #[error("Transport error while {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A response could not be decoded into the expected shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The operation is not allowed in the current session state.
    #[error("Cannot {operation} while session is {state}")]
    State {
        operation: &'static str,
        state: SessionState,
    },
}

impl SocketError {
    pub(crate) fn validation(command: &str, reason: impl Into<String>) -> Self {
        SocketError::Validation {
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn transport(operation: &'static str, source: std::io::Error) -> Self {
        SocketError::Transport { operation, source }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SocketError::ConnectionFailed { .. } | SocketError::ConnectTimeout { .. } => {
                ErrorKind::Connection
            }
            SocketError::Handshake(_) => ErrorKind::Handshake,
            SocketError::InvalidCommand(_) => ErrorKind::InvalidCommand,
            SocketError::Validation { .. } => ErrorKind::Validation,
            SocketError::UnknownCommand { .. } => ErrorKind::UnknownCommand,
            SocketError::Transport { .. } => ErrorKind::Transport,
            SocketError::Protocol(_) => ErrorKind::Protocol,
            SocketError::State { .. } => ErrorKind::State,
        }
    }
}
