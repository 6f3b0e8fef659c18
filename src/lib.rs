//! Client for the Suricata unix socket control protocol.
//!
//! This library provides:
//!
//! - `socket` - session lifecycle (connect, handshake, close) and the
//!   request/response exchange
//! - `message` - outgoing commands and their argument mapping
//! - `arguments` - per-command argument schemas
//! - `response` - the `{"return", "message"}` response envelope
//!
//! ```ignore
//! use surisock::{default_socket_path, SuricataSocket};
//!
//! let mut socket = SuricataSocket::open(default_socket_path()).await?;
//! let response = socket.send("conf-get", &["default-log-dir"]).await?;
//! println!("{}: {}", response.status, response.message_pretty()?);
//! ```

pub mod arguments;
pub mod error;
pub mod message;
pub mod response;
pub mod socket;

pub use arguments::CommandSchema;
pub use error::{ErrorKind, SocketError};
pub use message::{ArgValue, Arguments, KeyedArguments, Message};
pub use response::{Response, Status};
pub use socket::{default_socket_path, ReadMode, SessionConfig, SessionState, SuricataSocket};
