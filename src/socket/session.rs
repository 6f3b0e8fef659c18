//! Session with a running Suricata process over its command socket.
//!
//! A session moves through `Unconnected -> Connected -> Initialized -> Closed`.
//! Commands can only be exchanged once the session is initialized, which
//! means the version handshake succeeded and the server's command list has
//! been cached. A failed initialization moves the session to `Rejected`,
//! from which only `close` is allowed.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::SocketError;
use crate::message::{Handshake, KeyedArguments, Message};
use crate::response::{Response, Status};
use crate::socket::framing::{read_response, write_message};

/// Protocol version this client announces during the handshake.
pub const CLIENT_VERSION: &str = "0.1";

/// Bootstrap command used to discover the server's supported commands.
pub const COMMAND_LIST: &str = "command-list";

/// Socket path used by a stock Suricata install.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/suricata/suricata-command.socket";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_READ_BUFFER_SIZE: usize = 8192;
const DEFAULT_READ_DELAY: Duration = Duration::from_millis(10);

/// Upper bound for [`ReadMode::UntilComplete`] (100MB).
const MAX_RESPONSE_SIZE: usize = 100 * 1024 * 1024;

/// Resolve the socket path.
///
/// Resolution order:
/// 1. `$SURICATA_SOCKET`
/// 2. [`DEFAULT_SOCKET_PATH`]
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var("SURICATA_SOCKET") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

/// How a response is read off the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// One read call into a fixed buffer.
    #[default]
    SingleRead,
    /// Keep reading until a complete JSON value has arrived.
    UntilComplete,
}

/// Tunables of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sent as `{"version": ...}` in the handshake.
    pub client_version: String,
    pub connect_timeout: Duration,
    /// Capacity of the read buffer (chunk size in `UntilComplete` mode).
    /// Zero is treated as one byte.
    pub read_buffer_size: usize,
    /// Pause before reading a response.
    pub read_delay: Duration,
    pub read_mode: ReadMode,
    /// Only enforced in `UntilComplete` mode.
    pub max_response_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_version: CLIENT_VERSION.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            read_delay: DEFAULT_READ_DELAY,
            read_mode: ReadMode::default(),
            max_response_size: MAX_RESPONSE_SIZE,
        }
    }
}

/// Lifecycle state of a [`SuricataSocket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection has been made yet.
    Unconnected,
    /// Connected, handshake not yet performed.
    Connected,
    /// Handshake and command discovery succeeded.
    Initialized,
    /// The handshake or command discovery failed. Only `close` is allowed.
    Rejected,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unconnected => "unconnected",
            SessionState::Connected => "connected",
            SessionState::Initialized => "initialized",
            SessionState::Rejected => "rejected",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Client session for the Suricata unix socket.
///
/// The protocol has no request IDs, so responses are matched to requests by
/// order alone. Every exchange takes `&mut self`; share a session between
/// tasks only behind a lock.
///
/// # Example
///
/// ```ignore
/// use surisock::SuricataSocket;
///
/// let mut socket = SuricataSocket::open("/var/run/suricata/suricata-command.socket").await?;
/// let response = socket.send("iface-stat", &["eth0"]).await?;
/// println!("{}", response.message_pretty()?);
/// socket.close().await?;
/// ```
#[derive(Debug)]
pub struct SuricataSocket {
    socket_path: PathBuf,
    config: SessionConfig,
    connection: Option<UnixStream>,
    state: SessionState,
    valid_commands: BTreeSet<String>,
}

impl SuricataSocket {
    /// Create an unconnected session with the default configuration.
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self::with_config(socket_path, SessionConfig::default())
    }

    /// Create an unconnected session with an explicit configuration.
    pub fn with_config(socket_path: impl AsRef<Path>, config: SessionConfig) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            config,
            connection: None,
            state: SessionState::Unconnected,
            valid_commands: BTreeSet::new(),
        }
    }

    /// Connect and initialize in one step.
    pub async fn open(socket_path: impl AsRef<Path>) -> Result<Self, SocketError> {
        Self::open_with_config(socket_path, SessionConfig::default()).await
    }

    /// [`open`](Self::open) with an explicit configuration.
    pub async fn open_with_config(
        socket_path: impl AsRef<Path>,
        config: SessionConfig,
    ) -> Result<Self, SocketError> {
        let mut socket = Self::with_config(socket_path, config);
        socket.connect().await?;
        socket.initialize().await?;
        Ok(socket)
    }

    /// Path this session connects to.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Configuration the session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Commands advertised by the server. Empty until initialized.
    pub fn valid_commands(&self) -> &BTreeSet<String> {
        &self.valid_commands
    }

    /// Whether `command` may be sent on this session.
    pub fn is_valid_command(&self, command: &str) -> bool {
        command == COMMAND_LIST || self.valid_commands.contains(command)
    }

    /// Open the connection to the socket, replacing any connection that has
    /// not been initialized yet.
    ///
    /// # Errors
    ///
    /// - `SocketError::ConnectionFailed` if the socket is missing or nobody is
    ///   listening
    /// - `SocketError::ConnectTimeout` if `connect_timeout` elapses
    /// - `SocketError::State` if the session is initialized, rejected or closed
    pub async fn connect(&mut self) -> Result<(), SocketError> {
        match self.state {
            SessionState::Unconnected | SessionState::Connected => {}
            state => {
                return Err(SocketError::State {
                    operation: "connect",
                    state,
                })
            }
        }

        let connecting = UnixStream::connect(&self.socket_path);
        let stream = match timeout(self.config.connect_timeout, connecting).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(SocketError::ConnectionFailed {
                    path: self.socket_path.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(SocketError::ConnectTimeout {
                    path: self.socket_path.clone(),
                    timeout: self.config.connect_timeout,
                })
            }
        };

        debug!(path = %self.socket_path.display(), "Connected to Suricata socket");
        self.connection = Some(stream);
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Perform the version handshake and cache the server's command list.
    ///
    /// Any failure moves the session to [`SessionState::Rejected`]. The
    /// handshake is never retried on the same connection; close the session
    /// and open a new one.
    pub async fn initialize(&mut self) -> Result<(), SocketError> {
        if self.state != SessionState::Connected {
            return Err(SocketError::State {
                operation: "initialize",
                state: self.state,
            });
        }

        match self.handshake().await {
            Ok(commands) => {
                debug!(count = commands.len(), "Cached valid commands");
                self.valid_commands = commands;
                self.state = SessionState::Initialized;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Session initialization failed");
                self.state = SessionState::Rejected;
                Err(e)
            }
        }
    }

    async fn handshake(&mut self) -> Result<BTreeSet<String>, SocketError> {
        // Version handshake
        let handshake = Handshake::new(self.config.client_version.as_str());
        let handshake = serde_json::to_vec(&handshake)
            .map_err(|e| SocketError::Protocol(format!("Could not encode handshake: {}", e)))?;
        let response = self.exchange(&handshake).await?;
        if !response.is_ok() {
            return Err(SocketError::Handshake(format!(
                "Could not connect to socket: {}",
                response.payload
            )));
        }
        debug!(version = %self.config.client_version, "Handshake accepted");

        // Command discovery
        let discovery = Message::new(COMMAND_LIST).to_json()?;
        let response = self.exchange(discovery.as_bytes()).await?;
        if !response.is_ok() {
            return Err(SocketError::Handshake(format!(
                "Did not get OK response when listing commands: {} {}",
                response.status, response.payload
            )));
        }

        parse_command_list(&response.payload)
    }

    /// Send a command with positional arguments.
    ///
    /// Arguments are only validated when at least one is supplied, so
    /// commands without a schema entry can still be sent bare.
    pub async fn send<S: AsRef<str>>(
        &mut self,
        command: &str,
        arguments: &[S],
    ) -> Result<Response, SocketError> {
        self.check_command(command)?;

        let mut message = Message::new(command);
        if !arguments.is_empty() {
            message.parse_arguments_list(arguments)?;
        }
        self.send_message(&message).await
    }

    /// Send a command without arguments.
    pub async fn send_empty(&mut self, command: &str) -> Result<Response, SocketError> {
        self.send::<&str>(command, &[]).await
    }

    /// Send a command with keyed arguments.
    ///
    /// As with [`send`](Self::send), an empty mapping skips validation.
    pub async fn send_keyed(
        &mut self,
        command: &str,
        arguments: &KeyedArguments,
    ) -> Result<Response, SocketError> {
        self.check_command(command)?;

        let mut message = Message::new(command);
        if !arguments.is_empty() {
            message.parse_arguments_map(arguments)?;
        }
        self.send_message(&message).await
    }

    /// Write `message` and read back exactly one response.
    ///
    /// After a `SocketError::Transport` the connection is in an unknown state;
    /// close the session and open a new one.
    pub async fn send_message(&mut self, message: &Message) -> Result<Response, SocketError> {
        if self.state != SessionState::Initialized {
            return Err(SocketError::State {
                operation: "send",
                state: self.state,
            });
        }

        // Responses carry no ID and pair with requests by order
        let body = message.to_json()?;
        debug!(command = message.command(), "Sending command");
        let response = self.exchange(body.as_bytes()).await?;

        if let Status::Other(code) = &response.status {
            warn!(command = message.command(), status = %code, "Unexpected response status");
        }
        Ok(response)
    }

    /// Shut down and release the connection.
    ///
    /// The session cannot be reconnected afterwards.
    pub async fn close(&mut self) -> Result<(), SocketError> {
        let Some(mut stream) = self.connection.take() else {
            return Err(SocketError::State {
                operation: "close",
                state: self.state,
            });
        };
        self.state = SessionState::Closed;

        stream
            .shutdown()
            .await
            .map_err(|e| SocketError::transport("closing connection", e))?;
        debug!(path = %self.socket_path.display(), "Closed Suricata socket");
        Ok(())
    }

    fn check_command(&self, command: &str) -> Result<(), SocketError> {
        if self.is_valid_command(command) {
            Ok(())
        } else {
            Err(SocketError::InvalidCommand(command.to_string()))
        }
    }

    async fn exchange(&mut self, body: &[u8]) -> Result<Response, SocketError> {
        let state = self.state;
        let stream = self.connection.as_mut().ok_or(SocketError::State {
            operation: "exchange",
            state,
        })?;

        trace!(body = %String::from_utf8_lossy(body), "Writing to socket");
        write_message(stream, body).await?;
        read_response(stream, &self.config).await
    }
}

/// Extract `{"commands": [...]}` from the discovery payload.
fn parse_command_list(payload: &serde_json::Value) -> Result<BTreeSet<String>, SocketError> {
    let commands = payload
        .get("commands")
        .ok_or_else(|| {
            SocketError::Protocol(format!(
                "command-list payload has no commands field: {}",
                payload
            ))
        })?
        .as_array()
        .ok_or_else(|| {
            SocketError::Protocol("command-list commands field is not a list".to_string())
        })?;

    commands
        .iter()
        .map(|command| {
            command.as_str().map(str::to_string).ok_or_else(|| {
                SocketError::Protocol(format!("command-list entry is not a string: {}", command))
            })
        })
        .collect()
}
