//! Transport side of the client: session lifecycle and framing.
//!
//! # Protocol
//!
//! Every message is a bare JSON value written to the stream, with no length
//! prefix or newline:
//!
//! ```text
//! -> {"version": "0.1"}
//! <- {"return": "OK"}
//! -> {"command": "command-list"}
//! <- {"return": "OK", "message": {"commands": ["iface-stat", ...], "count": 26}}
//! -> {"command": "iface-stat", "arguments": {"iface": "eth0"}}
//! <- {"return": "OK", "message": {"pkts": 1024, "drop": 0, ...}}
//! ```
//!
//! There is no request ID. Responses belong to requests by order only.

mod framing;
mod session;

pub use framing::{read_response, read_single, read_until_complete, write_message};
pub use session::{
    default_socket_path, ReadMode, SessionConfig, SessionState, SuricataSocket, CLIENT_VERSION,
    COMMAND_LIST, DEFAULT_SOCKET_PATH,
};
