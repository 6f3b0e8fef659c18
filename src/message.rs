//! Outgoing messages for the Suricata command socket.
//!
//! A [`Message`] is built from a command name, then optionally given an
//! argument mapping through one of the two attachment operations:
//! [`Message::parse_arguments_list`] for positional input and
//! [`Message::parse_arguments_map`] for keyed input. Both go through the
//! schema table in [`crate::arguments`].

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::arguments::CommandSchema;
use crate::error::SocketError;

/// A single argument value as it appears on the wire.
///
/// Kept as a tagged value so `"tenant": 7` and `"tenant": "7"` stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Int(i64),
    Str(String),
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

/// Canonical argument mapping attached to a message.
pub type Arguments = BTreeMap<String, ArgValue>;

/// Caller-supplied keyed arguments: each key maps to one or more values,
/// of which only the first is used.
pub type KeyedArguments = HashMap<String, Vec<String>>;

/// A command sent to the socket.
///
/// The `arguments` field is left out of the JSON entirely when the command
/// takes none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arguments: Option<Arguments>,
}

impl Message {
    /// Create a message with no arguments attached.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            arguments: None,
        }
    }

    /// Command name.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Attached argument mapping, `None` when the command is sent bare.
    pub fn arguments(&self) -> Option<&Arguments> {
        self.arguments.as_ref()
    }

    /// Validate positional arguments against the command's schema and attach
    /// the resulting mapping.
    ///
    /// On error the message is left without arguments and must not be sent.
    pub fn parse_arguments_list<S: AsRef<str>>(
        &mut self,
        arguments: &[S],
    ) -> Result<(), SocketError> {
        self.arguments = None;
        let schema = CommandSchema::lookup(&self.command, arguments.len())?;
        self.arguments = schema.encode_positional(&self.command, arguments)?;
        Ok(())
    }

    /// Validate keyed arguments against the command's schema and attach the
    /// resulting mapping.
    ///
    /// On error the message is left without arguments and must not be sent.
    pub fn parse_arguments_map(&mut self, arguments: &KeyedArguments) -> Result<(), SocketError> {
        self.arguments = None;
        let schema = CommandSchema::lookup(&self.command, arguments.len())?;
        self.arguments = schema.encode_keyed(&self.command, arguments)?;
        Ok(())
    }

    /// Serialize to the wire representation.
    pub fn to_json(&self) -> Result<String, SocketError> {
        serde_json::to_string(self).map_err(|e| {
            SocketError::Protocol(format!("Could not encode message {}: {}", self.command, e))
        })
    }
}

/// First message of every session, announcing the client protocol version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub version: String,
}

impl Handshake {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}
