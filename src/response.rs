//! Responses received from the Suricata command socket.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

/// Status code for a successful command.
pub const RESPONSE_OK: &str = "OK";
/// Status code for a failed command.
pub const RESPONSE_NOT_OK: &str = "NOK";

/// The `return` field of a response.
///
/// Codes other than `OK`/`NOK` are kept verbatim in [`Status::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Ok,
    NotOk,
    Other(String),
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        match value.as_str() {
            RESPONSE_OK => Status::Ok,
            RESPONSE_NOT_OK => Status::NotOk,
            _ => Status::Other(value),
        }
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

impl Status {
    /// Status code as it appears on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Status::Ok => RESPONSE_OK,
            Status::NotOk => RESPONSE_NOT_OK,
            Status::Other(code) => code,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response envelope: `{"return": <status>, "message": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "return")]
    pub status: Status,
    /// Command result or error detail. `null` when the server sent none.
    #[serde(rename = "message", default)]
    pub payload: serde_json::Value,
}

impl Response {
    /// Whether the server answered `OK`.
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Payload on `OK`, otherwise the whole response back as the error.
    pub fn into_result(self) -> Result<serde_json::Value, Response> {
        if self.is_ok() {
            Ok(self.payload)
        } else {
            Err(self)
        }
    }

    /// Payload rendered as JSON indented with four spaces.
    pub fn message_pretty(&self) -> Result<String, serde_json::Error> {
        let mut out = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.payload.serialize(&mut serializer)?;
        // serde_json only ever writes valid UTF-8
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_response_ok_deserialize() {
        let response: Response =
            serde_json::from_str(r#"{"return":"OK","message":{"a":1}}"#).unwrap();
        assert_eq!(response.status, Status::Ok);
        assert_eq!(response.payload, json!({"a": 1}));
        assert!(response.is_ok());
    }

    #[test]
    fn test_response_nok_deserialize() {
        let response: Response =
            serde_json::from_str(r#"{"return":"NOK","message":"Unknown command"}"#).unwrap();
        assert_eq!(response.status, Status::NotOk);
        let err = response.into_result().unwrap_err();
        assert_eq!(err.payload, json!("Unknown command"));
    }

    #[test]
    fn test_unexpected_status_passes_through() {
        let response: Response =
            serde_json::from_str(r#"{"return":"MAYBE","message":null}"#).unwrap();
        assert_eq!(response.status, Status::Other("MAYBE".into()));
        assert_eq!(response.status.to_string(), "MAYBE");
        assert!(!response.is_ok());
    }

    #[test]
    fn test_missing_message_defaults_to_null() {
        let response: Response = serde_json::from_str(r#"{"return":"OK"}"#).unwrap();
        assert_eq!(response.payload, serde_json::Value::Null);
    }

    #[test]
    fn test_missing_return_is_rejected() {
        let result: Result<Response, _> = serde_json::from_str(r#"{"message":"hi"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_status_serializes_as_string() {
        let response = Response {
            status: Status::NotOk,
            payload: json!("bad version"),
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"return":"NOK","message":"bad version"}"#
        );
    }

    #[test]
    fn test_message_pretty() {
        let response = Response {
            status: Status::Ok,
            payload: json!({"uptime": 42}),
        };
        assert_eq!(response.message_pretty().unwrap(), "{\n    \"uptime\": 42\n}");
    }
}
