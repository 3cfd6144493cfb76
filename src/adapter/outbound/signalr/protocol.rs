//! SignalR JSON hub protocol.
//!
//! Every message is a JSON object terminated by the record separator
//! `0x1E`. A WebSocket frame may carry several records, and a record may in
//! principle span frames, so inbound text goes through a [`RecordBuffer`].
//!
//! Only the message types a client needs are modelled:
//!
//! | type | message        | direction |
//! |------|----------------|-----------|
//! | 1    | Invocation     | both      |
//! | 3    | Completion     | server    |
//! | 6    | Ping           | both      |
//! | 7    | Close          | both      |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Terminates every record.
pub const RECORD_SEPARATOR: char = '\u{1e}';

const INVOCATION: u8 = 1;
const COMPLETION: u8 = 3;
const PING: u8 = 6;
const CLOSE: u8 = 7;

/// A decoded server message.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Invocation {
        invocation_id: Option<String>,
        target: String,
        arguments: Vec<Value>,
    },
    /// Result of a client invocation; `error` set when the server method failed.
    Completion {
        invocation_id: String,
        result: Option<Value>,
        error: Option<String>,
    },
    Ping,
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },
    /// Streaming and cancellation messages, which this client never requests.
    Other(u8),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    #[serde(rename = "type")]
    kind: u8,
    invocation_id: Option<String>,
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<Value>,
    result: Option<Value>,
    error: Option<String>,
    #[serde(default)]
    allow_reconnect: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvocationMessage<'a> {
    #[serde(rename = "type")]
    kind: u8,
    invocation_id: &'a str,
    target: &'a str,
    arguments: &'a [Value],
}

#[derive(Debug, Deserialize)]
struct HandshakeResponse {
    error: Option<String>,
}

/// The client's opening record selecting the JSON protocol.
#[must_use]
pub fn handshake_request() -> String {
    format!(r#"{{"protocol":"json","version":1}}{RECORD_SEPARATOR}"#)
}

/// Check the server's handshake answer (`{}` on success).
///
/// # Errors
///
/// Returns [`Error::Hub`] when the server refused the handshake or answered
/// with something that is not a handshake response.
pub fn parse_handshake_response(record: &str) -> Result<()> {
    let response: HandshakeResponse = serde_json::from_str(record)
        .map_err(|e| Error::Hub(format!("invalid handshake response: {e}")))?;
    match response.error {
        Some(error) => Err(Error::Hub(format!("handshake rejected: {error}"))),
        None => Ok(()),
    }
}

/// Decode one record.
///
/// # Errors
///
/// Returns [`Error::Hub`] for records that are not valid hub messages.
pub fn parse_message(record: &str) -> Result<HubMessage> {
    let raw: RawMessage = serde_json::from_str(record)
        .map_err(|e| Error::Hub(format!("invalid hub message: {e}")))?;

    match raw.kind {
        INVOCATION => {
            let target = raw
                .target
                .ok_or_else(|| Error::Hub("invocation without target".into()))?;
            Ok(HubMessage::Invocation {
                invocation_id: raw.invocation_id,
                target,
                arguments: raw.arguments,
            })
        }
        COMPLETION => {
            let invocation_id = raw
                .invocation_id
                .ok_or_else(|| Error::Hub("completion without invocationId".into()))?;
            Ok(HubMessage::Completion {
                invocation_id,
                result: raw.result,
                error: raw.error,
            })
        }
        PING => Ok(HubMessage::Ping),
        CLOSE => Ok(HubMessage::Close {
            error: raw.error,
            allow_reconnect: raw.allow_reconnect,
        }),
        other => Ok(HubMessage::Other(other)),
    }
}

/// Encode a blocking invocation of `target`.
///
/// # Errors
///
/// Returns [`Error::Json`] if the arguments cannot be serialized.
pub fn encode_invocation(invocation_id: &str, target: &str, arguments: &[Value]) -> Result<String> {
    let message = InvocationMessage {
        kind: INVOCATION,
        invocation_id,
        target,
        arguments,
    };
    let mut record = serde_json::to_string(&message)?;
    record.push(RECORD_SEPARATOR);
    Ok(record)
}

#[must_use]
pub fn encode_ping() -> String {
    format!(r#"{{"type":{PING}}}{RECORD_SEPARATOR}"#)
}

#[must_use]
pub fn encode_close() -> String {
    format!(r#"{{"type":{CLOSE}}}{RECORD_SEPARATOR}"#)
}

/// Reassembles records from inbound text frames.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    partial: String,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame and return every record it completes, in order.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.partial.push_str(text);
        let Some(last) = self.partial.rfind(RECORD_SEPARATOR) else {
            return Vec::new();
        };

        let rest = self.partial.split_off(last + RECORD_SEPARATOR.len_utf8());
        let complete = std::mem::replace(&mut self.partial, rest);
        complete
            .split(RECORD_SEPARATOR)
            .filter(|record| !record.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// True when an unterminated record is waiting for more text.
    pub fn has_partial(&self) -> bool {
        !self.partial.is_empty()
    }

    pub fn clear(&mut self) {
        self.partial.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handshake_request_is_terminated() {
        let request = handshake_request();
        assert!(request.ends_with(RECORD_SEPARATOR));
        let body: Value = serde_json::from_str(request.trim_end_matches(RECORD_SEPARATOR)).unwrap();
        assert_eq!(body, json!({"protocol": "json", "version": 1}));
    }

    #[test]
    fn handshake_response() {
        assert!(parse_handshake_response("{}").is_ok());

        let err = parse_handshake_response(r#"{"error":"Requested protocol 'json' is not available."}"#)
            .unwrap_err();
        assert!(err.to_string().contains("not available"));

        assert!(parse_handshake_response("nonsense").is_err());
    }

    #[test]
    fn parses_invocation() {
        let message = parse_message(
            r#"{"type":1,"target":"LocationUpdated","arguments":["3f2504e0-4f89-11d3-9a0c-0305e82c3301",43.6,3.8,"2026-02-04T10:00:00Z"]}"#,
        )
        .unwrap();

        let HubMessage::Invocation {
            invocation_id,
            target,
            arguments,
        } = message
        else {
            panic!("expected invocation");
        };
        assert!(invocation_id.is_none());
        assert_eq!(target, "LocationUpdated");
        assert_eq!(arguments.len(), 4);
    }

    #[test]
    fn parses_completions() {
        assert_eq!(
            parse_message(r#"{"type":3,"invocationId":"7"}"#).unwrap(),
            HubMessage::Completion {
                invocation_id: "7".into(),
                result: None,
                error: None,
            }
        );
        assert_eq!(
            parse_message(r#"{"type":3,"invocationId":"8","error":"Invalid coordinates"}"#).unwrap(),
            HubMessage::Completion {
                invocation_id: "8".into(),
                result: None,
                error: Some("Invalid coordinates".into()),
            }
        );
        assert!(parse_message(r#"{"type":3}"#).is_err());
    }

    #[test]
    fn parses_ping_close_and_others() {
        assert_eq!(parse_message(r#"{"type":6}"#).unwrap(), HubMessage::Ping);
        assert_eq!(
            parse_message(r#"{"type":7,"error":"shutting down","allowReconnect":true}"#).unwrap(),
            HubMessage::Close {
                error: Some("shutting down".into()),
                allow_reconnect: true,
            }
        );
        assert_eq!(
            parse_message(r#"{"type":7}"#).unwrap(),
            HubMessage::Close {
                error: None,
                allow_reconnect: false,
            }
        );
        assert_eq!(parse_message(r#"{"type":2,"invocationId":"1","item":1}"#).unwrap(), HubMessage::Other(2));
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(parse_message("{").is_err());
        assert!(parse_message(r#"{"target":"x"}"#).is_err());
        assert!(parse_message(r#"{"type":1,"arguments":[]}"#).is_err());
    }

    #[test]
    fn encodes_invocation() {
        let record = encode_invocation("1", "JoinDeliveryGroup", &[json!("abc")]).unwrap();
        assert!(record.ends_with(RECORD_SEPARATOR));
        let body: Value = serde_json::from_str(record.trim_end_matches(RECORD_SEPARATOR)).unwrap();
        assert_eq!(
            body,
            json!({"type": 1, "invocationId": "1", "target": "JoinDeliveryGroup", "arguments": ["abc"]})
        );
    }

    #[test]
    fn encodes_ping_and_close() {
        assert_eq!(parse_message(encode_ping().trim_end_matches(RECORD_SEPARATOR)).unwrap(), HubMessage::Ping);
        assert!(matches!(
            parse_message(encode_close().trim_end_matches(RECORD_SEPARATOR)).unwrap(),
            HubMessage::Close { .. }
        ));
    }

    #[test]
    fn buffer_splits_frames_into_records() {
        let mut buffer = RecordBuffer::new();
        let records = buffer.push("{}\u{1e}{\"type\":6}\u{1e}");
        assert_eq!(records, vec!["{}".to_string(), "{\"type\":6}".to_string()]);
        assert!(!buffer.has_partial());
    }

    #[test]
    fn buffer_joins_records_across_frames() {
        let mut buffer = RecordBuffer::new();
        assert!(buffer.push("{\"type\"").is_empty());
        assert!(buffer.has_partial());

        let records = buffer.push(":6}\u{1e}{\"ty");
        assert_eq!(records, vec!["{\"type\":6}".to_string()]);
        assert!(buffer.has_partial());

        assert_eq!(buffer.push("pe\":6}\u{1e}"), vec!["{\"type\":6}".to_string()]);
        assert!(!buffer.has_partial());
    }
}
