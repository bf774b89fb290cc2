use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// Protocol versions this gateway speaks, advertised in the ack.
const PROTOCOL_VERSIONS: [u8; 2] = [1, 2];

/// One unit of room traffic.
///
/// The gateway treats payloads as opaque: the only value it ever interprets
/// is the acknowledgement sent when a connection opens. Everything else is
/// carried verbatim between the transport and the room logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Message {
    /// Sent once per newly opened connection's group to confirm readiness.
    #[serde(rename = "ack")]
    Ack { version: Vec<u8> },

    /// Client-to-room traffic.
    #[serde(rename = "room")]
    Room(Value),

    /// Room-to-client traffic.
    #[serde(rename = "player")]
    Player(Value),
}

impl Message {
    /// The well-known acknowledgement value.
    pub fn ack() -> Self {
        Message::Ack {
            version: PROTOCOL_VERSIONS.to_vec(),
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Message::Ack { .. })
    }

    /// Serialize to the wire envelope. May fail independently of transport
    /// state.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Parse the wire envelope. Malformed input is an error, never a panic.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ack_wire_format() {
        let encoded = Message::ack().encode().unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["type"], "ack");
        assert_eq!(value["payload"]["version"], json!([1, 2]));

        let decoded = Message::decode(&encoded).unwrap();
        assert!(decoded.is_ack());
    }

    #[test]
    fn test_room_payload_is_opaque() {
        let raw = r#"{"type":"room","payload":{"username":"kit","content":"/go N"}}"#;
        let message = Message::decode(raw).unwrap();
        match message {
            Message::Room(content) => assert_eq!(content["content"], "/go N"),
            other => panic!("expected room message, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_failure() {
        let err = Message::decode("definitely not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));

        let err = Message::decode(r#"{"type":"telegram","payload":{}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }
}
