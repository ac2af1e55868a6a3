//! Inbound webhook data model.
//!
//! The platform posts an envelope holding an ordered list of events, each
//! tagged by `eventType` with an opaque `content` payload. The payload is
//! only interpreted once the tag is known (two-phase decode); tags this crate
//! does not recognize decode to [`EventKind::Unrecognized`] so future
//! platform event types never break dispatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LineBotError, Result};

/// Event-type tag on an inbound message event.
pub const EVENT_TYPE_MESSAGE: &str = "138311609000106303";
/// Event-type tag on an inbound operation event.
pub const EVENT_TYPE_OPERATION: &str = "138311609100106403";

/// Message `contentType` values.
pub mod content_type {
    pub const TEXT: i64 = 1;
    pub const IMAGE: i64 = 2;
    pub const VIDEO: i64 = 3;
    pub const AUDIO: i64 = 4;
    pub const LOCATION: i64 = 7;
    pub const STICKER: i64 = 8;
    pub const CONTACT: i64 = 10;
    pub const RICH_MESSAGE: i64 = 12;
}

/// Operation `opType` values.
pub mod op_type {
    pub const ADD_FRIEND: i64 = 4;
    pub const BLOCK: i64 = 8;
}

/// Recipient `toType` values.
pub mod recipient_type {
    pub const USER: i64 = 1;
}

/// Top-level decoded webhook body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackEnvelope {
    pub result: Vec<InboundEvent>,
}

/// One envelope entry. `content` stays opaque until [`InboundEvent::kind`]
/// resolves it against the event-type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub from: String,
    #[serde(rename = "fromChannel")]
    pub from_channel: String,
    pub to: Vec<String>,
    #[serde(rename = "toChannel")]
    pub to_channel: i64,
    #[serde(rename = "eventType")]
    pub event_type: String,
    pub id: String,
    #[serde(default)]
    pub content: Option<Value>,
}

/// Payload variant selected by the event-type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Message(Message),
    Operation(Operation),
    Unrecognized,
}

impl InboundEvent {
    /// Second-phase decode of the opaque payload.
    pub fn kind(&self) -> Result<EventKind> {
        let content = self.content.clone().unwrap_or(Value::Null);
        match self.event_type.as_str() {
            EVENT_TYPE_MESSAGE => {
                let message = serde_json::from_value(content)
                    .map_err(|e| LineBotError::Serialization(e.to_string()))?;
                Ok(EventKind::Message(message))
            }
            EVENT_TYPE_OPERATION => {
                let operation = serde_json::from_value(content)
                    .map_err(|e| LineBotError::Serialization(e.to_string()))?;
                Ok(EventKind::Operation(operation))
            }
            _ => Ok(EventKind::Unrecognized),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub location: Option<Location>,
    pub id: String,
    #[serde(rename = "contentType")]
    pub content_type: i64,
    pub from: String,
    #[serde(rename = "createdTime")]
    pub created_time: i64,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(rename = "toType")]
    pub to_type: i64,
    #[serde(rename = "contentMetadata", default)]
    pub content_metadata: Option<Value>,
    #[serde(default)]
    pub text: String,
}

impl Message {
    /// Decodes the nested metadata of a sticker message.
    pub fn sticker(&self) -> Result<Sticker> {
        if self.content_type != content_type::STICKER {
            return Err(LineBotError::Runtime(
                "not a sticker content type".to_string(),
            ));
        }
        self.metadata()
    }

    /// Decodes the nested metadata of a contact message.
    pub fn contact(&self) -> Result<Contact> {
        if self.content_type != content_type::CONTACT {
            return Err(LineBotError::Runtime(
                "not a contact content type".to_string(),
            ));
        }
        self.metadata()
    }

    fn metadata<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let meta = self.content_metadata.clone().unwrap_or(Value::Null);
        serde_json::from_value(meta).map_err(|e| LineBotError::Serialization(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub params: [Option<String>; 3],
    pub revision: i64,
    #[serde(rename = "opType")]
    pub op_type: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub title: String,
    #[serde(rename = "address", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub latitude: f32,
    pub longitude: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sticker {
    #[serde(rename = "STKPKGID")]
    pub package_id: String,
    #[serde(rename = "STKID")]
    pub id: String,
    #[serde(rename = "STKVER")]
    pub version: String,
    #[serde(rename = "STKTXT", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub mid: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_message_event() -> Value {
        json!({
            "from": "u2ddf2eb3c959e561f6c9fa2ea732e7eb8",
            "fromChannel": "1341301815",
            "to": ["u0cc15697597f61dd8b01cea8b027050e"],
            "toChannel": 1441301333,
            "eventType": EVENT_TYPE_MESSAGE,
            "id": "ABCDEF-12345678901",
            "content": {
                "location": null,
                "id": "326718",
                "contentType": 1,
                "from": "fff2aec188e58752ee1fb0f9507c6529a",
                "createdTime": 1332394961610i64,
                "to": ["u0a556cffd4da0dd89c94fb36e36e1cdd"],
                "toType": 1,
                "contentMetadata": null,
                "text": "Hello, BOT API Server!"
            }
        })
    }

    #[test]
    fn decodes_message_event() {
        let envelope: CallbackEnvelope =
            serde_json::from_value(json!({ "result": [text_message_event()] })).unwrap();
        assert_eq!(envelope.result.len(), 1);
        let event = &envelope.result[0];
        assert_eq!(event.from_channel, "1341301815");
        match event.kind().unwrap() {
            EventKind::Message(message) => {
                assert_eq!(message.id, "326718");
                assert_eq!(message.content_type, content_type::TEXT);
                assert_eq!(message.created_time, 1332394961610);
                assert_eq!(message.to_type, recipient_type::USER);
                assert_eq!(message.text, "Hello, BOT API Server!");
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn decodes_operation_event_with_null_params() {
        let event: InboundEvent = serde_json::from_value(json!({
            "from": "uefb896062d34df287b220e7b581d2466",
            "fromChannel": "1341311815",
            "to": ["u0cc55697597f61dd8b01cea8b027050e"],
            "toChannel": 1441331333,
            "eventType": EVENT_TYPE_OPERATION,
            "id": "ABDDEF-22345678901",
            "content": {
                "params": ["u0f3bfc598b061eba02183bfc5280886a", null, null],
                "revision": 2469,
                "opType": 4
            }
        }))
        .unwrap();
        match event.kind().unwrap() {
            EventKind::Operation(op) => {
                assert_eq!(
                    op.params[0].as_deref(),
                    Some("u0f3bfc598b061eba02183bfc5280886a")
                );
                assert_eq!(op.params[1], None);
                assert_eq!(op.revision, 2469);
                assert_eq!(op.op_type, op_type::ADD_FRIEND);
            }
            other => panic!("expected operation, got {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_is_unrecognized_not_an_error() {
        let mut raw = text_message_event();
        raw["eventType"] = json!("999999999999999999");
        let event: InboundEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.kind().unwrap(), EventKind::Unrecognized);
    }

    #[test]
    fn recognized_tag_with_bad_payload_errors() {
        let mut raw = text_message_event();
        raw["content"] = json!({"unexpected": true});
        let event: InboundEvent = serde_json::from_value(raw).unwrap();
        assert!(event.kind().is_err());
    }

    #[test]
    fn message_round_trips() {
        let message = Message {
            location: None,
            id: "326718".to_string(),
            content_type: content_type::TEXT,
            from: "fff2aec188e58752ee1fb0f9507c6529a".to_string(),
            created_time: 1332394961610,
            to: vec!["u0a556cffd4da0dd89c94fb36e36e1cdd".to_string()],
            to_type: recipient_type::USER,
            content_metadata: None,
            text: "Hello, BOT API Server!".to_string(),
        };
        let wire = serde_json::to_value(&message).unwrap();
        assert_eq!(wire["contentType"], 1);
        assert_eq!(wire["createdTime"], 1332394961610i64);
        let back: Message = serde_json::from_value(wire).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn operation_round_trips() {
        let op = Operation {
            params: [Some("u0f3bfc598b061eba02183bfc5280886a".to_string()), None, None],
            revision: 2470,
            op_type: op_type::BLOCK,
        };
        let wire = serde_json::to_value(&op).unwrap();
        assert_eq!(wire["opType"], 8);
        let back: Operation = serde_json::from_value(wire).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn sticker_metadata_decodes_by_content_type() {
        let message = Message {
            location: None,
            id: "1".to_string(),
            content_type: content_type::STICKER,
            from: "u".to_string(),
            created_time: 0,
            to: Vec::new(),
            to_type: recipient_type::USER,
            content_metadata: Some(json!({
                "STKPKGID": "1",
                "STKID": "2",
                "STKVER": "100"
            })),
            text: String::new(),
        };
        let sticker = message.sticker().unwrap();
        assert_eq!(sticker.package_id, "1");
        assert_eq!(sticker.id, "2");
        assert_eq!(sticker.version, "100");
        assert!(message.contact().is_err());
    }
}
