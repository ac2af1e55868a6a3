//! Outbound wire payloads for the platform event endpoint.
//!
//! Every send is an [`OutboundEnvelope`] whose `content` carries one of the
//! payload shapes below. These structures are built entirely by this crate,
//! so a serialization failure is an internal invariant violation
//! ([`LineBotError::Internal`]), never a user-facing error path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LineBotError, Result};
use crate::events::{Location, Sticker};

/// Event-type tag for a single-content send.
pub const EVENT_TYPE_SEND_CONTENT: &str = "138311608800106203";
/// Event-type tag for a multi-message batch send.
pub const EVENT_TYPE_SEND_MESSAGES: &str = "140177271400161403";

/// Fixed `toChannel` value for outbound sends.
pub const TO_CHANNEL: i64 = 1383378250;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    pub to: Vec<String>,
    #[serde(rename = "toChannel")]
    pub to_channel: i64,
    #[serde(rename = "eventType")]
    pub event_type: String,
    pub content: Value,
}

impl OutboundEnvelope {
    pub fn new(to: &[String], event_type: &str, content: Value) -> Self {
        Self {
            to: to.to_vec(),
            to_channel: TO_CHANNEL,
            event_type: event_type.to_string(),
            content,
        }
    }
}

pub(crate) fn encode_content<T: Serialize>(content: &T) -> Result<Value> {
    serde_json::to_value(content).map_err(|e| LineBotError::Internal(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(rename = "contentType")]
    pub content_type: i64,
    #[serde(rename = "toType")]
    pub to_type: i64,
    pub text: String,
}

/// Image or video content; both kinds share the original/preview URL pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaContent {
    #[serde(rename = "contentType")]
    pub content_type: i64,
    #[serde(rename = "toType")]
    pub to_type: i64,
    #[serde(rename = "originalContentUrl")]
    pub original_content_url: String,
    #[serde(rename = "previewImageUrl")]
    pub preview_image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioContent {
    #[serde(rename = "contentType")]
    pub content_type: i64,
    #[serde(rename = "toType")]
    pub to_type: i64,
    #[serde(rename = "originalContentUrl")]
    pub original_content_url: String,
    #[serde(rename = "contentMetadata")]
    pub content_metadata: AudioLength,
}

/// Audio duration metadata; the platform carries it as a string of millis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioLength {
    #[serde(rename = "AUDLEN")]
    pub length_ms: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationContent {
    #[serde(rename = "contentType")]
    pub content_type: i64,
    #[serde(rename = "toType")]
    pub to_type: i64,
    pub text: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickerContent {
    #[serde(rename = "contentType")]
    pub content_type: i64,
    #[serde(rename = "toType")]
    pub to_type: i64,
    #[serde(rename = "contentMetadata")]
    pub content_metadata: Sticker,
}

/// Batch of already-encoded content payloads sent as one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiMessages {
    #[serde(rename = "messageNotified")]
    pub message_notified: i64,
    pub messages: Vec<Value>,
}

/// Rich-message canvas markup. Serialized to a JSON string and embedded in
/// the content metadata under `MARKUP_JSON`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichMarkup {
    pub canvas: Canvas,
    #[serde(rename = "image1")]
    pub image: ImageArea,
    pub actions: RichActions,
    pub scenes: RichScenes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: i64,
    pub height: i64,
    #[serde(rename = "initialScene")]
    pub initial_scene: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageArea {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichActions {
    #[serde(rename = "openHomepage")]
    pub open_homepage: RichAction,
    #[serde(rename = "showItem")]
    pub show_item: RichAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub params: RichActionParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichActionParams {
    #[serde(rename = "linkUri")]
    pub link_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichScenes {
    #[serde(rename = "scene1")]
    pub scene: RichScene,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichScene {
    pub draws: Vec<RichDraw>,
    pub listeners: Vec<RichListener>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichDraw {
    pub image: String,
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichListener {
    #[serde(rename = "type")]
    pub kind: i64,
    pub params: [i64; 4],
    pub action: String,
}

/// Content wrapper for a rich message; the markup travels as an escaped JSON
/// string inside the metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichContent {
    #[serde(rename = "contentType")]
    pub content_type: i64,
    #[serde(rename = "toType")]
    pub to_type: i64,
    #[serde(rename = "contentMetadata")]
    pub content_metadata: RichMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichMetadata {
    #[serde(rename = "DOWNLOAD_URL")]
    pub download_url: String,
    #[serde(rename = "SPEC_REV")]
    pub spec_rev: String,
    #[serde(rename = "ALT_TEXT")]
    pub alt_text: String,
    #[serde(rename = "MARKUP_JSON")]
    pub markup_json: String,
}
