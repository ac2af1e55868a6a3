use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures::{stream::BoxStream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};

use crate::config::ChannelConfig;
use crate::error::{LineBotError, Result};
use crate::events::{content_type, recipient_type, Location, Sticker};
use crate::outbound::{
    encode_content, AudioContent, AudioLength, LocationContent, MediaContent, MultiMessages,
    OutboundEnvelope, RichContent, RichMarkup, RichMetadata, StickerContent, TextContent,
    EVENT_TYPE_SEND_CONTENT, EVENT_TYPE_SEND_MESSAGES,
};

/// Maximum number of recipients per send; larger sets are rejected locally
/// before any network call.
pub const RECIPIENT_LIMIT: usize = 150;

/// Streaming response body from the content-retrieval endpoint.
pub struct ContentStream {
    stream: BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStream").finish_non_exhaustive()
    }
}

impl ContentStream {
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes>> {
        self.stream
    }

    pub async fn collect_bytes(self) -> Result<Vec<u8>> {
        let mut stream = self.stream;
        let mut buffer = Vec::new();
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer)
    }
}

/// Outbound sender for the platform event endpoint plus message-content
/// retrieval. Each call is independent; a failed send does not affect later
/// ones and nothing is retried.
pub struct BotClient {
    config: ChannelConfig,
    http: reqwest::Client,
}

impl BotClient {
    pub fn new(config: ChannelConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LineBotError::Runtime(e.to_string()))?;
        Ok(Self { config, http })
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .header("X-Line-ChannelID", self.config.id.as_str())
            .header("X-Line-ChannelSecret", self.config.secret.as_str())
            .header("X-Line-Trusted-User-With-ACL", self.config.mid.as_str())
    }

    async fn post_event(
        &self,
        to: &[String],
        event_type: &str,
        content: serde_json::Value,
    ) -> Result<()> {
        check_recipient_limit(to)?;
        let envelope = OutboundEnvelope::new(to, event_type, content);
        let response = self
            .request(Method::POST, &self.config.events_url())
            .json(&envelope)
            .send()
            .await
            .map_err(|e| LineBotError::Http(e.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(LineBotError::Http(format!(
                "invalid response {}",
                response.status()
            )));
        }
        Ok(())
    }

    pub async fn send_text(&self, to: &[String], text: &str) -> Result<()> {
        let content = TextContent {
            content_type: content_type::TEXT,
            to_type: recipient_type::USER,
            text: text.to_string(),
        };
        self.post_event(to, EVENT_TYPE_SEND_CONTENT, encode_content(&content)?)
            .await
    }

    pub async fn send_image(
        &self,
        to: &[String],
        original_url: &str,
        preview_url: &str,
    ) -> Result<()> {
        self.send_media(to, content_type::IMAGE, original_url, preview_url)
            .await
    }

    pub async fn send_video(
        &self,
        to: &[String],
        original_url: &str,
        preview_url: &str,
    ) -> Result<()> {
        self.send_media(to, content_type::VIDEO, original_url, preview_url)
            .await
    }

    async fn send_media(
        &self,
        to: &[String],
        kind: i64,
        original_url: &str,
        preview_url: &str,
    ) -> Result<()> {
        let content = MediaContent {
            content_type: kind,
            to_type: recipient_type::USER,
            original_content_url: original_url.to_string(),
            preview_image_url: preview_url.to_string(),
        };
        self.post_event(to, EVENT_TYPE_SEND_CONTENT, encode_content(&content)?)
            .await
    }

    /// `duration_ms` is the audio length in milliseconds, carried on the wire
    /// as a string.
    pub async fn send_audio(&self, to: &[String], url: &str, duration_ms: &str) -> Result<()> {
        let content = AudioContent {
            content_type: content_type::AUDIO,
            to_type: recipient_type::USER,
            original_content_url: url.to_string(),
            content_metadata: AudioLength {
                length_ms: duration_ms.to_string(),
            },
        };
        self.post_event(to, EVENT_TYPE_SEND_CONTENT, encode_content(&content)?)
            .await
    }

    pub async fn send_location(
        &self,
        to: &[String],
        title: &str,
        latitude: f32,
        longitude: f32,
    ) -> Result<()> {
        let content = LocationContent {
            content_type: content_type::LOCATION,
            to_type: recipient_type::USER,
            text: title.to_string(),
            location: Location {
                title: title.to_string(),
                address: None,
                latitude,
                longitude,
            },
        };
        self.post_event(to, EVENT_TYPE_SEND_CONTENT, encode_content(&content)?)
            .await
    }

    pub async fn send_sticker(
        &self,
        to: &[String],
        id: &str,
        package_id: &str,
        version: &str,
    ) -> Result<()> {
        let content = StickerContent {
            content_type: content_type::STICKER,
            to_type: recipient_type::USER,
            content_metadata: Sticker {
                package_id: package_id.to_string(),
                id: id.to_string(),
                version: version.to_string(),
                text: None,
            },
        };
        self.post_event(to, EVENT_TYPE_SEND_CONTENT, encode_content(&content)?)
            .await
    }

    /// Sends a batch of pre-encoded content payloads as one event.
    pub async fn send_messages(&self, to: &[String], batch: &MultiMessages) -> Result<()> {
        self.post_event(to, EVENT_TYPE_SEND_MESSAGES, encode_content(batch)?)
            .await
    }

    pub async fn send_rich_message(
        &self,
        to: &[String],
        download_url: &str,
        alt_text: &str,
        markup: &RichMarkup,
    ) -> Result<()> {
        let markup_json =
            serde_json::to_string(markup).map_err(|e| LineBotError::Internal(e.to_string()))?;
        let content = RichContent {
            content_type: content_type::RICH_MESSAGE,
            to_type: recipient_type::USER,
            content_metadata: RichMetadata {
                download_url: download_url.to_string(),
                spec_rev: "1".to_string(),
                alt_text: alt_text.to_string(),
                markup_json,
            },
        };
        self.post_event(to, EVENT_TYPE_SEND_CONTENT, encode_content(&content)?)
            .await
    }

    /// Retrieves the original binary content of a message.
    pub async fn message_content(&self, message_id: &str) -> Result<ContentStream> {
        self.content_stream(message_id, false).await
    }

    /// Retrieves the preview binary content of a message.
    pub async fn message_preview(&self, message_id: &str) -> Result<ContentStream> {
        self.content_stream(message_id, true).await
    }

    /// Downloads a message's original content into `path`.
    pub async fn save_content<P: AsRef<Path>>(&self, message_id: &str, path: P) -> Result<()> {
        let bytes = self.message_content(message_id).await?.collect_bytes().await?;
        std::fs::write(path, bytes).map_err(|e| LineBotError::Runtime(e.to_string()))
    }

    async fn content_stream(&self, message_id: &str, preview: bool) -> Result<ContentStream> {
        let mut url = format!(
            "{}/bot/message/{}/content",
            self.config.base_url().trim_end_matches('/'),
            message_id
        );
        if preview {
            url.push_str("/preview");
        }
        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|e| LineBotError::Http(e.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(LineBotError::Http(format!(
                "invalid response {}",
                response.status()
            )));
        }
        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(|e| LineBotError::Http(e.to_string())))
            .boxed();
        Ok(ContentStream { stream })
    }
}

fn check_recipient_limit(to: &[String]) -> Result<()> {
    if to.len() > RECIPIENT_LIMIT {
        return Err(LineBotError::RecipientLimit {
            count: to.len(),
            limit: RECIPIENT_LIMIT,
        });
    }
    Ok(())
}
