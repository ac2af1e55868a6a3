pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod outbound;
pub mod pipeline;
pub mod signature;
pub mod webhook;

pub use crate::client::{BotClient, ContentStream, RECIPIENT_LIMIT};
pub use crate::config::{ApiKind, ChannelConfig};
pub use crate::error::{LineBotError, Result};
pub use crate::events::{CallbackEnvelope, EventKind, InboundEvent, Message, Operation};
pub use crate::pipeline::{verify_stream, TeeBody, VerifyHandle};
pub use crate::webhook::{AppState, EventHandler};
