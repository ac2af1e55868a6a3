use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{LineBotError, Result};

pub const TRIAL_BOT_URL: &str = "https://trialbot-api.line.me/v1";
pub const BUSINESS_CONNECT_URL: &str = "https://api.line.me/v1";

/// Which platform API surface the channel talks to. The two variants map to
/// fixed base URLs unless `ChannelConfig::base_url` overrides them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKind {
    #[default]
    TrialBot,
    BusinessConnect,
}

/// Channel identity shared by the webhook dispatcher and the outbound client.
/// Built once at startup and passed by reference; nothing here is mutated
/// after construction.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    pub id: String,
    pub secret: String,
    pub mid: String,
    #[serde(default)]
    pub api: ApiKind,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ChannelConfig {
    pub fn new(
        id: impl Into<String>,
        secret: impl Into<String>,
        mid: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            mid: mid.into(),
            api: ApiKind::default(),
            base_url: None,
        }
    }

    pub fn with_api(mut self, api: ApiKind) -> Self {
        self.api = api;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| LineBotError::Config(e.to_string()))?;
        let config: ChannelConfig =
            serde_json::from_str(&content).map_err(|e| LineBotError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn base_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url.as_str(),
            None => match self.api {
                ApiKind::TrialBot => TRIAL_BOT_URL,
                ApiKind::BusinessConnect => BUSINESS_CONNECT_URL,
            },
        }
    }

    pub fn events_url(&self) -> String {
        format!("{}/events", self.base_url().trim_end_matches('/'))
    }
}
