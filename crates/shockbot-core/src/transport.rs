use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelRef(pub String);

impl ChannelRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender_id: String,
    pub body: String,
    pub channel: ChannelRef,
}

impl InboundMessage {
    pub fn new(
        sender_id: impl Into<String>,
        body: impl Into<String>,
        channel: ChannelRef,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            body: body.into(),
            channel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceKind {
    Game,
    Streaming,
    Listening,
    Watching,
}

impl PresenceKind {
    pub const ALL: [PresenceKind; 4] = [Self::Game, Self::Streaming, Self::Listening, Self::Watching];

    /// Chat-facing numbering, 1 through 4.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Game),
            2 => Some(Self::Streaming),
            3 => Some(Self::Listening),
            4 => Some(Self::Watching),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Game => 1,
            Self::Streaming => 2,
            Self::Listening => 3,
            Self::Watching => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Streaming => "streaming",
            Self::Listening => "listening",
            Self::Watching => "watching",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Game => "Game",
            Self::Streaming => "Streaming",
            Self::Listening => "Listening",
            Self::Watching => "Watching",
        }
    }

    pub fn choices() -> String {
        Self::ALL
            .iter()
            .map(|kind| format!("{} - {}", kind.code(), kind.label()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("transport is not ready")]
    NotReady,
}

/// What the engine needs from the chat platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Account id of the bot itself, once known.
    fn self_id(&self) -> Option<String>;

    async fn send(&self, channel: &ChannelRef, text: &str) -> Result<(), TransportError>;

    async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfile, TransportError>;

    /// `url` is only used for [`PresenceKind::Streaming`].
    async fn set_presence(
        &self,
        kind: PresenceKind,
        text: &str,
        url: &str,
    ) -> Result<(), TransportError>;

    /// One request/response cycle against the platform.
    async fn round_trip(&self) -> Result<Duration, TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}
