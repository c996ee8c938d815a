use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result, bail};
use async_trait::async_trait;
use serenity::all::{
    ActivityData, ChannelId, Client, Context, EventHandler, GatewayIntents, Http, Message, Ready,
    ShardManager, ShardMessenger, UserId,
};
use shockbot_core::{
    ChannelRef, InboundMessage, PresenceKind, Transport, TransportError, UserProfile,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Inbound messages buffered between the gateway and the engine loop.
const DEFAULT_QUEUE_DEPTH: usize = 64;

#[derive(Default)]
struct SessionState {
    self_id: OnceLock<String>,
    shard: Mutex<Option<ShardMessenger>>,
}

struct Handler {
    inbound: mpsc::Sender<InboundMessage>,
    state: Arc<SessionState>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        let _ = self.state.self_id.set(ready.user.id.to_string());
        if let Ok(mut shard) = self.state.shard.lock() {
            *shard = Some(ctx.shard.clone());
        }
        info!(user = %ready.user.name, "connected to discord");
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let inbound = InboundMessage::new(
            msg.author.id.to_string(),
            msg.content,
            ChannelRef::new(msg.channel_id.to_string()),
        );
        if self.inbound.send(inbound).await.is_err() {
            warn!("engine is gone; dropping inbound message");
        }
    }
}

/// Outbound half of a Discord session.
#[derive(Clone)]
pub struct DiscordTransport {
    http: Arc<Http>,
    state: Arc<SessionState>,
    shard_manager: Arc<ShardManager>,
}

pub struct DiscordConnection {
    pub transport: DiscordTransport,
    pub inbound: mpsc::Receiver<InboundMessage>,
    client_task: JoinHandle<()>,
}

impl DiscordConnection {
    /// Waits for the gateway client to finish after [`Transport::close`].
    pub async fn wait(self) -> Result<()> {
        self.client_task
            .await
            .with_context(|| "discord client task panicked")
    }
}

/// Starts the gateway client in the background and returns the transport
/// plus the stream of inbound messages.
pub async fn connect(token: &str) -> Result<DiscordConnection> {
    connect_with_queue(token, DEFAULT_QUEUE_DEPTH).await
}

pub async fn connect_with_queue(token: &str, queue_depth: usize) -> Result<DiscordConnection> {
    let token = token.trim();
    if token.is_empty() {
        bail!("discord token is empty");
    }

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let (tx, rx) = mpsc::channel(queue_depth.max(1));
    let state = Arc::new(SessionState::default());
    let handler = Handler {
        inbound: tx,
        state: state.clone(),
    };

    let mut client = Client::builder(token, intents)
        .event_handler(handler)
        .await
        .with_context(|| "failed to build discord client")?;
    let transport = DiscordTransport {
        http: client.http.clone(),
        state,
        shard_manager: client.shard_manager.clone(),
    };
    let client_task = tokio::spawn(async move {
        if let Err(err) = client.start().await {
            error!(error = %err, "discord client stopped with an error");
        }
    });

    Ok(DiscordConnection {
        transport,
        inbound: rx,
        client_task,
    })
}

fn parse_snowflake(raw: &str) -> Result<u64, TransportError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| TransportError::Request(format!("invalid discord id `{raw}`")))
}

fn request_error(err: serenity::Error) -> TransportError {
    TransportError::Request(err.to_string())
}

#[async_trait]
impl Transport for DiscordTransport {
    fn self_id(&self) -> Option<String> {
        self.state.self_id.get().cloned()
    }

    async fn send(&self, channel: &ChannelRef, text: &str) -> Result<(), TransportError> {
        let channel_id = ChannelId::new(parse_snowflake(channel.as_str())?);
        channel_id
            .say(&self.http, text)
            .await
            .map(|_| ())
            .map_err(request_error)
    }

    async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfile, TransportError> {
        let user_id = UserId::new(parse_snowflake(user_id)?);
        let user = self.http.get_user(user_id).await.map_err(request_error)?;
        Ok(UserProfile {
            avatar_url: user.avatar_url(),
            banner_url: user.banner_url(),
        })
    }

    async fn set_presence(
        &self,
        kind: PresenceKind,
        text: &str,
        url: &str,
    ) -> Result<(), TransportError> {
        let activity = match kind {
            PresenceKind::Game => ActivityData::playing(text),
            PresenceKind::Streaming => {
                ActivityData::streaming(text, url)
                    .map_err(|err| TransportError::Request(err.to_string()))?
            }
            PresenceKind::Listening => ActivityData::listening(text),
            PresenceKind::Watching => ActivityData::watching(text),
        };
        let shard = self
            .state
            .shard
            .lock()
            .ok()
            .and_then(|shard| shard.clone())
            .ok_or(TransportError::NotReady)?;
        shard.set_activity(Some(activity));
        Ok(())
    }

    async fn round_trip(&self) -> Result<Duration, TransportError> {
        let started = Instant::now();
        self.http
            .get_current_user()
            .await
            .map_err(request_error)?;
        Ok(started.elapsed())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.shard_manager.shutdown_all().await;
        Ok(())
    }
}
