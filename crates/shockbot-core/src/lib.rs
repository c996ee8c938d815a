//! Message-driven trigger and dispatch engine.
//!
//! Inbound chat text is classified by [`trigger::classify`] into a command,
//! a trigger-word actuation, or nothing. Commands go through [`Router`];
//! actuations go straight to the [`ActuationGateway`]. Each handled message
//! produces exactly one reply on the transport.

pub mod actuation;
pub mod error;
pub mod parser;
pub mod reply;
pub mod router;
pub mod transport;
pub mod trigger;

use std::sync::Arc;

use anyhow::Result;
use shockbot_common::ShockbotConfig;
use shockbot_store::{CredentialStore, ListStore};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub use actuation::{ActuationGateway, ActuationRequest, DeviceApi};
pub use error::{CommandError, ParseError};
pub use parser::{ArgKind, Capability, CommandId, CommandTable, ParsedCommand, parse};
pub use reply::{Reply, ReplyKind};
pub use router::Router;
pub use transport::{
    ChannelRef, InboundMessage, PresenceKind, Transport, TransportError, UserProfile,
};
pub use trigger::{Dispatch, IgnoreReason, TriggerLists, classify};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Ignored(IgnoreReason),
    Replied { error: bool },
    Shutdown,
}

pub struct Engine {
    router: Router,
}

impl Engine {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Wires the engine from config: list files under `data_dir`, credentials
    /// from the configured env file plus the process environment.
    pub fn from_config(config: &ShockbotConfig, device: Arc<dyn DeviceApi>) -> Result<Self> {
        let table = CommandTable::standard(
            config.discord.command_prefix.clone(),
            config.policy.word_commands_require_authorization,
        );
        let lists = ListStore::at_dir(config.data_dir.clone());
        let credentials = CredentialStore::load(config.env_file.clone())?;
        let gateway = ActuationGateway::new(device, router::setup_hint(&table));
        let router = Router::new(
            table,
            lists,
            credentials,
            gateway,
            config.presence.streaming_url.clone(),
        );
        Ok(Self::new(router))
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handles one message to completion, including its reply.
    pub async fn handle(
        &mut self,
        transport: &dyn Transport,
        message: &InboundMessage,
    ) -> HandleOutcome {
        let bot_id = transport.self_id();
        let dispatch = classify(
            message,
            bot_id.as_deref(),
            self.router.table(),
            self.router.lists(),
        );

        let reply = match dispatch {
            Dispatch::Ignored(reason) => {
                debug!(sender = %message.sender_id, ?reason, "message ignored");
                return HandleOutcome::Ignored(reason);
            }
            Dispatch::Command(Ok(command)) => {
                self.router
                    .dispatch(transport, &command, &message.sender_id)
                    .await
            }
            Dispatch::Command(Err(err)) => Reply::error(&CommandError::Parse(err)),
            Dispatch::Actuation(Ok(request)) => {
                info!(sender = %message.sender_id, "trigger word matched");
                self.router.actuate(&request).await
            }
            Dispatch::Actuation(Err(err)) => Reply::error(&err),
        };

        if let Err(err) = transport.send(&message.channel, &reply.render()).await {
            error!(channel = message.channel.as_str(), error = %err, "failed to send reply");
        }

        if reply.shutdown {
            info!(sender = %message.sender_id, "shutdown requested");
            if let Err(err) = transport.close().await {
                warn!(error = %err, "transport did not close cleanly");
            }
            return HandleOutcome::Shutdown;
        }
        HandleOutcome::Replied {
            error: reply.is_error(),
        }
    }

    /// Consumes messages one at a time until shutdown or the stream ends.
    pub async fn run(
        &mut self,
        transport: &dyn Transport,
        inbound: &mut mpsc::Receiver<InboundMessage>,
    ) {
        info!("engine ready");
        while let Some(message) = inbound.recv().await {
            if self.handle(transport, &message).await == HandleOutcome::Shutdown {
                break;
            }
        }
        info!("engine stopped");
    }
}
