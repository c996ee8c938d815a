use shockbot_store::{CredentialStore, ListLoad, ListName, ListStore, MembershipChange};
use tracing::{debug, info};

use crate::actuation::{ActuationGateway, ActuationRequest};
use crate::error::CommandError;
use crate::parser::{Capability, CommandId, CommandTable, ParsedCommand};
use crate::reply::Reply;
use crate::transport::{PresenceKind, Transport};

/// Longest status text echoed back; keeps the reply under the platform message limit.
const STATUS_ECHO_LIMIT: usize = 128;

/// Closed handler table. Every call yields exactly one [`Reply`].
pub struct Router {
    table: CommandTable,
    lists: ListStore,
    credentials: CredentialStore,
    gateway: ActuationGateway,
    streaming_url: String,
}

impl Router {
    pub fn new(
        table: CommandTable,
        lists: ListStore,
        credentials: CredentialStore,
        gateway: ActuationGateway,
        streaming_url: impl Into<String>,
    ) -> Self {
        Self {
            table,
            lists,
            credentials,
            gateway,
            streaming_url: streaming_url.into(),
        }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub fn lists(&self) -> &ListStore {
        &self.lists
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub async fn dispatch(
        &mut self,
        transport: &dyn Transport,
        command: &ParsedCommand,
        sender_id: &str,
    ) -> Reply {
        debug!(command = %command.token, sender = sender_id, "dispatching command");
        match self.execute(transport, command, sender_id).await {
            Ok(reply) => reply,
            Err(err) => {
                debug!(command = %command.token, error = %err, "command rejected");
                Reply::error(&err)
            }
        }
    }

    /// Fires a shock that already passed the trigger gate.
    pub async fn actuate(&self, request: &ActuationRequest) -> Reply {
        match self
            .gateway
            .actuate(request, self.credentials.current())
            .await
        {
            Ok(()) => shock_sent(request),
            Err(err) => Reply::error(&err),
        }
    }

    async fn execute(
        &mut self,
        transport: &dyn Transport,
        command: &ParsedCommand,
        sender_id: &str,
    ) -> Result<Reply, CommandError> {
        self.authorize(command, sender_id)?;

        match command.id {
            CommandId::Ping => {
                let elapsed = transport
                    .round_trip()
                    .await
                    .map_err(|err| CommandError::Transport(err.to_string()))?;
                Ok(Reply::inline(format!("`{} ms`", elapsed.as_millis())))
            }
            CommandId::Status => self.set_status(transport, command).await,
            CommandId::Avatar => self.show_profile_asset(transport, command, Asset::Avatar).await,
            CommandId::Banner => self.show_profile_asset(transport, command, Asset::Banner).await,
            CommandId::AddWord => self.add_word(command.arg(0)),
            CommandId::RemoveWord => self.remove_word(command.arg(0)),
            CommandId::Test => {
                let duration = command.int_arg(0);
                let intensity = command.int_arg(1);
                let request = ActuationRequest::new(intensity, duration)?;
                Ok(self.actuate(&request).await)
            }
            CommandId::SetShocker => {
                self.credentials
                    .set_device(command.arg(0), command.arg(1))
                    .map_err(|err| CommandError::Storage {
                        what: "device settings",
                        cause: err.to_string(),
                    })?;
                Ok(Reply::block("Shocker API key and code set successfully!"))
            }
            CommandId::SetUsername => {
                let username = command.arg(0);
                self.credentials
                    .set_username(username)
                    .map_err(|err| CommandError::Storage {
                        what: "username",
                        cause: err.to_string(),
                    })?;
                Ok(Reply::block(format!("Username `{username}` set successfully!")))
            }
            CommandId::Shocker => self.show_credentials(),
            CommandId::Help => Ok(Reply::block(self.table.help_text())),
            CommandId::Shutdown => Ok(Reply::block("Shutting down...").then_shutdown()),
        }
    }

    fn authorize(&self, command: &ParsedCommand, sender_id: &str) -> Result<(), CommandError> {
        let capability = self
            .table
            .get(command.id)
            .map(|spec| spec.capability)
            .unwrap_or(Capability::Authorized);
        match capability {
            Capability::Open => Ok(()),
            Capability::Authorized if self.lists.authorization_set().contains(sender_id) => Ok(()),
            Capability::Authorized => Err(CommandError::NotAuthorized(command.token.clone())),
        }
    }

    async fn set_status(
        &self,
        transport: &dyn Transport,
        command: &ParsedCommand,
    ) -> Result<Reply, CommandError> {
        let code = command.int_arg(0);
        let kind = PresenceKind::from_code(code).ok_or_else(|| CommandError::InvalidEnumValue {
            field: "type",
            value: code,
            choices: PresenceKind::choices(),
        })?;
        let text = command.arg(1);
        transport
            .set_presence(kind, text, &self.streaming_url)
            .await
            .map_err(|err| CommandError::Transport(err.to_string()))?;
        info!(kind = kind.as_str(), "presence updated");
        Ok(Reply::block(format!(
            "Status set successfully! to {} and type {}",
            clip(text, STATUS_ECHO_LIMIT),
            kind.as_str()
        )))
    }

    async fn show_profile_asset(
        &self,
        transport: &dyn Transport,
        command: &ParsedCommand,
        asset: Asset,
    ) -> Result<Reply, CommandError> {
        let user_id = command.arg(0);
        let profile = transport
            .fetch_user_profile(user_id)
            .await
            .map_err(|err| CommandError::UserResolutionFailed {
                user: user_id.to_string(),
                cause: err.to_string(),
            })?;
        let url = match asset {
            Asset::Avatar => profile.avatar_url,
            Asset::Banner => profile.banner_url,
        };
        Ok(match url {
            Some(url) => Reply::inline(url),
            None => Reply::block(format!(
                "User {user_id} does not have {} set.",
                asset.described()
            )),
        })
    }

    fn add_word(&self, word: &str) -> Result<Reply, CommandError> {
        self.ensure_wordlist_editable()?;
        let change = self.lists.add_word(word).map_err(|err| CommandError::Storage {
            what: "wordlist",
            cause: err.to_string(),
        })?;
        let word = word.trim().to_lowercase();
        Ok(match change {
            MembershipChange::AlreadyPresent => {
                Reply::block(format!("Word `{word}` is already in the list."))
            }
            _ => {
                info!(word = %word, "trigger word added");
                Reply::block(format!("Word `{word}` has been added!"))
            }
        })
    }

    fn remove_word(&self, word: &str) -> Result<Reply, CommandError> {
        self.ensure_wordlist_editable()?;
        let change = self
            .lists
            .remove_word(word)
            .map_err(|err| CommandError::Storage {
                what: "wordlist",
                cause: err.to_string(),
            })?;
        let word = word.trim().to_lowercase();
        Ok(match change {
            MembershipChange::NotPresent => {
                Reply::block(format!("Word `{word}` is not in the list."))
            }
            _ => {
                info!(word = %word, "trigger word removed");
                Reply::block(format!("Word `{word}` has been removed!"))
            }
        })
    }

    /// A corrupted wordlist is left alone rather than overwritten.
    fn ensure_wordlist_editable(&self) -> Result<(), CommandError> {
        match self.lists.load(ListName::Wordlist) {
            ListLoad::Invalid(_) => Err(CommandError::AbsentOrInvalid(
                ListName::Wordlist.file_name(),
            )),
            ListLoad::Present(_) | ListLoad::Absent => Ok(()),
        }
    }

    fn show_credentials(&self) -> Result<Reply, CommandError> {
        let current = self.credentials.current();
        let complete = current.complete().ok_or_else(|| CommandError::NotConfigured {
            missing: current.missing_fields(),
            hint: self.setup_hint(),
        })?;
        Ok(Reply::block(format!(
            "API Key: {}\nCode: {}\nUsername: {}",
            complete.api_key, complete.device_code, complete.username
        )))
    }

    fn setup_hint(&self) -> String {
        setup_hint(&self.table)
    }
}

/// Where to point the user when device settings are incomplete.
pub fn setup_hint(table: &CommandTable) -> String {
    [CommandId::SetShocker, CommandId::SetUsername]
        .iter()
        .filter_map(|id| table.get(*id))
        .map(|spec| table.usage(spec))
        .collect::<Vec<_>>()
        .join("` and `")
}

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn shock_sent(request: &ActuationRequest) -> Reply {
    Reply::block(format!(
        "Shock sent with duration: {}s and intensity: {}",
        request.duration_seconds(),
        request.intensity()
    ))
}

#[derive(Debug, Clone, Copy)]
enum Asset {
    Avatar,
    Banner,
}

impl Asset {
    fn described(self) -> &'static str {
        match self {
            Self::Avatar => "an avatar",
            Self::Banner => "a banner",
        }
    }
}
