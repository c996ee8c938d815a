use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use shockbot_common::{APP_NAME, ShockbotConfig, logging};
use shockbot_core::Engine;
use shockbot_pishock::PiShockClient;
use shockbot_store::{
    CredentialStore, ListLoad, ListName, ListStore, MembershipChange, env_file_value,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "shockbot", about = "Chat-triggered shocker bot", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect to Discord and process messages until `shutdown`.
    Run,
    /// Validate local setup and generate default config if missing.
    Doctor,
    /// Edit the ids allowed to trigger shocks.
    Whitelist {
        #[command(subcommand)]
        command: ListCommand,
    },
    /// Edit the trigger words.
    Words {
        #[command(subcommand)]
        command: ListCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ListCommand {
    /// Print every entry.
    List,
    /// Add one entry.
    Add { value: String },
    /// Remove one entry.
    Remove { value: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Run) => run(),
        Some(Command::Doctor) => doctor(),
        Some(Command::Whitelist { command }) => edit_list(ListName::Whitelist, command),
        Some(Command::Words { command }) => edit_list(ListName::Wordlist, command),
        None => {
            println!("{APP_NAME} CLI ready.");
            println!("Run `shockbot doctor` to generate and validate local config.");
            Ok(())
        }
    }
}

fn load_initialized_config() -> Result<ShockbotConfig> {
    let (config, _, _) = ShockbotConfig::load_or_create()?;
    config.validate_and_prepare()?;
    logging::init(&config.log_level);
    Ok(config)
}

fn run() -> Result<()> {
    let config = load_initialized_config()?;
    let token = resolve_token(&config)?;

    let device = PiShockClient::from_config(&config.device)?;
    let mut engine = Engine::from_config(&config, Arc::new(device))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let mut connection = shockbot_discord::connect(&token).await?;
        info!(data_dir = %config.data_dir.display(), "shockbot starting");
        let transport = connection.transport.clone();
        engine.run(&transport, &mut connection.inbound).await;
        connection.wait().await
    })
}

/// `DISCORD_TOKEN` from the process, then the config file, then the env file.
fn resolve_token(config: &ShockbotConfig) -> Result<String> {
    if let Some(token) = config.discord_token() {
        return Ok(token);
    }
    env_file_value(&config.env_file, "DISCORD_TOKEN")?.ok_or_else(|| {
        anyhow!(
            "discord token missing: set DISCORD_TOKEN, discord.token in config, or DISCORD_TOKEN in {}",
            config.env_file.display()
        )
    })
}

fn doctor() -> Result<()> {
    let (config, path, created) = ShockbotConfig::load_or_create()?;
    config.validate_and_prepare()?;
    logging::init(&config.log_level);

    println!("config_path: {}", path.display());
    println!("config_created: {created}");
    println!("data_dir: {}", config.data_dir.display());
    println!("command_prefix: {}", config.discord.command_prefix);
    println!(
        "word_commands_require_authorization: {}",
        config.policy.word_commands_require_authorization
    );
    println!("discord_token: {}", presence_label(resolve_token(&config).is_ok()));

    let lists = ListStore::at_dir(config.data_dir.clone());
    for name in [ListName::Whitelist, ListName::Wordlist] {
        println!("{}: {}", name.as_str(), describe_load(&lists.load(name)));
    }

    let credentials = CredentialStore::load(config.env_file.clone())?;
    let missing = credentials.current().missing_fields();
    if missing.is_empty() {
        println!("device_credentials: complete");
    } else {
        println!("device_credentials: missing {}", missing.join(", "));
    }
    Ok(())
}

fn edit_list(name: ListName, command: ListCommand) -> Result<()> {
    let config = load_initialized_config()?;
    let lists = ListStore::at_dir(config.data_dir.clone());
    apply_list_command(&lists, name, command)
}

fn apply_list_command(lists: &ListStore, name: ListName, command: ListCommand) -> Result<()> {
    match command {
        ListCommand::List => {
            let load = lists.load(name);
            if !load.is_present() {
                println!("{}: {}", name.as_str(), describe_load(&load));
            }
            for item in load.into_items() {
                println!("- {item}");
            }
        }
        ListCommand::Add { value } => {
            ensure_editable(lists, name)?;
            let change = match name {
                ListName::Whitelist => lists.add_member(&value)?,
                ListName::Wordlist => lists.add_word(&value)?,
            };
            println!("{}: {}", name.as_str(), describe_change(change));
        }
        ListCommand::Remove { value } => {
            ensure_editable(lists, name)?;
            let change = match name {
                ListName::Whitelist => lists.remove_member(&value)?,
                ListName::Wordlist => lists.remove_word(&value)?,
            };
            println!("{}: {}", name.as_str(), describe_change(change));
        }
    }
    Ok(())
}

fn ensure_editable(lists: &ListStore, name: ListName) -> Result<()> {
    if let ListLoad::Invalid(reason) = lists.load(name) {
        return Err(anyhow!(reason)).with_context(|| {
            format!(
                "{} is malformed; fix or delete it first",
                lists.path_for(name).display()
            )
        });
    }
    Ok(())
}

fn describe_load(load: &ListLoad) -> String {
    match load {
        ListLoad::Present(items) => format!("{} entries", items.len()),
        ListLoad::Absent => "absent (treated as empty)".to_string(),
        ListLoad::Invalid(reason) => format!("invalid ({reason}); treated as empty"),
    }
}

fn describe_change(change: MembershipChange) -> &'static str {
    match change {
        MembershipChange::Added => "added",
        MembershipChange::AlreadyPresent => "already present",
        MembershipChange::Removed => "removed",
        MembershipChange::NotPresent => "not present",
    }
}

fn presence_label(present: bool) -> &'static str {
    if present { "set" } else { "missing" }
}
