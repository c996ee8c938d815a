pub mod config;
pub mod logging;

pub const APP_NAME: &str = "shockbot";

pub use config::{
    ConfigError, DeviceConfig, DiscordConfig, PolicyConfig, PresenceConfig, ShockbotConfig,
};
