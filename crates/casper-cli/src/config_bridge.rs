//! Conversion from `casper_config::Config` to the runtime's own settings.

use casper_bridge::BridgeConfig;
use casper_config::{Config, LogSection};
use casper_session::SessionConfig;
use casper_telemetry::{LogConfig, LogFormat};

/// Logging settings. `verbose` forces `debug`.
pub(crate) fn log_config(section: &LogSection, verbose: bool) -> LogConfig {
    let level = if verbose { "debug" } else { section.level.as_str() };
    // Validation has already restricted the format to known names.
    let format = section.format.parse::<LogFormat>().unwrap_or_default();
    let config = LogConfig::new(level).with_format(format);
    match &section.directory {
        Some(dir) => config.with_directory(dir),
        None => config,
    }
}

/// Session manager settings.
pub(crate) fn session_config(config: &Config) -> SessionConfig {
    SessionConfig {
        reconnect_delay: config.session.reconnect_delay(),
        shutdown_grace: config.session.shutdown_grace(),
        event_buffer: config.session.event_buffer,
        bot_name: config.bot.name.clone(),
        command_prefix: config.bot.prefix_char(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    }
}

/// Bridge transport settings.
pub(crate) fn bridge_config(config: &Config) -> BridgeConfig {
    BridgeConfig {
        url: config.session.bridge_url.clone(),
        send_timeout: config.session.send_timeout(),
        ..BridgeConfig::default()
    }
}
