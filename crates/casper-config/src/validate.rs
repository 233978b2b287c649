//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges.

use std::ops::RangeInclusive;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Accepted reconnect delays. The retry policy is a single fixed delay,
/// so it must stay short and nonzero.
const RECONNECT_DELAY_MS: RangeInclusive<u64> = 100..=10_000;

/// Accepted reply acknowledgement timeouts.
const SEND_TIMEOUT_MS: RangeInclusive<u64> = 100..=60_000;

/// Accepted shutdown grace periods.
const SHUTDOWN_GRACE_MS: RangeInclusive<u64> = 100..=30_000;

/// Accepted event queue capacities.
const EVENT_BUFFER: RangeInclusive<usize> = 1..=65_536;

/// Log formats understood by the telemetry crate.
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_http(config)?;
    validate_session(config)?;
    validate_bot(config)?;
    validate_log(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_http(config: &Config) -> ConfigResult<()> {
    if config.http.port == 0 {
        return Err(invalid("http.port", "port must be nonzero"));
    }
    if config.http.bind.trim().is_empty() {
        return Err(invalid("http.bind", "bind address must not be empty"));
    }
    Ok(())
}

fn validate_session(config: &Config) -> ConfigResult<()> {
    let s = &config.session;

    if !(s.bridge_url.starts_with("ws://") || s.bridge_url.starts_with("wss://")) {
        return Err(invalid(
            "session.bridge_url",
            format!("'{}' must use the ws:// or wss:// scheme", s.bridge_url),
        ));
    }

    if s.auth_dir.trim().is_empty() {
        return Err(invalid("session.auth_dir", "auth directory must not be empty"));
    }

    check_range(
        "session.reconnect_delay_ms",
        s.reconnect_delay_ms,
        &RECONNECT_DELAY_MS,
    )?;
    check_range("session.send_timeout_ms", s.send_timeout_ms, &SEND_TIMEOUT_MS)?;
    check_range(
        "session.shutdown_grace_ms",
        s.shutdown_grace_ms,
        &SHUTDOWN_GRACE_MS,
    )?;
    check_range("session.event_buffer", s.event_buffer, &EVENT_BUFFER)?;
    Ok(())
}

fn validate_bot(config: &Config) -> ConfigResult<()> {
    if config.bot.name.trim().is_empty() {
        return Err(invalid("bot.name", "bot name must not be empty"));
    }

    let mut chars = config.bot.command_prefix.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_alphanumeric() && !c.is_whitespace() => Ok(()),
        _ => Err(invalid(
            "bot.command_prefix",
            format!(
                "'{}' must be a single non-alphanumeric, non-whitespace character",
                config.bot.command_prefix
            ),
        )),
    }
}

fn validate_log(config: &Config) -> ConfigResult<()> {
    if !LOG_FORMATS.contains(&config.log.format.as_str()) {
        return Err(invalid(
            "log.format",
            format!(
                "unsupported format '{}'; expected one of: {}",
                config.log.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    if config.log.level.trim().is_empty() {
        return Err(invalid("log.level", "level must not be empty"));
    }
    Ok(())
}

fn check_range<T>(field: &str, value: T, range: &RangeInclusive<T>) -> ConfigResult<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!(
                "{value} is out of range; must be between {} and {}",
                range.start(),
                range.end()
            ),
        ))
    }
}
