//! Command router.
//!
//! A pure mapping from inbound text to at most one reply. The whole
//! message, trimmed and lowercased, must equal `<prefix><command>`;
//! anything else is silently ignored. Wall-clock time and uptime come in
//! through [`CommandContext`], so the same input always yields the same
//! output.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::message::CommandReply;
use crate::state::SessionState;

/// Long-form time used by the `time` command.
pub const TIME_FORMAT: &str = "%A, %B %-d, %Y %H:%M:%S";

/// Recognized commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Liveness check.
    Ping,
    /// List of commands.
    Help,
    /// Identity and uptime.
    Info,
    /// Server wall-clock time.
    Time,
    /// Connection state.
    Status,
}

impl Command {
    /// Every command, in help order.
    pub const ALL: [Self; 5] = [Self::Ping, Self::Help, Self::Info, Self::Time, Self::Status];

    /// Command word without prefix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Help => "help",
            Self::Info => "info",
            Self::Time => "time",
            Self::Status => "status",
        }
    }

    /// One-line description for `help`.
    #[must_use]
    pub const fn summary(self) -> &'static str {
        match self {
            Self::Ping => "Check status",
            Self::Help => "This message",
            Self::Info => "Bot info",
            Self::Time => "Server time",
            Self::Status => "Connection status",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == word)
    }
}

/// Everything a reply may depend on besides the command itself.
#[derive(Debug, Clone)]
pub struct CommandContext<'a> {
    /// Who sent the command. The reply goes back here.
    pub sender: &'a str,
    /// Time since the process started.
    pub uptime: Duration,
    /// Session state at the time of the message.
    pub state: SessionState,
    /// Bot display name.
    pub bot_name: &'a str,
    /// Version string shown by `info`.
    pub version: &'a str,
    /// Local wall-clock time for `time`.
    pub now: DateTime<FixedOffset>,
}

/// Maps command text to replies.
#[derive(Debug, Clone, Copy)]
pub struct Router {
    prefix: char,
}

impl Default for Router {
    fn default() -> Self {
        Self::new('!')
    }
}

impl Router {
    /// Create a router for commands starting with `prefix`.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { prefix }
    }

    /// The command prefix.
    #[must_use]
    pub const fn prefix(&self) -> char {
        self.prefix
    }

    /// Normalize `text` and match it against the command table.
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<Command> {
        let normalized = text.trim().to_lowercase();
        let word = normalized.strip_prefix(self.prefix)?;
        Command::from_word(word)
    }

    /// Produce the reply for `text`, or `None` when it is not a command.
    #[must_use]
    pub fn route(&self, text: &str, ctx: &CommandContext<'_>) -> Option<CommandReply> {
        let command = self.parse(text)?;
        Some(CommandReply {
            to: ctx.sender.to_owned(),
            text: self.reply_text(command, ctx),
        })
    }

    /// Reply body for a recognized command.
    #[must_use]
    pub fn reply_text(&self, command: Command, ctx: &CommandContext<'_>) -> String {
        match command {
            Command::Ping => format!("🏓 Pong! {} online!", ctx.bot_name),
            Command::Help => {
                let mut text = format!("*{} Commands:*\n", ctx.bot_name);
                for c in Command::ALL {
                    let _ = write!(text, "\n{}{} - {}", self.prefix, c.name(), c.summary());
                }
                text
            },
            Command::Info => format!(
                "*{}* ✅\nUptime: {}s\nVersion: {}",
                ctx.bot_name,
                ctx.uptime.as_secs(),
                ctx.version
            ),
            Command::Time => format!("🕐 {}", ctx.now.format(TIME_FORMAT)),
            Command::Status => format!(
                "✅ {} is connected\nState: {}\nUptime: {}s",
                ctx.bot_name,
                ctx.state,
                ctx.uptime.as_secs()
            ),
        }
    }
}
