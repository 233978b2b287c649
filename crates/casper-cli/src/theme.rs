//! Terminal output for the operator.

use colored::Colorize;

/// How a status line is decorated.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Tone {
    Ok,
    Note,
    Warn,
    Fail,
}

/// Decorate `text` for `tone`.
pub(crate) fn styled(tone: Tone, text: &str) -> String {
    match tone {
        Tone::Ok => format!("{} {text}", "✓".green()),
        Tone::Note => format!("{} {text}", "i".blue()),
        Tone::Warn => format!("{} {}", "!".yellow(), text.yellow()),
        Tone::Fail => format!("{} {}", "✗".red(), text.red()),
    }
}

/// Print one status line to stdout.
pub(crate) fn say(tone: Tone, text: &str) {
    println!("{}", styled(tone, text));
}

/// Print the startup banner.
pub(crate) fn print_banner(bot_name: &str) {
    let version = env!("CARGO_PKG_VERSION");
    let art = format!(
        r"
  ____
 / ___|__ _ ___ _ __   ___ _ __
| |   / _` / __| '_ \ / _ \ '__|
| |__| (_| \__ \ |_) |  __/ |
 \____\__,_|___/ .__/ \___|_|
               |_|           v{version}
"
    );
    println!("{}", art.cyan());
    println!("{}", format!("{bot_name} · chat-bot session runtime").dimmed());
    println!();
}
