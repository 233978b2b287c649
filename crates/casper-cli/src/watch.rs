//! Terminal feedback for pairing and connection changes.

use casper_session::{SessionHandle, SessionState};
use qrcode::QrCode;
use qrcode::render::unicode;
use tracing::warn;

use crate::theme::{Tone, say};

/// Print every new pairing QR and each state worth telling the operator.
///
/// Returns when the session manager goes away.
pub(crate) async fn watch_session(handle: SessionHandle) {
    let mut rx = handle.subscribe();
    let mut shown_payload: Option<String> = None;
    let mut shown_state = SessionState::Idle;

    loop {
        let (payload, state) = {
            let snapshot = rx.borrow_and_update();
            (snapshot.qr_payload().map(str::to_owned), snapshot.state)
        };

        if payload != shown_payload {
            if let Some(payload) = &payload {
                print_pairing_qr(payload);
            }
            shown_payload = payload;
        }

        if state != shown_state {
            announce(state);
            shown_state = state;
        }

        if rx.changed().await.is_err() {
            break;
        }
    }
}

fn announce(state: SessionState) {
    match state {
        SessionState::Online => say(Tone::Ok, "Connected"),
        SessionState::Closed => say(Tone::Warn, "Connection closed, retrying"),
        SessionState::FatalLoggedOut => {
            say(Tone::Fail, "Logged out by the server");
            say(Tone::Note, "Restart with --reset-credentials to pair again");
        },
        SessionState::Idle | SessionState::Connecting | SessionState::AwaitingPairing => {},
    }
}

fn print_pairing_qr(payload: &str) {
    match render_terminal_qr(payload) {
        Some(image) => {
            say(Tone::Note, "Scan this QR code to pair:");
            println!("{image}");
        },
        None => say(Tone::Note, &format!("Pairing payload: {payload}")),
    }
}

/// Render a payload as a half-block QR for the terminal.
pub(crate) fn render_terminal_qr(payload: &str) -> Option<String> {
    match QrCode::new(payload.as_bytes()) {
        Ok(code) => Some(
            code.render::<unicode::Dense1x2>()
                .dark_color(unicode::Dense1x2::Light)
                .light_color(unicode::Dense1x2::Dark)
                .build(),
        ),
        Err(e) => {
            warn!(error = %e, "Cannot encode pairing payload as QR");
            None
        },
    }
}
