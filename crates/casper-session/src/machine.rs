//! The session state machine as a pure function.
//!
//! [`transition`] never performs I/O. It returns the next state and an
//! ordered list of [`Effect`]s, which the manager carries out. A pair of
//! (state, event) with no edge leaves the state unchanged with no effects.

use crate::state::{DisconnectReason, SessionState};

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Begin a connect cycle.
    Start,
    /// The protocol client produced a pairing QR payload.
    QrReceived(String),
    /// The protocol client finished authenticating.
    ConnectionOpen,
    /// The transport closed.
    ConnectionClosed(DisconnectReason),
    /// The pending reconnect timer fired.
    ReconnectDue,
}

/// Side effects requested by a transition, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a protocol client connection with the stored credentials.
    Connect,
    /// Install a new pairing challenge, dropping any previous one.
    ReplaceChallenge(String),
    /// Drop the pairing challenge.
    ClearChallenge,
    /// Zero the consecutive reconnect counter.
    ResetAttempts,
    /// Mark the stored credentials as revoked.
    InvalidateCredentials,
    /// Arm the reconnect timer, replacing any pending one.
    ScheduleReconnect,
    /// Disarm the reconnect timer.
    CancelReconnect,
}

/// Result of feeding one event to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State after the event.
    pub next: SessionState,
    /// Effects to run, in order.
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: SessionState, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }

    fn stay(state: SessionState) -> Self {
        Self {
            next: state,
            effects: Vec::new(),
        }
    }

    /// Whether the event was ignored.
    #[must_use]
    pub fn is_ignored(&self, from: SessionState) -> bool {
        self.next == from && self.effects.is_empty()
    }
}

/// Compute the transition for `event` in `state`.
#[must_use]
pub fn transition(state: SessionState, event: &SessionEvent) -> Transition {
    use SessionState::{AwaitingPairing, Closed, Connecting, FatalLoggedOut, Idle, Online};

    match (state, event) {
        (Idle, SessionEvent::Start) | (Closed, SessionEvent::ReconnectDue) => {
            Transition::to(Connecting, vec![Effect::Connect])
        },
        (Closed, SessionEvent::Start) => {
            Transition::to(Connecting, vec![Effect::CancelReconnect, Effect::Connect])
        },
        (Connecting | AwaitingPairing, SessionEvent::QrReceived(payload)) => Transition::to(
            AwaitingPairing,
            vec![Effect::ReplaceChallenge(payload.clone())],
        ),
        (Connecting | AwaitingPairing, SessionEvent::ConnectionOpen) => Transition::to(
            Online,
            vec![Effect::ClearChallenge, Effect::ResetAttempts],
        ),
        (Connecting | AwaitingPairing | Online, SessionEvent::ConnectionClosed(reason))
            if reason.is_fatal() =>
        {
            Transition::to(
                FatalLoggedOut,
                vec![
                    Effect::ClearChallenge,
                    Effect::InvalidateCredentials,
                    Effect::CancelReconnect,
                ],
            )
        },
        (Connecting | AwaitingPairing | Online, SessionEvent::ConnectionClosed(_)) => {
            Transition::to(
                Closed,
                vec![Effect::ClearChallenge, Effect::ScheduleReconnect],
            )
        },
        _ => Transition::stay(state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [SessionState; 6] = [
        SessionState::Idle,
        SessionState::Connecting,
        SessionState::AwaitingPairing,
        SessionState::Online,
        SessionState::Closed,
        SessionState::FatalLoggedOut,
    ];

    fn all_events() -> Vec<SessionEvent> {
        vec![
            SessionEvent::Start,
            SessionEvent::QrReceived("qr".into()),
            SessionEvent::ConnectionOpen,
            SessionEvent::ConnectionClosed(DisconnectReason::LoggedOut),
            SessionEvent::ConnectionClosed(DisconnectReason::ConnectionLost),
            SessionEvent::ReconnectDue,
        ]
    }

    fn closed(code: u16) -> SessionEvent {
        SessionEvent::ConnectionClosed(DisconnectReason::from_code(code))
    }

    // ── Listed edges ─────────────────────────────────────────

    #[test]
    fn start_from_idle_connects() {
        let t = transition(SessionState::Idle, &SessionEvent::Start);
        assert_eq!(t.next, SessionState::Connecting);
        assert_eq!(t.effects, vec![Effect::Connect]);
    }

    #[test]
    fn qr_moves_to_awaiting_pairing() {
        for from in [SessionState::Connecting, SessionState::AwaitingPairing] {
            let t = transition(from, &SessionEvent::QrReceived("2@abc".into()));
            assert_eq!(t.next, SessionState::AwaitingPairing);
            assert_eq!(t.effects, vec![Effect::ReplaceChallenge("2@abc".into())]);
        }
    }

    #[test]
    fn open_goes_online_and_resets() {
        for from in [SessionState::Connecting, SessionState::AwaitingPairing] {
            let t = transition(from, &SessionEvent::ConnectionOpen);
            assert_eq!(t.next, SessionState::Online);
            assert_eq!(t.effects, vec![Effect::ClearChallenge, Effect::ResetAttempts]);
        }
    }

    #[test]
    fn every_non_fatal_close_schedules_one_reconnect() {
        let codes = [403, 408, 411, 428, 440, 500, 503, 515, 0, 1006, 4999];
        for from in [
            SessionState::Connecting,
            SessionState::AwaitingPairing,
            SessionState::Online,
        ] {
            for code in codes {
                let t = transition(from, &closed(code));
                assert_eq!(t.next, SessionState::Closed, "{from} {code}");
                let schedules = t
                    .effects
                    .iter()
                    .filter(|e| **e == Effect::ScheduleReconnect)
                    .count();
                assert_eq!(schedules, 1, "{from} {code}");
            }
        }
    }

    #[test]
    fn logged_out_is_fatal_from_every_active_state() {
        for from in [
            SessionState::Connecting,
            SessionState::AwaitingPairing,
            SessionState::Online,
        ] {
            let t = transition(from, &closed(401));
            assert_eq!(t.next, SessionState::FatalLoggedOut);
            assert!(t.effects.contains(&Effect::InvalidateCredentials));
            assert!(!t.effects.contains(&Effect::ScheduleReconnect));
            assert!(!t.effects.contains(&Effect::Connect));
        }
    }

    #[test]
    fn reconnect_due_from_closed_connects() {
        let t = transition(SessionState::Closed, &SessionEvent::ReconnectDue);
        assert_eq!(t.next, SessionState::Connecting);
        assert_eq!(t.effects, vec![Effect::Connect]);
    }

    #[test]
    fn start_from_closed_cancels_pending_timer_first() {
        let t = transition(SessionState::Closed, &SessionEvent::Start);
        assert_eq!(t.next, SessionState::Connecting);
        assert_eq!(t.effects, vec![Effect::CancelReconnect, Effect::Connect]);
    }

    #[test]
    fn challenge_cleared_when_leaving_pairing() {
        for event in [closed(401), closed(428), SessionEvent::ConnectionOpen] {
            let t = transition(SessionState::AwaitingPairing, &event);
            assert!(t.effects.contains(&Effect::ClearChallenge), "{event:?}");
        }
    }

    // ── Ignored pairs ────────────────────────────────────────

    #[test]
    fn fatal_logged_out_is_terminal() {
        for event in all_events() {
            let t = transition(SessionState::FatalLoggedOut, &event);
            assert!(t.is_ignored(SessionState::FatalLoggedOut), "{event:?}");
        }
    }

    #[test]
    fn stale_timer_outside_closed_is_ignored() {
        for state in ALL_STATES {
            if state == SessionState::Closed {
                continue;
            }
            let t = transition(state, &SessionEvent::ReconnectDue);
            assert!(t.is_ignored(state), "{state}");
        }
    }

    #[test]
    fn only_listed_edges_change_state() {
        let mut changed = 0usize;
        for state in ALL_STATES {
            for event in all_events() {
                let t = transition(state, &event);
                if !t.is_ignored(state) {
                    changed = changed.saturating_add(1);
                }
            }
        }
        // Idle+Start, Closed+{Start,ReconnectDue},
        // {Connecting,AwaitingPairing}x{Qr,Open},
        // {Connecting,AwaitingPairing,Online}x{401,408}.
        assert_eq!(changed, 13);
    }

    #[test]
    fn transition_is_deterministic() {
        for state in ALL_STATES {
            for event in all_events() {
                assert_eq!(transition(state, &event), transition(state, &event));
            }
        }
    }

    #[test]
    fn qr_rotation_in_awaiting_pairing_keeps_state() {
        let t = transition(SessionState::AwaitingPairing, &SessionEvent::QrReceived("b".into()));
        assert!(!t.is_ignored(SessionState::AwaitingPairing));
        assert_eq!(t.next, SessionState::AwaitingPairing);
    }
}
