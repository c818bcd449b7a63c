//! Device lifecycle states and the transition table between them.
//!
//! ```text
//! Unfound ──▶ Found ──▶ Connected ──▶ HandshakeComplete
//!               ▲           │                 │
//!               └───────────┴── disconnect ───┘
//! ```

use std::fmt;

use serde::Serialize;

/// Lifecycle state of a device record, without the resources it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// Empty slot: no device identified.
    Unfound,
    /// Address known, no session.
    Found,
    /// Both channels open.
    Connected,
    /// Both channels open and the report parser accepted the handshake.
    HandshakeComplete,
}

impl StateKind {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: StateKind) -> bool {
        use StateKind::*;
        matches!(
            (self, next),
            (Unfound, Found)
                | (Found, Connected)
                | (Connected, HandshakeComplete)
                | (Connected, Found)
                | (HandshakeComplete, Found)
        )
    }

    /// An address is known (every state except `Unfound`).
    pub fn is_found(self) -> bool {
        !matches!(self, StateKind::Unfound)
    }

    /// A session is open.
    pub fn is_connected(self) -> bool {
        matches!(self, StateKind::Connected | StateKind::HandshakeComplete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StateKind::Unfound => "unfound",
            StateKind::Found => "found",
            StateKind::Connected => "connected",
            StateKind::HandshakeComplete => "handshake_complete",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The last notable event recorded on a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceEvent {
    #[default]
    None,
    /// Both channels opened.
    Connected,
    /// The peer closed the session (zero-length read).
    Disconnected,
    /// The local adapter went away under an open session.
    UnexpectedDisconnect,
    /// Consecutive transient read errors reached the configured limit.
    ReadErrorLimit,
}

impl DeviceEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceEvent::None => "none",
            DeviceEvent::Connected => "connected",
            DeviceEvent::Disconnected => "disconnected",
            DeviceEvent::UnexpectedDisconnect => "unexpected_disconnect",
            DeviceEvent::ReadErrorLimit => "read_error_limit",
        }
    }
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StateKind::*;

    const ALL: [StateKind; 4] = [Unfound, Found, Connected, HandshakeComplete];

    #[test]
    fn transition_table() {
        let legal = [
            (Unfound, Found),
            (Found, Connected),
            (Connected, HandshakeComplete),
            (Connected, Found),
            (HandshakeComplete, Found),
        ];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn found_is_never_lost() {
        for from in ALL.into_iter().filter(|s| s.is_found()) {
            for to in ALL {
                if from.can_transition_to(to) {
                    assert!(to.is_found(), "{from} -> {to} would forget the device");
                }
            }
        }
    }

    #[test]
    fn connected_predicates() {
        assert!(!Unfound.is_connected());
        assert!(!Found.is_connected());
        assert!(Connected.is_connected());
        assert!(HandshakeComplete.is_connected());
        assert!(!Unfound.is_found());
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&HandshakeComplete).unwrap(),
            "\"handshake_complete\""
        );
        assert_eq!(
            serde_json::to_string(&DeviceEvent::UnexpectedDisconnect).unwrap(),
            "\"unexpected_disconnect\""
        );
    }
}
