use serde::{Deserialize, Serialize};

/// Live session state machine.
///
/// State transitions:
/// ```text
/// idle → connecting → active → closing → closed
///            ↓                              ↑
///            └──────── closing ─────────────┘
/// closed → connecting   (only through a fresh `connect`)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Whether `connect` may start a new session from this state.
    pub fn accepts_connect(&self) -> bool {
        matches!(self, Self::Idle | Self::Closed)
    }

    /// Whether the session is shutting down or already shut down.
    pub fn is_terminating(&self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
