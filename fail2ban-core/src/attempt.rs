//! Login attempt records.
//!
//! Every rejected login submission produces one [`Attempt`] of kind
//! [`AttemptKind::Failure`]. When an identity exhausts its retry budget a second
//! record of kind [`AttemptKind::Ban`] marks the moment the ban was raised.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a record is a plain failed attempt or a ban marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    Failure,
    Ban,
}

impl AttemptKind {
    pub fn is_ban(&self) -> bool {
        matches!(self, AttemptKind::Ban)
    }

    pub fn from_is_ban(is_ban: bool) -> Self {
        if is_ban {
            AttemptKind::Ban
        } else {
            AttemptKind::Failure
        }
    }
}

/// An immutable entry in the append-only attempt log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Store-assigned sequence number; breaks ties between equal timestamps
    pub id: i64,
    /// The login identifier (email or username) that was attempted
    pub identity: String,
    pub kind: AttemptKind,
    pub occurred_at: DateTime<Utc>,
}

impl Attempt {
    pub fn is_ban(&self) -> bool {
        self.kind.is_ban()
    }
}
