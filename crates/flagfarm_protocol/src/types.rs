//! Canonical data model (§3) and the small wire shapes layered on top of it.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a stored flag. Numeric values match §3 exactly; once a
/// flag leaves `Pending` it never returns (enforced by the store, not here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlagStatus {
    Pending = 0,
    Expired = 1,
    Unknown = 2,
    Accepted = 3,
    Rejected = 4,
}

impl FlagStatus {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::Pending),
            1 => Some(Self::Expired),
            2 => Some(Self::Unknown),
            3 => Some(Self::Accepted),
            4 => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A stored flag row, as returned by paginated reads (§4.1 `page`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flag {
    pub flag: String,
    pub exploit: String,
    pub timestamp: i64,
    pub status: FlagStatus,
    pub submission_timestamp: Option<i64>,
    pub system_message: Option<String>,
    /// Derived: `(submission_timestamp or now) - timestamp`. Only populated
    /// by `page`; absent on rows freshly read out of `next_pending_batch`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<i64>,
}

/// Outcome of submitting one flag to the upstream game system (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Accepted,
    Rejected,
    Unknown,
}

impl VerdictStatus {
    pub fn into_flag_status(self) -> FlagStatus {
        match self {
            Self::Accepted => FlagStatus::Accepted,
            Self::Rejected => FlagStatus::Rejected,
            Self::Unknown => FlagStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Verdict {
    pub flag: String,
    pub status: VerdictStatus,
    pub message: Option<String>,
}

/// Response body for `GET /api/config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(rename = "flagFormat")]
    pub flag_format: String,
    #[serde(rename = "flagLifetime")]
    pub flag_lifetime: i64,
    #[serde(rename = "tickDuration")]
    pub tick_duration: i64,
    pub teams: Vec<String>,
}

