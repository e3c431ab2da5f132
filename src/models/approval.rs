use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two sequential manager stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ManagerLevel {
    One,
    Two,
}

impl ManagerLevel {
    pub fn number(self) -> u8 {
        match self {
            ManagerLevel::One => 1,
            ManagerLevel::Two => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(ManagerLevel::One),
            2 => Some(ManagerLevel::Two),
            _ => None,
        }
    }
}

impl From<ManagerLevel> for u8 {
    fn from(level: ManagerLevel) -> u8 {
        level.number()
    }
}

impl TryFrom<u8> for ManagerLevel {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        ManagerLevel::from_number(n).ok_or_else(|| format!("unknown manager level {}", n))
    }
}

impl std::fmt::Display for ManagerLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[sqlx(type_name = "TEXT")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    /// Accepts exactly the two submitted values `Approved` and `Rejected`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Approved" => Some(Decision::Approved),
            "Rejected" => Some(Decision::Rejected),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Approved => "Approved",
            Decision::Rejected => "Rejected",
        }
    }
}

/// One manager decision. Rows are append-only.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApprovalRecord {
    pub id: i64,
    pub request_id: i64,
    pub level: i64,
    pub approver_name: String,
    pub decision: Decision,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}
