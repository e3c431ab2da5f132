use serde::{Deserialize, Serialize};

use super::request::{ChangeRequest, RequestStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    PendingL1,
    PendingL2,
    Approved,
    Rejected,
}

impl StatusFilter {
    /// Unknown values fall back to `All`.
    pub fn parse(s: &str) -> Self {
        match s {
            "pending_l1" => StatusFilter::PendingL1,
            "pending_l2" => StatusFilter::PendingL2,
            "approved" => StatusFilter::Approved,
            "rejected" => StatusFilter::Rejected,
            _ => StatusFilter::All,
        }
    }

    pub fn status(self) -> Option<RequestStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::PendingL1 => Some(RequestStatus::PendingL1),
            StatusFilter::PendingL2 => Some(RequestStatus::PendingL2),
            StatusFilter::Approved => Some(RequestStatus::Approved),
            StatusFilter::Rejected => Some(RequestStatus::Rejected),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Latest,
    Project,
    Unit,
}

impl SortKey {
    /// Unknown values fall back to `Latest`.
    pub fn parse(s: &str) -> Self {
        match s {
            "project" => SortKey::Project,
            "unit" => SortKey::Unit,
            _ => SortKey::Latest,
        }
    }

    pub fn order_by(self) -> &'static str {
        match self {
            SortKey::Latest => "id DESC",
            SortKey::Project => "project_name ASC, id DESC",
            SortKey::Unit => "unit_number ASC, id DESC",
        }
    }
}

/// Raw dashboard query string, as sent by the browser.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub project: Option<String>,
    pub unit: Option<String>,
}

/// Parsed list criteria. Empty project/unit strings mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardQuery {
    pub filter: StatusFilter,
    pub sort: SortKey,
    pub project: Option<String>,
    pub unit: Option<String>,
}

impl From<DashboardParams> for DashboardQuery {
    fn from(p: DashboardParams) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            filter: p.filter.as_deref().map(StatusFilter::parse).unwrap_or_default(),
            sort: p.sort.as_deref().map(SortKey::parse).unwrap_or_default(),
            project: non_empty(p.project),
            unit: non_empty(p.unit),
        }
    }
}

/// Aggregate counts over the whole `requests` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StatusCounts {
    pub total: i64,
    pub pending_l1: i64,
    pub pending_l2: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub stats: StatusCounts,
    pub requests: Vec<ChangeRequest>,
    pub projects: Vec<String>,
    pub units: Vec<String>,
    pub active: DashboardQuery,
}
