use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Field catalog ────────────────────────────────────────────

/// Header fields, in validation order, with their display labels.
pub const HEADER_FIELDS: &[(&str, &str)] = &[
    ("project_name", "Project Name"),
    ("unit_number", "Unit Number"),
    ("paid_amount", "Paid Amount"),
    ("buyer_name", "Buyer Name"),
    ("agent_name", "Agent Name"),
    ("agency_name", "Agency Name"),
    ("agent_contact", "Agent Contact Number"),
];

/// Requester attestation, always required.
pub const ATTESTATION_FIELDS: &[(&str, &str)] = &[
    ("requested_by_signature", "Agent Signature (Requested By)"),
    ("requested_by_date", "Requested By Date"),
];

/// Optional attachments and free-text comments.
pub const DOCUMENT_FIELDS: &[&str] = &[
    "doc_kyc",
    "doc_reservation_agreement",
    "doc_spa",
    "doc_others",
    "comments",
];

/// Kind of change being asked for. Any subset may be selected on one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    PriceReduction,
    BulkDiscount,
    ChangePaymentPlan,
    UnitSwitch,
    UnitCancellation,
    Refund,
    LatePayment,
    WaiverLateFee,
    IssuanceSpa,
    RegistrationDld,
    Others,
}

impl RequestType {
    /// Declaration order; validation reports errors in this order.
    pub const ALL: [RequestType; 11] = [
        RequestType::PriceReduction,
        RequestType::BulkDiscount,
        RequestType::ChangePaymentPlan,
        RequestType::UnitSwitch,
        RequestType::UnitCancellation,
        RequestType::Refund,
        RequestType::LatePayment,
        RequestType::WaiverLateFee,
        RequestType::IssuanceSpa,
        RequestType::RegistrationDld,
        RequestType::Others,
    ];

    /// Form key and column name of the checkbox.
    pub fn flag_key(self) -> &'static str {
        match self {
            RequestType::PriceReduction => "price_reduction_selected",
            RequestType::BulkDiscount => "bulk_discount_selected",
            RequestType::ChangePaymentPlan => "change_payment_plan_selected",
            RequestType::UnitSwitch => "unit_switch_selected",
            RequestType::UnitCancellation => "unit_cancellation_selected",
            RequestType::Refund => "refund_selected",
            RequestType::LatePayment => "late_payment_selected",
            RequestType::WaiverLateFee => "waiver_late_fee_selected",
            RequestType::IssuanceSpa => "issuance_spa_selected",
            RequestType::RegistrationDld => "registration_dld_selected",
            RequestType::Others => "others_selected",
        }
    }

    /// Sub-fields that must be filled in when this type is selected.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            RequestType::PriceReduction => &[
                "pr_listed_price",
                "pr_discount_amount",
                "pr_selling_price",
                "pr_discount_percent",
            ],
            RequestType::BulkDiscount => &[
                "bd_listed_price",
                "bd_discount_amount",
                "bd_selling_price",
                "bd_discount_percent",
                "bd_units",
            ],
            RequestType::ChangePaymentPlan => &[
                "cpp_down_payment_percent",
                "cpp_down_payment_date",
                "cpp_2nd_payment_percent",
                "cpp_2nd_payment_date",
                "cpp_3rd_payment_percent",
                "cpp_3rd_payment_date",
                "cpp_4th_payment_percent",
                "cpp_4th_payment_date",
                "cpp_5th_payment_percent",
                "cpp_5th_payment_date",
                "cpp_6th_payment_percent",
                "cpp_6th_payment_date",
                "cpp_completion_percent",
                "cpp_completion_date",
            ],
            RequestType::UnitSwitch => &["us_booked_unit", "us_new_unit", "us_new_unit_selling_price"],
            RequestType::UnitCancellation => &["uc_amount_paid"],
            RequestType::Refund => &[
                "rf_booking_fees_amount",
                "rf_payment_amount",
                "rf_refund_amount",
            ],
            RequestType::LatePayment => &[
                "lp_payment_schedule_no",
                "lp_initial_due_date",
                "lp_new_payment_date",
                "lp_penalty_amount",
                "lp_overdue_period",
            ],
            RequestType::WaiverLateFee => &["wl_penalty_amount", "wl_waiver_amount"],
            RequestType::IssuanceSpa => &["spa_down_payment_received", "spa_percent"],
            RequestType::RegistrationDld => &["dld_down_payment_received", "dld_percent"],
            RequestType::Others => &["others_text"],
        }
    }

    /// Sub-fields shown with this type but never validated.
    pub fn optional_fields(self) -> &'static [&'static str] {
        match self {
            RequestType::WaiverLateFee => &[
                "wl_downpayment_spa_date",
                "wl_2nd_payment_spa_date",
                "wl_3rd_payment_spa_date",
                "wl_4th_payment_spa_date",
                "wl_5th_payment_spa_date",
                "wl_6th_payment_spa_date",
            ],
            _ => &[],
        }
    }

    pub fn from_flag_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.flag_key() == key)
    }
}

/// Every free-text column of the `requests` table, in storage order.
pub fn text_columns() -> Vec<&'static str> {
    let mut cols: Vec<&'static str> = HEADER_FIELDS.iter().map(|(k, _)| *k).collect();
    for t in RequestType::ALL {
        cols.extend_from_slice(t.required_fields());
        cols.extend_from_slice(t.optional_fields());
    }
    cols.extend_from_slice(DOCUMENT_FIELDS);
    cols.extend(ATTESTATION_FIELDS.iter().map(|(k, _)| *k));
    cols
}

fn is_header_field(key: &str) -> bool {
    HEADER_FIELDS.iter().any(|(k, _)| *k == key)
}

// ── Draft ────────────────────────────────────────────────────

/// Unvalidated form submission: every known text field plus the set of
/// selected request types. Used both for validation and for re-display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestDraft {
    pub values: BTreeMap<String, String>,
    pub selected: BTreeSet<RequestType>,
}

impl RequestDraft {
    /// Build a draft from raw form input. Unknown keys are dropped,
    /// header fields are trimmed, a checkbox counts only when its value is `on`.
    pub fn from_form(form: &HashMap<String, String>) -> Self {
        let values = text_columns()
            .into_iter()
            .map(|key| {
                let raw = form.get(key).map(String::as_str).unwrap_or("");
                let value = if is_header_field(key) { raw.trim() } else { raw };
                (key.to_string(), value.to_string())
            })
            .collect();

        let selected = RequestType::ALL
            .into_iter()
            .filter(|t| form.get(t.flag_key()).map(String::as_str) == Some("on"))
            .collect();

        Self { values, selected }
    }

    /// Value of a text field, empty when absent.
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn select(&mut self, request_type: RequestType) -> &mut Self {
        self.selected.insert(request_type);
        self
    }

    pub fn is_selected(&self, request_type: RequestType) -> bool {
        self.selected.contains(&request_type)
    }
}

// ── Status ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "Pending L1")]
    PendingL1,
    #[serde(rename = "Pending L2")]
    PendingL2,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::PendingL1,
        RequestStatus::PendingL2,
        RequestStatus::Approved,
        RequestStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::PendingL1 => "Pending L1",
            RequestStatus::PendingL2 => "Pending L2",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }

    /// Persisted mirror of the status: 1 and 2 for the pending levels, 0 once terminal.
    pub fn step(self) -> i64 {
        match self {
            RequestStatus::PendingL1 => 1,
            RequestStatus::PendingL2 => 2,
            RequestStatus::Approved | RequestStatus::Rejected => 0,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.step() == 0
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Stored request ───────────────────────────────────────────

/// A change request as stored.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRequest {
    pub id: i64,
    #[serde(skip_serializing)]
    pub edit_token: String,
    pub status: RequestStatus,
    pub step: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub draft: RequestDraft,
}

impl ChangeRequest {
    pub fn project_name(&self) -> &str {
        self.draft.get("project_name")
    }

    pub fn unit_number(&self) -> &str {
        self.draft.get("unit_number")
    }
}
