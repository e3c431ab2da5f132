#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use approval_desk::config::Config;
use approval_desk::models::request::RequestDraft;
use approval_desk::store::sqlite::SqliteStore;
use approval_desk::AppState;

pub async fn test_store() -> SqliteStore {
    let db = SqliteStore::in_memory().await.expect("in-memory sqlite");
    db.migrate().await.expect("migrations");
    db
}

pub async fn test_state() -> Arc<AppState> {
    Arc::new(AppState {
        db: test_store().await,
        config: Config::for_tests(),
    })
}

/// A complete price-reduction submission.
pub fn price_reduction_form() -> HashMap<String, String> {
    [
        ("project_name", "Project A"),
        ("unit_number", "12"),
        ("paid_amount", "1000"),
        ("buyer_name", "Omar Haddad"),
        ("agent_name", "Lina Saleh"),
        ("agency_name", "Gulf Homes"),
        ("agent_contact", "0501234567"),
        ("price_reduction_selected", "on"),
        ("pr_listed_price", "900000"),
        ("pr_discount_amount", "45000"),
        ("pr_selling_price", "855000"),
        ("pr_discount_percent", "5"),
        ("requested_by_signature", "Lina Saleh"),
        ("requested_by_date", "2024-05-01"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn price_reduction_draft() -> RequestDraft {
    RequestDraft::from_form(&price_reduction_form())
}

pub fn draft_for(project: &str, unit: &str) -> RequestDraft {
    let mut form = price_reduction_form();
    form.insert("project_name".into(), project.into());
    form.insert("unit_number".into(), unit.into());
    RequestDraft::from_form(&form)
}

/// `application/x-www-form-urlencoded` body for simple ASCII values.
pub fn form_body(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v.replace(' ', "+")))
        .collect::<Vec<_>>()
        .join("&")
}
