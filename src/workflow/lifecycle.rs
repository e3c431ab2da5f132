use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use rand::RngCore;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::approval::{ApprovalRecord, ManagerLevel};
use crate::models::request::{ChangeRequest, RequestDraft};
use crate::store::sqlite::{NewRequest, SqliteStore};
use crate::validation::validate;

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct Created {
    pub id: i64,
    pub edit_link: String,
}

/// A request together with its decision history.
#[derive(Debug, Serialize)]
pub struct RequestDetail {
    pub request: ChangeRequest,
    pub approvals: Vec<ApprovalRecord>,
}

impl RequestDetail {
    /// Latest decision recorded at `level`, shown as that manager's signature.
    pub fn signature(&self, level: ManagerLevel) -> Option<&ApprovalRecord> {
        self.approvals
            .iter()
            .rev()
            .find(|a| a.level == level.number() as i64)
    }
}

/// 24 random bytes, URL-safe base64 without padding.
pub fn generate_edit_token() -> String {
    let mut bytes = [0u8; 24];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn edit_link(public_base_url: &str, token: &str) -> String {
    format!("{}/request/edit/{}", public_base_url, token)
}

pub async fn create(
    db: &SqliteStore,
    public_base_url: &str,
    draft: RequestDraft,
) -> Result<Created, AppError> {
    let errors = validate(&draft);
    if !errors.is_empty() {
        tracing::debug!(count = errors.len(), "request submission rejected by validation");
        return Err(AppError::Validation { errors, draft });
    }

    let token = generate_edit_token();
    let id = db
        .insert_request(&NewRequest {
            edit_token: &token,
            draft: &draft,
            now: Utc::now(),
        })
        .await?;

    tracing::info!(
        request_id = id,
        project = draft.get("project_name"),
        unit = draft.get("unit_number"),
        types = draft.selected.len(),
        "change request submitted"
    );

    Ok(Created {
        id,
        edit_link: edit_link(public_base_url, &token),
    })
}

pub async fn read(db: &SqliteStore, id: i64) -> Result<RequestDetail, AppError> {
    let request = db.get_request(id).await?.ok_or(AppError::NotFound)?;
    let approvals = db.list_approvals(id).await?;
    Ok(RequestDetail { request, approvals })
}

pub async fn find_by_token(db: &SqliteStore, token: &str) -> Result<ChangeRequest, AppError> {
    db.get_request_by_token(token)
        .await?
        .ok_or(AppError::NotFound)
}

/// Re-validates the whole draft and overwrites the editable fields.
/// Returns the request id.
pub async fn edit(db: &SqliteStore, token: &str, draft: RequestDraft) -> Result<i64, AppError> {
    let existing = find_by_token(db, token).await?;

    let errors = validate(&draft);
    if !errors.is_empty() {
        return Err(AppError::Validation { errors, draft });
    }

    if !db.update_request_fields(existing.id, &draft, Utc::now()).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(request_id = existing.id, status = %existing.status, "change request edited");
    Ok(existing.id)
}
