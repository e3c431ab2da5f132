use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Form, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::approval::{ApprovalRecord, ManagerLevel};
use crate::models::request::{ChangeRequest, RequestDraft, RequestType};
use crate::workflow::lifecycle::{self, RequestDetail};
use crate::AppState;

// ── View models ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct TypeFields {
    pub request_type: RequestType,
    pub flag_key: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

/// Everything a front end needs to render the request form.
#[derive(Serialize)]
pub struct FormContext {
    pub draft: Option<RequestDraft>,
    pub errors: Vec<String>,
    pub edit_token: Option<String>,
    pub project_choices: Vec<String>,
    pub unit_choices: Vec<String>,
    pub request_types: Vec<TypeFields>,
}

impl FormContext {
    fn new(state: &AppState) -> Self {
        Self {
            draft: None,
            errors: Vec::new(),
            edit_token: None,
            project_choices: state.config.project_choices.clone(),
            unit_choices: state.config.unit_choices(),
            request_types: RequestType::ALL
                .into_iter()
                .map(|t| TypeFields {
                    request_type: t,
                    flag_key: t.flag_key(),
                    required: t.required_fields(),
                    optional: t.optional_fields(),
                })
                .collect(),
        }
    }
}

/// Read-only request page, shared by requesters and managers.
#[derive(Serialize)]
pub struct RequestView {
    pub request: ChangeRequest,
    pub approvals: Vec<ApprovalRecord>,
    pub manager1_signature: Option<ApprovalRecord>,
    pub manager2_signature: Option<ApprovalRecord>,
    pub edit_link: Option<String>,
    pub from_submit: bool,
    pub manager_level: Option<ManagerLevel>,
    pub error: Option<String>,
}

impl RequestView {
    pub fn new(detail: RequestDetail) -> Self {
        let manager1_signature = detail.signature(ManagerLevel::One).cloned();
        let manager2_signature = detail.signature(ManagerLevel::Two).cloned();
        Self {
            request: detail.request,
            approvals: detail.approvals,
            manager1_signature,
            manager2_signature,
            edit_link: None,
            from_submit: false,
            manager_level: None,
            error: None,
        }
    }
}

#[derive(Deserialize)]
pub struct ViewParams {
    pub submitted: Option<String>,
}

/// Form re-display for a failed submission, otherwise the error itself.
fn form_error(state: &AppState, err: AppError, edit_token: Option<String>) -> Response {
    match err {
        AppError::Validation { errors, draft } => {
            let status = axum::http::StatusCode::UNPROCESSABLE_ENTITY;
            let ctx = FormContext {
                draft: Some(draft),
                errors,
                edit_token,
                ..FormContext::new(state)
            };
            (status, Json(ctx)).into_response()
        }
        other => other.into_response(),
    }
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /: send visitors to the submission form
pub async fn index() -> Redirect {
    Redirect::to("/request/new")
}

/// GET /request/new: empty form
pub async fn new_request_form(State(state): State<Arc<AppState>>) -> Json<FormContext> {
    Json(FormContext::new(&state))
}

/// POST /request/new: submit a new change request
pub async fn submit_request(
    State(state): State<Arc<AppState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let draft = RequestDraft::from_form(&form);
    match lifecycle::create(&state.db, &state.config.public_base_url, draft).await {
        Ok(created) => Redirect::to(&format!("/request/{}?submitted=1", created.id)).into_response(),
        Err(e) => form_error(&state, e, None),
    }
}

/// GET /request/edit/:token: form prefilled from the stored request
pub async fn edit_request_form(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<FormContext>, AppError> {
    let existing = lifecycle::find_by_token(&state.db, &token).await?;
    Ok(Json(FormContext {
        draft: Some(existing.draft),
        edit_token: Some(token),
        ..FormContext::new(&state)
    }))
}

/// POST /request/edit/:token: overwrite the request's fields
pub async fn submit_edit(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let draft = RequestDraft::from_form(&form);
    match lifecycle::edit(&state.db, &token, draft).await {
        Ok(id) => Redirect::to(&format!("/request/{}", id)).into_response(),
        Err(e) => form_error(&state, e, Some(token)),
    }
}

/// GET /request/:id: read-only view. The edit link is only revealed right
/// after submission.
pub async fn view_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<ViewParams>,
) -> Result<Json<RequestView>, AppError> {
    let detail = lifecycle::read(&state.db, id).await?;
    let from_submit = params.submitted.as_deref() == Some("1");

    let mut view = RequestView::new(detail);
    if from_submit {
        view.edit_link = Some(lifecycle::edit_link(
            &state.config.public_base_url,
            &view.request.edit_token,
        ));
    }
    view.from_submit = from_submit;
    Ok(Json(view))
}
