use std::sync::Arc;

use axum::{
    extract::{Form, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::middleware::session::{self, AuthContext, Role};
use crate::models::approval::ManagerLevel;
use crate::models::dashboard::{Dashboard, DashboardParams, DashboardQuery};
use crate::workflow::approval::{self, DecisionForm};
use crate::workflow::{dashboard, lifecycle};
use crate::AppState;

use super::handlers::RequestView;

#[derive(Serialize)]
pub struct LoginPage {
    pub role: Role,
    pub level: Option<ManagerLevel>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct ManagerDashboard {
    pub level: ManagerLevel,
    #[serde(flatten)]
    pub dashboard: Dashboard,
}

/// Anything but `1` or `2` in the level segment is an unknown page.
fn parse_level(raw: &str) -> Result<ManagerLevel, AppError> {
    match raw {
        "1" => Ok(ManagerLevel::One),
        "2" => Ok(ManagerLevel::Two),
        _ => Err(AppError::NotFound),
    }
}

/// Sign the caller in as `role` and redirect to `to`.
pub(super) fn grant_and_redirect(state: &AppState, ctx: &AuthContext, role: Role, to: &str) -> Response {
    let now = chrono::Utc::now().timestamp();
    let cookie = session::session_cookie(
        &state.config.session_secret,
        state.config.session_ttl_secs,
        &ctx.grant(role),
        now,
    );
    ([cookie], Redirect::to(to)).into_response()
}

/// GET /manager/login/:level
pub async fn login_page(Path(level): Path<String>) -> Result<Json<LoginPage>, AppError> {
    let level = parse_level(&level)?;
    Ok(Json(LoginPage {
        role: Role::manager(level),
        level: Some(level),
        error: None,
    }))
}

/// POST /manager/login/:level and POST /manager/:level. A caller already
/// signed in at this level goes straight to the dashboard.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(level): Path<String>,
    Form(form): Form<PasswordForm>,
) -> Result<Response, AppError> {
    let level = parse_level(&level)?;
    let role = Role::manager(level);
    let dashboard = format!("/manager/{}", level);
    if ctx.has(role) {
        return Ok(Redirect::to(&dashboard).into_response());
    }
    if !session::check_manager_password(&state.config.credentials, level, &form.password) {
        tracing::warn!(level = %level, "manager login failed");
        return Err(AppError::InvalidCredentials("Wrong password".into()));
    }
    tracing::info!(level = %level, "manager logged in");
    Ok(grant_and_redirect(&state, &ctx, role, &dashboard))
}

/// GET /manager/:level: stats plus the filterable request list
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(level): Path<String>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<ManagerDashboard>, AppError> {
    let level = parse_level(&level)?;
    ctx.require(Role::manager(level))?;

    let dashboard = dashboard::load(&state.db, DashboardQuery::from(params)).await?;
    Ok(Json(ManagerDashboard { level, dashboard }))
}

/// GET /manager/:level/request/:id: decision page
pub async fn request_view(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path((level, id)): Path<(String, i64)>,
) -> Result<Json<RequestView>, AppError> {
    let level = parse_level(&level)?;
    ctx.require(Role::manager(level))?;

    let mut view = RequestView::new(lifecycle::read(&state.db, id).await?);
    view.manager_level = Some(level);
    Ok(Json(view))
}

/// POST /manager/:level/request/:id: approve or reject
pub async fn decide(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path((level, id)): Path<(String, i64)>,
    Form(form): Form<DecisionForm>,
) -> Result<Response, AppError> {
    let level = parse_level(&level)?;
    ctx.require(Role::manager(level))?;

    match approval::decide(&state.db, level, id, &form).await {
        Ok(_) => Ok(Redirect::to(&format!("/manager/{}", level)).into_response()),
        Err(e) => {
            // Input and sequence errors are shown inline; the request is unchanged.
            let status = e.status_code();
            let message = match e {
                AppError::InvalidDecision(m) | AppError::NotReady(m) => m,
                other => return Err(other),
            };
            let mut view = RequestView::new(lifecycle::read(&state.db, id).await?);
            view.manager_level = Some(level);
            view.error = Some(message);
            Ok((status, Json(view)).into_response())
        }
    }
}
