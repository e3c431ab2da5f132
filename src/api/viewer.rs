use std::sync::Arc;

use axum::{
    extract::{Form, State},
    response::Response,
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::middleware::session::{self, AuthContext, Role};
use crate::models::dashboard::{Dashboard, DashboardQuery};
use crate::workflow::dashboard;
use crate::AppState;

use super::manager::{grant_and_redirect, LoginPage};

#[derive(Deserialize)]
pub struct ViewerLoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// GET /viewer/login
pub async fn login_page() -> Json<LoginPage> {
    Json(LoginPage {
        role: Role::Viewer,
        level: None,
        error: None,
    })
}

/// POST /viewer/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Form(form): Form<ViewerLoginForm>,
) -> Result<Response, AppError> {
    if !session::check_viewer(&state.config.credentials, &form.username, &form.password) {
        tracing::warn!("viewer login failed");
        return Err(AppError::InvalidCredentials(
            "Wrong username or password".into(),
        ));
    }
    tracing::info!("viewer logged in");
    Ok(grant_and_redirect(&state, &ctx, Role::Viewer, "/viewer"))
}

/// GET /viewer: counts plus every request, newest first
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
) -> Result<Json<Dashboard>, AppError> {
    ctx.require(Role::Viewer)?;
    let dashboard = dashboard::load(&state.db, DashboardQuery::default()).await?;
    Ok(Json(dashboard))
}
