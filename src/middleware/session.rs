//! Session-backed access gate.
//!
//! A login grants a role by writing a signed cookie. The cookie carries the
//! granted roles and the time they were issued, followed by an HMAC-SHA256 tag
//! over that payload. Handlers never look at the cookie directly: they take an
//! [`AuthContext`] extracted from the request and ask it for a role.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::Credentials;
use crate::errors::AppError;
use crate::models::approval::ManagerLevel;
use crate::AppState;

pub const SESSION_COOKIE: &str = "approval_session";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager1,
    Manager2,
    Viewer,
}

impl Role {
    pub fn manager(level: ManagerLevel) -> Self {
        match level {
            ManagerLevel::One => Role::Manager1,
            ManagerLevel::Two => Role::Manager2,
        }
    }

    pub fn login_path(self) -> String {
        match self {
            Role::Manager1 => "/manager/login/1".into(),
            Role::Manager2 => "/manager/login/2".into(),
            Role::Viewer => "/viewer/login".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub roles: BTreeSet<Role>,
    pub issued_at: i64,
}

/// Roles proven by the caller's session for the current request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthContext {
    roles: BTreeSet<Role>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn has(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Err redirects the caller to the login page for `role`.
    pub fn require(&self, role: Role) -> Result<(), AppError> {
        if self.has(role) {
            Ok(())
        } else {
            Err(AppError::Unauthenticated {
                login_path: role.login_path(),
            })
        }
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().copied()
    }

    /// Context after a successful login: previous roles are kept.
    pub fn grant(&self, role: Role) -> Self {
        let mut roles = self.roles.clone();
        roles.insert(role);
        Self { roles }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let now = chrono::Utc::now().timestamp();
        let ctx = read_cookie(&parts.headers, SESSION_COOKIE)
            .and_then(|v| {
                decode_session(
                    &state.config.session_secret,
                    v,
                    now,
                    state.config.session_ttl_secs,
                )
            })
            .map(|claims| AuthContext {
                roles: claims.roles,
            })
            .unwrap_or_default();
        Ok(ctx)
    }
}

// ── Credentials ─────────────────────────────────────────────

pub fn check_manager_password(creds: &Credentials, level: ManagerLevel, password: &str) -> bool {
    let expected = match level {
        ManagerLevel::One => &creds.manager1_password,
        ManagerLevel::Two => &creds.manager2_password,
    };
    constant_time_eq(password, expected)
}

pub fn check_viewer(creds: &Credentials, username: &str, password: &str) -> bool {
    // Both comparisons always run.
    let user_ok = constant_time_eq(username, &creds.viewer_username);
    let pass_ok = constant_time_eq(password, &creds.viewer_password);
    user_ok & pass_ok
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

// ── Cookie encoding ─────────────────────────────────────────

fn sign(secret: &str, payload: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    mac
}

/// `<base64url(json claims)>.<hex hmac>`
pub fn encode_session(secret: &str, claims: &SessionClaims) -> String {
    let json = serde_json::to_vec(claims).unwrap_or_default();
    let payload = URL_SAFE_NO_PAD.encode(json);
    let tag = sign(secret, payload.as_bytes()).finalize().into_bytes();
    format!("{}.{}", payload, hex::encode(tag))
}

/// Returns the claims when the tag verifies and the session has not expired.
pub fn decode_session(secret: &str, value: &str, now: i64, ttl_secs: i64) -> Option<SessionClaims> {
    let (payload, tag_hex) = value.split_once('.')?;
    let tag = hex::decode(tag_hex).ok()?;
    sign(secret, payload.as_bytes()).verify_slice(&tag).ok()?;

    let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: SessionClaims = serde_json::from_slice(&json).ok()?;
    let age = now - claims.issued_at;
    if !(0..=ttl_secs).contains(&age) {
        tracing::debug!(age, "session expired");
        return None;
    }
    Some(claims)
}

pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// `Set-Cookie` header granting `ctx`'s roles from `now`.
pub fn session_cookie(
    secret: &str,
    ttl_secs: i64,
    ctx: &AuthContext,
    now: i64,
) -> (axum::http::HeaderName, HeaderValue) {
    let claims = SessionClaims {
        roles: ctx.roles.clone(),
        issued_at: now,
    };
    let value = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        encode_session(secret, &claims),
        ttl_secs
    );
    // base64url, hex and the fixed attributes are all valid header bytes
    let header = HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(""));
    (SET_COOKIE, header)
}
