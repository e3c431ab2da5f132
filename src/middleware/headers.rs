use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

/// Middleware: tags every response with a fresh `x-request-id` so a user
/// report can be matched against the server logs.
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("request", request_id = %req_id);

    let mut resp = next.run(req).instrument(span).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Middleware: security headers on every response.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));

    // Request views and dashboards are per-user; never cache them.
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));

    // Edit links carry the edit token in the path.
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));

    headers.remove("Server");
    resp
}
