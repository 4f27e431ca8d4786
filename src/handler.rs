//! Request Handler: validates the inbound request, classifies it, drives
//! the Revalidation Engine, and logs the outcome. This is the only module
//! that sees the raw incoming request.

use std::sync::Arc;

use http::{Method, StatusCode};

use crate::app_state::AppState;
use crate::classify::{self, FreshnessPolicy};
use crate::engine::RequestContext;
use crate::http_date;
use crate::responder::Responder;
use crate::types::Response;

/// Validates, classifies, and answers one request. Generic over the body
/// type since only the method, URI, and headers are ever read here — the
/// concrete `hyper::body::Incoming` body from a live connection is never
/// touched.
pub async fn handle_request<B>(state: Arc<AppState>, req: http::Request<B>) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let has_query = req.uri().query().is_some();

    if method != Method::GET && method != Method::HEAD {
        log_outcome(&state, &method, &path, StatusCode::METHOD_NOT_ALLOWED);
        return (StatusCode::METHOD_NOT_ALLOWED, "method not allowed\n").into_response();
    }

    if has_query {
        log_outcome(&state, &method, &path, StatusCode::FORBIDDEN);
        return (StatusCode::FORBIDDEN, "query strings are not allowed\n").into_response();
    }

    let Some(repo) = state.config.resolve(&path) else {
        log_outcome(&state, &method, &path, StatusCode::NOT_FOUND);
        return (StatusCode::NOT_FOUND, "no repository is configured for this path\n").into_response();
    };

    let policy = if is_release_file(&path) {
        FreshnessPolicy::FORCE_REVALIDATE
    } else {
        classify::classify(&path)
    };

    let if_modified_since = req
        .headers()
        .get(http::header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(http_date::parse);

    let ctx = RequestContext {
        path: path.clone(),
        method: method.clone(),
        if_modified_since,
        policy,
        origin_url: format!("{}{}", repo.upstream.trim_end_matches('/'), path),
    };

    let response = state.engine.handle(&ctx).await;
    log_outcome(&state, &method, &path, response.status());
    response
}

/// Release-file routes always force both revalidation flags on, overriding
/// whatever the path classifier would otherwise compute — the only override
/// the engine honors.
fn is_release_file(path: &str) -> bool {
    matches!(
        path.rsplit('/').next().unwrap_or(path),
        "Release" | "Release.gpg" | "InRelease"
    )
}

fn log_outcome(state: &AppState, method: &Method, path: &str, status: StatusCode) {
    if state.config.log_requests {
        tracing::info!(%method, %path, %status, "request handled");
    }
}
