use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{
    auth::{SESSION_COOKIE, cookie_value},
    domain::errors::DomainError,
    interface::http::problem::ApiError,
    state::AppState,
};

/// Lets the request through only with a valid admin session cookie. The
/// verified [`AdminUser`](crate::auth::AdminUser) is stored in the request
/// extensions for handlers that want it.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let user = cookie_value(request.headers(), SESSION_COOKIE)
        .and_then(|token| state.sessions.verify(token));

    let Some(user) = user else {
        debug!(path = %request.uri().path(), "admin session missing or invalid");
        return ApiError::from(DomainError::unauthorized("admin session required"))
            .into_response();
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}
