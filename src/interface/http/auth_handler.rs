use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::{
    application::dto::{LoginRequest, LoginResponse, MessageResponse, SessionResponse},
    auth::{SESSION_COOKIE, cookie_value},
    domain::errors::DomainError,
    interface::http::problem::{ApiError, ApiResult},
    state::AppState,
};

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let username = request.username.unwrap_or_default();
    let password = request.password.unwrap_or_default();
    if username.trim().is_empty() || password.is_empty() {
        return Err(DomainError::validation("username and password are required").into());
    }

    let username = username.trim();
    let admins = state.admins.clone();
    let (lookup_name, lookup_password) = (username.to_string(), password);
    let user = tokio::task::spawn_blocking(move || {
        admins.authenticate(&lookup_name, &lookup_password)
    })
    .await
    .map_err(|err| DomainError::internal(format!("credential check failed: {err}")))?;

    let Some(user) = user else {
        warn!(username = %username, "admin login rejected");
        return Err(DomainError::unauthorized("invalid username or password").into());
    };

    let token = state.sessions.issue(&user)?;
    let cookie = set_cookie(&state.sessions.cookie_for(&token))?;
    info!(username = %user.username, role = %user.role, "admin logged in");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            success: true,
            user,
        }),
    )
        .into_response())
}

pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = cookie_value(&headers, SESSION_COOKIE).and_then(|token| state.sessions.verify(token));
    let status = if user.is_some() {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };

    (
        status,
        Json(SessionResponse {
            authenticated: user.is_some(),
            user,
        }),
    )
        .into_response()
}

pub async fn logout(State(state): State<AppState>) -> ApiResult<Response> {
    let cookie = set_cookie(&state.sessions.expired_cookie())?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse {
            success: true,
            message: "Logged out",
        }),
    )
        .into_response())
}

fn set_cookie(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|err| DomainError::internal(format!("invalid session cookie: {err}")).into())
}
