use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    application::dto::{
        CrmCallbackQuery, CrmCallbackResponse, CrmRefreshResponse, DealSearchQuery,
        MessageResponse, SessionResponse,
    },
    domain::deal::DealSearchResult,
    interface::http::problem::ApiResult,
    state::AppState,
};

pub async fn connection_status(State(state): State<AppState>) -> ApiResult<Response> {
    let response = match state.crm_service.status().await? {
        Some(status) => Json(status).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(SessionResponse {
                authenticated: false,
                user: None,
            }),
        )
            .into_response(),
    };
    Ok(response)
}

pub async fn refresh_token(State(state): State<AppState>) -> ApiResult<Json<CrmRefreshResponse>> {
    let refreshed = state.crm_service.refresh().await?;
    Ok(Json(refreshed))
}

pub async fn begin_login(State(state): State<AppState>) -> ApiResult<Redirect> {
    let url = state.crm_service.begin_login().await?;
    Ok(Redirect::to(&url))
}

pub async fn oauth_callback(
    State(state): State<AppState>,
    query: Result<Query<CrmCallbackQuery>, QueryRejection>,
) -> ApiResult<Json<CrmCallbackResponse>> {
    let Query(query) = query?;
    let connection = state.crm_service.complete_login(query).await?;
    Ok(Json(connection))
}

pub async fn logout(State(state): State<AppState>) -> ApiResult<Json<MessageResponse>> {
    state.crm_service.logout().await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "CRM connection closed",
    }))
}

pub async fn search_deals(
    State(state): State<AppState>,
    query: Result<Query<DealSearchQuery>, QueryRejection>,
) -> ApiResult<Json<DealSearchResult>> {
    let Query(query) = query?;
    let lead_id = query.lead_id.unwrap_or_default();
    let result = state.crm_service.search_deals(&lead_id).await?;
    Ok(Json(result))
}
