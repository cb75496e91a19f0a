use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};

use crate::{
    application::dto::{
        AdvanceStatusRequest, CreateTransferRequest, HealthResponse, ListTransfersQueryRequest,
        ProblemReportRequest, ProblemReportResponse, TransferResponse, UndoStatusRequest,
    },
    interface::http::problem::ApiResult,
    state::AppState,
};

pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn create_transfer(
    State(state): State<AppState>,
    payload: Result<Json<CreateTransferRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TransferResponse>)> {
    let Json(request) = payload?;
    let created = state.transfer_service.create_transfer(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_transfers(
    State(state): State<AppState>,
    query: Result<Query<ListTransfersQueryRequest>, QueryRejection>,
) -> ApiResult<Json<Vec<TransferResponse>>> {
    let Query(query) = query?;
    let transfers = state.transfer_service.list_transfers(query).await?;
    Ok(Json(transfers))
}

pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TransferResponse>> {
    let transfer = state.transfer_service.get_transfer(&id).await?;
    Ok(Json(transfer))
}

pub async fn advance_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AdvanceStatusRequest>, JsonRejection>,
) -> ApiResult<Json<TransferResponse>> {
    let Json(request) = payload?;
    let updated = state.transfer_service.advance_status(&id, request).await?;
    Ok(Json(updated))
}

pub async fn undo_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UndoStatusRequest>, JsonRejection>,
) -> ApiResult<Json<TransferResponse>> {
    let Json(request) = payload?;
    let updated = state.transfer_service.undo_status(&id, request).await?;
    Ok(Json(updated))
}

pub async fn report_problem(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ProblemReportRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProblemReportResponse>)> {
    let Json(request) = payload?;
    let report = state.transfer_service.report_problem(&id, request).await?;
    Ok((StatusCode::ACCEPTED, Json(report)))
}
