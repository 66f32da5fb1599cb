use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::common::{error_response, rejection_response, ApiError};
use super::state::AppState;
use crate::groups::Group;
use crate::on_demand::{CreateRequestParams, OnDemandRequest};

#[derive(Debug, Deserialize)]
pub struct ListRequestsParams {
    pub user_email: Option<String>,
}

/// GET /on_demand/requests
/// All requests, or only those of `?user_email=`
pub async fn list_requests(
    State(state): State<AppState>,
    params: Result<Query<ListRequestsParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(rejection_response)?;
    let conn = state.db.get_connection().map_err(error_response)?;

    let requests = match params.user_email {
        Some(email) => OnDemandRequest::list_for_user(&conn, &email),
        None => OnDemandRequest::list(&conn),
    }
    .map_err(error_response)?;

    Ok(Json(json!({ "requests": requests })))
}

/// POST /on_demand/requests
pub async fn create_request(
    State(state): State<AppState>,
    request: Result<Json<CreateRequestParams>, JsonRejection>,
) -> Result<(StatusCode, Json<OnDemandRequest>), ApiError> {
    let Json(request) = request.map_err(rejection_response)?;
    let conn = state.db.get_connection().map_err(error_response)?;
    let created = OnDemandRequest::create(&conn, request).map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /on_demand/requests/{id}
pub async fn delete_request(
    State(state): State<AppState>,
    request_id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(request_id) = request_id.map_err(rejection_response)?;
    let conn = state.db.get_connection().map_err(error_response)?;
    OnDemandRequest::delete(&conn, request_id).map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /on_demand/drivers
/// Every member of every group, for the preferred-driver picker
pub async fn list_drivers(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let conn = state.db.get_connection().map_err(error_response)?;
    let drivers = Group::available_drivers(&conn).map_err(error_response)?;

    Ok(Json(json!({ "drivers": drivers })))
}
