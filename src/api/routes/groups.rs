use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::common::{error_response, rejection_response, ApiError};
use super::state::AppState;
use crate::database::Database;
use crate::groups::{CreateGroupParams, Group};

/// GET /groups
/// List all groups in creation order
pub async fn list_groups(State(state): State<AppState>) -> Result<Json<Vec<Group>>, ApiError> {
    let conn = state.db.get_connection().map_err(error_response)?;
    let groups = Group::list(&conn).map_err(error_response)?;

    Ok(Json(groups))
}

/// GET /groups/{name}
pub async fn get_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Group>, ApiError> {
    let conn = state.db.get_connection().map_err(error_response)?;
    let group = Group::require_by_name(&conn, &name).map_err(error_response)?;

    Ok(Json(group))
}

/// POST /groups
/// Create a new group. Names are unique; a duplicate is a 409
pub async fn create_group(
    State(state): State<AppState>,
    request: Result<Json<CreateGroupParams>, JsonRejection>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let Json(request) = request.map_err(rejection_response)?;
    let conn = state.db.get_connection().map_err(error_response)?;
    let group = Database::immediate_transaction(&conn, |c| Group::create_immediate(c, request))
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(group)))
}

/// DELETE /groups/{name}
/// Delete a group and its schedule
pub async fn delete_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    let conn = state.db.get_connection().map_err(error_response)?;
    Database::immediate_transaction(&conn, |c| Group::delete_immediate(c, &name))
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}
