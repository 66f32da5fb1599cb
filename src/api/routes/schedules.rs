use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::common::{error_response, rejection_response, ApiError};
use super::state::AppState;
use crate::schedules::{Schedule, ScheduleItem};

/// Request body for generating a schedule
#[derive(Debug, Deserialize)]
pub struct GenerateScheduleRequest {
    pub start_date: NaiveDate,
}

/// GET /groups/{name}/schedule
/// The group's stored schedule, active or not
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Schedule>, ApiError> {
    let conn = state.db.get_connection().map_err(error_response)?;
    let schedule = Schedule::get_by_group_name(&conn, &name).map_err(error_response)?;

    Ok(Json(schedule))
}

/// POST /groups/{name}/schedule
/// Generate a rotation starting at `start_date`. While the group's previous
/// schedule is still active this returns 409 with that schedule instead.
pub async fn generate_schedule(
    State(state): State<AppState>,
    Path(name): Path<String>,
    request: Result<Json<GenerateScheduleRequest>, JsonRejection>,
) -> Result<Json<Vec<ScheduleItem>>, ApiError> {
    let Json(request) = request.map_err(rejection_response)?;
    let conn = state.db.get_connection().map_err(error_response)?;
    let items = Schedule::generate(&conn, &name, request.start_date).map_err(error_response)?;

    Ok(Json(items))
}
