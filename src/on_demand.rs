use chrono::NaiveDate;
use log::info;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::CarpoolError;

/// Parameters for a new on-demand ride request. Coordinates are whatever the
/// caller's geocoder produced; they are range-checked but not resolved here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRequestParams {
    pub user_email: String,
    pub origin: String,
    pub origin_lat: Option<f64>,
    pub origin_lng: Option<f64>,
    pub destination: String,
    pub dest_lat: Option<f64>,
    pub dest_lng: Option<f64>,
    pub dest_place_id: Option<String>,
    pub dest_address: Option<String>,
    pub date: Option<NaiveDate>,
    pub preferred_driver: Option<String>,
}

/// A one-off ride request, outside of any group rotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnDemandRequest {
    #[serde(rename = "id")]
    pub request_id: i64,
    pub user_email: String,
    pub origin: String,
    pub origin_lat: Option<f64>,
    pub origin_lng: Option<f64>,
    pub destination: String,
    pub dest_lat: Option<f64>,
    pub dest_lng: Option<f64>,
    pub dest_place_id: Option<String>,
    pub dest_address: Option<String>,
    pub date: NaiveDate,
    pub preferred_driver: Option<String>,
    pub created_at: i64, // Unix timestamp (UTC)
}

const SELECT_COLUMNS: &str = "request_id, user_email, origin, origin_lat, origin_lng,
    destination, dest_lat, dest_lng, dest_place_id, dest_address,
    request_date, preferred_driver, created_at";

fn required(value: &str, field: &str) -> Result<String, CarpoolError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CarpoolError::Invalid(format!("{} cannot be empty", field)));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn check_point(lat: Option<f64>, lng: Option<f64>, label: &str) -> Result<(), CarpoolError> {
    match (lat, lng) {
        (None, None) => Ok(()),
        (Some(lat), Some(lng)) => {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(CarpoolError::Invalid(format!(
                    "{} latitude must be between -90 and 90, got: {}",
                    label, lat
                )));
            }
            if !(-180.0..=180.0).contains(&lng) {
                return Err(CarpoolError::Invalid(format!(
                    "{} longitude must be between -180 and 180, got: {}",
                    label, lng
                )));
            }
            Ok(())
        }
        _ => Err(CarpoolError::Invalid(format!(
            "{} latitude and longitude must be given together",
            label
        ))),
    }
}

impl OnDemandRequest {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(OnDemandRequest {
            request_id: row.get(0)?,
            user_email: row.get(1)?,
            origin: row.get(2)?,
            origin_lat: row.get(3)?,
            origin_lng: row.get(4)?,
            destination: row.get(5)?,
            dest_lat: row.get(6)?,
            dest_lng: row.get(7)?,
            dest_place_id: row.get(8)?,
            dest_address: row.get(9)?,
            date: row.get(10)?,
            preferred_driver: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    pub fn create(conn: &Connection, params: CreateRequestParams) -> Result<Self, CarpoolError> {
        let user_email = required(&params.user_email, "user_email")?;
        let origin = required(&params.origin, "origin")?;
        let destination = required(&params.destination, "destination")?;
        let date = params
            .date
            .ok_or_else(|| CarpoolError::Invalid("date is required".to_string()))?;

        check_point(params.origin_lat, params.origin_lng, "origin")?;
        check_point(params.dest_lat, params.dest_lng, "destination")?;

        let now = chrono::Utc::now().timestamp();

        let request = conn.query_row(
            &format!(
                "INSERT INTO on_demand_requests (
                    user_email, origin, origin_lat, origin_lng,
                    destination, dest_lat, dest_lng, dest_place_id, dest_address,
                    request_date, preferred_driver, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING {}",
                SELECT_COLUMNS
            ),
            rusqlite::params![
                user_email,
                origin,
                params.origin_lat,
                params.origin_lng,
                destination,
                params.dest_lat,
                params.dest_lng,
                optional(params.dest_place_id),
                optional(params.dest_address),
                date,
                optional(params.preferred_driver),
                now,
            ],
            Self::from_row,
        )?;

        info!(
            "Created on-demand request {} for {} on {}",
            request.request_id, request.user_email, request.date
        );

        Ok(request)
    }

    /// All requests, newest first
    pub fn list(conn: &Connection) -> Result<Vec<Self>, CarpoolError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM on_demand_requests ORDER BY created_at DESC, request_id DESC",
            SELECT_COLUMNS
        ))?;

        let requests = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(requests)
    }

    pub fn list_for_user(conn: &Connection, user_email: &str) -> Result<Vec<Self>, CarpoolError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM on_demand_requests
             WHERE user_email = ?
             ORDER BY created_at DESC, request_id DESC",
            SELECT_COLUMNS
        ))?;

        let requests = stmt
            .query_map([user_email.trim()], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(requests)
    }

    pub fn delete(conn: &Connection, request_id: i64) -> Result<(), CarpoolError> {
        let rows_affected = conn.execute(
            "DELETE FROM on_demand_requests WHERE request_id = ?",
            [request_id],
        )?;

        if rows_affected == 0 {
            return Err(CarpoolError::RequestNotFound(request_id));
        }

        info!("Deleted on-demand request {}", request_id);
        Ok(())
    }
}
