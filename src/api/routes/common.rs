use axum::{http::StatusCode, Json};
use log::error;
use serde_json::{json, Value};

use crate::error::CarpoolError;

/// Error half of every handler's result: a status code and a JSON body of
/// the form `{"detail": ...}`
pub type ApiError = (StatusCode, Json<Value>);

/// Map a `CarpoolError` to its HTTP response.
///
/// An active-schedule conflict carries the existing schedule as
/// `{"detail": {"message": ..., "schedule": ...}}`. Internal failures are
/// logged and reported without their details.
pub fn error_response(err: CarpoolError) -> ApiError {
    let status = match &err {
        CarpoolError::GroupNotFound(_)
        | CarpoolError::ScheduleNotFound(_)
        | CarpoolError::RequestNotFound(_) => StatusCode::NOT_FOUND,
        CarpoolError::GroupExists(_) | CarpoolError::ScheduleActive(_) => StatusCode::CONFLICT,
        CarpoolError::Invalid(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    match err {
        CarpoolError::ScheduleActive(conflict) => (status, Json(json!({ "detail": conflict }))),
        err if err.is_business_outcome() => (status, Json(json!({ "detail": err.to_string() }))),
        err => {
            error!("Request failed: {}", err);
            (
                status,
                Json(json!({ "detail": "Internal server error" })),
            )
        }
    }
}

/// Map an extractor rejection (malformed JSON body, wrong field type,
/// unparseable path segment) to a 400 in the same `{"detail": ...}` shape.
pub fn rejection_response(rejection: impl std::fmt::Display) -> ApiError {
    error_response(CarpoolError::Invalid(rejection.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedules::{Schedule, ScheduleConflict};
    use chrono::NaiveDate;

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (CarpoolError::GroupNotFound("g".into()), StatusCode::NOT_FOUND),
            (CarpoolError::ScheduleNotFound("g".into()), StatusCode::NOT_FOUND),
            (CarpoolError::RequestNotFound(3), StatusCode::NOT_FOUND),
            (CarpoolError::GroupExists("g".into()), StatusCode::CONFLICT),
            (CarpoolError::Invalid("bad".into()), StatusCode::BAD_REQUEST),
            (CarpoolError::Error("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let (status, _) = error_response(err);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_internal_error_details_are_hidden() {
        let (_, Json(body)) = error_response(CarpoolError::Error("secret path".into()));
        assert_eq!(body, json!({ "detail": "Internal server error" }));
    }

    #[test]
    fn test_rejection_is_bad_request_with_detail() {
        let (status, Json(body)) = rejection_response("missing field `name`");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "detail": "Invalid input: missing field `name`" }));
    }

    #[test]
    fn test_conflict_carries_schedule() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let conflict = ScheduleConflict {
            message: "Schedule already generated and active until 2024-01-01".to_string(),
            schedule: Schedule::from_items(start, Vec::new()),
        };

        let (status, Json(body)) = error_response(CarpoolError::ScheduleActive(Box::new(conflict)));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["detail"]["schedule"]["start_date"], "2024-01-01");
        assert_eq!(body["detail"]["schedule"]["end_date"], "2024-01-01");
        assert_eq!(body["detail"]["schedule"]["items"], json!([]));
    }
}
