// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{require_clinic, require_user_id};

use crate::models::{
    AppointmentError, AppointmentSearchQuery, BookAppointmentRequest, ConflictCheckQuery,
    UpdateAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

/// Scheduling conflicts are rejected writes, answered as 400 with the ids of
/// the bookings holding the slot.
fn to_app_error(error: AppointmentError) -> AppError {
    match error {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::ConflictDetected { conflicting_ids } => {
            let ids = conflicting_ids
                .iter()
                .map(Uuid::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            AppError::BadRequest(format!(
                "Appointment slot conflicts with existing booking(s): [{}]", ids
            ))
        }
        AppointmentError::Unauthorized(msg) => AppError::Auth(msg),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let clinic_id = require_clinic(&user)?;
    let created_by = require_user_id(&user)?;
    let booking_service = AppointmentBookingService::new(&config, auth.token());

    let appointment = booking_service.book_appointment(clinic_id, created_by, request)
        .await
        .map_err(to_app_error)?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let booking_service = AppointmentBookingService::new(&config, auth.token());

    let appointments = booking_service.list_appointments(clinic_id, query)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let booking_service = AppointmentBookingService::new(&config, auth.token());

    let appointment = booking_service.get_appointment(clinic_id, appointment_id)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let booking_service = AppointmentBookingService::new(&config, auth.token());

    let appointment = booking_service.update_appointment(clinic_id, appointment_id, request)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let booking_service = AppointmentBookingService::new(&config, auth.token());

    booking_service.delete_appointment(clinic_id, appointment_id)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted successfully"
    })))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let booking_service = AppointmentBookingService::new(&config, auth.token());

    let result = booking_service.check_conflicts(clinic_id, query)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(result)))
}
