// libs/lead-cell/src/handlers.rs
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
    CreateLeadRequest, LeadError, LeadScoringInput, LeadSearchQuery, UpdateLeadRequest,
};
use crate::services::lead::LeadService;
use crate::services::scoring::score_breakdown;

fn to_app_error(error: LeadError) -> AppError {
    match error {
        LeadError::NotFound => AppError::NotFound("Lead not found".to_string()),
        LeadError::ValidationError(msg) => AppError::ValidationError(msg),
        LeadError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_lead(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let clinic_id = require_clinic(&user)?;
    let created_by = require_user_id(&user)?;
    let service = LeadService::new(&config, auth.token());

    let lead = service.create_lead(clinic_id, created_by, request)
        .await
        .map_err(to_app_error)?;

    Ok((StatusCode::CREATED, Json(json!(lead))))
}

#[axum::debug_handler]
pub async fn list_leads(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<LeadSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = LeadService::new(&config, auth.token());

    let leads = service.list_leads(clinic_id, query)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "leads": leads,
        "total": leads.len()
    })))
}

#[axum::debug_handler]
pub async fn get_lead(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = LeadService::new(&config, auth.token());

    let lead = service.get_lead(clinic_id, lead_id)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(lead)))
}

#[axum::debug_handler]
pub async fn update_lead(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(lead_id): Path<Uuid>,
    Json(request): Json<UpdateLeadRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = LeadService::new(&config, auth.token());

    let lead = service.update_lead(clinic_id, lead_id, request)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(lead)))
}

#[axum::debug_handler]
pub async fn delete_lead(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic(&user)?;
    let service = LeadService::new(&config, auth.token());

    service.delete_lead(clinic_id, lead_id)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Lead deleted successfully"
    })))
}

/// Scores an attribute snapshot without persisting anything.
pub async fn preview_score(
    Json(input): Json<LeadScoringInput>,
) -> Json<Value> {
    Json(json!(score_breakdown(&input)))
}
