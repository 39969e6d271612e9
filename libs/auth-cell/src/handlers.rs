use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::HeaderMap,
};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::jwt;

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;
    let user = jwt::validate_token(&token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
        clinic_id: user.clinic_id,
    }))
}

/// Like `validate_token`, but a bad token is an answer rather than an error.
pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = extract_bearer_token(&headers)?;
    let valid = jwt::validate_token(&token, &config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}

pub async fn get_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let clinic = match user.clinic_id {
        Some(clinic_id) => {
            let token = extract_bearer_token(&headers)?;
            let client = SupabaseClient::new(&config);
            let path = format!("/rest/v1/clinics?id=eq.{}&select=id,name", clinic_id);

            let rows: Vec<Value> = client.request(Method::GET, &path, Some(&token), None)
                .await
                .map_err(|e| AppError::ExternalService(e.to_string()))?;

            if rows.is_empty() {
                warn!("Clinic {} referenced by user {} does not exist", clinic_id, user.id);
            }
            rows.into_iter().next()
        }
        None => None,
    };

    Ok(Json(json!({
        "user_id": user.id,
        "email": user.email,
        "role": user.role,
        "clinic_id": user.clinic_id,
        "clinic": clinic
    })))
}
