use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

/// Validates the bearer token and stores the resulting `User` in the request
/// extensions for downstream handlers.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Every clinic-scoped resource needs the caller's clinic.
pub fn require_clinic(user: &User) -> Result<Uuid, AppError> {
    user.clinic_id
        .ok_or_else(|| AppError::Auth("User is not linked to a clinic".to_string()))
}

/// Caller id as a UUID, used for `created_by` columns.
pub fn require_user_id(user: &User) -> Result<Uuid, AppError> {
    user.user_uuid()
        .ok_or_else(|| AppError::Auth("User id is not a valid UUID".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::test_utils::TestUser;

    #[test]
    fn require_clinic_rejects_unlinked_user() {
        let mut user = TestUser::default().to_user();
        assert!(require_clinic(&user).is_ok());

        user.clinic_id = None;
        assert_matches!(require_clinic(&user), Err(AppError::Auth(_)));
    }

    #[test]
    fn require_user_id_parses_subject() {
        let test_user = TestUser::default();
        let user = test_user.to_user();
        assert_eq!(require_user_id(&user).unwrap().to_string(), test_user.id);

        let mut bad = user.clone();
        bad.id = "not-a-uuid".to_string();
        assert_matches!(require_user_id(&bad), Err(AppError::Auth(_)));
    }
}
