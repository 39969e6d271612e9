use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    extract::{Extension, State},
    http::{HeaderMap, HeaderValue},
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::handlers::{get_profile, validate_token, verify_token};
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_test_config() -> AppConfig {
    TestConfig::default().to_app_config()
}

fn create_auth_header(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

#[tokio::test]
async fn test_validate_token_success() {
    let config = Arc::new(create_test_config());
    let user = TestUser::staff("recepcao@clinica.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(24));

    let response = validate_token(State(config), create_auth_header(&token)).await.unwrap().0;

    assert!(response.valid);
    assert_eq!(response.user_id, user.id);
    assert_eq!(response.email, Some(user.email));
    assert_eq!(response.role, Some(user.role));
    assert_eq!(response.clinic_id, Some(user.clinic_id));
}

#[tokio::test]
async fn test_validate_token_missing_header() {
    let config = Arc::new(create_test_config());

    let result = validate_token(State(config), HeaderMap::new()).await;

    assert_matches!(result, Err(AppError::Auth(msg)) if msg == "Missing authorization header");
}

#[tokio::test]
async fn test_validate_token_without_bearer_prefix() {
    let config = Arc::new(create_test_config());
    let mut headers = HeaderMap::new();
    headers.insert("authorization", HeaderValue::from_static("Token abc"));

    let result = validate_token(State(config), headers).await;

    assert_matches!(result, Err(AppError::Auth(msg)) if msg == "Invalid authorization header format");
}

#[tokio::test]
async fn test_validate_token_expired() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();
    let token = JwtTestUtils::create_expired_token(&user, &config.supabase_jwt_secret);

    let result = validate_token(State(config), create_auth_header(&token)).await;

    assert_matches!(result, Err(AppError::Auth(msg)) if msg == "Token expired");
}

#[tokio::test]
async fn test_validate_token_without_clinic_claim() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();
    let token = JwtTestUtils::create_token_without_clinic(&user, &config.supabase_jwt_secret);

    let response = validate_token(State(config), create_auth_header(&token)).await.unwrap().0;

    assert!(response.valid);
    assert_eq!(response.clinic_id, None);
}

#[tokio::test]
async fn test_verify_token_reports_validity() {
    let config = Arc::new(create_test_config());
    let user = TestUser::default();
    let good = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));
    let forged = JwtTestUtils::create_invalid_signature_token(&user);

    let valid = verify_token(State(config.clone()), create_auth_header(&good)).await.unwrap().0;
    let invalid = verify_token(State(config.clone()), create_auth_header(&forged)).await.unwrap().0;
    let malformed = verify_token(
        State(config),
        create_auth_header(&JwtTestUtils::create_malformed_token()),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(valid, json!({ "valid": true }));
    assert_eq!(invalid, json!({ "valid": false }));
    assert_eq!(malformed, json!({ "valid": false }));
}

#[tokio::test]
async fn test_get_profile_includes_clinic() {
    let mock_server = MockServer::start().await;
    let config = Arc::new(TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let user = TestUser::admin("dona@clinica.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("id", format!("eq.{}", user.clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": user.clinic_id, "name": "Clinica Bela Pele" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let profile = get_profile(State(config), Extension(user.to_user()), create_auth_header(&token))
        .await
        .unwrap()
        .0;

    assert_eq!(profile["user_id"], user.id);
    assert_eq!(profile["clinic_id"], user.clinic_id.to_string());
    assert_eq!(profile["clinic"]["name"], "Clinica Bela Pele");
}

#[tokio::test]
async fn test_get_profile_store_failure_is_external_error() {
    let mock_server = MockServer::start().await;
    let config = Arc::new(TestConfig::with_supabase_url(&mock_server.uri()).to_app_config());
    let user = TestUser::staff("staff@clinica.com");
    let token = JwtTestUtils::create_test_token(&user, &config.supabase_jwt_secret, Some(1));

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let result = get_profile(State(config), Extension(user.to_user()), create_auth_header(&token)).await;

    assert_matches!(result, Err(AppError::ExternalService(_)));
}
