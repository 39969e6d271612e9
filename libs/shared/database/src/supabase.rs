use anyhow::{Context, Result};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Non-success answer from PostgREST. Wrapped in `anyhow::Error`; callers that
/// need the status can `downcast_ref::<SupabaseError>()`.
#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("Authentication error: {message}")]
    Unauthorized { message: String },

    #[error("Resource not found: {message}")]
    NotFound { message: String },

    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
}

impl SupabaseError {
    fn from_response(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => SupabaseError::Unauthorized { message },
            404 => SupabaseError::NotFound { message },
            _ => SupabaseError::Api { status, message },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SupabaseError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            SupabaseError::NotFound { .. } => StatusCode::NOT_FOUND,
            SupabaseError::Api { status, .. } => *status,
        }
    }
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key).context("invalid anon key header")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("invalid bearer token header")?,
            );
        }

        Ok(headers)
    }

    /// Headers asking PostgREST to echo the written rows back.
    pub fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);
            return Err(SupabaseError::from_response(status, error_text).into());
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Call a PostgREST RPC endpoint (`/rest/v1/rpc/{function}`).
    pub async fn rpc<T>(&self, function: &str, auth_token: Option<&str>, args: Value) -> Result<T>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request(Method::POST, &path, auth_token, Some(args)).await
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> AppConfig {
        AppConfig {
            supabase_url: url.to_string(),
            supabase_anon_key: "anon".to_string(),
            supabase_jwt_secret: "secret".to_string(),
            port: 3000,
        }
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let client = SupabaseClient::new(&config("http://localhost:54321/"));
        assert_eq!(client.get_base_url(), "http://localhost:54321");
    }

    #[test]
    fn error_status_is_classified() {
        let conflict = SupabaseError::from_response(StatusCode::CONFLICT, "overlap".into());
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert!(matches!(
            SupabaseError::from_response(StatusCode::FORBIDDEN, "rls".into()),
            SupabaseError::Unauthorized { .. }
        ));
    }

    #[test]
    fn bearer_header_is_attached() {
        let client = SupabaseClient::new(&config("http://localhost:54321"));
        let headers = client.get_headers(Some("abc")).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert_eq!(headers.get("apikey").unwrap(), "anon");
    }
}
