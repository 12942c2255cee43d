//! API client for the FarmConnect authentication service.
//!
//! Every endpoint is a JSON POST answering with a `success` flag. A
//! `success: false` body is turned into `ApiError::Rejected` so callers
//! only ever see one error type.

use std::time::Duration;

use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{AccessToken, RefreshToken};
use crate::config::Config;
use crate::models::{Farmer, Registration};
use crate::utils::mask_phone;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds for interactive calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for the silent renewal call made at start-up.
pub const RENEWAL_TIMEOUT_SECS: u64 = 10;

const SEND_OTP_PATH: &str = "/api/auth/send-otp";
const SEND_REGISTRATION_OTP_PATH: &str = "/api/auth/send-otp-to-register";
const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const REFRESH_PATH: &str = "/api/auth/refresh-token";
const LOGOUT_PATH: &str = "/api/auth/logout";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct PhoneRequest<'a> {
    phonenumber: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    phonenumber: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct RefreshTokenRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    #[serde(default)]
    success: bool,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    #[serde(rename = "accessToken")]
    access_token: Option<AccessToken>,
    #[serde(rename = "refreshToken")]
    refresh_token: Option<RefreshToken>,
    user: Option<Farmer>,
}

/// Credentials plus profile issued by login, registration or renewal.
#[derive(Debug, Clone)]
pub struct CredentialGrant {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub farmer: Farmer,
}

impl AuthResponse {
    fn into_grant(self) -> Result<CredentialGrant, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(
                self.message.unwrap_or_else(|| "request was not accepted".to_string()),
            ));
        }

        let missing = |field: &str| ApiError::InvalidResponse(format!("missing {}", field));
        let access_token = self.access_token.ok_or_else(|| missing("accessToken"))?;
        let refresh_token = self.refresh_token.ok_or_else(|| missing("refreshToken"))?;
        let farmer = self.user.ok_or_else(|| missing("user"))?;

        if refresh_token.is_empty() {
            return Err(missing("refreshToken"));
        }

        Ok(CredentialGrant {
            access_token,
            refresh_token,
            farmer,
        })
    }
}

// ============================================================================
// Client
// ============================================================================

/// Client for the authentication endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    renewal_timeout: Duration,
}

impl AuthClient {
    /// Create a client with the default timeouts
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeouts(
            base_url,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            Duration::from_secs(RENEWAL_TIMEOUT_SECS),
        )
    }

    pub fn with_timeouts(
        base_url: &str,
        request_timeout: Duration,
        renewal_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .default_headers(Self::default_headers())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            renewal_timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::with_timeouts(
            &config.api_base_url(),
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.renewal_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn default_headers() -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers
    }

    /// Ask the service to text a login code to `phone`
    pub async fn send_login_code(&self, phone: &str) -> Result<(), ApiError> {
        debug!(phone = %mask_phone(phone), "Requesting login code");
        self.post_ack(SEND_OTP_PATH, &PhoneRequest { phonenumber: phone }, None)
            .await
    }

    /// Ask the service to text a registration code to `phone`
    pub async fn send_registration_code(&self, phone: &str) -> Result<(), ApiError> {
        debug!(phone = %mask_phone(phone), "Requesting registration code");
        self.post_ack(
            SEND_REGISTRATION_OTP_PATH,
            &PhoneRequest { phonenumber: phone },
            None,
        )
        .await
    }

    /// Exchange a phone number and one-time code for credentials
    pub async fn login(&self, phone: &str, code: &str) -> Result<CredentialGrant, ApiError> {
        debug!(phone = %mask_phone(phone), "Logging in");
        let response: AuthResponse = self
            .post(LOGIN_PATH, &LoginRequest { phonenumber: phone, code }, None)
            .await?;
        response.into_grant()
    }

    /// Create an account and receive credentials for it
    pub async fn register(&self, registration: &Registration) -> Result<CredentialGrant, ApiError> {
        debug!(phone = %mask_phone(&registration.phone_number), "Registering");
        let response: AuthResponse = self.post(REGISTER_PATH, registration, None).await?;
        response.into_grant()
    }

    /// Trade a stored refresh token for a fresh credential pair.
    /// Single attempt with the renewal timeout; no retry.
    pub async fn refresh(&self, refresh_token: &RefreshToken) -> Result<CredentialGrant, ApiError> {
        debug!("Renewing session");
        let response: AuthResponse = self
            .post(
                REFRESH_PATH,
                &RefreshTokenRequest {
                    refresh_token: refresh_token.as_str(),
                },
                Some(self.renewal_timeout),
            )
            .await?;
        response.into_grant()
    }

    /// Invalidate a refresh token on the server
    pub async fn logout(&self, refresh_token: &RefreshToken) -> Result<(), ApiError> {
        debug!("Invalidating refresh token");
        self.post_ack(
            LOGOUT_PATH,
            &RefreshTokenRequest {
                refresh_token: refresh_token.as_str(),
            },
            None,
        )
        .await
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Auth service returned an error status");
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.post(&url).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{} from {}", e, path)))
    }

    async fn post_ack<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<(), ApiError> {
        let ack: AckResponse = self.post(path, body, timeout).await?;
        if ack.success {
            Ok(())
        } else {
            Err(ApiError::Rejected(
                ack.message.unwrap_or_else(|| "request was not accepted".to_string()),
            ))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_response(json: &str) -> AuthResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_grant_from_successful_response() {
        let grant = auth_response(
            r#"{"success":true,"accessToken":"at_1","refreshToken":"rt_1","user":{"name":"Asha"}}"#,
        )
        .into_grant()
        .unwrap();
        assert_eq!(grant.access_token.as_str(), "at_1");
        assert_eq!(grant.refresh_token.as_str(), "rt_1");
        assert_eq!(grant.farmer.name, "Asha");
    }

    #[test]
    fn test_grant_from_rejection_keeps_message() {
        let err = auth_response(
            r#"{"success":false,"message":"invalid token"}"#,
        )
        .into_grant()
        .unwrap_err();
        match err {
            ApiError::Rejected(msg) => assert_eq!(msg, "invalid token"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_grant_missing_success_is_rejection() {
        let err = auth_response(r#"{"accessToken":"at"}"#).into_grant().unwrap_err();
        assert!(matches!(err, ApiError::Rejected(_)));
    }

    #[test]
    fn test_grant_missing_fields_is_invalid_response() {
        let err = auth_response(
            r#"{"success":true,"accessToken":"at_1","user":{"name":"Asha"}}"#,
        )
        .into_grant()
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));

        let err = auth_response(
            r#"{"success":true,"accessToken":"at_1","refreshToken":" ","user":{"name":"Asha"}}"#,
        )
        .into_grant()
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = AuthClient::new("https://api.example.com/").unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
    }
}
