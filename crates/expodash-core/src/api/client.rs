//! API client for the exhibition backend.
//!
//! Every authenticated call goes through [`ApiClient::send`], which
//! attaches the bearer token and classifies the response.

use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{AuthUser, CredentialRecord, ExpirationReason, SessionManager};
use crate::config::Config;
use crate::models::{
    Alert, Building, LoginRequest, LoginResponse, NewAlert, NewOrganizer, Organizer,
    OrganizerUpdate, TokenClaims,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of retries for rate-limited (429) GET requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Clone is cheap - reqwest::Client and SessionManager are both Arc inside.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    api_base_url: String,
    alerts_base_url: String,
    session: SessionManager,
}

impl ApiClient {
    pub fn new(config: &Config, session: SessionManager) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            alerts_base_url: config.alerts_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Same endpoints and connection pool, different session.
    pub fn with_session(&self, session: SessionManager) -> Self {
        Self {
            client: self.client.clone(),
            api_base_url: self.api_base_url.clone(),
            alerts_base_url: self.alerts_base_url.clone(),
            session,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    fn alerts_url(&self, path: &str) -> String {
        format!("{}{}", self.alerts_base_url, path)
    }

    fn auth_headers(&self) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.session.token() {
            match header::HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored token is not a valid header value, sending without it"),
            }
        }
        headers
    }

    /// Send an authenticated request and classify the response.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.headers(self.auth_headers()).send().await?;
        self.check_response(response).await
    }

    /// 2xx passes through. 401/403 expire the session and never reach
    /// the caller as a response. Anything else becomes an `ApiError`.
    async fn check_response(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!(%status, url = %response.url(), "Request rejected, expiring session");
            self.session
                .handle_token_expiration(ExpirationReason::Unauthorized(status.as_u16()));
            return Err(ApiError::Unauthorized {
                status: status.as_u16(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let url = response.url().to_string();
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url, e)))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            match self.send(self.client.get(url)).await {
                Ok(response) => return Self::parse_json(response).await,
                Err(ApiError::RateLimited) if retries < MAX_RATE_LIMIT_RETRIES => {
                    retries += 1;
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ===== Authentication =====

    /// Exchange email and password for a token and start the session.
    /// A 401 here means bad credentials, not an expired session.
    pub async fn login(&self, email: &str, password: &str) -> Result<CredentialRecord, ApiError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::Validation(
                "Email and Password are required.".to_string(),
            ));
        }

        let response = self
            .client
            .post(self.api_url("/auths/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                400 => ApiError::BadRequest("Email and Password are required.".to_string()),
                401 => ApiError::InvalidCredentials,
                _ => ApiError::from_status(status, &body),
            });
        }

        let auth: LoginResponse = Self::parse_json(response).await?;
        let organizer_id = TokenClaims::decode_unverified(&auth.token).and_then(|c| c.id);
        if organizer_id.is_none() {
            debug!("Token carries no organizer id claim");
        }

        let record = CredentialRecord {
            token: auth.token,
            user: AuthUser {
                email: email.to_string(),
                organizer_id: organizer_id.clone(),
            },
            organizer_id,
        };
        self.session.establish(&record)?;
        Ok(record)
    }

    pub async fn register(&self, organizer: &NewOrganizer) -> Result<(), ApiError> {
        organizer.validate().map_err(ApiError::Validation)?;

        let response = self
            .client
            .post(self.api_url("/auths/register"))
            .json(organizer)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            400 => ApiError::BadRequest(
                ApiError::server_message(&body)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Registration failed. Try again.".to_string()),
            ),
            500..=599 => ApiError::from_status(status, &body),
            _ => {
                debug!(%status, "Registration rejected");
                ApiError::BadRequest("Registration failed. Please try again.".to_string())
            }
        })
    }

    // ===== Organizers =====

    pub async fn list_organizers(&self) -> Result<Vec<Organizer>, ApiError> {
        self.get(&self.api_url("/organizers")).await
    }

    pub async fn get_organizer(&self, id: &str) -> Result<Organizer, ApiError> {
        self.get(&self.api_url(&format!("/organizers/{}", id))).await
    }

    pub async fn update_organizer(
        &self,
        id: &str,
        update: &OrganizerUpdate,
    ) -> Result<(), ApiError> {
        update.validate().map_err(ApiError::Validation)?;
        if update.is_empty() {
            return Err(ApiError::Validation("Nothing to update.".to_string()));
        }
        let request = self
            .client
            .put(self.api_url(&format!("/organizers/{}", id)))
            .json(update);
        self.send(request).await?;
        Ok(())
    }

    pub async fn delete_organizer(&self, id: &str) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.api_url(&format!("/organizers/{}", id)));
        self.send(request).await?;
        Ok(())
    }

    // ===== Alerts =====

    pub async fn list_alerts(&self) -> Result<Vec<Alert>, ApiError> {
        self.get(&self.alerts_url("/alerts")).await
    }

    pub async fn send_alert(&self, text: &str) -> Result<(), ApiError> {
        let alert = NewAlert::new(text)
            .ok_or_else(|| ApiError::Validation("Please enter an alert message".to_string()))?;
        let request = self.client.post(self.alerts_url("/alerts")).json(&alert);
        self.send(request).await?;
        Ok(())
    }

    // ===== Buildings =====

    pub async fn buildings_by_tag(&self, tag: &str) -> Result<Vec<Building>, ApiError> {
        let request = self
            .client
            .get(self.api_url("/buildings/filterByTag"))
            .query(&[("tag", tag)]);
        let response = self.send(request).await?;
        Self::parse_json(response).await
    }
}
