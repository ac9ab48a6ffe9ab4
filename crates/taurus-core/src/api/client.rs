//! API client for communicating with the eToro REST API.
//!
//! This module provides the `ApiClient` struct. Connecting loads the
//! service's credentials and exchanges the subscription key for a granting
//! location, which is then used to obtain service tickets.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header, redirect, Client, Method, Response};
use serde_json::Value;
use tracing::{debug, error, info, info_span, Instrument, Span};

use super::error::{ApiError, Result};
use crate::auth::CredentialStore;
use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::utils::{add_url, Params};

// ============================================================================
// Constants
// ============================================================================

/// Header carrying the API key on every gateway request
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Credential holding the subscription key
const API_KEY: &str = "api_key";

/// Credential holding the base URL endpoints are appended to
const API_URL: &str = "api_url";

/// Credential holding the handshake endpoint
const AUTHENTICATION_URL: &str = "authentication_url";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Result of a successful handshake
#[derive(Debug, Clone)]
struct Grant {
    location: String,
    connected_at: DateTime<Utc>,
}

/// API client for eToro.
pub struct ApiClient {
    client: Client,
    /// Handshake client; redirects stay visible so `location` can be read
    auth_client: Client,
    credentials: CredentialStore,
    grant: Option<Grant>,
    span: Span,
}

impl ApiClient {
    /// Create a disconnected client with the default request timeout
    pub fn new(credentials: CredentialStore) -> Result<Self> {
        Self::with_timeout(credentials, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(credentials: CredentialStore, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let auth_client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()?;
        let span = info_span!("api_client", service = %credentials.name());

        Ok(Self {
            client,
            auth_client,
            credentials,
            grant: None,
            span,
        })
    }

    /// Create a client and connect it
    pub async fn open(credentials: CredentialStore, timeout: Duration) -> Result<Self> {
        let mut client = Self::with_timeout(credentials, timeout)?;
        client.connect().await?;
        Ok(client)
    }

    /// Log under `span` instead of the client's own `api_client` span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> ConnectionState {
        if self.grant.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Granting location obtained at connect
    pub fn location(&self) -> Option<&str> {
        self.grant.as_ref().map(|g| g.location.as_str())
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.grant.as_ref().map(|g| g.connected_at)
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn credentials_mut(&mut self) -> &mut CredentialStore {
        &mut self.credentials
    }

    pub fn credential(&self, key: &str) -> Option<&str> {
        self.credentials.get(key)
    }

    /// Load credentials and obtain the granting location.
    ///
    /// Fails with `ConfigurationMissing` when the credential file does not
    /// exist. The client stays disconnected on any failure.
    pub async fn connect(&mut self) -> Result<()> {
        self.grant = None;

        if !self.credentials.exists() {
            return Err(ApiError::ConfigurationMissing(
                self.credentials.path().to_path_buf(),
            ));
        }

        let span = self.span.clone();
        span.in_scope(|| info!("Connecting to eToro API"));
        span.in_scope(|| self.credentials.load())?;

        let location = self.authenticate().instrument(span.clone()).await?;
        span.in_scope(|| debug!(location = %location, "Received granting location"));

        self.grant = Some(Grant {
            location,
            connected_at: Utc::now(),
        });
        Ok(())
    }

    /// POST the subscription key to the authentication endpoint and read
    /// the granting location from the `location` header.
    async fn authenticate(&self) -> Result<String> {
        let url = self.credentials.require(AUTHENTICATION_URL)?;
        let api_key = self.credentials.require(API_KEY)?;

        let response = self
            .auth_client
            .post(url)
            .header(SUBSCRIPTION_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|e| ApiError::Authentication(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Authentication(
                ApiError::from_status(status, &body).to_string(),
            ));
        }

        match response.headers().get(header::LOCATION) {
            Some(value) => value.to_str().map(str::to_string).map_err(|_| {
                ApiError::Authentication("location header is not valid text".to_string())
            }),
            None => Err(ApiError::Authentication(format!(
                "response from {} ({}) has no location header",
                url, status
            ))),
        }
    }

    /// Exchange the granting location for a ticket identifying `service`.
    pub async fn service_ticket(&self, service: &str) -> Result<String> {
        let location = self.location().ok_or(ApiError::NotConnected)?;
        self.fetch_ticket(location, service)
            .instrument(self.span.clone())
            .await
    }

    async fn fetch_ticket(&self, location: &str, service: &str) -> Result<String> {
        let response = self
            .client
            .post(location)
            .form(&[("service", service)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
        debug!(service, "Received service ticket");
        Ok(response.text().await?)
    }

    // ===== Request Methods =====

    /// GET `api_url + endpoint` with `params` as the query.
    ///
    /// Non-2xx responses are logged and yield `Ok(None)`.
    pub async fn get(&self, endpoint: &str, params: Option<&Params>) -> Result<Option<Value>> {
        let url = self.url(endpoint, params)?;
        self.request_json(Method::GET, &url, None)
            .instrument(self.span.clone())
            .await
    }

    /// POST `payload` both as the query and as a form body.
    ///
    /// Non-2xx responses are logged and yield `Ok(None)`.
    pub async fn post(&self, endpoint: &str, payload: &Params) -> Result<Option<Value>> {
        let url = self.url(endpoint, Some(payload))?;
        self.request_json(Method::POST, &url, Some(payload))
            .instrument(self.span.clone())
            .await
    }

    /// Remove a resource.
    ///
    /// The gateway has always been called with GET for deletions, so this
    /// sends GET, not DELETE. Non-2xx responses are logged and ignored.
    pub async fn delete(&self, endpoint: &str, params: Option<&Params>) -> Result<()> {
        let url = self.url(endpoint, params)?;
        self.send(Method::GET, &url, None)
            .instrument(self.span.clone())
            .await?;
        Ok(())
    }

    fn url(&self, endpoint: &str, params: Option<&Params>) -> Result<String> {
        let api_url = self.credentials.require(API_URL)?;
        Ok(add_url(&format!("{}{}", api_url, endpoint), params))
    }

    /// Send a request with the subscription key.
    ///
    /// Returns `Ok(None)` after logging when the status is not 2xx.
    async fn send(
        &self,
        method: Method,
        url: &str,
        form: Option<&Params>,
    ) -> Result<Option<Response>> {
        let api_key = self.credentials.require(API_KEY)?;

        let mut request = self
            .client
            .request(method.clone(), url)
            .header(SUBSCRIPTION_KEY_HEADER, api_key);
        if let Some(form) = form {
            request = request.form(form);
        }

        debug!(%method, url, "Sending request");
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(Some(response));
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, &body);
        error!(%method, url, error = %err, "Request failed");
        Ok(None)
    }

    async fn request_json(
        &self,
        method: Method,
        url: &str,
        form: Option<&Params>,
    ) -> Result<Option<Value>> {
        match self.send(method, url, form).await? {
            Some(response) => Self::parse_json(response, url).await.map(Some),
            None => Ok(None),
        }
    }

    async fn parse_json(response: Response, url: &str) -> Result<Value> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("body from {} is not JSON: {}", url, e))
        })
    }
}
