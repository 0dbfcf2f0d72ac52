//! Typed backend client (spec.md §4.H).
//!
//! Every call carries station id / equipment id headers when configured, a
//! bearer token when available, and honors a single global timeout. Token
//! refresh is out-of-band: callers hand in a [`TokenRefreshCallback`] that
//! fires whenever [`BackendClient::set_token`] installs a new credential.

use crate::error::BackendError;
use crate::types::{
    BackendErrorBody, CompleteProcessRequest, CompleteProcessResponse, ConvertToSerialRequest,
    LoginResponse, StartProcessRequest, WipInfo,
};
use parking_lot::Mutex;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub type TokenRefreshCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct BackendClientConfig {
    pub base_url: String,
    pub station_id: String,
    pub equipment_id: Option<String>,
    pub timeout_secs: f64,
}

pub struct BackendClient {
    http: reqwest::Client,
    config: BackendClientConfig,
    token: Mutex<Option<String>>,
    on_token_refreshed: Option<TokenRefreshCallback>,
}

impl BackendClient {
    pub fn new(config: BackendClientConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
            on_token_refreshed: None,
        })
    }

    pub fn with_token_refresh_callback(mut self, callback: TokenRefreshCallback) -> Self {
        self.on_token_refreshed = Some(callback);
        self
    }

    /// Install a new bearer token, notifying the refresh callback if set.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        if let Some(callback) = &self.on_token_refreshed {
            callback(&token);
        }
        *self.token.lock() = Some(token);
    }

    pub fn current_token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header("X-Station-Id", &self.config.station_id);
        if let Some(equipment_id) = &self.config.equipment_id {
            builder = builder.header("X-Equipment-Id", equipment_id);
        }
        if let Some(token) = self.current_token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        self.send_with_context(builder, None).await
    }

    async fn send_with_context<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        prerequisite_process_id: Option<u32>,
    ) -> Result<T, BackendError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(classify_error(
                status,
                response.json::<BackendErrorBody>().await.ok(),
                prerequisite_process_id,
            ))
        }
    }

    pub async fn scan(&self, wip_id: &str, process_id: Option<u32>) -> Result<WipInfo, BackendError> {
        let mut req = self.request(Method::GET, "scan").query(&[("wip_id", wip_id)]);
        if let Some(process_id) = process_id {
            req = req.query(&[("process_id", process_id)]);
        }
        self.send(req).await
    }

    pub async fn start_process(
        &self,
        wip_int_id: u64,
        body: &StartProcessRequest,
    ) -> Result<Value, BackendError> {
        let req = self
            .request(Method::POST, &format!("wip/{wip_int_id}/start-process"))
            .json(body);
        self.send_with_context(req, Some(body.process_id)).await
    }

    pub async fn complete_process(
        &self,
        wip_int_id: u64,
        process_id: u32,
        body: &CompleteProcessRequest,
    ) -> Result<CompleteProcessResponse, BackendError> {
        let req = self
            .request(Method::POST, &format!("wip/{wip_int_id}/process/{process_id}/complete"))
            .json(body);
        self.send(req).await
    }

    pub async fn convert_to_serial(
        &self,
        wip_int_id: u64,
        body: &ConvertToSerialRequest,
    ) -> Result<Value, BackendError> {
        let req = self
            .request(Method::POST, &format!("wip/{wip_int_id}/convert-to-serial"))
            .json(body);
        self.send(req).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, BackendError> {
        #[derive(Serialize)]
        struct LoginRequest<'a> {
            username: &'a str,
            password: &'a str,
        }
        let req = self
            .request(Method::POST, "auth/login")
            .json(&LoginRequest { username, password });
        let response = req.send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(BackendError::LoginFailed)
        }
    }

    pub async fn current_user(&self, token: &str) -> Result<Value, BackendError> {
        let req = self.request(Method::GET, "auth/me").bearer_auth(token);
        let response = req.send().await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(BackendError::InvalidToken)
        }
    }

    /// Transport errors map to `false` rather than propagating — health
    /// checks never raise (spec.md §4.H).
    pub async fn health(&self) -> bool {
        match self.request(Method::GET, "health").send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                debug!(ok, "backend health check");
                ok
            }
            Err(error) => {
                warn!(%error, "backend health check failed");
                false
            }
        }
    }
}

fn classify_error(
    status: StatusCode,
    body: Option<BackendErrorBody>,
    prerequisite_process_id: Option<u32>,
) -> BackendError {
    if status == StatusCode::NOT_FOUND {
        return BackendError::WipNotFound;
    }

    let code = body.as_ref().and_then(|b| b.error.as_deref()).unwrap_or_default();
    match code {
        "PREREQUISITE_NOT_MET" => BackendError::PrerequisiteNotMet {
            required: prerequisite_process_id.map_or(0, |p| p.saturating_sub(1)),
        },
        "INVALID_WIP_STATUS" => BackendError::InvalidWipStatus,
        "DUPLICATE_PASS" => BackendError::DuplicatePass,
        other => BackendError::Backend {
            code: if other.is_empty() { status.to_string() } else { other.to_string() },
            message: body.and_then(|b| b.message).unwrap_or_else(|| status.to_string()),
        },
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
