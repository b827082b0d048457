//! The fetch gateway: every outbound HTTP call goes through here.
//!
//! Attaches the bearer token for API-origin requests, encodes bodies, decodes
//! responses and turns non-2xx statuses into [`ApiError::Http`]. A 401/403
//! while logged in also ends the session before the error is returned.

use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::core::error::ApiError;
use crate::core::session::Session;
use crate::core::task::Spawner;
use crate::core::transport::{HttpRequest, HttpResponse, Method, MultipartForm, RequestBody, Transport};

/// Request body accepted by the gateway.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// Serialized as JSON with `Content-Type: application/json`.
    Json(Value),
    /// Passed through untouched.
    Multipart(MultipartForm),
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<MultipartForm> for Body {
    fn from(form: MultipartForm) -> Self {
        Self::Multipart(form)
    }
}

pub struct FetchGateway {
    config: ApiConfig,
    session: Rc<Session>,
    transport: Rc<dyn Transport>,
    spawner: Rc<dyn Spawner>,
}

impl FetchGateway {
    pub fn new(
        config: ApiConfig,
        session: Rc<Session>,
        transport: Rc<dyn Transport>,
        spawner: Rc<dyn Spawner>,
    ) -> Self {
        Self {
            config,
            session,
            transport,
            spawner,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn session(&self) -> &Rc<Session> {
        &self.session
    }

    /// Where caches built on this gateway run their requests.
    pub fn spawner(&self) -> Rc<dyn Spawner> {
        Rc::clone(&self.spawner)
    }

    pub async fn get(&self, url: &str) -> Result<Value, ApiError> {
        self.request(Method::Get, url, None).await
    }

    pub async fn post(&self, url: &str, body: Option<Body>) -> Result<Value, ApiError> {
        self.request(Method::Post, url, body).await
    }

    pub async fn put(&self, url: &str, body: Option<Body>) -> Result<Value, ApiError> {
        self.request(Method::Put, url, body).await
    }

    pub async fn delete(&self, url: &str) -> Result<Value, ApiError> {
        self.request(Method::Delete, url, None).await
    }

    /// Resolve `url` against the API base; relative paths target the API.
    fn resolve(&self, url: &str) -> Result<Url, ApiError> {
        match Url::parse(url) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .config
                .base_url()
                .join(url)
                .map_err(|err| ApiError::validation(format!("invalid URL '{}': {}", url, err))),
            Err(err) => Err(ApiError::validation(format!("invalid URL '{}': {}", url, err))),
        }
    }

    fn is_api_url(&self, url: &Url) -> bool {
        url.origin() == self.config.base_url().origin()
    }

    async fn request(&self, method: Method, url: &str, body: Option<Body>) -> Result<Value, ApiError> {
        let target = self.resolve(url)?;

        let mut headers = Vec::new();
        if self.is_api_url(&target)
            && let Some(token) = self.session.token()
        {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let body = match body {
            None => RequestBody::Empty,
            Some(Body::Json(value)) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                RequestBody::Json(serde_json::to_string(&value)?)
            }
            Some(Body::Multipart(form)) => RequestBody::Multipart(form),
        };

        debug!(method = method.as_str(), url = %target, "request");
        let response = self
            .transport
            .send(HttpRequest {
                method,
                url: target.to_string(),
                headers,
                body,
            })
            .await
            .inspect_err(|err| warn!(method = method.as_str(), url = %target, error = %err, "request failed"))?;
        debug!(method = method.as_str(), url = %target, status = response.status, "response");

        self.handle_response(response)
    }

    fn handle_response(&self, response: HttpResponse) -> Result<Value, ApiError> {
        let data = decode_body(&response.body);
        if response.is_success() {
            return Ok(data);
        }

        if matches!(response.status, 401 | 403) && self.session.is_active() {
            warn!(status = response.status, "authorization rejected, ending session");
            self.session.end();
        }

        Err(error_from_response(&response, &data))
    }
}

/// JSON when the text parses, the raw text otherwise, `null` when empty.
pub fn decode_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Build the error for a non-2xx response.
///
/// Message preference: `error.message`, `message`, raw body, status text.
fn error_from_response(response: &HttpResponse, data: &Value) -> ApiError {
    let nested = data.get("error").filter(|error| error.is_object());

    let message = nested
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .or_else(|| data.get("message").and_then(Value::as_str))
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .or_else(|| (!response.body.is_empty()).then(|| response.body.clone()))
        .or_else(|| (!response.status_text.is_empty()).then(|| response.status_text.clone()))
        .unwrap_or_else(|| format!("HTTP {}", response.status));

    let details = nested
        .and_then(|error| error.get("details"))
        .filter(|details| !details.is_null())
        .cloned();

    ApiError::Http {
        status: response.status,
        message,
        details,
    }
}
