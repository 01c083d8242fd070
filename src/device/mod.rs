//! Session-managed client for the Control iD access-control API.
//!
//! Every authenticated call re-checks the session against the device before
//! dispatch and logs in again when the token is missing or rejected. Object
//! calls travel as JSON; the single-image upload sends the raw bytes.

mod error;
mod images;
mod objects;
mod session;

pub use error::{DeviceError, Result};
pub use images::{ImageSelection, ImageSource, UserImage};
pub use objects::LoadOptions;

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::util::token_prefix;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A device object: field name to value, schema defined by the caller.
pub type Record = Map<String, Value>;

const LOGIN: &str = "/login.fcgi";
const SESSION_IS_VALID: &str = "/session_is_valid.fcgi";
const LOGOUT: &str = "/logout.fcgi";

/// Client for a single device. Holds at most one session.
///
/// Operations that may renew the session take `&mut self`; share one client
/// between tasks behind a mutex.
pub struct DeviceClient {
    http: HttpClient,
    base_url: String,
    login: String,
    password: String,
    session: Option<String>,
}

impl DeviceClient {
    /// Build a client without contacting the device.
    pub fn new(base_url: &str, login: &str, password: &str, timeout: Duration) -> Result<Self> {
        // reqwest pools keep-alive connections and never sends `Expect: 100-continue`.
        let http = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            login: login.to_string(),
            password: password.to_string(),
            session: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session token currently held, if any.
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Ensure a valid session and hand back its token for the request.
    async fn authenticated(&mut self) -> Result<String> {
        self.ensure_valid().await?;
        self.session
            .clone()
            .ok_or_else(|| DeviceError::Authentication {
                status: 0,
                body: "no session after login".to_string(),
            })
    }

    /// JSON sender: POST `payload` to `endpoint` with the session in the query.
    async fn post_json<T: Serialize + ?Sized>(
        &mut self,
        endpoint: &str,
        payload: &T,
    ) -> Result<Value> {
        let session = self.authenticated().await?;
        tracing::debug!(endpoint, session = %token_prefix(&session), "device: POST json");

        let response = self
            .http
            .post(self.url(endpoint))
            .query(&[("session", session.as_str())])
            .json(payload)
            .send()
            .await?;

        let body = read_body(endpoint, response).await?;
        Ok(parse_body(body))
    }

    /// Raw sender: POST `body` verbatim as `application/octet-stream`.
    async fn post_raw(
        &mut self,
        endpoint: &str,
        query: &[(&str, String)],
        body: Vec<u8>,
    ) -> Result<String> {
        let session = self.authenticated().await?;
        tracing::debug!(
            endpoint,
            session = %token_prefix(&session),
            bytes = body.len(),
            "device: POST octet-stream"
        );

        let response = self
            .http
            .post(self.url(endpoint))
            .query(&[("session", session.as_str())])
            .query(query)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        read_body(endpoint, response).await
    }

    async fn get(&mut self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        let session = self.authenticated().await?;
        tracing::debug!(endpoint, session = %token_prefix(&session), "device: GET");

        let response = self
            .http
            .get(self.url(endpoint))
            .query(&[("session", session.as_str())])
            .query(query)
            .send()
            .await?;

        let body = read_body(endpoint, response).await?;
        Ok(parse_body(body))
    }
}

/// Read the body of a successful response, or turn the status into an error.
async fn read_body(endpoint: &str, response: Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(endpoint, status = status.as_u16(), "device: request rejected");
        return Err(DeviceError::Device {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.text().await?)
}

/// Some endpoints answer with plain text; keep it as a JSON string.
fn parse_body(body: String) -> Value {
    match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) => Value::String(body),
    }
}

/// Decode the expected reply shape, keeping the raw body on mismatch.
fn decode<T: DeserializeOwned>(endpoint: &str, data: &Value) -> Result<T> {
    T::deserialize(data).map_err(|_| DeviceError::UnexpectedResponse {
        endpoint: endpoint.to_string(),
        body: match data {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    })
}
