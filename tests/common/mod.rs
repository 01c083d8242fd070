#![allow(dead_code)]

//! In-process stand-in for a Control iD device: answers scripted bodies per
//! path and records every request it receives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::{json, Value};

use controlid_bridge::device::{DeviceClient, DEFAULT_TIMEOUT};

pub const LOGIN: &str = "admin";
pub const PASSWORD: &str = "secret";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Default)]
struct Script {
    responses: HashMap<String, (StatusCode, String)>,
    requests: Vec<Recorded>,
}

type Shared = Arc<Mutex<Script>>;

pub struct FakeDevice {
    pub base_url: String,
    script: Shared,
}

impl FakeDevice {
    pub async fn start() -> Self {
        let script: Shared = Arc::default();
        let device_app = Router::new()
            .fallback(record_and_respond)
            .with_state(script.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, device_app).await.unwrap();
        });

        let device = Self {
            base_url: format!("http://{addr}"),
            script,
        };
        device.respond_json("/login.fcgi", json!({ "session": "sess1" }));
        device.respond_json("/session_is_valid.fcgi", json!({ "session_is_valid": true }));
        device.respond("/logout.fcgi", 200, "");
        device
    }

    pub fn client(&self) -> DeviceClient {
        DeviceClient::new(&self.base_url, LOGIN, PASSWORD, DEFAULT_TIMEOUT).unwrap()
    }

    pub fn respond(&self, path: &str, status: u16, body: impl Into<String>) {
        let status = StatusCode::from_u16(status).unwrap();
        self.script
            .lock()
            .unwrap()
            .responses
            .insert(path.to_string(), (status, body.into()));
    }

    pub fn respond_json(&self, path: &str, body: Value) {
        self.respond(path, 200, body.to_string());
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// The single request sent to `path`.
    pub fn only_request_to(&self, path: &str) -> Recorded {
        let mut found = self.requests_to(path);
        assert_eq!(found.len(), 1, "expected exactly one request to {path}");
        found.remove(0)
    }

    pub fn clear_requests(&self) {
        self.script.lock().unwrap().requests.clear();
    }
}

async fn record_and_respond(
    State(script): State<Shared>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut script = script.lock().unwrap();
    script.requests.push(Recorded {
        method,
        path: uri.path().to_string(),
        query,
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.to_vec(),
    });

    match script.responses.get(uri.path()) {
        Some((status, body)) => (*status, body.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "unknown endpoint").into_response(),
    }
}

/// A port nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// A device that accepts connections and never answers. Returns its URL and
/// the number of connections accepted so far.
pub async fn silent_device_url() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(socket);
        }
    });

    (format!("http://{addr}"), accepted)
}
