//! Test doubles: a data tool with a fixed payload and a canned HTTP server

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::tools::{DataTool, ToolId, ToolRequest};

/// Returns the same payload for every request
pub struct StaticTool {
    pub id: ToolId,
    pub payload: Value,
}

#[async_trait]
impl DataTool for StaticTool {
    fn id(&self) -> ToolId {
        self.id
    }

    async fn fetch(&self, _request: &ToolRequest) -> crate::Result<Value> {
        Ok(self.payload.clone())
    }
}

/// A request as seen by the stub server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone)]
struct CannedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    /// Answer every request with `status` and `body`
    pub async fn start(status: u16, body: &str) -> Self {
        Self::start_with_headers(status, body, &[]).await
    }

    pub async fn start_with_headers(status: u16, body: &str, headers: &[(&str, &str)]) -> Self {
        let mut header_map = HeaderMap::new();
        header_map.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        for (name, value) in headers {
            header_map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }

        let requests = Arc::new(Mutex::new(Vec::new()));
        let canned = CannedResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: header_map,
            body: body.to_string(),
            requests: requests.clone(),
        };
        let app = Router::new().fallback(respond).with_state(canned);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn respond(
    State(canned): State<CannedResponse>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    canned.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect(),
        body,
    });
    (canned.status, canned.headers, canned.body).into_response()
}
