//! In-process stub of the IAM, VPC and resource manager endpoints.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use axum::{
    Form, Json, Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};

pub(crate) const STUB_API_KEY: &str = "stub-api-key";
pub(crate) const STUB_TOKEN: &str = "stub-token";

/// Bind the router to an ephemeral local port and return its base URL.
pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
    let address = listener.local_addr().expect("stub server address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{address}")
}

/// Serve one connection whose body is shorter than its `Content-Length`.
pub(crate) fn serve_truncated_response() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind truncated server");
    let address = listener.local_addr().expect("truncated server address");
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = [0_u8; 4096];
            let _ = stream.read(&mut request);
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"name\"");
            let _ = stream.flush();
        }
    });
    format!("http://{address}")
}

/// Log lines written while the returned guard is alive on this thread.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("captured logs")).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("captured logs").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) fn capture_logs() -> (tracing::subscriber::DefaultGuard, CapturedLogs) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (tracing::subscriber::set_default(subscriber), logs)
}

pub(crate) fn stub_router() -> Router {
    Router::new()
        .route("/identity/token", post(issue_token))
        .route("/v1/regions/{name}", get(region))
        .route("/v1/volumes/{id}", get(volume))
        .route("/v1/snapshots/{id}", get(snapshot))
        .route("/v1/images", get(images))
        .route("/v1/security_groups/{id}", get(security_group))
        .route("/v2/resource_groups/{id}", get(resource_group))
        .route("/v1/maintenance", get(|| async { "<html>down for maintenance</html>" }))
}

async fn issue_token(Form(form): Form<HashMap<String, String>>) -> Response {
    let grant_ok = form.get("grant_type").map(String::as_str) == Some(crate::iam::APIKEY_GRANT_TYPE);
    if grant_ok && form.get("apikey").map(String::as_str) == Some(STUB_API_KEY) {
        return Json(json!({ "access_token": STUB_TOKEN, "token_type": "Bearer", "expires_in": 3600 })).into_response();
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "errorCode": "BXNIM0415E", "errorMessage": "Provided API key could not be found." })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {STUB_TOKEN}");
    headers.get(header::AUTHORIZATION).and_then(|value| value.to_str().ok()) == Some(expected.as_str())
}

fn versioned(query: &HashMap<String, String>) -> bool {
    query.contains_key("version") && query.get("generation").map(String::as_str) == Some("2")
}

fn service_error(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Json(json!({ "errors": [{ "code": code, "message": message }], "trace": "stub" }))).into_response()
}

fn guard(headers: &HeaderMap, query: &HashMap<String, String>) -> Option<Response> {
    if !authorized(headers) {
        return Some(service_error(StatusCode::UNAUTHORIZED, "not_authorized", "Unauthorized"));
    }
    if !versioned(query) {
        return Some(service_error(StatusCode::BAD_REQUEST, "missing_version", "version is required"));
    }
    None
}

fn found(payload: Value) -> Response {
    Json(payload).into_response()
}

async fn region(Path(name): Path<String>, Query(query): Query<HashMap<String, String>>, headers: HeaderMap) -> Response {
    if let Some(rejection) = guard(&headers, &query) {
        return rejection;
    }
    match name.as_str() {
        "us-south" => found(json!({ "name": "us-south", "endpoint": "https://us-south.iaas.cloud.ibm.com", "status": "available" })),
        _ => service_error(StatusCode::NOT_FOUND, "not_found", "Region not found"),
    }
}

async fn volume(Path(id): Path<String>, Query(query): Query<HashMap<String, String>>, headers: HeaderMap) -> Response {
    if let Some(rejection) = guard(&headers, &query) {
        return rejection;
    }
    match id.as_str() {
        "vol-boot" => found(json!({
            "id": "vol-boot",
            "attachment_state": "unattached",
            "operating_system": { "name": "ubuntu-22-04-amd64", "architecture": "amd64" }
        })),
        "vol-attached" => found(json!({
            "id": "vol-attached",
            "attachment_state": "attached",
            "operating_system": { "name": "ubuntu-22-04-amd64", "architecture": "amd64" }
        })),
        _ => service_error(StatusCode::NOT_FOUND, "volume_not_found", "Volume not found"),
    }
}

async fn snapshot(Path(id): Path<String>, Query(query): Query<HashMap<String, String>>, headers: HeaderMap) -> Response {
    if let Some(rejection) = guard(&headers, &query) {
        return rejection;
    }
    match id.as_str() {
        "snap-boot" => found(json!({ "id": "snap-boot", "operating_system": { "architecture": "s390x" } })),
        _ => service_error(StatusCode::NOT_FOUND, "snapshot_not_found", "Snapshot not found"),
    }
}

async fn images(Query(query): Query<HashMap<String, String>>, headers: HeaderMap) -> Response {
    if let Some(rejection) = guard(&headers, &query) {
        return rejection;
    }
    match query.get("name").map(String::as_str) {
        Some("existing-image") => found(json!({
            "images": [{ "id": "r006-image", "name": "existing-image", "status": "available" }],
            "limit": 50
        })),
        _ => found(json!({ "images": [], "limit": 50 })),
    }
}

async fn security_group(Path(id): Path<String>, Query(query): Query<HashMap<String, String>>, headers: HeaderMap) -> Response {
    if let Some(rejection) = guard(&headers, &query) {
        return rejection;
    }
    match id.as_str() {
        "sg-1" => found(json!({ "id": "sg-1", "name": "allow-ssh", "vpc": { "id": "r006-vpc", "name": "builder" } })),
        "sg-broken" => service_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal error"),
        _ => service_error(StatusCode::NOT_FOUND, "security_group_not_found", "Security group not found"),
    }
}

async fn resource_group(Path(id): Path<String>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return service_error(StatusCode::UNAUTHORIZED, "not_authorized", "Unauthorized");
    }
    match id.as_str() {
        "rg-1" => found(json!({ "id": "rg-1", "name": "default", "state": "ACTIVE" })),
        "rg-empty" => StatusCode::OK.into_response(),
        _ => service_error(StatusCode::NOT_FOUND, "resource_group_not_found", "Resource group not found"),
    }
}
