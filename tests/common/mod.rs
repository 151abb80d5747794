//! In-process HTTP stub standing in for the salon backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use salon_cash_registry::{ApiClient, CashRegistry, Operator, OperatorRole, RegistryConfig, Session};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
struct Route {
    method: String,
    path: String,
    status: u16,
    body: String,
}

#[derive(Clone)]
pub struct StubBackend {
    pub base_url: String,
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

impl StubBackend {
    /// Bind an ephemeral port and serve routes until the runtime shuts down.
    /// `GET /api/health` answers 200 unless overridden.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral TCP port for stub backend");
        let port = listener.local_addr().unwrap().port();

        let stub = StubBackend {
            base_url: format!("http://127.0.0.1:{port}"),
            routes: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        stub.route("GET", "/api/health", 200, serde_json::json!({ "status": "ok" }));

        let server = stub.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let server = server.clone();
                tokio::spawn(async move { server.handle(stream).await });
            }
        });

        stub
    }

    /// Register a canned response. Later registrations win.
    pub fn route(&self, method: &str, path: &str, status: u16, body: Value) {
        let body = if body.is_null() {
            String::new()
        } else {
            body.to_string()
        };
        self.routes.lock().unwrap().push(Route {
            method: method.to_string(),
            path: path.to_string(),
            status,
            body,
        });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    async fn handle(&self, mut stream: TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = find_header_end(&buf) {
                break end;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.split("\r\n");
        let mut request_line = lines.next().unwrap_or_default().split_whitespace();
        let method = request_line.next().unwrap_or_default().to_string();
        let target = request_line.next().unwrap_or_default().to_string();
        let headers: HashMap<String, String> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();

        let content_length = headers
            .get("content-length")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
        }
        let body_end = (header_end + content_length).min(buf.len());
        let body = serde_json::from_slice(&buf[header_end..body_end]).unwrap_or(Value::Null);

        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), q.to_string()),
            None => (target.clone(), String::new()),
        };

        let route = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .cloned();

        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            path,
            query,
            headers,
            body,
        });

        let (status, body) = route
            .map(|r| (r.status, r.body))
            .unwrap_or((404, r#"{"error":"no stub route"}"#.to_string()));
        let response = format!(
            "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            reason(status),
            body.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }
}

pub fn operator(role: OperatorRole) -> Operator {
    Operator {
        id: format!("{role}-1"),
        name: None,
        role,
    }
}

pub fn registry_for(base_url: &str, role: OperatorRole) -> CashRegistry {
    let config = RegistryConfig::new(base_url);
    let session = Session::new("test-token", operator(role));
    CashRegistry::new(ApiClient::new(&config, session).expect("api client"))
}

/// Shift entry JSON as the backend returns it.
pub fn entry_json(id: &str, date: &str, shift: &str, denominations: Value, balance: f64) -> Value {
    let mut entry = serde_json::json!({
        "_id": id,
        "date": date,
        "shiftType": shift,
        "createdBy": "staff-1",
        "denominations": denominations,
        "isVerified": false,
        "createdAt": "2026-10-18T03:30:00Z",
    });
    let key = if shift == "opening" {
        "openingBalance"
    } else {
        "closingBalance"
    };
    entry[key] = serde_json::json!(balance);
    entry
}
