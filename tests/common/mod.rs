//! Shared helpers for integration tests: a mock upstream that echoes what
//! it receives, and a proxy pointed at it.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pswproxy::config::model::{ListenConfig, ProxyConfig, Upstream};
use pswproxy::server::{ForwardingListener, ListenerHandle};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

pub const LARGE_BODY_LEN: usize = 8 * 1024 * 1024;

/// What the mock upstream saw.
#[derive(Debug, serde::Deserialize)]
pub struct Echo {
    pub method: String,
    pub uri: String,
    pub headers: BTreeMap<String, String>,
    pub body_len: usize,
    pub body_sum: u64,
    pub body: String,
}

async fn echo(req: Request) -> Json<serde_json::Value> {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let headers: BTreeMap<String, String> = parts
        .headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();
    let body_sum: u64 = bytes.iter().map(|b| u64::from(*b)).sum();
    let body = if bytes.len() <= 1024 {
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        String::new()
    };

    Json(serde_json::json!({
        "method": parts.method.as_str(),
        "uri": parts.uri.to_string(),
        "headers": headers,
        "body_len": bytes.len(),
        "body_sum": body_sum,
        "body": body,
    }))
}

async fn ok() -> Response {
    (
        StatusCode::OK,
        [("x-upstream", "mock"), ("cache-control", "max-age=60")],
        "ok",
    )
        .into_response()
}

async fn teapot() -> Response {
    (StatusCode::IM_A_TEAPOT, [("x-reason", "short and stout")], "teapot").into_response()
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "late"
}

/// Answers with the first body frame it sees, without waiting for the rest.
async fn first_frame(req: Request) -> String {
    use http_body_util::BodyExt;

    let mut body = req.into_body();
    match body.frame().await {
        Some(Ok(frame)) => frame
            .into_data()
            .map(|data| String::from_utf8_lossy(&data).into_owned())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

async fn large() -> Body {
    Body::from(vec![b'x'; LARGE_BODY_LEN])
}

pub async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/ok", get(ok))
        .route("/teapot", get(teapot))
        .route("/slow", get(slow))
        .route("/large", get(large))
        .route("/first-frame", post(first_frame))
        .fallback(echo);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Raw upstream that answers every connection with the bytes in `response`,
/// then either closes the socket or keeps it open without sending more.
pub async fn spawn_raw_upstream(response: &'static [u8], hold_open: bool) -> SocketAddr {
    use tokio::io::AsyncWriteExt;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response).await;
                let _ = socket.flush().await;
                if hold_open {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            });
        }
    });
    addr
}

/// An address nothing is listening on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn proxy_config(upstream: SocketAddr) -> ProxyConfig {
    ProxyConfig {
        listen: ListenConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        upstream: Upstream::from_url(&format!("http://{upstream}")).unwrap(),
        ..ProxyConfig::default()
    }
}

pub async fn start_proxy(config: ProxyConfig) -> ListenerHandle {
    ForwardingListener::start(config).await.unwrap()
}

pub const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

/// Request head for a chunked POST that asks the server to close afterwards.
pub fn chunked_head(path: &str) -> Vec<u8> {
    format!(
        "POST {path} HTTP/1.1\r\nhost: localhost\r\ntransfer-encoding: chunked\r\nconnection: close\r\n\r\n"
    )
    .into_bytes()
}

pub fn chunk(data: &[u8]) -> Vec<u8> {
    let mut out = format!("{:x}\r\n", data.len()).into_bytes();
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
    out
}

/// Read until `needle` shows up, the peer closes, or five seconds pass.
pub async fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut buf = Vec::new();
    let mut scratch = [0u8; 4096];
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.read(&mut scratch).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    buf.extend_from_slice(&scratch[..n]);
                    if String::from_utf8_lossy(&buf).contains(needle) {
                        break;
                    }
                }
            }
        }
    })
    .await;
    String::from_utf8_lossy(&buf).into_owned()
}
