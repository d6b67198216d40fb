#![allow(dead_code)]

use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use timewarp::config::ProvidersConfig;
use timewarp::provider::Provider;
use timewarp::server::{AppState, SharedState};
use timewarp::settings::{ApiKeys, Settings, SettingsStore};
use timewarp::story::relay::StoryRelay;
use timewarp::story::{RelayError, StoryStream};

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";
pub const TEST_KEY: &str = "sk-test";

/// One streaming frame carrying `text` as its delta.
pub fn sse_frame(text: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]
        })
    )
}

/// A complete streaming body: one frame per delta, then the `[DONE]` sentinel.
pub fn sse_body(deltas: &[&str]) -> String {
    let mut body: String = deltas.iter().map(|d| sse_frame(d)).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

/// Endpoint overrides pointing both providers at a mock server.
pub fn mock_endpoints(server_url: &str) -> ProvidersConfig {
    ProvidersConfig {
        qwen_endpoint: Some(format!("{server_url}{COMPLETIONS_PATH}")),
        deepseek_endpoint: Some(format!("{server_url}/deepseek{COMPLETIONS_PATH}")),
    }
}

pub fn test_relay(server_url: &str) -> StoryRelay {
    StoryRelay::new(mock_endpoints(server_url)).unwrap()
}

pub fn test_keys() -> ApiKeys {
    ApiKeys {
        qwen: Some(TEST_KEY.into()),
        deepseek: Some("sk-deep".into()),
    }
}

pub fn test_settings(provider: Provider) -> Settings {
    Settings {
        provider,
        api_keys: test_keys(),
        ..Default::default()
    }
}

/// Server state backed by a mock upstream and in-memory settings.
pub fn test_state(server_url: &str, settings: Settings) -> SharedState {
    Arc::new(AppState {
        relay: test_relay(server_url),
        settings: Arc::new(SettingsStore::in_memory(settings)),
    })
}

/// Drain a story stream. Stops at the first error.
pub async fn collect(mut stream: StoryStream) -> Result<Vec<String>, RelayError> {
    let mut deltas = Vec::new();
    while let Some(item) = stream.next().await {
        deltas.push(item?);
    }
    Ok(deltas)
}

/// Response head for a streaming body that promises more bytes than it sends.
pub const PARTIAL_STREAM_HEAD: &str = "HTTP/1.1 200 OK\r\n\
content-type: text/event-stream\r\n\
content-length: 10000\r\n\r\n";

/// A bare TCP upstream for one connection. It reads the request, writes
/// `response`, and then either closes the socket at once or holds it open
/// until the client goes away.
pub struct RawUpstream {
    pub url: String,
    /// Fires once the upstream socket is finished: after writing when not held
    /// open, otherwise when the client closes or resets the connection.
    pub closed: oneshot::Receiver<()>,
}

pub async fn raw_upstream(response: String, hold_open: bool) -> RawUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, closed) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        if hold_open {
            let mut buf = [0u8; 1024];
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        }
        drop(socket);
        let _ = tx.send(());
    });

    RawUpstream {
        url: format!("http://{addr}"),
        closed,
    }
}

/// Consume one HTTP/1.1 request with a content-length body.
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending a full request head");
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let body_len: usize = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    while buf.len() < head_end + body_len {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending the request body");
        buf.extend_from_slice(&chunk[..n]);
    }
}
