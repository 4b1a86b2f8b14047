use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use super::types::{ProbeResult, ProbeStatus};

/// Method sent to every server; the first notification carries the chain head.
const HEAD_SUBSCRIBE_METHOD: &str = "blockchain.headers.subscribe";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Request ids only need to be unique within this process.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a probe attempt did not come back `online`.
///
/// Each variant carries its classification: transport-level failures are
/// `offline`, a reachable server answering garbage is `error`.
#[derive(Debug, Error)]
pub enum ProbeFailure {
    #[error("connection failed: {0}")]
    Connect(#[source] WsError),
    #[error("failed to send request: {0}")]
    Send(#[source] WsError),
    #[error("connection closed before a response arrived")]
    ClosedEarly,
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("response id {got:?} does not match request id {want}")]
    IdMismatch { want: u64, got: Option<u64> },
    #[error("response carried no result payload")]
    MissingResult,
}

impl ProbeFailure {
    fn classify(&self) -> ProbeStatus {
        match self {
            Self::Connect(_) | Self::Send(_) | Self::ClosedEarly | Self::Timeout(_) => {
                ProbeStatus::Offline
            }
            Self::Malformed(_) | Self::IdMismatch { .. } | Self::MissingResult => {
                ProbeStatus::Error
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct HeadResponse {
    id: Option<u64>,
    result: Option<HeadResult>,
}

#[derive(Debug, Deserialize)]
struct HeadResult {
    height: u64,
}

/// Probe one server and classify the outcome.
///
/// Never fails outward: every failure mode resolves to an `offline` or
/// `error` result. The timeout covers the whole attempt, so a server that
/// accepts the connection and then goes silent still resolves within
/// `request_timeout`; dropping the timed-out future closes its connection.
pub async fn probe(server: &str, request_timeout: Duration) -> ProbeResult {
    let outcome = match timeout(request_timeout, request_head(server)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ProbeFailure::Timeout(request_timeout)),
    };

    match outcome {
        Ok(height) => {
            debug!(server, height, "probe succeeded");
            ProbeResult::online(server, height)
        }
        Err(failure) => {
            debug!(server, error = %failure, status = %failure.classify(), "probe failed");
            match failure.classify() {
                ProbeStatus::Error => ProbeResult::protocol_error(server),
                _ => ProbeResult::offline(server),
            }
        }
    }
}

/// Connect, subscribe to the chain head, and wait for one response.
async fn request_head(server: &str) -> Result<u64, ProbeFailure> {
    let (mut stream, _) = connect_async(server).await.map_err(ProbeFailure::Connect)?;

    let request_id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
    let outcome = exchange(&mut stream, request_id).await;

    // Best-effort close; the outcome already stands.
    let _ = stream.close(None).await;
    outcome
}

async fn exchange(stream: &mut WsStream, request_id: u64) -> Result<u64, ProbeFailure> {
    let request = json!({
        "id": request_id,
        "method": HEAD_SUBSCRIBE_METHOD,
        "params": [],
    });
    stream
        .send(Message::Text(request.to_string().into()))
        .await
        .map_err(ProbeFailure::Send)?;

    // One data message decides the outcome; control frames are skipped.
    loop {
        let message = match stream.next().await {
            Some(Ok(message)) => message,
            Some(Err(_)) | None => return Err(ProbeFailure::ClosedEarly),
        };

        let response: HeadResponse = match &message {
            Message::Text(text) => {
                serde_json::from_str(text.as_str()).map_err(ProbeFailure::Malformed)?
            }
            Message::Binary(bytes) => {
                serde_json::from_slice(bytes).map_err(ProbeFailure::Malformed)?
            }
            Message::Close(_) => return Err(ProbeFailure::ClosedEarly),
            _ => continue,
        };

        if response.id != Some(request_id) {
            return Err(ProbeFailure::IdMismatch { want: request_id, got: response.id });
        }

        return response.result.map(|head| head.height).ok_or(ProbeFailure::MissingResult);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    /// Serve exactly one WebSocket connection; `respond` maps the request id
    /// to a reply, or `None` to hold the connection open without answering.
    async fn serve_once<F>(respond: F) -> String
    where
        F: FnOnce(u64) -> Option<String> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(socket).await.unwrap();

            let request = ws.next().await.unwrap().unwrap();
            let value: Value = serde_json::from_str(request.to_text().unwrap()).unwrap();
            assert_eq!(value["method"], HEAD_SUBSCRIBE_METHOD);
            assert_eq!(value["params"], serde_json::json!([]));
            let id = value["id"].as_u64().unwrap();

            match respond(id) {
                Some(reply) => {
                    ws.send(Message::Text(reply.into())).await.unwrap();
                    let _ = ws.next().await;
                }
                None => {
                    // Keep the connection open so the client has to time out.
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            }
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn valid_head_response_is_online() {
        let server = serve_once(|id| {
            Some(json!({ "id": id, "result": { "height": 800_000, "hex": "00" } }).to_string())
        })
        .await;

        let result = probe(&server, DEFAULT_REQUEST_TIMEOUT).await;
        assert_eq!(result.status, ProbeStatus::Online);
        assert_eq!(result.block_height, Some(800_000));
        assert_eq!(result.server, server);
    }

    #[tokio::test]
    async fn mismatched_request_id_is_error() {
        let server = serve_once(|id| {
            Some(json!({ "id": id + 1, "result": { "height": 1 } }).to_string())
        })
        .await;

        let result = probe(&server, DEFAULT_REQUEST_TIMEOUT).await;
        assert_eq!(result.status, ProbeStatus::Error);
        assert_eq!(result.block_height, None);
    }

    #[tokio::test]
    async fn missing_result_payload_is_error() {
        let server = serve_once(|id| Some(json!({ "id": id }).to_string())).await;

        let result = probe(&server, DEFAULT_REQUEST_TIMEOUT).await;
        assert_eq!(result.status, ProbeStatus::Error);
    }

    #[tokio::test]
    async fn unparseable_reply_is_error() {
        let server = serve_once(|_| Some("not json".to_string())).await;

        let result = probe(&server, DEFAULT_REQUEST_TIMEOUT).await;
        assert_eq!(result.status, ProbeStatus::Error);
    }

    #[tokio::test]
    async fn refused_connection_is_offline() {
        // Bind then drop the listener so the port is closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = probe(&format!("ws://{addr}"), DEFAULT_REQUEST_TIMEOUT).await;
        assert_eq!(result.status, ProbeStatus::Offline);
    }

    #[tokio::test]
    async fn close_without_reply_is_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept the handshake, read the request, then close without answering.
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(socket).await.unwrap();
            let _request = ws.next().await.unwrap().unwrap();
            ws.close(None).await.unwrap();
        });

        let result = probe(&format!("ws://{addr}"), DEFAULT_REQUEST_TIMEOUT).await;
        assert_eq!(result.status, ProbeStatus::Offline);
        assert_eq!(result.block_height, None);
    }

    #[tokio::test]
    async fn silent_server_times_out_offline() {
        let server = serve_once(|_| None).await;

        let started = tokio::time::Instant::now();
        let result = probe(&server, Duration::from_millis(250)).await;

        assert_eq!(result.status, ProbeStatus::Offline);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
