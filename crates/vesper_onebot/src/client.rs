use anyhow::{Context, Result};
use futures::{Sink, SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use url::Url;
use vesper_core::config::OneBotConfig;
use vesper_core::InboundMessage;

use crate::event::{OneBotEvent, SendMessageAction};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An outgoing JSON frame and the caller waiting to hear it was written.
struct Outgoing {
    json: String,
    ack: oneshot::Sender<Result<()>>,
}

/// Handle to the background WebSocket task. Cloning shares the connection.
#[derive(Clone)]
pub struct OneBotClient {
    tx: mpsc::Sender<Outgoing>,
}

impl OneBotClient {
    /// Spawn the connection task and return the handle plus a stream of
    /// inbound messages from `config.group_id`. The task reconnects forever.
    pub fn connect(config: &OneBotConfig) -> Result<(Self, mpsc::Receiver<InboundMessage>)> {
        let ws_url = Url::parse(&config.ws_url).context("Invalid OneBot WS URL")?;
        // Fail on a bad token now rather than on every reconnect
        build_request(&ws_url, config.access_token.as_deref())?;

        let (tx, mut rx) = mpsc::channel::<Outgoing>(32);
        let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(32);
        let token = config.access_token.clone();
        let group_id = config.group_id;

        tokio::spawn(async move {
            let mut retry_count = 0u32;
            loop {
                tracing::info!("Connecting to OneBot at {}...", ws_url);
                let connected = match build_request(&ws_url, token.as_deref()) {
                    Ok(request) => connect_async(request).await,
                    Err(e) => {
                        tracing::error!("OneBot request invalid: {:#}", e);
                        return;
                    }
                };
                match connected {
                    Ok((ws_stream, _)) => {
                        tracing::info!("Connected to OneBot");
                        retry_count = 0;
                        match handle_connection(ws_stream, &mut rx, &inbound_tx, group_id).await {
                            Ok(Closed::Remote) => tracing::warn!("OneBot closed the connection"),
                            Ok(Closed::Local) => {
                                tracing::info!("OneBot client dropped, stopping");
                                return;
                            }
                            Err(e) => tracing::error!("OneBot connection error: {:#}", e),
                        }
                    }
                    Err(e) => {
                        let wait_secs = 30u64.min(2u64.pow(retry_count));
                        tracing::error!("Failed to connect to OneBot: {}. Retrying in {}s...", e, wait_secs);
                        tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                        if retry_count < 6 {
                            retry_count += 1;
                        }
                    }
                }
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        });

        Ok((Self { tx }, inbound_rx))
    }

    /// Send a `send_group_msg` action and wait until it is written to the
    /// socket. Frames wait in the queue across a reconnect; a caller that
    /// stops waiting (for example on a timeout) withdraws its frame.
    pub async fn send_group_message(&self, group_id: i64, message: &str) -> Result<()> {
        let json = serde_json::to_string(&SendMessageAction::group(group_id, message))?;
        let (ack, written) = oneshot::channel();
        self.tx
            .send(Outgoing { json, ack })
            .await
            .map_err(|_| anyhow::anyhow!("OneBot connection task stopped"))?;
        written
            .await
            .map_err(|_| anyhow::anyhow!("OneBot frame dropped before it was written"))?
    }
}

enum Closed {
    Remote,
    Local,
}

fn build_request(url: &Url, token: Option<&str>) -> Result<Request> {
    let mut request = url
        .as_str()
        .into_client_request()
        .context("Invalid OneBot WS request")?;
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("OneBot access token is not a valid header value")?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    Ok(request)
}

async fn handle_connection(
    stream: WsStream,
    rx: &mut mpsc::Receiver<Outgoing>,
    inbound_tx: &mpsc::Sender<InboundMessage>,
    group_id: Option<i64>,
) -> Result<Closed> {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            frame = read.next() => {
                let Some(frame) = frame else {
                    return Ok(Closed::Remote);
                };
                match frame? {
                    Message::Text(text) => {
                        if let Some(message) = accept_frame(&text, group_id) {
                            if inbound_tx.send(message).await.is_err() {
                                return Ok(Closed::Local);
                            }
                        }
                    }
                    Message::Close(_) => return Ok(Closed::Remote),
                    _ => {}
                }
            }
            outgoing = rx.recv() => {
                let Some(frame) = outgoing else {
                    return Ok(Closed::Local);
                };
                deliver(&mut write, frame).await?;
            }
        }
    }
}

/// Write one frame and report the result to its sender. A write error
/// also ends the connection.
async fn deliver<S>(write: &mut S, frame: Outgoing) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: Into<anyhow::Error>,
{
    if frame.ack.is_closed() {
        tracing::debug!("Dropped outgoing frame nobody is waiting for");
        return Ok(());
    }
    match write.send(Message::Text(frame.json)).await {
        Ok(()) => {
            let _ = frame.ack.send(Ok(()));
            Ok(())
        }
        Err(e) => {
            let e: anyhow::Error = e.into();
            let _ = frame.ack.send(Err(anyhow::anyhow!("OneBot write failed: {:#}", e)));
            Err(e)
        }
    }
}

/// Inbound message carried by `text`, if it is one the bot should answer.
fn accept_frame(text: &str, group_id: Option<i64>) -> Option<InboundMessage> {
    match serde_json::from_str::<OneBotEvent>(text) {
        Ok(OneBotEvent::Message(event)) => {
            if event.is_for(group_id) {
                Some(event.into_inbound())
            } else {
                tracing::debug!(
                    message_type = %event.message_type,
                    group = ?event.group_id,
                    "Ignored message outside the served group"
                );
                None
            }
        }
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Ignored unparseable OneBot frame: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_bearer_token() {
        let url = Url::parse("ws://127.0.0.1:3001").unwrap();
        let request = build_request(&url, Some("s3cret")).unwrap();
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer s3cret");

        let request = build_request(&url, None).unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_accept_frame_filters() {
        let frame = |user: i64, group: i64| {
            format!(
                r#"{{"time": 5, "self_id": 1, "post_type": "message", "message_type": "group",
                   "message_id": 9, "group_id": {}, "user_id": {}, "raw_message": "hey"}}"#,
                group, user
            )
        };
        let accepted = accept_frame(&frame(2, 777), Some(777)).unwrap();
        assert_eq!(accepted.body, "hey");
        assert_eq!(accepted.author, "2");

        assert!(accept_frame(&frame(1, 777), Some(777)).is_none());
        assert!(accept_frame(&frame(2, 778), Some(777)).is_none());
        assert!(accept_frame(r#"{"post_type": "notice"}"#, Some(777)).is_none());
        assert!(accept_frame("not json", Some(777)).is_none());
    }

    fn outgoing(json: &str) -> (Outgoing, oneshot::Receiver<Result<()>>) {
        let (ack, written) = oneshot::channel();
        (
            Outgoing {
                json: json.to_string(),
                ack,
            },
            written,
        )
    }

    #[tokio::test]
    async fn test_deliver_acks_written_frame() {
        let mut sent = Vec::new();
        let (frame, written) = outgoing("{}");
        deliver(&mut sent, frame).await.unwrap();
        assert!(written.await.unwrap().is_ok());
        assert_eq!(sent, vec![Message::Text("{}".to_string())]);
    }

    #[tokio::test]
    async fn test_deliver_reports_write_failure() {
        let mut broken = Box::pin(futures::sink::unfold((), |_, _: Message| async {
            Err::<(), anyhow::Error>(anyhow::anyhow!("broken pipe"))
        }));
        let (frame, written) = outgoing("{}");
        assert!(deliver(&mut broken, frame).await.is_err());
        let err = written.await.unwrap().unwrap_err();
        assert!(format!("{:#}", err).contains("broken pipe"));
    }

    #[tokio::test]
    async fn test_deliver_skips_abandoned_frame() {
        let mut sent = Vec::new();
        let (frame, written) = outgoing("{}");
        drop(written);
        deliver(&mut sent, frame).await.unwrap();
        assert!(sent.is_empty());
    }

    #[tokio::test]
    async fn test_send_fails_when_frame_is_dropped() {
        let (tx, mut rx) = mpsc::channel::<Outgoing>(1);
        let client = OneBotClient { tx };
        // Connection task takes the frame, then loses it
        tokio::spawn(async move {
            let frame = rx.recv().await;
            drop(frame);
        });
        assert!(client.send_group_message(777, "hello").await.is_err());
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let config = OneBotConfig {
            ws_url: "not a url".to_string(),
            access_token: None,
            group_id: Some(1),
        };
        assert!(OneBotClient::connect(&config).is_err());
    }
}
