// WebSocket server for communication with the dashboard page.

use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream, Stream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{info, warn};

/// Events emitted by the WebSocket server to the application layer.
#[derive(Debug)]
pub enum WsEvent {
    /// A new client has connected. `reply` is the outbound channel for this
    /// connection; text sent through it is delivered to the page.
    Connected {
        addr: String,
        reply: mpsc::Sender<String>,
    },
    /// The current client has disconnected.
    Disconnected,
    /// A text message was received from the client (raw JSON string).
    Message(String),
}

/// A bound listener, separated from [`run`] so callers (and tests) can learn
/// the local address before the accept loop starts.
pub struct WsListener {
    inner: TcpListener,
}

impl WsListener {
    /// Bind on `127.0.0.1:{port}`. Port 0 picks an ephemeral port.
    pub async fn bind(port: u16) -> anyhow::Result<Self> {
        let inner = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }
}

/// Run the WebSocket server, forwarding events through `tx`.
///
/// Accepts one connection at a time. For each connection it performs the
/// handshake, hands the app layer a reply channel via [`WsEvent::Connected`],
/// then reads text messages and forwards them as [`WsEvent::Message`]. The
/// server runs until the task is cancelled or the event receiver is dropped.
pub async fn run(listener: WsListener, tx: mpsc::Sender<WsEvent>) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    info!("WebSocket server listening on {local_addr}");

    loop {
        let (stream, addr) = listener.inner.accept().await?;
        let addr_str = addr.to_string();
        info!("Accepted TCP connection from {addr_str}");

        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!("WebSocket handshake failed for {addr_str}: {e}");
                continue;
            }
        };

        let (write, read) = ws_stream.split();
        let (reply_tx, reply_rx) = mpsc::channel(64);

        if tx
            .send(WsEvent::Connected {
                addr: addr_str.clone(),
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            break;
        }

        let writer = tokio::spawn(forward_replies(reply_rx, write));
        let closed = process_messages(read, &tx, &addr_str).await.is_err();
        writer.abort();
        if closed {
            break;
        }

        if tx.send(WsEvent::Disconnected).await.is_err() {
            break;
        }
    }

    Ok(())
}

/// Deliver queued reply text to the connection's write half. Ends when the
/// reply channel closes or the peer goes away.
async fn forward_replies<S>(
    mut rx: mpsc::Receiver<String>,
    mut write: SplitSink<WebSocketStream<S>, Message>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(text) = rx.recv().await {
        if write.send(Message::text(text)).await.is_err() {
            break;
        }
    }
}

/// Process incoming WebSocket messages from a read stream, forwarding text
/// messages through `tx`. Returns `Err(())` if the channel is closed
/// (receiver dropped), signalling the caller to stop.
async fn process_messages<S>(
    read: SplitStream<WebSocketStream<S>>,
    tx: &mpsc::Sender<WsEvent>,
    addr: &str,
) -> Result<(), ()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    process_message_stream(read, tx, addr).await
}

/// Process raw WebSocket [`Message`] items from any [`Stream`], forwarding
/// text payloads through `tx`. This is a pure-logic function that requires
/// no I/O and is the primary unit-test target.
pub async fn process_message_stream<St>(
    mut messages: St,
    tx: &mpsc::Sender<WsEvent>,
    addr: &str,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = messages.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                if tx.send(WsEvent::Message(text.to_string())).await.is_err() {
                    return Err(());
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn collect_events(mut rx: mpsc::Receiver<WsEvent>) -> Vec<WsEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    // -- Pure stream processing --

    #[tokio::test]
    async fn text_frames_forward_as_message_events() {
        let (tx, rx) = mpsc::channel(8);
        let messages = stream::iter(vec![
            Ok(Message::text("{\"type\":\"compare\"}")),
            Ok(Message::text("second")),
        ]);

        process_message_stream(messages, &tx, "test").await.unwrap();
        drop(tx);

        let events = collect_events(rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], WsEvent::Message(m) if m == "{\"type\":\"compare\"}"));
        assert!(matches!(&events[1], WsEvent::Message(m) if m == "second"));
    }

    #[tokio::test]
    async fn close_frame_ends_processing() {
        let (tx, rx) = mpsc::channel(8);
        let messages = stream::iter(vec![
            Ok(Message::text("before")),
            Ok(Message::Close(None)),
            Ok(Message::text("after")),
        ]);

        process_message_stream(messages, &tx, "test").await.unwrap();
        drop(tx);

        let events = collect_events(rx);
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn non_text_frames_ignored() {
        let (tx, rx) = mpsc::channel(8);
        let messages = stream::iter(vec![
            Ok(Message::Ping(vec![].into())),
            Ok(Message::Binary(vec![1, 2, 3].into())),
            Ok(Message::text("only this")),
        ]);

        process_message_stream(messages, &tx, "test").await.unwrap();
        drop(tx);

        let events = collect_events(rx);
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn dropped_receiver_reports_closed_channel() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let messages = stream::iter(vec![Ok(Message::text("unreceived"))]);

        let result = process_message_stream(messages, &tx, "test").await;
        assert!(result.is_err());
    }

    // -- End-to-end over a real socket --

    #[tokio::test]
    async fn client_round_trip_request_and_reply() {
        let listener = WsListener::bind(0).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let server = tokio::spawn(run(listener, tx));

        let (mut client, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .unwrap();

        // Server announces the connection and hands over the reply channel.
        let reply = match rx.recv().await.unwrap() {
            WsEvent::Connected { reply, .. } => reply,
            other => panic!("expected Connected, got: {other:?}"),
        };

        // Client request reaches the app layer.
        client.send(Message::text("{\"type\":\"compare\"}")).await.unwrap();
        match rx.recv().await.unwrap() {
            WsEvent::Message(m) => assert_eq!(m, "{\"type\":\"compare\"}"),
            other => panic!("expected Message, got: {other:?}"),
        }

        // App layer reply reaches the client.
        reply.send("{\"type\":\"error\"}".to_string()).await.unwrap();
        match client.next().await.unwrap().unwrap() {
            Message::Text(text) => assert_eq!(text.as_str(), "{\"type\":\"error\"}"),
            other => panic!("expected text frame, got: {other:?}"),
        }

        server.abort();
    }
}
