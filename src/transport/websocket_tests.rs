use crate::broker::{Broker, DispatchConfig, Dispatcher};
use crate::dataset::Dataset;
use crate::record::{LogCandidate, LogRecord};
use crate::transport::{AppState, bind, build_router, serve};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;

struct TestServer {
    addr: SocketAddr,
    broker: Arc<Broker>,
    dispatcher: Dispatcher,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let broker = Arc::new(Broker::new());
        let state = Arc::new(AppState::new(
            Arc::clone(&broker),
            Dataset::builtin(),
            "logs",
        ));
        let router = build_router(state, Duration::from_secs(5));

        let listener = bind("127.0.0.1:0").await.expect("bind failed");
        let addr = listener.local_addr().unwrap();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(serve(listener, router, async move {
            let _ = shutdown_rx.await;
        }));

        let dispatcher = Dispatcher::new(
            Arc::clone(&broker),
            DispatchConfig {
                interval: Duration::from_millis(10),
                ..DispatchConfig::default()
            },
        );
        dispatcher.start();

        Self {
            addr,
            broker,
            dispatcher,
            shutdown: Some(shutdown),
        }
    }

    fn stream_url(&self, topic: &str) -> String {
        format!("ws://{}/api/v1/stream?topic={topic}", self.addr)
    }

    async fn wait_for_subscriptions(&self, expected: usize) {
        for _ in 0..100 {
            if self.broker.subscription_count() == expected {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {expected} subscriptions, found {}",
            self.broker.subscription_count()
        );
    }

    async fn stop(mut self) {
        self.dispatcher.stop().await;
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn next_record<S>(ws: &mut S) -> LogRecord
where
    S: StreamExt<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let message = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a record")
            .expect("stream closed")
            .expect("websocket error");
        if let WsMessage::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap_or_else(|e| {
                panic!("failed to deserialize record from '{}': {e}", text.as_str());
            });
        }
    }
}

#[tokio::test]
async fn test_stream_receives_published_records_in_order() {
    let server = TestServer::start().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(server.stream_url("logs"))
        .await
        .expect("WebSocket handshake failed");
    server.wait_for_subscriptions(1).await;

    for message in ["first", "second", "third"] {
        server
            .broker
            .publish("logs", LogCandidate::new("auth", "ERROR", message))
            .unwrap();
    }

    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(next_record(&mut ws).await);
    }
    let offsets: Vec<u64> = received.iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, 1, 2]);
    assert_eq!(received[0].entry.message, "first");
    assert_eq!(received[2].entry.message, "third");
    assert_eq!(received[0].topic, "logs");

    server.stop().await;
}

#[tokio::test]
async fn test_stream_only_sees_its_topic_and_new_records() {
    let server = TestServer::start().await;
    server
        .broker
        .publish("audit", LogCandidate::new("svc", "INFO", "before"))
        .unwrap();

    let (mut ws, _) = tokio_tungstenite::connect_async(server.stream_url("audit"))
        .await
        .expect("WebSocket handshake failed");
    server.wait_for_subscriptions(1).await;

    server
        .broker
        .publish("logs", LogCandidate::new("svc", "INFO", "elsewhere"))
        .unwrap();
    server
        .broker
        .publish("audit", LogCandidate::new("svc", "WARN", "after"))
        .unwrap();

    let record = next_record(&mut ws).await;
    assert_eq!(record.topic, "audit");
    assert_eq!(record.offset, 1);
    assert_eq!(record.entry.message, "after");

    server.stop().await;
}

#[tokio::test]
async fn test_closing_the_socket_unsubscribes() {
    let server = TestServer::start().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(server.stream_url("logs"))
        .await
        .expect("WebSocket handshake failed");
    server.wait_for_subscriptions(1).await;

    ws.send(WsMessage::Close(None)).await.unwrap();
    server.wait_for_subscriptions(0).await;

    // Publishing with nobody listening still succeeds.
    let receipt = server
        .broker
        .publish("logs", LogCandidate::new("svc", "INFO", "unheard"))
        .unwrap();
    assert_eq!(receipt.offset, 0);

    server.stop().await;
}
