//! WebSocket clients against the dedicated and shared HMR listeners.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{Router, routing::get};
use futures_util::StreamExt;
use kiln_config::HmrConfig;
use kiln_hmr::{ErrorPayload, HmrChannel, HmrPayload};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{Message, client::IntoClientRequest, http::HeaderValue};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn ephemeral_config() -> HmrConfig {
    HmrConfig {
        port: 0,
        ..HmrConfig::default()
    }
}

async fn connect(addr: SocketAddr, protocol: Option<&'static str>) -> Result<Client, String> {
    let mut request = format!("ws://{addr}/")
        .into_client_request()
        .map_err(|e| e.to_string())?;
    if let Some(protocol) = protocol {
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(protocol));
    }
    connect_async(request)
        .await
        .map(|(client, _)| client)
        .map_err(|e| e.to_string())
}

async fn next_payload(client: &mut Client) -> Option<HmrPayload> {
    let message = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for payload")?
        .ok()?;
    match message {
        Message::Text(text) => Some(serde_json::from_str(text.as_str()).unwrap()),
        _ => None,
    }
}

async fn nothing_pending(client: &mut Client) -> bool {
    tokio::time::timeout(Duration::from_millis(200), client.next())
        .await
        .is_err()
}

#[tokio::test]
async fn buffered_error_reaches_first_client() {
    let channel = HmrChannel::new("kiln-hmr");
    let addr = channel.listen(&ephemeral_config()).await.unwrap().unwrap();

    channel
        .send(&HmrPayload::Error {
            err: ErrorPayload::new("Transform failed"),
        })
        .unwrap();

    let mut first = connect(addr, Some("kiln-hmr")).await.unwrap();
    assert_eq!(next_payload(&mut first).await, Some(HmrPayload::Connected));
    match next_payload(&mut first).await {
        Some(HmrPayload::Error { err }) => assert_eq!(err.message, "Transform failed"),
        other => panic!("expected buffered error, got {other:?}"),
    }

    let mut second = connect(addr, Some("kiln-hmr")).await.unwrap();
    assert_eq!(next_payload(&mut second).await, Some(HmrPayload::Connected));
    assert!(nothing_pending(&mut second).await);

    channel.close().await.unwrap();
}

#[tokio::test]
async fn payloads_arrive_in_order() {
    let channel = HmrChannel::new("kiln-hmr");
    let addr = channel.listen(&ephemeral_config()).await.unwrap().unwrap();

    let mut client = connect(addr, Some("kiln-hmr")).await.unwrap();
    assert_eq!(next_payload(&mut client).await, Some(HmrPayload::Connected));
    assert_eq!(channel.client_count(), 1);

    let payloads = vec![
        HmrPayload::Prune {
            paths: vec!["/old.js".into()],
        },
        HmrPayload::Custom {
            event: "kiln:beforeUpdate".into(),
            data: None,
        },
        HmrPayload::FullReload { path: None },
    ];
    for payload in &payloads {
        channel.send(payload).unwrap();
    }
    for payload in payloads {
        assert_eq!(next_payload(&mut client).await, Some(payload));
    }

    channel.close().await.unwrap();
}

#[tokio::test]
async fn wrong_protocol_is_rejected() {
    let channel = HmrChannel::new("kiln-hmr");
    let addr = channel.listen(&ephemeral_config()).await.unwrap().unwrap();

    assert!(connect(addr, None).await.is_err());
    assert!(connect(addr, Some("vite-hmr")).await.is_err());
    assert_eq!(channel.client_count(), 0);

    channel.close().await.unwrap();
}

#[tokio::test]
async fn close_terminates_clients_and_listener() {
    let channel = HmrChannel::new("kiln-hmr");
    let addr = channel.listen(&ephemeral_config()).await.unwrap().unwrap();

    let mut client = connect(addr, Some("kiln-hmr")).await.unwrap();
    assert_eq!(next_payload(&mut client).await, Some(HmrPayload::Connected));

    channel.close().await.unwrap();
    assert_eq!(channel.client_count(), 0);
    assert!(channel.local_addr().is_none());

    let closed = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("client was not closed");
    assert!(matches!(closed, None | Some(Ok(Message::Close(_))) | Some(Err(_))));

    assert!(connect(addr, Some("kiln-hmr")).await.is_err());
}

#[tokio::test]
async fn port_in_use_is_not_an_error() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = HmrConfig {
        port: taken.local_addr().unwrap().port(),
        ..HmrConfig::default()
    };

    let channel = HmrChannel::new("kiln-hmr");
    assert_eq!(channel.listen(&config).await.unwrap(), None);
    assert!(channel.local_addr().is_none());
}

#[tokio::test]
async fn other_bind_errors_are_returned() {
    let config = HmrConfig {
        host: "203.0.113.1".into(),
        port: 0,
        ..HmrConfig::default()
    };

    let channel = HmrChannel::new("kiln-hmr");
    let err = channel.listen(&config).await.unwrap_err();
    assert!(matches!(err, kiln_hmr::HmrError::Bind { .. }));
}

#[tokio::test]
async fn shared_router_passes_other_requests_through() {
    let channel = HmrChannel::new("kiln-hmr");
    let app = channel.attach(Router::new().route("/", get(|| async { "hello from host" })));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });

    let mut client = connect(addr, Some("kiln-hmr")).await.unwrap();
    assert_eq!(next_payload(&mut client).await, Some(HmrPayload::Connected));
    assert_eq!(channel.client_count(), 1);

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("hello from host"));

    channel.close().await.unwrap();
}
