use core::time::Duration;
use std::borrow::Cow;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{accept_async, WebSocketStream};
use url::Url;

use super::*;
use crate::output::Format;

const SHORT_IDLE: Duration = Duration::from_millis(200);

type ServerStream = WebSocketStream<TcpStream>;

/// Accepts a single WebSocket client and hands it to `handler`.
async fn serve_once<F, Fut>(handler: F) -> Url
where
    F: FnOnce(ServerStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    drop(tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let ws = accept_async(tcp).await.unwrap();
        handler(ws).await;
    }));

    Url::parse(&format!("ws://{addr}")).unwrap()
}

/// Keeps the connection open until the client goes away.
async fn hold(mut ws: ServerStream) {
    while let Some(Ok(_)) = ws.next().await {}
}

fn output() -> Output {
    Output::new(Format::Json)
}

#[tokio::test]
async fn reports_initial_state_then_idles_out() {
    let url = serve_once(|mut ws| async move {
        ws.send(WsMessage::Binary(vec![0; 5])).await.unwrap();
        hold(ws).await;
    })
    .await;

    let report = ProbeSession::new(url, SHORT_IDLE)
        .run(&output(), core::future::pending())
        .await
        .unwrap();

    assert_eq!(report.initial_len, Some(5));
    assert!(report.updates.is_empty(), "no updates were sent");
    assert_eq!(report.end, EndReason::IdleTimeout);
}

#[tokio::test]
async fn counts_every_update() {
    let url = serve_once(|mut ws| async move {
        ws.send(WsMessage::Binary(vec![1, 2, 3])).await.unwrap();
        ws.send(WsMessage::Binary(vec![0; 10])).await.unwrap();
        ws.send(WsMessage::Binary(vec![0; 20])).await.unwrap();
        hold(ws).await;
    })
    .await;

    let report = ProbeSession::new(url, SHORT_IDLE)
        .with_inspect(true)
        .run(&output(), core::future::pending())
        .await
        .unwrap();

    assert_eq!(report.initial_len, Some(3));
    assert_eq!(report.updates, [10, 20]);
    assert_eq!(report.update_bytes(), 30);
    assert_eq!(report.end, EndReason::IdleTimeout);
}

#[tokio::test]
async fn text_messages_count_their_utf8_length() {
    let url = serve_once(|mut ws| async move {
        ws.send(WsMessage::Text("héllo".to_owned())).await.unwrap();
        hold(ws).await;
    })
    .await;

    let report = ProbeSession::new(url, SHORT_IDLE)
        .run(&output(), core::future::pending())
        .await
        .unwrap();

    assert_eq!(report.initial_len, Some(6));
}

#[tokio::test]
async fn pings_are_not_updates() {
    let url = serve_once(|mut ws| async move {
        ws.send(WsMessage::Binary(vec![7])).await.unwrap();
        ws.send(WsMessage::Ping(vec![1, 2])).await.unwrap();
        hold(ws).await;
    })
    .await;

    let report = ProbeSession::new(url, SHORT_IDLE)
        .run(&output(), core::future::pending())
        .await
        .unwrap();

    assert!(report.updates.is_empty(), "ping counted as update");
    assert_eq!(report.end, EndReason::IdleTimeout);
}

#[tokio::test]
async fn server_close_ends_the_loop() {
    let url = serve_once(|mut ws| async move {
        ws.send(WsMessage::Binary(vec![0; 4])).await.unwrap();
        ws.send(WsMessage::Binary(vec![0; 8])).await.unwrap();
        ws.close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: Cow::Borrowed("bye"),
        }))
        .await
        .unwrap();
        hold(ws).await;
    })
    .await;

    let report = ProbeSession::new(url, Duration::from_secs(30))
        .run(&output(), core::future::pending())
        .await
        .unwrap();

    assert_eq!(report.initial_len, Some(4));
    assert_eq!(report.updates, [8]);
    assert_eq!(
        report.end,
        EndReason::ServerClosed {
            code: Some(1000),
            message: "bye".to_owned()
        }
    );
}

#[tokio::test]
async fn server_close_is_acknowledged() {
    let (reply_tx, reply_rx) = oneshot::channel();

    let url = serve_once(|mut ws| async move {
        ws.send(WsMessage::Binary(vec![0; 4])).await.unwrap();
        ws.close(None).await.unwrap();
        let next = ws.next().await;
        let _ = reply_tx.send(matches!(next, Some(Ok(WsMessage::Close(_)))));
    })
    .await;

    let report = ProbeSession::new(url, Duration::from_secs(30))
        .run(&output(), core::future::pending())
        .await
        .unwrap();

    assert_eq!(
        report.end,
        EndReason::ServerClosed {
            code: None,
            message: String::new()
        }
    );
    assert!(reply_rx.await.unwrap(), "server did not receive a close reply");
}

#[test]
fn end_reason_serialises_with_its_tag() {
    let closed = EndReason::ServerClosed {
        code: Some(4000),
        message: "done".to_owned(),
    };

    assert_eq!(
        serde_json::to_value(&closed).unwrap(),
        serde_json::json!({ "reason": "server_closed", "code": 4000, "message": "done" })
    );
    assert_eq!(
        serde_json::to_value(&EndReason::Interrupted).unwrap(),
        serde_json::json!({ "reason": "interrupted" })
    );
}

#[tokio::test]
async fn close_before_initial_state_is_an_error() {
    let (reply_tx, reply_rx) = oneshot::channel();

    let url = serve_once(|mut ws| async move {
        ws.close(None).await.unwrap();
        let next = ws.next().await;
        let _ = reply_tx.send(matches!(next, Some(Ok(WsMessage::Close(_)))));
    })
    .await;

    let result = ProbeSession::new(url, SHORT_IDLE)
        .run(&output(), core::future::pending())
        .await;

    assert!(
        matches!(result, Err(ProbeError::ClosedBeforeInitialState)),
        "{result:?}"
    );
    assert!(reply_rx.await.unwrap(), "server did not receive a close reply");
}

#[tokio::test]
async fn nothing_listening_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("ws://{addr}")).unwrap();
    let result = ProbeSession::new(url.clone(), SHORT_IDLE)
        .run(&output(), core::future::pending())
        .await;

    match result {
        Err(ProbeError::Connect { endpoint, .. }) => assert_eq!(endpoint, url),
        other => panic!("expected a connect error, got {other:?}"),
    }
}

#[tokio::test]
async fn interrupt_while_idle_closes_the_connection() {
    let (closed_tx, closed_rx) = oneshot::channel();

    let url = serve_once(|mut ws| async move {
        ws.send(WsMessage::Binary(vec![0; 2])).await.unwrap();
        let next = ws.next().await;
        let _ = closed_tx.send(matches!(next, Some(Ok(WsMessage::Close(_)))));
    })
    .await;

    let report = ProbeSession::new(url, Duration::from_secs(30))
        .run(&output(), tokio::time::sleep(Duration::from_millis(300)))
        .await
        .unwrap();

    assert_eq!(report.initial_len, Some(2));
    assert_eq!(report.end, EndReason::Interrupted);
    assert!(closed_rx.await.unwrap(), "server did not see a close frame");
}

#[tokio::test]
async fn interrupt_before_initial_state_is_not_an_error() {
    let url = serve_once(hold).await;

    let report = ProbeSession::new(url, Duration::from_secs(30))
        .run(&output(), tokio::time::sleep(Duration::from_millis(200)))
        .await
        .unwrap();

    assert_eq!(report.initial_len, None);
    assert_eq!(report.end, EndReason::Interrupted);
}
