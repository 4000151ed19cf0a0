//! Notification channel against a loopback WebSocket server.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use taskwire::config::Origin;
use taskwire::rest::HttpCollaborator;
use taskwire::token::SessionToken;
use taskwire::transport::TungsteniteConnector;
use taskwire::{Collection, ConnectionManager, ConnectionState, Screen, ViewSubscriber};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Accept one socket, send `frames`, then close with `close`.
/// Resolves the request URI the client connected with.
async fn spawn_socket_server(
    frames: Vec<String>,
    close: Option<CloseFrame>,
) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (uri_tx, uri_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let _ = uri_tx.send(req.uri().to_string());
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .unwrap();
        for frame in frames {
            ws.send(Message::text(frame)).await.unwrap();
        }
        let _ = ws.close(close).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    (addr, uri_rx)
}

fn origin(addr: SocketAddr) -> Origin {
    Origin::parse(&format!("http://{addr}")).unwrap()
}

#[tokio::test]
async fn delivers_frames_in_order_and_records_close_reason() {
    let frames = vec![
        json!({"type": "task_notification", "message": "first"}).to_string(),
        json!({"type": "ping"}).to_string(),
        json!({"type": "task_notification", "message": "third"}).to_string(),
    ];
    let close = CloseFrame {
        code: CloseCode::Away,
        reason: "server restart".into(),
    };
    let (addr, uri_rx) = spawn_socket_server(frames.clone(), Some(close)).await;

    let mut conn = ConnectionManager::new(TungsteniteConnector, origin(addr));
    conn.open(Some(&SessionToken::new("abc"))).unwrap();
    assert_eq!(conn.state(), ConnectionState::Connecting);

    for expected in &frames {
        assert_eq!(conn.recv().await.as_ref(), Some(expected));
        assert_eq!(conn.state(), ConnectionState::Open);
    }
    assert_eq!(conn.recv().await, None);
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(conn.last_error(), Some("1001 server restart"));

    assert_eq!(uri_rx.await.unwrap(), "/ws/tasks/?token=abc");
}

#[tokio::test]
async fn refused_connection_ends_closed_with_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut conn = ConnectionManager::new(TungsteniteConnector, origin(addr));
    conn.open(Some(&SessionToken::new("abc"))).unwrap();

    assert_eq!(conn.recv().await, None);
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(conn.last_error().is_some());
}

#[tokio::test]
async fn close_during_handshake_delivers_nothing() {
    let (addr, _uri_rx) = spawn_socket_server(
        vec![json!({"type": "task_notification", "message": "late"}).to_string()],
        None,
    )
    .await;

    let mut conn = ConnectionManager::new(TungsteniteConnector, origin(addr));
    conn.open(Some(&SessionToken::new("abc"))).unwrap();
    conn.close();

    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(conn.recv().await, None);
}

/// Tasks view against a REST stub that serves a newer list on re-fetch.
mod end_to_end {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::Value;

    use super::*;

    async fn tasks(State(calls): State<Arc<AtomicUsize>>) -> Json<Value> {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            Json(json!([
                {"id": 42, "title": "Write report", "status": "in_progress"},
                {"id": 43, "title": "Review", "status": "todo"}
            ]))
        } else {
            Json(json!([
                {"id": 42, "title": "Write report", "status": "completed"},
                {"id": 43, "title": "Review", "status": "todo"},
                {"id": 44, "title": "Plan sprint", "status": "todo"}
            ]))
        }
    }

    async fn projects() -> Json<Value> {
        Json(json!({"results": [{"id": 1, "title": "Launch", "status": "active"}]}))
    }

    async fn spawn_rest() -> (SocketAddr, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/api/tasks/", get(tasks))
            .route("/api/projects/", get(projects))
            .with_state(calls.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, calls)
    }

    #[tokio::test]
    async fn tasks_view_follows_pushes() {
        let (rest_addr, task_calls) = spawn_rest().await;
        let frames = vec![
            json!({
                "type": "task_status_update",
                "task_id": 42,
                "status": "completed",
                "task_data": {"title": "Write report"}
            })
            .to_string(),
            "{broken".to_string(),
            json!({"type": "ping"}).to_string(),
            json!({
                "type": "task_notification",
                "message": "Task 'Plan sprint' was created",
                "task_id": 44,
                "action": "created"
            })
            .to_string(),
        ];
        let (ws_addr, _uri_rx) = spawn_socket_server(frames, None).await;

        let token = SessionToken::new("tok");
        let rest = HttpCollaborator::new(origin(rest_addr), Some(token.clone())).unwrap();
        let mut view = ViewSubscriber::mount(
            Screen::Tasks,
            TungsteniteConnector,
            origin(ws_addr),
            rest,
            Some(token),
        )
        .await;
        assert_eq!(view.state().tasks.len(), 2);
        assert_eq!(view.state().projects.len(), 1);
        assert_eq!(task_calls.load(Ordering::SeqCst), 1);

        assert!(view.next_frame().await);
        assert_eq!(view.state().tasks.get(42).unwrap().status, "completed");
        assert_eq!(task_calls.load(Ordering::SeqCst), 1);

        while view.next_frame().await {}

        assert_eq!(task_calls.load(Ordering::SeqCst), 2);
        assert_eq!(view.state().tasks.len(), 3);
        assert!(view.state().tasks.get(44).is_some());
        assert_eq!(view.connection_state(), ConnectionState::Closed);

        let notices: Vec<String> = view.notices().map(|n| n.text.clone()).collect();
        assert_eq!(notices.len(), 2);
        assert!(notices[0].contains("Write report"));
        assert_eq!(notices[1], "Task 'Plan sprint' was created");

        view.unmount();
        assert!(Screen::Tasks.primary().contains(&Collection::Tasks));
    }
}
