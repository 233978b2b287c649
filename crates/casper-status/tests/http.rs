//! Status server over a real socket.

use std::sync::Arc;
use std::time::{Duration, Instant};

use casper_session::{PairingChallenge, SessionHandle, SessionSnapshot, SessionState};
use casper_status::{StatusState, bind, serve};
use serde_json::{Value, json};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

struct Server {
    base: String,
    snapshots: watch::Sender<Arc<SessionSnapshot>>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<casper_status::StatusResult<()>>,
}

impl Server {
    async fn start(initial: SessionSnapshot) -> Self {
        let (snapshots, rx) = watch::channel(Arc::new(initial));
        let started_at = Instant::now()
            .checked_sub(Duration::from_secs(90))
            .unwrap_or_else(Instant::now);
        let state = StatusState::new(SessionHandle::new(rx), started_at, "Casper2");

        let listener = bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(serve(listener, state, async move {
            let _ = stopped.await;
        }));

        Self {
            base,
            snapshots,
            stop: Some(stop),
            task,
        }
    }

    async fn json(&self) -> Value {
        reqwest::get(format!("{}/status", self.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn page(&self) -> String {
        let response = reqwest::get(&self.base).await.unwrap();
        assert!(response.status().is_success());
        let content_type = response.headers()["content-type"].to_str().unwrap().to_owned();
        assert!(content_type.starts_with("text/html"), "{content_type}");
        response.text().await.unwrap()
    }

    async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}

fn pairing(payload: &str) -> SessionSnapshot {
    SessionSnapshot {
        state: SessionState::AwaitingPairing,
        challenge: Some(PairingChallenge::new(payload)),
        ..SessionSnapshot::default()
    }
}

fn online() -> SessionSnapshot {
    SessionSnapshot {
        state: SessionState::Online,
        credentials_valid: true,
        ..SessionSnapshot::default()
    }
}

#[tokio::test]
async fn pairing_status_exposes_qr_payload() {
    let server = Server::start(pairing("2@ABC")).await;

    let body = server.json().await;
    assert_eq!(body["connected"], json!(false));
    assert_eq!(body["qrPayload"], json!("2@ABC"));
    assert_eq!(body["state"], json!("awaiting_pairing"));
    assert_eq!(body["reconnectAttempts"], json!(0));
    assert!(body["uptimeSeconds"].as_u64().unwrap() >= 90);

    let html = server.page().await;
    assert!(html.contains("<svg"));
    assert!(html.contains("2@ABC"));

    server.stop().await;
}

#[tokio::test]
async fn online_status_has_no_payload() {
    let server = Server::start(online()).await;

    let body = server.json().await;
    assert_eq!(body["connected"], json!(true));
    assert_eq!(body["qrPayload"], Value::Null);
    assert_eq!(body["state"], json!("online"));

    let html = server.page().await;
    assert!(html.contains("Connected"));
    assert!(!html.contains("<svg"));

    server.stop().await;
}

#[tokio::test]
async fn follows_session_changes() {
    let server = Server::start(pairing("2@first")).await;
    assert_eq!(server.json().await["qrPayload"], json!("2@first"));

    server.snapshots.send_replace(Arc::new(pairing("2@second")));
    assert_eq!(server.json().await["qrPayload"], json!("2@second"));

    server.snapshots.send_replace(Arc::new(online()));
    assert_eq!(server.json().await["connected"], json!(true));

    server.stop().await;
}

#[tokio::test]
async fn payload_is_escaped_in_page() {
    let server = Server::start(pairing("<script>alert(1)</script>")).await;

    let html = server.page().await;
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));

    server.stop().await;
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let server = Server::start(SessionSnapshot::default()).await;

    let response = reqwest::get(format!("{}/pair", server.base)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn bind_reports_address_in_use() {
    let taken = bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    let err = bind(&addr).await.unwrap_err();
    assert!(err.to_string().contains(&addr));
}
