#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tower::ServiceExt;

use reel_api_rust::config::AppConfig;
use reel_api_rust::database::models::{NewUser, Scope, User};
use reel_api_rust::database::Stores;
use reel_api_rust::mailer::{Mailer, MailerError, Message};
use reel_api_rust::routes;
use reel_api_rust::server::{LifecycleState, Server, ServerError};
use reel_api_rust::state::AppState;

pub const CLIENT: ([u8; 4], u16) = ([203, 0, 113, 7], 51000);

/// Development preset with a cheap bcrypt cost and the limiter out of the way.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.security.bcrypt_cost = 4;
    config.limiter.enabled = false;
    config.mailer.initial_backoff_ms = 1;
    config
}

/// Captures outbound mail instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Message>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &Message) -> Result<(), MailerError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(config, Stores::memory())
            .expect("test config is valid")
            .with_mailer(mailer.clone());
        Self { state, mailer }
    }

    /// The full router as a client at [`CLIENT`] would see it.
    pub fn router(&self) -> Router {
        routes::app(self.state.clone()).layer(MockConnectInfo(SocketAddr::from(CLIENT)))
    }

    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        send(self.router(), request).await
    }

    /// Insert a user directly and return it with a live authentication token.
    pub async fn user_with_token(&self, email: &str, activated: bool, permissions: &[&str]) -> (User, String) {
        let password_hash = self.state.hasher.hash("pa55word").unwrap();
        let user = self
            .state
            .stores
            .users
            .insert(NewUser {
                name: "Test User".to_string(),
                email: email.to_string(),
                password_hash,
                activated,
            })
            .await
            .unwrap();
        if !permissions.is_empty() {
            self.state.stores.permissions.add_for_user(user.id, permissions).await.unwrap();
        }
        let token = self
            .state
            .tokens
            .issue(user.id, chrono::Duration::hours(1), Scope::Authentication)
            .await
            .unwrap();
        (user, token.plaintext)
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    TestResponse { status, headers, body }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn get_authed(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn json(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// A real server on a free local port, stopped through `shutdown`.
pub struct TestServer {
    pub base_url: String,
    pub lifecycle: watch::Receiver<LifecycleState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub async fn start(state: AppState, router: Router) -> Result<Self> {
        let grace = state.config.shutdown_grace_period();
        Self::start_with_grace(state, router, grace).await
    }

    pub async fn start_with_grace(state: AppState, router: Router, grace: Duration) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let addr = format!("127.0.0.1:{port}");
        let listener = Server::bind(&addr).await?;

        let server = Server::new(&state).with_grace_period(grace);
        let lifecycle = server.subscribe();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run(listener, router, async {
            let _ = rx.await;
        }));

        let mut started = Self {
            base_url: format!("http://{addr}"),
            lifecycle,
            shutdown: Some(tx),
            handle,
        };
        started
            .wait_for(LifecycleState::Running, Duration::from_secs(5))
            .await?;
        Ok(started)
    }

    pub fn addr(&self) -> &str {
        self.base_url.trim_start_matches("http://")
    }

    pub fn begin_shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    pub async fn wait_for(&mut self, target: LifecycleState, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.lifecycle.wait_for(|state| *state == target))
            .await
            .with_context(|| format!("server did not reach {target:?} within {timeout:?}"))?
            .context("lifecycle channel closed")?;
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) -> Result<(), ServerError> {
        self.handle.await.expect("server task panicked")
    }
}
