//! Process lifecycle: bind, serve, drain on a termination signal, stop.

use axum::{extract::ConnectInfo, extract::Request, Router};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower::ServiceExt;
use tracing::{debug, error, info, warn};

use crate::background::BackgroundTasks;
use crate::middleware::ClientRateLimiter;
use crate::state::AppState;

/// `Starting → Running → Draining → Stopped`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] std::io::Error),

    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),
}

pub struct Server {
    state: Arc<watch::Sender<LifecycleState>>,
    limiter: ClientRateLimiter,
    background: BackgroundTasks,
    grace: Duration,
}

impl Server {
    pub fn new(app: &AppState) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            state: Arc::new(state),
            limiter: app.limiter.clone(),
            background: app.background.clone(),
            grace: app.config.shutdown_grace_period(),
        }
    }

    /// How long in-flight requests may run once draining starts.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Observe lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
        TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
    }

    /// Bind `addr` and serve `router` until SIGINT or SIGTERM.
    pub async fn serve(self, addr: &str, router: Router) -> Result<(), ServerError> {
        let listener = Self::bind(addr).await?;
        self.run(listener, router, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves, then drain.
    ///
    /// Each connection runs on its own task. On shutdown the listener is
    /// dropped and every connection is asked to close after its current
    /// request. Connections still open when the grace period ends are
    /// aborted, which drops their in-flight handlers. Background jobs are
    /// always waited for. Returns once the state is `Stopped`.
    pub async fn run<F>(self, listener: TcpListener, router: Router, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        let sweeper = self.limiter.enabled().then(|| self.limiter.spawn_sweeper());
        let mut connections = JoinSet::new();

        self.state.send_replace(LifecycleState::Running);
        info!(%addr, "server listening");

        tokio::pin!(shutdown);
        let outcome = loop {
            tokio::select! {
                () = &mut shutdown => break Ok(()),
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let draining = self.state.subscribe();
                        connections.spawn(serve_connection(stream, remote, router.clone(), draining));
                    }
                    Err(err) => break Err(ServerError::Accept(err)),
                },
                // reap finished connections so the set doesn't grow unbounded
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        };

        drop(listener);
        self.state.send_replace(LifecycleState::Draining);
        match &outcome {
            Ok(()) => info!(connections = connections.len(), "shutdown started, no longer accepting connections"),
            Err(err) => error!(error = %err, "server stopped unexpectedly"),
        }

        if tokio::time::timeout(self.grace, drain(&mut connections)).await.is_err() {
            warn!(
                grace_secs = self.grace.as_secs_f64(),
                abandoned = connections.len(),
                "grace period elapsed, abandoning in-flight requests"
            );
            connections.abort_all();
            drain(&mut connections).await;
        }

        let pending = self.background.active();
        if pending > 0 {
            info!(pending, "waiting for background tasks");
        }
        self.background.close().await;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        self.state.send_replace(LifecycleState::Stopped);
        info!(%addr, "server stopped");

        outcome
    }
}

/// Serve one HTTP/1 connection, closing it gracefully once draining starts.
///
/// The handler future runs inside this task, so aborting the task abandons
/// the request.
async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    router: Router,
    draining: watch::Receiver<LifecycleState>,
) {
    let service = router.map_request(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(remote));
        request
    });
    let connection = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), TowerToHyperService::new(service))
        .with_upgrades();
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        () = draining_started(draining) => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };
    if let Err(err) = result {
        debug!(%remote, error = %err, "connection closed with error");
    }
}

async fn draining_started(mut state: watch::Receiver<LifecycleState>) {
    if state.wait_for(|s| *s != LifecycleState::Running).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn drain(connections: &mut JoinSet<()>) {
    while connections.join_next().await.is_some() {}
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(signal = "SIGINT", "caught signal"),
        () = terminate => info!(signal = "SIGTERM", "caught signal"),
    }
}
