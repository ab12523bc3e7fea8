//! Listener ownership and bounded graceful shutdown.
//!
//! # Design
//! The lifecycle is `Starting -> Listening -> ShuttingDown -> Stopped` and is
//! published on a `watch` channel. The accept loop runs on its own task with a
//! [`CancellationToken`] as its shutdown trigger; the caller's shutdown future
//! (normally [`shutdown_signal`]) only cancels that token. After cancelling,
//! in-flight requests get `shutdown_timeout` to finish. Missing that deadline
//! is reported as [`ServerError::ShutdownTimeout`] and the server task is
//! aborted, dropping whatever connections remain.
//!
//! Each accepted connection is served by hyper's HTTP/1 connection with a
//! header read timeout, so a client that stalls mid-headers or sits idle on a
//! keep-alive connection is disconnected.

use std::future::Future;
use std::io;
use std::time::Duration;

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    server::graceful::GracefulShutdown,
    service::TowerToHyperService,
};
use tokio::{net::TcpListener, sync::watch, task::JoinError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ServerError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Starting,
    Listening,
    ShuttingDown,
    Stopped,
}

const DEFAULT_HEADER_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct Server {
    lifecycle: watch::Sender<Lifecycle>,
    shutdown_timeout: Duration,
    header_read_timeout: Duration,
}

impl Server {
    pub fn new(shutdown_timeout: Duration) -> Self {
        let (lifecycle, _) = watch::channel(Lifecycle::Starting);
        Self {
            lifecycle,
            shutdown_timeout,
            header_read_timeout: DEFAULT_HEADER_READ_TIMEOUT,
        }
    }

    /// Close connections that take longer than `timeout` to deliver a
    /// request's headers, counted from the end of the previous response.
    pub fn with_header_read_timeout(mut self, timeout: Duration) -> Self {
        self.header_read_timeout = timeout;
        self
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Lifecycle> {
        self.lifecycle.subscribe()
    }

    /// Serve `app` on `listener` until `shutdown` resolves, then drain.
    ///
    /// Returns early with [`ServerError::Serve`] if the server stops on its
    /// own before `shutdown` fires.
    pub async fn serve(
        &self,
        listener: TcpListener,
        app: Router,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<(), ServerError> {
        let token = CancellationToken::new();
        let mut server = tokio::spawn(accept_loop(
            listener,
            app,
            token.clone(),
            self.header_read_timeout,
        ));
        self.transition(Lifecycle::Listening);

        tokio::select! {
            _ = shutdown => {}
            joined = &mut server => {
                warn!("http server exited before shutdown was requested");
                self.transition(Lifecycle::Stopped);
                return flatten(joined);
            }
        }

        self.transition(Lifecycle::ShuttingDown);
        token.cancel();

        match tokio::time::timeout(self.shutdown_timeout, &mut server).await {
            Ok(joined) => {
                self.transition(Lifecycle::Stopped);
                flatten(joined)
            }
            Err(_) => {
                server.abort();
                self.transition(Lifecycle::Stopped);
                Err(ServerError::ShutdownTimeout(self.shutdown_timeout))
            }
        }
    }

    fn transition(&self, next: Lifecycle) {
        let prev = self.lifecycle.send_replace(next);
        info!(from = ?prev, to = ?next, "server lifecycle");
    }
}

/// Accept and serve connections until `drain` is cancelled, then wait for the
/// open ones to finish their current request.
async fn accept_loop(
    listener: TcpListener,
    app: Router,
    drain: CancellationToken,
    header_read_timeout: Duration,
) {
    let mut http = http1::Builder::new();
    http.timer(TokioTimer::new())
        .header_read_timeout(header_read_timeout);
    let graceful = GracefulShutdown::new();

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = drain.cancelled() => break,
        };
        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        let service = TowerToHyperService::new(app.clone());
        let conn = graceful.watch(http.serve_connection(TokioIo::new(stream), service));
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(%peer, error = %e, "connection closed with error");
            }
        });
    }

    drop(listener);
    graceful.shutdown().await;
}

fn flatten(joined: Result<(), JoinError>) -> Result<(), ServerError> {
    joined.map_err(|e| ServerError::Serve(io::Error::other(e)))
}

/// Resolves when SIGINT (Ctrl-C) or, on unix, SIGTERM arrives.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
