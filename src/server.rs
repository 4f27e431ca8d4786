//! HTTP server lifecycle: binds every configured listen address, accepts
//! connections, and dispatches each request straight to the Request Handler.
//! Shuts down gracefully on SIGINT or SIGTERM, letting in-flight connections
//! finish but no longer accepting new ones.

use std::convert::Infallible;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::app_state::AppState;
use crate::handler::handle_request;
use crate::types::BoxError;

/// Binds every address in `state.config.listen` and serves until `SIGINT` or
/// `SIGTERM`.
pub async fn serve(state: Arc<AppState>) -> Result<(), BoxError> {
    let mut listeners = Vec::with_capacity(state.config.listen.len());
    for addr in &state.config.listen {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "listening");
        listeners.push(listener);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut accept_tasks = Vec::with_capacity(listeners.len());
    for listener in listeners {
        let state = state.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        accept_tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        let (stream, _addr) = match accepted {
                            Ok(pair) => pair,
                            Err(err) => {
                                tracing::warn!(%err, "failed to accept connection");
                                continue;
                            }
                        };
                        spawn_connection(state.clone(), stream);
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        }));
    }

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, no longer accepting new connections");
    let _ = shutdown_tx.send(true);

    for task in accept_tasks {
        let _ = task.await;
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn spawn_connection(state: Arc<AppState>, stream: tokio::net::TcpStream) {
    let io = hyper_util::rt::TokioIo::new(stream);

    tokio::spawn(async move {
        let svc = service_fn(move |req| {
            let state = state.clone();
            async move { Ok::<_, Infallible>(handle_request(state, req).await) }
        });

        let mut http = http1::Builder::new();
        http.keep_alive(true);
        let conn = http.serve_connection(io, svc);

        if let Err(err) = conn.await {
            tracing::warn!(%err, "connection error");
        }
    });
}
