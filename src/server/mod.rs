// src/server/mod.rs

//! Development server: static files from the output root plus live reload.
//!
//! - [`reload`] carries stage results to connected browsers.
//! - [`inject`] adds the reload client to every HTML page served.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::middleware;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::services::ServeDir;
use tracing::info;

pub mod inject;
pub mod reload;

pub use inject::{inject_script, RELOAD_PATH, RELOAD_SCRIPT};
pub use reload::{
    BroadcastReloader, NoopReloader, ReloadEvent, ReloadSink, CSS_EVENT, RELOAD_EVENT,
};

#[derive(Clone)]
struct ServerState {
    output_root: Arc<PathBuf>,
    reloader: BroadcastReloader,
}

/// A bound, not yet serving, dev server.
#[derive(Debug)]
pub struct DevServer {
    listener: TcpListener,
    output_root: PathBuf,
    reloader: BroadcastReloader,
}

impl DevServer {
    /// Bind `host:port`. Port 0 picks a free port (see
    /// [`DevServer::local_addr`]).
    pub async fn bind(
        host: &str,
        port: u16,
        output_root: impl Into<PathBuf>,
        reloader: BroadcastReloader,
    ) -> Result<Self> {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("binding dev server to {host}:{port}"))?;
        Ok(Self {
            listener,
            output_root: output_root.into(),
            reloader,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The full router: SSE endpoint, static files, HTML injection.
    pub fn router(&self) -> Router {
        let state = ServerState {
            output_root: Arc::new(self.output_root.clone()),
            reloader: self.reloader.clone(),
        };

        Router::new()
            .route(RELOAD_PATH, get(reload_events))
            .with_state(state)
            .fallback_service(ServeDir::new(&self.output_root))
            .layer(middleware::from_fn(inject::inject_reload_script))
    }

    /// Serve until the process exits.
    pub async fn serve(self) -> Result<()> {
        let addr = self.local_addr()?;
        let app = self.router();
        info!("dev server listening on http://{addr}");
        axum::serve(self.listener, app)
            .await
            .context("dev server stopped")?;
        Ok(())
    }
}

async fn reload_events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let output_root = Arc::clone(&state.output_root);
    let stream = BroadcastStream::new(state.reloader.subscribe()).map(move |msg| {
        let (name, data) = match msg {
            Ok(event) => (event.event_name(), event.to_message(&output_root)),
            // Missed events: we no longer know what changed.
            Err(BroadcastStreamRecvError::Lagged(_)) => (RELOAD_EVENT, "*".to_string()),
        };
        Ok(Event::default().event(name).data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
