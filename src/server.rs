//! Listener and accept loop
//!
//! Binds the TCP (and optionally WebSocket) listeners, spawns one task per
//! connection, and tracks live sessions in a mutex-guarded registry. A
//! single cancellation token stops accepting and tears sessions down at
//! their next suspension point; there is no graceful drain.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::capabilities::Capabilities;
use crate::commands::Dispatcher;
use crate::config::Config;
use crate::error::Result;
use crate::session::Session;
use crate::storage::StorageBackend;
use crate::ws;
use crate::{SERVER_NAME, SERVER_VERSION};

/// Live sessions keyed by session id; values are peer addresses.
pub(crate) type SessionRegistry = Arc<Mutex<HashMap<Uuid, String>>>;

/// The YANS server: listeners, dispatcher, and session registry.
pub struct NntpServer {
    config: Config,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
    sessions: SessionRegistry,
    ws_local_addr: Option<SocketAddr>,
}

impl NntpServer {
    /// Assemble a server over a backend; call [`start`](Self::start) to bind.
    pub fn new(config: Config, backend: Arc<dyn StorageBackend>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            backend,
            config.domain.clone(),
            config.upload_path.clone(),
        ));
        Self {
            config,
            dispatcher,
            shutdown: CancellationToken::new(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ws_local_addr: None,
        }
    }

    /// Bind the listeners and spawn the accept loops. Returns the bound
    /// NNTP address (useful with port 0).
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(self.config.listen_addr()).await?;
        let local_addr = listener.local_addr()?;
        info!("NNTP listener on {local_addr}");
        tokio::spawn(accept_loop(
            listener,
            self.dispatcher.clone(),
            self.sessions.clone(),
            self.shutdown.clone(),
        ));

        if let Some(ws_addr) = self.config.ws_listen_addr() {
            let ws_listener = TcpListener::bind(&ws_addr).await?;
            let ws_local = ws_listener.local_addr()?;
            info!("WebSocket listener on {ws_local}");
            self.ws_local_addr = Some(ws_local);
            tokio::spawn(ws_accept_loop(
                ws_listener,
                self.dispatcher.clone(),
                self.sessions.clone(),
                self.shutdown.clone(),
            ));
        }

        Ok(local_addr)
    }

    /// Signal shutdown: stop accepting, cancel live sessions.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Token observed by every accept loop and session.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Bound WebSocket address, once started with `ws_port` set.
    pub fn ws_local_addr(&self) -> Option<SocketAddr> {
        self.ws_local_addr
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("session registry lock").len()
    }
}

async fn accept_loop(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    sessions: SessionRegistry,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, peer)) => {
                info!("Client {peer} has connected");
                tokio::spawn(run_session(
                    stream,
                    peer.to_string(),
                    dispatcher.clone(),
                    sessions.clone(),
                    shutdown.clone(),
                ));
            }
            Err(e) => warn!("Accept failed: {e}"),
        }
    }
}

async fn ws_accept_loop(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    sessions: SessionRegistry,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, peer)) => {
                info!("WebSocket client {peer} has connected");
                tokio::spawn(ws::serve_connection(
                    stream,
                    peer.to_string(),
                    dispatcher.clone(),
                    sessions.clone(),
                    shutdown.clone(),
                ));
            }
            Err(e) => warn!("WebSocket accept failed: {e}"),
        }
    }
}

/// Register, serve, and deregister one session over any byte stream.
pub(crate) async fn run_session<S>(
    stream: S,
    peer: String,
    dispatcher: Arc<Dispatcher>,
    sessions: SessionRegistry,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let session = Session::new(
        stream,
        peer,
        Capabilities::transit(SERVER_NAME, SERVER_VERSION),
    );
    let id = session.id;
    sessions
        .lock()
        .expect("session registry lock")
        .insert(id, session.peer.clone());

    session.serve(dispatcher, shutdown).await;

    sessions
        .lock()
        .expect("session registry lock")
        .remove(&id);
}
