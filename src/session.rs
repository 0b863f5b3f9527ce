//! Per-connection session state and command loop
//!
//! A session owns its codec and runs read-dispatch-write until the client
//! quits, the connection drops, or the server shuts down. Sessions share
//! nothing but the storage backend and the server's session registry.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::article::{Article, Group};
use crate::capabilities::Capabilities;
use crate::codec::NntpConnection;
use crate::commands::{Dispatcher, Flow};
use crate::error::{Result, YansError};
use crate::response::{codes, NntpResponse};

/// Greeting sent on accept. Posting is gated per session, so the greeting
/// always advertises the restrictive default.
pub const GREETING: &str = "201 YANS NNTP Service Ready, posting prohibited";

/// Access posture of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Initial mode: transit commands, MODE-READER advertised
    Transit,
    /// After MODE READER: reader commands advertised
    Reader,
}

/// One client connection's state.
pub struct Session<S> {
    /// Unique session id, the key into the server's session registry
    pub id: Uuid,
    /// Remote address, for logging
    pub peer: String,
    /// Wire codec over the underlying stream
    pub conn: NntpConnection<S>,
    /// Advertised capabilities; rewritten by MODE READER
    pub capabilities: Capabilities,
    /// Current access posture
    pub mode: SessionMode,
    /// Group selected by GROUP/LISTGROUP, if any
    pub current_group: Option<Group>,
    /// Article the session is positioned on, if any
    pub current_article: Option<Article>,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Session<S> {
    /// Wrap an accepted stream into a fresh transit-mode session.
    pub fn new(stream: S, peer: String, capabilities: Capabilities) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            conn: NntpConnection::new(stream),
            capabilities,
            mode: SessionMode::Transit,
            current_group: None,
            current_article: None,
        }
    }

    /// Write a single-line status reply.
    pub async fn reply(&mut self, code: u16, message: impl Into<String>) -> Result<()> {
        self.conn
            .write_response(&NntpResponse::new(code, message))
            .await
    }

    /// Drive the session to completion.
    pub async fn serve(mut self, dispatcher: Arc<Dispatcher>, shutdown: CancellationToken) {
        if self.conn.write_line(GREETING).await.is_err() {
            return;
        }

        loop {
            let read = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!(session = %self.id, "session cancelled by shutdown");
                    break;
                }
                read = self.conn.read_command() => read,
            };

            let (request_id, line) = match read {
                Ok(command) => command,
                Err(YansError::ConnectionClosed) => {
                    info!("Client {} has disconnected", self.peer);
                    break;
                }
                Err(YansError::IdleTimeout) => {
                    info!("Client {} idle too long, dropping connection", self.peer);
                    break;
                }
                Err(e) => {
                    warn!("Read error from {}: {e}", self.peer);
                    break;
                }
            };

            if line.is_empty() {
                continue;
            }

            match dispatcher.dispatch(&mut self, &line, request_id).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => {
                    error!("Session {} command failed: {e}", self.id);
                    let fault = NntpResponse::new(
                        codes::INTERNAL_FAULT,
                        format!("Failed to process command: {e}"),
                    );
                    let _ = self.conn.write_response(&fault).await;
                    break;
                }
            }
        }

        let _ = self.conn.close().await;
    }
}
