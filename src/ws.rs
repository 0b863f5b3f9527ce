//! WebSocket tunnel
//!
//! Serves the byte-identical NNTP protocol over text WebSocket frames.
//! Each accepted socket gets a duplex pipe: one side runs the ordinary
//! session loop, the other bridges frames to bytes and back. Origin is
//! not checked; the tunnel accepts any browser.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::commands::Dispatcher;
use crate::error::{Result, YansError};
use crate::server::{run_session, SessionRegistry};

const TUNNEL_BUFFER: usize = 8 * 1024;

/// Handshake a WebSocket client and run an NNTP session through it.
pub(crate) async fn serve_connection(
    stream: TcpStream,
    peer: String,
    dispatcher: Arc<Dispatcher>,
    sessions: SessionRegistry,
    shutdown: CancellationToken,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {peer} failed: {e}");
            return;
        }
    };

    let (session_side, bridge_side) = tokio::io::duplex(TUNNEL_BUFFER);
    let bridge = tokio::spawn(async move {
        if let Err(e) = bridge_frames(ws, bridge_side).await {
            debug!("WebSocket bridge closed: {e}");
        }
    });

    run_session(session_side, peer, dispatcher, sessions, shutdown).await;
    bridge.abort();
}

/// Pump frames to bytes and bytes to frames until either side closes.
async fn bridge_frames(ws: WebSocketStream<TcpStream>, inner: DuplexStream) -> Result<()> {
    let (mut sink, mut frames) = ws.split();
    let (mut reader, mut writer) = tokio::io::split(inner);

    let inbound = async move {
        while let Some(frame) = frames.next().await {
            match frame? {
                Message::Text(text) => writer.write_all(text.as_bytes()).await?,
                Message::Binary(data) => writer.write_all(&data).await?,
                Message::Close(_) => break,
                _ => {}
            }
        }
        writer.shutdown().await?;
        Ok::<(), YansError>(())
    };

    let outbound = async move {
        let mut buffer = [0u8; TUNNEL_BUFFER];
        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            let text = String::from_utf8_lossy(&buffer[..n]).into_owned();
            sink.send(Message::Text(text)).await?;
        }
        Ok::<(), YansError>(())
    };

    tokio::select! {
        result = inbound => result,
        result = outbound => result,
    }
}
