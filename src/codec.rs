//! Low-level NNTP wire codec
//!
//! Line-oriented CRLF framing over any async byte stream, with RFC 3977
//! dot-stuffing for multiline blocks in both directions. Each command read
//! is tagged with a monotonically increasing request id; the session runs
//! one command at a time, so replies leave in request order by
//! construction, and the id ties log lines to their command.

use std::borrow::Cow;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tracing::trace;

use crate::error::{Result, YansError};
use crate::response::NntpResponse;

/// How long a connection may sit idle between commands before it is
/// reclaimed.
pub const IDLE_READ_TIMEOUT: Duration = Duration::from_secs(600);

/// Per-line timeout while a client is streaming a multiline payload.
const PAYLOAD_LINE_TIMEOUT: Duration = Duration::from_secs(180);

const CRLF: &[u8] = b"\r\n";
const TERMINATOR: &str = ".";

/// Dot-stuff one outbound line (RFC 3977 Section 3.1.1).
fn stuff_line(line: &str) -> Cow<'_, str> {
    if line.starts_with('.') {
        Cow::Owned(format!(".{line}"))
    } else {
        Cow::Borrowed(line)
    }
}

/// Strip dot-stuffing from one inbound line (leading ".." becomes ".").
fn unstuff_line(line: &str) -> &str {
    if line.starts_with("..") {
        &line[1..]
    } else {
        line
    }
}

/// One NNTP connection: buffered reader plus writer over a single stream.
#[derive(Debug)]
pub struct NntpConnection<S> {
    stream: BufReader<S>,
    request_counter: u64,
}

impl<S: AsyncRead + AsyncWrite + Unpin> NntpConnection<S> {
    /// Wrap a freshly accepted stream
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            request_counter: 0,
        }
    }

    /// Read the next command line, tagged with its request id.
    ///
    /// Applies the idle timeout; an expired timer means the client is
    /// gone for our purposes.
    pub async fn read_command(&mut self) -> Result<(u64, String)> {
        let line = match timeout(IDLE_READ_TIMEOUT, self.read_raw_line()).await {
            Ok(result) => result?,
            Err(_) => return Err(YansError::IdleTimeout),
        };
        self.request_counter += 1;
        Ok((self.request_counter, line))
    }

    /// Read one CRLF-terminated line with the terminator stripped.
    async fn read_raw_line(&mut self) -> Result<String> {
        let mut line_bytes = Vec::with_capacity(512);
        self.stream.read_until(b'\n', &mut line_bytes).await?;

        if line_bytes.is_empty() {
            return Err(YansError::ConnectionClosed);
        }

        let line = String::from_utf8_lossy(&line_bytes);
        let line = line.trim_end_matches(['\r', '\n']);
        trace!("C: {}", line);
        Ok(line.to_string())
    }

    /// Read a dot-terminated multiline payload (POST/IHAVE body).
    ///
    /// Returns the unstuffed octets with CRLF line endings; the
    /// terminating `.` line is consumed and not included.
    pub async fn read_multiline(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(4096);
        loop {
            let line = match timeout(PAYLOAD_LINE_TIMEOUT, self.read_raw_line()).await {
                Ok(result) => result?,
                Err(_) => return Err(YansError::IdleTimeout),
            };
            if line == TERMINATOR {
                break;
            }
            data.extend_from_slice(unstuff_line(&line).as_bytes());
            data.extend_from_slice(CRLF);
        }
        Ok(data)
    }

    /// Write one line plus CRLF and flush.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        trace!("S: {}", line);
        let writer = self.stream.get_mut();
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(CRLF).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Write a single-line status reply.
    pub async fn write_response(&mut self, response: &NntpResponse) -> Result<()> {
        self.write_line(&response.to_string()).await
    }

    /// Write a status line followed by a dot-stuffed block of lines.
    pub async fn write_data_lines<I, T>(&mut self, status: &NntpResponse, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut out = String::with_capacity(1024);
        out.push_str(&status.to_string());
        out.push_str("\r\n");
        for line in lines {
            out.push_str(&stuff_line(line.as_ref()));
            out.push_str("\r\n");
        }
        out.push_str(TERMINATOR);
        trace!("S: {} [multiline]", status);

        let writer = self.stream.get_mut();
        writer.write_all(out.as_bytes()).await?;
        writer.write_all(CRLF).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Write a status line followed by raw octets as a dot-stuffed block.
    pub async fn write_data_block(&mut self, status: &NntpResponse, block: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(block);
        self.write_data_lines(status, text.lines()).await
    }

    /// Half-close the stream towards the client.
    pub async fn close(&mut self) -> Result<()> {
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }

    /// Number of commands read so far on this connection.
    pub fn requests_read(&self) -> u64 {
        self.request_counter
    }
}
