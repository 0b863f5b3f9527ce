//! Shared harness: ephemeral server + line-oriented test client

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use yans::{BackendType, Config, NntpServer, SqliteBackend, SqliteConfig};

pub struct TestServer {
    pub server: NntpServer,
    pub backend: SqliteBackend,
    pub addr: SocketAddr,
    // Held so the attachment directory outlives the test
    #[allow(dead_code)]
    pub upload_dir: tempfile::TempDir,
}

/// Boot a server on 127.0.0.1:0 with a fresh in-memory backend.
pub async fn start_server() -> TestServer {
    let backend = SqliteBackend::in_memory().await.expect("backend");
    let upload_dir = tempfile::tempdir().expect("upload dir");
    let config = Config {
        address: "127.0.0.1".to_string(),
        port: 0,
        ws_port: None,
        backend_type: BackendType::Sqlite,
        domain: "test.example.org".to_string(),
        upload_path: upload_dir.path().to_path_buf(),
        sqlite: SqliteConfig::default(),
    };
    let mut server = NntpServer::new(config, Arc::new(backend.clone()));
    let addr = server.start().await.expect("server start");
    TestServer {
        server,
        backend,
        addr,
        upload_dir,
    }
}

/// Boot a server with the WebSocket tunnel enabled on an ephemeral port.
pub async fn start_server_with_ws() -> TestServer {
    let backend = SqliteBackend::in_memory().await.expect("backend");
    let upload_dir = tempfile::tempdir().expect("upload dir");
    let config = Config {
        address: "127.0.0.1".to_string(),
        port: 0,
        ws_port: Some(0),
        backend_type: BackendType::Sqlite,
        domain: "test.example.org".to_string(),
        upload_path: upload_dir.path().to_path_buf(),
        sqlite: SqliteConfig::default(),
    };
    let mut server = NntpServer::new(config, Arc::new(backend.clone()));
    let addr = server.start().await.expect("server start");
    TestServer {
        server,
        backend,
        addr,
        upload_dir,
    }
}

/// Boot a server that already carries `misc.test`.
pub async fn start_server_with_group() -> TestServer {
    let fixture = start_server().await;
    fixture
        .backend
        .create_group("misc.test", None)
        .await
        .expect("create group");
    fixture
}

pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    pub greeting: String,
}

impl TestClient {
    /// Connect and consume the greeting line.
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read_half, writer) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(read_half),
            writer,
            greeting: String::new(),
        };
        client.greeting = client.read_line().await;
        client
    }

    /// Read one line with the CRLF stripped.
    pub async fn read_line(&mut self) -> String {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await.expect("read line");
        assert!(n > 0, "server closed the connection unexpectedly");
        line.trim_end_matches(['\r', '\n']).to_string()
    }

    /// Send one line (CRLF appended).
    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("write line");
    }

    /// Send a command and read the status line.
    pub async fn command(&mut self, line: &str) -> String {
        self.send(line).await;
        self.read_line().await
    }

    /// Read a dot-terminated block; lines are returned raw (still
    /// dot-stuffed) so tests can assert the wire form.
    pub async fn read_multiline(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await;
            if line == "." {
                break;
            }
            lines.push(line);
        }
        lines
    }

    /// Send a command and read status plus dot-terminated block.
    pub async fn multiline_command(&mut self, line: &str) -> (String, Vec<String>) {
        let status = self.command(line).await;
        let block = self.read_multiline().await;
        (status, block)
    }

    /// Drive a POST: payload lines are sent as-is, then the terminator.
    /// Returns the final status line.
    pub async fn post(&mut self, payload: &[&str]) -> String {
        let status = self.command("POST").await;
        assert!(status.starts_with("340 "), "unexpected POST status: {status}");
        for line in payload {
            self.send(line).await;
        }
        self.send(".").await;
        self.read_line().await
    }

    /// Post a plain text article to a group and return the status.
    pub async fn post_simple(&mut self, group: &str, subject: &str, body: &str) -> String {
        let header_lines = [
            format!("Subject: {subject}"),
            format!("Newsgroups: {group}"),
            "From: tester@example.org".to_string(),
        ];
        let mut payload: Vec<&str> = header_lines.iter().map(String::as_str).collect();
        payload.push("");
        let body_lines: Vec<&str> = body.lines().collect();
        payload.extend(body_lines);
        self.post(&payload).await
    }

    /// Message-ID of an article number in the current group, via STAT.
    pub async fn message_id_of(&mut self, number: i64) -> String {
        let status = self.command(&format!("STAT {number}")).await;
        assert!(status.starts_with("223 "), "unexpected STAT status: {status}");
        status
            .split_whitespace()
            .nth(2)
            .expect("message-id in STAT reply")
            .to_string()
    }
}
