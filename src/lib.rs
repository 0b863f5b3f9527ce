#![doc = include_str!("../README.md")]

/// Article model, header map, MIME composition and envelope parsing
pub mod article;
mod capabilities;
/// NNTP wire codec: CRLF framing and dot-stuffed multiline blocks
pub mod codec;
/// Command dispatch and per-verb handlers
pub mod commands;
mod config;
mod error;
/// Article number range parsing
pub mod range;
mod response;
/// Listener, accept loop, and session registry
pub mod server;
/// Per-connection session state machine
pub mod session;
/// Storage backend contract and the SQLite implementation
pub mod storage;
/// Wildmat pattern matching for newsgroup names
pub mod wildmat;
mod ws;

pub use article::{Article, Attachment, Group, HeaderMap};
pub use capabilities::{Capabilities, Capability};
pub use codec::NntpConnection;
pub use commands::Dispatcher;
pub use config::{BackendType, Config, SqliteConfig};
pub use error::{Result, YansError};
pub use response::{codes, NntpResponse};
pub use server::NntpServer;
pub use session::{Session, SessionMode};
pub use storage::{NewArticle, SqliteBackend, StorageBackend, StorageError};
pub use wildmat::Wildmat;

/// Implementation name advertised in the IMPLEMENTATION capability
pub const SERVER_NAME: &str = "yans";
/// Implementation version advertised in the IMPLEMENTATION capability
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
