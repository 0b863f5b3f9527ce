//! Storage backend contract
//!
//! The command dispatcher consumes exactly this interface; the backend owns
//! persistence and concurrency control. Not-found is a first-class result,
//! never folded into database faults, so handlers can map it to the
//! command-specific 4xx reply.

mod sqlite;

pub use sqlite::SqliteBackend;

use async_trait::async_trait;
use thiserror::Error;

use crate::article::{Article, Attachment, Group, HeaderMap};
use crate::wildmat::Wildmat;

/// Backend error surface.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The requested group or article does not exist
    #[error("not found")]
    NotFound,

    /// An article referenced a newsgroup the server does not carry
    #[error("no such newsgroup: {0}")]
    NoSuchGroup(String),

    /// An article with this Message-ID is already stored
    #[error("duplicate article: {0}")]
    Duplicate(String),

    /// The article failed backend validation
    #[error("{0}")]
    Rejected(String),

    /// A stored record could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Underlying database fault
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias using StorageError
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// An article on its way into the store. Ids, numbers, and timestamps are
/// assigned by the backend.
#[derive(Debug, Clone)]
pub struct NewArticle {
    /// Header multimap; must contain a Message-Id
    pub headers: HeaderMap,
    /// Body octets
    pub body: String,
    /// Canonical thread anchor, `None` for a new thread root
    pub thread: Option<String>,
    /// Attachment references (content already written to disk)
    pub attachments: Vec<Attachment>,
}

/// Operations the command handlers are written against.
///
/// `save_article` must assign the global article id, assign per-group
/// article numbers atomically (`max + 1` scoped to the group), and enforce
/// Message-ID uniqueness. Water marks are 0 for an empty group.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// All groups carried by the server
    async fn list_groups(&self) -> StorageResult<Vec<Group>>;

    /// Groups whose names match the wildmat
    async fn list_groups_by_pattern(&self, pattern: &Wildmat) -> StorageResult<Vec<Group>>;

    /// Look up one group by name
    async fn get_group(&self, name: &str) -> StorageResult<Group>;

    /// Groups created strictly after the given unix timestamp
    async fn get_new_groups_since(&self, since: i64) -> StorageResult<Vec<Group>>;

    /// Number of articles currently in the group
    async fn article_count(&self, group: &Group) -> StorageResult<i64>;

    /// Lowest article number in the group, 0 when empty
    async fn low_water_mark(&self, group: &Group) -> StorageResult<i64>;

    /// Highest article number in the group, 0 when empty
    async fn high_water_mark(&self, group: &Group) -> StorageResult<i64>;

    /// Persist an article into the named groups; returns the article id
    async fn save_article(&self, article: &NewArticle, groups: &[String]) -> StorageResult<i64>;

    /// Look up an article by Message-ID
    async fn get_article_by_msgid(&self, message_id: &str) -> StorageResult<Article>;

    /// Look up an article by number within a group
    async fn get_article_by_number(&self, group: &Group, number: i64) -> StorageResult<Article>;

    /// Article numbers within the sentinel range (see [`crate::range`])
    async fn get_article_numbers(
        &self,
        group: &Group,
        low: i64,
        high: i64,
    ) -> StorageResult<Vec<i64>>;

    /// Message-IDs of articles created strictly after the timestamp,
    /// optionally restricted to groups matching the wildmat
    async fn get_new_article_msgids_since(
        &self,
        since: i64,
        pattern: Option<&Wildmat>,
    ) -> StorageResult<Vec<String>>;

    /// The nearest existing article below the given one in its group
    async fn previous_article(&self, group: &Group, article: &Article) -> StorageResult<Article>;

    /// The nearest existing article above the given one in its group
    async fn next_article(&self, group: &Group, article: &Article) -> StorageResult<Article>;

    /// Articles within the sentinel range, numbered for this group
    async fn articles_in_range(
        &self,
        group: &Group,
        low: i64,
        high: i64,
    ) -> StorageResult<Vec<Article>>;

    /// Thread-root article numbers in the group, newest first, paginated
    /// (`page_num` is 1-based)
    async fn new_threads(
        &self,
        group: &Group,
        per_page: i64,
        page_num: i64,
    ) -> StorageResult<Vec<i64>>;

    /// Article numbers belonging to the thread rooted at `root_number`
    async fn thread_members(&self, group: &Group, root_number: i64) -> StorageResult<Vec<i64>>;
}
