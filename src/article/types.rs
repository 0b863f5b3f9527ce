//! Core newsgroup and article types

use super::headers::HeaderMap;

/// A newsgroup. Immutable after creation except for the description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Stable integer id assigned by the backend
    pub id: i64,
    /// Unique dot-separated hierarchical name, e.g. `comp.lang.rust`
    pub name: String,
    /// Optional human-readable description
    pub description: Option<String>,
    /// Creation time, unix seconds UTC
    pub created_at: i64,
}

/// Reference to an attachment stored outside the article record.
///
/// The file lives in the configured upload directory under the
/// server-assigned name; the article row only carries this reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// MIME content type, e.g. `image/png`
    pub content_type: String,
    /// Server-assigned opaque filename (`<uuid>.<ext>`)
    pub file_name: String,
}

/// A stored article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Stable integer id assigned by the backend
    pub id: i64,
    /// Creation time, unix seconds UTC
    pub created_at: i64,
    /// Parsed header multimap
    pub headers: HeaderMap,
    /// Body octets (text, attachments extracted at ingest)
    pub body: String,
    /// Message-ID of the thread root this article belongs to.
    /// `None` for thread roots themselves.
    pub thread: Option<String>,
    /// Article number within the group it was fetched through;
    /// 0 when looked up by Message-ID outside any group context.
    pub number: i64,
    /// Attachment references
    pub attachments: Vec<Attachment>,
}

impl Article {
    /// The article's Message-ID header, empty string when absent
    /// (stored articles always have one).
    pub fn message_id(&self) -> &str {
        self.headers.get_first("Message-Id").unwrap_or_default()
    }

    /// Newsgroup names from the Newsgroups header, trimmed.
    pub fn newsgroups(&self) -> Vec<String> {
        self.headers
            .get_first("Newsgroups")
            .map(|v| {
                v.split(',')
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of newline characters in the body (`:lines` overview field).
    pub fn body_line_count(&self) -> usize {
        self.body.matches('\n').count()
    }
}
