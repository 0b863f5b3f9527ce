//! Case-insensitive article header map
//!
//! Headers are stored under a canonical `Xxx-Yyy` key with an ordered list
//! of values, and serialize to a JSON object of `name -> [values]`. The
//! JSON form is what the sqlite backend persists, so single-key extraction
//! (`json_extract(header, '$."Message-Id"[0]')`) works from SQL.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Header names an article is allowed to carry (RFC 5536 plus Xref).
/// Inbound envelopes are filtered to this set.
pub const ALLOWED_HEADERS: &[&str] = &[
    "Date",
    "From",
    "Message-Id",
    "Newsgroups",
    "Path",
    "Subject",
    "Comments",
    "Keywords",
    "In-Reply-To",
    "Sender",
    "Mime-Version",
    "Content-Type",
    "Content-Transfer-Encoding",
    "Content-Disposition",
    "Content-Language",
    "Approved",
    "Archive",
    "Control",
    "Distribution",
    "Expires",
    "Followup-To",
    "Injection-Date",
    "Injection-Info",
    "Organization",
    "References",
    "Summary",
    "Supersedes",
    "User-Agent",
    "Xref",
];

/// Canonicalize a header name: every `-`-separated token gets an uppercase
/// first letter, the rest lowercased (`message-ID` -> `Message-Id`).
pub fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, token) in name.trim().split('-').enumerate() {
        if i > 0 {
            out.push('-');
        }
        let mut chars = token.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars.flat_map(|c| c.to_lowercase()));
        }
    }
    out
}

/// Ordered multimap of canonical header name to values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl HeaderMap {
    /// Create an empty header map
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all values of a header
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.entries.insert(canonical_name(name), vec![value.into()]);
    }

    /// Append a value, keeping any existing ones
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(canonical_name(name))
            .or_default()
            .push(value.into());
    }

    /// First value of a header, if present
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&canonical_name(name))
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values of a header
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&canonical_name(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the header is present
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&canonical_name(name))
    }

    /// Remove a header entirely
    pub fn remove(&mut self, name: &str) {
        self.entries.remove(&canonical_name(name));
    }

    /// Iterate `(canonical name, values)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.entries.iter()
    }

    /// Number of distinct header names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no headers
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every header whose name is not in [`ALLOWED_HEADERS`]
    pub fn retain_allowed(&mut self) {
        self.entries
            .retain(|name, _| ALLOWED_HEADERS.contains(&name.as_str()));
    }

    /// Serialize to the persisted JSON form
    pub fn to_json(&self) -> String {
        // BTreeMap of strings cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deserialize from the persisted JSON form
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Parse a raw RFC 5322 header block into a map, unfolding continuation
/// lines (a line starting with space or tab extends the previous value).
pub fn parse_header_block(block: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    let mut current: Option<(String, String)> = None;

    for line in block.lines() {
        if line.is_empty() {
            break;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = current.as_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = current.take() {
            map.append(&name, value);
        }
        match line.split_once(':') {
            Some((name, value)) => {
                current = Some((name.trim().to_string(), value.trim().to_string()));
            }
            None => continue,
        }
    }
    if let Some((name, value)) = current.take() {
        map.append(&name, value);
    }

    map
}
