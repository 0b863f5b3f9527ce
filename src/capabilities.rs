//! Server capability advertisement (RFC 3977 Section 5.2)
//!
//! Each session owns a mutable copy of the capability list; MODE READER
//! rewrites it in place. Order is preserved so CAPABILITIES output is
//! stable across calls.

/// Capability names the server advertises or rewrites.
pub mod names {
    /// Protocol version indicator
    pub const VERSION: &str = "VERSION";
    /// Implementation name and version
    pub const IMPLEMENTATION: &str = "IMPLEMENTATION";
    /// MODE READER is available (transit mode only)
    pub const MODE_READER: &str = "MODE-READER";
    /// Reader commands are available
    pub const READER: &str = "READER";
    /// Overview support
    pub const OVER: &str = "OVER";
    /// Peer transfer support
    pub const IHAVE: &str = "IHAVE";
    /// LIST keyword advertisement
    pub const LIST: &str = "LIST";
}

/// One advertised capability with optional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    /// Capability label, e.g. `VERSION`
    pub name: String,
    /// Space-separated arguments, empty when none
    pub args: String,
}

impl Capability {
    /// Create a capability with arguments
    pub fn with_args(name: &str, args: &str) -> Self {
        Self {
            name: name.to_string(),
            args: args.to_string(),
        }
    }

    /// Create a bare capability
    pub fn bare(name: &str) -> Self {
        Self::with_args(name, "")
    }

    fn line(&self) -> String {
        if self.args.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.args)
        }
    }
}

/// Ordered, duplicate-free capability set.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    entries: Vec<Capability>,
}

impl Capabilities {
    /// The capability set a fresh (transit mode) session starts with.
    pub fn transit(implementation: &str, version: &str) -> Self {
        let mut caps = Self::default();
        caps.add(Capability::with_args(names::VERSION, "2"));
        caps.add(Capability::with_args(
            names::IMPLEMENTATION,
            &format!("{implementation} {version}"),
        ));
        caps.add(Capability::bare(names::MODE_READER));
        caps.add(Capability::with_args(names::OVER, "MSGID"));
        caps.add(Capability::bare(names::IHAVE));
        caps
    }

    /// Add a capability; duplicates by name are ignored.
    pub fn add(&mut self, cap: Capability) {
        if !self.contains(&cap.name) {
            self.entries.push(cap);
        }
    }

    /// Remove a capability by name.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|c| c.name != name);
    }

    /// Whether a capability with this name is advertised.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|c| c.name == name)
    }

    /// Rewrite the set for reader mode: MODE-READER goes away, READER
    /// appears, and LIST advertises the reader keywords.
    pub fn promote_to_reader(&mut self) {
        self.remove(names::MODE_READER);
        self.remove(names::LIST);
        self.add(Capability::bare(names::READER));
        self.add(Capability::with_args(
            names::LIST,
            "ACTIVE NEWSGROUPS OVERVIEW.FMT",
        ));
    }

    /// One line per capability, in advertisement order.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(Capability::line).collect()
    }
}
