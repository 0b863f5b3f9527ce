//! Wildmat pattern matching (RFC 3977 Section 4)
//!
//! Wildmats filter newsgroup names in LIST, NEWNEWS, and friends. A wildmat
//! is a comma-separated list of glob patterns; `?` matches exactly one
//! character, `*` matches any run of characters (including none), and a
//! leading `!` turns a pattern into an exclusion.

use regex::Regex;

use crate::error::{Result, YansError};

/// A compiled wildmat.
///
/// Positive patterns are OR'd together; negated patterns act as a reject
/// set consulted before the positives (the moral equivalent of zero-width
/// negative look-aheads). A wildmat with only negated patterns accepts
/// every name the exclusions do not hit.
#[derive(Debug, Clone)]
pub struct Wildmat {
    accept: Vec<Regex>,
    reject: Vec<Regex>,
    source: String,
}

/// Translate one glob pattern into an anchored regular expression.
fn pattern_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 4);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '?' => expr.push('.'),
            '*' => expr.push_str(".*"),
            _ => expr.push_str(&regex::escape(&ch.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| YansError::InvalidArgument(format!("bad wildmat: {e}")))
}

impl Wildmat {
    /// Parse and compile a wildmat expression like `a.b.*,!a.b.secret`.
    pub fn parse(wildmat: &str) -> Result<Self> {
        let mut accept = Vec::new();
        let mut reject = Vec::new();

        for element in wildmat.split(',') {
            if let Some(negated) = element.strip_prefix('!') {
                reject.push(pattern_to_regex(negated)?);
            } else {
                accept.push(pattern_to_regex(element)?);
            }
        }

        Ok(Self {
            accept,
            reject,
            source: wildmat.to_string(),
        })
    }

    /// Test a newsgroup name against the compiled wildmat.
    pub fn matches(&self, name: &str) -> bool {
        if self.reject.iter().any(|re| re.is_match(name)) {
            return false;
        }
        if self.accept.is_empty() {
            return true;
        }
        self.accept.iter().any(|re| re.is_match(name))
    }

    /// The wildmat expression this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }
}
