//! MIME composition for outbound articles
//!
//! Builds the wire octets for ARTICLE and for the `:bytes` overview field
//! from the stored header map, body, and attachment contents. Text is
//! carried 8bit so stored body octets survive a compose/parse round-trip;
//! attachments are base64 parts wrapped at 76 columns.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use uuid::Uuid;

use super::headers::HeaderMap;

const CRLF: &str = "\r\n";
const BASE64_LINE_LEN: usize = 76;

/// Headers the composer owns; stored copies are ignored so the output
/// always describes the actual MIME structure being written.
const STRUCTURAL_HEADERS: &[&str] = &[
    "Mime-Version",
    "Content-Type",
    "Content-Transfer-Encoding",
    "Content-Disposition",
];

/// An attachment with its content loaded, ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentData {
    /// MIME content type, e.g. `image/png`
    pub content_type: String,
    /// Filename advertised in Content-Disposition
    pub file_name: String,
    /// Raw content octets
    pub data: Vec<u8>,
}

/// Assemble the full MIME octets of an article.
///
/// Without attachments the result is a flat `text/plain` message; with
/// attachments it is a `multipart/mixed` tree whose first part is the text
/// body followed by one base64 part per attachment.
pub fn compose_article(headers: &HeaderMap, body: &str, attachments: &[AttachmentData]) -> Vec<u8> {
    let mut out = String::with_capacity(1024 + body.len());

    for (name, values) in headers.iter() {
        if STRUCTURAL_HEADERS.contains(&name.as_str()) {
            continue;
        }
        for value in values {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str(CRLF);
        }
    }
    out.push_str("Mime-Version: 1.0");
    out.push_str(CRLF);

    if attachments.is_empty() {
        out.push_str("Content-Type: text/plain; charset=UTF-8");
        out.push_str(CRLF);
        out.push_str("Content-Transfer-Encoding: 8bit");
        out.push_str(CRLF);
        out.push_str(CRLF);
        push_body(&mut out, body);
        return out.into_bytes();
    }

    let boundary = Uuid::new_v4().simple().to_string();
    out.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{boundary}\""
    ));
    out.push_str(CRLF);
    out.push_str(CRLF);

    out.push_str(&format!("--{boundary}"));
    out.push_str(CRLF);
    out.push_str("Content-Type: text/plain; charset=UTF-8");
    out.push_str(CRLF);
    out.push_str("Content-Transfer-Encoding: 8bit");
    out.push_str(CRLF);
    out.push_str(CRLF);
    push_body(&mut out, body);

    for attachment in attachments {
        out.push_str(&format!("--{boundary}"));
        out.push_str(CRLF);
        out.push_str(&format!(
            "Content-Type: {}; name=\"{}\"",
            attachment.content_type, attachment.file_name
        ));
        out.push_str(CRLF);
        out.push_str("Content-Transfer-Encoding: base64");
        out.push_str(CRLF);
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"",
            attachment.file_name
        ));
        out.push_str(CRLF);
        out.push_str(CRLF);
        push_base64(&mut out, &attachment.data);
    }

    out.push_str(&format!("--{boundary}--"));
    out.push_str(CRLF);

    out.into_bytes()
}

/// Append the body with CRLF line endings, preserving a trailing newline.
fn push_body(out: &mut String, body: &str) {
    for line in body.lines() {
        out.push_str(line);
        out.push_str(CRLF);
    }
}

/// Append base64-encoded data wrapped at 76 columns (RFC 2045 Section 6.8).
fn push_base64(out: &mut String, data: &[u8]) {
    let encoded = BASE64.encode(data);
    for chunk in encoded.as_bytes().chunks(BASE64_LINE_LEN) {
        // base64 output is ASCII, chunk boundaries are char boundaries
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push_str(CRLF);
    }
}
