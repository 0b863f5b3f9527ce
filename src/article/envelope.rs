//! Inbound article envelope parsing
//!
//! POST and IHAVE hand the dot-unstuffed payload to [`parse_envelope`],
//! which splits it into the whitelist-filtered header map, the text body,
//! and any decoded attachment parts. MIME structure is delegated to
//! `mail-parser`; the header multimap is read off the raw block so stored
//! values stay byte-faithful instead of being re-rendered.

use mail_parser::{MessageParser, MimeHeaders};

use super::compose::AttachmentData;
use super::headers::{parse_header_block, HeaderMap};
use crate::error::{Result, YansError};

/// Parsed inbound article.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Whitelist-filtered headers with MIME structural fields removed
    pub headers: HeaderMap,
    /// Decoded text body (first text part of a multipart message)
    pub body: String,
    /// Decoded attachment parts
    pub attachments: Vec<AttachmentData>,
}

/// Headers describing the inbound MIME structure. The structure is
/// consumed here (body decoded, attachments extracted), so these do not
/// survive into the stored header map; the composer re-synthesizes them
/// on the way out.
const STRUCTURAL_HEADERS: &[&str] = &[
    "Mime-Version",
    "Content-Type",
    "Content-Transfer-Encoding",
    "Content-Disposition",
];

/// Parse raw envelope octets (headers, blank line, body) into an [`Envelope`].
pub fn parse_envelope(raw: &[u8]) -> Result<Envelope> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| YansError::Envelope("unparseable article".to_string()))?;

    let header_block = split_header_block(raw);
    let mut headers = parse_header_block(&String::from_utf8_lossy(header_block));
    headers.retain_allowed();
    for name in STRUCTURAL_HEADERS {
        headers.remove(name);
    }

    let body = message
        .body_text(0)
        .map(|text| text.into_owned())
        .unwrap_or_default();

    let attachments = message
        .attachments()
        .map(|part| {
            let content_type = part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());
            AttachmentData {
                content_type,
                file_name: part.attachment_name().unwrap_or("attachment").to_string(),
                data: part.contents().to_vec(),
            }
        })
        .collect();

    Ok(Envelope {
        headers,
        body,
        attachments,
    })
}

/// Everything before the first blank line (CRLF CRLF, falling back to LF LF).
fn split_header_block(raw: &[u8]) -> &[u8] {
    if let Some(pos) = find_subslice(raw, b"\r\n\r\n") {
        return &raw[..pos + 2];
    }
    if let Some(pos) = find_subslice(raw, b"\n\n") {
        return &raw[..pos + 1];
    }
    raw
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
