//! Article model: header map, group/article/attachment types, MIME
//! composition for the wire, and envelope parsing for inbound POST/IHAVE.

pub mod compose;
pub mod envelope;
mod headers;
mod types;

pub use compose::{compose_article, AttachmentData};
pub use envelope::{parse_envelope, Envelope};
pub use headers::{canonical_name, parse_header_block, HeaderMap, ALLOWED_HEADERS};
pub use types::{Article, Attachment, Group};
