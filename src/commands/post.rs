//! Article ingest: POST and the single-hop IHAVE transfer

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

use super::{reply, syntax_error, Dispatcher, Flow};
use crate::article::{Attachment, AttachmentData, HeaderMap};
use crate::error::{Result, YansError};
use crate::response::codes;
use crate::session::Session;
use crate::storage::{NewArticle, StorageError};

/// Content types accepted for inbound attachments.
const ALLOWED_ATTACHMENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

/// Where an inbound article sits in the thread graph.
enum ThreadResolution {
    /// No In-Reply-To; the article starts a thread
    Root,
    /// Canonical anchor for the thread this reply joins
    Anchored(String),
    /// In-Reply-To names an article the server does not have
    MissingParent,
}

impl Dispatcher {
    /// Resolve In-Reply-To into the canonical thread anchor. A reply to a
    /// root anchors at the root's Message-ID; a reply to a reply inherits
    /// the parent's anchor, keeping threads two levels deep.
    async fn resolve_thread(&self, headers: &HeaderMap) -> Result<ThreadResolution> {
        let Some(parent_id) = headers.get_first("In-Reply-To") else {
            return Ok(ThreadResolution::Root);
        };
        match self.backend.get_article_by_msgid(parent_id).await {
            Ok(parent) => {
                let anchor = parent
                    .thread
                    .clone()
                    .unwrap_or_else(|| parent.message_id().to_string());
                Ok(ThreadResolution::Anchored(anchor))
            }
            Err(StorageError::NotFound) => Ok(ThreadResolution::MissingParent),
            Err(e) => Err(e.into()),
        }
    }

    /// First disallowed content type among the attachment parts, if any.
    fn disallowed_attachment<'a>(parts: &'a [AttachmentData]) -> Option<&'a str> {
        parts
            .iter()
            .map(|p| p.content_type.as_str())
            .find(|ct| !ALLOWED_ATTACHMENT_TYPES.contains(ct))
    }

    /// Write attachment contents under the upload directory with fresh
    /// UUID names, preserving the original extension.
    async fn store_attachments(&self, parts: &[AttachmentData]) -> Result<Vec<Attachment>> {
        if parts.is_empty() {
            return Ok(Vec::new());
        }
        tokio::fs::create_dir_all(&self.upload_path).await?;

        let mut stored = Vec::with_capacity(parts.len());
        for part in parts {
            let extension = part
                .file_name
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .unwrap_or_else(|| match part.content_type.as_str() {
                    "image/jpeg" => "jpg".to_string(),
                    "image/gif" => "gif".to_string(),
                    _ => "png".to_string(),
                });
            let file_name = format!("{}.{}", Uuid::new_v4(), extension);
            let path = self.upload_path.join(&file_name);
            tokio::fs::write(&path, &part.data).await?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).await?;
            }
            stored.push(Attachment {
                content_type: part.content_type.clone(),
                file_name,
            });
        }
        Ok(stored)
    }

    pub(super) async fn handle_post<S>(
        &self,
        session: &mut Session<S>,
        args: &[&str],
    ) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if !args.is_empty() {
            return syntax_error(session).await;
        }

        session
            .reply(
                codes::SEND_ARTICLE,
                "Input article; end with <CR-LF>.<CR-LF>",
            )
            .await?;

        let raw = session.conn.read_multiline().await?;
        let envelope = match crate::article::parse_envelope(&raw) {
            Ok(envelope) => envelope,
            Err(YansError::Envelope(detail)) => {
                return reply(session, codes::POSTING_FAILED, detail).await;
            }
            Err(e) => return Err(e),
        };

        let mut headers = envelope.headers;
        headers.set(
            "Message-ID",
            format!("<{}@{}>", Uuid::new_v4(), self.domain),
        );
        headers.set("Path", format!("{}!not-for-mail", self.domain));
        if !headers.contains("Date") {
            headers.set(
                "Date",
                Utc::now().format("%a, %d %b %Y %H:%M:%S %z").to_string(),
            );
        }

        let thread = match self.resolve_thread(&headers).await? {
            ThreadResolution::Root => None,
            ThreadResolution::Anchored(anchor) => Some(anchor),
            ThreadResolution::MissingParent => {
                return reply(
                    session,
                    codes::POSTING_FAILED,
                    "no such message you are replying to",
                )
                .await;
            }
        };

        if Self::disallowed_attachment(&envelope.attachments).is_some() {
            return reply(session, codes::POSTING_FAILED, "disallowed attachment type").await;
        }
        let attachments = self.store_attachments(&envelope.attachments).await?;

        let groups: Vec<String> = headers
            .get_first("Newsgroups")
            .map(|v| v.split(',').map(|g| g.trim().to_string()).collect())
            .unwrap_or_default();

        let article = NewArticle {
            headers,
            body: envelope.body,
            thread,
            attachments,
        };

        match self.backend.save_article(&article, &groups).await {
            Ok(_) => reply(session, codes::ARTICLE_POSTED, "Article received OK").await,
            Err(
                e @ (StorageError::Duplicate(_)
                | StorageError::NoSuchGroup(_)
                | StorageError::Rejected(_)),
            ) => reply(session, codes::POSTING_FAILED, e.to_string()).await,
            Err(e) => Err(e.into()),
        }
    }

    pub(super) async fn handle_ihave<S>(
        &self,
        session: &mut Session<S>,
        args: &[&str],
    ) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if args.len() != 1 {
            return syntax_error(session).await;
        }
        let message_id = args[0];

        match self.backend.get_article_by_msgid(message_id).await {
            Ok(_) => return reply(session, codes::ARTICLE_NOT_WANTED, "Duplicate").await,
            Err(StorageError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        session
            .reply(
                codes::SEND_ARTICLE_TRANSFER,
                "Send it; end with <CR-LF>.<CR-LF>",
            )
            .await?;

        let raw = session.conn.read_multiline().await?;
        let envelope = match crate::article::parse_envelope(&raw) {
            Ok(envelope) => envelope,
            Err(YansError::Envelope(detail)) => {
                return reply(
                    session,
                    codes::TRANSFER_NOT_POSSIBLE,
                    format!("Transfer failed: {detail}"),
                )
                .await;
            }
            Err(e) => return Err(e),
        };

        // The envelope must carry the Message-ID the peer offered.
        if envelope.headers.get_first("Message-Id") != Some(message_id) {
            return reply(
                session,
                codes::TRANSFER_NOT_POSSIBLE,
                "Transfer failed: Message-ID mismatch",
            )
            .await;
        }

        // A transferred reply to an article we never saw is still stored;
        // it just starts its own thread.
        let thread = match self.resolve_thread(&envelope.headers).await? {
            ThreadResolution::Anchored(anchor) => Some(anchor),
            ThreadResolution::Root | ThreadResolution::MissingParent => None,
        };

        if Self::disallowed_attachment(&envelope.attachments).is_some() {
            return reply(
                session,
                codes::TRANSFER_NOT_POSSIBLE,
                "Transfer failed: disallowed attachment type",
            )
            .await;
        }
        let attachments = self.store_attachments(&envelope.attachments).await?;

        let groups: Vec<String> = envelope
            .headers
            .get_first("Newsgroups")
            .map(|v| v.split(',').map(|g| g.trim().to_string()).collect())
            .unwrap_or_default();

        let article = NewArticle {
            headers: envelope.headers,
            body: envelope.body,
            thread,
            attachments,
        };

        match self.backend.save_article(&article, &groups).await {
            Ok(_) => reply(session, codes::ARTICLE_TRANSFERRED, "Article transferred OK").await,
            Err(StorageError::Duplicate(_)) => {
                reply(session, codes::ARTICLE_NOT_WANTED, "Duplicate").await
            }
            Err(e @ (StorageError::NoSuchGroup(_) | StorageError::Rejected(_))) => {
                reply(
                    session,
                    codes::TRANSFER_NOT_POSSIBLE,
                    format!("Transfer failed: {e}"),
                )
                .await
            }
            Err(e) => Err(e.into()),
        }
    }
}
