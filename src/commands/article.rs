//! Article retrieval and navigation: ARTICLE, HEAD, BODY, STAT, LAST, NEXT

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::warn;

use super::{reply, syntax_error, Dispatcher, Flow};
use crate::article::{compose_article, Article, AttachmentData};
use crate::error::Result;
use crate::response::{codes, NntpResponse};
use crate::session::Session;
use crate::storage::StorageError;

impl Dispatcher {
    /// Load attachment contents from the upload directory. A reference
    /// whose file has gone missing is logged and skipped rather than
    /// failing the whole article.
    pub(super) async fn load_attachment_data(&self, article: &Article) -> Vec<AttachmentData> {
        let mut parts = Vec::with_capacity(article.attachments.len());
        for attachment in &article.attachments {
            let path = self.upload_path.join(&attachment.file_name);
            match tokio::fs::read(&path).await {
                Ok(data) => parts.push(AttachmentData {
                    content_type: attachment.content_type.clone(),
                    file_name: attachment.file_name.clone(),
                    data,
                }),
                Err(e) => warn!(
                    "Attachment {} of article {} unreadable: {e}",
                    attachment.file_name, article.id
                ),
            }
        }
        parts
    }

    /// Full MIME octets of an article, attachments included.
    pub(super) async fn mime_octets(&self, article: &Article) -> Vec<u8> {
        let attachments = self.load_attachment_data(article).await;
        compose_article(&article.headers, &article.body, &attachments)
    }

    pub(super) async fn handle_article<S>(
        &self,
        session: &mut Session<S>,
        verb: &str,
        args: &[&str],
    ) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if args.len() > 1 {
            return syntax_error(session).await;
        }

        let article = match args.first() {
            None => match session.current_article.clone() {
                Some(article) => article,
                None => {
                    return reply(
                        session,
                        codes::NO_CURRENT_ARTICLE,
                        "No current article selected",
                    )
                    .await;
                }
            },
            Some(arg) => match arg.parse::<i64>() {
                Ok(number) => {
                    let Some(group) = session.current_group.clone() else {
                        return reply(session, codes::NO_GROUP_SELECTED, "No newsgroup selected")
                            .await;
                    };
                    match self.backend.get_article_by_number(&group, number).await {
                        Ok(article) => {
                            session.current_article = Some(article.clone());
                            article
                        }
                        Err(StorageError::NotFound) => {
                            return reply(
                                session,
                                codes::NO_SUCH_ARTICLE_NUMBER,
                                "No article with that number",
                            )
                            .await;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(_) => match self.backend.get_article_by_msgid(arg).await {
                    Ok(article) => {
                        session.current_article = Some(article.clone());
                        article
                    }
                    Err(StorageError::NotFound) => {
                        return reply(
                            session,
                            codes::NO_SUCH_ARTICLE_ID,
                            "No Such Article Found",
                        )
                        .await;
                    }
                    Err(e) => return Err(e.into()),
                },
            },
        };

        let number = article.number;
        let message_id = article.message_id().to_string();

        match verb {
            "ARTICLE" => {
                let octets = self.mime_octets(&article).await;
                let status = NntpResponse::new(
                    codes::ARTICLE_FOLLOWS,
                    format!("{number} {message_id} article"),
                );
                session.conn.write_data_block(&status, &octets).await?;
            }
            "HEAD" => {
                let mut lines = Vec::with_capacity(article.headers.len());
                for (name, values) in article.headers.iter() {
                    for value in values {
                        lines.push(format!("{name}: {value}"));
                    }
                }
                let status = NntpResponse::new(
                    codes::HEAD_FOLLOWS,
                    format!("{number} {message_id} article"),
                );
                session.conn.write_data_lines(&status, &lines).await?;
            }
            "BODY" => {
                let status = NntpResponse::new(
                    codes::BODY_FOLLOWS,
                    format!("{number} {message_id} article"),
                );
                session
                    .conn
                    .write_data_block(&status, article.body.as_bytes())
                    .await?;
            }
            _ => {
                return reply(
                    session,
                    codes::ARTICLE_STAT,
                    format!("{number} {message_id}"),
                )
                .await;
            }
        }
        Ok(Flow::Continue)
    }

    pub(super) async fn handle_last<S>(
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
        let Some(group) = session.current_group.clone() else {
            return reply(session, codes::NO_GROUP_SELECTED, "no newsgroup selected").await;
        };
        let Some(current) = session.current_article.clone() else {
            return reply(
                session,
                codes::NO_CURRENT_ARTICLE,
                "No current article selected",
            )
            .await;
        };

        let low = self.backend.low_water_mark(&group).await?;
        if current.number == low {
            return reply(
                session,
                codes::NO_PREV_ARTICLE,
                "No previous article to retrieve",
            )
            .await;
        }

        match self.backend.previous_article(&group, &current).await {
            Ok(article) => {
                let line = format!("{} {} retrieved", article.number, article.message_id());
                session.current_article = Some(article);
                reply(session, codes::ARTICLE_STAT, line).await
            }
            Err(StorageError::NotFound) => {
                reply(
                    session,
                    codes::NO_PREV_ARTICLE,
                    "No previous article to retrieve",
                )
                .await
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(super) async fn handle_next<S>(
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
        let Some(group) = session.current_group.clone() else {
            return reply(session, codes::NO_GROUP_SELECTED, "no newsgroup selected").await;
        };
        let Some(current) = session.current_article.clone() else {
            return reply(
                session,
                codes::NO_CURRENT_ARTICLE,
                "No current article selected",
            )
            .await;
        };

        let high = self.backend.high_water_mark(&group).await?;
        if current.number == high {
            return reply(
                session,
                codes::NO_NEXT_ARTICLE,
                "No next article to retrieve",
            )
            .await;
        }

        match self.backend.next_article(&group, &current).await {
            Ok(article) => {
                let line = format!("{} {} retrieved", article.number, article.message_id());
                session.current_article = Some(article);
                reply(session, codes::ARTICLE_STAT, line).await
            }
            Err(StorageError::NotFound) => {
                reply(
                    session,
                    codes::NO_NEXT_ARTICLE,
                    "No next article to retrieve",
                )
                .await
            }
            Err(e) => Err(e.into()),
        }
    }
}
