//! Overview: OVER and its XOVER alias

use tokio::io::{AsyncRead, AsyncWrite};

use super::{reply, syntax_error, Dispatcher, Flow};
use crate::article::Article;
use crate::error::Result;
use crate::range::{parse_range, RANGE_EMPTY};
use crate::response::{codes, NntpResponse};
use crate::session::Session;
use crate::storage::StorageError;

impl Dispatcher {
    /// One tab-separated overview row: number, Subject, From, Date,
    /// Message-ID, References, :bytes, :lines.
    async fn overview_row(&self, article: &Article) -> String {
        let bytes = self.mime_octets(article).await.len();
        let lines = article.body_line_count();
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            article.number,
            article.headers.get_first("Subject").unwrap_or_default(),
            article.headers.get_first("From").unwrap_or_default(),
            article.headers.get_first("Date").unwrap_or_default(),
            article.headers.get_first("Message-Id").unwrap_or_default(),
            article.headers.get_first("References").unwrap_or_default(),
            bytes,
            lines,
        )
    }

    pub(super) async fn handle_over<S>(
        &self,
        session: &mut Session<S>,
        args: &[&str],
    ) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if args.len() > 1 {
            return syntax_error(session).await;
        }

        let articles: Vec<Article> = match args.first() {
            None => match session.current_article.clone() {
                Some(article) => vec![article],
                None => {
                    return reply(
                        session,
                        codes::NO_CURRENT_ARTICLE,
                        "No current article selected",
                    )
                    .await;
                }
            },
            Some(arg) if arg.contains('<') || arg.contains('>') => {
                match self.backend.get_article_by_msgid(arg).await {
                    Ok(mut article) => {
                        // By Message-ID the row carries no group position
                        article.number = 0;
                        vec![article]
                    }
                    Err(StorageError::NotFound) => {
                        return reply(
                            session,
                            codes::NO_SUCH_ARTICLE_ID,
                            "No such article with that message-id",
                        )
                        .await;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Some(arg) => {
                let Ok((low, high)) = parse_range(arg) else {
                    return syntax_error(session).await;
                };
                let Some(group) = session.current_group.clone() else {
                    return reply(session, codes::NO_GROUP_SELECTED, "No newsgroup selected")
                        .await;
                };
                if (low, high) == RANGE_EMPTY {
                    return reply(session, codes::NO_SUCH_ARTICLE_NUMBER, "Empty range").await;
                }
                self.backend.articles_in_range(&group, low, high).await?
            }
        };

        let mut rows = Vec::with_capacity(articles.len());
        for article in &articles {
            rows.push(self.overview_row(article).await);
        }

        let status = NntpResponse::new(
            codes::OVERVIEW_INFO_FOLLOWS,
            "Overview information follows",
        );
        session.conn.write_data_lines(&status, &rows).await?;
        Ok(Flow::Continue)
    }
}
