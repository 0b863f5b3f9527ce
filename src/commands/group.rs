//! Group selection and time-based discovery: GROUP, LISTGROUP, NEWGROUPS,
//! NEWNEWS

use chrono::{NaiveDateTime, TimeZone, Utc};
use tokio::io::{AsyncRead, AsyncWrite};

use super::{reply, syntax_error, Dispatcher, Flow};
use crate::article::Group;
use crate::error::Result;
use crate::range::{parse_range, RANGE_ALL, RANGE_EMPTY};
use crate::response::{codes, NntpResponse};
use crate::session::Session;
use crate::storage::StorageError;
use crate::wildmat::Wildmat;

/// Parse the `[yy]yymmdd hhmmss` date argument pair into unix seconds UTC.
/// Both the 6- and 8-digit year-date forms are accepted.
pub(super) fn parse_nntp_date(date: &str, time: &str) -> Option<i64> {
    let combined = format!("{date} {time}");
    let parsed = match combined.len() {
        15 => NaiveDateTime::parse_from_str(&combined, "%Y%m%d %H%M%S").ok()?,
        13 => NaiveDateTime::parse_from_str(&combined, "%y%m%d %H%M%S").ok()?,
        _ => return None,
    };
    Some(Utc.from_utc_datetime(&parsed).timestamp())
}

impl Dispatcher {
    /// `<name> <high> <low> <posting>` row for LIST ACTIVE and NEWGROUPS.
    pub(super) async fn active_row(&self, group: &Group) -> Result<String> {
        let count = self.backend.article_count(group).await?;
        if count > 0 {
            let high = self.backend.high_water_mark(group).await?;
            let low = self.backend.low_water_mark(group).await?;
            Ok(format!("{} {} {} y", group.name, high, low))
        } else {
            Ok(format!("{} 0 1 y", group.name))
        }
    }

    pub(super) async fn handle_group<S>(
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

        let group = match self.backend.get_group(args[0]).await {
            Ok(group) => group,
            Err(StorageError::NotFound) => {
                return reply(session, codes::NO_SUCH_GROUP, "No such newsgroup").await;
            }
            Err(e) => return Err(e.into()),
        };

        let high = self.backend.high_water_mark(&group).await?;
        let low = self.backend.low_water_mark(&group).await?;
        let count = self.backend.article_count(&group).await?;

        session.current_article = None;
        if low != 0 {
            match self.backend.get_article_by_number(&group, low).await {
                Ok(article) => session.current_article = Some(article),
                Err(StorageError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
        }
        let name = group.name.clone();
        session.current_group = Some(group);

        reply(
            session,
            codes::GROUP_SELECTED,
            format!("{count} {low} {high} {name}"),
        )
        .await
    }

    pub(super) async fn handle_listgroup<S>(
        &self,
        session: &mut Session<S>,
        args: &[&str],
    ) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if args.len() > 2 {
            return syntax_error(session).await;
        }

        let group = match args.first() {
            Some(name) => match self.backend.get_group(name).await {
                Ok(group) => group,
                Err(StorageError::NotFound) => {
                    return reply(session, codes::NO_SUCH_GROUP, "No such newsgroup").await;
                }
                Err(e) => return Err(e.into()),
            },
            None => match session.current_group.clone() {
                Some(group) => group,
                None => {
                    return reply(session, codes::NO_GROUP_SELECTED, "No newsgroup selected")
                        .await;
                }
            },
        };

        let (low, high) = match args.get(1) {
            Some(spec) => parse_range(spec).unwrap_or(RANGE_ALL),
            None => RANGE_ALL,
        };

        let high_mark = self.backend.high_water_mark(&group).await?;
        let low_mark = self.backend.low_water_mark(&group).await?;
        let count = self.backend.article_count(&group).await?;
        let numbers = if (low, high) == RANGE_EMPTY {
            Vec::new()
        } else {
            self.backend.get_article_numbers(&group, low, high).await?
        };

        // Same selection effect as GROUP
        session.current_article = None;
        if low_mark != 0 {
            match self.backend.get_article_by_number(&group, low_mark).await {
                Ok(article) => session.current_article = Some(article),
                Err(StorageError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
        }
        let name = group.name.clone();
        session.current_group = Some(group);

        let status = NntpResponse::new(
            codes::GROUP_SELECTED,
            format!("{count} {low_mark} {high_mark} {name} list follows"),
        );
        let lines: Vec<String> = numbers.iter().map(i64::to_string).collect();
        session.conn.write_data_lines(&status, &lines).await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn handle_newgroups<S>(
        &self,
        session: &mut Session<S>,
        args: &[&str],
    ) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if args.len() < 2 || args.len() > 3 {
            return syntax_error(session).await;
        }
        let Some(since) = parse_nntp_date(args[0], args[1]) else {
            return syntax_error(session).await;
        };

        let groups = self.backend.get_new_groups_since(since).await?;
        let mut lines = Vec::with_capacity(groups.len());
        for group in &groups {
            lines.push(self.active_row(group).await?);
        }

        let status = NntpResponse::new(
            codes::NEW_NEWSGROUPS_FOLLOW,
            "list of new newsgroups follows",
        );
        session.conn.write_data_lines(&status, &lines).await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn handle_newnews<S>(
        &self,
        session: &mut Session<S>,
        args: &[&str],
    ) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if args.len() < 3 || args.len() > 4 {
            return syntax_error(session).await;
        }
        let Ok(wildmat) = Wildmat::parse(args[0]) else {
            return syntax_error(session).await;
        };
        let Some(since) = parse_nntp_date(args[1], args[2]) else {
            return syntax_error(session).await;
        };

        let message_ids = self
            .backend
            .get_new_article_msgids_since(since, Some(&wildmat))
            .await?;

        let status = NntpResponse::new(
            codes::NEW_ARTICLE_LIST_FOLLOWS,
            "list of new articles by message-id follows",
        );
        session.conn.write_data_lines(&status, &message_ids).await?;
        Ok(Flow::Continue)
    }
}
