//! The LIST command family: ACTIVE, NEWSGROUPS, OVERVIEW.FMT

use tokio::io::{AsyncRead, AsyncWrite};

use super::{syntax_error, Dispatcher, Flow};
use crate::article::Group;
use crate::error::Result;
use crate::response::{codes, NntpResponse};
use crate::session::Session;
use crate::wildmat::Wildmat;

/// Overview field order advertised by LIST OVERVIEW.FMT (RFC 3977
/// Section 8.4); OVER rows follow this layout.
const OVERVIEW_FMT: &[&str] = &[
    "Subject:",
    "From:",
    "Date:",
    "Message-ID:",
    "References:",
    ":bytes",
    ":lines",
];

impl Dispatcher {
    pub(super) async fn handle_list<S>(
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
        let keyword = args.first().map(|a| a.to_ascii_uppercase());
        let wildmat = match args.get(1) {
            Some(raw) => match Wildmat::parse(raw) {
                Ok(wildmat) => Some(wildmat),
                Err(_) => return syntax_error(session).await,
            },
            None => None,
        };

        match keyword.as_deref() {
            None | Some("ACTIVE") => {
                let groups = self.groups_for(wildmat.as_ref()).await?;
                let mut lines = Vec::with_capacity(groups.len());
                for group in &groups {
                    lines.push(self.active_row(group).await?);
                }
                self.send_list(session, lines).await
            }
            Some("NEWSGROUPS") => {
                let groups = self.groups_for(wildmat.as_ref()).await?;
                let lines: Vec<String> = groups
                    .iter()
                    .map(|g| {
                        format!(
                            "{} {}",
                            g.name,
                            g.description.as_deref().unwrap_or("No description")
                        )
                    })
                    .collect();
                self.send_list(session, lines).await
            }
            Some("OVERVIEW.FMT") => {
                let status = NntpResponse::new(
                    codes::LIST_INFORMATION_FOLLOWS,
                    "Order of fields in overview database.",
                );
                session.conn.write_data_lines(&status, OVERVIEW_FMT).await?;
                Ok(Flow::Continue)
            }
            Some(_) => syntax_error(session).await,
        }
    }

    async fn groups_for(&self, pattern: Option<&Wildmat>) -> Result<Vec<Group>> {
        match pattern {
            Some(wildmat) => Ok(self.backend.list_groups_by_pattern(wildmat).await?),
            None => Ok(self.backend.list_groups().await?),
        }
    }

    async fn send_list<S>(&self, session: &mut Session<S>, lines: Vec<String>) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let status = NntpResponse::new(
            codes::LIST_INFORMATION_FOLLOWS,
            "list of newsgroups follows",
        );
        session.conn.write_data_lines(&status, &lines).await?;
        Ok(Flow::Continue)
    }
}
