//! NNTP command dispatch and handlers
//!
//! One handler per command verb; all protocol semantics live here. The
//! dispatcher owns the storage backend handle and the posting
//! configuration (server domain, attachment directory) and is shared by
//! every session.

mod article;
mod group;
mod list;
mod over;
mod post;
mod thread;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::error::Result;
use crate::response::{codes, NntpResponse};
use crate::session::{Session, SessionMode};
use crate::storage::StorageBackend;

/// What the session loop should do after a command completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading commands
    Continue,
    /// Close the connection (QUIT)
    Quit,
}

/// Write a single-line reply and keep the session going.
pub(crate) async fn reply<S>(
    session: &mut Session<S>,
    code: u16,
    message: impl Into<String>,
) -> Result<Flow>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    session.reply(code, message).await?;
    Ok(Flow::Continue)
}

/// The `501 Syntax Error` shortcut.
pub(crate) async fn syntax_error<S>(session: &mut Session<S>) -> Result<Flow>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    reply(session, codes::COMMAND_SYNTAX_ERROR, "Syntax Error").await
}

const HELP_TEXT: &[&str] = &[
    "  ARTICLE [message-ID|number]",
    "  BODY [message-ID|number]",
    "  CAPABILITIES [keyword]",
    "  DATE",
    "  GROUP newsgroup",
    "  HEAD [message-ID|number]",
    "  HELP",
    "  IHAVE message-ID",
    "  LAST",
    "  LIST [ACTIVE [wildmat]|NEWSGROUPS [wildmat]|OVERVIEW.FMT]",
    "  LISTGROUP [newsgroup [range]]",
    "  MODE READER",
    "  NEWGROUPS [yy]yymmdd hhmmss [GMT]",
    "  NEWNEWS wildmat [yy]yymmdd hhmmss [GMT]",
    "  NEWTHREADS per_page page_num",
    "  NEXT",
    "  OVER [range|message-ID|number]",
    "  POST",
    "  QUIT",
    "  STAT [message-ID|number]",
    "  THREAD number",
    "  XOVER [range|message-ID|number]",
];

/// Routes command lines to their handlers.
pub struct Dispatcher {
    pub(crate) backend: Arc<dyn StorageBackend>,
    pub(crate) domain: String,
    pub(crate) upload_path: PathBuf,
}

impl Dispatcher {
    /// Build a dispatcher over a backend and posting configuration.
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        domain: impl Into<String>,
        upload_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            domain: domain.into(),
            upload_path: upload_path.into(),
        }
    }

    /// Parse and execute one command line.
    pub async fn dispatch<S>(
        &self,
        session: &mut Session<S>,
        line: &str,
        request_id: u64,
    ) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = parts.first() else {
            return Ok(Flow::Continue);
        };
        let verb = first.to_ascii_uppercase();
        let args = &parts[1..];
        debug!(request_id, %verb, "dispatching");

        match verb.as_str() {
            "CAPABILITIES" => self.handle_capabilities(session).await,
            "DATE" => self.handle_date(session).await,
            "QUIT" => self.handle_quit(session).await,
            "MODE" => self.handle_mode(session, args).await,
            "HELP" => self.handle_help(session).await,
            "LIST" => self.handle_list(session, args).await,
            "GROUP" => self.handle_group(session, args).await,
            "LISTGROUP" => self.handle_listgroup(session, args).await,
            "NEWGROUPS" => self.handle_newgroups(session, args).await,
            "NEWNEWS" => self.handle_newnews(session, args).await,
            "ARTICLE" | "HEAD" | "BODY" | "STAT" => {
                self.handle_article(session, &verb, args).await
            }
            "LAST" => self.handle_last(session, args).await,
            "NEXT" => self.handle_next(session, args).await,
            "POST" => self.handle_post(session, args).await,
            "IHAVE" => self.handle_ihave(session, args).await,
            "OVER" | "XOVER" => self.handle_over(session, args).await,
            "NEWTHREADS" => self.handle_newthreads(session, args).await,
            "THREAD" => self.handle_thread(session, args).await,
            _ => reply(session, codes::COMMAND_NOT_RECOGNIZED, "Unknown command").await,
        }
    }

    async fn handle_capabilities<S>(&self, session: &mut Session<S>) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let lines = session.capabilities.lines();
        session
            .conn
            .write_data_lines(
                &NntpResponse::new(codes::CAPABILITY_LIST, "Capability list:"),
                &lines,
            )
            .await?;
        Ok(Flow::Continue)
    }

    async fn handle_date<S>(&self, session: &mut Session<S>) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let now = Utc::now().format("%Y%m%d%H%M%S");
        reply(session, codes::SERVER_DATE, now.to_string()).await
    }

    async fn handle_quit<S>(&self, session: &mut Session<S>) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        session
            .reply(
                codes::CLOSING_CONNECTION,
                "NNTP Service exits normally, bye!",
            )
            .await?;
        Ok(Flow::Quit)
    }

    async fn handle_mode<S>(&self, session: &mut Session<S>, args: &[&str]) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if args.first().map(|a| a.to_ascii_uppercase()) != Some("READER".to_string()) {
            return syntax_error(session).await;
        }

        session.capabilities.promote_to_reader();
        session.mode = SessionMode::Reader;
        reply(
            session,
            codes::READY_NO_POSTING,
            "Reader mode, posting prohibited",
        )
        .await
    }

    async fn handle_help<S>(&self, session: &mut Session<S>) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        session
            .conn
            .write_data_lines(
                &NntpResponse::new(codes::HELP_TEXT_FOLLOWS, "Legal commands"),
                HELP_TEXT,
            )
            .await?;
        Ok(Flow::Continue)
    }
}
