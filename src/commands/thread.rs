//! Threaded discussion extensions: NEWTHREADS and THREAD

use tokio::io::{AsyncRead, AsyncWrite};

use super::{reply, syntax_error, Dispatcher, Flow};
use crate::error::Result;
use crate::response::{codes, NntpResponse};
use crate::session::Session;
use crate::storage::StorageError;

impl Dispatcher {
    pub(super) async fn handle_newthreads<S>(
        &self,
        session: &mut Session<S>,
        args: &[&str],
    ) -> Result<Flow>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if args.len() != 2 {
            return syntax_error(session).await;
        }
        let (Ok(per_page), Ok(page_num)) = (args[0].parse::<i64>(), args[1].parse::<i64>())
        else {
            return syntax_error(session).await;
        };
        let Some(group) = session.current_group.clone() else {
            return reply(session, codes::NO_GROUP_SELECTED, "No newsgroup selected").await;
        };

        let numbers = self.backend.new_threads(&group, per_page, page_num).await?;
        let lines: Vec<String> = numbers.iter().map(i64::to_string).collect();
        let status = NntpResponse::new(codes::NEW_THREADS_FOLLOW, "New thread numbers follows");
        session.conn.write_data_lines(&status, &lines).await?;
        Ok(Flow::Continue)
    }

    pub(super) async fn handle_thread<S>(
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
        let Ok(number) = args[0].parse::<i64>() else {
            return syntax_error(session).await;
        };
        let Some(group) = session.current_group.clone() else {
            return reply(session, codes::NO_GROUP_SELECTED, "No newsgroup selected").await;
        };

        let members = match self.backend.thread_members(&group, number).await {
            Ok(members) => members,
            Err(StorageError::NotFound) => {
                return reply(
                    session,
                    codes::NO_SUCH_ARTICLE_NUMBER,
                    "No article with that number",
                )
                .await;
            }
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<String> = members.iter().map(i64::to_string).collect();
        let status = NntpResponse::new(codes::THREAD_FOLLOWS, "Thread articles follows");
        session.conn.write_data_lines(&status, &lines).await?;
        Ok(Flow::Continue)
    }
}
