//! SQLite storage backend
//!
//! Articles persist with their header multimap serialized as JSON, so
//! Message-ID lookups run as `json_extract` queries without a separate
//! index table. Per-group article numbers are assigned inside the insert
//! statement (`max + 1` scoped to the group), and SQLite's write locking
//! keeps the numbering invariant under concurrent sessions.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::{NewArticle, StorageBackend, StorageError, StorageResult};
use crate::article::{Article, Attachment, Group, HeaderMap};
use crate::wildmat::Wildmat;

/// JSON path of the first Message-Id value inside the header column.
const MSGID_PATH: &str = "$.\"Message-Id\"[0]";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS groups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        group_name TEXT NOT NULL UNIQUE,
        description TEXT,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at INTEGER NOT NULL,
        header TEXT NOT NULL,
        body TEXT NOT NULL,
        thread TEXT
    )",
    "CREATE TABLE IF NOT EXISTS articles_to_groups (
        article_id INTEGER NOT NULL REFERENCES articles(id),
        group_id INTEGER NOT NULL REFERENCES groups(id),
        article_number INTEGER NOT NULL,
        PRIMARY KEY (group_id, article_number)
    )",
    "CREATE TABLE IF NOT EXISTS attachments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        article_id INTEGER NOT NULL REFERENCES articles(id),
        content_type TEXT NOT NULL,
        file_name TEXT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_articles_message_id
        ON articles (json_extract(header, '$.\"Message-Id\"[0]'))",
];

/// SQLite-backed [`StorageBackend`].
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (creating if missing) a database file and ensure the schema.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Fully in-memory backend for tests and throwaway servers.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(StorageError::Database)?
            .busy_timeout(Duration::from_secs(5));
        // A single eternal connection: each sqlite :memory: connection is
        // its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> StorageResult<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Create a newsgroup. Not part of the dispatcher contract; used by
    /// operator tooling and tests.
    pub async fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> StorageResult<Group> {
        let created_at = Utc::now().timestamp();
        let result = sqlx::query(
            "INSERT INTO groups (group_name, description, created_at) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(description)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Group {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at,
        })
    }

    fn group_from_row(row: &sqlx::sqlite::SqliteRow) -> StorageResult<Group> {
        Ok(Group {
            id: row.try_get("id")?,
            name: row.try_get("group_name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn article_from_row(
        &self,
        row: &sqlx::sqlite::SqliteRow,
        number: i64,
    ) -> StorageResult<Article> {
        let id: i64 = row.try_get("id")?;
        let header_json: String = row.try_get("header")?;
        let headers = HeaderMap::from_json(&header_json)
            .map_err(|e| StorageError::Corrupt(format!("article {id} header: {e}")))?;

        let attachments = sqlx::query(
            "SELECT content_type, file_name FROM attachments WHERE article_id = ? ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| {
            Ok(Attachment {
                content_type: row.try_get("content_type")?,
                file_name: row.try_get("file_name")?,
            })
        })
        .collect::<StorageResult<Vec<_>>>()?;

        Ok(Article {
            id,
            created_at: row.try_get("created_at")?,
            headers,
            body: row.try_get("body")?,
            thread: row.try_get("thread")?,
            number,
            attachments,
        })
    }

    /// WHERE fragment and binds for a sentinel range over article_number.
    /// Returns `None` for the empty range.
    fn range_filter(low: i64, high: i64) -> Option<(&'static str, Vec<i64>)> {
        match (low, high) {
            (-1, -1) => None,
            (0, 0) => Some(("", Vec::new())),
            (-1, n) => Some((" AND atg.article_number = ?", vec![n])),
            (n, -1) => Some((" AND atg.article_number >= ?", vec![n])),
            (n, m) => Some((" AND atg.article_number BETWEEN ? AND ?", vec![n, m])),
        }
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn list_groups(&self) -> StorageResult<Vec<Group>> {
        let rows = sqlx::query("SELECT id, group_name, description, created_at FROM groups ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::group_from_row).collect()
    }

    async fn list_groups_by_pattern(&self, pattern: &Wildmat) -> StorageResult<Vec<Group>> {
        Ok(self
            .list_groups()
            .await?
            .into_iter()
            .filter(|g| pattern.matches(&g.name))
            .collect())
    }

    async fn get_group(&self, name: &str) -> StorageResult<Group> {
        let row = sqlx::query(
            "SELECT id, group_name, description, created_at FROM groups WHERE group_name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;
        Self::group_from_row(&row)
    }

    async fn get_new_groups_since(&self, since: i64) -> StorageResult<Vec<Group>> {
        let rows = sqlx::query(
            "SELECT id, group_name, description, created_at FROM groups
             WHERE created_at > ? ORDER BY id",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::group_from_row).collect()
    }

    async fn article_count(&self, group: &Group) -> StorageResult<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM articles_to_groups WHERE group_id = ?")
                .bind(group.id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn low_water_mark(&self, group: &Group) -> StorageResult<i64> {
        let mark: Option<i64> = sqlx::query_scalar(
            "SELECT min(article_number) FROM articles_to_groups WHERE group_id = ?",
        )
        .bind(group.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(mark.unwrap_or(0))
    }

    async fn high_water_mark(&self, group: &Group) -> StorageResult<i64> {
        let mark: Option<i64> = sqlx::query_scalar(
            "SELECT max(article_number) FROM articles_to_groups WHERE group_id = ?",
        )
        .bind(group.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(mark.unwrap_or(0))
    }

    async fn save_article(&self, article: &NewArticle, groups: &[String]) -> StorageResult<i64> {
        let message_id = article
            .headers
            .get_first("Message-Id")
            .ok_or_else(|| StorageError::Rejected("article has no Message-ID".to_string()))?
            .to_string();

        let group_names: Vec<String> = groups
            .iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();
        if group_names.is_empty() {
            return Err(StorageError::Rejected("no newsgroups specified".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT 1 FROM articles WHERE json_extract(header, '{MSGID_PATH}') = ?"
        ))
        .bind(&message_id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_some() {
            return Err(StorageError::Duplicate(message_id));
        }

        let mut group_ids = Vec::with_capacity(group_names.len());
        for name in &group_names {
            let id: Option<i64> = sqlx::query_scalar("SELECT id FROM groups WHERE group_name = ?")
                .bind(name)
                .fetch_optional(&mut *tx)
                .await?;
            group_ids.push(id.ok_or_else(|| StorageError::NoSuchGroup(name.clone()))?);
        }

        let result = sqlx::query(
            "INSERT INTO articles (created_at, header, body, thread) VALUES (?, ?, ?, ?)",
        )
        .bind(Utc::now().timestamp())
        .bind(article.headers.to_json())
        .bind(&article.body)
        .bind(&article.thread)
        .execute(&mut *tx)
        .await?;
        let article_id = result.last_insert_rowid();

        for group_id in group_ids {
            sqlx::query(
                "INSERT INTO articles_to_groups (article_id, group_id, article_number)
                 VALUES (?, ?, (SELECT ifnull(max(article_number), 0) + 1
                                FROM articles_to_groups WHERE group_id = ?))",
            )
            .bind(article_id)
            .bind(group_id)
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        }

        for attachment in &article.attachments {
            sqlx::query(
                "INSERT INTO attachments (article_id, content_type, file_name) VALUES (?, ?, ?)",
            )
            .bind(article_id)
            .bind(&attachment.content_type)
            .bind(&attachment.file_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(article_id)
    }

    async fn get_article_by_msgid(&self, message_id: &str) -> StorageResult<Article> {
        let row = sqlx::query(&format!(
            "SELECT id, created_at, header, body, thread FROM articles
             WHERE json_extract(header, '{MSGID_PATH}') = ?"
        ))
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        let id: i64 = row.try_get("id")?;
        let number: Option<i64> = sqlx::query_scalar(
            "SELECT article_number FROM articles_to_groups WHERE article_id = ? LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.article_from_row(&row, number.unwrap_or(0)).await
    }

    async fn get_article_by_number(&self, group: &Group, number: i64) -> StorageResult<Article> {
        let row = sqlx::query(
            "SELECT a.id, a.created_at, a.header, a.body, a.thread
             FROM articles a
             INNER JOIN articles_to_groups atg ON atg.article_id = a.id
             WHERE atg.group_id = ? AND atg.article_number = ?",
        )
        .bind(group.id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        self.article_from_row(&row, number).await
    }

    async fn get_article_numbers(
        &self,
        group: &Group,
        low: i64,
        high: i64,
    ) -> StorageResult<Vec<i64>> {
        let Some((filter, binds)) = Self::range_filter(low, high) else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "SELECT atg.article_number FROM articles_to_groups atg
             WHERE atg.group_id = ?{filter} ORDER BY atg.article_number"
        );
        let mut query = sqlx::query_scalar(&sql).bind(group.id);
        for bind in binds {
            query = query.bind(bind);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn get_new_article_msgids_since(
        &self,
        since: i64,
        pattern: Option<&Wildmat>,
    ) -> StorageResult<Vec<String>> {
        match pattern {
            None => {
                let ids: Vec<Option<String>> = sqlx::query_scalar(&format!(
                    "SELECT json_extract(header, '{MSGID_PATH}') FROM articles
                     WHERE created_at > ? ORDER BY id"
                ))
                .bind(since)
                .fetch_all(&self.pool)
                .await?;
                Ok(ids.into_iter().flatten().collect())
            }
            Some(wildmat) => {
                let rows = sqlx::query(&format!(
                    "SELECT json_extract(a.header, '{MSGID_PATH}') AS message_id, g.group_name
                     FROM articles a
                     INNER JOIN articles_to_groups atg ON atg.article_id = a.id
                     INNER JOIN groups g ON g.id = atg.group_id
                     WHERE a.created_at > ? ORDER BY a.id"
                ))
                .bind(since)
                .fetch_all(&self.pool)
                .await?;

                let mut seen = HashSet::new();
                let mut ids = Vec::new();
                for row in rows {
                    let message_id: Option<String> = row.try_get("message_id")?;
                    let group_name: String = row.try_get("group_name")?;
                    if let Some(message_id) = message_id {
                        if wildmat.matches(&group_name) && seen.insert(message_id.clone()) {
                            ids.push(message_id);
                        }
                    }
                }
                Ok(ids)
            }
        }
    }

    async fn previous_article(&self, group: &Group, article: &Article) -> StorageResult<Article> {
        let row = sqlx::query(
            "SELECT a.id, a.created_at, a.header, a.body, a.thread, atg.article_number
             FROM articles a
             INNER JOIN articles_to_groups atg ON atg.article_id = a.id
             WHERE atg.group_id = ? AND atg.article_number < ?
             ORDER BY atg.article_number DESC LIMIT 1",
        )
        .bind(group.id)
        .bind(article.number)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        let number: i64 = row.try_get("article_number")?;
        self.article_from_row(&row, number).await
    }

    async fn next_article(&self, group: &Group, article: &Article) -> StorageResult<Article> {
        let row = sqlx::query(
            "SELECT a.id, a.created_at, a.header, a.body, a.thread, atg.article_number
             FROM articles a
             INNER JOIN articles_to_groups atg ON atg.article_id = a.id
             WHERE atg.group_id = ? AND atg.article_number > ?
             ORDER BY atg.article_number ASC LIMIT 1",
        )
        .bind(group.id)
        .bind(article.number)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        let number: i64 = row.try_get("article_number")?;
        self.article_from_row(&row, number).await
    }

    async fn articles_in_range(
        &self,
        group: &Group,
        low: i64,
        high: i64,
    ) -> StorageResult<Vec<Article>> {
        let Some((filter, binds)) = Self::range_filter(low, high) else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "SELECT a.id, a.created_at, a.header, a.body, a.thread, atg.article_number
             FROM articles a
             INNER JOIN articles_to_groups atg ON atg.article_id = a.id
             WHERE atg.group_id = ?{filter} ORDER BY atg.article_number"
        );
        let mut query = sqlx::query(&sql).bind(group.id);
        for bind in binds {
            query = query.bind(bind);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in &rows {
            let number: i64 = row.try_get("article_number")?;
            articles.push(self.article_from_row(row, number).await?);
        }
        Ok(articles)
    }

    async fn new_threads(
        &self,
        group: &Group,
        per_page: i64,
        page_num: i64,
    ) -> StorageResult<Vec<i64>> {
        let limit = per_page.max(0);
        let offset = limit * (page_num - 1).max(0);
        Ok(sqlx::query_scalar(
            "SELECT atg.article_number
             FROM articles a
             INNER JOIN articles_to_groups atg ON atg.article_id = a.id
             WHERE atg.group_id = ? AND a.thread IS NULL
             ORDER BY a.created_at DESC, a.id DESC
             LIMIT ? OFFSET ?",
        )
        .bind(group.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn thread_members(&self, group: &Group, root_number: i64) -> StorageResult<Vec<i64>> {
        let article = self.get_article_by_number(group, root_number).await?;
        // A reply resolves to its anchor so THREAD works from any member.
        let root_msgid = article
            .thread
            .clone()
            .unwrap_or_else(|| article.message_id().to_string());

        Ok(sqlx::query_scalar(&format!(
            "SELECT atg.article_number
             FROM articles a
             INNER JOIN articles_to_groups atg ON atg.article_id = a.id
             WHERE atg.group_id = ?
               AND (a.thread = ? OR json_extract(a.header, '{MSGID_PATH}') = ?)
             ORDER BY atg.article_number"
        ))
        .bind(group.id)
        .bind(&root_msgid)
        .bind(&root_msgid)
        .fetch_all(&self.pool)
        .await?)
    }
}
