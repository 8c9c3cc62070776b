use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::types::{
    KnowledgeBaseEntry, KnowledgeBaseQuery, KnowledgeBaseUpdate, Message, NewKnowledgeBaseEntry,
    PageQuery,
};

use super::{DashboardStore, DuplicateEntry};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS messages (
         id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::text,
         question TEXT NOT NULL,
         answer TEXT NOT NULL,
         created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
         updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
     )",
    "CREATE TABLE IF NOT EXISTS knowledge_base_entries (
         id TEXT PRIMARY KEY DEFAULT gen_random_uuid()::text,
         question TEXT NOT NULL,
         answer TEXT NOT NULL,
         title TEXT,
         tags TEXT,
         is_pinned BOOLEAN NOT NULL DEFAULT FALSE,
         category TEXT,
         message_id TEXT UNIQUE REFERENCES messages (id) ON DELETE SET NULL,
         created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
         updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
     )",
    "CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages (created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_kb_entries_pinned_created
         ON knowledge_base_entries (is_pinned DESC, created_at DESC)",
];

const ENTRY_COLUMNS: &str = "id, question, answer, title, tags, is_pinned, category, message_id, created_at, updated_at";

type MessageRow = (String, String, String, DateTime<Utc>, DateTime<Utc>);

type EntryRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    bool,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Idempotent; runs on every startup.
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn fetch_entry(&self, sql: &str, key: &str) -> anyhow::Result<Option<KnowledgeBaseEntry>> {
        let row = sqlx::query_as::<_, EntryRow>(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(entry_from_row).transpose()
    }
}

#[async_trait]
impl DashboardStore for PostgresStore {
    async fn create_message(&self, question: &str, answer: &str) -> anyhow::Result<Message> {
        let row = sqlx::query_as::<_, MessageRow>(
            "INSERT INTO messages (question, answer)
             VALUES ($1, $2)
             RETURNING id, question, answer, created_at, updated_at",
        )
        .bind(question)
        .bind(answer)
        .fetch_one(&self.pool)
        .await?;

        Ok(message_from_row(row))
    }

    async fn get_message(&self, id: &str) -> anyhow::Result<Option<Message>> {
        let message = sqlx::query_as::<_, MessageRow>(
            "SELECT id, question, answer, created_at, updated_at
             FROM messages
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(message_from_row);

        Ok(message)
    }

    async fn list_messages(&self, page: PageQuery) -> anyhow::Result<Vec<Message>> {
        let mut messages = sqlx::query_as::<_, MessageRow>(
            "SELECT id, question, answer, created_at, updated_at
             FROM messages
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(to_sql_count(page.limit))
        .bind(to_sql_count(page.offset))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(message_from_row)
        .collect::<Vec<_>>();

        if messages.is_empty() {
            return Ok(messages);
        }

        let ids = messages
            .iter()
            .map(|message| message.id.clone())
            .collect::<Vec<_>>();
        let entries = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS}
             FROM knowledge_base_entries
             WHERE message_id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(entry_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;

        for message in &mut messages {
            message.knowledge_base_entry = entries
                .iter()
                .find(|entry| entry.message_id.as_deref() == Some(message.id.as_str()))
                .cloned();
        }

        Ok(messages)
    }

    async fn find_entry_by_message(
        &self,
        message_id: &str,
    ) -> anyhow::Result<Option<KnowledgeBaseEntry>> {
        self.fetch_entry(
            &format!("SELECT {ENTRY_COLUMNS} FROM knowledge_base_entries WHERE message_id = $1"),
            message_id,
        )
        .await
    }

    async fn create_entry(
        &self,
        entry: NewKnowledgeBaseEntry,
    ) -> anyhow::Result<KnowledgeBaseEntry> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "INSERT INTO knowledge_base_entries
             (question, answer, title, tags, category, message_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(entry.question)
        .bind(entry.answer)
        .bind(entry.title)
        .bind(encode_tags(&entry.tags)?)
        .bind(entry.category)
        .bind(entry.message_id.clone())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            if error
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                anyhow::Error::from(DuplicateEntry {
                    message_id: entry.message_id,
                })
            } else {
                error.into()
            }
        })?;

        entry_from_row(row)
    }

    async fn get_entry(&self, id: &str) -> anyhow::Result<Option<KnowledgeBaseEntry>> {
        self.fetch_entry(
            &format!("SELECT {ENTRY_COLUMNS} FROM knowledge_base_entries WHERE id = $1"),
            id,
        )
        .await
    }

    async fn list_entries(
        &self,
        query: &KnowledgeBaseQuery,
    ) -> anyhow::Result<Vec<KnowledgeBaseEntry>> {
        let search = query
            .search
            .as_deref()
            .map(|search| format!("%{}%", escape_like(search)));

        sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS}
             FROM knowledge_base_entries
             WHERE ($1::text IS NULL
                    OR question ILIKE $1
                    OR answer ILIKE $1
                    OR title ILIKE $1)
               AND ($2::text IS NULL OR category = $2)
               AND (NOT $3 OR is_pinned)
             ORDER BY is_pinned DESC, created_at DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(search)
        .bind(query.category.as_deref())
        .bind(query.pinned_only)
        .bind(to_sql_count(query.limit))
        .bind(to_sql_count(query.offset))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(entry_from_row)
        .collect()
    }

    async fn update_entry(
        &self,
        id: &str,
        update: KnowledgeBaseUpdate,
    ) -> anyhow::Result<Option<KnowledgeBaseEntry>> {
        let Some(mut entry) = self.get_entry(id).await? else {
            return Ok(None);
        };
        update.apply(&mut entry, Utc::now());

        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "UPDATE knowledge_base_entries
             SET title = $2, tags = $3, category = $4, is_pinned = $5, updated_at = $6
             WHERE id = $1
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(id)
        .bind(entry.title)
        .bind(encode_tags(&entry.tags)?)
        .bind(entry.category)
        .bind(entry.is_pinned)
        .bind(entry.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(entry_from_row).transpose()
    }

    async fn delete_entry(&self, id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM knowledge_base_entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn message_from_row((id, question, answer, created_at, updated_at): MessageRow) -> Message {
    Message {
        id,
        question,
        answer,
        created_at,
        updated_at,
        knowledge_base_entry: None,
    }
}

fn entry_from_row(
    (id, question, answer, title, tags, is_pinned, category, message_id, created_at, updated_at): EntryRow,
) -> anyhow::Result<KnowledgeBaseEntry> {
    Ok(KnowledgeBaseEntry {
        id,
        question,
        answer,
        title,
        tags: decode_tags(tags.as_deref())?,
        is_pinned,
        category,
        message_id,
        created_at,
        updated_at,
    })
}

/// Tags live in a JSON text column; an empty list is stored as NULL.
fn encode_tags(tags: &[String]) -> anyhow::Result<Option<String>> {
    if tags.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(tags)?))
}

fn decode_tags(raw: Option<&str>) -> anyhow::Result<Vec<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(raw) => Ok(serde_json::from_str(raw)?),
    }
}

/// Counts past `i64::MAX` saturate rather than wrap negative.
fn to_sql_count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for character in raw.chars() {
        if matches!(character, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}
