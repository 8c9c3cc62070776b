mod in_memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{
    KnowledgeBaseEntry, KnowledgeBaseQuery, KnowledgeBaseUpdate, Message, NewKnowledgeBaseEntry,
    PageQuery,
};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Returned by `create_entry` when the message already has an entry.
#[derive(Debug, Error)]
#[error("message {message_id} already has a knowledge base entry")]
pub struct DuplicateEntry {
    pub message_id: String,
}

/// Persistence for chat history and the curated knowledge base.
#[async_trait]
pub trait DashboardStore: Send + Sync {
    async fn create_message(&self, question: &str, answer: &str) -> anyhow::Result<Message>;

    async fn get_message(&self, id: &str) -> anyhow::Result<Option<Message>>;

    /// Newest first, each with its knowledge-base entry attached when saved.
    async fn list_messages(&self, page: PageQuery) -> anyhow::Result<Vec<Message>>;

    async fn find_entry_by_message(
        &self,
        message_id: &str,
    ) -> anyhow::Result<Option<KnowledgeBaseEntry>>;

    async fn create_entry(&self, entry: NewKnowledgeBaseEntry)
    -> anyhow::Result<KnowledgeBaseEntry>;

    async fn get_entry(&self, id: &str) -> anyhow::Result<Option<KnowledgeBaseEntry>>;

    /// Pinned entries first, then newest first.
    async fn list_entries(
        &self,
        query: &KnowledgeBaseQuery,
    ) -> anyhow::Result<Vec<KnowledgeBaseEntry>>;

    async fn update_entry(
        &self,
        id: &str,
        update: KnowledgeBaseUpdate,
    ) -> anyhow::Result<Option<KnowledgeBaseEntry>>;

    async fn delete_entry(&self, id: &str) -> anyhow::Result<bool>;
}
