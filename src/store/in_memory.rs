use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::types::{
    KnowledgeBaseEntry, KnowledgeBaseQuery, KnowledgeBaseUpdate, Message, NewKnowledgeBaseEntry,
    PageQuery,
};

use super::{DashboardStore, DuplicateEntry};

/// Process-local store. Records are kept in insertion order, which breaks
/// ties between identical timestamps.
#[derive(Debug)]
pub struct InMemoryStore {
    messages: Arc<RwLock<Vec<Message>>>,
    entries: Arc<RwLock<Vec<KnowledgeBaseEntry>>>,
    seq: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
            entries: Arc::new(RwLock::new(Vec::new())),
            seq: AtomicU64::new(1),
        }
    }
}

impl InMemoryStore {
    fn next_id(&self, prefix: &str) -> String {
        let id = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{id}")
    }
}

#[async_trait]
impl DashboardStore for InMemoryStore {
    async fn create_message(&self, question: &str, answer: &str) -> anyhow::Result<Message> {
        let now = Utc::now();
        let message = Message {
            id: self.next_id("msg"),
            question: question.to_owned(),
            answer: answer.to_owned(),
            created_at: now,
            updated_at: now,
            knowledge_base_entry: None,
        };
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn get_message(&self, id: &str) -> anyhow::Result<Option<Message>> {
        let message = self
            .messages
            .read()
            .await
            .iter()
            .find(|message| message.id == id)
            .cloned();
        Ok(message)
    }

    async fn list_messages(&self, page: PageQuery) -> anyhow::Result<Vec<Message>> {
        let mut messages = self
            .messages
            .read()
            .await
            .iter()
            .rev()
            .cloned()
            .collect::<Vec<_>>();
        messages.sort_by_key(|message| std::cmp::Reverse(message.created_at));

        let entries = self.entries.read().await;
        let page = messages
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .map(|mut message| {
                message.knowledge_base_entry = entries
                    .iter()
                    .find(|entry| entry.message_id.as_deref() == Some(message.id.as_str()))
                    .cloned();
                message
            })
            .collect();
        Ok(page)
    }

    async fn find_entry_by_message(
        &self,
        message_id: &str,
    ) -> anyhow::Result<Option<KnowledgeBaseEntry>> {
        let entry = self
            .entries
            .read()
            .await
            .iter()
            .find(|entry| entry.message_id.as_deref() == Some(message_id))
            .cloned();
        Ok(entry)
    }

    async fn create_entry(
        &self,
        entry: NewKnowledgeBaseEntry,
    ) -> anyhow::Result<KnowledgeBaseEntry> {
        let mut entries = self.entries.write().await;
        if entries
            .iter()
            .any(|existing| existing.message_id.as_deref() == Some(entry.message_id.as_str()))
        {
            return Err(DuplicateEntry {
                message_id: entry.message_id,
            }
            .into());
        }

        let now = Utc::now();
        let created = KnowledgeBaseEntry {
            id: self.next_id("kb"),
            question: entry.question,
            answer: entry.answer,
            title: entry.title,
            tags: entry.tags,
            is_pinned: false,
            category: entry.category,
            message_id: Some(entry.message_id),
            created_at: now,
            updated_at: now,
        };
        entries.push(created.clone());
        Ok(created)
    }

    async fn get_entry(&self, id: &str) -> anyhow::Result<Option<KnowledgeBaseEntry>> {
        let entry = self
            .entries
            .read()
            .await
            .iter()
            .find(|entry| entry.id == id)
            .cloned();
        Ok(entry)
    }

    async fn list_entries(
        &self,
        query: &KnowledgeBaseQuery,
    ) -> anyhow::Result<Vec<KnowledgeBaseEntry>> {
        let mut entries = self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        Ok(entries
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn update_entry(
        &self,
        id: &str,
        update: KnowledgeBaseUpdate,
    ) -> anyhow::Result<Option<KnowledgeBaseEntry>> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.iter_mut().find(|entry| entry.id == id) else {
            return Ok(None);
        };
        update.apply(entry, Utc::now());
        Ok(Some(entry.clone()))
    }

    async fn delete_entry(&self, id: &str) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().await;
        let initial_len = entries.len();
        entries.retain(|entry| entry.id != id);
        Ok(entries.len() != initial_len)
    }
}
