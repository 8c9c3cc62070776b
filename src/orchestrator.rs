use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    error::{DashboardError, ProviderError, Result},
    model::{ModelProvider, ModelRequest},
    moderation::{ContentModerator, SuggestedAction},
    store::{DashboardStore, DuplicateEntry},
    types::{
        ChatReply, KnowledgeBaseEntry, KnowledgeBaseQuery, KnowledgeBaseUpdate, Message,
        NewKnowledgeBaseEntry, PageQuery, SaveEntryRequest, non_empty,
    },
};

pub const ASSISTANT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant for an internal team dashboard. Provide clear, concise, and helpful responses to team members' questions. Be professional but friendly.";

pub const DEFAULT_MESSAGE_LIMIT: usize = 10;
pub const DEFAULT_ENTRY_LIMIT: usize = 50;

pub struct DashboardOrchestrator {
    moderator: Arc<ContentModerator>,
    model: Arc<dyn ModelProvider>,
    store: Arc<dyn DashboardStore>,
}

impl DashboardOrchestrator {
    pub fn new(
        moderator: Arc<ContentModerator>,
        model: Arc<dyn ModelProvider>,
        store: Arc<dyn DashboardStore>,
    ) -> Self {
        Self {
            moderator,
            model,
            store,
        }
    }

    pub fn moderator(&self) -> &ContentModerator {
        &self.moderator
    }

    /// Moderates the question, asks the model, and records the exchange.
    /// The stored question is always the original text, even when the model
    /// saw a sanitized copy.
    pub async fn submit_question(&self, question: &str) -> Result<ChatReply> {
        let verdict = self.moderator.evaluate(question);
        debug!(
            action = verdict.suggested_action.as_str(),
            confidence = verdict.confidence,
            flagged = verdict.flagged_words.len(),
            "moderated chat submission"
        );

        let prompt = match verdict.suggested_action {
            SuggestedAction::Block => {
                let reason = verdict.reason.unwrap_or_default();
                warn!(%reason, "chat submission blocked");
                return Err(DashboardError::Blocked(reason));
            }
            SuggestedAction::Warn => self.moderator.sanitize(question),
            SuggestedAction::Allow => question.to_owned(),
        };

        let answer = self
            .model
            .complete(ModelRequest {
                system_prompt: ASSISTANT_SYSTEM_PROMPT.to_owned(),
                user_prompt: prompt,
                temperature: None,
                max_tokens: None,
            })
            .await
            .map_err(|error| {
                warn!(?error, "assistant completion failed");
                ProviderError::classify(&error)
            })?;

        let message = self.store.create_message(question, &answer).await?;
        info!(message_id = %message.id, "recorded chat exchange");
        Ok(message.into())
    }

    pub async fn list_messages(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Message>> {
        let page = PageQuery {
            limit: limit.unwrap_or(DEFAULT_MESSAGE_LIMIT),
            offset: offset.unwrap_or(0),
        };
        Ok(self.store.list_messages(page).await?)
    }

    /// Curates a chat exchange into the knowledge base. The title and every
    /// tag are moderated independently; a single block rejects the whole
    /// request before anything is read or written.
    pub async fn save_to_knowledge_base(
        &self,
        request: SaveEntryRequest,
    ) -> Result<KnowledgeBaseEntry> {
        let message_id = request.message_id.trim();
        if message_id.is_empty() {
            return Err(DashboardError::InvalidInput(
                "Message ID is required".to_owned(),
            ));
        }

        let tags = request.tags.unwrap_or_default();
        self.moderate_curation(request.title.as_deref(), &tags)?;

        let message = self
            .store
            .get_message(message_id)
            .await?
            .ok_or_else(|| DashboardError::NotFound("Message not found".to_owned()))?;

        if self.store.find_entry_by_message(message_id).await?.is_some() {
            return Err(already_saved());
        }

        let entry = self
            .store
            .create_entry(NewKnowledgeBaseEntry {
                question: message.question,
                answer: message.answer,
                title: request.title.and_then(non_empty),
                tags,
                category: request.category.and_then(non_empty),
                message_id: message.id,
            })
            .await
            .map_err(|error| {
                // A concurrent save can win between the lookup and the insert.
                if error.downcast_ref::<DuplicateEntry>().is_some() {
                    already_saved()
                } else {
                    DashboardError::Storage(error)
                }
            })?;
        info!(entry_id = %entry.id, "saved knowledge base entry");
        Ok(entry)
    }

    pub async fn list_entries(
        &self,
        mut query: KnowledgeBaseQuery,
    ) -> Result<Vec<KnowledgeBaseEntry>> {
        query.search = query.search.and_then(non_empty);
        query.category = query.category.and_then(non_empty);
        Ok(self.store.list_entries(&query).await?)
    }

    pub async fn update_entry(
        &self,
        id: &str,
        update: KnowledgeBaseUpdate,
    ) -> Result<KnowledgeBaseEntry> {
        self.moderate_curation(
            update.title.as_deref(),
            update.tags.as_deref().unwrap_or_default(),
        )?;

        self.store
            .update_entry(id, update)
            .await?
            .ok_or_else(|| DashboardError::NotFound("Knowledge base entry not found".to_owned()))
    }

    pub async fn delete_entry(&self, id: &str) -> Result<()> {
        if self.store.delete_entry(id).await? {
            info!(entry_id = %id, "deleted knowledge base entry");
            Ok(())
        } else {
            Err(DashboardError::NotFound(
                "Knowledge base entry not found".to_owned(),
            ))
        }
    }

    /// An absent or empty title is not moderated; anything else, including
    /// whitespace, is.
    fn moderate_curation(&self, title: Option<&str>, tags: &[String]) -> Result<()> {
        if let Some(title) = title.filter(|title| !title.is_empty()) {
            if self.moderator.evaluate(title).is_blocked() {
                warn!("knowledge base title blocked by moderation");
                return Err(DashboardError::InvalidInput(
                    "Title contains inappropriate content".to_owned(),
                ));
            }
        }
        if tags.iter().any(|tag| self.moderator.evaluate(tag).is_blocked()) {
            warn!("knowledge base tags blocked by moderation");
            return Err(DashboardError::InvalidInput(
                "Tags contain inappropriate content".to_owned(),
            ));
        }
        Ok(())
    }
}

fn already_saved() -> DashboardError {
    DashboardError::Conflict("This message is already saved to the knowledge base".to_owned())
}
