use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_base_entry: Option<KnowledgeBaseEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub category: Option<String>,
    pub message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewKnowledgeBaseEntry {
    pub question: String,
    pub answer: String,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub message_id: String,
}

/// Partial update. `None` leaves a field as is; an empty title or category
/// clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseUpdate {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub is_pinned: Option<bool>,
}

impl KnowledgeBaseUpdate {
    pub fn apply(self, entry: &mut KnowledgeBaseEntry, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            entry.title = non_empty(title);
        }
        if let Some(tags) = self.tags {
            entry.tags = tags;
        }
        if let Some(category) = self.category {
            entry.category = non_empty(category);
        }
        if let Some(is_pinned) = self.is_pinned {
            entry.is_pinned = is_pinned;
        }
        entry.updated_at = now;
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEntryRequest {
    #[serde(default)]
    pub message_id: String,
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBaseQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub pinned_only: bool,
    pub limit: usize,
    pub offset: usize,
}

impl KnowledgeBaseQuery {
    pub fn matches(&self, entry: &KnowledgeBaseEntry) -> bool {
        if self.pinned_only && !entry.is_pinned {
            return false;
        }
        if let Some(category) = &self.category {
            if entry.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = entry.question.to_lowercase().contains(&needle)
                || entry.answer.to_lowercase().contains(&needle)
                || entry
                    .title
                    .as_deref()
                    .is_some_and(|title| title.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for ChatReply {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            question: message.question,
            answer: message.answer,
            created_at: message.created_at,
        }
    }
}

pub fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn entry() -> KnowledgeBaseEntry {
        KnowledgeBaseEntry {
            id: "kb-1".into(),
            question: "How do I rotate the API key?".into(),
            answer: "Use the admin console.".into(),
            title: Some("Key rotation".into()),
            tags: vec!["ops".into()],
            is_pinned: false,
            category: Some("security".into()),
            message_id: Some("msg-1".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn query_searches_question_answer_and_title() {
        let entry = entry();
        let search = |needle: &str| KnowledgeBaseQuery {
            search: Some(needle.into()),
            ..Default::default()
        };
        assert!(search("ROTATE").matches(&entry));
        assert!(search("console").matches(&entry));
        assert!(search("key rot").matches(&entry));
        assert!(!search("kubernetes").matches(&entry));
    }

    #[test]
    fn query_filters_category_and_pinned() {
        let mut entry = entry();
        let by_category = KnowledgeBaseQuery {
            category: Some("security".into()),
            ..Default::default()
        };
        assert!(by_category.matches(&entry));

        let pinned = KnowledgeBaseQuery {
            pinned_only: true,
            ..Default::default()
        };
        assert!(!pinned.matches(&entry));
        entry.is_pinned = true;
        assert!(pinned.matches(&entry));
    }

    #[test]
    fn update_only_touches_provided_fields() {
        let mut entry = entry();
        let before = entry.clone();
        KnowledgeBaseUpdate {
            is_pinned: Some(true),
            title: Some("  ".into()),
            ..Default::default()
        }
        .apply(&mut entry, Utc::now());

        assert!(entry.is_pinned);
        assert_eq!(entry.title, None);
        assert_eq!(entry.tags, before.tags);
        assert_eq!(entry.category, before.category);
    }
}
