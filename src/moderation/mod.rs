//! Rule-based content moderation.
//!
//! [`ContentModerator::evaluate`] scores text against a blocklist and a set
//! of spam heuristics and suggests `allow`, `warn` or `block`.
//! [`ContentModerator::sanitize`] masks blocklisted words and tones down
//! repetition and shouting. Both are pure and safe to share across threads.

mod rules;
mod sanitize;

use serde::Serialize;

pub use rules::{
    BLOCK_THRESHOLD, BlockedTerm, DEFAULT_BLOCKED_TERMS, MASK_CHAR, MAX_CONTENT_CHARS,
    MIN_CONTENT_CHARS, ModerationPolicy, PATTERN_WEIGHT, PatternRule, TOO_LONG_CONFIDENCE,
    TOO_SHORT_CONFIDENCE, WARN_THRESHOLD, WORD_WEIGHT,
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SuggestedAction {
    Allow,
    Warn,
    Block,
}

impl SuggestedAction {
    pub fn as_str(self) -> &'static str {
        match self {
            SuggestedAction::Allow => "allow",
            SuggestedAction::Warn => "warn",
            SuggestedAction::Block => "block",
        }
    }
}

/// The rule that decided a non-`allow` verdict.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModerationTrigger {
    TooShort,
    TooLong,
    HighRisk,
    ElevatedScore,
    FlaggedWords,
}

impl ModerationTrigger {
    pub fn reason(self) -> &'static str {
        match self {
            ModerationTrigger::TooShort => "Content too short",
            ModerationTrigger::TooLong => "Content too long (potential spam)",
            ModerationTrigger::HighRisk => "High risk content detected",
            ModerationTrigger::ElevatedScore => "Potentially inappropriate content",
            ModerationTrigger::FlaggedWords => "Contains flagged words",
        }
    }

    pub fn action(self) -> SuggestedAction {
        match self {
            ModerationTrigger::TooShort
            | ModerationTrigger::TooLong
            | ModerationTrigger::HighRisk => SuggestedAction::Block,
            ModerationTrigger::ElevatedScore | ModerationTrigger::FlaggedWords => {
                SuggestedAction::Warn
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResult {
    pub is_appropriate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flagged_words: Vec<String>,
    pub suggested_action: SuggestedAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<ModerationTrigger>,
}

impl ModerationResult {
    fn allowed(confidence: f64) -> Self {
        Self {
            is_appropriate: true,
            reason: None,
            confidence,
            flagged_words: Vec::new(),
            suggested_action: SuggestedAction::Allow,
            trigger: None,
        }
    }

    fn flagged(trigger: ModerationTrigger, confidence: f64, flagged_words: Vec<String>) -> Self {
        Self {
            is_appropriate: false,
            reason: Some(trigger.reason().to_owned()),
            confidence,
            flagged_words,
            suggested_action: trigger.action(),
            trigger: Some(trigger),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.suggested_action == SuggestedAction::Block
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentModerator {
    policy: ModerationPolicy,
}

impl ContentModerator {
    pub fn new(policy: ModerationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ModerationPolicy {
        &self.policy
    }

    pub fn evaluate(&self, text: &str) -> ModerationResult {
        let lowered = text.to_lowercase();
        let normalized = lowered.trim();

        if normalized.chars().count() < MIN_CONTENT_CHARS {
            return ModerationResult::flagged(
                ModerationTrigger::TooShort,
                TOO_SHORT_CONFIDENCE,
                Vec::new(),
            );
        }
        if text.chars().count() > MAX_CONTENT_CHARS {
            return ModerationResult::flagged(
                ModerationTrigger::TooLong,
                TOO_LONG_CONFIDENCE,
                Vec::new(),
            );
        }

        let mut flagged_words = Vec::new();
        let mut inappropriate_score = 0.0;
        for term in self.policy.terms() {
            let matches = term.count_matches(normalized);
            if matches > 0 {
                flagged_words.push(term.term().to_owned());
                inappropriate_score += matches as f64 * WORD_WEIGHT;
            }
        }

        let mut spam_score = 0.0;
        for rule in self.policy.patterns() {
            let matches = rule.count_matches(text);
            if matches > 0 {
                spam_score += matches as f64 * PATTERN_WEIGHT;
            }
        }

        let total_score = inappropriate_score + spam_score;
        let confidence = total_score.min(1.0);

        let trigger = if total_score >= BLOCK_THRESHOLD {
            Some(ModerationTrigger::HighRisk)
        } else if total_score >= WARN_THRESHOLD {
            Some(ModerationTrigger::ElevatedScore)
        } else if !flagged_words.is_empty() {
            Some(ModerationTrigger::FlaggedWords)
        } else {
            None
        };

        match trigger {
            Some(trigger) => ModerationResult::flagged(trigger, confidence, flagged_words),
            None => ModerationResult::allowed(confidence),
        }
    }

    pub fn sanitize(&self, text: &str) -> String {
        sanitize::sanitize(text, self.policy.terms(), MASK_CHAR)
    }

    /// True only when the text was blocked for its length.
    pub fn is_spam_like(&self, text: &str) -> bool {
        self.evaluate(text).trigger == Some(ModerationTrigger::TooLong)
    }

    pub fn contains_profanity(&self, text: &str) -> bool {
        !self.evaluate(text).flagged_words.is_empty()
    }
}
