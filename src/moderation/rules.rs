use regex::Regex;

/// Score added per whole-word blocklist match.
pub const WORD_WEIGHT: f64 = 0.3;
/// Score added per pattern-rule match.
pub const PATTERN_WEIGHT: f64 = 0.2;
pub const WARN_THRESHOLD: f64 = 0.5;
pub const BLOCK_THRESHOLD: f64 = 1.0;

/// Normalized text shorter than this (in chars) is blocked outright.
pub const MIN_CONTENT_CHARS: usize = 2;
/// Raw text longer than this (in chars) is blocked as spam.
pub const MAX_CONTENT_CHARS: usize = 2000;
pub const TOO_SHORT_CONFIDENCE: f64 = 0.9;
pub const TOO_LONG_CONFIDENCE: f64 = 0.8;

pub const MASK_CHAR: char = '*';

pub const DEFAULT_BLOCKED_TERMS: &[&str] = &[
    // profanity
    "fuck",
    "shit",
    "damn",
    "bitch",
    "asshole",
    "bastard",
    // hate speech indicators
    "hate",
    "kill",
    "die",
    "murder",
    "terrorist",
    // spam phrases
    "click here",
    "buy now",
    "limited time",
    "act now",
    "free money",
    "make money fast",
    "work from home",
    "get rich quick",
];

/// A blocklist term compiled into a whole-word, case-insensitive matcher.
/// Word boundaries are ASCII, so a letter like `é` ends a word.
#[derive(Debug, Clone)]
pub struct BlockedTerm {
    term: String,
    regex: Regex,
}

impl BlockedTerm {
    pub fn new(term: &str) -> Result<Self, regex::Error> {
        let term = term.trim().to_lowercase();
        let regex = Regex::new(&format!(r"(?i)(?-u:\b){}(?-u:\b)", regex::escape(&term)))?;
        Ok(Self { term, regex })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn count_matches(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }
}

/// Structural spam heuristic run against the raw text.
#[derive(Debug, Clone)]
pub enum PatternRule {
    Regex { name: String, regex: Regex },
    /// Any character repeated so that a run reaches `min_run`. Each maximal
    /// run counts once. `regex` has no backreferences, so this one is scanned
    /// by hand.
    RepeatedChar { min_run: usize },
}

impl PatternRule {
    pub fn regex(name: &str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Regex {
            name: name.to_owned(),
            regex: Regex::new(pattern)?,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            PatternRule::Regex { name, .. } => name,
            PatternRule::RepeatedChar { .. } => "repeated_characters",
        }
    }

    pub fn count_matches(&self, text: &str) -> usize {
        match self {
            PatternRule::Regex { regex, .. } => regex.find_iter(text).count(),
            PatternRule::RepeatedChar { min_run } => count_repeated_runs(text, *min_run),
        }
    }
}

pub(crate) fn is_line_terminator(character: char) -> bool {
    matches!(character, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn count_repeated_runs(text: &str, min_run: usize) -> usize {
    let mut runs = 0;
    let mut previous: Option<char> = None;
    let mut run_len = 0;

    for character in text.chars() {
        if Some(character) == previous && !is_line_terminator(character) {
            run_len += 1;
        } else {
            if run_len >= min_run {
                runs += 1;
            }
            previous = Some(character);
            run_len = 1;
        }
    }
    if run_len >= min_run && previous.is_some_and(|character| !is_line_terminator(character)) {
        runs += 1;
    }

    runs
}

/// Blocklist and pattern tables consulted by the moderator. Built once and
/// shared read-only; tests inject their own lists through [`ModerationPolicy::new`].
#[derive(Debug, Clone)]
pub struct ModerationPolicy {
    terms: Vec<BlockedTerm>,
    patterns: Vec<PatternRule>,
}

impl ModerationPolicy {
    pub fn new<S: AsRef<str>>(
        terms: &[S],
        patterns: Vec<PatternRule>,
    ) -> Result<Self, regex::Error> {
        let terms = terms
            .iter()
            .map(|term| BlockedTerm::new(term.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { terms, patterns })
    }

    pub fn default_patterns() -> Result<Vec<PatternRule>, regex::Error> {
        Ok(vec![
            PatternRule::RepeatedChar { min_run: 5 },
            PatternRule::regex("excessive_caps", r"[A-Z]{10,}")?,
            PatternRule::regex("long_number", r"(?-u:\b)[0-9]{10,}(?-u:\b)")?,
            PatternRule::regex("url", r"https?://\S+")?,
            PatternRule::regex("handle", r"[@#][0-9A-Za-z_]+")?,
        ])
    }

    pub fn terms(&self) -> &[BlockedTerm] {
        &self.terms
    }

    pub fn patterns(&self) -> &[PatternRule] {
        &self.patterns
    }
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        let patterns = Self::default_patterns().expect("built-in spam patterns compile");
        Self::new(DEFAULT_BLOCKED_TERMS, patterns).expect("built-in blocklist compiles")
    }
}
