//! Tool-intent detection for `auto` mode.
//!
//! Scores a user message against the tool catalog and decides whether it
//! should go through the ReAct loop or a single chat call. The score mixes
//! action verbs, request phrasing, sentence complexity and word overlap
//! with tool names and descriptions.

use reagent_core::tool::ToolDefinition;

const ACTION_KEYWORDS: &[&str] = &[
    "create", "generate", "make", "build", "write", "find", "search", "get", "fetch", "read",
    "open", "execute", "run", "perform", "do", "complete", "implement", "develop", "design",
    "analyze", "check", "verify", "test", "update", "modify", "change", "delete", "remove", "send",
    "post", "put", "patch", "upload", "download", "calculate", "compute",
];

const REQUEST_PHRASES: &[&str] = &[
    "can you help me",
    "i need to",
    "i want to",
    "could you",
    "would you",
    "please",
    "i need you to",
    "can you make",
    "i want you to",
    "how can i",
    "what can i",
    "use tool",
    "with the tool",
    "using",
    "by using",
];

/// Overlap needed alongside an action keyword.
const KEYWORD_RELEVANCE: f64 = 0.3;
/// Complexity needed alongside a request phrase.
const PHRASE_COMPLEXITY: f64 = 0.6;
/// Overlap that selects tools on its own.
const STRONG_RELEVANCE: f64 = 0.7;

/// Words shorter than this never count as overlap.
const MIN_OVERLAP_WORD: usize = 3;

/// The signals behind one routing decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentAssessment {
    pub action_keyword: bool,
    pub request_phrase: bool,
    /// 0.0..=1.0, from word and clause counts.
    pub complexity: f64,
    /// Best word overlap with any tool name or description.
    pub relevance: f64,
}

impl IntentAssessment {
    pub fn wants_tools(&self) -> bool {
        (self.action_keyword && self.relevance > KEYWORD_RELEVANCE)
            || (self.request_phrase && self.complexity > PHRASE_COMPLEXITY)
            || self.relevance > STRONG_RELEVANCE
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToolIntentDetector;

impl ToolIntentDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, message: &str, tools: &[ToolDefinition]) -> IntentAssessment {
        let lower = message.to_lowercase();
        let words = words(&lower);
        IntentAssessment {
            action_keyword: words.iter().any(|w| ACTION_KEYWORDS.contains(w)),
            request_phrase: REQUEST_PHRASES.iter().any(|p| lower.contains(p)),
            complexity: complexity(message),
            relevance: tools
                .iter()
                .map(|tool| {
                    overlap(&words, &tool.name.to_lowercase())
                        .max(overlap(&words, &tool.description.to_lowercase()))
                })
                .fold(0.0, f64::max),
        }
    }

    /// Whether `message` should run through the ReAct loop.
    pub fn wants_tools(&self, message: &str, tools: &[ToolDefinition]) -> bool {
        self.assess(message, tools).wants_tools()
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn complexity(message: &str) -> f64 {
    let word_count = message.split_whitespace().count() as f64;
    let clause_count = message
        .split(['.', ',', ';', '!', '?'])
        .filter(|c| !c.trim().is_empty())
        .count() as f64;
    (word_count / 20.0).min(1.0) * 0.6 + (clause_count / 5.0).min(1.0) * 0.4
}

/// Shared words (by occurrence in the message) over the mean word count.
fn overlap(message_words: &[&str], text: &str) -> f64 {
    let text_words = words(text);
    let mean = (message_words.len() + text_words.len()) as f64 / 2.0;
    if mean == 0.0 {
        return 0.0;
    }
    let shared = message_words
        .iter()
        .filter(|w| w.len() >= MIN_OVERLAP_WORD && text_words.contains(w))
        .count();
    shared as f64 / mean
}
