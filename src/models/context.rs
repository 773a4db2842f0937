//! Conversation Context
//!
//! Ephemeral per-session state used by contextual retrieval: a bounded
//! history of exchanges, active user goals, and a simple topic-flow analysis
//! over the recent window.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of exchanges kept in the rolling history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Number of exchanges considered "recent" for topic analysis.
const RECENT_WINDOW: usize = 5;

/// One user/assistant exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
    pub timestamp: DateTime<Utc>,
}

/// Coarse conversation topic derived from keyword matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Work,
    Personal,
    Support,
    General,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Work => "work",
            Topic::Personal => "personal",
            Topic::Support => "support",
            Topic::General => "general",
        }
    }

    /// Classify a single utterance into a topic.
    pub fn classify(text: &str) -> Topic {
        let lower = text.to_lowercase();
        if ["work", "job", "career"].iter().any(|w| lower.contains(w)) {
            Topic::Work
        } else if ["hobby", "interest", "like", "love"]
            .iter()
            .any(|w| lower.contains(w))
        {
            Topic::Personal
        } else if ["help", "question", "problem"]
            .iter()
            .any(|w| lower.contains(w))
        {
            Topic::Support
        } else {
            Topic::General
        }
    }

    /// Keywords that mark memory content as belonging to this topic.
    /// `General` has no keyword set; nothing matches it directly.
    pub fn content_keywords(&self) -> &'static [&'static str] {
        match self {
            Topic::Work => &["work", "job", "career", "professional", "business", "office"],
            Topic::Personal => &["hobby", "interest", "like", "love", "enjoy", "family", "friend"],
            Topic::Support => &["help", "question", "problem", "issue", "assist", "guide"],
            Topic::General => &[],
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of analyzing the recent conversation window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicFlow {
    /// 1.0 when the recent window stayed on one topic, lower with each shift.
    pub coherence: f32,
    /// Number of topic changes across the recent window.
    pub topic_shift: usize,
    pub current_topic: Topic,
}

/// Ephemeral per-session conversation state.
///
/// Mutated only by appending exchanges; the history is bounded and drops the
/// oldest exchange first.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    history: VecDeque<Exchange>,
    capacity: usize,
    pub active_goals: Vec<String>,
    pub session_start: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            active_goals: Vec::new(),
            session_start: Utc::now(),
        }
    }

    /// Append a conversation exchange, dropping the oldest when full.
    pub fn add_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(Exchange {
            user: user.into(),
            assistant: assistant.into(),
            timestamp: Utc::now(),
        });
    }

    /// Add an active user goal.
    pub fn add_goal(&mut self, goal: impl Into<String>) {
        self.active_goals.push(goal.into());
    }

    pub fn history(&self) -> impl Iterator<Item = &Exchange> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// The last `n` exchanges rendered as plain text for lexical comparison.
    pub fn recent_text(&self, n: usize) -> String {
        let skip = self.history.len().saturating_sub(n);
        let mut parts = Vec::new();
        for exchange in self.history.iter().skip(skip) {
            parts.push(format!("User: {}", exchange.user));
            parts.push(format!("Assistant: {}", exchange.assistant));
        }
        parts.join("\n")
    }

    /// Analyze topic coherence over the recent window.
    pub fn topic_flow(&self) -> TopicFlow {
        if self.history.len() < 2 {
            let current_topic = self
                .history
                .back()
                .map(|e| Topic::classify(&e.user))
                .unwrap_or(Topic::General);
            return TopicFlow {
                coherence: 1.0,
                topic_shift: 0,
                current_topic,
            };
        }

        let skip = self.history.len().saturating_sub(RECENT_WINDOW);
        let topics: Vec<Topic> = self
            .history
            .iter()
            .skip(skip)
            .map(|e| Topic::classify(&e.user))
            .collect();

        let topic_shift = topics.windows(2).filter(|w| w[0] != w[1]).count();
        let coherence = 1.0 - topic_shift as f32 / (topics.len() - 1).max(1) as f32;

        TopicFlow {
            coherence,
            topic_shift,
            current_topic: *topics.last().unwrap_or(&Topic::General),
        }
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_classification() {
        assert_eq!(Topic::classify("How is your job going?"), Topic::Work);
        assert_eq!(Topic::classify("I love painting"), Topic::Personal);
        assert_eq!(Topic::classify("I have a problem with my setup"), Topic::Support);
        assert_eq!(Topic::classify("nice weather today"), Topic::General);
    }

    #[test]
    fn test_history_bounded() {
        let mut ctx = ConversationContext::with_capacity(3);
        for i in 0..5 {
            ctx.add_exchange(format!("message {}", i), "ok");
        }
        assert_eq!(ctx.len(), 3);
        // Oldest dropped first
        let first = ctx.history().next().unwrap();
        assert_eq!(first.user, "message 2");
    }

    #[test]
    fn test_recent_text_window() {
        let mut ctx = ConversationContext::new();
        ctx.add_exchange("first question", "first answer");
        ctx.add_exchange("second question", "second answer");

        let text = ctx.recent_text(1);
        assert!(text.contains("second question"));
        assert!(!text.contains("first question"));
    }

    #[test]
    fn test_topic_flow_coherent() {
        let mut ctx = ConversationContext::new();
        ctx.add_exchange("how is work", "fine");
        ctx.add_exchange("my job is hard", "sorry");
        ctx.add_exchange("career advice please", "sure");

        let flow = ctx.topic_flow();
        assert_eq!(flow.current_topic, Topic::Work);
        assert_eq!(flow.topic_shift, 0);
        assert!((flow.coherence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_topic_flow_shifting() {
        let mut ctx = ConversationContext::new();
        ctx.add_exchange("how is work", "fine");
        ctx.add_exchange("i love painting", "nice");
        ctx.add_exchange("help me with a problem", "sure");

        let flow = ctx.topic_flow();
        assert_eq!(flow.current_topic, Topic::Support);
        assert_eq!(flow.topic_shift, 2);
        assert!(flow.coherence < 0.5);
    }

    #[test]
    fn test_topic_flow_empty() {
        let ctx = ConversationContext::new();
        let flow = ctx.topic_flow();
        assert_eq!(flow.current_topic, Topic::General);
        assert!((flow.coherence - 1.0).abs() < f32::EPSILON);
    }
}
