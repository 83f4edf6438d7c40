//! Request and response types exchanged with the game frontend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder rendered for solution fields the frontend did not send.
pub const UNKNOWN: &str = "Unknown";

/// Conversation role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub story_id: String,
    pub character_id: String,
    pub messages: Vec<ChatMessage>,
    pub system_prompt: String,
}

impl ChatRequest {
    /// Upstream message list: the system prompt followed by the history in order.
    pub fn upstream_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(self.messages.iter().cloned());
        messages
    }
}

/// The case solution as sent by the frontend. Any JSON object is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Solution(pub Map<String, Value>);

impl Solution {
    pub fn culprit(&self) -> String {
        self.field("culprit")
    }

    pub fn method(&self) -> String {
        self.field("method")
    }

    pub fn motive(&self) -> String {
        self.field("motive")
    }

    fn field(&self, key: &str) -> String {
        match self.0.get(key) {
            None | Some(Value::Null) => UNKNOWN.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Body of `POST /api/score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub reasoning: String,
    pub solution: Solution,
    pub is_correct: bool,
}

/// Score breakdown. Sub-scores are best-effort and never checked against the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReasoningScore {
    /// 0-100
    pub score: i64,
    /// 0-30
    pub motive_points: i64,
    /// 0-30
    pub method_points: i64,
    /// 0-40
    pub logic_points: i64,
}

impl ReasoningScore {
    /// Wrong accusation.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Correct accusation with next to no reasoning.
    pub const TOO_SHORT: Self = Self::new(10, 3, 3, 4);

    /// Used when nothing usable came back from the model.
    pub const DEFAULT: Self = Self::new(50, 15, 15, 20);

    pub const fn new(score: i64, motive_points: i64, method_points: i64, logic_points: i64) -> Self {
        Self {
            score,
            motive_points,
            method_points,
            logic_points,
        }
    }

    /// Sum of the three sub-scores.
    pub fn components_total(&self) -> i64 {
        self.motive_points + self.method_points + self.logic_points
    }
}

/// Body returned by `POST /api/score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: i64,
    pub breakdown: ReasoningScore,
}

impl From<ReasoningScore> for ScoreResponse {
    fn from(breakdown: ReasoningScore) -> Self {
        Self {
            score: breakdown.score,
            breakdown,
        }
    }
}
