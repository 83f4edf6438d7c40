//! Reasoning evaluation for accusations.
//!
//! Trivial requests are answered locally. Everything else goes to the scoring
//! model, whose output is read through a fixed chain of parsers of decreasing
//! precision:
//!
//! 1. [`Tier::Structured`]: schema-constrained completion, parsed as-is
//! 2. [`Tier::EmbeddedJson`]: first `{` to last `}` of a free-form reply
//! 3. [`Tier::BareNumber`]: the whole reply is an integer
//! 4. [`Tier::Fallback`]: [`ReasoningScore::DEFAULT`]
//!
//! Parsing problems never fail a request; only upstream transport errors do.

use std::fmt;
use std::num::IntErrorKind;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::ScoringConfig;
use crate::models::{ChatMessage, ReasoningScore, ScoreRequest};
use crate::upstream::{CompletionProvider, CompletionRequest, UpstreamError};

const RUBRIC: &str = "You are evaluating a detective's reasoning for solving a mystery.

Score the reasoning from 0-100 based on:
1. Does it identify the correct motive? (30 points max)
2. Does it explain the method? (30 points max)
3. Is the logic sound and well-explained? (40 points max)";

const STRUCTURED_INSTRUCTIONS: &str = "Provide a structured breakdown of the score.";

const JSON_INSTRUCTIONS: &str = "Respond with ONLY a JSON object in this format:
{\"score\": 85, \"motive_points\": 25, \"method_points\": 28, \"logic_points\": 32}";

/// Schema name sent with structured completions.
pub const SCHEMA_NAME: &str = "ReasoningScore";

/// How a score was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Answer was wrong; no model call.
    Incorrect,
    /// Reasoning below the minimum length; no model call.
    TooShort,
    Structured,
    EmbeddedJson,
    BareNumber,
    Fallback,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Incorrect => "incorrect",
            Tier::TooShort => "too_short",
            Tier::Structured => "structured",
            Tier::EmbeddedJson => "embedded_json",
            Tier::BareNumber => "bare_number",
            Tier::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A score together with the tier that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scored {
    pub score: ReasoningScore,
    pub tier: Tier,
}

impl Scored {
    fn new(score: ReasoningScore, tier: Tier) -> Self {
        Self { score, tier }
    }
}

/// Answer requests that need no model call.
pub fn short_circuit(request: &ScoreRequest, min_reasoning_chars: usize) -> Option<Scored> {
    if !request.is_correct {
        return Some(Scored::new(ReasoningScore::ZERO, Tier::Incorrect));
    }
    if request.reasoning.chars().count() < min_reasoning_chars {
        return Some(Scored::new(ReasoningScore::TOO_SHORT, Tier::TooShort));
    }
    None
}

/// User prompt comparing the reasoning against the solution.
pub fn build_prompt(request: &ScoreRequest) -> String {
    let solution = &request.solution;
    format!(
        "THE CORRECT SOLUTION:
- Culprit: {culprit}
- Method: {method}
- Motive: {motive}

THE DETECTIVE'S REASONING:
\"{reasoning}\"

Evaluate the reasoning and provide a structured score.",
        culprit = solution.culprit(),
        method = solution.method(),
        motive = solution.motive(),
        reasoning = request.reasoning,
    )
}

/// Strict JSON schema for [`ReasoningScore`].
pub fn reasoning_score_schema() -> Value {
    let int = || json!({"type": "integer"});
    json!({
        "type": "object",
        "properties": {
            "score": int(),
            "motive_points": int(),
            "method_points": int(),
            "logic_points": int(),
        },
        "required": ["score", "motive_points", "method_points", "logic_points"],
        "additionalProperties": false,
    })
}

/// Read a schema-constrained reply: exactly the four integer fields.
pub fn parse_structured(text: &str) -> Result<ReasoningScore, serde_json::Error> {
    serde_json::from_str(text.trim())
}

/// Parse the span from the first `{` to the last `}` as a JSON object.
///
/// Missing or null keys take their [`ReasoningScore::DEFAULT`] value; any
/// other non-integer value rejects the reply.
pub fn parse_embedded_json(text: &str) -> Option<ReasoningScore> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    let object: Map<String, Value> = serde_json::from_str(&text[start..=end]).ok()?;
    let field = |key: &str, default: i64| match object.get(key) {
        None | Some(Value::Null) => Some(default),
        Some(value) => value.as_i64().or_else(|| value.as_f64().map(|f| f as i64)),
    };

    let fallback = ReasoningScore::DEFAULT;
    Some(ReasoningScore::new(
        field("score", fallback.score)?,
        field("motive_points", fallback.motive_points)?,
        field("method_points", fallback.method_points)?,
        field("logic_points", fallback.logic_points)?,
    ))
}

/// Treat the trimmed reply as a total, clamped to 0..=100 and split 30/30/40.
pub fn parse_bare_number(text: &str) -> Option<ReasoningScore> {
    let score = match text.trim().parse::<i64>() {
        Ok(n) => n.clamp(0, 100),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => 100,
            IntErrorKind::NegOverflow => 0,
            _ => return None,
        },
    };
    Some(ReasoningScore::new(
        score,
        score * 3 / 10,
        score * 3 / 10,
        score * 4 / 10,
    ))
}

type TextParser = fn(&str) -> Option<ReasoningScore>;

/// Free-form parsers in the order they are tried.
const TEXT_PARSERS: [(Tier, TextParser); 2] = [
    (Tier::EmbeddedJson, parse_embedded_json),
    (Tier::BareNumber, parse_bare_number),
];

/// Run the free-form chain; never fails.
pub fn parse_free_text(text: &str) -> Scored {
    TEXT_PARSERS
        .iter()
        .find_map(|(tier, parse)| parse(text).map(|score| Scored::new(score, *tier)))
        .unwrap_or(Scored::new(ReasoningScore::DEFAULT, Tier::Fallback))
}

/// Scores reasoning with the configured model.
#[derive(Clone)]
pub struct Scorer {
    provider: Arc<dyn CompletionProvider>,
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: ScoringConfig) -> Self {
        Self { provider, config }
    }

    /// Score a request. Errors only when the free-form completion itself fails.
    pub async fn score(&self, request: &ScoreRequest) -> Result<Scored, UpstreamError> {
        if let Some(scored) = short_circuit(request, self.config.min_reasoning_chars) {
            return Ok(scored);
        }

        let prompt = build_prompt(request);

        let scored = match self.score_structured(&prompt).await {
            Ok(score) => Scored::new(score, Tier::Structured),
            Err(e) => {
                debug!("Structured scoring failed, falling back to free text: {e}");
                let text = self
                    .provider
                    .complete(self.completion(JSON_INSTRUCTIONS, &prompt))
                    .await?;
                parse_free_text(&text)
            }
        };

        if scored.score.components_total() != scored.score.score {
            debug!(
                tier = %scored.tier,
                score = scored.score.score,
                components = scored.score.components_total(),
                "Sub-scores do not add up to the total"
            );
        }
        Ok(scored)
    }

    async fn score_structured(&self, prompt: &str) -> Result<ReasoningScore, UpstreamError> {
        let request = self
            .completion(STRUCTURED_INSTRUCTIONS, prompt)
            .with_json_schema(SCHEMA_NAME, reasoning_score_schema());
        let text = self.provider.complete(request).await?;
        Ok(parse_structured(&text)?)
    }

    fn completion(&self, instructions: &str, prompt: &str) -> CompletionRequest {
        CompletionRequest::new(
            self.config.model.clone(),
            vec![
                ChatMessage::system(format!("{RUBRIC}\n\n{instructions}")),
                ChatMessage::user(prompt),
            ],
            self.config.max_tokens,
            self.config.temperature,
        )
    }
}
