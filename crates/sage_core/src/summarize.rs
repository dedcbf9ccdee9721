//! crates/sage_core/src/summarize.rs
//!
//! Prompt construction and tolerant parsing of model output.
//!
//! The hosted model is asked for JSON but is not guaranteed to return it. Summary
//! responses degrade to "whole response is the overview"; flashcard responses
//! have no sensible partial form and fail instead.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::domain::{ChatMessage, ChatRole, Flashcard, SummaryFields, SummaryRecord};
use crate::ports::{PortError, PortResult};

pub const SUMMARY_SYSTEM: &str = "You are a study assistant.";

const SUMMARY_TEMPLATE: &str = r#"Read the notes and produce:
- "overview": 2-3 sentence concise overview
- "takeaways": 3-5 bullet key takeaways
- "keywords": 5-10 important keywords/terms
Respond only in JSON with keys: overview (string), takeaways (array of strings), keywords (array of strings).
Notes:
{notes}"#;

pub const FLASHCARD_SYSTEM: &str = "You are a study assistant creating flashcards.";

const FLASHCARD_TEMPLATE: &str = r#"Based on the following content, create 5-10 flashcards.

Content:
{content}

Summary: {summary}

Create flashcards in JSON format:
[
  { "question": "What is...", "answer": "..." },
  { "question": "Define...", "answer": "..." }
]

Make questions clear and answers concise. Focus on key concepts, definitions, and important facts.
Return ONLY valid JSON array, no markdown formatting."#;

pub const CHAT_SYSTEM: &str = "You are a friendly study assistant. Answer questions about the \
user's notes in a few clear sentences. Use the notes first and general knowledge only to fill gaps.";

const CHAT_TEMPLATE: &str = r#"NOTES:
---
{notes}
---

OVERVIEW:
{overview}

CONVERSATION SO FAR:
{history}

QUESTION:
{question}"#;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:json)?").expect("code fence pattern is valid"));

pub fn summary_prompt(notes: &str) -> String {
    SUMMARY_TEMPLATE.replace("{notes}", notes)
}

pub fn flashcard_prompt(record: &SummaryRecord) -> String {
    FLASHCARD_TEMPLATE
        .replace("{content}", &record.original_text)
        .replace("{summary}", &record.overview)
}

/// `history` is stored newest-first; the prompt lists it oldest-first.
pub fn chat_prompt(record: &SummaryRecord, history: &[ChatMessage], question: &str) -> String {
    let transcript = if history.is_empty() {
        "(none)".to_string()
    } else {
        history
            .iter()
            .rev()
            .map(|m| match m.role {
                ChatRole::User => format!("User: {}", m.text),
                ChatRole::Assistant => format!("Assistant: {}", m.text),
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    CHAT_TEMPLATE
        .replace("{notes}", &record.original_text)
        .replace("{overview}", &record.overview)
        .replace("{history}", &transcript)
        .replace("{question}", question)
}

/// Removes markdown code fences (```json ... ```) and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").trim().to_string()
}

/// Parses a summary response, falling back to the raw text as the overview.
pub fn parse_summary_response(raw: &str) -> SummaryFields {
    let cleaned = strip_code_fences(raw);

    let fields = match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(map)) => SummaryFields {
            overview: map
                .get("overview")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            takeaways: string_list(map.get("takeaways")),
            keywords: string_list(map.get("keywords")),
        },
        Ok(_) => {
            warn!("Structured response was not a JSON object, falling back to raw text");
            fallback(raw)
        }
        Err(e) => {
            warn!("Failed to parse structured response, falling back to raw text: {}", e);
            fallback(raw)
        }
    };
    fields.normalized()
}

fn fallback(raw: &str) -> SummaryFields {
    SummaryFields {
        overview: raw.to_string(),
        takeaways: Vec::new(),
        keywords: Vec::new(),
    }
}

/// Keeps the string entries of a JSON array; anything else reads as empty.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub fn parse_flashcards(raw: &str) -> PortResult<Vec<Flashcard>> {
    let cleaned = strip_code_fences(raw);
    let cards: Vec<Flashcard> = serde_json::from_str(&cleaned)
        .map_err(|e| PortError::Invalid(format!("flashcard response was not a JSON array: {e}")))?;
    Ok(cards
        .into_iter()
        .filter(|c| !c.question.trim().is_empty())
        .collect())
}
