//! services/cli/src/render.rs
//!
//! Plain-text views of workspace data for the terminal.

use sage_core::domain::{ChatMessage, ChatRole, Flashcard, Space, SummaryRecord};
use std::fmt::Write;
use uuid::Uuid;

const PREVIEW_CHARS: usize = 60;

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() > PREVIEW_CHARS {
        let cut: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut.trim_end())
    } else {
        line.to_string()
    }
}

pub fn summary_list(summaries: &[SummaryRecord]) -> String {
    if summaries.is_empty() {
        return "No summaries yet.".to_string();
    }
    summaries
        .iter()
        .map(|s| format!("{}  {}  {}", s.id, s.created_at, preview(&s.overview)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn summary(record: &SummaryRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Summary {} ({})", record.id, record.created_at);
    let _ = writeln!(out);
    let _ = writeln!(out, "Overview");
    let _ = writeln!(out, "  {}", record.overview);
    if !record.takeaways.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Key takeaways");
        for takeaway in &record.takeaways {
            let _ = writeln!(out, "  - {}", takeaway);
        }
    }
    if !record.keywords.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Keywords: {}", record.keywords.join(", "));
    }
    out.trim_end().to_string()
}

pub fn spaces(spaces: &[Space], active: Option<Uuid>) -> String {
    if spaces.is_empty() {
        return "No spaces yet.".to_string();
    }
    spaces
        .iter()
        .map(|space| {
            let marker = if Some(space.id) == active { "*" } else { " " };
            let count = space.summary_ids.len();
            let noun = if count == 1 { "summary" } else { "summaries" };
            format!("{} {}  {}  ({} {})", marker, space.id, space.name, count, noun)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Stored transcripts are newest first; they read oldest first.
pub fn chat_history(history: &[ChatMessage]) -> String {
    if history.is_empty() {
        return "No messages yet.".to_string();
    }
    history
        .iter()
        .rev()
        .map(|m| format!("{}: {}", speaker(&m.role), m.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn speaker(role: &ChatRole) -> &'static str {
    match role {
        ChatRole::User => "You",
        ChatRole::Assistant => "Sage",
    }
}

pub fn flashcards(cards: &[Flashcard]) -> String {
    if cards.is_empty() {
        return "No flashcards.".to_string();
    }
    cards
        .iter()
        .enumerate()
        .map(|(i, card)| format!("{}. Q: {}\n   A: {}", i + 1, card.question, card.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}
