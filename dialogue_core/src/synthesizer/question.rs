//! Question classification for the reverse-lookup path.
//!
//! Turkish interrogative markers are matched as whole tokens ("nedir",
//! "neresi") or fixed phrases ("ne demek", "ne zaman") so that words merely
//! containing "ne" do not misclassify.

use serde::{Deserialize, Serialize};

/// Coarse question type of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    WhatIs,
    WhereIs,
    WhoIs,
    HowTo,
    WhenIs,
    Other,
}

/// A classified utterance: its question type and the asked-about phrase.
#[derive(Debug, Clone)]
pub struct Question {
    pub kind: QuestionKind,
    /// The subject phrase, original casing, suffix-trimmed.
    pub subject: String,
}

const WHAT_TOKENS: [&str; 3] = ["nedir", "demek", "anlamı"];
const WHERE_TOKENS: [&str; 4] = ["nerede", "neresi", "neresidir", "nerededir"];
const WHO_TOKENS: [&str; 2] = ["kim", "kimdir"];
const HOW_TOKENS: [&str; 2] = ["nasıl", "nasıldır"];

/// Classify `utterance` into a question type plus subject phrase.
pub fn classify_question(utterance: &str) -> Question {
    let words: Vec<&str> = utterance.split_whitespace().collect();
    let keys: Vec<String> = words
        .iter()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase()
        })
        .collect();

    // Fixed two-word phrases first.
    for i in 0..keys.len().saturating_sub(1) {
        if keys[i] == "ne" && keys[i + 1] == "zaman" {
            return question(QuestionKind::WhenIs, &words[..i]);
        }
        if keys[i] == "ne" && keys[i + 1] == "demek" {
            return question(QuestionKind::WhatIs, &words[..i]);
        }
    }

    for (i, key) in keys.iter().enumerate() {
        let kind = if WHAT_TOKENS.contains(&key.as_str()) {
            QuestionKind::WhatIs
        } else if WHERE_TOKENS.contains(&key.as_str()) {
            QuestionKind::WhereIs
        } else if WHO_TOKENS.contains(&key.as_str()) {
            QuestionKind::WhoIs
        } else if HOW_TOKENS.contains(&key.as_str()) {
            QuestionKind::HowTo
        } else {
            continue;
        };
        return question(kind, &words[..i]);
    }

    Question {
        kind: QuestionKind::Other,
        subject: utterance.trim().trim_end_matches(['?', '.', '!']).to_string(),
    }
}

fn question(kind: QuestionKind, subject_words: &[&str]) -> Question {
    let subject = subject_words
        .iter()
        .map(|w| trim_suffixes(w))
        .collect::<Vec<_>>()
        .join(" ");
    Question { kind, subject }
}

/// Simple suffix trimming: strip punctuation and apostrophe-attached
/// case endings ("Türkiye'nin" -> "Türkiye").
fn trim_suffixes(word: &str) -> String {
    let cleaned = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
    match cleaned.split_once('\'') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => cleaned.trim_matches('\'').to_string(),
    }
}
