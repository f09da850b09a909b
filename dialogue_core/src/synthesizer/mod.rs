//! Response Synthesizer - turns propagation results and the training corpus
//! into a natural-language response.
//!
//! Priority order:
//! 1. **Reverse lookup**: "X nedir?" questions are answered by finding a
//!    corpus entry whose *output* contains X and echoing its input back as a
//!    statement
//! 2. **Corpus best-match**: primary concepts are scored against pair inputs;
//!    the winning pair's output is cleaned up and returned
//! 3. **Fallback synthesis**: a templated sentence over the primary concepts,
//!    or a fixed clarification request when nothing activated

mod question;

pub use question::*;

use rand::Rng;
use regex::Regex;

use word_graph::{
    similarity::{contains_whole_word, token_jaccard, tokenize, word_similarity},
    PairId, TrainingCorpus,
};

use crate::propagation::ActivationResult;

/// Minimum reverse-lookup match score to accept.
pub const REVERSE_LOOKUP_THRESHOLD: f32 = 0.7;

/// Corpus-match score a pair must exceed to be accepted.
pub const CORPUS_MATCH_THRESHOLD: f32 = 3.0;

/// Probability that the fallback response gets an emoji.
pub const EMOJI_PROBABILITY: f64 = 0.4;

/// Jaccard overlap above which two sentences count as near-duplicates.
pub const NEAR_DUPLICATE_JACCARD: f32 = 0.8;

/// What `respond` produced.
#[derive(Debug, Clone)]
pub struct SynthesizerOutput {
    pub response: String,
    /// In [0, 1].
    pub confidence: f32,
    /// The corpus pair the response was built from, when one was used.
    pub used_training: Option<PairId>,
}

/// The response synthesizer. Holds the compiled boilerplate patterns.
pub struct ResponseSynthesizer {
    boilerplate: Vec<Regex>,
}

impl Default for ResponseSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSynthesizer {
    /// Create a synthesizer with the stock Turkish boilerplate patterns.
    pub fn new() -> Self {
        let patterns = [
            r"(?i)^bu konuyla ilgili bildiğim:?\s*",
            r"(?i)^bildiğim kadarıyla:?\s*",
            r"(?i)^sanırım:?\s*",
            r"(?i)^hatırladığım kadarıyla:?\s*",
        ];
        Self {
            // The patterns are fixed literals; compilation cannot fail.
            boilerplate: patterns.iter().filter_map(|p| Regex::new(p).ok()).collect(),
        }
    }

    /// Produce a response for `utterance` given the activation result.
    ///
    /// On a corpus match the pair's usage count is incremented. Total over
    /// its inputs: every path resolves to some response.
    pub fn respond(
        &self,
        activation: &ActivationResult,
        corpus: &mut TrainingCorpus,
        utterance: &str,
        rng: &mut impl Rng,
    ) -> SynthesizerOutput {
        // 1. Reverse lookup for "X nedir?" style questions.
        let question = classify_question(utterance);
        if let Some(hit) = self.reverse_lookup(corpus, &question) {
            return hit;
        }

        // 2. Best corpus match against the activated concepts.
        if let Some(hit) = self.corpus_match(activation, corpus, utterance) {
            return hit;
        }

        // 3. Fallback synthesis.
        self.fallback(activation, rng)
    }

    /// Answer "X nedir?" by scanning corpus *outputs* for the subject.
    fn reverse_lookup(
        &self,
        corpus: &TrainingCorpus,
        question: &Question,
    ) -> Option<SynthesizerOutput> {
        if !matches!(question.kind, QuestionKind::WhatIs | QuestionKind::WhereIs) {
            return None;
        }
        let subject = question.subject.trim();
        if subject.is_empty() {
            return None;
        }
        let subject_lower = subject.to_lowercase();

        // Rank: exact > prefix > whole-word substring > fuzzy.
        let mut best: Option<(f32, u8, PairId, &str)> = None;
        for pair in corpus.iter() {
            let output = pair.output.trim();
            let output_lower = output.to_lowercase();
            let candidate = if output_lower == subject_lower {
                Some((1.0, 3))
            } else if output_lower.starts_with(&subject_lower) {
                Some((0.9, 2))
            } else if contains_whole_word(output, subject) {
                Some((0.8, 1))
            } else {
                let sim = word_similarity(output, subject);
                (sim >= 0.8).then_some((sim, 0))
            };
            if let Some((score, rank)) = candidate {
                let better = match best {
                    None => true,
                    Some((s, r, _, _)) => score > s || (score == s && rank > r),
                };
                if better {
                    best = Some((score, rank, pair.id, &pair.input));
                }
            }
        }

        let (score, _, pair_id, input) = best?;
        if score < REVERSE_LOOKUP_THRESHOLD {
            return None;
        }

        let response = build_definition_sentence(subject, input);
        Some(SynthesizerOutput {
            response,
            confidence: score * 0.8,
            used_training: Some(pair_id),
        })
    }

    /// Score every pair input against the primary concepts and the raw
    /// utterance; accept the best pair when its score clears the threshold.
    fn corpus_match(
        &self,
        activation: &ActivationResult,
        corpus: &mut TrainingCorpus,
        utterance: &str,
    ) -> Option<SynthesizerOutput> {
        let utterance_lower = utterance.trim().to_lowercase();
        let mut best: Option<(f32, PairId)> = None;

        for pair in corpus.iter() {
            let input_lower = pair.input.to_lowercase();
            let mut score = 0.0;

            for concept in &activation.primary_concepts {
                if input_lower.contains(&concept.to_lowercase()) {
                    score += 3.0;
                }
            }
            for word in tokenize(&pair.input) {
                if activation
                    .primary_concepts
                    .iter()
                    .any(|c| word_similarity(&word, c) > 0.7)
                {
                    score += 2.0;
                }
            }
            if !utterance_lower.is_empty() && input_lower.contains(&utterance_lower) {
                score += 2.0;
            }

            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, pair.id));
            }
        }

        let (score, pair_id) = best?;
        if score <= CORPUS_MATCH_THRESHOLD {
            return None;
        }

        let _ = corpus.record_usage(pair_id);
        let pair = corpus.get(pair_id)?;
        let cleaned = self.clean_output(&pair.output, &pair.input);
        Some(SynthesizerOutput {
            response: cleaned,
            confidence: (activation.confidence + 0.2).min(0.9),
            used_training: Some(pair_id),
        })
    }

    /// Strip boilerplate lead-ins, drop a leading echo of the input, dedup
    /// near-identical sentences, and normalize punctuation/capitalization.
    fn clean_output(&self, output: &str, matched_input: &str) -> String {
        let mut text = output.trim().to_string();

        // Repeated passes until no pattern strips anything more.
        loop {
            let before = text.len();
            for pattern in &self.boilerplate {
                text = pattern.replace(&text, "").into_owned();
            }
            if text.len() == before {
                break;
            }
        }

        text = strip_leading_echo(&text, matched_input);
        text = dedup_sentences(&text);
        finalize_sentence(&text)
    }

    /// Build a templated sentence from the primary concepts, or ask for
    /// clarification when nothing activated.
    fn fallback(&self, activation: &ActivationResult, rng: &mut impl Rng) -> SynthesizerOutput {
        let confidence = activation.confidence.max(0.3);

        if activation.primary_concepts.is_empty() {
            return SynthesizerOutput {
                response: "Bu konuda henüz bilgim yok, biraz daha açıklar mısınız?".to_string(),
                confidence,
                used_training: None,
            };
        }

        let concepts = activation.primary_concepts.join(", ");
        let mut response = format!("Anladığım kadarıyla {concepts} hakkında konuşuyorsunuz.");

        let hot: Vec<&str> = activation
            .activation_path
            .iter()
            .filter(|s| s.activation > 0.7 && !activation.primary_concepts.contains(&s.word))
            .map(|s| s.word.as_str())
            .collect();
        if !hot.is_empty() {
            response.push_str(&format!(" Özellikle {} dikkatimi çekti.", hot.join(", ")));
        }

        let mut response = finalize_sentence(&dedup_sentences(&response));
        if rng.gen_bool(EMOJI_PROBABILITY) {
            let pool = emoji_pool(&response);
            response.push(' ');
            response.push_str(pool[rng.gen_range(0..pool.len())]);
        }

        SynthesizerOutput {
            response,
            confidence,
            used_training: None,
        }
    }
}

/// "`subject`, `input`dir." with the trailing question marker stripped and a
/// doubled "-dir" avoided.
fn build_definition_sentence(subject: &str, input: &str) -> String {
    const TRAILING_MARKERS: [&str; 10] = [
        "neresidir", "nerededir", "nedir", "kimdir", "neresi", "nerede", "nasıl", "ne", "kim",
        "midir",
    ];

    let mut words: Vec<&str> = input
        .trim()
        .trim_end_matches(['?', '.', '!'])
        .split_whitespace()
        .collect();
    if let Some(last) = words.last() {
        if TRAILING_MARKERS.contains(&last.to_lowercase().as_str()) {
            let _ = words.pop();
        }
    }

    let mut body = words.join(" ");
    if body.is_empty() {
        body = input.trim().trim_end_matches(['?', '.', '!']).to_string();
    }
    let suffixed = if ends_with_dir_suffix(&body) {
        body
    } else {
        format!("{body}dir")
    };
    capitalize_first(&format!("{subject}, {suffixed}."))
}

fn ends_with_dir_suffix(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["dir", "dır", "dur", "dür", "tir", "tır", "tur", "tür"]
        .iter()
        .any(|s| lower.ends_with(s))
}

/// Drop words from the start of `output` that merely echo the matched
/// input's content words. Keeps at least half the output.
fn strip_leading_echo(output: &str, matched_input: &str) -> String {
    let input_words: std::collections::HashSet<String> =
        tokenize(matched_input).into_iter().collect();
    let words: Vec<&str> = output.split_whitespace().collect();
    if words.is_empty() {
        return output.to_string();
    }

    let mut skip = 0;
    for word in &words {
        let key = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if !key.is_empty() && input_words.contains(&key) && skip < words.len() / 2 {
            skip += 1;
        } else {
            break;
        }
    }
    words[skip..].join(" ")
}

/// Explicit near-duplicate policy: one sentence's words are a subset of the
/// other's, or their token Jaccard overlap reaches the threshold.
pub fn near_duplicate(a: &str, b: &str) -> bool {
    use std::collections::HashSet;
    let wa: HashSet<String> = tokenize(a).into_iter().collect();
    let wb: HashSet<String> = tokenize(b).into_iter().collect();
    if wa.is_empty() || wb.is_empty() {
        return wa.is_empty() && wb.is_empty();
    }
    wa.is_subset(&wb) || wb.is_subset(&wa) || token_jaccard(a, b) >= NEAR_DUPLICATE_JACCARD
}

/// Remove sentences that near-duplicate an earlier kept one.
pub fn dedup_sentences(text: &str) -> String {
    let mut kept: Vec<String> = Vec::new();
    for raw in text.split_inclusive(['.', '!', '?']) {
        let sentence = raw.trim();
        if sentence.is_empty() {
            continue;
        }
        let body = sentence.trim_end_matches(['.', '!', '?']);
        if body.is_empty() {
            continue;
        }
        if !kept
            .iter()
            .any(|k| near_duplicate(k.trim_end_matches(['.', '!', '?']), body))
        {
            kept.push(sentence.to_string());
        }
    }
    if kept.is_empty() {
        text.trim().to_string()
    } else {
        kept.join(" ")
    }
}

/// Ensure trailing sentence punctuation and a capitalized first letter.
fn finalize_sentence(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let mut out = capitalize_first(trimmed);
    if !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    out
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Pick an emoji pool by sniffing the generated text's mood.
fn emoji_pool(text: &str) -> &'static [&'static str] {
    const KNOWLEDGE: [&str; 4] = ["📚", "💡", "🧠", "🔍"];
    const ADVICE: [&str; 4] = ["👍", "✨", "🙌", "💪"];
    const HUMOR: [&str; 4] = ["😄", "😉", "🙃", "😂"];
    const POSITIVE: [&str; 4] = ["😊", "🌟", "👏", "🎉"];

    let lower = text.to_lowercase();
    if lower.contains("bilgi") || lower.contains("öğren") || lower.contains("anla") {
        &KNOWLEDGE
    } else if lower.contains("öneri") || lower.contains("tavsiye") || lower.contains("yapmalı") {
        &ADVICE
    } else if lower.contains("şaka") || lower.contains("komik") || lower.contains("eğlence") {
        &HUMOR
    } else {
        &POSITIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_reverse_lookup_ankara() {
        let now = Utc::now();
        let mut corpus = TrainingCorpus::new();
        let _ = corpus.add("Türkiye'nin başkenti neresidir", "Ankara", now);

        let synth = ResponseSynthesizer::new();
        let out = synth.respond(
            &ActivationResult::default(),
            &mut corpus,
            "Ankara nedir?",
            &mut rng(),
        );

        assert!(out.response.contains("Ankara"), "{}", out.response);
        assert!(out.response.contains("başkenti"), "{}", out.response);
        assert!(out.confidence >= 0.56);
        assert!(out.used_training.is_some());
    }

    #[test]
    fn test_reverse_lookup_requires_question() {
        let now = Utc::now();
        let mut corpus = TrainingCorpus::new();
        let _ = corpus.add("Türkiye'nin başkenti neresidir", "Ankara", now);

        let synth = ResponseSynthesizer::new();
        let out = synth.respond(
            &ActivationResult::default(),
            &mut corpus,
            "Ankara güzel bir şehir",
            &mut rng(),
        );

        // No question marker, no reverse lookup; nothing activated either.
        assert!(out.used_training.is_none());
    }

    #[test]
    fn test_corpus_match_uses_primary_concepts() {
        let now = Utc::now();
        let mut corpus = TrainingCorpus::new();
        let target = corpus.add("kedi nasıl beslenir", "Kediler günde iki kez mama yer.", now);
        let _ = corpus.add("araba nasıl çalışır", "Motor yakıt yakar.", now);

        let activation = ActivationResult {
            primary_concepts: vec!["kedi".into(), "beslenir".into()],
            confidence: 0.5,
            ..Default::default()
        };

        let synth = ResponseSynthesizer::new();
        let out = synth.respond(&activation, &mut corpus, "kedi beslenmesi", &mut rng());

        assert_eq!(out.used_training, Some(target));
        assert!(out.response.contains("mama"));
        assert!((out.confidence - 0.7).abs() < 0.001);
        assert_eq!(corpus.get(target).unwrap().usage_count, 1);
    }

    #[test]
    fn test_corpus_match_confidence_capped() {
        let now = Utc::now();
        let mut corpus = TrainingCorpus::new();
        let _ = corpus.add("kedi nasıl beslenir", "Kediler günde iki kez mama yer.", now);

        let activation = ActivationResult {
            primary_concepts: vec!["kedi".into(), "beslenir".into()],
            confidence: 0.95,
            ..Default::default()
        };

        let synth = ResponseSynthesizer::new();
        let out = synth.respond(&activation, &mut corpus, "kedi", &mut rng());
        assert!(out.confidence <= 0.9);
    }

    #[test]
    fn test_boilerplate_stripped_repeatedly() {
        let synth = ResponseSynthesizer::new();
        let cleaned = synth.clean_output(
            "Bu konuyla ilgili bildiğim: Bu konuyla ilgili bildiğim: kediler sadıktır",
            "kedi",
        );
        assert_eq!(cleaned, "Kediler sadıktır.");
    }

    #[test]
    fn test_leading_echo_stripped() {
        let synth = ResponseSynthesizer::new();
        let cleaned = synth.clean_output("kedi beslenmesi çok önemlidir bence", "kedi beslenmesi");
        assert!(cleaned.starts_with("Çok önemlidir"), "{cleaned}");
    }

    #[test]
    fn test_near_duplicate_subset_rule() {
        assert!(near_duplicate("kediler mama yer", "kediler mama yer bazen"));
        assert!(near_duplicate("kediler mama yer bazen", "kediler mama yer"));
        assert!(!near_duplicate("kediler mama yer", "köpekler kemik sever"));
    }

    #[test]
    fn test_dedup_sentences() {
        let text = "Kediler mama yer. Kediler mama yer bazen. Köpekler kemik sever.";
        let deduped = dedup_sentences(text);
        assert!(deduped.contains("Köpekler"));
        assert_eq!(deduped.matches("mama").count(), 1);
    }

    #[test]
    fn test_fallback_with_concepts() {
        let activation = ActivationResult {
            primary_concepts: vec!["hava".into(), "yağmur".into()],
            confidence: 0.3,
            ..Default::default()
        };
        let synth = ResponseSynthesizer::new();
        let mut corpus = TrainingCorpus::new();

        let out = synth.respond(&activation, &mut corpus, "hava durumu", &mut rng());

        assert!(out.response.contains("hava"));
        assert!(out.response.contains("yağmur"));
        assert!(out.confidence >= 0.3);
        assert!(out.used_training.is_none());
    }

    #[test]
    fn test_fallback_without_concepts_asks_for_clarification() {
        let synth = ResponseSynthesizer::new();
        let mut corpus = TrainingCorpus::new();

        let out = synth.respond(
            &ActivationResult::default(),
            &mut corpus,
            "xyzw",
            &mut rng(),
        );

        assert!(out.response.contains("bilgim yok"));
        assert_eq!(out.confidence, 0.3);
    }

    #[test]
    fn test_definition_sentence_avoids_double_dir() {
        let s = build_definition_sentence("Ankara", "Türkiye'nin başkentidir");
        assert_eq!(s.matches("dir").count(), 1, "{s}");
        assert!(s.ends_with('.'));
    }

    #[test]
    fn test_confidence_always_in_unit_interval() {
        let synth = ResponseSynthesizer::new();
        let mut corpus = TrainingCorpus::new();
        let now = Utc::now();
        let _ = corpus.add("soru", "cevap", now);

        for utterance in ["soru nedir", "cevap nedir?", "", "hiç alakasız"] {
            let out = synth.respond(
                &ActivationResult::default(),
                &mut corpus,
                utterance,
                &mut rng(),
            );
            assert!((0.0..=1.0).contains(&out.confidence), "{utterance:?}");
        }
    }
}
