// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Approximate text-quality metrics
//!
//! Cheap, deterministic stand-ins for the NLP metrics the QA backend computes
//! properly. They are used to pre-fill span evaluations and to populate demo
//! data, never as the system of record.
//!
//! ## Metrics Implemented
//!
//! - **Lexical overlap** ("BLEU"): unigram precision of the candidate against
//!   the reference token set. No n-grams, no brevity penalty.
//! - **LCS overlap** ("ROUGE-L"): harmonic mean of LCS precision and recall
//! - **Jaccard similarity**: token-set intersection over union
//! - **Keyword sentiment**: ±10 per listed positive/negative word
//! - **Response relevance**: bidirectional substring match of keywords
//! - **Intent accuracy** and **token efficiency**
//!
//! Every function is total. Division-by-zero cases return a fixed value
//! (0, or 50 for relevance with no user keywords).
//!
//! ## Usage
//!
//! ```rust
//! use biva_evals::scoring::{lexical_overlap, lcs_overlap, sentiment_score};
//!
//! assert_eq!(lexical_overlap("hello world", "hello world"), 100.0);
//! assert_eq!(lcs_overlap("hello world", ""), 0.0);
//! assert_eq!(sentiment_score("This is good and great"), 20.0);
//! ```

use biva_core::{MetricsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Words scoring +10 in [`sentiment_score`]
pub const POSITIVE_WORDS: [&str; 8] = [
    "good",
    "great",
    "excellent",
    "amazing",
    "wonderful",
    "perfect",
    "love",
    "best",
];

/// Words scoring -10 in [`sentiment_score`]
pub const NEGATIVE_WORDS: [&str; 8] = [
    "bad",
    "terrible",
    "awful",
    "horrible",
    "worst",
    "hate",
    "disgusting",
    "poor",
];

/// Function words dropped by [`extract_keywords`]
pub const STOP_WORDS: [&str; 32] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will", "would",
    "could", "should", "can", "may",
];

/// Relevance reported when the user message has no keywords
pub const NEUTRAL_RELEVANCE: f64 = 50.0;

const SENTIMENT_STEP: i64 = 10;
const SENTIMENT_LIMIT: i64 = 100;

/// Lowercase and split on runs of whitespace
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Unigram precision of `candidate` against `reference`, in [0, 100]
///
/// Every candidate token found anywhere in the reference counts as a match,
/// repeats included.
pub fn lexical_overlap(reference: &str, candidate: &str) -> f64 {
    let cand_tokens = tokenize(candidate);
    if cand_tokens.is_empty() {
        return 0.0;
    }

    let ref_tokens = token_set(reference);
    let matches = cand_tokens
        .iter()
        .filter(|t| ref_tokens.contains(t.as_str()))
        .count();

    (matches as f64 / cand_tokens.len() as f64).min(1.0) * 100.0
}

/// Harmonic mean of LCS precision and recall, in [0, 100]
pub fn lcs_overlap(reference: &str, candidate: &str) -> f64 {
    let ref_tokens = tokenize(reference);
    let cand_tokens = tokenize(candidate);

    if ref_tokens.is_empty() || cand_tokens.is_empty() {
        return 0.0;
    }

    let lcs = lcs_length(&ref_tokens, &cand_tokens) as f64;
    let precision = lcs / cand_tokens.len() as f64;
    let recall = lcs / ref_tokens.len() as f64;

    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall) * 100.0
}

/// Length of the longest common subsequence of two token sequences
///
/// O(n·m) time, rolling rows over the shorter sequence.
pub fn lcs_length<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let (short, long) = if a.len() < b.len() { (a, b) } else { (b, a) };

    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];

    for i in 1..=long.len() {
        for j in 1..=short.len() {
            curr[j] = if long[i - 1] == short[j - 1] {
                prev[j - 1] + 1
            } else {
                prev[j].max(curr[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// Token-set Jaccard similarity, in [0, 100]
pub fn jaccard_similarity(text1: &str, text2: &str) -> f64 {
    let a = token_set(text1);
    let b = token_set(text2);

    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();

    intersection as f64 / union as f64 * 100.0
}

/// Keyword-list sentiment, in [-100, 100]
///
/// Tokens must match a listed word exactly after lowercasing; "good!" does
/// not count.
pub fn sentiment_score(text: &str) -> f64 {
    let score: i64 = tokenize(text)
        .iter()
        .map(|word| {
            let mut delta = 0;
            if POSITIVE_WORDS.contains(&word.as_str()) {
                delta += SENTIMENT_STEP;
            }
            if NEGATIVE_WORDS.contains(&word.as_str()) {
                delta -= SENTIMENT_STEP;
            }
            delta
        })
        .sum();

    score.clamp(-SENTIMENT_LIMIT, SENTIMENT_LIMIT) as f64
}

/// Lowercased tokens longer than two characters that are not stop words,
/// deduplicated in first-seen order
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|word| word.chars().count() > 2 && !STOP_WORDS.contains(&word.as_str()))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

/// Share of user keywords echoed by the response, in [0, 100]
///
/// A keyword is echoed when it contains, or is contained in, any response
/// keyword. Returns [`NEUTRAL_RELEVANCE`] when the user message has no
/// keywords.
pub fn response_relevance(user_message: &str, bot_response: &str) -> f64 {
    let user_keywords = extract_keywords(user_message);
    if user_keywords.is_empty() {
        return NEUTRAL_RELEVANCE;
    }

    let response_keywords = extract_keywords(bot_response);
    let relevant = user_keywords
        .iter()
        .filter(|keyword| {
            response_keywords.iter().any(|resp| {
                resp.contains(keyword.as_str()) || keyword.contains(resp.as_str())
            })
        })
        .count();

    relevant as f64 / user_keywords.len() as f64 * 100.0
}

/// 100 when both intents match case-insensitively, else 0
pub fn intent_accuracy(predicted_intent: &str, actual_intent: &str) -> f64 {
    if predicted_intent.to_lowercase() == actual_intent.to_lowercase() {
        100.0
    } else {
        0.0
    }
}

/// Information density of a response with a length penalty, floored at 0
///
/// Density is the share of `required_info` items found (case-insensitive
/// substring) in the response. Responses longer than 20 tokens lose 1% per
/// extra token; shorter ones gain 1% per missing token, so a short complete
/// answer scores above 100.
pub fn token_efficiency(response: &str, required_info: &[&str]) -> f64 {
    if required_info.is_empty() {
        return 100.0;
    }

    let tokens = response.split_whitespace().count() as f64;
    let lowered = response.to_lowercase();
    let provided = required_info
        .iter()
        .filter(|info| lowered.contains(&info.to_lowercase()))
        .count();

    let density = provided as f64 / required_info.len() as f64;
    let length_penalty = (1.0 - (tokens - 20.0) / 100.0).max(0.0);

    (density * length_penalty * 100.0).max(0.0)
}

/// Grouped access to the scoring functions
pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn bleu(reference: &str, candidate: &str) -> f64 {
        lexical_overlap(reference, candidate)
    }

    pub fn rouge(reference: &str, candidate: &str) -> f64 {
        lcs_overlap(reference, candidate)
    }

    pub fn semantic_similarity(text1: &str, text2: &str) -> f64 {
        jaccard_similarity(text1, text2)
    }

    pub fn sentiment(text: &str) -> f64 {
        sentiment_score(text)
    }

    pub fn relevance(user_message: &str, bot_response: &str) -> f64 {
        response_relevance(user_message, bot_response)
    }

    pub fn intent_accuracy(predicted_intent: &str, actual_intent: &str) -> f64 {
        intent_accuracy(predicted_intent, actual_intent)
    }

    pub fn token_efficiency(response: &str, required_info: &[&str]) -> f64 {
        token_efficiency(response, required_info)
    }
}

/// Reference/candidate pair as read from JSON input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPair {
    pub reference: String,
    pub candidate: String,
}

impl TextPair {
    pub fn new(reference: impl Into<String>, candidate: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            candidate: candidate.into(),
        }
    }

    /// Build from a JSON object, rejecting null, missing or non-string texts
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let field = |name: &str| -> Result<String> {
            match value.get(name) {
                Some(serde_json::Value::String(s)) => Ok(s.clone()),
                Some(serde_json::Value::Null) | None => Err(MetricsError::invalid(format!(
                    "text pair field `{}` is missing or null",
                    name
                ))),
                Some(other) => Err(MetricsError::invalid(format!(
                    "text pair field `{}` must be a string, got {}",
                    name, other
                ))),
            }
        };

        Ok(Self {
            reference: field("reference")?,
            candidate: field("candidate")?,
        })
    }
}
