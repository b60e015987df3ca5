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

//! Automatic evaluation of assistant turns
//!
//! [`SpanScores`] holds the deterministic part: five sub-metrics and the
//! rounded composite. Which accuracy/relevance issues get attached to a
//! low-scoring span is decided by an [`IssuePolicy`]; the tone rule is fixed
//! and applied regardless of policy.

use crate::scoring::{
    jaccard_similarity, lcs_overlap, lexical_overlap, response_relevance, sentiment_score,
};
use biva_core::{
    ConversationAnalysis, IssueSeverity, IssueType, MetricsError, QaConfig, QaIssue, Result,
    SpanEvaluation, Thresholds, DEFAULT_EVALUATOR_NAME,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

pub const ACCURACY_ISSUE: &str = "Response may not fully address the user query";
pub const RELEVANCE_ISSUE: &str = "Response relevance could be improved";
pub const TONE_ISSUE: &str = "Tone could be more positive";

/// Sub-metric scores for one user/assistant exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanScores {
    pub bleu: f64,
    pub rouge: f64,
    pub semantic: f64,
    pub sentiment: f64,
    pub relevance: f64,
    /// Rounded mean of bleu, rouge, semantic and relevance
    pub overall: u8,
}

impl SpanScores {
    /// Score `bot` as a reply to `user`. Sentiment is taken from `bot` alone
    /// and does not feed the composite.
    pub fn compute(user: &str, bot: &str) -> Self {
        let bleu = lexical_overlap(user, bot);
        let rouge = lcs_overlap(user, bot);
        let semantic = jaccard_similarity(user, bot);
        let sentiment = sentiment_score(bot);
        let relevance = response_relevance(user, bot);

        let composite = (bleu + rouge + semantic + relevance) / 4.0;
        let overall = composite.round().clamp(0.0, 100.0) as u8;

        Self {
            bleu,
            rouge,
            semantic,
            sentiment,
            relevance,
            overall,
        }
    }
}

/// Issue an [`IssuePolicy`] wants attached
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedIssue {
    pub issue_type: IssueType,
    pub severity: IssueSeverity,
    pub description: String,
}

impl PlannedIssue {
    fn accuracy(overall: u8, thresholds: &Thresholds) -> Self {
        let severity = if overall < thresholds.high_severity {
            IssueSeverity::High
        } else {
            IssueSeverity::Medium
        };
        Self {
            issue_type: IssueType::Accuracy,
            severity,
            description: ACCURACY_ISSUE.to_string(),
        }
    }

    fn relevance() -> Self {
        Self {
            issue_type: IssueType::Relevance,
            severity: IssueSeverity::Medium,
            description: RELEVANCE_ISSUE.to_string(),
        }
    }
}

/// Decides which score-driven issues a low-scoring span receives.
///
/// Only consulted when the composite score is below `thresholds.issue`.
pub trait IssuePolicy {
    fn plan_issues(&mut self, scores: &SpanScores, thresholds: &Thresholds) -> Vec<PlannedIssue>;
}

/// Deterministic rules.
///
/// Always an accuracy issue (`high` below `thresholds.high_severity`,
/// otherwise `medium`); a relevance issue when relevance is also below
/// `thresholds.relevance_floor`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdIssuePolicy;

impl IssuePolicy for ThresholdIssuePolicy {
    fn plan_issues(&mut self, scores: &SpanScores, thresholds: &Thresholds) -> Vec<PlannedIssue> {
        let mut planned = vec![PlannedIssue::accuracy(scores.overall, thresholds)];
        if scores.relevance < thresholds.relevance_floor {
            planned.push(PlannedIssue::relevance());
        }
        planned
    }
}

/// Random sampling as done by the dashboard's demo data: accuracy with
/// probability 0.5, relevance with probability 0.3, independently.
///
/// The random source is injected, so a seeded RNG gives reproducible output.
#[derive(Debug, Clone)]
pub struct SampledIssuePolicy<R> {
    rng: R,
    accuracy_probability: f64,
    relevance_probability: f64,
}

impl<R: Rng> SampledIssuePolicy<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            accuracy_probability: 0.5,
            relevance_probability: 0.3,
        }
    }

    /// Override both probabilities; values are clamped to [0, 1]
    pub fn with_probabilities(mut self, accuracy: f64, relevance: f64) -> Self {
        self.accuracy_probability = accuracy.clamp(0.0, 1.0);
        self.relevance_probability = relevance.clamp(0.0, 1.0);
        self
    }
}

impl<R: Rng> IssuePolicy for SampledIssuePolicy<R> {
    fn plan_issues(&mut self, scores: &SpanScores, thresholds: &Thresholds) -> Vec<PlannedIssue> {
        // both draws happen every time so the stream stays aligned
        let accuracy = self.rng.gen_bool(self.accuracy_probability);
        let relevance = self.rng.gen_bool(self.relevance_probability);

        let mut planned = Vec::new();
        if accuracy {
            planned.push(PlannedIssue::accuracy(scores.overall, thresholds));
        }
        if relevance {
            planned.push(PlannedIssue::relevance());
        }
        planned
    }
}

/// Never attaches score-driven issues. The tone rule still applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIssuePolicy;

impl IssuePolicy for NoIssuePolicy {
    fn plan_issues(&mut self, _scores: &SpanScores, _thresholds: &Thresholds) -> Vec<PlannedIssue> {
        Vec::new()
    }
}

/// Produces [`SpanEvaluation`]s for assistant turns
pub struct SpanEvaluator<P = ThresholdIssuePolicy> {
    policy: P,
    thresholds: Thresholds,
    evaluator_name: String,
}

impl Default for SpanEvaluator<ThresholdIssuePolicy> {
    fn default() -> Self {
        Self::new(ThresholdIssuePolicy)
    }
}

impl<P: IssuePolicy> SpanEvaluator<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            thresholds: Thresholds::default(),
            evaluator_name: DEFAULT_EVALUATOR_NAME.to_string(),
        }
    }

    /// Take thresholds and evaluator name from configuration
    pub fn from_config(config: &QaConfig, policy: P) -> Self {
        Self {
            policy,
            thresholds: config.thresholds.clone(),
            evaluator_name: config.evaluator_name.clone(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_evaluator_name(mut self, name: impl Into<String>) -> Self {
        self.evaluator_name = name.into();
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Evaluate `bot` as a reply to `user`, stamped with the current time
    pub fn evaluate(&mut self, user: &str, bot: &str) -> SpanEvaluation {
        self.evaluate_at(user, bot, Utc::now())
    }

    /// Evaluate `bot` as a reply to `user`, stamped with `evaluated_at`
    pub fn evaluate_at(
        &mut self,
        user: &str,
        bot: &str,
        evaluated_at: DateTime<Utc>,
    ) -> SpanEvaluation {
        let scores = SpanScores::compute(user, bot);

        let mut planned = if scores.overall < self.thresholds.issue {
            self.policy.plan_issues(&scores, &self.thresholds)
        } else {
            Vec::new()
        };

        if scores.sentiment < self.thresholds.tone {
            planned.push(PlannedIssue {
                issue_type: IssueType::Tone,
                severity: IssueSeverity::Low,
                description: TONE_ISSUE.to_string(),
            });
        }

        if !planned.is_empty() {
            debug!(
                "Span scored {} with {} automatic issue(s)",
                scores.overall,
                planned.len()
            );
        }

        let issues = planned
            .into_iter()
            .map(|p| QaIssue::automated(new_issue_id(), p.issue_type, p.severity, p.description))
            .collect();

        SpanEvaluation {
            score: scores.overall,
            bleu_score: Some(scores.bleu),
            rouge_score: Some(scores.rouge),
            semantic_similarity: Some(scores.semantic),
            intent_accuracy: None,
            sentiment_score: Some(scores.sentiment),
            response_relevance: Some(scores.relevance),
            issues,
            annotations: Vec::new(),
            evaluated_by: self.evaluator_name.clone(),
            evaluated_at,
        }
    }

    /// Evaluate an assistant span against the user span right before it
    pub fn evaluate_in_conversation(
        &mut self,
        conversation: &ConversationAnalysis,
        span_id: &str,
    ) -> Result<SpanEvaluation> {
        let index = conversation
            .spans
            .iter()
            .position(|s| s.id == span_id)
            .ok_or_else(|| MetricsError::SpanNotFound(span_id.to_string()))?;

        let span = &conversation.spans[index];
        if !span.is_assistant() {
            return Err(MetricsError::invalid(format!(
                "span {} is not an assistant turn",
                span_id
            )));
        }
        let previous = index
            .checked_sub(1)
            .map(|i| &conversation.spans[i])
            .filter(|s| s.is_user())
            .ok_or_else(|| {
                MetricsError::invalid(format!(
                    "span {} is not directly preceded by a user turn",
                    span_id
                ))
            })?;

        Ok(self.evaluate(&previous.text, &span.text))
    }

    /// Evaluate every unevaluated assistant span that directly follows a user
    /// span, then refresh the conversation's overall score.
    ///
    /// Returns the number of spans evaluated.
    pub fn evaluate_conversation(&mut self, conversation: &mut ConversationAnalysis) -> usize {
        let mut evaluated = 0;
        for i in 1..conversation.spans.len() {
            let (before, rest) = conversation.spans.split_at_mut(i);
            let user = &before[i - 1];
            let bot = &mut rest[0];
            if bot.evaluation.is_some() || !bot.is_assistant() {
                continue;
            }
            if !user.is_user() {
                warn!(
                    "Skipping span {} in conversation {}: not preceded by a user turn",
                    bot.id, conversation.id
                );
                continue;
            }
            bot.evaluation = Some(self.evaluate(&user.text, &bot.text));
            evaluated += 1;
        }
        conversation.refresh_overall_score();
        debug!(
            "Evaluated {} span(s) in conversation {}",
            evaluated, conversation.id
        );
        evaluated
    }
}

fn new_issue_id() -> String {
    format!("issue_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use biva_core::{
        ConversationFlow, ConversationSpan, ConversationSummary, PartialQaMetrics, SpanType,
    };
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const USER: &str = "Can you help me track my package?";
    const BOT: &str = "I can help you track your package. Please provide your tracking number.";

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 2, 14, 30, 0).unwrap()
    }

    fn conversation() -> ConversationAnalysis {
        ConversationAnalysis {
            id: "conv_1".to_string(),
            user_id: "user_1".to_string(),
            bot_id: "bot_1".to_string(),
            start_time: at(),
            end_time: at(),
            spans: vec![
                ConversationSpan::new("u1", SpanType::User, USER, at()),
                ConversationSpan::new("b1", SpanType::Assistant, BOT, at()),
                ConversationSpan::new("b2", SpanType::Assistant, "Anything else?", at()),
                ConversationSpan::new("u2", SpanType::User, "Thank you for your help!", at()),
                ConversationSpan::new(
                    "b3",
                    SpanType::Assistant,
                    "You're welcome! Is there anything else I can help you with?",
                    at(),
                ),
            ],
            overall_score: 70.0,
            metrics: PartialQaMetrics::default(),
            flow: ConversationFlow::default(),
            summary: ConversationSummary::default(),
        }
    }

    fn scores(overall: u8, relevance: f64, sentiment: f64) -> SpanScores {
        SpanScores {
            bleu: 0.0,
            rouge: 0.0,
            semantic: 0.0,
            sentiment,
            relevance,
            overall,
        }
    }

    #[test]
    fn test_scores_composite_excludes_sentiment() {
        let s = SpanScores::compute(USER, BOT);
        let expected = ((s.bleu + s.rouge + s.semantic + s.relevance) / 4.0).round() as u8;
        assert_eq!(s.overall, expected);
    }

    #[test]
    fn test_scores_identical_text() {
        let s = SpanScores::compute("reset password now", "reset password now");
        assert_eq!(s.bleu, 100.0);
        assert_eq!(s.rouge, 100.0);
        assert_eq!(s.semantic, 100.0);
        assert_eq!(s.relevance, 100.0);
        assert_eq!(s.overall, 100);
    }

    #[test]
    fn test_threshold_policy() {
        let thresholds = Thresholds::default();
        let mut policy = ThresholdIssuePolicy;

        let planned = policy.plan_issues(&scores(40, 80.0, 0.0), &thresholds);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].issue_type, IssueType::Accuracy);
        assert_eq!(planned[0].severity, IssueSeverity::High);

        let planned = policy.plan_issues(&scores(60, 20.0, 0.0), &thresholds);
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].severity, IssueSeverity::Medium);
        assert_eq!(planned[1].issue_type, IssueType::Relevance);
        assert_eq!(planned[1].severity, IssueSeverity::Medium);
    }

    #[test]
    fn test_sampled_policy_extremes() {
        let thresholds = Thresholds::default();
        let mut always =
            SampledIssuePolicy::new(StdRng::seed_from_u64(7)).with_probabilities(1.0, 1.0);
        assert_eq!(always.plan_issues(&scores(55, 90.0, 0.0), &thresholds).len(), 2);

        let mut never =
            SampledIssuePolicy::new(StdRng::seed_from_u64(7)).with_probabilities(0.0, 0.0);
        assert!(never.plan_issues(&scores(10, 0.0, 0.0), &thresholds).is_empty());
    }

    #[test]
    fn test_sampled_policy_is_reproducible() {
        let thresholds = Thresholds::default();
        let run = |seed| {
            let mut policy = SampledIssuePolicy::new(StdRng::seed_from_u64(seed));
            (0..20)
                .map(|_| policy.plan_issues(&scores(30, 10.0, 0.0), &thresholds))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_no_issues_above_threshold() {
        let mut evaluator = SpanEvaluator::default();
        let eval = evaluator.evaluate_at("reset password now", "reset password now", at());
        assert_eq!(eval.score, 100);
        assert!(eval.issues.is_empty());
        assert_eq!(eval.evaluated_by, "auto_evaluator");
        assert_eq!(eval.evaluated_at, at());
        assert_eq!(eval.intent_accuracy, None);
        assert_eq!(eval.response_relevance, Some(100.0));
    }

    #[test]
    fn test_low_score_gets_accuracy_issue() {
        let mut evaluator = SpanEvaluator::default();
        let eval = evaluator.evaluate_at(
            "What are your business hours?",
            "Our store sells shoes.",
            at(),
        );
        assert!(eval.score < 50);
        let accuracy = eval
            .issues
            .iter()
            .find(|i| i.issue_type == IssueType::Accuracy)
            .unwrap();
        assert_eq!(accuracy.severity, IssueSeverity::High);
        assert!(accuracy.automated);
        assert!(accuracy.id.starts_with("issue_"));
    }

    #[test]
    fn test_tone_issue_regardless_of_policy() {
        let mut evaluator = SpanEvaluator::new(NoIssuePolicy);
        let eval = evaluator.evaluate_at("how was it", "that was bad terrible awful service", at());
        assert_eq!(eval.sentiment_score, Some(-30.0));
        assert_eq!(eval.issues.len(), 1);
        assert_eq!(eval.issues[0].issue_type, IssueType::Tone);
        assert_eq!(eval.issues[0].severity, IssueSeverity::Low);
        assert_eq!(eval.issues[0].description, TONE_ISSUE);
    }

    #[test]
    fn test_tone_boundary_is_strict() {
        let mut evaluator = SpanEvaluator::new(NoIssuePolicy);
        let eval = evaluator.evaluate_at("x", "bad terrible", at());
        assert_eq!(eval.sentiment_score, Some(-20.0));
        assert!(eval.issues.is_empty());
    }

    #[test]
    fn test_evaluate_in_conversation() {
        let conv = conversation();
        let mut evaluator = SpanEvaluator::default();

        let eval = evaluator.evaluate_in_conversation(&conv, "b1").unwrap();
        assert_eq!(eval.score, SpanScores::compute(USER, BOT).overall);

        assert!(matches!(
            evaluator.evaluate_in_conversation(&conv, "nope"),
            Err(MetricsError::SpanNotFound(_))
        ));
        assert!(matches!(
            evaluator.evaluate_in_conversation(&conv, "u1"),
            Err(MetricsError::InvalidArgument(_))
        ));
        // preceded by an assistant span
        assert!(matches!(
            evaluator.evaluate_in_conversation(&conv, "b2"),
            Err(MetricsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_evaluate_conversation_fills_gaps() {
        let mut conv = conversation();
        let mut evaluator = SpanEvaluator::default();

        let count = evaluator.evaluate_conversation(&mut conv);
        assert_eq!(count, 2);
        assert!(conv.spans[1].evaluation.is_some());
        assert!(conv.spans[2].evaluation.is_none());
        assert!(conv.spans[4].evaluation.is_some());
        assert_eq!(conv.overall_score, conv.mean_span_score());

        // already evaluated spans are left alone
        assert_eq!(evaluator.evaluate_conversation(&mut conv), 0);
    }

    #[test]
    fn test_from_config() {
        let mut config = QaConfig::default();
        config.evaluator_name = "nightly".to_string();
        config.thresholds.issue = 0;
        let mut evaluator = SpanEvaluator::from_config(&config, ThresholdIssuePolicy);
        let eval = evaluator.evaluate_at("a", "b", at());
        assert_eq!(eval.evaluated_by, "nightly");
        // nothing scores below 0, so no accuracy issue
        assert!(eval.issues.is_empty());
        assert_eq!(evaluator.thresholds().issue, 0);
    }
}
