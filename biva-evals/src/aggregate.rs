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

//! Aggregation of span evaluations into corpus-level QA metrics

use biva_core::{
    ConversationAnalysis, ExternalMetrics, QaConfig, QaMetrics, SpanEvaluation, Thresholds,
};
use tracing::debug;

/// Running arithmetic mean over the values that are present
#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Folds conversations into a [`QaMetrics`] record
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    thresholds: Thresholds,
    external: ExternalMetrics,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &QaConfig) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            external: config.external.clone(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Values copied into `tokenEfficiency`, `contextMaintenance` and
    /// `escalationRate`
    pub fn with_external(mut self, external: ExternalMetrics) -> Self {
        self.external = external;
        self
    }

    /// Aggregate over every span of every conversation.
    ///
    /// An empty slice yields the all-zero record.
    pub fn aggregate(&self, conversations: &[ConversationAnalysis]) -> QaMetrics {
        if conversations.is_empty() {
            return QaMetrics::zeroed();
        }

        let mut total_spans = 0usize;
        let mut evaluated = 0usize;
        let mut passed = 0usize;
        let mut failed = 0usize;
        let mut defective = 0usize;

        let mut bleu = Mean::default();
        let mut rouge = Mean::default();
        let mut semantic = Mean::default();
        let mut intent = Mean::default();
        let mut sentiment = Mean::default();
        let mut relevance = Mean::default();

        let mut response_time = Mean::default();
        let mut satisfaction = Mean::default();
        let mut resolution_time = Mean::default();
        let mut resolved = 0usize;

        for conv in conversations {
            total_spans += conv.spans.len();

            for eval in conv.evaluations() {
                evaluated += 1;
                if eval.score >= self.thresholds.pass {
                    passed += 1;
                }
                if eval.score < self.thresholds.fail {
                    failed += 1;
                }
                if eval.has_issues() {
                    defective += 1;
                }
                push_sub_metrics(
                    eval,
                    [
                        &mut bleu,
                        &mut rouge,
                        &mut semantic,
                        &mut intent,
                        &mut sentiment,
                        &mut relevance,
                    ],
                );
            }

            // positional pairing: only odd indices, each preceded by its partner
            for i in (1..conv.spans.len()).step_by(2) {
                let (user, bot) = (&conv.spans[i - 1], &conv.spans[i]);
                if bot.is_assistant() && user.is_user() {
                    let gap_ms = (bot.timestamp - user.timestamp).num_milliseconds();
                    response_time.push(Some(gap_ms as f64 / 1000.0));
                }
            }

            if conv.summary.satisfaction > 0.0 {
                satisfaction.push(Some(conv.summary.satisfaction));
            }

            if conv.summary.resolved {
                resolved += 1;
                resolution_time.push(Some(conv.duration_minutes()));
            }
        }

        debug!(
            "Aggregated {} conversation(s): {} span(s), {} evaluated, {} resolved",
            conversations.len(),
            total_spans,
            evaluated,
            resolved
        );

        let completion = percent(resolved, conversations.len());

        QaMetrics {
            defect_density: percent(defective, total_spans),
            test_coverage: percent(evaluated, total_spans),
            pass_rate: percent(passed, evaluated),
            fail_rate: percent(failed, evaluated),

            bleu_score: bleu.value(),
            rouge_score: rouge.value(),
            semantic_similarity: semantic.value(),
            intent_accuracy: intent.value(),
            sentiment_score: sentiment.value(),
            response_relevance: relevance.value(),

            conversation_completion_rate: completion,
            average_response_time: response_time.value(),
            token_efficiency: self.external.token_efficiency,
            context_maintenance: self.external.context_maintenance,

            user_satisfaction: satisfaction.value(),
            task_success_rate: completion,
            escalation_rate: self.external.escalation_rate,
            resolution_time: resolution_time.value(),
        }
    }
}

fn push_sub_metrics(eval: &SpanEvaluation, means: [&mut Mean; 6]) {
    let values = [
        eval.bleu_score,
        eval.rouge_score,
        eval.semantic_similarity,
        eval.intent_accuracy,
        eval.sentiment_score,
        eval.response_relevance,
    ];
    for (mean, value) in means.into_iter().zip(values) {
        mean.push(value);
    }
}

/// Aggregate with default thresholds and zero external metrics
pub fn aggregate(conversations: &[ConversationAnalysis]) -> QaMetrics {
    MetricsAggregator::new().aggregate(conversations)
}

/// Aggregate with explicit external metrics and thresholds
pub fn aggregate_with(
    conversations: &[ConversationAnalysis],
    external: &ExternalMetrics,
    thresholds: &Thresholds,
) -> QaMetrics {
    MetricsAggregator::new()
        .with_external(external.clone())
        .with_thresholds(thresholds.clone())
        .aggregate(conversations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use biva_core::{
        ConversationFlow, ConversationSpan, ConversationSummary, IssueSeverity, IssueType,
        PartialQaMetrics, QaIssue, SpanType,
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap()
    }

    fn eval(score: u8) -> SpanEvaluation {
        SpanEvaluation::manual(score, "qa", t0())
    }

    fn user(id: &str, secs: i64) -> ConversationSpan {
        ConversationSpan::new(id, SpanType::User, "question", t0() + Duration::seconds(secs))
    }

    fn bot(id: &str, secs: i64) -> ConversationSpan {
        ConversationSpan::new(id, SpanType::Assistant, "answer", t0() + Duration::seconds(secs))
    }

    fn conversation(
        spans: Vec<ConversationSpan>,
        resolved: bool,
        satisfaction: f64,
        minutes: i64,
    ) -> ConversationAnalysis {
        ConversationAnalysis {
            id: "conv".to_string(),
            user_id: "user".to_string(),
            bot_id: "bot_1".to_string(),
            start_time: t0(),
            end_time: t0() + Duration::minutes(minutes),
            spans,
            overall_score: 70.0,
            metrics: PartialQaMetrics::default(),
            flow: ConversationFlow::default(),
            summary: ConversationSummary {
                intent: "support".to_string(),
                resolved,
                satisfaction,
                key_topics: vec![],
            },
        }
    }

    #[test]
    fn test_empty_input_is_zeroed() {
        assert_eq!(aggregate(&[]), QaMetrics::zeroed());
    }

    #[test]
    fn test_coverage_with_one_evaluated_span() {
        let conv = conversation(
            vec![user("u", 0), bot("b", 2).with_evaluation(eval(80))],
            true,
            0.0,
            5,
        );
        let metrics = aggregate(&[conv]);
        assert_eq!(metrics.test_coverage, 50.0);
        assert_eq!(metrics.pass_rate, 100.0);
        assert_eq!(metrics.fail_rate, 0.0);
        assert_eq!(metrics.defect_density, 0.0);
    }

    #[test]
    fn test_pass_and_fail_are_independent() {
        let conv = conversation(
            vec![
                bot("a", 0).with_evaluation(eval(90)),
                bot("b", 0).with_evaluation(eval(60)),
                bot("c", 0).with_evaluation(eval(40)),
                bot("d", 0).with_evaluation(eval(70)),
            ],
            false,
            0.0,
            1,
        );
        let metrics = aggregate(&[conv]);
        assert_eq!(metrics.pass_rate, 50.0);
        assert_eq!(metrics.fail_rate, 25.0);
    }

    #[test]
    fn test_sub_metric_means_skip_missing_fields() {
        let mut with_intent = eval(80);
        with_intent.bleu_score = Some(40.0);
        with_intent.intent_accuracy = Some(100.0);
        let mut without_intent = eval(60);
        without_intent.bleu_score = Some(60.0);

        let conv = conversation(
            vec![
                bot("a", 0).with_evaluation(with_intent),
                bot("b", 0).with_evaluation(without_intent),
            ],
            false,
            0.0,
            1,
        );
        let metrics = aggregate(&[conv]);
        assert_eq!(metrics.bleu_score, 50.0);
        assert_eq!(metrics.intent_accuracy, 100.0);
        assert_eq!(metrics.rouge_score, 0.0);
    }

    #[test]
    fn test_defect_density() {
        let mut flagged = eval(30);
        flagged.add_issue(QaIssue::automated(
            "i1",
            IssueType::Accuracy,
            IssueSeverity::High,
            "off topic",
        ));
        let conv = conversation(
            vec![
                user("u", 0),
                bot("b", 1).with_evaluation(flagged),
                user("u2", 2),
                bot("b2", 3).with_evaluation(eval(90)),
            ],
            false,
            0.0,
            1,
        );
        assert_eq!(aggregate(&[conv]).defect_density, 25.0);
    }

    #[test]
    fn test_response_time_uses_positional_pairs() {
        // u(0) b(4) | u(10) b(12): two pairs, mean 3s
        let aligned = conversation(
            vec![user("u1", 0), bot("b1", 4), user("u2", 10), bot("b2", 12)],
            false,
            0.0,
            1,
        );
        assert_eq!(aggregate(&[aligned]).average_response_time, 3.0);

        // b(0) u(1) b(5): the only user->assistant adjacency sits at index 2,
        // which the odd-index scan never inspects
        let shifted = conversation(vec![bot("b0", 0), user("u1", 1), bot("b1", 5)], false, 0.0, 1);
        assert_eq!(aggregate(&[shifted]).average_response_time, 0.0);
    }

    #[test]
    fn test_business_metrics() {
        let convs = vec![
            conversation(vec![user("u", 0)], true, 80.0, 10),
            conversation(vec![user("u", 0)], true, 0.0, 20),
            conversation(vec![user("u", 0)], false, 60.0, 99),
            conversation(vec![user("u", 0)], false, 0.0, 5),
        ];
        let metrics = aggregate(&convs);
        assert_eq!(metrics.conversation_completion_rate, 50.0);
        assert_eq!(metrics.task_success_rate, 50.0);
        assert_eq!(metrics.user_satisfaction, 70.0);
        assert_eq!(metrics.resolution_time, 15.0);
        assert_eq!(metrics.test_coverage, 0.0);
        assert_eq!(metrics.pass_rate, 0.0);
    }

    #[test]
    fn test_conversations_without_spans() {
        let metrics = aggregate(&[conversation(vec![], true, 0.0, 3)]);
        assert_eq!(metrics.test_coverage, 0.0);
        assert_eq!(metrics.defect_density, 0.0);
        assert_eq!(metrics.conversation_completion_rate, 100.0);
    }

    #[test]
    fn test_external_metrics_and_thresholds() {
        let external = ExternalMetrics {
            token_efficiency: 76.8,
            context_maintenance: 82.5,
            escalation_rate: 8.7,
        };
        let thresholds = Thresholds {
            pass: 90,
            ..Thresholds::default()
        };
        let aggregator = MetricsAggregator::new()
            .with_external(external)
            .with_thresholds(thresholds);

        let conv = conversation(vec![bot("b", 0).with_evaluation(eval(80))], false, 0.0, 1);
        let metrics = aggregator.aggregate(&[conv]);
        assert_eq!(metrics.token_efficiency, 76.8);
        assert_eq!(metrics.context_maintenance, 82.5);
        assert_eq!(metrics.escalation_rate, 8.7);
        assert_eq!(metrics.pass_rate, 0.0);

        // empty input ignores external values too
        assert_eq!(aggregator.aggregate(&[]), QaMetrics::zeroed());
    }

    #[test]
    fn test_aggregate_with_matches_builder() {
        let external = ExternalMetrics {
            token_efficiency: 50.0,
            ..ExternalMetrics::default()
        };
        let thresholds = Thresholds {
            fail: 65,
            ..Thresholds::default()
        };
        let conv = conversation(vec![bot("b", 0).with_evaluation(eval(60))], false, 0.0, 1);

        let metrics = aggregate_with(&[conv.clone()], &external, &thresholds);
        assert_eq!(metrics.token_efficiency, 50.0);
        assert_eq!(metrics.fail_rate, 100.0);
        assert_eq!(
            metrics,
            MetricsAggregator::new()
                .with_external(external)
                .with_thresholds(thresholds)
                .aggregate(&[conv])
        );
    }
}
