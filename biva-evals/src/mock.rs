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

//! Seeded demo data in the dashboard's shape
//!
//! Conversations are built from canned support exchanges and scored with a
//! [`SpanEvaluator`] using [`SampledIssuePolicy`]. Everything draws from
//! seeded `StdRng`s, so a seed fully determines the output.

use crate::span_eval::{SampledIssuePolicy, SpanEvaluator};
use crate::trend::{trend_from_points, DEFAULT_TREND_BAND};
use biva_core::{
    ConversationAnalysis, ConversationFlow, ConversationSpan, ConversationSummary, FlowStep,
    MetricName, MetricTrend, PartialQaMetrics, Result, SpanType, TrendPoint,
    DEFAULT_OVERALL_SCORE,
};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const USER_MESSAGES: [&str; 10] = [
    "Hi, I need help with my order",
    "What are your business hours?",
    "I want to cancel my subscription",
    "How do I reset my password?",
    "Can you help me track my package?",
    "I'm having trouble logging in",
    "What's your return policy?",
    "I need to update my payment method",
    "Can you explain the pricing?",
    "I have a billing question",
];

const BOT_RESPONSES: [&str; 10] = [
    "I'd be happy to help you with your order. Can you provide your order number?",
    "Our business hours are Monday-Friday 9 AM to 6 PM EST.",
    "I can help you cancel your subscription. Let me check your account details.",
    "To reset your password, please click on 'Forgot Password' on the login page.",
    "I can help you track your package. Please provide your tracking number.",
    "I understand you're having login issues. Let me help you troubleshoot this.",
    "Our return policy allows returns within 30 days of purchase with original receipt.",
    "I can help you update your payment method. Please go to Account Settings.",
    "I'd be happy to explain our pricing plans. We have three tiers available.",
    "I can help with your billing question. What specific issue are you experiencing?",
];

const FOLLOW_UP_USER: &str = "Thank you for your help!";
const FOLLOW_UP_BOT: &str = "You're welcome! Is there anything else I can help you with?";

const INTENTS: [&str; 4] = ["support", "billing", "technical", "sales"];
const TOPICS: [&str; 5] = ["order", "account", "payment", "shipping", "login"];

/// Metrics given a daily history by [`MockDataGenerator::trends`]
pub const TRENDED_METRICS: [MetricName; 4] = [
    MetricName::BleuScore,
    MetricName::RougeScore,
    MetricName::IntentAccuracy,
    MetricName::UserSatisfaction,
];

const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

pub struct MockDataGenerator {
    rng: StdRng,
    evaluator: SpanEvaluator<SampledIssuePolicy<StdRng>>,
}

impl MockDataGenerator {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let policy = SampledIssuePolicy::new(StdRng::seed_from_u64(rng.gen()));
        Self {
            rng,
            evaluator: SpanEvaluator::new(policy),
        }
    }

    /// `count` conversations started within the week before `now`
    pub fn conversations(&mut self, count: usize, now: DateTime<Utc>) -> Vec<ConversationAnalysis> {
        (0..count).map(|i| self.conversation(i, now)).collect()
    }

    fn conversation(&mut self, i: usize, now: DateTime<Utc>) -> ConversationAnalysis {
        let start = now - Duration::milliseconds(self.rng.gen_range(0..WEEK_MS));
        let length_ms = ((5.0 + self.rng.gen::<f64>() * 20.0) * 60_000.0) as i64;
        let end = start + Duration::milliseconds(length_ms);

        let user_msg = USER_MESSAGES[self.rng.gen_range(0..USER_MESSAGES.len())];
        let bot_msg = BOT_RESPONSES[self.rng.gen_range(0..BOT_RESPONSES.len())];

        let mut spans = vec![
            ConversationSpan::new(format!("span_{}_user", i), SpanType::User, user_msg, start),
            ConversationSpan::new(
                format!("span_{}_bot", i),
                SpanType::Assistant,
                bot_msg,
                start + Duration::seconds(30),
            )
            .with_evaluation(self.evaluator.evaluate_at(user_msg, bot_msg, now)),
        ];

        if self.rng.gen::<f64>() > 0.3 {
            spans.push(ConversationSpan::new(
                format!("span_{}_user_2", i),
                SpanType::User,
                FOLLOW_UP_USER,
                start + Duration::seconds(120),
            ));
            spans.push(
                ConversationSpan::new(
                    format!("span_{}_bot_2", i),
                    SpanType::Assistant,
                    FOLLOW_UP_BOT,
                    start + Duration::seconds(150),
                )
                .with_evaluation(self.evaluator.evaluate_at(FOLLOW_UP_USER, FOLLOW_UP_BOT, now)),
            );
        }

        let user_id = format!("user_{}", self.rng.gen_range(0..100));
        let bot_id = format!("bot_{}", self.rng.gen_range(1..=4));
        let metrics = self.snapshot_metrics();
        let flow = self.flow(i);
        let summary = self.summary();

        let mut conversation = ConversationAnalysis {
            id: format!("conv_{}", i + 1),
            user_id,
            bot_id,
            start_time: start,
            end_time: end,
            spans,
            overall_score: DEFAULT_OVERALL_SCORE,
            metrics,
            flow,
            summary,
        };
        conversation.refresh_overall_score();
        conversation
    }

    fn uniform(&mut self, low: f64, width: f64) -> f64 {
        low + self.rng.gen::<f64>() * width
    }

    fn snapshot_metrics(&mut self) -> PartialQaMetrics {
        PartialQaMetrics {
            bleu_score: Some(self.uniform(70.0, 25.0)),
            rouge_score: Some(self.uniform(65.0, 30.0)),
            semantic_similarity: Some(self.uniform(75.0, 20.0)),
            intent_accuracy: Some(self.uniform(80.0, 20.0)),
            sentiment_score: Some(self.uniform(-10.0, 80.0)),
            response_relevance: Some(self.uniform(70.0, 25.0)),
            ..PartialQaMetrics::default()
        }
    }

    fn flow(&mut self, i: usize) -> ConversationFlow {
        fn step(
            id: &str,
            name: &str,
            intent: &str,
            success: bool,
            duration: u64,
            next: &str,
        ) -> FlowStep {
            FlowStep {
                id: id.to_string(),
                name: name.to_string(),
                intent: intent.to_string(),
                success,
                duration,
                next_steps: vec![next.to_string()],
            }
        }
        let response_ok = self.rng.gen::<f64>() > 0.2;

        ConversationFlow {
            id: format!("flow_{}", i),
            steps: vec![
                step("greeting", "Greeting", "greeting", true, 1000, "inquiry"),
                step("inquiry", "User Inquiry", "help_request", true, 2000, "response"),
                step("response", "Bot Response", "provide_help", response_ok, 1500, "closure"),
            ],
            success_rate: self.uniform(85.0, 15.0),
            average_steps: self.uniform(3.0, 2.0),
            dropoff_points: if self.rng.gen::<f64>() > 0.8 {
                vec!["response".to_string()]
            } else {
                Vec::new()
            },
        }
    }

    fn summary(&mut self) -> ConversationSummary {
        let intent = INTENTS[self.rng.gen_range(0..INTENTS.len())].to_string();
        let resolved = self.rng.gen::<f64>() > 0.2;
        let satisfaction = self.uniform(60.0, 40.0);
        let topic_count = 2 + self.rng.gen_range(0..2);

        ConversationSummary {
            intent,
            resolved,
            satisfaction,
            key_topics: TOPICS[..topic_count].iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Daily histories for [`TRENDED_METRICS`] covering `days` days up to
    /// `now`, drifting upward 0.3 per day with ±5 noise, clamped to [0, 100]
    pub fn trends(&mut self, now: DateTime<Utc>, days: u32) -> Result<Vec<MetricTrend>> {
        TRENDED_METRICS
            .iter()
            .map(|metric| {
                let base = self.uniform(70.0, 20.0);
                let points = (0..=days)
                    .rev()
                    .map(|back| {
                        let drift = f64::from(days - back) * 0.3;
                        let noise = (self.rng.gen::<f64>() - 0.5) * 10.0;
                        TrendPoint {
                            date: now - Duration::days(i64::from(back)),
                            value: (base + drift + noise).clamp(0.0, 100.0),
                        }
                    })
                    .collect();
                trend_from_points(*metric, points, DEFAULT_TREND_BAND)
            })
            .collect()
    }
}
