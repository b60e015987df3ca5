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

//! Conversations and their turns

use crate::evaluation::SpanEvaluation;
use crate::metrics::PartialQaMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Score assumed for a conversation with no evaluated spans
pub const DEFAULT_OVERALL_SCORE: f64 = 70.0;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanType {
    User,
    Assistant,
}

/// One message turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSpan {
    pub id: String,
    #[serde(default)]
    pub start_index: usize,
    #[serde(default)]
    pub end_index: usize,
    pub text: String,
    #[serde(rename = "type")]
    pub span_type: SpanType,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<SpanEvaluation>,
}

impl ConversationSpan {
    /// Unevaluated span covering the whole of `text`
    pub fn new(
        id: impl Into<String>,
        span_type: SpanType,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            start_index: 0,
            end_index: text.chars().count(),
            text,
            span_type,
            timestamp,
            evaluation: None,
        }
    }

    pub fn with_evaluation(mut self, evaluation: SpanEvaluation) -> Self {
        self.evaluation = Some(evaluation);
        self
    }

    pub fn is_user(&self) -> bool {
        self.span_type == SpanType::User
    }

    pub fn is_assistant(&self) -> bool {
        self.span_type == SpanType::Assistant
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStep {
    pub id: String,
    pub name: String,
    pub intent: String,
    pub success: bool,
    /// Milliseconds
    pub duration: u64,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

/// Ordered dialogue steps with their outcomes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationFlow {
    pub id: String,
    #[serde(default)]
    pub steps: Vec<FlowStep>,
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub average_steps: f64,
    #[serde(default)]
    pub dropoff_points: Vec<String>,
}

impl ConversationFlow {
    /// Ids of steps that did not succeed, in order
    pub fn failed_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| !s.success)
            .map(|s| s.id.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub intent: String,
    pub resolved: bool,
    /// 0 means "not rated"
    #[serde(default)]
    pub satisfaction: f64,
    #[serde(default)]
    pub key_topics: Vec<String>,
}

/// A conversation with its spans, flow and summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAnalysis {
    pub id: String,
    pub user_id: String,
    pub bot_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub spans: Vec<ConversationSpan>,
    #[serde(default = "default_overall_score")]
    pub overall_score: f64,
    #[serde(default)]
    pub metrics: PartialQaMetrics,
    #[serde(default)]
    pub flow: ConversationFlow,
    pub summary: ConversationSummary,
}

fn default_overall_score() -> f64 {
    DEFAULT_OVERALL_SCORE
}

impl ConversationAnalysis {
    /// Evaluations of every evaluated span, in span order
    pub fn evaluations(&self) -> impl Iterator<Item = &SpanEvaluation> {
        self.spans.iter().filter_map(|s| s.evaluation.as_ref())
    }

    /// Mean score of evaluated spans, or 70 when none are evaluated
    pub fn mean_span_score(&self) -> f64 {
        let (sum, count) = self
            .evaluations()
            .fold((0.0, 0usize), |(sum, n), e| (sum + f64::from(e.score), n + 1));
        if count == 0 {
            DEFAULT_OVERALL_SCORE
        } else {
            sum / count as f64
        }
    }

    /// Store [`Self::mean_span_score`] into `overall_score`
    pub fn refresh_overall_score(&mut self) {
        self.overall_score = self.mean_span_score();
    }

    /// Wall-clock duration in minutes
    pub fn duration_minutes(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0 / 60.0
    }

    pub fn span(&self, span_id: &str) -> Option<&ConversationSpan> {
        self.spans.iter().find(|s| s.id == span_id)
    }
}
