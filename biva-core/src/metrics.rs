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

//! QA metric records
//!
//! `QaMetrics` is the fixed 18-field record produced by aggregation.
//! `PartialQaMetrics` is the same shape with every field optional, used for
//! per-conversation snapshots and for trend history entries.

use crate::error::MetricsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! qa_metric_fields {
    ($( $(#[$doc:meta])* $field:ident => $variant:ident = $wire:literal, )*) => {
        /// Name of one of the QA metrics, spelled the way the dashboard spells it
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum MetricName {
            $(
                $(#[$doc])*
                #[serde(rename = $wire)]
                $variant,
            )*
        }

        impl MetricName {
            /// Every metric, in record order
            pub const ALL: &'static [MetricName] = &[$(MetricName::$variant),*];

            /// Wire name (camelCase)
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(MetricName::$variant => $wire,)*
                }
            }
        }

        impl FromStr for MetricName {
            type Err = MetricsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(MetricName::$variant),)*
                    other => Err(MetricsError::UnknownMetric(other.to_string())),
                }
            }
        }

        /// Complete QA metrics record
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct QaMetrics {
            $(
                $(#[$doc])*
                pub $field: f64,
            )*
        }

        impl QaMetrics {
            /// Value of a single metric
            pub fn get(&self, metric: MetricName) -> f64 {
                match metric {
                    $(MetricName::$variant => self.$field,)*
                }
            }

            /// Overwrite a single metric
            pub fn set(&mut self, metric: MetricName, value: f64) {
                match metric {
                    $(MetricName::$variant => self.$field = value,)*
                }
            }
        }

        /// QA metrics record where every field may be absent
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase", default)]
        pub struct PartialQaMetrics {
            $(
                $(#[$doc])*
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field: Option<f64>,
            )*
        }

        impl PartialQaMetrics {
            /// Value of a single metric, if present
            pub fn get(&self, metric: MetricName) -> Option<f64> {
                match metric {
                    $(MetricName::$variant => self.$field,)*
                }
            }

            /// Set or clear a single metric
            pub fn set(&mut self, metric: MetricName, value: Option<f64>) {
                match metric {
                    $(MetricName::$variant => self.$field = value,)*
                }
            }
        }

        impl From<&QaMetrics> for PartialQaMetrics {
            fn from(metrics: &QaMetrics) -> Self {
                Self {
                    $($field: Some(metrics.$field),)*
                }
            }
        }
    };
}

qa_metric_fields! {
    /// Percentage of spans carrying at least one issue
    defect_density => DefectDensity = "defectDensity",
    /// Percentage of spans that were evaluated
    test_coverage => TestCoverage = "testCoverage",
    /// Percentage of evaluated spans at or above the pass threshold
    pass_rate => PassRate = "passRate",
    /// Percentage of evaluated spans below the fail threshold
    fail_rate => FailRate = "failRate",
    /// Mean lexical overlap score
    bleu_score => BleuScore = "bleuScore",
    /// Mean LCS overlap score
    rouge_score => RougeScore = "rougeScore",
    /// Mean Jaccard similarity
    semantic_similarity => SemanticSimilarity = "semanticSimilarity",
    /// Mean intent accuracy
    intent_accuracy => IntentAccuracy = "intentAccuracy",
    /// Mean keyword sentiment (-100..100)
    sentiment_score => SentimentScore = "sentimentScore",
    /// Mean keyword relevance
    response_relevance => ResponseRelevance = "responseRelevance",
    /// Percentage of resolved conversations
    conversation_completion_rate => ConversationCompletionRate = "conversationCompletionRate",
    /// Mean user-to-assistant gap in seconds
    average_response_time => AverageResponseTime = "averageResponseTime",
    /// Supplied externally, never derived here
    token_efficiency => TokenEfficiency = "tokenEfficiency",
    /// Supplied externally, never derived here
    context_maintenance => ContextMaintenance = "contextMaintenance",
    /// Mean non-zero satisfaction
    user_satisfaction => UserSatisfaction = "userSatisfaction",
    /// Percentage of resolved conversations
    task_success_rate => TaskSuccessRate = "taskSuccessRate",
    /// Supplied externally, never derived here
    escalation_rate => EscalationRate = "escalationRate",
    /// Mean duration of resolved conversations in minutes
    resolution_time => ResolutionTime = "resolutionTime",
}

impl QaMetrics {
    /// Canonical all-zero record
    pub fn zeroed() -> Self {
        Self::default()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a metric over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

/// One dated metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: DateTime<Utc>,
    pub value: f64,
}

/// Trend of one metric over an ordered history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTrend {
    pub metric: MetricName,
    /// Points in ascending date order
    pub values: Vec<TrendPoint>,
    pub trend: TrendDirection,
    pub change_percent: f64,
}

/// Historical metrics snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub metrics: PartialQaMetrics,
}
