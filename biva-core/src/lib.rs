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

//! BIVA Core
//!
//! Data model shared by the BIVA QA crates: conversations and their spans,
//! per-span evaluations, aggregated QA metric records, trend records,
//! configuration and the common error type.

pub mod config;
pub mod conversation;
pub mod error;
pub mod evaluation;
pub mod metrics;

pub use config::{ExternalMetrics, QaConfig, Thresholds, DEFAULT_EVALUATOR_NAME};
pub use conversation::{
    ConversationAnalysis, ConversationFlow, ConversationSpan, ConversationSummary, FlowStep,
    SpanType, DEFAULT_OVERALL_SCORE,
};
pub use error::{MetricsError, Result};
pub use evaluation::{
    Annotation, AnnotationType, IssueSeverity, IssueType, QaIssue, QaIssuePatch, SpanEvaluation,
    MAX_SCORE,
};
pub use metrics::{
    HistoryEntry, MetricName, MetricTrend, PartialQaMetrics, QaMetrics, TrendDirection,
    TrendPoint,
};
