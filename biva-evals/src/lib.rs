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

//! # BIVA QA Evaluations
//!
//! Client-side approximations of the conversation QA metrics shown on the
//! BIVA dashboard.
//!
//! ## Features
//!
//! - **Scoring**: lexical overlap, LCS overlap, Jaccard similarity, keyword
//!   sentiment, keyword relevance, intent accuracy, token efficiency
//! - **Span auto-evaluation**: composite score plus automatic issues chosen by
//!   a pluggable [`IssuePolicy`]
//! - **Aggregation**: corpus-level [`QaMetrics`](biva_core::QaMetrics)
//! - **Trends and reports**: trend classification, issue and quality breakdowns
//! - **Mock data**: seeded demo conversations
//!
//! All scoring is synchronous and side-effect free.
//!
//! ## Example
//!
//! ```rust
//! use biva_evals::{aggregate, SpanEvaluator};
//!
//! let mut evaluator = SpanEvaluator::default();
//! let eval = evaluator.evaluate(
//!     "Can you help me track my package?",
//!     "I can help you track your package. Please provide your tracking number.",
//! );
//! assert!(eval.score <= 100);
//! assert_eq!(aggregate(&[]).pass_rate, 0.0);
//! ```

pub mod aggregate;
pub mod mock;
pub mod report;
pub mod scoring;
pub mod span_eval;
pub mod trend;

pub use aggregate::{aggregate, aggregate_with, MetricsAggregator};
pub use mock::MockDataGenerator;
pub use report::{
    activity_heatmap, failed_step_breakdown, issue_breakdown, quality_distribution,
    severity_breakdown, HeatmapCell, QaReport, QualityBucket, ReportPeriod,
};
pub use scoring::{
    extract_keywords, intent_accuracy, jaccard_similarity, lcs_overlap, lexical_overlap,
    response_relevance, sentiment_score, token_efficiency, tokenize, MetricsCalculator, TextPair,
};
pub use span_eval::{
    IssuePolicy, NoIssuePolicy, PlannedIssue, SampledIssuePolicy, SpanEvaluator, SpanScores,
    ThresholdIssuePolicy,
};
pub use trend::{classify, metric_trend, metric_trend_with, metric_trends, trend_from_points};
