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

//! Report breakdowns over a set of conversations
//!
//! Issue counts, the quality-score distribution and the weekday/hour activity
//! grid, plus a [`QaReport`] bundling them with aggregated metrics and trends
//! for one bot.

use crate::aggregate::MetricsAggregator;
use crate::trend::{metric_trends, DEFAULT_TREND_BAND};
use biva_core::{
    ConversationAnalysis, HistoryEntry, IssueSeverity, IssueType, MetricName, MetricTrend,
    QaMetrics, Result,
};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Score bands shown on the quality chart, highest first: (label, inclusive lower bound)
pub const QUALITY_BANDS: [(&str, f64); 5] = [
    ("90-100", 90.0),
    ("80-89", 80.0),
    ("70-79", 70.0),
    ("60-69", 60.0),
    ("0-59", f64::NEG_INFINITY),
];

const MAX_BUCKET_EXAMPLES: usize = 3;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Count of issues per type across all evaluated spans
pub fn issue_breakdown(conversations: &[ConversationAnalysis]) -> BTreeMap<IssueType, usize> {
    let mut counts = BTreeMap::new();
    for issue in conversations
        .iter()
        .flat_map(|c| c.evaluations())
        .flat_map(|e| e.issues.iter())
    {
        *counts.entry(issue.issue_type).or_insert(0) += 1;
    }
    counts
}

/// Count of issues per severity across all evaluated spans
pub fn severity_breakdown(
    conversations: &[ConversationAnalysis],
) -> BTreeMap<IssueSeverity, usize> {
    let mut counts = BTreeMap::new();
    for issue in conversations
        .iter()
        .flat_map(|c| c.evaluations())
        .flat_map(|e| e.issues.iter())
    {
        *counts.entry(issue.severity).or_insert(0) += 1;
    }
    counts
}

/// Number of conversations in which each flow step failed
pub fn failed_step_breakdown(conversations: &[ConversationAnalysis]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for step in conversations.iter().flat_map(|c| c.flow.failed_steps()) {
        *counts.entry(step.to_string()).or_insert(0) += 1;
    }
    counts
}

/// One band of the quality distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityBucket {
    pub range: String,
    pub count: usize,
    pub percentage: f64,
    /// Up to three conversation ids from this band
    pub examples: Vec<String>,
}

/// Distribution of conversations' overall scores over [`QUALITY_BANDS`]
pub fn quality_distribution(conversations: &[ConversationAnalysis]) -> Vec<QualityBucket> {
    let mut buckets: Vec<QualityBucket> = QUALITY_BANDS
        .iter()
        .map(|(range, _)| QualityBucket {
            range: range.to_string(),
            count: 0,
            percentage: 0.0,
            examples: Vec::new(),
        })
        .collect();

    for conv in conversations {
        let index = QUALITY_BANDS
            .iter()
            .position(|(_, lower)| conv.overall_score >= *lower)
            .unwrap_or(QUALITY_BANDS.len() - 1);
        let bucket = &mut buckets[index];
        bucket.count += 1;
        if bucket.examples.len() < MAX_BUCKET_EXAMPLES {
            bucket.examples.push(conv.id.clone());
        }
    }

    if !conversations.is_empty() {
        for bucket in &mut buckets {
            bucket.percentage = bucket.count as f64 / conversations.len() as f64 * 100.0;
        }
    }
    buckets
}

/// Conversation count for one weekday/hour slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub hour: u32,
    pub day: String,
    pub value: f64,
    pub metric: String,
}

/// Conversations started per weekday and hour (UTC).
///
/// Always 168 cells, Monday first, hours ascending.
pub fn activity_heatmap(conversations: &[ConversationAnalysis]) -> Vec<HeatmapCell> {
    let mut grid = [[0usize; 24]; 7];
    for conv in conversations {
        let day = conv.start_time.weekday().num_days_from_monday() as usize;
        let hour = conv.start_time.hour() as usize;
        grid[day][hour] += 1;
    }

    WEEKDAYS
        .iter()
        .zip(grid.iter())
        .flat_map(|(weekday, hours)| {
            hours.iter().enumerate().map(move |(hour, count)| HeatmapCell {
                hour: hour as u32,
                day: weekday.to_string(),
                value: *count as f64,
                metric: "conversationVolume".to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// QA report for a single bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaReport {
    pub id: String,
    pub bot_id: String,
    /// Earliest start to latest end; absent when the bot has no conversations
    pub period: Option<ReportPeriod>,
    pub metrics: QaMetrics,
    pub conversation_count: usize,
    pub issue_breakdown: BTreeMap<IssueType, usize>,
    pub severity_breakdown: BTreeMap<IssueSeverity, usize>,
    /// Failures per flow step id
    pub failed_steps: BTreeMap<String, usize>,
    pub quality_distribution: Vec<QualityBucket>,
    pub trends: Vec<MetricTrend>,
}

impl QaReport {
    /// Build the report for `bot_id` from the conversations belonging to it
    pub fn build(
        bot_id: &str,
        conversations: &[ConversationAnalysis],
        history: &[HistoryEntry],
        trend_metrics: &[MetricName],
        aggregator: &MetricsAggregator,
    ) -> Result<Self> {
        Self::build_with_band(
            bot_id,
            conversations,
            history,
            trend_metrics,
            aggregator,
            DEFAULT_TREND_BAND,
        )
    }

    pub fn build_with_band(
        bot_id: &str,
        conversations: &[ConversationAnalysis],
        history: &[HistoryEntry],
        trend_metrics: &[MetricName],
        aggregator: &MetricsAggregator,
        trend_band: f64,
    ) -> Result<Self> {
        let own: Vec<ConversationAnalysis> = conversations
            .iter()
            .filter(|c| c.bot_id == bot_id)
            .cloned()
            .collect();
        debug!(
            "Building report for {} from {} of {} conversation(s)",
            bot_id,
            own.len(),
            conversations.len()
        );

        let period = match (
            own.iter().map(|c| c.start_time).min(),
            own.iter().map(|c| c.end_time).max(),
        ) {
            (Some(start), Some(end)) => Some(ReportPeriod { start, end }),
            _ => None,
        };

        Ok(Self {
            id: format!("report_{}", Uuid::new_v4().simple()),
            bot_id: bot_id.to_string(),
            period,
            metrics: aggregator.aggregate(&own),
            conversation_count: own.len(),
            issue_breakdown: issue_breakdown(&own),
            severity_breakdown: severity_breakdown(&own),
            failed_steps: failed_step_breakdown(&own),
            quality_distribution: quality_distribution(&own),
            trends: metric_trends(history, trend_metrics, trend_band)?,
        })
    }
}
