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

//! Per-span evaluation records
//!
//! A `SpanEvaluation` is attached to a single conversation turn. Automatic
//! scoring fills the numeric fields and may append issues; reviewers then edit
//! the issue list and add annotations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Highest composite score a span can carry
pub const MAX_SCORE: u8 = 100;

/// Category of a QA issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Accuracy,
    Relevance,
    Tone,
    Completeness,
    Safety,
    Hallucination,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Accuracy => "accuracy",
            IssueType::Relevance => "relevance",
            IssueType::Tone => "tone",
            IssueType::Completeness => "completeness",
            IssueType::Safety => "safety",
            IssueType::Hallucination => "hallucination",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue severity levels, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Quality issue found on a span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaIssue {
    pub id: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: IssueSeverity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Whether the issue was raised by automatic scoring
    pub automated: bool,
}

impl QaIssue {
    /// Issue raised by automatic scoring
    pub fn automated(
        id: impl Into<String>,
        issue_type: IssueType,
        severity: IssueSeverity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            issue_type,
            severity,
            description: description.into(),
            suggestion: None,
            automated: true,
        }
    }

    /// Issue entered by a reviewer
    pub fn manual(
        id: impl Into<String>,
        issue_type: IssueType,
        severity: IssueSeverity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            automated: false,
            ..Self::automated(id, issue_type, severity, description)
        }
    }

    /// Apply a reviewer edit; absent patch fields are left untouched
    pub fn apply(&mut self, patch: QaIssuePatch) {
        if let Some(issue_type) = patch.issue_type {
            self.issue_type = issue_type;
        }
        if let Some(severity) = patch.severity {
            self.severity = severity;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(suggestion) = patch.suggestion {
            self.suggestion = suggestion;
        }
    }
}

/// Partial edit of a [`QaIssue`]
///
/// `suggestion: Some(None)` clears the suggestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QaIssuePatch {
    pub issue_type: Option<IssueType>,
    pub severity: Option<IssueSeverity>,
    pub description: Option<String>,
    pub suggestion: Option<Option<String>>,
}

/// Reviewer verdict on a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationType {
    Correct,
    Incorrect,
    Partial,
    Irrelevant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    pub span_id: String,
    #[serde(rename = "type")]
    pub annotation_type: AnnotationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub annotator: String,
    pub timestamp: DateTime<Utc>,
}

/// Evaluation of one conversation turn
///
/// Percentage fields are in 0..=100, `sentiment_score` in -100..=100. Every
/// sub-metric is independently optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanEvaluation {
    /// Composite score (0-100)
    #[serde(deserialize_with = "deserialize_score")]
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bleu_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rouge_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_similarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_relevance: Option<f64>,
    #[serde(default)]
    pub issues: Vec<QaIssue>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    pub evaluated_by: String,
    pub evaluated_at: DateTime<Utc>,
}

fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let score = u8::deserialize(deserializer)?;
    if score > MAX_SCORE {
        return Err(serde::de::Error::custom(format!(
            "score {} is outside 0..={}",
            score, MAX_SCORE
        )));
    }
    Ok(score)
}

impl SpanEvaluation {
    /// Evaluation with only a composite score, as entered by a reviewer
    pub fn manual(score: u8, evaluated_by: impl Into<String>, evaluated_at: DateTime<Utc>) -> Self {
        Self {
            score: score.min(MAX_SCORE),
            bleu_score: None,
            rouge_score: None,
            semantic_similarity: None,
            intent_accuracy: None,
            sentiment_score: None,
            response_relevance: None,
            issues: Vec::new(),
            annotations: Vec::new(),
            evaluated_by: evaluated_by.into(),
            evaluated_at,
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Whether the composite score reaches `threshold`
    pub fn passed(&self, threshold: u8) -> bool {
        self.score >= threshold
    }

    pub fn add_issue(&mut self, issue: QaIssue) {
        self.issues.push(issue);
    }

    /// Edit an issue in place. Returns false when no issue has that id.
    pub fn update_issue(&mut self, issue_id: &str, patch: QaIssuePatch) -> bool {
        match self.issues.iter_mut().find(|i| i.id == issue_id) {
            Some(issue) => {
                issue.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Remove an issue by id. Returns false when no issue has that id.
    pub fn remove_issue(&mut self, issue_id: &str) -> bool {
        let before = self.issues.len();
        self.issues.retain(|i| i.id != issue_id);
        self.issues.len() != before
    }

    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }
}
