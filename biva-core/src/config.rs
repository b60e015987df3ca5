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

//! Configuration for scoring thresholds and externally supplied metrics
//!
//! Every field has a default matching the dashboard's behavior, so an empty
//! TOML document is a valid configuration.
//!
//! ```toml
//! evaluator_name = "auto_evaluator"
//!
//! [thresholds]
//! pass = 70
//! fail = 50
//!
//! [external]
//! token_efficiency = 82.0
//! ```

use crate::error::{MetricsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name recorded on automatically produced evaluations
pub const DEFAULT_EVALUATOR_NAME: &str = "auto_evaluator";

/// Score thresholds used by evaluation, aggregation and trend classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Spans scoring at or above this pass
    pub pass: u8,
    /// Spans scoring below this fail (independent of `pass`)
    pub fail: u8,
    /// Composite scores below this are candidates for automatic issues
    pub issue: u8,
    /// Accuracy issues are `high` below this, `medium` otherwise
    pub high_severity: u8,
    /// Sentiment below this always raises a tone issue
    pub tone: f64,
    /// Relevance below this raises a relevance issue (threshold policy only)
    pub relevance_floor: f64,
    /// Percent change beyond which a trend is up or down
    pub trend_band: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            pass: 70,
            fail: 50,
            issue: 70,
            high_severity: 50,
            tone: -20.0,
            relevance_floor: 50.0,
            trend_band: 5.0,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("pass", self.pass),
            ("fail", self.fail),
            ("issue", self.issue),
            ("high_severity", self.high_severity),
        ] {
            if value > 100 {
                return Err(MetricsError::Config(format!(
                    "thresholds.{} must be within 0..=100, got {}",
                    name, value
                )));
            }
        }
        if self.fail > self.pass {
            return Err(MetricsError::Config(format!(
                "thresholds.fail ({}) must not exceed thresholds.pass ({})",
                self.fail, self.pass
            )));
        }
        if !(-100.0..=0.0).contains(&self.tone) {
            return Err(MetricsError::Config(format!(
                "thresholds.tone must be within -100..=0, got {}",
                self.tone
            )));
        }
        if !(0.0..=100.0).contains(&self.relevance_floor) {
            return Err(MetricsError::Config(format!(
                "thresholds.relevance_floor must be within 0..=100, got {}",
                self.relevance_floor
            )));
        }
        if !self.trend_band.is_finite() || self.trend_band < 0.0 {
            return Err(MetricsError::Config(format!(
                "thresholds.trend_band must be a non-negative number, got {}",
                self.trend_band
            )));
        }
        Ok(())
    }
}

/// Metrics with no derivation in this library.
///
/// They come from the QA backend and are copied verbatim into aggregated
/// records. All zero unless configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalMetrics {
    pub token_efficiency: f64,
    pub context_maintenance: f64,
    pub escalation_rate: f64,
}

impl ExternalMetrics {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("token_efficiency", self.token_efficiency),
            ("context_maintenance", self.context_maintenance),
            ("escalation_rate", self.escalation_rate),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(MetricsError::Config(format!(
                    "external.{} must be within 0..=100, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub evaluator_name: String,
    pub thresholds: Thresholds,
    pub external: ExternalMetrics,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            evaluator_name: DEFAULT_EVALUATOR_NAME.to_string(),
            thresholds: Thresholds::default(),
            external: ExternalMetrics::default(),
        }
    }
}

impl QaConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: QaConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!("Loaded QA config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.evaluator_name.trim().is_empty() {
            return Err(MetricsError::Config(
                "evaluator_name must not be empty".to_string(),
            ));
        }
        self.thresholds.validate()?;
        self.external.validate()
    }
}
