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

//! Metric trends over a dated history

use biva_core::{
    HistoryEntry, MetricName, MetricTrend, MetricsError, Result, TrendDirection, TrendPoint,
};
use tracing::debug;

/// Default percent change beyond which a trend is up or down
pub const DEFAULT_TREND_BAND: f64 = 5.0;

/// Classify a percent change against a symmetric band.
///
/// Only the magnitude of `band` is used.
pub fn classify(change_percent: f64, band: f64) -> TrendDirection {
    let band = band.abs();
    if change_percent > band {
        TrendDirection::Up
    } else if change_percent < -band {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}

/// Trend of `metric` across `history` with the default band
pub fn metric_trend(history: &[HistoryEntry], metric: MetricName) -> Result<MetricTrend> {
    metric_trend_with(history, metric, DEFAULT_TREND_BAND)
}

/// Trend of `metric` across `history`.
///
/// Entries lacking the metric are skipped; the rest are ordered by date
/// (stable for equal dates). Non-finite values and a negative or non-finite
/// band are rejected.
pub fn metric_trend_with(
    history: &[HistoryEntry],
    metric: MetricName,
    band: f64,
) -> Result<MetricTrend> {
    let points = history
        .iter()
        .filter_map(|entry| {
            entry.metrics.get(metric).map(|value| TrendPoint {
                date: entry.date,
                value,
            })
        })
        .collect::<Vec<_>>();

    trend_from_points(metric, points, band)
}

/// Trends for several metrics over the same history
pub fn metric_trends(
    history: &[HistoryEntry],
    metrics: &[MetricName],
    band: f64,
) -> Result<Vec<MetricTrend>> {
    metrics
        .iter()
        .map(|metric| metric_trend_with(history, *metric, band))
        .collect()
}

/// Build a trend from points in any order.
///
/// Fewer than two points, a first value of zero, or a change too large to
/// represent give a stable trend with zero change.
pub fn trend_from_points(
    metric: MetricName,
    mut points: Vec<TrendPoint>,
    band: f64,
) -> Result<MetricTrend> {
    if !band.is_finite() || band < 0.0 {
        return Err(MetricsError::invalid(format!(
            "trend band must be a non-negative number, got {}",
            band
        )));
    }
    if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
        return Err(MetricsError::invalid(format!(
            "{} on {} is not a finite number",
            metric, bad.date
        )));
    }

    points.sort_by_key(|p| p.date);

    let change_percent = match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() >= 2 => {
            if first.value == 0.0 {
                debug!("{} starts at zero; reporting a stable trend", metric);
                0.0
            } else {
                let change = (last.value - first.value) / first.value * 100.0;
                if change.is_finite() {
                    change
                } else {
                    debug!(
                        "{} change from {} to {} overflows; reporting a stable trend",
                        metric, first.value, last.value
                    );
                    0.0
                }
            }
        }
        _ => 0.0,
    };

    Ok(MetricTrend {
        metric,
        values: points,
        trend: classify(change_percent, band),
        change_percent,
    })
}
