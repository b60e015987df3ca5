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

//! BIVA QA CLI
//!
//! Scores conversations, aggregates QA metrics and builds reports from JSON
//! files. Results go to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use biva_core::{ConversationAnalysis, HistoryEntry, MetricName, QaConfig};
use biva_evals::{
    metric_trend_with, MetricsAggregator, MockDataGenerator, NoIssuePolicy, QaReport,
    SpanEvaluator, SpanScores, TextPair, ThresholdIssuePolicy,
};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "biva")]
#[command(about = "BIVA QA - conversation quality metrics", long_about = None)]
struct Cli {
    /// QA configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Policy {
    /// Raise accuracy and relevance issues from score thresholds
    Threshold,
    /// Only the tone rule raises issues
    #[value(name = "none")]
    Disabled,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one assistant reply against the user message it answers
    Score {
        /// User message
        #[arg(long)]
        user: String,

        /// Assistant reply
        #[arg(long)]
        bot: String,

        /// How automatic accuracy/relevance issues are raised
        #[arg(long, value_enum, default_value = "threshold")]
        policy: Policy,
    },

    /// Score a JSON array of {"reference", "candidate"} pairs
    Pairs {
        /// Pairs file (JSON)
        file: PathBuf,
    },

    /// Fill in missing span evaluations
    Evaluate {
        /// Conversations file (JSON array)
        file: PathBuf,
    },

    /// Aggregate QA metrics over conversations
    Aggregate {
        /// Conversations file (JSON array)
        file: PathBuf,
    },

    /// Trend of one metric over a history
    Trend {
        /// History file (JSON array of {"date", "metrics"})
        file: PathBuf,

        /// Metric name, e.g. bleuScore
        #[arg(long)]
        metric: MetricName,
    },

    /// Build the QA report for one bot
    Report {
        /// Conversations file (JSON array)
        file: PathBuf,

        /// Bot to report on
        #[arg(long)]
        bot_id: String,

        /// History file for trends
        #[arg(long)]
        history: Option<PathBuf>,

        /// Metrics to trend (defaults to every metric present in the history)
        #[arg(long = "metric")]
        metrics: Vec<MetricName>,
    },

    /// Generate demo conversations
    Mock {
        /// Number of conversations
        #[arg(long, default_value_t = 20)]
        count: usize,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Also generate daily metric trends covering this many days
        #[arg(long)]
        trend_days: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => QaConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => QaConfig::default(),
    };

    match cli.command {
        Commands::Score { user, bot, policy } => {
            let eval = match policy {
                Policy::Threshold => {
                    SpanEvaluator::from_config(&config, ThresholdIssuePolicy).evaluate(&user, &bot)
                }
                Policy::Disabled => {
                    SpanEvaluator::from_config(&config, NoIssuePolicy).evaluate(&user, &bot)
                }
            };
            emit(&eval, cli.pretty)?;
        }

        Commands::Pairs { file } => {
            let raw: Vec<serde_json::Value> = read_json(&file)?;
            let scores = raw
                .iter()
                .enumerate()
                .map(|(i, value)| -> Result<SpanScores> {
                    let pair = TextPair::from_json(value)
                        .with_context(|| format!("Invalid pair at index {}", i))?;
                    Ok(SpanScores::compute(&pair.reference, &pair.candidate))
                })
                .collect::<Result<Vec<_>>>()?;
            info!("Scored {} pair(s)", scores.len());
            emit(&scores, cli.pretty)?;
        }

        Commands::Evaluate { file } => {
            let mut conversations: Vec<ConversationAnalysis> = read_json(&file)?;
            let mut evaluator = SpanEvaluator::from_config(&config, ThresholdIssuePolicy);
            let evaluated: usize = conversations
                .iter_mut()
                .map(|c| evaluator.evaluate_conversation(c))
                .sum();
            info!(
                "Evaluated {} span(s) across {} conversation(s)",
                evaluated,
                conversations.len()
            );
            emit(&conversations, cli.pretty)?;
        }

        Commands::Aggregate { file } => {
            let conversations: Vec<ConversationAnalysis> = read_json(&file)?;
            let metrics = MetricsAggregator::from_config(&config).aggregate(&conversations);
            emit(&metrics, cli.pretty)?;
        }

        Commands::Trend { file, metric } => {
            let history: Vec<HistoryEntry> = read_json(&file)?;
            let trend = metric_trend_with(&history, metric, config.thresholds.trend_band)
                .with_context(|| format!("Failed to compute {} trend", metric))?;
            emit(&trend, cli.pretty)?;
        }

        Commands::Report {
            file,
            bot_id,
            history,
            metrics,
        } => {
            let conversations: Vec<ConversationAnalysis> = read_json(&file)?;
            let history: Vec<HistoryEntry> = match history {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };
            let metrics = if metrics.is_empty() {
                metrics_in_history(&history)
            } else {
                metrics
            };
            debug!("Trending {} metric(s) for {}", metrics.len(), bot_id);

            let report = QaReport::build_with_band(
                &bot_id,
                &conversations,
                &history,
                &metrics,
                &MetricsAggregator::from_config(&config),
                config.thresholds.trend_band,
            )
            .with_context(|| format!("Failed to build report for {}", bot_id))?;
            info!(
                "Report {} covers {} conversation(s)",
                report.id, report.conversation_count
            );
            emit(&report, cli.pretty)?;
        }

        Commands::Mock {
            count,
            seed,
            trend_days,
        } => {
            let now = Utc::now();
            let mut generator = MockDataGenerator::new(seed);
            let conversations = generator.conversations(count, now);
            match trend_days {
                Some(days) => {
                    let trends = generator
                        .trends(now, days)
                        .context("Failed to generate mock trends")?;
                    emit(
                        &serde_json::json!({
                            "conversations": conversations,
                            "trends": trends,
                        }),
                        cli.pretty,
                    )?;
                }
                None => emit(&conversations, cli.pretty)?,
            }
        }
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("Failed to parse {}", path.display()))
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

/// Metrics with at least one value somewhere in the history
fn metrics_in_history(history: &[HistoryEntry]) -> Vec<MetricName> {
    MetricName::ALL
        .iter()
        .copied()
        .filter(|m| history.iter().any(|h| h.metrics.get(*m).is_some()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use biva_core::PartialQaMetrics;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_score_policy() {
        let cli = Cli::try_parse_from([
            "biva", "score", "--user", "hi", "--bot", "hello", "--policy", "none",
        ])
        .unwrap();
        match cli.command {
            Commands::Score { policy, .. } => assert_eq!(policy, Policy::Disabled),
            _ => panic!("expected score"),
        }
    }

    #[test]
    fn test_parse_report_metrics() {
        let cli = Cli::try_parse_from([
            "biva",
            "--pretty",
            "report",
            "convs.json",
            "--bot-id",
            "bot_1",
            "--metric",
            "bleuScore",
            "--metric",
            "passRate",
        ])
        .unwrap();
        assert!(cli.pretty);
        match cli.command {
            Commands::Report { metrics, bot_id, .. } => {
                assert_eq!(bot_id, "bot_1");
                assert_eq!(metrics, vec![MetricName::BleuScore, MetricName::PassRate]);
            }
            _ => panic!("expected report"),
        }
    }

    #[test]
    fn test_unknown_metric_rejected() {
        assert!(Cli::try_parse_from(["biva", "trend", "h.json", "--metric", "nope"]).is_err());
    }

    #[test]
    fn test_metrics_in_history() {
        let history = vec![HistoryEntry {
            date: Utc::now(),
            metrics: PartialQaMetrics {
                rouge_score: Some(60.0),
                pass_rate: Some(80.0),
                ..PartialQaMetrics::default()
            },
        }];
        assert_eq!(
            metrics_in_history(&history),
            vec![MetricName::PassRate, MetricName::RougeScore]
        );
        assert!(metrics_in_history(&[]).is_empty());
    }

    #[test]
    fn test_read_json_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = read_json::<Vec<HistoryEntry>>(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
