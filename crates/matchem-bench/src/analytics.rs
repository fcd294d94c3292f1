use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::{BenchmarkConfig, StrategyKindConfig};

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("baseline strategy '{0}' not present in simulation results")]
    MissingBaseline(String),
    #[error("strategy '{0}' present in results but missing from configuration")]
    UnknownStrategy(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

/// Accumulates per-trial round counts and produces the run summary.
pub struct AnalyticsCollector {
    baseline: String,
    strategies: HashMap<String, StrategyAccumulator>,
    strategy_order: Vec<String>,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Result<Self, AnalyticsError> {
        let baseline = config
            .metrics
            .baseline
            .clone()
            .ok_or_else(|| AnalyticsError::MissingBaseline("<unset>".into()))?;

        let mut strategies = HashMap::new();
        let mut order = Vec::new();
        for strategy in &config.strategies {
            strategies.insert(
                strategy.name.clone(),
                StrategyAccumulator::new(strategy.name.clone(), strategy.kind),
            );
            order.push(strategy.name.clone());
        }

        if !strategies.contains_key(&baseline) {
            return Err(AnalyticsError::MissingBaseline(baseline));
        }

        Ok(Self {
            baseline,
            strategies,
            strategy_order: order,
        })
    }

    pub fn record_trial(&mut self, strategy: &str, rounds: u32) -> Result<(), AnalyticsError> {
        let acc = self
            .strategies
            .get_mut(strategy)
            .ok_or_else(|| AnalyticsError::UnknownStrategy(strategy.to_string()))?;
        acc.record(rounds);
        Ok(())
    }

    pub fn finalize(mut self) -> Result<AnalyticsSummary, AnalyticsError> {
        // Trials are replayed on the same seed schedule per strategy, so
        // round counts pair up by trial index.
        let baseline_rounds = self
            .strategies
            .get(&self.baseline)
            .map(|acc| acc.rounds.clone())
            .ok_or_else(|| AnalyticsError::MissingBaseline(self.baseline.clone()))?;

        let mut reports = Vec::new();
        let mut comparisons = Vec::new();
        for name in &self.strategy_order {
            let Some(acc) = self.strategies.remove(name) else {
                continue;
            };

            if name == &self.baseline {
                comparisons.push(ComparisonReport {
                    strategy: name.clone(),
                    p_value: 1.0,
                    sample_size: acc.rounds.len(),
                });
            } else {
                let diffs: Vec<f64> = acc
                    .rounds
                    .iter()
                    .zip(&baseline_rounds)
                    .map(|(r, b)| f64::from(*r) - f64::from(*b))
                    .collect();
                let (p_value, sample_size) = wilcoxon_signed_rank(diffs);
                comparisons.push(ComparisonReport {
                    strategy: name.clone(),
                    p_value,
                    sample_size,
                });
            }

            reports.push(acc.into_report());
        }

        Ok(AnalyticsSummary {
            baseline: self.baseline,
            strategies: reports,
            comparisons,
        }
        .enrich())
    }
}

struct StrategyAccumulator {
    name: String,
    kind: StrategyKindConfig,
    rounds: Vec<u32>,
}

impl StrategyAccumulator {
    fn new(name: String, kind: StrategyKindConfig) -> Self {
        Self {
            name,
            kind,
            rounds: Vec::new(),
        }
    }

    fn record(&mut self, rounds: u32) {
        self.rounds.push(rounds);
    }

    fn into_report(self) -> StrategyReport {
        let per_trial: Vec<f64> = self.rounds.iter().copied().map(f64::from).collect();
        let avg_rounds = if per_trial.is_empty() {
            0.0
        } else {
            per_trial.iter().sum::<f64>() / per_trial.len() as f64
        };
        let (ci_low, ci_high) = confidence_interval(&per_trial);

        StrategyReport {
            name: self.name,
            kind: self.kind,
            trials: self.rounds.len(),
            avg_rounds,
            ci95: (ci_low, ci_high),
            min_rounds: self.rounds.iter().copied().min().unwrap_or(0),
            max_rounds: self.rounds.iter().copied().max().unwrap_or(0),
            delta_vs_baseline: 0.0, // Filled later once we know the baseline report
        }
    }
}

/// Two-sided Wilcoxon signed-rank test on paired differences, with tie
/// correction and a normal approximation.
fn wilcoxon_signed_rank(diffs: Vec<f64>) -> (f64, usize) {
    let diffs: Vec<f64> = diffs
        .into_iter()
        .filter(|d| d.abs() > f64::EPSILON)
        .collect();
    let n = diffs.len();
    if n == 0 {
        return (1.0, 0);
    }

    let mut paired: Vec<(f64, f64)> = diffs.into_iter().map(|d| (d.abs(), d.signum())).collect();
    paired.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    // Rank handling with ties
    let mut ranks = Vec::with_capacity(n);
    let mut tie_sizes = Vec::new();
    let mut i = 0;
    while i < paired.len() {
        let mut j = i;
        while j + 1 < paired.len() && (paired[j + 1].0 - paired[i].0).abs() < 1e-12 {
            j += 1;
        }
        let rank = (i + j + 2) as f64 / 2.0;
        for k in i..=j {
            ranks.push((rank, paired[k].1));
        }
        if j > i {
            tie_sizes.push(j - i + 1);
        }
        i = j + 1;
    }

    let w_plus: f64 = ranks
        .iter()
        .filter(|(_, sign)| *sign > 0.0)
        .map(|(rank, _)| *rank)
        .sum();
    let w_minus: f64 = ranks
        .iter()
        .filter(|(_, sign)| *sign < 0.0)
        .map(|(rank, _)| *rank)
        .sum();

    let w = w_plus.min(w_minus);
    let n_f = n as f64;
    let mean_w = n_f * (n_f + 1.0) / 4.0;

    // Variance with tie correction
    let tie_adjustment: f64 = tie_sizes
        .into_iter()
        .map(|count| {
            let c = count as f64;
            (c.powi(3) - c) / 48.0
        })
        .sum();
    let variance_w = n_f * (n_f + 1.0) * (2.0 * n_f + 1.0) / 24.0 - tie_adjustment;
    if variance_w <= 0.0 {
        return (1.0, n);
    }

    let z = ((w - mean_w).abs() - 0.5) / variance_w.sqrt();
    let normal = Normal::new(0.0, 1.0).unwrap();
    let p = 2.0 * (1.0 - normal.cdf(z));
    (p.clamp(0.0, 1.0), n)
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub baseline: String,
    pub strategies: Vec<StrategyReport>,
    pub comparisons: Vec<ComparisonReport>,
}

impl AnalyticsSummary {
    pub fn enrich(mut self) -> Self {
        let baseline_avg = self
            .strategies
            .iter()
            .find(|s| s.name == self.baseline)
            .map(|s| s.avg_rounds)
            .unwrap_or(0.0);

        for strategy in &mut self.strategies {
            strategy.delta_vs_baseline = strategy.avg_rounds - baseline_avg;
        }

        self
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Simulation Summary\n\n");
        rows.push_str(&format!("Baseline: `{}`\n\n", self.baseline));
        rows.push_str(
            "| Strategy | Kind | Trials | Avg rounds | Δ vs baseline | 95% CI | Min | Max | p-value |\n",
        );
        rows.push_str(
            "|----------|------|--------|------------|----------------|--------|-----|-----|---------|\n",
        );

        for strategy in &self.strategies {
            let comparison = self
                .comparisons
                .iter()
                .find(|c| c.strategy == strategy.name)
                .map(|c| c.p_value)
                .unwrap_or(1.0);

            rows.push_str(&format!(
                "| {name} | {kind:?} | {trials} | {avg:.3} | {delta:+.3} | [{ci_low:.3}, {ci_high:.3}] | {min} | {max} | {pval:.3} |\n",
                name = strategy.name,
                kind = strategy.kind,
                trials = strategy.trials,
                avg = strategy.avg_rounds,
                delta = strategy.delta_vs_baseline,
                ci_low = strategy.ci95.0,
                ci_high = strategy.ci95.1,
                min = strategy.min_rounds,
                max = strategy.max_rounds,
                pval = comparison,
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("delta_rounds.png");
        let baseline = self.baseline.clone();
        let strategies_snapshot = self.strategies.clone();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let mut strategies = strategies_snapshot;
            strategies.sort_by(|a, b| {
                a.delta_vs_baseline
                    .partial_cmp(&b.delta_vs_baseline)
                    .unwrap()
            });

            let y_range_min = strategies
                .iter()
                .map(|s| s.delta_vs_baseline)
                .fold(0.0f64, |acc, v| acc.min(v));
            let y_range_max = strategies
                .iter()
                .map(|s| s.delta_vs_baseline)
                .fold(0.0f64, |acc, v| acc.max(v));
            let margin = ((y_range_max - y_range_min).abs() * 0.1).max(0.2);

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption(
                    "Rounds delta vs baseline (lower is better)",
                    ("sans-serif", 22),
                )
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 60)
                .build_cartesian_2d(
                    0..strategies.len(),
                    (y_range_min - margin)..(y_range_max + margin),
                )
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("Δ rounds vs baseline")
                .x_desc("Strategy")
                .x_label_formatter(&|idx| {
                    strategies
                        .get(*idx)
                        .map(|strategy| strategy.name.clone())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series(strategies.iter().enumerate().map(|(idx, strategy)| {
                    let color = if strategy.name == baseline {
                        &BLUE
                    } else if strategy.delta_vs_baseline <= 0.0 {
                        &GREEN
                    } else {
                        &RED
                    };
                    Rectangle::new(
                        [(idx, 0.0), (idx + 1, strategy.delta_vs_baseline)],
                        color.filled(),
                    )
                }))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub name: String,
    pub kind: StrategyKindConfig,
    pub trials: usize,
    pub avg_rounds: f64,
    pub ci95: (f64, f64),
    pub min_rounds: u32,
    pub max_rounds: u32,
    #[serde(skip)]
    pub delta_vs_baseline: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub strategy: String,
    pub p_value: f64,
    pub sample_size: usize,
}

fn confidence_interval(points: &[f64]) -> (f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let mean = points.iter().sum::<f64>() / points.len() as f64;
    if points.len() == 1 {
        return (mean, mean);
    }
    let variance = points
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (points.len() as f64 - 1.0);
    let std_error = (variance / points.len() as f64).sqrt();
    let margin = CONFIDENCE_Z * std_error;
    (mean - margin, mean + margin)
}
