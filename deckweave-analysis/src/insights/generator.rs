//! Insight generation over synthesized analysis inputs.

use deckweave_core::config::InsightConfig;
use deckweave_core::types::collections::FxHashMap;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use super::stats;
use super::types::{Insight, InsightKind, TrendDirection};

const INTERNAL_CORRELATION_FLOOR: f64 = 0.6;
const STRATEGIC_FOCUS_FLOOR: f64 = 0.7;
const EXPECTED_STRATEGIC_AREAS: &[&str] =
    &["growth", "innovation", "efficiency", "customer", "talent"];

/// Revenue and cost series, index-aligned where margins are derived.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinancialData {
    #[serde(default)]
    pub revenue: Vec<(u64, f64)>,
    #[serde(default)]
    pub costs: Vec<(u64, f64)>,
    #[serde(default)]
    pub source_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketData {
    #[serde(default)]
    pub market_share: Vec<(u64, f64)>,
    /// Per-metric comparison against the industry average.
    #[serde(default)]
    pub performance_comparison: FxHashMap<String, f64>,
    #[serde(default)]
    pub source_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EfficiencyMetric {
    pub current: f64,
    pub benchmark: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CycleTime {
    pub average: f64,
    pub target: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationalData {
    #[serde(default)]
    pub efficiency_metrics: FxHashMap<String, EfficiencyMetric>,
    #[serde(default)]
    pub cycle_times: FxHashMap<String, CycleTime>,
    #[serde(default)]
    pub source_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrategicDocument {
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub source_ids: Vec<String>,
}

/// Everything the generator inspects in one pass.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisInputs {
    #[serde(default)]
    pub financial: Option<FinancialData>,
    #[serde(default)]
    pub market: Option<MarketData>,
    #[serde(default)]
    pub operational: Option<OperationalData>,
    #[serde(default)]
    pub strategic: Vec<StrategicDocument>,
}

struct MetricTrend {
    direction: TrendDirection,
    magnitude: f64,
    confidence: f64,
}

/// Fit over values alone, with a looser correlation floor than the
/// standalone trend analyzer.
fn metric_trend(series: &[(u64, f64)]) -> Option<MetricTrend> {
    if series.len() < 3 {
        return None;
    }
    let mut sorted = series.to_vec();
    sorted.sort_by_key(|&(t, _)| t);
    let values: Vec<f64> = sorted.iter().map(|&(_, v)| v).collect();
    let fit = stats::linear_fit(&values)?;
    if fit.r.abs() <= INTERNAL_CORRELATION_FLOOR {
        return None;
    }
    let mean = stats::mean(&values);
    Some(MetricTrend {
        direction: if fit.slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        },
        magnitude: if mean.abs() > 0.0 {
            (fit.slope / mean).abs()
        } else {
            0.0
        },
        confidence: fit.r.abs(),
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Produces prioritized insights from financial, market, operational,
/// and strategic inputs.
pub struct InsightGenerator {
    config: InsightConfig,
}

impl InsightGenerator {
    pub fn new(config: InsightConfig) -> Self {
        Self { config }
    }

    /// Run every analyzer, score, and truncate to the configured cap.
    pub fn generate_insights(&self, inputs: &AnalysisInputs) -> Vec<Insight> {
        let mut insights = Vec::new();
        if let Some(financial) = &inputs.financial {
            self.analyze_financial(financial, &mut insights);
        }
        if let Some(market) = &inputs.market {
            self.analyze_market(market, &mut insights);
        }
        if let Some(operational) = &inputs.operational {
            self.analyze_operational(operational, &mut insights);
        }
        self.analyze_strategic(&inputs.strategic, &mut insights);

        self.score_insights(&mut insights);
        insights.truncate(self.config.effective_max_insights());
        info!(insights = insights.len(), "generated insights");
        insights
    }

    fn analyze_financial(&self, data: &FinancialData, out: &mut Vec<Insight>) {
        if let Some(trend) = metric_trend(&data.revenue) {
            let (kind, title) = match trend.direction {
                TrendDirection::Increasing => (InsightKind::Opportunity, "Revenue Growth Trend"),
                TrendDirection::Decreasing => (InsightKind::Risk, "Revenue Decline Trend"),
            };
            out.push(Insight {
                kind,
                title: title.to_string(),
                description: format!(
                    "Revenue is {} at a {:.1}% rate",
                    trend.direction,
                    trend.magnitude * 100.0
                ),
                supporting_data: obj(json!({
                    "direction": trend.direction.name(),
                    "magnitude": trend.magnitude,
                })),
                confidence: trend.confidence,
                priority: 0,
                source_ids: data.source_ids.clone(),
            });
        }

        if let Some(trend) = metric_trend(&data.costs) {
            if trend.direction == TrendDirection::Increasing {
                out.push(Insight {
                    kind: InsightKind::Risk,
                    title: "Rising Costs".to_string(),
                    description: format!(
                        "Costs are increasing at a {:.1}% rate",
                        trend.magnitude * 100.0
                    ),
                    supporting_data: obj(json!({ "magnitude": trend.magnitude })),
                    confidence: trend.confidence,
                    priority: 0,
                    source_ids: data.source_ids.clone(),
                });
            }
        }

        // Margins pair revenue and cost points by index.
        let margins: Vec<(u64, f64)> = data
            .revenue
            .iter()
            .zip(&data.costs)
            .filter(|((_, rev), _)| *rev > 0.0)
            .map(|(&(t, rev), &(_, cost))| (t, (rev - cost) / rev))
            .collect();
        if let Some(trend) = metric_trend(&margins) {
            let (kind, title) = match trend.direction {
                TrendDirection::Increasing => (InsightKind::Opportunity, "Improving Margins"),
                TrendDirection::Decreasing => (InsightKind::Risk, "Margin Compression"),
            };
            out.push(Insight {
                kind,
                title: title.to_string(),
                description: format!("Profit margins are {}", trend.direction),
                supporting_data: obj(json!({
                    "direction": trend.direction.name(),
                    "latest_margin": margins.last().map(|&(_, m)| m),
                })),
                confidence: trend.confidence,
                priority: 0,
                source_ids: data.source_ids.clone(),
            });
        }
    }

    fn analyze_market(&self, data: &MarketData, out: &mut Vec<Insight>) {
        if let Some(trend) = metric_trend(&data.market_share) {
            let (kind, verb) = match trend.direction {
                TrendDirection::Increasing => (InsightKind::Opportunity, "gaining"),
                TrendDirection::Decreasing => (InsightKind::Risk, "losing"),
            };
            out.push(Insight {
                kind,
                title: format!("Market Share {}", capitalize(verb)),
                description: format!(
                    "Company is {verb} market share at a {:.1}% rate",
                    trend.magnitude * 100.0
                ),
                supporting_data: obj(json!({
                    "direction": trend.direction.name(),
                    "magnitude": trend.magnitude,
                })),
                confidence: trend.confidence,
                priority: 0,
                source_ids: data.source_ids.clone(),
            });
        }

        let mut lagging: Vec<(&String, f64)> = data
            .performance_comparison
            .iter()
            .filter(|(_, &vs_avg)| vs_avg < -0.1)
            .map(|(metric, &vs_avg)| (metric, vs_avg))
            .collect();
        lagging.sort_by(|a, b| a.0.cmp(b.0));
        for (metric, vs_avg) in lagging {
            out.push(Insight {
                kind: InsightKind::Risk,
                title: format!("Below Industry Average: {metric}"),
                description: format!(
                    "{metric} trails the industry average by {:.1}%",
                    vs_avg.abs() * 100.0
                ),
                supporting_data: obj(json!({ "vs_industry_avg": vs_avg })),
                confidence: 0.8,
                priority: 0,
                source_ids: data.source_ids.clone(),
            });
        }
    }

    fn analyze_operational(&self, data: &OperationalData, out: &mut Vec<Insight>) {
        let mut efficiency: Vec<(&String, &EfficiencyMetric)> =
            data.efficiency_metrics.iter().collect();
        efficiency.sort_by(|a, b| a.0.cmp(b.0));
        for (name, metric) in efficiency {
            if metric.benchmark <= 0.0 {
                continue;
            }
            let ratio = metric.current / metric.benchmark;
            let label = if ratio < 0.8 {
                "Low"
            } else if ratio > 1.2 {
                "High"
            } else {
                continue;
            };
            out.push(Insight {
                kind: InsightKind::Operational,
                title: format!("{label} Efficiency: {name}"),
                description: format!("{name} operating at {:.1}% of benchmark", ratio * 100.0),
                supporting_data: obj(json!({
                    "current": metric.current,
                    "benchmark": metric.benchmark,
                    "ratio": ratio,
                })),
                confidence: 0.85,
                priority: 0,
                source_ids: data.source_ids.clone(),
            });
        }

        let mut cycles: Vec<(&String, &CycleTime)> = data.cycle_times.iter().collect();
        cycles.sort_by(|a, b| a.0.cmp(b.0));
        for (process, cycle) in cycles {
            if cycle.target <= 0.0 || cycle.average <= cycle.target * 1.2 {
                continue;
            }
            out.push(Insight {
                kind: InsightKind::Risk,
                title: format!("Process Bottleneck: {process}"),
                description: format!(
                    "{process} taking {:.1}% longer than target",
                    (cycle.average / cycle.target - 1.0) * 100.0
                ),
                supporting_data: obj(json!({
                    "average": cycle.average,
                    "target": cycle.target,
                })),
                confidence: 0.9,
                priority: 0,
                source_ids: data.source_ids.clone(),
            });
        }
    }

    fn analyze_strategic(&self, documents: &[StrategicDocument], out: &mut Vec<Insight>) {
        if documents.is_empty() {
            return;
        }
        let total = documents.len() as f64;

        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        let mut sources: FxHashMap<&str, Vec<String>> = FxHashMap::default();
        for document in documents {
            for theme in &document.themes {
                *counts.entry(theme).or_insert(0) += 1;
                sources
                    .entry(theme)
                    .or_default()
                    .extend(document.source_ids.iter().cloned());
            }
        }

        let mut themes: Vec<(&str, usize)> = counts.iter().map(|(&t, &c)| (t, c)).collect();
        themes.sort_by(|a, b| a.0.cmp(b.0));
        for (theme, count) in &themes {
            let importance = *count as f64 / total;
            if importance <= STRATEGIC_FOCUS_FLOOR {
                continue;
            }
            out.push(Insight {
                kind: InsightKind::Strategic,
                title: format!("Strategic Focus: {theme}"),
                description: format!("{theme} mentioned in {count} strategic documents"),
                supporting_data: obj(json!({
                    "mentions": count,
                    "importance": importance,
                })),
                confidence: (importance * 1.5).min(1.0),
                priority: 0,
                source_ids: sources.get(theme).cloned().unwrap_or_default(),
            });
        }

        for &area in EXPECTED_STRATEGIC_AREAS {
            let covered = counts
                .keys()
                .any(|theme| theme.to_lowercase().contains(area));
            if covered {
                continue;
            }
            out.push(Insight {
                kind: InsightKind::Risk,
                title: format!("Strategic Gap: {}", capitalize(area)),
                description: format!("No strategic initiatives found addressing {area}"),
                supporting_data: obj(json!({ "area": area })),
                confidence: 0.7,
                priority: 0,
                source_ids: Vec::new(),
            });
        }
    }

    /// priority = floor(confidence * 100 * kind multiplier * data factor),
    /// where the data factor rewards richer supporting evidence.
    fn score_insights(&self, insights: &mut [Insight]) {
        for insight in insights.iter_mut() {
            let data_factor =
                0.7 + 0.3 * (insight.supporting_data.len() as f64 / 5.0).min(1.0);
            insight.priority =
                (insight.confidence * 100.0 * insight.kind.multiplier() * data_factor) as i64;
        }
        insights.sort_by(|a, b| b.priority.cmp(&a.priority));
    }
}

fn obj(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
