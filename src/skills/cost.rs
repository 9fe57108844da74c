//! Cost analysis skill
//!
//! Trend classification, next-period forecast, and anomaly detection over a
//! time-ordered series of period totals, folded into a prioritized report.
//! The math is a simple moving trend, not a statistical model: good enough
//! for "is spend drifting and where".

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{
    Priority, Recommendation, SectionOutcome, SkillExecutor, SkillReport, priority_phrase,
    sort_recommendations,
};
use crate::snapshot::{DEFAULT_ENRICH_RULES, SnapshotStore};

/// Default anomaly threshold in standard deviations
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.0;

/// Percentage change versus the trailing average that counts as a trend
pub const TREND_THRESHOLD_PCT: f64 = 10.0;

/// Trailing window for the linear forecast
pub const FORECAST_WINDOW: usize = 4;

/// Direction of the spend trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Trend classification plus forecast for the next period
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    pub change_pct: f64,
    pub forecast_next: f64,
}

/// Severity of a flagged period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    High,
    Medium,
}

/// One period whose total deviates from the rest of the series
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub index: usize,
    pub period: String,
    pub value: f64,
    /// Deviation in standard deviations of the rest of the series;
    /// None when the rest of the series is constant.
    pub sigma: Option<f64>,
    pub severity: AnomalySeverity,
}

/// Classify the last period against the trailing average.
pub fn classify_trend(totals: &[f64], threshold_pct: f64) -> TrendAnalysis {
    if totals.len() < 2 {
        return TrendAnalysis {
            direction: TrendDirection::Stable,
            change_pct: 0.0,
            forecast_next: totals.last().copied().unwrap_or(0.0),
        };
    }

    let last = totals[totals.len() - 1];
    let trailing_avg = mean(&totals[..totals.len() - 1]);
    let change_pct = if trailing_avg.abs() > f64::EPSILON {
        (last - trailing_avg) / trailing_avg * 100.0
    } else {
        0.0
    };

    let direction = if change_pct > threshold_pct {
        TrendDirection::Increasing
    } else if change_pct < -threshold_pct {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    TrendAnalysis {
        direction,
        change_pct,
        forecast_next: forecast_next(totals, FORECAST_WINDOW),
    }
}

/// Linear extrapolation over the trailing window.
pub fn forecast_next(totals: &[f64], window: usize) -> f64 {
    match totals {
        [] => 0.0,
        [only] => *only,
        _ => {
            let w = window.clamp(2, totals.len());
            let tail = &totals[totals.len() - w..];
            let slope = (tail[w - 1] - tail[0]) / (w - 1) as f64;
            (tail[w - 1] + slope).max(0.0)
        }
    }
}

/// Flag periods that deviate from the rest of the series.
///
/// Each point is measured against the mean and standard deviation of the
/// other points, so one extreme value cannot inflate the deviation it is
/// judged by. Severity is high past three times the threshold.
pub fn detect_anomalies(periods: &[(String, f64)], threshold: f64) -> Vec<Anomaly> {
    if periods.len() < 3 || threshold <= 0.0 {
        return Vec::new();
    }

    let mut anomalies = Vec::new();
    for (i, (period, value)) in periods.iter().enumerate() {
        let rest: Vec<f64> = periods
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, (_, v))| *v)
            .collect();
        let rest_mean = mean(&rest);
        let rest_std = std_dev(&rest);
        let deviation = (value - rest_mean).abs();

        if rest_std > f64::EPSILON {
            let sigma = deviation / rest_std;
            if sigma > threshold {
                anomalies.push(Anomaly {
                    index: i,
                    period: period.clone(),
                    value: *value,
                    sigma: Some(sigma),
                    severity: if sigma > 3.0 * threshold {
                        AnomalySeverity::High
                    } else {
                        AnomalySeverity::Medium
                    },
                });
            }
        } else if deviation > f64::EPSILON {
            // Rest of the series is constant; any deviation stands out.
            anomalies.push(Anomaly {
                index: i,
                period: period.clone(),
                value: *value,
                sigma: None,
                severity: AnomalySeverity::High,
            });
        }
    }
    anomalies
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Wire shape of the cost-by-service tool response
#[derive(Debug, Deserialize)]
struct CostBreakdown {
    #[serde(default)]
    services: Vec<NamedCost>,
    #[serde(default)]
    periods: Vec<PeriodCost>,
}

#[derive(Debug, Deserialize)]
struct NamedCost {
    name: String,
    total: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct PeriodCost {
    period: String,
    total: f64,
}

/// Generate the cost analysis report.
///
/// Tolerates individual analysis failures: a failed sub-call turns into an
/// explicit error section while the rest of the report is still produced.
pub async fn generate_cost_report(
    executor: &SkillExecutor,
    store: Option<&SnapshotStore>,
    scope: &str,
    window: &str,
    anomaly_threshold: f64,
) -> SkillReport {
    executor.report_progress(0.05, "starting cost analysis");
    let params = json!({"scope": scope, "window": window});

    let mut sections = std::collections::BTreeMap::new();
    let mut recommendations = Vec::new();

    executor.report_progress(0.2, "fetching cost by service");
    match executor.call_tool("cost_by_service", params.clone()).await {
        Ok(raw) => {
            match serde_json::from_value::<CostBreakdown>(raw.clone()) {
                Ok(breakdown) => {
                    analyze_breakdown(
                        &breakdown,
                        anomaly_threshold,
                        &mut sections,
                        &mut recommendations,
                    );
                }
                Err(e) => {
                    sections.insert(
                        "trend".to_string(),
                        SectionOutcome::error(format!("unrecognized cost payload: {}", e)),
                    );
                }
            }
            sections.insert("by_service".to_string(), SectionOutcome::ok(raw));
        }
        Err(e) => {
            sections.insert("by_service".to_string(), SectionOutcome::error(&e));
            sections.insert(
                "trend".to_string(),
                SectionOutcome::error("cost series unavailable"),
            );
        }
    }

    executor.report_progress(0.6, "fetching cost by compartment");
    match executor
        .call_tool("cost_by_compartment", params.clone())
        .await
    {
        Ok(raw) => {
            let enriched = match store {
                Some(store) => store.enrich_with_names(&raw, DEFAULT_ENRICH_RULES),
                None => raw,
            };
            sections.insert("by_compartment".to_string(), SectionOutcome::ok(enriched));
        }
        Err(e) => {
            sections.insert("by_compartment".to_string(), SectionOutcome::error(&e));
        }
    }

    executor.report_progress(0.85, "synthesizing cost report");
    sort_recommendations(&mut recommendations);
    let executive_summary = summarize(scope, window, &sections, &recommendations);

    let synthesis_input = json!({
        "summary": &executive_summary,
        "sections": sections.keys().cloned().collect::<Vec<_>>(),
        "recommendations": recommendations.len(),
    });
    let synthesis = executor
        .analyze(
            "Summarize this tenancy cost analysis for an operator.",
            &synthesis_input,
        )
        .await;
    sections.insert("synthesis".to_string(), SectionOutcome::ok(json!(synthesis)));

    executor.report_progress(1.0, "cost report complete");
    SkillReport {
        skill: "cost".to_string(),
        scope: scope.to_string(),
        generated_at: chrono::Utc::now(),
        sections,
        recommendations,
        executive_summary,
        tool_calls: executor.tool_calls(),
    }
}

fn analyze_breakdown(
    breakdown: &CostBreakdown,
    anomaly_threshold: f64,
    sections: &mut std::collections::BTreeMap<String, SectionOutcome>,
    recommendations: &mut Vec<Recommendation>,
) {
    let totals: Vec<f64> = breakdown.periods.iter().map(|p| p.total).collect();
    let trend = classify_trend(&totals, TREND_THRESHOLD_PCT);

    if trend.direction == TrendDirection::Increasing {
        recommendations.push(Recommendation {
            priority: Priority::High,
            category: "cost-trend".to_string(),
            description: format!(
                "Spend is up {:.1}% versus the trailing average",
                trend.change_pct
            ),
            action: "Review the services driving recent growth".to_string(),
        });
    }
    if let Ok(value) = serde_json::to_value(&trend) {
        sections.insert("trend".to_string(), SectionOutcome::ok(value));
    }

    let labelled: Vec<(String, f64)> = breakdown
        .periods
        .iter()
        .map(|p| (p.period.clone(), p.total))
        .collect();
    let anomalies = detect_anomalies(&labelled, anomaly_threshold);
    for anomaly in &anomalies {
        recommendations.push(Recommendation {
            priority: match anomaly.severity {
                AnomalySeverity::High => Priority::High,
                AnomalySeverity::Medium => Priority::Medium,
            },
            category: "cost-anomaly".to_string(),
            description: format!(
                "Period {} spent {:.2}, far outside the rest of the series",
                anomaly.period, anomaly.value
            ),
            action: "Check for unexpected usage or misconfigured resources".to_string(),
        });
    }
    if let Ok(value) = serde_json::to_value(&anomalies) {
        sections.insert("anomalies".to_string(), SectionOutcome::ok(value));
    }

    // Concentration: one service dominating total spend is worth a look.
    let service_total: f64 = breakdown.services.iter().map(|s| s.total).sum();
    if service_total > 0.0
        && let Some(top) = breakdown
            .services
            .iter()
            .max_by(|a, b| a.total.total_cmp(&b.total))
        && top.total / service_total > 0.5
    {
        recommendations.push(Recommendation {
            priority: Priority::Medium,
            category: "cost-concentration".to_string(),
            description: format!(
                "{} accounts for {:.0}% of tracked spend",
                top.name,
                top.total / service_total * 100.0
            ),
            action: "Confirm the dominant service is sized intentionally".to_string(),
        });
    }
}

fn summarize(
    scope: &str,
    window: &str,
    sections: &std::collections::BTreeMap<String, SectionOutcome>,
    recommendations: &[Recommendation],
) -> String {
    let trend_phrase = sections
        .get("trend")
        .and_then(|s| s.data())
        .and_then(|d| d.get("direction"))
        .and_then(Value::as_str)
        .map(|direction| format!("trend {}", direction))
        .unwrap_or_else(|| "trend unavailable".to_string());

    let anomaly_count = sections
        .get("anomalies")
        .and_then(|s| s.data())
        .and_then(Value::as_array)
        .map(|a| a.len())
        .unwrap_or(0);

    let errored = sections.values().filter(|s| !s.is_ok()).count();
    let mut summary = format!(
        "Cost analysis for {} over {}: {}, {} anomalous period{}; {}.",
        scope,
        window,
        trend_phrase,
        anomaly_count,
        if anomaly_count == 1 { "" } else { "s" },
        priority_phrase(recommendations),
    );
    if errored > 0 {
        summary.push_str(&format!(" {} section(s) unavailable.", errored));
    }
    summary
}
