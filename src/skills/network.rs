//! Network diagnostics skill
//!
//! Fans out topology and security queries in parallel, scores the security
//! posture from the findings, and folds everything into one report.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{
    Priority, Recommendation, SectionOutcome, SkillExecutor, SkillReport, priority_phrase,
    sort_recommendations,
};
use crate::snapshot::{DEFAULT_ENRICH_RULES, SnapshotStore};

/// Score floor/ceiling and status boundaries
const MAX_SCORE: i32 = 100;
const GOOD_THRESHOLD: i32 = 80;
const FAIR_THRESHOLD: i32 = 50;

/// One security finding from the network security tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFinding {
    pub category: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Fixed penalty per finding category.
pub fn penalty_for(category: &str) -> i32 {
    match category {
        "open_ingress" => 25,
        "missing_encryption" => 20,
        "broad_egress" => 10,
        "stale_rule" => 5,
        _ => 10,
    }
}

/// Start from 100, subtract a penalty per finding, floor at 0.
pub fn security_score(findings: &[SecurityFinding]) -> i32 {
    let penalty: i32 = findings.iter().map(|f| penalty_for(&f.category)).sum();
    (MAX_SCORE - penalty).max(0)
}

/// Map a score to a coarse status label.
pub fn status_label(score: i32) -> &'static str {
    if score >= GOOD_THRESHOLD {
        "good"
    } else if score >= FAIR_THRESHOLD {
        "fair"
    } else {
        "poor"
    }
}

fn priority_for(category: &str) -> Priority {
    match category {
        "open_ingress" => Priority::Critical,
        "missing_encryption" => Priority::High,
        "broad_egress" => Priority::Medium,
        _ => Priority::Low,
    }
}

fn action_for(category: &str) -> &'static str {
    match category {
        "open_ingress" => "Restrict the ingress rule to known source ranges",
        "missing_encryption" => "Enable encryption in transit for the flagged resource",
        "broad_egress" => "Narrow the egress rule to required destinations",
        "stale_rule" => "Remove rules that no longer match any workload",
        _ => "Review the flagged configuration",
    }
}

/// Generate the network diagnostics report.
///
/// Topology and security are independent sub-analyses: either one failing
/// leaves an explicit error marker while the other still reports.
pub async fn generate_network_report(
    executor: &SkillExecutor,
    store: Option<&SnapshotStore>,
    scope: &str,
) -> SkillReport {
    executor.report_progress(0.05, "starting network diagnostics");
    let params = json!({"scope": scope});

    let outcomes = executor
        .call_tools(vec![
            ("network_topology".to_string(), params.clone()),
            ("network_security".to_string(), params.clone()),
        ])
        .await;
    executor.report_progress(0.6, "scoring network posture");

    let mut sections = std::collections::BTreeMap::new();
    let mut recommendations = Vec::new();
    let mut outcomes = outcomes.into_iter();

    // call_tools preserves input order: topology first, then security.
    match outcomes.next() {
        Some(Ok(raw)) => {
            let enriched = match store {
                Some(store) => store.enrich_with_names(&raw, DEFAULT_ENRICH_RULES),
                None => raw,
            };
            sections.insert("topology".to_string(), SectionOutcome::ok(enriched));
        }
        Some(Err(e)) => {
            sections.insert("topology".to_string(), SectionOutcome::error(&e));
        }
        None => {
            sections.insert(
                "topology".to_string(),
                SectionOutcome::error("topology query was not issued"),
            );
        }
    }

    match outcomes.next() {
        Some(Ok(raw)) => {
            let enriched = match store {
                Some(store) => store.enrich_with_names(&raw, DEFAULT_ENRICH_RULES),
                None => raw,
            };
            score_security(&enriched, &mut sections, &mut recommendations);
        }
        Some(Err(e)) => {
            sections.insert("security".to_string(), SectionOutcome::error(&e));
        }
        None => {
            sections.insert(
                "security".to_string(),
                SectionOutcome::error("security query was not issued"),
            );
        }
    }

    executor.report_progress(0.85, "synthesizing network report");
    sort_recommendations(&mut recommendations);
    let executive_summary = summarize(scope, &sections, &recommendations);

    let synthesis_input = json!({
        "summary": &executive_summary,
        "sections": sections.keys().cloned().collect::<Vec<_>>(),
    });
    let synthesis = executor
        .analyze(
            "Summarize this network security assessment for an operator.",
            &synthesis_input,
        )
        .await;
    sections.insert("synthesis".to_string(), SectionOutcome::ok(json!(synthesis)));

    executor.report_progress(1.0, "network report complete");
    SkillReport {
        skill: "network".to_string(),
        scope: scope.to_string(),
        generated_at: chrono::Utc::now(),
        sections,
        recommendations,
        executive_summary,
        tool_calls: executor.tool_calls(),
    }
}

fn score_security(
    payload: &Value,
    sections: &mut std::collections::BTreeMap<String, SectionOutcome>,
    recommendations: &mut Vec<Recommendation>,
) {
    let findings: Vec<SecurityFinding> = match payload.get("findings") {
        Some(raw) => match serde_json::from_value(raw.clone()) {
            Ok(findings) => findings,
            Err(e) => {
                sections.insert(
                    "security".to_string(),
                    SectionOutcome::error(format!("unrecognized findings payload: {}", e)),
                );
                return;
            }
        },
        None => Vec::new(),
    };

    let score = security_score(&findings);
    let status = status_label(score);

    // One recommendation per category, with the occurrence count inline.
    let mut seen: Vec<(&str, usize)> = Vec::new();
    for finding in &findings {
        match seen.iter_mut().find(|(cat, _)| *cat == finding.category) {
            Some((_, count)) => *count += 1,
            None => seen.push((finding.category.as_str(), 1)),
        }
    }
    for (category, count) in seen {
        recommendations.push(Recommendation {
            priority: priority_for(category),
            category: format!("network-{}", category.replace('_', "-")),
            description: format!("{} finding(s) of type {}", count, category),
            action: action_for(category).to_string(),
        });
    }

    sections.insert(
        "security".to_string(),
        SectionOutcome::ok(json!({
            "score": score,
            "status": status,
            "findings": payload.get("findings").cloned().unwrap_or(json!([])),
        })),
    );
}

fn summarize(
    scope: &str,
    sections: &std::collections::BTreeMap<String, SectionOutcome>,
    recommendations: &[Recommendation],
) -> String {
    let posture = sections
        .get("security")
        .and_then(|s| s.data())
        .and_then(|d| {
            let score = d.get("score")?.as_i64()?;
            let status = d.get("status")?.as_str()?;
            Some(format!("security score {}/100 ({})", score, status))
        })
        .unwrap_or_else(|| "security posture unavailable".to_string());

    let errored = sections.values().filter(|s| !s.is_ok()).count();
    let mut summary = format!(
        "Network diagnostics for {}: {}; {}.",
        scope,
        posture,
        priority_phrase(recommendations),
    );
    if errored > 0 {
        summary.push_str(&format!(" {} section(s) unavailable.", errored));
    }
    summary
}
