//! Skill orchestration
//!
//! A skill composes several underlying tool calls into one higher-level
//! report: cost trends, inventory audit, network security. The executor
//! records a `ToolCallResult` per call for post-hoc reporting, supports
//! progress feedback, and can delegate narrative synthesis to an optional
//! analyst collaborator with a deterministic fallback.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{Analyst, QueryApi};
use crate::error::Result;

pub mod cost;
pub mod inventory;
pub mod network;

/// Token budget for analyst synthesis calls
const MAX_ANALYSIS_TOKENS: usize = 512;

/// Outcome of one underlying tool call.
///
/// Append-only within a single skill invocation; used for reporting, never
/// for control flow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub tool_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Recommendation priority. Variant order is sort order: highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// One actionable finding in a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: String,
    pub description: String,
    pub action: String,
}

/// A report section either carries data or an explicit error marker.
/// Failed analyses are marked, never silently omitted.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionOutcome {
    Ok { data: Value },
    Error { error: String },
}

impl SectionOutcome {
    pub fn ok(data: Value) -> Self {
        SectionOutcome::Ok { data }
    }

    pub fn error(error: impl std::fmt::Display) -> Self {
        SectionOutcome::Error {
            error: error.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, SectionOutcome::Ok { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            SectionOutcome::Ok { data } => Some(data),
            SectionOutcome::Error { .. } => None,
        }
    }
}

/// Structured result of a skill invocation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillReport {
    pub skill: String,
    pub scope: String,
    pub generated_at: DateTime<Utc>,
    pub sections: BTreeMap<String, SectionOutcome>,
    pub recommendations: Vec<Recommendation>,
    pub executive_summary: String,
    pub tool_calls: Vec<ToolCallResult>,
}

/// Orchestrates tool calls for one skill invocation.
pub struct SkillExecutor {
    query: Arc<dyn QueryApi>,
    analyst: Option<Arc<dyn Analyst>>,
    calls: Mutex<Vec<ToolCallResult>>,
    progress: Option<ProgressBar>,
    last_fraction: Mutex<f64>,
}

impl SkillExecutor {
    pub fn new(query: Arc<dyn QueryApi>) -> Self {
        Self {
            query,
            analyst: None,
            calls: Mutex::new(Vec::new()),
            progress: None,
            last_fraction: Mutex::new(0.0),
        }
    }

    pub fn with_analyst(mut self, analyst: Arc<dyn Analyst>) -> Self {
        self.analyst = Some(analyst);
        self
    }

    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        bar.set_length(100);
        self.progress = Some(bar);
        self
    }

    /// Call one tool, recording the outcome either way.
    ///
    /// Failures are recorded and re-raised: the executor observes but never
    /// swallows them, so skill logic decides whether a sub-analysis aborts.
    pub async fn call_tool(&self, name: &str, params: Value) -> Result<Value> {
        let outcome = self.query.query(name, &params).await;
        self.record(name, &outcome);
        outcome
    }

    /// Fan out several independent tool calls concurrently.
    ///
    /// Outcomes are recorded and returned in input order regardless of
    /// completion order, and a failing call never cancels its siblings.
    pub async fn call_tools(&self, requests: Vec<(String, Value)>) -> Vec<Result<Value>> {
        let futures = requests
            .iter()
            .map(|(name, params)| self.query.query(name, params));
        let outcomes = futures::future::join_all(futures).await;

        for ((name, _), outcome) in requests.iter().zip(outcomes.iter()) {
            self.record(name, outcome);
        }
        outcomes
    }

    fn record(&self, name: &str, outcome: &Result<Value>) {
        let entry = match outcome {
            Ok(value) => ToolCallResult {
                tool_name: name.to_string(),
                success: true,
                result: Some(value.clone()),
                error: None,
            },
            Err(e) => {
                log::warn!("Tool {} failed: {}", name, e);
                ToolCallResult {
                    tool_name: name.to_string(),
                    success: false,
                    result: None,
                    error: Some(e.to_string()),
                }
            }
        };
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(entry);
        }
    }

    /// Caller feedback only; fractions are clamped monotonically increasing.
    pub fn report_progress(&self, fraction: f64, message: &str) {
        let fraction = {
            let Ok(mut last) = self.last_fraction.lock() else {
                return;
            };
            let clamped = fraction.clamp(0.0, 1.0).max(*last);
            *last = clamped;
            clamped
        };

        log::debug!("Progress {:.0}%: {}", fraction * 100.0, message);
        if let Some(bar) = &self.progress {
            bar.set_position((fraction * 100.0).round() as u64);
            bar.set_message(message.to_string());
        }
    }

    /// Synthesize a narrative for `data`, via the analyst when one is
    /// configured and reachable, otherwise a deterministic digest.
    pub async fn analyze(&self, prompt: &str, data: &Value) -> String {
        if let Some(analyst) = &self.analyst {
            match analyst.analyze(prompt, data, MAX_ANALYSIS_TOKENS).await {
                Ok(text) if !text.trim().is_empty() => return text,
                Ok(_) => log::warn!("Analyst returned empty synthesis, using fallback"),
                Err(e) => log::warn!("Analyst unavailable, using fallback: {}", e),
            }
        }
        deterministic_digest(data)
    }

    /// Every outcome recorded so far, in call order.
    pub fn tool_calls(&self) -> Vec<ToolCallResult> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

/// Rule-based stand-in for analyst synthesis. Purely structural, so the
/// same payload always digests to the same text.
fn deterministic_digest(data: &Value) -> String {
    match data {
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(key, value)| match value {
                    Value::Array(items) => format!("{}: {} items", key, items.len()),
                    Value::Object(fields) => format!("{}: {} fields", key, fields.len()),
                    Value::String(s) => format!("{}: {}", key, s),
                    other => format!("{}: {}", key, other),
                })
                .collect();
            parts.join("; ")
        }
        Value::Array(items) => format!("{} items", items.len()),
        other => other.to_string(),
    }
}

/// Stable sort, highest priority first; ties keep generation order.
pub fn sort_recommendations(recommendations: &mut [Recommendation]) {
    recommendations.sort_by_key(|r| r.priority);
}

/// Count recommendations per priority, for executive summaries.
pub fn priority_counts(recommendations: &[Recommendation]) -> BTreeMap<Priority, usize> {
    let mut counts = BTreeMap::new();
    for rec in recommendations {
        *counts.entry(rec.priority).or_insert(0) += 1;
    }
    counts
}

/// Render "2 critical, 1 medium" style fragments for summaries.
pub fn priority_phrase(recommendations: &[Recommendation]) -> String {
    if recommendations.is_empty() {
        return "no recommendations".to_string();
    }
    let counts = priority_counts(recommendations);
    let parts: Vec<String> = counts
        .iter()
        .map(|(priority, count)| format!("{} {}", count, priority.label()))
        .collect();
    format!(
        "{} recommendation{} ({})",
        recommendations.len(),
        if recommendations.len() == 1 { "" } else { "s" },
        parts.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockClient;
    use crate::client::mock::MockAnalyst;
    use serde_json::json;

    fn executor_with(mock: MockClient) -> (SkillExecutor, Arc<MockClient>) {
        let client = Arc::new(mock);
        let executor = SkillExecutor::new(Arc::clone(&client) as Arc<dyn QueryApi>);
        (executor, client)
    }

    #[tokio::test]
    async fn test_call_tool_records_success() {
        let mock = MockClient::new().with_query_response("cost_by_service", json!({"ok": true}));
        let (executor, _) = executor_with(mock);

        let result = executor
            .call_tool("cost_by_service", json!({}))
            .await
            .unwrap();
        assert_eq!(result["ok"], true);

        let calls = executor.tool_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].success);
        assert_eq!(calls[0].tool_name, "cost_by_service");
    }

    #[tokio::test]
    async fn test_call_tool_records_failure_and_reraises() {
        let mock = MockClient::new().failing_tool("network_topology");
        let (executor, _) = executor_with(mock);

        let result = executor.call_tool("network_topology", json!({})).await;
        assert!(result.is_err());

        let calls = executor.tool_calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].success);
        assert!(calls[0].error.as_deref().unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_call_tools_stable_order_with_partial_failure() {
        let mock = MockClient::new()
            .with_query_response("a", json!(1))
            .failing_tool("b")
            .with_query_response("c", json!(3));
        let (executor, _) = executor_with(mock);

        let outcomes = executor
            .call_tools(vec![
                ("a".to_string(), json!({})),
                ("b".to_string(), json!({})),
                ("c".to_string(), json!({})),
            ])
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_err());
        assert!(outcomes[2].is_ok());

        let calls = executor.tool_calls();
        let names: Vec<&str> = calls.iter().map(|c| c.tool_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(calls[0].success && !calls[1].success && calls[2].success);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let (executor, _) = executor_with(MockClient::new());

        executor.report_progress(0.5, "halfway");
        executor.report_progress(0.2, "late straggler");
        assert_eq!(*executor.last_fraction.lock().unwrap(), 0.5);

        executor.report_progress(0.9, "nearly done");
        assert_eq!(*executor.last_fraction.lock().unwrap(), 0.9);

        executor.report_progress(7.0, "overshoot clamps");
        assert_eq!(*executor.last_fraction.lock().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_analyze_without_analyst_is_deterministic() {
        let (executor, _) = executor_with(MockClient::new());
        let data = json!({"findings": [1, 2, 3], "score": 85});

        let first = executor.analyze("summarize", &data).await;
        let second = executor.analyze("summarize", &data).await;

        assert_eq!(first, second);
        assert!(first.contains("findings: 3 items"));
        assert!(first.contains("score: 85"));
    }

    #[tokio::test]
    async fn test_analyze_prefers_analyst() {
        let mock = MockClient::new();
        let client = Arc::new(mock);
        let executor = SkillExecutor::new(client as Arc<dyn QueryApi>)
            .with_analyst(Arc::new(MockAnalyst::replying("Spend is drifting upward.")));

        let text = executor.analyze("summarize", &json!({})).await;
        assert_eq!(text, "Spend is drifting upward.");
    }

    #[tokio::test]
    async fn test_analyze_falls_back_when_analyst_fails() {
        let client = Arc::new(MockClient::new());
        let executor = SkillExecutor::new(client as Arc<dyn QueryApi>)
            .with_analyst(Arc::new(MockAnalyst::failing()));

        let text = executor.analyze("summarize", &json!({"score": 70})).await;
        assert!(text.contains("score: 70"));
    }

    #[test]
    fn test_sort_recommendations_stable_by_priority() {
        let rec = |priority, category: &str| Recommendation {
            priority,
            category: category.to_string(),
            description: String::new(),
            action: String::new(),
        };
        let mut recs = vec![
            rec(Priority::Low, "l1"),
            rec(Priority::Critical, "c1"),
            rec(Priority::Medium, "m1"),
            rec(Priority::Critical, "c2"),
            rec(Priority::High, "h1"),
        ];

        sort_recommendations(&mut recs);

        let order: Vec<&str> = recs.iter().map(|r| r.category.as_str()).collect();
        // c1 stays ahead of c2: equal priorities keep generation order.
        assert_eq!(order, vec!["c1", "c2", "h1", "m1", "l1"]);
    }

    #[test]
    fn test_priority_phrase() {
        let rec = |priority| Recommendation {
            priority,
            category: "x".to_string(),
            description: String::new(),
            action: String::new(),
        };

        assert_eq!(priority_phrase(&[]), "no recommendations");
        let phrase = priority_phrase(&[
            rec(Priority::Critical),
            rec(Priority::Critical),
            rec(Priority::Low),
        ]);
        assert_eq!(phrase, "3 recommendations (2 critical, 1 low)");
    }
}
