//! Inventory audit skill
//!
//! Audits the materialized snapshot: what exists, what is idle, which
//! compartments are empty, plus an optional live utilization query.

use serde_json::{Value, json};

use super::{
    Priority, Recommendation, SectionOutcome, SkillExecutor, SkillReport, priority_phrase,
    sort_recommendations,
};
use crate::client::Entity;
use crate::snapshot::{
    DEFAULT_ENRICH_RULES, DEFAULT_MAX_AGE_MINUTES, ResourceSnapshot, SnapshotStore,
};

/// Stopped-instance share past which the audit flags compute waste
const STOPPED_RATIO_THRESHOLD: f64 = 0.3;

/// Generate the inventory audit report.
///
/// The snapshot is refreshed first if stale; without any snapshot the report
/// still comes back structured, with every section explicitly errored.
pub async fn generate_inventory_report(
    executor: &SkillExecutor,
    store: &SnapshotStore,
    compartment: Option<&str>,
) -> SkillReport {
    executor.report_progress(0.05, "ensuring inventory snapshot");

    if let Err(e) = store.refresh(false, DEFAULT_MAX_AGE_MINUTES).await {
        log::warn!("Snapshot refresh failed: {}", e);
    }

    let mut sections = std::collections::BTreeMap::new();
    let mut recommendations = Vec::new();

    let Some(snapshot) = store.current() else {
        let marker = SectionOutcome::error("no snapshot available and rebuild failed");
        for name in ["summary", "compute", "identity", "compartments"] {
            sections.insert(name.to_string(), marker.clone());
        }
        let executive_summary =
            "Inventory audit unavailable: no snapshot could be built.".to_string();
        return SkillReport {
            skill: "inventory".to_string(),
            scope: String::new(),
            generated_at: chrono::Utc::now(),
            sections,
            recommendations,
            executive_summary,
            tool_calls: executor.tool_calls(),
        };
    };

    // A compartment filter may arrive as a display name or an ID.
    let compartment_id = compartment.map(|c| {
        store
            .get_compartment_by_name(c)
            .map(|found| found.id)
            .unwrap_or_else(|| c.to_string())
    });
    let scope = compartment_id
        .clone()
        .unwrap_or_else(|| snapshot.metadata.tenancy_id.clone());

    executor.report_progress(0.3, "auditing snapshot inventory");
    summarize_inventory(&snapshot, compartment_id.as_deref(), &mut sections);
    audit_compute(
        &snapshot,
        compartment_id.as_deref(),
        &mut sections,
        &mut recommendations,
    );
    audit_identity(&snapshot, &mut sections, &mut recommendations);
    audit_compartments(&snapshot, &mut sections, &mut recommendations);

    executor.report_progress(0.7, "querying live utilization");
    let params = json!({
        "scope": &snapshot.metadata.tenancy_id,
        "compartmentId": compartment_id,
    });
    match executor.call_tool("inventory_utilization", params).await {
        Ok(raw) => {
            let enriched = store.enrich_with_names(&raw, DEFAULT_ENRICH_RULES);
            if let Some(idle) = enriched.get("underutilized").and_then(Value::as_array)
                && !idle.is_empty()
            {
                recommendations.push(Recommendation {
                    priority: Priority::Medium,
                    category: "underutilized-compute".to_string(),
                    description: format!("{} instance(s) report sustained low utilization", idle.len()),
                    action: "Downsize or stop the flagged instances".to_string(),
                });
            }
            sections.insert("utilization".to_string(), SectionOutcome::ok(enriched));
        }
        Err(e) => {
            sections.insert("utilization".to_string(), SectionOutcome::error(&e));
        }
    }

    executor.report_progress(0.9, "synthesizing inventory report");
    sort_recommendations(&mut recommendations);
    let executive_summary = summarize(&snapshot, &sections, &recommendations);

    let synthesis_input = json!({
        "summary": &executive_summary,
        "counts": &snapshot.metadata.counts,
    });
    let synthesis = executor
        .analyze(
            "Summarize this tenancy inventory audit for an operator.",
            &synthesis_input,
        )
        .await;
    sections.insert("synthesis".to_string(), SectionOutcome::ok(json!(synthesis)));

    executor.report_progress(1.0, "inventory report complete");
    SkillReport {
        skill: "inventory".to_string(),
        scope,
        generated_at: chrono::Utc::now(),
        sections,
        recommendations,
        executive_summary,
        tool_calls: executor.tool_calls(),
    }
}

fn in_scope<T>(item: &T, compartment_id: Option<&str>, id_of: impl Fn(&T) -> &str) -> bool {
    match compartment_id {
        Some(filter) => id_of(item) == filter,
        None => true,
    }
}

fn summarize_inventory(
    snapshot: &ResourceSnapshot,
    compartment_id: Option<&str>,
    sections: &mut std::collections::BTreeMap<String, SectionOutcome>,
) {
    let instances = snapshot
        .instances
        .list
        .iter()
        .filter(|i| in_scope(*i, compartment_id, |i| i.compartment_id.as_str()))
        .count();
    let databases = snapshot
        .databases
        .list
        .iter()
        .filter(|d| in_scope(*d, compartment_id, |d| d.compartment_id.as_str()))
        .count();
    let network = snapshot
        .network
        .list
        .iter()
        .filter(|n| in_scope(*n, compartment_id, |n| n.compartment_id.as_str()))
        .count();

    sections.insert(
        "summary".to_string(),
        SectionOutcome::ok(json!({
            "tenancy": &snapshot.tenancy,
            "generatedAt": snapshot.metadata.generated_at,
            "compartmentFilter": compartment_id,
            "counts": {
                "compartments": snapshot.compartments.count,
                "instances": instances,
                "databases": databases,
                "network": network,
                "users": snapshot.users.count,
                "groups": snapshot.groups.count,
            },
        })),
    );
}

fn audit_compute(
    snapshot: &ResourceSnapshot,
    compartment_id: Option<&str>,
    sections: &mut std::collections::BTreeMap<String, SectionOutcome>,
    recommendations: &mut Vec<Recommendation>,
) {
    let scoped: Vec<_> = snapshot
        .instances
        .list
        .iter()
        .filter(|i| in_scope(*i, compartment_id, |i| i.compartment_id.as_str()))
        .collect();

    let state_of = |state: &Option<String>| {
        state
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_else(|| "UNKNOWN".to_string())
    };
    let running = scoped
        .iter()
        .filter(|i| state_of(&i.lifecycle_state) == "RUNNING")
        .count();
    let stopped: Vec<&str> = scoped
        .iter()
        .filter(|i| state_of(&i.lifecycle_state) == "STOPPED")
        .map(|i| i.display_name())
        .collect();

    if !scoped.is_empty() {
        let ratio = stopped.len() as f64 / scoped.len() as f64;
        if ratio > STOPPED_RATIO_THRESHOLD {
            recommendations.push(Recommendation {
                priority: Priority::Medium,
                category: "stopped-compute".to_string(),
                description: format!(
                    "{} of {} instances are stopped but still provisioned",
                    stopped.len(),
                    scoped.len()
                ),
                action: "Terminate or archive instances that are no longer needed".to_string(),
            });
        }
    }

    sections.insert(
        "compute".to_string(),
        SectionOutcome::ok(json!({
            "total": scoped.len(),
            "running": running,
            "stopped": stopped,
        })),
    );
}

fn audit_identity(
    snapshot: &ResourceSnapshot,
    sections: &mut std::collections::BTreeMap<String, SectionOutcome>,
    recommendations: &mut Vec<Recommendation>,
) {
    let inactive: Vec<&str> = snapshot
        .users
        .list
        .iter()
        .filter(|u| {
            u.lifecycle_state
                .as_deref()
                .is_some_and(|s| !s.eq_ignore_ascii_case("ACTIVE"))
        })
        .map(|u| u.name.as_str())
        .collect();

    if !inactive.is_empty() {
        recommendations.push(Recommendation {
            priority: Priority::Low,
            category: "inactive-users".to_string(),
            description: format!("{} user account(s) are inactive", inactive.len()),
            action: "Remove inactive accounts to shrink the access surface".to_string(),
        });
    }

    sections.insert(
        "identity".to_string(),
        SectionOutcome::ok(json!({
            "users": snapshot.users.count,
            "groups": snapshot.groups.count,
            "inactiveUsers": inactive,
        })),
    );
}

fn audit_compartments(
    snapshot: &ResourceSnapshot,
    sections: &mut std::collections::BTreeMap<String, SectionOutcome>,
    recommendations: &mut Vec<Recommendation>,
) {
    let empty: Vec<&str> = snapshot
        .compartments
        .list
        .iter()
        .filter(|c| {
            let holds_nothing = !snapshot
                .instances
                .list
                .iter()
                .any(|i| i.compartment_id == c.id)
                && !snapshot
                    .databases
                    .list
                    .iter()
                    .any(|d| d.compartment_id == c.id)
                && !snapshot.network.list.iter().any(|n| n.compartment_id == c.id);
            holds_nothing
        })
        .map(|c| c.name.as_str())
        .collect();

    if !empty.is_empty() {
        recommendations.push(Recommendation {
            priority: Priority::Low,
            category: "empty-compartments".to_string(),
            description: format!("{} compartment(s) hold no resources", empty.len()),
            action: "Delete empty compartments or document why they exist".to_string(),
        });
    }

    sections.insert(
        "compartments".to_string(),
        SectionOutcome::ok(json!({
            "total": snapshot.compartments.count,
            "empty": empty,
        })),
    );
}

fn summarize(
    snapshot: &ResourceSnapshot,
    sections: &std::collections::BTreeMap<String, SectionOutcome>,
    recommendations: &[Recommendation],
) -> String {
    let counts = &snapshot.metadata.counts;
    let errored = sections.values().filter(|s| !s.is_ok()).count();

    let mut summary = format!(
        "Inventory audit for {}: {} compartments, {} instances, {} databases, {} network objects, {} users; {}.",
        snapshot.tenancy.name,
        counts.get("compartments").copied().unwrap_or(0),
        counts.get("instances").copied().unwrap_or(0),
        counts.get("databases").copied().unwrap_or(0),
        counts.get("network").copied().unwrap_or(0),
        counts.get("users").copied().unwrap_or(0),
        priority_phrase(recommendations),
    );
    if errored > 0 {
        summary.push_str(&format!(" {} section(s) unavailable.", errored));
    }
    summary
}
