//! Machine-readable rendering of a [`ScanReport`].

use reconciler::ScanReport;
use serde_json::{json, Value};

pub fn to_json(report: &ScanReport) -> Value {
    let repositories: Vec<Value> = report
        .repositories
        .iter()
        .map(|entry| match &entry.result {
            Ok(outcome) => json!({
                "repository": entry.repository,
                "outcome": outcome,
                "summary": outcome.summary(),
            }),
            Err(err) => json!({
                "repository": entry.repository,
                "error": err.to_string(),
            }),
        })
        .collect();

    json!({
        "run_id": report.run_id,
        "organization": report.organization,
        "started_at": report.started_at,
        "finished_at": report.finished_at,
        "cancelled": report.cancelled,
        "listing_error": report.listing_error.as_ref().map(ToString::to_string),
        "totals": report.totals(),
        "repositories": repositories,
    })
}
