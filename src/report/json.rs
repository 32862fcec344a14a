//! JSON output for run reports.
//!
//! Serializes the RunReport for scripting and piping.

use super::RunReport;

pub fn render(report: &RunReport) -> String {
    serde_json::to_string_pretty(report)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize report: {e}\"}}"))
}
