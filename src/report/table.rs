//! Plain text rendering for run reports.
//!
//! One numbered block per processed file:
//! - size before and after
//! - rename, when the extension changed
//! - actions taken, then warnings

use super::RunReport;
use crate::util::{display_path, format_size};

pub fn render(report: &RunReport) -> String {
    let mut output = String::new();

    if report.files.is_empty() && report.counters.skipped == 0 {
        output.push_str("No matching images found.\n");
    }

    if !report.files.is_empty() {
        output.push_str(&format!(
            "\n{} {} file(s):\n",
            if report.mode.is_mutating() { "Processed" } else { "Dry run" },
            report.files.len()
        ));
    }

    for (index, file) in report.files.iter().enumerate() {
        let path = display_path(&file.path);
        output.push_str(&format!("  {}. {}\n", index + 1, path));
        output.push_str(&format!(
            "       size: {} -> {} ({}x{}, {})\n",
            format_size(file.before_size),
            format_size(file.after_size),
            file.width,
            file.height,
            file.target_format
        ));
        if file.renamed() {
            output.push_str(&format!(
                "       renamed: {} -> {}\n",
                path,
                display_path(&file.destination)
            ));
        }
        for action in &file.actions {
            output.push_str(&format!("       - {action}\n"));
        }
        for warning in &file.warnings {
            output.push_str(&format!("       ! {warning}\n"));
        }
    }

    if !report.warnings.is_empty() {
        output.push('\n');
        for warning in &report.warnings {
            output.push_str(&format!("[warning] {warning}\n"));
        }
    }

    output
}
