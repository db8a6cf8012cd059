//! Plain-text rendering of tally reports.
//!
//! Output is meant for chat replies: a verbose personal summary, a CSV
//! roster, and a review listing for one label.

use crate::service::tally_service::{DailyEntry, PersonalReport, RosterRow};

/// Verbose count for one student.
pub fn render_personal_report(report: &PersonalReport) -> String {
    let mut out = format!("Current RQ Count: {}", report.credit_count());
    if !report.credit_labels.is_empty() {
        out.push_str("\nOn-time and Valid RQs: ");
        out.push_str(&report.credit_labels.join(", "));
    }
    if !report.no_credit_labels.is_empty() {
        out.push_str("\nLate or Invalid RQs: ");
        out.push_str(&report.no_credit_labels.join(", "));
    }
    out
}

/// `name,email,count` table, one line per roster row.
pub fn render_roster_csv(rows: &[RosterRow]) -> String {
    let mut out = String::from("name,email,count\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{}\n",
            csv_field(&row.name),
            csv_field(&row.email),
            row.credit_count
        ));
    }
    out
}

/// Submissions for one label, each as `name:` followed by the content.
pub fn render_daily_report(label: &str, entries: &[DailyEntry]) -> String {
    if entries.is_empty() {
        return format!("No submissions for {label}.");
    }
    entries
        .iter()
        .map(|entry| format!("{}:\n{}", entry.sender_name, entry.content.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
