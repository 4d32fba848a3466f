//! Plain terminal tables for scans, stats and store health.
//!
//! Codes are listed in the order given (newest first from the store); long
//! payloads are truncated so rows stay on one line.

use crate::model::{CodeStats, ScannedCode};
use crate::store::{SchemaStatus, StoreHealth};

const DATA_WIDTH: usize = 40;

pub fn render_codes(codes: &[ScannedCode]) -> String {
    if codes.is_empty() {
        return String::from("No scans recorded.\n");
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<32}  {:<10}  {:<19}  {}\n",
        "ID", "Type", "Scanned", "Data"
    ));
    output.push_str(&"-".repeat(32 + 2 + 10 + 2 + 19 + 2 + DATA_WIDTH));
    output.push('\n');

    for code in codes {
        output.push_str(&format!(
            "{:<32}  {:<10}  {:<19}  {}\n",
            code.id,
            truncate(&code.kind, 10),
            format_millis(code.timestamp),
            truncate(&single_line(&code.data), DATA_WIDTH)
        ));
    }

    output.push_str(&format!("\n{} scan(s)\n", codes.len()));
    output
}

pub fn render_code(code: &ScannedCode) -> String {
    format!(
        "id:      {}\ntype:    {}\nscanned: {}\ndata:    {}\n",
        code.id,
        code.kind,
        format_millis(code.timestamp),
        code.data
    )
}

pub fn render_stats(stats: &CodeStats) -> String {
    let mut output = format!("total scans: {}\n", stats.total);

    let last = stats.last_scan.as_deref().unwrap_or("never");
    output.push_str(&format!("last scan:   {last}\n"));

    if !stats.by_type.is_empty() {
        output.push_str("\nby type:\n");
        for entry in &stats.by_type {
            output.push_str(&format!("  {:20} {:>8}\n", truncate(&entry.kind, 20), entry.count));
        }
    }

    output
}

pub fn render_health(health: &StoreHealth) -> String {
    let mut output = format!(
        "schema version: {} (target {})\n",
        health.schema_version, health.target_version
    );

    match &health.status {
        SchemaStatus::Current => output.push_str("status:         ok\n"),
        SchemaStatus::Recovered { reason } => {
            output.push_str("status:         recovered (table was rebuilt)\n");
            output.push_str(&format!("reason:         {reason}\n"));
        }
        SchemaStatus::Degraded { reason } => {
            output.push_str("status:         DEGRADED\n");
            output.push_str(&format!("reason:         {reason}\n"));
            output.push_str("hint:           run 'scanqr rebuild' to retry the migration\n");
        }
    }

    output
}

/// Local time, second precision.
pub fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn single_line(s: &str) -> String {
    s.replace(['\n', '\r'], " ")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeCount;

    fn code(id: &str, data: &str) -> ScannedCode {
        ScannedCode {
            id: id.to_string(),
            data: data.to_string(),
            kind: "qr".to_string(),
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn empty_log_message() {
        assert_eq!(render_codes(&[]), "No scans recorded.\n");
    }

    #[test]
    fn rows_keep_given_order() {
        let output = render_codes(&[code("b", "second"), code("a", "first")]);
        let second = output.find("second").unwrap();
        let first = output.find("first").unwrap();
        assert!(second < first);
        assert!(output.ends_with("2 scan(s)\n"));
    }

    #[test]
    fn long_payload_is_truncated() {
        let long = "x".repeat(100);
        let output = render_codes(&[code("a", &long)]);
        assert!(output.contains(&format!("{}...", "x".repeat(DATA_WIDTH - 3))));
        assert!(!output.contains(&long));
    }

    #[test]
    fn multiline_payload_stays_on_one_row() {
        let output = render_codes(&[code("a", "line1\nline2")]);
        assert!(output.contains("line1 line2"));
    }

    #[test]
    fn stats_without_scans() {
        let stats = CodeStats {
            total: 0,
            by_type: vec![],
            last_scan: None,
        };
        let output = render_stats(&stats);
        assert!(output.contains("total scans: 0"));
        assert!(output.contains("last scan:   never"));
        assert!(!output.contains("by type"));
    }

    #[test]
    fn stats_list_types() {
        let stats = CodeStats {
            total: 3,
            by_type: vec![
                TypeCount { kind: "qr".to_string(), count: 2 },
                TypeCount { kind: "code128".to_string(), count: 1 },
            ],
            last_scan: Some("2023-11-14T22:13:20.000Z".to_string()),
        };
        let output = render_stats(&stats);
        assert!(output.contains("by type:"));
        assert!(output.find("qr").unwrap() < output.find("code128").unwrap());
    }

    #[test]
    fn degraded_health_suggests_rebuild() {
        let health = StoreHealth {
            schema_version: 2,
            target_version: 3,
            status: SchemaStatus::Degraded {
                reason: "boom".to_string(),
            },
        };
        let output = render_health(&health);
        assert!(output.contains("DEGRADED"));
        assert!(output.contains("scanqr rebuild"));
    }

    #[test]
    fn out_of_range_timestamp_is_unknown() {
        assert_eq!(format_millis(i64::MAX), "unknown");
    }
}
