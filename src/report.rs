//! Report output.

use crate::classify::ReportRow;
use crate::config::ReportFormat;
use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// CSV column names.
pub const CSV_HEADER: [&str; 4] = ["timestamp", "target", "list", "details"];

/// Write rows to `path` in the requested format.
pub fn write_report(path: &Path, format: ReportFormat, rows: &[ReportRow]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create report {}", path.display()))?;
    let mut out = BufWriter::new(file);

    match format {
        ReportFormat::Csv => write_csv(&mut out, rows)?,
        ReportFormat::Json => write_json(&mut out, rows)?,
    }
    out.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Report written");
    Ok(())
}

/// Write rows as CSV. The header is written even when there are no rows.
pub fn write_csv<W: Write>(out: W, rows: &[ReportRow]) -> Result<()> {
    let mut writer = Writer::from_writer(out);

    writer.write_record(CSV_HEADER)?;

    for row in rows {
        writer.write_record([
            row.formatted_timestamp().as_str(),
            row.target.to_string().as_str(),
            row.list_label.as_str(),
            row.details.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write rows as a pretty-printed JSON array.
pub fn write_json<W: Write>(mut out: W, rows: &[ReportRow]) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, rows)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Target, ENTIRE_NETWORK_LISTED};
    use chrono::NaiveDate;

    fn rows() -> Vec<ReportRow> {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        vec![
            ReportRow {
                timestamp: ts,
                target: Target::Network("198.51.100.0/30".parse().unwrap()),
                list_label: "Spamhaus SBL".to_string(),
                details: ENTIRE_NETWORK_LISTED.to_string(),
            },
            ReportRow {
                timestamp: ts,
                target: Target::Address("203.0.113.9".parse().unwrap()),
                list_label: "Spamhaus XBL".to_string(),
                details: "Infected system, botnet".to_string(),
            },
        ]
    }

    #[test]
    fn test_csv_output() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &rows()).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,target,list,details");
        assert_eq!(
            lines[1],
            "2024-05-01T08:00:00,198.51.100.0/30,Spamhaus SBL,Entire network listed"
        );
        assert_eq!(
            lines[2],
            "2024-05-01T08:00:00,203.0.113.9,Spamhaus XBL,\"Infected system, botnet\""
        );
    }

    #[test]
    fn test_csv_header_only_when_empty() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec!["timestamp,target,list,details"]);
    }

    #[test]
    fn test_json_output() {
        let mut buf = Vec::new();
        write_json(&mut buf, &rows()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["target"], "198.51.100.0/30");
        assert_eq!(array[1]["list"], "Spamhaus XBL");
        assert_eq!(array[1]["timestamp"], "2024-05-01T08:00:00");
    }

    #[test]
    fn test_write_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        write_report(&path, ReportFormat::Csv, &rows()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_write_report_bad_path() {
        let result = write_report(
            Path::new("/nonexistent/dir/report.csv"),
            ReportFormat::Csv,
            &rows(),
        );
        assert!(result.is_err());
    }
}
