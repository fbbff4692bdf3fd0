use crate::cli::OutputFormat;
use crate::error::CliResult;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use fieldfill_core::{BackfillResult, FieldMapping};
use serde::Serialize;

/// Render the end-of-run summary.
pub fn format_summary(
    result: &BackfillResult,
    mapping: &FieldMapping,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Table => Ok(format_summary_table(result, mapping)),
    }
}

fn format_summary_table(result: &BackfillResult, mapping: &FieldMapping) -> String {
    let mut out = String::new();

    if result.matched == 0 {
        out.push_str(&format!(
            "{} all records already have '{}'\n",
            "✓".green().bold(),
            mapping.target_field
        ));
        return out;
    }

    // Skips are part of `failed` but a re-run will not fix them
    let skipped = result
        .failures
        .iter()
        .filter(|f| f.reason.is_skip())
        .count();
    let rejected = result.failed.saturating_sub(skipped);

    let mut counts = Table::new();
    counts.set_content_arrangement(ContentArrangement::Dynamic);
    counts.set_header(vec!["MATCHED", "UPDATED", "FAILED", "SKIPPED"]);
    counts.add_row(vec![
        result.matched.to_string(),
        result.updated.to_string(),
        result.failed.to_string(),
        skipped.to_string(),
    ]);
    out.push_str(&counts.to_string());
    out.push('\n');

    if !result.failures.is_empty() {
        let mut failures = Table::new();
        failures.set_content_arrangement(ContentArrangement::Dynamic);
        failures.set_header(vec!["KEY", "REASON"]);
        for failure in &result.failures {
            failures.add_row(vec![failure.key.clone(), failure.reason.to_string()]);
        }
        out.push('\n');
        out.push_str(&failures.to_string());
        out.push('\n');
    }

    let headline = if result.dry_run {
        format!(
            "{} dry run: {} record(s) would get '{}' from '{}'",
            "i".cyan().bold(),
            result.matched - result.failed,
            mapping.target_field,
            mapping.source_field
        )
    } else if result.is_clean() {
        format!(
            "{} updated {} record(s)",
            "✓".green().bold(),
            result.updated
        )
    } else if rejected == 0 {
        format!(
            "{} updated {} record(s), {} skipped (missing key or source field)",
            "!".yellow().bold(),
            result.updated,
            skipped
        )
    } else {
        format!(
            "{} updated {} record(s), {} failed; re-run to retry {} rejected update(s)",
            "!".yellow().bold(),
            result.updated,
            result.failed,
            rejected
        )
    };
    out.push('\n');
    out.push_str(&headline);
    out.push('\n');
    out
}

/// Output of the read-only `scan` command
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub table: String,
    pub target_field: String,
    pub matched: usize,
    pub pages: usize,
    /// Candidates `run` would skip (missing key or source field)
    pub would_skip: usize,
    pub sample: Vec<String>,
}

pub fn format_scan_report(report: &ScanReport, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            let mut out = format!(
                "{} record(s) in {} are missing '{}' ({} page(s) scanned)\n",
                report.matched.to_string().bold(),
                report.table,
                report.target_field,
                report.pages
            );
            if report.would_skip > 0 {
                out.push_str(&format!(
                    "{} {} of them would be skipped (missing key or source field)\n",
                    "warning:".yellow().bold(),
                    report.would_skip
                ));
            }
            if !report.sample.is_empty() {
                let mut table = Table::new();
                table.set_content_arrangement(ContentArrangement::Dynamic);
                table.set_header(vec!["KEY"]);
                for key in &report.sample {
                    table.add_row(vec![key.clone()]);
                }
                out.push_str(&table.to_string());
                out.push('\n');
                if report.sample.len() < report.matched {
                    out.push_str(&format!(
                        "... and {} more\n",
                        report.matched - report.sample.len()
                    ));
                }
            }
            Ok(out)
        }
    }
}
