use crate::cli::{OutputFormat, TableArgs};
use crate::config;
use crate::context;
use crate::error::CliResult;
use crate::output::{format_scan_report, ScanReport};
use fieldfill_core::{derive_update, ScanFilter, Scanner, TableStore};
use std::path::Path;

pub async fn run(
    table_args: &TableArgs,
    show: usize,
    format: OutputFormat,
    config_path: Option<&Path>,
) -> CliResult<()> {
    let settings = config::load_settings(config_path, table_args, None)?;
    let store = context::build_store(&settings).await?;
    context::verify_key_schema(&store, &settings).await?;

    let mut report = survey(&store, &settings.mapping, settings.options.page_size, show).await?;
    report.table = store.table_name().to_string();
    print!("{}", format_scan_report(&report, format)?);
    Ok(())
}

/// Walk every candidate page without holding more than one page in memory.
pub async fn survey<S: TableStore + ?Sized>(
    store: &S,
    mapping: &fieldfill_core::FieldMapping,
    page_size: Option<u32>,
    show: usize,
) -> CliResult<ScanReport> {
    let mut scanner = Scanner::new(
        store,
        ScanFilter::attribute_not_exists(mapping.target_field.clone()),
    )
    .page_size(page_size);

    let mut report = ScanReport {
        target_field: mapping.target_field.clone(),
        ..Default::default()
    };
    while let Some(page) = scanner.next_page().await? {
        for record in &page {
            report.matched += 1;
            if derive_update(record, mapping).is_err() {
                report.would_skip += 1;
            }
            if report.sample.len() < show {
                report.sample.push(record.describe_key(mapping));
            }
        }
    }
    report.pages = scanner.pages_fetched();
    Ok(report)
}
