use crate::cli::{OutputFormat, RunArgs, TableArgs};
use crate::config;
use crate::context;
use crate::error::CliResult;
use crate::output::format_summary;
use colored::Colorize;
use fieldfill_core::{BackfillDriver, ScanStrategy};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use std::time::Duration;

pub async fn run(
    table_args: &TableArgs,
    run_args: &RunArgs,
    format: OutputFormat,
    config_path: Option<&Path>,
    quiet: bool,
) -> CliResult<()> {
    let settings = config::load_settings(config_path, table_args, Some(run_args))?;
    let store = context::build_store(&settings).await?;
    context::verify_key_schema(&store, &settings).await?;

    if !quiet {
        eprintln!(
            "{} {}: '{}' <- '{}'{}",
            if settings.options.dry_run {
                "Checking".cyan().bold()
            } else {
                "Backfilling".green().bold()
            },
            store.table_name(),
            settings.mapping.target_field,
            settings.mapping.source_field,
            match settings.options.strategy {
                ScanStrategy::Collect => " (collect first)",
                ScanStrategy::Stream => "",
            }
        );
    }

    let bar = progress_bar(quiet);
    let pb = bar.clone();
    let driver = BackfillDriver::new(store, settings.mapping.clone())
        .options(settings.options.clone())
        .on_progress(move |p| {
            if p.scan_complete {
                pb.set_length(p.total as u64);
            }
            pb.set_position(p.updated as u64);
            pb.set_message(p.to_string());
        });

    let outcome = driver.run().await;
    bar.finish_and_clear();
    let result = outcome?;

    print!("{}", format_summary(&result, driver.mapping(), format)?);
    Ok(())
}

fn progress_bar(quiet: bool) -> ProgressBar {
    let bar = ProgressBar::no_length();
    if quiet {
        bar.set_draw_target(ProgressDrawTarget::hidden());
        return bar;
    }
    let style = ProgressStyle::with_template("{prefix:12} {spinner:.dim} {pos} updated  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["|", "/", "-", "\\", " "]);
    bar.set_style(style);
    bar.set_prefix(format!("{}", "Updating".green().bold()));
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
