//! Config file loading and settings resolution.
//!
//! Precedence (highest to lowest):
//!   1. CLI arguments
//!   2. Environment variables (FIELDFILL_*, via clap)
//!   3. fieldfill.toml
//!   4. Built-in defaults

use crate::cli::{RunArgs, TableArgs};
use crate::error::{CliError, CliResult};
use fieldfill_core::{BackfillOptions, FieldMapping, ScanStrategy};
use fieldfill_storage_aws::DynamoDbConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "fieldfill.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub table: TableSection,
    #[serde(default)]
    pub fields: FieldsSection,
    #[serde(default)]
    pub run: RunSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSection {
    pub name: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldsSection {
    pub partition_key: Option<String>,
    pub sort_key: Option<String>,
    pub source_field: Option<String>,
    pub target_field: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// "stream" or "collect"
    pub strategy: Option<StrategyName>,
    pub concurrency: Option<usize>,
    pub page_size: Option<u32>,
    pub progress_every: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyName {
    Stream,
    Collect,
}

/// Fully-resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub table: DynamoDbConfig,
    pub mapping: FieldMapping,
    pub options: BackfillOptions,
}

/// Locate the config file: an explicit `--config` must exist; otherwise
/// `./fieldfill.toml` is used when present.
pub fn find_config(config_override: Option<&Path>) -> CliResult<Option<PathBuf>> {
    if let Some(p) = config_override {
        let resolved = if p.is_absolute() {
            p.to_path_buf()
        } else {
            std::env::current_dir()?.join(p)
        };
        if resolved.is_file() {
            return Ok(Some(resolved));
        }
        return Err(CliError::Config(format!(
            "config path does not exist: {}",
            p.display()
        )));
    }

    let local = std::env::current_dir()?.join(CONFIG_FILE);
    Ok(local.is_file().then_some(local))
}

pub fn load_file_config(path: &Path) -> CliResult<FileConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("failed to read {}: {e}", path.display())))?;
    parse_file_config(&content)
        .map_err(|e| CliError::Config(format!("failed to parse {}: {e}", path.display())))
}

fn parse_file_config(content: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Load the config file (if any) and merge it with CLI arguments.
pub fn load_settings(
    config_override: Option<&Path>,
    table_args: &TableArgs,
    run_args: Option<&RunArgs>,
) -> CliResult<Settings> {
    let file = match find_config(config_override)? {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config file");
            load_file_config(&path)?
        }
        None => FileConfig::default(),
    };
    resolve(file, table_args, run_args)
}

/// Merge CLI arguments over file values over defaults, then validate.
pub fn resolve(
    file: FileConfig,
    table_args: &TableArgs,
    run_args: Option<&RunArgs>,
) -> CliResult<Settings> {
    let defaults = DynamoDbConfig::default();
    let table = DynamoDbConfig {
        table_name: pick(&table_args.table, file.table.name).unwrap_or(defaults.table_name),
        region: pick(&table_args.region, file.table.region),
        endpoint: pick(&table_args.endpoint, file.table.endpoint),
        timeout_ms: table_args.timeout_ms.or(file.table.timeout_ms),
    };
    if table.table_name.trim().is_empty() {
        return Err(CliError::Usage("table name must not be empty".into()));
    }

    let default_mapping = FieldMapping::default();
    let mapping = FieldMapping {
        partition_key: pick(&table_args.partition_key, file.fields.partition_key)
            .unwrap_or(default_mapping.partition_key),
        sort_key: pick(&table_args.sort_key, file.fields.sort_key)
            .unwrap_or(default_mapping.sort_key),
        source_field: pick(&table_args.source_field, file.fields.source_field)
            .unwrap_or(default_mapping.source_field),
        target_field: pick(&table_args.target_field, file.fields.target_field)
            .unwrap_or(default_mapping.target_field),
    };
    mapping.validate().map_err(CliError::Usage)?;

    let defaults = BackfillOptions::default();
    let run = file.run;
    let options = match run_args {
        Some(args) => BackfillOptions {
            strategy: if args.collect {
                ScanStrategy::Collect
            } else {
                match run.strategy {
                    Some(StrategyName::Collect) => ScanStrategy::Collect,
                    Some(StrategyName::Stream) | None => defaults.strategy,
                }
            },
            page_size: args.page_size.or(run.page_size),
            concurrency: args
                .concurrency
                .or(run.concurrency)
                .unwrap_or(defaults.concurrency),
            progress_every: args
                .progress_every
                .or(run.progress_every)
                .unwrap_or(defaults.progress_every),
            dry_run: args.dry_run,
        },
        None => BackfillOptions {
            page_size: run.page_size,
            ..defaults
        },
    };
    if options.concurrency == 0 {
        return Err(CliError::Usage("--concurrency must be at least 1".into()));
    }
    if options.page_size == Some(0) {
        return Err(CliError::Usage("--page-size must be at least 1".into()));
    }
    if options.progress_every == 0 {
        return Err(CliError::Usage("--progress-every must be at least 1".into()));
    }

    Ok(Settings {
        table,
        mapping,
        options,
    })
}

fn pick(arg: &Option<String>, file: Option<String>) -> Option<String> {
    arg.clone().or(file)
}

/// Write `template` to `./fieldfill.toml`.
pub fn write_config_template(template: &str, force: bool) -> CliResult<PathBuf> {
    let path = std::env::current_dir()?.join(CONFIG_FILE);
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    fs::write(&path, template)
        .map_err(|e| CliError::Config(format!("failed to write {}: {e}", path.display())))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(toml: &str) -> FileConfig {
        parse_file_config(toml).unwrap()
    }

    #[test]
    fn empty_config_uses_defaults() {
        let settings = resolve(FileConfig::default(), &TableArgs::default(), None).unwrap();
        assert_eq!(settings.table.table_name, "NCMWDashboardSessionlogs");
        assert_eq!(settings.mapping, FieldMapping::default());
        assert_eq!(settings.options.concurrency, 1);
        assert_eq!(settings.options.strategy, ScanStrategy::Stream);
    }

    #[test]
    fn file_values_apply() {
        let config = file(
            r#"
            [table]
            name = "events"
            region = "eu-west-1"
            timeout_ms = 5000

            [fields]
            partition_key = "tenant"
            sort_key = "event_id"
            source_field = "created_at"
            target_field = "first_seen"

            [run]
            strategy = "collect"
            concurrency = 4
            page_size = 250
            "#,
        );
        let settings = resolve(config, &TableArgs::default(), Some(&RunArgs::default())).unwrap();
        assert_eq!(settings.table.table_name, "events");
        assert_eq!(settings.table.region.as_deref(), Some("eu-west-1"));
        assert_eq!(settings.table.timeout_ms, Some(5000));
        assert_eq!(settings.mapping.partition_key, "tenant");
        assert_eq!(settings.mapping.target_field, "first_seen");
        assert_eq!(settings.options.strategy, ScanStrategy::Collect);
        assert_eq!(settings.options.concurrency, 4);
        assert_eq!(settings.options.page_size, Some(250));
    }

    #[test]
    fn region_left_to_store_when_unset() {
        // None lets the SDK chain (AWS_REGION, profile) and then the store's
        // us-west-2 default decide
        let settings = resolve(FileConfig::default(), &TableArgs::default(), None).unwrap();
        assert!(settings.table.region.is_none());

        let config = file("[table]\nregion = \"eu-central-1\"\n");
        let table = TableArgs {
            region: Some("us-east-2".into()),
            ..Default::default()
        };
        let settings = resolve(config, &table, None).unwrap();
        assert_eq!(settings.table.region.as_deref(), Some("us-east-2"));
    }

    #[test]
    fn cli_args_override_file() {
        let config = file(
            r#"
            [table]
            name = "from-file"
            [run]
            concurrency = 4
            "#,
        );
        let table = TableArgs {
            table: Some("from-cli".into()),
            ..Default::default()
        };
        let run = RunArgs {
            concurrency: Some(2),
            dry_run: true,
            ..Default::default()
        };
        let settings = resolve(config, &table, Some(&run)).unwrap();
        assert_eq!(settings.table.table_name, "from-cli");
        assert_eq!(settings.options.concurrency, 2);
        assert!(settings.options.dry_run);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(parse_file_config("[table]\nnmae = \"typo\"\n").is_err());
    }

    #[test]
    fn invalid_values_are_usage_errors() {
        let run = RunArgs {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            resolve(FileConfig::default(), &TableArgs::default(), Some(&run)),
            Err(CliError::Usage(_))
        ));

        let table = TableArgs {
            target_field: Some("session_id".into()),
            ..Default::default()
        };
        assert!(matches!(
            resolve(FileConfig::default(), &table, None),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn init_template_parses() {
        let config = parse_file_config(crate::commands::init::CONFIG_TEMPLATE).unwrap();
        assert!(config.table.name.is_none());
    }
}
