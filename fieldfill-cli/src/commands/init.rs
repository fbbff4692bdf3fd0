use crate::config;
use crate::error::CliResult;

/// Default fieldfill.toml with every setting commented out.
pub const CONFIG_TEMPLATE: &str = r#"# fieldfill configuration
#
# Precedence (highest to lowest):
#   1. CLI arguments
#   2. Environment variables (FIELDFILL_TABLE, FIELDFILL_REGION, FIELDFILL_ENDPOINT)
#   3. This file
#   4. Built-in defaults
#
# AWS credentials are read from the standard SDK chain (env, ~/.aws, IMDS).

# [table]
# name = "NCMWDashboardSessionlogs"
# region = "us-west-2"                 # default when the SDK chain has none
# endpoint = "http://localhost:4566"   # LocalStack / DynamoDB Local
# timeout_ms = 30000

# [fields]
# partition_key = "session_id"
# sort_key = "timestamp"
# source_field = "timestamp"           # value copied verbatim...
# target_field = "original_ts"         # ...into this field, where missing

# [run]
# strategy = "stream"                  # stream, collect
# concurrency = 1                      # in-flight updates
# page_size = 500                      # items evaluated per Scan request
# progress_every = 10
"#;

pub fn run(force: bool) -> CliResult<()> {
    let path = config::write_config_template(CONFIG_TEMPLATE, force)?;
    println!("Wrote {}", path.display());
    Ok(())
}
