use crate::config::Settings;
use crate::error::{CliError, CliResult};
use aws_config::BehaviorVersion;
use fieldfill_core::FieldMapping;
use fieldfill_storage_aws::{DynamoDbTableStore, KeySchema};

/// Build a DynamoDB store from resolved settings.
///
/// Credentials and the default region come from the SDK's provider chain
/// (environment, profile, IMDS). Without any region the store uses us-west-2.
pub async fn build_store(settings: &Settings) -> CliResult<DynamoDbTableStore> {
    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let store = DynamoDbTableStore::new(&sdk_config, settings.table.clone()).await?;
    tracing::info!(
        table = %store.table_name(),
        region = ?settings.table.region,
        endpoint = ?settings.table.endpoint,
        "connected"
    );
    Ok(store)
}

/// Refuse to run when the configured key names disagree with the table.
pub async fn verify_key_schema(store: &DynamoDbTableStore, settings: &Settings) -> CliResult<()> {
    let schema = store.key_schema().await?;
    check_key_schema(store.table_name(), &schema, &settings.mapping)
}

/// Every update is addressed by `(partition_key, sort_key)`; a mismatch would
/// make every write fail.
pub fn check_key_schema(table: &str, schema: &KeySchema, mapping: &FieldMapping) -> CliResult<()> {
    if schema.partition_key != mapping.partition_key {
        return Err(CliError::Config(format!(
            "table {} is keyed by '{}', not '{}' (set --partition-key)",
            table, schema.partition_key, mapping.partition_key
        )));
    }
    match schema.sort_key.as_deref() {
        Some(sort_key) if sort_key == mapping.sort_key => Ok(()),
        Some(sort_key) => Err(CliError::Config(format!(
            "table {} has sort key '{}', not '{}' (set --sort-key)",
            table, sort_key, mapping.sort_key
        ))),
        None => Err(CliError::Config(format!(
            "table {} has no sort key; a composite (partition, sort) key is required",
            table
        ))),
    }
}
