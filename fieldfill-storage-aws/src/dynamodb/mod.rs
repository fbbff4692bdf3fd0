//! DynamoDB table store
//!
//! Provides `DynamoDbTableStore`, which implements the engine's `TableStore`
//! trait on top of `Scan` and `UpdateItem`.

pub mod schema;

use crate::error::{AwsStorageError, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{AttributeValue, KeyType};
use aws_sdk_dynamodb::Client;
use aws_smithy_types::timeout::TimeoutConfig;
use fieldfill_core::{
    check_assignments, AttrValue, Assignment, ContinuationToken, Page, Record, RecordKey,
    ScanFilter, StoreError, TableStore,
};
use schema::*;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, warn};

/// DynamoDB table configuration
#[derive(Debug, Clone)]
pub struct DynamoDbConfig {
    /// DynamoDB table name
    pub table_name: String,
    /// AWS region (optional; falls back to the SDK's region chain, then
    /// [`DEFAULT_REGION`])
    pub region: Option<String>,
    /// Optional endpoint override (e.g. LocalStack)
    pub endpoint: Option<String>,
    /// Timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for DynamoDbConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            region: None,
            endpoint: None,
            timeout_ms: None,
        }
    }
}

/// Primary key attribute names as declared on the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: Option<String>,
}

/// DynamoDB-backed table store
#[derive(Clone)]
pub struct DynamoDbTableStore {
    client: Client,
    table_name: String,
}

impl std::fmt::Debug for DynamoDbTableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbTableStore")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl DynamoDbTableStore {
    /// Create a new DynamoDB table store
    ///
    /// Configuration:
    /// - `region`: Override SDK region (SDK default if not specified, then
    ///   `DEFAULT_REGION` when the SDK has none either)
    /// - `endpoint`: Override the service endpoint (LocalStack, DynamoDB Local)
    /// - `timeout_ms`: Operation timeout in milliseconds
    pub async fn new(sdk_config: &aws_config::SdkConfig, config: DynamoDbConfig) -> Result<Self> {
        if config.table_name.trim().is_empty() {
            return Err(AwsStorageError::invalid_config("table name must not be empty"));
        }

        // Inherit HTTP client, retry config, credentials etc. from SdkConfig
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);

        if let Some(region_str) = config.region {
            builder = builder.region(aws_sdk_dynamodb::config::Region::new(region_str));
        } else if sdk_config.region().is_none() {
            debug!(region = DEFAULT_REGION, "no region configured; using default");
            builder =
                builder.region(aws_sdk_dynamodb::config::Region::from_static(DEFAULT_REGION));
        }

        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout_ms) = config.timeout_ms {
            let timeout_config = TimeoutConfig::builder()
                .operation_timeout(Duration::from_millis(timeout_ms))
                .build();
            builder = builder.timeout_config(timeout_config);
        }

        let client = Client::from_conf(builder.build());

        Ok(Self {
            client,
            table_name: config.table_name,
        })
    }

    /// Create from a pre-built client (for testing)
    pub fn from_client(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Read the table's declared key schema (DescribeTable)
    pub async fn key_schema(&self) -> Result<KeySchema> {
        let response = self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| {
                AwsStorageError::dynamodb(format!("DynamoDB DescribeTable failed: {}", e))
            })?;

        let table = response
            .table()
            .ok_or_else(|| AwsStorageError::not_found(format!("table {}", self.table_name)))?;

        let mut partition_key = None;
        let mut sort_key = None;
        for element in table.key_schema() {
            match element.key_type() {
                KeyType::Hash => partition_key = Some(element.attribute_name().to_string()),
                KeyType::Range => sort_key = Some(element.attribute_name().to_string()),
                _ => {}
            }
        }

        let partition_key = partition_key.ok_or_else(|| {
            AwsStorageError::invalid_config(format!(
                "table {} has no partition key",
                self.table_name
            ))
        })?;
        Ok(KeySchema {
            partition_key,
            sort_key,
        })
    }

    /// Convert a DynamoDB item into an engine record.
    ///
    /// Attributes of a type the engine does not model are dropped.
    fn item_to_record(item: &HashMap<String, AttributeValue>) -> Record {
        item.iter()
            .filter_map(|(name, value)| match Self::attr_from_dynamo(value) {
                Ok(v) => Some((name.clone(), v)),
                Err(e) => {
                    warn!(attribute = %name, error = %e, "dropping attribute");
                    None
                }
            })
            .collect()
    }

    /// Convert a single DynamoDB AttributeValue
    fn attr_from_dynamo(attr: &AttributeValue) -> Result<AttrValue> {
        Ok(match attr {
            AttributeValue::S(s) => AttrValue::S(s.clone()),
            AttributeValue::N(n) => AttrValue::N(n.clone()),
            AttributeValue::B(b) => AttrValue::B(b.as_ref().to_vec()),
            AttributeValue::Bool(b) => AttrValue::Bool(*b),
            AttributeValue::Null(_) => AttrValue::Null,
            AttributeValue::L(list) => AttrValue::L(
                list.iter()
                    .map(Self::attr_from_dynamo)
                    .collect::<Result<_>>()?,
            ),
            AttributeValue::M(map) => AttrValue::M(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), Self::attr_from_dynamo(v)?)))
                    .collect::<Result<_>>()?,
            ),
            AttributeValue::Ss(items) => AttrValue::Ss(items.clone()),
            AttributeValue::Ns(items) => AttrValue::Ns(items.clone()),
            AttributeValue::Bs(items) => {
                AttrValue::Bs(items.iter().map(|b| b.as_ref().to_vec()).collect())
            }
            other => {
                return Err(AwsStorageError::unsupported_value(format!("{:?}", other)));
            }
        })
    }

    /// Convert a single engine value to a DynamoDB AttributeValue
    fn attr_to_dynamo(value: &AttrValue) -> AttributeValue {
        match value {
            AttrValue::S(s) => AttributeValue::S(s.clone()),
            AttrValue::N(n) => AttributeValue::N(n.clone()),
            AttrValue::B(b) => AttributeValue::B(Blob::new(b.clone())),
            AttrValue::Bool(b) => AttributeValue::Bool(*b),
            AttrValue::Null => AttributeValue::Null(true),
            AttrValue::L(items) => {
                AttributeValue::L(items.iter().map(Self::attr_to_dynamo).collect())
            }
            AttrValue::M(map) => AttributeValue::M(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::attr_to_dynamo(v)))
                    .collect(),
            ),
            AttrValue::Ss(items) => AttributeValue::Ss(items.clone()),
            AttrValue::Ns(items) => AttributeValue::Ns(items.clone()),
            AttrValue::Bs(items) => {
                AttributeValue::Bs(items.iter().map(|b| Blob::new(b.clone())).collect())
            }
        }
    }

    fn token_to_start_key(token: ContinuationToken) -> HashMap<String, AttributeValue> {
        token
            .into_map()
            .into_iter()
            .map(|(k, v)| (k, Self::attr_to_dynamo(&v)))
            .collect()
    }

    fn start_key_to_token(key: &HashMap<String, AttributeValue>) -> Result<ContinuationToken> {
        let position = key
            .iter()
            .map(|(k, v)| Ok((k.clone(), Self::attr_from_dynamo(v)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(ContinuationToken::new(position))
    }

    /// Classify a Scan failure
    fn scan_error(
        err: aws_sdk_dynamodb::error::SdkError<aws_sdk_dynamodb::operation::scan::ScanError>,
    ) -> AwsStorageError {
        use aws_sdk_dynamodb::error::SdkError;
        use aws_sdk_dynamodb::operation::scan::ScanError;

        match &err {
            SdkError::ServiceError(service_err)
                if matches!(
                    service_err.err(),
                    ScanError::ProvisionedThroughputExceededException(_)
                        | ScanError::RequestLimitExceeded(_)
                ) =>
            {
                AwsStorageError::throttled(format!("DynamoDB Scan throttled: {}", err))
            }
            SdkError::ServiceError(service_err)
                if matches!(service_err.err(), ScanError::ResourceNotFoundException(_)) =>
            {
                AwsStorageError::not_found(format!("DynamoDB Scan failed: {}", err))
            }
            _ => AwsStorageError::dynamodb(format!("DynamoDB Scan failed: {}", err)),
        }
    }

    /// Classify an UpdateItem failure
    fn update_error(
        err: aws_sdk_dynamodb::error::SdkError<
            aws_sdk_dynamodb::operation::update_item::UpdateItemError,
        >,
        key: &RecordKey,
    ) -> AwsStorageError {
        use aws_sdk_dynamodb::error::SdkError;
        use aws_sdk_dynamodb::operation::update_item::UpdateItemError;

        match &err {
            // attribute_exists(#pk) guard tripped: no such record
            SdkError::ServiceError(service_err)
                if matches!(
                    service_err.err(),
                    UpdateItemError::ConditionalCheckFailedException(_)
                ) =>
            {
                AwsStorageError::not_found(format!("no record at {}", key))
            }
            SdkError::ServiceError(service_err)
                if matches!(
                    service_err.err(),
                    UpdateItemError::ProvisionedThroughputExceededException(_)
                        | UpdateItemError::RequestLimitExceeded(_)
                ) =>
            {
                AwsStorageError::throttled(format!("DynamoDB UpdateItem throttled: {}", err))
            }
            _ => AwsStorageError::dynamodb(format!("DynamoDB UpdateItem failed: {}", err)),
        }
    }
}

/// `UpdateItem` expression and placeholder maps for one assignment list
#[derive(Debug, PartialEq)]
struct UpdatePlan {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl UpdatePlan {
    fn new(key: &RecordKey, assignments: &[Assignment]) -> Self {
        let mut names = HashMap::with_capacity(assignments.len() + 1);
        let mut values = HashMap::with_capacity(assignments.len());
        let mut clauses = Vec::with_capacity(assignments.len());

        for (i, assignment) in assignments.iter().enumerate() {
            let name = format!("{NAME_ASSIGNMENT_PREFIX}{i}");
            let value = format!("{VALUE_ASSIGNMENT_PREFIX}{i}");
            clauses.push(format!("{name} = {value}"));
            names.insert(name, assignment.field.clone());
            values.insert(value, DynamoDbTableStore::attr_to_dynamo(&assignment.value));
        }
        names.insert(NAME_PARTITION_KEY.to_string(), key.partition.0.clone());

        Self {
            expression: format!("SET {}", clauses.join(", ")),
            names,
            values,
        }
    }
}

#[async_trait]
impl TableStore for DynamoDbTableStore {
    async fn scan(
        &self,
        filter: &ScanFilter,
        start: Option<ContinuationToken>,
        limit: Option<u32>,
    ) -> std::result::Result<Page, StoreError> {
        let ScanFilter::AttributeNotExists(target) = filter;

        let mut request = self
            .client
            .scan()
            .table_name(&self.table_name)
            .filter_expression(FILTER_TARGET_NOT_EXISTS)
            .expression_attribute_names(NAME_TARGET, target);

        if let Some(token) = start {
            request = request.set_exclusive_start_key(Some(Self::token_to_start_key(token)));
        }

        if let Some(limit) = limit {
            let limit = i32::try_from(limit).unwrap_or(i32::MAX);
            request = request.limit(limit);
        }

        let response = request.send().await.map_err(Self::scan_error)?;

        let records: Vec<Record> = response.items().iter().map(Self::item_to_record).collect();

        let next = match response.last_evaluated_key() {
            Some(key) if !key.is_empty() => Some(Self::start_key_to_token(key)?),
            _ => None,
        };

        debug!(
            table = %self.table_name,
            items = records.len(),
            scanned = response.scanned_count(),
            more = next.is_some(),
            "DynamoDB Scan page"
        );

        Ok(Page { records, next })
    }

    async fn update(
        &self,
        key: &RecordKey,
        assignments: &[Assignment],
    ) -> std::result::Result<(), StoreError> {
        check_assignments(assignments)?;
        let plan = UpdatePlan::new(key, assignments);
        let (pk_name, pk_value) = &key.partition;
        let (sk_name, sk_value) = &key.sort;

        // Unconditional on the assigned attributes' current values; the guard
        // only prevents UpdateItem from creating a new item.
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key(pk_name, Self::attr_to_dynamo(pk_value))
            .key(sk_name, Self::attr_to_dynamo(sk_value))
            .update_expression(plan.expression)
            .condition_expression(CONDITION_RECORD_EXISTS)
            .set_expression_attribute_names(Some(plan.names))
            .set_expression_attribute_values(Some(plan.values))
            .send()
            .await
            .map_err(|e| Self::update_error(e, key))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldfill_core::MemoryTableStore;

    #[test]
    fn attribute_conversion_preserves_values() {
        let mut nested = BTreeMap::new();
        nested.insert("ua".to_string(), AttrValue::s("Mozilla/5.0"));
        nested.insert("bot".to_string(), AttrValue::Bool(false));
        let values = [
            AttrValue::s("abc"),
            AttrValue::n("1700000000.123"),
            AttrValue::B(vec![1, 2, 3]),
            AttrValue::Null,
            AttrValue::L(vec![AttrValue::n(1), AttrValue::s("x")]),
            AttrValue::M(nested),
            AttrValue::Ss(vec!["a".into(), "b".into()]),
            AttrValue::Ns(vec!["1".into()]),
            AttrValue::Bs(vec![vec![9]]),
        ];
        for value in values {
            let dynamo = DynamoDbTableStore::attr_to_dynamo(&value);
            assert_eq!(DynamoDbTableStore::attr_from_dynamo(&dynamo).unwrap(), value);
        }
    }

    #[test]
    fn item_to_record_keeps_all_modelled_attributes() {
        let mut item = HashMap::new();
        item.insert("session_id".to_string(), AttributeValue::S("abc".into()));
        item.insert("timestamp".to_string(), AttributeValue::N("1700000000".into()));
        item.insert("flag".to_string(), AttributeValue::Null(true));

        let record = DynamoDbTableStore::item_to_record(&item);
        assert_eq!(record.get("session_id"), Some(&AttrValue::s("abc")));
        assert_eq!(record.get("timestamp"), Some(&AttrValue::n("1700000000")));
        assert_eq!(record.get("flag"), Some(&AttrValue::Null));
        assert!(!record.contains("original_ts"));
    }

    #[test]
    fn continuation_token_is_last_evaluated_key() {
        let mut key = HashMap::new();
        key.insert("session_id".to_string(), AttributeValue::S("abc".into()));
        key.insert("timestamp".to_string(), AttributeValue::N("17".into()));

        let token = DynamoDbTableStore::start_key_to_token(&key).unwrap();
        assert_eq!(token.as_map().len(), 2);
        assert_eq!(DynamoDbTableStore::token_to_start_key(token), key);
    }

    #[test]
    fn default_config_targets_session_log_table() {
        let config = DynamoDbConfig::default();
        assert_eq!(config.table_name, DEFAULT_TABLE_NAME);
        assert!(config.region.is_none());
    }

    fn sdk_config(region: Option<&'static str>) -> aws_config::SdkConfig {
        let mut builder = aws_config::SdkConfig::builder()
            .behavior_version(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            builder = builder.region(aws_config::Region::from_static(region));
        }
        builder.build()
    }

    fn resolved_region(store: &DynamoDbTableStore) -> Option<String> {
        store.client.config().region().map(|r| r.to_string())
    }

    #[tokio::test]
    async fn region_falls_back_to_default() {
        let store = DynamoDbTableStore::new(&sdk_config(None), DynamoDbConfig::default())
            .await
            .unwrap();
        assert_eq!(resolved_region(&store).as_deref(), Some(DEFAULT_REGION));
    }

    #[tokio::test]
    async fn sdk_region_beats_default() {
        let store =
            DynamoDbTableStore::new(&sdk_config(Some("eu-west-1")), DynamoDbConfig::default())
                .await
                .unwrap();
        assert_eq!(resolved_region(&store).as_deref(), Some("eu-west-1"));
    }

    #[tokio::test]
    async fn configured_region_beats_sdk() {
        let config = DynamoDbConfig {
            region: Some("ap-south-1".into()),
            ..Default::default()
        };
        let store = DynamoDbTableStore::new(&sdk_config(Some("eu-west-1")), config)
            .await
            .unwrap();
        assert_eq!(resolved_region(&store).as_deref(), Some("ap-south-1"));
    }

    fn session_key() -> RecordKey {
        RecordKey::new("session_id", AttrValue::s("a"), "timestamp", AttrValue::n(1))
    }

    /// A store whose client is never reached: every case below is rejected
    /// before a request is sent.
    fn offline_store() -> DynamoDbTableStore {
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .region(aws_sdk_dynamodb::config::Region::new(DEFAULT_REGION))
            .build();
        DynamoDbTableStore::from_client(Client::from_conf(config), DEFAULT_TABLE_NAME.to_string())
    }

    #[test]
    fn update_plan_sets_every_assignment() {
        let plan = UpdatePlan::new(
            &session_key(),
            &[
                Assignment::new("original_ts", AttrValue::n(1)),
                Assignment::new("migrated", AttrValue::Bool(true)),
            ],
        );
        assert_eq!(plan.expression, "SET #a0 = :v0, #a1 = :v1");
        assert_eq!(plan.names.get("#a0").map(String::as_str), Some("original_ts"));
        assert_eq!(plan.names.get("#a1").map(String::as_str), Some("migrated"));
        assert_eq!(
            plan.names.get(NAME_PARTITION_KEY).map(String::as_str),
            Some("session_id")
        );
        assert_eq!(plan.values.get(":v0"), Some(&AttributeValue::N("1".into())));
        assert_eq!(plan.values.get(":v1"), Some(&AttributeValue::Bool(true)));
    }

    #[test]
    fn single_assignment_plan() {
        let plan = UpdatePlan::new(
            &session_key(),
            &[Assignment::new("original_ts", AttrValue::n(1))],
        );
        assert_eq!(plan.expression, "SET #a0 = :v0");
        assert_eq!(plan.names.len(), 2);
        assert_eq!(plan.values.len(), 1);
    }

    #[tokio::test]
    async fn rejected_assignment_lists_match_memory_store() {
        let dynamo = offline_store();
        let memory = MemoryTableStore::with_rows([Record::new()
            .with("session_id", AttrValue::s("a"))
            .with("timestamp", AttrValue::n(1))]);
        let key = session_key();

        let cases: [&[Assignment]; 2] = [
            &[],
            &[
                Assignment::new("original_ts", AttrValue::n(1)),
                Assignment::new("original_ts", AttrValue::n(2)),
            ],
        ];
        for assignments in cases {
            let from_dynamo = dynamo.update(&key, assignments).await.unwrap_err();
            let from_memory = memory.update(&key, assignments).await.unwrap_err();
            assert!(matches!(from_dynamo, StoreError::InvalidRequest(_)));
            assert_eq!(from_dynamo, from_memory);
        }
    }
}
