//! Storage-neutral record model
//!
//! Records are plain attribute maps. The value type mirrors the DynamoDB type
//! system so adapters can convert losslessly, but nothing in the engine depends
//! on a particular SDK.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Default partition key attribute
pub const DEFAULT_PARTITION_KEY: &str = "session_id";

/// Default sort key attribute
pub const DEFAULT_SORT_KEY: &str = "timestamp";

/// Default attribute the backfilled value is copied from
pub const DEFAULT_SOURCE_FIELD: &str = "timestamp";

/// Default attribute being backfilled
pub const DEFAULT_TARGET_FIELD: &str = "original_ts";

/// A single attribute value
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrValue {
    /// String
    S(String),
    /// Number, kept in its wire (decimal string) form
    N(String),
    /// Binary
    B(Vec<u8>),
    Bool(bool),
    Null,
    L(Vec<AttrValue>),
    M(BTreeMap<String, AttrValue>),
    /// String set
    Ss(Vec<String>),
    /// Number set
    Ns(Vec<String>),
    /// Binary set
    Bs(Vec<Vec<u8>>),
}

impl AttrValue {
    pub fn s(value: impl Into<String>) -> Self {
        AttrValue::S(value.into())
    }

    pub fn n(value: impl ToString) -> Self {
        AttrValue::N(value.to_string())
    }

    /// Whether this value can address a record.
    ///
    /// Nulls and empty scalars cannot; collections are never valid key types.
    pub fn is_usable_key(&self) -> bool {
        match self {
            AttrValue::S(s) | AttrValue::N(s) => !s.is_empty(),
            AttrValue::B(b) => !b.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::S(s) | AttrValue::N(s) => f.write_str(s),
            AttrValue::B(b) => write!(f, "<{} bytes>", b.len()),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Null => f.write_str("null"),
            AttrValue::L(items) => write!(f, "<list of {}>", items.len()),
            AttrValue::M(map) => write!(f, "<map of {}>", map.len()),
            AttrValue::Ss(items) | AttrValue::Ns(items) => write!(f, "<set of {}>", items.len()),
            AttrValue::Bs(items) => write!(f, "<set of {}>", items.len()),
        }
    }
}

/// A row in the target table
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    attributes: BTreeMap<String, AttrValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute setter (mostly for tests and fixtures)
    pub fn with(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: AttrValue) {
        self.attributes.insert(name.into(), value);
    }

    /// Best-effort label for logs and failure reports, tolerant of missing keys.
    pub fn describe_key(&self, mapping: &FieldMapping) -> String {
        let part = |name: &str| {
            self.get(name)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<missing>".to_string())
        };
        format!(
            "{}={}, {}={}",
            mapping.partition_key,
            part(&mapping.partition_key),
            mapping.sort_key,
            part(&mapping.sort_key)
        )
    }
}

impl FromIterator<(String, AttrValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, AttrValue>> for Record {
    fn from(attributes: BTreeMap<String, AttrValue>) -> Self {
        Self { attributes }
    }
}

/// Fully-qualified primary key of a record.
///
/// This is the only way to address a record for mutation; there is no
/// table-wide write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordKey {
    pub partition: (String, AttrValue),
    pub sort: (String, AttrValue),
}

impl RecordKey {
    pub fn new(
        partition_name: impl Into<String>,
        partition_value: AttrValue,
        sort_name: impl Into<String>,
        sort_value: AttrValue,
    ) -> Self {
        Self {
            partition: (partition_name.into(), partition_value),
            sort: (sort_name.into(), sort_value),
        }
    }

    /// Whether `record` is the row this key addresses
    pub fn matches(&self, record: &Record) -> bool {
        record.get(&self.partition.0) == Some(&self.partition.1)
            && record.get(&self.sort.0) == Some(&self.sort.1)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}, {}={}",
            self.partition.0, self.partition.1, self.sort.0, self.sort.1
        )
    }
}

/// Attribute names used by a backfill run
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    pub partition_key: String,
    pub sort_key: String,
    /// Attribute whose value is copied
    pub source_field: String,
    /// Attribute being backfilled
    pub target_field: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            partition_key: DEFAULT_PARTITION_KEY.to_string(),
            sort_key: DEFAULT_SORT_KEY.to_string(),
            source_field: DEFAULT_SOURCE_FIELD.to_string(),
            target_field: DEFAULT_TARGET_FIELD.to_string(),
        }
    }
}

impl FieldMapping {
    /// Reject mappings that could never produce a sensible update.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let names = [
            ("partition_key", &self.partition_key),
            ("sort_key", &self.sort_key),
            ("source_field", &self.source_field),
            ("target_field", &self.target_field),
        ];
        for (label, value) in names {
            if value.trim().is_empty() {
                return Err(format!("{label} must not be empty"));
            }
        }
        if self.target_field == self.partition_key || self.target_field == self.sort_key {
            return Err(format!(
                "target_field '{}' cannot be a key attribute",
                self.target_field
            ));
        }
        if self.target_field == self.source_field {
            return Err(format!(
                "target_field and source_field are both '{}'",
                self.target_field
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usable_key_rejects_empty_and_null() {
        assert!(AttrValue::s("abc").is_usable_key());
        assert!(AttrValue::n(1700000000).is_usable_key());
        assert!(!AttrValue::s("").is_usable_key());
        assert!(!AttrValue::Null.is_usable_key());
        assert!(!AttrValue::Bool(true).is_usable_key());
        assert!(!AttrValue::L(vec![]).is_usable_key());
    }

    #[test]
    fn describe_key_marks_missing_parts() {
        let mapping = FieldMapping::default();
        let record = Record::new().with("session_id", AttrValue::s("abc"));
        assert_eq!(
            record.describe_key(&mapping),
            "session_id=abc, timestamp=<missing>"
        );
    }

    #[test]
    fn key_matches_only_exact_row() {
        let key = RecordKey::new("pk", AttrValue::s("a"), "sk", AttrValue::n(1));
        let hit = Record::new()
            .with("pk", AttrValue::s("a"))
            .with("sk", AttrValue::n(1));
        let miss = Record::new()
            .with("pk", AttrValue::s("a"))
            .with("sk", AttrValue::n(2));
        assert!(key.matches(&hit));
        assert!(!key.matches(&miss));
    }

    #[test]
    fn mapping_validation() {
        assert!(FieldMapping::default().validate().is_ok());

        let mut bad = FieldMapping::default();
        bad.target_field = "session_id".into();
        assert!(bad.validate().unwrap_err().contains("key attribute"));

        let mut bad = FieldMapping::default();
        bad.source_field = "original_ts".into();
        assert!(bad.validate().is_err());

        let mut bad = FieldMapping::default();
        bad.sort_key = " ".into();
        assert!(bad.validate().unwrap_err().contains("sort_key"));
    }
}
