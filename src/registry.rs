//! Field permission registry.
//!
//! Maps the logical field names clients may mention to physical columns and
//! the actions allowed on them. Built once at startup and shared read-only.

use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Rewrites a validated value before it is bound. The error string becomes
/// the reason of a value error.
pub type ValueTransform = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Permissions and column mapping for one logical field.
#[derive(Clone)]
pub struct FieldConfig {
    pub column: String,
    pub allow_filter: bool,
    pub allow_sort: bool,
    pub allow_group: bool,
    pub transform: Option<ValueTransform>,
}

impl FieldConfig {
    /// A field mapped to `column` with every action denied.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            allow_filter: false,
            allow_sort: false,
            allow_group: false,
            transform: None,
        }
    }

    pub fn filterable(mut self) -> Self {
        self.allow_filter = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.allow_sort = true;
        self
    }

    pub fn groupable(mut self) -> Self {
        self.allow_group = true;
        self
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    pub fn with_transform(mut self, transform: ValueTransform) -> Self {
        self.transform = Some(transform);
        self
    }
}

impl fmt::Debug for FieldConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldConfig")
            .field("column", &self.column)
            .field("allow_filter", &self.allow_filter)
            .field("allow_sort", &self.allow_sort)
            .field("allow_group", &self.allow_group)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Immutable logical-name → [`FieldConfig`] map.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: HashMap<String, FieldConfig>,
}

impl FieldRegistry {
    pub fn builder() -> FieldRegistryBuilder {
        FieldRegistryBuilder::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, FieldConfig)> for FieldRegistry {
    fn from_iter<I: IntoIterator<Item = (K, FieldConfig)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Builder for FieldRegistry
#[derive(Debug, Default)]
pub struct FieldRegistryBuilder {
    fields: HashMap<String, FieldConfig>,
}

impl FieldRegistryBuilder {
    /// Register a field. A repeated name replaces the earlier entry.
    pub fn field(mut self, name: impl Into<String>, config: FieldConfig) -> Self {
        self.fields.insert(name.into(), config);
        self
    }

    pub fn build(self) -> FieldRegistry {
        FieldRegistry {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let registry = FieldRegistry::builder()
            .field("name", FieldConfig::new("u.name").filterable().sortable())
            .build();

        let name = registry.lookup("name").unwrap();
        assert_eq!(name.column, "u.name");
        assert!(name.allow_filter && name.allow_sort && !name.allow_group);
        assert!(registry.lookup("u.name").is_none());
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FieldRegistry>();
    }

    #[test]
    fn test_transform_is_stored() {
        let config = FieldConfig::new("email").transform(|v| match v {
            Value::String(s) => Ok(Value::String(s.to_lowercase())),
            other => Ok(other),
        });
        let transform = config.transform.as_ref().unwrap();
        assert_eq!(transform("A@B.C".into()), Ok(Value::from("a@b.c")));
        assert!(format!("{:?}", config).contains("transform: true"));
    }
}
