//! Query building configuration.
//!
//! Usually loaded once from TOML:
//!
//! ```toml
//! limit = 50
//! dialect = "dollar"
//! multi_column_order = false
//!
//! [exclude]
//! reconciliation = true
//!
//! [[prepend.filters]]
//! field = "deleted"
//! operator = "isnull"
//! ```

use crate::descriptor::{Filter, Group, Sort};
use crate::dialect::Dialect;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error loading a [`QueryConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server-side descriptors rendered ahead of the client's.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prepend {
    pub filters: Vec<Filter>,
    pub sorts: Vec<Sort>,
    pub groups: Vec<Group>,
}

/// Build steps switched off by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exclude {
    /// Skip LIMIT/OFFSET entirely.
    pub limit: bool,
    /// Do not add ordered columns to GROUP BY.
    pub reconciliation: bool,
}

/// Parameter names, paging caps and rendering options for one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub filter_param: String,
    pub order_param: String,
    pub group_param: String,
    pub limit_param: String,
    pub offset_param: String,
    /// Page size when the request has none, and the largest accepted.
    pub limit: u64,
    /// Offset when the request has none.
    pub offset: u64,
    pub multi_column_order: bool,
    pub multi_column_group: bool,
    pub dialect: Dialect,
    pub prepend: Prepend,
    pub exclude: Exclude,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            filter_param: "filter".to_string(),
            order_param: "sort".to_string(),
            group_param: "group".to_string(),
            limit_param: "limit".to_string(),
            offset_param: "offset".to_string(),
            limit: 100,
            offset: 0,
            multi_column_order: true,
            multi_column_group: true,
            dialect: Dialect::Question,
            prepend: Prepend::default(),
            exclude: Exclude::default(),
        }
    }
}

impl QueryConfig {
    /// Create a new configuration builder
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), dialect = %config.dialect, "loaded query config");
        Ok(config)
    }

    /// `<config dir>/listquery/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("listquery").join("config.toml"))
    }
}

/// Builder for QueryConfig
#[derive(Debug, Default)]
pub struct QueryConfigBuilder {
    config: QueryConfig,
}

impl QueryConfigBuilder {
    pub fn filter_param(mut self, name: impl Into<String>) -> Self {
        self.config.filter_param = name.into();
        self
    }

    pub fn order_param(mut self, name: impl Into<String>) -> Self {
        self.config.order_param = name.into();
        self
    }

    pub fn group_param(mut self, name: impl Into<String>) -> Self {
        self.config.group_param = name.into();
        self
    }

    pub fn limit_param(mut self, name: impl Into<String>) -> Self {
        self.config.limit_param = name.into();
        self
    }

    pub fn offset_param(mut self, name: impl Into<String>) -> Self {
        self.config.offset_param = name.into();
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.config.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.config.offset = offset;
        self
    }

    pub fn multi_column_order(mut self, enabled: bool) -> Self {
        self.config.multi_column_order = enabled;
        self
    }

    pub fn multi_column_group(mut self, enabled: bool) -> Self {
        self.config.multi_column_group = enabled;
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.config.dialect = dialect;
        self
    }

    pub fn prepend_filter(mut self, filter: Filter) -> Self {
        self.config.prepend.filters.push(filter);
        self
    }

    pub fn prepend_sort(mut self, sort: Sort) -> Self {
        self.config.prepend.sorts.push(sort);
        self
    }

    pub fn prepend_group(mut self, group: Group) -> Self {
        self.config.prepend.groups.push(group);
        self
    }

    pub fn exclude_limit(mut self) -> Self {
        self.config.exclude.limit = true;
        self
    }

    pub fn exclude_reconciliation(mut self) -> Self {
        self.config.exclude.reconciliation = true;
        self
    }

    pub fn build(self) -> QueryConfig {
        self.config
    }
}
