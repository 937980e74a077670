//! Client-supplied filter, sort and group descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Filter operators.
///
/// Unknown spellings are kept rather than rejected at decode time so the
/// compiler can report them against the field they were used on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Neq,
    StartsWith,
    EndsWith,
    Contains,
    DoesNotContain,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
    Lt,
    Lte,
    Gt,
    Gte,
    Unknown(String),
}

impl Operator {
    pub const ALL: [Operator; 14] = [
        Operator::Eq,
        Operator::Neq,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::Contains,
        Operator::DoesNotContain,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::IsEmpty,
        Operator::IsNotEmpty,
        Operator::Lt,
        Operator::Lte,
        Operator::Gt,
        Operator::Gte,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
            Operator::Contains => "contains",
            Operator::DoesNotContain => "doesnotcontain",
            Operator::IsNull => "isnull",
            Operator::IsNotNull => "isnotnull",
            Operator::IsEmpty => "isempty",
            Operator::IsNotEmpty => "isnotempty",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Unknown(s) => s,
        }
    }

    /// Operators that take no value.
    pub fn is_null_check(&self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// SQL template following the column, or `None` for unknown operators.
    pub fn template(&self) -> Option<&'static str> {
        Some(match self {
            Operator::Eq => "= ?",
            Operator::Neq => "!= ?",
            Operator::StartsWith => "ilike ? || '%'",
            Operator::EndsWith => "ilike '%' || ?",
            Operator::Contains => "ilike '%' || ? || '%'",
            Operator::DoesNotContain => "not ilike '%' || ? || '%'",
            Operator::IsNull => "is null",
            Operator::IsNotNull => "is not null",
            Operator::IsEmpty => "= ''",
            Operator::IsNotEmpty => "!= ''",
            Operator::Lt => "< ?",
            Operator::Lte => "<= ?",
            Operator::Gt => "> ?",
            Operator::Gte => ">= ?",
            Operator::Unknown(_) => return None,
        })
    }

    /// Whether the template binds the filter value.
    pub fn binds_value(&self) -> bool {
        self.template().is_some_and(|t| t.contains('?'))
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "startswith" => Operator::StartsWith,
            "endswith" => Operator::EndsWith,
            "contains" => Operator::Contains,
            "doesnotcontain" => Operator::DoesNotContain,
            "isnull" => Operator::IsNull,
            "isnotnull" => Operator::IsNotNull,
            "isempty" => Operator::IsEmpty,
            "isnotempty" => Operator::IsNotEmpty,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            _ => Operator::Unknown(s),
        }
    }
}

impl From<&str> for Operator {
    fn from(s: &str) -> Self {
        Operator::from(s.to_string())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sort direction. Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
    Unknown(String),
}

impl SortDir {
    pub fn as_str(&self) -> &str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
            SortDir::Unknown(s) => s,
        }
    }
}

impl From<String> for SortDir {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => SortDir::Asc,
            "desc" => SortDir::Desc,
            _ => SortDir::Unknown(s),
        }
    }
}

impl From<SortDir> for String {
    fn from(dir: SortDir) -> Self {
        dir.as_str().to_string()
    }
}

impl FromStr for SortDir {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SortDir::from(s.to_string()))
    }
}

/// A single filter descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(alias = "Field")]
    pub field: String,
    #[serde(alias = "Operator")]
    pub operator: Operator,
    #[serde(default, alias = "Value", skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl Filter {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: Some(value.into()),
        }
    }

    /// A filter without a value (`isnull`, `isnotnull`).
    pub fn unary(field: impl Into<String>, operator: impl Into<Operator>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: None,
        }
    }
}

/// A single sort descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    #[serde(alias = "Field")]
    pub field: String,
    #[serde(default, alias = "Dir")]
    pub dir: SortDir,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Desc,
        }
    }
}

/// A single group descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(alias = "Field")]
    pub field: String,
}

impl Group {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}
