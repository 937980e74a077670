//! Descriptor decoding from request parameters.
//!
//! A parameter holds a URL-encoded JSON array of descriptors. An absent or
//! empty parameter decodes to an empty list.

use crate::descriptor::{Filter, Group, Sort};
use crate::error::{QueryError, QueryResult};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Key/value accessor over request parameters.
///
/// Returns the empty string for absent keys, like HTTP form access.
pub trait FormValues {
    fn form_value(&self, name: &str) -> String;
}

impl<S: BuildHasher> FormValues for HashMap<String, String, S> {
    fn form_value(&self, name: &str) -> String {
        self.get(name).cloned().unwrap_or_default()
    }
}

impl FormValues for BTreeMap<String, String> {
    fn form_value(&self, name: &str) -> String {
        self.get(name).cloned().unwrap_or_default()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FormValues for [(K, V)] {
    fn form_value(&self, name: &str) -> String {
        self.iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_ref().to_string())
            .unwrap_or_default()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FormValues for Vec<(K, V)> {
    fn form_value(&self, name: &str) -> String {
        self.as_slice().form_value(name)
    }
}

impl<T: FormValues + ?Sized> FormValues for &T {
    fn form_value(&self, name: &str) -> String {
        (**self).form_value(name)
    }
}

/// Parameters parsed from a raw URL query string. The first occurrence of a
/// repeated key wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self {
            pairs: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FormValues for QueryParams {
    fn form_value(&self, name: &str) -> String {
        self.pairs.as_slice().form_value(name)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Decode the descriptor list stored under `param`.
pub fn decode_descriptors<T, R>(request: &R, param: &str) -> QueryResult<Vec<T>>
where
    T: DeserializeOwned,
    R: FormValues + ?Sized,
{
    let raw = request.form_value(param);
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let decoded = urlencoding::decode(&raw).map_err(|e| QueryError::Decode {
        param: param.to_string(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&decoded).map_err(|e| QueryError::Decode {
        param: param.to_string(),
        reason: e.to_string(),
    })
}

pub fn decode_filters<R: FormValues + ?Sized>(request: &R, param: &str) -> QueryResult<Vec<Filter>> {
    decode_descriptors(request, param)
}

pub fn decode_sorts<R: FormValues + ?Sized>(request: &R, param: &str) -> QueryResult<Vec<Sort>> {
    decode_descriptors(request, param)
}

pub fn decode_groups<R: FormValues + ?Sized>(request: &R, param: &str) -> QueryResult<Vec<Group>> {
    decode_descriptors(request, param)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Operator, SortDir};
    use crate::error::ErrorKind;

    #[test]
    fn test_absent_param_is_empty() {
        let request: HashMap<String, String> = HashMap::new();
        assert!(decode_filters(&request, "filter").unwrap().is_empty());

        let request = vec![("filter", "")];
        assert!(decode_filters(&request, "filter").unwrap().is_empty());
    }

    #[test]
    fn test_decode_url_encoded_filters() {
        let request = vec![(
            "filter",
            "%5B%7B%22field%22%3A%22name%22%2C%22operator%22%3A%22eq%22%2C%22value%22%3A%22bob%22%7D%5D",
        )];
        let filters = decode_filters(&request, "filter").unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].field, "name");
        assert_eq!(filters[0].operator, Operator::Eq);
        assert_eq!(filters[0].value, Some(serde_json::json!("bob")));
    }

    #[test]
    fn test_decode_plain_json() {
        let request = vec![("sort", r#"[{"field":"a","dir":"desc"},{"field":"b"}]"#)];
        let sorts = decode_sorts(&request, "sort").unwrap();
        assert_eq!(sorts[0].dir, SortDir::Desc);
        assert_eq!(sorts[1].dir, SortDir::Asc);

        let request = vec![("group", r#"[{"Field":"a"}]"#)];
        assert_eq!(decode_groups(&request, "group").unwrap()[0].field, "a");
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let request = vec![("filter", "[{not json")];
        let err = decode_filters(&request, "filter").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("'filter'"));
    }

    #[test]
    fn test_query_params() {
        let params = QueryParams::parse("?limit=10&sort=%5B%5D&limit=20");
        assert_eq!(params.form_value("limit"), "10");
        assert_eq!(params.form_value("sort"), "[]");
        assert_eq!(params.form_value("missing"), "");
    }
}
