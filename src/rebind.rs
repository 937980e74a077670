//! Placeholder rebinding.
//!
//! Two passes over generic `?` placeholders:
//!
//! 1. [`expand_in`] turns a placeholder bound to a list into one placeholder
//!    per element and splices the elements into the argument list.
//! 2. [`rebind`] rewrites the remaining `?` into the target [`Dialect`],
//!    numbering left to right across the whole query.
//!
//! Placeholders inside literals, quoted identifiers and comments are left
//! alone by both passes.

use crate::dialect::Dialect;
use crate::error::{QueryError, QueryResult};
use crate::lexer::{tokenize, TokenKind};
use crate::value::Value;

/// Expand list arguments into repeated placeholders.
///
/// Each placeholder consumes one argument. [`Value::Bytes`] is a scalar.
pub fn expand_in(query: &str, args: Vec<Value>) -> QueryResult<(String, Vec<Value>)> {
    let tokens = tokenize(query);
    let placeholders = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Placeholder)
        .count();

    if placeholders != args.len() {
        return Err(QueryError::rebind(format!(
            "query has {} placeholders but {} arguments were given",
            placeholders,
            args.len()
        )));
    }

    if !args.iter().any(Value::is_list) {
        return Ok((query.to_string(), args));
    }

    let mut sql = String::with_capacity(query.len() + 16);
    let mut expanded = Vec::with_capacity(args.len());
    let mut args = args.into_iter().enumerate();

    for token in &tokens {
        if token.kind != TokenKind::Placeholder {
            sql.push_str(token.text);
            continue;
        }

        match args.next() {
            Some((position, Value::List(items))) => {
                if items.is_empty() {
                    return Err(QueryError::rebind(format!(
                        "empty list bound to argument {}",
                        position + 1
                    )));
                }
                sql.push_str(&vec!["?"; items.len()].join(", "));
                expanded.extend(items);
            }
            Some((_, arg)) => {
                sql.push('?');
                expanded.push(arg);
            }
            None => {
                return Err(QueryError::rebind("ran out of arguments while expanding"));
            }
        }
    }

    Ok((sql, expanded))
}

/// Rewrite `?` placeholders into `dialect` syntax.
pub fn rebind(dialect: Dialect, query: &str) -> String {
    if dialect == Dialect::Question {
        return query.to_string();
    }

    let mut sql = String::with_capacity(query.len() + 16);
    let mut index = 0;

    for token in tokenize(query) {
        if token.kind == TokenKind::Placeholder {
            index += 1;
            sql.push_str(&dialect.placeholder(index));
        } else {
            sql.push_str(token.text);
        }
    }

    sql
}

/// Both passes: expand lists, then rebind for `dialect`.
pub fn prepare(dialect: Dialect, query: &str, args: Vec<Value>) -> QueryResult<(String, Vec<Value>)> {
    let (sql, args) = expand_in(query, args)?;
    let sql = rebind(dialect, &sql);
    tracing::trace!(%dialect, args = args.len(), "rebound query");
    Ok((sql, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn list(items: &[&str]) -> Value {
        items.iter().copied().collect()
    }

    #[test]
    fn test_expand_list() {
        let (sql, args) = expand_in(
            "select * from u where a = ? and b in (?) and c = ?",
            vec![1.into(), list(&["x", "y", "z"]), 2.into()],
        )
        .unwrap();
        assert_eq!(sql, "select * from u where a = ? and b in (?, ?, ?) and c = ?");
        assert_eq!(
            args,
            vec![Value::Int(1), "x".into(), "y".into(), "z".into(), 2.into()]
        );
    }

    #[test]
    fn test_bytes_are_scalar() {
        let (sql, args) = expand_in("select ?", vec![Value::Bytes(vec![1, 2, 3])]).unwrap();
        assert_eq!(sql, "select ?");
        assert_eq!(args, vec![Value::Bytes(vec![1, 2, 3])]);
    }

    #[test]
    fn test_empty_list_is_error() {
        let err = expand_in("a in (?)", vec![list(&[])]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rebind);
    }

    #[test]
    fn test_count_mismatch_both_ways() {
        let err = expand_in("a = ? and b = ?", vec![1.into()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rebind);

        let err = expand_in("a = ?", vec![1.into(), 2.into()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rebind);
    }

    #[test]
    fn test_quoted_question_marks_are_not_placeholders() {
        let (sql, args) = expand_in("select '?' from u where a in (?)", vec![list(&["p", "q"])]).unwrap();
        assert_eq!(sql, "select '?' from u where a in (?, ?)");
        assert_eq!(args.len(), 2);
        assert_eq!(rebind(Dialect::Dollar, &sql), "select '?' from u where a in ($1, $2)");
    }

    #[test]
    fn test_rebind_dialects() {
        let sql = "a = ? and b in (?, ?) limit ? offset ?";
        assert_eq!(rebind(Dialect::Question, sql), sql);
        assert_eq!(
            rebind(Dialect::Dollar, sql),
            "a = $1 and b in ($2, $3) limit $4 offset $5"
        );
        assert_eq!(
            rebind(Dialect::Named, sql),
            "a = :arg1 and b in (:arg2, :arg3) limit :arg4 offset :arg5"
        );
        assert_eq!(
            rebind(Dialect::At, sql),
            "a = @p1 and b in (@p2, @p3) limit @p4 offset @p5"
        );
    }

    #[test]
    fn test_question_rebind_is_identity_after_expansion() {
        let (sql, _) = expand_in("x in (?) and y = ?", vec![list(&["a", "b"]), 3.into()]).unwrap();
        assert_eq!(rebind(Dialect::Question, &sql), sql);
    }

    #[test]
    fn test_prepare() {
        let (sql, args) = prepare(Dialect::At, "id in (?)", vec![vec![1i64, 2].into_iter().collect()]).unwrap();
        assert_eq!(sql, "id in (@p1, @p2)");
        assert_eq!(args, vec![Value::Int(1), Value::Int(2)]);
    }
}
