//! Statement builder for `datastore_search_sql`.

use ckan::DatastoreSearch;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SqlError {
    #[error("filter on {0:?} cannot be expressed in SQL")]
    UnsupportedFilter(String),
}

/// Quote an identifier, doubling embedded double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(quote_literal(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_owned()),
        _ => None,
    }
}

fn predicate(column: &str, value: &Value) -> Result<String, SqlError> {
    let column_sql = quote_ident(column);
    let unsupported = || SqlError::UnsupportedFilter(column.to_owned());
    match value {
        Value::Null => Ok(format!("{} IS NULL", column_sql)),
        Value::Array(items) if items.is_empty() => Err(unsupported()),
        Value::Array(items) => {
            let literals = items
                .iter()
                .map(|item| scalar(item).ok_or_else(unsupported))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("{} IN ({})", column_sql, literals.join(", ")))
        }
        other => {
            let literal = scalar(other).ok_or_else(unsupported)?;
            Ok(format!("{} = {}", column_sql, literal))
        }
    }
}

/// `SELECT` over the resource's backing table equivalent to the given
/// generic search: same projection, equality filters and paging.
pub fn select_statement(search: &DatastoreSearch) -> Result<String, SqlError> {
    let projection = if search.fields.is_empty() {
        "*".to_owned()
    } else {
        search
            .fields
            .iter()
            .map(|f| quote_ident(f))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut statement = format!(
        "SELECT {} FROM {}",
        projection,
        quote_ident(&search.resource_id)
    );

    if let Some(filters) = search.filters.as_ref().filter(|f| !f.is_empty()) {
        let mut entries = filters.iter().collect::<Vec<_>>();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let predicates = entries
            .into_iter()
            .map(|(column, value)| predicate(column, value))
            .collect::<Result<Vec<_>, _>>()?;
        statement.push_str(" WHERE ");
        statement.push_str(&predicates.join(" AND "));
    }

    statement.push_str(&format!(
        " LIMIT {} OFFSET {}",
        search.limit, search.offset
    ));
    Ok(statement)
}
