//! Sorting, filtering and paging of datastore records for tabular display.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ckan::{DatastoreRecords, Field, Record};
use serde_json::Value;

pub const PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Text shown for a cell. Missing values and `null` render empty.
pub fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => render_cell(a).cmp(&render_cell(b)),
    }
}

/// In-memory view over one page of records.
#[derive(Debug, Clone)]
pub struct TableView {
    fields: Vec<Field>,
    records: Vec<Record>,
    sort: Option<(String, SortDirection)>,
    filters: BTreeMap<String, String>,
}

impl TableView {
    pub fn new(data: DatastoreRecords) -> Self {
        Self {
            fields: data.fields,
            records: data.records,
            sort: None,
            filters: BTreeMap::new(),
        }
    }

    /// Columns to display; system columns are hidden.
    pub fn visible_fields(&self) -> Vec<&Field> {
        self.fields.iter().filter(|f| !f.is_internal()).collect()
    }

    pub fn sort(&self) -> Option<(&str, SortDirection)> {
        self.sort.as_ref().map(|(f, d)| (f.as_str(), *d))
    }

    /// Clicking the sorted column again flips its direction; any other
    /// column starts ascending.
    pub fn toggle_sort(&mut self, field: &str) {
        self.sort = match self.sort.take() {
            Some((current, direction)) if current == field => Some((current, direction.flip())),
            _ => Some((field.to_owned(), SortDirection::Asc)),
        };
    }

    /// Set the substring filter for a column. A blank needle clears it.
    pub fn set_filter(&mut self, field: &str, needle: &str) {
        if needle.is_empty() {
            self.filters.remove(field);
        } else {
            self.filters.insert(field.to_owned(), needle.to_lowercase());
        }
    }

    fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|(field, needle)| {
            render_cell(record.get(field))
                .to_lowercase()
                .contains(needle.as_str())
        })
    }

    /// Records after filtering and sorting, in display order.
    pub fn rows(&self) -> Vec<&Record> {
        let mut rows: Vec<&Record> = self.records.iter().filter(|r| self.matches(r)).collect();
        if let Some((field, direction)) = &self.sort {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        rows
    }

    /// Display rows as strings, one per visible field.
    pub fn rendered_rows(&self) -> Vec<Vec<String>> {
        let fields = self.visible_fields();
        self.rows()
            .into_iter()
            .map(|record| {
                fields
                    .iter()
                    .map(|f| render_cell(record.get(&f.id)))
                    .collect()
            })
            .collect()
    }
}

/// Position in a remote record set paged by [PAGE_SIZE]. Pages start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub total: u64,
}

impl Pagination {
    pub fn new(page: u64, total: u64) -> Self {
        Self {
            page: page.max(1),
            total,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(PAGE_SIZE)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_mul(PAGE_SIZE) < self.total
    }

    pub fn first_shown(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.offset().saturating_add(1).min(self.total)
        }
    }

    pub fn last_shown(&self) -> u64 {
        self.page.saturating_mul(PAGE_SIZE).min(self.total)
    }

    pub fn summary(&self) -> String {
        format!(
            "Showing {} to {} of {} records",
            self.first_shown(),
            self.last_shown(),
            self.total
        )
    }
}
