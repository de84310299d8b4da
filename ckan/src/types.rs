//! Catalog records as the CKAN action API returns them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CatalogError;

/// One row of a resource's tabular data.
pub type Record = Map<String, Value>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
}

/// A downloadable artifact of a [Dataset], optionally backed by a datastore table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub datastore_active: bool,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub package_id: String,
}

impl Resource {
    pub fn is_csv(&self) -> bool {
        self.format.eq_ignore_ascii_case("csv")
    }

    /// Table preview is only offered for CSV resources with a datastore backing.
    pub fn is_previewable(&self) -> bool {
        self.is_csv() && self.datastore_active
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    /// CKAN calls the free-text description `notes`.
    #[serde(default, rename = "notes", alias = "description")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_title: Option<String>,
    #[serde(default)]
    pub metadata_created: String,
    #[serde(default)]
    pub metadata_modified: String,
    #[serde(default)]
    pub organization: Option<Organization>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub num_resources: u64,
}

impl Dataset {
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.name.as_str())
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }
}

/// `result` of a `package_search` call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub count: u64,
    #[serde(default)]
    pub results: Vec<Dataset>,
}

/// Column descriptor of a datastore table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub id: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
}

impl Field {
    pub fn new(id: impl Into<String>, field_type: impl Into<String>) -> Self {
        Field {
            id: id.into(),
            field_type: field_type.into(),
        }
    }

    /// System columns such as `_id` and `_full_text` start with an underscore.
    pub fn is_internal(&self) -> bool {
        self.id.starts_with('_')
    }
}

/// The uniform `{fields, records, total}` shape both datastore actions are
/// normalized into.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DatastoreRecords {
    pub fields: Vec<Field>,
    pub records: Vec<Record>,
    pub total: u64,
}

impl DatastoreRecords {
    /// Normalize the `result` object of `datastore_search` or
    /// `datastore_search_sql`.
    ///
    /// `fields` must be a list of objects carrying a string `id`. Missing
    /// `records` are read as empty (fields-only probes), and a missing
    /// `total` defaults to the number of records.
    pub fn from_result(result: &Value) -> Result<Self, CatalogError> {
        let obj = result
            .as_object()
            .ok_or_else(|| CatalogError::shape("result is not an object"))?;

        let raw_fields = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| CatalogError::shape("fields is not a list"))?;
        let fields = raw_fields
            .iter()
            .map(|f| {
                let id = f
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| CatalogError::shape("field without a string id"))?;
                let field_type = f.get("type").and_then(Value::as_str).unwrap_or_default();
                Ok(Field::new(id, field_type))
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let records = match obj.get("records") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|r| {
                    r.as_object()
                        .cloned()
                        .ok_or_else(|| CatalogError::shape("record is not an object"))
                })
                .collect::<Result<Vec<_>, CatalogError>>()?,
            Some(_) => return Err(CatalogError::shape("records is not a list")),
        };

        let total = match obj.get("total") {
            None | Some(Value::Null) => records.len() as u64,
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| CatalogError::shape("total is not a non-negative integer"))?,
            Some(_) => return Err(CatalogError::shape("total is not a number")),
        };

        Ok(DatastoreRecords {
            fields,
            records,
            total,
        })
    }

    /// Fields meant for display, system columns removed.
    pub fn visible_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_internal())
    }
}
