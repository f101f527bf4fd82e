use std::fmt;
use std::sync::Arc;

use crate::record::{KeyPath, Record};

type Accessor<T> = Arc<dyn Fn(&T) -> Option<String> + Send + Sync>;

/// A column of the list: the key used for sorting and filtering, how it is labelled,
/// and how its value is read from a record.
pub struct Field<T> {
    key: String,
    label: Option<String>,
    min_width: Option<u16>,
    accessor: Accessor<T>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Field {
            key: self.key.clone(),
            label: self.label.clone(),
            min_width: self.min_width,
            accessor: Arc::clone(&self.accessor),
        }
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("min_width", &self.min_width)
            .finish()
    }
}

impl<T> Field<T> {
    pub fn new<F>(key: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        Field {
            key: key.into(),
            label: None,
            min_width: None,
            accessor: Arc::new(accessor),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Responsive hint: the column is only shown on viewports at least this wide.
    pub fn with_min_width(mut self, width: u16) -> Self {
        self.min_width = Some(width);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Header text. Falls back to the upper-cased key.
    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.key.to_uppercase())
    }

    pub fn min_width(&self) -> Option<u16> {
        self.min_width
    }

    pub fn value(&self, record: &T) -> Option<String> {
        (self.accessor)(record)
    }

    /// Value as shown in a cell. Absent values render empty.
    pub fn display(&self, record: &T) -> String {
        self.value(record).unwrap_or_default()
    }
}

impl Field<Record> {
    /// Field reading a (possibly nested) path of a [`Record`].
    pub fn path(path: &str) -> Self {
        let key_path = KeyPath::parse(path);
        Field::new(path, move |record: &Record| key_path.text(record))
    }
}

/// How a filter matches records.
pub enum Filter<T> {
    /// Free text matched against several fields. An empty `scope` means every list field.
    Search {
        key: String,
        label: Option<String>,
        scope: Vec<String>,
    },
    /// Exact match against the distinct values of one field.
    Dropdown { field: Field<T> },
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        match self {
            Filter::Search { key, label, scope } => Filter::Search {
                key: key.clone(),
                label: label.clone(),
                scope: scope.clone(),
            },
            Filter::Dropdown { field } => Filter::Dropdown {
                field: field.clone(),
            },
        }
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Search { key, scope, .. } => f
                .debug_struct("Search")
                .field("key", key)
                .field("scope", scope)
                .finish(),
            Filter::Dropdown { field } => f.debug_struct("Dropdown").field("field", field).finish(),
        }
    }
}

impl<T> Filter<T> {
    pub fn search(key: impl Into<String>) -> Self {
        Filter::Search {
            key: key.into(),
            label: None,
            scope: Vec::new(),
        }
    }

    pub fn search_in(key: impl Into<String>, scope: &[&str]) -> Self {
        Filter::Search {
            key: key.into(),
            label: None,
            scope: scope.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn dropdown(field: Field<T>) -> Self {
        Filter::Dropdown { field }
    }

    pub fn with_label(self, text: impl Into<String>) -> Self {
        match self {
            Filter::Search { key, scope, .. } => Filter::Search {
                key,
                label: Some(text.into()),
                scope,
            },
            Filter::Dropdown { field } => Filter::Dropdown {
                field: field.with_label(text),
            },
        }
    }

    /// Key under which the current filter value is stored.
    pub fn key(&self) -> &str {
        match self {
            Filter::Search { key, .. } => key,
            Filter::Dropdown { field } => field.key(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Filter::Search { key, label, .. } => {
                label.clone().unwrap_or_else(|| key.to_uppercase())
            }
            Filter::Dropdown { field } => field.label(),
        }
    }

    pub fn is_dropdown(&self) -> bool {
        matches!(self, Filter::Dropdown { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    #[test]
    fn label_falls_back_to_upper_cased_key() {
        let field: Field<Record> = Field::path("user.username");
        assert_eq!(field.label(), "USER.USERNAME");
        assert_eq!(field.clone().with_label("Author").label(), "Author");
    }

    #[test]
    fn path_field_reads_nested_value() {
        let record = Record::new().with(
            "user",
            Value::Map(vec![("username".into(), Value::text("bob"))]),
        );
        let field = Field::path("user.username");
        assert_eq!(field.value(&record).as_deref(), Some("bob"));
        assert_eq!(Field::path("user.email").display(&record), "");
    }

    #[test]
    fn closure_fields_work_on_any_type() {
        let field = Field::new("len", |s: &String| Some(s.len().to_string())).with_min_width(80);
        assert_eq!(field.value(&"abcd".to_string()).as_deref(), Some("4"));
        assert_eq!(field.min_width(), Some(80));
    }

    #[test]
    fn filter_keys() {
        let search: Filter<Record> = Filter::search("q").with_label("Search");
        assert_eq!(search.key(), "q");
        assert_eq!(search.label(), "Search");
        assert!(!search.is_dropdown());

        let race = Filter::dropdown(Field::path("race"));
        assert_eq!(race.key(), "race");
        assert_eq!(race.label(), "RACE");
        assert!(race.is_dropdown());
    }
}
