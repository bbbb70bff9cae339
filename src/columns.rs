// Axis choices derived from the current dataset

use crate::data::Dataset;
use serde::Serialize;

/// One entry of an axis dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnOption {
    pub label: String,
    pub value: String,
}

/// Column names in dataset order.
pub fn columns(dataset: &Dataset) -> Vec<String> {
    dataset.column_names().map(str::to_string).collect()
}

pub fn options(dataset: &Dataset) -> Vec<ColumnOption> {
    dataset
        .column_names()
        .map(|name| ColumnOption {
            label: name.to_string(),
            value: name.to_string(),
        })
        .collect()
}

/// Keep a previous choice only if the dataset still has that column.
pub fn revalidate(choice: Option<&str>, dataset: &Dataset) -> Option<String> {
    choice
        .filter(|name| dataset.column(name).is_some())
        .map(str::to_string)
}
