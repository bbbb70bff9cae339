use crate::error::{DashError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashSet;
use std::fmt;

/// Cell strings that count as missing, in the spirit of pandas' NA tokens.
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
    Empty,
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn parse_number(text: &str) -> Option<f64> {
        text.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
    }

    fn parse_date(text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .or_else(|| {
                DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                    .map(|d| d.and_time(NaiveTime::MIN))
            })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) if d.time() == NaiveTime::MIN => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Value::Empty => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Numeric,
    Text,
    Date,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
    pub values: Vec<Value>,
}

impl Column {
    /// Build a column from raw cells, inferring one semantic type for all of them.
    ///
    /// Text cells that all parse as numbers make a numeric column, all-date
    /// text makes a date column. Anything mixed falls back to text, in which
    /// case every non-empty cell is stored as its display string.
    pub fn infer(name: impl Into<String>, raw: Vec<Value>) -> Self {
        let raw: Vec<Value> = raw
            .into_iter()
            .map(|v| match v {
                Value::Text(s) if MISSING_TOKENS.contains(&s.trim()) => Value::Empty,
                Value::Number(n) if n.is_nan() => Value::Empty,
                other => other,
            })
            .collect();

        let as_number = |v: &Value| match v {
            Value::Number(n) => Some(*n),
            Value::Text(s) => Value::parse_number(s),
            _ => None,
        };
        let as_date = |v: &Value| match v {
            Value::Date(d) => Some(*d),
            Value::Text(s) => Value::parse_date(s),
            _ => None,
        };

        let present = || raw.iter().filter(|v| !v.is_empty());

        let (kind, values) = if present().all(|v| as_number(v).is_some()) {
            let values = raw
                .iter()
                .map(|v| as_number(v).map(Value::Number).unwrap_or(Value::Empty))
                .collect();
            (ColumnType::Numeric, values)
        } else if present().all(|v| as_date(v).is_some()) {
            let values = raw
                .iter()
                .map(|v| as_date(v).map(Value::Date).unwrap_or(Value::Empty))
                .collect();
            (ColumnType::Date, values)
        } else {
            let values = raw
                .into_iter()
                .map(|v| match v {
                    Value::Empty => Value::Empty,
                    Value::Text(s) => Value::Text(s),
                    other => Value::Text(other.to_string()),
                })
                .collect();
            (ColumnType::Text, values)
        };

        Column {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Tabular data decoded from one uploaded file. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    source: String,
    columns: Vec<Column>,
    index: Option<Column>,
    row_count: usize,
}

impl Dataset {
    /// Create a dataset, checking that names are unique and lengths agree.
    pub fn new(source: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let source = source.into();
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DashError::decode(
                    &source,
                    format!("duplicate column name '{}'", column.name),
                ));
            }
        }

        let row_count = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != row_count) {
            return Err(DashError::decode(
                &source,
                format!(
                    "column '{}' has {} values, expected {}",
                    bad.name,
                    bad.len(),
                    row_count
                ),
            ));
        }

        Ok(Self {
            source,
            columns,
            index: None,
            row_count,
        })
    }

    /// Create a dataset from a header row and row-major raw cells.
    ///
    /// Short rows are padded with empty cells.
    pub fn from_records(
        source: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); headers.len()];
        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.push(cells.next().unwrap_or(Value::Empty));
            }
        }

        let columns = headers
            .into_iter()
            .zip(columns)
            .map(|(name, raw)| Column::infer(name, raw))
            .collect();

        Self::new(source, columns)
    }

    /// Move the first data column into the row index.
    pub fn with_first_column_as_index(mut self) -> Self {
        if !self.columns.is_empty() {
            self.index = Some(self.columns.remove(0));
        }
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn index(&self) -> Option<&Column> {
        self.index.as_ref()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// First `n` rows, row-major, for the preview table.
    pub fn head(&self, n: usize) -> Vec<Vec<&Value>> {
        (0..self.row_count.min(n))
            .map(|row| self.columns.iter().map(|c| &c.values[row]).collect())
            .collect()
    }
}

/// Give every header a unique, non-empty name.
///
/// Blank headers become `Unnamed: <position>`; repeats get `.1`, `.2`, ...
pub fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(headers.len());

    for (position, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {}", position)
        } else {
            header
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        out.push(name);
    }

    out
}
