use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::Serialize;

/// A single table cell.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Missing,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(date) => Some(*date),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }
}

// Numbers compare by bit pattern so values can key a HashMap.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Missing, Value::Missing) => true,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            (Value::Date(a), Value::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Missing => {}
            Value::Text(text) => text.hash(state),
            Value::Number(number) => number.to_bits().hash(state),
            Value::Date(date) => date.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Text(text) => f.write_str(text),
            Value::Number(number) => write!(f, "{}", format_number(*number)),
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Integral values print without a fractional part (`15`, not `15.0`).
pub fn format_number(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{:.0}", number)
    } else {
        number.to_string()
    }
}

/// A header row plus data rows, all rows as wide as the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// First alias present in the header.
    pub fn find_column(&self, aliases: &[String]) -> Option<usize> {
        aliases.iter().find_map(|alias| self.column_index(alias))
    }

    /// New table with the same header and the rows accepted by `keep`.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Value]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row.as_slice()))
                .cloned()
                .collect(),
        }
    }
}

/// Date filter chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateSelection {
    #[default]
    All,
    On(NaiveDate),
}

pub const ALL_DATES_LABEL: &str = "all";
const ALL_DATES_ALIASES: [&str; 3] = ["all", "all dates", "todas as datas"];

impl std::str::FromStr for DateSelection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if ALL_DATES_ALIASES
            .iter()
            .any(|alias| value.eq_ignore_ascii_case(alias))
        {
            return Ok(DateSelection::All);
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(DateSelection::On)
            .map_err(|err| format!("expected `{ALL_DATES_LABEL}` or YYYY-MM-DD, got `{value}`: {err}"))
    }
}

impl fmt::Display for DateSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSelection::All => f.write_str("all dates"),
            DateSelection::On(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Classification of a numeric cell against the highlight threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    High,
    Low,
    Unclassifiable,
}

impl fmt::Display for Highlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Highlight::High => "high",
            Highlight::Low => "low",
            Highlight::Unclassifiable => "unclassifiable",
        })
    }
}

/// One (operator, date, supervisor, channel) group with its summed count.
/// `key` follows the order of `AggregatedTable::key_columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedActivity {
    pub key: Vec<Value>,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedTable {
    pub key_columns: Vec<String>,
    pub count_column: String,
    pub rows: Vec<AggregatedActivity>,
}

impl AggregatedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.key_columns.clone();
        columns.push(self.count_column.clone());
        columns
    }
}
