use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::models::{format_number, Table, Value};

/// Which columns of one table get which treatment. Each entry is an alias
/// list; absent optional columns are skipped.
#[derive(Debug, Clone)]
pub struct TableRules<'a> {
    pub resource: &'a str,
    pub date: &'a [String],
    pub uppercase: Vec<&'a [String]>,
    pub numeric: Option<&'a [String]>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub values_zeroed: usize,
}

/// Clean one raw table. Only a missing date column is an error; unparseable
/// dates drop the row and unparseable counts become zero.
pub fn normalize_table(
    raw: &Table,
    rules: &TableRules<'_>,
    date_formats: &[String],
) -> Result<(Table, NormalizeStats), PipelineError> {
    let date_index = raw
        .find_column(rules.date)
        .ok_or_else(|| PipelineError::MissingColumn {
            resource: rules.resource.to_string(),
            column: rules.date.join(" | "),
        })?;

    let uppercase: Vec<usize> = rules
        .uppercase
        .iter()
        .filter_map(|aliases| raw.find_column(aliases))
        .collect();
    let numeric = rules.numeric.and_then(|aliases| raw.find_column(aliases));

    let mut stats = NormalizeStats {
        rows_read: raw.len(),
        ..NormalizeStats::default()
    };
    let mut table = Table::new(raw.columns.clone());

    for raw_row in &raw.rows {
        let mut row: Vec<Value> = raw_row.iter().map(trim_cell).collect();

        for &index in &uppercase {
            row[index] = uppercase_cell(&row[index]);
        }

        row[date_index] = match parse_date(&row[date_index], date_formats) {
            Some(date) => Value::Date(date),
            None => {
                debug!(resource = rules.resource, value = %row[date_index], "dropping row with unparseable date");
                stats.rows_dropped += 1;
                continue;
            }
        };

        if let Some(index) = numeric {
            let (value, zeroed) = coerce_number(&row[index]);
            if zeroed {
                stats.values_zeroed += 1;
            }
            row[index] = Value::Number(value);
        }

        table.rows.push(row);
    }

    if stats.rows_dropped > 0 {
        warn!(
            resource = rules.resource,
            dropped = stats.rows_dropped,
            "rows without a valid date were excluded"
        );
    }
    if stats.values_zeroed > 0 {
        warn!(
            resource = rules.resource,
            zeroed = stats.values_zeroed,
            "non-numeric counts were set to zero"
        );
    }

    Ok((table, stats))
}

fn trim_cell(value: &Value) -> Value {
    match value {
        Value::Text(text) => Value::Text(text.trim().to_string()),
        other => other.clone(),
    }
}

/// Numbers are stringified so numeric IDs survive uppercasing.
fn uppercase_cell(value: &Value) -> Value {
    match value {
        Value::Text(text) => Value::Text(text.to_uppercase()),
        Value::Number(number) => Value::Text(format_number(*number)),
        Value::Date(date) => Value::Text(date.format("%Y-%m-%d").to_string()),
        Value::Missing => Value::Missing,
    }
}

pub fn parse_date(value: &Value, formats: &[String]) -> Option<NaiveDate> {
    match value {
        Value::Date(date) => Some(*date),
        Value::Text(text) => parse_date_str(text, formats),
        Value::Number(number) => parse_date_str(&format_number(*number), formats),
        Value::Missing => None,
    }
}

fn parse_date_str(text: &str, formats: &[String]) -> Option<NaiveDate> {
    let text = text.trim();
    formats.iter().find_map(|format| {
        if has_time_fields(format) {
            NaiveDateTime::parse_from_str(text, format)
                .ok()
                .map(|datetime| datetime.date())
        } else {
            NaiveDate::parse_from_str(text, format).ok()
        }
    })
}

fn has_time_fields(format: &str) -> bool {
    ["%H", "%M", "%S", "%T", "%R", "%I"]
        .iter()
        .any(|field| format.contains(field))
}

/// Returns the number and whether it had to be defaulted to zero.
fn coerce_number(value: &Value) -> (f64, bool) {
    let parsed = match value {
        Value::Number(number) => Some(*number),
        Value::Text(text) => text.trim().parse::<f64>().ok(),
        Value::Missing | Value::Date(_) => None,
    };
    match parsed {
        Some(number) if number.is_finite() => (number, false),
        _ => (0.0, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParsingConfig;

    fn text(value: &str) -> Value {
        Value::Text(value.to_string())
    }

    fn formats() -> Vec<String> {
        ParsingConfig::default().date_formats
    }

    fn activity_rules<'a>(
        date: &'a [String],
        operator: &'a [String],
        supervisor: &'a [String],
        count: &'a [String],
    ) -> TableRules<'a> {
        TableRules {
            resource: "activity",
            date,
            uppercase: vec![supervisor, operator],
            numeric: Some(count),
        }
    }

    fn aliases(name: &str) -> Vec<String> {
        vec![name.to_string()]
    }

    #[test]
    fn trims_uppercases_and_coerces() {
        let raw = Table {
            columns: vec!["OPERADOR".into(), "DATA".into(), "SUPERVISOR".into(), "CD".into(), "GESTIONES".into()],
            rows: vec![
                vec![text(" ana "), text("2024-01-05 "), text(" joão"), text(" yes "), text("10")],
                vec![Value::Number(42.0), text("2024-01-06"), text("Bia"), text("no"), text("n/a")],
            ],
        };
        let (date, operator, supervisor, count) =
            (aliases("DATA"), aliases("OPERADOR"), aliases("SUPERVISOR"), aliases("GESTIONES"));
        let (table, stats) =
            normalize_table(&raw, &activity_rules(&date, &operator, &supervisor, &count), &formats())
                .unwrap();

        assert_eq!(table.rows[0][0], text("ANA"));
        assert_eq!(
            table.rows[0][1],
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
        assert_eq!(table.rows[0][2], text("JOÃO"));
        assert_eq!(table.rows[0][3], text("yes"));
        assert_eq!(table.rows[0][4], Value::Number(10.0));
        assert_eq!(table.rows[1][0], text("42"));
        assert_eq!(table.rows[1][4], Value::Number(0.0));
        assert_eq!(stats.values_zeroed, 1);
        assert_eq!(stats.rows_dropped, 0);
    }

    #[test]
    fn drops_rows_with_bad_dates() {
        let raw = Table {
            columns: vec!["DATA".into(), "SUPERVISOR".into()],
            rows: vec![
                vec![text("2024-01-05"), text("a")],
                vec![text("not a date"), text("b")],
                vec![Value::Missing, text("c")],
                vec![text("2024-02-30"), text("d")],
            ],
        };
        let (date, supervisor) = (aliases("DATA"), aliases("SUPERVISOR"));
        let rules = TableRules {
            resource: "activity",
            date: &date,
            uppercase: vec![supervisor.as_slice()],
            numeric: None,
        };
        let (table, stats) = normalize_table(&raw, &rules, &formats()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(stats.rows_dropped, 3);
        assert!(table.rows.iter().all(|row| row[0].as_date().is_some()));
    }

    #[test]
    fn missing_optional_columns_are_skipped() {
        let raw = Table {
            columns: vec!["fecha_accion".into(), "Total".into()],
            rows: vec![vec![text("2024-01-05"), Value::Number(135.0)]],
        };
        let (date, supervisor, count) =
            (aliases("fecha_accion"), aliases("SUPERVISOR"), aliases("GESTIONES"));
        let rules = TableRules {
            resource: "actions",
            date: &date,
            uppercase: vec![supervisor.as_slice()],
            numeric: Some(count.as_slice()),
        };
        let (table, _) = normalize_table(&raw, &rules, &formats()).unwrap();
        assert_eq!(table.rows[0][1], Value::Number(135.0));
    }

    #[test]
    fn missing_date_column_is_fatal() {
        let raw = Table::new(vec!["SUPERVISOR".into()]);
        let date = aliases("DATA");
        let rules = TableRules {
            resource: "activity",
            date: &date,
            uppercase: Vec::new(),
            numeric: None,
        };
        let err = normalize_table(&raw, &rules, &formats()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { .. }));
    }

    #[test]
    fn datetimes_keep_only_the_date() {
        let date = parse_date(&text("2024-01-05 14:30:00"), &formats());
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 5));
        let date = parse_date(&Value::Number(20240105.0), &formats());
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    #[test]
    fn no_string_cell_keeps_outer_whitespace() {
        let raw = Table {
            columns: vec!["DATA".into(), "NOTE".into()],
            rows: vec![vec![text(" 2024-01-05\t"), text("\t spaced out  ")]],
        };
        let date = aliases("DATA");
        let rules = TableRules {
            resource: "activity",
            date: &date,
            uppercase: Vec::new(),
            numeric: None,
        };
        let (table, _) = normalize_table(&raw, &rules, &formats()).unwrap();
        for cell in &table.rows[0] {
            if let Some(text) = cell.as_text() {
                assert_eq!(text, text.trim());
            }
        }
        assert_eq!(table.rows[0][1], text("spaced out"));
    }
}
