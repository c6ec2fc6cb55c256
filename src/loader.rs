use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::error::PipelineError;
use crate::models::{Table, Value};

pub const ACTIONS_RESOURCE: &str = "actions";
pub const ACTIVITY_RESOURCE: &str = "activity";

/// The two tables as read from disk, before normalization.
#[derive(Debug, Clone)]
pub struct RawSources {
    pub actions: Table,
    pub activity: Table,
}

/// Read both sources. Both locations are checked before either file is
/// opened, so a missing second file fails without reading the first.
pub fn load_sources(actions_path: &Path, activity_path: &Path) -> Result<RawSources, PipelineError> {
    ensure_exists(ACTIONS_RESOURCE, actions_path)?;
    ensure_exists(ACTIVITY_RESOURCE, activity_path)?;

    let actions = read_table(ACTIONS_RESOURCE, actions_path)?;
    let activity = read_table(ACTIVITY_RESOURCE, activity_path)?;
    info!(
        actions = actions.len(),
        activity = activity.len(),
        "loaded source tables"
    );

    Ok(RawSources { actions, activity })
}

fn ensure_exists(resource: &str, path: &Path) -> Result<(), PipelineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::ResourceNotFound {
            resource: resource.to_string(),
            path: path.to_path_buf(),
        })
    }
}

pub fn read_table(resource: &str, path: &Path) -> Result<Table, PipelineError> {
    debug!(resource, path = %path.display(), "reading csv");
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| csv_error(resource, source))?;
    collect_table(resource, reader)
}

pub fn read_table_from<R: Read>(resource: &str, input: R) -> Result<Table, PipelineError> {
    let reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    collect_table(resource, reader)
}

fn collect_table<R: Read>(resource: &str, mut reader: csv::Reader<R>) -> Result<Table, PipelineError> {
    let columns: Vec<String> = reader
        .headers()
        .map_err(|source| csv_error(resource, source))?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut cells: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| csv_error(resource, source))?;
        if record.len() > columns.len() {
            return Err(PipelineError::RowTooWide {
                resource: resource.to_string(),
                line: record.position().map(|position| position.line()).unwrap_or_default(),
                expected: columns.len(),
                found: record.len(),
            });
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(columns.len(), String::new());
        cells.push(row);
    }

    let numeric: Vec<bool> = (0..columns.len())
        .map(|index| is_numeric_column(&cells, index))
        .collect();

    let rows = cells
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&numeric)
                .map(|(cell, &numeric)| typed_cell(cell, numeric))
                .collect()
        })
        .collect();

    Ok(Table { columns, rows })
}

/// Only plain decimal notation counts; `nan` and `inf` stay text.
fn parse_number(cell: &str) -> Option<f64> {
    let unsigned = cell.strip_prefix(['+', '-']).unwrap_or(cell);
    match unsigned.chars().next() {
        Some(first) if first.is_ascii_digit() || first == '.' => cell.parse().ok(),
        _ => None,
    }
}

/// A column is numeric when every non-empty cell parses as a number.
fn is_numeric_column(cells: &[Vec<String>], index: usize) -> bool {
    let mut seen = false;
    for row in cells {
        let cell = row[index].trim();
        if cell.is_empty() {
            continue;
        }
        if parse_number(cell).is_none() {
            return false;
        }
        seen = true;
    }
    seen
}

fn typed_cell(cell: String, numeric: bool) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Missing;
    }
    if numeric {
        if let Some(number) = parse_number(trimmed) {
            return Value::Number(number);
        }
    }
    Value::Text(cell)
}

fn csv_error(resource: &str, source: csv::Error) -> PipelineError {
    PipelineError::Csv {
        resource: resource.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_numeric_and_text_columns() {
        let table = read_table_from(
            "test",
            "NOME,GESTIONES,CD\n ana ,10,007\nbia,, x\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(table.columns, vec!["NOME", "GESTIONES", "CD"]);
        assert_eq!(table.rows[0][0], Value::Text(" ana ".to_string()));
        assert_eq!(table.rows[0][1], Value::Number(10.0));
        assert_eq!(table.rows[1][1], Value::Missing);
        assert_eq!(table.rows[0][2], Value::Text("007".to_string()));
    }

    #[test]
    fn nan_and_inf_do_not_make_a_column_numeric() {
        let table = read_table_from("test", "NOME,GESTIONES\nNan,-3\n12,.5\nInf,+2\n".as_bytes())
            .unwrap();
        assert_eq!(table.rows[0][0], Value::Text("Nan".to_string()));
        assert_eq!(table.rows[1][0], Value::Text("12".to_string()));
        assert_eq!(table.rows[0][1], Value::Number(-3.0));
        assert_eq!(table.rows[1][1], Value::Number(0.5));
        assert_eq!(table.rows[2][1], Value::Number(2.0));
    }

    #[test]
    fn rows_wider_than_the_header_are_rejected() {
        let err = read_table_from("activity", "A,B\n1,2\n1,2,3,4\n".as_bytes()).unwrap_err();
        match err {
            PipelineError::RowTooWide {
                resource,
                line,
                expected,
                found,
            } => {
                assert_eq!(resource, "activity");
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_rows_are_padded_with_missing() {
        let table = read_table_from("test", "A,B,C\n1,2\n".as_bytes()).unwrap();
        assert_eq!(table.rows[0].len(), 3);
        assert!(table.rows[0][2].is_missing());
    }

    #[test]
    fn missing_activity_file_is_reported_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let actions = dir.path().join("dados_analisados.csv");
        std::fs::write(&actions, "SUPERVISOR,fecha_accion,Total\n").unwrap();
        let activity = dir.path().join("HORA.csv");

        let err = load_sources(&actions, &activity).unwrap_err();
        match err {
            PipelineError::ResourceNotFound { resource, path } => {
                assert_eq!(resource, ACTIVITY_RESOURCE);
                assert_eq!(path, activity);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn loads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let actions = dir.path().join("a.csv");
        let activity = dir.path().join("b.csv");
        std::fs::write(&actions, "SUPERVISOR,fecha_accion,Total\nana,2024-01-05,135\n").unwrap();
        std::fs::write(&activity, "OPERADOR,DATA\nana,2024-01-05\n").unwrap();

        let sources = load_sources(&actions, &activity).unwrap();
        assert_eq!(sources.actions.len(), 1);
        assert_eq!(sources.activity.len(), 1);
    }
}
