use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::{json, Map};

use crate::highlight::classify_with;
use crate::models::{format_number, Highlight, Table, Value};
use crate::pipeline::{DashboardView, DatasetColumns};

/// Which cells get flagged, and against what threshold.
#[derive(Debug, Clone, Copy)]
pub struct HighlightRule {
    pub threshold: f64,
    actions_total: Option<usize>,
}

impl HighlightRule {
    pub fn new(view: &DashboardView, columns: &DatasetColumns, threshold: f64) -> Self {
        Self {
            threshold,
            actions_total: view.actions.find_column(&columns.actions.total),
        }
    }

    fn action_cell(&self, index: usize, value: &Value) -> Option<Highlight> {
        (Some(index) == self.actions_total).then(|| classify_with(value, self.threshold))
    }

    fn count_cell(&self, total: f64) -> Highlight {
        classify_with(&total, self.threshold)
    }
}

fn marker(highlight: Highlight) -> &'static str {
    match highlight {
        Highlight::High => " [high]",
        Highlight::Low => " [low]",
        Highlight::Unclassifiable => "",
    }
}

fn action_rows(view: &DashboardView, rule: &HighlightRule) -> Vec<Vec<String>> {
    view.actions
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(index, value)| match rule.action_cell(index, value) {
                    Some(highlight) => format!("{value}{}", marker(highlight)),
                    None => value.to_string(),
                })
                .collect()
        })
        .collect()
}

fn activity_rows(view: &DashboardView, rule: &HighlightRule) -> Vec<Vec<String>> {
    view.activity
        .rows
        .iter()
        .map(|group| {
            let mut cells: Vec<String> = group.key.iter().map(Value::to_string).collect();
            cells.push(format!(
                "{}{}",
                format_number(group.total),
                marker(rule.count_cell(group.total))
            ));
            cells
        })
        .collect()
}

pub fn render_text(view: &DashboardView, rule: &HighlightRule) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Selection: {}", describe_selection(view));
    let _ = writeln!(output);
    let _ = writeln!(output, "ACTIONS");
    if view.actions.is_empty() {
        let _ = writeln!(output, "No data found for ACTIONS.");
    } else {
        write_aligned(&mut output, &view.actions.columns, &action_rows(view, rule));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "CRM");
    if view.activity.is_empty() {
        let _ = writeln!(output, "No data found for CRM.");
    } else {
        write_aligned(&mut output, &view.activity.columns(), &activity_rows(view, rule));
    }
    output
}

fn write_aligned(output: &mut String, header: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = header.iter().map(|name| name.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let _ = writeln!(output, "{}", line(header));
    for row in rows {
        let _ = writeln!(output, "{}", line(row.as_slice()));
    }
}

pub fn build_report(view: &DashboardView, rule: &HighlightRule) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Actions Televendas");
    let _ = writeln!(output, "Generated for {}", describe_selection(view));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Actions");

    if view.actions.is_empty() {
        let _ = writeln!(output, "No data found for ACTIONS.");
    } else {
        write_markdown_table(&mut output, &view.actions.columns, &action_rows(view, rule));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## CRM");

    if view.activity.is_empty() {
        let _ = writeln!(output, "No data found for CRM.");
    } else {
        write_markdown_table(
            &mut output,
            &view.activity.columns(),
            &activity_rows(view, rule),
        );
        let high = view
            .activity
            .rows
            .iter()
            .filter(|group| rule.count_cell(group.total) == Highlight::High)
            .count();
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "{} of {} groups at or above {}.",
            high,
            view.activity.len(),
            format_number(rule.threshold)
        );
    }

    output
}

fn write_markdown_table(output: &mut String, header: &[String], rows: &[Vec<String>]) {
    let _ = writeln!(output, "| {} |", header.join(" | "));
    let _ = writeln!(
        output,
        "|{}",
        header.iter().map(|_| " --- |").collect::<String>()
    );
    for row in rows {
        let cells: Vec<String> = row.iter().map(|cell| cell.replace('|', "\\|")).collect();
        let _ = writeln!(output, "| {} |", cells.join(" | "));
    }
}

fn describe_selection(view: &DashboardView) -> String {
    let supervisors = if view.selection.supervisors.is_empty() {
        "all supervisors".to_string()
    } else {
        view.selection
            .supervisors
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("{} / {}", view.selection.date, supervisors)
}

/// JSON rows keyed by column name; flagged cells get a sibling
/// `<column>_highlight` field.
pub fn to_json(view: &DashboardView, rule: &HighlightRule) -> serde_json::Value {
    let actions: Vec<serde_json::Value> = view
        .actions
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            for (index, (column, value)) in view.actions.columns.iter().zip(row).enumerate() {
                object.insert(column.clone(), json!(value));
                if let Some(highlight) = rule.action_cell(index, value) {
                    object.insert(format!("{column}_highlight"), json!(highlight));
                }
            }
            serde_json::Value::Object(object)
        })
        .collect();

    let activity: Vec<serde_json::Value> = view
        .activity
        .rows
        .iter()
        .map(|group| {
            let mut object = Map::new();
            for (column, value) in view.activity.key_columns.iter().zip(&group.key) {
                object.insert(column.clone(), json!(value));
            }
            let count = &view.activity.count_column;
            object.insert(count.clone(), json!(group.total));
            object.insert(
                format!("{count}_highlight"),
                json!(rule.count_cell(group.total)),
            );
            serde_json::Value::Object(object)
        })
        .collect();

    json!({
        "selection": {
            "date": view.selection.date.to_string(),
            "supervisors": view.selection.supervisors,
        },
        "actions": actions,
        "activity": activity,
    })
}

/// Write `actions.csv` and `activity.csv` into `dir`.
pub fn export_csv(view: &DashboardView, dir: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let actions_path = dir.join("actions.csv");
    write_csv(&actions_path, &view.actions)?;

    let activity_path = dir.join("activity.csv");
    let mut activity = Table::new(view.activity.columns());
    activity.rows = view
        .activity
        .rows
        .iter()
        .map(|group| {
            let mut row = group.key.clone();
            row.push(Value::Number(group.total));
            row
        })
        .collect();
    write_csv(&activity_path, &activity)?;

    Ok((actions_path, activity_path))
}

fn write_csv(path: &Path, table: &Table) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(Value::to_string))?;
    }
    writer.flush()?;
    Ok(())
}
