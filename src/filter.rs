use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{DateSelection, Table, Value};
use crate::pipeline::Dataset;

/// Filter parameters supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub date: DateSelection,
    /// Matched exactly against the uppercased supervisor column. Empty means
    /// no supervisor filter.
    pub supervisors: BTreeSet<String>,
}

impl Selection {
    pub fn new<I, S>(date: DateSelection, supervisors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            date,
            supervisors: supervisors.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilteredTables {
    pub actions: Table,
    pub activity: Table,
}

pub fn apply(dataset: &Dataset, selection: &Selection) -> FilteredTables {
    let columns = dataset.columns();
    let actions = filter_table(
        dataset.actions(),
        &columns.actions.date,
        &columns.actions.supervisor,
        selection,
    );
    let activity = filter_table(
        dataset.activity(),
        &columns.activity.date,
        &columns.activity.supervisor,
        selection,
    );
    debug!(
        date = %selection.date,
        supervisors = selection.supervisors.len(),
        actions = actions.len(),
        activity = activity.len(),
        "applied filters"
    );
    FilteredTables { actions, activity }
}

fn filter_table(
    table: &Table,
    date_aliases: &[String],
    supervisor_aliases: &[String],
    selection: &Selection,
) -> Table {
    let date_index = table.find_column(date_aliases);
    let supervisor_index = table.find_column(supervisor_aliases);

    table.filter_rows(|row| {
        let date_ok = match selection.date {
            DateSelection::All => true,
            DateSelection::On(wanted) => {
                date_index.and_then(|index| row[index].as_date()) == Some(wanted)
            }
        };
        let supervisor_ok = selection.supervisors.is_empty()
            || supervisor_index
                .and_then(|index| row[index].as_text())
                .is_some_and(|name| selection.supervisors.contains(name));
        date_ok && supervisor_ok
    })
}

/// Distinct dates of both tables up to `today`, most recent first.
pub fn available_dates(dataset: &Dataset, today: NaiveDate) -> Vec<NaiveDate> {
    let columns = dataset.columns();
    let mut dates = BTreeSet::new();
    collect_column(dataset.actions(), &columns.actions.date, |value| {
        if let Some(date) = value.as_date().filter(|date| *date <= today) {
            dates.insert(date);
        }
    });
    collect_column(dataset.activity(), &columns.activity.date, |value| {
        if let Some(date) = value.as_date().filter(|date| *date <= today) {
            dates.insert(date);
        }
    });
    dates.into_iter().rev().collect()
}

/// Distinct non-missing supervisors of both tables, ascending.
pub fn available_supervisors(dataset: &Dataset) -> Vec<String> {
    let columns = dataset.columns();
    let mut supervisors = BTreeSet::new();
    for (table, aliases) in [
        (dataset.actions(), &columns.actions.supervisor),
        (dataset.activity(), &columns.activity.supervisor),
    ] {
        collect_column(table, aliases, |value| {
            if !value.is_missing() {
                supervisors.insert(value.to_string());
            }
        });
    }
    supervisors.into_iter().collect()
}

fn collect_column<F>(table: &Table, aliases: &[String], mut visit: F)
where
    F: FnMut(&Value),
{
    if let Some(index) = table.find_column(aliases) {
        for row in &table.rows {
            visit(&row[index]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::loader::{read_table_from, RawSources};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dataset() -> Dataset {
        let actions = read_table_from(
            "actions",
            "SUPERVISOR,fecha_accion,Total\n\
             ana,2024-01-05,135\n\
             bia,2024-01-06,90\n\
             ,2024-01-07,10\n\
             ana,2030-12-31,1\n"
                .as_bytes(),
        )
        .unwrap();
        let activity = read_table_from(
            "activity",
            "OPERADOR,DATA,SUPERVISOR,CD,GESTIONES\n\
             x,2024-01-05,ana,yes,10\n\
             y,2024-01-04,carla,no,3\n\
             z,2024-01-06,bia,yes,7\n"
                .as_bytes(),
        )
        .unwrap();
        Dataset::from_raw(RawSources { actions, activity }, &Config::default()).unwrap()
    }

    #[test]
    fn no_filters_returns_inputs_unchanged() {
        let dataset = dataset();
        let filtered = apply(&dataset, &Selection::default());
        assert_eq!(&filtered.actions, dataset.actions());
        assert_eq!(&filtered.activity, dataset.activity());
    }

    #[test]
    fn date_and_supervisor_filters_combine() {
        let dataset = dataset();
        let selection = Selection::new(DateSelection::On(date(2024, 1, 5)), ["ANA"]);
        let filtered = apply(&dataset, &selection);
        assert_eq!(filtered.actions.len(), 1);
        assert_eq!(filtered.activity.len(), 1);

        let selection = Selection::new(DateSelection::On(date(2024, 1, 6)), ["ANA"]);
        let filtered = apply(&dataset, &selection);
        assert!(filtered.actions.is_empty());
        assert!(filtered.activity.is_empty());
    }

    #[test]
    fn supervisor_match_is_case_sensitive() {
        let dataset = dataset();
        let filtered = apply(&dataset, &Selection::new(DateSelection::All, ["ana"]));
        assert!(filtered.actions.is_empty());
        let filtered = apply(&dataset, &Selection::new(DateSelection::All, ["ANA", "BIA"]));
        assert_eq!(filtered.actions.len(), 3);
        assert_eq!(filtered.activity.len(), 2);
    }

    #[test]
    fn filtering_leaves_dataset_untouched() {
        let dataset = dataset();
        let before = dataset.actions().clone();
        let _ = apply(&dataset, &Selection::new(DateSelection::All, ["BIA"]));
        assert_eq!(dataset.actions(), &before);
    }

    #[test]
    fn dates_exclude_future_and_sort_descending() {
        let dataset = dataset();
        let dates = available_dates(&dataset, date(2024, 6, 1));
        assert_eq!(
            dates,
            vec![date(2024, 1, 7), date(2024, 1, 6), date(2024, 1, 5), date(2024, 1, 4)]
        );
    }

    #[test]
    fn supervisors_are_unioned_and_sorted() {
        let dataset = dataset();
        assert_eq!(available_supervisors(&dataset), vec!["ANA", "BIA", "CARLA"]);
    }
}
