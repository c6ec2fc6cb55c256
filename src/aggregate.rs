use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::ActivityColumns;
use crate::models::{AggregatedActivity, AggregatedTable, Table, Value};

/// Role of a candidate grouping column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Operator,
    Date,
    Supervisor,
    Channel,
}

/// An optional grouping column, resolved against the table header at call time.
#[derive(Debug, Clone, Copy)]
pub struct KeyDescriptor<'a> {
    pub role: KeyRole,
    pub aliases: &'a [String],
}

/// Grouping candidates in priority order.
pub fn group_keys(columns: &ActivityColumns) -> [KeyDescriptor<'_>; 4] {
    [
        KeyDescriptor {
            role: KeyRole::Operator,
            aliases: &columns.operator,
        },
        KeyDescriptor {
            role: KeyRole::Date,
            aliases: &columns.date,
        },
        KeyDescriptor {
            role: KeyRole::Supervisor,
            aliases: &columns.supervisor,
        },
        KeyDescriptor {
            role: KeyRole::Channel,
            aliases: &columns.channel,
        },
    ]
}

struct ResolvedKey {
    role: KeyRole,
    index: usize,
    name: String,
}

/// Group the activity table by the available key columns and sum the count
/// column. Rows come out most recent date first, then highest total first;
/// ties keep first-seen order.
pub fn aggregate(activity: &Table, columns: &ActivityColumns) -> AggregatedTable {
    let keys: Vec<ResolvedKey> = group_keys(columns)
        .iter()
        .filter_map(|descriptor| {
            activity
                .find_column(descriptor.aliases)
                .map(|index| ResolvedKey {
                    role: descriptor.role,
                    index,
                    name: activity.columns[index].clone(),
                })
        })
        .collect();

    let count_index = activity.find_column(&columns.count);
    let count_column = count_index
        .map(|index| activity.columns[index].clone())
        .or_else(|| columns.count.first().cloned())
        .unwrap_or_default();

    let mut table = AggregatedTable {
        key_columns: keys.iter().map(|key| key.name.clone()).collect(),
        count_column,
        rows: Vec::new(),
    };

    if activity.is_empty() {
        return table;
    }
    if count_index.is_none() {
        warn!(
            column = %table.count_column,
            "activity count column not found, totals will be zero"
        );
    }

    let mut positions: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut skipped = 0usize;
    for row in &activity.rows {
        // Rows with a blank key column belong to no group.
        if keys.iter().any(|key| row[key.index].is_missing()) {
            skipped += 1;
            continue;
        }
        let key: Vec<Value> = keys.iter().map(|key| row[key.index].clone()).collect();
        let amount = count_index
            .and_then(|index| row[index].as_number())
            .unwrap_or(0.0);

        match positions.get(&key) {
            Some(&position) => table.rows[position].total += amount,
            None => {
                positions.insert(key.clone(), table.rows.len());
                table.rows.push(AggregatedActivity { key, total: amount });
            }
        }
    }

    let date_position = keys.iter().position(|key| key.role == KeyRole::Date);
    table.rows.sort_by(|a, b| {
        let by_date = match date_position {
            Some(position) => b.key[position]
                .as_date()
                .cmp(&a.key[position].as_date()),
            None => Ordering::Equal,
        };
        by_date.then_with(|| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal))
    });

    debug!(
        rows = activity.len(),
        skipped,
        groups = table.len(),
        "aggregated activity"
    );
    table
}
