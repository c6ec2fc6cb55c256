//! Load-once dataset and the per-selection view computed from it.
//!
//! `Dataset` is built a single time per process and only handed out by
//! shared reference; every view is derived from fresh copies, so repeated
//! selections never observe each other.

use tracing::info;

use crate::aggregate;
use crate::config::{ActionColumns, ActivityColumns, Config};
use crate::error::PipelineError;
use crate::filter::{self, Selection};
use crate::loader::{self, RawSources, ACTIONS_RESOURCE, ACTIVITY_RESOURCE};
use crate::models::{AggregatedTable, Table};
use crate::normalize::{normalize_table, NormalizeStats, TableRules};

#[derive(Debug, Clone)]
pub struct DatasetColumns {
    pub actions: ActionColumns,
    pub activity: ActivityColumns,
}

/// The two normalized tables. Immutable once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    actions: Table,
    activity: Table,
    columns: DatasetColumns,
    actions_stats: NormalizeStats,
    activity_stats: NormalizeStats,
}

impl Dataset {
    pub fn load(config: &Config) -> Result<Self, PipelineError> {
        let sources = loader::load_sources(
            &config.sources.actions_path(),
            &config.sources.activity_path(),
        )?;
        Self::from_raw(sources, config)
    }

    pub fn from_raw(sources: RawSources, config: &Config) -> Result<Self, PipelineError> {
        let formats = &config.parsing.date_formats;

        let action_rules = TableRules {
            resource: ACTIONS_RESOURCE,
            date: &config.actions.date,
            uppercase: vec![config.actions.supervisor.as_slice()],
            numeric: None,
        };
        let activity_rules = TableRules {
            resource: ACTIVITY_RESOURCE,
            date: &config.activity.date,
            uppercase: vec![
                config.activity.supervisor.as_slice(),
                config.activity.operator.as_slice(),
            ],
            numeric: Some(config.activity.count.as_slice()),
        };

        let (actions, actions_stats) = normalize_table(&sources.actions, &action_rules, formats)?;
        let (activity, activity_stats) =
            normalize_table(&sources.activity, &activity_rules, formats)?;

        info!(
            actions = actions.len(),
            activity = activity.len(),
            "normalized source tables"
        );

        Ok(Self {
            actions,
            activity,
            columns: DatasetColumns {
                actions: config.actions.clone(),
                activity: config.activity.clone(),
            },
            actions_stats,
            activity_stats,
        })
    }

    pub fn actions(&self) -> &Table {
        &self.actions
    }

    pub fn activity(&self) -> &Table {
        &self.activity
    }

    pub fn columns(&self) -> &DatasetColumns {
        &self.columns
    }

    pub fn actions_stats(&self) -> NormalizeStats {
        self.actions_stats
    }

    pub fn activity_stats(&self) -> NormalizeStats {
        self.activity_stats
    }

    /// Filter both tables and aggregate the activity side.
    pub fn view(&self, selection: &Selection) -> DashboardView {
        let filtered = filter::apply(self, selection);
        let activity = aggregate::aggregate(&filtered.activity, &self.columns.activity);
        DashboardView {
            selection: selection.clone(),
            actions: filtered.actions,
            activity,
        }
    }
}

/// What the presentation layer receives for one selection.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub selection: Selection,
    pub actions: Table,
    pub activity: AggregatedTable,
}
