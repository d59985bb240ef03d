//! The network store: component tables and time series for one study year.
use crate::id::AssetID;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use std::path::Path;
use strum::IntoEnumIterator;

pub mod component;
pub use component::{CapacityAttr, ComponentType};
mod io;
pub mod series;
pub use series::SeriesTable;
pub mod table;
pub use table::{ComponentTable, Value};

/// The label used for the single snapshot of a network without a `snapshots.csv` file
const DEFAULT_SNAPSHOT: &str = "now";

/// All input data and results for one study year.
///
/// Holds one [`ComponentTable`] per [`ComponentType`] (possibly empty) and any number of
/// [`SeriesTable`]s keyed by component type and attribute name.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    snapshots: Vec<String>,
    weightings: Vec<f64>,
    tables: IndexMap<ComponentType, ComponentTable>,
    series: IndexMap<(ComponentType, String), SeriesTable>,
    objective: Option<f64>,
}

impl Default for Network {
    fn default() -> Self {
        Self::new(vec![DEFAULT_SNAPSHOT.to_string()])
    }
}

impl Network {
    /// Create an empty network over the given snapshots, each with a weighting of one
    pub fn new(snapshots: Vec<String>) -> Self {
        let weightings = vec![1.0; snapshots.len()];
        Self {
            snapshots,
            weightings,
            tables: ComponentType::iter()
                .map(|c| (c, ComponentTable::new(c)))
                .collect(),
            series: IndexMap::new(),
            objective: None,
        }
    }

    /// Read a network from a folder of CSV files
    pub fn from_csv_folder(dir: &Path) -> Result<Self> {
        io::import_from_csv_folder(dir)
            .with_context(|| format!("Failed to load network from {}", dir.display()))
    }

    /// Write the network (including any results) to a folder of CSV files
    pub fn export_to_csv_folder(&self, dir: &Path) -> Result<()> {
        io::export_to_csv_folder(self, dir)
            .with_context(|| format!("Failed to write network to {}", dir.display()))
    }

    /// Whether a network folder exists at the given path
    pub fn exists_at(dir: &Path) -> bool {
        dir.is_dir()
    }

    /// The snapshot labels
    pub fn snapshots(&self) -> &[String] {
        &self.snapshots
    }

    /// The number of snapshots
    pub fn num_snapshots(&self) -> usize {
        self.snapshots.len()
    }

    /// The duration (in hours) represented by each snapshot
    pub fn weightings(&self) -> &[f64] {
        &self.weightings
    }

    /// Replace the snapshot weightings
    pub fn set_weightings(&mut self, weightings: Vec<f64>) -> Result<()> {
        ensure!(
            weightings.len() == self.snapshots.len(),
            "Expected {} snapshot weightings, got {}",
            self.snapshots.len(),
            weightings.len()
        );
        self.weightings = weightings;

        Ok(())
    }

    /// The static table for a component type
    pub fn table(&self, component: ComponentType) -> &ComponentTable {
        &self.tables[&component]
    }

    /// Mutable access to the static table for a component type
    pub fn table_mut(&mut self, component: ComponentType) -> &mut ComponentTable {
        &mut self.tables[&component]
    }

    /// The links table
    pub fn links(&self) -> &ComponentTable {
        self.table(ComponentType::Link)
    }

    /// Iterate over all non-empty component tables
    pub fn iter_tables(&self) -> impl Iterator<Item = &ComponentTable> {
        self.tables.values().filter(|table| !table.is_empty())
    }

    /// A time series for a component attribute, if present
    pub fn series(&self, component: ComponentType, attr: &str) -> Option<&SeriesTable> {
        self.series.get(&(component, attr.to_string()))
    }

    /// Mutable access to a time series, creating an empty one if it does not exist
    pub fn series_mut(&mut self, component: ComponentType, attr: &str) -> &mut SeriesTable {
        let num_snapshots = self.num_snapshots();
        self.series
            .entry((component, attr.to_string()))
            .or_insert_with(|| SeriesTable::new(num_snapshots))
    }

    /// Iterate over all time series
    pub fn iter_series(&self) -> impl Iterator<Item = (ComponentType, &str, &SeriesTable)> {
        self.series
            .iter()
            .map(|((component, attr), series)| (*component, attr.as_str(), series))
    }

    /// Get a time-varying attribute for an asset at a snapshot.
    ///
    /// Uses the time series if there is one for this asset, otherwise the static value.
    pub fn get_at(
        &self,
        component: ComponentType,
        id: &str,
        attr: &str,
        snapshot: usize,
    ) -> Result<f64> {
        if let Some(value) = self
            .series(component, attr)
            .and_then(|series| series.get_at(id, snapshot))
        {
            return Ok(value);
        }

        self.table(component).get_f64(id, attr)
    }

    /// The IDs of extendable assets for a component type
    pub fn extendable_ids(&self, component: ComponentType) -> Result<Vec<AssetID>> {
        self.table(component).extendable_ids()
    }

    /// Whether this network holds optimisation results.
    ///
    /// A network counts as solved if it has link flow results.
    pub fn is_solved(&self) -> bool {
        self.series(ComponentType::Link, "p0")
            .is_some_and(|series| !series.is_empty())
    }

    /// The objective value of the last solve, if any
    pub fn objective(&self) -> Option<f64> {
        self.objective
    }

    /// Record the objective value of a solve
    pub fn set_objective(&mut self, objective: f64) {
        self.objective = Some(objective);
    }
}
