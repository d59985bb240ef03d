//! Time-varying component data.
use crate::id::AssetID;
use anyhow::{Result, ensure};
use indexmap::IndexMap;

/// Values of one attribute for several assets over every snapshot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesTable {
    num_snapshots: usize,
    columns: IndexMap<AssetID, Vec<f64>>,
}

impl SeriesTable {
    /// Create an empty series table for the given number of snapshots
    pub fn new(num_snapshots: usize) -> Self {
        Self {
            num_snapshots,
            columns: IndexMap::new(),
        }
    }

    /// The number of snapshots each column covers
    pub fn num_snapshots(&self) -> usize {
        self.num_snapshots
    }

    /// Whether there are no asset columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Add or replace the values for one asset
    pub fn insert(&mut self, id: AssetID, values: Vec<f64>) -> Result<()> {
        ensure!(
            values.len() == self.num_snapshots,
            "Series for {id} has {} values but there are {} snapshots",
            values.len(),
            self.num_snapshots
        );
        self.columns.insert(id, values);

        Ok(())
    }

    /// The values for one asset, if present
    pub fn get(&self, id: &str) -> Option<&[f64]> {
        self.columns.get(id).map(Vec::as_slice)
    }

    /// Mutable access to the values for one asset, if present
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Vec<f64>> {
        self.columns.get_mut(id)
    }

    /// The value for an asset at a snapshot, if present.
    ///
    /// Missing values (NaN) count as absent.
    pub fn get_at(&self, id: &str, snapshot: usize) -> Option<f64> {
        self.get(id)
            .and_then(|values| values.get(snapshot).copied())
            .filter(|value| !value.is_nan())
    }

    /// Iterate over the assets and their values
    pub fn iter(&self) -> impl Iterator<Item = (&AssetID, &[f64])> {
        self.columns.iter().map(|(id, values)| (id, values.as_slice()))
    }

    /// Remove the values for one asset
    pub fn remove(&mut self, id: &str) -> Option<Vec<f64>> {
        self.columns.shift_remove(id)
    }
}
