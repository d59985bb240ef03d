//! Fixed increases to load demand, read from `inc_load.csv`.
use crate::input::read_csv_optional;
use crate::network::{ComponentType, Network};
use anyhow::{Context, Result, ensure};
use log::info;
use serde::Deserialize;
use std::path::Path;

/// The file holding load increases
pub const LOAD_INCREASE_FILE_NAME: &str = "inc_load.csv";

/// A fixed amount of extra demand for one load
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadIncrease {
    /// The load to increase
    #[serde(rename = "inc_load")]
    pub load: String,
    /// The amount added to every snapshot (MW)
    pub value_mw: f64,
}

/// Read the load increases from `inc_load.csv` in the given folder, if the file exists
pub fn read_load_increases(dir: &Path) -> Result<Option<Vec<LoadIncrease>>> {
    let Some(increases) =
        read_csv_optional::<LoadIncrease>(&dir.join(LOAD_INCREASE_FILE_NAME))?
    else {
        return Ok(None);
    };
    for increase in &increases {
        ensure!(
            increase.value_mw.is_finite(),
            "Invalid load increase for {}: {}",
            increase.load,
            increase.value_mw
        );
    }

    Ok(Some(increases))
}

/// Add a fixed amount to every snapshot of the listed loads' demand.
///
/// A load without a `p_set` series gets one, starting from its static `p_set`.
pub fn increase_load_fixed(network: &mut Network, increases: &[LoadIncrease]) -> Result<()> {
    let num_snapshots = network.num_snapshots();
    for LoadIncrease { load, value_mw } in increases {
        let loads = network.table(ComponentType::Load);
        let id = loads
            .get_id(load)
            .with_context(|| format!("Unknown load {load} in {LOAD_INCREASE_FILE_NAME}"))?
            .clone();
        let base = loads.get_f64(&id, "p_set")?;

        info!("Adding {value_mw} MW to load {id}");
        let series = network.series_mut(ComponentType::Load, "p_set");
        if series.get(&id).is_none() {
            series.insert(id.clone(), vec![base; num_snapshots])?;
        }
        let values = series
            .get_mut(&id)
            .with_context(|| format!("No p_set series for load {id}"))?;
        for value in values.iter_mut() {
            *value += value_mw;
        }
    }

    Ok(())
}
