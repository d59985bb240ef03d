//! Per-asset summary columns and capacity statistics for solved networks.
use crate::id::AssetID;
use crate::network::{ComponentType, Network, Value};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::info;
use serde::Serialize;
use std::path::Path;

/// Hours in a (non-leap) year, used for average load factors
const HOURS_PER_YEAR: f64 = 8760.0;

/// The output file name for optimised capacity by carrier
pub const OPTIMAL_CAPACITY_FILE_NAME: &str = "z_optimal_capacity.csv";
/// The output file name for input capacity by carrier
pub const INSTALLED_CAPACITY_FILE_NAME: &str = "z_installed_capacity.csv";
/// The output file name for capacity added by the optimisation, by carrier
pub const EXPANDED_CAPACITY_FILE_NAME: &str = "z_expanded_capacity.csv";

/// Divide, giving NaN (written as an empty cell) when the denominator is zero
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}

/// The optimised capacity of an asset, or its input capacity if it has not been optimised
fn optimal_capacity(network: &Network, component: ComponentType, id: &str) -> Result<f64> {
    let table = network.table(component);
    let attr = component
        .capacity_attr()
        .with_context(|| format!("{component} has no nominal capacity"))?;
    match table.get_f64_opt(id, attr.opt())? {
        Some(value) => Ok(value),
        None => table.get_f64(id, attr.name()),
    }
}

/// Sum a result series for one asset, optionally keeping only values matching a predicate
fn sum_series<F>(network: &Network, component: ComponentType, attr: &str, id: &str, keep: F) -> f64
where
    F: Fn(f64) -> bool,
{
    network
        .series(component, attr)
        .and_then(|series| series.get(id))
        .map_or(0.0, |values| {
            values
                .iter()
                .copied()
                .filter(|value| !value.is_nan() && keep(*value))
                .sum()
        })
}

/// Write a set of computed columns into a component table
fn set_columns(
    network: &mut Network,
    component: ComponentType,
    rows: Vec<(AssetID, Vec<(&str, f64)>)>,
) -> Result<()> {
    let table = network.table_mut(component);
    for (id, columns) in rows {
        for (column, value) in columns {
            table.set(&id, column, Value::from(value))?;
        }
    }

    Ok(())
}

/// Summary columns for generators, links and lines
fn dispatch_summaries(network: &mut Network, component: ComponentType) -> Result<()> {
    let (energy_attr, cost_column, has_marginal_cost) = match component {
        ComponentType::Generator => ("p", "total_cost__", true),
        ComponentType::Link => ("p0", "total_capital_cost__", true),
        _ => ("p0", "total_cost__", false),
    };

    let table = network.table(component);
    let mut rows = Vec::with_capacity(table.len());
    for id in table.ids() {
        let capacity = optimal_capacity(network, component, id)?;
        let capital_cost = table.get_f64(id, "capital_cost")? * capacity;
        let energy = sum_series(network, component, energy_attr, id, |_| true);
        let mut columns = vec![
            (cost_column, capital_cost),
            ("total_energy__", energy),
            ("ave_lf__", ratio(energy, capacity * HOURS_PER_YEAR)),
        ];
        let variable_cost = if has_marginal_cost {
            let variable_cost = table.get_f64(id, "marginal_cost")? * energy;
            columns.push(("total_variable_cost__", variable_cost));
            variable_cost
        } else {
            0.0
        };
        columns.push(("ave_cost__", ratio(capital_cost + variable_cost, energy)));
        rows.push((id.clone(), columns));
    }

    set_columns(network, component, rows)
}

/// Summary columns for storage units, split into dispatch and store
fn storage_unit_summaries(network: &mut Network) -> Result<()> {
    let component = ComponentType::StorageUnit;
    let table = network.table(component);
    let mut rows = Vec::with_capacity(table.len());
    for id in table.ids() {
        let capacity = optimal_capacity(network, component, id)?;
        let capital_cost = table.get_f64(id, "capital_cost")? * capacity;
        let marginal_cost = table.get_f64(id, "marginal_cost")?;
        let dispatch = sum_series(network, component, "p_dispatch", id, |_| true);
        let store = sum_series(network, component, "p_store", id, |_| true);
        let dispatch_cost = marginal_cost * dispatch;
        let store_cost = marginal_cost * store;
        rows.push((
            id.clone(),
            vec![
                ("total_cost__", capital_cost),
                ("total_energy_dispatch__", dispatch),
                ("total_energy_store__", store),
                ("total_variable_cost_dispatch__", dispatch_cost),
                ("total_variable_cost_store__", store_cost),
                ("ave_lf_dispatch__", ratio(dispatch, capacity * HOURS_PER_YEAR)),
                ("ave_lf_store__", ratio(store, capacity * HOURS_PER_YEAR)),
                (
                    "ave_cost__",
                    ratio(capital_cost + dispatch_cost + store_cost, dispatch),
                ),
            ],
        ));
    }

    set_columns(network, component, rows)
}

/// Summary columns for stores. Negative power is counted as storing, positive as dispatch.
fn store_summaries(network: &mut Network) -> Result<()> {
    let component = ComponentType::Store;
    let table = network.table(component);
    let mut rows = Vec::with_capacity(table.len());
    for id in table.ids() {
        let capacity = optimal_capacity(network, component, id)?;
        let capital_cost = table.get_f64(id, "capital_cost")? * capacity;
        let store = sum_series(network, component, "p", id, |value| value < 0.0);
        let dispatch = sum_series(network, component, "p", id, |value| value > 0.0);
        let variable_cost = table.get_f64(id, "marginal_cost")? * dispatch;
        rows.push((
            id.clone(),
            vec![
                ("total_cost__", capital_cost),
                ("total_energy_store__", store),
                ("total_energy_dispatch__", dispatch),
                ("total_variable_cost__", variable_cost),
                ("ave_lf_store__", ratio(store, capacity * HOURS_PER_YEAR)),
                ("ave_lf_dispatch__", ratio(dispatch, capacity * HOURS_PER_YEAR)),
                ("ave_cost__", ratio(capital_cost + variable_cost, dispatch)),
            ],
        ));
    }

    set_columns(network, component, rows)
}

/// Add cost, energy and load factor summary columns (suffixed `__`) to each component table
pub fn add_summaries(network: &mut Network) -> Result<()> {
    for component in [
        ComponentType::Generator,
        ComponentType::Link,
        ComponentType::Line,
    ] {
        info!("Adding {component} info");
        dispatch_summaries(network, component)?;
    }
    info!("Adding {} info", ComponentType::StorageUnit);
    storage_unit_summaries(network)?;
    info!("Adding {} info", ComponentType::Store);
    store_summaries(network)
}

/// Installed and optimised capacity for one carrier of one component type
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityStatistics {
    /// The component type
    pub component: ComponentType,
    /// The carrier the capacities are grouped by
    pub carrier: String,
    /// Total input capacity
    pub installed: f64,
    /// Total capacity after optimisation
    pub optimal: f64,
}

impl CapacityStatistics {
    /// Capacity added by the optimisation
    pub fn expanded(&self) -> f64 {
        self.optimal - self.installed
    }
}

/// A row of a statistics output file
#[derive(Debug, Serialize)]
struct StatisticsRow<'a> {
    component: String,
    carrier: &'a str,
    value: f64,
}

/// Total capacities by component type and carrier, in table order
pub fn capacity_statistics(network: &Network) -> Result<Vec<CapacityStatistics>> {
    let mut stats = Vec::new();
    for (component, attr) in ComponentType::iter_with_capacity() {
        let table = network.table(component);
        let mut by_carrier: IndexMap<&str, (f64, f64)> = IndexMap::new();
        for id in table.ids() {
            let carrier = table.get_str(id, "carrier").unwrap_or_default();
            let installed = table.get_f64(id, attr.name())?;
            let optimal = optimal_capacity(network, component, id)?;
            let entry = by_carrier.entry(carrier).or_default();
            entry.0 += installed;
            entry.1 += optimal;
        }

        stats.extend(
            by_carrier
                .into_iter()
                .map(|(carrier, (installed, optimal))| CapacityStatistics {
                    component,
                    carrier: carrier.to_string(),
                    installed,
                    optimal,
                }),
        );
    }

    Ok(stats)
}

/// Write optimal, installed and expanded capacity by carrier into `dir`
pub fn write_statistics(network: &Network, dir: &Path) -> Result<()> {
    let stats = capacity_statistics(network)?;
    let outputs: [(&str, fn(&CapacityStatistics) -> f64); 3] = [
        (OPTIMAL_CAPACITY_FILE_NAME, |s| s.optimal),
        (INSTALLED_CAPACITY_FILE_NAME, |s| s.installed),
        (EXPANDED_CAPACITY_FILE_NAME, CapacityStatistics::expanded),
    ];

    for (file_name, value) in outputs {
        let file_path = dir.join(file_name);
        let mut writer = csv::Writer::from_path(&file_path)
            .with_context(|| format!("Could not create {}", file_path.display()))?;
        for stat in &stats {
            writer.serialize(StatisticsRow {
                component: stat.component.to_string(),
                carrier: &stat.carrier,
                value: value(stat),
            })?;
        }
        writer.flush()?;
    }

    Ok(())
}
