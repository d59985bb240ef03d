//! Adjustments to capacities and capacity bounds between study runs.
use crate::id::AssetID;
use crate::network::{ComponentType, Network, Value};
use crate::outcome::{Outcome, SkipReason};
use anyhow::{Context, Result, ensure};
use log::{info, warn};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Flags assets whose minimum capacity should not follow the previous year
pub const DO_NOT_FIX_COLUMN: &str = "do_not_fix";
/// Flags assets which should be made extendable
pub const MAKE_EXTENDABLE_COLUMN: &str = "make_ext";
/// Flags links which stand in for planned plant
pub const PROXY_FLAG_COLUMN: &str = "proxy_flag";

/// An asset of a given component type
pub type ComponentAsset = (ComponentType, AssetID);

/// Minimum capacities carried over from the previous year
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriorTransfer {
    /// The network the capacities were read from
    pub prior_dir: PathBuf,
    /// Assets whose minimum capacity was set, with the new value
    pub fixed: Vec<(ComponentType, AssetID, f64)>,
    /// Extendable assets which were not extendable in the previous year, so were left alone
    pub not_in_prior: Vec<ComponentAsset>,
}

/// What [`fix_n_minus_capacities`] did
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuityReport {
    /// The result of carrying over capacities from the previous year
    pub prior: Outcome<PriorTransfer>,
    /// Assets whose minimum capacity was reset to zero because they are flagged `do_not_fix`
    pub reset: Vec<ComponentAsset>,
}

/// The path of the same folder for the previous year.
///
/// The path component equal to `current_year` is replaced with the year before.
pub fn prior_year_path(path: &Path, current_year: u32) -> Result<PathBuf> {
    let previous_year = current_year
        .checked_sub(1)
        .with_context(|| format!("Year {current_year} has no previous year"))?;
    let current = current_year.to_string();

    let mut found = false;
    let prior: PathBuf = path
        .components()
        .map(|component| match component {
            Component::Normal(name) if name == OsStr::new(&current) && !found => {
                found = true;
                PathBuf::from(previous_year.to_string())
            }
            other => PathBuf::from(other.as_os_str()),
        })
        .collect();
    ensure!(
        found,
        "Path {} does not contain the year {current_year}",
        path.display()
    );

    Ok(prior)
}

/// Carry optimised capacities over from the previous study year.
///
/// The minimum capacity of every extendable asset is set to the optimised capacity of the same
/// asset in the previous year's network, found by replacing the year in `path`. If there is no
/// network for the previous year, bounds are left as they are.
///
/// Whether or not the previous year was found, extendable assets flagged `do_not_fix` then have
/// their minimum capacity reset to zero.
pub fn fix_n_minus_capacities(
    path: &Path,
    network: &mut Network,
    current_year: u32,
) -> Result<ContinuityReport> {
    let prior_dir = prior_year_path(path, current_year)?;
    let prior = if Network::exists_at(&prior_dir) {
        let prior_network = Network::from_csv_folder(&prior_dir)?;
        let transfer = transfer_capacities(&prior_network, network, prior_dir)?;
        Outcome::Applied(transfer)
    } else {
        info!(
            "There does not seem to be a network for year {} at {}",
            current_year - 1,
            prior_dir.display()
        );
        Outcome::Skipped(SkipReason::PriorYearMissing(prior_dir))
    };

    let reset = reset_do_not_fix(network)?;

    Ok(ContinuityReport { prior, reset })
}

fn transfer_capacities(
    prior: &Network,
    network: &mut Network,
    prior_dir: PathBuf,
) -> Result<PriorTransfer> {
    let mut transfer = PriorTransfer {
        prior_dir,
        ..PriorTransfer::default()
    };

    for (component, attr) in ComponentType::iter_with_capacity() {
        let prior_table = prior.table(component);
        let prior_ext: HashSet<AssetID> = prior_table.extendable_ids()?.into_iter().collect();

        let table = network.table_mut(component);
        for id in table.extendable_ids()? {
            if !prior_ext.contains(&id) {
                warn!(
                    "{component} {id} is extendable but was not extendable in the previous year"
                );
                transfer.not_in_prior.push((component, id));
                continue;
            }

            let value = prior_table
                .get_f64(&id, attr.opt())
                .with_context(|| format!("No optimised capacity for {component} {id}"))?;
            table.set(&id, attr.min(), Value::from(value))?;
            transfer.fixed.push((component, id, value));
        }
    }
    info!(
        "Fixed minimum capacity of {} assets to previous year",
        transfer.fixed.len()
    );

    Ok(transfer)
}

/// Reset the minimum capacity of extendable assets flagged `do_not_fix` to zero
fn reset_do_not_fix(network: &mut Network) -> Result<Vec<ComponentAsset>> {
    let mut reset = Vec::new();
    for (component, attr) in ComponentType::iter_with_capacity() {
        let table = network.table_mut(component);
        if !table.has_column(DO_NOT_FIX_COLUMN) {
            continue;
        }

        let flagged: Vec<_> = table
            .iter_column(DO_NOT_FIX_COLUMN)
            .filter(|(_, value)| value.is_one())
            .map(|(id, _)| id.clone())
            .collect();
        for id in flagged {
            if table.is_extendable(&id)? {
                table.set(&id, attr.min(), Value::from(0.0))?;
                reset.push((component, id));
            }
        }
    }
    if !reset.is_empty() {
        info!("Reset minimum capacity to zero for do_not_fix assets: {reset:?}");
    }

    Ok(reset)
}

/// Fix capacities at their optimised values.
///
/// For every extendable asset the capacity is set to the optimised capacity, then every asset is
/// made non-extendable.
pub fn make_all_non_extendable(network: &mut Network) -> Result<()> {
    for (component, attr) in ComponentType::iter_with_capacity() {
        let table = network.table_mut(component);
        if table.is_empty() {
            continue;
        }

        for id in table.extendable_ids()? {
            let value = table
                .get_f64_opt(&id, attr.opt())?
                .with_context(|| format!("No optimised capacity for {component} {id}"))?;
            table.set(&id, attr.name(), Value::from(value))?;
        }
        table.set_column(attr.extendable(), |_| Ok(Value::Bool(false)))?;
        info!("Made all {} non-extendable", component.list_name());
    }

    Ok(())
}

/// Make assets flagged with `make_ext` extendable.
///
/// Returns the assets changed. Tables without a `make_ext` column are left alone.
pub fn make_extendable(network: &mut Network) -> Result<Vec<ComponentAsset>> {
    let mut changed = Vec::new();
    for (component, attr) in ComponentType::iter_with_capacity() {
        let table = network.table_mut(component);
        if !table.has_column(MAKE_EXTENDABLE_COLUMN) {
            info!(
                "No {MAKE_EXTENDABLE_COLUMN} column for {}",
                component.list_name()
            );
            continue;
        }

        let flagged: Vec<_> = table
            .iter_column(MAKE_EXTENDABLE_COLUMN)
            .filter(|(_, value)| value.is_one())
            .map(|(id, _)| id.clone())
            .collect();
        for id in flagged {
            table.set(&id, attr.extendable(), Value::Bool(true))?;
            changed.push((component, id));
        }
    }

    Ok(changed)
}

/// Remove links standing in for planned plant.
///
/// Links with `proxy_flag` equal to one get a capacity and maximum capacity of zero and are made
/// non-extendable.
pub fn remove_proxy_plant(network: &mut Network) -> Result<Outcome<Vec<AssetID>>> {
    let links = network.table_mut(ComponentType::Link);
    if !links.has_column(PROXY_FLAG_COLUMN) {
        info!("The {PROXY_FLAG_COLUMN} column is not present for links");
        return Ok(SkipReason::MissingColumn {
            component: ComponentType::Link,
            column: PROXY_FLAG_COLUMN.to_string(),
        }
        .into());
    }

    let proxies: Vec<_> = links
        .iter_column(PROXY_FLAG_COLUMN)
        .filter(|(_, value)| value.is_one())
        .map(|(id, _)| id.clone())
        .collect();
    for id in &proxies {
        links.set(id, "p_nom_max", Value::from(0.0))?;
        links.set(id, "p_nom", Value::from(0.0))?;
        links.set(id, "p_nom_extendable", Value::Bool(false))?;
    }
    info!("Removed {} proxy plant", proxies.len());

    Ok(Outcome::Applied(proxies))
}
