//! Discovering reserve areas and levels from the links table.
use crate::id::AssetID;
use crate::network::{ComponentTable, Value};
use anyhow::{Result, bail};
use itertools::Itertools;

/// The links column holding each link's reserve area
pub const AREA_COLUMN: &str = "reserve_area";
/// Text which a reserve area name must contain
pub const AREA_MARKER: &str = "reserve_area";
/// Text which marks a links column as a reserve level
pub const LEVEL_MARKER: &str = "reserve_level_";

/// The links belonging to one reserve area
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AreaLinks {
    /// Every link in the area
    pub all: Vec<AssetID>,
    /// Links whose capacity is optimised
    pub extendable: Vec<AssetID>,
    /// Links with a fixed capacity, with that capacity
    pub non_extendable: Vec<(AssetID, f64)>,
}

/// Find the distinct reserve areas named in the links table, sorted by name.
///
/// Empty cells, zero and `"0"` mean a link is not in any area. Other names are only used if they
/// contain [`AREA_MARKER`]. Any other kind of value is an error.
pub fn discover_areas(links: &ComponentTable) -> Result<Vec<String>> {
    let mut areas = Vec::new();
    for (id, value) in links.iter_column(AREA_COLUMN) {
        match value {
            Value::Missing => {}
            Value::Number(number) if *number == 0.0 => {}
            Value::Text(text) if text == "0" => {}
            Value::Text(text) if text.contains(AREA_MARKER) => areas.push(text.as_str()),
            Value::Text(text) => {
                log::debug!("Ignoring reserve area {text} of link {id}: not a reserve area name");
            }
            other => bail!("Invalid reserve area for link {id}: {other}"),
        }
    }

    Ok(areas
        .into_iter()
        .unique()
        .sorted()
        .map(str::to_string)
        .collect())
}

/// Find the reserve level columns of the links table, in column order
pub fn discover_levels(links: &ComponentTable) -> Vec<String> {
    links
        .columns()
        .filter(|column| column.contains(LEVEL_MARKER))
        .map(str::to_string)
        .collect()
}

/// Split the links of a reserve area by whether their capacity is optimised
pub fn partition_area(links: &ComponentTable, area: &str) -> Result<AreaLinks> {
    let mut out = AreaLinks::default();
    for (id, value) in links.iter_column(AREA_COLUMN) {
        if !matches!(value, Value::Text(text) if text == area) {
            continue;
        }

        out.all.push(id.clone());
        if links.is_extendable(id)? {
            out.extendable.push(id.clone());
        } else {
            out.non_extendable
                .push((id.clone(), links.get_f64(id, "p_nom")?));
        }
    }

    Ok(out)
}
