//! Spinning reserve constraints for groups of links.
//!
//! Links are assigned to reserve areas through the `reserve_area` column of the links table. Each
//! `reserve_level_*` column gives the share of a link's capacity which counts towards that level.
//! For every (level, area) pair with a requirement, a reserve variable is added for each link in
//! the area, and the model is constrained so that:
//!
//! * the total reserve in the area meets the requirement at every snapshot;
//! * dispatch plus reserve stays within the link's capacity scaled by its level factor (links with
//!   an empty factor cell have no such limit); and
//! * a link provides no more reserve than it dispatches (scaled by the lower limit factor).
use crate::id::AssetID;
use crate::network::{ComponentType, Network};
use crate::optimisation::{
    ConstraintKey, ConstraintRow, ConstraintSense, LinearExpression, OptimisationModel,
    VariableEntry, VariableKey,
};
use crate::outcome::{Outcome, SkipReason};
use anyhow::{Context, Result, ensure};
use log::{debug, info};

pub mod areas;
pub use areas::{AreaLinks, discover_areas, discover_levels, partition_area};
pub mod requirements;
pub use requirements::{RESERVES_FILE_NAME, ReserveKey, ReserveRequirements};

/// Options for building reserve constraints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReserveOptions {
    /// The factor in `reserve <= dispatch * factor`
    pub lower_limit_factor: f64,
}

impl Default for ReserveOptions {
    fn default() -> Self {
        Self {
            lower_limit_factor: 1.0,
        }
    }
}

/// The names of everything added to the model for one (level, area) pair
#[derive(Debug, Clone, PartialEq)]
pub struct AddedReserve {
    /// The level and area
    pub key: ReserveKey,
    /// The required reserve capacity (MW)
    pub required_mw: f64,
    /// The reserve variable
    pub variable: String,
    /// The sum, upper limit and lower limit constraints, in that order
    pub constraints: [String; 3],
}

/// What the reserve builder did
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReserveReport {
    /// The reserve areas found in the links table
    pub areas: Vec<String>,
    /// The reserve levels found in the links table
    pub levels: Vec<String>,
    /// Pairs for which constraints were added
    pub added: Vec<AddedReserve>,
    /// Pairs with no requirement, which were skipped
    pub skipped: Vec<ReserveKey>,
    /// Requirements which did not match any pair
    pub unused_requirements: Vec<String>,
}

impl ReserveReport {
    /// The names of all constraints added
    pub fn constraint_names(&self) -> impl Iterator<Item = &str> {
        self.added
            .iter()
            .flat_map(|added| added.constraints.iter().map(String::as_str))
    }
}

/// Everything needed to add the constraints for one (level, area) pair
struct ReservePlan {
    added: AddedReserve,
    /// Links in the area with their capacity and level factor, if they have one
    links: Vec<(AssetID, f64, Option<f64>)>,
}

impl ReservePlan {
    fn new(network: &Network, key: ReserveKey, required_mw: f64, area: &AreaLinks) -> Result<Self> {
        let table = network.links();
        let links = area
            .all
            .iter()
            .map(|id| {
                let p_nom = table.get_f64(id, "p_nom")?;
                let factor = table
                    .get_f64_opt(id, &key.level)?
                    .filter(|factor| !factor.is_nan());
                if factor.is_none() {
                    debug!("Link {id} has no {} factor: no reserve upper limit", key.level);
                }
                Ok((id.clone(), p_nom, factor))
            })
            .collect::<Result<Vec<_>>>()?;

        let suffix = format!("{key}_{required_mw}");
        let added = AddedReserve {
            variable: format!("Link-p_reserves-{suffix}"),
            constraints: [
                format!("GlobalReserveConstraint-sum_of_reserves-{suffix}"),
                format!("GlobalReserveConstraint-reserve_upper_limit-{suffix}"),
                format!("GlobalReserveConstraint-reserve_lower_limit-{suffix}"),
            ],
            key,
            required_mw,
        };

        Ok(Self { added, links })
    }

    /// Check that nothing in this plan is already in the model
    fn check_unused_names(&self, model: &impl OptimisationModel) -> Result<()> {
        let added = &self.added;
        ensure!(
            model.variable(&added.variable).is_none()
                && added
                    .constraints
                    .iter()
                    .all(|name| model.constraint(name).is_none()),
            "Reserve constraints for {} have already been added to the model",
            added.key
        );

        Ok(())
    }

    fn apply(
        &self,
        network: &Network,
        model: &mut impl OptimisationModel,
        options: &ReserveOptions,
    ) -> Result<()> {
        let num_snapshots = network.num_snapshots();
        let entries = (0..num_snapshots)
            .flat_map(|t| {
                self.links.iter().map(move |(id, p_nom, _)| {
                    VariableEntry::new(VariableKey::temporal(t, id.clone()), 0.0, *p_nom)
                })
            })
            .collect();
        model.add_variables(&self.added.variable, entries)?;

        let reserve = model
            .variable(&self.added.variable)
            .context("Reserve variable just added")?;
        let dispatch = model
            .variable("Link-p")
            .context("No Link-p variable in the model")?;

        let mut sum_rows = Vec::with_capacity(num_snapshots);
        let mut upper_rows = Vec::new();
        let mut lower_rows = Vec::new();
        for t in 0..num_snapshots {
            let mut total = LinearExpression::new();
            for (id, p_nom, factor) in &self.links {
                let r = reserve.get(t, id).context("Missing reserve variable")?;
                let p = dispatch
                    .get(t, id)
                    .with_context(|| format!("No Link-p variable for {id}"))?;
                total.add_term(r, 1.0);

                if let Some(factor) = factor {
                    upper_rows.push(ConstraintRow::new(
                        ConstraintKey::at(t, id.clone()),
                        LinearExpression::from_var(p).with_term(r, 1.0),
                        ConstraintSense::LessEqual,
                        p_nom * factor,
                    ));
                }
                lower_rows.push(ConstraintRow::new(
                    ConstraintKey::at(t, id.clone()),
                    LinearExpression::from_var(r).with_term(p, -options.lower_limit_factor),
                    ConstraintSense::LessEqual,
                    0.0,
                ));
            }
            sum_rows.push(ConstraintRow::new(
                ConstraintKey::snapshot(t),
                total,
                ConstraintSense::GreaterEqual,
                self.added.required_mw,
            ));
        }

        let [sum_name, upper_name, lower_name] = &self.added.constraints;
        model.add_constraints(sum_name, sum_rows)?;
        model.add_constraints(upper_name, upper_rows)?;
        model.add_constraints(lower_name, lower_rows)?;

        Ok(())
    }
}

/// Add reserve variables and constraints for every (level, area) pair with a requirement.
///
/// Pairs without a requirement are skipped and listed in the report. Nothing is added to the
/// model if any of the input is malformed, or if constraints with the same names already exist.
pub fn build_reserve_constraints(
    network: &Network,
    model: &mut impl OptimisationModel,
    requirements: &ReserveRequirements,
    options: &ReserveOptions,
) -> Result<Outcome<ReserveReport>> {
    let links = network.links();
    if !links.has_column(areas::AREA_COLUMN) {
        info!("No {} column for links: no reserves added", areas::AREA_COLUMN);
        return Ok(SkipReason::MissingColumn {
            component: ComponentType::Link,
            column: areas::AREA_COLUMN.to_string(),
        }
        .into());
    }

    let areas = discover_areas(links)?;
    info!("Found reserve areas: {areas:?}");
    if areas.is_empty() {
        return Ok(SkipReason::NoReserveAreas.into());
    }
    let levels = discover_levels(links);
    info!("Found reserve levels: {levels:?}");
    if levels.is_empty() {
        return Ok(SkipReason::NoReserveLevels.into());
    }
    ensure!(
        model.variable("Link-p").is_some(),
        "No Link-p variable in the model"
    );

    let area_links = areas
        .iter()
        .map(|area| {
            let links = partition_area(links, area)?;
            debug!("Links in {area}: {links:?}");
            Ok(links)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut plans = Vec::new();
    let mut report = ReserveReport {
        areas: areas.clone(),
        levels: levels.clone(),
        ..ReserveReport::default()
    };
    let keys: Vec<_> = levels
        .iter()
        .flat_map(|level| areas.iter().map(move |area| ReserveKey::new(level, area)))
        .collect();
    let requirements = requirements.resolve(&keys);
    for level in &levels {
        for (area, links_in_area) in areas.iter().zip(&area_links) {
            let key = ReserveKey::new(level, area);
            match requirements.get(&key) {
                Some(required_mw) => {
                    plans.push(ReservePlan::new(network, key, required_mw, links_in_area)?);
                }
                None => {
                    info!("{level} and {area} not found in reserve requirements. Skipping.");
                    report.skipped.push(key);
                }
            }
        }
    }
    report.unused_requirements = requirements.unused;
    for unused in &report.unused_requirements {
        info!("Reserve requirement {unused} does not match any reserve level and area");
    }

    for plan in &plans {
        plan.check_unused_names(model)?;
    }
    for plan in plans {
        info!(
            "Adding reserve constraints for {} >= {} MW",
            plan.added.key, plan.added.required_mw
        );
        plan.apply(network, model, options)?;
        report.added.push(plan.added);
    }

    for name in report.constraint_names() {
        debug!("Added reserve constraint {name}");
    }
    for key in &report.skipped {
        debug!("Skipped reserve constraint {key}");
    }

    Ok(Outcome::Applied(report))
}
