//! Constraints which keep the capacities of related assets equal.
use crate::network::{ComponentType, Network};
use crate::optimisation::{
    ConstraintKey, ConstraintRow, ConstraintSense, LinearExpression, OptimisationModel, Variable,
};
use crate::outcome::{Outcome, SkipReason, SkippedPair};
use anyhow::Result;
use log::info;

/// Links column naming another link which must have the same capacity
pub const LINK_RELATIONSHIP_COLUMN: &str = "link_relationship";
/// Storage units column naming the link which must have the same capacity as the battery
pub const STORAGE_LINK_COLUMN: &str = "su_link_mw";

/// What a coupling builder did
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CouplingReport {
    /// The names of the equality constraints added
    pub added: Vec<String>,
    /// Pairs which could not be coupled
    pub skipped: Vec<SkippedPair>,
}

impl CouplingReport {
    fn skip(&mut self, left: &str, right: &str, reason: String) {
        let pair = SkippedPair {
            left: left.to_string(),
            right: right.to_string(),
            reason,
        };
        info!("Not coupling capacities of {pair}");
        self.skipped.push(pair);
    }
}

/// The results of both coupling builders
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingOutcome {
    /// Link to link coupling
    pub links: Outcome<CouplingReport>,
    /// Link to battery coupling
    pub batteries: Outcome<CouplingReport>,
}

/// Add both link to link and link to battery capacity coupling
pub fn couple_linked_capacities(
    network: &Network,
    model: &mut impl OptimisationModel,
) -> Result<CouplingOutcome> {
    let batteries = couple_link_battery_capacities(network, model)?;
    let links = couple_link_capacities(network, model)?;
    Ok(CouplingOutcome { links, batteries })
}

/// Constrain two capacity variables to be equal
fn add_equal_capacity(
    model: &mut impl OptimisationModel,
    name: &str,
    left: Variable,
    right: Variable,
) -> Result<()> {
    let row = ConstraintRow::new(
        ConstraintKey::scalar(),
        LinearExpression::from_var(left).with_term(right, -1.0),
        ConstraintSense::Equal,
        0.0,
    );
    model.add_constraints(name, vec![row])
}

/// Make each link's capacity equal that of the link named in its `link_relationship` column.
///
/// Pairs are only coupled if both links are extendable; other pairs are skipped.
pub fn couple_link_capacities(
    network: &Network,
    model: &mut impl OptimisationModel,
) -> Result<Outcome<CouplingReport>> {
    let links = network.links();
    if !links.has_column(LINK_RELATIONSHIP_COLUMN) {
        info!("No {LINK_RELATIONSHIP_COLUMN} column for links");
        return Ok(SkipReason::MissingColumn {
            component: ComponentType::Link,
            column: LINK_RELATIONSHIP_COLUMN.to_string(),
        }
        .into());
    }

    let mut report = CouplingReport::default();
    for (left, value) in links.iter_column(LINK_RELATIONSHIP_COLUMN) {
        let Some(right) = value.as_reference() else {
            continue;
        };
        if !links.contains(right) {
            report.skip(left, right, format!("unknown link {right}"));
            continue;
        }

        let left_ext = links.is_extendable(left)?;
        let right_ext = links.is_extendable(right)?;
        if !(left_ext && right_ext) {
            report.skip(
                left,
                right,
                format!("{left} extendable {left_ext}, {right} extendable {right_ext}"),
            );
            continue;
        }

        let capacities = model.variable("Link-p_nom");
        let (Some(left_var), Some(right_var)) = (
            capacities.and_then(|vars| vars.get_fixed(left)),
            capacities.and_then(|vars| vars.get_fixed(right)),
        ) else {
            report.skip(left, right, "no capacity variables in the model".into());
            continue;
        };

        let name = format!("fix_{left}_{right}_capacity");
        add_equal_capacity(model, &name, left_var, right_var)?;
        info!("Added fixed link capacity for {left} and {right}");
        report.added.push(name);
    }

    Ok(Outcome::Applied(report))
}

/// Make the capacity of each battery equal that of the link named in its `su_link_mw` column.
///
/// Skipped altogether if the model has no storage unit capacity variables (e.g. there are no
/// extendable batteries this year).
pub fn couple_link_battery_capacities(
    network: &Network,
    model: &mut impl OptimisationModel,
) -> Result<Outcome<CouplingReport>> {
    let storage_units = network.table(ComponentType::StorageUnit);
    if !storage_units.has_column(STORAGE_LINK_COLUMN) {
        info!("No {STORAGE_LINK_COLUMN} column for storage units");
        return Ok(SkipReason::MissingColumn {
            component: ComponentType::StorageUnit,
            column: STORAGE_LINK_COLUMN.to_string(),
        }
        .into());
    }
    if model.variable("StorageUnit-p_nom").is_none() {
        info!("Current year does not have any storage unit capacity to couple");
        return Ok(SkipReason::NoStorageCapacityVariable.into());
    }

    let definitions: Vec<_> = storage_units
        .iter_column(STORAGE_LINK_COLUMN)
        .filter_map(|(su, value)| value.as_reference().map(|link| (link, su)))
        .collect();

    let mut report = CouplingReport::default();
    for (link, su) in definitions {
        let link_var = model
            .variable("Link-p_nom")
            .and_then(|vars| vars.get_fixed(link));
        let su_var = model
            .variable("StorageUnit-p_nom")
            .and_then(|vars| vars.get_fixed(su));
        let (Some(link_var), Some(su_var)) = (link_var, su_var) else {
            report.skip(link, su, "both must be extendable".into());
            continue;
        };

        let name = format!("Link-battery_{su}");
        add_equal_capacity(model, &name, link_var, su_var)?;
        info!("Added link-battery capacity coupling for {link} and {su}");
        report.added.push(name);
    }

    Ok(Outcome::Applied(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{add_asset, network};
    use crate::network::Value;
    use crate::optimisation::{LinearModel, create_model};
    use rstest::rstest;

    /// Add Lk3, an extendable copy of Lk1, and set Lk1's relationship to `target`
    fn with_relationship(mut network: Network, target: &str) -> Network {
        add_asset(
            &mut network,
            ComponentType::Link,
            "Lk3",
            vec![
                ("bus0", "B1".into()),
                ("bus1", "B2".into()),
                ("p_nom_extendable", true.into()),
            ],
        );
        network
            .table_mut(ComponentType::Link)
            .set("Lk1", LINK_RELATIONSHIP_COLUMN, target.into())
            .unwrap();
        network
    }

    #[rstest]
    fn test_couple_link_capacities(network: Network) {
        let network = with_relationship(network, "Lk3");
        let mut model = create_model(&network).unwrap();
        let outcome = couple_link_capacities(&network, &mut model).unwrap();
        let report = outcome.applied().unwrap();
        assert_eq!(report.added, ["fix_Lk1_Lk3_capacity"]);
        assert!(report.skipped.is_empty());

        let capacities = model.variable("Link-p_nom").unwrap();
        let row = &model.constraint("fix_Lk1_Lk3_capacity").unwrap()[0];
        assert_eq!(row.sense, ConstraintSense::Equal);
        assert_eq!(row.rhs, 0.0);
        assert_eq!(
            row.expression
                .coefficient(capacities.get_fixed("Lk1").unwrap()),
            1.0
        );
        assert_eq!(
            row.expression
                .coefficient(capacities.get_fixed("Lk3").unwrap()),
            -1.0
        );
    }

    #[rstest]
    fn test_couple_link_capacities_one_side_fixed(network: Network) {
        // Lk2 is not extendable
        let network = with_relationship(network, "Lk2");
        let mut model = create_model(&network).unwrap();
        let num_rows = model.num_rows();
        let outcome = couple_link_capacities(&network, &mut model).unwrap();
        let report = outcome.applied().unwrap();
        assert!(report.added.is_empty());
        assert_eq!(
            report.skipped,
            [SkippedPair {
                left: "Lk1".into(),
                right: "Lk2".into(),
                reason: "Lk1 extendable true, Lk2 extendable false".into()
            }]
        );
        assert_eq!(model.num_rows(), num_rows);
    }

    #[rstest]
    #[case("0")]
    #[case("")]
    fn test_couple_link_capacities_no_reference(network: Network, #[case] target: &str) {
        let network = with_relationship(network, target);
        let mut model = create_model(&network).unwrap();
        let outcome = couple_link_capacities(&network, &mut model).unwrap();
        assert_eq!(outcome, Outcome::Applied(CouplingReport::default()));
    }

    #[rstest]
    fn test_couple_link_capacities_unknown_target(network: Network) {
        let network = with_relationship(network, "Lk9");
        let mut model = create_model(&network).unwrap();
        let outcome = couple_link_capacities(&network, &mut model).unwrap();
        assert_eq!(outcome.applied().unwrap().skipped.len(), 1);
    }

    #[test]
    fn test_couple_link_capacities_no_column() {
        let network = Network::default();
        let mut model = LinearModel::new();
        assert!(
            !couple_link_capacities(&network, &mut model)
                .unwrap()
                .is_applied()
        );
    }

    #[rstest]
    fn test_couple_link_battery_capacities(mut network: Network) {
        network
            .table_mut(ComponentType::StorageUnit)
            .set("SU1", STORAGE_LINK_COLUMN, "Lk1".into())
            .unwrap();
        let mut model = create_model(&network).unwrap();
        let outcome = couple_link_battery_capacities(&network, &mut model).unwrap();
        assert_eq!(outcome.applied().unwrap().added, ["Link-battery_SU1"]);
        assert!(model.constraint("Link-battery_SU1").is_some());
    }

    #[rstest]
    fn test_couple_link_battery_no_storage_capacity(mut network: Network) {
        let storage_units = network.table_mut(ComponentType::StorageUnit);
        storage_units
            .set("SU1", STORAGE_LINK_COLUMN, "Lk1".into())
            .unwrap();
        storage_units
            .set("SU1", "p_nom_extendable", Value::Bool(false))
            .unwrap();
        let mut model = create_model(&network).unwrap();
        assert_eq!(
            couple_link_battery_capacities(&network, &mut model).unwrap(),
            Outcome::Skipped(SkipReason::NoStorageCapacityVariable)
        );
    }

    #[rstest]
    fn test_couple_link_battery_fixed_link(mut network: Network) {
        network
            .table_mut(ComponentType::StorageUnit)
            .set("SU1", STORAGE_LINK_COLUMN, "Lk2".into())
            .unwrap();
        let mut model = create_model(&network).unwrap();
        let outcome = couple_link_battery_capacities(&network, &mut model).unwrap();
        let report = outcome.applied().unwrap();
        assert!(report.added.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }
}
