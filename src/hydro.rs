//! Turbine output limits for hydro schemes.
//!
//! A hydro scheme is modelled with a store (the reservoir), a flow link carrying water into the
//! turbine and a loss link representing the turbine itself. Turbine output is limited by a linear
//! function of the reservoir level and the upstream flow:
//!
//! ```text
//! p_loss <= store_coefficient * e / e_nom
//!           + flow_coefficient * p_flow / p_nom_flow
//!           + store_constant
//! ```
use crate::id::AssetID;
use crate::network::{ComponentType, Network};
use crate::optimisation::{
    ConstraintKey, ConstraintRow, ConstraintSense, LinearExpression, OptimisationModel,
};
use crate::outcome::{Outcome, SkipReason};
use anyhow::{Context, Result, ensure};
use log::info;

/// Links column naming the link carrying water to the turbine
pub const FLOW_LINK_COLUMN: &str = "flow_link";
/// Links column naming the reservoir store
pub const STORE_COLUMN: &str = "store_eff";

/// One turbine efficiency constraint
#[derive(Debug, Clone, PartialEq)]
pub struct TurbineDefinition {
    /// The name of the constraint block
    pub name: String,
    /// The link representing the turbine
    pub loss_link: AssetID,
    /// The link carrying water to the turbine
    pub flow_link: String,
    /// The reservoir
    pub store: String,
}

/// Find the turbines defined in the links table
fn turbine_definitions(network: &Network) -> Vec<TurbineDefinition> {
    let links = network.links();
    links
        .ids()
        .enumerate()
        .filter_map(|(i, id)| {
            let flow_link = links.get(id, FLOW_LINK_COLUMN)?.as_reference()?;
            let store = links.get(id, STORE_COLUMN)?.as_reference()?;
            Some(TurbineDefinition {
                name: format!("Turbine{i}_eff"),
                loss_link: id.clone(),
                flow_link: flow_link.to_string(),
                store: store.to_string(),
            })
        })
        .collect()
}

/// Build the constraint rows for one turbine
fn turbine_rows(
    network: &Network,
    model: &impl OptimisationModel,
    turbine: &TurbineDefinition,
) -> Result<Vec<ConstraintRow>> {
    let links = network.links();
    let stores = network.table(ComponentType::Store);
    let TurbineDefinition {
        name,
        loss_link,
        flow_link,
        store,
    } = turbine;
    ensure!(
        links.contains(flow_link),
        "Unknown flow link {flow_link} for {name}"
    );
    ensure!(stores.contains(store), "Unknown store {store} for {name}");

    let store_coefficient = links.get_f64(loss_link, "store_coefficient")?;
    let flow_coefficient = links.get_f64(loss_link, "flow_coefficient")?;
    let store_constant = links.get_f64(loss_link, "store_constant")?;
    let e_nom = stores.get_f64(store, "e_nom")?;
    let flow_p_nom = links.get_f64(flow_link, "p_nom")?;
    ensure!(
        e_nom != 0.0 && flow_p_nom != 0.0,
        "Store {store} and flow link {flow_link} must have non-zero capacities for {name}"
    );

    let dispatch = model.variable("Link-p").context("No Link-p variable")?;
    let energy = model.variable("Store-e").context("No Store-e variable")?;
    (0..network.num_snapshots())
        .map(|t| {
            let expr = LinearExpression::new()
                .with_term(
                    dispatch.get(t, loss_link).context("Missing loss link")?,
                    1.0,
                )
                .with_term(
                    energy.get(t, store).context("Missing store")?,
                    -store_coefficient / e_nom,
                )
                .with_term(
                    dispatch.get(t, flow_link).context("Missing flow link")?,
                    -flow_coefficient / flow_p_nom,
                );
            Ok(ConstraintRow::new(
                ConstraintKey::at(t, loss_link.clone()),
                expr,
                ConstraintSense::LessEqual,
                store_constant,
            ))
        })
        .collect()
}

/// Add turbine efficiency constraints for every link which names both a flow link and a store.
///
/// Returns the names of the constraints added. Does nothing if either column is absent.
pub fn add_hydro_turbine_efficiency(
    network: &Network,
    model: &mut impl OptimisationModel,
) -> Result<Outcome<Vec<String>>> {
    let links = network.links();
    for column in [FLOW_LINK_COLUMN, STORE_COLUMN] {
        if !links.has_column(column) {
            info!("No {column} column for links: no hydro turbine efficiency constraints");
            return Ok(SkipReason::MissingColumn {
                component: ComponentType::Link,
                column: column.to_string(),
            }
            .into());
        }
    }

    let turbines = turbine_definitions(network);
    let blocks = turbines
        .iter()
        .map(|turbine| Ok((turbine, turbine_rows(network, model, turbine)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut added = Vec::with_capacity(blocks.len());
    for (turbine, rows) in blocks {
        info!(
            "Adding {} for {} (flow link {}, store {})",
            turbine.name, turbine.loss_link, turbine.flow_link, turbine.store
        );
        model.add_constraints(&turbine.name, rows)?;
        added.push(turbine.name.clone());
    }

    Ok(Outcome::Applied(added))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{add_asset, network};
    use crate::network::Value;
    use crate::optimisation::create_model;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    /// Add a turbine link Lk3 fed by Lk2 from store S1
    #[fixture]
    fn hydro_network(mut network: Network) -> Network {
        add_asset(
            &mut network,
            ComponentType::Link,
            "Lk3",
            vec![
                ("bus0", "B2".into()),
                ("bus1", "B1".into()),
                ("p_nom", 30.0.into()),
                (FLOW_LINK_COLUMN, "Lk2".into()),
                (STORE_COLUMN, "S1".into()),
                ("store_coefficient", 0.5.into()),
                ("flow_coefficient", 0.25.into()),
                ("store_constant", 2.0.into()),
            ],
        );
        network
    }

    #[rstest]
    fn test_add_hydro_turbine_efficiency(hydro_network: Network) {
        let mut model = create_model(&hydro_network).unwrap();
        let outcome = add_hydro_turbine_efficiency(&hydro_network, &mut model).unwrap();
        assert_eq!(outcome, Outcome::Applied(vec!["Turbine2_eff".to_string()]));

        let rows = model.constraint("Turbine2_eff").unwrap();
        assert_eq!(rows.len(), 2);
        let row = &rows[1];
        let dispatch = model.variable("Link-p").unwrap();
        let energy = model.variable("Store-e").unwrap();
        assert_eq!(row.sense, ConstraintSense::LessEqual);
        assert_eq!(row.rhs, 2.0);
        assert_eq!(
            row.expression.coefficient(dispatch.get(1, "Lk3").unwrap()),
            1.0
        );
        // e_nom of S1 is 100, p_nom of Lk2 is 50
        assert_approx_eq!(
            f64,
            row.expression.coefficient(energy.get(1, "S1").unwrap()),
            -0.005
        );
        assert_approx_eq!(
            f64,
            row.expression.coefficient(dispatch.get(1, "Lk2").unwrap()),
            -0.005
        );
    }

    #[rstest]
    fn test_no_columns(network: Network) {
        let mut model = create_model(&network).unwrap();
        assert!(
            !add_hydro_turbine_efficiency(&network, &mut model)
                .unwrap()
                .is_applied()
        );
    }

    #[rstest]
    fn test_zero_reference_ignored(mut hydro_network: Network) {
        hydro_network
            .table_mut(ComponentType::Link)
            .set("Lk3", FLOW_LINK_COLUMN, Value::Number(0.0))
            .unwrap();
        let mut model = create_model(&hydro_network).unwrap();
        assert_eq!(
            add_hydro_turbine_efficiency(&hydro_network, &mut model).unwrap(),
            Outcome::Applied(Vec::new())
        );
    }

    #[rstest]
    fn test_unknown_store(mut hydro_network: Network) {
        hydro_network
            .table_mut(ComponentType::Link)
            .set("Lk3", STORE_COLUMN, "S9".into())
            .unwrap();
        let mut model = create_model(&hydro_network).unwrap();
        assert!(add_hydro_turbine_efficiency(&hydro_network, &mut model).is_err());
        assert!(model.constraint("Turbine2_eff").is_none());
    }
}
