//! The base capacity-expansion formulation for a network.
use super::{
    ConstraintKey, ConstraintRow, ConstraintSense, LinearExpression, LinearModel,
    OptimisationModel, VariableEntry, VariableKey,
};
use crate::id::AssetID;
use crate::network::{ComponentType, Network};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::collections::HashSet;

/// How a time-varying variable is limited by the capacity of its asset
#[derive(Clone, Copy)]
enum Limit {
    /// Always zero
    Zero,
    /// A per-unit attribute multiplied by the capacity
    PerUnit(&'static str),
    /// The negation of a per-unit attribute multiplied by the capacity
    NegatedPerUnit(&'static str),
    /// No limit
    Free,
}

impl Limit {
    /// The per-unit limit for an asset at a snapshot (`None` if unlimited)
    fn per_unit(
        self,
        network: &Network,
        component: ComponentType,
        id: &str,
        snapshot: usize,
    ) -> Result<Option<f64>> {
        Ok(match self {
            Self::Zero => Some(0.0),
            Self::PerUnit(attr) => Some(network.get_at(component, id, attr, snapshot)?),
            Self::NegatedPerUnit(attr) => Some(-network.get_at(component, id, attr, snapshot)?),
            Self::Free => None,
        })
    }
}

/// A time-varying variable for every asset of one component type
struct DispatchSpec {
    component: ComponentType,
    attr: &'static str,
    lower: Limit,
    upper: Limit,
    /// Column holding the cost per unit of the variable per hour
    cost: Option<&'static str>,
}

/// Build the model for a network: dispatch and capacity variables, energy balances for storage
/// and a power balance at every bus.
///
/// Model builders (reserves, coupling etc.) add to the model returned here.
pub fn create_model(network: &Network) -> Result<LinearModel> {
    use ComponentType::{Generator, Line, Link, StorageUnit, Store, Transformer};
    use Limit::{Free, NegatedPerUnit, PerUnit, Zero};

    let mut model = LinearModel::new();
    let mut balance = NodalBalance::new(network);

    for (component, _) in ComponentType::iter_with_capacity() {
        add_capacity_variables(&mut model, network, component)?;
    }

    let specs = [
        DispatchSpec {
            component: Generator,
            attr: "p",
            lower: PerUnit("p_min_pu"),
            upper: PerUnit("p_max_pu"),
            cost: Some("marginal_cost"),
        },
        DispatchSpec {
            component: Link,
            attr: "p",
            lower: PerUnit("p_min_pu"),
            upper: PerUnit("p_max_pu"),
            cost: Some("marginal_cost"),
        },
        DispatchSpec {
            component: Line,
            attr: "s",
            lower: NegatedPerUnit("s_max_pu"),
            upper: PerUnit("s_max_pu"),
            cost: None,
        },
        DispatchSpec {
            component: Transformer,
            attr: "s",
            lower: NegatedPerUnit("s_max_pu"),
            upper: PerUnit("s_max_pu"),
            cost: None,
        },
        DispatchSpec {
            component: StorageUnit,
            attr: "p_dispatch",
            lower: Zero,
            upper: PerUnit("p_max_pu"),
            cost: Some("marginal_cost"),
        },
        DispatchSpec {
            component: StorageUnit,
            attr: "p_store",
            lower: Zero,
            upper: NegatedPerUnit("p_min_pu"),
            cost: None,
        },
        DispatchSpec {
            component: StorageUnit,
            attr: "state_of_charge",
            lower: Zero,
            upper: PerUnit("max_hours"),
            cost: None,
        },
        DispatchSpec {
            component: Store,
            attr: "p",
            lower: Free,
            upper: Free,
            cost: Some("marginal_cost"),
        },
        DispatchSpec {
            component: Store,
            attr: "e",
            lower: PerUnit("e_min_pu"),
            upper: PerUnit("e_max_pu"),
            cost: None,
        },
    ];
    for spec in &specs {
        add_dispatch_variables(&mut model, network, spec)?;
    }

    add_storage_unit_balance(&mut model, network)?;
    add_store_balance(&mut model, network)?;

    balance.add_injections(&model, network)?;
    balance.add_to_model(&mut model, network)?;

    Ok(model)
}

/// Add capacity variables for the extendable assets of a component type.
///
/// No block is added if there are no extendable assets.
fn add_capacity_variables(
    model: &mut LinearModel,
    network: &Network,
    component: ComponentType,
) -> Result<()> {
    let Some(attr) = component.capacity_attr() else {
        return Ok(());
    };
    let table = network.table(component);
    let ext = table.extendable_ids()?;
    if ext.is_empty() {
        return Ok(());
    }

    let entries = ext
        .into_iter()
        .map(|id| {
            let lower = table.get_f64(&id, attr.min())?;
            let upper = table.get_f64(&id, attr.max())?;
            let cost = table.get_f64(&id, "capital_cost")?;
            Ok(VariableEntry::new(VariableKey::fixed(id), lower, upper).with_cost(cost))
        })
        .collect::<Result<Vec<_>>>()?;

    model.add_variables(&format!("{component}-{}", attr.name()), entries)
}

/// Add a time-varying variable for every asset of a component type.
///
/// Fixed-capacity assets have the limits applied as bounds; extendable assets get constraints
/// against their capacity variable instead.
fn add_dispatch_variables(
    model: &mut LinearModel,
    network: &Network,
    spec: &DispatchSpec,
) -> Result<()> {
    let component = spec.component;
    let table = network.table(component);
    if table.is_empty() {
        return Ok(());
    }
    let attr = component
        .capacity_attr()
        .with_context(|| format!("{component} has no capacity attribute"))?;
    let ext: HashSet<AssetID> = table.extendable_ids()?.into_iter().collect();

    let mut entries = Vec::with_capacity(network.num_snapshots() * table.len());
    for (t, weighting) in network.weightings().iter().enumerate() {
        for id in table.ids() {
            let (lower, upper) = if ext.contains(id) {
                (
                    extendable_bound(spec.lower, f64::NEG_INFINITY),
                    extendable_bound(spec.upper, f64::INFINITY),
                )
            } else {
                let capacity = table.get_f64(id, attr.name())?;
                (
                    fixed_bound(
                        spec.lower,
                        network,
                        component,
                        id,
                        t,
                        capacity,
                        f64::NEG_INFINITY,
                    )?,
                    fixed_bound(spec.upper, network, component, id, t, capacity, f64::INFINITY)?,
                )
            };
            let cost = match spec.cost {
                Some(column) => table.get_f64(id, column)? * weighting,
                None => 0.0,
            };
            entries.push(
                VariableEntry::new(VariableKey::temporal(t, id.clone()), lower, upper)
                    .with_cost(cost),
            );
        }
    }

    let name = format!("{component}-{}", spec.attr);
    model.add_variables(&name, entries)?;
    if ext.is_empty() {
        return Ok(());
    }

    // Limits for extendable assets, relative to the capacity variable
    let capacity_name = format!("{component}-{}", attr.name());
    let vars = model.variable(&name).context("Variable just added")?;
    let capacities = model
        .variable(&capacity_name)
        .with_context(|| format!("No {capacity_name} variable"))?;
    let mut lower_rows = Vec::new();
    let mut upper_rows = Vec::new();
    for t in 0..network.num_snapshots() {
        for id in table.ids().filter(|id| ext.contains(*id)) {
            let var = vars.get(t, id).context("Missing dispatch variable")?;
            let capacity = capacities.get_fixed(id).context("Missing capacity variable")?;
            for (limit, sense, rows) in [
                (spec.lower, ConstraintSense::GreaterEqual, &mut lower_rows),
                (spec.upper, ConstraintSense::LessEqual, &mut upper_rows),
            ] {
                if matches!(limit, Limit::Zero | Limit::Free) {
                    continue;
                }
                if let Some(per_unit) = limit.per_unit(network, component, id, t)? {
                    let expr = LinearExpression::from_var(var).with_term(capacity, -per_unit);
                    rows.push(ConstraintRow::new(
                        ConstraintKey::at(t, id.clone()),
                        expr,
                        sense,
                        0.0,
                    ));
                }
            }
        }
    }

    if !lower_rows.is_empty() {
        model.add_constraints(&format!("{component}-ext-{}-lower", spec.attr), lower_rows)?;
    }
    if !upper_rows.is_empty() {
        model.add_constraints(&format!("{component}-ext-{}-upper", spec.attr), upper_rows)?;
    }

    Ok(())
}

fn extendable_bound(limit: Limit, unbounded: f64) -> f64 {
    match limit {
        Limit::Zero => 0.0,
        _ => unbounded,
    }
}

fn fixed_bound(
    limit: Limit,
    network: &Network,
    component: ComponentType,
    id: &str,
    snapshot: usize,
    capacity: f64,
    unbounded: f64,
) -> Result<f64> {
    Ok(match limit.per_unit(network, component, id, snapshot)? {
        Some(per_unit) if per_unit == 0.0 => 0.0,
        Some(per_unit) => per_unit * capacity,
        None => unbounded,
    })
}

/// The snapshot before `t`, wrapping round if cyclic, or `None` at the start of a non-cyclic
/// horizon
fn previous_snapshot(t: usize, num_snapshots: usize, cyclic: bool) -> Option<usize> {
    match t {
        0 if cyclic => Some(num_snapshots - 1),
        0 => None,
        _ => Some(t - 1),
    }
}

/// State of charge of storage units follows charging, discharging, inflow and standing losses
fn add_storage_unit_balance(model: &mut LinearModel, network: &Network) -> Result<()> {
    let component = ComponentType::StorageUnit;
    let table = network.table(component);
    if table.is_empty() {
        return Ok(());
    }
    let var = |attr: &str| {
        model
            .variable(&format!("{component}-{attr}"))
            .with_context(|| format!("No {component}-{attr} variable"))
    };
    let (soc, dispatch, store) = (var("state_of_charge")?, var("p_dispatch")?, var("p_store")?);

    let mut rows = Vec::new();
    for id in table.ids() {
        let cyclic = table.get_bool(id, "cyclic_state_of_charge")?;
        let eff_store = table.get_f64(id, "efficiency_store")?;
        let eff_dispatch = table.get_f64(id, "efficiency_dispatch")?;
        let standing_loss = table.get_f64(id, "standing_loss")?;
        for (t, w) in network.weightings().iter().enumerate() {
            let retained = (1.0 - standing_loss).powf(*w);
            let mut expr = LinearExpression::new()
                .with_term(soc.get(t, id).context("Missing state of charge")?, 1.0)
                .with_term(store.get(t, id).context("Missing store")?, -eff_store * w)
                .with_term(
                    dispatch.get(t, id).context("Missing dispatch")?,
                    w / eff_dispatch,
                );
            let mut rhs = w * network.get_at(component, id, "inflow", t)?;
            match previous_snapshot(t, network.num_snapshots(), cyclic) {
                Some(prev) => {
                    expr.add_term(soc.get(prev, id).context("Missing state of charge")?, -retained);
                }
                None => rhs += retained * table.get_f64(id, "state_of_charge_initial")?,
            }
            rows.push(ConstraintRow::new(
                ConstraintKey::at(t, id.clone()),
                expr,
                ConstraintSense::Equal,
                rhs,
            ));
        }
    }

    model.add_constraints("StorageUnit-energy_balance", rows)
}

/// Energy level of stores follows their power output and standing losses
fn add_store_balance(model: &mut LinearModel, network: &Network) -> Result<()> {
    let component = ComponentType::Store;
    let table = network.table(component);
    if table.is_empty() {
        return Ok(());
    }
    let energy = model.variable("Store-e").context("No Store-e variable")?;
    let power = model.variable("Store-p").context("No Store-p variable")?;

    let mut rows = Vec::new();
    for id in table.ids() {
        let cyclic = table.get_bool(id, "e_cyclic")?;
        let standing_loss = table.get_f64(id, "standing_loss")?;
        for (t, w) in network.weightings().iter().enumerate() {
            let retained = (1.0 - standing_loss).powf(*w);
            let mut expr = LinearExpression::new()
                .with_term(energy.get(t, id).context("Missing energy")?, 1.0)
                .with_term(power.get(t, id).context("Missing power")?, *w);
            let mut rhs = 0.0;
            match previous_snapshot(t, network.num_snapshots(), cyclic) {
                Some(prev) => {
                    expr.add_term(energy.get(prev, id).context("Missing energy")?, -retained);
                }
                None => rhs += retained * table.get_f64(id, "e_initial")?,
            }
            rows.push(ConstraintRow::new(
                ConstraintKey::at(t, id.clone()),
                expr,
                ConstraintSense::Equal,
                rhs,
            ));
        }
    }

    model.add_constraints("Store-energy_balance", rows)
}

/// Power injected into each bus at each snapshot
struct NodalBalance {
    buses: IndexMap<AssetID, Vec<LinearExpression>>,
}

impl NodalBalance {
    fn new(network: &Network) -> Self {
        let buses = network
            .table(ComponentType::Bus)
            .ids()
            .map(|id| (id.clone(), vec![LinearExpression::new(); network.num_snapshots()]))
            .collect();
        Self { buses }
    }

    fn at(&mut self, bus: &str, snapshot: usize) -> Result<&mut LinearExpression> {
        let exprs = self
            .buses
            .get_mut(bus)
            .with_context(|| format!("Unknown bus {bus}"))?;
        Ok(&mut exprs[snapshot])
    }

    /// Add the contribution of every component's variables, and of loads
    fn add_injections(&mut self, model: &LinearModel, network: &Network) -> Result<()> {
        use ComponentType::{Generator, Line, Link, Load, StorageUnit, Store, Transformer};
        for (component, attr) in [(Generator, "p"), (Store, "p"), (StorageUnit, "p_dispatch")] {
            self.add_single(model, network, component, attr, 1.0)?;
        }
        self.add_single(model, network, StorageUnit, "p_store", -1.0)?;

        for component in [Line, Transformer] {
            self.add_branch(model, network, component, "s", false)?;
        }
        self.add_branch(model, network, Link, "p", true)?;

        let loads = network.table(Load);
        for id in loads.ids() {
            let bus = bus_of(network, Load, id, "bus")?;
            for t in 0..network.num_snapshots() {
                let demand = network.get_at(Load, id, "p_set", t)?;
                self.at(bus, t)?.add_constant(-demand);
            }
        }

        Ok(())
    }

    /// Components attached to a single bus
    fn add_single(
        &mut self,
        model: &LinearModel,
        network: &Network,
        component: ComponentType,
        attr: &str,
        sign: f64,
    ) -> Result<()> {
        let Some(vars) = model.variable(&format!("{component}-{attr}")) else {
            return Ok(());
        };
        for id in network.table(component).ids() {
            let bus = bus_of(network, component, id, "bus")?;
            for t in 0..network.num_snapshots() {
                let var = vars.get(t, id).context("Missing variable")?;
                self.at(bus, t)?.add_term(var, sign);
            }
        }

        Ok(())
    }

    /// Components flowing from `bus0` to `bus1`, optionally with an efficiency
    fn add_branch(
        &mut self,
        model: &LinearModel,
        network: &Network,
        component: ComponentType,
        attr: &str,
        with_efficiency: bool,
    ) -> Result<()> {
        let Some(vars) = model.variable(&format!("{component}-{attr}")) else {
            return Ok(());
        };
        for id in network.table(component).ids() {
            let bus0 = bus_of(network, component, id, "bus0")?;
            let bus1 = bus_of(network, component, id, "bus1")?;
            for t in 0..network.num_snapshots() {
                let var = vars.get(t, id).context("Missing variable")?;
                let efficiency = if with_efficiency {
                    network.get_at(component, id, "efficiency", t)?
                } else {
                    1.0
                };
                self.at(bus0, t)?.add_term(var, -1.0);
                self.at(bus1, t)?.add_term(var, efficiency);
            }
        }

        Ok(())
    }

    fn add_to_model(self, model: &mut LinearModel, network: &Network) -> Result<()> {
        let mut rows = Vec::with_capacity(self.buses.len() * network.num_snapshots());
        for t in 0..network.num_snapshots() {
            for (bus, exprs) in &self.buses {
                rows.push(ConstraintRow::new(
                    ConstraintKey::at(t, bus.clone()),
                    exprs[t].clone(),
                    ConstraintSense::Equal,
                    0.0,
                ));
            }
        }

        model.add_constraints("Bus-nodal_balance", rows)
    }
}

/// The bus an asset is attached to
fn bus_of<'a>(
    network: &'a Network,
    component: ComponentType,
    id: &str,
    column: &str,
) -> Result<&'a str> {
    network
        .table(component)
        .get_str(id, column)
        .with_context(|| format!("No {column} given for {component} {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::network;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_create_model_names(network: Network) {
        let model = create_model(&network).unwrap();
        let names = model.variable_names();
        for name in [
            "Generator-p",
            "Link-p",
            "Link-p_nom",
            "StorageUnit-p_dispatch",
            "StorageUnit-p_store",
            "StorageUnit-state_of_charge",
            "StorageUnit-p_nom",
            "Store-p",
            "Store-e",
        ] {
            assert!(names.contains(&name), "Missing variable {name}");
        }
        assert!(model.constraint("Bus-nodal_balance").is_some());
        assert!(model.constraint("Link-ext-p-upper").is_some());
        assert!(model.constraint("StorageUnit-energy_balance").is_some());
        assert!(model.constraint("Store-energy_balance").is_some());
    }

    #[rstest]
    fn test_fixed_link_bounds(network: Network) {
        let model = create_model(&network).unwrap();
        let p = model.variable("Link-p").unwrap();

        // Fixed link: bounds from p_nom
        let fixed = p.get(0, "Lk2").unwrap();
        assert_eq!(model.bounds(fixed), (0.0, 50.0));

        // Extendable link: unbounded, limited by constraints instead
        let ext = p.get(1, "Lk1").unwrap();
        assert_eq!(model.bounds(ext), (f64::NEG_INFINITY, f64::INFINITY));
        assert!(model.constraint("Link-ext-p-lower").is_some());
        let capacity = model.variable("Link-p_nom").unwrap().get_fixed("Lk1").unwrap();
        let row = model
            .constraint("Link-ext-p-upper")
            .unwrap()
            .iter()
            .find(|row| row.key == ConstraintKey::at(1, "Lk1".into()))
            .unwrap();
        assert_eq!(row.expression.coefficient(ext), 1.0);
        assert_eq!(row.expression.coefficient(capacity), -1.0);
        assert_eq!(row.rhs, 0.0);
    }

    #[rstest]
    fn test_nodal_balance(network: Network) {
        let model = create_model(&network).unwrap();
        let rows = model.constraint("Bus-nodal_balance").unwrap();
        let b1 = rows
            .iter()
            .find(|row| row.key == ConstraintKey::at(1, "B1".into()))
            .unwrap();

        // Load L1 at B1 has p_set 20 at the second snapshot
        assert_approx_eq!(f64, b1.rhs, 20.0);
        let generator = model.variable("Generator-p").unwrap().get(1, "G1").unwrap();
        assert_eq!(b1.expression.coefficient(generator), 1.0);
        let lk1 = model.variable("Link-p").unwrap().get(1, "Lk1").unwrap();
        assert_eq!(b1.expression.coefficient(lk1), -1.0);
    }

    #[rstest]
    fn test_generator_cost_weighted(mut network: Network) {
        network.set_weightings(vec![1.0, 3.0]).unwrap();
        let model = create_model(&network).unwrap();
        let generator = model.variable("Generator-p").unwrap().get(1, "G1").unwrap();
        let marginal_cost = network
            .table(ComponentType::Generator)
            .get_f64("G1", "marginal_cost")
            .unwrap();
        assert_approx_eq!(f64, model.cost(generator), 3.0 * marginal_cost);
    }

    #[rstest]
    fn test_unknown_bus(mut network: Network) {
        network
            .table_mut(ComponentType::Generator)
            .set("G1", "bus", "Nowhere".into())
            .unwrap();
        assert!(create_model(&network).is_err());
    }

    #[rstest]
    #[case(0, 3, false, None)]
    #[case(0, 3, true, Some(2))]
    #[case(2, 3, false, Some(1))]
    fn test_previous_snapshot(
        #[case] t: usize,
        #[case] n: usize,
        #[case] cyclic: bool,
        #[case] expected: Option<usize>,
    ) {
        assert_eq!(previous_snapshot(t, n, cyclic), expected);
    }
}
