//! Solving a [`LinearModel`] with HiGHS and reading the results back into the network.
use super::{ConstraintSense, LinearModel, OptimisationModel, Variable};
use crate::id::AssetID;
use crate::network::{ComponentType, Network, SeriesTable, Value};
use anyhow::{Context, Result};
use highs::{HighsModelStatus, HighsStatus, RowProblem as Problem, Sense};
use indexmap::IndexMap;
use log::debug;
use std::error::Error;
use std::fmt;

/// Options passed on to the solver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Use the interior point method without crossover
    pub use_barrier: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self { use_barrier: true }
    }
}

/// The solution to the optimisation problem
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    values: Vec<f64>,
    objective: f64,
}

impl Solution {
    /// The value of a variable
    pub fn value(&self, var: Variable) -> f64 {
        self.values[var.index()]
    }

    /// The values of every variable, indexed by column
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The value of the objective function
    pub fn objective(&self) -> f64 {
        self.objective
    }
}

/// Defines the possible errors that can occur when running the solver
#[derive(Debug, Clone)]
pub enum ModelError {
    /// The model definition is incoherent.
    ///
    /// Users should not be able to trigger this error.
    Incoherent(HighsStatus),
    /// An optimal solution could not be found
    NonOptimal(HighsModelStatus),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            ModelError::NonOptimal(status) => {
                write!(f, "Could not find optimal result: {status:?}")
            }
        }
    }
}

impl Error for ModelError {}

/// Solve the model, returning an error if it is incoherent or the result is non-optimal
pub fn solve(model: &LinearModel, options: &SolverOptions) -> Result<Solution, ModelError> {
    let mut problem = Problem::default();
    let cols: Vec<_> = model
        .columns()
        .iter()
        .map(|column| problem.add_column(column.cost, column.lower..=column.upper))
        .collect();

    for (_, row) in model.iter_rows() {
        let terms = row
            .expression
            .terms()
            .iter()
            .map(|(var, coeff)| (cols[var.index()], *coeff));
        match row.sense {
            ConstraintSense::LessEqual => problem.add_row(..=row.rhs, terms),
            ConstraintSense::GreaterEqual => problem.add_row(row.rhs.., terms),
            ConstraintSense::Equal => problem.add_row(row.rhs..=row.rhs, terms),
        }
    }

    debug!(
        "Solving model with {} variables and {} constraints",
        model.num_columns(),
        model.num_rows()
    );
    let mut highs_model = problem.optimise(Sense::Minimise);
    highs_model.set_option("output_flag", log::log_enabled!(log::Level::Debug));
    if options.use_barrier {
        highs_model.set_option("solver", "ipm");
        highs_model.set_option("run_crossover", "off");
    }

    let solved = highs_model.try_solve().map_err(ModelError::Incoherent)?;
    match solved.status() {
        HighsModelStatus::Optimal => Ok(Solution {
            values: solved.get_solution().columns().to_vec(),
            objective: solved.objective_value(),
        }),
        status => Err(ModelError::NonOptimal(status)),
    }
}

/// Write the results of a solve back into the network.
///
/// Adds `{attr}_opt` to every table with a capacity, the time series of every dispatch variable
/// and the objective value.
pub fn write_solution(
    network: &mut Network,
    model: &LinearModel,
    solution: &Solution,
) -> Result<()> {
    use ComponentType::{Generator, Line, Link, StorageUnit, Store, Transformer};

    for (component, attr) in ComponentType::iter_with_capacity() {
        let capacities = model.variable(&format!("{component}-{}", attr.name()));
        let table = network.table(component);
        let optimal = table
            .ids()
            .map(|id| {
                let value = match capacities.and_then(|vars| vars.get_fixed(id)) {
                    Some(var) => solution.value(var),
                    None => table.get_f64(id, attr.name())?,
                };
                Ok((id.clone(), value))
            })
            .collect::<Result<Vec<_>>>()?;

        let table = network.table_mut(component);
        for (id, value) in optimal {
            table.set(&id, attr.opt(), Value::from(value))?;
        }
    }

    for (name, component, attr) in [
        ("Generator-p", Generator, "p"),
        ("Link-p", Link, "p0"),
        ("Line-s", Line, "p0"),
        ("Transformer-s", Transformer, "p0"),
        ("StorageUnit-p_dispatch", StorageUnit, "p_dispatch"),
        ("StorageUnit-p_store", StorageUnit, "p_store"),
        ("StorageUnit-state_of_charge", StorageUnit, "state_of_charge"),
        ("Store-p", Store, "p"),
        ("Store-e", Store, "e"),
    ] {
        if let Some(series) = collect_series(model, solution, name, network.num_snapshots())? {
            *network.series_mut(component, attr) = series;
        }
    }

    // Power arriving at the far end of branches
    for component in [Line, Transformer, Link] {
        let Some(p0) = network.series(component, "p0").cloned() else {
            continue;
        };
        let mut p1 = SeriesTable::new(network.num_snapshots());
        for (id, values) in p0.iter() {
            let values = values
                .iter()
                .enumerate()
                .map(|(t, p)| {
                    let efficiency = match component {
                        Link => network.get_at(component, id, "efficiency", t)?,
                        _ => 1.0,
                    };
                    Ok(-efficiency * p)
                })
                .collect::<Result<Vec<_>>>()?;
            p1.insert(id.clone(), values)?;
        }
        *network.series_mut(component, "p1") = p1;
    }

    // Net output of storage units
    if let (Some(dispatch), Some(store)) = (
        network.series(StorageUnit, "p_dispatch"),
        network.series(StorageUnit, "p_store"),
    ) {
        let mut net = SeriesTable::new(network.num_snapshots());
        for (id, dispatched) in dispatch.iter() {
            let stored = store
                .get(id)
                .with_context(|| format!("No p_store result for {id}"))?;
            net.insert(
                id.clone(),
                dispatched.iter().zip(stored).map(|(d, s)| d - s).collect(),
            )?;
        }
        *network.series_mut(StorageUnit, "p") = net;
    }

    network.set_objective(solution.objective());

    Ok(())
}

/// Gather the values of a time-varying variable block into a series table
fn collect_series(
    model: &LinearModel,
    solution: &Solution,
    name: &str,
    num_snapshots: usize,
) -> Result<Option<SeriesTable>> {
    let Some(vars) = model.variable(name) else {
        return Ok(None);
    };

    let mut columns: IndexMap<AssetID, Vec<f64>> = IndexMap::new();
    for (key, var) in vars.iter() {
        let t = key
            .snapshot
            .with_context(|| format!("{name} does not vary over time"))?;
        columns
            .entry(key.asset.clone())
            .or_insert_with(|| vec![f64::NAN; num_snapshots])[t] = solution.value(var);
    }

    let mut series = SeriesTable::new(num_snapshots);
    for (id, values) in columns {
        series.insert(id, values)?;
    }

    Ok(Some(series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::network;
    use crate::optimisation::create_model;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn simplex() -> SolverOptions {
        SolverOptions { use_barrier: false }
    }

    #[rstest]
    fn test_solve(network: Network) {
        let model = create_model(&network).unwrap();
        let solution = solve(&model, &simplex()).unwrap();

        // Load of 10 + 20 MWh met by G1 at a marginal cost of 5
        assert_approx_eq!(f64, solution.objective(), 150.0, epsilon = 1e-6);
        for (name, row) in model.iter_rows() {
            assert!(
                row.is_satisfied_by(solution.values(), 1e-6),
                "Constraint {name} {:?} violated",
                row.key
            );
        }
    }

    #[rstest]
    fn test_solve_infeasible(mut network: Network) {
        network
            .series_mut(ComponentType::Load, "p_set")
            .insert("L1".into(), vec![1e6, 1e6])
            .unwrap();
        let model = create_model(&network).unwrap();
        assert!(matches!(
            solve(&model, &simplex()),
            Err(ModelError::NonOptimal(_))
        ));
    }

    #[rstest]
    fn test_write_solution(mut network: Network) {
        assert!(!network.is_solved());
        let model = create_model(&network).unwrap();
        let solution = solve(&model, &simplex()).unwrap();
        write_solution(&mut network, &model, &solution).unwrap();

        assert!(network.is_solved());
        assert_approx_eq!(f64, network.objective().unwrap(), 150.0, epsilon = 1e-6);

        // Fixed assets keep their capacity
        let links = network.links();
        assert_eq!(links.get_f64("Lk2", "p_nom_opt").unwrap(), 50.0);
        assert!(links.get_f64("Lk1", "p_nom_opt").unwrap() >= 0.0);

        let generation = network.series(ComponentType::Generator, "p").unwrap();
        assert_approx_eq!(f64, generation.get_at("G1", 1).unwrap(), 20.0, epsilon = 1e-6);
        let p0 = network.series(ComponentType::Link, "p0").unwrap().clone();
        let p1 = network.series(ComponentType::Link, "p1").unwrap();
        assert_approx_eq!(
            f64,
            p1.get_at("Lk2", 0).unwrap(),
            -p0.get_at("Lk2", 0).unwrap(),
            epsilon = 1e-9
        );
        assert!(network.series(ComponentType::StorageUnit, "p").is_some());
    }
}
