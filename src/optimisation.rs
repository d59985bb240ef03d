//! The linear optimisation model which the network is translated into.
//!
//! Variables and constraints are held in named blocks, following the `{ComponentType}-{attribute}`
//! naming convention (e.g. `Link-p`, `StorageUnit-p_nom`). Model builders only see the
//! [`OptimisationModel`] trait, so they can be tested without a solver.
use crate::id::AssetID;
use anyhow::{Result, bail, ensure};
use indexmap::{Equivalent, IndexMap};
use std::fmt;
use std::hash::{Hash, Hasher};

pub mod expression;
pub use expression::LinearExpression;
mod formulation;
pub use formulation::create_model;
mod solver;
pub use solver::{ModelError, Solution, SolverOptions, solve, write_solution};

/// A decision variable in the optimisation.
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(usize);

impl Variable {
    /// The column index of this variable
    pub fn index(self) -> usize {
        self.0
    }
}

/// The coordinates of one variable (or constraint row) within a named block.
///
/// Time-varying quantities have a snapshot index; capacities do not.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VariableKey {
    /// The snapshot index, if the quantity varies over time
    pub snapshot: Option<usize>,
    /// The asset the quantity belongs to
    pub asset: AssetID,
}

impl VariableKey {
    /// A key for a time-varying quantity
    pub fn temporal(snapshot: usize, asset: AssetID) -> Self {
        Self {
            snapshot: Some(snapshot),
            asset,
        }
    }

    /// A key for a quantity fixed over all snapshots
    pub fn fixed(asset: AssetID) -> Self {
        Self {
            snapshot: None,
            asset,
        }
    }
}

// Hashes the same way as the borrowed `(Option<usize>, &str)` form used for lookups
impl Hash for VariableKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.snapshot, self.asset.as_str()).hash(state);
    }
}

/// Borrowed form of [`VariableKey`] so lookups by `&str` do not allocate
#[derive(Hash)]
struct KeyRef<'a>(Option<usize>, &'a str);

impl Equivalent<VariableKey> for KeyRef<'_> {
    fn equivalent(&self, key: &VariableKey) -> bool {
        self.0 == key.snapshot && self.1 == key.asset.as_str()
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.snapshot {
            Some(t) => write!(f, "({t}, {})", self.asset),
            None => write!(f, "({})", self.asset),
        }
    }
}

/// A variable to be added to the model
#[derive(Debug, Clone, PartialEq)]
pub struct VariableEntry {
    /// Where the variable sits in its block
    pub key: VariableKey,
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Coefficient in the objective function
    pub cost: f64,
}

impl VariableEntry {
    /// A variable with the given bounds and no cost
    pub fn new(key: VariableKey, lower: f64, upper: f64) -> Self {
        Self {
            key,
            lower,
            upper,
            cost: 0.0,
        }
    }

    /// Set the objective coefficient
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }
}

/// A named block of variables
#[derive(Debug, Clone, Default)]
pub struct VariableArray(IndexMap<VariableKey, Variable>);

impl VariableArray {
    /// The variable for an asset at a snapshot
    pub fn get(&self, snapshot: usize, asset: &str) -> Option<Variable> {
        self.0.get(&KeyRef(Some(snapshot), asset)).copied()
    }

    /// The variable for an asset which does not vary over time (e.g. a capacity)
    pub fn get_fixed(&self, asset: &str) -> Option<Variable> {
        self.0.get(&KeyRef(None, asset)).copied()
    }

    /// Whether the block has any variable for the given asset
    pub fn contains_asset(&self, asset: &str) -> bool {
        self.0.keys().any(|key| key.asset.as_str() == asset)
    }

    /// Iterate over the variables and their keys
    pub fn iter(&self) -> impl Iterator<Item = (&VariableKey, Variable)> {
        self.0.iter().map(|(key, var)| (key, *var))
    }

    /// The number of variables
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the block is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The direction of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    /// `expression <= rhs`
    LessEqual,
    /// `expression >= rhs`
    GreaterEqual,
    /// `expression == rhs`
    Equal,
}

/// The coordinates of one constraint row within a named block.
///
/// Either part may be absent, e.g. a system-wide sum at each snapshot has no asset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstraintKey {
    /// The snapshot index, if the row is for a single snapshot
    pub snapshot: Option<usize>,
    /// The asset the row is for, if any
    pub asset: Option<AssetID>,
}

impl ConstraintKey {
    /// A key for an asset at a snapshot
    pub fn at(snapshot: usize, asset: AssetID) -> Self {
        Self {
            snapshot: Some(snapshot),
            asset: Some(asset),
        }
    }

    /// A key for a whole snapshot
    pub fn snapshot(snapshot: usize) -> Self {
        Self {
            snapshot: Some(snapshot),
            asset: None,
        }
    }

    /// A key for a single row with no coordinates
    pub fn scalar() -> Self {
        Self::default()
    }
}

/// A single linear constraint.
///
/// The expression never holds a constant: any constant is moved to `rhs` on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRow {
    /// Where the row sits in its block
    pub key: ConstraintKey,
    /// The left-hand side
    pub expression: LinearExpression,
    /// The direction of the constraint
    pub sense: ConstraintSense,
    /// The right-hand side
    pub rhs: f64,
}

impl ConstraintRow {
    /// Create a new constraint row, moving the expression's constant to the right-hand side
    pub fn new(
        key: ConstraintKey,
        mut expression: LinearExpression,
        sense: ConstraintSense,
        rhs: f64,
    ) -> Self {
        let constant = expression.take_constant();
        Self {
            key,
            expression,
            sense,
            rhs: rhs - constant,
        }
    }

    /// Whether the row holds for the given variable values (within a tolerance)
    pub fn is_satisfied_by(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs: f64 = self
            .expression
            .terms()
            .iter()
            .map(|(var, coeff)| coeff * values[var.index()])
            .sum();
        match self.sense {
            ConstraintSense::LessEqual => lhs <= self.rhs + tolerance,
            ConstraintSense::GreaterEqual => lhs >= self.rhs - tolerance,
            ConstraintSense::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// Operations for building up a linear optimisation model.
///
/// Every block of variables or constraints has a unique name. Adding a block under a name which is
/// already taken is an error, so builders cannot silently add the same constraints twice.
pub trait OptimisationModel {
    /// Add a named block of variables
    fn add_variables(&mut self, name: &str, entries: Vec<VariableEntry>) -> Result<()>;

    /// Add a named block of constraints
    fn add_constraints(&mut self, name: &str, rows: Vec<ConstraintRow>) -> Result<()>;

    /// Look up a block of variables by name
    fn variable(&self, name: &str) -> Option<&VariableArray>;

    /// Look up a block of constraints by name
    fn constraint(&self, name: &str) -> Option<&[ConstraintRow]>;

    /// The names of all variable blocks, in the order they were added
    fn variable_names(&self) -> Vec<&str>;

    /// The names of all constraint blocks, in the order they were added
    fn constraint_names(&self) -> Vec<&str>;
}

/// The bounds and objective coefficient of one column
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Column {
    pub lower: f64,
    pub upper: f64,
    pub cost: f64,
}

/// An in-memory linear model, minimising the total cost
#[derive(Debug, Clone, Default)]
pub struct LinearModel {
    columns: Vec<Column>,
    variables: IndexMap<String, VariableArray>,
    constraints: IndexMap<String, Vec<ConstraintRow>>,
}

impl LinearModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// The total number of variables
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// The total number of constraint rows
    pub fn num_rows(&self) -> usize {
        self.constraints.values().map(Vec::len).sum()
    }

    /// The bounds of a variable
    pub fn bounds(&self, var: Variable) -> (f64, f64) {
        let column = &self.columns[var.index()];
        (column.lower, column.upper)
    }

    /// The objective coefficient of a variable
    pub fn cost(&self, var: Variable) -> f64 {
        self.columns[var.index()].cost
    }

    pub(crate) fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Iterate over every constraint row with the name of its block
    pub fn iter_rows(&self) -> impl Iterator<Item = (&str, &ConstraintRow)> {
        self.constraints
            .iter()
            .flat_map(|(name, rows)| rows.iter().map(move |row| (name.as_str(), row)))
    }
}

impl OptimisationModel for LinearModel {
    fn add_variables(&mut self, name: &str, entries: Vec<VariableEntry>) -> Result<()> {
        ensure!(
            !self.variables.contains_key(name),
            "A variable named {name} already exists in the model"
        );

        let mut array = IndexMap::with_capacity(entries.len());
        let first_column = self.columns.len();
        for entry in entries {
            ensure!(
                !entry.lower.is_nan() && !entry.upper.is_nan() && entry.cost.is_finite(),
                "Invalid bounds or cost for variable {name}{}",
                entry.key
            );
            ensure!(
                entry.lower <= entry.upper,
                "Lower bound {} exceeds upper bound {} for variable {name}{}",
                entry.lower,
                entry.upper,
                entry.key
            );
            let var = Variable(first_column + array.len());
            if array.insert(entry.key.clone(), var).is_some() {
                // Undo the columns added for this block
                self.columns.truncate(first_column);
                bail!("Duplicate key {} for variable {name}", entry.key);
            }
            self.columns.push(Column {
                lower: entry.lower,
                upper: entry.upper,
                cost: entry.cost,
            });
        }
        self.variables.insert(name.to_string(), VariableArray(array));

        Ok(())
    }

    fn add_constraints(&mut self, name: &str, rows: Vec<ConstraintRow>) -> Result<()> {
        ensure!(
            !self.constraints.contains_key(name),
            "A constraint named {name} already exists in the model"
        );
        for row in &rows {
            ensure!(
                row.rhs.is_finite(),
                "Non-finite right-hand side {} in constraint {name}",
                row.rhs
            );
            for (var, coeff) in row.expression.terms() {
                ensure!(
                    var.index() < self.columns.len(),
                    "Constraint {name} refers to a variable not in the model"
                );
                ensure!(
                    coeff.is_finite(),
                    "Non-finite coefficient {coeff} in constraint {name}"
                );
            }
        }
        self.constraints.insert(name.to_string(), rows);

        Ok(())
    }

    fn variable(&self, name: &str) -> Option<&VariableArray> {
        self.variables.get(name)
    }

    fn constraint(&self, name: &str) -> Option<&[ConstraintRow]> {
        self.constraints.get(name).map(Vec::as_slice)
    }

    fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    fn constraint_names(&self) -> Vec<&str> {
        self.constraints.keys().map(String::as_str).collect()
    }
}
