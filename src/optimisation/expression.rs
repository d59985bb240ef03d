//! Linear expressions over model variables.
use super::Variable;
use std::ops::{Add, Neg, Sub};

/// A sum of weighted variables plus a constant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpression {
    terms: Vec<(Variable, f64)>,
    constant: f64,
}

impl LinearExpression {
    /// An empty expression (equal to zero)
    pub fn new() -> Self {
        Self::default()
    }

    /// An expression holding a single variable with a coefficient of one
    pub fn from_var(var: Variable) -> Self {
        Self::new().with_term(var, 1.0)
    }

    /// Add a weighted variable, returning the expression
    pub fn with_term(mut self, var: Variable, coeff: f64) -> Self {
        self.add_term(var, coeff);
        self
    }

    /// Add a weighted variable
    pub fn add_term(&mut self, var: Variable, coeff: f64) {
        self.terms.push((var, coeff));
    }

    /// Add a constant
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Add another expression multiplied by a factor
    pub fn add_scaled(&mut self, other: &LinearExpression, factor: f64) {
        self.terms
            .extend(other.terms.iter().map(|(var, coeff)| (*var, coeff * factor)));
        self.constant += other.constant * factor;
    }

    /// This expression multiplied by a factor
    pub fn scaled(&self, factor: f64) -> Self {
        let mut out = Self::new();
        out.add_scaled(self, factor);
        out
    }

    /// The weighted variables, in the order they were added
    pub fn terms(&self) -> &[(Variable, f64)] {
        &self.terms
    }

    /// The constant part of the expression
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// The total coefficient of a variable (zero if it does not appear)
    pub fn coefficient(&self, var: Variable) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| *v == var)
            .map(|(_, coeff)| coeff)
            .sum()
    }

    /// Move the constant out of the expression, returning it
    pub(super) fn take_constant(&mut self) -> f64 {
        std::mem::take(&mut self.constant)
    }
}

impl From<Variable> for LinearExpression {
    fn from(var: Variable) -> Self {
        Self::from_var(var)
    }
}

impl Add for LinearExpression {
    type Output = LinearExpression;

    fn add(mut self, rhs: LinearExpression) -> LinearExpression {
        self.add_scaled(&rhs, 1.0);
        self
    }
}

impl Sub for LinearExpression {
    type Output = LinearExpression;

    fn sub(mut self, rhs: LinearExpression) -> LinearExpression {
        self.add_scaled(&rhs, -1.0);
        self
    }
}

impl Neg for LinearExpression {
    type Output = LinearExpression;

    fn neg(self) -> LinearExpression {
        self.scaled(-1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_arithmetic() {
        let (a, b) = (Variable(0), Variable(1));
        let mut lhs = LinearExpression::from_var(a).with_term(b, 2.0);
        lhs.add_constant(3.0);
        let rhs = LinearExpression::from_var(a);

        let expr = lhs - rhs.scaled(4.0);
        assert_eq!(expr.coefficient(a), -3.0);
        assert_eq!(expr.coefficient(b), 2.0);
        assert_eq!(expr.constant(), 3.0);
        assert_eq!(expr.coefficient(Variable(2)), 0.0);

        let negated = -expr;
        assert_eq!(negated.coefficient(b), -2.0);
        assert_eq!(negated.constant(), -3.0);
    }
}
