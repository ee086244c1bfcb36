use std::fmt;

use crate::error::ValidationError;
use crate::numeric::approx_eq;

/// Coefficients of a linear form, one per decision variable.
///
/// Position determines identity: index `i` belongs to variable `i`.
pub type LinearExpression = Vec<f64>;

/// Represents a linear programming problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LpProblem {
    /// Objective function
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: LinearExpression,
    /// Whether to maximize or minimize
    pub sense: Sense,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    #[cfg_attr(feature = "serde", serde(alias = "max"))]
    Maximize,
    #[cfg_attr(feature = "serde", serde(alias = "min"))]
    Minimize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Coefficients for each variable
    pub coefficients: LinearExpression,
    /// Comparison operator
    pub relation: Relation,
    /// Right-hand side value
    #[cfg_attr(feature = "serde", serde(rename = "boundValue", alias = "bound"))]
    pub bound: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Less than or equal (<=)
    #[cfg_attr(feature = "serde", serde(rename = "<=", alias = "≤", alias = "le"))]
    Le,
    /// Greater than or equal (>=)
    #[cfg_attr(feature = "serde", serde(rename = ">=", alias = "≥", alias = "ge"))]
    Ge,
    /// Equal (=)
    #[cfg_attr(feature = "serde", serde(rename = "=", alias = "==", alias = "eq"))]
    Eq,
}

impl Relation {
    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Le => "<=",
            Relation::Ge => ">=",
            Relation::Eq => "=",
        }
    }

    /// The relation obtained when both sides are multiplied by -1.
    pub fn flipped(self) -> Self {
        match self {
            Relation::Le => Relation::Ge,
            Relation::Ge => Relation::Le,
            Relation::Eq => Relation::Eq,
        }
    }

    /// Whether `lhs <relation> rhs` holds, allowing a slack scaled by the
    /// magnitude of the operands.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        let slack = tolerance * 1f64.max(lhs.abs()).max(rhs.abs());
        match self {
            Relation::Le => lhs <= rhs + slack,
            Relation::Ge => lhs >= rhs - slack,
            Relation::Eq => approx_eq(lhs, rhs, tolerance),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Maximize => f.write_str("MAX"),
            Sense::Minimize => f.write_str("MIN"),
        }
    }
}

impl Objective {
    pub fn evaluate(&self, point: &[f64]) -> f64 {
        dot(&self.coefficients, point)
    }

    /// Whether `candidate` is strictly better than `incumbent` for this sense.
    pub fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        match self.sense {
            Sense::Maximize => candidate > incumbent,
            Sense::Minimize => candidate < incumbent,
        }
    }
}

impl Constraint {
    pub fn new(coefficients: LinearExpression, relation: Relation, bound: f64) -> Self {
        Self {
            coefficients,
            relation,
            bound,
        }
    }

    /// Left-hand side `coefficients · point`.
    pub fn lhs(&self, point: &[f64]) -> f64 {
        dot(&self.coefficients, point)
    }

    pub fn is_satisfied(&self, point: &[f64], tolerance: f64) -> bool {
        self.relation.holds(self.lhs(point), self.bound, tolerance)
    }

    /// How far `point` is from satisfying the constraint; zero when it does.
    pub fn violation(&self, point: &[f64]) -> f64 {
        let lhs = self.lhs(point);
        match self.relation {
            Relation::Le => (lhs - self.bound).max(0.0),
            Relation::Ge => (self.bound - lhs).max(0.0),
            Relation::Eq => (lhs - self.bound).abs(),
        }
    }

    /// All coefficients are zero, so the constraint describes no line.
    pub fn is_degenerate(&self, tolerance: f64) -> bool {
        self.coefficients.iter().all(|c| c.abs() <= tolerance)
    }
}

impl LpProblem {
    pub fn new(objective: Objective) -> Self {
        Self {
            objective,
            constraints: Vec::new(),
        }
    }

    pub fn maximize(coefficients: LinearExpression) -> Self {
        Self::new(Objective {
            coefficients,
            sense: Sense::Maximize,
        })
    }

    pub fn minimize(coefficients: LinearExpression) -> Self {
        Self::new(Objective {
            coefficients,
            sense: Sense::Minimize,
        })
    }

    pub fn add_constraint(&mut self, coefficients: LinearExpression, relation: Relation, bound: f64) {
        self.constraints.push(Constraint::new(coefficients, relation, bound));
    }

    pub fn with_constraint(mut self, coefficients: LinearExpression, relation: Relation, bound: f64) -> Self {
        self.add_constraint(coefficients, relation, bound);
        self
    }

    pub fn num_variables(&self) -> usize {
        self.objective.coefficients.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Rejects malformed input before any solving begins.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let n = self.num_variables();
        if n == 0 {
            return Err(ValidationError::EmptyObjective);
        }
        if self.objective.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ValidationError::NonFinite("objective".to_string()));
        }
        if self.constraints.is_empty() {
            return Err(ValidationError::NoConstraints);
        }
        for (i, c) in self.constraints.iter().enumerate() {
            if c.coefficients.len() != n {
                return Err(ValidationError::CoefficientCount {
                    constraint: i + 1,
                    expected: n,
                    found: c.coefficients.len(),
                });
            }
            if c.coefficients.iter().any(|v| !v.is_finite()) || !c.bound.is_finite() {
                return Err(ValidationError::NonFinite(format!("constraint R{}", i + 1)));
            }
        }
        Ok(())
    }
}

fn dot(coefficients: &[f64], point: &[f64]) -> f64 {
    coefficients.iter().zip(point).map(|(a, x)| a * x).sum()
}

/// Formats `coefficients` as `3x + 2y` using the given variable names.
pub fn format_expression(coefficients: &[f64], names: &[String]) -> String {
    let mut out = String::new();
    for (i, (&coef, name)) in coefficients.iter().zip(names).enumerate() {
        if i == 0 {
            if coef < 0.0 {
                out.push('-');
            }
        } else if coef < 0.0 {
            out.push_str(" - ");
        } else {
            out.push_str(" + ");
        }
        out.push_str(&format!("{}{}", format_number(coef.abs()), name));
    }
    out
}

/// Compact number rendering: integers without a fractional part, others with
/// up to four decimals.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.4}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Default variable names: `x, y` for two variables, `x1..xn` otherwise.
pub fn variable_names(n: usize) -> Vec<String> {
    if n == 2 {
        vec!["x".to_string(), "y".to_string()]
    } else {
        (1..=n).map(|i| format!("x{}", i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_well_formed_problem() {
        let problem = LpProblem::maximize(vec![3.0, 2.0]).with_constraint(vec![1.0, 1.0], Relation::Le, 4.0);
        assert_eq!(problem.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_coefficient_mismatch() {
        let problem = LpProblem::maximize(vec![3.0, 2.0])
            .with_constraint(vec![1.0, 1.0], Relation::Le, 4.0)
            .with_constraint(vec![1.0, 1.0, 1.0], Relation::Le, 4.0);
        assert_eq!(
            problem.validate(),
            Err(ValidationError::CoefficientCount {
                constraint: 2,
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn test_validate_rejects_empty_inputs() {
        let problem = LpProblem::maximize(vec![]).with_constraint(vec![], Relation::Le, 1.0);
        assert_eq!(problem.validate(), Err(ValidationError::EmptyObjective));

        let problem = LpProblem::minimize(vec![1.0]);
        assert_eq!(problem.validate(), Err(ValidationError::NoConstraints));
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let problem = LpProblem::maximize(vec![1.0, f64::NAN]).with_constraint(vec![1.0, 1.0], Relation::Le, 4.0);
        assert!(matches!(problem.validate(), Err(ValidationError::NonFinite(_))));

        let problem = LpProblem::maximize(vec![1.0, 1.0]).with_constraint(vec![1.0, 1.0], Relation::Le, f64::INFINITY);
        assert!(matches!(problem.validate(), Err(ValidationError::NonFinite(_))));
    }

    #[test]
    fn test_relation_holds_with_tolerance() {
        assert!(Relation::Le.holds(4.0 + 1e-12, 4.0, 1e-9));
        assert!(!Relation::Le.holds(4.1, 4.0, 1e-9));
        assert!(Relation::Ge.holds(5.0 - 1e-12, 5.0, 1e-9));
        assert!(Relation::Eq.holds(2.0, 2.0 + 1e-12, 1e-9));
        assert!(!Relation::Eq.holds(2.0, 2.1, 1e-9));
    }

    #[test]
    fn test_violation_is_zero_when_satisfied() {
        let c = Constraint::new(vec![1.0, 1.0], Relation::Le, 4.0);
        assert_eq!(c.violation(&[1.0, 2.0]), 0.0);
        assert_eq!(c.violation(&[3.0, 2.0]), 1.0);

        let c = Constraint::new(vec![1.0, 0.0], Relation::Eq, 2.0);
        assert_eq!(c.violation(&[1.5, 9.0]), 0.5);
    }

    #[test]
    fn test_format_expression() {
        let names = variable_names(2);
        assert_eq!(format_expression(&[3.0, -2.5], &names), "3x - 2.5y");
        assert_eq!(format_expression(&[-1.0, 1.0], &names), "-1x + 1y");
        assert_eq!(variable_names(3), vec!["x1", "x2", "x3"]);
    }
}
