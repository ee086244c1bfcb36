use std::cmp::Ordering;
use std::collections::BTreeMap;

use lpstep_solver::{format_number, Constraint, LpProblem, Objective, ValidationError};
use thiserror::Error;

use crate::ast::*;
use crate::parser::{ParseError, Parser};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Missing objective: add a line starting with max or min")]
    MissingObjective,
    #[error("Only one objective is allowed, found {0}")]
    MultipleObjectives(usize),
    #[error("Objective has a constant term {0}")]
    ObjectiveConstant(String),
    #[error("Nonlinear term: ({0}) * ({1})")]
    Nonlinear(String, String),
    #[error("Division must be by a constant number")]
    NonConstantDivisor,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// `Σ coefficient · variable + constant`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearForm {
    pub terms: BTreeMap<String, f64>,
    pub constant: f64,
}

impl LinearForm {
    pub fn constant(value: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(name.into(), 1.0);
        Self { terms, constant: 0.0 }
    }

    /// Whether the form holds no variable with a non-zero coefficient.
    pub fn is_constant(&self) -> bool {
        self.terms.values().all(|c| *c == 0.0)
    }

    pub fn coefficient(&self, name: &str) -> f64 {
        self.terms.get(name).copied().unwrap_or(0.0)
    }

    /// `self + factor · other`
    fn add_scaled(mut self, other: &LinearForm, factor: f64) -> Self {
        for (name, c) in &other.terms {
            *self.terms.entry(name.clone()).or_insert(0.0) += factor * c;
        }
        self.constant += factor * other.constant;
        self
    }

    fn scale(mut self, factor: f64) -> Self {
        for c in self.terms.values_mut() {
            *c *= factor;
        }
        self.constant *= factor;
        self
    }
}

impl std::fmt::Display for LinearForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = self
            .terms
            .iter()
            .filter(|(_, c)| **c != 0.0)
            .map(|(name, c)| format!("{}{}", format_number(*c), name))
            .collect();
        if self.constant != 0.0 || parts.is_empty() {
            parts.push(format_number(self.constant));
        }
        write!(f, "{}", parts.join(" + "))
    }
}

/// Reduces an expression to linear form; products of two variable terms
/// and division by a variable are rejected.
pub fn linearize(expr: &Expr) -> Result<LinearForm, CompileError> {
    match expr {
        Expr::Number(n) => Ok(LinearForm::constant(*n)),
        Expr::Variable(v) => Ok(LinearForm::variable(&v.name)),
        Expr::Neg(inner) => Ok(linearize(inner)?.scale(-1.0)),
        Expr::Paren(inner) => linearize(inner),
        Expr::BinaryOp { left, op, right } => {
            let left = linearize(left)?;
            let right = linearize(right)?;
            match op {
                BinaryOp::Add => Ok(left.add_scaled(&right, 1.0)),
                BinaryOp::Sub => Ok(left.add_scaled(&right, -1.0)),
                BinaryOp::Mul => {
                    if left.is_constant() {
                        Ok(right.scale(left.constant))
                    } else if right.is_constant() {
                        Ok(left.scale(right.constant))
                    } else {
                        Err(CompileError::Nonlinear(left.to_string(), right.to_string()))
                    }
                }
                BinaryOp::Div => {
                    if !right.is_constant() {
                        return Err(CompileError::NonConstantDivisor);
                    }
                    if right.constant == 0.0 {
                        return Err(CompileError::DivisionByZero);
                    }
                    Ok(left.scale(1.0 / right.constant))
                }
            }
        }
    }
}

/// A problem compiled from text, with the variable order of its coefficient vectors.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProblem {
    pub variables: Vec<String>,
    pub objective_name: Option<String>,
    pub problem: LpProblem,
}

/// Compiles parsed problem text into the solver's coefficient form
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    /// Fixed variable order; inferred from the text when unset
    variables: Option<Vec<String>>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the variable order. Names outside this list are rejected.
    pub fn with_variables<S: Into<String>>(mut self, variables: impl IntoIterator<Item = S>) -> Self {
        self.variables = Some(variables.into_iter().map(Into::into).collect());
        self
    }

    pub fn compile_source(&self, source: &str) -> Result<CompiledProblem, CompileError> {
        let program = Parser::parse(source)?;
        self.compile(&program)
    }

    pub fn compile(&self, program: &Program) -> Result<CompiledProblem, CompileError> {
        let objectives: Vec<&ObjectiveStmt> = program.objectives().collect();
        let objective = match objectives.as_slice() {
            [] => return Err(CompileError::MissingObjective),
            [one] => *one,
            many => return Err(CompileError::MultipleObjectives(many.len())),
        };

        let objective_form = linearize(&objective.expr)?;
        if objective_form.constant != 0.0 {
            return Err(CompileError::ObjectiveConstant(format_number(objective_form.constant)));
        }

        let mut forms = Vec::new();
        for stmt in program.constraints() {
            forms.push((difference(stmt)?, stmt.relation));
        }

        let variables = match &self.variables {
            Some(declared) => declared.clone(),
            None => {
                let mut names: Vec<String> = std::iter::once(&objective_form)
                    .chain(forms.iter().map(|(f, _)| f))
                    .flat_map(|f| f.terms.keys().cloned())
                    .collect();
                names.sort_by(|a, b| natural_cmp(a, b));
                names.dedup();
                names
            }
        };
        check_known(&objective_form, &variables)?;

        let mut problem = LpProblem::new(Objective {
            coefficients: variables.iter().map(|v| objective_form.coefficient(v)).collect(),
            sense: objective.sense,
        });
        for (form, relation) in &forms {
            check_known(form, &variables)?;
            problem.constraints.push(to_constraint(form, *relation, &variables));
        }
        problem.validate()?;

        Ok(CompiledProblem {
            variables,
            objective_name: objective.name.clone(),
            problem,
        })
    }

    /// Compiles constraint text such as `y >= 2x + 5` against the declared
    /// variables, moving every variable term to the left and every constant
    /// to the right.
    pub fn compile_constraints(&self, source: &str) -> Result<Vec<Constraint>, CompileError> {
        let statements = Parser::parse_constraints(source)?;
        let variables = match &self.variables {
            Some(declared) => declared.clone(),
            None => {
                let mut names = Vec::new();
                for stmt in &statements {
                    names.extend(difference(stmt)?.terms.into_keys());
                }
                names.sort_by(|a, b| natural_cmp(a, b));
                names.dedup();
                names
            }
        };

        let mut constraints = Vec::with_capacity(statements.len());
        for stmt in &statements {
            let form = difference(stmt)?;
            check_known(&form, &variables)?;
            constraints.push(to_constraint(&form, stmt.relation, &variables));
        }
        Ok(constraints)
    }
}

/// `lhs - rhs` of a constraint statement.
fn difference(stmt: &ConstraintStmt) -> Result<LinearForm, CompileError> {
    Ok(linearize(&stmt.lhs)?.add_scaled(&linearize(&stmt.rhs)?, -1.0))
}

fn to_constraint(form: &LinearForm, relation: lpstep_solver::Relation, variables: &[String]) -> Constraint {
    // `form relation 0` becomes `terms relation -constant`
    Constraint::new(
        variables.iter().map(|v| form.coefficient(v) + 0.0).collect(),
        relation,
        -form.constant + 0.0,
    )
}

fn check_known(form: &LinearForm, variables: &[String]) -> Result<(), CompileError> {
    match form
        .terms
        .iter()
        .find(|(name, c)| **c != 0.0 && !variables.contains(name))
    {
        Some((name, _)) => Err(CompileError::UnknownVariable(name.clone())),
        None => Ok(()),
    }
}

/// Orders `x < y` and `x2 < x10`: alphabetic prefix first, then the
/// numeric suffix by value.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    fn split(s: &str) -> (&str, Option<u64>) {
        let prefix = s.trim_end_matches(|c: char| c.is_ascii_digit());
        (prefix, s[prefix.len()..].parse().ok())
    }
    split(a).cmp(&split(b)).then_with(|| a.cmp(b))
}

/// Parses and compiles a whole problem text with inferred variables.
pub fn parse_problem(source: &str) -> Result<CompiledProblem, CompileError> {
    Compiler::new().compile_source(source)
}

/// Converts constraint text into coefficient form over `variables`.
pub fn parse_constraints(source: &str, variables: &[String]) -> Result<Vec<Constraint>, CompileError> {
    Compiler::new()
        .with_variables(variables.iter().cloned())
        .compile_constraints(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpstep_solver::{Discipline, GraphicalSolver, Relation, Sense, SimplexSolver, SolutionStatus};

    #[test]
    fn test_compile_simple_problem() {
        let source = r#"
            max z = 3x + 2y
            x + y <= 4
            x + 3y <= 6
        "#;

        let compiled = parse_problem(source).unwrap();

        assert_eq!(compiled.variables, vec!["x", "y"]);
        assert_eq!(compiled.objective_name.as_deref(), Some("z"));
        assert_eq!(compiled.problem.objective.sense, Sense::Maximize);
        assert_eq!(compiled.problem.objective.coefficients, vec![3.0, 2.0]);
        assert_eq!(compiled.problem.num_constraints(), 2);
        assert_eq!(compiled.problem.constraints[1].coefficients, vec![1.0, 3.0]);
        assert_eq!(compiled.problem.constraints[1].bound, 6.0);
    }

    #[test]
    fn test_relational_constraint_moves_terms() {
        // y >= 2x + 5  ->  -2x + y >= 5
        let variables = vec!["x".to_string(), "y".to_string()];
        let constraints = parse_constraints("y >= 2x + 5", &variables).unwrap();

        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].coefficients, vec![-2.0, 1.0]);
        assert_eq!(constraints[0].relation, Relation::Ge);
        assert_eq!(constraints[0].bound, 5.0);
    }

    #[test]
    fn test_variables_on_both_sides() {
        // 2(x + y) - 3 <= x + 1  ->  x + 2y <= 4
        let variables = vec!["x".to_string(), "y".to_string()];
        let constraints = parse_constraints("2(x + y) - 3 <= x + 1", &variables).unwrap();
        assert_eq!(constraints[0].coefficients, vec![1.0, 2.0]);
        assert_eq!(constraints[0].bound, 4.0);
    }

    #[test]
    fn test_unknown_variable() {
        let variables = vec!["x".to_string(), "y".to_string()];
        let err = parse_constraints("x + z <= 4", &variables).unwrap_err();
        assert_eq!(err, CompileError::UnknownVariable("z".to_string()));
    }

    #[test]
    fn test_nonlinear_rejected() {
        let err = parse_problem("max x * y\nx <= 1").unwrap_err();
        assert!(matches!(err, CompileError::Nonlinear(_, _)));

        let err = parse_problem("max x / y\nx <= 1").unwrap_err();
        assert_eq!(err, CompileError::NonConstantDivisor);

        let err = parse_problem("max x / 0\nx <= 1").unwrap_err();
        assert_eq!(err, CompileError::DivisionByZero);
    }

    #[test]
    fn test_objective_rules() {
        assert_eq!(parse_problem("x + y <= 4").unwrap_err(), CompileError::MissingObjective);
        assert_eq!(
            parse_problem("max x\nmin y\nx + y <= 4").unwrap_err(),
            CompileError::MultipleObjectives(2)
        );
        assert!(matches!(
            parse_problem("max x + 1\nx <= 4").unwrap_err(),
            CompileError::ObjectiveConstant(_)
        ));
        assert_eq!(
            parse_problem("max x + y").unwrap_err(),
            CompileError::Invalid(ValidationError::NoConstraints)
        );
    }

    #[test]
    fn test_natural_variable_order() {
        let compiled = parse_problem("min x10 + x2 + x1\nx1 + x2 + x10 >= 3").unwrap();
        assert_eq!(compiled.variables, vec!["x1", "x2", "x10"]);
    }

    #[test]
    fn test_constraint_only_variable_gets_zero_cost() {
        let compiled = parse_problem("max x\nx + y <= 4\ny >= 1").unwrap();
        assert_eq!(compiled.variables, vec!["x", "y"]);
        assert_eq!(compiled.problem.objective.coefficients, vec![1.0, 0.0]);
    }

    #[test]
    fn test_compile_and_solve() {
        let source = r#"
            min 2x + 3y
            x + y >= 4
            x <= 3
            y <= 3
        "#;
        let compiled = parse_problem(source).unwrap();

        let graphical = GraphicalSolver::new().solve(&compiled.problem).unwrap();
        let simplex = SimplexSolver::new().solve(&compiled.problem).unwrap();

        assert_eq!(graphical.status, SolutionStatus::Optimal);
        assert_eq!(simplex.status, SolutionStatus::Optimal);
        assert!((graphical.optimal_value.unwrap() - 9.0).abs() < 1e-6);
        assert!((simplex.optimal_value.unwrap() - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_demo_files_compile() {
        let production = parse_problem(include_str!("../../../demos/production.lp")).unwrap();
        let simplex = SimplexSolver::new().solve(&production.problem).unwrap();
        assert!((simplex.optimal_value.unwrap() - 36.0).abs() < 1e-6);

        // y >= x - 2 has a negative bound once terms are moved
        let diet = parse_problem(include_str!("../../../demos/diet.lp")).unwrap();
        assert_eq!(diet.problem.constraints[1].coefficients, vec![-1.0, 1.0]);
        assert_eq!(diet.problem.constraints[1].bound, -2.0);
        for discipline in [Discipline::BigM, Discipline::TwoPhase] {
            let simplex = SimplexSolver::new()
                .with_discipline(discipline)
                .solve(&diet.problem)
                .unwrap();
            assert!((simplex.optimal_value.unwrap() - 9.0).abs() < 1e-6, "{}", discipline);
        }
    }
}
