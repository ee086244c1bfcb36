//! JSON request/response shapes exchanged with the request layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;
use crate::graphical::GraphicalSolver;
use crate::problem::LpProblem;
use crate::simplex::SimplexSolver;
use crate::solution::{GraphicalSolution, Point, SimplexSolution, SolutionStatus, SolutionType, TableauSnapshot};
use crate::trace::Trace;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Malformed request: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphicalResponse {
    pub status: SolutionStatus,
    pub vertices: Vec<Point>,
    pub objective_values: Vec<f64>,
    pub optimal_value: Option<f64>,
    pub optimal_points: Vec<Point>,
    pub solution_type: Option<SolutionType>,
    pub trace: Trace,
}

impl From<GraphicalSolution> for GraphicalResponse {
    fn from(solution: GraphicalSolution) -> Self {
        Self {
            status: solution.status,
            objective_values: solution.objective_values(),
            vertices: solution.vertices.iter().map(|v| v.point).collect(),
            optimal_value: solution.optimal_value,
            optimal_points: solution.optimal_points,
            solution_type: solution.solution_type,
            trace: solution.trace,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplexResponse {
    pub status: SolutionStatus,
    pub assignment: Vec<f64>,
    pub optimal_value: Option<f64>,
    pub solution_type: Option<SolutionType>,
    pub degenerate: bool,
    pub iterations: usize,
    pub tableaus: Vec<TableauSnapshot>,
    pub trace: Trace,
}

impl From<SimplexSolution> for SimplexResponse {
    fn from(solution: SimplexSolution) -> Self {
        Self {
            status: solution.status,
            assignment: solution.assignment,
            optimal_value: solution.optimal_value,
            solution_type: solution.solution_type,
            degenerate: solution.degenerate,
            iterations: solution.iterations,
            tableaus: solution.tableaus,
            trace: solution.trace,
        }
    }
}

/// Parses a request, runs the graphical solver and serializes the response.
pub fn solve_graphical_json(solver: &GraphicalSolver, request: &str) -> Result<String, WireError> {
    let problem: LpProblem = serde_json::from_str(request)?;
    let response = GraphicalResponse::from(solver.solve(&problem)?);
    Ok(serde_json::to_string(&response)?)
}

/// Parses a request, runs the simplex solver and serializes the response.
pub fn solve_simplex_json(solver: &SimplexSolver, request: &str) -> Result<String, WireError> {
    let problem: LpProblem = serde_json::from_str(request)?;
    let response = SimplexResponse::from(solver.solve(&problem)?);
    Ok(serde_json::to_string(&response)?)
}
