use std::fmt;

use crate::numeric::approx_eq;
use crate::trace::Trace;

/// A point in the plane. Serialized as `[x, y]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "[f64; 2]", into = "[f64; 2]"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn coords(&self) -> [f64; 2] {
        [self.x, self.y]
    }

    pub fn approx_eq(&self, other: &Point, tolerance: f64) -> bool {
        approx_eq(self.x, other.x, tolerance) && approx_eq(self.y, other.y, tolerance)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P({:.2}, {:.2})", self.x, self.y)
    }
}

/// A feasible corner of the region, tagged with its objective value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub point: Point,
    pub value: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// The pivot loop hit its iteration cap without concluding
    IterationLimit,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionType {
    Unique,
    Multiple,
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::Optimal => f.write_str("OPTIMAL"),
            SolutionStatus::Infeasible => f.write_str("INFEASIBLE"),
            SolutionStatus::Unbounded => f.write_str("UNBOUNDED"),
            SolutionStatus::IterationLimit => f.write_str("ITERATION LIMIT"),
        }
    }
}

impl fmt::Display for SolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionType::Unique => f.write_str("unique"),
            SolutionType::Multiple => f.write_str("multiple"),
        }
    }
}

/// The result of a graphical solve
#[derive(Debug, Clone)]
pub struct GraphicalSolution {
    /// `Optimal` or `Infeasible`
    pub status: SolutionStatus,
    /// Feasible vertices in discovery order
    pub vertices: Vec<Vertex>,
    /// Best objective value over the vertices
    pub optimal_value: Option<f64>,
    /// Every vertex attaining the best value
    pub optimal_points: Vec<Point>,
    pub solution_type: Option<SolutionType>,
    pub trace: Trace,
}

impl GraphicalSolution {
    pub fn infeasible(trace: Trace) -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            vertices: Vec::new(),
            optimal_value: None,
            optimal_points: Vec::new(),
            solution_type: None,
            trace,
        }
    }

    pub fn objective_values(&self) -> Vec<f64> {
        self.vertices.iter().map(|v| v.value).collect()
    }
}

/// A copy of the tableau after one step, with the pivot that produced it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct TableauSnapshot {
    /// Two-phase method only: 1 or 2
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub phase: Option<u8>,
    /// Number of pivots performed when the snapshot was taken
    pub iteration: usize,
    /// Column names, solution column excluded
    pub columns: Vec<String>,
    /// Constraint rows followed by the objective row; last column is the solution
    pub grid: Vec<Vec<f64>>,
    pub basic_variables: Vec<String>,
    pub entering_column: Option<usize>,
    pub leaving_row: Option<usize>,
    pub pivot_element: Option<f64>,
    /// Per constraint row; `None` where the entering coefficient is not positive
    pub ratios: Vec<Option<f64>>,
    pub description: String,
}

/// The result of a simplex solve
#[derive(Debug, Clone)]
pub struct SimplexSolution {
    pub status: SolutionStatus,
    /// Value of each decision variable (empty unless optimal)
    pub assignment: Vec<f64>,
    pub optimal_value: Option<f64>,
    pub solution_type: Option<SolutionType>,
    /// A basic variable sits at zero in the final tableau
    pub degenerate: bool,
    /// Pivots performed
    pub iterations: usize,
    pub tableaus: Vec<TableauSnapshot>,
    pub trace: Trace,
}

impl SimplexSolution {
    pub(crate) fn stopped(
        status: SolutionStatus,
        iterations: usize,
        tableaus: Vec<TableauSnapshot>,
        trace: Trace,
    ) -> Self {
        Self {
            status,
            assignment: Vec::new(),
            optimal_value: None,
            solution_type: None,
            degenerate: false,
            iterations,
            tableaus,
            trace,
        }
    }
}
