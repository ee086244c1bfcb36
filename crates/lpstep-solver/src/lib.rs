mod error;
mod graphical;
mod numeric;
mod problem;
mod simplex;
mod solution;
mod tableau;
mod trace;
#[cfg(feature = "serde")]
mod wire;

pub use error::ValidationError;
pub use graphical::GraphicalSolver;
pub use numeric::{approx_eq, DEFAULT_TOLERANCE};
pub use problem::{
    format_expression, format_number, variable_names, Constraint, LinearExpression, LpProblem,
    Objective, Relation, Sense,
};
pub use simplex::{Discipline, SimplexSolver, DEFAULT_BIG_M};
pub use solution::{
    GraphicalSolution, Point, SimplexSolution, SolutionStatus, SolutionType, TableauSnapshot,
    Vertex,
};
pub use trace::{ConstraintCheck, Trace, TraceEvent};
#[cfg(feature = "serde")]
pub use wire::{
    solve_graphical_json, solve_simplex_json, GraphicalResponse, SimplexResponse, WireError,
};
