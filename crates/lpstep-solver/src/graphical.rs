//! Vertex enumeration for two-variable problems.
//!
//! Every pair of boundary lines (constraints plus both axes) is intersected,
//! infeasible corners are dropped, and the objective is evaluated at what is
//! left. Only finite vertices are ever produced, so an unbounded feasible
//! region is not detected: the best vertex found is reported as optimal.

use tracing::debug;

use crate::error::ValidationError;
use crate::numeric::{approx_eq, unsigned_zero, DEFAULT_TOLERANCE};
use crate::problem::{variable_names, LpProblem, Relation};
use crate::solution::{GraphicalSolution, Point, SolutionStatus, SolutionType, Vertex};
use crate::trace::{ConstraintCheck, Trace, TraceEvent};

/// Graphical (vertex enumeration) solver for problems in `x` and `y`
pub struct GraphicalSolver {
    /// Tolerance for parallel lines, feasibility, duplicates and ties
    tolerance: f64,
}

impl Default for GraphicalSolver {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// `a·x + b·y = c`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Line {
    pub label: String,
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Line {
    fn new(label: impl Into<String>, a: f64, b: f64, c: f64) -> Self {
        Self {
            label: label.into(),
            a,
            b,
            c,
        }
    }
}

/// Solves the 2x2 system formed by two lines, or `None` when they are
/// parallel (or coincident) within `tolerance`.
pub(crate) fn intersect(l1: &Line, l2: &Line, tolerance: f64) -> Option<Point> {
    let det = l1.a * l2.b - l2.a * l1.b;
    let scale = (l1.a * l2.b).abs().max((l2.a * l1.b).abs());
    if det.abs() <= tolerance * scale {
        return None;
    }
    let x = (l1.c * l2.b - l2.c * l1.b) / det;
    let y = (l1.a * l2.c - l2.a * l1.c) / det;
    Some(Point::new(unsigned_zero(x), unsigned_zero(y)))
}

/// Intersects every pair of lines in order, recording each outcome.
/// Parallel pairs yield no candidate.
pub(crate) fn enumerate_intersections(lines: &[Line], tolerance: f64, trace: &mut Trace) -> Vec<Point> {
    let mut candidates = Vec::new();
    for (i, first) in lines.iter().enumerate() {
        for second in &lines[i + 1..] {
            let pair = [first.label.clone(), second.label.clone()];
            match intersect(first, second, tolerance) {
                Some(point) => {
                    trace.push(TraceEvent::Intersection { lines: pair, point });
                    candidates.push(point);
                }
                None => trace.push(TraceEvent::ParallelLines { lines: pair }),
            }
        }
    }
    candidates
}

impl GraphicalSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Solve a two-variable LP problem by enumerating vertices
    pub fn solve(&self, problem: &LpProblem) -> Result<GraphicalSolution, ValidationError> {
        problem.validate()?;
        if problem.num_variables() != 2 {
            return Err(ValidationError::NotTwoDimensional(problem.num_variables()));
        }

        let variables = variable_names(2);
        let mut trace = Trace::new();
        trace.push(TraceEvent::Objective {
            sense: problem.objective.sense,
            coefficients: problem.objective.coefficients.clone(),
            variables: variables.clone(),
        });
        trace.push(TraceEvent::ConstraintList {
            constraints: problem.constraints.clone(),
            variables,
        });

        let lines = self.boundary_lines(problem, &mut trace);

        let candidates = enumerate_intersections(&lines, self.tolerance, &mut trace);
        debug!(lines = lines.len(), candidates = candidates.len(), "enumerated intersections");

        // Feasibility filter and deduplication
        let mut points: Vec<Point> = Vec::new();
        for point in candidates {
            let checks = self.check_point(problem, &point);
            let feasible = checks.iter().all(|c| c.satisfied);
            trace.push(TraceEvent::FeasibilityCheck {
                point,
                checks,
                feasible,
            });
            if !feasible {
                continue;
            }
            match points.iter().find(|p| p.approx_eq(&point, self.tolerance)) {
                Some(existing) => trace.push(TraceEvent::DuplicateVertex {
                    point,
                    existing: *existing,
                }),
                None => points.push(point),
            }
        }

        if points.is_empty() {
            debug!("no feasible vertex");
            trace.push(TraceEvent::Infeasible {
                reason: "no intersection point satisfies every constraint".to_string(),
            });
            return Ok(GraphicalSolution::infeasible(trace));
        }

        // Evaluate the objective at every vertex
        let vertices: Vec<Vertex> = points
            .into_iter()
            .map(|point| {
                let value = problem.objective.evaluate(&point.coords());
                trace.push(TraceEvent::VertexEvaluation { point, value });
                Vertex { point, value }
            })
            .collect();

        let (optimal_value, optimal_points) = self.select_optimum(problem, &vertices);
        let solution_type = if optimal_points.len() == 1 {
            SolutionType::Unique
        } else {
            SolutionType::Multiple
        };
        debug!(value = optimal_value, winners = optimal_points.len(), "optimum selected");
        trace.push(TraceEvent::OptimumSelected {
            sense: problem.objective.sense,
            value: optimal_value,
            points: optimal_points.clone(),
            solution_type,
        });

        Ok(GraphicalSolution {
            status: SolutionStatus::Optimal,
            vertices,
            optimal_value: Some(optimal_value),
            optimal_points,
            solution_type: Some(solution_type),
            trace,
        })
    }

    /// Constraint lines labeled `R1..Rn`, then `x = 0` and `y = 0`.
    /// All-zero rows are flagged and left out.
    fn boundary_lines(&self, problem: &LpProblem, trace: &mut Trace) -> Vec<Line> {
        let mut lines = Vec::with_capacity(problem.num_constraints() + 2);
        for (i, c) in problem.constraints.iter().enumerate() {
            let label = format!("R{}", i + 1);
            if c.is_degenerate(self.tolerance) {
                trace.push(TraceEvent::DegenerateConstraint {
                    label,
                    relation: c.relation,
                    bound: c.bound,
                    always_satisfied: c.relation.holds(0.0, c.bound, self.tolerance),
                });
                continue;
            }
            lines.push(Line::new(label, c.coefficients[0], c.coefficients[1], c.bound));
        }
        lines.push(Line::new("x = 0", 1.0, 0.0, 0.0));
        lines.push(Line::new("y = 0", 0.0, 1.0, 0.0));
        lines
    }

    /// Checks non-negativity and every constraint at `point`.
    pub(crate) fn check_point(&self, problem: &LpProblem, point: &Point) -> Vec<ConstraintCheck> {
        let coords = point.coords();
        let mut checks = Vec::with_capacity(problem.num_constraints() + 2);
        for (name, value) in ["x", "y"].iter().zip(coords) {
            checks.push(ConstraintCheck {
                label: name.to_string(),
                lhs: value,
                relation: Relation::Ge,
                bound: 0.0,
                satisfied: Relation::Ge.holds(value, 0.0, self.tolerance),
            });
        }
        for (i, c) in problem.constraints.iter().enumerate() {
            let lhs = c.lhs(&coords);
            checks.push(ConstraintCheck {
                label: format!("R{}", i + 1),
                lhs,
                relation: c.relation,
                bound: c.bound,
                satisfied: c.relation.holds(lhs, c.bound, self.tolerance),
            });
        }
        checks
    }

    fn select_optimum(&self, problem: &LpProblem, vertices: &[Vertex]) -> (f64, Vec<Point>) {
        let mut best = vertices[0].value;
        for v in &vertices[1..] {
            if problem.objective.improves(v.value, best) {
                best = v.value;
            }
        }
        let winners = vertices
            .iter()
            .filter(|v| approx_eq(v.value, best, self.tolerance))
            .map(|v| v.point)
            .collect();
        (best, winners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_a() -> LpProblem {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x, y >= 0
        LpProblem::maximize(vec![3.0, 2.0]).with_constraint(vec![1.0, 1.0], Relation::Le, 4.0)
    }

    #[test]
    fn test_intersect_skips_parallel_lines() {
        let l1 = Line::new("R1", 1.0, 1.0, 4.0);
        let l2 = Line::new("R2", 2.0, 2.0, 10.0);
        assert_eq!(intersect(&l1, &l2, 1e-9), None);

        let coincident = Line::new("R3", 3.0, 3.0, 12.0);
        assert_eq!(intersect(&l1, &coincident, 1e-9), None);
    }

    #[test]
    fn test_intersect_treats_rounding_as_parallel() {
        // 0.1 + 0.2 is not exactly 0.3, so the determinant is tiny but not zero
        let l1 = Line::new("R1", 0.1 + 0.2, 0.3, 1.0);
        let l2 = Line::new("R2", 0.3, 0.3, 2.0);
        assert!(intersect(&l1, &l2, 0.0).is_some());
        assert_eq!(intersect(&l1, &l2, 1e-9), None);
    }

    #[test]
    fn test_intersect_solves_system() {
        let l1 = Line::new("R1", 2.0, 1.0, 10.0);
        let l2 = Line::new("R2", 1.0, 1.0, 8.0);
        let p = intersect(&l1, &l2, 1e-9).unwrap();
        assert!((p.x - 2.0).abs() < 1e-9, "x = {}", p.x);
        assert!((p.y - 6.0).abs() < 1e-9, "y = {}", p.y);
    }

    #[test]
    fn test_enumeration_records_every_pair() {
        // R1 and R2 are parallel: 4 lines, 6 pairs, 5 candidates
        let lines = vec![
            Line::new("R1", 1.0, 1.0, 4.0),
            Line::new("R2", 1.0, 1.0, 2.0),
            Line::new("x = 0", 1.0, 0.0, 0.0),
            Line::new("y = 0", 0.0, 1.0, 0.0),
        ];
        let mut trace = Trace::new();
        let candidates = enumerate_intersections(&lines, 1e-9, &mut trace);

        assert_eq!(trace.len(), 6);
        assert_eq!(candidates.len(), 5);
        assert!(matches!(&trace.events()[0], TraceEvent::ParallelLines { lines } if lines[0] == "R1" && lines[1] == "R2"));
    }

    #[test]
    fn test_unique_optimum() {
        let solution = GraphicalSolver::new().solve(&scenario_a()).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.vertices.len(), 3);
        assert_eq!(solution.solution_type, Some(SolutionType::Unique));
        assert_eq!(solution.optimal_points, vec![Point::new(4.0, 0.0)]);
        assert!((solution.optimal_value.unwrap() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_minimization_picks_smallest() {
        // Minimize: x + y
        // Subject to:
        //   x + 2y >= 4
        //   3x + y >= 6
        // Optimal: (1.6, 1.2), z = 2.8
        let problem = LpProblem::minimize(vec![1.0, 1.0])
            .with_constraint(vec![1.0, 2.0], Relation::Ge, 4.0)
            .with_constraint(vec![3.0, 1.0], Relation::Ge, 6.0);
        let solution = GraphicalSolver::new().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        let p = solution.optimal_points[0];
        assert!((p.x - 1.6).abs() < 1e-9, "x = {}", p.x);
        assert!((p.y - 1.2).abs() < 1e-9, "y = {}", p.y);
        assert!((solution.optimal_value.unwrap() - 2.8).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_candidates_merge() {
        // x + y <= 4, x <= 4 and y = 0 all meet at (4, 0)
        let problem = LpProblem::maximize(vec![1.0, 0.0])
            .with_constraint(vec![1.0, 1.0], Relation::Le, 4.0)
            .with_constraint(vec![1.0, 0.0], Relation::Le, 4.0);
        let solution = GraphicalSolver::new().solve(&problem).unwrap();

        let at_corner = solution
            .vertices
            .iter()
            .filter(|v| v.point.approx_eq(&Point::new(4.0, 0.0), 1e-9))
            .count();
        assert_eq!(at_corner, 1);
        assert!(solution
            .trace
            .iter()
            .any(|e| matches!(e, TraceEvent::DuplicateVertex { .. })));
    }

    #[test]
    fn test_nearly_equal_candidates_merge() {
        // x <= 4 + 1e-12 puts two more candidates within 1e-12 of (4, 0)
        let problem = LpProblem::maximize(vec![1.0, 0.0])
            .with_constraint(vec![1.0, 1.0], Relation::Le, 4.0)
            .with_constraint(vec![1.0, 0.0], Relation::Le, 4.0 + 1e-12);
        let solution = GraphicalSolver::new().solve(&problem).unwrap();

        assert_eq!(solution.vertices.len(), 3);
        let near_corner = solution
            .vertices
            .iter()
            .filter(|v| v.point.approx_eq(&Point::new(4.0, 0.0), 1e-6))
            .count();
        assert_eq!(near_corner, 1);
        let merged = solution
            .trace
            .iter()
            .filter(|e| matches!(e, TraceEvent::DuplicateVertex { .. }))
            .count();
        assert_eq!(merged, 2);
    }

    #[test]
    fn test_degenerate_row_is_flagged() {
        let problem = LpProblem::maximize(vec![1.0, 1.0])
            .with_constraint(vec![1.0, 1.0], Relation::Le, 4.0)
            .with_constraint(vec![0.0, 0.0], Relation::Ge, 5.0);
        let solution = GraphicalSolver::new().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.trace.iter().any(|e| matches!(
            e,
            TraceEvent::DegenerateConstraint {
                always_satisfied: false,
                ..
            }
        )));
    }

    #[test]
    fn test_trivially_true_degenerate_row_is_ignored() {
        let problem = scenario_a().with_constraint(vec![0.0, 0.0], Relation::Le, 5.0);
        let solution = GraphicalSolver::new().solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.vertices.len(), 3);
    }

    #[test]
    fn test_rejects_three_variables() {
        let problem = LpProblem::maximize(vec![1.0, 1.0, 1.0]).with_constraint(vec![1.0, 1.0, 1.0], Relation::Le, 4.0);
        assert_eq!(
            GraphicalSolver::new().solve(&problem).unwrap_err(),
            ValidationError::NotTwoDimensional(3)
        );
    }

    #[test]
    fn test_infeasible_point_lists_violation() {
        let solver = GraphicalSolver::new();
        let checks = solver.check_point(&scenario_a(), &Point::new(5.0, 0.0));
        let failed: Vec<_> = checks.iter().filter(|c| !c.satisfied).map(|c| c.label.as_str()).collect();
        assert_eq!(failed, vec!["R1"]);
    }
}
