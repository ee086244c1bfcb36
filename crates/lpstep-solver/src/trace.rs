//! Structured, ordered record of every step a solve takes.
//!
//! Events are data first: presentation layers group and render them by
//! `kind`. The [`Display`](std::fmt::Display) impl gives a plain one-line
//! rendering used by the CLI.

use std::fmt;

use crate::problem::{format_expression, format_number, Constraint, Relation, Sense};
use crate::simplex::Discipline;
use crate::solution::{Point, SolutionType};

/// Outcome of checking one constraint at a candidate point.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintCheck {
    /// `R1..Rn`, or the variable name for non-negativity
    pub label: String,
    pub lhs: f64,
    pub relation: Relation,
    pub bound: f64,
    pub satisfied: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "payload", rename_all = "camelCase", rename_all_fields = "camelCase")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    Objective {
        sense: Sense,
        coefficients: Vec<f64>,
        variables: Vec<String>,
    },
    ConstraintList {
        constraints: Vec<Constraint>,
        variables: Vec<String>,
    },
    /// A row with all-zero coefficients: never intersected, still checked.
    DegenerateConstraint {
        label: String,
        relation: Relation,
        bound: f64,
        always_satisfied: bool,
    },
    ParallelLines {
        lines: [String; 2],
    },
    Intersection {
        lines: [String; 2],
        point: Point,
    },
    FeasibilityCheck {
        point: Point,
        checks: Vec<ConstraintCheck>,
        feasible: bool,
    },
    DuplicateVertex {
        point: Point,
        existing: Point,
    },
    VertexEvaluation {
        point: Point,
        value: f64,
    },
    OptimumSelected {
        sense: Sense,
        value: f64,
        points: Vec<Point>,
        solution_type: SolutionType,
    },
    Infeasible {
        reason: String,
    },
    StandardForm {
        discipline: Discipline,
        columns: Vec<String>,
        slack: usize,
        surplus: usize,
        artificial: usize,
    },
    /// Row multiplied by -1 so its bound is non-negative.
    RowNormalized {
        label: String,
        relation: Relation,
    },
    PhaseStarted {
        phase: u8,
    },
    PhaseCompleted {
        phase: u8,
        objective_value: f64,
    },
    InitialTableau {
        tableau: usize,
    },
    OptimalityReached {
        iteration: usize,
    },
    EnteringVariable {
        iteration: usize,
        column: usize,
        variable: String,
        reduced_cost: f64,
    },
    RatioTest {
        iteration: usize,
        ratios: Vec<Option<f64>>,
        leaving_row: Option<usize>,
        leaving_variable: Option<String>,
    },
    Pivot {
        iteration: usize,
        row: usize,
        column: usize,
        pivot_element: f64,
        entering: String,
        leaving: String,
        objective_before: f64,
        objective_after: f64,
        tableau: usize,
    },
    ArtificialDrivenOut {
        row: usize,
        artificial: String,
        replacement: Option<String>,
    },
    /// Big M stopped with this artificial still positive; phase 1 follows.
    PenaltyRecheck {
        artificial: String,
        value: f64,
    },
    Unbounded {
        variable: String,
    },
    IterationLimit {
        limit: usize,
    },
    Solution {
        value: f64,
        assignment: Vec<f64>,
        variables: Vec<String>,
    },
}

/// Ordered, append-only list of events owned by one solve.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    events: Vec<TraceEvent>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraceEvent> {
        self.events.iter()
    }

    /// One line per event.
    pub fn render(&self) -> Vec<String> {
        self.events.iter().map(|e| e.to_string()).collect()
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a TraceEvent;
    type IntoIter = std::slice::Iter<'a, TraceEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

fn fmt_ratio(ratio: &Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.4}", r),
        None => "-".to_string(),
    }
}

fn fmt_points(points: &[Point]) -> String {
    points.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Objective {
                sense,
                coefficients,
                variables,
            } => write!(f, "Objective: {} Z = {}", sense, format_expression(coefficients, variables)),
            TraceEvent::ConstraintList { constraints, variables } => {
                write!(f, "Constraints:")?;
                for (i, c) in constraints.iter().enumerate() {
                    write!(
                        f,
                        " R{}: {} {} {};",
                        i + 1,
                        format_expression(&c.coefficients, variables),
                        c.relation,
                        format_number(c.bound)
                    )?;
                }
                Ok(())
            }
            TraceEvent::DegenerateConstraint {
                label,
                relation,
                bound,
                always_satisfied,
            } => {
                let verdict = if *always_satisfied {
                    "always satisfied"
                } else {
                    "never satisfied"
                };
                write!(
                    f,
                    "{}: all coefficients are zero (0 {} {}), not a line; {}",
                    label,
                    relation,
                    format_number(*bound),
                    verdict
                )
            }
            TraceEvent::ParallelLines { lines } => {
                write!(f, "{} ∩ {}: parallel, no unique intersection", lines[0], lines[1])
            }
            TraceEvent::Intersection { lines, point } => {
                write!(f, "{} ∩ {}: {}", lines[0], lines[1], point)
            }
            TraceEvent::FeasibilityCheck { point, checks, feasible } => {
                write!(f, "Check {}:", point)?;
                for c in checks {
                    let mark = if c.satisfied { "✓" } else { "✗" };
                    write!(
                        f,
                        " {} {} = {:.2} {} {};",
                        mark,
                        c.label,
                        c.lhs,
                        c.relation,
                        format_number(c.bound)
                    )?;
                }
                if *feasible {
                    write!(f, " feasible")
                } else {
                    write!(f, " not feasible")
                }
            }
            TraceEvent::DuplicateVertex { point, existing } => {
                write!(f, "{} duplicates vertex {}", point, existing)
            }
            TraceEvent::VertexEvaluation { point, value } => {
                write!(f, "Vertex {}: Z = {:.2}", point, value)
            }
            TraceEvent::OptimumSelected {
                sense,
                value,
                points,
                solution_type,
            } => write!(
                f,
                "{} Z = {:.2} at {} ({} solution)",
                sense,
                value,
                fmt_points(points),
                solution_type
            ),
            TraceEvent::Infeasible { reason } => write!(f, "Infeasible: {}", reason),
            TraceEvent::StandardForm {
                discipline,
                columns,
                slack,
                surplus,
                artificial,
            } => write!(
                f,
                "Standard form ({}): {} slack, {} surplus, {} artificial; columns {}",
                discipline,
                slack,
                surplus,
                artificial,
                columns.join(", ")
            ),
            TraceEvent::RowNormalized { label, relation } => write!(
                f,
                "{}: negative bound, row multiplied by -1 (now {})",
                label, relation
            ),
            TraceEvent::PhaseStarted { phase } => match phase {
                1 => write!(f, "Phase 1: minimize W = sum of artificial variables"),
                _ => write!(f, "Phase {}: optimize the original objective", phase),
            },
            TraceEvent::PhaseCompleted { phase, objective_value } => {
                write!(f, "Phase {} finished with objective {:.6}", phase, objective_value)
            }
            TraceEvent::InitialTableau { tableau } => write!(f, "Initial tableau (#{})", tableau),
            TraceEvent::OptimalityReached { iteration } => write!(
                f,
                "Iteration {}: no improving column, optimality reached",
                iteration
            ),
            TraceEvent::EnteringVariable {
                iteration,
                variable,
                reduced_cost,
                ..
            } => write!(
                f,
                "Iteration {}: {} enters (objective row coefficient {:.4})",
                iteration, variable, reduced_cost
            ),
            TraceEvent::RatioTest {
                iteration,
                ratios,
                leaving_variable,
                ..
            } => {
                let ratios: Vec<_> = ratios.iter().map(fmt_ratio).collect();
                match leaving_variable {
                    Some(name) => write!(
                        f,
                        "Iteration {}: ratios [{}], {} leaves",
                        iteration,
                        ratios.join(", "),
                        name
                    ),
                    None => write!(
                        f,
                        "Iteration {}: ratios [{}], no row bounds the entering variable",
                        iteration,
                        ratios.join(", ")
                    ),
                }
            }
            TraceEvent::Pivot {
                iteration,
                pivot_element,
                entering,
                leaving,
                objective_before,
                objective_after,
                ..
            } => write!(
                f,
                "Iteration {}: pivot {:.4} ({} in, {} out), Z {:.4} -> {:.4}",
                iteration, pivot_element, entering, leaving, objective_before, objective_after
            ),
            TraceEvent::ArtificialDrivenOut {
                row,
                artificial,
                replacement,
            } => match replacement {
                Some(name) => write!(f, "Row {}: artificial {} replaced by {}", row + 1, artificial, name),
                None => write!(
                    f,
                    "Row {}: artificial {} kept at zero (redundant row)",
                    row + 1,
                    artificial
                ),
            },
            TraceEvent::PenaltyRecheck { artificial, value } => write!(
                f,
                "Big M stopped with artificial {} = {:.4}; checking feasibility with phase 1",
                artificial, value
            ),
            TraceEvent::Unbounded { variable } => write!(
                f,
                "Unbounded: {} can grow without limit",
                variable
            ),
            TraceEvent::IterationLimit { limit } => {
                write!(f, "Stopped after {} iterations without concluding", limit)
            }
            TraceEvent::Solution {
                value,
                assignment,
                variables,
            } => {
                write!(f, "Optimal Z = {:.4}", value)?;
                for (name, v) in variables.iter().zip(assignment) {
                    write!(f, ", {} = {:.4}", name, v)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_keeps_order() {
        let mut trace = Trace::new();
        trace.push(TraceEvent::VertexEvaluation {
            point: Point::new(4.0, 0.0),
            value: 12.0,
        });
        trace.push(TraceEvent::Unbounded {
            variable: "x1".to_string(),
        });
        let lines = trace.render();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Vertex P(4.00, 0.00): Z = 12.00");
        assert_eq!(lines[1], "Unbounded: x1 can grow without limit");
    }

    #[test]
    fn test_ratio_rendering_marks_missing_rows() {
        let event = TraceEvent::RatioTest {
            iteration: 1,
            ratios: vec![Some(4.0), None],
            leaving_row: Some(0),
            leaving_variable: Some("s1".to_string()),
        };
        assert_eq!(event.to_string(), "Iteration 1: ratios [4.0000, -], s1 leaves");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_events_serialize_with_kind_and_payload() {
        let event = TraceEvent::VertexEvaluation {
            point: Point::new(0.0, 4.0),
            value: 8.0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "vertexEvaluation");
        assert_eq!(json["payload"]["point"], serde_json::json!([0.0, 4.0]));
        assert_eq!(json["payload"]["value"], 8.0);
    }
}
