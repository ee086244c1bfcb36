use std::fmt;

use tracing::{debug, trace, warn};

use crate::error::ValidationError;
use crate::numeric::DEFAULT_TOLERANCE;
use crate::problem::{LpProblem, Sense};
use crate::solution::{SimplexSolution, SolutionStatus, SolutionType, TableauSnapshot};
use crate::tableau::{ColumnKind, Tableau};
use crate::trace::{Trace, TraceEvent};

/// Default penalty on artificial variables under [`Discipline::BigM`], per
/// unit of the largest objective coefficient.
pub const DEFAULT_BIG_M: f64 = 1e6;

/// Iteration cap per row and column when none is configured.
const ITERATIONS_PER_DIMENSION: usize = 10;

/// How artificial variables are kept out of the final basis.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Discipline {
    /// Artificials carry a large penalty in the objective
    #[default]
    BigM,
    /// Phase 1 drives artificials to zero, phase 2 optimizes without them
    TwoPhase,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::BigM => f.write_str("Big M"),
            Discipline::TwoPhase => f.write_str("two-phase"),
        }
    }
}

/// Simplex solver for linear programming problems
pub struct SimplexSolver {
    /// Maximum pivots before giving up; derived from the problem size if unset
    max_iterations: Option<usize>,
    /// Tolerance for floating point comparisons
    tolerance: f64,
    discipline: Discipline,
    big_m: f64,
}

impl Default for SimplexSolver {
    fn default() -> Self {
        Self {
            max_iterations: None,
            tolerance: DEFAULT_TOLERANCE,
            discipline: Discipline::default(),
            big_m: DEFAULT_BIG_M,
        }
    }
}

enum LoopOutcome {
    Optimal,
    Unbounded,
    IterationLimit,
}

/// Mutable state of one solve: pivots done, snapshots and trace.
struct Run {
    trace: Trace,
    tableaus: Vec<TableauSnapshot>,
    iterations: usize,
    limit: usize,
}

impl Run {
    fn record(&mut self, snapshot: TableauSnapshot) -> usize {
        self.tableaus.push(snapshot);
        self.tableaus.len() - 1
    }

    fn stop(self, status: SolutionStatus) -> SimplexSolution {
        SimplexSolution::stopped(status, self.iterations, self.tableaus, self.trace)
    }
}

impl SimplexSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_discipline(mut self, discipline: Discipline) -> Self {
        self.discipline = discipline;
        self
    }

    /// Penalty per artificial before scaling by the largest `|c_j|`
    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = big_m;
        self
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    /// Solve the LP problem, recording every tableau
    pub fn solve(&self, problem: &LpProblem) -> Result<SimplexSolution, ValidationError> {
        problem.validate()?;

        let variables: Vec<String> = (1..=problem.num_variables()).map(|i| format!("x{}", i)).collect();
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

        let mut tableau = Tableau::build(problem, &mut trace);
        trace.push(TraceEvent::StandardForm {
            discipline: self.discipline,
            columns: tableau.columns.iter().map(|c| c.name.clone()).collect(),
            slack: tableau.count(ColumnKind::Slack),
            surplus: tableau.count(ColumnKind::Surplus),
            artificial: tableau.count(ColumnKind::Artificial),
        });

        let limit = self
            .max_iterations
            .unwrap_or(ITERATIONS_PER_DIMENSION * (tableau.data.len() + tableau.data[0].len()));
        let mut run = Run {
            trace,
            tableaus: Vec::new(),
            iterations: 0,
            limit,
        };
        debug!(
            rows = tableau.num_rows(),
            columns = tableau.num_columns(),
            limit,
            discipline = %self.discipline,
            "starting simplex"
        );

        match self.discipline {
            Discipline::BigM => self.solve_big_m(problem, tableau, run),
            Discipline::TwoPhase => {
                if tableau.count(ColumnKind::Artificial) > 0 {
                    match self.phase1(&mut tableau, &mut run) {
                        Some(status) => return Ok(run.stop(status)),
                        None => run.trace.push(TraceEvent::PhaseStarted { phase: 2 }),
                    }
                }
                self.phase2(problem, tableau, run)
            }
        }
    }

    fn solve_big_m(
        &self,
        problem: &LpProblem,
        mut tableau: Tableau,
        mut run: Run,
    ) -> Result<SimplexSolution, ValidationError> {
        let big_m = self.penalty(problem);
        // Penalize artificials against the direction of optimization
        let penalty = match problem.objective.sense {
            Sense::Maximize => -big_m,
            Sense::Minimize => big_m,
        };
        debug!(big_m, "artificial penalty");
        let costs = self.costs(problem, &tableau, penalty);
        tableau.set_objective(&costs, self.tolerance);

        let index = run.record(tableau.snapshot(None, 0, "Initial tableau"));
        run.trace.push(TraceEvent::InitialTableau { tableau: index });

        let outcome = self.iterate(&mut tableau, problem.objective.sense, None, &mut run, |_| true);
        if let LoopOutcome::IterationLimit = outcome {
            return Ok(run.stop(SolutionStatus::IterationLimit));
        }

        // A positive artificial means either infeasible or M too small to
        // tell; phase 1 decides which
        if let Some(&row) = tableau.positive_artificials(self.tolerance).first() {
            run.trace.push(TraceEvent::PenaltyRecheck {
                artificial: tableau.basic_name(row).to_string(),
                value: tableau.basic_value(row),
            });
            return self.recheck_feasibility(problem, run);
        }

        match outcome {
            LoopOutcome::Unbounded => Ok(run.stop(SolutionStatus::Unbounded)),
            _ => Ok(self.finish(problem, &tableau, run)),
        }
    }

    /// The configured M scaled by the largest objective coefficient, so the
    /// penalty always dominates the real costs.
    fn penalty(&self, problem: &LpProblem) -> f64 {
        let scale = problem
            .objective
            .coefficients
            .iter()
            .fold(1.0f64, |acc, c| acc.max(c.abs()));
        self.big_m * scale
    }

    /// Runs phase 1 on a fresh tableau after an inconclusive Big-M solve and,
    /// when the problem turns out feasible, finishes from that basis.
    fn recheck_feasibility(&self, problem: &LpProblem, mut run: Run) -> Result<SimplexSolution, ValidationError> {
        debug!("artificial still positive under Big M, checking feasibility");
        let mut tableau = Tableau::build(problem, &mut Trace::new());
        if let Some(status) = self.phase1(&mut tableau, &mut run) {
            return Ok(run.stop(status));
        }
        run.trace.push(TraceEvent::PhaseStarted { phase: 2 });
        self.phase2(problem, tableau, run)
    }

    /// Minimizes the sum of artificials. Returns a terminal status when the
    /// problem cannot proceed to phase 2.
    fn phase1(&self, tableau: &mut Tableau, run: &mut Run) -> Option<SolutionStatus> {
        run.trace.push(TraceEvent::PhaseStarted { phase: 1 });

        let costs: Vec<f64> = (0..tableau.num_columns())
            .map(|j| if tableau.is_artificial(j) { 1.0 } else { 0.0 })
            .collect();
        tableau.set_objective(&costs, self.tolerance);

        let index = run.record(tableau.snapshot(Some(1), run.iterations, "Initial tableau, phase 1 (minimize W)"));
        run.trace.push(TraceEvent::InitialTableau { tableau: index });

        match self.iterate(tableau, Sense::Minimize, Some(1), run, |_| true) {
            LoopOutcome::Optimal => {}
            // W is bounded below by zero, so this only happens through rounding
            LoopOutcome::Unbounded => return Some(SolutionStatus::Infeasible),
            LoopOutcome::IterationLimit => return Some(SolutionStatus::IterationLimit),
        }

        let w = tableau.objective_value();
        run.trace.push(TraceEvent::PhaseCompleted {
            phase: 1,
            objective_value: w,
        });
        if w > self.tolerance * 1f64.max(w.abs()) || !tableau.positive_artificials(self.tolerance).is_empty() {
            debug!(w, "phase 1 ended with positive artificial sum");
            run.trace.push(TraceEvent::Infeasible {
                reason: format!("phase 1 ended with W = {:.6} > 0", w),
            });
            return Some(SolutionStatus::Infeasible);
        }

        self.drive_out_artificials(tableau, run);
        None
    }

    /// Pivots zero-valued artificials out of the basis where a non-artificial
    /// column can replace them; rows with no such column are redundant.
    fn drive_out_artificials(&self, tableau: &mut Tableau, run: &mut Run) {
        for row in 0..tableau.num_rows() {
            let basic = tableau.basic_vars[row];
            if !tableau.is_artificial(basic) {
                continue;
            }
            let artificial = tableau.column_name(basic).to_string();
            let replacement = (0..tableau.num_columns())
                .find(|&j| !tableau.is_artificial(j) && tableau.entry(row, j).abs() > self.tolerance);
            if let Some(col) = replacement {
                let element = tableau.entry(row, col);
                tableau.pivot(row, col, self.tolerance);
                let mut snapshot = tableau.snapshot(
                    Some(1),
                    run.iterations,
                    format!("{} replaces {} in the basis", tableau.column_name(col), artificial),
                );
                snapshot.entering_column = Some(col);
                snapshot.leaving_row = Some(row);
                snapshot.pivot_element = Some(element);
                run.record(snapshot);
            }
            run.trace.push(TraceEvent::ArtificialDrivenOut {
                row,
                artificial,
                replacement: replacement.map(|col| tableau.column_name(col).to_string()),
            });
        }
    }

    /// Optimizes the original objective with artificial columns barred.
    fn phase2(
        &self,
        problem: &LpProblem,
        mut tableau: Tableau,
        mut run: Run,
    ) -> Result<SimplexSolution, ValidationError> {
        let costs = self.costs(problem, &tableau, 0.0);
        tableau.set_objective(&costs, self.tolerance);

        let index = run.record(tableau.snapshot(Some(2), run.iterations, "Initial tableau, phase 2"));
        run.trace.push(TraceEvent::InitialTableau { tableau: index });

        let barred: Vec<bool> = (0..tableau.num_columns()).map(|j| tableau.is_artificial(j)).collect();
        match self.iterate(&mut tableau, problem.objective.sense, Some(2), &mut run, |j| !barred[j]) {
            LoopOutcome::Optimal => Ok(self.finish(problem, &tableau, run)),
            LoopOutcome::Unbounded => Ok(run.stop(SolutionStatus::Unbounded)),
            LoopOutcome::IterationLimit => Ok(run.stop(SolutionStatus::IterationLimit)),
        }
    }

    /// Objective coefficients per column; `artificial_cost` for artificials.
    fn costs(&self, problem: &LpProblem, tableau: &Tableau, artificial_cost: f64) -> Vec<f64> {
        (0..tableau.num_columns())
            .map(|j| match tableau.columns[j].kind {
                ColumnKind::Decision => problem.objective.coefficients[j],
                ColumnKind::Artificial => artificial_cost,
                ColumnKind::Slack | ColumnKind::Surplus => 0.0,
            })
            .collect()
    }

    /// Pivots until no column improves the objective, a column is unbounded,
    /// or the iteration cap is hit.
    fn iterate(
        &self,
        tableau: &mut Tableau,
        sense: Sense,
        phase: Option<u8>,
        run: &mut Run,
        allowed: impl Fn(usize) -> bool,
    ) -> LoopOutcome {
        loop {
            let Some(col) = tableau.entering_column(sense, &allowed, self.tolerance) else {
                run.trace.push(TraceEvent::OptimalityReached {
                    iteration: run.iterations,
                });
                return LoopOutcome::Optimal;
            };

            if run.iterations >= run.limit {
                warn!(limit = run.limit, "simplex iteration limit reached");
                run.trace.push(TraceEvent::IterationLimit { limit: run.limit });
                return LoopOutcome::IterationLimit;
            }
            let iteration = run.iterations + 1;
            let entering = tableau.column_name(col).to_string();
            run.trace.push(TraceEvent::EnteringVariable {
                iteration,
                column: col,
                variable: entering.clone(),
                reduced_cost: tableau.reduced_cost(col),
            });

            let (ratios, leaving_row) = tableau.ratio_test(col, self.tolerance);
            run.trace.push(TraceEvent::RatioTest {
                iteration,
                ratios: ratios.clone(),
                leaving_row,
                leaving_variable: leaving_row.map(|row| tableau.basic_name(row).to_string()),
            });

            let Some(row) = leaving_row else {
                debug!(iteration, entering = %entering, "no positive entry in entering column");
                run.trace.push(TraceEvent::Unbounded { variable: entering });
                return LoopOutcome::Unbounded;
            };

            let leaving = tableau.basic_name(row).to_string();
            let element = tableau.entry(row, col);
            let before = tableau.objective_value();
            tableau.pivot(row, col, self.tolerance);
            run.iterations = iteration;
            debug!(iteration, entering = %entering, leaving = %leaving, pivot = element, "pivot");
            trace!("tableau after pivot {}:\n{}", iteration, tableau);

            let mut snapshot = tableau.snapshot(
                phase,
                iteration,
                format!("Iteration {}: {} enters, {} leaves", iteration, entering, leaving),
            );
            snapshot.entering_column = Some(col);
            snapshot.leaving_row = Some(row);
            snapshot.pivot_element = Some(element);
            snapshot.ratios = ratios;
            let index = run.record(snapshot);

            run.trace.push(TraceEvent::Pivot {
                iteration,
                row,
                column: col,
                pivot_element: element,
                entering,
                leaving,
                objective_before: before,
                objective_after: tableau.objective_value(),
                tableau: index,
            });
        }
    }

    fn finish(&self, problem: &LpProblem, tableau: &Tableau, mut run: Run) -> SimplexSolution {
        let assignment = tableau.assignment();
        let optimal_value = problem.objective.evaluate(&assignment);

        let ties = tableau.zero_reduced_costs(self.tolerance);
        let solution_type = if ties.is_empty() {
            SolutionType::Unique
        } else {
            SolutionType::Multiple
        };
        let degenerate = tableau.is_degenerate(self.tolerance);
        debug!(value = optimal_value, %solution_type, degenerate, iterations = run.iterations, "optimal");

        run.trace.push(TraceEvent::Solution {
            value: optimal_value,
            assignment: assignment.clone(),
            variables: tableau.columns[..tableau.n_decision].iter().map(|c| c.name.clone()).collect(),
        });

        SimplexSolution {
            status: SolutionStatus::Optimal,
            assignment,
            optimal_value: Some(optimal_value),
            solution_type: Some(solution_type),
            degenerate,
            iterations: run.iterations,
            tableaus: run.tableaus,
            trace: run.trace,
        }
    }
}
