use std::fmt;

use crate::problem::{LpProblem, Relation, Sense};
use crate::solution::TableauSnapshot;
use crate::trace::{Trace, TraceEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnKind {
    Decision,
    Slack,
    Surplus,
    Artificial,
}

#[derive(Debug, Clone)]
pub(crate) struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Dense simplex tableau.
///
/// Rows `0..m` hold the constraints and row `m` the objective in `Z - c·x = 0`
/// form, so its last entry is the current objective value. The last column
/// is the solution column.
#[derive(Debug, Clone)]
pub(crate) struct Tableau {
    pub data: Vec<Vec<f64>>,
    pub basic_vars: Vec<usize>,
    pub columns: Vec<Column>,
    pub n_decision: usize,
}

impl Tableau {
    /// Converts `problem` to standard form: a slack for each `<=` row, a
    /// surplus and an artificial for each `>=` row, an artificial for each
    /// `=` row. Rows with a negative bound are negated first.
    pub fn build(problem: &LpProblem, trace: &mut Trace) -> Self {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // Normalize rows so every bound is non-negative
        let mut rows: Vec<(Vec<f64>, Relation, f64)> = Vec::with_capacity(n_constraints);
        for (i, c) in problem.constraints.iter().enumerate() {
            if c.bound < 0.0 {
                let relation = c.relation.flipped();
                trace.push(TraceEvent::RowNormalized {
                    label: format!("R{}", i + 1),
                    relation,
                });
                rows.push((c.coefficients.iter().map(|v| -v).collect(), relation, -c.bound));
            } else {
                rows.push((c.coefficients.clone(), c.relation, c.bound));
            }
        }

        let n_slack = rows.iter().filter(|r| r.1 == Relation::Le).count();
        let n_surplus = rows.iter().filter(|r| r.1 == Relation::Ge).count();
        let n_artificial = rows.iter().filter(|r| r.1 != Relation::Le).count();

        let mut columns: Vec<Column> = (1..=n_vars)
            .map(|i| Column {
                name: format!("x{}", i),
                kind: ColumnKind::Decision,
            })
            .collect();
        for (prefix, kind, count) in [
            ("s", ColumnKind::Slack, n_slack),
            ("e", ColumnKind::Surplus, n_surplus),
            ("a", ColumnKind::Artificial, n_artificial),
        ] {
            columns.extend((1..=count).map(|i| Column {
                name: format!("{}{}", prefix, i),
                kind,
            }));
        }

        let total_cols = columns.len() + 1; // +1 for solution
        let mut data = vec![vec![0.0; total_cols]; n_constraints + 1];
        let mut basic_vars = vec![0; n_constraints];

        let mut slack_idx = n_vars;
        let mut surplus_idx = n_vars + n_slack;
        let mut artificial_idx = n_vars + n_slack + n_surplus;

        for (i, (coefficients, relation, bound)) in rows.iter().enumerate() {
            data[i][..n_vars].copy_from_slice(coefficients);
            data[i][total_cols - 1] = *bound;
            match relation {
                Relation::Le => {
                    data[i][slack_idx] = 1.0;
                    basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                Relation::Ge => {
                    data[i][surplus_idx] = -1.0;
                    surplus_idx += 1;
                    data[i][artificial_idx] = 1.0;
                    basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                Relation::Eq => {
                    data[i][artificial_idx] = 1.0;
                    basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        Self {
            data,
            basic_vars,
            columns,
            n_decision: n_vars,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.data.len() - 1
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    fn obj_row(&self) -> usize {
        self.data.len() - 1
    }

    fn rhs_col(&self) -> usize {
        self.columns.len()
    }

    pub fn count(&self, kind: ColumnKind) -> usize {
        self.columns.iter().filter(|c| c.kind == kind).count()
    }

    pub fn is_artificial(&self, col: usize) -> bool {
        self.columns[col].kind == ColumnKind::Artificial
    }

    pub fn objective_value(&self) -> f64 {
        self.data[self.obj_row()][self.rhs_col()]
    }

    pub fn reduced_cost(&self, col: usize) -> f64 {
        self.data[self.obj_row()][col]
    }

    pub fn basic_value(&self, row: usize) -> f64 {
        self.data[row][self.rhs_col()]
    }

    pub fn entry(&self, row: usize, col: usize) -> f64 {
        self.data[row][col]
    }

    pub fn column_name(&self, col: usize) -> &str {
        &self.columns[col].name
    }

    pub fn basic_name(&self, row: usize) -> &str {
        self.column_name(self.basic_vars[row])
    }

    /// Loads `costs` (one per column) into the objective row as `-c` and
    /// prices out the current basis.
    pub fn set_objective(&mut self, costs: &[f64], tolerance: f64) {
        let obj = self.obj_row();
        let rhs = self.rhs_col();
        for (j, cost) in costs.iter().enumerate() {
            self.data[obj][j] = -cost;
        }
        self.data[obj][rhs] = 0.0;
        self.price_out(tolerance);
    }

    /// Eliminates basic columns from the objective row so it holds reduced
    /// costs only.
    pub fn price_out(&mut self, tolerance: f64) {
        let obj = self.obj_row();
        for i in 0..self.num_rows() {
            let basic = self.basic_vars[i];
            let factor = self.data[obj][basic];
            if factor.abs() > tolerance {
                for j in 0..self.data[i].len() {
                    self.data[obj][j] -= factor * self.data[i][j];
                }
            }
        }
    }

    /// Most improving column among those `allowed`: most negative objective
    /// row coefficient when maximizing, most positive when minimizing.
    /// Ties go to the lowest index.
    pub fn entering_column(&self, sense: Sense, allowed: impl Fn(usize) -> bool, tolerance: f64) -> Option<usize> {
        let obj = self.obj_row();
        let mut best: Option<(usize, f64)> = None;
        for j in 0..self.num_columns() {
            if !allowed(j) {
                continue;
            }
            // Improvement measured as a positive number for both senses
            let gain = match sense {
                Sense::Maximize => -self.data[obj][j],
                Sense::Minimize => self.data[obj][j],
            };
            let better = match best {
                None => gain > tolerance,
                Some((_, best_gain)) => gain > best_gain + tolerance,
            };
            if better {
                best = Some((j, gain));
            }
        }
        best.map(|(j, _)| j)
    }

    /// Minimum ratio test on `col`. Rows whose entry is not strictly positive
    /// get `None`. Ties go to the lowest row.
    pub fn ratio_test(&self, col: usize, tolerance: f64) -> (Vec<Option<f64>>, Option<usize>) {
        let rhs = self.rhs_col();
        let ratios: Vec<Option<f64>> = (0..self.num_rows())
            .map(|i| {
                let val = self.data[i][col];
                if val > tolerance {
                    Some(self.data[i][rhs] / val)
                } else {
                    None
                }
            })
            .collect();

        let mut min_row: Option<(usize, f64)> = None;
        for (i, ratio) in ratios.iter().enumerate() {
            let Some(ratio) = *ratio else {
                continue;
            };
            let better = match min_row {
                None => true,
                Some((_, min_ratio)) => ratio < min_ratio - tolerance,
            };
            if better {
                min_row = Some((i, ratio));
            }
        }

        (ratios, min_row.map(|(i, _)| i))
    }

    pub fn pivot(&mut self, row: usize, col: usize, tolerance: f64) {
        let n_rows = self.data.len();
        let n_cols = self.data[0].len();

        // Update basic variable
        self.basic_vars[row] = col;

        // Scale pivot row
        let pivot_val = self.data[row][col];
        for j in 0..n_cols {
            self.data[row][j] /= pivot_val;
        }
        self.data[row][col] = 1.0;

        // Eliminate column in other rows
        for i in 0..n_rows {
            if i != row {
                let factor = self.data[i][col];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n_cols {
                    self.data[i][j] -= factor * self.data[row][j];
                    if self.data[i][j].abs() < tolerance * 1e-3 {
                        self.data[i][j] = 0.0;
                    }
                }
                self.data[i][col] = 0.0;
            }
        }
    }

    /// Values of the decision variables: basic ones read from the solution
    /// column, non-basic ones are zero.
    pub fn assignment(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.n_decision];
        for (i, &basic) in self.basic_vars.iter().enumerate() {
            if basic < self.n_decision {
                values[basic] = self.basic_value(i) + 0.0;
            }
        }
        values
    }

    /// Basic artificial variables still holding a positive value.
    pub fn positive_artificials(&self, tolerance: f64) -> Vec<usize> {
        (0..self.num_rows())
            .filter(|&i| self.is_artificial(self.basic_vars[i]) && self.basic_value(i) > tolerance)
            .collect()
    }

    /// Non-basic, non-artificial columns with a zero reduced cost.
    pub fn zero_reduced_costs(&self, tolerance: f64) -> Vec<usize> {
        (0..self.num_columns())
            .filter(|&j| {
                !self.is_artificial(j) && !self.basic_vars.contains(&j) && self.reduced_cost(j).abs() <= tolerance
            })
            .collect()
    }

    /// Whether a non-artificial basic variable sits at zero.
    pub fn is_degenerate(&self, tolerance: f64) -> bool {
        (0..self.num_rows())
            .any(|i| !self.is_artificial(self.basic_vars[i]) && self.basic_value(i).abs() <= tolerance)
    }

    pub fn snapshot(&self, phase: Option<u8>, iteration: usize, description: impl Into<String>) -> TableauSnapshot {
        TableauSnapshot {
            phase,
            iteration,
            columns: self.columns.iter().map(|c| c.name.clone()).collect(),
            grid: self
                .data
                .iter()
                .map(|row| row.iter().map(|v| v + 0.0).collect())
                .collect(),
            basic_variables: (0..self.num_rows()).map(|i| self.basic_name(i).to_string()).collect(),
            entering_column: None,
            leaving_row: None,
            pivot_element: None,
            ratios: Vec::new(),
            description: description.into(),
        }
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}", "basis")?;
        for c in &self.columns {
            write!(f, " {:>10}", c.name)?;
        }
        writeln!(f, " {:>10}", "sol")?;
        for (i, row) in self.data.iter().enumerate() {
            let label = if i < self.num_rows() { self.basic_name(i) } else { "Z" };
            write!(f, "{:>6}", label)?;
            for v in row {
                write!(f, " {:>10.4}", v)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
