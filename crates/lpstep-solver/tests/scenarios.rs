use approx::assert_abs_diff_eq;
use lpstep_solver::{
    Discipline, GraphicalSolver, LpProblem, Point, Relation, Sense, SimplexSolver, SolutionStatus,
    SolutionType, TraceEvent, DEFAULT_TOLERANCE,
};

fn contains(points: &[Point], x: f64, y: f64) -> bool {
    points.iter().any(|p| p.approx_eq(&Point::new(x, y), 1e-9))
}

#[test]
fn scenario_a_unique_graphical_optimum() {
    let problem = LpProblem::maximize(vec![3.0, 2.0]).with_constraint(vec![1.0, 1.0], Relation::Le, 4.0);
    let solution = GraphicalSolver::new().solve(&problem).unwrap();

    assert_eq!(solution.status, SolutionStatus::Optimal);
    let vertices: Vec<Point> = solution.vertices.iter().map(|v| v.point).collect();
    assert_eq!(vertices.len(), 3);
    for (x, y) in [(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)] {
        assert!(contains(&vertices, x, y), "missing vertex ({}, {})", x, y);
    }
    assert_eq!(solution.optimal_points, vec![Point::new(4.0, 0.0)]);
    assert_abs_diff_eq!(solution.optimal_value.unwrap(), 12.0, epsilon = 1e-9);
    assert_eq!(solution.solution_type, Some(SolutionType::Unique));
}

#[test]
fn scenario_b_graphical_infeasible() {
    let problem = LpProblem::maximize(vec![1.0, 1.0])
        .with_constraint(vec![1.0, 0.0], Relation::Ge, 5.0)
        .with_constraint(vec![1.0, 0.0], Relation::Le, 2.0)
        .with_constraint(vec![0.0, 1.0], Relation::Ge, 0.0);
    let solution = GraphicalSolver::new().solve(&problem).unwrap();

    assert_eq!(solution.status, SolutionStatus::Infeasible);
    assert!(solution.vertices.is_empty());
    assert!(solution.optimal_value.is_none());
    assert!(matches!(solution.trace.events().last(), Some(TraceEvent::Infeasible { .. })));
}

#[test]
fn scenario_c_graphical_multiple_optima() {
    let problem = LpProblem::maximize(vec![1.0, 1.0]).with_constraint(vec![1.0, 1.0], Relation::Le, 4.0);
    let solution = GraphicalSolver::new().solve(&problem).unwrap();

    assert_eq!(solution.status, SolutionStatus::Optimal);
    assert_eq!(solution.solution_type, Some(SolutionType::Multiple));
    assert_abs_diff_eq!(solution.optimal_value.unwrap(), 4.0, epsilon = 1e-9);
    assert!(contains(&solution.optimal_points, 4.0, 0.0));
    assert!(contains(&solution.optimal_points, 0.0, 4.0));
}

#[test]
fn scenario_d_simplex_unbounded() {
    let problem = LpProblem::maximize(vec![1.0]).with_constraint(vec![1.0], Relation::Ge, 0.0);

    for discipline in [Discipline::BigM, Discipline::TwoPhase] {
        let solution = SimplexSolver::new().with_discipline(discipline).solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::Unbounded, "{}", discipline);
        assert!(solution.optimal_value.is_none());
        let last = solution.trace.events().last();
        assert!(matches!(last, Some(TraceEvent::Unbounded { .. })), "{:?}", last);
    }
}

#[test]
fn scenario_e_simplex_single_pivot() {
    let problem = LpProblem::maximize(vec![2.0, 3.0]).with_constraint(vec![1.0, 1.0], Relation::Le, 4.0);
    let solution = SimplexSolver::new().solve(&problem).unwrap();

    assert_eq!(solution.status, SolutionStatus::Optimal);
    assert_eq!(solution.iterations, 1);
    assert_eq!(solution.tableaus.len(), 2);
    assert_abs_diff_eq!(solution.optimal_value.unwrap(), 12.0, epsilon = 1e-9);
    assert_abs_diff_eq!(solution.assignment[0], 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(solution.assignment[1], 4.0, epsilon = 1e-9);
    assert_eq!(solution.solution_type, Some(SolutionType::Unique));

    let pivot = &solution.tableaus[1];
    assert_eq!(pivot.entering_column, Some(1));
    assert_eq!(pivot.leaving_row, Some(0));
    assert_eq!(pivot.pivot_element, Some(1.0));
    assert_eq!(pivot.ratios, vec![Some(4.0)]);
}

/// Problems used for the property checks below.
fn sample_problems() -> Vec<LpProblem> {
    vec![
        LpProblem::maximize(vec![3.0, 5.0])
            .with_constraint(vec![1.0, 0.0], Relation::Le, 4.0)
            .with_constraint(vec![0.0, 2.0], Relation::Le, 12.0)
            .with_constraint(vec![3.0, 2.0], Relation::Le, 18.0),
        LpProblem::minimize(vec![2.0, 3.0])
            .with_constraint(vec![1.0, 1.0], Relation::Ge, 4.0)
            .with_constraint(vec![1.0, 3.0], Relation::Ge, 6.0)
            .with_constraint(vec![1.0, 0.0], Relation::Le, 5.0),
        LpProblem::maximize(vec![1.0, 2.0])
            .with_constraint(vec![1.0, 1.0], Relation::Eq, 5.0)
            .with_constraint(vec![0.0, 1.0], Relation::Le, 3.0),
        LpProblem::minimize(vec![1.0, 1.0])
            .with_constraint(vec![-1.0, -2.0], Relation::Le, -4.0)
            .with_constraint(vec![3.0, 1.0], Relation::Ge, 6.0),
    ]
}

#[test]
fn every_graphical_vertex_is_feasible() {
    let solver = GraphicalSolver::new();
    for problem in sample_problems() {
        let solution = solver.solve(&problem).unwrap();
        for v in &solution.vertices {
            let coords = v.point.coords();
            assert!(v.point.x >= -1e-9 && v.point.y >= -1e-9, "{}", v.point);
            for c in &problem.constraints {
                assert!(c.is_satisfied(&coords, 1e-9), "{} violates {:?}", v.point, c);
            }
        }
    }
}

#[test]
fn parallel_pairs_yield_no_intersection() {
    // R1 and R2 are parallel; every other pair meets
    let problem = LpProblem::maximize(vec![1.0, 1.0])
        .with_constraint(vec![1.0, 1.0], Relation::Le, 4.0)
        .with_constraint(vec![2.0, 2.0], Relation::Ge, 2.0);
    let solution = GraphicalSolver::new().solve(&problem).unwrap();

    let parallel: Vec<_> = solution
        .trace
        .iter()
        .filter_map(|e| match e {
            TraceEvent::ParallelLines { lines } => Some(lines.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(parallel, vec![["R1".to_string(), "R2".to_string()]]);
    assert!(!solution.trace.iter().any(|e| matches!(
        e,
        TraceEvent::Intersection { lines, .. } if lines[0] == "R1" && lines[1] == "R2"
    )));
}

#[test]
fn graphical_and_simplex_agree() {
    for problem in sample_problems() {
        let graphical = GraphicalSolver::new().solve(&problem).unwrap();
        for discipline in [Discipline::BigM, Discipline::TwoPhase] {
            let simplex = SimplexSolver::new().with_discipline(discipline).solve(&problem).unwrap();
            assert_eq!(simplex.status, SolutionStatus::Optimal, "{}", discipline);
            assert_abs_diff_eq!(
                simplex.optimal_value.unwrap(),
                graphical.optimal_value.unwrap(),
                epsilon = 1e-6
            );
        }
    }
}

#[test]
fn optimal_value_round_trips_through_assignment() {
    for problem in sample_problems() {
        let simplex = SimplexSolver::new().solve(&problem).unwrap();
        let value = problem.objective.evaluate(&simplex.assignment);
        assert_abs_diff_eq!(value, simplex.optimal_value.unwrap(), epsilon = 1e-9);

        let graphical = GraphicalSolver::new().solve(&problem).unwrap();
        for p in &graphical.optimal_points {
            let value = problem.objective.evaluate(&p.coords());
            assert_abs_diff_eq!(value, graphical.optimal_value.unwrap(), epsilon = 1e-9);
        }
    }
}

#[test]
fn final_objective_row_admits_no_improving_column() {
    for problem in sample_problems() {
        let solution = SimplexSolver::new().with_discipline(Discipline::TwoPhase).solve(&problem).unwrap();
        let last = solution.tableaus.last().unwrap();
        let objective_row = last.grid.last().unwrap();
        for (j, name) in last.columns.iter().enumerate() {
            if name.starts_with('a') {
                continue;
            }
            let entry = objective_row[j];
            match problem.objective.sense {
                Sense::Maximize => assert!(entry >= -DEFAULT_TOLERANCE, "{} = {}", name, entry),
                Sense::Minimize => assert!(entry <= DEFAULT_TOLERANCE, "{} = {}", name, entry),
            }
        }
    }
}

#[test]
fn leaving_row_has_minimum_ratio() {
    for problem in sample_problems() {
        let solution = SimplexSolver::new().solve(&problem).unwrap();
        for snapshot in solution.tableaus.iter().filter(|t| t.leaving_row.is_some()) {
            let row = snapshot.leaving_row.unwrap();
            let chosen = snapshot.ratios[row].expect("leaving row must have a ratio");
            assert!(chosen >= -1e-9);
            for ratio in snapshot.ratios.iter().flatten() {
                assert!(chosen <= ratio + 1e-9, "{} > {}", chosen, ratio);
            }
        }
    }
}

#[test]
fn iteration_cap_is_distinct_from_unbounded() {
    let problem = sample_problems().remove(0);
    let solution = SimplexSolver::new().with_max_iterations(1).solve(&problem).unwrap();
    assert_eq!(solution.status, SolutionStatus::IterationLimit);
    assert_ne!(solution.status, SolutionStatus::Unbounded);
}

#[test]
fn infeasible_simplex_under_both_disciplines() {
    let problem = LpProblem::maximize(vec![1.0, 1.0])
        .with_constraint(vec![1.0, 0.0], Relation::Ge, 5.0)
        .with_constraint(vec![1.0, 0.0], Relation::Le, 2.0)
        .with_constraint(vec![0.0, 1.0], Relation::Le, 3.0);
    for discipline in [Discipline::BigM, Discipline::TwoPhase] {
        let solution = SimplexSolver::new().with_discipline(discipline).solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::Infeasible, "{}", discipline);
    }
}
