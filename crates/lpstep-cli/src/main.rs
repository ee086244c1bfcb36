use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use lpstep_solver::{
    format_number, variable_names, Discipline, GraphicalResponse, GraphicalSolution,
    GraphicalSolver, LpProblem, SimplexResponse, SimplexSolution, SimplexSolver, SolutionStatus,
    TableauSnapshot, Trace,
};
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lpstep")]
#[command(version, about = "Solve small linear programs step by step", long_about = None)]
struct Cli {
    /// Emit logs as JSON (filter with RUST_LOG)
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a two-variable problem by enumerating vertices
    Graphical {
        #[command(flatten)]
        input: InputArgs,
        /// Tolerance for parallel lines, feasibility and ties
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// Solve a problem with the tableau simplex method
    Simplex {
        #[command(flatten)]
        input: InputArgs,
        /// Tolerance for zero tests and ties
        #[arg(long)]
        tolerance: Option<f64>,
        /// Stop after this many pivots
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Use the two-phase method instead of Big M
        #[arg(long)]
        two_phase: bool,
        /// Penalty on artificial variables under Big M
        #[arg(long, conflicts_with = "two_phase")]
        big_m: Option<f64>,
        /// Print every tableau in text output
        #[arg(long)]
        tableaus: bool,
    },
    /// Check a problem for errors, optionally testing a point against it
    Check {
        /// The problem file (JSON or text), `-` for stdin
        file: PathBuf,
        /// Comma separated values, one per variable
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        point: Option<Vec<f64>>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// The problem file (JSON or text), `-` for stdin
    file: PathBuf,
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// A problem together with the names of its variables.
struct Input {
    variables: Vec<String>,
    problem: LpProblem,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(cli.log_json);

    let optimal = match cli.command {
        Commands::Graphical { input, tolerance } => graphical_command(input, tolerance)?,
        Commands::Simplex {
            input,
            tolerance,
            max_iterations,
            two_phase,
            big_m,
            tableaus,
        } => {
            let mut solver = SimplexSolver::new();
            if let Some(tol) = tolerance {
                solver = solver.with_tolerance(tol);
            }
            if let Some(max) = max_iterations {
                solver = solver.with_max_iterations(max);
            }
            if let Some(m) = big_m {
                solver = solver.with_big_m(m);
            }
            if two_phase {
                solver = solver.with_discipline(Discipline::TwoPhase);
            }
            simplex_command(input, &solver, tableaus)?
        }
        Commands::Check { file, point } => check_command(file, point)?,
    };

    if !optimal {
        std::process::exit(1);
    }
    Ok(())
}

fn initialize_tracing(log_json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if log_json {
        builder.json().try_init().ok();
    } else {
        builder.try_init().ok();
    }
}

fn read_source(file: &PathBuf) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Error reading stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(file).with_context(|| format!("Error reading {}", file.display()))
}

/// JSON when the source is an object, problem text otherwise.
fn load_problem(file: &PathBuf) -> Result<Input> {
    let source = read_source(file)?;
    if source.trim_start().starts_with('{') {
        let problem: LpProblem = serde_json::from_str(&source).context("Invalid JSON problem")?;
        debug!(variables = problem.num_variables(), "loaded JSON problem");
        let variables = variable_names(problem.num_variables());
        return Ok(Input { variables, problem });
    }

    let compiled = lpstep_lang::parse_problem(&source)
        .with_context(|| format!("Cannot compile {}", file.display()))?;
    debug!(variables = ?compiled.variables, "compiled problem text");
    Ok(Input {
        variables: compiled.variables,
        problem: compiled.problem,
    })
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    handle.write_all(b"\n")?;
    handle.flush()?;
    Ok(())
}

fn print_trace(trace: &Trace) {
    println!("Steps:");
    for (i, line) in trace.render().iter().enumerate() {
        println!("  {:3}. {}", i + 1, line);
    }
}

fn graphical_command(args: InputArgs, tolerance: Option<f64>) -> Result<bool> {
    let input = load_problem(&args.file)?;
    let mut solver = GraphicalSolver::new();
    if let Some(tol) = tolerance {
        solver = solver.with_tolerance(tol);
    }
    let solution = solver
        .solve(&input.problem)
        .context("Problem validation failed")?;
    let optimal = solution.status == SolutionStatus::Optimal;

    match args.format {
        Format::Json => print_json(&GraphicalResponse::from(solution))?,
        Format::Text => print_graphical(&input, &solution),
    }
    Ok(optimal)
}

fn print_graphical(input: &Input, solution: &GraphicalSolution) {
    println!("Status: {}", solution.status);
    if let (Some(value), Some(kind)) = (solution.optimal_value, solution.solution_type) {
        println!("Optimal value: {:.4} ({} solution)", value, kind);
        for p in &solution.optimal_points {
            println!(
                "  {} = {:.4}, {} = {:.4}",
                input.variables[0], p.x, input.variables[1], p.y
            );
        }
    }
    if !solution.vertices.is_empty() {
        println!();
        println!("Vertices:");
        for v in &solution.vertices {
            println!("  {:24} Z = {:.4}", v.point.to_string(), v.value);
        }
    }
    println!();
    print_trace(&solution.trace);
}

fn simplex_command(args: InputArgs, solver: &SimplexSolver, show_tableaus: bool) -> Result<bool> {
    let input = load_problem(&args.file)?;
    let solution = solver
        .solve(&input.problem)
        .context("Problem validation failed")?;
    let optimal = solution.status == SolutionStatus::Optimal;

    match args.format {
        Format::Json => print_json(&SimplexResponse::from(solution))?,
        Format::Text => print_simplex(&input, &solution, show_tableaus),
    }
    Ok(optimal)
}

fn print_simplex(input: &Input, solution: &SimplexSolution, show_tableaus: bool) {
    println!("Status: {}", solution.status);
    println!("Iterations: {}", solution.iterations);
    if let (Some(value), Some(kind)) = (solution.optimal_value, solution.solution_type) {
        println!("Optimal value: {:.4} ({} solution)", value, kind);
        for (name, v) in input.variables.iter().zip(&solution.assignment) {
            println!("  {:10} {:12.4}", name, v);
        }
        if solution.degenerate {
            println!("The final basis is degenerate.");
        }
    }
    println!();

    if show_tableaus {
        for t in &solution.tableaus {
            println!("{}", format_tableau(t));
        }
    }
    print_trace(&solution.trace);
}

fn format_tableau(t: &TableauSnapshot) -> String {
    let mut out = String::new();
    match t.phase {
        Some(phase) => out.push_str(&format!("[phase {}] {}\n", phase, t.description)),
        None => out.push_str(&format!("{}\n", t.description)),
    }
    out.push_str(&format!("{:>6}", "basis"));
    for name in &t.columns {
        out.push_str(&format!(" {:>10}", name));
    }
    out.push_str(&format!(" {:>10} {:>10}\n", "sol", "ratio"));

    for (i, row) in t.grid.iter().enumerate() {
        let label = t.basic_variables.get(i).map(String::as_str).unwrap_or("Z");
        let marker = if t.leaving_row == Some(i) { '>' } else { ' ' };
        out.push_str(&format!("{}{:>5}", marker, label));
        for v in row {
            out.push_str(&format!(" {:>10.4}", v));
        }
        if let Some(ratio) = t.ratios.get(i) {
            match ratio {
                Some(r) => out.push_str(&format!(" {:>10.4}", r)),
                None => out.push_str(&format!(" {:>10}", "-")),
            }
        }
        out.push('\n');
    }
    if let (Some(col), Some(element)) = (t.entering_column, t.pivot_element) {
        out.push_str(&format!(
            "entering {}, pivot element {:.4}\n",
            t.columns[col], element
        ));
    }
    out
}

fn check_command(file: PathBuf, point: Option<Vec<f64>>) -> Result<bool> {
    let input = load_problem(&file)?;
    input
        .problem
        .validate()
        .context("Problem validation failed")?;

    println!(
        "OK: {} variables, {} constraints",
        input.problem.num_variables(),
        input.problem.num_constraints()
    );
    println!(
        "  {} Z = {}",
        input.problem.objective.sense,
        lpstep_solver::format_expression(&input.problem.objective.coefficients, &input.variables)
    );
    for (i, c) in input.problem.constraints.iter().enumerate() {
        println!(
            "  R{}: {} {} {}",
            i + 1,
            lpstep_solver::format_expression(&c.coefficients, &input.variables),
            c.relation,
            format_number(c.bound)
        );
    }

    let Some(point) = point else {
        return Ok(true);
    };
    if point.len() != input.problem.num_variables() {
        anyhow::bail!(
            "Point has {} values, the problem has {} variables",
            point.len(),
            input.problem.num_variables()
        );
    }

    println!();
    println!("Z = {:.4}", input.problem.objective.evaluate(&point));
    let mut feasible = true;
    for (i, v) in point.iter().enumerate() {
        if *v < 0.0 {
            feasible = false;
            println!("  {} = {:.4} violates {} >= 0", input.variables[i], v, input.variables[i]);
        }
    }
    for (i, c) in input.problem.constraints.iter().enumerate() {
        let violation = c.violation(&point);
        if violation > 0.0 && !c.is_satisfied(&point, lpstep_solver::DEFAULT_TOLERANCE) {
            feasible = false;
            println!("  R{}: lhs {:.4}, violated by {:.4}", i + 1, c.lhs(&point), violation);
        } else {
            println!("  R{}: lhs {:.4}, satisfied", i + 1, c.lhs(&point));
        }
    }
    println!("{}", if feasible { "Point is feasible" } else { "Point is not feasible" });
    Ok(feasible)
}
