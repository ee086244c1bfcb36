//! WASM bindings for lpstep
//!
//! Requests and responses use the same JSON shapes as the solver's wire
//! module, converted to and from JavaScript values.

use wasm_bindgen::prelude::*;

use crate::compiler::{parse_problem as compile_problem, CompileError};
use crate::lexer::{Lexer, TokenKind};
use lpstep_solver::{
    Discipline, GraphicalResponse, GraphicalSolver, LpProblem, SimplexResponse, SimplexSolver,
    Trace,
};

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Solve a two-variable problem by vertex enumeration
#[wasm_bindgen]
pub fn solve_graphical(request: JsValue) -> Result<JsValue, JsValue> {
    let problem: LpProblem = serde_wasm_bindgen::from_value(request).map_err(to_js_error)?;
    let solution = GraphicalSolver::new().solve(&problem).map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&GraphicalResponse::from(solution)).map_err(to_js_error)
}

/// Solve a problem with the tableau simplex method
#[wasm_bindgen]
pub fn solve_simplex(request: JsValue, two_phase: bool) -> Result<JsValue, JsValue> {
    let problem: LpProblem = serde_wasm_bindgen::from_value(request).map_err(to_js_error)?;
    let discipline = if two_phase {
        Discipline::TwoPhase
    } else {
        Discipline::BigM
    };
    let solution = SimplexSolver::new()
        .with_discipline(discipline)
        .solve(&problem)
        .map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&SimplexResponse::from(solution)).map_err(to_js_error)
}

/// Compile problem text into `{ variables, objectiveName, problem }`
#[wasm_bindgen]
pub fn parse_problem(source: &str) -> Result<JsValue, JsValue> {
    let compiled = compile_problem(source).map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&compiled).map_err(to_js_error)
}

/// Render a trace (as returned by a solve) into one line per event
#[wasm_bindgen]
pub fn render_trace(trace: JsValue) -> Result<JsValue, JsValue> {
    let trace: Trace = serde_wasm_bindgen::from_value(trace).map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&trace.render()).map_err(to_js_error)
}

/// Validate problem text and return diagnostics as JSON
#[wasm_bindgen]
pub fn validate(source: &str) -> JsValue {
    let diagnostics = get_diagnostics(source);
    serde_wasm_bindgen::to_value(&diagnostics).unwrap_or(JsValue::NULL)
}

#[derive(serde::Serialize)]
struct Diagnostic {
    start: usize,
    end: usize,
    message: String,
    severity: &'static str,
}

fn get_diagnostics(source: &str) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Lexer::tokenize(source)
        .into_iter()
        .filter(|t| t.kind == TokenKind::Error)
        .map(|t| Diagnostic {
            start: t.span.start,
            end: t.span.end,
            message: format!("Unexpected character '{}'", t.text),
            severity: "error",
        })
        .collect();
    if !diagnostics.is_empty() {
        return diagnostics;
    }

    if let Err(e) = compile_problem(source) {
        let (start, end) = match &e {
            CompileError::Parse(crate::parser::ParseError::UnexpectedToken { span, .. }) => {
                (span.start, span.end)
            }
            _ => (0, source.len()),
        };
        diagnostics.push(Diagnostic {
            start,
            end,
            message: e.to_string(),
            severity: "error",
        });
    }
    diagnostics
}
