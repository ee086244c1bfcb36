use thiserror::Error;

/// Malformed input, rejected before any solving begins.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Objective has no coefficients")]
    EmptyObjective,
    #[error("Problem has no constraints")]
    NoConstraints,
    /// `constraint` is the 1-based label `R<n>`.
    #[error("Constraint R{constraint} has {found} coefficients, expected {expected}")]
    CoefficientCount {
        constraint: usize,
        expected: usize,
        found: usize,
    },
    #[error("Non-finite value in {0}")]
    NonFinite(String),
    #[error("Graphical method needs exactly 2 variables, got {0}")]
    NotTwoDimensional(usize),
}
