use thiserror::Error;

/// A raw token that does not belong to any symbol class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("'{0}' is not a valid symbol")]
    Invalid(String),
    #[error("'{token}' is not a valid {kind}")]
    Expected { token: String, kind: &'static str },
}

/// Failure to read a grammar from its textual form.
///
/// Line numbers are 1-based and count every line of the input, blank ones
/// included.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("the grammar has no productions")]
    Empty,
    #[error("expected a `->` on line {line}")]
    MissingArrow { line: usize },
    #[error("expected a single `->` on line {line}")]
    MultipleArrows { line: usize },
    #[error("expected a sequence of symbols next to the `|` on line {line}")]
    EmptyAlternative { line: usize },
    #[error("{source} on the left of line {line}")]
    LeftHandSide { line: usize, source: SymbolError },
    #[error("{source} on line {line}")]
    InvalidSymbol { line: usize, source: SymbolError },
}

impl ParseError {
    /// Line the error was found on, if it is tied to one.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Empty => None,
            ParseError::MissingArrow { line }
            | ParseError::MultipleArrows { line }
            | ParseError::EmptyAlternative { line }
            | ParseError::LeftHandSide { line, .. }
            | ParseError::InvalidSymbol { line, .. } => Some(*line),
        }
    }
}
