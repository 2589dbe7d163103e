//! Parse errors carrying the column at which they were detected.

use std::fmt;
use thiserror::Error;

/// Error raised while decoding a line of G-code or reading a parameter.
///
/// `column` is the byte offset into the retained line buffer at which the
/// problem was detected (0 when no position applies).
#[derive(Debug, Error)]
#[error("{kind} (column {column})")]
pub struct ParseError {
    pub column: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(column: usize, kind: ParseErrorKind) -> Self {
        Self { column, kind }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::new(0, ParseErrorKind::Io(e))
    }
}

#[derive(Debug, Error)]
pub enum ParseErrorKind {
    /// A typed getter was called without a preceding successful `seen()`.
    #[error("internal error: value read without a preceding seen()")]
    Internal,
    #[error("control character in string")]
    ControlCharInString,
    #[error("non-empty string expected")]
    NonEmptyStringExpected,
    #[error("string expected")]
    StringExpected,
    #[error("invalid IP address")]
    InvalidIpAddress,
    #[error("invalid MAC address")]
    InvalidMacAddress,
    #[error("array too long, max length = {max}")]
    ArrayTooLong { max: usize },
    #[error("expected {kind} value")]
    ExpectedNumeric { kind: NumericKind },
    #[error("value must be non-negative")]
    ValueMustBeNonNegative,
    #[error("expected '}}'")]
    ExpectedCloseBrace,
    #[error("expected variable name")]
    ExpectedVariableName,
    #[error("variable name too long, max length = {max}")]
    VariableNameTooLong { max: usize },
    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },
    #[error("'else' did not follow 'if'")]
    ElseWithoutIf,
    #[error("'break' was not inside a loop")]
    BreakOutsideLoop,
    #[error("'var' is not implemented yet")]
    VarNotImplemented,
    #[error("failed to evaluate condition after '{keyword}': {reason}")]
    ConditionEvaluationFailed {
        keyword: &'static str,
        reason: String,
    },
    #[error("too many digits")]
    TooManyDigits,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which numeric shape a getter expected, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Float,
    Int,
    Uint,
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericKind::Float => write!(f, "float"),
            NumericKind::Int => write!(f, "integer"),
            NumericKind::Uint => write!(f, "non-negative integer"),
        }
    }
}
