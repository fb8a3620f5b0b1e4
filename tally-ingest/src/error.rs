use thiserror::Error;

/// Errors raised to callers of the parser.
///
/// Unrecognized amounts and dates are not errors: such notifications
/// are simply absent from the result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("current year {0} is outside the supported calendar range")]
    YearOutOfRange(i32),
}
