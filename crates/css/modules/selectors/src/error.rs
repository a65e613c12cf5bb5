//! Selector parse errors.

use core::error::Error;
use core::fmt::{Display, Formatter, Result as FmtResult};

/// Reasons a selector string could not be parsed into the supported subset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectorError {
    /// The input (or one entry of a selector list) contained no selector.
    Empty,
    /// A combinator was not followed by a compound selector.
    DanglingCombinator,
    /// A byte that cannot start any supported token.
    UnexpectedCharacter(char),
    /// `.`, `#` or `[` without a following identifier.
    ExpectedIdentifier,
    /// An attribute selector without its closing `]` or a string without its quote.
    Unterminated,
    /// A pseudo-class or attribute operator outside the supported subset.
    Unsupported(String),
}

impl Display for SelectorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Empty => write!(f, "empty selector"),
            Self::DanglingCombinator => write!(f, "combinator without a right-hand compound"),
            Self::UnexpectedCharacter(character) => {
                write!(f, "unexpected character {character:?} in selector")
            }
            Self::ExpectedIdentifier => write!(f, "expected an identifier"),
            Self::Unterminated => write!(f, "unterminated attribute selector or string"),
            Self::Unsupported(what) => write!(f, "unsupported selector syntax: {what}"),
        }
    }
}

impl Error for SelectorError {}
