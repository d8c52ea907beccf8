//! S-expression parse errors.

use thiserror::Error;

/// Errors produced while reading S-expression text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SexpError {
    /// Input ended in the middle of a value.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A character that cannot start or continue a value at this position.
    #[error("unexpected character {ch:?} at byte {pos}")]
    UnexpectedChar {
        /// The offending character.
        ch: char,
        /// Byte offset into the input.
        pos: usize,
    },

    /// A closing parenthesis with no matching opener.
    #[error("unbalanced ')' at byte {pos}")]
    UnbalancedParen {
        /// Byte offset into the input.
        pos: usize,
    },

    /// Non-whitespace input left over after the first complete value.
    #[error("trailing data after value at byte {pos}")]
    TrailingData {
        /// Byte offset into the input.
        pos: usize,
    },

    /// An unknown escape sequence inside a string literal.
    #[error("invalid string escape '\\{ch}' at byte {pos}")]
    BadEscape {
        /// The escaped character.
        ch: char,
        /// Byte offset into the input.
        pos: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            SexpError::UnexpectedEof.to_string(),
            "unexpected end of input"
        );
        assert_eq!(
            SexpError::UnbalancedParen { pos: 7 }.to_string(),
            "unbalanced ')' at byte 7"
        );
    }
}
