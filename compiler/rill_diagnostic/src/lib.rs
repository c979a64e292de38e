//! Positioned compilation errors.
//!
//! Every fatal condition in the pipeline (lexical, syntactic, arity,
//! on-demand variable validation) is a [`ParseError`]: a byte offset into
//! the source plus a closed [`ParseErrorKind`]. A fatal error always means
//! no compiled expression is produced; there is no partial result.
//!
//! Configuration problems (bad alias, duplicate registration) are *not*
//! errors of this type: registration skips them and reports through
//! `tracing`, see `rill_context`.

/// What went wrong.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum ParseErrorKind {
    // Lexical
    #[error("unexpected symbol `{symbol}`")]
    UnexpectedSymbol { symbol: char },
    #[error("unterminated string constant")]
    UnterminatedString,

    // Syntactic
    #[error("expected expression")]
    ExpectedExpression,
    #[error("expected expression at the right side of `{op}` operator")]
    ExpectedRightOperand { op: &'static str },
    #[error("expected value expression after unary operator `{op}`")]
    ExpectedUnaryOperand { op: &'static str },
    #[error("expected closing parenthesis")]
    ExpectedClosingParen,
    #[error("expected closing parenthesis or comma")]
    ExpectedClosingParenOrComma,
    #[error("expected closing square bracket")]
    ExpectedClosingBracket,
    #[error("unexpected trailing `{found}` after a complete expression")]
    TrailingInput { found: String },

    // Arity
    #[error("too few arguments for function `{name}`: {provided} provided; at least {expected} expected")]
    TooFewArguments {
        name: String,
        provided: usize,
        expected: usize,
    },
    #[error("too many arguments for function `{name}`: {provided} provided; at most {expected} expected")]
    TooManyArguments {
        name: String,
        provided: usize,
        expected: usize,
    },

    // Variable validation (raised by `check_variables`, never by `compile`)
    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String },

    // Resource
    #[error("expression is nested too deeply")]
    NestedTooDeeply,
}

/// A fatal, positioned compilation error.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("@{offset}: {kind}")]
pub struct ParseError {
    /// Byte offset into the source where the error was detected.
    pub offset: u32,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub const fn new(offset: u32, kind: ParseErrorKind) -> Self {
        ParseError { offset, kind }
    }

    /// Render the offending source with a caret marking the error offset.
    ///
    /// ```text
    /// x + * 2
    ///     ^ expected expression
    /// ```
    pub fn render_snippet(&self, source: &str) -> String {
        let offset = (self.offset as usize).min(source.len());
        // Work on the line containing the offset; expressions are usually
        // single-line but enclosed-mode templates may not be.
        let line_start = source[..offset].rfind('\n').map_or(0, |p| p + 1);
        let line_end = source[offset..]
            .find('\n')
            .map_or(source.len(), |p| offset + p);
        let line = &source[line_start..line_end];
        let column = source[line_start..offset].chars().count();

        let mut out = String::with_capacity(line.len() * 2 + 16);
        out.push_str(line);
        out.push('\n');
        for _ in 0..column {
            out.push(' ');
        }
        out.push('^');
        out.push(' ');
        out.push_str(&self.kind.to_string());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_prefixes_the_offset() {
        let err = ParseError::new(4, ParseErrorKind::ExpectedExpression);
        assert_eq!(err.to_string(), "@4: expected expression");
    }

    #[test]
    fn arity_messages_name_both_counts() {
        let err = ParseError::new(
            0,
            ParseErrorKind::TooFewArguments {
                name: "atan2".into(),
                provided: 1,
                expected: 2,
            },
        );
        assert_eq!(
            err.to_string(),
            "@0: too few arguments for function `atan2`: 1 provided; at least 2 expected"
        );
    }

    #[test]
    fn snippet_places_the_caret() {
        let source = "x + * 2";
        let err = ParseError::new(4, ParseErrorKind::ExpectedExpression);
        assert_eq!(
            err.render_snippet(source),
            "x + * 2\n    ^ expected expression"
        );
    }

    #[test]
    fn snippet_clamps_out_of_range_offsets() {
        let err = ParseError::new(99, ParseErrorKind::UnterminatedString);
        let rendered = err.render_snippet("'abc");
        assert_eq!(rendered, "'abc\n    ^ unterminated string constant");
    }

    #[test]
    fn snippet_targets_the_offending_line() {
        let source = "first\nsec * ond";
        let err = ParseError::new(10, ParseErrorKind::ExpectedExpression);
        assert_eq!(
            err.render_snippet(source),
            "sec * ond\n    ^ expected expression"
        );
    }
}
