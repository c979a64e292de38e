//! Byte-oriented tokenizer.
//!
//! The lexer walks the source a byte at a time and keeps exactly one
//! current [`Token`]; the parser drives it with [`Lexer::next`] and reads
//! [`Lexer::current`]. Rules, in match order:
//!
//! - bytes `<= 0x20` are skipped as whitespace
//! - operators, longest match first (`<=`, `>=`, `!=`, `<>`, `^^`, `**`,
//!   then the single-character set)
//! - identifiers: `[A-Za-z_\x80-\xFF][A-Za-z0-9_\x80-\xFF]*`, matched on
//!   byte classes, so any non-ASCII UTF-8 sequence is identifier material
//! - numbers: `[0-9]+(\.[0-9]*)?`
//! - strings: `'…'` or `"…"`, where a doubled quote is a literal quote
//!
//! [`Lexer::read_open`] is the enclosed-mode entry: it returns raw literal
//! text up to the next `[` without tokenizing it.

use rill_diagnostic::{ParseError, ParseErrorKind};
use rill_ir::{Op, Token, TokenKind};
use tracing::trace;

/// Identifier start: letter, underscore, or any byte of a non-ASCII
/// UTF-8 sequence.
const fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

const fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Streaming tokenizer over a source string.
pub struct Lexer<'src> {
    src: &'src str,
    pos: usize,
    token: Token,
}

impl<'src> Lexer<'src> {
    /// Create a lexer positioned before the first token.
    ///
    /// The current token starts out as `End`; call [`Lexer::next`] to read
    /// the first real token.
    pub fn new(src: &'src str) -> Self {
        Lexer {
            src,
            pos: 0,
            token: Token::new(TokenKind::End, 0),
        }
    }

    /// The most recently read token.
    pub fn current(&self) -> &Token {
        &self.token
    }

    /// Byte offset where the current token starts.
    pub fn offset(&self) -> u32 {
        self.token.offset
    }

    /// Advance to the next token.
    pub fn next(&mut self) -> Result<(), ParseError> {
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos] <= 0x20 {
            self.pos += 1;
        }
        let start = self.pos;
        if start >= bytes.len() {
            self.token = Token::new(TokenKind::End, truncate(start));
            return Ok(());
        }

        let kind = match bytes[start] {
            b'<' => self.op2(start, &[(b'=', Op::LtEq), (b'>', Op::NotEq)], Op::Lt),
            b'>' => self.op2(start, &[(b'=', Op::GtEq)], Op::Gt),
            b'!' => self.op2(start, &[(b'=', Op::NotEq)], Op::Not),
            b'^' => self.op2(start, &[(b'^', Op::Xor)], Op::Pow),
            b'*' => self.op2(start, &[(b'*', Op::Pow)], Op::Star),
            b'-' => self.op1(Op::Minus),
            b'+' => self.op1(Op::Plus),
            b'/' => self.op1(Op::Slash),
            b'%' => self.op1(Op::Percent),
            b'&' => self.op1(Op::Amp),
            b'|' => self.op1(Op::Pipe),
            b'=' => self.op1(Op::Eq),
            b'#' => self.op1(Op::Hash),
            b']' => self.op1(Op::RBracket),
            b'(' => self.op1(Op::LParen),
            b')' => self.op1(Op::RParen),
            b'?' => self.op1(Op::Question),
            b':' => self.op1(Op::Colon),
            b',' => self.op1(Op::Comma),
            b'0'..=b'9' => self.number(start),
            q @ (b'\'' | b'"') => self.string(start, q)?,
            b if is_ident_start(b) => self.ident(start),
            _ => {
                // Safe to index by char here: every multi-byte sequence
                // starts an identifier, so an unexpected byte is ASCII.
                let symbol = self.src[start..].chars().next().unwrap_or('?');
                return Err(ParseError::new(
                    truncate(start),
                    ParseErrorKind::UnexpectedSymbol { symbol },
                ));
            }
        };
        self.token = Token::new(kind, truncate(start));
        trace!(token = ?self.token.kind, offset = self.token.offset, "lexed");
        Ok(())
    }

    /// Enclosed-mode scan: return the literal text from the current
    /// position up to the next `[` (or end of input).
    ///
    /// When a `[` is found the current token becomes `Op(LBracket)` at its
    /// offset and the position moves past it; otherwise the current token
    /// becomes `End`.
    pub fn read_open(&mut self) -> &'src str {
        let rest = &self.src[self.pos..];
        match rest.find('[') {
            Some(rel) => {
                let bracket = self.pos + rel;
                let text = &self.src[self.pos..bracket];
                self.token = Token::new(TokenKind::Op(Op::LBracket), truncate(bracket));
                self.pos = bracket + 1;
                text
            }
            None => {
                let text = rest;
                self.pos = self.src.len();
                self.token = Token::new(TokenKind::End, truncate(self.src.len()));
                text
            }
        }
    }

    fn op1(&mut self, op: Op) -> TokenKind {
        self.pos += 1;
        TokenKind::Op(op)
    }

    /// Two-byte operator lookahead: if the byte after `start` matches one
    /// of `seconds`, consume both, else consume one and use `fallback`.
    fn op2(&mut self, start: usize, seconds: &[(u8, Op)], fallback: Op) -> TokenKind {
        let bytes = self.src.as_bytes();
        if let Some(&following) = bytes.get(start + 1) {
            for &(b, op) in seconds {
                if following == b {
                    self.pos += 2;
                    return TokenKind::Op(op);
                }
            }
        }
        self.pos += 1;
        TokenKind::Op(fallback)
    }

    fn number(&mut self, start: usize) -> TokenKind {
        let bytes = self.src.as_bytes();
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end < bytes.len() && bytes[end] == b'.' {
            end += 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
        self.pos = end;
        // The scanned slice always matches Rust's float grammar.
        let value = self.src[start..end].parse().unwrap_or(0.0);
        TokenKind::Number(value)
    }

    fn ident(&mut self, start: usize) -> TokenKind {
        let bytes = self.src.as_bytes();
        let mut end = start + 1;
        while end < bytes.len() && is_ident_continue(bytes[end]) {
            end += 1;
        }
        self.pos = end;
        TokenKind::Ident(self.src[start..end].to_owned())
    }

    fn string(&mut self, start: usize, quote: u8) -> Result<TokenKind, ParseError> {
        let bytes = self.src.as_bytes();
        let mut value = String::new();
        let mut i = start + 1;
        let mut run_start = i;
        loop {
            if i >= bytes.len() {
                self.pos = bytes.len();
                return Err(ParseError::new(
                    truncate(bytes.len()),
                    ParseErrorKind::UnterminatedString,
                ));
            }
            if bytes[i] == quote {
                value.push_str(&self.src[run_start..i]);
                if bytes.get(i + 1) == Some(&quote) {
                    // Doubled quote: one literal quote, keep scanning.
                    value.push(quote as char);
                    i += 2;
                    run_start = i;
                } else {
                    self.pos = i + 1;
                    return Ok(TokenKind::Str(value));
                }
            } else {
                i += 1;
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(pos: usize) -> u32 {
    pos as u32
}
