//! Recursive-descent, precedence-climbing parser.
//!
//! [`compile`] drives the lexer once over the source and hands every
//! freshly constructed compound node to the optimizer, so the tree is in
//! simplified form at all times. Identifier resolution order: a registered
//! function when the identifier is immediately followed by `(`, else a
//! usable constant anywhere up the context chain, else a variable (whose
//! lower-cased name and first byte offset are recorded).
//!
//! Nesting depth is capped; exceeding the cap is a `NestedTooDeeply` parse
//! error rather than a crash, and the remaining recursion is backed by
//! on-demand stack growth.

use rustc_hash::FxHashMap;
use tracing::debug;

use rill_context::Context;
use rill_diagnostic::{ParseError, ParseErrorKind};
use rill_ir::{BinaryOp, Expr, FunctionRef, Op, TokenKind, UnaryOp, Value};
use rill_lexer::Lexer;

use crate::compiled::CompiledExpression;
use crate::{optimize, stack};

/// Maximum parser nesting depth before a `NestedTooDeeply` error.
const MAX_DEPTH: u32 = 10_000;

/// How the source text is interpreted.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ParseMode {
    /// The whole source is one expression.
    Single,
    /// The source is literal text with `[...]`-enclosed sub-expressions.
    Enclosed,
}

/// Compile `source` against an optional context.
///
/// With no context, identifiers resolve only to variables and the
/// implicit-concatenation option is off.
pub fn compile(
    source: &str,
    context: Option<&Context>,
    mode: ParseMode,
) -> Result<CompiledExpression, ParseError> {
    debug!(len = source.len(), ?mode, "compiling expression");
    let mut parser = Parser {
        lexer: Lexer::new(source),
        context,
        variables: FxHashMap::default(),
        depth: 0,
    };
    let root = match mode {
        ParseMode::Single => parser.parse_single()?,
        ParseMode::Enclosed => parser.parse_enclosed()?,
    };
    Ok(CompiledExpression::new(root, parser.variables))
}

/// What a binary-operator token builds.
#[derive(Copy, Clone)]
enum Infix {
    Binary(BinaryOp),
    Concat,
}

/// Binary operator table: node kind and climbing priority (higher binds
/// tighter). Ternary `? :` sits below all of these; implicit concatenation
/// and unary operators bind tighter than all of them.
const fn infix_op(op: Op) -> Option<(Infix, u8)> {
    Some(match op {
        Op::Xor => (Infix::Binary(BinaryOp::Xor), 1),
        Op::Pipe => (Infix::Binary(BinaryOp::Or), 2),
        Op::Amp => (Infix::Binary(BinaryOp::And), 3),
        Op::Eq => (Infix::Binary(BinaryOp::Eq), 4),
        Op::NotEq => (Infix::Binary(BinaryOp::NotEq), 4),
        Op::Gt => (Infix::Binary(BinaryOp::Gt), 4),
        Op::GtEq => (Infix::Binary(BinaryOp::GtEq), 4),
        Op::Lt => (Infix::Binary(BinaryOp::Lt), 4),
        Op::LtEq => (Infix::Binary(BinaryOp::LtEq), 4),
        Op::Plus => (Infix::Binary(BinaryOp::Add), 5),
        Op::Minus => (Infix::Binary(BinaryOp::Sub), 5),
        Op::Star => (Infix::Binary(BinaryOp::Mul), 6),
        Op::Slash => (Infix::Binary(BinaryOp::Div), 6),
        Op::Percent => (Infix::Binary(BinaryOp::Mod), 6),
        Op::Pow => (Infix::Binary(BinaryOp::Pow), 7),
        Op::Hash => (Infix::Concat, 8),
        _ => return None,
    })
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    context: Option<&'a Context>,
    /// Lower-cased variable name -> first occurrence byte offset.
    variables: FxHashMap<String, u32>,
    depth: u32,
}

impl<'a> Parser<'a> {
    fn parse_single(&mut self) -> Result<Expr, ParseError> {
        self.lexer.next()?;
        if self.lexer.current().is_end() {
            return Ok(Expr::Constant(Value::Str(String::new())));
        }
        let node = self.parse_expression(0)?;
        if self.lexer.current().is_end() {
            Ok(node)
        } else {
            Err(ParseError::new(
                self.lexer.offset(),
                ParseErrorKind::TrailingInput {
                    found: describe_token(&self.lexer.current().kind),
                },
            ))
        }
    }

    fn parse_enclosed(&mut self) -> Result<Expr, ParseError> {
        let mut parts = Vec::new();
        loop {
            let text = self.lexer.read_open();
            if !text.is_empty() {
                parts.push(Expr::Constant(Value::Str(text.to_owned())));
            }
            if self.lexer.current().is_end() {
                break;
            }
            self.lexer.next()?;
            let node = self.parse_expression(0)?;
            if !self.lexer.current().is_op(Op::RBracket) {
                return Err(ParseError::new(
                    self.lexer.offset(),
                    ParseErrorKind::ExpectedClosingBracket,
                ));
            }
            parts.push(node);
        }
        Ok(optimize::concat(parts))
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::new(
                self.lexer.offset(),
                ParseErrorKind::NestedTooDeeply,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_expression(&mut self, min_priority: u8) -> Result<Expr, ParseError> {
        self.enter()?;
        let result = stack::ensure_sufficient_stack(|| self.expression_at(min_priority));
        self.depth -= 1;
        result
    }

    fn expression_at(&mut self, min_priority: u8) -> Result<Expr, ParseError> {
        let Some(mut node) = self.parse_value()? else {
            return Err(ParseError::new(
                self.lexer.offset(),
                ParseErrorKind::ExpectedExpression,
            ));
        };

        while !self.lexer.current().is_end() {
            let current_op = match &self.lexer.current().kind {
                TokenKind::Op(op) => Some(*op),
                _ => None,
            };

            if let Some(op) = current_op {
                if let Some((infix, priority)) = infix_op(op) {
                    if priority < min_priority {
                        return Ok(node);
                    }
                    self.lexer.next()?;
                    let right = self.right_operand(op, priority + 1)?;
                    node = match infix {
                        Infix::Binary(bin) => optimize::binary(bin, node, right),
                        Infix::Concat => optimize::concat(vec![node, right]),
                    };
                    continue;
                }
                if op == Op::Question {
                    // The ternary binds weaker than every binary operator
                    // and is parsed once per expression level.
                    if min_priority > 0 {
                        return Ok(node);
                    }
                    self.lexer.next()?;
                    let then_branch = self.parse_expression(0)?;
                    let else_branch = if self.lexer.current().is_op(Op::Colon) {
                        self.lexer.next()?;
                        self.parse_expression(0)?
                    } else {
                        Expr::Constant(Value::Str(String::new()))
                    };
                    return Ok(optimize::conditional(node, then_branch, else_branch));
                }
            }

            // Not an operator we can consume: adjacent values concatenate
            // when the context enables it.
            if !self.implicit_concatenation() {
                return Ok(node);
            }
            match self.parse_value()? {
                Some(value) => node = optimize::concat(vec![node, value]),
                None => return Ok(node),
            }
        }
        Ok(node)
    }

    /// Parse the right operand of a binary operator, naming the operator
    /// when nothing parses where the operand should start.
    fn right_operand(&mut self, op: Op, min_priority: u8) -> Result<Expr, ParseError> {
        let start = self.lexer.offset();
        self.parse_expression(min_priority).map_err(|err| {
            if err.kind == ParseErrorKind::ExpectedExpression && err.offset == start {
                ParseError::new(
                    err.offset,
                    ParseErrorKind::ExpectedRightOperand {
                        op: op.as_symbol(),
                    },
                )
            } else {
                err
            }
        })
    }

    fn parse_value(&mut self) -> Result<Option<Expr>, ParseError> {
        self.enter()?;
        let result = stack::ensure_sufficient_stack(|| self.value_at());
        self.depth -= 1;
        result
    }

    fn value_at(&mut self) -> Result<Option<Expr>, ParseError> {
        match self.lexer.current().kind.clone() {
            TokenKind::Ident(name) => {
                let offset = self.lexer.offset();
                self.lexer.next()?;
                if self.lexer.current().is_op(Op::LParen) {
                    let registered = self.context.and_then(|ctx| ctx.find_function(&name));
                    if let Some(registered) = registered {
                        let function = registered.function.clone();
                        let alias = registered.alias.clone();
                        let volatile = registered.volatile;
                        return self.parse_call(offset, function, alias, volatile).map(Some);
                    }
                }
                if let Some(value) = self.context.and_then(|ctx| ctx.find_constant(&name)) {
                    return Ok(Some(Expr::Constant(value)));
                }
                let lower = name.to_lowercase();
                self.variables.entry(lower.clone()).or_insert(offset);
                Ok(Some(Expr::Variable(lower)))
            }
            TokenKind::Number(value) => {
                self.lexer.next()?;
                Ok(Some(Expr::Constant(Value::Number(value))))
            }
            TokenKind::Str(value) => {
                self.lexer.next()?;
                Ok(Some(Expr::Constant(Value::Str(value))))
            }
            TokenKind::Op(op @ (Op::Minus | Op::Plus | Op::Not)) => {
                self.lexer.next()?;
                let Some(operand) = self.parse_value()? else {
                    return Err(ParseError::new(
                        self.lexer.offset(),
                        ParseErrorKind::ExpectedUnaryOperand {
                            op: op.as_symbol(),
                        },
                    ));
                };
                let unary_op = match op {
                    Op::Minus => UnaryOp::Negate,
                    Op::Not => UnaryOp::Not,
                    _ => UnaryOp::NumCast,
                };
                Ok(Some(optimize::unary(unary_op, operand)))
            }
            TokenKind::Op(Op::LParen) => {
                self.lexer.next()?;
                let node = self.parse_expression(0)?;
                if !self.lexer.current().is_op(Op::RParen) {
                    return Err(ParseError::new(
                        self.lexer.offset(),
                        ParseErrorKind::ExpectedClosingParen,
                    ));
                }
                self.lexer.next()?;
                Ok(Some(node))
            }
            _ => Ok(None),
        }
    }

    /// Parse a call's argument list and bind it; the opening parenthesis is
    /// the current token.
    fn parse_call(
        &mut self,
        name_offset: u32,
        function: FunctionRef,
        alias: String,
        volatile: bool,
    ) -> Result<Expr, ParseError> {
        self.lexer.next()?;
        let mut args = Vec::new();
        loop {
            if self.lexer.current().is_op(Op::RParen) {
                break;
            }
            args.push(self.parse_expression(0)?);
            if self.lexer.current().is_op(Op::Comma) {
                self.lexer.next()?;
                continue;
            }
            break;
        }
        if !self.lexer.current().is_op(Op::RParen) {
            return Err(ParseError::new(
                self.lexer.offset(),
                ParseErrorKind::ExpectedClosingParenOrComma,
            ));
        }
        self.lexer.next()?;

        let arity = function.arity();
        if args.len() < arity.min {
            return Err(ParseError::new(
                name_offset,
                ParseErrorKind::TooFewArguments {
                    name: alias,
                    provided: args.len(),
                    expected: arity.min,
                },
            ));
        }
        if let Some(max) = arity.max {
            if args.len() > max {
                return Err(ParseError::new(
                    name_offset,
                    ParseErrorKind::TooManyArguments {
                        name: alias,
                        provided: args.len(),
                        expected: max,
                    },
                ));
            }
        }

        // Cross-call constant folding: non-volatile calls on all-constant
        // arguments run once, now.
        if !volatile {
            let mut values = Vec::with_capacity(args.len());
            for arg in &args {
                match arg.as_constant() {
                    Some(value) => values.push(value.clone()),
                    None => break,
                }
            }
            if values.len() == args.len() {
                return Ok(Expr::Constant(function.invoke(&values)));
            }
        }

        Ok(Expr::Call {
            function,
            name: alias,
            args,
        })
    }

    fn implicit_concatenation(&self) -> bool {
        self.context.is_some_and(Context::implicit_concatenation)
    }
}

fn describe_token(kind: &TokenKind) -> String {
    match kind {
        TokenKind::End => "end of input".to_owned(),
        TokenKind::Op(op) => op.as_symbol().to_owned(),
        TokenKind::Ident(name) => name.clone(),
        TokenKind::Number(n) => rill_ir::format_number(*n),
        TokenKind::Str(s) => format!("'{s}'"),
    }
}
