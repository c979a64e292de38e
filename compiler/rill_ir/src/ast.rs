//! AST nodes.
//!
//! The node set is a closed tagged enum: every compound form the parser can
//! build is listed here, and both the optimizer and the evaluator dispatch
//! on the tag. Nodes are immutable once the constructing rewrite returns
//! them; children are owned (`Box`/`Vec`), so a `CompiledExpression` owns
//! its whole tree exclusively.

use crate::function::FunctionRef;
use crate::value::Value;

/// Unary operators.
///
/// `NumCast`/`BoolCast` are the implicit coercions made explicit: unary `+`
/// parses to `NumCast`, and several rewrites reduce to one of the casts.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Negate,
    NumCast,
    BoolCast,
    Not,
}

/// Binary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    // Logical (operand-value semantics, see `rill_eval`)
    And,
    Or,
    Xor,

    // Comparison
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

impl BinaryOp {
    /// Returns the source-level symbol for this operator.
    ///
    /// Used in error messages and in `debug_dump` output.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "^",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^^",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Lt => "<",
            Self::LtEq => "<=",
        }
    }

    /// Whether this operator always produces a number.
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod | Self::Pow
        )
    }

    /// Whether this operator is a comparison (always produces a boolean).
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Gt | Self::GtEq | Self::Lt | Self::LtEq
        )
    }

    /// The comparison with the opposite outcome, when one exists.
    ///
    /// Lets `!` absorb into a comparison instead of wrapping it.
    pub const fn negated(self) -> Option<BinaryOp> {
        match self {
            Self::Eq => Some(Self::NotEq),
            Self::NotEq => Some(Self::Eq),
            Self::Lt => Some(Self::GtEq),
            Self::GtEq => Some(Self::Lt),
            Self::LtEq => Some(Self::Gt),
            Self::Gt => Some(Self::LtEq),
            _ => None,
        }
    }
}

/// An expression tree node.
#[derive(Clone, PartialEq, Debug)]
pub enum Expr {
    /// A literal or folded constant.
    Constant(Value),
    /// A variable reference; the name is stored lower-cased.
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// String concatenation over two or more parts.
    Concat(Vec<Expr>),
    /// Short-circuiting n-ary `|`: first truthy operand, else the last.
    OrChain(Vec<Expr>),
    /// A call bound at compile time to a registered function.
    Call {
        function: FunctionRef,
        /// The registered alias, kept for `debug_dump`.
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// The constant value of this node, when it is one.
    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Expr::Constant(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Constant(_))
    }
}
