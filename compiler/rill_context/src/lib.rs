//! Hierarchical function/constant registries.
//!
//! A [`Context`] owns one function table and one constant table and may
//! point at a shared parent. Lookups walk toward the root; registration is
//! always local. Names are case-normalized at both registration and lookup:
//! function aliases to lower case, constant names to upper case.
//!
//! Configuration problems (an alias that is not a valid identifier, a
//! duplicate registration) are not errors: the registration is skipped and
//! the condition is reported through `tracing::warn!`. A function and a
//! constant sharing a normalized name anywhere in the chain is legal and
//! only reported as a `tracing::info!` advisory; the two namespaces resolve
//! independently.
//!
//! Contexts are plain mutable values. Freeze one behind an [`Arc`] to share
//! it as a parent ([`Context::derive`]); the compiler only ever reads.

mod builtins;

use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;
use tracing::{info, warn};

use rill_ir::{FunctionRef, Value};

/// A function as registered: the callable plus its normalized alias and
/// volatility flag.
#[derive(Clone, Debug)]
pub struct RegisteredFunction {
    pub function: FunctionRef,
    /// Lower-cased alias, as looked up by the parser.
    pub alias: String,
    /// Volatile functions are never folded at compile time, even with
    /// all-constant arguments.
    pub volatile: bool,
}

/// Which registrations an unregister call removes.
#[derive(Copy, Clone, Debug)]
pub enum Selection<'a> {
    /// A single name.
    Name(&'a str),
    /// A set of names.
    Names(&'a [&'a str]),
    /// Everything registered in this context.
    All,
}

/// A registry of functions and constants with an optional shared parent.
#[derive(Clone, Debug, Default)]
pub struct Context {
    parent: Option<Arc<Context>>,
    functions: FxHashMap<String, RegisteredFunction>,
    constants: FxHashMap<String, Option<Value>>,
    implicit_concatenation: bool,
}

impl Context {
    /// A root context with empty tables.
    pub fn new() -> Self {
        Context::default()
    }

    /// A context whose lookups fall back to `parent`.
    ///
    /// The implicit-concatenation option starts out copied from the parent
    /// and evolves independently afterwards.
    pub fn with_parent(parent: Arc<Context>) -> Self {
        let implicit_concatenation = parent.implicit_concatenation;
        Context {
            parent: Some(parent),
            functions: FxHashMap::default(),
            constants: FxHashMap::default(),
            implicit_concatenation,
        }
    }

    /// A child context with `self` as parent.
    pub fn derive(self: Arc<Self>) -> Context {
        Context::with_parent(self)
    }

    /// Register one function under `alias`.
    ///
    /// Skips (with a warning) invalid aliases and duplicates within this
    /// context. Advises when a usable constant of the same name exists
    /// anywhere in the chain.
    pub fn register_function(&mut self, function: FunctionRef, alias: &str, volatile: bool) {
        let alias = alias.to_lowercase();
        if !is_valid_name(&alias) {
            warn!(%alias, "function alias cannot be used; registration skipped");
            return;
        }
        if self.functions.contains_key(&alias) {
            warn!(%alias, "function alias already registered; registration skipped");
            return;
        }
        if self.find_constant(&alias).is_some() {
            info!(%alias, "the context tree has a constant with the same name as the registered function");
        }
        self.functions.insert(
            alias.clone(),
            RegisteredFunction { function, alias, volatile },
        );
    }

    /// Register several functions sharing one volatility flag.
    pub fn register_functions<N, I>(&mut self, entries: I, volatile: bool)
    where
        N: AsRef<str>,
        I: IntoIterator<Item = (N, FunctionRef)>,
    {
        for (alias, function) in entries {
            self.register_function(function, alias.as_ref(), volatile);
        }
    }

    /// Remove registered functions. Unknown names are ignored silently.
    pub fn unregister_function(&mut self, which: Selection<'_>) {
        match which {
            Selection::Name(name) => {
                self.functions.remove(&name.to_lowercase());
            }
            Selection::Names(names) => {
                for name in names {
                    self.functions.remove(&name.to_lowercase());
                }
            }
            Selection::All => self.functions.clear(),
        }
    }

    /// Register one constant.
    ///
    /// Passing `None` stores the *absent* mask: `has_constant` becomes true
    /// but lookups yield nothing usable, which makes the parser treat the
    /// identifier as a variable and stop searching ancestor contexts.
    pub fn register_constant(&mut self, name: &str, value: impl Into<Option<Value>>) {
        let key = name.to_uppercase();
        if !is_valid_name(&key) {
            warn!(name = %key, "constant name cannot be used; registration skipped");
            return;
        }
        if self.constants.contains_key(&key) {
            warn!(name = %key, "constant already registered; registration skipped");
            return;
        }
        let value = value.into();
        if value.is_some() && self.find_function(name).is_some() {
            info!(name = %key, "the context tree has a function with the same name as the registered constant");
        }
        self.constants.insert(key, value);
    }

    /// Register several constants at once.
    pub fn register_constants<N, I>(&mut self, entries: I)
    where
        N: AsRef<str>,
        I: IntoIterator<Item = (N, Value)>,
    {
        for (name, value) in entries {
            self.register_constant(name.as_ref(), value);
        }
    }

    /// Remove registered constants. Unknown names are ignored silently.
    pub fn unregister_constant(&mut self, which: Selection<'_>) {
        match which {
            Selection::Name(name) => {
                self.constants.remove(&name.to_uppercase());
            }
            Selection::Names(names) => {
                for name in names {
                    self.constants.remove(&name.to_uppercase());
                }
            }
            Selection::All => self.constants.clear(),
        }
    }

    /// Whether this context itself (parents not considered) has a function
    /// registered under `alias`.
    pub fn has_function(&self, alias: &str) -> bool {
        self.functions.contains_key(&alias.to_lowercase())
    }

    /// Look up a function here or in any ancestor.
    pub fn find_function(&self, alias: &str) -> Option<&RegisteredFunction> {
        match self.functions.get(&alias.to_lowercase()) {
            Some(found) => Some(found),
            None => self.parent.as_deref().and_then(|p| p.find_function(alias)),
        }
    }

    /// Whether this context itself has a constant entry under `name`
    /// (including the absent mask).
    pub fn has_constant(&self, name: &str) -> bool {
        self.constants.contains_key(&name.to_uppercase())
    }

    /// Look up a usable constant value here or in any ancestor.
    ///
    /// An absent mask stops the walk and yields `None`.
    pub fn find_constant(&self, name: &str) -> Option<Value> {
        match self.constants.get(&name.to_uppercase()) {
            Some(entry) => entry.clone(),
            None => self.parent.as_deref().and_then(|p| p.find_constant(name)),
        }
    }

    /// Current value of the implicit string concatenation compiler option.
    pub fn implicit_concatenation(&self) -> bool {
        self.implicit_concatenation
    }

    /// Set the implicit concatenation option, returning the previous value.
    pub fn set_implicit_concatenation(&mut self, value: bool) -> bool {
        std::mem::replace(&mut self.implicit_concatenation, value)
    }
}

/// The lexer's identifier pattern: `[A-Za-z_\x80-\xFF][A-Za-z0-9_\x80-\xFF]*`.
fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let Some(&first) = bytes.first() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == b'_' || first >= 0x80) {
        return false;
    }
    bytes[1..]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80)
}

/// The process-wide default context: builtin math/string functions plus the
/// constant `PI`. Built once, lazily, and handed out explicitly.
///
/// The default context is immutable; derive a child to extend it.
pub fn default_context() -> Arc<Context> {
    static DEFAULT: OnceLock<Arc<Context>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| {
            let mut context = Context::new();
            builtins::install(&mut context);
            Arc::new(context)
        })
        .clone()
}
