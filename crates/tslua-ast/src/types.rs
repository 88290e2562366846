//! Static type queries answered on behalf of the compiler.

use rustc_hash::FxHashSet;

use crate::{BinaryOperator, Expression, Literal};

/// Type information the compiler asks for while lowering.
pub trait TypeChecker {
    /// Whether `expr` is statically a string.
    fn is_string(&self, expr: &Expression) -> bool;

    /// Whether `name` is a global supplied by the runtime (`print`, `math`, ...).
    fn is_ambient_global(&self, name: &str) -> bool;
}

/// A checker that decides from syntax alone.
///
/// String literals are strings, identifiers are strings when registered with
/// [`SyntacticTypes::with_string_binding`], and `a + b` is a string when
/// either side is.
#[derive(Debug, Clone, Default)]
pub struct SyntacticTypes {
    ambient: FxHashSet<String>,
    strings: FxHashSet<String>,
}

impl SyntacticTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Globals of a stock Lua 5.3 environment.
    pub fn lua_globals() -> Self {
        let mut types = Self::new();
        for name in [
            "print", "type", "tostring", "tonumber", "pairs", "ipairs", "select", "error",
            "assert", "pcall", "rawget", "rawset", "rawequal", "rawlen", "setmetatable",
            "getmetatable", "next", "require", "math", "string", "table", "io", "os",
            "coroutine", "utf8", "debug",
        ] {
            types.ambient.insert(name.to_string());
        }
        types
    }

    pub fn with_global(mut self, name: impl Into<String>) -> Self {
        self.ambient.insert(name.into());
        self
    }

    pub fn with_string_binding(mut self, name: impl Into<String>) -> Self {
        self.strings.insert(name.into());
        self
    }
}

impl TypeChecker for SyntacticTypes {
    fn is_string(&self, expr: &Expression) -> bool {
        match expr {
            Expression::Literal(Literal::String(_)) => true,
            Expression::Identifier(id) => self.strings.contains(&id.name),
            Expression::Binary(bin) if bin.operator == BinaryOperator::Add => {
                self.is_string(&bin.left) || self.is_string(&bin.right)
            }
            _ => false,
        }
    }

    fn is_ambient_global(&self, name: &str) -> bool {
        self.ambient.contains(name)
    }
}
