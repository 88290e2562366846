/// Local variables and register allocation for one function.
use rustc_hash::FxHashMap;

use crate::error::CompileError;

/// Registers addressable by an instruction's A field.
pub const MAX_REGS: u32 = 255;

/// A local variable in the current function scope.
#[derive(Clone, Debug)]
pub struct LocalVarInfo {
    pub name: String,
    /// Register index.
    pub reg: u32,
    /// Declared with `const`.
    pub is_const: bool,
}

/// Manages locals and the register stack of a single function.
///
/// Locals take the bottom registers, in declaration order, and keep them
/// for the life of the function. Temporaries live above them and are
/// released in LIFO order.
#[derive(Debug, Default)]
pub struct ScopeManager {
    /// All local variables in the current function.
    locals: Vec<LocalVarInfo>,
    by_name: FxHashMap<String, usize>,
    /// Next available register.
    pub free_reg: u32,
    /// High-water mark for register usage.
    pub max_reg: u32,
}

impl ScopeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `reg`, which must be the register just above the
    /// existing locals.
    pub fn add_local(&mut self, name: &str, reg: u32, is_const: bool) {
        debug_assert_eq!(reg, self.num_locals(), "locals must be contiguous");
        self.by_name.insert(name.to_string(), self.locals.len());
        self.locals.push(LocalVarInfo {
            name: name.to_string(),
            reg,
            is_const,
        });
    }

    /// Allocate a temporary register.
    pub fn alloc_reg(&mut self) -> Result<u32, CompileError> {
        if self.free_reg >= MAX_REGS {
            return Err(CompileError::unimplemented(format!(
                "more than {MAX_REGS} registers"
            )));
        }
        let reg = self.free_reg;
        self.free_reg += 1;
        if self.free_reg > self.max_reg {
            self.max_reg = self.free_reg;
        }
        Ok(reg)
    }

    /// Release `reg` if it is a temporary. Locals are never released.
    pub fn free_reg(&mut self, reg: u32) {
        if reg >= self.num_locals() {
            debug_assert_eq!(reg + 1, self.free_reg, "temporaries are freed LIFO");
            self.free_reg -= 1;
        }
    }

    /// Release two temporaries, the higher one first.
    pub fn free_regs(&mut self, r1: u32, r2: u32) {
        if r1 > r2 {
            self.free_reg(r1);
            self.free_reg(r2);
        } else {
            self.free_reg(r2);
            self.free_reg(r1);
        }
    }

    /// Free registers down to the given free_reg level.
    pub fn free_reg_to(&mut self, level: u32) {
        if level <= self.free_reg {
            self.free_reg = level;
        }
    }

    /// Look up a local variable by name.
    pub fn resolve_local(&self, name: &str) -> Option<&LocalVarInfo> {
        self.by_name.get(name).map(|&i| &self.locals[i])
    }

    /// Get number of active locals, which is also the first temporary register.
    pub fn num_locals(&self) -> u32 {
        self.locals.len() as u32
    }
}
