/// Function prototype: holds compiled bytecode, constants, and debug info.
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;

use crate::opcode::Instruction;

/// Strings up to this many bytes are written with the short-string tag.
pub const MAX_SHORT_LEN: usize = 40;

/// A constant value in the constant pool.
#[derive(Clone, Debug)]
pub enum Constant {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Str(String),
}

impl Constant {
    /// Build the constant for a source-level number: an integer when the
    /// value is integral and representable, a float otherwise.
    pub fn number(value: f64) -> Self {
        let integral = value.is_finite()
            && value.fract() == 0.0
            && !(value == 0.0 && value.is_sign_negative())
            && value >= i64::MIN as f64
            && value < i64::MAX as f64;
        if integral {
            Constant::Integer(value as i64)
        } else {
            Constant::Float(value)
        }
    }
}

// Floats compare by bit pattern so that NaN deduplicates and 0.0 / -0.0
// stay distinct.
impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::Nil, Constant::Nil) => true,
            (Constant::Boolean(a), Constant::Boolean(b)) => a == b,
            (Constant::Integer(a), Constant::Integer(b)) => a == b,
            (Constant::Float(a), Constant::Float(b)) => a.to_bits() == b.to_bits(),
            (Constant::Str(a), Constant::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl Hash for Constant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Constant::Nil => {}
            Constant::Boolean(b) => b.hash(state),
            Constant::Integer(i) => i.hash(state),
            Constant::Float(f) => f.to_bits().hash(state),
            Constant::Str(s) => s.hash(state),
        }
    }
}

/// Deduplicated, insertion-ordered constant pool.
#[derive(Clone, Debug, Default)]
pub struct ConstantPool {
    entries: IndexSet<Constant>,
}

impl ConstantPool {
    /// Index of `k`, appending it when absent.
    pub fn find_or_insert(&mut self, k: Constant) -> u32 {
        let (idx, _) = self.entries.insert_full(k);
        idx as u32
    }

    pub fn get(&self, idx: u32) -> Option<&Constant> {
        self.entries.get_index(idx as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constant> {
        self.entries.iter()
    }
}

/// Description of an upvalue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpvalDesc {
    /// Name of the captured variable.
    pub name: String,
    /// True if this upvalue is in the enclosing function's stack (not another upvalue).
    pub in_stack: bool,
    /// Index: register index if in_stack, upvalue index in parent otherwise.
    pub index: u8,
}

/// A local variable debug entry.
#[derive(Clone, Debug)]
pub struct LocalVar {
    pub name: String,
    /// First PC where the variable is active.
    pub start_pc: u32,
    /// First PC where the variable is dead.
    pub end_pc: u32,
}

/// Debug tables of a prototype. The compiler never fills these; the chunk
/// writer only accepts the empty form.
#[derive(Clone, Debug, Default)]
pub struct DebugInfo {
    pub line_info: Vec<i32>,
    pub local_vars: Vec<LocalVar>,
    pub upvalue_names: Vec<String>,
}

impl DebugInfo {
    pub fn is_empty(&self) -> bool {
        self.line_info.is_empty() && self.local_vars.is_empty() && self.upvalue_names.is_empty()
    }
}

/// A compiled function prototype.
#[derive(Clone, Debug)]
pub struct Proto {
    /// Source name (for error messages).
    pub source: Option<String>,
    pub line_defined: i32,
    pub last_line_defined: i32,
    /// Number of fixed parameters.
    pub num_params: u8,
    /// Whether this function accepts varargs.
    pub is_vararg: bool,
    /// Maximum stack size needed.
    pub max_stack_size: u8,
    /// Bytecode instructions.
    pub code: Vec<Instruction>,
    /// Constant pool.
    pub constants: ConstantPool,
    /// Upvalue descriptors.
    pub upvalues: Vec<UpvalDesc>,
    /// Nested function prototypes.
    pub protos: Vec<Proto>,
    pub debug: DebugInfo,
}

impl Proto {
    /// Create a new empty prototype.
    pub fn new() -> Self {
        Proto {
            source: None,
            line_defined: 0,
            last_line_defined: 0,
            num_params: 0,
            is_vararg: false,
            max_stack_size: 2, // minimum
            code: Vec::new(),
            constants: ConstantPool::default(),
            upvalues: Vec::new(),
            protos: Vec::new(),
            debug: DebugInfo::default(),
        }
    }

    /// Append an instruction, returning its PC.
    pub fn emit(&mut self, inst: Instruction) -> usize {
        let pc = self.code.len();
        self.code.push(inst);
        pc
    }

    /// Add a constant to the pool, returning its index. Deduplicates.
    pub fn add_constant(&mut self, k: Constant) -> u32 {
        self.constants.find_or_insert(k)
    }

    /// Get the number of instructions.
    pub fn code_len(&self) -> usize {
        self.code.len()
    }
}

impl Default for Proto {
    fn default() -> Self {
        Self::new()
    }
}
