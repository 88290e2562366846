/// Value descriptors and operator tables.
use tslua_ast::{BinaryOperator, UnaryOperator};

use crate::opcode::OpCode;

/// Describes where an expression's value currently lives.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedValue {
    /// Value in a register (a local or a live temporary).
    Register(u32),
    /// Constant at the given pool index, not yet loaded.
    Constant(u32),
    /// Upvalue at the given index. Index 0 is always `_ENV`.
    Upvalue(u32),
    /// Deferred `owner[member]` read. The owner is a `Register` or an
    /// `Upvalue`; the member is a `Register` or an RK-addressable `Constant`.
    LoadMember {
        owner: Box<ResolvedValue>,
        member: Box<ResolvedValue>,
    },
}

impl ResolvedValue {
    pub fn load_member(owner: ResolvedValue, member: ResolvedValue) -> Self {
        ResolvedValue::LoadMember {
            owner: Box::new(owner),
            member: Box::new(member),
        }
    }
}

/// How many results a call hands back to its consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallResults {
    /// Expression statement: results are dropped.
    Discard,
    /// One value, left in the callee slot.
    Single,
    /// All values, as the trailing argument of another call.
    Forward,
}

impl CallResults {
    /// The CALL C operand (result count + 1, 0 for "up to top").
    pub fn operand(self) -> u32 {
        match self {
            CallResults::Discard => 1,
            CallResults::Single => 2,
            CallResults::Forward => 0,
        }
    }
}

/// Arithmetic and bitwise operators with a direct Lua opcode.
pub fn arith_opcode(op: BinaryOperator) -> Option<OpCode> {
    use BinaryOperator::*;
    Some(match op {
        Add => OpCode::Add,
        Subtract => OpCode::Sub,
        Multiply => OpCode::Mul,
        Divide => OpCode::Div,
        Modulo => OpCode::Mod,
        Exponent => OpCode::Pow,
        BitwiseAnd => OpCode::BAnd,
        BitwiseOr => OpCode::BOr,
        BitwiseXor => OpCode::BXor,
        LeftShift => OpCode::Shl,
        RightShift | UnsignedRightShift => OpCode::Shr,
        _ => return None,
    })
}

pub fn unary_opcode(op: UnaryOperator) -> Option<OpCode> {
    match op {
        UnaryOperator::Minus => Some(OpCode::Unm),
        UnaryOperator::BitwiseNot => Some(OpCode::BNot),
        UnaryOperator::LogicalNot => Some(OpCode::Not),
        _ => None,
    }
}

/// A comparison lowered to EQ/LT/LE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Comparison {
    pub op: OpCode,
    /// The A operand: the outcome that falls through to the "true" path.
    pub expect: u32,
    /// Put the right operand in B and the left in C.
    pub swap: bool,
}

/// Map a relational operator onto EQ/LT/LE. `a > b` is `b < a` and
/// `a >= b` is `b <= a`.
pub fn comparison(op: BinaryOperator) -> Option<Comparison> {
    use BinaryOperator::*;
    let (op, expect, swap) = match op {
        Equal | StrictEqual => (OpCode::Eq, 1, false),
        NotEqual | StrictNotEqual => (OpCode::Eq, 0, false),
        LessThan => (OpCode::Lt, 1, false),
        LessThanEqual => (OpCode::Le, 1, false),
        GreaterThan => (OpCode::Lt, 1, true),
        GreaterThanEqual => (OpCode::Le, 1, true),
        _ => return None,
    };
    Some(Comparison { op, expect, swap })
}

/// TESTSET polarity for `&&` (0) and `||` (1).
pub fn logical_expect(op: BinaryOperator) -> Option<u32> {
    match op {
        BinaryOperator::LogicalAnd => Some(0),
        BinaryOperator::LogicalOr => Some(1),
        _ => None,
    }
}
