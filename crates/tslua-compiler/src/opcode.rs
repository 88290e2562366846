/// Lua 5.3 opcodes and instruction encoding.
///
/// Instruction format (32 bits):
/// - Bits 0-5: OpCode (6 bits)
/// - Bits 6-13: A (8 bits)
/// - For iABC format:
///   - Bits 14-22: C (9 bits)
///   - Bits 23-31: B (9 bits)
/// - For iABx: Bx = bits 14-31 (unsigned 18 bits)
/// - For iAsBx: sBx = Bx - offset (signed interpretation)
/// - For iAx: Ax = bits 6-31 (26 bits, unsigned)
///
/// Instructions are built symbolically and only packed into words when
/// the chunk is written; there is no decoder.
use std::fmt;

use crate::error::CompileError;

/// Size constants for instruction fields.
const SIZE_OP: u32 = 6;
const SIZE_A: u32 = 8;
const SIZE_B: u32 = 9;
const SIZE_C: u32 = 9;
const SIZE_BX: u32 = SIZE_B + SIZE_C; // 18
const SIZE_AX: u32 = SIZE_A + SIZE_B + SIZE_C; // 26

/// Position constants.
const POS_OP: u32 = 0;
const POS_A: u32 = POS_OP + SIZE_OP; // 6
const POS_C: u32 = POS_A + SIZE_A; // 14
const POS_B: u32 = POS_C + SIZE_C; // 23
const POS_BX: u32 = POS_C;
const POS_AX: u32 = POS_A;

/// Mask helpers.
const fn mask(n: u32) -> u32 {
    (1 << n) - 1
}

pub const MAX_A: u32 = mask(SIZE_A); // 255
pub const MAX_B: u32 = mask(SIZE_B); // 511
pub const MAX_C: u32 = mask(SIZE_C); // 511
pub const MAX_BX: u32 = mask(SIZE_BX); // 262143
pub const MAX_SBX: i32 = (MAX_BX >> 1) as i32; // 131071
pub const MIN_SBX: i32 = -MAX_SBX;
pub const MAX_AX: u32 = mask(SIZE_AX);

/// Bit that marks an RK operand as a constant index.
pub const BITRK: u32 = 1 << (SIZE_B - 1); // 256
/// Largest constant index an RK operand can address.
pub const MAX_INDEX_RK: u32 = BITRK - 1; // 255

/// Number of list items flushed per SETLIST.
pub const FIELDS_PER_FLUSH: u32 = 50;

/// Encode a constant index as an RK operand.
pub const fn rk_constant(index: u32) -> u32 {
    index | BITRK
}

/// Whether an RK operand refers to a constant.
pub const fn is_rk_constant(operand: u32) -> bool {
    operand & BITRK != 0
}

/// The "floating point byte" used by NEWTABLE size hints: `eeeeexxx`,
/// value `(1xxx) * 2^(eeeee - 1)` when `eeeee` is non-zero, else `xxx`.
pub fn int2fb(mut x: u32) -> u32 {
    let mut e = 0;
    if x < 8 {
        return x;
    }
    while x >= (8 << 4) {
        x = (x + 0xf) >> 4;
        e += 4;
    }
    while x >= (8 << 1) {
        x = (x + 1) >> 1;
        e += 1;
    }
    ((e + 1) << 3) | (x - 8)
}

/// All 47 Lua 5.3 opcodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Move = 0,
    LoadK,
    LoadKX,
    LoadBool,
    LoadNil,
    GetUpval,
    GetTabUp,
    GetTable,
    SetTabUp,
    SetUpval,
    SetTable,
    NewTable,
    Self_,
    Add,
    Sub,
    Mul,
    Mod,
    Pow,
    Div,
    IDiv,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
    Unm,
    BNot,
    Not,
    Len,
    Concat,
    Jmp,
    Eq,
    Lt,
    Le,
    Test,
    TestSet,
    Call,
    TailCall,
    Return,
    ForLoop,
    ForPrep,
    TForCall,
    TForLoop,
    SetList,
    Closure,
    VarArg,
    ExtraArg,
}

impl OpCode {
    /// Get the instruction format for this opcode.
    pub fn format(&self) -> InstructionFormat {
        use InstructionFormat::*;
        use OpCode::*;
        match self {
            // iAx format
            ExtraArg => IAx,
            // iAsBx format
            Jmp | ForLoop | ForPrep | TForLoop => IAsBx,
            // iABx format
            LoadK | LoadKX | Closure => IABx,
            // All others are iABC
            _ => IABC,
        }
    }

    /// Get the name of this opcode.
    pub fn name(&self) -> &'static str {
        use OpCode::*;
        match self {
            Move => "MOVE",
            LoadK => "LOADK",
            LoadKX => "LOADKX",
            LoadBool => "LOADBOOL",
            LoadNil => "LOADNIL",
            GetUpval => "GETUPVAL",
            GetTabUp => "GETTABUP",
            GetTable => "GETTABLE",
            SetTabUp => "SETTABUP",
            SetUpval => "SETUPVAL",
            SetTable => "SETTABLE",
            NewTable => "NEWTABLE",
            Self_ => "SELF",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Mod => "MOD",
            Pow => "POW",
            Div => "DIV",
            IDiv => "IDIV",
            BAnd => "BAND",
            BOr => "BOR",
            BXor => "BXOR",
            Shl => "SHL",
            Shr => "SHR",
            Unm => "UNM",
            BNot => "BNOT",
            Not => "NOT",
            Len => "LEN",
            Concat => "CONCAT",
            Jmp => "JMP",
            Eq => "EQ",
            Lt => "LT",
            Le => "LE",
            Test => "TEST",
            TestSet => "TESTSET",
            Call => "CALL",
            TailCall => "TAILCALL",
            Return => "RETURN",
            ForLoop => "FORLOOP",
            ForPrep => "FORPREP",
            TForCall => "TFORCALL",
            TForLoop => "TFORLOOP",
            SetList => "SETLIST",
            Closure => "CLOSURE",
            VarArg => "VARARG",
            ExtraArg => "EXTRAARG",
        }
    }

    /// Returns true if this opcode is a test (conditional skip).
    pub fn is_test(&self) -> bool {
        use OpCode::*;
        matches!(self, Eq | Lt | Le | Test | TestSet)
    }

    /// Whether B and C of this opcode may address constants.
    pub fn takes_rk(&self) -> bool {
        use OpCode::*;
        matches!(
            self,
            GetTabUp
                | GetTable
                | SetTabUp
                | SetTable
                | Self_
                | Add
                | Sub
                | Mul
                | Mod
                | Pow
                | Div
                | IDiv
                | BAnd
                | BOr
                | BXor
                | Shl
                | Shr
                | Eq
                | Lt
                | Le
        )
    }
}

/// Instruction format types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionFormat {
    IABC,
    IABx,
    IAsBx, // signed Bx, same bits as ABx
    IAx,
}

/// A symbolic Lua instruction, one variant per encoding family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    Abc { op: OpCode, a: u32, b: u32, c: u32 },
    Abx { op: OpCode, a: u32, bx: u32 },
    AsBx { op: OpCode, a: u32, sbx: i32 },
    Ax { op: OpCode, ax: u32 },
}

impl Instruction {
    // ---- Constructors ----

    pub fn abc(op: OpCode, a: u32, b: u32, c: u32) -> Self {
        Instruction::Abc { op, a, b, c }
    }

    pub fn abx(op: OpCode, a: u32, bx: u32) -> Self {
        Instruction::Abx { op, a, bx }
    }

    pub fn asbx(op: OpCode, a: u32, sbx: i32) -> Self {
        Instruction::AsBx { op, a, sbx }
    }

    pub fn ax(op: OpCode, ax: u32) -> Self {
        Instruction::Ax { op, ax }
    }

    pub fn opcode(&self) -> OpCode {
        match *self {
            Instruction::Abc { op, .. }
            | Instruction::Abx { op, .. }
            | Instruction::AsBx { op, .. }
            | Instruction::Ax { op, .. } => op,
        }
    }

    fn format(&self) -> InstructionFormat {
        match self {
            Instruction::Abc { .. } => InstructionFormat::IABC,
            Instruction::Abx { .. } => InstructionFormat::IABx,
            Instruction::AsBx { .. } => InstructionFormat::IAsBx,
            Instruction::Ax { .. } => InstructionFormat::IAx,
        }
    }

    /// Pack into a 32-bit word.
    ///
    /// Fails when the variant does not match the opcode's family or an
    /// operand does not fit its field.
    pub fn encode(&self) -> Result<u32, CompileError> {
        let op = self.opcode();
        if op.format() != self.format() {
            return Err(CompileError::malformed(
                op,
                format!(
                    "built as {:?} but the opcode is {:?}",
                    self.format(),
                    op.format()
                ),
            ));
        }
        let word = match *self {
            Instruction::Abc { a, b, c, .. } => {
                check_field(op, "A", a, MAX_A)?;
                check_field(op, "B", b, MAX_B)?;
                check_field(op, "C", c, MAX_C)?;
                (op as u32) << POS_OP | a << POS_A | b << POS_B | c << POS_C
            }
            Instruction::Abx { a, bx, .. } => {
                check_field(op, "A", a, MAX_A)?;
                check_field(op, "Bx", bx, MAX_BX)?;
                (op as u32) << POS_OP | a << POS_A | bx << POS_BX
            }
            Instruction::AsBx { a, sbx, .. } => {
                check_field(op, "A", a, MAX_A)?;
                if !(MIN_SBX..=MAX_SBX).contains(&sbx) {
                    return Err(CompileError::malformed(
                        op,
                        format!("sBx {sbx} out of range"),
                    ));
                }
                let bx = (sbx + MAX_SBX) as u32;
                (op as u32) << POS_OP | a << POS_A | bx << POS_BX
            }
            Instruction::Ax { ax, .. } => {
                check_field(op, "Ax", ax, MAX_AX)?;
                (op as u32) << POS_OP | ax << POS_AX
            }
        };
        Ok(word)
    }
}

fn check_field(op: OpCode, field: &str, value: u32, max: u32) -> Result<(), CompileError> {
    if value > max {
        return Err(CompileError::malformed(
            op,
            format!("{field} {value} exceeds {max}"),
        ));
    }
    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode().name())?;
        match *self {
            Instruction::Abc { a, b, c, .. } => write!(f, " A={a} B={b} C={c}"),
            Instruction::Abx { a, bx, .. } => write!(f, " A={a} Bx={bx}"),
            Instruction::AsBx { a, sbx, .. } => write!(f, " A={a} sBx={sbx}"),
            Instruction::Ax { ax, .. } => write!(f, " Ax={ax}"),
        }
    }
}
