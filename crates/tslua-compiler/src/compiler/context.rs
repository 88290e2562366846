/// Per-function compilation state.
use tracing::{debug, trace};

use super::expr::ResolvedValue;
use super::scope::ScopeManager;
use crate::error::CompileError;
use crate::opcode::{is_rk_constant, rk_constant, Instruction, OpCode, MAX_BX, MAX_INDEX_RK};
use crate::proto::{Constant, Proto, UpvalDesc};

/// Name of the environment upvalue every function carries at index 0.
pub const ENV: &str = "_ENV";

const MAX_UPVALUES: usize = 255;

/// State for a single function being compiled.
#[derive(Debug)]
pub struct FunctionContext {
    pub proto: Proto,
    pub scope: ScopeManager,
}

impl FunctionContext {
    /// The main chunk: variadic, with `_ENV` captured from the loader.
    pub fn root(source: Option<String>) -> Self {
        let mut proto = Proto::new();
        proto.source = source;
        proto.is_vararg = true;
        proto.upvalues.push(UpvalDesc {
            name: ENV.to_string(),
            in_stack: true,
            index: 0,
        });
        debug!("opened main function");
        FunctionContext {
            proto,
            scope: ScopeManager::new(),
        }
    }

    /// A nested function, inheriting `_ENV` from its parent's upvalue 0.
    pub fn nested(parent: &FunctionContext, name: Option<&str>) -> Self {
        let mut proto = Proto::new();
        proto.source = parent.proto.source.clone();
        proto.upvalues.push(UpvalDesc {
            name: ENV.to_string(),
            in_stack: false,
            index: 0,
        });
        debug!(name = name.unwrap_or("<anonymous>"), "opened function");
        FunctionContext {
            proto,
            scope: ScopeManager::new(),
        }
    }

    /// Close the function: append the implicit return and fix the frame size.
    pub fn finish(mut self) -> Proto {
        self.emit_abc(OpCode::Return, 0, 1, 0);
        self.proto.max_stack_size = self.scope.max_reg.max(2) as u8;
        debug!(
            params = self.proto.num_params,
            registers = self.proto.max_stack_size,
            constants = self.proto.constants.len(),
            upvalues = self.proto.upvalues.len(),
            instructions = self.proto.code.len(),
            "closed function"
        );
        self.proto
    }

    // ---- Emission ----

    pub fn emit(&mut self, inst: Instruction) -> usize {
        let pc = self.proto.emit(inst);
        trace!(pc, %inst, "emit");
        pc
    }

    pub fn emit_abc(&mut self, op: OpCode, a: u32, b: u32, c: u32) -> usize {
        self.emit(Instruction::abc(op, a, b, c))
    }

    pub fn emit_abx(&mut self, op: OpCode, a: u32, bx: u32) -> usize {
        self.emit(Instruction::abx(op, a, bx))
    }

    pub fn emit_asbx(&mut self, op: OpCode, a: u32, sbx: i32) -> usize {
        self.emit(Instruction::asbx(op, a, sbx))
    }

    /// Emit a test instruction and the JMP it skips, returning the JMP's PC.
    pub fn emit_test_jump(&mut self, op: OpCode, a: u32, b: u32, c: u32, sbx: i32) -> usize {
        debug_assert!(op.is_test(), "{op:?} is not a test");
        self.emit_abc(op, a, b, c);
        self.emit_asbx(OpCode::Jmp, 0, sbx)
    }

    pub fn current_pc(&self) -> usize {
        self.proto.code_len()
    }

    /// Point the JMP at `jump_pc` to the current PC.
    pub fn patch_jump(&mut self, jump_pc: usize) {
        let offset = (self.current_pc() - jump_pc - 1) as i32;
        self.proto.code[jump_pc] = Instruction::asbx(OpCode::Jmp, 0, offset);
    }

    pub fn add_constant(&mut self, k: Constant) -> u32 {
        self.proto.add_constant(k)
    }

    pub fn string_constant(&mut self, s: &str) -> u32 {
        self.add_constant(Constant::Str(s.to_string()))
    }

    // ---- Upvalues ----

    pub fn find_upvalue(&self, name: &str) -> Option<u32> {
        self.proto
            .upvalues
            .iter()
            .position(|up| up.name == name)
            .map(|i| i as u32)
    }

    pub fn add_upvalue(&mut self, name: &str, in_stack: bool, index: u32) -> Result<u32, CompileError> {
        if self.proto.upvalues.len() >= MAX_UPVALUES {
            return Err(CompileError::unimplemented(format!(
                "more than {MAX_UPVALUES} upvalues"
            )));
        }
        let idx = self.proto.upvalues.len() as u32;
        self.proto.upvalues.push(UpvalDesc {
            name: name.to_string(),
            in_stack,
            index: index as u8,
        });
        Ok(idx)
    }

    // ---- Value discharge ----

    /// Release whatever temporaries `value` holds.
    pub fn free_value(&mut self, value: &ResolvedValue) {
        match value {
            ResolvedValue::Register(r) => self.scope.free_reg(*r),
            ResolvedValue::LoadMember { owner, member } => {
                match (owner.as_ref(), member.as_ref()) {
                    (ResolvedValue::Register(o), ResolvedValue::Register(m)) => {
                        self.scope.free_regs(*o, *m)
                    }
                    (ResolvedValue::Register(o), _) => self.scope.free_reg(*o),
                    (_, ResolvedValue::Register(m)) => self.scope.free_reg(*m),
                    _ => {}
                }
            }
            ResolvedValue::Constant(_) | ResolvedValue::Upvalue(_) => {}
        }
    }

    /// Release a register operand previously returned by [`Self::materialize`]
    /// or [`Self::optimize`]. Constant RK operands hold nothing.
    pub fn free_operand(&mut self, operand: u32) {
        if let Some(reg) = operand_reg(operand) {
            self.scope.free_reg(reg);
        }
    }

    pub fn free_operands(&mut self, a: u32, b: u32) {
        match (operand_reg(a), operand_reg(b)) {
            (Some(a), Some(b)) => self.scope.free_regs(a, b),
            (Some(r), None) | (None, Some(r)) => self.scope.free_reg(r),
            (None, None) => {}
        }
    }

    pub fn load_constant(&mut self, reg: u32, k: u32) {
        if k <= MAX_BX {
            self.emit_abx(OpCode::LoadK, reg, k);
        } else {
            self.emit_abx(OpCode::LoadKX, reg, 0);
            self.emit(Instruction::ax(OpCode::ExtraArg, k));
        }
    }

    /// Emit the instructions that leave `value` in `reg`.
    pub fn discharge_to_reg(&mut self, value: &ResolvedValue, reg: u32) -> Result<(), CompileError> {
        match value {
            ResolvedValue::Register(r) => {
                if *r != reg {
                    self.emit_abc(OpCode::Move, reg, *r, 0);
                }
            }
            ResolvedValue::Constant(k) => self.load_constant(reg, *k),
            ResolvedValue::Upvalue(u) => {
                self.emit_abc(OpCode::GetUpval, reg, *u, 0);
            }
            ResolvedValue::LoadMember { owner, member } => {
                let key = rk_operand(member)?;
                match owner.as_ref() {
                    ResolvedValue::Upvalue(u) => {
                        self.emit_abc(OpCode::GetTabUp, reg, *u, key);
                    }
                    ResolvedValue::Register(t) => {
                        self.emit_abc(OpCode::GetTable, reg, *t, key);
                    }
                    other => {
                        return Err(CompileError::malformed(
                            OpCode::GetTable,
                            format!("table operand {other:?} is not a register or upvalue"),
                        ))
                    }
                }
            }
        }
        Ok(())
    }

    /// Leave `value` in some register, reusing it when it already is one.
    pub fn materialize(&mut self, value: ResolvedValue) -> Result<u32, CompileError> {
        if let ResolvedValue::Register(r) = value {
            return Ok(r);
        }
        self.materialize_next(value)
    }

    /// Leave `value` in the next free register.
    pub fn materialize_next(&mut self, value: ResolvedValue) -> Result<u32, CompileError> {
        self.free_value(&value);
        let reg = self.scope.alloc_reg()?;
        self.discharge_to_reg(&value, reg)?;
        Ok(reg)
    }

    /// Resolve `value` to an RK operand: a constant index when the pool slot
    /// is addressable, otherwise a register.
    pub fn optimize(&mut self, value: ResolvedValue) -> Result<u32, CompileError> {
        match value {
            ResolvedValue::Constant(k) if k <= MAX_INDEX_RK => Ok(rk_constant(k)),
            other => self.materialize(other),
        }
    }

    /// Normalize a value so it can be the member half of a `LoadMember`.
    pub fn member_key(&mut self, value: ResolvedValue) -> Result<ResolvedValue, CompileError> {
        match value {
            ResolvedValue::Constant(k) if k <= MAX_INDEX_RK => Ok(value),
            ResolvedValue::Register(_) => Ok(value),
            other => Ok(ResolvedValue::Register(self.materialize(other)?)),
        }
    }

    /// Normalize a value so it can be the owner half of a `LoadMember`.
    pub fn member_owner(&mut self, value: ResolvedValue) -> Result<ResolvedValue, CompileError> {
        match value {
            ResolvedValue::Register(_) | ResolvedValue::Upvalue(_) => Ok(value),
            other => Ok(ResolvedValue::Register(self.materialize(other)?)),
        }
    }
}

fn operand_reg(operand: u32) -> Option<u32> {
    if is_rk_constant(operand) {
        None
    } else {
        Some(operand)
    }
}

/// The RK encoding of a member key already normalized by
/// [`FunctionContext::member_key`].
pub fn rk_operand(value: &ResolvedValue) -> Result<u32, CompileError> {
    match value {
        ResolvedValue::Register(r) => Ok(*r),
        ResolvedValue::Constant(k) if *k <= MAX_INDEX_RK => Ok(rk_constant(*k)),
        other => Err(CompileError::malformed(
            OpCode::GetTable,
            format!("key operand {other:?} is not RK-addressable"),
        )),
    }
}
