/// Assignment targets and stores.
use tslua_ast::{
    AssignmentExpression, BinaryOperator, Expression, MemberProperty, UpdateExpression,
    UpdateOperator,
};

use super::context::rk_operand;
use super::expr::ResolvedValue;
use super::resolve::{self, is_alias, resolve_binding};
use super::Compiler;
use crate::error::CompileError;
use crate::opcode::OpCode;

/// Where an assignment writes. Planned before the value is lowered so the
/// target's temporaries sit below the value's.
#[derive(Clone, Debug, PartialEq)]
pub enum AssignTarget {
    Local(u32),
    Upvalue(u32),
    /// `owner[key]`, with `owner` a register or upvalue and `key` an RK
    /// operand.
    Member { owner: ResolvedValue, key: u32 },
}

impl<'a> Compiler<'a> {
    fn plan_target(&mut self, left: &Expression) -> Result<AssignTarget, CompileError> {
        match left {
            Expression::Identifier(id) => self.plan_name(&id.name),
            Expression::Member(m) => {
                let object = self.lower_expr(&m.object)?;
                let owner = self.fs().member_owner(object)?;
                let key = match &m.property {
                    MemberProperty::Identifier(id) => {
                        let fs = self.fs();
                        let k = fs.string_constant(&id.name);
                        fs.optimize(ResolvedValue::Constant(k))?
                    }
                    MemberProperty::Expression(key) => {
                        let key = self.lower_expr(key)?;
                        self.fs().optimize(key)?
                    }
                };
                Ok(AssignTarget::Member { owner, key })
            }
            other => Err(CompileError::unsupported(format!(
                "assignment to {}",
                other.kind_name()
            ))),
        }
    }

    fn plan_name(&mut self, name: &str) -> Result<AssignTarget, CompileError> {
        let is_const = self
            .contexts
            .iter()
            .rev()
            .find_map(|ctx| ctx.scope.resolve_local(name))
            .map_or(false, |local| local.is_const);
        if is_const {
            return Err(CompileError::unsupported(format!(
                "assignment to constant '{name}'"
            )));
        }

        match resolve_binding(&mut self.contexts, name)? {
            Some(ResolvedValue::Register(reg)) => Ok(AssignTarget::Local(reg)),
            Some(ResolvedValue::Upvalue(up)) => Ok(AssignTarget::Upvalue(up)),
            Some(other) => Err(CompileError::unsupported(format!(
                "assignment through {other:?}"
            ))),
            None if is_alias(name) => Err(CompileError::unsupported(format!(
                "assignment to '{name}'"
            ))),
            None => {
                self.resolver.declare_global(name);
                self.global_target(name)
            }
        }
    }

    /// `_ENV[name]` as an assignment target.
    pub(super) fn global_target(&mut self, name: &str) -> Result<AssignTarget, CompileError> {
        match resolve::global(self.fs(), name)? {
            ResolvedValue::LoadMember { owner, member } => Ok(AssignTarget::Member {
                owner: *owner,
                key: rk_operand(&member)?,
            }),
            other => Err(CompileError::unsupported(format!(
                "global '{name}' resolved to {other:?}"
            ))),
        }
    }

    /// Write `value` into `target`, releasing the value's temporaries. The
    /// target's own temporaries stay live until [`Self::release`].
    pub(super) fn store(
        &mut self,
        target: &AssignTarget,
        value: ResolvedValue,
    ) -> Result<(), CompileError> {
        match target {
            AssignTarget::Local(reg) => self.store_local(*reg, value),
            AssignTarget::Upvalue(up) => {
                let fs = self.fs();
                let reg = fs.materialize(value)?;
                fs.emit_abc(OpCode::SetUpval, reg, *up, 0);
                fs.scope.free_reg(reg);
                Ok(())
            }
            AssignTarget::Member { owner, key } => {
                let fs = self.fs();
                let rk = fs.optimize(value)?;
                match owner {
                    ResolvedValue::Upvalue(up) => fs.emit_abc(OpCode::SetTabUp, *up, *key, rk),
                    ResolvedValue::Register(table) => {
                        fs.emit_abc(OpCode::SetTable, *table, *key, rk)
                    }
                    other => {
                        return Err(CompileError::malformed(
                            OpCode::SetTable,
                            format!("table operand {other:?} is not a register or upvalue"),
                        ))
                    }
                };
                fs.free_operand(rk);
                Ok(())
            }
        }
    }

    pub(super) fn store_local(&mut self, reg: u32, value: ResolvedValue) -> Result<(), CompileError> {
        let fs = self.fs();
        fs.free_value(&value);
        fs.discharge_to_reg(&value, reg)
    }

    /// Free the registers a member target holds.
    pub(super) fn release(&mut self, target: AssignTarget) {
        if let AssignTarget::Member { owner, key } = target {
            let fs = self.fs();
            match owner {
                ResolvedValue::Register(table) => fs.free_operands(table, key),
                _ => fs.free_operand(key),
            }
        }
    }

    /// The current value of `target`, leaving the target usable for the
    /// store that follows.
    fn read_target(&mut self, target: &AssignTarget) -> Result<ResolvedValue, CompileError> {
        let fs = self.fs();
        let reg = match target {
            AssignTarget::Local(reg) => return Ok(ResolvedValue::Register(*reg)),
            AssignTarget::Upvalue(up) => {
                let reg = fs.scope.alloc_reg()?;
                fs.emit_abc(OpCode::GetUpval, reg, *up, 0);
                reg
            }
            AssignTarget::Member { owner, key } => {
                let reg = fs.scope.alloc_reg()?;
                match owner {
                    ResolvedValue::Upvalue(up) => fs.emit_abc(OpCode::GetTabUp, reg, *up, *key),
                    ResolvedValue::Register(table) => {
                        fs.emit_abc(OpCode::GetTable, reg, *table, *key)
                    }
                    other => {
                        return Err(CompileError::malformed(
                            OpCode::GetTable,
                            format!("table operand {other:?} is not a register or upvalue"),
                        ))
                    }
                };
                reg
            }
        };
        Ok(ResolvedValue::Register(reg))
    }

    /// Plain or compound assignment. `op` carries the operator and whether
    /// `+` concatenates. Returns where the assigned value lives when
    /// `want_value` is set.
    fn assign(
        &mut self,
        left: &Expression,
        op: Option<(BinaryOperator, bool)>,
        right: &Expression,
        want_value: bool,
    ) -> Result<Option<ResolvedValue>, CompileError> {
        let target = self.plan_target(left)?;
        let value = match op {
            None => self.lower_expr(right)?,
            Some((op, concat)) => {
                let current = self.read_target(&target)?;
                self.combine(op, current, right, concat)?
            }
        };

        if !want_value {
            self.store(&target, value)?;
            self.release(target);
            return Ok(None);
        }

        if let AssignTarget::Local(reg) = target {
            self.store_local(reg, value)?;
            return Ok(Some(ResolvedValue::Register(reg)));
        }

        let reg = self.fs().materialize(value)?;
        self.store(&target, ResolvedValue::Register(reg))?;
        self.release(target);
        let fs = self.fs();
        if reg < fs.scope.num_locals() {
            return Ok(Some(ResolvedValue::Register(reg)));
        }
        let dst = fs.scope.alloc_reg()?;
        if dst != reg {
            fs.emit_abc(OpCode::Move, dst, reg, 0);
        }
        Ok(Some(ResolvedValue::Register(dst)))
    }

    pub(super) fn lower_assignment(
        &mut self,
        a: &AssignmentExpression,
        want_value: bool,
    ) -> Result<Option<ResolvedValue>, CompileError> {
        let op = match a.operator.binary_operator() {
            None => None,
            Some(
                op @ (BinaryOperator::LogicalAnd
                | BinaryOperator::LogicalOr
                | BinaryOperator::NullishCoalescing),
            ) => {
                return Err(CompileError::unsupported(format!(
                    "logical assignment '{}='",
                    op.as_str()
                )))
            }
            Some(op) => {
                let concat = op == BinaryOperator::Add
                    && (self.types.is_string(&a.left) || self.types.is_string(&a.right));
                Some((op, concat))
            }
        };
        self.assign(&a.left, op, &a.right, want_value)
    }

    /// `++x` and `--x` are `x += 1` and `x -= 1`. Postfix forms are not
    /// implemented.
    pub(super) fn lower_update(
        &mut self,
        u: &UpdateExpression,
        want_value: bool,
    ) -> Result<Option<ResolvedValue>, CompileError> {
        if !u.prefix {
            return Err(CompileError::unimplemented("postfix increment/decrement"));
        }
        let op = match u.operator {
            UpdateOperator::Increment => BinaryOperator::Add,
            UpdateOperator::Decrement => BinaryOperator::Subtract,
        };
        self.assign(&u.argument, Some((op, false)), &Expression::number(1.0), want_value)
    }
}
