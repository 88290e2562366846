/// Expression lowering.
use tslua_ast::{
    ArrayExpression, ArrowBody, BinaryExpression, BinaryOperator, CallExpression, Expression,
    Literal, MemberExpression, MemberProperty, ObjectExpression, PropertyKey, UnaryExpression,
};

use super::expr::{
    arith_opcode, comparison, logical_expect, unary_opcode, CallResults, Comparison,
    ResolvedValue,
};
use super::Compiler;
use crate::error::CompileError;
use crate::opcode::{int2fb, OpCode, FIELDS_PER_FLUSH};
use crate::proto::Constant;

/// Largest array literal with a lowering.
const MAX_ARRAY_LITERAL: usize = 511;

impl<'a> Compiler<'a> {
    /// Lower `expr` to a descriptor of where its value lives. Nothing is
    /// loaded that the consumer could address directly.
    pub(super) fn lower_expr(&mut self, expr: &Expression) -> Result<ResolvedValue, CompileError> {
        match expr {
            Expression::Literal(lit) => self.lower_literal(lit),
            Expression::Identifier(id) => {
                self.resolver
                    .resolve(&id.name, &mut self.contexts, self.types)
            }
            Expression::This => self.resolver.resolve_this(&mut self.contexts),
            Expression::Object(obj) => self.lower_object(obj),
            Expression::Array(arr) => self.lower_array(arr),
            Expression::Member(m) => self.lower_member(m),
            Expression::Unary(u) => self.lower_unary(u),
            Expression::Binary(bin) => self.lower_binary(bin, expr),
            Expression::Call(call) => {
                let base = self.lower_call(call, CallResults::Single)?;
                Ok(ResolvedValue::Register(base))
            }
            Expression::Assignment(a) => self.lower_assignment(a, true)?.ok_or_else(|| {
                CompileError::unsupported("assignment used as a value")
            }),
            Expression::Update(u) => self.lower_update(u, true)?.ok_or_else(|| {
                CompileError::unsupported("update used as a value")
            }),
            Expression::Function(f) => {
                let name = f.id.as_ref().map(|id| id.name.as_str());
                self.lower_function(name, &f.params, &f.body)
            }
            Expression::Arrow(arrow) => match &arrow.body {
                ArrowBody::Block(body) => self.lower_function(None, &arrow.params, body),
                ArrowBody::Expression(_) => Err(CompileError::unimplemented(
                    "arrow function with an expression body",
                )),
            },
            other => Err(CompileError::unsupported(other.kind_name())),
        }
    }

    fn lower_literal(&mut self, lit: &Literal) -> Result<ResolvedValue, CompileError> {
        let fs = self.fs();
        match lit {
            Literal::Number(n) => Ok(ResolvedValue::Constant(fs.add_constant(Constant::number(*n)))),
            Literal::String(s) => Ok(ResolvedValue::Constant(fs.string_constant(s))),
            Literal::Boolean(b) => {
                let reg = fs.scope.alloc_reg()?;
                fs.emit_abc(OpCode::LoadBool, reg, *b as u32, 0);
                Ok(ResolvedValue::Register(reg))
            }
            Literal::Null => {
                let reg = fs.scope.alloc_reg()?;
                fs.emit_abc(OpCode::LoadNil, reg, 0, 0);
                Ok(ResolvedValue::Register(reg))
            }
            Literal::BigInt(_) => Err(CompileError::unsupported("bigint literal")),
            Literal::RegExp { .. } => Err(CompileError::unsupported("regular expression literal")),
        }
    }

    fn lower_member(&mut self, m: &MemberExpression) -> Result<ResolvedValue, CompileError> {
        let object = self.lower_expr(&m.object)?;
        let owner = self.fs().member_owner(object)?;
        match &m.property {
            MemberProperty::Identifier(id) => {
                self.resolver.push_owner(owner);
                let member = self
                    .resolver
                    .resolve(&id.name, &mut self.contexts, self.types);
                self.resolver.pop_owner();
                member
            }
            MemberProperty::Expression(key) => {
                let key = self.lower_expr(key)?;
                let key = self.fs().member_key(key)?;
                Ok(ResolvedValue::load_member(owner, key))
            }
        }
    }

    fn lower_object(&mut self, obj: &ObjectExpression) -> Result<ResolvedValue, CompileError> {
        let fs = self.fs();
        let table = fs.scope.alloc_reg()?;
        fs.emit_abc(OpCode::NewTable, table, 0, int2fb(obj.properties.len() as u32));

        for prop in &obj.properties {
            let key = match &prop.key {
                PropertyKey::Identifier(id) => {
                    ResolvedValue::Constant(self.fs().string_constant(&id.name))
                }
                PropertyKey::Literal(lit) => match literal_constant(lit) {
                    Some(k) => ResolvedValue::Constant(self.fs().add_constant(k)),
                    None => return Err(CompileError::unsupported("non-string property key")),
                },
                PropertyKey::Computed(expr) => self.lower_expr(expr)?,
            };
            let key = self.fs().optimize(key)?;
            let value = self.lower_expr(&prop.value)?;
            let fs = self.fs();
            let value = fs.optimize(value)?;
            fs.emit_abc(OpCode::SetTable, table, key, value);
            fs.free_operands(key, value);
        }
        Ok(ResolvedValue::Register(table))
    }

    /// Elements 1.. go through SETLIST into the array part; element 0 is
    /// stored last with an explicit SETTABLE.
    fn lower_array(&mut self, arr: &ArrayExpression) -> Result<ResolvedValue, CompileError> {
        let count = arr.elements.len();
        if count > MAX_ARRAY_LITERAL {
            return Err(CompileError::unimplemented(format!(
                "array literal with more than {MAX_ARRAY_LITERAL} elements"
            )));
        }
        let fs = self.fs();
        let table = fs.scope.alloc_reg()?;
        let list_len = count.saturating_sub(1) as u32;
        let hash_len = count.min(1) as u32;
        fs.emit_abc(OpCode::NewTable, table, int2fb(list_len), int2fb(hash_len));

        let mut pending = 0;
        let mut batch = 1;
        for element in arr.elements.iter().skip(1) {
            match element {
                Some(expr) => {
                    let value = self.lower_expr(expr)?;
                    self.fs().materialize_next(value)?;
                }
                None => {
                    let fs = self.fs();
                    let reg = fs.scope.alloc_reg()?;
                    fs.emit_abc(OpCode::LoadNil, reg, 0, 0);
                }
            }
            pending += 1;
            if pending == FIELDS_PER_FLUSH {
                self.flush_list(table, pending, batch);
                pending = 0;
                batch += 1;
            }
        }
        if pending > 0 {
            self.flush_list(table, pending, batch);
        }

        if let Some(Some(first)) = arr.elements.first() {
            let value = self.lower_expr(first)?;
            let fs = self.fs();
            let value = fs.optimize(value)?;
            let zero = fs.add_constant(Constant::Integer(0));
            let zero = fs.optimize(ResolvedValue::Constant(zero))?;
            fs.emit_abc(OpCode::SetTable, table, zero, value);
            fs.free_operands(zero, value);
        }
        Ok(ResolvedValue::Register(table))
    }

    fn flush_list(&mut self, table: u32, count: u32, batch: u32) {
        let fs = self.fs();
        fs.emit_abc(OpCode::SetList, table, count, batch);
        fs.scope.free_reg_to(table + 1);
    }

    fn lower_unary(&mut self, u: &UnaryExpression) -> Result<ResolvedValue, CompileError> {
        let op = unary_opcode(u.operator).ok_or_else(|| {
            CompileError::unsupported(format!("unary operator '{}'", u.operator.as_str()))
        })?;
        let value = self.lower_expr(&u.argument)?;
        let fs = self.fs();
        let src = fs.materialize(value)?;
        fs.scope.free_reg(src);
        let dst = fs.scope.alloc_reg()?;
        fs.emit_abc(op, dst, src, 0);
        Ok(ResolvedValue::Register(dst))
    }

    fn lower_binary(
        &mut self,
        bin: &BinaryExpression,
        whole: &Expression,
    ) -> Result<ResolvedValue, CompileError> {
        let left = self.lower_expr(&bin.left)?;
        let is_string = bin.operator == BinaryOperator::Add && self.types.is_string(whole);
        self.combine(bin.operator, left, &bin.right, is_string)
    }

    /// Apply `op` to an already lowered left operand and the right operand
    /// expression, which is lowered here, after the left.
    ///
    /// Left before right is the source evaluation order and keeps the
    /// operand registers LIFO. Do not swap it to right-first; `>` and `>=`
    /// swap their operands only in the emitted comparison.
    pub(super) fn combine(
        &mut self,
        op: BinaryOperator,
        left: ResolvedValue,
        right: &Expression,
        is_string: bool,
    ) -> Result<ResolvedValue, CompileError> {
        if let Some(expect) = logical_expect(op) {
            return self.lower_logical(left, right, expect);
        }
        if let Some(cmp) = comparison(op) {
            return self.lower_comparison(left, right, cmp);
        }
        if is_string {
            return self.lower_concat(left, right);
        }
        let opcode = arith_opcode(op).ok_or_else(|| {
            CompileError::unsupported(format!("binary operator '{}'", op.as_str()))
        })?;

        let lhs = self.fs().optimize(left)?;
        let value = self.lower_expr(right)?;
        let fs = self.fs();
        let rhs = fs.optimize(value)?;
        fs.free_operands(lhs, rhs);
        let dst = fs.scope.alloc_reg()?;
        fs.emit_abc(opcode, dst, lhs, rhs);
        Ok(ResolvedValue::Register(dst))
    }

    /// CONCAT needs both operands in consecutive registers.
    fn lower_concat(
        &mut self,
        left: ResolvedValue,
        right: &Expression,
    ) -> Result<ResolvedValue, CompileError> {
        let first = self.fs().materialize_next(left)?;
        let value = self.lower_expr(right)?;
        let fs = self.fs();
        let last = fs.materialize_next(value)?;
        fs.scope.free_regs(first, last);
        let dst = fs.scope.alloc_reg()?;
        fs.emit_abc(OpCode::Concat, dst, first, last);
        Ok(ResolvedValue::Register(dst))
    }

    /// `cmp; JMP +1; LOADBOOL dst 0 1; LOADBOOL dst 1 0`
    fn lower_comparison(
        &mut self,
        left: ResolvedValue,
        right: &Expression,
        cmp: Comparison,
    ) -> Result<ResolvedValue, CompileError> {
        let lhs = self.fs().optimize(left)?;
        let value = self.lower_expr(right)?;
        let fs = self.fs();
        let rhs = fs.optimize(value)?;
        fs.free_operands(lhs, rhs);
        let dst = fs.scope.alloc_reg()?;

        let (b, c) = if cmp.swap { (rhs, lhs) } else { (lhs, rhs) };
        fs.emit_test_jump(cmp.op, cmp.expect, b, c, 1);
        fs.emit_abc(OpCode::LoadBool, dst, 0, 1);
        fs.emit_abc(OpCode::LoadBool, dst, 1, 0);
        Ok(ResolvedValue::Register(dst))
    }

    /// `TESTSET dst left expect; JMP over; <right into dst>`
    fn lower_logical(
        &mut self,
        left: ResolvedValue,
        right: &Expression,
        expect: u32,
    ) -> Result<ResolvedValue, CompileError> {
        let fs = self.fs();
        let src = fs.materialize(left)?;
        fs.scope.free_reg(src);
        let dst = fs.scope.alloc_reg()?;
        let jump = fs.emit_test_jump(OpCode::TestSet, dst, src, expect, 0);

        let value = self.lower_expr(right)?;
        let fs = self.fs();
        fs.free_value(&value);
        fs.discharge_to_reg(&value, dst)?;
        fs.patch_jump(jump);
        Ok(ResolvedValue::Register(dst))
    }

    /// Lower a call with the callee and arguments in consecutive registers
    /// from the returned base. A trailing call argument forwards all its
    /// results.
    pub(super) fn lower_call(
        &mut self,
        call: &CallExpression,
        results: CallResults,
    ) -> Result<u32, CompileError> {
        let callee = self.lower_expr(&call.callee)?;
        let base = self.fs().materialize_next(callee)?;

        let mut open = false;
        for (i, arg) in call.arguments.iter().enumerate() {
            let last = i + 1 == call.arguments.len();
            match arg {
                Expression::Call(inner) if last => {
                    self.lower_call(inner, CallResults::Forward)?;
                    open = true;
                }
                _ => {
                    let value = self.lower_expr(arg)?;
                    self.fs().materialize_next(value)?;
                }
            }
        }

        let fs = self.fs();
        let b = if open {
            0
        } else {
            call.arguments.len() as u32 + 1
        };
        fs.emit_abc(OpCode::Call, base, b, results.operand());
        fs.scope.free_reg_to(base);
        if results != CallResults::Discard {
            fs.scope.alloc_reg()?;
        }
        Ok(base)
    }
}

/// The pool entry for a number or string literal.
fn literal_constant(lit: &Literal) -> Option<Constant> {
    match lit {
        Literal::Number(n) => Some(Constant::number(*n)),
        Literal::String(s) => Some(Constant::Str(s.clone())),
        _ => None,
    }
}
