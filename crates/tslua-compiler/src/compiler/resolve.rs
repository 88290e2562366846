/// Identifier classification against the chain of open functions.
use rustc_hash::FxHashSet;
use tslua_ast::TypeChecker;

use super::context::{FunctionContext, ENV};
use super::expr::ResolvedValue;
use crate::error::CompileError;
use crate::proto::Constant;

/// Names that compile to a constant instead of a variable read.
fn alias(name: &str) -> Option<Constant> {
    match name {
        "undefined" => Some(Constant::Nil),
        "NaN" => Some(Constant::Float(f64::NAN)),
        "Infinity" => Some(Constant::Float(f64::INFINITY)),
        _ => None,
    }
}

pub fn is_alias(name: &str) -> bool {
    alias(name).is_some()
}

/// Resolves names in priority order: a member of the owner being indexed,
/// a local register, a captured upvalue, a constant alias, a global.
#[derive(Debug, Default)]
pub struct IdentifierResolver {
    /// Owners of the member accesses being lowered, innermost last.
    owners: Vec<ResolvedValue>,
    /// Names the program stores into `_ENV`.
    globals: FxHashSet<String>,
}

impl IdentifierResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the next name as a field of `owner`.
    pub fn push_owner(&mut self, owner: ResolvedValue) {
        self.owners.push(owner);
    }

    pub fn pop_owner(&mut self) -> Option<ResolvedValue> {
        self.owners.pop()
    }

    pub fn declare_global(&mut self, name: &str) {
        self.globals.insert(name.to_string());
    }

    pub fn is_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    pub fn resolve(
        &mut self,
        name: &str,
        contexts: &mut [FunctionContext],
        types: &dyn TypeChecker,
    ) -> Result<ResolvedValue, CompileError> {
        let level = current_level(contexts)?;

        if let Some(owner) = self.owners.last().cloned() {
            let ctx = &mut contexts[level];
            let k = ctx.string_constant(name);
            let member = ctx.member_key(ResolvedValue::Constant(k))?;
            return Ok(ResolvedValue::load_member(owner, member));
        }

        if let Some(binding) = resolve_binding(contexts, name)? {
            return Ok(binding);
        }

        let ctx = &mut contexts[level];
        if let Some(k) = alias(name) {
            return Ok(ResolvedValue::Constant(ctx.add_constant(k)));
        }

        if self.is_global(name) || types.is_ambient_global(name) {
            return global(ctx, name);
        }

        Err(CompileError::UnresolvedIdentifier(name.to_string()))
    }

    /// `this` is the local named `this` when one is bound, else `_ENV`.
    pub fn resolve_this(&self, contexts: &mut [FunctionContext]) -> Result<ResolvedValue, CompileError> {
        match resolve_binding(contexts, "this")? {
            Some(binding) => Ok(binding),
            None => Ok(ResolvedValue::Upvalue(env_index(contexts)?)),
        }
    }
}

/// `_ENV[name]` as seen from `ctx`.
pub fn global(ctx: &mut FunctionContext, name: &str) -> Result<ResolvedValue, CompileError> {
    let env = ctx
        .find_upvalue(ENV)
        .ok_or_else(|| CompileError::UnresolvedIdentifier(ENV.to_string()))?;
    let k = ctx.string_constant(name);
    let member = ctx.member_key(ResolvedValue::Constant(k))?;
    Ok(ResolvedValue::load_member(ResolvedValue::Upvalue(env), member))
}

/// A local of the current function or a variable captured from an
/// enclosing one. Captures are registered along the whole chain.
pub fn resolve_binding(
    contexts: &mut [FunctionContext],
    name: &str,
) -> Result<Option<ResolvedValue>, CompileError> {
    let level = current_level(contexts)?;
    if let Some(local) = contexts[level].scope.resolve_local(name) {
        return Ok(Some(ResolvedValue::Register(local.reg)));
    }
    Ok(resolve_upvalue(contexts, level, name)?.map(ResolvedValue::Upvalue))
}

fn resolve_upvalue(
    contexts: &mut [FunctionContext],
    level: usize,
    name: &str,
) -> Result<Option<u32>, CompileError> {
    if let Some(idx) = contexts[level].find_upvalue(name) {
        return Ok(Some(idx));
    }
    // The main function only sees _ENV.
    if level == 0 {
        return Ok(None);
    }

    let parent = level - 1;
    if let Some(local) = contexts[parent].scope.resolve_local(name) {
        let reg = local.reg;
        return contexts[level].add_upvalue(name, true, reg).map(Some);
    }
    match resolve_upvalue(contexts, parent, name)? {
        Some(up) => contexts[level].add_upvalue(name, false, up).map(Some),
        None => Ok(None),
    }
}

fn env_index(contexts: &[FunctionContext]) -> Result<u32, CompileError> {
    let level = current_level(contexts)?;
    contexts[level]
        .find_upvalue(ENV)
        .ok_or_else(|| CompileError::UnresolvedIdentifier(ENV.to_string()))
}

fn current_level(contexts: &[FunctionContext]) -> Result<usize, CompileError> {
    contexts
        .len()
        .checked_sub(1)
        .ok_or_else(|| CompileError::unsupported("identifier outside of any function"))
}
