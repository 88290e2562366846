/// Single-pass compiler: syntax tree → Proto bytecode.
pub mod assign;
pub mod context;
pub mod expr;
pub mod lower;
pub mod resolve;
pub mod scope;

use tracing::{debug, instrument};
use tslua_ast::{
    CompilationRoot, Expression, FunctionDeclaration, Identifier, Program, ReturnStatement,
    Statement, TypeChecker, VariableDeclaration, VariableKind,
};

use crate::chunk;
use crate::error::CompileError;
use crate::opcode::OpCode;
use crate::options::CompileOptions;
use crate::proto::Proto;
use context::FunctionContext;
use expr::{CallResults, ResolvedValue};
use resolve::IdentifierResolver;

/// The compiler: the stack of open functions, the resolver, and the type
/// oracle. One instance per compilation run.
pub struct Compiler<'a> {
    /// Open functions, the main chunk first.
    contexts: Vec<FunctionContext>,
    resolver: IdentifierResolver,
    types: &'a dyn TypeChecker,
}

impl<'a> Compiler<'a> {
    pub fn new(types: &'a dyn TypeChecker, source: Option<String>) -> Self {
        Compiler {
            contexts: vec![FunctionContext::root(source)],
            resolver: IdentifierResolver::new(),
            types,
        }
    }

    /// The function currently being compiled.
    fn fs(&mut self) -> &mut FunctionContext {
        let top = self.contexts.len() - 1;
        &mut self.contexts[top]
    }

    /// Close the main function and hand back its prototype.
    pub fn finish(mut self) -> Result<Proto, CompileError> {
        match (self.contexts.pop(), self.contexts.is_empty()) {
            (Some(main), true) => Ok(main.finish()),
            _ => Err(CompileError::unsupported("unbalanced function nesting")),
        }
    }

    /// Register the `var` and function names of a body as globals so that
    /// references ahead of the declaration resolve.
    fn hoist(&mut self, body: &[Statement]) {
        for stmt in body {
            match stmt {
                Statement::VariableDeclaration(decl) if decl.kind == VariableKind::Var => {
                    for d in &decl.declarations {
                        self.resolver.declare_global(&d.id.name);
                    }
                }
                Statement::FunctionDeclaration(f) => self.resolver.declare_global(&f.id.name),
                _ => {}
            }
        }
    }

    pub fn lower_block(&mut self, body: &[Statement]) -> Result<(), CompileError> {
        self.hoist(body);
        for stmt in body {
            self.lower_statement(stmt)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, stmt: &Statement) -> Result<(), CompileError> {
        match stmt {
            Statement::Empty => {}
            Statement::VariableDeclaration(decl) => self.lower_declaration(decl)?,
            Statement::FunctionDeclaration(f) => self.lower_function_declaration(f)?,
            Statement::Expression(s) => self.lower_expression_statement(&s.expression)?,
            Statement::Return(r) => self.lower_return(r)?,
            other => return Err(CompileError::unsupported(other.kind_name())),
        }
        let fs = self.fs();
        debug_assert_eq!(
            fs.scope.free_reg,
            fs.scope.num_locals(),
            "temporaries leaked past a statement"
        );
        Ok(())
    }

    fn lower_declaration(&mut self, decl: &VariableDeclaration) -> Result<(), CompileError> {
        for d in &decl.declarations {
            let name = d.id.name.as_str();
            let existing = self.fs().scope.resolve_local(name).map(|l| l.reg);

            if let Some(reg) = existing {
                // Redeclaring a local of this function is a plain store.
                match &d.init {
                    Some(init) => {
                        let value = self.lower_expr(init)?;
                        self.store_local(reg, value)?;
                    }
                    None if decl.kind.is_block_scoped() => {
                        self.fs().emit_abc(OpCode::LoadNil, reg, 0, 0);
                    }
                    None => {}
                }
            } else if decl.kind.is_block_scoped() {
                let reg = match &d.init {
                    Some(init) => {
                        let value = self.lower_expr(init)?;
                        self.fs().materialize_next(value)?
                    }
                    None => {
                        let fs = self.fs();
                        let reg = fs.scope.alloc_reg()?;
                        fs.emit_abc(OpCode::LoadNil, reg, 0, 0);
                        reg
                    }
                };
                let is_const = decl.kind == VariableKind::Const;
                self.fs().scope.add_local(name, reg, is_const);
            } else {
                self.resolver.declare_global(name);
                if let Some(init) = &d.init {
                    let target = self.global_target(name)?;
                    let value = self.lower_expr(init)?;
                    self.store(&target, value)?;
                    self.release(target);
                }
            }
        }
        Ok(())
    }

    fn lower_function_declaration(&mut self, f: &FunctionDeclaration) -> Result<(), CompileError> {
        let name = f.id.name.as_str();
        let existing = self.fs().scope.resolve_local(name).map(|l| l.reg);
        match existing {
            Some(reg) => {
                let closure = self.lower_function(Some(name), &f.params, &f.body)?;
                self.store_local(reg, closure)
            }
            None => {
                self.resolver.declare_global(name);
                let target = self.global_target(name)?;
                let closure = self.lower_function(Some(name), &f.params, &f.body)?;
                self.store(&target, closure)?;
                self.release(target);
                Ok(())
            }
        }
    }

    fn lower_expression_statement(&mut self, expr: &Expression) -> Result<(), CompileError> {
        match expr {
            Expression::Call(call) => {
                self.lower_call(call, CallResults::Discard)?;
            }
            Expression::Assignment(a) => {
                self.lower_assignment(a, false)?;
            }
            Expression::Update(u) => {
                self.lower_update(u, false)?;
            }
            _ => {
                let value = self.lower_expr(expr)?;
                let fs = self.fs();
                let reg = fs.materialize(value)?;
                fs.scope.free_reg(reg);
            }
        }
        Ok(())
    }

    fn lower_return(&mut self, ret: &ReturnStatement) -> Result<(), CompileError> {
        match &ret.argument {
            Some(arg) => {
                let value = self.lower_expr(arg)?;
                let fs = self.fs();
                let reg = fs.materialize(value)?;
                fs.emit_abc(OpCode::Return, reg, 2, 0);
                fs.scope.free_reg(reg);
            }
            None => {
                self.fs().emit_abc(OpCode::Return, 0, 1, 0);
            }
        }
        Ok(())
    }

    /// Compile a function body into a child prototype and leave a closure
    /// over it in a fresh register.
    fn lower_function(
        &mut self,
        name: Option<&str>,
        params: &[Identifier],
        body: &[Statement],
    ) -> Result<ResolvedValue, CompileError> {
        let child = FunctionContext::nested(self.fs(), name);
        self.contexts.push(child);
        let lowered = self.lower_function_body(params, body);
        let child = match (self.contexts.pop(), self.contexts.is_empty()) {
            (Some(child), false) => child,
            _ => return Err(CompileError::unsupported("unbalanced function nesting")),
        };
        lowered?;

        let proto = child.finish();
        let fs = self.fs();
        let index = fs.proto.protos.len() as u32;
        fs.proto.protos.push(proto);
        let dst = fs.scope.alloc_reg()?;
        fs.emit_abx(OpCode::Closure, dst, index);
        Ok(ResolvedValue::Register(dst))
    }

    fn lower_function_body(
        &mut self,
        params: &[Identifier],
        body: &[Statement],
    ) -> Result<(), CompileError> {
        let fs = self.fs();
        for param in params {
            let reg = fs.scope.alloc_reg()?;
            fs.scope.add_local(&param.name, reg, false);
        }
        fs.proto.num_params = params.len() as u8;
        self.lower_block(body)
    }
}

/// Compile a whole program into its main prototype.
#[instrument(skip_all, fields(statements = program.body.len()))]
pub fn compile_program(
    program: &Program,
    types: &dyn TypeChecker,
    options: &CompileOptions,
) -> Result<Proto, CompileError> {
    let mut compiler = Compiler::new(types, options.source.clone());
    compiler.lower_block(&program.body)?;
    let proto = compiler.finish()?;
    debug!(functions = proto.protos.len(), "program compiled");
    Ok(proto)
}

/// Compile `root` to a Lua 5.3 binary chunk.
pub fn compile_with_options(
    root: &CompilationRoot,
    types: &dyn TypeChecker,
    options: &CompileOptions,
) -> Result<Vec<u8>, CompileError> {
    let program = match root {
        CompilationRoot::Program(program) => program,
        CompilationRoot::Bundle(_) => {
            return Err(CompileError::unimplemented("bundled compilation roots"))
        }
        CompilationRoot::Unparsed(_) => {
            return Err(CompileError::unimplemented("unparsed source roots"))
        }
    };
    let proto = compile_program(program, types, options)?;
    chunk::dump(&proto, options)
}

/// Compile `root` with default options.
pub fn compile(root: &CompilationRoot, types: &dyn TypeChecker) -> Result<Vec<u8>, CompileError> {
    compile_with_options(root, types, &CompileOptions::default())
}
