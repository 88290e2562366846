use super::helpers::*;
use pretty_assertions::assert_eq;
use tslua_ast::{
    ArrowBody, ArrowFunctionExpression, BinaryOperator, Expression, FunctionExpression,
    Identifier,
};
use tslua_compiler::opcode::{rk_constant, Instruction, OpCode};

#[test]
fn e2e_parameters_occupy_first_registers() {
    let proto = compile_ok(vec![function(
        "add",
        &["a", "b"],
        vec![ret(Expression::binary(
            BinaryOperator::Add,
            Expression::ident("a"),
            Expression::ident("b"),
        ))],
    )]);
    let add = &proto.protos[0];
    assert_eq!(add.num_params, 2);
    assert!(!add.is_vararg);
    assert_eq!(
        add.code,
        vec![
            Instruction::abc(OpCode::Add, 2, 0, 1),
            Instruction::abc(OpCode::Return, 2, 2, 0),
            Instruction::abc(OpCode::Return, 0, 1, 0),
        ]
    );
    assert_eq!(add.max_stack_size, 3);
}

#[test]
fn e2e_closure_captures_enclosing_local() {
    let proto = compile_ok(vec![
        let_("x", Expression::number(1.0)),
        function("get", &[], vec![ret(Expression::ident("x"))]),
    ]);
    let get = &proto.protos[0];
    assert_eq!(get.upvalues.len(), 2);
    assert_eq!(get.upvalues[0].name, "_ENV");
    assert!(!get.upvalues[0].in_stack);
    assert_eq!(get.upvalues[1].name, "x");
    assert!(get.upvalues[1].in_stack);
    assert_eq!(get.upvalues[1].index, 0);
    assert_eq!(get.code[0], Instruction::abc(OpCode::GetUpval, 0, 1, 0));
}

#[test]
fn e2e_capture_through_two_levels() {
    let proto = compile_ok(vec![
        let_("x", Expression::number(1.0)),
        function(
            "outer",
            &[],
            vec![function("inner", &[], vec![ret(Expression::ident("x"))])],
        ),
    ]);
    let outer = &proto.protos[0];
    let inner = &outer.protos[0];
    assert_eq!(outer.upvalues[1].name, "x");
    assert!(outer.upvalues[1].in_stack);
    assert_eq!(inner.upvalues[1].name, "x");
    assert!(!inner.upvalues[1].in_stack);
    assert_eq!(inner.upvalues[1].index, 1);
}

#[test]
fn e2e_assignment_to_captured_local() {
    let proto = compile_ok(vec![
        let_("n", Expression::number(0.0)),
        function(
            "reset",
            &[],
            vec![expr(Expression::assign(
                Expression::ident("n"),
                Expression::number(5.0),
            ))],
        ),
    ]);
    let reset = &proto.protos[0];
    assert_eq!(
        reset.code[..2],
        [
            Instruction::abx(OpCode::LoadK, 0, 0),
            Instruction::abc(OpCode::SetUpval, 0, 1, 0),
        ]
    );
}

#[test]
fn e2e_globals_inside_functions_go_through_env_upvalue() {
    let proto = compile_ok(vec![function(
        "hello",
        &[],
        vec![call_stmt("print", vec![Expression::string("hi")])],
    )]);
    let hello = &proto.protos[0];
    assert_eq!(
        hello.code[0],
        Instruction::abc(OpCode::GetTabUp, 0, 0, rk_constant(0))
    );
    assert_eq!(hello.upvalues.len(), 1);
}

#[test]
fn e2e_function_expression_and_arrow() {
    let proto = compile_ok(vec![
        let_(
            "f",
            Expression::Function(FunctionExpression {
                id: None,
                params: vec![Identifier::new("v")],
                body: vec![ret(Expression::ident("v"))],
            }),
        ),
        let_(
            "g",
            Expression::Arrow(ArrowFunctionExpression {
                params: vec![],
                body: ArrowBody::Block(vec![]),
            }),
        ),
    ]);
    assert_eq!(proto.protos.len(), 2);
    assert_eq!(
        proto.code[..2],
        [
            Instruction::abx(OpCode::Closure, 0, 0),
            Instruction::abx(OpCode::Closure, 1, 1),
        ]
    );
    assert_eq!(
        proto.protos[0].code[0],
        Instruction::abc(OpCode::Return, 0, 2, 0)
    );
}

#[test]
fn e2e_function_locals_are_independent() {
    let proto = compile_ok(vec![
        let_("a", Expression::number(1.0)),
        let_("b", Expression::number(2.0)),
        function("f", &[], vec![let_("c", Expression::number(3.0))]),
    ]);
    let f = &proto.protos[0];
    assert_eq!(f.code[0], Instruction::abx(OpCode::LoadK, 0, 0));
    assert_eq!(f.max_stack_size, 2);
}

#[test]
fn e2e_this_outside_methods_is_env() {
    let proto = compile_ok(vec![let_("self", Expression::This)]);
    assert_eq!(proto.code[0], Instruction::abc(OpCode::GetUpval, 0, 0, 0));
}

#[test]
fn e2e_this_parameter_is_a_local() {
    let proto = compile_ok(vec![function(
        "method",
        &["this"],
        vec![ret(Expression::member(Expression::This, "name"))],
    )]);
    let method = &proto.protos[0];
    assert_eq!(
        method.code[0],
        Instruction::abc(OpCode::GetTable, 1, 0, rk_constant(0))
    );
}
