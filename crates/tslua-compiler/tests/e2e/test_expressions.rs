use super::helpers::*;
use pretty_assertions::assert_eq;
use tslua_ast::{BinaryOperator, Expression, Literal, UnaryExpression, UnaryOperator};
use tslua_compiler::opcode::{rk_constant, Instruction, OpCode};
use tslua_compiler::proto::Constant;

fn locals_ab() -> Vec<tslua_ast::Statement> {
    vec![
        let_("a", Expression::number(1.0)),
        let_("b", Expression::number(2.0)),
    ]
}

fn with_result(op: BinaryOperator) -> Vec<tslua_ast::Statement> {
    let mut body = locals_ab();
    body.push(let_(
        "r",
        Expression::binary(op, Expression::ident("a"), Expression::ident("b")),
    ));
    body
}

#[test]
fn e2e_integer_and_float_constants() {
    let proto = compile_ok(vec![
        let_("i", Expression::number(7.0)),
        let_("f", Expression::number(2.5)),
        let_("z", Expression::number(-0.0)),
    ]);
    assert_eq!(proto.constants.get(0), Some(&Constant::Integer(7)));
    assert_eq!(proto.constants.get(1), Some(&Constant::Float(2.5)));
    assert_eq!(proto.constants.get(2), Some(&Constant::Float(-0.0)));
}

#[test]
fn e2e_constants_are_deduplicated() {
    let proto = compile_ok(vec![
        call_stmt("print", vec![Expression::string("hi")]),
        call_stmt("print", vec![Expression::string("hi")]),
        let_("n", Expression::number(3.0)),
        let_("m", Expression::number(3.0)),
    ]);
    // "print", "hi", 3
    assert_eq!(proto.constants.len(), 3);
    assert_eq!(count_opcode(&proto, OpCode::LoadK), 4);
}

#[test]
fn e2e_equality_shape() {
    let proto = compile_ok(with_result(BinaryOperator::StrictEqual));
    assert_eq!(
        proto.code[2..6],
        [
            Instruction::abc(OpCode::Eq, 1, 0, 1),
            Instruction::asbx(OpCode::Jmp, 0, 1),
            Instruction::abc(OpCode::LoadBool, 2, 0, 1),
            Instruction::abc(OpCode::LoadBool, 2, 1, 0),
        ]
    );
}

#[test]
fn e2e_inequality_inverts_expectation() {
    for op in [BinaryOperator::NotEqual, BinaryOperator::StrictNotEqual] {
        let proto = compile_ok(with_result(op));
        assert_eq!(proto.code[2], Instruction::abc(OpCode::Eq, 0, 0, 1));
    }
}

#[test]
fn e2e_relational_operators() {
    let cases = [
        (BinaryOperator::LessThan, Instruction::abc(OpCode::Lt, 1, 0, 1)),
        (BinaryOperator::LessThanEqual, Instruction::abc(OpCode::Le, 1, 0, 1)),
        (BinaryOperator::GreaterThan, Instruction::abc(OpCode::Lt, 1, 1, 0)),
        (BinaryOperator::GreaterThanEqual, Instruction::abc(OpCode::Le, 1, 1, 0)),
    ];
    for (op, expected) in cases {
        let proto = compile_ok(with_result(op));
        assert_eq!(proto.code[2], expected, "operator {}", op.as_str());
    }
}

#[test]
fn e2e_comparison_against_constant() {
    let proto = compile_ok(vec![
        let_("a", Expression::number(1.0)),
        let_(
            "r",
            Expression::binary(
                BinaryOperator::LessThan,
                Expression::ident("a"),
                Expression::number(10.0),
            ),
        ),
    ]);
    assert_eq!(proto.code[1], Instruction::abc(OpCode::Lt, 1, 0, rk_constant(1)));
}

#[test]
fn e2e_logical_or_shape() {
    let proto = compile_ok(with_result(BinaryOperator::LogicalOr));
    assert_eq!(
        proto.code[2..5],
        [
            Instruction::abc(OpCode::TestSet, 2, 0, 1),
            Instruction::asbx(OpCode::Jmp, 0, 1),
            Instruction::abc(OpCode::Move, 2, 1, 0),
        ]
    );
}

#[test]
fn e2e_logical_and_shape() {
    let proto = compile_ok(with_result(BinaryOperator::LogicalAnd));
    assert_eq!(proto.code[2], Instruction::abc(OpCode::TestSet, 2, 0, 0));
    assert_eq!(proto.code[3], Instruction::asbx(OpCode::Jmp, 0, 1));
}

#[test]
fn e2e_logical_jump_skips_whole_right_operand() {
    // a || print("x")
    let mut body = locals_ab();
    body.push(let_(
        "r",
        Expression::binary(
            BinaryOperator::LogicalOr,
            Expression::ident("a"),
            Expression::call(Expression::ident("print"), vec![Expression::string("x")]),
        ),
    ));
    let proto = compile_ok(body);
    let jmp = find_opcode(&proto, OpCode::Jmp).unwrap();
    let Instruction::AsBx { sbx, .. } = proto.code[jmp] else {
        panic!("JMP is not AsBx");
    };
    // GETTABUP, LOADK, CALL, MOVE into the result register
    assert_eq!(sbx, 4);
    assert_eq!(proto.code[jmp + sbx as usize], Instruction::abc(OpCode::Move, 2, 3, 0));
}

#[test]
fn e2e_arithmetic_operators() {
    let cases = [
        (BinaryOperator::Add, OpCode::Add),
        (BinaryOperator::Subtract, OpCode::Sub),
        (BinaryOperator::Multiply, OpCode::Mul),
        (BinaryOperator::Divide, OpCode::Div),
        (BinaryOperator::Modulo, OpCode::Mod),
        (BinaryOperator::Exponent, OpCode::Pow),
        (BinaryOperator::BitwiseAnd, OpCode::BAnd),
        (BinaryOperator::BitwiseOr, OpCode::BOr),
        (BinaryOperator::BitwiseXor, OpCode::BXor),
        (BinaryOperator::LeftShift, OpCode::Shl),
        (BinaryOperator::RightShift, OpCode::Shr),
        (BinaryOperator::UnsignedRightShift, OpCode::Shr),
    ];
    for (op, opcode) in cases {
        let proto = compile_ok(with_result(op));
        assert_eq!(proto.code[2], Instruction::abc(opcode, 2, 0, 1), "operator {}", op.as_str());
    }
}

#[test]
fn e2e_arithmetic_on_constants_uses_rk() {
    let proto = compile_ok(vec![let_(
        "x",
        Expression::binary(
            BinaryOperator::Multiply,
            Expression::number(6.0),
            Expression::number(7.0),
        ),
    )]);
    assert_eq!(
        proto.code[0],
        Instruction::abc(OpCode::Mul, 0, rk_constant(0), rk_constant(1))
    );
    assert_eq!(proto.max_stack_size, 2);
}

#[test]
fn e2e_nested_arithmetic_frees_temporaries() {
    // (1 + 2) * (3 - 4)
    let proto = compile_ok(vec![let_(
        "x",
        Expression::binary(
            BinaryOperator::Multiply,
            Expression::binary(BinaryOperator::Add, Expression::number(1.0), Expression::number(2.0)),
            Expression::binary(
                BinaryOperator::Subtract,
                Expression::number(3.0),
                Expression::number(4.0),
            ),
        ),
    )]);
    assert_eq!(
        proto.code[..3],
        [
            Instruction::abc(OpCode::Add, 0, rk_constant(0), rk_constant(1)),
            Instruction::abc(OpCode::Sub, 1, rk_constant(2), rk_constant(3)),
            Instruction::abc(OpCode::Mul, 0, 0, 1),
        ]
    );
}

#[test]
fn e2e_string_concatenation() {
    let proto = compile_ok(vec![let_(
        "s",
        Expression::binary(
            BinaryOperator::Add,
            Expression::string("foo"),
            Expression::string("bar"),
        ),
    )]);
    assert_eq!(
        opcodes(&proto),
        vec![OpCode::LoadK, OpCode::LoadK, OpCode::Concat, OpCode::Return]
    );
    assert_eq!(proto.code[2], Instruction::abc(OpCode::Concat, 0, 0, 1));
}

#[test]
fn e2e_literals() {
    let proto = compile_ok(vec![
        let_("t", Expression::boolean(true)),
        let_("f", Expression::boolean(false)),
        let_("n", Expression::null()),
        let_("u", Expression::ident("undefined")),
    ]);
    assert_eq!(
        proto.code[..4],
        [
            Instruction::abc(OpCode::LoadBool, 0, 1, 0),
            Instruction::abc(OpCode::LoadBool, 1, 0, 0),
            Instruction::abc(OpCode::LoadNil, 2, 0, 0),
            Instruction::abx(OpCode::LoadK, 3, 0),
        ]
    );
    assert_eq!(proto.constants.get(0), Some(&Constant::Nil));
}

#[test]
fn e2e_infinity_alias() {
    let proto = compile_ok(vec![let_("i", Expression::ident("Infinity"))]);
    assert_eq!(proto.constants.get(0), Some(&Constant::Float(f64::INFINITY)));
}

#[test]
fn e2e_unary_operators() {
    for (op, opcode) in [
        (UnaryOperator::Minus, OpCode::Unm),
        (UnaryOperator::BitwiseNot, OpCode::BNot),
        (UnaryOperator::LogicalNot, OpCode::Not),
    ] {
        let proto = compile_ok(vec![
            let_("a", Expression::number(1.0)),
            let_(
                "r",
                Expression::Unary(UnaryExpression {
                    operator: op,
                    argument: Box::new(Expression::ident("a")),
                }),
            ),
        ]);
        assert_eq!(proto.code[1], Instruction::abc(opcode, 1, 0, 0));
    }
}

#[test]
fn e2e_member_reads() {
    // let x = string.format; let y = x[1];
    let proto = compile_ok(vec![
        let_("x", Expression::member(Expression::ident("string"), "format")),
        let_("y", Expression::index(Expression::ident("x"), Expression::number(1.0))),
    ]);
    assert_eq!(
        proto.code[..3],
        [
            Instruction::abc(OpCode::GetTabUp, 0, 0, rk_constant(0)),
            Instruction::abc(OpCode::GetTable, 0, 0, rk_constant(1)),
            Instruction::abc(OpCode::GetTable, 1, 0, rk_constant(2)),
        ]
    );
}

#[test]
fn e2e_member_assignment_rewrites_to_settable() {
    // let t = {}; t.k = "v"; t["j"] = t.k;
    let proto = compile_ok(vec![
        let_("t", Expression::Object(tslua_ast::ObjectExpression { properties: vec![] })),
        expr(Expression::assign(
            Expression::member(Expression::ident("t"), "k"),
            Expression::string("v"),
        )),
        expr(Expression::assign(
            Expression::index(Expression::ident("t"), Expression::Literal(Literal::String("j".into()))),
            Expression::member(Expression::ident("t"), "k"),
        )),
    ]);
    assert_eq!(
        proto.code[1..4],
        [
            Instruction::abc(OpCode::SetTable, 0, rk_constant(0), rk_constant(1)),
            Instruction::abc(OpCode::GetTable, 1, 0, rk_constant(0)),
            Instruction::abc(OpCode::SetTable, 0, rk_constant(2), 1),
        ]
    );
    assert!(!has_opcode(&proto, OpCode::SetTabUp));
}

#[test]
fn e2e_global_assignment_rewrites_to_settabup() {
    let proto = compile_ok(vec![expr(Expression::assign(
        Expression::ident("counter"),
        Expression::number(0.0),
    ))]);
    assert_eq!(
        proto.code[0],
        Instruction::abc(OpCode::SetTabUp, 0, rk_constant(0), rk_constant(1))
    );
}

#[test]
fn e2e_temporaries_balance_after_statements() {
    let mut body = Vec::new();
    for i in 0..20 {
        body.push(call_stmt(
            "print",
            vec![Expression::binary(
                BinaryOperator::Add,
                Expression::number(i as f64),
                Expression::number(1.0),
            )],
        ));
    }
    let proto = compile_ok(body);
    // callee and one argument
    assert_eq!(proto.max_stack_size, 2);
    assert_eq!(count_opcode(&proto, OpCode::Call), 20);
}
