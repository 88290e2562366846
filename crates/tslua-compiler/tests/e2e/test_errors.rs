use super::helpers::*;
use pretty_assertions::assert_eq;
use tslua_ast::{
    CallExpression, ClassDeclaration, CompilationRoot, ConditionalExpression, Expression,
    Identifier, IfStatement, Literal, Program, Statement, UpdateExpression, UpdateOperator,
    WhileStatement,
};
use tslua_compiler::{compile, CompileError};

fn unsupported(err: CompileError) -> String {
    match err {
        CompileError::UnsupportedConstruct(what) => what,
        other => panic!("expected an unsupported construct, got {other:?}"),
    }
}

#[test]
fn e2e_control_flow_is_rejected() {
    let cases = vec![
        (
            Statement::If(IfStatement {
                test: Expression::boolean(true),
                consequent: Box::new(Statement::Empty),
                alternate: None,
            }),
            "if statement",
        ),
        (
            Statement::While(WhileStatement {
                test: Expression::boolean(true),
                body: Box::new(Statement::Empty),
            }),
            "while statement",
        ),
        (Statement::Continue, "continue statement"),
        (Statement::Throw(Expression::string("boom")), "throw statement"),
        (Statement::Block(vec![]), "block statement"),
    ];
    for (stmt, name) in cases {
        assert_eq!(unsupported(compile_err(vec![stmt])), name);
    }
}

#[test]
fn e2e_class_is_rejected() {
    let err = compile_err(vec![Statement::Class(ClassDeclaration {
        id: Identifier::new("Point"),
        members: vec![],
    })]);
    assert_eq!(unsupported(err), "class declaration");
}

#[test]
fn e2e_unsupported_expressions() {
    let cases = vec![
        Expression::Conditional(ConditionalExpression {
            test: Box::new(Expression::boolean(true)),
            consequent: Box::new(Expression::number(1.0)),
            alternate: Box::new(Expression::number(2.0)),
        }),
        Expression::New(CallExpression {
            callee: Box::new(Expression::ident("foo")),
            arguments: vec![],
        }),
        Expression::Sequence(vec![Expression::number(1.0), Expression::number(2.0)]),
        Expression::Literal(Literal::BigInt("10".into())),
        Expression::Literal(Literal::RegExp {
            pattern: "a+".into(),
            flags: "g".into(),
        }),
        Expression::binary(
            tslua_ast::BinaryOperator::In,
            Expression::string("k"),
            Expression::ident("foo"),
        ),
    ];
    for init in cases {
        let err = compile_err(vec![let_("x", init)]);
        assert!(
            matches!(err, CompileError::UnsupportedConstruct(_)),
            "got {err:?}"
        );
    }
}

#[test]
fn e2e_unresolved_identifier() {
    let err = compile_err(vec![call_stmt("print", vec![Expression::ident("nowhere")])]);
    assert_eq!(err, CompileError::UnresolvedIdentifier("nowhere".into()));
    assert_eq!(err.to_string(), "unresolved identifier 'nowhere'");
}

#[test]
fn e2e_let_is_not_visible_in_sibling_scope_before_declaration() {
    let err = compile_err(vec![
        call_stmt("print", vec![Expression::ident("later")]),
        let_("later", Expression::number(1.0)),
    ]);
    assert_eq!(err, CompileError::UnresolvedIdentifier("later".into()));
}

#[test]
fn e2e_const_reassignment() {
    let err = compile_err(vec![
        const_("limit", Expression::number(10.0)),
        expr(Expression::assign(Expression::ident("limit"), Expression::number(11.0))),
    ]);
    assert_eq!(unsupported(err), "assignment to constant 'limit'");
}

#[test]
fn e2e_assignment_to_non_lvalue() {
    let err = compile_err(vec![expr(Expression::assign(
        Expression::number(1.0),
        Expression::number(2.0),
    ))]);
    assert_eq!(unsupported(err), "assignment to literal");
}

#[test]
fn e2e_postfix_update_as_value() {
    let err = compile_err(vec![
        let_("i", Expression::number(0.0)),
        let_(
            "j",
            Expression::Update(UpdateExpression {
                operator: UpdateOperator::Increment,
                argument: Box::new(Expression::ident("i")),
                prefix: false,
            }),
        ),
    ]);
    assert_eq!(
        err,
        CompileError::UnimplementedFeature("postfix increment/decrement".into())
    );
}

#[test]
fn e2e_postfix_update_as_statement() {
    for operator in [UpdateOperator::Increment, UpdateOperator::Decrement] {
        let err = compile_err(vec![
            let_("x", Expression::number(1.0)),
            expr(Expression::Update(UpdateExpression {
                operator,
                argument: Box::new(Expression::ident("x")),
                prefix: false,
            })),
        ]);
        assert_eq!(
            err,
            CompileError::UnimplementedFeature("postfix increment/decrement".into())
        );
    }
}

#[test]
fn e2e_non_program_roots() {
    let types = types();
    let bundle = CompilationRoot::Bundle(vec![Program { body: vec![] }]);
    assert!(matches!(
        compile(&bundle, &types),
        Err(CompileError::UnimplementedFeature(_))
    ));
    let unparsed = CompilationRoot::Unparsed("let x = 1;".into());
    assert!(matches!(
        compile(&unparsed, &types),
        Err(CompileError::UnimplementedFeature(_))
    ));
}

#[test]
fn e2e_failure_inside_nested_function_aborts() {
    let err = compile_err(vec![function("f", &[], vec![Statement::Break])]);
    assert_eq!(unsupported(err), "break statement");
}
