//! Syntax tree consumed by the tslua compiler.
//!
//! The shapes follow ESTree. The tree covers more of the source language
//! than the compiler accepts so that the compiler can name whatever it
//! rejects.

pub mod types;

pub use types::{SyntacticTypes, TypeChecker};

/// What a compilation run is asked to compile.
#[derive(Debug, Clone, PartialEq)]
pub enum CompilationRoot {
    /// A single parsed source file.
    Program(Program),
    /// Several source files emitted as one output.
    Bundle(Vec<Program>),
    /// Source text prepended verbatim, never parsed.
    Unparsed(String),
}

/// A complete source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// The statements in the program
    pub body: Vec<Statement>,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Identifier { name: name.into() }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Variable declaration (var, let, const)
    VariableDeclaration(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(FunctionDeclaration),
    /// Expression statement
    Expression(ExpressionStatement),
    /// Return statement
    Return(ReturnStatement),
    /// Block statement { ... }
    Block(Vec<Statement>),
    /// If statement
    If(IfStatement),
    /// While statement
    While(WhileStatement),
    /// For statement
    For(ForStatement),
    /// Break statement
    Break,
    /// Continue statement
    Continue,
    /// Throw statement
    Throw(Expression),
    /// Class declaration
    Class(ClassDeclaration),
    /// Empty statement (;)
    Empty,
}

impl Statement {
    /// Human-readable node kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::VariableDeclaration(_) => "variable declaration",
            Statement::FunctionDeclaration(_) => "function declaration",
            Statement::Expression(_) => "expression statement",
            Statement::Return(_) => "return statement",
            Statement::Block(_) => "block statement",
            Statement::If(_) => "if statement",
            Statement::While(_) => "while statement",
            Statement::For(_) => "for statement",
            Statement::Break => "break statement",
            Statement::Continue => "continue statement",
            Statement::Throw(_) => "throw statement",
            Statement::Class(_) => "class declaration",
            Statement::Empty => "empty statement",
        }
    }
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// var declaration
    Var,
    /// let declaration
    Let,
    /// const declaration
    Const,
}

impl VariableKind {
    /// `let` and `const` bind in the enclosing block.
    pub fn is_block_scoped(self) -> bool {
        matches!(self, VariableKind::Let | VariableKind::Const)
    }
}

/// A variable declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// The kind of declaration
    pub kind: VariableKind,
    /// The declarators
    pub declarations: Vec<VariableDeclarator>,
}

/// A single variable declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// The identifier being declared
    pub id: Identifier,
    /// Optional initializer expression
    pub init: Option<Expression>,
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    /// The function name
    pub id: Identifier,
    /// The parameters
    pub params: Vec<Identifier>,
    /// The function body
    pub body: Vec<Statement>,
}

/// An expression statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    /// The expression
    pub expression: Expression,
}

/// A return statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    /// The returned value, if any
    pub argument: Option<Expression>,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

/// A for statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub init: Option<Box<Statement>>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
}

/// A class declaration. Classes need the object emulation layer and are
/// never compiled directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDeclaration {
    pub id: Identifier,
    pub members: Vec<FunctionDeclaration>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Identifier reference
    Identifier(Identifier),
    /// this keyword
    This,
    /// Array literal
    Array(ArrayExpression),
    /// Object literal
    Object(ObjectExpression),
    /// Binary expression, including `&&` and `||`
    Binary(BinaryExpression),
    /// Unary expression
    Unary(UnaryExpression),
    /// Assignment expression
    Assignment(AssignmentExpression),
    /// Call expression
    Call(CallExpression),
    /// Member access expression
    Member(MemberExpression),
    /// Conditional (ternary) expression
    Conditional(ConditionalExpression),
    /// Function expression
    Function(FunctionExpression),
    /// Arrow function expression
    Arrow(ArrowFunctionExpression),
    /// new expression
    New(CallExpression),
    /// Update expression (++/--)
    Update(UpdateExpression),
    /// Sequence expression (comma operator)
    Sequence(Vec<Expression>),
}

impl Expression {
    /// Human-readable node kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expression::Literal(_) => "literal",
            Expression::Identifier(_) => "identifier",
            Expression::This => "this",
            Expression::Array(_) => "array literal",
            Expression::Object(_) => "object literal",
            Expression::Binary(_) => "binary expression",
            Expression::Unary(_) => "unary expression",
            Expression::Assignment(_) => "assignment",
            Expression::Call(_) => "call expression",
            Expression::Member(_) => "member expression",
            Expression::Conditional(_) => "conditional expression",
            Expression::Function(_) => "function expression",
            Expression::Arrow(_) => "arrow function",
            Expression::New(_) => "new expression",
            Expression::Update(_) => "update expression",
            Expression::Sequence(_) => "sequence expression",
        }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expression::Identifier(Identifier::new(name))
    }

    pub fn number(value: f64) -> Self {
        Expression::Literal(Literal::Number(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(value.into()))
    }

    pub fn boolean(value: bool) -> Self {
        Expression::Literal(Literal::Boolean(value))
    }

    pub fn null() -> Self {
        Expression::Literal(Literal::Null)
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary(BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn assign(left: Expression, right: Expression) -> Self {
        Expression::Assignment(AssignmentExpression {
            operator: AssignmentOperator::Assign,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn call(callee: Expression, arguments: Vec<Expression>) -> Self {
        Expression::Call(CallExpression {
            callee: Box::new(callee),
            arguments,
        })
    }

    /// `object.name`
    pub fn member(object: Expression, name: impl Into<String>) -> Self {
        Expression::Member(MemberExpression {
            object: Box::new(object),
            property: MemberProperty::Identifier(Identifier::new(name)),
        })
    }

    /// `object[index]`
    pub fn index(object: Expression, index: Expression) -> Self {
        Expression::Member(MemberExpression {
            object: Box::new(object),
            property: MemberProperty::Expression(Box::new(index)),
        })
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null literal
    Null,
    /// BigInt literal
    BigInt(String),
    /// Regular expression literal
    RegExp { pattern: String, flags: String },
}

/// An array expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpression {
    /// The elements (None represents a hole)
    pub elements: Vec<Option<Expression>>,
}

/// An object expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpression {
    /// The properties
    pub properties: Vec<Property>,
}

/// An object property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// The property key
    pub key: PropertyKey,
    /// The property value
    pub value: Expression,
}

/// A property key.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    /// Identifier key
    Identifier(Identifier),
    /// Computed key
    Computed(Box<Expression>),
    /// Literal key (e.g., numeric or string)
    Literal(Literal),
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Exponent,
    // Comparison
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    // Logical
    LogicalAnd,
    LogicalOr,
    NullishCoalescing,
    // Bitwise
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    // Other
    In,
    InstanceOf,
}

impl BinaryOperator {
    /// Source spelling of the operator.
    pub fn as_str(self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            Modulo => "%",
            Exponent => "**",
            Equal => "==",
            NotEqual => "!=",
            StrictEqual => "===",
            StrictNotEqual => "!==",
            LessThan => "<",
            LessThanEqual => "<=",
            GreaterThan => ">",
            GreaterThanEqual => ">=",
            LogicalAnd => "&&",
            LogicalOr => "||",
            NullishCoalescing => "??",
            BitwiseAnd => "&",
            BitwiseOr => "|",
            BitwiseXor => "^",
            LeftShift => "<<",
            RightShift => ">>",
            UnsignedRightShift => ">>>",
            In => "in",
            InstanceOf => "instanceof",
        }
    }
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    LogicalNot,
    /// ~
    BitwiseNot,
    /// typeof
    Typeof,
    /// void
    Void,
    /// delete
    Delete,
}

impl UnaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::LogicalNot => "!",
            UnaryOperator::BitwiseNot => "~",
            UnaryOperator::Typeof => "typeof",
            UnaryOperator::Void => "void",
            UnaryOperator::Delete => "delete",
        }
    }
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// The operator
    pub operator: AssignmentOperator,
    /// The left-hand side
    pub left: Box<Expression>,
    /// The right-hand side
    pub right: Box<Expression>,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    ExponentAssign,
    LeftShiftAssign,
    RightShiftAssign,
    UnsignedRightShiftAssign,
    BitwiseAndAssign,
    BitwiseOrAssign,
    BitwiseXorAssign,
    LogicalAndAssign,
    LogicalOrAssign,
    NullishCoalescingAssign,
}

impl AssignmentOperator {
    /// The binary operator a compound assignment applies, or `None` for `=`.
    pub fn binary_operator(self) -> Option<BinaryOperator> {
        use AssignmentOperator::*;
        Some(match self {
            Assign => return None,
            AddAssign => BinaryOperator::Add,
            SubtractAssign => BinaryOperator::Subtract,
            MultiplyAssign => BinaryOperator::Multiply,
            DivideAssign => BinaryOperator::Divide,
            ModuloAssign => BinaryOperator::Modulo,
            ExponentAssign => BinaryOperator::Exponent,
            LeftShiftAssign => BinaryOperator::LeftShift,
            RightShiftAssign => BinaryOperator::RightShift,
            UnsignedRightShiftAssign => BinaryOperator::UnsignedRightShift,
            BitwiseAndAssign => BinaryOperator::BitwiseAnd,
            BitwiseOrAssign => BinaryOperator::BitwiseOr,
            BitwiseXorAssign => BinaryOperator::BitwiseXor,
            LogicalAndAssign => BinaryOperator::LogicalAnd,
            LogicalOrAssign => BinaryOperator::LogicalOr,
            NullishCoalescingAssign => BinaryOperator::NullishCoalescing,
        })
    }
}

/// A function call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The function being called
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<Expression>,
}

/// A member access expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    /// The object
    pub object: Box<Expression>,
    /// The property
    pub property: MemberProperty,
}

/// Member property.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    /// Identifier property (`a.b`)
    Identifier(Identifier),
    /// Computed property expression (`a[b]`)
    Expression(Box<Expression>),
}

/// A conditional (ternary) expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub test: Box<Expression>,
    pub consequent: Box<Expression>,
    pub alternate: Box<Expression>,
}

/// A function expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    /// Optional name
    pub id: Option<Identifier>,
    /// Parameters
    pub params: Vec<Identifier>,
    /// Body
    pub body: Vec<Statement>,
}

/// An arrow function expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunctionExpression {
    /// Parameters
    pub params: Vec<Identifier>,
    /// Body (expression or block)
    pub body: ArrowBody,
}

/// Arrow function body.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    /// Expression body
    Expression(Box<Expression>),
    /// Block body
    Block(Vec<Statement>),
}

/// An update expression (++/--)
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    /// The operator
    pub operator: UpdateOperator,
    /// The operand
    pub argument: Box<Expression>,
    /// Whether prefix (++x) or postfix (x++)
    pub prefix: bool,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// ++
    Increment,
    /// --
    Decrement,
}
