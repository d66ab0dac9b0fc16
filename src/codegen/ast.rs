//! Target-neutral statement / expression / type IR produced by the engine.
//!
//! The shapes mirror what a TypeScript printer needs (type predicates,
//! destructuring, mapped types) but nothing here renders text; a separate
//! serializer owns that. Everything is `Serialize` so the driver can dump it.
use serde::Serialize;

use crate::ir::{LiteralValue, PrimitiveKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "camelCase")]
pub enum Expr {
    Ident(String),
    Literal(LiteralValue),
    TypeOf(Box<Expr>),
    StrictEq(Box<Expr>, Box<Expr>),
    StrictNe(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Member(Box<Expr>, String),
    Call(Box<Expr>, Vec<Expr>),
    /// `{ key: value, ... }`
    Object(Vec<(String, Expr)>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "camelCase")]
pub enum TypeExpr {
    Unknown,
    Keyword(PrimitiveKind),
    Literal(LiteralValue),
    Ref(String),
    Array(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Object(Vec<PropertySig>),
    /// `T["key"]`
    Index(Box<TypeExpr>, String),
    /// `Name<Args...>`
    Generic(String, Vec<TypeExpr>),
    /// `{ [K in keyof T]?: unknown }`
    MappedOptional { key: String, source: Box<TypeExpr> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySig {
    pub name: String,
    pub optional: bool,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub attribute: String,
    pub local: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Returns {
    Boolean,
    /// `param is T`
    Narrows { param: String, ty: TypeExpr },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub name: String,
    pub exported: bool,
    pub param: String,
    pub param_ty: TypeExpr,
    pub returns: Returns,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Stmt {
    Import { names: Vec<String>, from: String },
    TypeAlias { name: String, params: Vec<String>, ty: TypeExpr },
    Function(Function),
    If { test: Expr, then: Vec<Stmt> },
    Return { value: Expr },
    /// `const { a: a_local, ... }: ty = init;`
    Destructure { bindings: Vec<Binding>, ty: Option<TypeExpr>, init: Expr },
    Const { name: String, ty: Option<TypeExpr>, init: Expr },
}

/// Ordered statement list handed to the serializer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedFile {
    pub statements: Vec<Stmt>,
}

// ---- constructors ----

pub fn ident(name: impl Into<String>) -> Expr { Expr::Ident(name.into()) }
pub fn string_lit(s: impl Into<String>) -> Expr { Expr::Literal(LiteralValue::String(s.into())) }
pub fn bool_lit(b: bool) -> Expr { Expr::Literal(LiteralValue::Boolean(b)) }
pub fn type_of(e: Expr) -> Expr { Expr::TypeOf(Box::new(e)) }
pub fn strict_eq(a: Expr, b: Expr) -> Expr { Expr::StrictEq(Box::new(a), Box::new(b)) }
pub fn strict_ne(a: Expr, b: Expr) -> Expr { Expr::StrictNe(Box::new(a), Box::new(b)) }
pub fn not(e: Expr) -> Expr { Expr::Not(Box::new(e)) }
pub fn and(a: Expr, b: Expr) -> Expr { Expr::And(Box::new(a), Box::new(b)) }
pub fn or(a: Expr, b: Expr) -> Expr { Expr::Or(Box::new(a), Box::new(b)) }
pub fn member(e: Expr, prop: impl Into<String>) -> Expr { Expr::Member(Box::new(e), prop.into()) }
pub fn call(callee: Expr, args: Vec<Expr>) -> Expr { Expr::Call(Box::new(callee), args) }

/// `if (!(cond)) return false;`
pub fn guard(cond: Expr) -> Stmt {
    Stmt::If {
        test: not(cond),
        then: vec![Stmt::Return { value: bool_lit(false) }],
    }
}

impl Stmt {
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Stmt::Function(f) => Some(f),
            _ => None,
        }
    }
}

impl GeneratedFile {
    /// Top-level predicate (or helper) by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.statements.iter().filter_map(Stmt::as_function).find(|f| f.name == name)
    }
}
