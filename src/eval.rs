//! Reference interpreter for the generated IR.
//!
//! Implements JS semantics for exactly the constructs the engine emits, so
//! fixtures can be run against predicates without a JS runtime. Nested
//! helpers are lexically scoped: a body's function declarations are visible
//! to that body, its nested functions, and nothing else.
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;
use thiserror::Error;

use crate::codegen::ast::{Expr, Function, GeneratedFile, Stmt};
use crate::oracle::{Fixtures, Sample};

const MAX_CALL_DEPTH: usize = 1_000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("no predicate named `{0}` in the generated file")]
    UnknownPredicate(String),
    #[error("unbound identifier `{0}`")]
    Unbound(String),
    #[error("value is not callable: {0}")]
    NotCallable(String),
    #[error("`{0}` finished without returning")]
    NoReturn(String),
    #[error("call depth exceeded")]
    TooDeep,
}

/// Function declarations visible from one body.
struct FnScope<'f> {
    functions: HashMap<&'f str, &'f Function>,
    parent: Option<Rc<FnScope<'f>>>,
}

impl<'f> FnScope<'f> {
    fn hoist(body: &'f [Stmt], parent: Option<Rc<FnScope<'f>>>) -> Rc<Self> {
        let functions = body
            .iter()
            .filter_map(Stmt::as_function)
            .map(|f| (f.name.as_str(), f))
            .collect();
        Rc::new(Self { functions, parent })
    }

    /// The function and the scope it was declared in.
    fn lookup(self: &Rc<Self>, name: &str) -> Option<(&'f Function, Rc<FnScope<'f>>)> {
        let mut scope = Some(Rc::clone(self));
        while let Some(s) = scope {
            if let Some(&f) = s.functions.get(name) {
                return Some((f, s));
            }
            scope = s.parent.clone();
        }
        None
    }
}

#[derive(Clone)]
enum Val<'f> {
    Data(Sample),
    Func(&'f Function, Rc<FnScope<'f>>),
    ArrayCtor,
    IsArray,
    Every(Vec<Sample>),
}

impl Val<'_> {
    fn truthy(&self) -> bool {
        match self {
            Val::Data(s) => match s {
                Sample::Undefined | Sample::Null => false,
                Sample::Bool(b) => *b,
                Sample::Number(n) => n.0 != 0.0 && !n.0.is_nan(),
                Sample::String(s) => !s.is_empty(),
                Sample::Array(_) | Sample::Object(_) | Sample::Invalid => true,
            },
            _ => true,
        }
    }

    fn describe(&self) -> String {
        match self {
            Val::Data(s) => s.to_json().to_string(),
            Val::Func(f, _) => format!("function {}", f.name),
            Val::ArrayCtor => "Array".to_string(),
            Val::IsArray => "Array.isArray".to_string(),
            Val::Every(_) => "Array.prototype.every".to_string(),
        }
    }
}

fn type_of(v: &Val<'_>) -> &'static str {
    match v {
        Val::Data(s) => match s {
            Sample::Undefined => "undefined",
            Sample::Null | Sample::Array(_) | Sample::Object(_) => "object",
            Sample::Bool(_) => "boolean",
            Sample::Number(_) => "number",
            Sample::String(_) => "string",
            Sample::Invalid => "symbol",
        },
        _ => "function",
    }
}

fn strict_eq(a: &Val<'_>, b: &Val<'_>) -> bool {
    match (a, b) {
        (Val::Data(x), Val::Data(y)) => match (x, y) {
            (Sample::Undefined, Sample::Undefined) | (Sample::Null, Sample::Null) => true,
            (Sample::Bool(x), Sample::Bool(y)) => x == y,
            (Sample::Number(x), Sample::Number(y)) => x.0 == y.0,
            (Sample::String(x), Sample::String(y)) => x == y,
            // distinct symbol / reference identities never compare equal here
            _ => false,
        },
        (Val::Func(f, _), Val::Func(g, _)) => std::ptr::eq(*f, *g),
        _ => false,
    }
}

pub struct Evaluator<'f> {
    globals: Rc<FnScope<'f>>,
}

impl<'f> Evaluator<'f> {
    pub fn new(file: &'f GeneratedFile) -> Self {
        Self { globals: FnScope::hoist(&file.statements, None) }
    }

    /// Run the top-level predicate `name` on `arg`.
    pub fn accepts(&self, name: &str, arg: &Sample) -> Result<bool, EvalError> {
        let (function, scope) = self
            .globals
            .lookup(name)
            .ok_or_else(|| EvalError::UnknownPredicate(name.to_string()))?;
        Ok(self.invoke(function, scope, arg.clone(), 0)?.truthy())
    }

    /// Every fixture whose verdict disagrees with its list.
    pub fn unsound(&self, name: &str, fixtures: &Fixtures) -> Result<Vec<Unsound>, EvalError> {
        let mut out = Vec::new();
        let cases = fixtures
            .valid
            .iter()
            .map(|s| (s, true))
            .chain(fixtures.invalid.iter().map(|s| (s, false)));
        for (sample, expected) in cases {
            if self.accepts(name, sample)? != expected {
                out.push(Unsound { sample: sample.clone(), expected });
            }
        }
        Ok(out)
    }

    fn invoke(
        &self,
        function: &'f Function,
        scope: Rc<FnScope<'f>>,
        arg: Sample,
        depth: usize,
    ) -> Result<Val<'f>, EvalError> {
        if depth > MAX_CALL_DEPTH {
            return Err(EvalError::TooDeep);
        }
        let mut locals = HashMap::new();
        locals.insert(function.param.clone(), arg);
        let body_scope = FnScope::hoist(&function.body, Some(scope));
        self.run(&function.body, &body_scope, &mut locals, depth)?
            .ok_or_else(|| EvalError::NoReturn(function.name.clone()))
    }

    fn run(
        &self,
        body: &'f [Stmt],
        scope: &Rc<FnScope<'f>>,
        locals: &mut HashMap<String, Sample>,
        depth: usize,
    ) -> Result<Option<Val<'f>>, EvalError> {
        for stmt in body {
            match stmt {
                Stmt::Import { .. } | Stmt::TypeAlias { .. } | Stmt::Function(_) => {}
                Stmt::If { test, then } => {
                    if self.eval(test, scope, locals, depth)?.truthy() {
                        if let Some(ret) = self.run(then, scope, locals, depth)? {
                            return Ok(Some(ret));
                        }
                    }
                }
                Stmt::Return { value } => return Ok(Some(self.eval(value, scope, locals, depth)?)),
                Stmt::Destructure { bindings, init, .. } => {
                    let source = self.eval(init, scope, locals, depth)?;
                    for binding in bindings {
                        let value = match &source {
                            Val::Data(Sample::Object(m)) => {
                                m.get(&binding.attribute).cloned().unwrap_or(Sample::Undefined)
                            }
                            _ => Sample::Undefined,
                        };
                        locals.insert(binding.local.clone(), value);
                    }
                }
                Stmt::Const { name, init, .. } => {
                    if let Val::Data(value) = self.eval(init, scope, locals, depth)? {
                        locals.insert(name.clone(), value);
                    }
                }
            }
        }
        Ok(None)
    }

    fn eval(
        &self,
        expr: &'f Expr,
        scope: &Rc<FnScope<'f>>,
        locals: &HashMap<String, Sample>,
        depth: usize,
    ) -> Result<Val<'f>, EvalError> {
        let val = match expr {
            Expr::Ident(name) => {
                if let Some(v) = locals.get(name) {
                    Val::Data(v.clone())
                } else if let Some((f, s)) = scope.lookup(name) {
                    Val::Func(f, s)
                } else if name == "Array" {
                    Val::ArrayCtor
                } else if name == "undefined" {
                    Val::Data(Sample::Undefined)
                } else {
                    return Err(EvalError::Unbound(name.clone()));
                }
            }
            Expr::Literal(v) => Val::Data(Sample::from(v)),
            Expr::TypeOf(e) => {
                let v = self.eval(e, scope, locals, depth)?;
                Val::Data(Sample::string(type_of(&v)))
            }
            Expr::StrictEq(a, b) => {
                let (a, b) = (self.eval(a, scope, locals, depth)?, self.eval(b, scope, locals, depth)?);
                Val::Data(Sample::Bool(strict_eq(&a, &b)))
            }
            Expr::StrictNe(a, b) => {
                let (a, b) = (self.eval(a, scope, locals, depth)?, self.eval(b, scope, locals, depth)?);
                Val::Data(Sample::Bool(!strict_eq(&a, &b)))
            }
            Expr::Not(e) => Val::Data(Sample::Bool(!self.eval(e, scope, locals, depth)?.truthy())),
            Expr::And(a, b) => {
                let a = self.eval(a, scope, locals, depth)?;
                if !a.truthy() { a } else { self.eval(b, scope, locals, depth)? }
            }
            Expr::Or(a, b) => {
                let a = self.eval(a, scope, locals, depth)?;
                if a.truthy() { a } else { self.eval(b, scope, locals, depth)? }
            }
            Expr::Member(object, prop) => match (self.eval(object, scope, locals, depth)?, prop.as_str()) {
                (Val::ArrayCtor, "isArray") => Val::IsArray,
                (Val::Data(Sample::Array(xs)), "every") => Val::Every(xs),
                (Val::Data(Sample::Object(m)), key) => {
                    Val::Data(m.get(key).cloned().unwrap_or(Sample::Undefined))
                }
                _ => Val::Data(Sample::Undefined),
            },
            Expr::Call(callee, args) => {
                let callee = self.eval(callee, scope, locals, depth)?;
                let args = args
                    .iter()
                    .map(|a| self.eval(a, scope, locals, depth))
                    .collect::<Result<Vec<_>, _>>()?;
                self.apply(callee, args, depth)?
            }
            Expr::Object(entries) => {
                let mut out = indexmap::IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    if let Val::Data(v) = self.eval(value, scope, locals, depth)? {
                        out.insert(key.clone(), v);
                    }
                }
                Val::Data(Sample::Object(out))
            }
        };
        Ok(val)
    }

    fn apply(&self, callee: Val<'f>, args: Vec<Val<'f>>, depth: usize) -> Result<Val<'f>, EvalError> {
        let first = args.into_iter().next();
        let arg = match &first {
            Some(Val::Data(s)) => s.clone(),
            _ => Sample::Undefined,
        };
        match callee {
            Val::IsArray => Ok(Val::Data(Sample::Bool(matches!(arg, Sample::Array(_))))),
            Val::Every(xs) => {
                let (f, s) = match first {
                    Some(Val::Func(f, s)) => (f, s),
                    other => {
                        return Err(EvalError::NotCallable(
                            other.map(|v| v.describe()).unwrap_or_else(|| "undefined".into()),
                        ));
                    }
                };
                for x in xs {
                    if !self.invoke(f, Rc::clone(&s), x, depth + 1)?.truthy() {
                        return Ok(Val::Data(Sample::Bool(false)));
                    }
                }
                Ok(Val::Data(Sample::Bool(true)))
            }
            Val::Func(f, s) => self.invoke(f, s, arg, depth + 1),
            other => Err(EvalError::NotCallable(other.describe())),
        }
    }
}

/// A fixture the predicate got wrong.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unsound {
    pub sample: Sample,
    pub expected: bool,
}
