//! Predicate codegen: `TypeNode` -> validating function IR.
//!
//! One [`Codegen`] accumulates the predicates of one output file. Each root
//! gets a fresh [`Namer`]; nothing from a failed root reaches the accumulator.
pub mod ast;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::error::{GenError, GenResult};
use crate::ir::{check_union_members, LiteralValue, NodeKind, TypeNode};
use crate::namer::Namer;
use ast::*;

pub const ARRAY_HELPER: &str = "isArray";
pub const SHALLOW_HELPER: &str = "ShallowOptional";
const ROOT_PARAM: &str = "root";

#[derive(Debug, Clone)]
pub struct GenConfig {
    /// Recursion ceiling across nested type structure.
    pub max_depth: usize,
    /// Emit the trailing `const checked: T = {...}` per object.
    pub emit_self_checks: bool,
    /// Module the imported alias types come from.
    pub import_from: String,
    pub predicate_prefix: String,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            max_depth: 100,
            emit_self_checks: true,
            import_from: "./types".to_string(),
            predicate_prefix: "is".to_string(),
        }
    }
}

impl GenConfig {
    pub fn predicate_name(&self, alias: &str) -> String {
        format!("{}{alias}", self.predicate_prefix)
    }
}

/// An alias call site, kept so unresolved references can be reported.
#[derive(Debug, Clone, PartialEq)]
struct AliasRef {
    name: String,
    context: String,
}

#[derive(Debug, Default)]
struct Assertions {
    hoisted: Vec<Stmt>,
    body: Vec<Stmt>,
}

pub struct Codegen {
    config: GenConfig,
    declared: IndexSet<String>,
    predicates: IndexMap<String, Function>,
    references: IndexMap<String, Vec<AliasRef>>,
}

impl Codegen {
    pub fn new() -> Self { Self::with_config(GenConfig::default()) }

    pub fn with_config(config: GenConfig) -> Self {
        Self {
            config,
            declared: IndexSet::new(),
            predicates: IndexMap::new(),
            references: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &GenConfig { &self.config }

    /// Announce roots that will be registered later so forward alias
    /// references resolve.
    pub fn declare_roots<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared.extend(names.into_iter().map(Into::into));
    }

    pub fn predicates(&self) -> impl Iterator<Item = (&String, &Function)> {
        self.predicates.iter()
    }

    pub fn add_root_type_guard_for(&mut self, node: &TypeNode) -> GenResult<()> {
        let alias = match node.alias_name.as_deref() {
            Some(alias) if !alias.is_empty() => alias.to_string(),
            _ => return Err(GenError::MissingRootAlias { context: node.to_string() }),
        };

        let mut pass = Pass {
            config: &self.config,
            namer: Namer::new(),
            root: alias.clone(),
            references: Vec::new(),
        };
        pass.reserve_globals(self.declared.iter().chain(self.predicates.keys()));

        let path = vec![alias.clone()];
        let function = pass.predicate(
            self.config.predicate_name(&alias),
            TypeExpr::Ref(alias.clone()),
            ROOT_PARAM.to_string(),
            node,
            &path,
            true,
            0,
        )?;
        let references = pass.references;

        for reference in &references {
            let known = reference.name == alias
                || self.declared.contains(&reference.name)
                || self.predicates.contains_key(&reference.name);
            if !known {
                return Err(self.unknown_alias(reference, Some(&alias)));
            }
        }

        debug!(root = %alias, predicate = %function.name, "registered type guard");
        // last write wins; the first registration slot is kept
        self.predicates.insert(alias.clone(), function);
        self.references.insert(alias, references);
        Ok(())
    }

    fn unknown_alias(&self, reference: &AliasRef, pending: Option<&str>) -> GenError {
        let mut known: Vec<String> = self.predicates.keys().cloned().collect();
        if let Some(pending) = pending {
            if !known.iter().any(|k| k == pending) {
                known.push(pending.to_string());
            }
        }
        GenError::UnknownAlias {
            name: reference.name.clone(),
            context: reference.context.clone(),
            known,
        }
    }

    /// Shared helpers, imports, then every predicate in registration order.
    pub fn into_file(self) -> GenResult<GeneratedFile> {
        for reference in self.references.values().flatten() {
            if !self.predicates.contains_key(&reference.name) {
                return Err(self.unknown_alias(reference, None));
            }
        }

        let mut imports: IndexSet<String> = IndexSet::new();
        for (alias, refs) in &self.references {
            imports.insert(alias.clone());
            imports.extend(refs.iter().map(|r| r.name.clone()));
        }

        let mut statements = vec![array_helper(), shallow_optional_helper()];
        if !imports.is_empty() {
            statements.push(Stmt::Import {
                names: imports.into_iter().collect(),
                from: self.config.import_from.clone(),
            });
        }
        statements.extend(self.predicates.into_values().map(Stmt::Function));
        Ok(GeneratedFile { statements })
    }
}

impl Default for Codegen {
    fn default() -> Self { Self::new() }
}

/// `function isArray(value: unknown): value is unknown[] { return Array.isArray(value); }`
fn array_helper() -> Stmt {
    Stmt::Function(Function {
        name: ARRAY_HELPER.to_string(),
        exported: false,
        param: "value".to_string(),
        param_ty: TypeExpr::Unknown,
        returns: Returns::Narrows {
            param: "value".to_string(),
            ty: TypeExpr::Array(Box::new(TypeExpr::Unknown)),
        },
        body: vec![Stmt::Return {
            value: call(member(ident("Array"), "isArray"), vec![ident("value")]),
        }],
    })
}

/// `type ShallowOptional<T> = { [K in keyof T]?: unknown };`
fn shallow_optional_helper() -> Stmt {
    Stmt::TypeAlias {
        name: SHALLOW_HELPER.to_string(),
        params: vec!["T".to_string()],
        ty: TypeExpr::MappedOptional {
            key: "K".to_string(),
            source: Box::new(TypeExpr::Ref("T".to_string())),
        },
    }
}

/// Declared type of a node, as the serializer should spell it.
pub fn type_expr_of(node: &TypeNode) -> TypeExpr {
    match &node.kind {
        NodeKind::Literal(v) => TypeExpr::Literal(v.clone()),
        NodeKind::Primitive(k) => TypeExpr::Keyword(*k),
        NodeKind::Alias(name) => TypeExpr::Ref(name.clone()),
        NodeKind::Array(el) => TypeExpr::Array(Box::new(type_expr_of(el))),
        NodeKind::Union(members) => TypeExpr::Union(members.iter().map(type_expr_of).collect()),
        NodeKind::Object { attributes, optional_attribute_names } => TypeExpr::Object(
            attributes
                .iter()
                .map(|(name, ty)| PropertySig {
                    name: name.clone(),
                    optional: ty.is_optional || optional_attribute_names.contains(name),
                    ty: type_expr_of(ty),
                })
                .collect(),
        ),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ONE ROOT PASS
// ————————————————————————————————————————————————————————————————————————————

struct Pass<'a> {
    config: &'a GenConfig,
    namer: Namer,
    root: String,
    references: Vec<AliasRef>,
}

impl Pass<'_> {
    fn reserve_globals<'n>(&mut self, names: impl Iterator<Item = &'n String>) {
        self.namer.reserve_local(ARRAY_HELPER);
        self.namer.reserve_type(SHALLOW_HELPER);
        self.namer.reserve_type(&self.root);
        self.namer.reserve_local(&self.config.predicate_name(&self.root));
        for name in names {
            self.namer.reserve_type(name);
            self.namer.reserve_local(&self.config.predicate_name(name));
        }
    }

    fn context(&self, path: &[String]) -> String {
        path.join(".")
    }

    /// A full predicate over `node`: `[...hoisted, ...body, return true]`.
    #[allow(clippy::too_many_arguments)]
    fn predicate(
        &mut self,
        name: String,
        narrows: TypeExpr,
        param: String,
        node: &TypeNode,
        path: &[String],
        exported: bool,
        depth: usize,
    ) -> GenResult<Function> {
        self.namer.reserve_local(&param);
        let Assertions { hoisted, body } = self.assertions_for(path, &param, &narrows, node, depth)?;

        let mut statements = hoisted;
        statements.extend(body);
        statements.push(Stmt::Return { value: bool_lit(true) });

        Ok(Function {
            name,
            exported,
            param: param.clone(),
            param_ty: TypeExpr::Unknown,
            returns: Returns::Narrows { param, ty: narrows },
            body: statements,
        })
    }

    fn enter(&self, path: &[String], depth: usize) -> GenResult<()> {
        if depth > self.config.max_depth {
            return Err(GenError::DepthExceeded {
                limit: self.config.max_depth,
                context: self.context(path),
            });
        }
        Ok(())
    }

    fn assertions_for(
        &mut self,
        path: &[String],
        target: &str,
        type_path: &TypeExpr,
        node: &TypeNode,
        depth: usize,
    ) -> GenResult<Assertions> {
        self.enter(path, depth)?;
        match &node.kind {
            NodeKind::Object { attributes, .. } => {
                self.object_assertions(path, target, type_path, attributes, depth)
            }
            _ => {
                let (hoisted, cond) = self.condition_for(path, target, node, depth)?;
                Ok(Assertions { hoisted, body: vec![guard(cond)] })
            }
        }
    }

    /// Boolean condition for every non-object node, plus what it hoists.
    fn condition_for(
        &mut self,
        path: &[String],
        target: &str,
        node: &TypeNode,
        depth: usize,
    ) -> GenResult<(Vec<Stmt>, Expr)> {
        self.enter(path, depth)?;
        match &node.kind {
            NodeKind::Alias(name) => {
                self.references.push(AliasRef {
                    name: name.clone(),
                    context: self.context(path),
                });
                let callee = ident(self.config.predicate_name(name));
                Ok((Vec::new(), call(callee, vec![ident(target)])))
            }
            NodeKind::Primitive(kind) => Ok((
                Vec::new(),
                strict_eq(type_of(ident(target)), string_lit(kind.as_str())),
            )),
            NodeKind::Literal(LiteralValue::Undefined) => Ok((
                Vec::new(),
                strict_eq(type_of(ident(target)), string_lit("undefined")),
            )),
            NodeKind::Literal(value) => Ok((
                Vec::new(),
                strict_eq(ident(target), Expr::Literal(value.clone())),
            )),
            NodeKind::Array(element) => self.array_condition(path, target, element, depth),
            NodeKind::Union(members) => self.union_condition(path, target, members, depth),
            NodeKind::Object { .. } => Err(GenError::UnsupportedUnionMember {
                context: self.context(path),
                members: vec![node.to_string()],
            }),
        }
    }

    fn array_condition(
        &mut self,
        path: &[String],
        target: &str,
        element: &TypeNode,
        depth: usize,
    ) -> GenResult<(Vec<Stmt>, Expr)> {
        let last = path.last().map(String::as_str).unwrap_or(self.root.as_str()).to_string();
        let element_ty = self.namer.new_type_name(path, &format!("{last}_element"))?;
        let element_fn = self.namer.new_function_name(path, &format!("is_{last}_element"))?;
        let param = self.namer.new_local_name(path, ROOT_PARAM)?;
        debug!(root = %self.root, helper = %element_fn, "hoisting element predicate");

        let mut element_path = path.to_vec();
        element_path.push("element".to_string());
        let nested = self.predicate(
            element_fn.clone(),
            TypeExpr::Ref(element_ty.clone()),
            param,
            element,
            &element_path,
            false,
            depth + 1,
        )?;

        let hoisted = vec![
            Stmt::TypeAlias { name: element_ty, params: Vec::new(), ty: type_expr_of(element) },
            Stmt::Function(nested),
        ];
        let cond = and(
            call(ident(ARRAY_HELPER), vec![ident(target)]),
            call(member(ident(target), "every"), vec![ident(element_fn)]),
        );
        Ok((hoisted, cond))
    }

    fn union_condition(
        &mut self,
        path: &[String],
        target: &str,
        members: &[TypeNode],
        depth: usize,
    ) -> GenResult<(Vec<Stmt>, Expr)> {
        check_union_members(members, &self.context(path))?;

        let mut hoisted = Vec::new();
        let mut cond: Option<Expr> = None;
        for (i, member) in members.iter().enumerate() {
            // array alternatives hoist helpers; keep their attribute paths apart
            let member_path = match member.kind {
                NodeKind::Array(_) => {
                    let mut p = path.to_vec();
                    p.push(format!("alt{i}"));
                    p
                }
                _ => path.to_vec(),
            };
            let (h, c) = self.condition_for(&member_path, target, member, depth + 1)?;
            hoisted.extend(h);
            cond = Some(match cond {
                None => c,
                Some(acc) => or(acc, c),
            });
        }
        // members.len() >= 2 here
        Ok((hoisted, cond.unwrap_or_else(|| bool_lit(false))))
    }

    fn object_assertions(
        &mut self,
        path: &[String],
        target: &str,
        type_path: &TypeExpr,
        attributes: &IndexMap<String, TypeNode>,
        depth: usize,
    ) -> GenResult<Assertions> {
        let mut out = Assertions::default();
        out.body.push(guard(and(
            strict_eq(type_of(ident(target)), string_lit("object")),
            strict_ne(ident(target), Expr::Literal(LiteralValue::Null)),
        )));

        let mut bindings = Vec::with_capacity(attributes.len());
        for name in attributes.keys() {
            let local = self.namer.create_attribute(path, name)?;
            bindings.push(Binding { attribute: local.attribute_name, local: local.local_name });
        }
        if !bindings.is_empty() {
            out.body.push(Stmt::Destructure {
                bindings: bindings.clone(),
                ty: Some(TypeExpr::Generic(SHALLOW_HELPER.to_string(), vec![type_path.clone()])),
                init: ident(target),
            });
        }

        for ((name, attr), binding) in attributes.iter().zip(&bindings) {
            let mut attr_path = path.to_vec();
            attr_path.push(name.clone());
            let attr_type = TypeExpr::Index(Box::new(type_path.clone()), name.clone());
            let Assertions { hoisted, body } =
                self.assertions_for(&attr_path, &binding.local, &attr_type, attr, depth + 1)?;
            out.hoisted.extend(hoisted);
            out.body.extend(body);
        }

        if self.config.emit_self_checks {
            let checked = self.namer.new_local_name(path, "checked")?;
            out.body.push(Stmt::Const {
                name: checked,
                ty: Some(type_path.clone()),
                init: Expr::Object(
                    bindings.iter().map(|b| (b.attribute.clone(), ident(b.local.clone()))).collect(),
                ),
            });
        }
        Ok(out)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PrimitiveKind;
    use std::collections::HashSet;

    fn number() -> TypeNode { TypeNode::primitive(PrimitiveKind::Number) }
    fn string() -> TypeNode { TypeNode::primitive(PrimitiveKind::String) }

    fn single(node: TypeNode) -> GeneratedFile {
        let mut cg = Codegen::new();
        cg.add_root_type_guard_for(&node).unwrap();
        cg.into_file().unwrap()
    }

    #[test]
    fn primitive_root_emits_typeof_guard() {
        let file = single(number().named("X"));
        let f = file.function("isX").unwrap();
        assert!(f.exported);
        assert_eq!(f.param, "root");
        assert_eq!(f.returns, Returns::Narrows { param: "root".into(), ty: TypeExpr::Ref("X".into()) });
        assert_eq!(f.body, vec![
            guard(strict_eq(type_of(ident("root")), string_lit("number"))),
            Stmt::Return { value: bool_lit(true) },
        ]);
    }

    #[test]
    fn literals_compare_by_value_and_undefined_by_tag() {
        let node = TypeNode::union(vec![
            TypeNode::literal(LiteralValue::Undefined),
            TypeNode::literal(LiteralValue::Null),
            TypeNode::literal(LiteralValue::String("a".into())),
        ])
        .named("L");
        let file = single(node);
        let expected = or(
            or(
                strict_eq(type_of(ident("root")), string_lit("undefined")),
                strict_eq(ident("root"), Expr::Literal(LiteralValue::Null)),
            ),
            strict_eq(ident("root"), string_lit("a")),
        );
        assert_eq!(file.function("isL").unwrap().body[0], guard(expected));
    }

    #[test]
    fn alias_is_called_not_inlined() {
        let mut cg = Codegen::new();
        cg.add_root_type_guard_for(&string().named("Id")).unwrap();
        cg.add_root_type_guard_for(&TypeNode::alias("Id").named("Ref")).unwrap();
        let file = cg.into_file().unwrap();
        assert_eq!(
            file.function("isRef").unwrap().body[0],
            guard(call(ident("isId"), vec![ident("root")]))
        );
    }

    #[test]
    fn file_layout_helpers_imports_then_predicates() {
        let mut cg = Codegen::new();
        cg.declare_roots(["B"]);
        cg.add_root_type_guard_for(&TypeNode::alias("B").named("A")).unwrap();
        cg.add_root_type_guard_for(&number().named("B")).unwrap();
        let file = cg.into_file().unwrap();
        assert!(matches!(&file.statements[0], Stmt::Function(f) if f.name == ARRAY_HELPER));
        assert!(matches!(&file.statements[1], Stmt::TypeAlias { name, .. } if name == SHALLOW_HELPER));
        assert_eq!(file.statements[2], Stmt::Import {
            names: vec!["A".into(), "B".into()],
            from: "./types".into(),
        });
        let names: Vec<_> = file.statements[3..].iter().filter_map(Stmt::as_function).map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["isA", "isB"]);
    }

    #[test]
    fn reregistering_overwrites() {
        let mut cg = Codegen::new();
        cg.add_root_type_guard_for(&number().named("X")).unwrap();
        cg.add_root_type_guard_for(&string().named("X")).unwrap();
        let file = cg.into_file().unwrap();
        let f = file.function("isX").unwrap();
        assert_eq!(f.body[0], guard(strict_eq(type_of(ident("root")), string_lit("string"))));
        assert_eq!(file.statements.iter().filter_map(Stmt::as_function).count(), 2);
    }

    #[test]
    fn object_destructures_recurses_and_self_checks() {
        let node = TypeNode::object([("id", number()), ("login", string())]).named("User");
        let file = single(node);
        let body = &file.function("isUser").unwrap().body;
        assert_eq!(body.len(), 6);
        assert_eq!(body[0], guard(and(
            strict_eq(type_of(ident("root")), string_lit("object")),
            strict_ne(ident("root"), Expr::Literal(LiteralValue::Null)),
        )));
        let Stmt::Destructure { bindings, ty, .. } = &body[1] else { panic!("expected destructure") };
        assert_eq!(bindings.iter().map(|b| b.local.as_str()).collect::<Vec<_>>(), ["id", "login"]);
        assert_eq!(ty, &Some(TypeExpr::Generic(SHALLOW_HELPER.into(), vec![TypeExpr::Ref("User".into())])));
        assert_eq!(body[2], guard(strict_eq(type_of(ident("id")), string_lit("number"))));
        assert_eq!(body[3], guard(strict_eq(type_of(ident("login")), string_lit("string"))));
        assert!(matches!(&body[4], Stmt::Const { name, .. } if name == "checked"));
        assert_eq!(body[5], Stmt::Return { value: bool_lit(true) });
    }

    #[test]
    fn self_check_can_be_disabled() {
        let mut cg = Codegen::with_config(GenConfig { emit_self_checks: false, ..GenConfig::default() });
        cg.add_root_type_guard_for(&TypeNode::object([("id", number())]).named("U")).unwrap();
        let file = cg.into_file().unwrap();
        assert!(!file.function("isU").unwrap().body.iter().any(|s| matches!(s, Stmt::Const { .. })));
    }

    #[test]
    fn array_hoists_element_alias_and_nested_predicate_once() {
        let node = TypeNode::array(TypeNode::union(vec![number(), string()])).named("X");
        let file = single(node);
        let body = &file.function("isX").unwrap().body;
        assert!(matches!(&body[0], Stmt::TypeAlias { name, .. } if name == "X_element"));
        let Stmt::Function(nested) = &body[1] else { panic!("expected nested predicate") };
        assert_eq!(nested.name, "is_X_element");
        assert!(!nested.exported);
        assert_eq!(body[2], guard(and(
            call(ident(ARRAY_HELPER), vec![ident("root")]),
            call(member(ident("root"), "every"), vec![ident("is_X_element")]),
        )));
    }

    #[test]
    fn object_in_union_is_rejected_by_name() {
        let user = TypeNode::object([("id", number())]);
        let node = TypeNode::union(vec![number(), user]).named("Bad");
        let mut cg = Codegen::new();
        let err = cg.add_root_type_guard_for(&node).unwrap_err();
        assert_eq!(err, GenError::UnsupportedUnionMember {
            context: "Bad".into(),
            members: vec!["{ id }".into()],
        });
        // nothing registered for the failed root
        assert_eq!(cg.predicates().count(), 0);
    }

    #[test]
    fn nested_union_is_internal() {
        let node = TypeNode::union(vec![number(), TypeNode::union(vec![string(), number()])]).named("N");
        let err = Codegen::new().add_root_type_guard_for(&node).unwrap_err();
        assert!(matches!(err, GenError::NestedUnion { .. }));
        assert_eq!(err.class(), crate::error::ErrorClass::Internal);
    }

    #[test]
    fn empty_union_is_unsupported_enum() {
        let err = Codegen::new().add_root_type_guard_for(&TypeNode::union(vec![]).named("E")).unwrap_err();
        assert!(matches!(err, GenError::EmptyEnum { .. }));
    }

    #[test]
    fn array_alternatives_of_objects_get_separate_scopes() {
        let a = TypeNode::array(TypeNode::alias("P"));
        let obj = TypeNode::object([("id", number())]);
        let node = TypeNode::object([
            ("x", TypeNode::union(vec![TypeNode::array(obj.clone()), TypeNode::array(obj)])),
            ("y", a),
        ])
        .named("Q");
        let mut cg = Codegen::new();
        cg.add_root_type_guard_for(&number().named("P")).unwrap();
        cg.add_root_type_guard_for(&node).unwrap();
        assert!(cg.into_file().is_ok());
    }

    #[test]
    fn missing_root_alias_fails() {
        let err = Codegen::new().add_root_type_guard_for(&number()).unwrap_err();
        assert!(matches!(err, GenError::MissingRootAlias { .. }));
    }

    #[test]
    fn unknown_alias_reports_context_and_known_names() {
        let mut cg = Codegen::new();
        cg.add_root_type_guard_for(&number().named("A")).unwrap();
        let node = TypeNode::object([("friend", TypeNode::alias("Ghost"))]).named("B");
        let err = cg.add_root_type_guard_for(&node).unwrap_err();
        assert_eq!(err, GenError::UnknownAlias {
            name: "Ghost".into(),
            context: "B.friend".into(),
            known: vec!["A".into(), "B".into()],
        });
    }

    #[test]
    fn declared_but_never_registered_fails_at_assembly() {
        let mut cg = Codegen::new();
        cg.declare_roots(["Later"]);
        cg.add_root_type_guard_for(&TypeNode::alias("Later").named("Now")).unwrap();
        assert!(matches!(cg.into_file(), Err(GenError::UnknownAlias { .. })));
    }

    #[test]
    fn depth_ceiling_is_enforced() {
        let mut node = number();
        for _ in 0..120 {
            node = TypeNode::array(node);
        }
        let err = Codegen::new().add_root_type_guard_for(&node.named("Deep")).unwrap_err();
        assert!(matches!(err, GenError::DepthExceeded { limit: 100, .. }));
    }

    #[test]
    fn generation_is_deterministic() {
        let node = TypeNode::object([
            ("tags", TypeNode::array(string())),
            ("nested", TypeNode::object([("tags", TypeNode::array(number()))])),
        ])
        .named("Doc");
        assert_eq!(single(node.clone()), single(node));
    }

    fn declared_names(body: &[Stmt], out: &mut Vec<String>) {
        for stmt in body {
            match stmt {
                Stmt::Function(f) => {
                    out.push(f.name.clone());
                    out.push(f.param.clone());
                    declared_names(&f.body, out);
                }
                Stmt::Destructure { bindings, .. } => out.extend(bindings.iter().map(|b| b.local.clone())),
                Stmt::Const { name, .. } => out.push(name.clone()),
                Stmt::TypeAlias { name, .. } => out.push(name.clone()),
                _ => {}
            }
        }
    }

    #[test]
    fn identifiers_within_one_predicate_are_unique() {
        let inner = TypeNode::object([("id", number()), ("tags", TypeNode::array(string()))]);
        let node = TypeNode::object([
            ("id", number()),
            ("tags", TypeNode::array(string())),
            ("items", TypeNode::array(inner.clone())),
            ("more", TypeNode::array(inner)),
        ])
        .named("Doc");
        let file = single(node);
        let f = file.function("isDoc").unwrap();
        let mut names = vec![f.param.clone()];
        declared_names(&f.body, &mut names);
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len(), "duplicate identifiers in {names:?}");
    }
}
