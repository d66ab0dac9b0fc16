// Structural type model consumed by codegen and the oracle.
// Trees are built once per root (see `lower`) and only ever read afterwards.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::error::{GenError, GenResult};

#[derive(Debug, Clone, PartialEq)]
pub struct TypeNode {
    pub kind: NodeKind,
    pub is_optional: bool,
    pub alias_name: Option<String>, // set on named roots (and nodes carrying their own alias)
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Literal(LiteralValue),
    Primitive(PrimitiveKind),
    Object {
        attributes: IndexMap<String, TypeNode>, // declared order is emission order
        optional_attribute_names: IndexSet<String>,
    },
    Union(Vec<TypeNode>),                       // >= 2 members, never a direct union member
    Array(Box<TypeNode>),
    Alias(String),                              // call-not-inline reference to another root
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum LiteralValue {
    Null,
    Undefined,
    String(String),
    Number(OrderedFloat<f64>),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
}

impl PrimitiveKind {
    /// The `typeof` tag this kind is checked against.
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Boolean => "boolean",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(PrimitiveKind::String),
            "number" => Some(PrimitiveKind::Number),
            "boolean" => Some(PrimitiveKind::Boolean),
            _ => None,
        }
    }
}

impl TypeNode {
    fn bare(kind: NodeKind) -> Self {
        Self { kind, is_optional: false, alias_name: None }
    }

    pub fn literal(value: LiteralValue) -> Self { Self::bare(NodeKind::Literal(value)) }
    pub fn primitive(kind: PrimitiveKind) -> Self { Self::bare(NodeKind::Primitive(kind)) }
    pub fn array(element: TypeNode) -> Self { Self::bare(NodeKind::Array(Box::new(element))) }
    pub fn union(members: Vec<TypeNode>) -> Self { Self::bare(NodeKind::Union(members)) }
    pub fn alias(name: impl Into<String>) -> Self { Self::bare(NodeKind::Alias(name.into())) }

    /// Object with every attribute required.
    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, TypeNode)>,
        K: Into<String>,
    {
        Self::bare(NodeKind::Object {
            attributes: attributes.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            optional_attribute_names: IndexSet::new(),
        })
    }

    /// Mark the listed attributes of an object node optional. No-op on other kinds.
    pub fn with_optional_attributes<I, K>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        if let NodeKind::Object { optional_attribute_names, .. } = &mut self.kind {
            optional_attribute_names.extend(names.into_iter().map(Into::into));
        }
        self
    }

    pub fn named(mut self, alias: impl Into<String>) -> Self {
        self.alias_name = Some(alias.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn is_object(&self) -> bool { matches!(self.kind, NodeKind::Object { .. }) }
    pub fn is_union(&self) -> bool { matches!(self.kind, NodeKind::Union(_)) }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Null => f.write_str("null"),
            LiteralValue::Undefined => f.write_str("undefined"),
            LiteralValue::String(s) => write!(f, "{s:?}"),
            LiteralValue::Number(n) => write!(f, "{}", n.0),
            LiteralValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// Short human description used in error messages.
impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Literal(v) => write!(f, "{v}"),
            NodeKind::Primitive(k) => f.write_str(k.as_str()),
            NodeKind::Alias(name) => f.write_str(name),
            NodeKind::Array(el) => write!(f, "{el}[]"),
            NodeKind::Union(members) => {
                let parts = members.iter().map(|m| m.to_string()).collect::<Vec<_>>();
                write!(f, "({})", parts.join(" | "))
            }
            NodeKind::Object { attributes, .. } => {
                if let Some(alias) = &self.alias_name {
                    return write!(f, "{alias}");
                }
                let keys = attributes.keys().map(String::as_str).collect::<Vec<_>>();
                write!(f, "{{ {} }}", keys.join(", "))
            }
        }
    }
}

/// Shape rules every union must satisfy before codegen or sampling touch it.
/// Members are checked for nesting first, then for object alternatives.
pub fn check_union_members(members: &[TypeNode], context: &str) -> GenResult<()> {
    match members.len() {
        0 => return Err(GenError::EmptyEnum { context: context.to_string() }),
        1 => return Err(GenError::DegenerateUnion { context: context.to_string(), count: 1 }),
        _ => {}
    }
    if members.iter().any(TypeNode::is_union) {
        return Err(GenError::NestedUnion { context: context.to_string() });
    }
    let objects: Vec<String> = members
        .iter()
        .filter(|m| m.is_object())
        .map(|m| m.to_string())
        .collect();
    if !objects.is_empty() {
        return Err(GenError::UnsupportedUnionMember {
            context: context.to_string(),
            members: objects,
        });
    }
    Ok(())
}
