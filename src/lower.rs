//! Input boundary: JSON batch document -> validated `ir::TypeNode` trees.
//!
//! ```json
//! { "importFrom": "./model",
//!   "roots": [ { "kind": "object", "alias": "User",
//!                "attributes": { "id": { "kind": "primitive", "type": "number" } },
//!                "optionalAttributes": [] } ] }
//! ```
use anyhow::anyhow;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GenError, GenResult};
use crate::ir::{LiteralValue, PrimitiveKind, TypeNode};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBatch {
    #[serde(default)]
    pub import_from: Option<String>,
    pub roots: Vec<RawTypeNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTypeNode {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(flatten)]
    pub shape: RawShape,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RawShape {
    Literal { value: Value },
    Undefined,
    Primitive {
        #[serde(rename = "type")]
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    Object {
        #[serde(default)]
        attributes: IndexMap<String, RawTypeNode>,
        #[serde(default)]
        optional_attributes: Vec<String>,
    },
    Union { members: Vec<RawTypeNode> },
    Array { element: Box<RawTypeNode> },
    Alias { name: String },
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> anyhow::Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        anyhow!("at JSON path {path} → {}", err.into_inner())
    })
}

pub fn parse_batch(src: &str) -> anyhow::Result<RawBatch> {
    from_str_with_path(src)
}

/// Display name of a raw root, used before lowering has succeeded.
pub fn root_label(raw: &RawTypeNode, index: usize) -> String {
    raw.alias.clone().unwrap_or_else(|| format!("<root #{index}>"))
}

pub fn lower_root(raw: &RawTypeNode) -> GenResult<TypeNode> {
    let mut path = vec![raw.alias.clone().unwrap_or_else(|| "root".to_string())];
    lower_node(raw, &mut path)
}

fn lower_node(raw: &RawTypeNode, path: &mut Vec<String>) -> GenResult<TypeNode> {
    let mut node = match &raw.shape {
        RawShape::Undefined => TypeNode::literal(LiteralValue::Undefined),
        RawShape::Literal { value } => TypeNode::literal(lower_literal(value, path)?),
        RawShape::Primitive { name } => match PrimitiveKind::parse(name) {
            Some(kind) => TypeNode::primitive(kind),
            None => {
                return Err(GenError::UnsupportedPrimitive {
                    kind: name.clone(),
                    context: path.join("."),
                });
            }
        },
        RawShape::Object { attributes, optional_attributes } => {
            let mut lowered = Vec::with_capacity(attributes.len());
            for (name, attr) in attributes {
                path.push(name.clone());
                let result = lower_node(attr, path);
                path.pop();
                lowered.push((name.clone(), result?));
            }
            TypeNode::object(lowered).with_optional_attributes(optional_attributes.iter().cloned())
        }
        RawShape::Union { members } => TypeNode::union(
            members
                .iter()
                .map(|m| lower_node(m, path))
                .collect::<GenResult<Vec<_>>>()?,
        ),
        RawShape::Array { element } => {
            path.push("element".to_string());
            let result = lower_node(element, path);
            path.pop();
            TypeNode::array(result?)
        }
        RawShape::Alias { name } => TypeNode::alias(name.clone()),
    };
    node.is_optional = raw.optional;
    node.alias_name = raw.alias.clone();
    Ok(node)
}

fn lower_literal(value: &Value, path: &[String]) -> GenResult<LiteralValue> {
    match value {
        Value::Null => Ok(LiteralValue::Null),
        Value::Bool(b) => Ok(LiteralValue::Boolean(*b)),
        Value::String(s) => Ok(LiteralValue::String(s.clone())),
        Value::Number(n) => {
            let unsupported = || GenError::UnsupportedLiteral { context: path.join("."), value: n.to_string() };
            let f = n.as_f64().ok_or_else(unsupported)?;
            // integers past 2^53 would silently round
            let exact = match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => f as i128 == i as i128,
                (None, Some(u)) => f as u128 == u as u128,
                (None, None) => true,
            };
            if !exact {
                return Err(unsupported());
            }
            Ok(LiteralValue::Number(OrderedFloat(f)))
        }
        Value::Array(_) | Value::Object(_) => Err(GenError::UnsupportedLiteral {
            context: path.join("."),
            value: value.to_string(),
        }),
    }
}
