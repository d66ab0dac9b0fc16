//! Combinatorial oracle: valid / invalid sample values for a `TypeNode`.
//!
//! - Valid samples are the exhaustive drain of the root combinator: every
//!   union alternative at every depth, objects as the cartesian product of
//!   their attributes, arrays as one representative element.
//! - Invalid samples break exactly one position at a time with
//!   [`Sample::Invalid`], every other position holding the *first* valid
//!   sample of its combinator. A union drops member faults that another
//!   alternative still accepts (objects are open, so `{x: <invalid>}` can
//!   satisfy a sibling whose attributes all admit `undefined`).
//!
//! Both lists are deduplicated by deep structural equality (object key
//! order does not matter) and keep first-seen order.
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{GenError, GenResult};
use crate::ir::{check_union_members, LiteralValue, NodeKind, PrimitiveKind, TypeNode};

pub const CANONICAL_STRING: &str = "text";
pub const CANONICAL_NUMBER: f64 = 42.0;
pub const CANONICAL_BOOLEAN: bool = true;

// ------------------------------- Samples ---------------------------------- //

/// A plain structural value, suitable for literal rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Undefined,
    Null,
    Bool(bool),
    Number(OrderedFloat<f64>),
    String(String),
    Array(Vec<Sample>),
    Object(IndexMap<String, Sample>),
    /// Fault marker; no predicate accepts it.
    Invalid,
}

impl Sample {
    pub fn number(n: f64) -> Self { Sample::Number(OrderedFloat(n)) }
    pub fn string(s: impl Into<String>) -> Self { Sample::String(s.into()) }

    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Sample)>,
        K: Into<String>,
    {
        Sample::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn contains_invalid(&self) -> bool {
        match self {
            Sample::Invalid => true,
            Sample::Array(xs) => xs.iter().any(Sample::contains_invalid),
            Sample::Object(m) => m.values().any(Sample::contains_invalid),
            _ => false,
        }
    }

    /// JSON view. `undefined` and the sentinel have no JSON spelling, so they
    /// become marker objects the serializer is expected to special-case.
    pub fn to_json(&self) -> Value {
        match self {
            Sample::Undefined => json!({ "$undefined": true }),
            Sample::Invalid => json!({ "$invalid": true }),
            Sample::Null => Value::Null,
            Sample::Bool(b) => Value::Bool(*b),
            Sample::Number(n) => json_num_pref_i64(n.0),
            Sample::String(s) => Value::String(s.clone()),
            Sample::Array(xs) => Value::Array(xs.iter().map(Sample::to_json).collect()),
            Sample::Object(m) => Value::Object(m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
        }
    }
}

impl From<&LiteralValue> for Sample {
    fn from(value: &LiteralValue) -> Self {
        match value {
            LiteralValue::Null => Sample::Null,
            LiteralValue::Undefined => Sample::Undefined,
            LiteralValue::String(s) => Sample::String(s.clone()),
            LiteralValue::Number(n) => Sample::Number(*n),
            LiteralValue::Boolean(b) => Sample::Bool(*b),
        }
    }
}

impl Serialize for Sample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// Helper: prefer emitting integers when exact
fn json_num_pref_i64(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

fn push_unique(out: &mut Vec<Sample>, sample: Sample) {
    if !out.contains(&sample) {
        out.push(sample);
    }
}

// ------------------------------ Combinators -------------------------------- //

/// A finite, restartable sample sequence. Drawing twice yields the same values.
#[derive(Debug, Clone, PartialEq)]
pub enum Combinator {
    Value(Sample),
    /// Any value of the kind; draws the canonical one.
    Kind(PrimitiveKind),
    Union(Vec<Combinator>),
    Array(Box<Combinator>),
    Object(Vec<(String, Combinator)>),
}

impl Combinator {
    pub fn value(v: Sample) -> Self { Combinator::Value(v) }
    pub fn union(members: Vec<Combinator>) -> Self { Combinator::Union(members) }
    pub fn array(element: Combinator) -> Self { Combinator::Array(Box::new(element)) }

    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Combinator)>,
        K: Into<String>,
    {
        Combinator::Object(attributes.into_iter().map(|(k, c)| (k.into(), c)).collect())
    }

    /// The full sequence, in order (may contain repeats).
    pub fn samples(&self) -> Vec<Sample> {
        match self {
            Combinator::Value(v) => vec![v.clone()],
            Combinator::Kind(kind) => vec![canonical_of(*kind)],
            Combinator::Union(members) => members.iter().flat_map(Combinator::samples).collect(),
            Combinator::Array(el) => el.samples().into_iter().map(|s| Sample::Array(vec![s])).collect(),
            Combinator::Object(attrs) => object_product(attrs)
                .into_iter()
                .map(Sample::Object)
                .collect(),
        }
    }

    /// The canonical valid sample: first in declared order.
    pub fn canonical(&self) -> Option<Sample> {
        match self {
            Combinator::Value(v) => Some(v.clone()),
            Combinator::Kind(kind) => Some(canonical_of(*kind)),
            Combinator::Union(members) => members.iter().find_map(Combinator::canonical),
            Combinator::Array(el) => el.canonical().map(|s| Sample::Array(vec![s])),
            Combinator::Object(attrs) => attrs
                .iter()
                .map(|(k, c)| c.canonical().map(|s| (k.clone(), s)))
                .collect::<Option<IndexMap<_, _>>>()
                .map(Sample::Object),
        }
    }

    /// Whether the generated predicate for this shape accepts `sample`.
    /// Objects are open and read missing keys as `undefined`.
    pub fn accepts(&self, sample: &Sample) -> bool {
        match (self, sample) {
            (_, Sample::Invalid) => false,
            (Combinator::Value(v), s) => v == s,
            (Combinator::Kind(kind), s) => matches!(
                (kind, s),
                (PrimitiveKind::String, Sample::String(_))
                    | (PrimitiveKind::Number, Sample::Number(_))
                    | (PrimitiveKind::Boolean, Sample::Bool(_))
            ),
            (Combinator::Union(members), s) => members.iter().any(|m| m.accepts(s)),
            (Combinator::Array(el), Sample::Array(xs)) => xs.iter().all(|x| el.accepts(x)),
            (Combinator::Object(attrs), Sample::Object(m)) => attrs
                .iter()
                .all(|(k, c)| c.accepts(m.get(k).unwrap_or(&Sample::Undefined))),
            _ => false,
        }
    }

    /// Every sample with exactly one position (this node or one below it)
    /// replaced by the sentinel.
    fn faults(&self) -> Vec<Sample> {
        let mut out = vec![Sample::Invalid];
        match self {
            Combinator::Value(_) | Combinator::Kind(_) => {}
            Combinator::Union(members) => {
                // a member's fault only counts if no alternative takes it
                for member in members {
                    for fault in member.faults() {
                        if !self.accepts(&fault) {
                            push_unique(&mut out, fault);
                        }
                    }
                }
            }
            Combinator::Array(el) => {
                for fault in el.faults() {
                    push_unique(&mut out, Sample::Array(vec![fault]));
                }
            }
            Combinator::Object(attrs) => {
                let Some(Sample::Object(canonical)) = self.canonical() else {
                    return out;
                };
                for (name, attr) in attrs {
                    for fault in attr.faults() {
                        let mut broken = canonical.clone();
                        broken.insert(name.clone(), fault);
                        push_unique(&mut out, Sample::Object(broken));
                    }
                }
            }
        }
        out
    }
}

fn canonical_of(kind: PrimitiveKind) -> Sample {
    match kind {
        PrimitiveKind::String => Sample::string(CANONICAL_STRING),
        PrimitiveKind::Number => Sample::number(CANONICAL_NUMBER),
        PrimitiveKind::Boolean => Sample::Bool(CANONICAL_BOOLEAN),
    }
}

/// First attribute varies outermost; zero attributes give one empty object.
fn object_product(attrs: &[(String, Combinator)]) -> Vec<IndexMap<String, Sample>> {
    let Some(((name, first), rest)) = attrs.split_first() else {
        return vec![IndexMap::new()];
    };
    let tails = object_product(rest);
    let mut out = Vec::new();
    for head in first.samples() {
        for tail in &tails {
            let mut row = IndexMap::with_capacity(attrs.len());
            row.insert(name.clone(), head.clone());
            row.extend(tail.iter().map(|(k, v)| (k.clone(), v.clone())));
            out.push(row);
        }
    }
    out
}

/// Drain the root combinator into the deduplicated valid-fixture list.
pub fn combine_valid(root: &Combinator) -> Vec<Sample> {
    let mut out = Vec::new();
    for sample in root.samples() {
        push_unique(&mut out, sample);
    }
    out
}

/// One-fault-per-case invalid fixtures, deduplicated.
pub fn combine_invalid(root: &Combinator) -> Vec<Sample> {
    let mut out = Vec::new();
    for sample in root.faults() {
        push_unique(&mut out, sample);
    }
    out
}

// -------------------------------- Builder ---------------------------------- //

/// Valid / invalid fixtures for one root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fixtures {
    pub valid: Vec<Sample>,
    pub invalid: Vec<Sample>,
}

/// Builds combinators, expanding aliases through the batch registry.
pub struct Oracle<'r> {
    registry: &'r IndexMap<String, TypeNode>,
    max_depth: usize,
}

impl<'r> Oracle<'r> {
    pub fn new(registry: &'r IndexMap<String, TypeNode>) -> Self {
        Self { registry, max_depth: 100 }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn combinator_for(&self, node: &TypeNode) -> GenResult<Combinator> {
        let root = node.alias_name.clone().unwrap_or_else(|| "root".to_string());
        let mut stack = node.alias_name.iter().cloned().collect::<Vec<_>>();
        self.build(node, &mut vec![root], &mut stack, 0)
    }

    pub fn fixtures_for(&self, node: &TypeNode) -> GenResult<Fixtures> {
        let combinator = self.combinator_for(node)?;
        let fixtures = Fixtures {
            valid: combine_valid(&combinator),
            invalid: combine_invalid(&combinator),
        };
        debug!(
            root = node.alias_name.as_deref().unwrap_or("<anonymous>"),
            valid = fixtures.valid.len(),
            invalid = fixtures.invalid.len(),
            "built fixtures"
        );
        Ok(fixtures)
    }

    fn build(
        &self,
        node: &TypeNode,
        path: &mut Vec<String>,
        stack: &mut Vec<String>,
        depth: usize,
    ) -> GenResult<Combinator> {
        if depth > self.max_depth {
            return Err(GenError::DepthExceeded { limit: self.max_depth, context: path.join(".") });
        }
        match &node.kind {
            NodeKind::Literal(v) => Ok(Combinator::value(Sample::from(v))),
            NodeKind::Primitive(kind) => Ok(Combinator::Kind(*kind)),
            NodeKind::Array(el) => {
                path.push("element".to_string());
                let inner = self.build(el, path, stack, depth + 1);
                path.pop();
                Ok(Combinator::array(inner?))
            }
            NodeKind::Union(members) => {
                check_union_members(members, &path.join("."))?;
                let members = members
                    .iter()
                    .map(|m| self.build(m, path, stack, depth + 1))
                    .collect::<GenResult<Vec<_>>>()?;
                Ok(Combinator::union(members))
            }
            NodeKind::Object { attributes, .. } => {
                let mut attrs = Vec::with_capacity(attributes.len());
                for (name, attr) in attributes {
                    path.push(name.clone());
                    let built = self.build(attr, path, stack, depth + 1);
                    path.pop();
                    attrs.push((name.clone(), built?));
                }
                Ok(Combinator::Object(attrs))
            }
            NodeKind::Alias(name) => {
                if stack.contains(name) {
                    let mut cycle = stack.clone();
                    cycle.push(name.clone());
                    return Err(GenError::RecursiveAlias { cycle });
                }
                let Some(target) = self.registry.get(name) else {
                    return Err(GenError::UnknownAlias {
                        name: name.clone(),
                        context: path.join("."),
                        known: self.registry.keys().cloned().collect(),
                    });
                };
                stack.push(name.clone());
                let built = self.build(target, path, stack, depth + 1);
                stack.pop();
                built
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    fn number() -> TypeNode { TypeNode::primitive(PrimitiveKind::Number) }
    fn string() -> TypeNode { TypeNode::primitive(PrimitiveKind::String) }

    fn fixtures(node: &TypeNode) -> Fixtures {
        let registry = IndexMap::new();
        Oracle::new(&registry).fixtures_for(node).unwrap()
    }

    #[test]
    fn value_is_single_and_restartable() {
        let c = Combinator::value(Sample::Null);
        assert_eq!(c.samples(), vec![Sample::Null]);
        assert_eq!(c.samples(), c.samples());
    }

    #[test]
    fn union_is_alternation_in_order() {
        let c = Combinator::union(vec![
            Combinator::value(Sample::number(1.0)),
            Combinator::value(Sample::string("a")),
        ]);
        assert_eq!(c.samples(), vec![Sample::number(1.0), Sample::string("a")]);
    }

    #[test]
    fn array_wraps_each_element_once() {
        let c = Combinator::array(Combinator::array(Combinator::union(vec![
            Combinator::value(Sample::Bool(true)),
            Combinator::value(Sample::Null),
        ])));
        assert_eq!(c.samples(), vec![
            Sample::Array(vec![Sample::Array(vec![Sample::Bool(true)])]),
            Sample::Array(vec![Sample::Array(vec![Sample::Null])]),
        ]);
    }

    #[test]
    fn object_product_first_attribute_outermost() {
        let two = |a, b| Combinator::union(vec![Combinator::value(Sample::string(a)), Combinator::value(Sample::string(b))]);
        let c = Combinator::object([("x", two("x1", "x2")), ("y", two("y1", "y2"))]);
        let got: Vec<_> = c.samples().iter().map(Sample::to_json).collect();
        assert_eq!(got, vec![
            json!({"x": "x1", "y": "y1"}),
            json!({"x": "x1", "y": "y2"}),
            json!({"x": "x2", "y": "y1"}),
            json!({"x": "x2", "y": "y2"}),
        ]);
    }

    #[test]
    fn empty_object_yields_one_sample() {
        let c = Combinator::object(Vec::<(String, Combinator)>::new());
        assert_eq!(combine_valid(&c), vec![Sample::Object(IndexMap::new())]);
    }

    #[test]
    fn user_has_one_valid_and_one_fault_per_attribute() {
        let user = TypeNode::object([("id", number()), ("login", string())]).named("User");
        let f = fixtures(&user);
        assert_eq!(f.valid, vec![Sample::object([
            ("id", Sample::number(CANONICAL_NUMBER)),
            ("login", Sample::string(CANONICAL_STRING)),
        ])]);
        assert!(f.invalid.contains(&Sample::object([
            ("id", Sample::Invalid),
            ("login", Sample::string(CANONICAL_STRING)),
        ])));
        assert!(f.invalid.contains(&Sample::object([
            ("id", Sample::number(CANONICAL_NUMBER)),
            ("login", Sample::Invalid),
        ])));
    }

    #[test]
    fn faults_are_single_and_siblings_use_first_alternative() {
        let node = TypeNode::object([
            ("a", TypeNode::union(vec![
                TypeNode::literal(LiteralValue::String("first".into())),
                TypeNode::literal(LiteralValue::String("second".into())),
            ])),
            ("b", TypeNode::array(number())),
        ]);
        let f = fixtures(&node);
        assert_eq!(f.valid.len(), 2);
        for sample in &f.invalid {
            let json = sample.to_json().to_string();
            assert_eq!(json.matches("$invalid").count(), 1, "{json}");
            if let Sample::Object(m) = sample {
                if m["b"].contains_invalid() {
                    assert_eq!(m["a"], Sample::string("first"));
                }
            }
        }
        assert!(f.invalid.contains(&Sample::object([
            ("a", Sample::string("first")),
            ("b", Sample::Array(vec![Sample::Invalid])),
        ])));
    }

    #[test]
    fn dedup_ignores_key_order() {
        let mut out = Vec::new();
        push_unique(&mut out, Sample::object([("a", Sample::Null), ("b", Sample::Null)]));
        push_unique(&mut out, Sample::object([("b", Sample::Null), ("a", Sample::Null)]));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn aliases_expand_through_registry() {
        let mut registry = IndexMap::new();
        registry.insert("Id".to_string(), number().named("Id"));
        let node = TypeNode::array(TypeNode::alias("Id")).named("Ids");
        let f = Oracle::new(&registry).fixtures_for(&node).unwrap();
        assert_eq!(f.valid, vec![Sample::Array(vec![Sample::number(CANONICAL_NUMBER)])]);
    }

    #[test]
    fn alias_cycle_is_reported_not_followed() {
        let mut registry = IndexMap::new();
        registry.insert("A".to_string(), TypeNode::object([("b", TypeNode::alias("B"))]).named("A"));
        registry.insert("B".to_string(), TypeNode::object([("a", TypeNode::alias("A"))]).named("B"));
        let err = Oracle::new(&registry).fixtures_for(&registry["A"]).unwrap_err();
        assert_eq!(err, GenError::RecursiveAlias { cycle: vec!["A".into(), "B".into(), "A".into()] });
    }

    #[test]
    fn unknown_alias_lists_registry() {
        let registry = IndexMap::new();
        let err = Oracle::new(&registry).fixtures_for(&TypeNode::alias("Nope").named("R")).unwrap_err();
        assert!(matches!(err, GenError::UnknownAlias { ref name, .. } if name == "Nope"));
    }

    #[test]
    fn object_union_member_is_rejected() {
        let node = TypeNode::union(vec![number(), TypeNode::object([("x", number())])]).named("U");
        let registry = IndexMap::new();
        let err = Oracle::new(&registry).fixtures_for(&node).unwrap_err();
        assert!(matches!(err, GenError::UnsupportedUnionMember { .. }));
    }

    #[test]
    fn faults_taken_by_a_sibling_alternative_are_dropped() {
        let mut registry = IndexMap::new();
        registry.insert("A".to_string(), TypeNode::object([("x", number())]).named("A"));
        let maybe = TypeNode::union(vec![number(), TypeNode::literal(LiteralValue::Undefined)]).optional();
        registry.insert(
            "B".to_string(),
            TypeNode::object([("y", maybe)]).with_optional_attributes(["y"]).named("B"),
        );
        let node = TypeNode::union(vec![TypeNode::alias("A"), TypeNode::alias("B")]).named("U");
        let f = Oracle::new(&registry).fixtures_for(&node).unwrap();
        // B is open and reads the missing `y` as undefined
        assert!(!f.invalid.contains(&Sample::object([("x", Sample::Invalid)])));
        assert!(f.invalid.contains(&Sample::object([("y", Sample::Invalid)])));
        let c = Oracle::new(&registry).combinator_for(&node).unwrap();
        assert!(f.invalid.iter().all(|s| !c.accepts(s)));
        assert!(f.valid.iter().all(|s| c.accepts(s)));
    }

    #[test]
    fn accepts_mirrors_predicate_semantics() {
        let c = Combinator::object([
            ("n", Combinator::Kind(PrimitiveKind::Number)),
            ("tags", Combinator::array(Combinator::Kind(PrimitiveKind::String))),
        ]);
        assert!(c.accepts(&Sample::object([("n", Sample::number(7.0)), ("tags", Sample::Array(vec![]))])));
        assert!(!c.accepts(&Sample::object([("n", Sample::number(7.0))])));
        assert!(!c.accepts(&Sample::Null));
        assert!(!Combinator::value(Sample::Null).accepts(&Sample::Invalid));
    }

    #[test]
    fn oracle_depth_ceiling_is_enforced() {
        let mut node = number();
        for _ in 0..120 {
            node = TypeNode::array(node);
        }
        let registry = IndexMap::new();
        let err = Oracle::new(&registry).fixtures_for(&node.named("Deep")).unwrap_err();
        assert!(matches!(err, GenError::DepthExceeded { limit: 100, .. }));
    }

    #[test]
    fn undefined_and_sentinel_have_marker_json() {
        assert_eq!(Sample::Undefined.to_json(), json!({"$undefined": true}));
        assert_eq!(Sample::Invalid.to_json(), json!({"$invalid": true}));
        assert_eq!(Sample::number(3.0).to_json(), json!(3));
        assert_eq!(Sample::number(1.5).to_json(), json!(1.5));
    }
}
