//! Hygienic name allocation for one predicate's generation pass.
//!
//! Two namespaces (locals, types) share the same allocation ladder:
//! 1. the sanitized proposal,
//! 2. the proposal prefixed with path segments, innermost first
//!    (`seg_name`, `seg2_seg_name`, ...),
//! 3. numeric suffixes starting at 2, bounded by [`MAX_ATTEMPTS`].
//!
//! A `Namer` must never outlive its root: clashes across independent
//! predicates don't matter, clashes within one body do.
use std::borrow::Cow;
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::error::{GenError, GenResult};

pub const MAX_ATTEMPTS: usize = 10_000;

static NON_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Replace every non `[A-Za-z0-9_]` char with `_` and make sure the result
/// starts with a letter or `_`.
pub fn sanitize(raw: &str) -> String {
    let replaced: Cow<'_, str> = NON_IDENT.replace_all(raw, "_");
    match replaced.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => replaced.into_owned(),
        _ => format!("_{replaced}"),
    }
}

/// A destructured attribute bound to a fresh local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeLocal {
    pub attribute_name: String,
    pub local_name: String,
}

#[derive(Debug, Default)]
pub struct Namer {
    locals: HashSet<String>,
    types: HashSet<String>,
    attributes: HashSet<(Vec<String>, String)>,
}

impl Namer {
    pub fn new() -> Self { Self::default() }

    /// Reserve a name in the local namespace up front (e.g. the predicate parameter).
    pub fn reserve_local(&mut self, name: &str) {
        self.locals.insert(name.to_string());
    }

    pub fn reserve_type(&mut self, name: &str) {
        self.types.insert(name.to_string());
    }

    pub fn create_attribute(&mut self, path: &[String], attribute_name: &str) -> GenResult<AttributeLocal> {
        let key = (path.to_vec(), attribute_name.to_string());
        if !self.attributes.insert(key) {
            return Err(GenError::DuplicateAttribute {
                path: path.join("."),
                attribute: attribute_name.to_string(),
            });
        }
        let local_name = self.new_local_name(path, attribute_name)?;
        Ok(AttributeLocal { attribute_name: attribute_name.to_string(), local_name })
    }

    pub fn new_local_name(&mut self, path: &[String], proposed: &str) -> GenResult<String> {
        allocate(&mut self.locals, None, path, proposed)
    }

    pub fn new_type_name(&mut self, path: &[String], proposed: &str) -> GenResult<String> {
        allocate(&mut self.types, None, path, proposed)
    }

    /// Helper predicate names live in the type namespace but are also value
    /// bindings, so they must not shadow any local either.
    pub fn new_function_name(&mut self, path: &[String], proposed: &str) -> GenResult<String> {
        let name = allocate(&mut self.types, Some(&self.locals), path, proposed)?;
        self.locals.insert(name.clone());
        Ok(name)
    }
}

fn allocate(
    taken: &mut HashSet<String>,
    avoid: Option<&HashSet<String>>,
    path: &[String],
    proposed: &str,
) -> GenResult<String> {
    let mut claim = |candidate: &str| {
        if avoid.is_some_and(|other| other.contains(candidate)) {
            return false;
        }
        taken.insert(candidate.to_string())
    };

    let base = sanitize(proposed);
    if claim(&base) {
        return Ok(base);
    }

    // innermost segment first
    let mut prefixed = base.clone();
    for segment in path.iter().rev() {
        prefixed = format!("{}_{prefixed}", sanitize(segment));
        if claim(&prefixed) {
            trace!(proposed, name = %prefixed, "namer: path-prefixed");
            return Ok(prefixed);
        }
    }

    for n in 2..MAX_ATTEMPTS + 2 {
        let candidate = format!("{prefixed}{n}");
        if claim(&candidate) {
            trace!(proposed, name = %candidate, "namer: suffixed");
            return Ok(candidate);
        }
    }
    Err(GenError::NamesExhausted { proposed: proposed.to_string(), attempts: MAX_ATTEMPTS })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sanitize_replaces_and_prefixes() {
        assert_eq!(sanitize("foo-bar baz"), "foo_bar_baz");
        assert_eq!(sanitize("1st"), "_1st");
        assert_eq!(sanitize("_ok"), "_ok");
        assert_eq!(sanitize("ünï"), "_n_");
        assert_eq!(sanitize(""), "_");
    }

    #[test]
    fn collision_ladder_prefixes_innermost_first_then_suffixes() {
        let mut namer = Namer::new();
        let p = path(&["root", "user"]);
        assert_eq!(namer.new_local_name(&p, "id").unwrap(), "id");
        assert_eq!(namer.new_local_name(&p, "id").unwrap(), "user_id");
        assert_eq!(namer.new_local_name(&p, "id").unwrap(), "root_user_id");
        assert_eq!(namer.new_local_name(&p, "id").unwrap(), "root_user_id2");
        assert_eq!(namer.new_local_name(&p, "id").unwrap(), "root_user_id3");
    }

    #[test]
    fn namespaces_are_independent() {
        let mut namer = Namer::new();
        assert_eq!(namer.new_local_name(&[], "x").unwrap(), "x");
        assert_eq!(namer.new_type_name(&[], "x").unwrap(), "x");
    }

    #[test]
    fn reserved_names_are_skipped() {
        let mut namer = Namer::new();
        namer.reserve_local("root");
        assert_eq!(namer.new_local_name(&path(&["a"]), "root").unwrap(), "a_root");
    }

    #[test]
    fn function_names_avoid_locals() {
        let mut namer = Namer::new();
        let p = path(&["root"]);
        namer.new_local_name(&p, "isTag").unwrap();
        assert_eq!(namer.new_function_name(&p, "isTag").unwrap(), "root_isTag");
        // and later locals avoid the function
        assert_eq!(namer.new_local_name(&p, "root_isTag").unwrap(), "root_root_isTag");
    }

    #[test]
    fn suffix_ladder_is_bounded() {
        let mut namer = Namer::new();
        namer.reserve_local("name");
        for n in 2..MAX_ATTEMPTS + 2 {
            namer.reserve_local(&format!("name{n}"));
        }
        let err = namer.new_local_name(&[], "name").unwrap_err();
        assert_eq!(err, GenError::NamesExhausted { proposed: "name".into(), attempts: MAX_ATTEMPTS });
        // the type namespace is unaffected
        assert_eq!(namer.new_type_name(&[], "name").unwrap(), "name");
    }

    #[test]
    fn duplicate_attribute_is_fatal() {
        let mut namer = Namer::new();
        let p = path(&["root"]);
        let first = namer.create_attribute(&p, "id").unwrap();
        assert_eq!(first, AttributeLocal { attribute_name: "id".into(), local_name: "id".into() });
        let err = namer.create_attribute(&p, "id").unwrap_err();
        assert!(matches!(err, GenError::DuplicateAttribute { .. }));
        // same attribute under another path is fine
        assert_eq!(namer.create_attribute(&path(&["root", "inner"]), "id").unwrap().local_name, "inner_id");
    }
}
