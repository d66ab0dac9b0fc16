//! Batch driver: raw roots -> one generated file + fixtures per root.
//!
//! Owns the per-root failure policy. Under [`FailurePolicy::Skip`] a failing
//! root is dropped along with every root that references it, and generation
//! restarts with a fresh engine until the surviving set is consistent.
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::codegen::ast::GeneratedFile;
use crate::codegen::{Codegen, GenConfig};
use crate::error::{GenError, RootError};
use crate::ir::TypeNode;
use crate::lower::{self, RawTypeNode};
use crate::oracle::{Fixtures, Oracle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// First failing root aborts the batch.
    #[default]
    Abort,
    /// Report failing roots and continue with the rest.
    Skip,
}

#[derive(Debug)]
pub struct BatchOutput {
    /// The configuration the file was generated with.
    pub config: GenConfig,
    pub file: GeneratedFile,
    /// Keyed by root alias, in batch order.
    pub fixtures: IndexMap<String, Fixtures>,
    pub failures: Vec<RootError>,
}

pub struct Batch {
    config: GenConfig,
    policy: FailurePolicy,
    with_fixtures: bool,
}

impl Batch {
    pub fn new(config: GenConfig) -> Self {
        Self { config, policy: FailurePolicy::default(), with_fixtures: true }
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_fixtures(mut self, yes: bool) -> Self {
        self.with_fixtures = yes;
        self
    }

    pub fn config(&self) -> &GenConfig { &self.config }

    fn fail(&self, failures: &mut Vec<RootError>, root: String, source: GenError) -> Result<(), RootError> {
        let err = RootError { root, source };
        match self.policy {
            FailurePolicy::Abort => Err(err),
            FailurePolicy::Skip => {
                warn!(root = %err.root, error = %err.source, "skipping root");
                failures.push(err);
                Ok(())
            }
        }
    }

    pub fn run_raw(&self, raw: &[RawTypeNode]) -> Result<BatchOutput, RootError> {
        let mut failures = Vec::new();
        let mut roots = Vec::with_capacity(raw.len());
        for (i, r) in raw.iter().enumerate() {
            match lower::lower_root(r) {
                Ok(node) => roots.push(node),
                Err(e) => self.fail(&mut failures, lower::root_label(r, i), e)?,
            }
        }
        let mut out = self.run(&roots)?;
        failures.append(&mut out.failures);
        out.failures = failures;
        Ok(out)
    }

    pub fn run(&self, roots: &[TypeNode]) -> Result<BatchOutput, RootError> {
        let mut failures = Vec::new();
        let mut named: IndexMap<String, &TypeNode> = IndexMap::new();
        for (i, root) in roots.iter().enumerate() {
            match root.alias_name.as_deref() {
                Some(alias) if named.contains_key(alias) => self.fail(
                    &mut failures,
                    alias.to_string(),
                    GenError::DuplicateRootAlias { name: alias.to_string() },
                )?,
                Some(alias) if !alias.is_empty() => {
                    named.insert(alias.to_string(), root);
                }
                _ => self.fail(
                    &mut failures,
                    format!("<root #{i}>"),
                    GenError::MissingRootAlias { context: root.to_string() },
                )?,
            }
        }

        let mut excluded: IndexSet<String> = IndexSet::new();
        let file = 'restart: loop {
            let mut cg = Codegen::with_config(self.config.clone());
            cg.declare_roots(named.keys().filter(|k| !excluded.contains(*k)).cloned());
            for (alias, root) in &named {
                if excluded.contains(alias) {
                    continue;
                }
                if let Err(e) = cg.add_root_type_guard_for(root) {
                    self.fail(&mut failures, alias.clone(), e)?;
                    excluded.insert(alias.clone());
                    debug!(root = %alias, "restarting codegen without failed root");
                    continue 'restart;
                }
            }
            match cg.into_file() {
                Ok(file) => break file,
                Err(e) => return Err(RootError { root: "<file>".to_string(), source: e }),
            }
        };

        let mut fixtures = IndexMap::new();
        if self.with_fixtures {
            let registry: IndexMap<String, TypeNode> = named
                .iter()
                .filter(|(k, _)| !excluded.contains(*k))
                .map(|(k, v)| (k.clone(), (*v).clone()))
                .collect();
            let oracle = Oracle::new(&registry).with_max_depth(self.config.max_depth);
            let built: Vec<(String, Result<Fixtures, GenError>)> = registry
                .par_iter()
                .map(|(alias, root)| (alias.clone(), oracle.fixtures_for(root)))
                .collect();
            for (alias, result) in built {
                match result {
                    Ok(f) => {
                        fixtures.insert(alias, f);
                    }
                    Err(e) => self.fail(&mut failures, alias, e)?,
                }
            }
        }

        Ok(BatchOutput { config: self.config.clone(), file, fixtures, failures })
    }
}
