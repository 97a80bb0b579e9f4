//! The variable registry: an arena of variables with a bounded definition
//! phase.
//!
//! Variables are created between registry construction and `lock()`; after
//! lock, identities are fixed and only values, options, and validities
//! change. The registry also resolves names to solver constants for the
//! expression compiler.

use crate::error::{EngineError, Result};
use crate::variable::{VarId, VarSpec, Variable};
use casegen_solver::{TermVar, VarResolver};
use std::collections::HashMap;
use tracing::debug;

/// Arena of configuration variables, keyed by name.
#[derive(Debug, Default)]
pub(crate) struct VarRegistry {
    vars: Vec<Variable>,
    by_name: HashMap<String, VarId>,
    locked: bool,
}

impl VarRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn define(&mut self, name: &str, spec: &VarSpec) -> Result<VarId> {
        if self.locked {
            return Err(EngineError::RegistryLocked(name.to_string()));
        }
        if self.by_name.contains_key(name) {
            return Err(EngineError::Redefinition(name.to_string()));
        }
        for option in &spec.options {
            if option.kind() != spec.kind {
                return Err(EngineError::KindMismatch {
                    var: name.to_string(),
                    value: option.clone(),
                    expected: spec.kind,
                    found: option.kind(),
                });
            }
        }
        let id = VarId(self.vars.len());
        self.vars.push(Variable::new(id, name, spec));
        self.by_name.insert(name.to_string(), id);
        debug!(name, kind = %spec.kind, "variable defined");
        Ok(id)
    }

    pub(crate) fn lock(&mut self) -> Result<()> {
        if self.vars.is_empty() {
            return Err(EngineError::EmptyRegistry);
        }
        if self.locked {
            return Err(EngineError::AlreadyLocked);
        }
        self.locked = true;
        debug!(count = self.vars.len(), "variable registry locked");
        Ok(())
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn exists(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub(crate) fn id_of(&self, name: &str) -> Result<VarId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UnknownVariable(name.to_string()))
    }

    pub(crate) fn get(&self, id: VarId) -> &Variable {
        &self.vars[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.index()]
    }

    pub(crate) fn len(&self) -> usize {
        self.vars.len()
    }

    /// All variable ids in declaration order.
    pub(crate) fn ids(&self) -> impl Iterator<Item = VarId> + '_ {
        (0..self.vars.len()).map(VarId)
    }

    /// Current value of a named variable, for options setters and guards.
    pub(crate) fn value_of(&self, name: &str) -> Option<&casegen_core::Value> {
        let id = self.by_name.get(name)?;
        self.vars[id.index()].value.as_ref()
    }
}

impl VarResolver for VarRegistry {
    fn resolve(&self, name: &str) -> Option<TermVar> {
        let id = self.by_name.get(name)?;
        Some(self.vars[id.index()].term_var)
    }
}
