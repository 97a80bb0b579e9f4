//! The stage machine: ordered, guard-gated groups of variables.
//!
//! Stages form a rooted tree. Exactly one leaf is active at a time: the
//! first leaf in pre-order whose guard chain holds and whose variables are
//! not yet all set. A guard that concretely evaluates false skips its
//! subtree (complete for navigation, variables reset); a guard whose
//! antecedents are still unset leaves the stage pending.

use crate::error::Result;
use crate::registry::VarRegistry;
use crate::variable::VarId;
use casegen_core::Expression;
use casegen_solver::{compile, evaluate, Term};
use tracing::debug;

/// Host-side description of one stage, nested to form the tree.
#[derive(Debug, Clone)]
pub struct StageDef {
    /// Stage title, shown by the UI and used for lookups.
    pub title: String,
    /// Activation guard over variables; absent means always eligible.
    pub guard: Option<Expression>,
    /// Names of the variables this stage owns, in declaration order.
    pub variables: Vec<String>,
    /// Child stages.
    pub substages: Vec<StageDef>,
}

impl StageDef {
    /// A stage with the given title and nothing else.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            guard: None,
            variables: Vec::new(),
            substages: Vec::new(),
        }
    }

    /// Declare the variables this stage owns.
    pub fn vars<S, I>(mut self, names: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.variables = names.into_iter().map(Into::into).collect();
        self
    }

    /// Declare the activation guard.
    pub fn guard(mut self, expr: Expression) -> Self {
        self.guard = Some(expr);
        self
    }

    /// Append a child stage.
    pub fn substage(mut self, def: StageDef) -> Self {
        self.substages.push(def);
        self
    }
}

#[derive(Debug)]
struct StageNode {
    title: String,
    guard: Option<Term>,
    variables: Vec<VarId>,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Whether the last refresh saw this stage guard-skipped; used to reset
    /// variables exactly once per skip transition.
    skipped: bool,
}

/// The built stage tree plus its derived activation state.
#[derive(Debug)]
pub(crate) struct StageMachine {
    /// Nodes in pre-order; parents precede their subtrees.
    nodes: Vec<StageNode>,
    /// Guard chain state per node from the last refresh.
    guard_ok: Vec<Option<bool>>,
    /// Completion per node from the last refresh.
    complete: Vec<bool>,
    active: Option<usize>,
}

impl StageMachine {
    pub(crate) fn build(root: &StageDef, registry: &VarRegistry) -> Result<Self> {
        let mut nodes = Vec::new();
        build_node(root, None, &mut nodes, registry)?;
        let n = nodes.len();
        Ok(Self {
            nodes,
            guard_ok: vec![None; n],
            complete: vec![false; n],
            active: None,
        })
    }

    /// Recompute guard states, completion, and the active leaf. Returns the
    /// variables of freshly skipped stages, in reverse declaration order,
    /// for the engine to reset.
    pub(crate) fn refresh(&mut self, registry: &VarRegistry) -> Vec<VarId> {
        let lookup = |raw: usize| registry.get(VarId(raw)).value.clone();
        let n = self.nodes.len();

        // Guard chains; parents precede children in pre-order.
        for i in 0..n {
            let own = match &self.nodes[i].guard {
                None => Some(true),
                Some(term) => evaluate(term, &lookup),
            };
            let inherited = match self.nodes[i].parent {
                Some(p) => self.guard_ok[p],
                None => Some(true),
            };
            self.guard_ok[i] = match (inherited, own) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            };
        }

        // Skip transitions collect variables to reset.
        let mut resets = Vec::new();
        for i in 0..n {
            let skipped_now = self.guard_ok[i] == Some(false);
            if skipped_now && !self.nodes[i].skipped {
                debug!(stage = %self.nodes[i].title, "stage skipped by its guard");
                for &v in self.nodes[i].variables.iter().rev() {
                    if registry.get(v).value.is_some() {
                        resets.push(v);
                    }
                }
            }
            self.nodes[i].skipped = skipped_now;
        }

        // Completion, children before parents.
        for i in (0..n).rev() {
            self.complete[i] = match self.guard_ok[i] {
                Some(false) => true,
                None => false,
                Some(true) => {
                    self.nodes[i]
                        .variables
                        .iter()
                        .all(|&v| registry.get(v).value.is_some())
                        && self.nodes[i].children.iter().all(|&c| self.complete[c])
                }
            };
        }

        let previous = self.active;
        self.active = (0..n).find(|&i| {
            self.nodes[i].children.is_empty()
                && self.guard_ok[i] == Some(true)
                && !self.complete[i]
        });
        if self.active != previous {
            match self.active {
                Some(i) => debug!(stage = %self.nodes[i].title, "stage activated"),
                None => debug!("all stages complete"),
            }
        }

        resets
    }

    pub(crate) fn active_title(&self) -> Option<&str> {
        self.active.map(|i| self.nodes[i].title.as_str())
    }

    /// Title of the first leaf stage in pre-order.
    pub(crate) fn first_title(&self) -> Option<&str> {
        (0..self.nodes.len())
            .find(|&i| self.nodes[i].children.is_empty())
            .map(|i| self.nodes[i].title.as_str())
    }

    /// Variables of the active stage in reverse declaration order.
    pub(crate) fn active_vars_reversed(&self) -> Vec<VarId> {
        match self.active {
            Some(i) => self.nodes[i].variables.iter().rev().copied().collect(),
            None => Vec::new(),
        }
    }

    fn find(&self, title: &str) -> Option<usize> {
        self.nodes.iter().position(|s| s.title == title)
    }

    pub(crate) fn is_complete(&self, title: &str) -> Option<bool> {
        self.find(title).map(|i| self.complete[i])
    }

    /// A stage is enabled when its guard chain holds and it either hosts
    /// the active leaf or has genuinely completed (not by being skipped).
    pub(crate) fn is_enabled(&self, title: &str) -> Option<bool> {
        let idx = self.find(title)?;
        if self.guard_ok[idx] != Some(true) {
            return Some(false);
        }
        let hosts_active = match self.active {
            Some(mut a) => loop {
                if a == idx {
                    break true;
                }
                match self.nodes[a].parent {
                    Some(p) => a = p,
                    None => break false,
                }
            },
            None => false,
        };
        Some(hosts_active || (self.complete[idx] && !self.nodes[idx].skipped))
    }
}

fn build_node(
    def: &StageDef,
    parent: Option<usize>,
    nodes: &mut Vec<StageNode>,
    registry: &VarRegistry,
) -> Result<usize> {
    let guard = match &def.guard {
        Some(expr) => Some(compile(expr, registry)?.term),
        None => None,
    };
    let variables = def
        .variables
        .iter()
        .map(|name| registry.id_of(name))
        .collect::<Result<Vec<_>>>()?;
    let idx = nodes.len();
    nodes.push(StageNode {
        title: def.title.clone(),
        guard,
        variables,
        parent,
        children: Vec::new(),
        skipped: false,
    });
    for sub in &def.substages {
        let child = build_node(sub, Some(idx), nodes, registry)?;
        nodes[idx].children.push(child);
    }
    Ok(idx)
}
