//! The layer graph: stratified propagation of validity updates.
//!
//! Layers encode the author's knowledge of the cascade direction: component
//! choices (layer 0) drive physics options (layer 1) drive modifier options
//! (layer 2), never the reverse. Designation queues a variable into its
//! major layer together with the refresh it needs; traversal (driven by the
//! engine) drains queues in ascending layer order and revisits each
//! variable at most once.

use crate::registry::VarRegistry;
use crate::variable::VarId;
use std::collections::VecDeque;

/// What a designated variable needs recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum RefreshKind {
    /// Only option validities may have changed.
    Validities,
    /// The options list itself must be re-derived (options setter).
    Options,
}

#[derive(Debug, Default)]
struct Layer {
    /// Members in declaration order; used for the initial full sweep.
    members: Vec<VarId>,
    /// Designated variables in designation order.
    pending: VecDeque<(VarId, RefreshKind)>,
}

/// The stratified dependency graph.
#[derive(Debug)]
pub(crate) struct LayerGraph {
    layers: Vec<Layer>,
}

impl LayerGraph {
    /// A graph with only the default layer 0.
    pub(crate) fn new() -> Self {
        Self {
            layers: vec![Layer::default()],
        }
    }

    /// Declare a new layer below all existing ones; returns its index.
    pub(crate) fn add_layer(&mut self) -> usize {
        self.layers.push(Layer::default());
        self.layers.len() - 1
    }

    pub(crate) fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Record a variable as member of a layer, in declaration order.
    pub(crate) fn add_member(&mut self, layer: usize, var: VarId) {
        self.layers[layer].members.push(var);
    }

    /// Members of a layer in declaration order.
    pub(crate) fn members(&self, layer: usize) -> &[VarId] {
        &self.layers[layer].members
    }

    /// Queue one variable into a layer for revisit, merging refresh kinds
    /// (an options refresh subsumes a validities refresh).
    pub(crate) fn designate(&mut self, layer: usize, var: VarId, kind: RefreshKind) {
        let pending = &mut self.layers[layer].pending;
        for entry in pending.iter_mut() {
            if entry.0 == var {
                entry.1 = entry.1.max(kind);
                return;
            }
        }
        pending.push_back((var, kind));
    }

    /// Designate the variables affected by a change of `var`: its peers and
    /// when-clause children for validity recomputation and, when the flag is
    /// set, its option children for an options refresh.
    pub(crate) fn designate_affected(
        &mut self,
        registry: &VarRegistry,
        var: VarId,
        include_option_children: bool,
    ) {
        let source = registry.get(var);
        let targets: Vec<(VarId, RefreshKind)> = source
            .peers
            .iter()
            .chain(source.children.iter())
            .map(|&v| (v, RefreshKind::Validities))
            .chain(if include_option_children {
                Some(
                    source
                        .option_children
                        .iter()
                        .map(|&v| (v, RefreshKind::Options)),
                )
            } else {
                None
            }
            .into_iter()
            .flatten())
            .collect();
        for (target, kind) in targets {
            let layer = registry.get(target).major_layer();
            self.designate(layer, target, kind);
        }
    }

    /// Pop the next designated variable, lowest layer first; within a
    /// layer, designation order.
    pub(crate) fn pop_next(&mut self) -> Option<(VarId, RefreshKind)> {
        for layer in &mut self.layers {
            if let Some(entry) = layer.pending.pop_front() {
                return Some(entry);
            }
        }
        None
    }
}
