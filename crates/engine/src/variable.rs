//! The configuration variable model.

use crate::sink::{decorate, NullSink, PresentationSink};
use casegen_core::{Value, ValueKind};
use casegen_solver::{Sort, TermVar};
use std::collections::BTreeSet;
use std::fmt;

/// Arena index of a configuration variable. All cross-variable references
/// (peers, parents, children) are indices, never owning pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// The raw arena index, which is also the solver-constant id.
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Definition-time description of a variable.
#[derive(Debug, Clone)]
pub struct VarSpec {
    /// The value kind of the variable.
    pub kind: ValueKind,
    /// Initial options; empty for an infinite domain.
    pub options: Vec<Value>,
    /// Per-option tooltips, parallel to `options`.
    pub tooltips: Vec<String>,
    /// Auto-assign the first valid option whenever options change.
    pub always_set: bool,
    /// Hide invalid options in the presentation sink.
    pub hide_invalid: bool,
    /// The sink display string used for the unset value, if any.
    pub none_display: Option<String>,
}

impl VarSpec {
    /// A spec of the given kind with no options and default flags.
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            options: Vec::new(),
            tooltips: Vec::new(),
            always_set: false,
            hide_invalid: false,
            none_display: None,
        }
    }

    /// Declare the initial options.
    pub fn options<V, I>(mut self, options: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Declare per-option tooltips.
    pub fn tooltips<S, I>(mut self, tooltips: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        self.tooltips = tooltips.into_iter().map(Into::into).collect();
        self
    }

    /// Auto-assign the first valid option whenever options change.
    pub fn always_set(mut self) -> Self {
        self.always_set = true;
        self
    }

    /// Hide invalid options in the presentation sink.
    pub fn hide_invalid(mut self) -> Self {
        self.hide_invalid = true;
        self
    }
}

impl Default for VarSpec {
    fn default() -> Self {
        Self::new(ValueKind::Str)
    }
}

/// One configuration variable: typed value slot, options and their
/// validities, propagation edges, layer memberships, and the sink.
pub(crate) struct Variable {
    pub(crate) name: String,
    pub(crate) kind: ValueKind,
    pub(crate) term_var: TermVar,

    pub(crate) value: Option<Value>,
    pub(crate) options: Option<Vec<Value>>,
    pub(crate) validities: Vec<bool>,
    pub(crate) tooltips: Vec<String>,

    pub(crate) always_set: bool,
    pub(crate) hide_invalid: bool,
    pub(crate) none_display: Option<String>,

    /// Layer memberships; first entry is the major layer. Empty means the
    /// default layer 0.
    pub(crate) layers: Vec<usize>,

    /// Variables sharing a relational assertion body with this one.
    pub(crate) peers: BTreeSet<VarId>,
    /// Antecedent variables of when-clauses whose consequents mention this.
    pub(crate) parents: BTreeSet<VarId>,
    /// Consequent variables of when-clauses whose antecedents mention this.
    pub(crate) children: BTreeSet<VarId>,
    /// Variables whose options derive from this one's value.
    pub(crate) option_children: BTreeSet<VarId>,

    pub(crate) sink: Box<dyn PresentationSink>,
}

impl Variable {
    pub(crate) fn new(id: VarId, name: &str, spec: &VarSpec) -> Self {
        Self {
            name: name.to_string(),
            kind: spec.kind,
            term_var: TermVar::new(id.index(), Sort::from(spec.kind)),
            value: None,
            options: if spec.options.is_empty() {
                None
            } else {
                Some(spec.options.clone())
            },
            validities: Vec::new(),
            tooltips: spec.tooltips.clone(),
            always_set: spec.always_set,
            hide_invalid: spec.hide_invalid,
            none_display: spec.none_display.clone(),
            layers: Vec::new(),
            peers: BTreeSet::new(),
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            option_children: BTreeSet::new(),
            sink: Box::new(NullSink),
        }
    }

    /// The layer this variable is revisited in first.
    pub(crate) fn major_layer(&self) -> usize {
        self.layers.first().copied().unwrap_or(0)
    }

    pub(crate) fn has_options(&self) -> bool {
        self.options.is_some()
    }

    /// Whether validity queries are worth a solver call: a variable that
    /// appears in no relation body (or only in when-clause antecedents) can
    /// never have an invalid option.
    pub(crate) fn is_relational(&self) -> bool {
        !self.peers.is_empty() || !self.parents.is_empty()
    }

    pub(crate) fn option_index(&self, value: &Value) -> Option<usize> {
        self.options.as_ref()?.iter().position(|o| o == value)
    }

    /// The validity of one option, if the variable has it as an option.
    pub(crate) fn validity_of(&self, value: &Value) -> Option<bool> {
        let idx = self.option_index(value)?;
        self.validities.get(idx).copied()
    }

    pub(crate) fn first_valid_option(&self) -> Option<Value> {
        let options = self.options.as_ref()?;
        options
            .iter()
            .zip(self.validities.iter())
            .find(|(_, valid)| **valid)
            .map(|(o, _)| o.clone())
    }

    /// Decorated option display strings, filtered when hiding invalid ones.
    pub(crate) fn display_options(&self) -> Vec<String> {
        let Some(options) = &self.options else {
            return Vec::new();
        };
        options
            .iter()
            .zip(self.validities.iter())
            .filter(|(_, valid)| !self.hide_invalid || **valid)
            .map(|(o, valid)| decorate(*valid, &o.to_string()))
            .collect()
    }

    /// Tooltips matching the displayed options.
    pub(crate) fn display_tooltips(&self) -> Vec<String> {
        if !self.hide_invalid {
            return self.tooltips.clone();
        }
        self.tooltips
            .iter()
            .zip(self.validities.iter())
            .filter(|(_, valid)| **valid)
            .map(|(t, _)| t.clone())
            .collect()
    }

    /// The sink display string for the current value.
    pub(crate) fn display_value(&self) -> Option<String> {
        match &self.value {
            Some(v) => Some(decorate(true, &v.to_string())),
            None => self.none_display.clone(),
        }
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("options", &self.options)
            .field("validities", &self.validities)
            .field("always_set", &self.always_set)
            .field("hide_invalid", &self.hide_invalid)
            .field("layers", &self.layers)
            .finish()
    }
}
