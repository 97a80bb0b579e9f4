//! The engine façade: owns the registry, logic engine, layer graph, and
//! stage machine, and implements the assignment algorithm with rollback and
//! layered propagation.
//!
//! All state transitions run to completion on the calling thread. A
//! rejected assignment leaves every store untouched: validation and the
//! satisfiability check happen before anything is written.

use crate::error::{EngineError, Result};
use crate::layers::{LayerGraph, RefreshKind};
use crate::logic::{LogicEngine, Relation};
use crate::registry::VarRegistry;
use crate::sink::{strip_marker, PresentationSink};
use crate::stage::{StageDef, StageMachine};
use crate::variable::{VarId, VarSpec};
use casegen_core::{DomainCatalog, Expression, Value};
use casegen_solver::compile;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Read-only context handed to options setters during propagation.
pub struct OptionsCtx<'a> {
    registry: &'a VarRegistry,
    catalog: &'a dyn DomainCatalog,
}

impl OptionsCtx<'_> {
    /// Current value of a named variable, if set.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.registry.value_of(name)
    }

    /// Current string value of a named variable, if set.
    pub fn str_value(&self, name: &str) -> Option<&str> {
        self.registry.value_of(name)?.as_str()
    }

    /// The domain catalog.
    pub fn catalog(&self) -> &dyn DomainCatalog {
        self.catalog
    }
}

/// Derives a variable's options (and tooltips) from other variables'
/// values. Returning `None` leaves the current options untouched.
pub type OptionsSetter = Box<dyn Fn(&OptionsCtx<'_>) -> Option<(Vec<Value>, Vec<String>)>>;

/// The configuration constraint engine.
///
/// Construction is a two-phase lifecycle: a definition phase (`define`,
/// `new_layer`, `place_in_layer`, `set_options_setter`) bounded by `lock`,
/// then `initialize` with the domain catalog, the relational-assertion
/// bundle, and the stage tree. After that, `assign`/`reset` drive all state.
pub struct Engine {
    registry: VarRegistry,
    logic: LogicEngine,
    layers: LayerGraph,
    stages: Option<StageMachine>,
    catalog: Option<Box<dyn DomainCatalog>>,
    setters: std::collections::HashMap<VarId, OptionsSetter>,
    alert: Option<Box<dyn FnMut(&str)>>,
    in_propagation: bool,
    initialized: bool,
}

impl Engine {
    /// An empty engine in its definition phase.
    pub fn new() -> Self {
        Self::with_step_limit(casegen_solver::solver::DEFAULT_STEP_LIMIT)
    }

    /// An engine whose solver queries carry an explicit search budget.
    pub fn with_step_limit(step_limit: u64) -> Self {
        Self {
            registry: VarRegistry::new(),
            logic: LogicEngine::new(step_limit),
            layers: LayerGraph::new(),
            stages: None,
            catalog: None,
            setters: std::collections::HashMap::new(),
            alert: None,
            in_propagation: false,
            initialized: false,
        }
    }

    // ------------------------------------------------------------------
    // Definition phase
    // ------------------------------------------------------------------

    /// Define a new variable.
    pub fn define(&mut self, name: &str, spec: VarSpec) -> Result<VarId> {
        let id = self.registry.define(name, &spec)?;
        let var = self.registry.get(id);
        if let Some(options) = var.options.clone() {
            self.logic.register_options(id, var.term_var, &options);
        }
        Ok(id)
    }

    /// Declare a new propagation layer below all existing ones.
    pub fn new_layer(&mut self) -> usize {
        self.layers.add_layer()
    }

    /// Add a variable to a layer. The first placement fixes its major
    /// layer; later placements must have strictly higher indices.
    pub fn place_in_layer(&mut self, name: &str, layer: usize) -> Result<()> {
        let id = self.registry.id_of(name)?;
        if layer >= self.layers.layer_count() {
            return Err(EngineError::LayerPriorityInversion(name.to_string()));
        }
        let var = self.registry.get_mut(id);
        if let Some(&last) = var.layers.last() {
            if layer <= last {
                return Err(EngineError::LayerPriorityInversion(name.to_string()));
            }
        }
        var.layers.push(layer);
        Ok(())
    }

    /// Install an options setter: `name`'s options derive from the values
    /// of `deps`, which record it as their option child.
    pub fn set_options_setter(
        &mut self,
        name: &str,
        deps: &[&str],
        setter: OptionsSetter,
    ) -> Result<()> {
        let id = self.registry.id_of(name)?;
        for dep in deps {
            let dep_id = self.registry.id_of(dep)?;
            self.registry.get_mut(dep_id).option_children.insert(id);
        }
        self.setters.insert(id, setter);
        Ok(())
    }

    /// End the definition phase. No further variables may be defined.
    pub fn lock(&mut self) -> Result<()> {
        self.registry.lock()?;
        let ids: Vec<VarId> = self.registry.ids().collect();
        for id in ids {
            let major = self.registry.get(id).major_layer();
            self.layers.add_member(major, id);
        }
        Ok(())
    }

    /// Register the relational-assertion bundle and the stage tree, then
    /// run the initial full propagation and activate the first stage.
    pub fn initialize(
        &mut self,
        catalog: Box<dyn DomainCatalog>,
        relations: Vec<(Expression, String)>,
        root_stage: StageDef,
    ) -> Result<()> {
        if !self.registry.is_locked() {
            return Err(EngineError::NotLocked);
        }
        if self.initialized {
            return Err(EngineError::AlreadyInitialized);
        }

        for (expr, message) in &relations {
            let compiled = compile(expr, &self.registry)?;
            self.record_relation_edges(&compiled.free_vars, compiled.antecedent_vars.as_ref());
            self.logic.add_relation(Relation {
                term: compiled.term,
                message: message.clone(),
                free_vars: compiled.free_vars,
                antecedent_vars: compiled.antecedent_vars,
            })?;
        }
        self.logic.check_consistency()?;

        self.stages = Some(StageMachine::build(&root_stage, &self.registry)?);
        self.catalog = Some(catalog);
        self.initialized = true;
        info!(
            variables = self.registry.len(),
            relations = relations.len(),
            "engine initialized"
        );

        // Initial sweep: every variable gets its options derived and its
        // validities computed, in layer order.
        for layer in 0..self.layers.layer_count() {
            let members: Vec<VarId> = self.layers.members(layer).to_vec();
            for id in members {
                self.layers.designate(layer, id, RefreshKind::Options);
            }
        }
        self.propagate();
        self.sync_stages();
        Ok(())
    }

    fn record_relation_edges(
        &mut self,
        free_vars: &std::collections::BTreeSet<usize>,
        antecedent_vars: Option<&std::collections::BTreeSet<usize>>,
    ) {
        match antecedent_vars {
            None => {
                for &a in free_vars {
                    for &b in free_vars {
                        if a != b {
                            self.registry.get_mut(VarId(a)).peers.insert(VarId(b));
                        }
                    }
                }
            }
            Some(ante) => {
                let consequents: Vec<usize> =
                    free_vars.iter().copied().filter(|v| !ante.contains(v)).collect();
                for &c in &consequents {
                    for &a in ante {
                        self.registry.get_mut(VarId(c)).parents.insert(VarId(a));
                        self.registry.get_mut(VarId(a)).children.insert(VarId(c));
                    }
                    for &other in &consequents {
                        if other != c {
                            self.registry.get_mut(VarId(c)).peers.insert(VarId(other));
                        }
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    /// Assign a value to a variable.
    ///
    /// Rejections (`NotAnOption`, `ConstraintViolation`) leave all engine
    /// state untouched. A successful assignment updates the value, refreshes
    /// the sink, records the assertion, and propagates validity updates
    /// through the layer graph before returning.
    pub fn assign(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.assign_value(name, value.into())
    }

    fn assign_value(&mut self, name: &str, value: Value) -> Result<()> {
        if self.in_propagation {
            return Err(EngineError::ReentrantAssignment(name.to_string()));
        }
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        let id = self.registry.id_of(name)?;

        {
            let var = self.registry.get(id);
            if value.kind() != var.kind {
                let found = value.kind();
                return Err(EngineError::KindMismatch {
                    var: name.to_string(),
                    value,
                    expected: var.kind,
                    found,
                });
            }
            if var.has_options() && var.option_index(&value).is_none() {
                return Err(EngineError::NotAnOption {
                    var: name.to_string(),
                    value,
                });
            }
            if var.validity_of(&value) == Some(false)
                || !self.logic.check_assignment(id, var.term_var, &value)
            {
                let messages = self.logic.retrieve_error_msgs(id, var.term_var, &value);
                return Err(EngineError::ConstraintViolation { messages });
            }
        }

        debug!(var = name, value = %value, "assigning");
        self.commit(id, value);
        self.sync_stages();
        Ok(())
    }

    /// Clear a variable back to unset and propagate.
    pub fn reset(&mut self, name: &str) -> Result<()> {
        if self.in_propagation {
            return Err(EngineError::ReentrantAssignment(name.to_string()));
        }
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        let id = self.registry.id_of(name)?;
        self.clear_variable(id);
        self.sync_stages();
        Ok(())
    }

    /// Redeclare a variable's options, replacing its option-domain
    /// assertion and recomputing validities from the new list.
    pub fn set_options(
        &mut self,
        name: &str,
        options: Vec<Value>,
        tooltips: Vec<String>,
    ) -> Result<()> {
        if self.in_propagation {
            return Err(EngineError::ReentrantAssignment(name.to_string()));
        }
        let id = self.registry.id_of(name)?;
        if options.is_empty() {
            return Err(EngineError::EmptyOptions(name.to_string()));
        }
        let kind = self.registry.get(id).kind;
        for option in &options {
            if option.kind() != kind {
                return Err(EngineError::KindMismatch {
                    var: name.to_string(),
                    value: option.clone(),
                    expected: kind,
                    found: option.kind(),
                });
            }
        }
        self.apply_options(id, options, tooltips);
        self.propagate();
        self.sync_stages();
        Ok(())
    }

    fn commit(&mut self, id: VarId, value: Value) {
        let term_var = self.registry.get(id).term_var;
        {
            let var = self.registry.get_mut(id);
            var.value = Some(value.clone());
            let display = var.display_value();
            var.sink.set_value(display);
        }
        self.logic.register_assignment(id, term_var, Some(&value));
        self.layers.designate_affected(&self.registry, id, true);
        self.propagate();
    }

    fn clear_variable(&mut self, id: VarId) {
        if self.registry.get(id).value.is_none() {
            return;
        }
        let term_var = self.registry.get(id).term_var;
        {
            let var = self.registry.get_mut(id);
            var.value = None;
            let display = var.display_value();
            var.sink.set_value(display);
        }
        self.logic.register_assignment(id, term_var, None);
        self.layers.designate_affected(&self.registry, id, true);
        self.propagate();
    }

    // ------------------------------------------------------------------
    // Propagation
    // ------------------------------------------------------------------

    /// Drain the layer queues in ascending order, revisiting each variable
    /// at most once. Nested calls (auto-assignment mid-traversal) defer to
    /// the outer drain.
    fn propagate(&mut self) {
        if self.in_propagation {
            return;
        }
        self.in_propagation = true;
        let mut visited: HashSet<VarId> = HashSet::new();
        while let Some((id, kind)) = self.layers.pop_next() {
            if !visited.insert(id) {
                continue;
            }
            match kind {
                RefreshKind::Options => self.refresh_options_of(id),
                RefreshKind::Validities => self.refresh_validities_of(id),
            }
        }
        self.in_propagation = false;
    }

    fn refresh_options_of(&mut self, id: VarId) {
        let produced = match self.setters.get(&id) {
            Some(setter) => match self.catalog.as_deref() {
                Some(catalog) => {
                    let ctx = OptionsCtx {
                        registry: &self.registry,
                        catalog,
                    };
                    setter(&ctx)
                }
                None => None,
            },
            None => None,
        };

        match produced {
            Some((options, tooltips)) => {
                let var = self.registry.get(id);
                if options.is_empty() || options.iter().any(|o| o.kind() != var.kind) {
                    warn!(var = %var.name, "options setter produced an unusable list; ignoring");
                    self.refresh_validities_of(id);
                    return;
                }
                if var.options.as_deref() == Some(options.as_slice()) {
                    self.refresh_validities_of(id);
                } else {
                    self.apply_options(id, options, tooltips);
                }
            }
            None => self.refresh_validities_of(id),
        }
    }

    fn apply_options(&mut self, id: VarId, options: Vec<Value>, tooltips: Vec<String>) {
        let term_var = self.registry.get(id).term_var;
        debug!(var = %self.registry.get(id).name, count = options.len(), "assigning options");
        self.logic.register_options(id, term_var, &options);
        let validities = self.compute_validities(id, &options);
        {
            let var = self.registry.get_mut(id);
            var.options = Some(options);
            var.validities = validities;
            var.tooltips = tooltips;
            let shown = var.display_options();
            var.sink.set_options(shown);
            let tips = var.display_tooltips();
            var.sink.set_tooltips(tips);
        }

        // Options changed, so the value must be revisited: auto-set
        // variables take the first valid option (the observer fires even
        // when it equals the old value); everything else reverts to unset.
        if self.registry.get(id).always_set {
            let first = self.registry.get(id).first_valid_option();
            match first {
                Some(first) => self.commit(id, first),
                None => self.clear_variable(id),
            }
        } else if self.registry.get(id).value.is_some() {
            self.clear_variable(id);
        }
        self.layers.designate_affected(&self.registry, id, true);
    }

    fn refresh_validities_of(&mut self, id: VarId) {
        let Some(options) = self.registry.get(id).options.clone() else {
            return;
        };
        let validities = self.compute_validities(id, &options);
        if validities == self.registry.get(id).validities {
            return;
        }
        debug!(var = %self.registry.get(id).name, "option validities changed");
        {
            let var = self.registry.get_mut(id);
            var.validities = validities;
            let shown = var.display_options();
            var.sink.set_options(shown);
            let tips = var.display_tooltips();
            var.sink.set_tooltips(tips);
            let display = var.display_value();
            var.sink.set_value(display);
        }
        let needs_auto_set = {
            let var = self.registry.get(id);
            var.always_set && var.value.is_none()
        };
        if needs_auto_set {
            let first = self.registry.get(id).first_valid_option();
            if let Some(first) = first {
                // commit designates the affected variables itself.
                self.commit(id, first);
                return;
            }
        }
        self.layers.designate_affected(&self.registry, id, false);
    }

    fn compute_validities(&self, id: VarId, options: &[Value]) -> Vec<bool> {
        let var = self.registry.get(id);
        if var.is_relational() || self.logic.is_relational_var(id) {
            self.logic.options_validities(id, var.term_var, options)
        } else {
            vec![true; options.len()]
        }
    }

    // ------------------------------------------------------------------
    // Stages
    // ------------------------------------------------------------------

    fn sync_stages(&mut self) {
        let mut rounds = 0usize;
        loop {
            let resets = {
                let Engine {
                    stages, registry, ..
                } = self;
                match stages.as_mut() {
                    Some(machine) => machine.refresh(registry),
                    None => return,
                }
            };
            if resets.is_empty() {
                return;
            }
            rounds += 1;
            if rounds > self.registry.len() + 1 {
                warn!("stage synchronization did not settle; giving up");
                return;
            }
            for id in resets {
                self.clear_variable(id);
            }
        }
    }

    /// Title of the active stage, if the case is not yet complete.
    pub fn active_stage(&self) -> Option<&str> {
        self.stages.as_ref()?.active_title()
    }

    /// Title of the first leaf stage.
    pub fn first_stage(&self) -> Option<&str> {
        self.stages.as_ref()?.first_title()
    }

    /// Whether the named stage is enabled.
    pub fn stage_enabled(&self, title: &str) -> Option<bool> {
        self.stages.as_ref()?.is_enabled(title)
    }

    /// Whether the named stage is complete.
    pub fn stage_complete(&self, title: &str) -> Option<bool> {
        self.stages.as_ref()?.is_complete(title)
    }

    /// Clear all variables of the active stage (in reverse declaration
    /// order) and re-enter it in its initial state.
    pub fn reset_active_stage(&mut self) -> Result<()> {
        if self.in_propagation {
            return Err(EngineError::ReentrantAssignment("<stage>".to_string()));
        }
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        let vars = match self.stages.as_ref() {
            Some(machine) => machine.active_vars_reversed(),
            None => Vec::new(),
        };
        for id in vars {
            self.clear_variable(id);
        }
        self.sync_stages();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Frontend events
    // ------------------------------------------------------------------

    /// Process a value-change event from a presentation sink.
    ///
    /// Invalid-marked selections surface the stored rejection reasons via
    /// the alert callback and revert the sink; constraint violations from a
    /// raced valid-marked selection do the same. Lifecycle errors still
    /// propagate to the caller.
    pub fn frontend_change(&mut self, name: &str, display: Option<&str>) -> Result<()> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        let id = self.registry.id_of(name)?;

        let Some(display) = display else {
            if self.registry.get(id).always_set {
                // Auto-set variables cannot be cleared from the frontend.
                self.refresh_sink_value(id);
                return Ok(());
            }
            return self.reset(name);
        };

        let (marker, payload) = strip_marker(display);
        let value = self.registry.get(id).kind.parse_display(payload)?;

        if marker == Some(false) {
            let term_var = self.registry.get(id).term_var;
            let messages = self.logic.retrieve_error_msgs(id, term_var, &value);
            let text = EngineError::ConstraintViolation { messages }.to_string();
            error!(var = name, "{}", text);
            self.raise_alert(&text);
            self.refresh_sink_value(id);
            return Ok(());
        }

        match self.assign_value(name, value) {
            Err(err @ EngineError::ConstraintViolation { .. }) => {
                let text = err.to_string();
                self.raise_alert(&text);
                self.refresh_sink_value(id);
                Ok(())
            }
            other => other,
        }
    }

    /// Install the alert callback used to surface expected user errors.
    pub fn set_alert(&mut self, alert: impl FnMut(&str) + 'static) {
        self.alert = Some(Box::new(alert));
    }

    fn raise_alert(&mut self, message: &str) {
        match self.alert.as_mut() {
            Some(alert) => alert(message),
            None => error!("{}", message),
        }
    }

    fn refresh_sink_value(&mut self, id: VarId) {
        let var = self.registry.get_mut(id);
        let display = var.display_value();
        var.sink.set_value(display);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Whether a variable with this name is defined.
    pub fn exists(&self, name: &str) -> bool {
        self.registry.exists(name)
    }

    /// The current value of a variable; `None` when unset or unknown.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.registry.value_of(name)
    }

    /// The declared options of a variable, in declaration order.
    pub fn options(&self, name: &str) -> Option<&[Value]> {
        let id = self.registry.id_of(name).ok()?;
        self.registry.get(id).options.as_deref()
    }

    /// The validity of every option, in declaration order.
    pub fn validities(&self, name: &str) -> Option<Vec<(Value, bool)>> {
        let id = self.registry.id_of(name).ok()?;
        let var = self.registry.get(id);
        let options = var.options.as_ref()?;
        Some(
            options
                .iter()
                .cloned()
                .zip(var.validities.iter().copied())
                .collect(),
        )
    }

    /// The validity of one option of a variable.
    pub fn validity_of(&self, name: &str, value: impl Into<Value>) -> Option<bool> {
        let id = self.registry.id_of(name).ok()?;
        self.registry.get(id).validity_of(&value.into())
    }

    /// The tooltips of a variable.
    pub fn tooltips(&self, name: &str) -> Option<&[String]> {
        let id = self.registry.id_of(name).ok()?;
        Some(self.registry.get(id).tooltips.as_slice())
    }

    /// Replace a variable's tooltips and refresh its sink.
    pub fn set_tooltips(&mut self, name: &str, tooltips: Vec<String>) -> Result<()> {
        let id = self.registry.id_of(name)?;
        let var = self.registry.get_mut(id);
        var.tooltips = tooltips;
        let shown = var.display_tooltips();
        var.sink.set_tooltips(shown);
        Ok(())
    }

    /// Replace a variable's presentation sink, transferring current
    /// options, tooltips, and value onto the new sink.
    pub fn set_sink(&mut self, name: &str, sink: Box<dyn PresentationSink>) -> Result<()> {
        let id = self.registry.id_of(name)?;
        let var = self.registry.get_mut(id);
        var.sink = sink;
        let shown = var.display_options();
        var.sink.set_options(shown);
        let tips = var.display_tooltips();
        var.sink.set_tooltips(tips);
        let display = var.display_value();
        var.sink.set_value(display);
        Ok(())
    }

    /// Whether the definition phase has ended.
    pub fn is_locked(&self) -> bool {
        self.registry.is_locked()
    }

    /// Whether `initialize` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
