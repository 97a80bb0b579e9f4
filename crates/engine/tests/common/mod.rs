//! Shared headless fixture: a small component/grid catalog, the standard
//! relation set, the layer layout, and the stage tree of the case builder.
#![allow(dead_code)]

use casegen_core::{
    all_of, any_of, implies, var, when, ComponentClass, ComponentModel, ComponentPhysics,
    DomainCatalog, Expression, GridDescriptor, Value, ValueKind,
};
use casegen_engine::{Engine, OptionsSetter, StageDef, VarSpec};
use std::collections::BTreeMap;

/// In-memory domain catalog with CESM-flavored component metadata.
pub struct FixtureCatalog {
    components: BTreeMap<ComponentClass, Vec<ComponentModel>>,
    grids: Vec<GridDescriptor>,
}

impl DomainCatalog for FixtureCatalog {
    fn components(&self, class: ComponentClass) -> &[ComponentModel] {
        self.components.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    fn grids(&self) -> &[GridDescriptor] {
        &self.grids
    }
}

fn model(name: &str, physics: &[(&str, &[&str])]) -> ComponentModel {
    ComponentModel {
        name: name.to_string(),
        physics: physics
            .iter()
            .map(|(phys, options)| ComponentPhysics {
                name: phys.to_string(),
                options: options.iter().map(|o| o.to_string()).collect(),
            })
            .collect(),
    }
}

pub fn catalog() -> FixtureCatalog {
    let mut components = BTreeMap::new();
    components.insert(
        ComponentClass::Atm,
        vec![
            model("cam", &[("CAM60", &["(none)", "SCAM"])]),
            model("datm", &[("DATM", &["(none)", "CLM_QIAN", "CRUv7"])]),
            model("satm", &[("SATM", &["(none)"])]),
        ],
    );
    components.insert(
        ComponentClass::Lnd,
        vec![
            model("clm", &[("CLM50", &["(none)", "SP", "BGC"])]),
            model("dlnd", &[("DLND", &["(none)", "LCLM"])]),
            model("slim", &[("SLIM", &["(none)"])]),
            model("slnd", &[("SLND", &["(none)"])]),
        ],
    );
    components.insert(
        ComponentClass::Ice,
        vec![
            model("cice", &[("CICE", &["(none)"])]),
            model("dice", &[("DICE", &["(none)", "SSMI"])]),
            model("sice", &[("SICE", &["(none)"])]),
        ],
    );
    components.insert(
        ComponentClass::Ocn,
        vec![
            model("mom", &[("MOM6", &["(none)"])]),
            model("pop", &[("POP2", &["(none)"])]),
            model("docn", &[("DOCN", &["(none)", "SOM", "SSTDATA"])]),
            model("socn", &[("SOCN", &["(none)"])]),
        ],
    );
    components.insert(
        ComponentClass::Rof,
        vec![
            model("rtm", &[("RTM", &["(none)"])]),
            model("mosart", &[("MOSART", &["(none)"])]),
            model("drof", &[("DROF", &["(none)", "NYF"])]),
            model("srof", &[("SROF", &["(none)"])]),
        ],
    );
    components.insert(
        ComponentClass::Glc,
        vec![
            model("cism", &[("CISM2", &["(none)", "EVOLVE"])]),
            model("sglc", &[("SGLC", &["(none)"])]),
        ],
    );
    components.insert(
        ComponentClass::Wav,
        vec![
            model("ww3", &[("WW3", &["(none)"])]),
            model("dwav", &[("DWAV", &["(none)", "CLIMO"])]),
            model("swav", &[("SWAV", &["(none)"])]),
        ],
    );
    let grids = vec![
        GridDescriptor {
            name: "TL319".to_string(),
            nominal_resolution: "0.5deg".to_string(),
            cyclic_x: true,
            cyclic_y: false,
        },
        GridDescriptor {
            name: "T62".to_string(),
            nominal_resolution: "2deg".to_string(),
            cyclic_x: true,
            cyclic_y: false,
        },
    ];
    FixtureCatalog { components, grids }
}

/// The standard relational-assertion bundle, in registration order.
pub fn relations() -> Vec<(Expression, String)> {
    let mut out: Vec<(Expression, String)> = Vec::new();
    let mut rel = |expr: Expression, msg: &str| out.push((expr, msg.to_string()));

    // Unconditional assertions (invariants).
    rel(
        implies(
            var("COMP_ICE").eq("sice"),
            all_of([
                var("COMP_LND").eq("slnd"),
                var("COMP_OCN").eq("socn"),
                var("COMP_ROF").eq("srof"),
                var("COMP_GLC").eq("sglc"),
            ]),
        ),
        "If COMP_ICE is stub, all other components must be stub (except for ATM).",
    );
    rel(
        implies(var("COMP_OCN").eq("mom"), var("COMP_WAV").ne("dwav")),
        "MOM6 cannot be coupled with data wave component.",
    );
    rel(
        implies(var("COMP_ATM").eq("cam"), var("COMP_ICE").ne("dice")),
        "CAM cannot be coupled with Data ICE.",
    );
    rel(
        implies(var("COMP_WAV").eq("ww3"), var("COMP_OCN").is_in(["mom", "pop"])),
        "WW3 can only be selected if either POP2 or MOM6 is the ocean component.",
    );
    rel(
        implies(var("COMP_ROF").is_in(["rtm", "mosart"]), var("COMP_LND").eq("clm")),
        "Active runoff models can only be selected if CLM is the land component.",
    );
    rel(
        implies(
            all_of([var("COMP_OCN").is_in(["pop", "mom"]), var("COMP_ATM").eq("datm")]),
            var("COMP_LND").eq("slnd"),
        ),
        "When MOM|POP is forced with DATM, LND must be stub.",
    );
    rel(
        implies(
            var("COMP_OCN").eq("mom"),
            any_of([var("COMP_LND").ne("slnd"), var("COMP_ICE").ne("sice")]),
        ),
        "LND or ICE must be present to hide MOM6 grid poles.",
    );
    rel(
        implies(
            all_of([var("COMP_ATM").eq("datm"), var("COMP_LND").eq("clm")]),
            all_of([var("COMP_ICE").eq("sice"), var("COMP_OCN").eq("socn")]),
        ),
        "If CLM is coupled with DATM, then both ICE and OCN must be stub.",
    );

    // Preconditioned assertions (when-clauses).
    rel(
        when(var("COMP_OCN").eq("docn"), var("COMP_OCN_OPTION").ne("(none)")),
        "Must pick a valid DOCN option.",
    );
    rel(
        when(var("COMP_ICE").eq("dice"), var("COMP_ICE_OPTION").ne("(none)")),
        "Must pick a valid DICE option.",
    );
    rel(
        when(var("COMP_ATM").eq("datm"), var("COMP_ATM_OPTION").ne("(none)")),
        "Must pick a valid DATM option.",
    );
    rel(
        when(var("COMP_ROF").eq("drof"), var("COMP_ROF_OPTION").ne("(none)")),
        "Must pick a valid DROF option.",
    );
    rel(
        when(var("COMP_WAV").eq("dwav"), var("COMP_WAV_OPTION").ne("(none)")),
        "Must pick a valid DWAV option.",
    );
    rel(
        when(
            var("COMP_LND").is_in(["clm", "dlnd"]),
            var("COMP_LND_OPTION").ne("(none)"),
        ),
        "Must pick a valid LND option.",
    );
    rel(
        when(var("COMP_GLC").eq("cism"), var("COMP_GLC_OPTION").ne("(none)")),
        "Must pick a valid GLC option.",
    );
    rel(
        when(
            all_of([var("COMP_ICE").eq("cice"), var("COMP_OCN").eq("docn")]),
            var("COMP_OCN_OPTION").eq("SOM"),
        ),
        "When DOCN is coupled with CICE, DOCN option must be set to SOM.",
    );

    // Custom ocean grid constraints.
    rel(
        when(var("OCN_GRID_EXTENT").eq("Global"), var("OCN_CYCLIC_X").eq("True")),
        "Global ocean grids must be zonally reentrant.",
    );
    rel(
        when(var("OCN_GRID_EXTENT").eq("Global"), var("OCN_LENX").eq(360.0)),
        "Global ocean grids must span 360 degrees in the zonal direction.",
    );
    rel(
        when(var("OCN_GRID_EXTENT").eq("Global"), var("OCN_LENY").le(180.0)),
        "Ocean grids cannot span more than 180 degrees in the meridional direction.",
    );

    out
}

fn phys_setter(class: ComponentClass) -> OptionsSetter {
    let comp_name = format!("COMP_{}", class.tag());
    Box::new(move |ctx| {
        let component = ctx.str_value(&comp_name)?;
        let physics = ctx.catalog().physics_of(class, component)?;
        let options: Vec<Value> = physics.iter().map(|p| Value::from(p.name.as_str())).collect();
        let tooltips: Vec<String> = physics.iter().map(|p| p.name.clone()).collect();
        Some((options, tooltips))
    })
}

fn option_setter(class: ComponentClass) -> OptionsSetter {
    let comp_name = format!("COMP_{}", class.tag());
    let phys_name = format!("COMP_{}_PHYS", class.tag());
    Box::new(move |ctx| {
        let component = ctx.str_value(&comp_name)?;
        let physics_name = ctx.str_value(&phys_name)?;
        let physics = ctx.catalog().physics_of(class, component)?;
        let physics = physics.iter().find(|p| p.name == physics_name)?;
        let options: Vec<Value> = physics
            .options
            .iter()
            .map(|o| Value::from(o.as_str()))
            .collect();
        Some((options, physics.options.clone()))
    })
}

fn grid_setter() -> OptionsSetter {
    Box::new(move |ctx| {
        let options: Vec<Value> = ctx
            .catalog()
            .grids()
            .iter()
            .map(|g| Value::from(g.name.as_str()))
            .collect();
        let tooltips: Vec<String> = ctx
            .catalog()
            .grids()
            .iter()
            .map(|g| g.nominal_resolution.clone())
            .collect();
        Some((options, tooltips))
    })
}

/// The stage tree of the case builder.
pub fn stage_tree() -> StageDef {
    StageDef::new("Case")
        .substage(
            StageDef::new("1. Compset")
                .substage(StageDef::new("Compset Mode").vars(["COMPSET_MODE", "INITTIME"]))
                .substage(StageDef::new("Components").vars([
                    "COMP_ATM", "COMP_LND", "COMP_ICE", "COMP_OCN", "COMP_ROF", "COMP_GLC",
                    "COMP_WAV",
                ]))
                .substage(StageDef::new("Component Physics").vars([
                    "COMP_ATM_PHYS",
                    "COMP_LND_PHYS",
                    "COMP_ICE_PHYS",
                    "COMP_OCN_PHYS",
                    "COMP_ROF_PHYS",
                    "COMP_GLC_PHYS",
                    "COMP_WAV_PHYS",
                ]))
                .substage(StageDef::new("Component Options").vars([
                    "COMP_ATM_OPTION",
                    "COMP_LND_OPTION",
                    "COMP_ICE_OPTION",
                    "COMP_OCN_OPTION",
                    "COMP_ROF_OPTION",
                    "COMP_GLC_OPTION",
                    "COMP_WAV_OPTION",
                ])),
        )
        .substage(
            StageDef::new("2. Grid")
                .substage(StageDef::new("Grid Mode").vars(["GRID_MODE"]))
                .substage(
                    StageDef::new("Custom Grid")
                        .guard(var("GRID_MODE").eq("Custom"))
                        .substage(StageDef::new("Atmosphere Grid").vars(["CUSTOM_ATM_GRID"]))
                        .substage(StageDef::new("Ocean Grid Mode").vars(["OCN_GRID_MODE"]))
                        .substage(
                            StageDef::new("Custom Ocean Grid")
                                .guard(var("OCN_GRID_MODE").eq("Create New"))
                                .vars([
                                    "OCN_GRID_EXTENT",
                                    "OCN_CYCLIC_X",
                                    "OCN_NX",
                                    "OCN_NY",
                                    "OCN_LENX",
                                    "OCN_LENY",
                                    "CUSTOM_OCN_GRID_NAME",
                                ]),
                        ),
                ),
        )
}

/// Install a tracing subscriber once so `RUST_LOG=debug` surfaces engine
/// internals during test runs.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fully initialized engine over the fixture catalog, relations, and
/// stage tree.
pub fn engine() -> Engine {
    init_tracing();
    let mut eng = Engine::new();
    let cat = catalog();

    eng.define(
        "COMPSET_MODE",
        VarSpec::new(ValueKind::Str).options(["Standard", "Custom"]),
    )
    .unwrap();
    eng.define(
        "INITTIME",
        VarSpec::new(ValueKind::Str).options(["1850", "2000", "HIST"]),
    )
    .unwrap();

    let phys_layer = eng.new_layer();
    let option_layer = eng.new_layer();

    for class in ComponentClass::ALL {
        let comp = format!("COMP_{}", class.tag());
        let phys = format!("COMP_{}_PHYS", class.tag());
        let option = format!("COMP_{}_OPTION", class.tag());

        let names: Vec<&str> = cat
            .components(class)
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        eng.define(&comp, VarSpec::new(ValueKind::Str).options(names))
            .unwrap();
        eng.define(&phys, VarSpec::new(ValueKind::Str)).unwrap();
        eng.define(
            &option,
            VarSpec::new(ValueKind::Str).always_set().hide_invalid(),
        )
        .unwrap();

        eng.place_in_layer(&phys, phys_layer).unwrap();
        eng.place_in_layer(&option, option_layer).unwrap();

        eng.set_options_setter(&phys, &[comp.as_str()], phys_setter(class))
            .unwrap();
        eng.set_options_setter(&option, &[comp.as_str(), phys.as_str()], option_setter(class))
            .unwrap();
    }

    eng.define(
        "GRID_MODE",
        VarSpec::new(ValueKind::Str).options(["Standard", "Custom"]),
    )
    .unwrap();
    eng.define("CUSTOM_ATM_GRID", VarSpec::new(ValueKind::Str))
        .unwrap();
    eng.set_options_setter("CUSTOM_ATM_GRID", &[], grid_setter())
        .unwrap();
    eng.define(
        "OCN_GRID_MODE",
        VarSpec::new(ValueKind::Str).options(["Standard", "Create New"]),
    )
    .unwrap();
    eng.define(
        "OCN_GRID_EXTENT",
        VarSpec::new(ValueKind::Str).options(["Global", "Regional"]),
    )
    .unwrap();
    eng.define(
        "OCN_CYCLIC_X",
        VarSpec::new(ValueKind::Str).options(["True", "False"]),
    )
    .unwrap();
    eng.define("OCN_NX", VarSpec::new(ValueKind::Int)).unwrap();
    eng.define("OCN_NY", VarSpec::new(ValueKind::Int)).unwrap();
    eng.define("OCN_LENX", VarSpec::new(ValueKind::Real)).unwrap();
    eng.define("OCN_LENY", VarSpec::new(ValueKind::Real)).unwrap();
    eng.define("CUSTOM_OCN_GRID_NAME", VarSpec::new(ValueKind::Str))
        .unwrap();

    eng.lock().unwrap();
    eng.initialize(Box::new(cat), relations(), stage_tree())
        .unwrap();
    eng
}

/// Names of every variable the fixture defines, for state snapshots.
pub fn all_var_names() -> Vec<String> {
    let mut names = vec!["COMPSET_MODE".to_string(), "INITTIME".to_string()];
    for class in ComponentClass::ALL {
        names.push(format!("COMP_{}", class.tag()));
        names.push(format!("COMP_{}_PHYS", class.tag()));
        names.push(format!("COMP_{}_OPTION", class.tag()));
    }
    for name in [
        "GRID_MODE",
        "CUSTOM_ATM_GRID",
        "OCN_GRID_MODE",
        "OCN_GRID_EXTENT",
        "OCN_CYCLIC_X",
        "OCN_NX",
        "OCN_NY",
        "OCN_LENX",
        "OCN_LENY",
        "CUSTOM_OCN_GRID_NAME",
    ] {
        names.push(name.to_string());
    }
    names
}

/// Observable engine state: every variable's value, options, and validities.
pub type Snapshot = Vec<(String, Option<Value>, Option<Vec<(Value, bool)>>)>;

pub fn snapshot(eng: &Engine) -> Snapshot {
    all_var_names()
        .into_iter()
        .map(|name| {
            let value = eng.value(&name).cloned();
            let validities = eng.validities(&name);
            (name, value, validities)
        })
        .collect()
}
