#![warn(missing_docs)]
#![deny(unsafe_code)]

//! casegen engine: the configuration constraint engine.
//!
//! An [`Engine`] owns a registry of typed configuration variables, the
//! logic engine storing assignment/option/relational assertions, a layer
//! graph for incremental validity propagation, and a stage machine gating
//! the editing flow. Hosts define variables, lock the registry, initialize
//! with a domain catalog, a relational-assertion bundle, and a stage tree,
//! and then drive everything through [`Engine::assign`] and
//! [`Engine::reset`].

mod explain;
mod layers;
mod logic;
mod registry;

pub mod engine;
pub mod error;
pub mod sink;
pub mod stage;
pub mod variable;

pub use engine::{Engine, OptionsCtx, OptionsSetter};
pub use error::{EngineError, Result};
pub use sink::{NullSink, PresentationSink, INVALID_GLYPH, VALID_GLYPH};
pub use stage::StageDef;
pub use variable::{VarId, VarSpec};
