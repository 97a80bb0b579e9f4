//! Domain catalog contract.
//!
//! The engine never reads component or grid metadata itself; the host hands
//! it an opaque [`DomainCatalog`] supplier. Options setters receive the
//! catalog during propagation to derive option lists (e.g. the physics
//! options of the selected atmosphere component).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven component classes of the coupled model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentClass {
    /// Atmosphere.
    Atm,
    /// Land.
    Lnd,
    /// Sea ice.
    Ice,
    /// Ocean.
    Ocn,
    /// River runoff.
    Rof,
    /// Land ice.
    Glc,
    /// Wave.
    Wav,
}

impl ComponentClass {
    /// All classes in coupler order.
    pub const ALL: [ComponentClass; 7] = [
        Self::Atm,
        Self::Lnd,
        Self::Ice,
        Self::Ocn,
        Self::Rof,
        Self::Glc,
        Self::Wav,
    ];

    /// Upper-case class tag as used in variable names (`COMP_ATM`, ...).
    pub fn tag(self) -> &'static str {
        match self {
            Self::Atm => "ATM",
            Self::Lnd => "LND",
            Self::Ice => "ICE",
            Self::Ocn => "OCN",
            Self::Rof => "ROF",
            Self::Glc => "GLC",
            Self::Wav => "WAV",
        }
    }
}

impl fmt::Display for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// One selectable physics version of a component, with its modifier options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPhysics {
    /// Physics identifier, e.g. `CAM60`.
    pub name: String,
    /// Physics modifier options, e.g. `(none)`, `SP`, `BGC`.
    pub options: Vec<String>,
}

/// One selectable component model within a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentModel {
    /// Component identifier, e.g. `cam` or `dice`.
    pub name: String,
    /// Available physics versions, in catalog order.
    pub physics: Vec<ComponentPhysics>,
}

/// A model grid known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDescriptor {
    /// Grid name, e.g. `TL319`.
    pub name: String,
    /// Nominal resolution label, e.g. `1deg`.
    pub nominal_resolution: String,
    /// Whether the grid is zonally reentrant.
    pub cyclic_x: bool,
    /// Whether the grid is meridionally reentrant.
    pub cyclic_y: bool,
}

/// Supplier of component and grid metadata, provided by the host.
pub trait DomainCatalog {
    /// The selectable component models of a class, in catalog order.
    fn components(&self, class: ComponentClass) -> &[ComponentModel];

    /// The grids known to the catalog.
    fn grids(&self) -> &[GridDescriptor];

    /// Physics versions of a named component, if the component exists.
    fn physics_of(&self, class: ComponentClass, component: &str) -> Option<&[ComponentPhysics]> {
        self.components(class)
            .iter()
            .find(|m| m.name == component)
            .map(|m| m.physics.as_slice())
    }
}
