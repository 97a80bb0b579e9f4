#![warn(missing_docs)]
#![deny(unsafe_code)]

//! casegen solver: the SMT backend adapter.
//!
//! The engine talks to satisfiability through a deliberately narrow surface
//! ([`SmtSolver`]: `add`, `push`, `pop`, `check` under assumptions) so the
//! backend is swappable. The built-in backend is a finite-model search
//! solver that is complete for the engine's assertion fragment: option-domain
//! disjunctions, variable/constant comparisons, and boolean connectives.

pub mod compile;
pub mod search;
pub mod solver;
pub mod term;

pub use compile::{compile, CompileError, Compiled, VarResolver};
pub use search::evaluate;
pub use solver::{SatResult, SmtSolver, Solver};
pub use term::{Sort, Term, TermVar};
