//! Engine error taxonomy.

use casegen_core::{ParseValueError, Value, ValueKind};
use casegen_solver::CompileError;
use thiserror::Error;

/// The result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the configuration constraint engine.
///
/// `ConstraintViolation` and `NotAnOption` are expected user errors: the
/// engine rolls the tentative state back and stays usable. Everything else
/// signals a lifecycle or configuration mistake by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A variable with this name is already defined.
    #[error("attempted to re-define variable '{0}'")]
    Redefinition(String),

    /// The registry is locked; no further variables may be defined.
    #[error("registry is locked; cannot define variable '{0}'")]
    RegistryLocked(String),

    /// `lock` was called before any variable was defined.
    #[error("no variables defined yet, so the registry cannot be locked")]
    EmptyRegistry,

    /// `lock` was called twice.
    #[error("registry is already locked")]
    AlreadyLocked,

    /// `initialize` was called before `lock`.
    #[error("registry must be locked before the engine is initialized")]
    NotLocked,

    /// An operation that needs relations and stages ran before `initialize`.
    #[error("engine is not initialized yet")]
    NotInitialized,

    /// `initialize` was called twice.
    #[error("engine is already initialized")]
    AlreadyInitialized,

    /// The named variable does not exist.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// A value's kind does not match the variable's kind.
    #[error("value '{value}' is {found}, but variable '{var}' is {expected}")]
    KindMismatch {
        /// Variable name.
        var: String,
        /// The offending value.
        value: Value,
        /// The variable's kind.
        expected: ValueKind,
        /// The value's kind.
        found: ValueKind,
    },

    /// The value is outside the variable's declared options.
    #[error("'{value}' is not an option of variable '{var}'")]
    NotAnOption {
        /// Variable name.
        var: String,
        /// The offending value.
        value: Value,
    },

    /// The assignment violated one or more relational assertions.
    #[error("constraint violation:\n{}", .messages.join("\n"))]
    ConstraintViolation {
        /// Error messages of every violated relation, in registration order.
        messages: Vec<String>,
    },

    /// The same relational assertion was registered twice.
    #[error("relational assertion registered twice: {0}")]
    DuplicateRelation(String),

    /// The relation bundle is unsatisfiable before any assignment.
    #[error("the relational assertion set is unsatisfiable on its own")]
    InconsistentRelations,

    /// A layer membership would outrank the variable's major layer.
    #[error("variable '{0}' cannot join a layer at or above its major layer's priority")]
    LayerPriorityInversion(String),

    /// `assign` was entered from within validity propagation.
    #[error("reentrant assignment of variable '{0}' during propagation")]
    ReentrantAssignment(String),

    /// An options list must not be empty.
    #[error("options list of variable '{0}' cannot be empty")]
    EmptyOptions(String),

    /// A relational assertion or stage guard failed to compile.
    #[error("invalid relational assertion: {0}")]
    Compile(#[from] CompileError),

    /// A sink display string could not be parsed into a typed value.
    #[error(transparent)]
    Parse(#[from] ParseValueError),
}
