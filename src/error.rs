//! Error types
//!
//! One top-level [`ForgeError`] with nested enums for the three places a
//! revised signature can go wrong: building it ([`SignatureError`]), binding a
//! call against it ([`BindingError`]) and wiring it onto a target callable
//! ([`MappingError`]).

use thiserror::Error;

use crate::native::ParameterKind;

pub type Result<T, E = ForgeError> = std::result::Result<T, E>;

// =============================================================================
// TOP-LEVEL ERROR
// =============================================================================

#[derive(Debug, Error)]
pub enum ForgeError {
    /// Attribute assignment on a frozen record
    #[error("cannot assign to field '{field}'")]
    ImmutableInstance { field: String },

    /// Lookup of a parameter that is not declared
    #[error("{0}")]
    NoParameter(String),

    /// A revision could not be applied to the previous signature
    #[error("{0}")]
    Revision(String),

    #[error("expected either 'default' or 'factory', received both")]
    DefaultAndFactory,

    #[error("Cannot generate an unnamed parameter")]
    UnnamedParameter,

    #[error("{0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Argument sorting against a target signature failed
    #[error("{0}")]
    Sort(String),

    /// Raised by a user-supplied factory, converter, validator or wrapped
    /// callable. Passed through untouched.
    #[error(transparent)]
    Callback(#[from] anyhow::Error),
}

impl ForgeError {
    pub fn no_parameter(owner: &str, name: &str) -> Self {
        ForgeError::NoParameter(format!("'{}' has no parameter '{}'", owner, name))
    }

    /// The user error behind a `Callback`, if this is one.
    pub fn callback(&self) -> Option<&anyhow::Error> {
        match self {
            ForgeError::Callback(err) => Some(err),
            _ => None,
        }
    }
}

// =============================================================================
// SIGNATURE CONSTRUCTION
// =============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Received unnamed FParameter: '{0}'")]
    UnnamedParameter(String),

    #[error("Only the first FParameter can be contextual")]
    ContextualNotFirst,

    #[error("Received multiple FParameters with name '{0}'")]
    DuplicateName(String),

    #[error("Received multiple FParameters with interface_name '{0}'")]
    DuplicateInterfaceName(String),

    #[error("{current} of kind '{current_kind}' follows {last} of kind '{last_kind}'")]
    KindOrder {
        current: String,
        current_kind: ParameterKind,
        last: String,
        last_kind: ParameterKind,
    },

    #[error("Received multiple variable-positional FParameters")]
    MultipleVarPositional,

    #[error("Received multiple variable-keyword FParameters")]
    MultipleVarKeyword,

    #[error("non-default FParameter follows default FParameter")]
    NonDefaultFollowsDefault,
}

// =============================================================================
// CALL BINDING
// =============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("{}too many positional arguments", prefix(.callable))]
    TooManyPositional { callable: String },

    #[error("{}missing a required argument: '{}'", prefix(.callable), .name)]
    MissingArgument { callable: String, name: String },

    #[error("{}got an unexpected keyword argument '{}'", prefix(.callable), .name)]
    UnexpectedKeyword { callable: String, name: String },

    #[error("{}multiple values for argument '{}'", prefix(.callable), .name)]
    MultipleValues { callable: String, name: String },

    #[error(
        "{}'{}' parameter is positional only, but was passed as a keyword",
        prefix(.callable),
        .name
    )]
    PositionalOnlyAsKeyword { callable: String, name: String },
}

/// `name() ` when binding on behalf of a named callable, nothing otherwise.
fn prefix(callable: &str) -> String {
    if callable.is_empty() {
        String::new()
    } else {
        format!("{}() ", callable)
    }
}

// =============================================================================
// SIGNATURE -> CALLABLE MAPPING
// =============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("Missing requisite mapping to non-default {kind} parameter '{name}'")]
    MissingTarget { kind: &'static str, name: String },

    #[error("Missing requisite mapping from {kind} parameter '{name}'")]
    MissingVariadicTarget { kind: &'static str, name: String },

    #[error("Missing requisite mapping from parameters ({})", .0.join(", "))]
    Unmapped(Vec<String>),
}
