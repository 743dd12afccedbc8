//! sigforge: signature revision and argument mapping for dynamic callables
//!
//! Redefine the calling convention a function exposes (parameter kinds,
//! names, defaults, conversion and validation) while the wrapped function
//! keeps receiving arguments under its own names.
//!
//! - Parameter model (FParameter, VarPositional, VarKeyword)
//! - Validated revised signatures (FSignature)
//! - Call binding and redistribution (CallArguments, BoundArguments)
//! - The call-time mapper and forged wrappers (Mapper, Forged)
//! - Revisions that derive one signature from another (compose)
//! - Process-wide validator switch and YAML/env configuration

pub mod binding;
pub mod compose;
pub mod config;
pub mod error;
pub mod function;
pub mod hook;
pub mod immutable;
pub mod mapper;
pub mod marker;
pub mod native;
pub mod parameter;
pub mod signature;
pub mod utils;
pub mod variadic;

// Re-export commonly used types
pub use binding::{BoundArguments, CallArguments};
pub use compose::{Position, Revision, Selector};
pub use config::{get_run_validators, set_run_validators, ForgeConfig};
pub use error::{BindingError, ForgeError, MappingError, Result, SignatureError};
pub use function::{sign, Callable, Forged};
pub use hook::{Converter, Factory, Hook, Validator};
pub use immutable::Immutable;
pub use mapper::Mapper;
pub use marker::VOID;
pub use native::{ParamDefault, Parameter, ParameterKind, Signature};
pub use parameter::{FParameter, FParameterBuilder};
pub use signature::FSignature;
pub use variadic::{VarKeyword, VarPositional};
