//! Signature revisions
//!
//! A [`Revision`] turns one [`FSignature`] into another. Revisions are plain
//! values, so they can be stored, batched and applied to any number of
//! callables. Parameters are selected by internal name (or predicate), and
//! every result is re-validated as a whole.
//!
//! # Usage
//!
//! ```
//! use serde_json::{json, Value};
//! use sigforge::compose::{Batch, Insert, Modify, ParameterPatch, Position, Revision};
//! use sigforge::{CallArguments, Callable, FParameter, Parameter, ParameterKind, Signature};
//!
//! let inner = Callable::new(
//!     "greet",
//!     Signature::new(vec![
//!         Parameter::new("name", ParameterKind::PositionalOrKeyword),
//!         Parameter::new("kwargs", ParameterKind::VarKeyword),
//!     ]),
//!     |arguments| Ok(arguments.kwargs()["name"].clone()),
//! );
//!
//! let revision = Batch::new()
//!     .then(Modify::new("name", ParameterPatch::new().default(json!("world"))))
//!     .then(Insert::new(
//!         FParameter::keyword_only("loud").default(json!(false)).build().unwrap(),
//!         Position::Index(1),
//!     ));
//! let forged = revision.forge(inner).unwrap();
//!
//! assert_eq!(forged.signature().to_string(), "(name=world, *, loud=false, **kwargs)");
//! assert_eq!(forged.call(CallArguments::default()).unwrap(), Value::from("world"));
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ForgeError, Result};
use crate::function::{Callable, Forged};
use crate::hook::{Converter, Validator};
use crate::native::{ParamDefault, ParameterKind};
use crate::parameter::FParameter;
use crate::signature::FSignature;

pub trait Revision {
    fn revise(&self, previous: &FSignature) -> Result<FSignature>;

    /// Wrap `callable`, starting from its own signature.
    fn forge(&self, callable: Callable) -> Result<Forged> {
        let fsignature = FSignature::from_callable(&callable)?;
        let revised = self.revise(&fsignature)?;
        debug!(callable = callable.name(), signature = %revised, "forged");
        Forged::new(revised, callable)
    }
}

// =============================================================================
// SELECTORS
// =============================================================================

pub type PredicateFn = dyn Fn(&FParameter) -> bool + Send + Sync;

#[derive(Clone)]
pub enum Selector {
    Name(String),
    Names(Vec<String>),
    Predicate(Arc<PredicateFn>),
}

impl Selector {
    pub fn predicate(func: impl Fn(&FParameter) -> bool + Send + Sync + 'static) -> Self {
        Selector::Predicate(Arc::new(func))
    }

    pub fn matches(&self, param: &FParameter) -> bool {
        match self {
            Selector::Name(name) => param.name() == Some(name.as_str()),
            Selector::Names(names) => param
                .name()
                .is_some_and(|name| names.iter().any(|n| n == name)),
            Selector::Predicate(func) => func(param),
        }
    }

    fn find(&self, parameters: &[FParameter]) -> Option<usize> {
        parameters.iter().position(|p| self.matches(p))
    }

    fn find_or_raise(&self, parameters: &[FParameter]) -> Result<usize> {
        self.find(parameters)
            .ok_or_else(|| ForgeError::Revision(format!("No parameter matched selector '{}'", self)))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Name(name) => f.write_str(name),
            Selector::Names(names) => write!(f, "{}", names.join(", ")),
            Selector::Predicate(_) => f.write_str("<predicate>"),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({})", self)
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Name(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Name(name)
    }
}

impl From<Vec<&str>> for Selector {
    fn from(names: Vec<&str>) -> Self {
        Selector::Names(names.into_iter().map(str::to_string).collect())
    }
}

#[derive(Debug, Clone)]
pub enum Position {
    Index(usize),
    Before(Selector),
    After(Selector),
}

impl Position {
    fn resolve(&self, parameters: &[FParameter]) -> Result<usize> {
        match self {
            Position::Index(index) => Ok((*index).min(parameters.len())),
            Position::Before(selector) => selector.find_or_raise(parameters),
            Position::After(selector) => {
                let last = parameters
                    .iter()
                    .rposition(|p| selector.matches(p))
                    .ok_or_else(|| {
                        ForgeError::Revision(format!(
                            "No parameter matched selector '{}'",
                            selector
                        ))
                    })?;
                Ok(last + 1)
            }
        }
    }
}

// =============================================================================
// REVISIONS
// =============================================================================

/// Leaves the signature as it is.
#[derive(Debug, Clone, Default)]
pub struct Identity;

impl Revision for Identity {
    fn revise(&self, previous: &FSignature) -> Result<FSignature> {
        Ok(previous.clone())
    }
}

/// Applies revisions in order, each to the result of the last.
#[derive(Default)]
pub struct Batch {
    revisions: Vec<Box<dyn Revision + Send + Sync>>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, revision: impl Revision + Send + Sync + 'static) -> Self {
        self.revisions.push(Box::new(revision));
        self
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

impl Revision for Batch {
    fn revise(&self, previous: &FSignature) -> Result<FSignature> {
        self.revisions
            .iter()
            .try_fold(previous.clone(), |fsignature, revision| revision.revise(&fsignature))
    }
}

/// Discards the previous parameters in favour of exactly these.
#[derive(Debug, Clone)]
pub struct Synthesize {
    parameters: Vec<FParameter>,
}

impl Synthesize {
    pub fn new(parameters: impl IntoIterator<Item = FParameter>) -> Self {
        Self {
            parameters: parameters.into_iter().collect(),
        }
    }
}

impl Revision for Synthesize {
    fn revise(&self, previous: &FSignature) -> Result<FSignature> {
        previous.replace_parameters(self.parameters.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Delete {
    selector: Selector,
    multiple: bool,
    raising: bool,
}

impl Delete {
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            selector: selector.into(),
            multiple: false,
            raising: true,
        }
    }

    /// Remove every match rather than the first.
    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// Whether a selector that matches nothing is an error.
    pub fn raising(mut self, raising: bool) -> Self {
        self.raising = raising;
        self
    }
}

impl Revision for Delete {
    fn revise(&self, previous: &FSignature) -> Result<FSignature> {
        let mut parameters = previous.parameters().to_vec();
        let before = parameters.len();

        if self.multiple {
            parameters.retain(|p| !self.selector.matches(p));
        } else if let Some(index) = self.selector.find(&parameters) {
            parameters.remove(index);
        }

        if parameters.len() == before && self.raising {
            return Err(ForgeError::Revision(format!(
                "No parameter matched selector '{}'",
                self.selector
            )));
        }
        previous.replace_parameters(parameters)
    }
}

#[derive(Debug, Clone)]
pub struct Insert {
    parameters: Vec<FParameter>,
    position: Position,
}

impl Insert {
    pub fn new(parameters: impl IntoIterator<Item = FParameter>, position: Position) -> Self {
        Self {
            parameters: parameters.into_iter().collect(),
            position,
        }
    }
}

impl Revision for Insert {
    fn revise(&self, previous: &FSignature) -> Result<FSignature> {
        let mut parameters = previous.parameters().to_vec();
        let index = self.position.resolve(&parameters)?;
        parameters.splice(index..index, self.parameters.iter().cloned());
        previous.replace_parameters(parameters)
    }
}

/// Field overrides for [`Modify`]. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct ParameterPatch {
    kind: Option<ParameterKind>,
    name: Option<String>,
    interface_name: Option<String>,
    default: Option<ParamDefault>,
    type_hint: Option<String>,
    converters: Option<Vec<Converter>>,
    validators: Option<Vec<Validator>>,
    contextual: Option<bool>,
}

impl ParameterPatch {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    pub fn kind(mut self, kind: ParameterKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn interface_name(mut self, interface_name: impl Into<String>) -> Self {
        self.interface_name = Some(interface_name.into());
        self
    }

    pub fn default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(ParamDefault::Value(default));
        self
    }

    pub fn factory(mut self, factory: crate::hook::Factory) -> Self {
        self.default = Some(ParamDefault::Factory(factory));
        self
    }

    pub fn no_default(mut self) -> Self {
        self.default = Some(ParamDefault::Empty);
        self
    }

    pub fn type_hint(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }

    pub fn converters(mut self, converters: impl IntoIterator<Item = Converter>) -> Self {
        self.converters = Some(converters.into_iter().collect());
        self
    }

    pub fn validators(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.validators = Some(validators.into_iter().collect());
        self
    }

    pub fn contextual(mut self, contextual: bool) -> Self {
        self.contextual = Some(contextual);
        self
    }

    pub fn apply(&self, param: &FParameter) -> Result<FParameter> {
        let mut builder = param.replace();
        if let Some(kind) = self.kind {
            builder = builder.kind(kind);
        }
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        if let Some(interface_name) = &self.interface_name {
            builder = builder.interface_name(interface_name.clone());
        }
        match &self.default {
            Some(ParamDefault::Empty) => builder = builder.no_default(),
            Some(ParamDefault::Value(value)) => builder = builder.no_default().default(value.clone()),
            Some(ParamDefault::Factory(factory)) => {
                builder = builder.no_default().factory(factory.clone())
            }
            None => {}
        }
        if let Some(type_hint) = &self.type_hint {
            builder = builder.type_hint(type_hint.clone());
        }
        if let Some(converters) = &self.converters {
            builder = builder.set_converters(converters.iter().cloned());
        }
        if let Some(validators) = &self.validators {
            builder = builder.set_validators(validators.iter().cloned());
        }
        if let Some(contextual) = self.contextual {
            builder = builder.contextual(contextual);
        }
        builder.build()
    }
}

#[derive(Debug, Clone)]
pub struct Modify {
    selector: Selector,
    patch: ParameterPatch,
    multiple: bool,
    raising: bool,
}

impl Modify {
    pub fn new(selector: impl Into<Selector>, patch: ParameterPatch) -> Self {
        Self {
            selector: selector.into(),
            patch,
            multiple: false,
            raising: true,
        }
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn raising(mut self, raising: bool) -> Self {
        self.raising = raising;
        self
    }
}

impl Revision for Modify {
    fn revise(&self, previous: &FSignature) -> Result<FSignature> {
        let mut matched = false;
        let mut parameters = Vec::with_capacity(previous.len());

        for param in previous.iter() {
            if self.selector.matches(param) && (self.multiple || !matched) {
                matched = true;
                parameters.push(self.patch.apply(param)?);
            } else {
                parameters.push(param.clone());
            }
        }

        if !matched && self.raising {
            return Err(ForgeError::Revision(format!(
                "No parameter matched selector '{}'",
                self.selector
            )));
        }
        previous.replace_parameters(parameters)
    }
}

/// Moves one parameter. The position is resolved after the parameter has been
/// taken out.
#[derive(Debug, Clone)]
pub struct Translocate {
    selector: Selector,
    position: Position,
}

impl Translocate {
    pub fn new(selector: impl Into<Selector>, position: Position) -> Self {
        Self {
            selector: selector.into(),
            position,
        }
    }
}

impl Revision for Translocate {
    fn revise(&self, previous: &FSignature) -> Result<FSignature> {
        let mut parameters = previous.parameters().to_vec();
        let index = self.selector.find_or_raise(&parameters)?;
        let moved = parameters.remove(index);
        let target = self.position.resolve(&parameters)?;
        parameters.insert(target, moved);
        previous.replace_parameters(parameters)
    }
}

#[derive(Debug, Clone)]
pub struct Replace {
    selector: Selector,
    parameter: FParameter,
}

impl Replace {
    pub fn new(selector: impl Into<Selector>, parameter: FParameter) -> Self {
        Self {
            selector: selector.into(),
            parameter,
        }
    }
}

impl Revision for Replace {
    fn revise(&self, previous: &FSignature) -> Result<FSignature> {
        let mut parameters = previous.parameters().to_vec();
        let index = self.selector.find_or_raise(&parameters)?;
        parameters[index] = self.parameter.clone();
        previous.replace_parameters(parameters)
    }
}

pub type ManageFn = dyn Fn(Vec<FParameter>) -> anyhow::Result<Vec<FParameter>> + Send + Sync;

/// Hands the whole parameter list to a closure.
#[derive(Clone)]
pub struct Manage {
    func: Arc<ManageFn>,
}

impl Manage {
    pub fn new(
        func: impl Fn(Vec<FParameter>) -> anyhow::Result<Vec<FParameter>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            func: Arc::new(func),
        }
    }
}

impl Revision for Manage {
    fn revise(&self, previous: &FSignature) -> Result<FSignature> {
        let parameters = (self.func)(previous.parameters().to_vec())?;
        previous.replace_parameters(parameters)
    }
}

/// Takes its parameters from another callable's signature.
#[derive(Debug, Clone)]
pub struct CopyFrom {
    source: FSignature,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

impl CopyFrom {
    pub fn new(source: &Callable) -> Result<Self> {
        Ok(Self {
            source: FSignature::from_callable(source)?,
            include: None,
            exclude: None,
        })
    }

    pub fn from_fsignature(source: FSignature) -> Self {
        Self {
            source,
            include: None,
            exclude: None,
        }
    }

    pub fn include(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.include = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

impl Revision for CopyFrom {
    fn revise(&self, previous: &FSignature) -> Result<FSignature> {
        if self.include.is_some() && self.exclude.is_some() {
            return Err(ForgeError::Revision(
                "expected either 'include' or 'exclude', received both".to_string(),
            ));
        }

        let listed = |names: &Option<Vec<String>>, param: &FParameter| {
            names
                .as_ref()
                .is_some_and(|names| names.iter().any(|n| Some(n.as_str()) == param.name()))
        };

        let parameters: Vec<FParameter> = self
            .source
            .iter()
            .filter(|&param| self.include.is_none() || listed(&self.include, param))
            .filter(|&param| !listed(&self.exclude, param))
            .cloned()
            .collect();
        previous.replace_parameters(parameters)
    }
}
