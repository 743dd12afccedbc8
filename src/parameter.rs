//! FParameter: one external-to-internal parameter mapping
//!
//! An [`FParameter`] describes a single parameter of a revised signature: how
//! callers see it (`interface_name`, kind, default) and how the wrapped
//! function receives it (`name`). At call time it runs the per-argument
//! pipeline:
//!
//! ```text
//! bound value (or void) -> apply_default -> apply_conversion -> apply_validation
//! ```
//!
//! # Usage
//!
//! ```
//! use serde_json::json;
//! use sigforge::FParameter;
//!
//! let param = FParameter::positional_or_keyword("_limit")
//!     .interface_name("limit")
//!     .default(json!(10))
//!     .build()
//!     .unwrap();
//! assert_eq!(param.to_string(), "_limit->limit=10");
//! ```

use std::fmt;

use serde_json::Value;
use tracing::trace;

use crate::config::get_run_validators;
use crate::error::{ForgeError, Result};
use crate::hook::{Converter, Factory, Validator};
use crate::immutable::Immutable;
use crate::native::{ParamDefault, Parameter, ParameterKind};

// =============================================================================
// FPARAMETER
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FParameter {
    kind: ParameterKind,
    name: Option<String>,
    interface_name: Option<String>,
    default: ParamDefault,
    type_hint: Option<String>,
    converters: Vec<Converter>,
    validators: Vec<Validator>,
    is_contextual: bool,
}

impl FParameter {
    pub fn builder(kind: ParameterKind) -> FParameterBuilder {
        FParameterBuilder::new(kind)
    }

    pub fn positional_only(name: impl Into<String>) -> FParameterBuilder {
        FParameterBuilder::new(ParameterKind::PositionalOnly).name(name)
    }

    pub fn positional_or_keyword(name: impl Into<String>) -> FParameterBuilder {
        FParameterBuilder::new(ParameterKind::PositionalOrKeyword).name(name)
    }

    /// A `self`/`cls`-style parameter whose bound value becomes the context
    /// for every other parameter's pipeline.
    pub fn contextual(name: impl Into<String>) -> FParameterBuilder {
        let mut builder = FParameterBuilder::new(ParameterKind::PositionalOrKeyword).name(name);
        builder.is_contextual = true;
        builder
    }

    pub fn keyword_only(name: impl Into<String>) -> FParameterBuilder {
        FParameterBuilder::new(ParameterKind::KeywordOnly).name(name)
    }

    pub fn var_positional(name: impl Into<String>) -> FParameterBuilder {
        FParameterBuilder::new(ParameterKind::VarPositional).name(name)
    }

    pub fn var_keyword(name: impl Into<String>) -> FParameterBuilder {
        FParameterBuilder::new(ParameterKind::VarKeyword).name(name)
    }

    /// Lift a native parameter; both names are the native name.
    pub fn from_parameter(parameter: &Parameter) -> Self {
        Self {
            kind: parameter.kind,
            name: Some(parameter.name.clone()),
            interface_name: Some(parameter.name.clone()),
            default: parameter.default.clone(),
            type_hint: parameter.annotation.clone(),
            converters: Vec::new(),
            validators: Vec::new(),
            is_contextual: false,
        }
    }

    /// Variadic parameters carry neither default nor type, so there is
    /// nothing left to validate.
    pub(crate) fn variadic(
        kind: ParameterKind,
        name: &str,
        converters: Vec<Converter>,
        validators: Vec<Validator>,
    ) -> Self {
        debug_assert!(kind.is_variadic());
        Self {
            kind,
            name: Some(name.to_string()),
            interface_name: Some(name.to_string()),
            default: ParamDefault::Empty,
            type_hint: None,
            converters,
            validators,
            is_contextual: false,
        }
    }

    /// A builder seeded from this parameter. `build()` yields a new instance
    /// and leaves `self` untouched.
    pub fn replace(&self) -> FParameterBuilder {
        FParameterBuilder::from(self)
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn interface_name(&self) -> Option<&str> {
        self.interface_name.as_deref()
    }

    pub fn default(&self) -> &ParamDefault {
        &self.default
    }

    pub fn type_hint(&self) -> Option<&str> {
        self.type_hint.as_deref()
    }

    pub fn converters(&self) -> &[Converter] {
        &self.converters
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn is_contextual(&self) -> bool {
        self.is_contextual
    }

    pub fn has_default(&self) -> bool {
        !self.default.is_empty()
    }

    // -------------------------------------------------------------------------
    // Pipeline
    // -------------------------------------------------------------------------

    /// Void resolves to the declared default (a factory runs once per call);
    /// any supplied value wins over the default.
    pub fn apply_default(&self, value: Option<Value>) -> Result<Option<Value>> {
        match value {
            Some(value) => Ok(Some(value)),
            None => self.default.resolve(),
        }
    }

    /// Fold the converters left to right; no converters is the identity.
    pub fn apply_conversion(&self, ctx: &Value, name: &str, value: Value) -> Result<Value> {
        self.converters.iter().try_fold(value, |acc, converter| {
            converter.call(ctx, name, acc).map_err(ForgeError::from)
        })
    }

    pub fn apply_validation(&self, ctx: &Value, name: &str, value: &Value) -> Result<()> {
        for validator in &self.validators {
            validator.call(ctx, name, value)?;
        }
        Ok(())
    }

    /// Run the full pipeline for one argument.
    ///
    /// Returns `None` when the value is void and there is no default to fall
    /// back on; converters and validators do not run in that case. Validation
    /// is skipped while the process-wide validator switch is off.
    pub fn call(&self, ctx: &Value, name: &str, value: Option<Value>) -> Result<Option<Value>> {
        let Some(defaulted) = self.apply_default(value)? else {
            trace!(parameter = name, "no value and no default");
            return Ok(None);
        };
        let converted = self.apply_conversion(ctx, name, defaulted)?;
        if get_run_validators() {
            self.apply_validation(ctx, name, &converted)?;
        }
        Ok(Some(converted))
    }

    // -------------------------------------------------------------------------
    // Native views
    // -------------------------------------------------------------------------

    /// The internal (wrapped-function) view.
    pub fn parameter(&self) -> Result<Parameter> {
        self.render(self.name.as_deref())
    }

    /// The external (caller) view.
    pub fn interface_parameter(&self) -> Result<Parameter> {
        self.render(self.interface_name.as_deref())
    }

    fn render(&self, name: Option<&str>) -> Result<Parameter> {
        let name = name
            .filter(|n| !n.is_empty())
            .ok_or(ForgeError::UnnamedParameter)?;
        Ok(Parameter {
            name: name.to_string(),
            kind: self.kind,
            default: self.default.clone(),
            annotation: self.type_hint.clone(),
        })
    }
}

impl fmt::Display for FParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.kind.prefix();
        let name = self.name.as_deref().unwrap_or("<missing>");
        if self.name == self.interface_name {
            write!(f, "{}{}", prefix, name)?;
        } else {
            let interface_name = self.interface_name.as_deref().unwrap_or("<missing>");
            write!(f, "{}{}->{}{}", prefix, name, prefix, interface_name)?;
        }
        if let Some(type_hint) = &self.type_hint {
            write!(f, ":{}", type_hint)?;
        }
        if !self.default.is_empty() {
            write!(f, "={}", self.default)?;
        }
        Ok(())
    }
}

impl Immutable for FParameter {
    const FIELDS: &'static [&'static str] = &[
        "kind",
        "name",
        "interface_name",
        "default",
        "type",
        "converter",
        "validator",
        "is_contextual",
    ];

    fn field(&self, name: &str) -> Option<String> {
        fn names<F: ?Sized>(hooks: &[crate::hook::Hook<F>]) -> String {
            let names: Vec<&str> = hooks.iter().map(|h| h.name()).collect();
            format!("[{}]", names.join(", "))
        }
        let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "<missing>".to_string());

        match name {
            "kind" => Some(self.kind.to_string()),
            "name" => Some(opt(&self.name)),
            "interface_name" => Some(opt(&self.interface_name)),
            "default" => Some(self.default.to_string()),
            "type" => Some(self.type_hint.clone().unwrap_or_else(|| "<empty>".to_string())),
            "converter" => Some(names(&self.converters)),
            "validator" => Some(names(&self.validators)),
            "is_contextual" => Some(self.is_contextual.to_string()),
            _ => None,
        }
    }
}

/// One-item iteration, so a lone parameter composes like any collection of
/// parameters.
impl IntoIterator for FParameter {
    type Item = FParameter;
    type IntoIter = std::iter::Once<FParameter>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self)
    }
}

// =============================================================================
// BUILDER
// =============================================================================

#[derive(Debug, Clone)]
pub struct FParameterBuilder {
    kind: ParameterKind,
    name: Option<String>,
    interface_name: Option<String>,
    base_default: ParamDefault,
    default: Option<Value>,
    factory: Option<Factory>,
    type_hint: Option<String>,
    converters: Vec<Converter>,
    validators: Vec<Validator>,
    is_contextual: bool,
}

impl FParameterBuilder {
    pub fn new(kind: ParameterKind) -> Self {
        Self {
            kind,
            name: None,
            interface_name: None,
            base_default: ParamDefault::Empty,
            default: None,
            factory: None,
            type_hint: None,
            converters: Vec::new(),
            validators: Vec::new(),
            is_contextual: false,
        }
    }

    pub fn kind(mut self, kind: ParameterKind) -> Self {
        self.kind = kind;
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

    pub fn default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn factory(mut self, factory: Factory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Drop any default, including one inherited through `replace()`.
    pub fn no_default(mut self) -> Self {
        self.base_default = ParamDefault::Empty;
        self.default = None;
        self.factory = None;
        self
    }

    pub fn type_hint(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }

    pub fn converter(mut self, converter: Converter) -> Self {
        self.converters.push(converter);
        self
    }

    pub fn converters(mut self, converters: impl IntoIterator<Item = Converter>) -> Self {
        self.converters.extend(converters);
        self
    }

    /// Replace the whole converter chain.
    pub fn set_converters(mut self, converters: impl IntoIterator<Item = Converter>) -> Self {
        self.converters = converters.into_iter().collect();
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn validators(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.validators.extend(validators);
        self
    }

    /// Replace the whole validator chain.
    pub fn set_validators(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.validators = validators.into_iter().collect();
        self
    }

    pub fn contextual(mut self, is_contextual: bool) -> Self {
        self.is_contextual = is_contextual;
        self
    }

    pub fn build(self) -> Result<FParameter> {
        let default = match (self.default, self.factory) {
            (Some(_), Some(_)) => return Err(ForgeError::DefaultAndFactory),
            (Some(value), None) => ParamDefault::Value(value),
            (None, Some(factory)) => ParamDefault::Factory(factory),
            (None, None) => self.base_default,
        };

        if self.kind.is_variadic() {
            if !default.is_empty() {
                return Err(ForgeError::InvalidParameter(format!(
                    "{} parameter cannot have a default",
                    self.kind.description()
                )));
            }
            if self.type_hint.is_some() {
                return Err(ForgeError::InvalidParameter(format!(
                    "{} parameter cannot have a type",
                    self.kind.description()
                )));
            }
        }

        let name = self.name.or_else(|| self.interface_name.clone());
        let interface_name = self.interface_name.or_else(|| name.clone());

        Ok(FParameter {
            kind: self.kind,
            name,
            interface_name,
            default,
            type_hint: self.type_hint,
            converters: self.converters,
            validators: self.validators,
            is_contextual: self.is_contextual,
        })
    }
}

impl From<&FParameter> for FParameterBuilder {
    fn from(param: &FParameter) -> Self {
        Self {
            kind: param.kind,
            name: param.name.clone(),
            interface_name: param.interface_name.clone(),
            base_default: param.default.clone(),
            default: None,
            factory: None,
            type_hint: param.type_hint.clone(),
            converters: param.converters.clone(),
            validators: param.validators.clone(),
            is_contextual: param.is_contextual,
        }
    }
}
