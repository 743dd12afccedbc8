//! Calling-convention objects
//!
//! The plain description of how a function is called: parameter kinds,
//! [`Parameter`] and [`Signature`]. A revised signature renders to these for
//! both its external and internal views, and wrapped callables declare their
//! own convention with them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ForgeError, Result};
use crate::hook::Factory;

// =============================================================================
// PARAMETER KIND
// =============================================================================

/// The five standard parameter kinds, ordered by required declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

impl ParameterKind {
    pub fn description(&self) -> &'static str {
        match self {
            ParameterKind::PositionalOnly => "positional-only",
            ParameterKind::PositionalOrKeyword => "positional-or-keyword",
            ParameterKind::VarPositional => "variable-positional",
            ParameterKind::KeywordOnly => "keyword-only",
            ParameterKind::VarKeyword => "variable-keyword",
        }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self, ParameterKind::VarPositional | ParameterKind::VarKeyword)
    }

    /// Can an argument for this kind be supplied by position?
    pub fn accepts_positional(&self) -> bool {
        matches!(
            self,
            ParameterKind::PositionalOnly | ParameterKind::PositionalOrKeyword
        )
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            ParameterKind::VarPositional => "*",
            ParameterKind::VarKeyword => "**",
            _ => "",
        }
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterKind::PositionalOnly => "POSITIONAL_ONLY",
            ParameterKind::PositionalOrKeyword => "POSITIONAL_OR_KEYWORD",
            ParameterKind::VarPositional => "VAR_POSITIONAL",
            ParameterKind::KeywordOnly => "KEYWORD_ONLY",
            ParameterKind::VarKeyword => "VAR_KEYWORD",
        };
        f.write_str(name)
    }
}

// =============================================================================
// DEFAULTS
// =============================================================================

/// A declared default: nothing, a concrete value, or a lazy factory.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParamDefault {
    #[default]
    Empty,
    Value(Value),
    Factory(Factory),
}

impl ParamDefault {
    pub fn is_empty(&self) -> bool {
        matches!(self, ParamDefault::Empty)
    }

    /// Produce the default value, invoking a factory if there is one.
    pub fn resolve(&self) -> Result<Option<Value>> {
        match self {
            ParamDefault::Empty => Ok(None),
            ParamDefault::Value(value) => Ok(Some(value.clone())),
            ParamDefault::Factory(factory) => Ok(Some(factory.call()?)),
        }
    }
}

impl fmt::Display for ParamDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamDefault::Empty => f.write_str("<empty>"),
            ParamDefault::Value(value) => f.write_str(&render_value(value)),
            ParamDefault::Factory(factory) => write!(f, "{}", factory),
        }
    }
}

/// Strings render bare, everything else as JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// PARAMETER
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub default: ParamDefault,
    pub annotation: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: ParamDefault::Empty,
            annotation: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = ParamDefault::Value(default);
        self
    }

    pub fn with_factory(mut self, factory: Factory) -> Self {
        self.default = ParamDefault::Factory(factory);
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn has_default(&self) -> bool {
        !self.default.is_empty()
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.name)?;
        if let Some(annotation) = &self.annotation {
            write!(f, ":{}", annotation)?;
        }
        if !self.default.is_empty() {
            write!(f, "={}", self.default)?;
        }
        Ok(())
    }
}

// =============================================================================
// SIGNATURE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    pub parameters: Vec<Parameter>,
    pub return_annotation: Option<String>,
}

impl Signature {
    pub fn new(parameters: Vec<Parameter>) -> Self {
        Self {
            parameters,
            return_annotation: None,
        }
    }

    pub fn with_return_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.return_annotation = Some(annotation.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn get_param(&self, name: &str) -> Result<&Parameter> {
        self.get(name)
            .ok_or_else(|| ForgeError::no_parameter("signature", name))
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn var_positional(&self) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.kind == ParameterKind::VarPositional)
    }

    pub fn var_keyword(&self) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.kind == ParameterKind::VarKeyword)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})",
            render_parameters(&self.parameters, |p| p.kind)
        )?;
        if let Some(annotation) = &self.return_annotation {
            write!(f, " -> {}", annotation)?;
        }
        Ok(())
    }
}

/// Join parameters with `, `, inserting `/` after the positional-only run and
/// a bare `*` ahead of keyword-only parameters when there is no `*args`.
pub(crate) fn render_parameters<P: fmt::Display>(
    parameters: &[P],
    kind_of: impl Fn(&P) -> ParameterKind,
) -> String {
    let has_var_positional = parameters
        .iter()
        .any(|p| kind_of(p) == ParameterKind::VarPositional);

    let mut components = Vec::with_capacity(parameters.len() + 2);
    for (i, param) in parameters.iter().enumerate() {
        let kind = kind_of(param);
        let last = if i > 0 { Some(kind_of(&parameters[i - 1])) } else { None };
        let next = parameters.get(i + 1).map(&kind_of);

        if !has_var_positional
            && kind == ParameterKind::KeywordOnly
            && last != Some(ParameterKind::KeywordOnly)
        {
            components.push("*".to_string());
        }

        components.push(param.to_string());

        if kind == ParameterKind::PositionalOnly && next != Some(ParameterKind::PositionalOnly) {
            components.push("/".to_string());
        }
    }
    components.join(", ")
}
