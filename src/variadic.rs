//! Variadic parameter containers
//!
//! [`VarPositional`] and [`VarKeyword`] hold the construction arguments of a
//! variadic [`FParameter`] and hand one out on demand. They iterate like a
//! one-element sequence and a one-key mapping respectively, so they drop into
//! [`fparams!`](crate::fparams) next to plain parameters.

use crate::hook::{Converter, Validator};
use crate::native::ParameterKind;
use crate::parameter::FParameter;

#[derive(Debug, Clone, PartialEq)]
pub struct VarPositional {
    name: String,
    converters: Vec<Converter>,
    validators: Vec<Validator>,
}

impl Default for VarPositional {
    fn default() -> Self {
        Self::new()
    }
}

impl VarPositional {
    pub fn new() -> Self {
        Self {
            name: "args".to_string(),
            converters: Vec::new(),
            validators: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn converter(mut self, converter: Converter) -> Self {
        self.converters.push(converter);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A copy with the name overridden; hooks carry over.
    pub fn with(&self, name: impl Into<String>) -> Self {
        self.clone().named(name)
    }

    pub fn param(&self) -> FParameter {
        FParameter::variadic(
            ParameterKind::VarPositional,
            &self.name,
            self.converters.clone(),
            self.validators.clone(),
        )
    }

    pub fn len(&self) -> usize {
        1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::iter::Once<FParameter> {
        std::iter::once(self.param())
    }
}

impl IntoIterator for VarPositional {
    type Item = FParameter;
    type IntoIter = std::iter::Once<FParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &VarPositional {
    type Item = FParameter;
    type IntoIter = std::iter::Once<FParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarKeyword {
    name: String,
    converters: Vec<Converter>,
    validators: Vec<Validator>,
}

impl Default for VarKeyword {
    fn default() -> Self {
        Self::new()
    }
}

impl VarKeyword {
    pub fn new() -> Self {
        Self {
            name: "kwargs".to_string(),
            converters: Vec::new(),
            validators: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn converter(mut self, converter: Converter) -> Self {
        self.converters.push(converter);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with(&self, name: impl Into<String>) -> Self {
        self.clone().named(name)
    }

    pub fn param(&self) -> FParameter {
        FParameter::variadic(
            ParameterKind::VarKeyword,
            &self.name,
            self.converters.clone(),
            self.validators.clone(),
        )
    }

    pub fn get(&self, key: &str) -> Option<FParameter> {
        (key == self.name).then(|| self.param())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        key == self.name
    }

    pub fn keys(&self) -> std::iter::Once<&str> {
        std::iter::once(self.name.as_str())
    }

    pub fn len(&self) -> usize {
        1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::iter::Once<(String, FParameter)> {
        std::iter::once((self.name.clone(), self.param()))
    }
}

impl IntoIterator for VarKeyword {
    type Item = FParameter;
    type IntoIter = std::iter::Once<FParameter>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self.param())
    }
}

impl IntoIterator for &VarKeyword {
    type Item = FParameter;
    type IntoIter = std::iter::Once<FParameter>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self.param())
    }
}

/// Flatten parameters, variadic containers and parameter collections into
/// one `Vec<FParameter>`.
///
/// ```
/// use sigforge::{fparams, FParameter, VarKeyword, VarPositional};
///
/// let params = fparams![
///     FParameter::positional_or_keyword("a").build().unwrap(),
///     VarPositional::new(),
///     VarKeyword::new().named("options"),
/// ];
/// assert_eq!(params.len(), 3);
/// ```
#[macro_export]
macro_rules! fparams {
    () => {
        ::std::vec::Vec::<$crate::FParameter>::new()
    };
    ($($item:expr),+ $(,)?) => {{
        let mut params: ::std::vec::Vec<$crate::FParameter> = ::std::vec::Vec::new();
        $( params.extend($item); )+
        params
    }};
}
