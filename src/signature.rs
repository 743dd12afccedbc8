//! FSignature: an ordered, validated set of FParameters
//!
//! One revised calling convention. The external view (interface names, as
//! callers see it) and the internal view (names, as the wrapped function sees
//! it) both render to a native [`Signature`].
//!
//! Validation runs once at construction. For each parameter, in order:
//!
//! 1. it has a name
//! 2. only the first parameter may be contextual
//! 3. `name` is unique
//! 4. `interface_name` is unique
//! 5. kinds never step backwards
//! 6. at most one `*args` and one `**kwargs`
//! 7. a positional parameter without a default does not follow a defaulted
//!    one of the same kind (keyword-only parameters are exempt)

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::error::{ForgeError, Result, SignatureError};
use crate::function::Callable;
use crate::immutable::Immutable;
use crate::native::{render_parameters, ParameterKind, Signature};
use crate::parameter::FParameter;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FSignature {
    parameters: Vec<FParameter>,
    return_annotation: Option<String>,
}

impl FSignature {
    pub fn new(parameters: impl IntoIterator<Item = FParameter>) -> Result<Self> {
        Self::build(parameters.into_iter().collect(), None)
    }

    /// Positional parameters followed by named ones. A named entry takes the
    /// key as its `name`; its `interface_name` is kept when set, else it is the
    /// key too.
    pub fn with_named(
        parameters: impl IntoIterator<Item = FParameter>,
        named: impl IntoIterator<Item = (String, FParameter)>,
    ) -> Result<Self> {
        let mut all: Vec<FParameter> = parameters.into_iter().collect();
        for (key, param) in named {
            let interface_name = param.interface_name().unwrap_or(&key).to_string();
            all.push(param.replace().name(key).interface_name(interface_name).build()?);
        }
        Self::build(all, None)
    }

    pub fn from_signature(signature: &Signature) -> Result<Self> {
        let parameters = signature
            .parameters
            .iter()
            .map(FParameter::from_parameter)
            .collect();
        Self::build(parameters, signature.return_annotation.clone())
    }

    pub fn from_callable(callable: &Callable) -> Result<Self> {
        Self::from_signature(callable.signature())
    }

    /// A new signature over different parameters, same return annotation.
    pub fn replace_parameters(&self, parameters: impl IntoIterator<Item = FParameter>) -> Result<Self> {
        Self::build(parameters.into_iter().collect(), self.return_annotation.clone())
    }

    pub fn with_return_annotation(&self, annotation: Option<String>) -> Self {
        Self {
            parameters: self.parameters.clone(),
            return_annotation: annotation,
        }
    }

    fn build(parameters: Vec<FParameter>, return_annotation: Option<String>) -> Result<Self> {
        validate(&parameters)?;
        let fsignature = Self {
            parameters,
            return_annotation,
        };
        debug!(signature = %fsignature, "built fsignature");
        Ok(fsignature)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn parameters(&self) -> &[FParameter] {
        &self.parameters
    }

    pub fn return_annotation(&self) -> Option<&str> {
        self.return_annotation.as_deref()
    }

    /// Lookup by internal name.
    pub fn get(&self, name: &str) -> Option<&FParameter> {
        self.parameters.iter().find(|p| p.name() == Some(name))
    }

    pub fn getparam(&self, name: &str) -> Result<&FParameter> {
        self.get(name)
            .ok_or_else(|| ForgeError::no_parameter(&self.to_string(), name))
    }

    pub fn get_by_interface_name(&self, interface_name: &str) -> Option<&FParameter> {
        self.parameters
            .iter()
            .find(|p| p.interface_name() == Some(interface_name))
    }

    /// The contextual parameter, always first when present.
    pub fn context(&self) -> Option<&FParameter> {
        self.parameters.first().filter(|p| p.is_contextual())
    }

    pub fn var_positional(&self) -> Option<&FParameter> {
        self.parameters
            .iter()
            .find(|p| p.kind() == ParameterKind::VarPositional)
    }

    pub fn var_keyword(&self) -> Option<&FParameter> {
        self.parameters
            .iter()
            .find(|p| p.kind() == ParameterKind::VarKeyword)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Internal names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.parameters.iter().filter_map(FParameter::name).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FParameter> {
        self.parameters.iter()
    }

    // -------------------------------------------------------------------------
    // Native views
    // -------------------------------------------------------------------------

    /// What callers see.
    pub fn native(&self) -> Result<Signature> {
        let parameters = self
            .parameters
            .iter()
            .map(FParameter::interface_parameter)
            .collect::<Result<Vec<_>>>()?;
        Ok(Signature {
            parameters,
            return_annotation: self.return_annotation.clone(),
        })
    }

    /// What the wrapped function sees.
    pub fn internal(&self) -> Result<Signature> {
        let parameters = self
            .parameters
            .iter()
            .map(FParameter::parameter)
            .collect::<Result<Vec<_>>>()?;
        Ok(Signature {
            parameters,
            return_annotation: self.return_annotation.clone(),
        })
    }
}

fn validate(parameters: &[FParameter]) -> std::result::Result<(), SignatureError> {
    let mut seen_names = HashSet::new();
    let mut seen_interface_names = HashSet::new();

    for (i, current) in parameters.iter().enumerate() {
        let (name, interface_name) = match (current.name(), current.interface_name()) {
            (Some(name), Some(interface_name)) if !name.is_empty() && !interface_name.is_empty() => {
                (name, interface_name)
            }
            _ => return Err(SignatureError::UnnamedParameter(current.to_string())),
        };

        if current.is_contextual() && i > 0 {
            return Err(SignatureError::ContextualNotFirst);
        }

        if !seen_names.insert(name) {
            return Err(SignatureError::DuplicateName(name.to_string()));
        }

        if !seen_interface_names.insert(interface_name) {
            return Err(SignatureError::DuplicateInterfaceName(interface_name.to_string()));
        }

        let Some(last) = i.checked_sub(1).map(|j| &parameters[j]) else {
            continue;
        };

        if current.kind() < last.kind() {
            return Err(SignatureError::KindOrder {
                current: current.to_string(),
                current_kind: current.kind(),
                last: last.to_string(),
                last_kind: last.kind(),
            });
        }

        if current.kind() == last.kind() {
            match current.kind() {
                ParameterKind::VarPositional => return Err(SignatureError::MultipleVarPositional),
                ParameterKind::VarKeyword => return Err(SignatureError::MultipleVarKeyword),
                ParameterKind::KeywordOnly => {}
                _ => {
                    if last.has_default() && !current.has_default() {
                        return Err(SignatureError::NonDefaultFollowsDefault);
                    }
                }
            }
        }
    }
    Ok(())
}

impl fmt::Display for FSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<FSignature ({})>",
            render_parameters(&self.parameters, FParameter::kind)
        )
    }
}

impl Immutable for FSignature {
    const FIELDS: &'static [&'static str] = &["parameters", "return_annotation"];

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "parameters" => Some(render_parameters(&self.parameters, FParameter::kind)),
            "return_annotation" => Some(
                self.return_annotation
                    .clone()
                    .unwrap_or_else(|| "<empty>".to_string()),
            ),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a FSignature {
    type Item = &'a FParameter;
    type IntoIter = std::slice::Iter<'a, FParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fparams;
    use crate::native::Parameter;
    use crate::variadic::{VarKeyword, VarPositional};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pok(name: &str) -> FParameter {
        FParameter::positional_or_keyword(name).build().unwrap()
    }

    fn pok_default(name: &str) -> FParameter {
        FParameter::positional_or_keyword(name).default(json!(0)).build().unwrap()
    }

    #[test]
    fn renders_both_views() {
        let fsig = FSignature::new(fparams![
            FParameter::positional_only("a").build().unwrap(),
            FParameter::positional_or_keyword("_b").interface_name("b").default(json!(1)).build().unwrap(),
            VarPositional::new(),
            FParameter::keyword_only("c").type_hint("int").build().unwrap(),
            VarKeyword::new(),
        ])
        .unwrap();

        assert_eq!(fsig.to_string(), "<FSignature (a, /, _b->b=1, *args, c:int, **kwargs)>");
        assert_eq!(fsig.native().unwrap().to_string(), "(a, /, b=1, *args, c:int, **kwargs)");
        assert_eq!(fsig.internal().unwrap().to_string(), "(a, /, _b=1, *args, c:int, **kwargs)");
    }

    #[test]
    fn accessors() {
        let fsig = FSignature::new(fparams![
            FParameter::contextual("self").build().unwrap(),
            FParameter::positional_or_keyword("_a").interface_name("a").build().unwrap(),
            VarKeyword::new(),
        ])
        .unwrap();

        assert_eq!(fsig.len(), 3);
        assert_eq!(fsig.names(), vec!["self", "_a", "kwargs"]);
        assert_eq!(fsig.context().and_then(FParameter::name), Some("self"));
        assert_eq!(fsig.get("_a").and_then(FParameter::interface_name), Some("a"));
        assert_eq!(fsig.get_by_interface_name("a").and_then(FParameter::name), Some("_a"));
        assert!(fsig.get("a").is_none());
        assert!(fsig.var_positional().is_none());
        assert_eq!(fsig.var_keyword().and_then(FParameter::name), Some("kwargs"));
        assert!(matches!(fsig.getparam("zzz"), Err(ForgeError::NoParameter(_))));
    }

    #[test]
    fn rejects_duplicate_interface_names() {
        let err = FSignature::new(vec![
            FParameter::positional_or_keyword("a").interface_name("x").build().unwrap(),
            FParameter::positional_or_keyword("b").interface_name("x").build().unwrap(),
        ])
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Received multiple FParameters with interface_name 'x'"
        );
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = FSignature::new(vec![
            pok("a"),
            FParameter::keyword_only("a").interface_name("b").build().unwrap(),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ForgeError::Signature(SignatureError::DuplicateName(ref n)) if n == "a"
        ));
    }

    #[test]
    fn rejects_non_default_after_default() {
        let err = FSignature::new(vec![pok_default("a"), pok("b")]).unwrap_err();
        assert_eq!(err.to_string(), "non-default FParameter follows default FParameter");
    }

    #[test]
    fn keyword_only_may_follow_default() {
        let fsig = FSignature::new(vec![
            FParameter::keyword_only("a").default(json!(1)).build().unwrap(),
            FParameter::keyword_only("b").build().unwrap(),
        ]);
        assert!(fsig.is_ok());
    }

    #[test]
    fn rejects_multiple_variadics() {
        let err = FSignature::new(fparams![VarPositional::new(), VarPositional::new().named("more")])
            .unwrap_err();
        assert_eq!(err.to_string(), "Received multiple variable-positional FParameters");

        let err = FSignature::new(fparams![VarKeyword::new(), VarKeyword::new().named("more")])
            .unwrap_err();
        assert_eq!(err.to_string(), "Received multiple variable-keyword FParameters");
    }

    #[test]
    fn rejects_late_contextual() {
        let err = FSignature::new(vec![pok("a"), FParameter::contextual("self").build().unwrap()])
            .unwrap_err();
        assert_eq!(err.to_string(), "Only the first FParameter can be contextual");
    }

    #[test]
    fn rejects_kind_regression() {
        let err = FSignature::new(vec![FParameter::keyword_only("a").build().unwrap(), pok("b")])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "b of kind 'POSITIONAL_OR_KEYWORD' follows a of kind 'KEYWORD_ONLY'"
        );
    }

    #[test]
    fn rejects_unnamed() {
        let unnamed = FParameter::builder(ParameterKind::PositionalOrKeyword).build().unwrap();
        let err = FSignature::new(vec![unnamed]).unwrap_err();
        assert_eq!(err.to_string(), "Received unnamed FParameter: '<missing>'");
    }

    #[test]
    fn rejects_empty_interface_name() {
        let blank = FParameter::positional_or_keyword("a").interface_name("").build().unwrap();
        let err = FSignature::new(vec![blank]).unwrap_err();
        assert_eq!(err.to_string(), "Received unnamed FParameter: 'a->'");
        assert!(matches!(
            err,
            ForgeError::Signature(SignatureError::UnnamedParameter(_))
        ));
    }

    #[test]
    fn with_named_uses_keys() {
        let fsig = FSignature::with_named(
            vec![pok("a")],
            vec![
                ("b".to_string(), FParameter::builder(ParameterKind::KeywordOnly).build().unwrap()),
                (
                    "_c".to_string(),
                    FParameter::builder(ParameterKind::KeywordOnly).interface_name("c").build().unwrap(),
                ),
            ],
        )
        .unwrap();
        assert_eq!(fsig.to_string(), "<FSignature (a, *, b, _c->c)>");
    }

    #[test]
    fn from_signature_lifts_every_parameter() {
        let native = Signature::new(vec![
            Parameter::new("a", ParameterKind::PositionalOrKeyword),
            Parameter::new("b", ParameterKind::KeywordOnly).with_default(json!(true)),
        ])
        .with_return_annotation("int");

        let fsig = FSignature::from_signature(&native).unwrap();
        assert_eq!(fsig.return_annotation(), Some("int"));
        assert_eq!(fsig.native().unwrap(), native);
        assert_eq!(fsig.internal().unwrap(), native);
    }

    #[test]
    fn replace_parameters_revalidates() {
        let fsig = FSignature::new(vec![pok("a")]).unwrap();
        let grown = fsig.replace_parameters(vec![pok("a"), pok("b")]).unwrap();
        assert_eq!(grown.len(), 2);
        assert_eq!(fsig.len(), 1);
        assert!(fsig.replace_parameters(vec![pok("a"), pok("a")]).is_err());
    }
}
