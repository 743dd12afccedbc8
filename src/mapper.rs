//! Call mapping
//!
//! A [`Mapper`] joins a revised [`FSignature`] to the calling convention of
//! the callable it wraps. Construction checks that every target parameter is
//! reachable; [`Mapper::map`] turns one external call into the internal call.
//!
//! Per call:
//!
//! 1. bind the arguments against the external signature
//! 2. run every parameter's pipeline, with the contextual parameter's value
//!    as context
//! 3. re-key the results onto the target parameters and redistribute them
//!    into positional and keyword buckets

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::binding::{BoundArguments, CallArguments};
use crate::error::{BindingError, ForgeError, MappingError, Result};
use crate::function::Callable;
use crate::immutable::Immutable;
use crate::native::{ParameterKind, Signature};
use crate::parameter::FParameter;
use crate::signature::FSignature;

#[derive(Debug, Clone, PartialEq)]
pub struct Mapper {
    fsignature: FSignature,
    callable_name: String,
    public_signature: Signature,
    target_signature: Signature,
    /// FParameter name -> target parameter name
    parameter_map: HashMap<String, String>,
}

impl Mapper {
    pub fn new(fsignature: FSignature, callable: &Callable) -> Result<Self> {
        Self::with_target(fsignature, callable.name(), callable.signature().clone())
    }

    /// Map onto the FSignature's own internal view.
    pub fn for_internal(fsignature: FSignature, callable_name: &str) -> Result<Self> {
        let target = fsignature.internal()?;
        Self::with_target(fsignature, callable_name, target)
    }

    fn with_target(fsignature: FSignature, callable_name: &str, target: Signature) -> Result<Self> {
        let parameter_map = Self::map_parameters(&fsignature, &target)?;
        let public_signature = fsignature.native()?;
        debug!(
            callable = callable_name,
            public = %public_signature,
            target = %target,
            "built mapper"
        );
        Ok(Self {
            fsignature,
            callable_name: callable_name.to_string(),
            public_signature,
            target_signature: target,
            parameter_map,
        })
    }

    pub fn fsignature(&self) -> &FSignature {
        &self.fsignature
    }

    pub fn public_signature(&self) -> &Signature {
        &self.public_signature
    }

    pub fn target_signature(&self) -> &Signature {
        &self.target_signature
    }

    pub fn callable_name(&self) -> &str {
        &self.callable_name
    }

    /// Target name for an FParameter, by the FParameter's internal name.
    pub fn target_of(&self, name: &str) -> Option<&str> {
        self.parameter_map.get(name).map(String::as_str)
    }

    /// Resolve where every FParameter lands on `target`.
    ///
    /// Parameters are matched by internal name. Variadics map onto the
    /// target's variadic of the same kind. Anything left over flows into the
    /// target's `**kwargs`, if it has one.
    pub fn map_parameters(
        fsignature: &FSignature,
        target: &Signature,
    ) -> std::result::Result<HashMap<String, String>, MappingError> {
        let mut mapping = HashMap::new();
        let mut source_vpo = fsignature.var_positional().and_then(FParameter::name);
        let mut source_vkw = fsignature.var_keyword().and_then(FParameter::name);

        for param in &target.parameters {
            match param.kind {
                ParameterKind::VarPositional => {
                    if let Some(name) = source_vpo.take() {
                        mapping.insert(name.to_string(), param.name.clone());
                    }
                }
                ParameterKind::VarKeyword => {
                    if let Some(name) = source_vkw.take() {
                        mapping.insert(name.to_string(), param.name.clone());
                    }
                }
                _ => {
                    let source = fsignature
                        .get(&param.name)
                        .filter(|fparam| !fparam.kind().is_variadic());
                    if source.is_some() {
                        mapping.insert(param.name.clone(), param.name.clone());
                    } else if !param.has_default() {
                        return Err(MappingError::MissingTarget {
                            kind: param.kind.description(),
                            name: param.name.clone(),
                        });
                    }
                }
            }
        }

        if let Some(name) = source_vpo {
            return Err(MappingError::MissingVariadicTarget {
                kind: ParameterKind::VarPositional.description(),
                name: name.to_string(),
            });
        }
        if let Some(name) = source_vkw {
            return Err(MappingError::MissingVariadicTarget {
                kind: ParameterKind::VarKeyword.description(),
                name: name.to_string(),
            });
        }

        let unmapped: Vec<String> = fsignature
            .names()
            .into_iter()
            .filter(|name| !mapping.contains_key(*name))
            .map(str::to_string)
            .collect();

        if !unmapped.is_empty() {
            let Some(sink) = target.var_keyword() else {
                return Err(MappingError::Unmapped(unmapped));
            };
            for name in unmapped {
                mapping.insert(name, sink.name.clone());
            }
        }

        Ok(mapping)
    }

    /// Turn one external call into the internal call.
    pub fn map(&self, arguments: &CallArguments) -> Result<CallArguments> {
        let bound = self.public_signature.bind(&self.callable_name, arguments)?;
        let mut bound_values: Vec<Option<Value>> = bound
            .into_values()
            .into_iter()
            .map(|(_, value)| value)
            .collect();

        // The contextual parameter is always first; resolve it once.
        let mut ctx = Value::Null;
        if let (Some(context), Some(slot)) = (self.fsignature.context(), bound_values.first_mut()) {
            *slot = context.apply_default(slot.take())?;
            ctx = slot.clone().unwrap_or(Value::Null);
        }

        let mut target = BoundArguments::unbound(&self.target_signature);

        for (fparam, value) in self.fsignature.iter().zip(bound_values) {
            let interface_name = fparam.interface_name().unwrap_or_default();
            let value = if fparam.is_contextual() {
                value
            } else {
                fparam.call(&ctx, interface_name, value)?
            };
            trace!(parameter = interface_name, value = ?value, "transformed argument");

            let Some(value) = value else {
                continue;
            };
            self.assign(&mut target, fparam, value)?;
        }

        target.apply_defaults()?;
        let forwarded = target.to_call_arguments()?;
        debug!(
            callable = %self.callable_name,
            received = %arguments,
            forwarded = %forwarded,
            "mapped call"
        );
        Ok(forwarded)
    }

    fn assign(&self, target: &mut BoundArguments, fparam: &FParameter, value: Value) -> Result<()> {
        let name = fparam.name().unwrap_or_default();
        let target_name = self
            .parameter_map
            .get(name)
            .ok_or_else(|| ForgeError::no_parameter(&self.callable_name, name))?;

        let into_sink = self
            .target_signature
            .var_keyword()
            .is_some_and(|sink| &sink.name == target_name);

        if !into_sink {
            target.set(target_name, value);
            return Ok(());
        }

        let Some(Some(Value::Object(sink))) = target.slot_mut(target_name) else {
            return Err(ForgeError::InvalidParameter(format!(
                "variable-keyword argument '{}' must be an object",
                target_name
            )));
        };

        let entries = if fparam.kind() == ParameterKind::VarKeyword {
            match value {
                Value::Object(entries) => entries,
                _ => {
                    return Err(ForgeError::InvalidParameter(format!(
                        "variable-keyword argument '{}' must be an object",
                        name
                    )))
                }
            }
        } else {
            Map::from_iter([(name.to_string(), value)])
        };

        // A sink key is filled at most once per call.
        for (key, value) in entries {
            if sink.contains_key(&key) {
                return Err(BindingError::MultipleValues {
                    callable: self.callable_name.clone(),
                    name: key,
                }
                .into());
            }
            sink.insert(key, value);
        }
        Ok(())
    }
}

impl fmt::Display for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Mapper {} => {}>", self.public_signature, self.target_signature)
    }
}

impl Immutable for Mapper {
    const FIELDS: &'static [&'static str] = &[
        "fsignature",
        "callable",
        "public_signature",
        "target_signature",
        "parameter_map",
    ];

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "fsignature" => Some(self.fsignature.to_string()),
            "callable" => Some(self.callable_name.clone()),
            "public_signature" => Some(self.public_signature.to_string()),
            "target_signature" => Some(self.target_signature.to_string()),
            "parameter_map" => {
                let mut pairs: Vec<String> = self
                    .parameter_map
                    .iter()
                    .map(|(from, to)| format!("{}: {}", from, to))
                    .collect();
                pairs.sort();
                Some(format!("{{{}}}", pairs.join(", ")))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fparams;
    use crate::hook::{Converter, Factory, Validator};
    use crate::native::Parameter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use crate::variadic::{VarKeyword, VarPositional};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn target(params: Vec<Parameter>) -> Callable {
        Callable::new("func", Signature::new(params), |_| Ok(Value::Null))
    }

    fn pok(name: &str) -> Parameter {
        Parameter::new(name, ParameterKind::PositionalOrKeyword)
    }

    #[test]
    fn maps_by_internal_name() {
        let fsig = FSignature::new(vec![
            FParameter::positional_or_keyword("_a").interface_name("a").build().unwrap(),
        ])
        .unwrap();
        let mapper = Mapper::new(fsig, &target(vec![pok("_a")])).unwrap();
        assert_eq!(mapper.target_of("_a"), Some("_a"));

        let forwarded = mapper.map(&CallArguments::default().kwarg("a", json!(3))).unwrap();
        assert_eq!(forwarded, CallArguments::default().kwarg("_a", json!(3)));
    }

    #[test]
    fn missing_target_mapping_is_reported() {
        let fsig = FSignature::new(Vec::new()).unwrap();
        let err = Mapper::new(fsig, &target(vec![pok("a")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing requisite mapping to non-default positional-or-keyword parameter 'a'"
        );
    }

    #[test]
    fn defaulted_target_may_stay_unmapped() {
        let fsig = FSignature::new(Vec::new()).unwrap();
        let mapper = Mapper::new(
            fsig,
            &target(vec![pok("a").with_default(json!(7))]),
        )
        .unwrap();
        assert_eq!(
            mapper.map(&CallArguments::default()).unwrap(),
            CallArguments::default().kwarg("a", json!(7))
        );
    }

    #[test]
    fn variadic_sources_need_variadic_targets() {
        let fsig = FSignature::new(fparams![VarPositional::new()]).unwrap();
        let err = Mapper::new(fsig, &target(Vec::new())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing requisite mapping from variable-positional parameter 'args'"
        );

        let fsig = FSignature::new(fparams![VarKeyword::new()]).unwrap();
        let err = Mapper::new(fsig, &target(Vec::new())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing requisite mapping from variable-keyword parameter 'kwargs'"
        );
    }

    #[test]
    fn leftovers_need_a_keyword_sink() {
        let fsig = FSignature::new(vec![
            FParameter::positional_or_keyword("a").build().unwrap(),
            FParameter::positional_or_keyword("b").build().unwrap(),
        ])
        .unwrap();
        let err = Mapper::new(fsig.clone(), &target(Vec::new())).unwrap_err();
        assert_eq!(err.to_string(), "Missing requisite mapping from parameters (a, b)");

        let sink = Parameter::new("kwargs", ParameterKind::VarKeyword);
        let mapper = Mapper::new(fsig, &target(vec![sink])).unwrap();
        let forwarded = mapper
            .map(&CallArguments::positional(vec![json!(1), json!(2)]))
            .unwrap();
        assert_eq!(
            forwarded,
            CallArguments::default().kwarg("a", json!(1)).kwarg("b", json!(2))
        );
    }

    #[test]
    fn var_keyword_merges_into_target_sink() {
        let fsig = FSignature::new(fparams![
            FParameter::keyword_only("extra").default(json!(0)).build().unwrap(),
            VarKeyword::new().named("options"),
        ])
        .unwrap();
        let sink = Parameter::new("kwargs", ParameterKind::VarKeyword);
        let mapper = Mapper::new(fsig, &target(vec![sink])).unwrap();

        let forwarded = mapper
            .map(&CallArguments::default().kwarg("x", json!(1)))
            .unwrap();
        assert_eq!(
            forwarded,
            CallArguments::default().kwarg("extra", json!(0)).kwarg("x", json!(1))
        );
    }

    #[test]
    fn var_positional_spills_positionally() {
        let fsig = FSignature::new(fparams![
            FParameter::positional_or_keyword("a").build().unwrap(),
            VarPositional::new(),
        ])
        .unwrap();
        let mapper = Mapper::for_internal(fsig, "func").unwrap();

        let forwarded = mapper
            .map(&CallArguments::positional(vec![json!(1), json!(2)]))
            .unwrap();
        assert_eq!(forwarded, CallArguments::positional(vec![json!(1), json!(2)]));

        let forwarded = mapper.map(&CallArguments::positional(vec![json!(1)])).unwrap();
        assert_eq!(forwarded, CallArguments::default().kwarg("a", json!(1)));
    }

    #[test]
    fn converters_see_context_and_interface_name() {
        let fsig = FSignature::new(vec![
            FParameter::contextual("self").build().unwrap(),
            FParameter::positional_or_keyword("_a")
                .interface_name("a")
                .converter(Converter::new("describe", |ctx, name, value| {
                    Ok(json!(format!("{}.{}={}", ctx["id"], name, value)))
                }))
                .build()
                .unwrap(),
        ])
        .unwrap();
        let mapper = Mapper::for_internal(fsig, "method").unwrap();

        let forwarded = mapper
            .map(&CallArguments::positional(vec![json!({"id": 9}), json!(1)]))
            .unwrap();
        assert_eq!(
            forwarded,
            CallArguments::default()
                .kwarg("self", json!({"id": 9}))
                .kwarg("_a", json!("9.a=1"))
        );
    }

    #[test]
    fn contextual_factory_runs_once_and_is_the_context() {
        let made = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&made);
        let fsig = FSignature::new(vec![
            FParameter::contextual("self")
                .factory(Factory::new("next_id", move || {
                    Ok(json!(counter.fetch_add(1, Ordering::SeqCst) + 1))
                }))
                .build()
                .unwrap(),
            FParameter::keyword_only("a")
                .converter(Converter::new("echo_ctx", |ctx, _, _| Ok(ctx.clone())))
                .build()
                .unwrap(),
        ])
        .unwrap();
        let mapper = Mapper::for_internal(fsig, "method").unwrap();

        let forwarded = mapper.map(&CallArguments::default().kwarg("a", json!(0))).unwrap();
        assert_eq!(
            forwarded,
            CallArguments::default().kwarg("self", json!(1)).kwarg("a", json!(1))
        );
        assert_eq!(made.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn extra_keyword_cannot_overwrite_mapped_value() {
        let fsig = FSignature::new(fparams![
            FParameter::positional_or_keyword("_a").interface_name("a").build().unwrap(),
            VarKeyword::new(),
        ])
        .unwrap();
        let sink = Parameter::new("kwargs", ParameterKind::VarKeyword);
        let mapper = Mapper::new(fsig, &target(vec![sink])).unwrap();

        let err = mapper
            .map(&CallArguments::default().kwarg("a", json!(5)).kwarg("_a", json!(-99)))
            .unwrap_err();
        assert_eq!(err.to_string(), "func() multiple values for argument '_a'");

        let forwarded = mapper
            .map(&CallArguments::default().kwarg("a", json!(5)).kwarg("b", json!(6)))
            .unwrap();
        assert_eq!(
            forwarded,
            CallArguments::default().kwarg("_a", json!(5)).kwarg("b", json!(6))
        );
    }

    #[test]
    fn binding_errors_carry_callable_name() {
        let fsig = FSignature::new(vec![FParameter::positional_or_keyword("a").build().unwrap()]).unwrap();
        let mapper = Mapper::for_internal(fsig, "func").unwrap();
        let err = mapper.map(&CallArguments::default()).unwrap_err();
        assert_eq!(err.to_string(), "func() missing a required argument: 'a'");
    }

    #[test]
    fn validator_failure_aborts_mapping() {
        let _guard = crate::config::test_lock();
        let fsig = FSignature::new(vec![FParameter::positional_or_keyword("a")
            .validator(Validator::new("never", |_, name, _| anyhow::bail!("{} rejected", name)))
            .build()
            .unwrap()])
        .unwrap();
        let mapper = Mapper::for_internal(fsig, "func").unwrap();

        let err = mapper.map(&CallArguments::positional(vec![json!(1)])).unwrap_err();
        assert_eq!(err.to_string(), "a rejected");
    }

    #[test]
    fn fields_describe_the_mapping() {
        let fsig = FSignature::new(vec![
            FParameter::positional_or_keyword("_a").interface_name("a").build().unwrap(),
        ])
        .unwrap();
        let mapper = Mapper::for_internal(fsig, "func").unwrap();
        assert_eq!(mapper.field("parameter_map").as_deref(), Some("{_a: _a}"));
        assert_eq!(mapper.to_string(), "<Mapper (a) => (_a)>");
    }
}
