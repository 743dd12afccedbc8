//! Call binding
//!
//! [`CallArguments`] is one concrete call: positional values plus keyword
//! values. [`Signature::bind`] matches a call against a calling convention
//! with the usual precedence rules and yields [`BoundArguments`]: one slot per
//! declared parameter, void where nothing was supplied. Bound arguments go
//! back to a concrete call with [`BoundArguments::to_call_arguments`].

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{BindingError, ForgeError, Result};
use crate::immutable::Immutable;
use crate::native::{ParamDefault, Parameter, ParameterKind, Signature};

// =============================================================================
// CALL ARGUMENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CallArguments {
    #[serde(default)]
    args: Vec<Value>,
    #[serde(default)]
    kwargs: Map<String, Value>,
}

impl CallArguments {
    pub fn new(args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Self { args, kwargs }
    }

    pub fn positional(args: Vec<Value>) -> Self {
        Self {
            args,
            kwargs: Map::new(),
        }
    }

    pub fn keywords(kwargs: Map<String, Value>) -> Self {
        Self {
            args: Vec::new(),
            kwargs,
        }
    }

    /// Append a positional value, returning the extended call.
    pub fn arg(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    /// Add a keyword value, returning the extended call.
    pub fn kwarg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(name.into(), value);
        self
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.kwargs
    }

    pub fn into_parts(self) -> (Vec<Value>, Map<String, Value>) {
        (self.args, self.kwargs)
    }

    pub fn to_bound_arguments(
        &self,
        signature: &Signature,
        partial: bool,
    ) -> std::result::Result<BoundArguments, BindingError> {
        bind_arguments(signature, "", self, partial)
    }
}

impl fmt::Display for CallArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components: Vec<String> = self
            .args
            .iter()
            .map(Value::to_string)
            .chain(self.kwargs.iter().map(|(k, v)| format!("{}={}", k, v)))
            .collect();
        write!(f, "<CallArguments ({})>", components.join(", "))
    }
}

impl Immutable for CallArguments {
    const FIELDS: &'static [&'static str] = &["args", "kwargs"];

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "args" => Some(Value::Array(self.args.clone()).to_string()),
            "kwargs" => Some(Value::Object(self.kwargs.clone()).to_string()),
            _ => None,
        }
    }
}

// =============================================================================
// BOUND ARGUMENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct BoundSlot {
    name: String,
    kind: ParameterKind,
    default: ParamDefault,
    value: Option<Value>,
}

/// One slot per declared parameter, in declaration order.
///
/// Non-variadic slots are void until a value is supplied. Variadic slots
/// always hold a value: an array for `*args`, an object for `**kwargs`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArguments {
    slots: Vec<BoundSlot>,
}

impl BoundArguments {
    /// Every slot void, variadics empty.
    pub fn unbound(signature: &Signature) -> Self {
        let slots = signature
            .parameters
            .iter()
            .map(|param| BoundSlot {
                name: param.name.clone(),
                kind: param.kind,
                default: param.default.clone(),
                value: match param.kind {
                    ParameterKind::VarPositional => Some(Value::Array(Vec::new())),
                    ParameterKind::VarKeyword => Some(Value::Object(Map::new())),
                    _ => None,
                },
            })
            .collect();
        Self { slots }
    }

    /// The bound value, `None` when the slot is void or undeclared.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slot(name).and_then(|slot| slot.value.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    /// Assign a declared slot. Returns `false` when no such slot exists.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.slot_mut(name) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    pub(crate) fn slot_mut(&mut self, name: &str) -> Option<&mut Option<Value>> {
        self.slots
            .iter_mut()
            .find(|slot| slot.name == name)
            .map(|slot| &mut slot.value)
    }

    fn slot(&self, name: &str) -> Option<&BoundSlot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    /// `(name, value)` pairs in declaration order; void slots yield `None`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.slots
            .iter()
            .map(|slot| (slot.name.as_str(), slot.value.as_ref()))
    }

    pub fn into_values(self) -> Vec<(String, Option<Value>)> {
        self.slots
            .into_iter()
            .map(|slot| (slot.name, slot.value))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Fill void slots from their declared defaults; factories run once each.
    pub fn apply_defaults(&mut self) -> Result<()> {
        for slot in self.slots.iter_mut().filter(|slot| slot.value.is_none()) {
            slot.value = slot.default.resolve()?;
        }
        Ok(())
    }

    /// Redistribute into a concrete call.
    ///
    /// Positional-or-keyword values go by position only when the
    /// var-positional slot has something in it. Once a positional slot is
    /// void, later positional-or-keyword values fall back to keywords.
    pub fn to_call_arguments(&self) -> Result<CallArguments> {
        let spill_positionally = self.slots.iter().any(|slot| {
            slot.kind == ParameterKind::VarPositional
                && matches!(&slot.value, Some(Value::Array(values)) if !values.is_empty())
        });

        let mut args = Vec::new();
        let mut kwargs = Map::new();
        let mut positional_open = true;

        for slot in &self.slots {
            let Some(value) = slot.value.clone() else {
                if slot.kind.accepts_positional() {
                    positional_open = false;
                }
                continue;
            };

            match slot.kind {
                ParameterKind::PositionalOnly => args.push(value),
                ParameterKind::PositionalOrKeyword => {
                    if spill_positionally && positional_open {
                        args.push(value);
                    } else {
                        kwargs.insert(slot.name.clone(), value);
                    }
                }
                ParameterKind::VarPositional => match value {
                    Value::Array(values) => args.extend(values),
                    _ => {
                        return Err(ForgeError::InvalidParameter(format!(
                            "variable-positional argument '{}' must be an array",
                            slot.name
                        )))
                    }
                },
                ParameterKind::KeywordOnly => {
                    kwargs.insert(slot.name.clone(), value);
                }
                ParameterKind::VarKeyword => match value {
                    Value::Object(values) => kwargs.extend(values),
                    _ => {
                        return Err(ForgeError::InvalidParameter(format!(
                            "variable-keyword argument '{}' must be an object",
                            slot.name
                        )))
                    }
                },
            }
        }

        Ok(CallArguments::new(args, kwargs))
    }
}

// =============================================================================
// BINDER
// =============================================================================

impl Signature {
    /// Bind a complete call. `callable` prefixes every error message.
    pub fn bind(
        &self,
        callable: &str,
        arguments: &CallArguments,
    ) -> std::result::Result<BoundArguments, BindingError> {
        bind_arguments(self, callable, arguments, false)
    }

    /// Bind a call that may omit required arguments.
    pub fn bind_partial(
        &self,
        callable: &str,
        arguments: &CallArguments,
    ) -> std::result::Result<BoundArguments, BindingError> {
        bind_arguments(self, callable, arguments, true)
    }
}

fn bind_arguments(
    signature: &Signature,
    callable: &str,
    arguments: &CallArguments,
    partial: bool,
) -> std::result::Result<BoundArguments, BindingError> {
    let mut bound = BoundArguments::unbound(signature);
    let mut kwargs = arguments.kwargs.clone();
    let mut positional: VecDeque<Value> = arguments.args.iter().cloned().collect();

    let params = &signature.parameters;
    let mut cursor = 0;

    // Positional phase: walk parameters while positional values remain.
    while let Some(value) = positional.pop_front() {
        let Some(param) = params.get(cursor) else {
            return Err(BindingError::TooManyPositional {
                callable: callable.to_string(),
            });
        };
        match param.kind {
            ParameterKind::KeywordOnly | ParameterKind::VarKeyword => {
                return Err(BindingError::TooManyPositional {
                    callable: callable.to_string(),
                });
            }
            ParameterKind::VarPositional => {
                let mut collected = vec![value];
                collected.extend(positional.drain(..));
                bound.set(&param.name, Value::Array(collected));
                cursor += 1;
                break;
            }
            ParameterKind::PositionalOrKeyword if kwargs.contains_key(&param.name) => {
                return Err(BindingError::MultipleValues {
                    callable: callable.to_string(),
                    name: param.name.clone(),
                });
            }
            _ => {
                bound.set(&param.name, value);
                cursor += 1;
            }
        }
    }

    // Keyword phase: everything not consumed by position.
    let mut var_keyword: Option<&Parameter> = None;
    for param in &params[cursor..] {
        match param.kind {
            ParameterKind::VarKeyword => {
                var_keyword = Some(param);
                continue;
            }
            ParameterKind::VarPositional => continue,
            _ => {}
        }

        match kwargs.remove(&param.name) {
            Some(value) => {
                if param.kind == ParameterKind::PositionalOnly {
                    return Err(BindingError::PositionalOnlyAsKeyword {
                        callable: callable.to_string(),
                        name: param.name.clone(),
                    });
                }
                bound.set(&param.name, value);
            }
            None => {
                if !partial && !param.has_default() {
                    return Err(BindingError::MissingArgument {
                        callable: callable.to_string(),
                        name: param.name.clone(),
                    });
                }
            }
        }
    }

    if !kwargs.is_empty() {
        match var_keyword {
            Some(param) => {
                bound.set(&param.name, Value::Object(kwargs));
            }
            None => {
                let name = kwargs.keys().next().cloned().unwrap_or_default();
                return Err(BindingError::UnexpectedKeyword {
                    callable: callable.to_string(),
                    name,
                });
            }
        }
    }

    trace!(callable = callable, slots = bound.len(), "bound call arguments");
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sig(params: &[(&str, ParameterKind)]) -> Signature {
        Signature::new(
            params
                .iter()
                .map(|(name, kind)| Parameter::new(*name, *kind))
                .collect(),
        )
    }

    fn values(bound: &BoundArguments) -> Vec<(String, Option<Value>)> {
        bound.clone().into_values()
    }

    #[test]
    fn display_lists_positional_then_keyword() {
        let call = CallArguments::positional(vec![json!(1), json!(2)]).kwarg("a", json!(3));
        assert_eq!(call.to_string(), "<CallArguments (1, 2, a=3)>");
        assert_eq!(CallArguments::default().to_string(), "<CallArguments ()>");
    }

    #[test]
    fn call_arguments_deserialize_with_missing_halves() {
        let call: CallArguments = serde_json::from_value(json!({"args": [1]})).unwrap();
        assert_eq!(call, CallArguments::positional(vec![json!(1)]));
    }

    #[test]
    fn binds_positional_and_keyword() {
        use ParameterKind::*;
        let signature = sig(&[("a", PositionalOnly), ("b", PositionalOrKeyword), ("c", KeywordOnly)]);
        let call = CallArguments::positional(vec![json!(1)])
            .kwarg("b", json!(2))
            .kwarg("c", json!(3));

        let bound = signature.bind("f", &call).unwrap();
        assert_eq!(
            values(&bound),
            vec![
                ("a".to_string(), Some(json!(1))),
                ("b".to_string(), Some(json!(2))),
                ("c".to_string(), Some(json!(3))),
            ]
        );
    }

    #[test]
    fn variadics_collect_leftovers() {
        use ParameterKind::*;
        let signature = sig(&[("a", PositionalOrKeyword), ("args", VarPositional), ("kwargs", VarKeyword)]);
        let call = CallArguments::positional(vec![json!(1), json!(2), json!(3)]).kwarg("x", json!(4));

        let bound = signature.bind("f", &call).unwrap();
        assert_eq!(bound.get("args"), Some(&json!([2, 3])));
        assert_eq!(bound.get("kwargs"), Some(&json!({"x": 4})));
    }

    #[test]
    fn unsupplied_slots_are_void_and_variadics_empty() {
        use ParameterKind::*;
        let signature = Signature::new(vec![
            Parameter::new("a", PositionalOrKeyword).with_default(json!(1)),
            Parameter::new("args", VarPositional),
            Parameter::new("kwargs", VarKeyword),
        ]);
        let bound = signature.bind("f", &CallArguments::default()).unwrap();
        assert_eq!(bound.get("a"), None);
        assert!(bound.contains("a"));
        assert_eq!(bound.get("args"), Some(&json!([])));
        assert_eq!(bound.get("kwargs"), Some(&json!({})));
    }

    #[test]
    fn binding_errors_name_the_callable() {
        use ParameterKind::*;
        let signature = sig(&[("a", PositionalOnly), ("b", PositionalOrKeyword)]);

        let cases = vec![
            (
                CallArguments::positional(vec![json!(1), json!(2), json!(3)]),
                "f() too many positional arguments",
            ),
            (
                CallArguments::positional(vec![json!(1)]),
                "f() missing a required argument: 'b'",
            ),
            (
                CallArguments::positional(vec![json!(1), json!(2)]).kwarg("z", json!(0)),
                "f() got an unexpected keyword argument 'z'",
            ),
            (
                CallArguments::positional(vec![json!(1), json!(2)]).kwarg("b", json!(0)),
                "f() multiple values for argument 'b'",
            ),
            (
                CallArguments::default().kwarg("a", json!(1)).kwarg("b", json!(2)),
                "f() 'a' parameter is positional only, but was passed as a keyword",
            ),
        ];
        for (call, expected) in cases {
            assert_eq!(signature.bind("f", &call).unwrap_err().to_string(), expected);
        }
    }

    #[test]
    fn positional_into_keyword_only_is_too_many() {
        let signature = sig(&[("a", ParameterKind::KeywordOnly)]);
        let err = signature
            .bind("g", &CallArguments::positional(vec![json!(1)]))
            .unwrap_err();
        assert_eq!(err, BindingError::TooManyPositional { callable: "g".into() });
    }

    #[test]
    fn partial_binding_tolerates_missing() {
        let signature = sig(&[("a", ParameterKind::PositionalOrKeyword)]);
        let bound = signature.bind_partial("f", &CallArguments::default()).unwrap();
        assert_eq!(bound.get("a"), None);

        let err = CallArguments::default()
            .to_bound_arguments(&signature, false)
            .unwrap_err();
        assert_eq!(err.to_string(), "missing a required argument: 'a'");
    }

    #[test]
    fn apply_defaults_fills_only_void_slots() {
        use ParameterKind::*;
        let signature = Signature::new(vec![
            Parameter::new("a", PositionalOrKeyword).with_default(json!(1)),
            Parameter::new("b", PositionalOrKeyword).with_default(json!(2)),
            Parameter::new("c", KeywordOnly),
        ]);
        let mut bound = signature
            .bind_partial("f", &CallArguments::default().kwarg("b", json!(20)))
            .unwrap();
        bound.apply_defaults().unwrap();
        assert_eq!(
            values(&bound),
            vec![
                ("a".to_string(), Some(json!(1))),
                ("b".to_string(), Some(json!(20))),
                ("c".to_string(), None),
            ]
        );
    }

    #[test]
    fn redistribution_prefers_keywords_without_spill() {
        use ParameterKind::*;
        let signature = sig(&[
            ("a", PositionalOnly),
            ("b", PositionalOrKeyword),
            ("args", VarPositional),
            ("c", KeywordOnly),
            ("kwargs", VarKeyword),
        ]);
        let call = CallArguments::positional(vec![json!(1), json!(2)])
            .kwarg("c", json!(3))
            .kwarg("d", json!(4));

        let bound = signature.bind("f", &call).unwrap();
        let forwarded = bound.to_call_arguments().unwrap();
        assert_eq!(forwarded.args(), &[json!(1)]);
        assert_eq!(
            Value::Object(forwarded.kwargs().clone()),
            json!({"b": 2, "c": 3, "d": 4})
        );
    }

    #[test]
    fn redistribution_goes_positional_with_spill() {
        use ParameterKind::*;
        let signature = sig(&[("a", PositionalOrKeyword), ("args", VarPositional)]);
        let call = CallArguments::positional(vec![json!(1), json!(2), json!(3)]);

        let forwarded = signature.bind("f", &call).unwrap().to_call_arguments().unwrap();
        assert_eq!(forwarded, CallArguments::positional(vec![json!(1), json!(2), json!(3)]));
    }

    #[test]
    fn redistribution_rejects_malformed_variadics() {
        let signature = sig(&[("args", ParameterKind::VarPositional)]);
        let mut bound = BoundArguments::unbound(&signature);
        bound.set("args", json!("oops"));
        assert!(matches!(
            bound.to_call_arguments(),
            Err(ForgeError::InvalidParameter(_))
        ));
    }

    #[test]
    fn set_ignores_undeclared_names() {
        let signature = sig(&[("a", ParameterKind::PositionalOrKeyword)]);
        let mut bound = BoundArguments::unbound(&signature);
        assert!(!bound.set("zzz", json!(1)));
        assert!(bound.set("a", json!(1)));
        assert_eq!(bound.get("a"), Some(&json!(1)));
    }
}
