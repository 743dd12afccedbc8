//! Helpers for working with callables and their signatures.

use serde_json::{Map, Value};

use crate::binding::CallArguments;
use crate::error::{ForgeError, Result};
use crate::function::Callable;
use crate::native::{render_parameters, Parameter, Signature};

pub fn getparam<'a>(callable: &'a Callable, name: &str) -> Result<&'a Parameter> {
    callable
        .signature()
        .get(name)
        .ok_or_else(|| ForgeError::no_parameter(callable.name(), name))
}

pub fn hasparam(callable: &Callable, name: &str) -> bool {
    callable.signature().has_param(name)
}

/// `a, /, b=1, *args, c, **kwargs`
pub fn stringify_parameters(parameters: &[Parameter]) -> String {
    render_parameters(parameters, |p| p.kind)
}

/// `name(params) -> T`
pub fn stringify_callable(callable: &Callable) -> String {
    format!("{}{}", callable.name(), callable.signature())
}

/// Build the call for `signature` from values keyed by parameter name, plus
/// extra positional values for its `*args`.
///
/// Missing parameters take their declared default. Names the signature does
/// not declare go to `**kwargs`.
pub fn sort_arguments(
    signature: &Signature,
    mut named: Map<String, Value>,
    unnamed: Vec<Value>,
) -> Result<CallArguments> {
    let mut args = Vec::new();
    let mut kwargs = Map::new();

    for param in &signature.parameters {
        if param.kind.is_variadic() {
            continue;
        }

        let value = match named.remove(&param.name) {
            Some(value) => value,
            None => param.default.resolve()?.ok_or_else(|| {
                ForgeError::Sort(format!(
                    "Non-default parameter '{}' has no argument value",
                    param.name
                ))
            })?,
        };

        if param.kind.accepts_positional() {
            args.push(value);
        } else {
            kwargs.insert(param.name.clone(), value);
        }
    }

    if !named.is_empty() {
        if signature.var_keyword().is_none() {
            let names: Vec<&str> = named.keys().map(String::as_str).collect();
            return Err(ForgeError::Sort(format!(
                "Cannot sort arguments ({})",
                names.join(", ")
            )));
        }
        kwargs.extend(named);
    }

    if !unnamed.is_empty() {
        if signature.var_positional().is_none() {
            return Err(ForgeError::Sort(
                "Cannot sort var-positional arguments".to_string(),
            ));
        }
        args.extend(unnamed);
    }

    Ok(CallArguments::new(args, kwargs))
}

/// Sort the arguments for `callable`, then call it.
pub fn callwith(callable: &Callable, named: Map<String, Value>, unnamed: Vec<Value>) -> Result<Value> {
    let arguments = sort_arguments(callable.signature(), named, unnamed)?;
    callable.call(arguments)
}
