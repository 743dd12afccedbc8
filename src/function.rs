//! Callables and their revised wrappers
//!
//! A [`Callable`] is a named function with a declared [`Signature`] that
//! takes a concrete [`CallArguments`]. [`Forged`] wraps one behind a revised
//! [`FSignature`]: callers use the external convention, and the wrapped
//! callable receives the mapped internal call.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::binding::CallArguments;
use crate::compose::Revision;
use crate::error::{ForgeError, Result};
use crate::mapper::Mapper;
use crate::native::Signature;
use crate::parameter::FParameter;
use crate::signature::FSignature;

pub type CallableFn = dyn Fn(CallArguments) -> anyhow::Result<Value> + Send + Sync;

#[derive(Clone)]
pub struct Callable {
    name: String,
    signature: Signature,
    func: Arc<CallableFn>,
}

impl Callable {
    pub fn new(
        name: impl Into<String>,
        signature: Signature,
        func: impl Fn(CallArguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Invoke directly; the arguments are not checked against the signature.
    pub fn call(&self, arguments: CallArguments) -> Result<Value> {
        (self.func)(arguments).map_err(ForgeError::from)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .finish()
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.signature)
    }
}

/// A callable behind a revised signature.
#[derive(Debug, Clone)]
pub struct Forged {
    mapper: Mapper,
    inner: Callable,
}

impl Forged {
    pub fn new(fsignature: FSignature, inner: Callable) -> Result<Self> {
        let mapper = Mapper::new(fsignature, &inner)?;
        Ok(Self { mapper, inner })
    }

    /// Map the call, then invoke the wrapped callable. Nothing is invoked
    /// when binding or any parameter pipeline fails.
    pub fn call(&self, arguments: CallArguments) -> Result<Value> {
        let mapped = self.mapper.map(&arguments)?;
        self.inner.call(mapped)
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// The external signature.
    pub fn signature(&self) -> &Signature {
        self.mapper.public_signature()
    }

    pub fn fsignature(&self) -> &FSignature {
        self.mapper.fsignature()
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn inner(&self) -> &Callable {
        &self.inner
    }

    /// Apply a further revision on top of the current signature. The wrapped
    /// callable is reused, never wrapped twice.
    pub fn revise(&self, revision: &dyn Revision) -> Result<Self> {
        let fsignature = revision.revise(self.fsignature())?;
        debug!(callable = %self.inner.name(), signature = %fsignature, "revised");
        Self::new(fsignature, self.inner.clone())
    }

    /// A plain callable with the external signature.
    pub fn to_callable(&self) -> Callable {
        let forged = self.clone();
        Callable::new(self.name(), self.signature().clone(), move |arguments| {
            forged.call(arguments).map_err(anyhow::Error::from)
        })
    }
}

impl fmt::Display for Forged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.signature())
    }
}

/// Wrap `callable` behind exactly `parameters`.
pub fn sign(parameters: impl IntoIterator<Item = FParameter>, callable: Callable) -> Result<Forged> {
    let fsignature = FSignature::new(parameters)?
        .with_return_annotation(callable.signature().return_annotation.clone());
    Forged::new(fsignature, callable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::Validator;
    use crate::native::{Parameter, ParameterKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo(params: Vec<Parameter>) -> Callable {
        Callable::new("echo", Signature::new(params), |arguments| {
            Ok(serde_json::to_value(arguments)?)
        })
    }

    #[test]
    fn forged_exposes_external_signature() {
        let inner = echo(vec![Parameter::new("_a", ParameterKind::PositionalOrKeyword)]);
        let forged = sign(
            vec![FParameter::positional_or_keyword("_a").interface_name("a").build().unwrap()],
            inner,
        )
        .unwrap();

        assert_eq!(forged.signature().to_string(), "(a)");
        assert_eq!(forged.inner().signature().to_string(), "(_a)");
        assert_eq!(forged.to_string(), "echo(a)");
    }

    #[test]
    fn inner_is_not_invoked_on_failure() {
        let _guard = crate::config::test_lock();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let inner = Callable::new(
            "counted",
            Signature::new(vec![Parameter::new("a", ParameterKind::PositionalOrKeyword)]),
            move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            },
        );
        let forged = sign(
            vec![FParameter::positional_or_keyword("a")
                .validator(Validator::new("small", |_, _, v| {
                    anyhow::ensure!(v.as_i64() < Some(10), "too big");
                    Ok(())
                }))
                .build()
                .unwrap()],
            inner,
        )
        .unwrap();

        assert!(forged.call(CallArguments::positional(vec![json!(99)])).is_err());
        assert!(forged.call(CallArguments::default().kwarg("b", json!(1))).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        forged.call(CallArguments::positional(vec![json!(1)])).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callable_errors_pass_through() {
        let inner = Callable::new("fails", Signature::default(), |_| {
            Err(anyhow::anyhow!("inner failure"))
        });
        let err = inner.call(CallArguments::default()).unwrap_err();
        assert_eq!(err.to_string(), "inner failure");
        assert!(err.callback().is_some());
    }

    #[test]
    fn to_callable_round_trips_through_mapping() {
        let inner = echo(vec![Parameter::new("_a", ParameterKind::KeywordOnly)]);
        let forged = sign(
            vec![FParameter::keyword_only("_a").interface_name("a").build().unwrap()],
            inner,
        )
        .unwrap();
        let plain = forged.to_callable();

        assert_eq!(plain.signature().to_string(), "(*, a)");
        assert_eq!(
            plain.call(CallArguments::default().kwarg("a", json!(1))).unwrap(),
            json!({"args": [], "kwargs": {"_a": 1}})
        );
    }

    #[test]
    fn sign_keeps_return_annotation() {
        let inner = Callable::new(
            "typed",
            Signature::default().with_return_annotation("int"),
            |_| Ok(json!(0)),
        );
        let forged = sign(Vec::new(), inner).unwrap();
        assert_eq!(forged.signature().to_string(), "() -> int");
    }
}
