//! Named user callables
//!
//! Factories, converters and validators are user code plugged into the call
//! pipeline. Each is wrapped in a [`Hook`]: a display name plus a shared
//! function pointer. Two hooks are equal only when they share the same
//! function allocation, so cloning a hook keeps it equal to the original
//! while two separately-built closures never compare equal.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::immutable::Immutable;

pub type FactoryFn = dyn Fn() -> anyhow::Result<Value> + Send + Sync;
pub type ConverterFn = dyn Fn(&Value, &str, Value) -> anyhow::Result<Value> + Send + Sync;
pub type ValidatorFn = dyn Fn(&Value, &str, &Value) -> anyhow::Result<()> + Send + Sync;

/// Lazily produces a default value; invoked once per application.
pub type Factory = Hook<FactoryFn>;
/// `(context, name, value) -> value`
pub type Converter = Hook<ConverterFn>;
/// `(context, name, value) -> ()`; an `Err` marks the value invalid.
pub type Validator = Hook<ValidatorFn>;

pub struct Hook<F: ?Sized> {
    name: Arc<str>,
    func: Arc<F>,
}

impl<F: ?Sized> Hook<F> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<F: ?Sized> Clone for Hook<F> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            func: Arc::clone(&self.func),
        }
    }
}

impl<F: ?Sized> PartialEq for Hook<F> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl<F: ?Sized> fmt::Debug for Hook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Hook {}>", self.name)
    }
}

impl<F: ?Sized> Immutable for Hook<F> {
    const FIELDS: &'static [&'static str] = &["name"];

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.to_string()),
            _ => None,
        }
    }
}

impl Hook<FactoryFn> {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn() -> anyhow::Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    pub fn call(&self) -> anyhow::Result<Value> {
        (self.func)()
    }
}

impl fmt::Display for Hook<FactoryFn> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Factory {}>", self.name)
    }
}

impl Hook<ConverterFn> {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&Value, &str, Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    pub fn call(&self, ctx: &Value, name: &str, value: Value) -> anyhow::Result<Value> {
        (self.func)(ctx, name, value)
    }
}

impl Hook<ValidatorFn> {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&Value, &str, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    pub fn call(&self, ctx: &Value, name: &str, value: &Value) -> anyhow::Result<()> {
        (self.func)(ctx, name, value)
    }
}
