//! Actor Classes
//!
//! An [`ActorClass`] is the implementing type behind an actor type name: it
//! constructs fresh instances and enumerates the methods the gateway may call.
//! Instances are type-erased (`Box<dyn Any + Send>`) so the registry never
//! needs to know the concrete Rust type; method handles downcast on entry.
//!
//! ```rust
//! use actor_runtime::{ActorClassBuilder, Activatable};
//!
//! #[derive(Default)]
//! struct Counter {
//!     value: i64,
//! }
//!
//! impl Activatable for Counter {
//!     fn activate(&mut self) -> anyhow::Result<()> {
//!         self.value = 0;
//!         Ok(())
//!     }
//! }
//!
//! let class = ActorClassBuilder::<Counter>::with_default("demo.Counter")
//!     .method("increment", |c: &mut Counter, by: i64| {
//!         c.value += by;
//!         Ok(c.value)
//!     })
//!     .method("get", |c: &mut Counter, _: ()| Ok(c.value))
//!     .activatable()
//!     .build();
//!
//! assert_eq!(class.class_name(), "demo.Counter");
//! ```

use crate::ActorIdentity;
use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type RawMethod = dyn Fn(&mut dyn Any, Value) -> anyhow::Result<Value> + Send + Sync;
type Constructor<T> = dyn Fn(&ActorIdentity) -> anyhow::Result<T> + Send + Sync;

/// Role a method plays on its class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Invocable by the gateway
    Remote,
    /// Runs once after construction, before the instance is visible
    Activate,
    /// Runs once before the instance is removed
    Deactivate,
}

impl MethodKind {
    pub fn role(&self) -> &'static str {
        match self {
            MethodKind::Remote => "remote",
            MethodKind::Activate => "activate",
            MethodKind::Deactivate => "deactivate",
        }
    }
}

/// Callable bound to one method of one actor class
///
/// Cloning is cheap; all clones share the same function.
#[derive(Clone)]
pub struct MethodHandle {
    name: Arc<str>,
    class_name: Arc<str>,
    func: Arc<RawMethod>,
}

impl MethodHandle {
    pub fn new<F>(name: &str, class_name: &str, func: F) -> Self
    where
        F: Fn(&mut dyn Any, Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            class_name: Arc::from(class_name),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class whose instances this handle can be applied to
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub(crate) fn call(&self, target: &mut dyn Any, args: Value) -> anyhow::Result<Value> {
        (self.func)(target, args)
    }

    /// True when both handles wrap the same function
    pub fn same_method(&self, other: &MethodHandle) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodHandle")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .finish()
    }
}

/// One method as enumerated by a class
#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub name: String,
    pub kind: MethodKind,
    pub handle: MethodHandle,
}

/// Implementing type of an actor
pub trait ActorClass: Send + Sync {
    fn class_name(&self) -> &str;

    /// Construct a fresh, not yet activated instance
    fn construct(&self, identity: &ActorIdentity) -> anyhow::Result<Box<dyn Any + Send>>;

    /// Every method in registration order, overloads included
    fn methods(&self) -> Vec<MethodSpec>;
}

/// Activation hook expressed as a trait on the actor type
pub trait Activatable {
    fn activate(&mut self) -> anyhow::Result<()>;
}

/// Deactivation hook expressed as a trait on the actor type
pub trait Deactivatable {
    fn deactivate(&mut self) -> anyhow::Result<()>;
}

/// Builds an [`ActorClass`] for a concrete Rust type
pub struct ActorClassBuilder<T> {
    class_name: String,
    constructor: Arc<Constructor<T>>,
    methods: Vec<MethodSpec>,
}

impl<T: Send + 'static> ActorClassBuilder<T> {
    pub fn new<F>(class_name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&ActorIdentity) -> T + Send + Sync + 'static,
    {
        Self::try_new(class_name, move |identity| Ok(constructor(identity)))
    }

    /// Like [`ActorClassBuilder::new`] with a constructor that may fail
    pub fn try_new<F>(class_name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&ActorIdentity) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            class_name: class_name.into(),
            constructor: Arc::new(constructor),
            methods: Vec::new(),
        }
    }

    /// Register a remote method with serde-decoded arguments and result
    ///
    /// Methods taking no arguments use `()`, which decodes from JSON `null`.
    pub fn method<A, R, F>(self, name: &str, f: F) -> Self
    where
        A: DeserializeOwned,
        R: Serialize,
        F: Fn(&mut T, A) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        let method_name = name.to_string();
        self.raw_method(name, move |actor: &mut T, args: Value| {
            let args: A = serde_json::from_value(args)
                .with_context(|| format!("invalid arguments for '{}'", method_name))?;
            let result = f(actor, args)?;
            Ok(serde_json::to_value(result)?)
        })
    }

    /// Register a remote method working on raw JSON values
    pub fn raw_method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut T, Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let handle = self.erase(name, f);
        self.methods.push(MethodSpec {
            name: name.to_string(),
            kind: MethodKind::Remote,
            handle,
        });
        self
    }

    pub fn on_activate<F>(self, f: F) -> Self
    where
        F: Fn(&mut T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hook(MethodKind::Activate, "activate", f)
    }

    pub fn on_deactivate<F>(self, f: F) -> Self
    where
        F: Fn(&mut T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hook(MethodKind::Deactivate, "deactivate", f)
    }

    pub fn build(self) -> Arc<dyn ActorClass> {
        Arc::new(NativeActorClass {
            class_name: self.class_name,
            constructor: self.constructor,
            methods: self.methods,
        })
    }

    fn hook<F>(mut self, kind: MethodKind, name: &str, f: F) -> Self
    where
        F: Fn(&mut T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handle = self.erase(name, move |actor: &mut T, _args: Value| {
            f(actor)?;
            Ok(Value::Null)
        });
        self.methods.push(MethodSpec {
            name: name.to_string(),
            kind,
            handle,
        });
        self
    }

    fn erase<F>(&self, name: &str, f: F) -> MethodHandle
    where
        F: Fn(&mut T, Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let class_name = self.class_name.clone();
        MethodHandle::new(name, &self.class_name, move |target: &mut dyn Any, args| {
            let actor = target
                .downcast_mut::<T>()
                .ok_or_else(|| anyhow!("instance is not a {}", class_name))?;
            f(actor, args)
        })
    }
}

impl<T: Default + Send + 'static> ActorClassBuilder<T> {
    /// Builder whose instances start from `T::default()`
    pub fn with_default(class_name: impl Into<String>) -> Self {
        Self::new(class_name, |_| T::default())
    }
}

impl<T: Activatable + Send + 'static> ActorClassBuilder<T> {
    /// Use the type's [`Activatable`] impl as its activate hook
    pub fn activatable(self) -> Self {
        self.on_activate(|actor: &mut T| actor.activate())
    }
}

impl<T: Deactivatable + Send + 'static> ActorClassBuilder<T> {
    /// Use the type's [`Deactivatable`] impl as its deactivate hook
    pub fn deactivatable(self) -> Self {
        self.on_deactivate(|actor: &mut T| actor.deactivate())
    }
}

struct NativeActorClass<T> {
    class_name: String,
    constructor: Arc<Constructor<T>>,
    methods: Vec<MethodSpec>,
}

impl<T: Send + 'static> ActorClass for NativeActorClass<T> {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn construct(&self, identity: &ActorIdentity) -> anyhow::Result<Box<dyn Any + Send>> {
        let actor = (self.constructor)(identity)?;
        Ok(Box::new(actor))
    }

    fn methods(&self) -> Vec<MethodSpec> {
        self.methods.clone()
    }
}
