//! Type Descriptors
//!
//! Immutable per-type metadata built once at startup: the resolved class, the
//! remote method table and the optional lifecycle hooks.
//!
//! # Duplicate names
//!
//! Two remote methods with the same name on one class, or two configuration
//! entries with the same actor type, resolve the same way: the last one
//! registered wins and earlier bindings are replaced with a warning.

use crate::config::ActorConfig;
use crate::{ActorClass, ActorError, MethodHandle, MethodKind, Result, TypeResolver};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Static metadata for one actor type
pub struct TypeDescriptor {
    type_name: String,
    class: Arc<dyn ActorClass>,
    methods: HashMap<String, MethodHandle>,
    activate_hook: Option<MethodHandle>,
    deactivate_hook: Option<MethodHandle>,
}

impl TypeDescriptor {
    /// Resolve `class_name` and index the class's methods under `type_name`
    pub fn build(type_name: &str, class_name: &str, resolver: &dyn TypeResolver) -> Result<Self> {
        let class = resolver
            .resolve_type(class_name)
            .ok_or_else(|| ActorError::type_resolution(type_name, class_name))?;
        Self::from_class(type_name, class)
    }

    /// Index an already resolved class
    pub fn from_class(type_name: &str, class: Arc<dyn ActorClass>) -> Result<Self> {
        let mut methods = HashMap::new();
        let mut activate = Vec::new();
        let mut deactivate = Vec::new();

        for spec in class.methods() {
            match spec.kind {
                MethodKind::Remote => {
                    if methods.insert(spec.name.clone(), spec.handle).is_some() {
                        warn!(
                            actor_type = %type_name,
                            class_name = %class.class_name(),
                            method = %spec.name,
                            "Overloaded method name, keeping the last registration"
                        );
                    }
                }
                MethodKind::Activate => activate.push(spec),
                MethodKind::Deactivate => deactivate.push(spec),
            }
        }

        let activate_hook = single_hook(class.class_name(), MethodKind::Activate, activate)?;
        let deactivate_hook = single_hook(class.class_name(), MethodKind::Deactivate, deactivate)?;

        debug!(
            actor_type = %type_name,
            class_name = %class.class_name(),
            method_count = methods.len(),
            has_activate = activate_hook.is_some(),
            has_deactivate = deactivate_hook.is_some(),
            "Built type descriptor"
        );

        Ok(Self {
            type_name: type_name.to_string(),
            class,
            methods,
            activate_hook,
            deactivate_hook,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn class_name(&self) -> &str {
        self.class.class_name()
    }

    pub fn class(&self) -> &Arc<dyn ActorClass> {
        &self.class
    }

    /// Look up a remote method by name
    pub fn method(&self, name: &str) -> Result<MethodHandle> {
        self.methods
            .get(name)
            .cloned()
            .ok_or_else(|| ActorError::unknown_method(&self.type_name, name))
    }

    /// Remote method names, sorted
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn activate_hook(&self) -> Option<&MethodHandle> {
        self.activate_hook.as_ref()
    }

    pub fn deactivate_hook(&self) -> Option<&MethodHandle> {
        self.deactivate_hook.as_ref()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("class_name", &self.class_name())
            .field("methods", &self.method_names())
            .field("activate_hook", &self.activate_hook.is_some())
            .field("deactivate_hook", &self.deactivate_hook.is_some())
            .finish()
    }
}

fn single_hook(
    class_name: &str,
    kind: MethodKind,
    mut candidates: Vec<crate::MethodSpec>,
) -> Result<Option<MethodHandle>> {
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.pop().map(|spec| spec.handle)),
        _ => Err(ActorError::AmbiguousLifecycleHook {
            class_name: class_name.to_string(),
            role: kind.role(),
            candidates: candidates.into_iter().map(|spec| spec.name).collect(),
        }),
    }
}

/// Every known actor type, built once and read-only afterwards
#[derive(Debug, Default, Clone)]
pub struct TypeTable {
    types: HashMap<String, Arc<TypeDescriptor>>,
}

impl TypeTable {
    /// Build descriptors for every configured binding, in order
    ///
    /// Fails on the first resolution or hook defect; a partial table is never
    /// returned.
    pub fn build(config: &ActorConfig, resolver: &dyn TypeResolver) -> Result<Self> {
        let mut types = HashMap::new();

        for binding in &config.actors {
            if binding.type_name.trim().is_empty() {
                return Err(ActorError::configuration(
                    "actor type name must not be empty",
                    Some("type"),
                ));
            }

            let descriptor = TypeDescriptor::build(&binding.type_name, &binding.class_name, resolver)?;
            if let Some(previous) = types.insert(binding.type_name.clone(), Arc::new(descriptor)) {
                warn!(
                    actor_type = %binding.type_name,
                    replaced_class = %previous.class_name(),
                    class_name = %binding.class_name,
                    "Actor type registered twice, keeping the last registration"
                );
            }
        }

        info!(type_count = types.len(), "Actor type table initialized");
        Ok(Self { types })
    }

    /// Table from already built descriptors; later duplicates win
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        let types = descriptors
            .into_iter()
            .map(|d| (d.type_name().to_string(), Arc::new(d)))
            .collect();
        Self { types }
    }

    pub fn get(&self, type_name: &str) -> Result<&Arc<TypeDescriptor>> {
        self.types
            .get(type_name)
            .ok_or_else(|| ActorError::unknown_actor_type(type_name))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActorTypeBinding;
    use crate::{ActorClassBuilder, ActorIdentity, ClassCatalog};
    use proptest::prelude::*;
    use serde_json::{json, Value};

    #[derive(Default)]
    struct Counter {
        value: i64,
    }

    #[derive(Default)]
    struct Gauge;

    fn catalog() -> ClassCatalog {
        ClassCatalog::new()
            .with(
                ActorClassBuilder::<Counter>::with_default("demo.Counter")
                    .method("increment", |c: &mut Counter, _: ()| {
                        c.value += 1;
                        Ok(c.value)
                    })
                    .method("get", |c: &mut Counter, _: ()| Ok(c.value))
                    .build(),
            )
            .with(
                ActorClassBuilder::<Gauge>::with_default("demo.Gauge")
                    .method("read", |_: &mut Gauge, _: ()| Ok("gauge"))
                    .build(),
            )
    }

    fn config(bindings: &[(&str, &str)]) -> ActorConfig {
        ActorConfig {
            actors: bindings
                .iter()
                .map(|(t, c)| ActorTypeBinding::new(*t, *c))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_descriptor_indexes_methods() {
        let descriptor = TypeDescriptor::build("counter", "demo.Counter", &catalog()).unwrap();
        assert_eq!(descriptor.type_name(), "counter");
        assert_eq!(descriptor.class_name(), "demo.Counter");
        assert_eq!(descriptor.method_names(), vec!["get", "increment"]);
        assert!(descriptor.method("increment").is_ok());
        assert!(descriptor.activate_hook().is_none());
        assert!(matches!(
            descriptor.method("missing"),
            Err(ActorError::UnknownMethod { .. })
        ));
    }

    #[test]
    fn test_unresolvable_class() {
        let err = TypeDescriptor::build("counter", "demo.Missing", &catalog()).unwrap_err();
        assert!(matches!(err, ActorError::TypeResolution { .. }));
        assert!(err.is_startup_fatal());
    }

    #[test]
    fn test_overloaded_method_last_wins() {
        let class = ActorClassBuilder::<Counter>::with_default("demo.Overloaded")
            .method("describe", |_: &mut Counter, _: ()| Ok("first"))
            .method("describe", |_: &mut Counter, _: ()| Ok("second"))
            .build();
        let descriptor = TypeDescriptor::from_class("overloaded", class.clone()).unwrap();

        let identity = ActorIdentity::new("overloaded", "o1").unwrap();
        let mut instance = class.construct(&identity).unwrap();
        let result = descriptor
            .method("describe")
            .unwrap()
            .call(instance.as_mut(), Value::Null)
            .unwrap();
        assert_eq!(result, json!("second"));
        assert_eq!(descriptor.method_names(), vec!["describe"]);
    }

    #[test]
    fn test_ambiguous_activate_hook() {
        let class = ActorClassBuilder::<Counter>::with_default("demo.TwoActivates")
            .on_activate(|_| Ok(()))
            .on_activate(|_| Ok(()))
            .build();
        let err = TypeDescriptor::from_class("two", class).unwrap_err();
        match err {
            ActorError::AmbiguousLifecycleHook { role, candidates, .. } => {
                assert_eq!(role, "activate");
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("Expected ambiguous hook error, got {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_deactivate_hook() {
        let class = ActorClassBuilder::<Counter>::with_default("demo.TwoDeactivates")
            .on_activate(|_| Ok(()))
            .on_deactivate(|_| Ok(()))
            .on_deactivate(|_| Ok(()))
            .build();
        assert!(matches!(
            TypeDescriptor::from_class("two", class),
            Err(ActorError::AmbiguousLifecycleHook { role: "deactivate", .. })
        ));
    }

    #[test]
    fn test_table_duplicate_type_last_wins() {
        let table = TypeTable::build(
            &config(&[("meter", "demo.Counter"), ("meter", "demo.Gauge")]),
            &catalog(),
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("meter").unwrap().class_name(), "demo.Gauge");
    }

    #[test]
    fn test_table_refuses_partial_configuration() {
        let err = TypeTable::build(
            &config(&[("counter", "demo.Counter"), ("ghost", "demo.Ghost")]),
            &catalog(),
        )
        .unwrap_err();
        assert!(matches!(err, ActorError::TypeResolution { ref actor_type, .. } if actor_type == "ghost"));
    }

    #[test]
    fn test_table_unknown_type() {
        let table = TypeTable::build(&config(&[("counter", "demo.Counter")]), &catalog()).unwrap();
        assert!(table.contains("counter"));
        assert!(matches!(
            table.get("widget"),
            Err(ActorError::UnknownActorType { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_last_registration_wins(choices in proptest::collection::vec(any::<bool>(), 1..12)) {
            let bindings: Vec<_> = choices
                .iter()
                .map(|&gauge| ("meter", if gauge { "demo.Gauge" } else { "demo.Counter" }))
                .collect();
            let table = TypeTable::build(&config(&bindings), &catalog()).unwrap();

            let expected = bindings.last().unwrap().1;
            prop_assert_eq!(table.get("meter").unwrap().class_name(), expected);
        }
    }
}
