//! Type Resolver
//!
//! Resolves an implementing class name from configuration into an
//! [`ActorClass`]. Resolution happens once, while the type table is built.

use crate::ActorClass;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Capability that turns a class name into a class
pub trait TypeResolver: Send + Sync {
    fn resolve_type(&self, class_name: &str) -> Option<Arc<dyn ActorClass>>;
}

impl<F> TypeResolver for F
where
    F: Fn(&str) -> Option<Arc<dyn ActorClass>> + Send + Sync,
{
    fn resolve_type(&self, class_name: &str) -> Option<Arc<dyn ActorClass>> {
        self(class_name)
    }
}

/// Resolver backed by classes registered up front
#[derive(Default)]
pub struct ClassCatalog {
    classes: HashMap<String, Arc<dyn ActorClass>>,
}

impl ClassCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class under its own class name, replacing any earlier one
    pub fn register(&mut self, class: Arc<dyn ActorClass>) -> &mut Self {
        let name = class.class_name().to_string();
        if self.classes.insert(name.clone(), class).is_some() {
            warn!(class_name = %name, "Replacing previously registered actor class");
        }
        self
    }

    /// Builder-style [`ClassCatalog::register`]
    pub fn with(mut self, class: Arc<dyn ActorClass>) -> Self {
        self.register(class);
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Registered class names, sorted
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.classes.keys().cloned().collect();
        names.sort();
        names
    }
}

impl TypeResolver for ClassCatalog {
    fn resolve_type(&self, class_name: &str) -> Option<Arc<dyn ActorClass>> {
        self.classes.get(class_name).cloned()
    }
}
