//! Actor Manager
//!
//! The facade an invocation gateway talks to. Validates identities, then
//! delegates to the [`ActorInstanceRegistry`] and the type table.
//!
//! ```rust,no_run
//! use actor_runtime::{ActorClassBuilder, ActorConfig, ActorManager, ClassCatalog};
//! use serde_json::json;
//!
//! #[derive(Default)]
//! struct Counter {
//!     value: i64,
//! }
//!
//! # async fn example() -> actor_runtime::Result<()> {
//! let catalog = ClassCatalog::new().with(
//!     ActorClassBuilder::<Counter>::with_default("demo.Counter")
//!         .method("increment", |c: &mut Counter, by: i64| {
//!             c.value += by;
//!             Ok(c.value)
//!         })
//!         .build(),
//! );
//! let config = ActorConfig::default().with_actor("counter", "demo.Counter");
//! let manager = ActorManager::new(config, &catalog)?;
//!
//! let value = manager.invoke("counter", "c1", "increment", json!(2)).await?;
//! assert_eq!(value, json!(2));
//! # Ok(())
//! # }
//! ```

use crate::metrics::LifecycleMetrics;
use crate::registry::{ActorInstanceRegistry, ActorRef, CollectionReport};
use crate::{
    ActorConfig, ActorError, ActorIdentity, MethodHandle, Result, TypeResolver, TypeTable,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Contract exposed to the invocation gateway
#[async_trait]
pub trait ActorManagement: Send + Sync {
    /// Create the actor if absent and return it
    async fn create_actor(&self, actor_type: &str, actor_id: &str) -> Result<ActorRef>;

    /// Return the existing actor, creating it on first use
    async fn get_actor(&self, actor_type: &str, actor_id: &str) -> Result<ActorRef>;

    /// Deactivate and remove the actor; absent actors are a no-op
    async fn delete_actor(&self, actor_type: &str, actor_id: &str) -> Result<()>;

    /// Resolve a method handle for an actor type
    fn get_actor_method(&self, actor_type: &str, method: &str) -> Result<MethodHandle>;
}

/// Process-wide actor lifecycle manager
pub struct ActorManager {
    registry: Arc<ActorInstanceRegistry>,
    config: ActorConfig,
    manager_id: String,
}

impl ActorManager {
    /// Build the type table from `config` and start with no live actors
    ///
    /// Any resolution or lifecycle hook defect aborts construction; the
    /// manager never serves with a partial type table.
    pub fn new(config: ActorConfig, resolver: &dyn TypeResolver) -> Result<Self> {
        config.validate()?;
        let types = TypeTable::build(&config, resolver)?;
        Ok(Self::with_types(config, types))
    }

    /// Start from an already built type table
    pub fn with_types(config: ActorConfig, types: TypeTable) -> Self {
        let manager_id = format!("actors-{}", Uuid::new_v4().simple());
        info!(
            manager_id = %manager_id,
            actor_types = ?types.type_names(),
            "Creating actor manager"
        );

        Self {
            registry: Arc::new(ActorInstanceRegistry::new(Arc::new(types))),
            config,
            manager_id,
        }
    }

    pub fn manager_id(&self) -> &str {
        &self.manager_id
    }

    pub fn config(&self) -> &ActorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ActorInstanceRegistry> {
        &self.registry
    }

    pub fn types(&self) -> &TypeTable {
        self.registry.types()
    }

    pub fn metrics(&self) -> Arc<LifecycleMetrics> {
        self.registry.metrics()
    }

    /// Resolve the actor and method, then invoke with JSON arguments
    pub async fn invoke(
        &self,
        actor_type: &str,
        actor_id: &str,
        method: &str,
        args: Value,
    ) -> Result<Value> {
        let handle = self.get_actor_method(actor_type, method)?;
        let actor = self.get_actor(actor_type, actor_id).await?;
        actor.invoke(&handle, args)
    }

    /// The live actor if one exists, without creating it
    pub fn find_actor(&self, actor_type: &str, actor_id: &str) -> Result<Option<ActorRef>> {
        let identity = ActorIdentity::new(actor_type, actor_id)?;
        Ok(self.registry.find(&identity))
    }

    /// Active actor ids grouped by type
    pub fn active_actors(&self) -> BTreeMap<String, Vec<String>> {
        self.registry.active_actors()
    }

    /// [`ActorManager::active_actors`] rendered as a JSON object
    pub fn active_actors_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.active_actors())
    }

    /// Deactivate actors unused for at least `idle_for`
    pub fn collect_idle(&self, idle_for: Duration) -> CollectionReport {
        self.registry.collect_idle(idle_for)
    }

    /// Idle collection with the configured timeout; no-op when none is set
    pub fn collect_idle_default(&self) -> CollectionReport {
        match self.config.runtime.actor_idle_timeout() {
            Some(idle_for) => self.collect_idle(idle_for),
            None => {
                debug!(manager_id = %self.manager_id, "No idle timeout configured, skipping collection");
                CollectionReport::default()
            }
        }
    }

    /// Deactivate every live actor
    ///
    /// Returns the deactivation failures; every actor is removed regardless.
    pub async fn shutdown(&self) -> Vec<ActorError> {
        info!(manager_id = %self.manager_id, "Shutting down actor manager");

        let failures = self.registry.deactivate_all().await;
        if !failures.is_empty() {
            warn!(
                manager_id = %self.manager_id,
                failures = failures.len(),
                "Actor manager shut down with deactivation failures"
            );
        }

        info!(manager_id = %self.manager_id, "Actor manager shutdown complete");
        failures
    }
}

#[async_trait]
impl ActorManagement for ActorManager {
    async fn create_actor(&self, actor_type: &str, actor_id: &str) -> Result<ActorRef> {
        let identity = ActorIdentity::new(actor_type, actor_id)?;
        self.registry.get_or_create(&identity).await
    }

    async fn get_actor(&self, actor_type: &str, actor_id: &str) -> Result<ActorRef> {
        let identity = ActorIdentity::new(actor_type, actor_id)?;
        self.registry.get_or_create(&identity).await
    }

    async fn delete_actor(&self, actor_type: &str, actor_id: &str) -> Result<()> {
        let identity = ActorIdentity::new(actor_type, actor_id)?;
        self.registry.delete(&identity).await
    }

    fn get_actor_method(&self, actor_type: &str, method: &str) -> Result<MethodHandle> {
        if actor_type.is_empty() {
            return Err(ActorError::invalid_identity("actor type must not be empty"));
        }
        self.registry.lookup_method(actor_type, method)
    }
}
