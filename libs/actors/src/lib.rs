//! In-Process Actor Lifecycle Management
//!
//! Tracks which actor instances exist in this process, creates them on first
//! use, routes named-method invocations to the right instance and runs the
//! activate/deactivate hooks around each instance's lifetime.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  Invocation Gateway  │   (transport, serialization: not in this crate)
//! └──────────┬───────────┘
//!            │ create/get/delete actor, get method
//! ┌──────────▼───────────┐    ┌──────────────────────┐
//! │    ActorManager      │───▶│      TypeTable       │
//! │  identity validation │    │ type → TypeDescriptor│
//! └──────────┬───────────┘    │  (immutable, shared) │
//!            │                └──────────▲───────────┘
//! ┌──────────▼───────────┐               │ built once from
//! │ ActorInstanceRegistry│    ActorConfig + TypeResolver
//! │ (type,id) → instance │
//! │  per-identity locks  │
//! └──────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - At most one live instance per identity, even under concurrent creation
//! - Creation of one identity never waits on another identity
//! - Activate hook completes before the instance is visible; no invocation is
//!   dispatched once the deactivate hook has started
//! - A failed activation leaves the identity absent and retryable

pub mod class;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod identity;
pub mod manager;
pub mod metrics;
pub mod registry;
pub mod resolver;

pub use class::{
    Activatable, ActorClass, ActorClassBuilder, Deactivatable, MethodHandle, MethodKind,
    MethodSpec,
};
pub use config::{ActorConfig, ActorTypeBinding, RuntimeSettings};
pub use descriptor::{TypeDescriptor, TypeTable};
pub use error::{ActorError, BoxError, Result};
pub use identity::ActorIdentity;
pub use manager::{ActorManagement, ActorManager};
pub use metrics::{LifecycleMetrics, LifecycleStats};
pub use registry::{ActorInstance, ActorInstanceRegistry, ActorRef, CollectionReport};
pub use resolver::{ClassCatalog, TypeResolver};
