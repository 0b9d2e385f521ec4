//! Actor Instance Registry
//!
//! Concurrent map from [`ActorIdentity`] to the live instance for that
//! identity. Owns creation, lookup and destruction.
//!
//! # Locking
//!
//! ```text
//! entries: DashMap<ActorIdentity, Arc<Entry>>      (sharded, held only briefly)
//!   Entry.lock:  tokio Mutex<()>                    (per identity, create/retire)
//!   Entry.state: RwLock<Slot>                       (readable without waiting)
//!     ActorInstance.state: Mutex<InstanceState>     (one invocation at a time)
//! ```
//!
//! Fast path (actor already active): read `Entry.state`, no await.
//!
//! Slow path (first access, or actor going away):
//!   1. Acquire `Entry.lock` for the identity
//!   2. Re-check `Entry.state`
//!   3. Vacant: construct, run the activate hook, publish as Active
//!   4. Retired: the entry left the map, start over with a fresh entry
//!
//! Construction and activation contain no await point, so once a caller holds
//! `Entry.lock` and starts activating, dropping its future cannot interrupt the
//! activation. Waiters for the same identity queue on `Entry.lock`; callers for
//! other identities never touch it.
//!
//! Lock ordering: `Entry.lock`, then `ActorInstance.state`. `Entry.state` is
//! only held for a read or a single write and never while acquiring another
//! lock, so a deactivate hook may still look its own actor up. The DashMap
//! shard guard is never held across an await or while taking any of the other
//! locks.
//!
//! Idle collection takes `Entry.lock` and `ActorInstance.state` with `try_lock`
//! only; an identity being created, deleted or invoked is skipped.

use crate::metrics::LifecycleMetrics;
use crate::{
    ActorError, ActorIdentity, MethodHandle, Result, TypeDescriptor, TypeTable,
};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Shared handle to a live actor instance
///
/// Hold it for the duration of an invocation only; the registry decides when
/// the instance goes away.
pub type ActorRef = Arc<ActorInstance>;

/// A live actor object together with its identity and type
pub struct ActorInstance {
    identity: ActorIdentity,
    descriptor: Arc<TypeDescriptor>,
    state: Mutex<InstanceState>,
    /// Set once deactivation has begun; checked before taking `state`
    retiring: AtomicBool,
    activated_at: Instant,
    last_used: Mutex<Instant>,
    metrics: Arc<LifecycleMetrics>,
}

struct InstanceState {
    actor: Box<dyn Any + Send>,
    deactivated: bool,
}

impl ActorInstance {
    fn new(
        identity: ActorIdentity,
        descriptor: Arc<TypeDescriptor>,
        actor: Box<dyn Any + Send>,
        metrics: Arc<LifecycleMetrics>,
    ) -> Self {
        let now = Instant::now();
        Self {
            identity,
            descriptor,
            state: Mutex::new(InstanceState {
                actor,
                deactivated: false,
            }),
            retiring: AtomicBool::new(false),
            activated_at: now,
            last_used: Mutex::new(now),
            metrics,
        }
    }

    pub fn identity(&self) -> &ActorIdentity {
        &self.identity
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Invoke a remote method with JSON arguments
    ///
    /// Invocations on one instance are serialized. Fails with
    /// [`ActorError::Deactivated`] once deactivation has begun, without
    /// waiting, which includes calls made from the deactivate hook itself.
    pub fn invoke(&self, method: &MethodHandle, args: Value) -> Result<Value> {
        if method.class_name() != self.descriptor.class_name() {
            return Err(ActorError::WrongActorType {
                actor: self.identity.to_string(),
                expected: method.class_name().to_string(),
            });
        }

        let mut state = self.lock_live()?;
        self.touch();

        let start = Instant::now();
        let result = method.call(state.actor.as_mut(), args);
        drop(state);
        self.touch();

        self.metrics.record_invocation(result.is_ok());
        debug!(
            actor_type = %self.identity.actor_type(),
            actor_id = %self.identity.actor_id(),
            method = %method.name(),
            duration_us = start.elapsed().as_micros() as u64,
            success = result.is_ok(),
            "Actor method invoked"
        );

        result.map_err(|e| ActorError::invocation(&self.identity, method.name(), e))
    }

    /// Direct typed access to the actor object for in-process callers
    pub fn with_actor<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut state = self.lock_live()?;
        let actor = state
            .actor
            .downcast_mut::<T>()
            .ok_or_else(|| ActorError::WrongActorType {
                actor: self.identity.to_string(),
                expected: std::any::type_name::<T>().to_string(),
            })?;
        let result = f(actor);
        drop(state);
        self.touch();
        Ok(result)
    }

    /// True once deactivation has begun; never blocks
    pub fn is_deactivated(&self) -> bool {
        self.retiring.load(Ordering::Acquire)
    }

    /// Time since activation
    pub fn age(&self) -> Duration {
        self.activated_at.elapsed()
    }

    /// Time since the last invocation started or finished, or since activation
    pub fn idle_time(&self) -> Duration {
        self.last_used.lock().elapsed()
    }

    fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }

    fn deactivated_error(&self) -> ActorError {
        ActorError::Deactivated {
            actor: self.identity.to_string(),
        }
    }

    /// Lock the actor for a call, failing fast once deactivation has begun
    fn lock_live(&self) -> Result<MutexGuard<'_, InstanceState>> {
        if self.retiring.load(Ordering::Acquire) {
            return Err(self.deactivated_error());
        }
        let state = self.state.lock();
        if state.deactivated {
            return Err(self.deactivated_error());
        }
        Ok(state)
    }

    /// Run the deactivate hook once and mark the instance dead
    ///
    /// `state` is this instance's lock, already held by the caller, so no
    /// invocation is in flight. Calls arriving from here on, the hook's own
    /// included, fail with [`ActorError::Deactivated`]. The instance is marked
    /// deactivated even when the hook fails.
    fn deactivate(&self, mut state: MutexGuard<'_, InstanceState>) -> anyhow::Result<()> {
        self.retiring.store(true, Ordering::Release);
        if state.deactivated {
            return Ok(());
        }
        let result = match self.descriptor.deactivate_hook() {
            Some(hook) => hook.call(state.actor.as_mut(), Value::Null).map(|_| ()),
            None => Ok(()),
        };
        state.deactivated = true;
        result
    }
}

impl fmt::Debug for ActorInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorInstance")
            .field("identity", &self.identity)
            .field("class_name", &self.descriptor.class_name())
            .field("age", &self.age())
            .finish()
    }
}

/// Publication state of one identity
#[derive(Clone)]
enum Slot {
    /// Entry exists, no instance published yet
    Vacant,
    /// Published and invocable
    Active(ActorRef),
    /// Deactivate hook running; still findable, not handed out
    Deactivating(ActorRef),
    /// Removed from the map; holders must start over
    Retired,
}

struct Entry {
    lock: tokio::sync::Mutex<()>,
    state: RwLock<Slot>,
}

impl Entry {
    fn new() -> Self {
        Self {
            lock: tokio::sync::Mutex::new(()),
            state: RwLock::new(Slot::Vacant),
        }
    }
}

/// Outcome of an idle collection sweep
#[derive(Debug, Default)]
pub struct CollectionReport {
    /// Identities deactivated and removed
    pub collected: Vec<ActorIdentity>,
    /// Identities skipped because another caller held them
    pub skipped_busy: usize,
    /// Deactivate hook failures; these entries were removed as well
    pub failures: Vec<ActorError>,
}

/// Concurrent registry of live actor instances
pub struct ActorInstanceRegistry {
    types: Arc<TypeTable>,
    entries: DashMap<ActorIdentity, Arc<Entry>>,
    metrics: Arc<LifecycleMetrics>,
}

impl ActorInstanceRegistry {
    pub fn new(types: Arc<TypeTable>) -> Self {
        Self {
            types,
            entries: DashMap::new(),
            metrics: Arc::new(LifecycleMetrics::default()),
        }
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn metrics(&self) -> Arc<LifecycleMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Return the live instance for `identity`, creating it on first use
    ///
    /// At most one instance is constructed per identity; concurrent callers
    /// for the same identity wait for the creation in progress and share its
    /// result. On activation failure nothing is published and a later call
    /// tries again.
    pub async fn get_or_create(&self, identity: &ActorIdentity) -> Result<ActorRef> {
        let descriptor = Arc::clone(self.types.get(identity.actor_type())?);

        if let Some(instance) = self.published(identity) {
            return Ok(instance);
        }

        loop {
            let entry = self.entry(identity);
            let _guard = entry.lock.lock().await;

            let current = entry.state.read().clone();
            match current {
                Slot::Active(instance) => {
                    debug!(actor = %identity, "Actor created by a concurrent caller");
                    return Ok(instance);
                }
                Slot::Retired => {
                    debug!(actor = %identity, "Entry retired while waiting, retrying");
                    continue;
                }
                // Only reachable if a previous activation panicked
                Slot::Deactivating(_) | Slot::Vacant => {}
            }

            return match self.activate(identity, &descriptor) {
                Ok(instance) => {
                    *entry.state.write() = Slot::Active(Arc::clone(&instance));
                    Ok(instance)
                }
                Err(e) => {
                    *entry.state.write() = Slot::Retired;
                    self.remove_entry(identity, &entry);
                    Err(e)
                }
            };
        }
    }

    /// Deactivate and remove the instance for `identity`
    ///
    /// A missing identity is a no-op. The deactivate hook runs while the entry
    /// is still in the map; the entry is removed afterwards even if the hook
    /// fails, and that failure is returned as [`ActorError::Deactivation`].
    pub async fn delete(&self, identity: &ActorIdentity) -> Result<()> {
        let entry = match self.entries.get(identity) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                debug!(actor = %identity, "Delete of absent actor ignored");
                return Ok(());
            }
        };

        let _guard = entry.lock.lock().await;
        let current = entry.state.read().clone();
        match current {
            Slot::Active(instance) | Slot::Deactivating(instance) => {
                let state = instance.state.lock();
                self.retire(identity, &entry, &instance, state)
            }
            Slot::Vacant => {
                *entry.state.write() = Slot::Retired;
                self.remove_entry(identity, &entry);
                Ok(())
            }
            Slot::Retired => Ok(()),
        }
    }

    /// Resolve a method handle without touching any instance
    pub fn lookup_method(&self, type_name: &str, method_name: &str) -> Result<MethodHandle> {
        self.types.get(type_name)?.method(method_name)
    }

    /// The instance for `identity` if one is published, without creating it
    ///
    /// Also returns an instance whose deactivate hook is still running, so the
    /// hook can look its own actor up. Invoking that instance fails with
    /// [`ActorError::Deactivated`] rather than re-entering the hook's lock; the
    /// hook already holds `&mut` access to the actor object.
    pub fn find(&self, identity: &ActorIdentity) -> Option<ActorRef> {
        let entry = self.entries.get(identity)?;
        let state = entry.state.read();
        match &*state {
            Slot::Active(instance) | Slot::Deactivating(instance) => Some(Arc::clone(instance)),
            Slot::Vacant | Slot::Retired => None,
        }
    }

    pub fn contains(&self, identity: &ActorIdentity) -> bool {
        self.find(identity).is_some()
    }

    /// Number of active instances
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(&*entry.state.read(), Slot::Active(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Active instance ids grouped by actor type, ids sorted
    pub fn active_actors(&self) -> BTreeMap<String, Vec<String>> {
        let mut actors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in self.entries.iter() {
            if matches!(&*entry.state.read(), Slot::Active(_)) {
                actors
                    .entry(entry.key().actor_type().to_string())
                    .or_default()
                    .push(entry.key().actor_id().to_string());
            }
        }
        for ids in actors.values_mut() {
            ids.sort();
        }
        actors
    }

    /// Deactivate every active instance unused for at least `idle_for`
    ///
    /// Identities being created or deleted, and instances with an invocation
    /// in flight, are skipped rather than waited on.
    pub fn collect_idle(&self, idle_for: Duration) -> CollectionReport {
        let mut report = CollectionReport::default();

        for (identity, entry) in self.snapshot() {
            let Ok(_guard) = entry.lock.try_lock() else {
                report.skipped_busy += 1;
                continue;
            };

            let instance = match &*entry.state.read() {
                Slot::Active(instance) => Arc::clone(instance),
                _ => continue,
            };
            let Some(state) = instance.state.try_lock() else {
                debug!(actor = %identity, "Invocation in flight, skipping idle collection");
                report.skipped_busy += 1;
                continue;
            };
            if instance.idle_time() < idle_for {
                continue;
            }

            self.metrics.record_idle_collection();
            match self.retire(&identity, &entry, &instance, state) {
                Ok(()) => report.collected.push(identity),
                Err(e) => {
                    report.collected.push(identity);
                    report.failures.push(e);
                }
            }
        }

        if !report.collected.is_empty() {
            info!(
                collected = report.collected.len(),
                failures = report.failures.len(),
                skipped_busy = report.skipped_busy,
                idle_secs = idle_for.as_secs(),
                "Idle actors collected"
            );
        }
        report
    }

    /// Delete every instance, continuing past deactivation failures
    pub async fn deactivate_all(&self) -> Vec<ActorError> {
        let identities: Vec<_> = self.snapshot().into_iter().map(|(id, _)| id).collect();
        let mut failures = Vec::new();

        for identity in identities {
            if let Err(e) = self.delete(&identity).await {
                warn!(actor = %identity, error = %e, "Deactivation failed during shutdown");
                failures.push(e);
            }
        }
        failures
    }

    fn published(&self, identity: &ActorIdentity) -> Option<ActorRef> {
        let entry = self.entries.get(identity)?;
        let state = entry.state.read();
        match &*state {
            Slot::Active(instance) => Some(Arc::clone(instance)),
            _ => None,
        }
    }

    fn entry(&self, identity: &ActorIdentity) -> Arc<Entry> {
        Arc::clone(
            self.entries
                .entry(identity.clone())
                .or_insert_with(|| Arc::new(Entry::new()))
                .value(),
        )
    }

    fn snapshot(&self) -> Vec<(ActorIdentity, Arc<Entry>)> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    fn remove_entry(&self, identity: &ActorIdentity, entry: &Arc<Entry>) {
        self.entries
            .remove_if(identity, |_, current| Arc::ptr_eq(current, entry));
    }

    /// Construct and activate a new instance; nothing is published here
    fn activate(&self, identity: &ActorIdentity, descriptor: &Arc<TypeDescriptor>) -> Result<ActorRef> {
        let start = Instant::now();

        let result = descriptor
            .class()
            .construct(identity)
            .and_then(|mut actor| {
                if let Some(hook) = descriptor.activate_hook() {
                    hook.call(actor.as_mut(), Value::Null)?;
                }
                Ok(actor)
            });

        match result {
            Ok(actor) => {
                let elapsed = start.elapsed();
                self.metrics.record_activation(elapsed, true);
                info!(
                    actor_type = %identity.actor_type(),
                    actor_id = %identity.actor_id(),
                    class_name = %descriptor.class_name(),
                    activation_us = elapsed.as_micros() as u64,
                    "Actor activated"
                );
                Ok(Arc::new(ActorInstance::new(
                    identity.clone(),
                    Arc::clone(descriptor),
                    actor,
                    Arc::clone(&self.metrics),
                )))
            }
            Err(e) => {
                self.metrics.record_activation(start.elapsed(), false);
                error!(
                    actor_type = %identity.actor_type(),
                    actor_id = %identity.actor_id(),
                    error = %e,
                    "Actor activation failed"
                );
                Err(ActorError::activation(identity, e))
            }
        }
    }

    /// Deactivate `instance` and drop the entry
    ///
    /// Caller holds `entry.lock` and passes the instance's own lock in `state`.
    fn retire(
        &self,
        identity: &ActorIdentity,
        entry: &Arc<Entry>,
        instance: &ActorRef,
        state: MutexGuard<'_, InstanceState>,
    ) -> Result<()> {
        *entry.state.write() = Slot::Deactivating(Arc::clone(instance));

        let result = instance.deactivate(state);

        *entry.state.write() = Slot::Retired;
        self.remove_entry(identity, entry);
        self.metrics.record_deactivation(result.is_ok());

        match result {
            Ok(()) => {
                info!(
                    actor_type = %identity.actor_type(),
                    actor_id = %identity.actor_id(),
                    lifetime_ms = instance.age().as_millis() as u64,
                    "Actor deactivated"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    actor_type = %identity.actor_type(),
                    actor_id = %identity.actor_id(),
                    error = %e,
                    "Deactivate hook failed, actor removed anyway"
                );
                Err(ActorError::deactivation(identity, e))
            }
        }
    }
}
