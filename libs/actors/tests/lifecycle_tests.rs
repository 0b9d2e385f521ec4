//! Lifecycle Integration Tests
//!
//! Drives the actor manager through the public gateway contract:
//! - Counter and widget scenarios
//! - Delete/recreate never resurrects an instance
//! - Activation failures leave the identity absent and retryable
//! - Deactivation failures still remove the entry
//! - Duplicate type registration keeps the last binding

use actor_runtime::{
    ActorClassBuilder, ActorConfig, ActorError, ActorIdentity, ActorManagement, ActorManager,
    ClassCatalog,
};
use anyhow::anyhow;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Counter {
    value: i64,
}

#[derive(Default)]
struct Widget;

/// Counts hook executions across all instances of a class
#[derive(Clone, Default)]
struct HookProbe {
    activations: Arc<AtomicUsize>,
    deactivations: Arc<AtomicUsize>,
}

impl HookProbe {
    fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }
}

fn counter_class() -> Arc<dyn actor_runtime::ActorClass> {
    ActorClassBuilder::<Counter>::with_default("demo.Counter")
        .method("increment", |c: &mut Counter, _: ()| {
            c.value += 1;
            Ok(c.value)
        })
        .method("get", |c: &mut Counter, _: ()| Ok(c.value))
        .build()
}

fn tracked_counter_class(probe: &HookProbe) -> Arc<dyn actor_runtime::ActorClass> {
    let activations = probe.activations.clone();
    let deactivations = probe.deactivations.clone();
    ActorClassBuilder::<Counter>::with_default("demo.TrackedCounter")
        .method("increment", |c: &mut Counter, _: ()| {
            c.value += 1;
            Ok(c.value)
        })
        .on_activate(move |_| {
            activations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .on_deactivate(move |_| {
            deactivations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build()
}

fn failing_widget_class() -> Arc<dyn actor_runtime::ActorClass> {
    ActorClassBuilder::<Widget>::with_default("demo.Widget")
        .method("spin", |_: &mut Widget, _: ()| Ok("spinning"))
        .on_activate(|_| Err(anyhow!("widget backend unavailable")))
        .build()
}

#[tokio::test]
async fn test_counter_scenario() {
    let catalog = ClassCatalog::new().with(counter_class());
    let config = ActorConfig::default().with_actor("counter", "demo.Counter");
    let manager = ActorManager::new(config, &catalog).unwrap();

    manager.create_actor("counter", "c1").await.unwrap();

    let increment = manager.get_actor_method("counter", "increment").unwrap();
    assert_eq!(increment.name(), "increment");

    assert!(matches!(
        manager.get_actor_method("counter", "missing"),
        Err(ActorError::UnknownMethod { .. })
    ));

    manager.delete_actor("counter", "c1").await.unwrap();
    manager.delete_actor("counter", "c1").await.unwrap();
    assert!(manager.active_actors().is_empty());
}

#[tokio::test]
async fn test_widget_activation_failure_scenario() {
    let catalog = ClassCatalog::new().with(failing_widget_class());
    let config = ActorConfig::default().with_actor("widget", "demo.Widget");
    let manager = ActorManager::new(config, &catalog).unwrap();

    let err = manager.create_actor("widget", "w1").await.unwrap_err();
    assert!(matches!(err, ActorError::Activation { .. }));
    assert!(err.to_string().contains("widget backend unavailable"));

    let identity = ActorIdentity::new("widget", "w1").unwrap();
    assert!(!manager.registry().contains(&identity));
    assert!(manager.find_actor("widget", "w1").unwrap().is_none());
    assert!(manager.active_actors().is_empty());
    assert_eq!(manager.metrics().snapshot().activation_failures, 1);
}

#[tokio::test]
async fn test_unknown_actor_type() {
    let catalog = ClassCatalog::new().with(counter_class());
    let config = ActorConfig::default().with_actor("counter", "demo.Counter");
    let manager = ActorManager::new(config, &catalog).unwrap();

    assert!(matches!(
        manager.get_actor("ghost", "g1").await,
        Err(ActorError::UnknownActorType { .. })
    ));
    assert!(matches!(
        manager.get_actor_method("ghost", "increment"),
        Err(ActorError::UnknownActorType { .. })
    ));
}

#[tokio::test]
async fn test_delete_then_get_creates_new_instance() {
    let probe = HookProbe::default();
    let catalog = ClassCatalog::new().with(tracked_counter_class(&probe));
    let config = ActorConfig::default().with_actor("counter", "demo.TrackedCounter");
    let manager = ActorManager::new(config, &catalog).unwrap();

    let first = manager.get_actor("counter", "c1").await.unwrap();
    manager.invoke("counter", "c1", "increment", Value::Null).await.unwrap();
    manager.delete_actor("counter", "c1").await.unwrap();

    let second = manager.get_actor("counter", "c1").await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(probe.activations(), 2);
    assert_eq!(probe.deactivations(), 1);

    // Fresh state, the old instance is gone for good
    assert_eq!(
        manager.invoke("counter", "c1", "increment", Value::Null).await.unwrap(),
        json!(1)
    );
    assert!(first.is_deactivated());
}

#[tokio::test]
async fn test_delete_never_created_is_noop() {
    let probe = HookProbe::default();
    let catalog = ClassCatalog::new().with(tracked_counter_class(&probe));
    let config = ActorConfig::default().with_actor("counter", "demo.TrackedCounter");
    let manager = ActorManager::new(config, &catalog).unwrap();

    manager.delete_actor("counter", "never").await.unwrap();
    manager.delete_actor("ghost", "never").await.unwrap();
    assert_eq!(probe.deactivations(), 0);
}

#[tokio::test]
async fn test_activation_failure_is_retryable() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let hook_attempts = attempts.clone();
    let catalog = ClassCatalog::new().with(
        ActorClassBuilder::<Counter>::with_default("demo.Flaky")
            .method("get", |c: &mut Counter, _: ()| Ok(c.value))
            .on_activate(move |_| {
                if hook_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(anyhow!("first activation fails"))
                } else {
                    Ok(())
                }
            })
            .build(),
    );
    let config = ActorConfig::default().with_actor("flaky", "demo.Flaky");
    let manager = ActorManager::new(config, &catalog).unwrap();

    let err = manager.get_actor("flaky", "f1").await.unwrap_err();
    assert!(err.is_retryable());
    assert!(manager.find_actor("flaky", "f1").unwrap().is_none());

    let actor = manager.get_actor("flaky", "f1").await.unwrap();
    assert_eq!(actor.identity().to_string(), "flaky/f1");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(manager.active_actors()["flaky"], vec!["f1"]);
}

#[tokio::test]
async fn test_failing_constructor_reported_as_activation_error() {
    let catalog = ClassCatalog::new().with(
        ActorClassBuilder::<Counter>::try_new("demo.Unbuildable", |identity| {
            Err(anyhow!("cannot build {}", identity))
        })
        .build(),
    );
    let config = ActorConfig::default().with_actor("unbuildable", "demo.Unbuildable");
    let manager = ActorManager::new(config, &catalog).unwrap();

    let err = manager.create_actor("unbuildable", "u1").await.unwrap_err();
    assert!(matches!(err, ActorError::Activation { .. }));
    assert!(manager.active_actors().is_empty());
}

#[tokio::test]
async fn test_deactivation_failure_still_removes_entry() {
    let catalog = ClassCatalog::new().with(
        ActorClassBuilder::<Counter>::with_default("demo.Stubborn")
            .method("get", |c: &mut Counter, _: ()| Ok(c.value))
            .on_deactivate(|_| Err(anyhow!("flush failed")))
            .build(),
    );
    let config = ActorConfig::default().with_actor("stubborn", "demo.Stubborn");
    let manager = ActorManager::new(config, &catalog).unwrap();

    manager.get_actor("stubborn", "s1").await.unwrap();
    let err = manager.delete_actor("stubborn", "s1").await.unwrap_err();
    assert!(matches!(err, ActorError::Deactivation { .. }));
    assert_eq!(err.category(), "cleanup");

    assert!(manager.find_actor("stubborn", "s1").unwrap().is_none());
    manager.delete_actor("stubborn", "s1").await.unwrap();

    let stats = manager.metrics().snapshot();
    assert_eq!(stats.deactivations, 1);
    assert_eq!(stats.deactivation_failures, 1);
}

#[tokio::test]
async fn test_deactivate_hook_sees_final_state() {
    let observed = Arc::new(AtomicUsize::new(0));
    let hook_observed = observed.clone();
    let catalog = ClassCatalog::new().with(
        ActorClassBuilder::<Counter>::with_default("demo.Reporting")
            .method("increment", |c: &mut Counter, _: ()| {
                c.value += 1;
                Ok(c.value)
            })
            .on_deactivate(move |c| {
                hook_observed.store(c.value as usize, Ordering::SeqCst);
                Ok(())
            })
            .build(),
    );
    let config = ActorConfig::default().with_actor("reporting", "demo.Reporting");
    let manager = ActorManager::new(config, &catalog).unwrap();

    for _ in 0..5 {
        manager
            .invoke("reporting", "r1", "increment", Value::Null)
            .await
            .unwrap();
    }
    manager.delete_actor("reporting", "r1").await.unwrap();
    assert_eq!(observed.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_duplicate_type_registration_last_wins() {
    let catalog = ClassCatalog::new()
        .with(counter_class())
        .with(failing_widget_class());
    let config = ActorConfig::default()
        .with_actor("thing", "demo.Widget")
        .with_actor("thing", "demo.Counter");
    let manager = ActorManager::new(config, &catalog).unwrap();

    assert_eq!(manager.types().get("thing").unwrap().class_name(), "demo.Counter");
    assert_eq!(
        manager.invoke("thing", "t1", "increment", Value::Null).await.unwrap(),
        json!(1)
    );
}

#[tokio::test]
async fn test_startup_refuses_unresolvable_class() {
    let catalog = ClassCatalog::new().with(counter_class());
    let config = ActorConfig::default()
        .with_actor("counter", "demo.Counter")
        .with_actor("ghost", "demo.Ghost");

    match ActorManager::new(config, &catalog) {
        Err(err) => {
            assert!(matches!(err, ActorError::TypeResolution { .. }));
            assert!(err.is_startup_fatal());
        }
        Ok(_) => panic!("Manager must not start with an unresolvable class"),
    }
}

#[tokio::test]
async fn test_method_handle_of_other_type_rejected() {
    let catalog = ClassCatalog::new()
        .with(counter_class())
        .with(failing_widget_class());
    let config = ActorConfig::from_delimited("counter,widget", "demo.Counter,demo.Widget").unwrap();
    let manager = ActorManager::new(config, &catalog).unwrap();

    let spin = manager.get_actor_method("widget", "spin").unwrap();
    let counter = manager.get_actor("counter", "c1").await.unwrap();
    assert!(matches!(
        counter.invoke(&spin, Value::Null),
        Err(ActorError::WrongActorType { .. })
    ));
}
