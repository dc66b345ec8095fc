//! Centralized integration tests for di-impl crate

use config_impl::{ManifestResolver, TargetCatalog, WiringManifest};
use di_abstractions::{Arguments, DescriptorBuilder};
use di_impl::Application;
use infrastructure_common::{DependencyError, DependencyId, Lifecycle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug)]
struct A;

#[derive(Debug)]
struct B {
    a: Arc<A>,
}

#[derive(Debug, Default)]
struct C {
    name: String,
}

#[derive(Debug, Default)]
struct Profile {
    first: String,
    last: String,
    age: u32,
}

fn declare_a_and_b(app: &Application) {
    app.declare(DescriptorBuilder::<A>::constructor(|_| Ok(A)).id("a"))
        .unwrap();
    app.declare(
        DescriptorBuilder::<B>::constructor(|args: &Arguments| Ok(B { a: args.get::<A>(0)? }))
            .id("b")
            .param_id("a"),
    )
    .unwrap();
}

#[tokio::test]
async fn test_b_receives_singleton_a() {
    let app = Application::new();
    declare_a_and_b(&app);

    let b = app.resolve_as::<B>("b").await.unwrap();
    let a = app.resolve_as::<A>("a").await.unwrap();
    assert!(Arc::ptr_eq(&b.a, &a));
}

#[tokio::test]
async fn test_assemble_twice_registers_nothing_new() -> anyhow::Result<()> {
    let app = Application::new();
    declare_a_and_b(&app);

    let first = app.assemble("b")?;
    let second = app.assemble("b")?;
    assert_eq!(first.registered, vec!["a", "b"]);
    assert_eq!(second.registered_count(), 0);
    assert_eq!(app.stats().registered_components, 2);
    Ok(())
}

#[tokio::test]
async fn test_property_injected_from_instance() {
    let app = Application::new();
    app.declare(DescriptorBuilder::instance("bob".to_string()).id("name"))
        .unwrap();
    app.declare(
        DescriptorBuilder::<C>::constructor(|_| Ok(C::default()))
            .id("c")
            .property("name", "name", |c: &mut C, name: Arc<String>| {
                c.name = (*name).clone()
            }),
    )
    .unwrap();

    let c = app.resolve_as::<C>("c").await.unwrap();
    assert_eq!(c.name, "bob");
}

#[tokio::test]
async fn test_all_properties_populated() {
    let app = Application::new();
    app.declare(DescriptorBuilder::instance(36u32).id("age")).unwrap();
    app.declare(
        DescriptorBuilder::<String>::factory(|_| async { Ok("Smith".to_string()) }).id("last"),
    )
    .unwrap();
    app.declare(
        DescriptorBuilder::<Profile>::constructor(|_| Ok(Profile::default()))
            .id("profile")
            .property_with_default("first", "first", "Bob".to_string(), |p: &mut Profile, v: Arc<String>| {
                p.first = (*v).clone()
            })
            .property("last", "last", |p: &mut Profile, v: Arc<String>| p.last = (*v).clone())
            .property("age", "age", |p: &mut Profile, v: Arc<u32>| p.age = *v),
    )
    .unwrap();

    let profile = app.resolve_as::<Profile>("profile").await.unwrap();
    assert_eq!(profile.first, "Bob");
    assert_eq!(profile.last, "Smith");
    assert_eq!(profile.age, 36);

    // 默认值本身也是可解析的依赖
    let first = app.resolve_as::<String>("first").await.unwrap();
    assert_eq!(*first, "Bob");
}

#[tokio::test]
async fn test_failing_property_never_exposes_instance() {
    let app = Application::new();
    app.declare(
        DescriptorBuilder::<String>::factory(|args: Arguments| async move {
            Err::<String, _>(DependencyError::creation_failed(args.owner(), "backend offline"))
        })
        .id("broken"),
    )
    .unwrap();
    app.declare(
        DescriptorBuilder::<C>::constructor(|_| Ok(C::default()))
            .id("c")
            .property("name", "broken", |c: &mut C, v: Arc<String>| c.name = (*v).clone()),
    )
    .unwrap();

    let err = app.resolve("c").await.unwrap_err();
    assert!(matches!(err, DependencyError::ComponentCreationFailed { .. }));
    assert_eq!(app.stats().active_singletons, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_singleton_constructed_once_under_concurrency() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = constructions.clone();

    let app = Arc::new(Application::new());
    app.declare(
        DescriptorBuilder::<A>::factory(move |_| {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(A)
            }
        })
        .id("shared"),
    )
    .unwrap();
    app.assemble("shared").unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { app.resolve_as::<A>("shared").await })
        })
        .collect();

    let mut resolved = Vec::new();
    for task in tasks {
        resolved.push(task.await.unwrap().unwrap());
    }
    for instance in &resolved {
        assert!(Arc::ptr_eq(instance, &resolved[0]));
    }
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_prototype_yields_distinct_instances() {
    let app = Application::new();
    app.declare(
        DescriptorBuilder::<C>::constructor(|_| Ok(C::default()))
            .id("fresh")
            .prototype(),
    )
    .unwrap();

    let first = app.resolve_as::<C>("fresh").await.unwrap();
    let second = app.resolve_as::<C>("fresh").await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(app.stats().constructions, 2);
}

#[test]
fn test_ambiguous_type_requires_explicit_id() {
    let app = Application::new();
    let err = app
        .declare(DescriptorBuilder::<String>::instance("bob".to_string()))
        .unwrap_err();
    assert!(matches!(err, DependencyError::AmbiguousIdentifier { .. }));
    assert!(err.to_string().contains("id"));
    assert!(app.registry().is_empty());
}

#[tokio::test]
async fn test_unregistered_root_is_unresolved() {
    let app = Application::new();
    let err = app.resolve("x").await.unwrap_err();
    assert!(matches!(err, DependencyError::UnresolvedDependency { ref id } if id == "x"));
    assert!(err.to_string().contains("x"));
}

#[tokio::test]
async fn test_factory_receives_positional_values() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();

    let app = Application::new();
    app.declare(DescriptorBuilder::instance(2i64).id("a")).unwrap();
    app.declare(DescriptorBuilder::instance(3i64).id("b")).unwrap();
    app.declare(
        DescriptorBuilder::<i64>::factory(move |args: Arguments| {
            let recorder = recorder.clone();
            async move {
                let (a, b) = (*args.get::<i64>(0)?, *args.get::<i64>(1)?);
                if let Ok(mut seen) = recorder.lock() {
                    seen.push((a, b));
                }
                Ok(a + b)
            }
        })
        .id("total")
        .param_id("a")
        .param_id("b"),
    )
    .unwrap();

    let total = app.resolve_as::<i64>("total").await.unwrap();
    assert_eq!(*total, 5);
    assert_eq!(*seen.lock().unwrap(), vec![(2, 3)]);
}

#[tokio::test]
async fn test_cycle_rejected_at_assembly() {
    let app = Application::new();
    app.declare(DescriptorBuilder::<A>::constructor(|_| Ok(A)).id("a").param_id("b"))
        .unwrap();
    app.declare(DescriptorBuilder::<A>::constructor(|_| Ok(A)).id("b").param_id("a"))
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), app.resolve("a"))
        .await
        .expect("cycle detection must not hang");
    let err = result.unwrap_err();
    assert_eq!(
        err,
        DependencyError::CircularDependency {
            dependency_chain: "a -> b -> a".to_string()
        }
    );
}

#[tokio::test]
async fn test_missing_dependency_names_owner() {
    let app = Application::new();
    app.declare(DescriptorBuilder::<A>::constructor(|_| Ok(A)).id("a").param_id("ghost"))
        .unwrap();

    let err = app.resolve("a").await.unwrap_err();
    assert_eq!(
        err,
        DependencyError::MissingDescriptor {
            id: "ghost".to_string(),
            referenced_by: Some("a".to_string()),
        }
    );
}

#[tokio::test]
async fn test_parameter_declared_before_owner() {
    let app = Application::new();
    app.declare_parameter(DependencyId::of::<B>(), 0, "a").unwrap();
    app.declare(DescriptorBuilder::<A>::constructor(|_| Ok(A)).id("a"))
        .unwrap();
    app.declare(DescriptorBuilder::<B>::constructor(|args: &Arguments| {
        Ok(B { a: args.get::<A>(0)? })
    }))
    .unwrap();

    let b = app.resolve_as::<B>(DependencyId::of::<B>()).await.unwrap();
    let a = app.resolve_as::<A>("a").await.unwrap();
    assert!(Arc::ptr_eq(&b.a, &a));
}

#[tokio::test]
async fn test_manifest_wiring() {
    #[derive(Debug)]
    struct MyClass {
        param1: String,
        param2: String,
    }

    let manifest = WiringManifest::from_content(
        r#"
[[components]]
id = "param1"
value = "param 1"

[[components]]
id = "param2"
value = "param 2"

[[components]]
id = "myclass"
kind = "type"
target = "MyClass"
inject = ["param1", "param2"]
"#,
        config::FileFormat::Toml,
    )
    .unwrap();
    let catalog = TargetCatalog::new().constructor("MyClass", |args: &Arguments| {
        Ok(MyClass {
            param1: args.cloned::<String>(0)?,
            param2: args.cloned::<String>(1)?,
        })
    });

    let app = Application::new();
    ManifestResolver::new(app.registry().clone(), manifest, catalog)
        .with_default_lifecycle(Lifecycle::Singleton)
        .apply()
        .unwrap();

    let instance = app.resolve_as::<MyClass>("myclass").await.unwrap();
    assert_eq!(instance.param1, "param 1");
    assert_eq!(instance.param2, "param 2");
}

#[tokio::test]
async fn test_resolution_timeout() {
    let app = Application::with_config(di_abstractions::ContainerConfig {
        resolution_timeout_ms: 10,
        ..Default::default()
    });
    app.declare(
        DescriptorBuilder::<A>::factory(|_| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(A)
        })
        .id("slow")
        .prototype(),
    )
    .unwrap();

    let err = app.resolve_with_timeout("slow").await.unwrap_err();
    assert!(matches!(err, DependencyError::ResolutionTimeout { timeout_ms: 10, .. }));
}

#[tokio::test]
async fn test_timed_out_root_keeps_singleton_construction() {
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = constructions.clone();

    let app = Application::with_config(di_abstractions::ContainerConfig {
        resolution_timeout_ms: 20,
        ..Default::default()
    });
    app.declare(
        DescriptorBuilder::<A>::factory(move |_| {
            let counter = counter.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(A)
            }
        })
        .id("slow-singleton"),
    )
    .unwrap();

    let err = app.resolve_with_timeout("slow-singleton").await.unwrap_err();
    assert!(matches!(err, DependencyError::ResolutionTimeout { .. }));

    let first = app.resolve_as::<A>("slow-singleton").await.unwrap();
    let second = app.resolve_as::<A>("slow-singleton").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sibling_dependencies_resolve_concurrently() {
    let app = Application::new();
    for id in ["left", "right"] {
        app.declare(
            DescriptorBuilder::<A>::factory(|_| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(A)
            })
            .id(id)
            .prototype(),
        )
        .unwrap();
    }
    app.declare(
        DescriptorBuilder::<usize>::factory(|args: Arguments| async move { Ok(args.len()) })
            .id("pair")
            .param_id("left")
            .param_id("right")
            .prototype(),
    )
    .unwrap();

    let started = std::time::Instant::now();
    let pair = app.resolve_as::<usize>("pair").await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(*pair, 2);
    assert!(
        elapsed < Duration::from_millis(350),
        "依赖应并发解析, 实际耗时 {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_property_default_is_only_a_fallback() {
    let app = Application::new();
    app.declare(DescriptorBuilder::instance("Alice".to_string()).id("first"))
        .unwrap();
    app.declare(
        DescriptorBuilder::<Profile>::constructor(|_| Ok(Profile::default()))
            .id("profile")
            .property_with_default("first", "first", "Bob".to_string(), |p: &mut Profile, v: Arc<String>| {
                p.first = (*v).clone()
            }),
    )
    .unwrap();

    let profile = app.resolve_as::<Profile>("profile").await.unwrap();
    assert_eq!(profile.first, "Alice");
}

#[tokio::test]
async fn test_failed_assembly_leaves_container_clean() {
    let app = Application::new();
    app.declare(DescriptorBuilder::<A>::constructor(|_| Ok(A)).id("x")).unwrap();
    app.declare(
        DescriptorBuilder::<A>::constructor(|_| Ok(A))
            .id("root")
            .param_id("x")
            .param_id("ghost"),
    )
    .unwrap();

    let err = app.resolve("root").await.unwrap_err();
    assert!(matches!(err, DependencyError::MissingDescriptor { .. }));
    assert_eq!(app.stats().registered_components, 0);

    app.declare(DescriptorBuilder::instance(7u8).id("ghost")).unwrap();
    assert!(app.resolve("root").await.is_ok());
}
