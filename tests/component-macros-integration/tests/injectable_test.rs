//! `#[derive(Injectable)]` 集成测试

use component_macros::Injectable;
use di_abstractions::{global_registry, DescriptorBuilder, Injectable};
use di_impl::Application;
use infrastructure_common::{DependencyError, DependencyId, Lifecycle};
use std::sync::Arc;

#[derive(Debug, Injectable)]
#[injectable(id = "a")]
struct A;

#[derive(Debug, Injectable)]
#[injectable(id = "b")]
struct B {
    #[inject(id = "a")]
    a: Arc<A>,
}

#[derive(Debug, Injectable)]
#[injectable(id = "c")]
struct C {
    #[inject(property)]
    name: String,
}

#[derive(Debug, Injectable)]
struct Engine;

#[derive(Debug, Injectable)]
#[injectable(prototype)]
struct Car {
    engine: Arc<Engine>,
    #[inject(id = "wheels")]
    wheels: u32,
    #[inject(property, id = "first", default = "Bob".to_string())]
    driver: String,
    #[inject(property, id = "plate")]
    plate: Option<Arc<String>>,
}

#[derive(Debug, Injectable)]
struct Counter {
    count: u32,
}

#[derive(Debug, Injectable)]
#[injectable(id = "auto-registered", auto_register)]
struct AutoRegistered;

#[tokio::test]
async fn test_b_holds_singleton_a() {
    let app = Application::new();
    app.declare_injectable::<A>().unwrap();
    app.declare_injectable::<B>().unwrap();

    let b = app.resolve_as::<B>("b").await.unwrap();
    let a = app.resolve_as::<A>("a").await.unwrap();
    assert!(Arc::ptr_eq(&b.a, &a));
}

#[tokio::test]
async fn test_property_filled_from_instance() {
    let app = Application::new();
    app.declare(DescriptorBuilder::instance("bob".to_string()).id("name"))
        .unwrap();
    app.declare_injectable::<C>().unwrap();

    let c = app.resolve_as::<C>("c").await.unwrap();
    assert_eq!(c.name, "bob");
}

#[tokio::test]
async fn test_inferred_params_defaults_and_prototype() {
    let app = Application::new();
    app.declare_injectable::<Engine>().unwrap();
    app.declare(DescriptorBuilder::instance(4u32).id("wheels"))
        .unwrap();
    app.declare(DescriptorBuilder::instance("B-1234".to_string()).id("plate"))
        .unwrap();
    let car_id = app.declare_injectable::<Car>().unwrap();
    assert_eq!(car_id, DependencyId::of::<Car>());

    let descriptor = app.registry().get(&car_id).unwrap();
    assert_eq!(descriptor.lifecycle, Lifecycle::Prototype);
    assert_eq!(
        descriptor.dependencies,
        vec![DependencyId::of::<Engine>(), DependencyId::named("wheels")]
    );

    let first = app.resolve_as::<Car>(car_id.clone()).await.unwrap();
    let second = app.resolve_as::<Car>(car_id).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.engine, &second.engine));
    assert_eq!(first.wheels, 4);
    assert_eq!(first.driver, "Bob");
    assert_eq!(first.plate.as_deref().map(String::as_str), Some("B-1234"));
}

#[test]
fn test_ambiguous_field_type_rejected() {
    let app = Application::new();
    let err = app.declare_injectable::<Counter>().unwrap_err();
    assert!(matches!(err, DependencyError::AmbiguousIdentifier { .. }));
}

#[test]
fn test_builder_matches_derived_declaration() {
    let declaration = B::builder().build().unwrap();
    assert_eq!(declaration.descriptor.id, DependencyId::named("b"));
    assert_eq!(declaration.descriptor.dependencies, vec![DependencyId::named("a")]);
    assert!(declaration.standalone.is_empty());
}

#[tokio::test]
async fn test_auto_register_declares_into_global_registry() {
    assert!(global_registry().contains(&"auto-registered".into()));

    let app = Application::global();
    let value = app.resolve_as::<AutoRegistered>("auto-registered").await;
    assert!(value.is_ok());
}
