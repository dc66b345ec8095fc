use component_macros::Injectable;
use di_abstractions::{DescriptorRegistry, Injectable};
use std::sync::Arc;

#[derive(Injectable)]
#[injectable(id = "engine")]
struct Engine;

#[derive(Injectable)]
#[injectable(prototype)]
struct Car {
    #[inject(id = "engine")]
    engine: Arc<Engine>,
    #[inject(property, id = "name", default = String::from("car"))]
    name: String,
}

fn main() {
    let registry = DescriptorRegistry::new();
    Engine::declare(&registry).unwrap();
    Car::declare(&registry).unwrap();
    assert_eq!(registry.len(), 3);
}
