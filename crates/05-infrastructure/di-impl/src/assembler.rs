//! 依赖图组装器
//!
//! 从根描述符出发，用显式工作栈深度优先遍历依赖图，
//! 把尚未注册的节点按依赖在前的顺序注册到构造容器。

use crate::injector::InjectionExecutor;
use di_abstractions::{
    Arguments, ConstructionKind, ConstructorFn, ContainerAdapter, DependencyDescriptor,
    DescriptorIndex, DescriptorRegistry, FactoryFn, Target,
};
use infrastructure_common::{ComponentRef, DependencyError, DependencyId, DependencyResult};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// 一次组装的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    /// 组装的根
    pub root: String,
    /// 本次新注册的标识符，依赖在前
    pub registered: Vec<String>,
}

impl AssemblyReport {
    /// 本次新注册的节点数量
    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }
}

enum Step {
    Visit {
        id: DependencyId,
        referenced_by: Option<DependencyId>,
    },
    Commit(DescriptorIndex),
}

/// 依赖图组装器
pub struct GraphAssembler {
    registry: Arc<DescriptorRegistry>,
    container: Arc<dyn ContainerAdapter>,
    detect_cycles: bool,
}

impl GraphAssembler {
    /// 创建组装器
    pub fn new(registry: Arc<DescriptorRegistry>, container: Arc<dyn ContainerAdapter>) -> Self {
        Self {
            registry,
            container,
            detect_cycles: true,
        }
    }

    /// 设置是否检测循环依赖，关闭时回边被跳过
    pub fn with_cycle_detection(mut self, enabled: bool) -> Self {
        self.detect_cycles = enabled;
        self
    }

    /// 组装以 `root` 为根的依赖图
    ///
    /// 已经在容器中注册的节点不会重复注册，重复调用是幂等的。
    /// 遍历和校验全部通过后才开始注册，失败的组装不会在容器中留下任何节点。
    pub fn assemble(&self, root: &DependencyId) -> DependencyResult<AssemblyReport> {
        let mut stack = vec![Step::Visit {
            id: root.clone(),
            referenced_by: None,
        }];
        let mut path: Vec<DescriptorIndex> = Vec::new();
        let mut committed: HashSet<DescriptorIndex> = HashSet::new();
        let mut order: Vec<Arc<DependencyDescriptor>> = Vec::new();

        while let Some(step) = stack.pop() {
            match step {
                Step::Visit { id, referenced_by } => {
                    if self.container.is_registered(&id) {
                        continue;
                    }
                    let index = self.registry.index_of(&id).ok_or_else(|| {
                        DependencyError::MissingDescriptor {
                            id: id.to_string(),
                            referenced_by: referenced_by.as_ref().map(ToString::to_string),
                        }
                    })?;
                    if committed.contains(&index) {
                        continue;
                    }
                    if let Some(position) = path.iter().position(|&entered| entered == index) {
                        if self.detect_cycles {
                            return Err(self.cycle_error(&path[position..], &id));
                        }
                        debug!("跳过循环依赖回边: {}", id);
                        continue;
                    }

                    let descriptor = self.descriptor_at(index, &id)?;
                    path.push(index);
                    stack.push(Step::Commit(index));

                    // 逆序入栈，使第一个依赖最先处理
                    let children: Vec<DependencyId> = match descriptor.kind {
                        ConstructionKind::Type | ConstructionKind::Factory => {
                            descriptor.dependency_ids().cloned().collect()
                        }
                        ConstructionKind::Instance | ConstructionKind::Property => Vec::new(),
                    };
                    for child in children.into_iter().rev() {
                        stack.push(Step::Visit {
                            id: child,
                            referenced_by: Some(descriptor.id.clone()),
                        });
                    }
                }
                Step::Commit(index) => {
                    path.pop();
                    committed.insert(index);
                    let descriptor = self.descriptor_at(index, root)?;
                    check_shape(&descriptor)?;
                    order.push(descriptor);
                }
            }
        }

        let mut registered = Vec::with_capacity(order.len());
        for descriptor in order {
            if self.container.is_registered(&descriptor.id) {
                continue;
            }
            self.register(&descriptor)?;
            registered.push(descriptor.id.to_string());
        }

        info!("依赖图组装完成: {}, 新注册 {} 个组件", root, registered.len());
        Ok(AssemblyReport {
            root: root.to_string(),
            registered,
        })
    }

    fn descriptor_at(
        &self,
        index: DescriptorIndex,
        id: &DependencyId,
    ) -> DependencyResult<Arc<DependencyDescriptor>> {
        self.registry
            .at(index)
            .ok_or_else(|| DependencyError::MissingDescriptor {
                id: id.to_string(),
                referenced_by: None,
            })
    }

    fn cycle_error(&self, cycle: &[DescriptorIndex], back_edge: &DependencyId) -> DependencyError {
        let chain = cycle
            .iter()
            .filter_map(|&index| self.registry.at(index))
            .map(|descriptor| descriptor.id.to_string())
            .chain(std::iter::once(back_edge.to_string()))
            .collect::<Vec<_>>()
            .join(" -> ");
        DependencyError::CircularDependency {
            dependency_chain: chain,
        }
    }

    fn register(&self, descriptor: &Arc<DependencyDescriptor>) -> DependencyResult<()> {
        let id = descriptor.id.clone();
        let dependencies = descriptor.dependencies.clone();
        debug!("注册节点: {} ({})", id, descriptor.kind);

        match (descriptor.kind, &descriptor.target) {
            (ConstructionKind::Type, Target::Constructor(constructor)) => {
                let factory = type_factory(
                    Arc::downgrade(&self.container),
                    descriptor.clone(),
                    constructor.clone(),
                );
                self.container
                    .register_type(id, factory, dependencies, descriptor.lifecycle)
            }
            (ConstructionKind::Factory, Target::Factory(factory)) => self
                .container
                .register_factory(id, factory.clone(), dependencies, descriptor.lifecycle),
            (ConstructionKind::Instance, Target::Instance(value)) => self
                .container
                .register_instance(id, value.clone(), dependencies, descriptor.lifecycle),
            (kind, _) => Err(DependencyError::UnknownConstructionKind {
                id: id.to_string(),
                kind: kind.to_string(),
            }),
        }
    }
}

/// 构造类型与目标必须匹配，顶层的 PROPERTY 描述符不能注册
fn check_shape(descriptor: &DependencyDescriptor) -> DependencyResult<()> {
    match (descriptor.kind, &descriptor.target) {
        (ConstructionKind::Type, Target::Constructor(_))
        | (ConstructionKind::Factory, Target::Factory(_))
        | (ConstructionKind::Instance, Target::Instance(_)) => Ok(()),
        (kind, _) => Err(DependencyError::UnknownConstructionKind {
            id: descriptor.id.to_string(),
            kind: kind.to_string(),
        }),
    }
}

/// TYPE 节点的构造包装：构造原始实例，注入属性后再共享出去
fn type_factory(
    container: Weak<dyn ContainerAdapter>,
    descriptor: Arc<DependencyDescriptor>,
    constructor: ConstructorFn,
) -> FactoryFn {
    Arc::new(move |args: Arguments| {
        let container = container.clone();
        let descriptor = descriptor.clone();
        let constructor = constructor.clone();
        Box::pin(async move {
            let instance = constructor(&args)?;
            let instance = if descriptor.has_properties() {
                let container =
                    container
                        .upgrade()
                        .ok_or_else(|| DependencyError::ContainerDropped {
                            id: descriptor.id.to_string(),
                        })?;
                InjectionExecutor::new(container.as_ref())
                    .inject(&descriptor.id, instance, &descriptor.properties)
                    .await?
            } else {
                instance
            };
            Ok(ComponentRef::from(instance))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::DiContainerImpl;
    use di_abstractions::{constructor_fn, DescriptorBuilder};
    use infrastructure_common::Lifecycle;

    struct Fixture {
        registry: Arc<DescriptorRegistry>,
        container: Arc<DiContainerImpl>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: Arc::new(DescriptorRegistry::new()),
                container: Arc::new(DiContainerImpl::new()),
            }
        }

        fn assembler(&self) -> GraphAssembler {
            GraphAssembler::new(self.registry.clone(), self.container.clone())
        }
    }

    #[derive(Debug)]
    struct Unit;

    fn unit(id: &str, deps: &[&str]) -> DependencyDescriptor {
        DependencyDescriptor::new(id, Target::Constructor(constructor_fn(|_| Ok(Unit))))
            .with_dependencies(deps.iter().copied())
    }

    #[test]
    fn test_dependencies_registered_before_dependents() {
        let fixture = Fixture::new();
        fixture.registry.insert(unit("app", &["db", "cache"])).unwrap();
        fixture.registry.insert(unit("db", &["config"])).unwrap();
        fixture.registry.insert(unit("cache", &["config"])).unwrap();
        fixture
            .registry
            .insert(DependencyDescriptor::instance("config", 1u8))
            .unwrap();

        let report = fixture.assembler().assemble(&"app".into()).unwrap();
        assert_eq!(report.registered, vec!["config", "db", "cache", "app"]);
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let fixture = Fixture::new();
        fixture.registry.insert(unit("app", &["db"])).unwrap();
        fixture.registry.insert(unit("db", &[])).unwrap();

        let first = fixture.assembler().assemble(&"app".into()).unwrap();
        let second = fixture.assembler().assemble(&"app".into()).unwrap();
        assert_eq!(first.registered_count(), 2);
        assert_eq!(second.registered_count(), 0);
    }

    #[test]
    fn test_missing_descriptor_names_referrer() {
        let fixture = Fixture::new();
        fixture.registry.insert(unit("app", &["db"])).unwrap();

        let err = fixture.assembler().assemble(&"app".into()).unwrap_err();
        assert_eq!(
            err,
            DependencyError::MissingDescriptor {
                id: "db".to_string(),
                referenced_by: Some("app".to_string()),
            }
        );
    }

    #[test]
    fn test_failed_assembly_registers_nothing() {
        let fixture = Fixture::new();
        fixture.registry.insert(unit("root", &["x", "ghost"])).unwrap();
        fixture.registry.insert(unit("x", &[])).unwrap();

        let err = fixture.assembler().assemble(&"root".into()).unwrap_err();
        assert!(matches!(err, DependencyError::MissingDescriptor { ref id, .. } if id == "ghost"));
        assert!(fixture.container.registered_ids().is_empty());

        // 补齐声明后重新组装，`x` 使用最新的描述符
        fixture.registry.insert(unit("x", &["ghost"])).unwrap();
        fixture.registry.insert(unit("ghost", &[])).unwrap();
        let report = fixture.assembler().assemble(&"root".into()).unwrap();
        assert_eq!(report.registered, vec!["ghost", "x", "root"]);
    }

    #[test]
    fn test_invalid_shape_aborts_before_registration() {
        let fixture = Fixture::new();
        fixture.registry.insert(unit("root", &["ok", "odd"])).unwrap();
        fixture.registry.insert(unit("ok", &[])).unwrap();
        fixture
            .registry
            .insert(DependencyDescriptor::instance("odd", 1u8).with_kind(ConstructionKind::Factory))
            .unwrap();

        let err = fixture.assembler().assemble(&"root".into()).unwrap_err();
        assert!(matches!(err, DependencyError::UnknownConstructionKind { .. }));
        assert!(!fixture.container.is_registered(&"ok".into()));
    }

    #[test]
    fn test_cycle_detected() {
        let fixture = Fixture::new();
        fixture.registry.insert(unit("a", &["b"])).unwrap();
        fixture.registry.insert(unit("b", &["a"])).unwrap();

        let err = fixture.assembler().assemble(&"a".into()).unwrap_err();
        assert_eq!(
            err,
            DependencyError::CircularDependency {
                dependency_chain: "a -> b -> a".to_string()
            }
        );
        assert!(fixture.container.registered_ids().is_empty());
    }

    #[test]
    fn test_cycle_skipped_when_detection_disabled() {
        let fixture = Fixture::new();
        fixture.registry.insert(unit("a", &["b"])).unwrap();
        fixture.registry.insert(unit("b", &["a"])).unwrap();

        let report = fixture
            .assembler()
            .with_cycle_detection(false)
            .assemble(&"a".into())
            .unwrap();
        assert_eq!(report.registered, vec!["b", "a"]);
    }

    #[test]
    fn test_diamond_registers_shared_node_once() {
        let fixture = Fixture::new();
        fixture.registry.insert(unit("top", &["left", "right"])).unwrap();
        fixture.registry.insert(unit("left", &["base"])).unwrap();
        fixture.registry.insert(unit("right", &["base"])).unwrap();
        fixture.registry.insert(unit("base", &[])).unwrap();

        let report = fixture.assembler().assemble(&"top".into()).unwrap();
        assert_eq!(report.registered_count(), 4);
    }

    #[test]
    fn test_stray_property_descriptor_rejected() {
        let fixture = Fixture::new();
        let declaration = DescriptorBuilder::<String>::constructor(|_| Ok(String::new()))
            .id("holder")
            .property("len", "len", |_: &mut String, _: Arc<usize>| {})
            .build()
            .unwrap();
        let stray = (*declaration.descriptor.properties["len"]).clone();
        fixture.registry.insert(stray).unwrap();

        let err = fixture.assembler().assemble(&"len".into()).unwrap_err();
        assert!(matches!(err, DependencyError::UnknownConstructionKind { .. }));
    }

    #[test]
    fn test_kind_target_mismatch_rejected() {
        let fixture = Fixture::new();
        fixture
            .registry
            .insert(DependencyDescriptor::instance("odd", 1u8).with_kind(ConstructionKind::Factory))
            .unwrap();

        let err = fixture.assembler().assemble(&"odd".into()).unwrap_err();
        assert!(matches!(err, DependencyError::UnknownConstructionKind { .. }));
    }

    #[test]
    fn test_property_dependencies_traversed() {
        #[derive(Debug, Default)]
        struct Greeter {
            name: String,
        }

        let fixture = Fixture::new();
        fixture
            .registry
            .declare(
                DescriptorBuilder::<Greeter>::constructor(|_| Ok(Greeter::default()))
                    .id("greeter")
                    .property("name", "name", |g: &mut Greeter, v: Arc<String>| {
                        g.name = (*v).clone()
                    }),
            )
            .unwrap();
        fixture
            .registry
            .insert(
                DependencyDescriptor::instance("name", "bob".to_string())
                    .with_lifecycle(Lifecycle::Singleton),
            )
            .unwrap();

        let report = fixture.assembler().assemble(&"greeter".into()).unwrap();
        assert_eq!(report.registered, vec!["name", "greeter"]);

        let greeter = tokio_test::block_on(async {
            fixture
                .container
                .resolve(&"greeter".into())
                .await
                .unwrap()
        });
        assert_eq!(greeter.downcast::<Greeter>().unwrap().name, "bob");
    }
}
