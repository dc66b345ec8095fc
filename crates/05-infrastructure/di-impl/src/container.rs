//! 默认构造容器实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use di_abstractions::{
    Arguments, ContainerAdapter, ContainerConfig, ContainerStats, DependencyHandle, FactoryFn,
    ResolveContext, ResolveOptions,
};
use futures::future::{try_join_all, BoxFuture, FutureExt, Shared};
use infrastructure_common::{
    ComponentRef, DependencyError, DependencyId, DependencyResult, Lifecycle,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

type SharedConstruction = Shared<BoxFuture<'static, DependencyResult<ComponentRef>>>;

/// 注册方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationKind {
    /// 组装器生成的 TYPE 构造包装
    Type,
    /// 工厂函数
    Factory,
    /// 现成的值
    Instance,
}

enum Provider {
    Factory(FactoryFn),
    Instance(ComponentRef),
}

/// 组件注册信息
struct Registration {
    id: DependencyId,
    kind: RegistrationKind,
    provider: Provider,
    dependencies: Vec<DependencyId>,
    lifecycle: Lifecycle,
    registered_at: DateTime<Utc>,
    /// 单例构造的认领槽位
    singleton: Mutex<Option<SharedConstruction>>,
}

/// 注册信息快照
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationInfo {
    /// 标识符
    pub id: String,
    /// 注册方式
    pub kind: RegistrationKind,
    /// 生命周期
    pub lifecycle: Lifecycle,
    /// 位置依赖
    pub dependencies: Vec<String>,
    /// 注册时间
    pub registered_at: DateTime<Utc>,
}

#[derive(Default)]
struct StatsCounters {
    constructions: AtomicUsize,
    resolutions: AtomicUsize,
    resolution_errors: AtomicUsize,
}

struct ContainerInner {
    registrations: DashMap<DependencyId, Arc<Registration>>,
    options: ResolveOptions,
    stats: StatsCounters,
}

/// 具体的依赖注入容器实现
///
/// 克隆得到的容器共享同一张注册表。
#[derive(Clone)]
pub struct DiContainerImpl {
    inner: Arc<ContainerInner>,
}

impl DiContainerImpl {
    /// 创建新的容器
    pub fn new() -> Self {
        Self::with_config(&ContainerConfig::default())
    }

    /// 按配置创建容器
    pub fn with_config(config: &ContainerConfig) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                registrations: DashMap::new(),
                options: ResolveOptions {
                    detect_cycles: config.enable_circular_dependency_detection,
                    max_depth: config.max_resolution_depth,
                },
                stats: StatsCounters::default(),
            }),
        }
    }

    /// 解析依赖
    pub async fn resolve(&self, id: &DependencyId) -> DependencyResult<ComponentRef> {
        let context = ResolveContext::new(self.inner.options.clone());
        self.inner.resolve_in(id.clone(), context).await
    }

    /// 获取注册信息
    pub fn registration(&self, id: &DependencyId) -> Option<RegistrationInfo> {
        self.inner.registrations.get(id).map(|entry| {
            let registration = entry.value();
            RegistrationInfo {
                id: registration.id.to_string(),
                kind: registration.kind,
                lifecycle: registration.lifecycle,
                dependencies: registration
                    .dependencies
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                registered_at: registration.registered_at,
            }
        })
    }

    /// 容器统计信息
    pub fn stats(&self) -> ContainerStats {
        let active_singletons = self
            .inner
            .registrations
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .singleton
                    .lock()
                    .as_ref()
                    .and_then(Shared::peek)
                    .map_or(false, Result::is_ok)
            })
            .count();

        ContainerStats {
            registered_components: self.inner.registrations.len(),
            constructions: self.inner.stats.constructions.load(Ordering::Relaxed),
            active_singletons,
            resolutions: self.inner.stats.resolutions.load(Ordering::Relaxed),
            resolution_errors: self.inner.stats.resolution_errors.load(Ordering::Relaxed),
        }
    }

    fn insert(
        &self,
        id: DependencyId,
        kind: RegistrationKind,
        provider: Provider,
        dependencies: Vec<DependencyId>,
        lifecycle: Lifecycle,
    ) -> DependencyResult<()> {
        use dashmap::mapref::entry::Entry;

        match self.inner.registrations.entry(id.clone()) {
            Entry::Occupied(_) => {
                warn!("依赖已注册, 拒绝重复注册: {}", id);
                Err(DependencyError::registration(&id, "依赖已注册"))
            }
            Entry::Vacant(slot) => {
                info!("注册组件: {} ({:?}, {})", id, kind, lifecycle);
                slot.insert(Arc::new(Registration {
                    id,
                    kind,
                    provider,
                    dependencies,
                    lifecycle,
                    registered_at: Utc::now(),
                    singleton: Mutex::new(None),
                }));
                Ok(())
            }
        }
    }
}

impl Default for DiContainerImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DiContainerImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiContainerImpl")
            .field("registrations", &self.inner.registrations.len())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl ContainerAdapter for DiContainerImpl {
    fn register_type(
        &self,
        id: DependencyId,
        factory: FactoryFn,
        dependencies: Vec<DependencyId>,
        lifecycle: Lifecycle,
    ) -> DependencyResult<()> {
        self.insert(
            id,
            RegistrationKind::Type,
            Provider::Factory(factory),
            dependencies,
            lifecycle,
        )
    }

    fn register_factory(
        &self,
        id: DependencyId,
        factory: FactoryFn,
        dependencies: Vec<DependencyId>,
        lifecycle: Lifecycle,
    ) -> DependencyResult<()> {
        self.insert(
            id,
            RegistrationKind::Factory,
            Provider::Factory(factory),
            dependencies,
            lifecycle,
        )
    }

    fn register_instance(
        &self,
        id: DependencyId,
        value: ComponentRef,
        dependencies: Vec<DependencyId>,
        lifecycle: Lifecycle,
    ) -> DependencyResult<()> {
        self.insert(
            id,
            RegistrationKind::Instance,
            Provider::Instance(value),
            dependencies,
            lifecycle,
        )
    }

    fn get_dep(&self, id: &DependencyId) -> Option<Arc<dyn DependencyHandle>> {
        let registration = self.inner.registrations.get(id)?.value().clone();
        Some(Arc::new(ContainerHandle {
            id: registration.id.clone(),
            lifecycle: registration.lifecycle,
            container: Arc::downgrade(&self.inner),
        }))
    }

    fn is_registered(&self, id: &DependencyId) -> bool {
        self.inner.registrations.contains_key(id)
    }

    fn registered_ids(&self) -> Vec<DependencyId> {
        self.inner
            .registrations
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl ContainerInner {
    fn resolve_in(
        self: &Arc<Self>,
        id: DependencyId,
        context: ResolveContext,
    ) -> BoxFuture<'static, DependencyResult<ComponentRef>> {
        let this = self.clone();
        async move {
            let result = this.resolve_registered(&id, context).await;
            match &result {
                Ok(_) => this.stats.resolutions.fetch_add(1, Ordering::Relaxed),
                Err(_) => this.stats.resolution_errors.fetch_add(1, Ordering::Relaxed),
            };
            result
        }
        .boxed()
    }

    async fn resolve_registered(
        self: &Arc<Self>,
        id: &DependencyId,
        context: ResolveContext,
    ) -> DependencyResult<ComponentRef> {
        // 正在构造中的单例被再次请求时，等待自身会永远挂起
        let reentrant = context.resolution_chain.contains(id);
        let context = context.enter(id)?;

        let registration = self
            .registrations
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DependencyError::unresolved(id))?;

        match &registration.provider {
            Provider::Instance(value) => Ok(value.clone()),
            Provider::Factory(_) if registration.lifecycle.is_singleton() => {
                if reentrant {
                    return Err(DependencyError::CircularDependency {
                        dependency_chain: context
                            .resolution_chain
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(" -> "),
                    });
                }
                self.resolve_singleton(registration, context).await
            }
            Provider::Factory(_) => self.construct(registration, context).await,
        }
    }

    async fn resolve_singleton(
        self: &Arc<Self>,
        registration: Arc<Registration>,
        context: ResolveContext,
    ) -> DependencyResult<ComponentRef> {
        let construction = {
            let mut slot = registration.singleton.lock();
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    debug!("认领单例构造: {}", registration.id);
                    let this = self.clone();
                    let owned = registration.clone();
                    let id = registration.id.clone();
                    // 构造由所有等待者共享，深度从单例自身重新计算
                    let context = context.detached();
                    let task = tokio::spawn(async move { this.construct(owned, context).await });
                    let construction = async move {
                        task.await
                            .unwrap_or_else(|err| Err(DependencyError::creation_failed(&id, err)))
                    }
                    .boxed()
                    .shared();
                    *slot = Some(construction.clone());
                    construction
                }
            }
        };

        let result = construction.clone().await;
        if result.is_err() {
            let mut slot = registration.singleton.lock();
            if slot
                .as_ref()
                .map_or(false, |current| current.ptr_eq(&construction))
            {
                warn!("单例构造失败, 释放认领: {}", registration.id);
                *slot = None;
            }
        }
        result
    }

    async fn construct(
        self: &Arc<Self>,
        registration: Arc<Registration>,
        context: ResolveContext,
    ) -> DependencyResult<ComponentRef> {
        let Provider::Factory(factory) = &registration.provider else {
            return Err(DependencyError::UnknownConstructionKind {
                id: registration.id.to_string(),
                kind: format!("{:?}", registration.kind),
            });
        };

        let values = try_join_all(
            registration
                .dependencies
                .iter()
                .map(|dependency| self.resolve_in(dependency.clone(), context.clone())),
        )
        .await?;

        debug!("构造组件: {} (深度 {})", registration.id, context.depth());
        let instance = factory(Arguments::new(registration.id.clone(), values)).await?;
        self.stats.constructions.fetch_add(1, Ordering::Relaxed);
        Ok(instance)
    }
}

/// 容器签发的依赖句柄
struct ContainerHandle {
    id: DependencyId,
    lifecycle: Lifecycle,
    container: Weak<ContainerInner>,
}

#[async_trait]
impl DependencyHandle for ContainerHandle {
    fn id(&self) -> &DependencyId {
        &self.id
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    async fn resolve(&self) -> DependencyResult<ComponentRef> {
        let container = self
            .container
            .upgrade()
            .ok_or_else(|| DependencyError::ContainerDropped {
                id: self.id.to_string(),
            })?;

        let span = info_span!("resolve", resolution_id = %Uuid::new_v4(), id = %self.id);
        let context = ResolveContext::new(container.options.clone());
        container
            .resolve_in(self.id.clone(), context)
            .instrument(span)
            .await
    }
}
