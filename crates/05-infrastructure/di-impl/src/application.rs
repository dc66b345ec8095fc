//! 应用入口：持有描述符注册表与构造容器

use crate::assembler::{AssemblyReport, GraphAssembler};
use crate::container::DiContainerImpl;
use di_abstractions::{
    global_registry, ContainerAdapter, ContainerConfig, ContainerStats, DescriptorBuilder,
    DescriptorRegistry, Injectable,
};
use infrastructure_common::{ComponentRef, DependencyError, DependencyId, DependencyResult};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// 依赖注入应用
///
/// 每个应用拥有自己的注册表与容器；[`Application::global`] 使用进程级注册表。
pub struct Application {
    registry: Arc<DescriptorRegistry>,
    container: Arc<DiContainerImpl>,
    config: ContainerConfig,
}

impl Application {
    /// 使用默认配置创建应用
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// 使用指定配置创建应用
    pub fn with_config(config: ContainerConfig) -> Self {
        Self::with_registry(Arc::new(DescriptorRegistry::new()), config)
    }

    /// 基于已有注册表创建应用
    pub fn with_registry(registry: Arc<DescriptorRegistry>, config: ContainerConfig) -> Self {
        info!(
            "创建依赖注入应用 (循环检测: {}, 最大深度: {})",
            config.enable_circular_dependency_detection, config.max_resolution_depth
        );
        Self {
            registry,
            container: Arc::new(DiContainerImpl::with_config(&config)),
            config,
        }
    }

    /// 基于进程级注册表创建应用
    pub fn global() -> Self {
        Self::with_registry(global_registry(), ContainerConfig::default())
    }

    /// 描述符注册表
    pub fn registry(&self) -> &Arc<DescriptorRegistry> {
        &self.registry
    }

    /// 构造容器
    pub fn container(&self) -> &Arc<DiContainerImpl> {
        &self.container
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 声明组件
    pub fn declare<T: Any + Send + Sync>(
        &self,
        builder: DescriptorBuilder<T>,
    ) -> DependencyResult<DependencyId> {
        self.registry.declare(builder)
    }

    /// 声明实现了 [`Injectable`] 的组件
    pub fn declare_injectable<T: Injectable>(&self) -> DependencyResult<DependencyId> {
        T::declare(&self.registry)
    }

    /// 为某个组件的参数位置声明显式依赖
    pub fn declare_parameter(
        &self,
        owner: impl Into<DependencyId>,
        index: usize,
        dependency: impl Into<DependencyId>,
    ) -> DependencyResult<()> {
        self.registry.declare_parameter(owner, index, dependency)
    }

    /// 依赖图组装器
    pub fn assembler(&self) -> GraphAssembler {
        GraphAssembler::new(self.registry.clone(), self.container.clone())
            .with_cycle_detection(self.config.enable_circular_dependency_detection)
    }

    /// 组装以 `root` 为根的依赖图
    pub fn assemble(&self, root: impl Into<DependencyId>) -> DependencyResult<AssemblyReport> {
        self.assembler().assemble(&root.into())
    }

    /// 解析组件
    ///
    /// 已声明的组件先完成组装；既未声明也未直接注册到容器的标识符返回
    /// [`DependencyError::UnresolvedDependency`]。
    pub async fn resolve(&self, root: impl Into<DependencyId>) -> DependencyResult<ComponentRef> {
        let root = root.into();
        if self.registry.contains(&root) {
            self.assemble(root.clone())?;
        }
        let handle = self
            .container
            .get_dep(&root)
            .ok_or_else(|| DependencyError::unresolved(&root))?;
        debug!("解析组件: {}", root);
        handle.resolve().await
    }

    /// 解析组件并转换为具体类型
    pub async fn resolve_as<T: Any + Send + Sync>(
        &self,
        root: impl Into<DependencyId>,
    ) -> DependencyResult<Arc<T>> {
        let root = root.into();
        self.resolve(root.clone())
            .await?
            .downcast::<T>()
            .map_err(|_| DependencyError::TypeMismatch {
                id: root.to_string(),
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    /// 在配置的超时时间内解析组件
    pub async fn resolve_with_timeout(
        &self,
        root: impl Into<DependencyId>,
    ) -> DependencyResult<ComponentRef> {
        let root = root.into();
        let timeout_ms = self.config.resolution_timeout_ms;
        tokio::time::timeout(Duration::from_millis(timeout_ms), self.resolve(root.clone()))
            .await
            .map_err(|_| DependencyError::ResolutionTimeout {
                id: root.to_string(),
                timeout_ms,
            })?
    }

    /// 声明根组件并立即解析
    pub async fn bootstrap<T: Any + Send + Sync>(
        &self,
        builder: DescriptorBuilder<T>,
    ) -> DependencyResult<Arc<T>> {
        let root = self.declare(builder)?;
        info!("启动根组件: {}", root);
        self.resolve_as::<T>(root).await
    }

    /// 容器统计信息
    pub fn stats(&self) -> ContainerStats {
        self.container.stats()
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("registry", &self.registry)
            .field("container", &self.container)
            .field("config", &self.config)
            .finish()
    }
}
