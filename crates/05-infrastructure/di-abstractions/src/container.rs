//! 构造容器适配器抽象
//!
//! 核心算法只通过这里的接口与底层构造容器交互。

use crate::factory::FactoryFn;
use async_trait::async_trait;
use infrastructure_common::{ComponentRef, DependencyId, DependencyResult, Lifecycle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 构造容器适配器
pub trait ContainerAdapter: Send + Sync {
    /// 注册 TYPE 组件，`factory` 是组装器生成的构造包装
    fn register_type(
        &self,
        id: DependencyId,
        factory: FactoryFn,
        dependencies: Vec<DependencyId>,
        lifecycle: Lifecycle,
    ) -> DependencyResult<()>;

    /// 注册 FACTORY 组件
    fn register_factory(
        &self,
        id: DependencyId,
        factory: FactoryFn,
        dependencies: Vec<DependencyId>,
        lifecycle: Lifecycle,
    ) -> DependencyResult<()>;

    /// 注册 INSTANCE 组件，依赖列表只用于结构记录
    fn register_instance(
        &self,
        id: DependencyId,
        value: ComponentRef,
        dependencies: Vec<DependencyId>,
        lifecycle: Lifecycle,
    ) -> DependencyResult<()>;

    /// 获取依赖句柄
    fn get_dep(&self, id: &DependencyId) -> Option<Arc<dyn DependencyHandle>>;

    /// 是否已注册
    fn is_registered(&self, id: &DependencyId) -> bool {
        self.get_dep(id).is_some()
    }

    /// 所有已注册的标识符
    fn registered_ids(&self) -> Vec<DependencyId>;
}

/// 依赖句柄
///
/// SINGLETON 句柄的解析结果被缓存，并发的首次解析只会触发一次构造；PROTOTYPE 句柄每次解析都重新构造。
#[async_trait]
pub trait DependencyHandle: Send + Sync {
    /// 依赖标识符
    fn id(&self) -> &DependencyId;

    /// 生命周期
    fn lifecycle(&self) -> Lifecycle;

    /// 解析依赖
    async fn resolve(&self) -> DependencyResult<ComponentRef>;
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否启用循环依赖检测
    pub enable_circular_dependency_detection: bool,
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 解析超时时间（毫秒）
    pub resolution_timeout_ms: u64,
    /// 装配清单条目未指定生命周期时使用的默认值
    ///
    /// 只作用于清单等声明式装配；`DescriptorBuilder` 与 `#[derive(Injectable)]`
    /// 的声明默认为单例，需要原型时显式调用 `.prototype()`。
    pub default_lifecycle: Lifecycle,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            enable_circular_dependency_detection: true,
            max_resolution_depth: 100,
            resolution_timeout_ms: 5000,
            default_lifecycle: Lifecycle::Singleton,
        }
    }
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerStats {
    /// 已注册组件数量
    pub registered_components: usize,
    /// 实际执行的构造次数
    pub constructions: usize,
    /// 已缓存的单例数量
    pub active_singletons: usize,
    /// 成功解析次数
    pub resolutions: usize,
    /// 解析错误数量
    pub resolution_errors: usize,
}
