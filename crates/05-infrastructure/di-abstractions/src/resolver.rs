//! 解析上下文与声明式装配解析器
//!
//! [`ResolveContext`] 记录当前解析链，用于检测运行期循环依赖；
//! [`WiringResolver`] 允许用外部数据（注入表、配置清单等）描述装配关系，绕过编程式 API。

use crate::descriptor::{ConstructionKind, DependencyDescriptor, Target};
use crate::registry::DescriptorRegistry;
use infrastructure_common::{DependencyError, DependencyId, DependencyResult, Lifecycle};
use serde::{Deserialize, Serialize};

/// 解析上下文
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    /// 当前解析链，用于检测循环依赖
    pub resolution_chain: Vec<DependencyId>,
    /// 解析选项
    pub options: ResolveOptions,
    /// 深度计数的起点，之前的链只参与循环检测
    depth_base: usize,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            resolution_chain: Vec::new(),
            options,
            depth_base: 0,
        }
    }

    /// 以当前链末端为起点重新计算深度
    ///
    /// 共享构造（单例）使用：链仍参与循环检测，但深度与发起者无关。
    pub fn detached(&self) -> Self {
        let mut next = self.clone();
        next.depth_base = self.resolution_chain.len().saturating_sub(1);
        next
    }

    /// 进入下一层解析，返回新的上下文
    pub fn enter(&self, id: &DependencyId) -> DependencyResult<Self> {
        if self.options.detect_cycles && self.resolution_chain.contains(id) {
            let chain = self
                .resolution_chain
                .iter()
                .map(ToString::to_string)
                .chain(std::iter::once(id.to_string()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(DependencyError::CircularDependency {
                dependency_chain: chain,
            });
        }
        if self.depth() >= self.options.max_depth {
            return Err(DependencyError::MaxDepthExceeded {
                id: id.to_string(),
                max_depth: self.options.max_depth,
            });
        }

        let mut next = self.clone();
        next.resolution_chain.push(id.clone());
        Ok(next)
    }

    /// 当前解析深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len() - self.depth_base
    }
}

/// 解析选项
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// 是否检测循环依赖
    pub detect_cycles: bool,
    /// 最大递归深度
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            detect_cycles: true,
            max_depth: 100,
        }
    }
}

/// 装配选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiringOptions {
    /// 构造类型，默认 INSTANCE
    pub kind: ConstructionKind,
    /// 生命周期，默认 SINGLETON
    pub lifecycle: Lifecycle,
}

impl Default for WiringOptions {
    fn default() -> Self {
        Self {
            kind: ConstructionKind::Instance,
            lifecycle: Lifecycle::Singleton,
        }
    }
}

impl WiringOptions {
    /// TYPE 装配选项
    pub fn of_type() -> Self {
        Self {
            kind: ConstructionKind::Type,
            ..Self::default()
        }
    }

    /// FACTORY 装配选项
    pub fn of_factory() -> Self {
        Self {
            kind: ConstructionKind::Factory,
            ..Self::default()
        }
    }

    /// 设置生命周期
    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }
}

/// 声明式装配解析器
///
/// 分为注册和解析两个阶段：[`register`](Self::register) 在写入注册表之前调用
/// [`resolve_dependencies`](Self::resolve_dependencies) 获取依赖名称列表，
/// 再按装配选项中的构造类型生成描述符。
pub trait WiringResolver: Send + Sync {
    /// 写入的目标注册表
    fn registry(&self) -> &DescriptorRegistry;

    /// 解析某个注册名称对应的依赖名称列表，按参数位置排列
    fn resolve_dependencies(&self, name: &DependencyId) -> DependencyResult<Vec<DependencyId>>;

    /// 注册依赖
    fn register(
        &self,
        name: impl Into<DependencyId>,
        target: Target,
        options: WiringOptions,
    ) -> DependencyResult<DependencyId>
    where
        Self: Sized,
    {
        let name = name.into();
        match (options.kind, &target) {
            (ConstructionKind::Type, Target::Constructor(_))
            | (ConstructionKind::Factory, Target::Factory(_))
            | (ConstructionKind::Instance, Target::Instance(_)) => {}
            (kind, _) => {
                return Err(DependencyError::UnknownConstructionKind {
                    id: name.to_string(),
                    kind: kind.to_string(),
                })
            }
        }

        let dependencies = self.resolve_dependencies(&name)?;
        let descriptor = DependencyDescriptor::new(name.clone(), target)
            .with_kind(options.kind)
            .with_lifecycle(options.lifecycle)
            .with_dependencies(dependencies);
        self.registry().insert(descriptor)?;
        Ok(name)
    }
}
