//! 注入表解析器

use di_abstractions::{DescriptorRegistry, WiringResolver};
use infrastructure_common::{DependencyId, DependencyResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// 基于注入表的装配解析器
///
/// 每个注册名称对应一个按参数位置排列的依赖名称列表，未登记的名称没有依赖。
pub struct InjectTableResolver {
    registry: Arc<DescriptorRegistry>,
    table: RwLock<HashMap<DependencyId, Vec<DependencyId>>>,
}

impl InjectTableResolver {
    /// 创建解析器
    pub fn new(registry: Arc<DescriptorRegistry>) -> Self {
        Self {
            registry,
            table: RwLock::new(HashMap::new()),
        }
    }

    /// 登记某个名称的注入列表
    pub fn inject<I, D>(&self, name: impl Into<DependencyId>, dependencies: I) -> &Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DependencyId>,
    {
        self.table.write().insert(
            name.into(),
            dependencies.into_iter().map(Into::into).collect(),
        );
        self
    }
}

impl WiringResolver for InjectTableResolver {
    fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    fn resolve_dependencies(&self, name: &DependencyId) -> DependencyResult<Vec<DependencyId>> {
        Ok(self.table.read().get(name).cloned().unwrap_or_default())
    }
}

impl std::fmt::Debug for InjectTableResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectTableResolver")
            .field("entries", &self.table.read().len())
            .finish()
    }
}
