//! 依赖描述符注册表
//!
//! 描述符存放在 arena 中，下标在注册表生命周期内保持稳定；组装阶段的工作栈只携带下标。

use crate::descriptor::{merge_pending_params, Declaration, DependencyDescriptor, DescriptorBuilder};
use infrastructure_common::{DependencyError, DependencyId, DependencyResult};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// 描述符在 arena 中的下标
pub type DescriptorIndex = usize;

#[derive(Default)]
struct RegistryInner {
    arena: Vec<Arc<DependencyDescriptor>>,
    index: HashMap<DependencyId, DescriptorIndex>,
    pending_params: HashMap<DependencyId, BTreeMap<usize, DependencyId>>,
}

/// 依赖描述符注册表
///
/// 重复声明同一标识符时后声明者生效，原下标保持不变。
#[derive(Default)]
pub struct DescriptorRegistry {
    inner: RwLock<RegistryInner>,
}

impl DescriptorRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入描述符
    ///
    /// 之前通过 [`declare_parameter`](Self::declare_parameter) 累积在该标识符下的参数声明会被合并，显式声明优先。
    pub fn insert(&self, mut descriptor: DependencyDescriptor) -> DependencyResult<DescriptorIndex> {
        let mut inner = self.inner.write();

        // 合并失败时保留累积的参数声明
        if let Some(pending) = inner.pending_params.get(&descriptor.id).cloned() {
            merge_pending_params(&mut descriptor, pending)?;
            inner.pending_params.remove(&descriptor.id);
        }

        let id = descriptor.id.clone();
        let descriptor = Arc::new(descriptor);
        match inner.index.get(&id).copied() {
            Some(index) => {
                warn!("重复声明依赖 {}, 以最后一次声明为准", id);
                inner.arena[index] = descriptor;
                Ok(index)
            }
            None => {
                let index = inner.arena.len();
                debug!("注册依赖描述符: {} ({}, {})", id, descriptor.kind, descriptor.lifecycle);
                inner.arena.push(descriptor);
                inner.index.insert(id, index);
                Ok(index)
            }
        }
    }

    /// 插入一次声明产出的全部描述符，返回主描述符的标识符
    ///
    /// 属性默认值只在该标识符尚未声明时注册，不会覆盖已有声明。
    pub fn insert_declaration(&self, declaration: Declaration) -> DependencyResult<DependencyId> {
        for standalone in declaration.standalone {
            if self.contains(&standalone.id) {
                debug!("依赖 {} 已声明, 跳过属性默认值", standalone.id);
                continue;
            }
            self.insert(standalone)?;
        }
        let id = declaration.descriptor.id.clone();
        self.insert(declaration.descriptor)?;
        Ok(id)
    }

    /// 通过构建器声明组件
    pub fn declare<T: Any + Send + Sync>(
        &self,
        builder: DescriptorBuilder<T>,
    ) -> DependencyResult<DependencyId> {
        self.insert_declaration(builder.build()?)
    }

    /// 为某个组件的参数位置声明显式依赖
    ///
    /// 组件已声明时直接更新其描述符，否则在该组件标识符下累积，等组件声明时合并。
    pub fn declare_parameter(
        &self,
        owner: impl Into<DependencyId>,
        index: usize,
        dependency: impl Into<DependencyId>,
    ) -> DependencyResult<()> {
        let owner = owner.into();
        let dependency = dependency.into();
        let mut inner = self.inner.write();

        let declared = inner.index.get(&owner).copied();
        if let Some(slot) = declared {
            let mut descriptor = (*inner.arena[slot]).clone();
            if index < descriptor.dependencies.len() {
                descriptor.dependencies[index] = dependency;
            } else if index == descriptor.dependencies.len() {
                descriptor.dependencies.push(dependency);
            } else {
                return Err(DependencyError::registration(
                    &owner,
                    format!("参数位置不连续: 位置 {} 之前缺少声明", index),
                ));
            }
            inner.arena[slot] = Arc::new(descriptor);
            return Ok(());
        }

        inner
            .pending_params
            .entry(owner)
            .or_default()
            .insert(index, dependency);
        Ok(())
    }

    /// 按标识符获取描述符
    pub fn get(&self, id: &DependencyId) -> Option<Arc<DependencyDescriptor>> {
        let inner = self.inner.read();
        inner.index.get(id).map(|&index| inner.arena[index].clone())
    }

    /// 获取标识符对应的下标
    pub fn index_of(&self, id: &DependencyId) -> Option<DescriptorIndex> {
        self.inner.read().index.get(id).copied()
    }

    /// 按下标获取描述符
    pub fn at(&self, index: DescriptorIndex) -> Option<Arc<DependencyDescriptor>> {
        self.inner.read().arena.get(index).cloned()
    }

    /// 是否已声明
    pub fn contains(&self, id: &DependencyId) -> bool {
        self.inner.read().index.contains_key(id)
    }

    /// 已声明的描述符数量
    pub fn len(&self) -> usize {
        self.inner.read().arena.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.inner.read().arena.is_empty()
    }

    /// 所有已声明的标识符，按声明顺序
    pub fn ids(&self) -> Vec<DependencyId> {
        self.inner
            .read()
            .arena
            .iter()
            .map(|descriptor| descriptor.id.clone())
            .collect()
    }

    /// 尚未合并的参数声明所属的组件
    pub fn pending_owners(&self) -> Vec<DependencyId> {
        self.inner.read().pending_params.keys().cloned().collect()
    }
}

impl std::fmt::Debug for DescriptorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("DescriptorRegistry")
            .field("descriptors", &inner.arena.len())
            .field("pending_owners", &inner.pending_params.len())
            .finish()
    }
}

/// 全局描述符注册表
static GLOBAL_REGISTRY: Lazy<Arc<DescriptorRegistry>> =
    Lazy::new(|| Arc::new(DescriptorRegistry::new()));

/// 获取进程级别的默认注册表
pub fn global_registry() -> Arc<DescriptorRegistry> {
    GLOBAL_REGISTRY.clone()
}

/// 可注入组件 trait
///
/// 组件自行提供描述符构建器，通常由 `#[derive(Injectable)]` 生成。
pub trait Injectable: Any + Send + Sync + Sized {
    /// 组件的描述符构建器
    fn builder() -> DescriptorBuilder<Self>;

    /// 声明到指定注册表
    fn declare(registry: &DescriptorRegistry) -> DependencyResult<DependencyId> {
        registry.declare(Self::builder())
    }
}
