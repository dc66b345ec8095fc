//! 属性注入执行器

use di_abstractions::{ContainerAdapter, DependencyDescriptor, Target};
use futures::future::try_join_all;
use infrastructure_common::{DependencyError, DependencyId, DependencyResult};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// 属性注入执行器
///
/// 并发解析所有属性依赖，全部成功后再依次写入槽位；任一失败时实例被丢弃。
pub struct InjectionExecutor<'a> {
    container: &'a dyn ContainerAdapter,
}

impl<'a> InjectionExecutor<'a> {
    /// 创建执行器
    pub fn new(container: &'a dyn ContainerAdapter) -> Self {
        Self { container }
    }

    /// 为刚构造的实例注入属性
    pub async fn inject(
        &self,
        owner: &DependencyId,
        mut instance: Box<dyn Any + Send + Sync>,
        properties: &BTreeMap<String, Arc<DependencyDescriptor>>,
    ) -> DependencyResult<Box<dyn Any + Send + Sync>> {
        let handles = properties
            .values()
            .map(|property| {
                self.container
                    .get_dep(&property.id)
                    .ok_or_else(|| DependencyError::unresolved(&property.id))
            })
            .collect::<DependencyResult<Vec<_>>>()?;

        let values = try_join_all(handles.iter().map(|handle| handle.resolve())).await?;

        for (property, value) in properties.values().zip(values) {
            let Target::Property(setter) = &property.target else {
                return Err(DependencyError::UnknownConstructionKind {
                    id: property.id.to_string(),
                    kind: property.kind.to_string(),
                });
            };
            setter(instance.as_mut(), value)?;
            debug!(
                "属性注入完成: {}.{} <- {}",
                owner,
                property.owner_key.as_deref().unwrap_or_default(),
                property.id
            );
        }
        Ok(instance)
    }
}
