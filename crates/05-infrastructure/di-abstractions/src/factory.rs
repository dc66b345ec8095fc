//! 组件工厂抽象
//!
//! 构造函数、工厂函数、属性设置器的类型擦除形式，以及传给它们的位置参数。

use futures::future::BoxFuture;
use infrastructure_common::{ComponentRef, DependencyError, DependencyId, DependencyResult};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;

/// 工厂返回的异步结果
pub type FactoryFuture = BoxFuture<'static, DependencyResult<ComponentRef>>;

/// 异步工厂函数
///
/// 接收按参数位置排列的已解析依赖，产出组件实例。
pub type FactoryFn = Arc<dyn Fn(Arguments) -> FactoryFuture + Send + Sync>;

/// 构造函数
///
/// 产出尚未共享的原始实例，属性注入需要在它被包装成 [`ComponentRef`] 之前完成。
pub type ConstructorFn =
    Arc<dyn Fn(&Arguments) -> DependencyResult<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// 属性设置器
pub type PropertySetter =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync), ComponentRef) -> DependencyResult<()> + Send + Sync>;

/// 已解析的位置参数
#[derive(Clone)]
pub struct Arguments {
    owner: DependencyId,
    values: Vec<ComponentRef>,
}

impl Arguments {
    /// 创建参数列表
    pub fn new(owner: DependencyId, values: Vec<ComponentRef>) -> Self {
        Self { owner, values }
    }

    /// 参数所属的组件
    pub fn owner(&self) -> &DependencyId {
        &self.owner
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 获取原始参数
    pub fn raw(&self, index: usize) -> DependencyResult<&ComponentRef> {
        self.values
            .get(index)
            .ok_or_else(|| DependencyError::ArgumentOutOfRange {
                id: self.owner.to_string(),
                index,
                len: self.values.len(),
            })
    }

    /// 获取指定位置的参数，并转换为具体类型
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> DependencyResult<Arc<T>> {
        self.raw(index)?
            .clone()
            .downcast::<T>()
            .map_err(|_| DependencyError::TypeMismatch {
                id: format!("{}#{}", self.owner, index),
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    /// 获取指定位置参数的克隆值
    pub fn cloned<T: Any + Send + Sync + Clone>(&self, index: usize) -> DependencyResult<T> {
        self.get::<T>(index).map(|value| (*value).clone())
    }

    /// 取出全部参数
    pub fn into_values(self) -> Vec<ComponentRef> {
        self.values
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arguments")
            .field("owner", &self.owner)
            .field("len", &self.values.len())
            .finish()
    }
}

/// 将类型化构造函数包装为 [`ConstructorFn`]
pub fn constructor_fn<T, F>(constructor: F) -> ConstructorFn
where
    T: Send + Sync + 'static,
    F: Fn(&Arguments) -> DependencyResult<T> + Send + Sync + 'static,
{
    Arc::new(move |args: &Arguments| {
        constructor(args).map(|value| Box::new(value) as Box<dyn Any + Send + Sync>)
    })
}

/// 将类型化异步工厂包装为 [`FactoryFn`]
pub fn factory_fn<T, F, Fut>(factory: F) -> FactoryFn
where
    T: Send + Sync + 'static,
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DependencyResult<T>> + Send + 'static,
{
    Arc::new(move |args: Arguments| {
        let fut = factory(args);
        Box::pin(async move { fut.await.map(|value| Arc::new(value) as ComponentRef) })
    })
}

/// 将类型化属性设置函数包装为 [`PropertySetter`]
pub fn property_setter<O, P, F>(owner: DependencyId, key: String, setter: F) -> PropertySetter
where
    O: Any + Send + Sync,
    P: Any + Send + Sync,
    F: Fn(&mut O, Arc<P>) + Send + Sync + 'static,
{
    Arc::new(move |target: &mut (dyn Any + Send + Sync), value: ComponentRef| {
        let target = target
            .downcast_mut::<O>()
            .ok_or_else(|| DependencyError::TypeMismatch {
                id: owner.to_string(),
                expected: std::any::type_name::<O>().to_string(),
            })?;
        let value = value
            .downcast::<P>()
            .map_err(|_| DependencyError::TypeMismatch {
                id: format!("{}.{}", owner, key),
                expected: std::any::type_name::<P>().to_string(),
            })?;
        setter(target, value);
        Ok(())
    })
}
