//! 依赖描述符
//!
//! 描述一个可注入点：标识符、构造类型、生命周期、构造目标以及依赖引用。

use crate::factory::{
    constructor_fn, factory_fn, property_setter, Arguments, ConstructorFn, FactoryFn,
    PropertySetter,
};
use infrastructure_common::{
    ComponentRef, DependencyError, DependencyId, DependencyResult, Lifecycle, TypeInfo,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// 构造类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstructionKind {
    /// 通过构造函数实例化
    Type,
    /// 通过工厂函数产出
    Factory,
    /// 已经构造完成的值
    Instance,
    /// 所属 TYPE 组件上的字段槽位，在所属组件构造后解析
    Property,
}

impl fmt::Display for ConstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => f.write_str("TYPE"),
            Self::Factory => f.write_str("FACTORY"),
            Self::Instance => f.write_str("INSTANCE"),
            Self::Property => f.write_str("PROPERTY"),
        }
    }
}

/// 构造目标，对核心算法不透明
#[derive(Clone)]
pub enum Target {
    /// 构造函数
    Constructor(ConstructorFn),
    /// 工厂函数
    Factory(FactoryFn),
    /// 现成的值
    Instance(ComponentRef),
    /// 属性设置器
    Property(PropertySetter),
}

impl Target {
    /// 该目标天然对应的构造类型
    pub fn natural_kind(&self) -> ConstructionKind {
        match self {
            Self::Constructor(_) => ConstructionKind::Type,
            Self::Factory(_) => ConstructionKind::Factory,
            Self::Instance(_) => ConstructionKind::Instance,
            Self::Property(_) => ConstructionKind::Property,
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructor(_) => f.write_str("Constructor(<function>)"),
            Self::Factory(_) => f.write_str("Factory(<function>)"),
            Self::Instance(_) => f.write_str("Instance(<value>)"),
            Self::Property(_) => f.write_str("Property(<setter>)"),
        }
    }
}

/// 依赖描述符
#[derive(Debug, Clone)]
pub struct DependencyDescriptor {
    /// 全局唯一的标识符
    pub id: DependencyId,
    /// 构造类型
    pub kind: ConstructionKind,
    /// 生命周期
    pub lifecycle: Lifecycle,
    /// 构造目标
    pub target: Target,
    /// 位置依赖，下标即参数位置
    pub dependencies: Vec<DependencyId>,
    /// 属性依赖，按槽位名称索引
    pub properties: BTreeMap<String, Arc<DependencyDescriptor>>,
    /// 属性描述符在所属组件上的槽位
    pub owner_key: Option<String>,
}

impl DependencyDescriptor {
    /// 创建描述符，构造类型由目标推导
    pub fn new(id: impl Into<DependencyId>, target: Target) -> Self {
        Self {
            id: id.into(),
            kind: target.natural_kind(),
            lifecycle: Lifecycle::default(),
            target,
            dependencies: Vec::new(),
            properties: BTreeMap::new(),
            owner_key: None,
        }
    }

    /// 创建 INSTANCE 描述符
    pub fn instance<T: Any + Send + Sync>(id: impl Into<DependencyId>, value: T) -> Self {
        Self::new(id, Target::Instance(Arc::new(value)))
    }

    /// 设置生命周期
    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// 设置位置依赖
    pub fn with_dependencies<I, D>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DependencyId>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// 覆盖构造类型
    pub fn with_kind(mut self, kind: ConstructionKind) -> Self {
        self.kind = kind;
        self
    }

    /// 所有直接依赖的标识符：位置依赖在前，属性依赖在后
    pub fn dependency_ids(&self) -> impl Iterator<Item = &DependencyId> {
        self.dependencies
            .iter()
            .chain(self.properties.values().map(|property| &property.id))
    }

    /// 是否有需要构造后注入的属性
    pub fn has_properties(&self) -> bool {
        !self.properties.is_empty()
    }
}

/// 一次声明产出的全部描述符
#[derive(Debug, Clone)]
pub struct Declaration {
    /// 主描述符
    pub descriptor: DependencyDescriptor,
    /// 需要独立注册的描述符（属性的静态默认值）
    pub standalone: Vec<DependencyDescriptor>,
}

enum ParamSlot {
    Explicit(DependencyId),
    Inferred(TypeInfo),
}

struct PendingProperty {
    key: String,
    id: DependencyId,
    setter: PropertySetter,
    default: Option<ComponentRef>,
}

/// 依赖描述符构建器
///
/// 标识符未显式指定时由目标类型推导；工厂推导自返回类型。
/// 推导出的标识符属于含糊的基础类型时，[`build`](Self::build) 返回
/// [`DependencyError::AmbiguousIdentifier`]。
pub struct DescriptorBuilder<T> {
    id: Option<DependencyId>,
    target: Target,
    lifecycle: Lifecycle,
    params: Vec<ParamSlot>,
    overrides: BTreeMap<usize, DependencyId>,
    properties: Vec<PendingProperty>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> DescriptorBuilder<T> {
    fn with_target(target: Target) -> Self {
        Self {
            id: None,
            target,
            lifecycle: Lifecycle::default(),
            params: Vec::new(),
            overrides: BTreeMap::new(),
            properties: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// 通过构造函数创建的 TYPE 组件
    pub fn constructor<F>(constructor: F) -> Self
    where
        F: Fn(&Arguments) -> DependencyResult<T> + Send + Sync + 'static,
    {
        Self::with_target(Target::Constructor(constructor_fn(constructor)))
    }

    /// 通过异步工厂创建的 FACTORY 组件
    pub fn factory<F, Fut>(factory: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DependencyResult<T>> + Send + 'static,
    {
        Self::with_target(Target::Factory(factory_fn(factory)))
    }

    /// 现成值的 INSTANCE 组件
    pub fn instance(value: T) -> Self {
        Self::with_target(Target::Instance(Arc::new(value)))
    }

    /// 显式指定标识符
    pub fn id(mut self, id: impl Into<DependencyId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 设置生命周期
    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// 单例生命周期
    pub fn singleton(self) -> Self {
        self.lifecycle(Lifecycle::Singleton)
    }

    /// 原型生命周期
    pub fn prototype(self) -> Self {
        self.lifecycle(Lifecycle::Prototype)
    }

    /// 追加一个由声明类型推导标识符的位置参数
    pub fn param<P: ?Sized + 'static>(mut self) -> Self {
        self.params.push(ParamSlot::Inferred(TypeInfo::of::<P>()));
        self
    }

    /// 追加一个显式标识符的位置参数
    pub fn param_id(mut self, id: impl Into<DependencyId>) -> Self {
        self.params.push(ParamSlot::Explicit(id.into()));
        self
    }

    /// 显式指定某个位置的参数标识符，覆盖声明类型
    pub fn param_at(mut self, index: usize, id: impl Into<DependencyId>) -> Self {
        self.overrides.insert(index, id.into());
        self
    }

    /// 声明属性注入
    ///
    /// `key` 为所属组件上的槽位，`id` 为要注入的依赖。
    pub fn property<P, F>(mut self, key: impl Into<String>, id: impl Into<DependencyId>, setter: F) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(&mut T, Arc<P>) + Send + Sync + 'static,
    {
        let key = key.into();
        let setter = property_setter::<T, P, F>(DependencyId::of::<T>(), key.clone(), setter);
        self.properties.push(PendingProperty {
            key,
            id: id.into(),
            setter,
            default: None,
        });
        self
    }

    /// 声明带静态默认值的属性注入
    ///
    /// 默认值会作为 INSTANCE 描述符独立注册，本身也可以被其他组件依赖。
    pub fn property_with_default<P, F>(
        mut self,
        key: impl Into<String>,
        id: impl Into<DependencyId>,
        default: P,
        setter: F,
    ) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(&mut T, Arc<P>) + Send + Sync + 'static,
    {
        let key = key.into();
        let setter = property_setter::<T, P, F>(DependencyId::of::<T>(), key.clone(), setter);
        self.properties.push(PendingProperty {
            key,
            id: id.into(),
            setter,
            default: Some(Arc::new(default)),
        });
        self
    }

    /// 构建描述符
    pub fn build(self) -> DependencyResult<Declaration> {
        let id = match self.id {
            Some(id) => id,
            None => DependencyId::infer::<T>()?,
        };

        let dependencies = resolve_params(&id, self.params, self.overrides)?;

        let kind = self.target.natural_kind();
        if !self.properties.is_empty() && kind != ConstructionKind::Type {
            return Err(DependencyError::registration(
                &id,
                format!("只有 TYPE 组件支持属性注入, 当前为 {}", kind),
            ));
        }

        let mut properties = BTreeMap::new();
        let mut standalone = Vec::new();
        for property in self.properties {
            if let Some(value) = property.default {
                standalone.push(
                    DependencyDescriptor::new(property.id.clone(), Target::Instance(value))
                        .with_lifecycle(Lifecycle::Singleton),
                );
            }
            let child = DependencyDescriptor {
                id: property.id,
                kind: ConstructionKind::Property,
                lifecycle: self.lifecycle,
                target: Target::Property(property.setter),
                dependencies: Vec::new(),
                properties: BTreeMap::new(),
                owner_key: Some(property.key.clone()),
            };
            if properties.insert(property.key.clone(), Arc::new(child)).is_some() {
                return Err(DependencyError::registration(
                    &id,
                    format!("属性槽位重复声明: {}", property.key),
                ));
            }
        }

        Ok(Declaration {
            descriptor: DependencyDescriptor {
                id,
                kind,
                lifecycle: self.lifecycle,
                target: self.target,
                dependencies,
                properties,
                owner_key: None,
            },
            standalone,
        })
    }
}

/// 合并位置参数：显式覆盖优先，其余位置由声明类型推导
fn resolve_params(
    owner: &DependencyId,
    params: Vec<ParamSlot>,
    mut overrides: BTreeMap<usize, DependencyId>,
) -> DependencyResult<Vec<DependencyId>> {
    let mut resolved = Vec::with_capacity(params.len().max(overrides.len()));
    for (index, slot) in params.into_iter().enumerate() {
        if let Some(explicit) = overrides.remove(&index) {
            resolved.push(explicit);
            continue;
        }
        match slot {
            ParamSlot::Explicit(id) => resolved.push(id),
            ParamSlot::Inferred(info) => {
                if let Some(kind) = info.ambiguous_kind() {
                    return Err(DependencyError::AmbiguousIdentifier {
                        type_name: info.name.to_string(),
                        kind,
                    });
                }
                resolved.push(DependencyId::Type(info));
            }
        }
    }

    // 超出声明参数个数的覆盖必须连续
    for (index, id) in overrides {
        if index != resolved.len() {
            return Err(DependencyError::registration(
                owner,
                format!("参数位置不连续: 位置 {} 之前缺少声明", index),
            ));
        }
        resolved.push(id);
    }
    Ok(resolved)
}

/// 合并在组件声明之前累积的参数声明
pub(crate) fn merge_pending_params(
    descriptor: &mut DependencyDescriptor,
    pending: BTreeMap<usize, DependencyId>,
) -> DependencyResult<()> {
    let params = std::mem::take(&mut descriptor.dependencies)
        .into_iter()
        .map(ParamSlot::Explicit)
        .collect();
    descriptor.dependencies = resolve_params(&descriptor.id, params, pending)?;
    Ok(())
}
