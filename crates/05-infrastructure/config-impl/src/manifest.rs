//! 装配清单
//!
//! 用配置文件描述组件的装配关系：
//!
//! ```toml
//! [[components]]
//! id = "param1"
//! value = "param 1"
//!
//! [[components]]
//! id = "myclass"
//! kind = "type"
//! inject = ["param1", "param2"]
//! ```
//!
//! TYPE 与 FACTORY 条目的构造目标来自 [`TargetCatalog`]，按 `target` 名称查找，未指定时使用 `id`。

use di_abstractions::{
    constructor_fn, factory_fn, Arguments, ConstructionKind, DescriptorRegistry, Target,
    WiringOptions, WiringResolver,
};
use infrastructure_common::{
    ComponentRef, ConfigError, ConfigResult, DependencyId, DependencyResult, InfrastructureResult,
    Lifecycle,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 清单中的组件条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentEntry {
    /// 注册名称
    pub id: String,
    /// 构造类型，默认 INSTANCE
    #[serde(default = "default_kind")]
    pub kind: ConstructionKind,
    /// 生命周期，未指定时使用容器配置的默认值
    #[serde(default)]
    pub lifecycle: Option<Lifecycle>,
    /// 构造目标在目录中的名称
    #[serde(default)]
    pub target: Option<String>,
    /// 按参数位置排列的依赖名称
    #[serde(default)]
    pub inject: Vec<String>,
    /// INSTANCE 条目的值
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

fn default_kind() -> ConstructionKind {
    ConstructionKind::Instance
}

/// 装配清单
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiringManifest {
    /// 组件条目
    pub components: Vec<ComponentEntry>,
}

impl WiringManifest {
    /// 从文件加载，格式由扩展名决定
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        debug!("加载装配清单: {}", path.display());
        Self::build(config::File::from(path))
    }

    /// 从字符串加载
    pub fn from_content(content: &str, format: config::FileFormat) -> ConfigResult<Self> {
        Self::build(config::File::from_str(content, format))
    }

    fn build<S>(source: S) -> ConfigResult<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(source)
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| ConfigError::ParseError {
                source: Box::new(e),
            })
    }

    /// 按名称查找条目
    pub fn entry(&self, id: &str) -> Option<&ComponentEntry> {
        self.components.iter().find(|entry| entry.id == id)
    }
}

/// 构造目标目录
#[derive(Default)]
pub struct TargetCatalog {
    targets: HashMap<String, Target>,
}

impl TargetCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记构造函数
    pub fn constructor<T, F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> DependencyResult<T> + Send + Sync + 'static,
    {
        self.targets
            .insert(name.into(), Target::Constructor(constructor_fn(constructor)));
        self
    }

    /// 登记异步工厂
    pub fn factory<T, F, Fut>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DependencyResult<T>> + Send + 'static,
    {
        self.targets
            .insert(name.into(), Target::Factory(factory_fn(factory)));
        self
    }

    /// 登记现成的值
    pub fn instance<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.targets
            .insert(name.into(), Target::Instance(Arc::new(value)));
        self
    }

    /// 查找目标
    pub fn get(&self, name: &str) -> Option<Target> {
        self.targets.get(name).cloned()
    }

    /// 已登记的目标数量
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl std::fmt::Debug for TargetCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.targets.keys().collect();
        names.sort();
        f.debug_struct("TargetCatalog").field("targets", &names).finish()
    }
}

/// 基于装配清单的解析器
pub struct ManifestResolver {
    registry: Arc<DescriptorRegistry>,
    manifest: WiringManifest,
    catalog: TargetCatalog,
    default_lifecycle: Lifecycle,
}

impl ManifestResolver {
    /// 创建解析器
    pub fn new(
        registry: Arc<DescriptorRegistry>,
        manifest: WiringManifest,
        catalog: TargetCatalog,
    ) -> Self {
        Self {
            registry,
            manifest,
            catalog,
            default_lifecycle: Lifecycle::default(),
        }
    }

    /// 设置条目未指定生命周期时的默认值
    pub fn with_default_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.default_lifecycle = lifecycle;
        self
    }

    /// 清单
    pub fn manifest(&self) -> &WiringManifest {
        &self.manifest
    }

    /// 把清单中的全部条目声明到注册表
    pub fn apply(&self) -> InfrastructureResult<Vec<DependencyId>> {
        let mut declared = Vec::with_capacity(self.manifest.components.len());
        for entry in &self.manifest.components {
            let target = self.target_for(entry)?;
            let options = WiringOptions {
                kind: entry.kind,
                lifecycle: entry.lifecycle.unwrap_or(self.default_lifecycle),
            };
            declared.push(self.register(entry.id.as_str(), target, options)?);
        }
        info!("装配清单已应用, 声明 {} 个组件", declared.len());
        Ok(declared)
    }

    fn target_for(&self, entry: &ComponentEntry) -> ConfigResult<Target> {
        if entry.kind == ConstructionKind::Instance {
            if let Some(value) = &entry.value {
                return Ok(Target::Instance(instance_value(value)));
            }
        }
        let name = entry.target.as_deref().unwrap_or(&entry.id);
        self.catalog
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTarget {
                component: entry.id.clone(),
                target: name.to_string(),
            })
    }
}

impl WiringResolver for ManifestResolver {
    fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    fn resolve_dependencies(&self, name: &DependencyId) -> DependencyResult<Vec<DependencyId>> {
        let dependencies = name
            .as_name()
            .and_then(|name| self.manifest.entry(name))
            .map(|entry| entry.inject.iter().map(DependencyId::from).collect())
            .unwrap_or_default();
        Ok(dependencies)
    }
}

/// 把清单中的标量值转换为对应的 Rust 类型，其余保留为 JSON 值
fn instance_value(value: &serde_json::Value) -> ComponentRef {
    use serde_json::Value;

    match value {
        Value::String(text) => Arc::new(text.clone()) as ComponentRef,
        Value::Bool(flag) => Arc::new(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => Arc::new(integer) as ComponentRef,
            None => Arc::new(number.as_f64().unwrap_or_default()),
        },
        other => Arc::new(other.clone()),
    }
}
