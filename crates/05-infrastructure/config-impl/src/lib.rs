//! # Configuration Implementation
//!
//! 依赖注入的配置层实现：容器设置加载与声明式装配清单。
//!
//! ## 主要组件
//!
//! - [`SettingsLoader`] - 叠加配置文件与环境变量，产出 [`DiSettings`]
//! - [`WiringManifest`] - 装配清单
//! - [`ManifestResolver`] - 把装配清单声明到描述符注册表
//! - [`TargetCatalog`] - 清单条目引用的构造目标

pub mod manifest;
pub mod settings;

pub use manifest::*;
pub use settings::*;
