//! 组件生命周期定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 组件生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// 单例模式 - 首次解析时创建，之后所有请求共享同一实例
    #[default]
    Singleton,
    /// 原型模式 - 每次解析都创建新实例
    Prototype,
}

impl Lifecycle {
    /// 是否为单例
    pub fn is_singleton(&self) -> bool {
        matches!(self, Self::Singleton)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => f.write_str("SINGLETON"),
            Self::Prototype => f.write_str("PROTOTYPE"),
        }
    }
}
