//! 错误类型定义

use crate::metadata::{AmbiguousKind, DependencyId};
use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },

    #[error("配置序列化失败: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("清单目标不存在: {component} -> {target}")]
    UnknownTarget { component: String, target: String },
}

/// 依赖注入错误类型
///
/// 实现了 `Clone`，共享的单例构造结果需要交给每一个等待者。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DependencyError {
    #[error("类型 {type_name} ({kind}) 需要自定义标识符, 请显式指定 id, 例如 .id(\"my-id\")")]
    AmbiguousIdentifier {
        type_name: String,
        kind: AmbiguousKind,
    },

    #[error("依赖描述符未找到: {id}{}", referenced_suffix(.referenced_by))]
    MissingDescriptor {
        id: String,
        referenced_by: Option<String>,
    },

    #[error("依赖未注册: {id}")]
    UnresolvedDependency { id: String },

    #[error("未知的构造类型: {kind} (组件 {id})")]
    UnknownConstructionKind { id: String, kind: String },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("组件创建失败: {id}, 原因: {message}")]
    ComponentCreationFailed { id: String, message: String },

    #[error("依赖类型不匹配: {id}, 期望类型 {expected}")]
    TypeMismatch { id: String, expected: String },

    #[error("参数位置越界: {id}, 位置 {index}, 参数个数 {len}")]
    ArgumentOutOfRange { id: String, index: usize, len: usize },

    #[error("组件注册失败: {id}, 原因: {message}")]
    RegistrationError { id: String, message: String },

    #[error("超过最大解析深度: {id}, 最大深度 {max_depth}")]
    MaxDepthExceeded { id: String, max_depth: usize },

    #[error("解析超时: {id}, 超时时间 {timeout_ms}ms")]
    ResolutionTimeout { id: String, timeout_ms: u64 },

    #[error("容器已释放, 无法解析: {id}")]
    ContainerDropped { id: String },
}

impl DependencyError {
    /// 创建组件创建失败错误
    pub fn creation_failed(id: &DependencyId, reason: impl std::fmt::Display) -> Self {
        Self::ComponentCreationFailed {
            id: id.to_string(),
            message: reason.to_string(),
        }
    }

    /// 创建依赖未注册错误
    pub fn unresolved(id: &DependencyId) -> Self {
        Self::UnresolvedDependency { id: id.to_string() }
    }

    /// 创建注册失败错误
    pub fn registration(id: &DependencyId, message: impl Into<String>) -> Self {
        Self::RegistrationError {
            id: id.to_string(),
            message: message.into(),
        }
    }
}

fn referenced_suffix(owner: &Option<String>) -> String {
    owner
        .as_ref()
        .map(|owner| format!(" (被 {} 引用)", owner))
        .unwrap_or_default()
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
