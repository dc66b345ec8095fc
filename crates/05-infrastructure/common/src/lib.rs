//! # Infrastructure Common
//!
//! 依赖注入引擎各 crate 共用的基础类型。
//!
//! ## 核心类型
//!
//! - [`DependencyId`] - 依赖标识符（名称或类型）
//! - [`TypeInfo`] - 类型信息，相等性基于 `TypeId`
//! - [`AmbiguousKind`] - 不能直接作为标识符的基础类型分类
//! - [`Lifecycle`] - 单例 / 原型生命周期
//! - [`DependencyError`] - 声明、组装与解析阶段的错误

pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
