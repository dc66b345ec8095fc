//! 元数据定义
//!
//! 提供依赖标识符和类型信息

use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 已解析的组件实例
pub type ComponentRef = Arc<dyn Any + Send + Sync>;

/// 类型信息
///
/// 相等性和哈希只基于 `TypeId`，名称仅用于诊断输出。
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    /// 类型ID
    pub id: TypeId,
    /// 完整类型名称
    pub name: &'static str,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }

    /// 判断该类型是否属于含糊的基础类型
    pub fn ambiguous_kind(&self) -> Option<AmbiguousKind> {
        AmbiguousKind::classify(self.name)
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// 依赖标识符
///
/// 可以是字符串名称，也可以是组件自身的类型。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyId {
    /// 显式命名的标识符
    Named(String),
    /// 由类型推导的标识符
    Type(TypeInfo),
}

impl DependencyId {
    /// 创建命名标识符
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// 由类型创建标识符，不做歧义检查
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeInfo::of::<T>())
    }

    /// 由声明类型推导标识符
    ///
    /// 声明类型为含糊的基础类型（字符串、数字、布尔等）时返回
    /// [`DependencyError::AmbiguousIdentifier`](crate::DependencyError::AmbiguousIdentifier)。
    pub fn infer<T: ?Sized + 'static>() -> crate::DependencyResult<Self> {
        let info = TypeInfo::of::<T>();
        match info.ambiguous_kind() {
            Some(kind) => Err(crate::DependencyError::AmbiguousIdentifier {
                type_name: info.name.to_string(),
                kind,
            }),
            None => Ok(Self::Type(info)),
        }
    }

    /// 获取命名标识符的名称
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Type(_) => None,
        }
    }

    /// 获取类型标识符的类型信息
    pub fn type_info(&self) -> Option<&TypeInfo> {
        match self {
            Self::Named(_) => None,
            Self::Type(info) => Some(info),
        }
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Type(info) => f.write_str(info.short_name()),
        }
    }
}

impl From<&str> for DependencyId {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for DependencyId {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<&String> for DependencyId {
    fn from(name: &String) -> Self {
        Self::Named(name.clone())
    }
}

impl From<&DependencyId> for DependencyId {
    fn from(id: &DependencyId) -> Self {
        id.clone()
    }
}

impl From<TypeInfo> for DependencyId {
    fn from(info: TypeInfo) -> Self {
        Self::Type(info)
    }
}

/// 含糊的基础类型
///
/// 这些类型不能作为依赖标识符，除非显式指定标识符。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguousKind {
    /// 文本
    Text,
    /// 数字
    Number,
    /// 布尔值
    Boolean,
    /// 通用对象
    Object,
    /// 空值
    Absent,
    /// 原始列表
    List,
    /// 原始可调用对象
    Callable,
}

const WRAPPERS: &[&str] = &["alloc::sync::Arc<", "alloc::boxed::Box<", "alloc::rc::Rc<"];

const NUMBERS: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
    "f32", "f64",
];

impl AmbiguousKind {
    /// 根据 `std::any::type_name` 的输出进行分类
    pub fn classify(type_name: &str) -> Option<Self> {
        let name = peel_wrappers(type_name);
        let name = name.strip_prefix('&').unwrap_or(name).trim_start();
        let name = name.strip_prefix("mut ").unwrap_or(name);

        if matches!(
            name,
            "alloc::string::String" | "str" | "char" | "alloc::borrow::Cow<str>"
        ) {
            return Some(Self::Text);
        }
        if NUMBERS.contains(&name) {
            return Some(Self::Number);
        }
        if name == "bool" {
            return Some(Self::Boolean);
        }
        if name == "()" || name.starts_with("core::option::Option<") {
            return Some(Self::Absent);
        }
        if name == "serde_json::value::Value"
            || name.starts_with("dyn core::any::Any")
            || name.starts_with("std::collections::hash::map::HashMap<")
            || name.starts_with("alloc::collections::btree::map::BTreeMap<")
        {
            return Some(Self::Object);
        }
        if name.starts_with("alloc::vec::Vec<") || name.starts_with('[') {
            return Some(Self::List);
        }
        if name.starts_with("fn(")
            || name.starts_with("unsafe fn(")
            || name.starts_with("dyn core::ops::function::Fn")
        {
            return Some(Self::Callable);
        }
        None
    }
}

impl fmt::Display for AmbiguousKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Absent => "absent",
            Self::List => "list",
            Self::Callable => "callable",
        };
        f.write_str(name)
    }
}

fn peel_wrappers(mut name: &str) -> &str {
    loop {
        let inner = WRAPPERS
            .iter()
            .find_map(|w| name.strip_prefix(w).and_then(|rest| rest.strip_suffix('>')));
        match inner {
            Some(inner) => name = inner,
            None => return name,
        }
    }
}

fn short_type_name(name: &str) -> &str {
    // 只截取泛型参数之前的路径
    let head = name.split('<').next().unwrap_or(name);
    head.rsplit("::").next().unwrap_or(head)
}
