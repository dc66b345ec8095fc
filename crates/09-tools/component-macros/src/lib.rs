//! # Component Macros
//!
//! 这个 crate 提供了在编译期生成依赖描述符构建器的过程宏。
//!
//! ## 核心宏
//!
//! - [`Injectable`] - 为结构体实现 `di_abstractions::Injectable`
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use component_macros::Injectable;
//! use std::sync::Arc;
//!
//! #[derive(Injectable)]
//! #[injectable(id = "b", auto_register)]
//! pub struct B {
//!     #[inject(id = "a")]
//!     a: Arc<A>,
//!     #[inject(property, id = "first", default = "Bob".to_string())]
//!     name: String,
//! }
//! ```
//!
//! 生成的代码引用 `di_abstractions`；使用 `auto_register` 时还需要依赖 `ctor`。

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod injectable;
mod utils;

// Re-exports are not allowed in proc-macro crates

/// 可注入组件派生宏
///
/// 按字段声明顺序生成构造函数与描述符构建器。
///
/// # 结构体参数 `#[injectable(...)]`
///
/// - `id = "custom_id"` - 显式标识符，缺省时由结构体类型推导
/// - `singleton` - 单例生命周期（默认）
/// - `prototype` - 原型生命周期
/// - `auto_register` - 程序启动时声明到全局注册表
///
/// # 字段参数 `#[inject(...)]`
///
/// - 无参数 - 构造参数，标识符由字段类型推导，`Arc<T>` 推导为 `T`
/// - `id = "dep"` - 构造参数，使用显式标识符
/// - `property` - 构造后注入的属性，依赖标识符缺省为字段名
/// - `property, id = "dep", default = expr` - 带静态默认值的属性
///
/// `Arc<T>` 字段直接共享依赖实例，其余字段要求实现 `Clone`；
/// 属性字段要求实现 `Default`，`Option<_>` 属性字段初始为 `None`。
#[proc_macro_derive(Injectable, attributes(injectable, inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
