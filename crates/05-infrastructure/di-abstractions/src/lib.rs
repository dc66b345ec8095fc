//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义依赖描述符模型、描述符注册表以及底层构造容器的接口。
//!
//! ## 核心接口
//!
//! - [`DependencyDescriptor`] - 可注入点的元数据
//! - [`DescriptorRegistry`] - 描述符注册表
//! - [`ContainerAdapter`] - 构造容器适配器
//! - [`WiringResolver`] - 声明式装配解析器

pub mod container;
pub mod descriptor;
pub mod factory;
pub mod registry;
pub mod resolver;

pub use container::*;
pub use descriptor::*;
pub use factory::*;
pub use registry::*;
pub use resolver::*;
