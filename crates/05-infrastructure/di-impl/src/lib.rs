//! # 依赖注入具体实现
//!
//! 提供默认构造容器、依赖图组装器、属性注入执行器以及应用入口。
//!
//! ```no_run
//! use di_abstractions::DescriptorBuilder;
//! use di_impl::Application;
//!
//! # async fn run() -> infrastructure_common::DependencyResult<()> {
//! let app = Application::new();
//! app.declare(DescriptorBuilder::instance(2i64).id("a"))?;
//! let a = app.resolve_as::<i64>("a").await?;
//! assert_eq!(*a, 2);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod assembler;
pub mod container;
pub mod injector;
pub mod resolvers;

pub use application::Application;
pub use assembler::{AssemblyReport, GraphAssembler};
pub use container::{DiContainerImpl, RegistrationInfo, RegistrationKind};
pub use injector::InjectionExecutor;
pub use resolvers::InjectTableResolver;
