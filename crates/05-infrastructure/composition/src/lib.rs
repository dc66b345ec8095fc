//! # 基础设施组合层
//!
//! 把设置加载、装配清单、编程式声明和日志初始化组合成一个可运行的依赖注入应用。
//!
//! ## 主要功能
//!
//! - **应用构建器**: 使用构建者模式组装 [`Application`]
//! - **设置与清单**: 叠加配置文件与环境变量，应用声明式装配清单
//! - **日志初始化**: 基于 `tracing-subscriber` 的开发/生产预设
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::{ApplicationBuilder, LoggingConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = ApplicationBuilder::new()
//!         .with_logging(LoggingConfig::development())
//!         .add_settings_file("config/di.toml")
//!         .add_manifest_file("config/wiring.toml")
//!         .build()?;
//!
//!     let greeting = app.resolve("greeting").await?;
//!     println!("{:?}", greeting.downcast_ref::<String>());
//!     Ok(())
//! }
//! ```

pub mod builder;

// 重新导出主要类型
pub use builder::{ApplicationBuilder, LoggingConfig};
pub use di_impl::Application;

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;
