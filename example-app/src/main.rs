//! # 示例应用程序
//!
//! 演示如何组合设置文件、装配清单和编程式声明来启动依赖注入应用

use chrono::Utc;
use clap::Parser;
use component_macros::Injectable;
use config_impl::TargetCatalog;
use di_abstractions::{Arguments, DescriptorBuilder};
use infrastructure_composition::{ApplicationBuilder, LoggingConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "依赖注入示例应用")]
struct Args {
    /// 设置文件路径
    #[arg(short, long, default_value = "config/di.toml")]
    config: PathBuf,

    /// 装配清单路径
    #[arg(short, long, default_value = "config/wiring.toml")]
    manifest: PathBuf,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 使用 JSON 格式输出日志
    #[arg(long)]
    json: bool,
}

/// 行格式化器，前缀通过属性注入，缺省为静态默认值
#[derive(Debug, Injectable)]
#[injectable(id = "formatter")]
struct Formatter {
    #[inject(property, id = "prefix", default = "> ".to_string())]
    prefix: String,
}

impl Formatter {
    fn line(&self, text: &str) -> String {
        format!("{}{}", self.prefix, text)
    }
}

/// 启动时间戳，由异步工厂创建
#[derive(Debug)]
struct StartedAt(i64);

/// 报告服务，由清单按名称引用构造函数
#[derive(Debug)]
struct ReportService {
    title: String,
    formatter: Arc<Formatter>,
    max_lines: i64,
}

impl ReportService {
    fn render(&self, started_at: &StartedAt) -> Vec<String> {
        let mut lines = vec![self.title.clone()];
        lines.extend(
            (1..=self.max_lines)
                .map(|n| self.formatter.line(&format!("第 {} 行 (启动于 {})", n, started_at.0))),
        );
        lines
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let logging = if args.json {
        LoggingConfig::production()
    } else {
        LoggingConfig::development()
    };
    let logging = LoggingConfig {
        level: args.log_level.parse()?,
        ..logging
    };

    let catalog = TargetCatalog::new().constructor("ReportService", |args: &Arguments| {
        Ok(ReportService {
            title: args.cloned::<String>(0)?,
            formatter: args.get::<Formatter>(1)?,
            max_lines: *args.get::<i64>(2)?,
        })
    });

    let mut builder = ApplicationBuilder::new()
        .with_logging(logging)
        .with_catalog(catalog)
        .declare_injectable::<Formatter>()
        .declare(
            DescriptorBuilder::<StartedAt>::factory(|_| async {
                Ok(StartedAt(Utc::now().timestamp()))
            })
            .id("started-at"),
        );

    if args.config.exists() {
        builder = builder.add_settings_file(&args.config);
    } else {
        eprintln!("设置文件 {} 不存在，使用默认设置和环境变量", args.config.display());
    }
    builder = builder.add_manifest_file(&args.manifest);

    let (app, report) = builder.bootstrap::<ReportService>("report").await?;
    let started_at = app.resolve_as::<StartedAt>("started-at").await?;

    for line in report.render(&started_at) {
        println!("{}", line);
    }

    let stats = app.stats();
    info!(
        "容器统计: 注册 {} 个, 构造 {} 次, 单例 {} 个",
        stats.registered_components, stats.constructions, stats.active_singletons
    );
    Ok(())
}
