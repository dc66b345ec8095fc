//! 应用构建器

use config_impl::{DiSettings, ManifestResolver, SettingsLoader, TargetCatalog, WiringManifest};
use di_abstractions::{global_registry, ContainerConfig, DescriptorBuilder, Injectable};
use di_impl::Application;
use infrastructure_common::{DependencyId, DependencyResult, InfrastructureError, InfrastructureResult};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type Declaration = Box<dyn FnOnce(&Application) -> DependencyResult<DependencyId> + Send>;

/// 应用构建器
///
/// 按顺序完成：初始化日志、加载设置、创建应用、执行编程式声明、应用装配清单。
pub struct ApplicationBuilder {
    /// 设置加载器
    settings_loader: Option<SettingsLoader>,
    /// 显式容器配置，优先于设置文件
    container_config: Option<ContainerConfig>,
    /// 装配清单文件
    manifest_files: Vec<PathBuf>,
    /// 已解析的装配清单
    manifests: Vec<WiringManifest>,
    /// 清单引用的构造目标
    catalog: TargetCatalog,
    /// 编程式声明
    declarations: Vec<Declaration>,
    /// 是否使用进程级注册表
    use_global_registry: bool,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl ApplicationBuilder {
    /// 创建新的应用构建器
    pub fn new() -> Self {
        Self {
            settings_loader: None,
            container_config: None,
            manifest_files: Vec::new(),
            manifests: Vec::new(),
            catalog: TargetCatalog::new(),
            declarations: Vec::new(),
            use_global_registry: false,
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: LoggingConfig::default(),
        }
    }

    /// 设置加载器
    pub fn with_settings(mut self, loader: SettingsLoader) -> Self {
        self.settings_loader = Some(loader);
        self
    }

    /// 添加设置文件，同时读取 `DI` 前缀的环境变量
    pub fn add_settings_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let loader = self.settings_loader.take().unwrap_or_default();
        self.settings_loader = Some(loader.with_file(path));
        self
    }

    /// 显式指定容器配置
    pub fn with_container_config(mut self, config: ContainerConfig) -> Self {
        self.container_config = Some(config);
        self
    }

    /// 添加装配清单文件
    pub fn add_manifest_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.manifest_files.push(path.as_ref().to_path_buf());
        self
    }

    /// 添加装配清单
    pub fn add_manifest(mut self, manifest: WiringManifest) -> Self {
        self.manifests.push(manifest);
        self
    }

    /// 设置清单引用的构造目标
    pub fn with_catalog(mut self, catalog: TargetCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// 声明组件
    pub fn declare<T: Any + Send + Sync>(mut self, builder: DescriptorBuilder<T>) -> Self {
        self.declarations
            .push(Box::new(move |app: &Application| app.declare(builder)));
        self
    }

    /// 声明实现了 [`Injectable`] 的组件
    pub fn declare_injectable<T: Injectable>(mut self) -> Self {
        self.declarations
            .push(Box::new(|app: &Application| app.declare_injectable::<T>()));
        self
    }

    /// 使用进程级注册表，`#[injectable(auto_register)]` 的组件会自动可见
    pub fn use_global_registry(mut self) -> Self {
        self.use_global_registry = true;
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true; // 启用日志初始化
        self
    }

    /// 构建应用
    pub fn build(self) -> InfrastructureResult<Application> {
        // 只有在明确配置了日志时才初始化日志
        // 避免在测试环境中重复初始化
        if self.logging_enabled {
            self.logging_config.init()?;
        }
        info!("开始构建应用");

        let settings = match &self.settings_loader {
            Some(loader) => loader.load()?,
            None => DiSettings::default(),
        };
        let config = self.container_config.unwrap_or(settings.container);

        let app = if self.use_global_registry {
            Application::with_registry(global_registry(), config)
        } else {
            Application::with_config(config)
        };

        for declaration in self.declarations {
            let id = declaration(&app)?;
            debug!("已声明组件: {}", id);
        }

        let mut manifest = WiringManifest::default();
        let manifest_files = settings.manifest.into_iter().chain(self.manifest_files);
        for path in manifest_files {
            manifest
                .components
                .extend(WiringManifest::from_file(&path)?.components);
        }
        for extra in self.manifests {
            manifest.components.extend(extra.components);
        }
        if !manifest.components.is_empty() {
            ManifestResolver::new(app.registry().clone(), manifest, self.catalog)
                .with_default_lifecycle(app.config().default_lifecycle)
                .apply()?;
        }

        info!("应用构建完成, 共 {} 个描述符", app.registry().len());
        Ok(app)
    }

    /// 构建应用并解析根组件
    pub async fn bootstrap<T: Any + Send + Sync>(
        self,
        root: impl Into<DependencyId>,
    ) -> InfrastructureResult<(Application, Arc<T>)> {
        let app = self.build()?;
        let root = app.resolve_as::<T>(root).await?;
        Ok((app, root))
    }
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 过滤指令，例如 `di_impl=debug`；设置后优先于日志级别
    pub env_filter: Option<String>,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            env_filter: None,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            env_filter: None,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            env_filter: None,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 设置过滤指令
    pub fn with_env_filter(mut self, directives: impl Into<String>) -> Self {
        self.env_filter = Some(directives.into());
        self
    }

    fn filter(&self) -> InfrastructureResult<EnvFilter> {
        match &self.env_filter {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|e| InfrastructureError::BootstrapFailed {
                    message: format!("日志过滤指令无效: {}", e),
                })
            }
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))),
        }
    }

    /// 初始化日志系统
    pub fn init(&self) -> InfrastructureResult<()> {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(self.filter()?)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_file(self.show_file)
            .with_line_number(self.show_line_number);

        if self.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        }
        .map_err(|e| InfrastructureError::BootstrapFailed {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成");
        Ok(())
    }
}
