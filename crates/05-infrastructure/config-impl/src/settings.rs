//! 容器设置加载

use di_abstractions::ContainerConfig;
use infrastructure_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// 依赖注入设置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiSettings {
    /// 容器配置
    pub container: ContainerConfig,
    /// 装配清单文件
    pub manifest: Option<PathBuf>,
}

impl DiSettings {
    /// 验证设置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.container.max_resolution_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "container.max_resolution_depth 必须大于 0".to_string(),
            });
        }
        if self.container.resolution_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "container.resolution_timeout_ms 必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}

struct SettingsFile {
    path: PathBuf,
    required: bool,
}

/// 设置加载器
///
/// 按添加顺序叠加配置文件，最后叠加环境变量。
/// 环境变量默认前缀为 `DI`，层级分隔符为 `__`，例如
/// `DI__CONTAINER__MAX_RESOLUTION_DEPTH=32`。
pub struct SettingsLoader {
    files: Vec<SettingsFile>,
    env_prefix: Option<String>,
    separator: String,
}

impl SettingsLoader {
    /// 创建加载器
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            env_prefix: Some("DI".to_string()),
            separator: "__".to_string(),
        }
    }

    /// 添加必需的配置文件，格式由扩展名决定
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push(SettingsFile {
            path: path.as_ref().to_path_buf(),
            required: true,
        });
        self
    }

    /// 添加可选的配置文件
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push(SettingsFile {
            path: path.as_ref().to_path_buf(),
            required: false,
        });
        self
    }

    /// 设置环境变量前缀
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// 设置环境变量层级分隔符
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// 不读取环境变量
    pub fn without_environment(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// 加载设置
    pub fn load(&self) -> ConfigResult<DiSettings> {
        let mut builder = config::Config::builder();

        for file in &self.files {
            if file.required && !file.path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: file.path.display().to_string(),
                });
            }
            debug!("添加配置文件: {}", file.path.display());
            builder = builder.add_source(config::File::from(file.path.as_path()).required(file.required));
        }

        if let Some(prefix) = &self.env_prefix {
            debug!("添加环境变量源: {}{}*", prefix, self.separator);
            builder = builder.add_source(
                config::Environment::with_prefix(prefix)
                    .separator(&self.separator)
                    .try_parsing(true),
            );
        }

        let settings: DiSettings = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| {
                error!("设置加载失败: {}", e);
                ConfigError::ParseError {
                    source: Box::new(e),
                }
            })?;

        settings.validate()?;
        info!(
            "设置加载完成 (循环检测: {}, 最大深度: {}, 超时: {}ms)",
            settings.container.enable_circular_dependency_detection,
            settings.container.max_resolution_depth,
            settings.container.resolution_timeout_ms
        );
        Ok(settings)
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}
