/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量覆盖和配置验证
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod voronoi;
pub mod window;

pub use voronoi::{
    BoundaryPolicy, DemoMode, MovingVoronoiConfig, StaticVoronoiConfig, TextureSize,
    MAX_SEED_COUNT, MAX_TEXTURE_DIMENSION,
};
pub use window::WindowConfig;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 应用主配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 窗口配置
    pub window: WindowConfig,

    /// 运行哪个渲染器
    pub demo: DemoMode,

    /// 静态 Voronoi 配置
    pub static_voronoi: StaticVoronoiConfig,

    /// 移动 Voronoi 配置
    pub moving_voronoi: MovingVoronoiConfig,

    /// 日志配置
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    ///
    /// 种子相关的覆盖同时作用于两个渲染器。无法解析的值返回错误，
    /// 而不是静默忽略。
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("VORONOI_MODE") {
            self.demo = val.parse()?;
        }
        if let Some(val) = lookup("VORONOI_NUM_SEEDS") {
            let num_seeds = parse_env("VORONOI_NUM_SEEDS", &val)?;
            self.static_voronoi.num_seeds = num_seeds;
            self.moving_voronoi.num_seeds = num_seeds;
        }
        if let Some(val) = lookup("VORONOI_TEXTURE_WIDTH") {
            let width = parse_env("VORONOI_TEXTURE_WIDTH", &val)?;
            self.static_voronoi.texture_size.width = width;
            self.moving_voronoi.texture_size.width = width;
        }
        if let Some(val) = lookup("VORONOI_TEXTURE_HEIGHT") {
            let height = parse_env("VORONOI_TEXTURE_HEIGHT", &val)?;
            self.static_voronoi.texture_size.height = height;
            self.moving_voronoi.texture_size.height = height;
        }
        if let Some(val) = lookup("VORONOI_BASE_SPEED") {
            self.moving_voronoi.base_speed = parse_env("VORONOI_BASE_SPEED", &val)?;
        }
        if let Some(val) = lookup("VORONOI_BOUNDARY") {
            self.moving_voronoi.boundary = val.parse()?;
        }
        if let Some(val) = lookup("VORONOI_RNG_SEED") {
            let seed = parse_env("VORONOI_RNG_SEED", &val)?;
            self.static_voronoi.rng_seed = Some(seed);
            self.moving_voronoi.rng_seed = Some(seed);
        }
        Ok(())
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.window.validate()?;
        self.static_voronoi.validate()?;
        self.moving_voronoi.validate()?;
        Ok(())
    }

    /// 按扩展名加载配置文件（`.json` 为 JSON，其余按 TOML）
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// 配置文件查找顺序
    ///
    /// 1. ./voronoi.toml
    /// 2. ./voronoi.json
    /// 3. ~/.config/voronoi_compute/config.toml
    pub fn config_candidates() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from("voronoi.toml"), PathBuf::from("voronoi.json")];
        if let Some(home) = env::var_os("HOME") {
            candidates.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("voronoi_compute")
                    .join("config.toml"),
            );
        }
        candidates
    }

    /// 加载第一个存在的配置文件，返回配置及其路径
    ///
    /// 文件存在但无法解析时返回错误；都不存在时使用默认配置。
    pub fn find_and_load() -> ConfigResult<(Self, Option<PathBuf>)> {
        Self::load_first(Self::config_candidates())
    }

    fn load_first<I>(candidates: I) -> ConfigResult<(Self, Option<PathBuf>)>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        match candidates.into_iter().find(|path| path.is_file()) {
            Some(path) => Ok((Self::from_file(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// 自动查找并加载配置文件，失败时回退到默认配置
    pub fn load_or_default() -> Self {
        Self::load_first_or_default(Self::config_candidates())
    }

    fn load_first_or_default<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        match Self::load_first(candidates) {
            Ok((config, Some(path))) => {
                tracing::info!(target: "config", "Loaded config from {}", path.display());
                config
            }
            Ok((config, None)) => {
                tracing::info!(target: "config", "Using default configuration");
                config
            }
            Err(e) => {
                tracing::warn!(target: "config", "Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }
}

fn parse_env<T>(key: &str, value: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::ParseError(format!("{key}={value}: {e}")))
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（`RUST_LOG` 优先）
    pub level: LogLevel,
}

use crate::impl_default;

impl_default!(LoggingConfig {
    level: LogLevel::Info,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    /// 作为 `EnvFilter` 指令使用的字符串
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}
