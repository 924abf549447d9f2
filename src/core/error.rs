//! 统一错误处理模块
//!
//! 提供全局统一的错误类型定义
//!
//! ## 错误类型分层
//!
//! - **渲染层错误** (`RenderError`): 设备、计算程序、资源绑定与呈现相关的错误
//! - **配置错误** (`config::ConfigError`): 配置文件解析与验证错误
//!
//! `AppError` 汇总所有层级的错误，供二进制入口统一处理。

use thiserror::Error;

use crate::config::ConfigError;

/// 应用顶层错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Window creation failed: {0}")]
    Window(String),

    #[error("Event loop error: {0}")]
    EventLoop(String),
}

/// 渲染系统错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    SurfaceCreation(String),

    #[error("Failed to request adapter: no compatible GPU found")]
    NoAdapter,

    #[error("Failed to request device: {0}")]
    DeviceRequest(String),

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("Kernel '{entry_point}' not found in compute program '{program}'")]
    KernelNotFound {
        program: &'static str,
        entry_point: String,
    },

    #[error("Kernel '{kernel}' has no binding named '{name}'")]
    UnknownBinding { kernel: &'static str, name: String },

    #[error("Kernel '{kernel}' dispatched with unbound resource '{name}'")]
    UnboundResource {
        kernel: &'static str,
        name: &'static str,
    },

    #[error("Compute program '{program}' has no parameter named '{name}'")]
    UnknownParam { program: &'static str, name: String },

    #[error("Invalid or released handle: {0}")]
    InvalidHandle(String),

    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: u64, actual: u64 },

    #[error("Invalid render state: {0}")]
    InvalidState(String),

    #[error("Texture readback failed: {0}")]
    Readback(String),
}

/// 应用结果类型别名
pub type AppResult<T> = Result<T, AppError>;
pub type RenderResult<T> = Result<T, RenderError>;
