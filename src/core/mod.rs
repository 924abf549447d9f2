//! 核心模块
//!
//! 包含应用的核心功能：
//! - `app` - 窗口化演示入口和事件循环
//! - `frame` - 每帧 tick / render / present 驱动
//! - `time` - 帧时间
//! - `error` - 错误类型定义

pub mod app;
pub mod error;
pub mod frame;
pub mod time;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{AppError, AppResult, RenderError, RenderResult};

// 重新导出主要类型
pub use app::App;
pub use frame::FrameDriver;
pub use time::FrameTime;
