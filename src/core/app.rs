//! 应用入口
//!
//! 生命周期：
//! 1. **初始化阶段**：加载配置、初始化日志、创建窗口和 wgpu 后端、创建渲染器
//! 2. **运行阶段**：每次重绘执行一帧（`tick` → `render` → `present`）
//! 3. **关闭阶段**：释放渲染器资源

use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::config::{AppConfig, LoggingConfig, WindowConfig};
use crate::core::error::{AppError, AppResult};
use crate::core::frame::FrameDriver;
use crate::render::wgpu_backend::WgpuComputeBackend;
use crate::voronoi::build_renderer;

/// 窗口化演示程序
pub struct App;

impl App {
    /// 运行演示主循环，直到窗口关闭或发生错误
    pub fn run() -> AppResult<()> {
        let (mut config, source) = AppConfig::find_and_load()?;
        config.apply_env_overrides()?;

        Self::initialize_logging(&config.logging);
        match &source {
            Some(path) => {
                tracing::info!(target: "app", "Loaded config from {}", path.display())
            }
            None => tracing::info!(target: "app", "Using default configuration"),
        }
        config.validate()?;

        let event_loop = EventLoop::new()
            .map_err(|e| AppError::EventLoop(format!("Failed to create event loop: {}", e)))?;
        let window = Self::create_window(&event_loop, &config.window)?;

        let mut backend =
            pollster::block_on(WgpuComputeBackend::new(window.clone(), &config.window))?;
        let renderer = build_renderer(&config, &mut backend)?;
        tracing::info!(
            target: "app",
            demo = %config.demo,
            renderer = renderer.name(),
            seeds = renderer.seed_count(),
            "renderer created"
        );

        let driver = FrameDriver::new(backend, renderer);
        Self::run_event_loop(event_loop, window, driver)?;

        tracing::info!(target: "app", "Voronoi demo shutting down");
        Ok(())
    }

    /// 初始化日志系统
    ///
    /// `RUST_LOG` 存在时优先使用，否则使用配置中的级别。
    fn initialize_logging(logging: &LoggingConfig) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(logging.level.as_filter()));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        tracing::info!(target: "app", "Voronoi demo starting");
    }

    fn create_window(
        event_loop: &EventLoop<()>,
        config: &WindowConfig,
    ) -> AppResult<Arc<Window>> {
        let window = WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(event_loop)
            .map_err(|e| AppError::Window(e.to_string()))?;
        Ok(Arc::new(window))
    }

    /// 运行事件循环
    ///
    /// 帧错误会记录下来并结束循环，循环结束后统一释放资源。
    fn run_event_loop(
        event_loop: EventLoop<()>,
        window: Arc<Window>,
        mut driver: FrameDriver<WgpuComputeBackend>,
    ) -> AppResult<()> {
        event_loop.set_control_flow(ControlFlow::Poll);
        let mut failure: Option<AppError> = None;

        let result = event_loop.run(|event, elwt| match event {
            Event::WindowEvent { event, .. } => {
                Self::handle_window_event(&event, &mut driver, &mut failure, elwt);
            }
            Event::AboutToWait => window.request_redraw(),
            _ => {}
        });

        let shutdown = driver.shutdown();
        result.map_err(|e| AppError::EventLoop(format!("Event loop error: {}", e)))?;
        if let Some(e) = failure {
            return Err(e);
        }
        shutdown?;
        Ok(())
    }

    fn handle_window_event(
        event: &WindowEvent,
        driver: &mut FrameDriver<WgpuComputeBackend>,
        failure: &mut Option<AppError>,
        elwt: &EventLoopWindowTarget<()>,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!(target: "app", "Window close requested");
                elwt.exit();
            }
            WindowEvent::Resized(size) => {
                driver.backend_mut().resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = driver.frame() {
                    tracing::error!(target: "app", "Frame failed: {}", e);
                    *failure = Some(e.into());
                    elwt.exit();
                }
            }
            _ => {}
        }
    }
}
