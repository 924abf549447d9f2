//! Voronoi 渲染器
//!
//! 两个互不相关的渲染器：
//! - [`StaticVoronoiRenderer`]：创建时计算一次
//! - [`MovingVoronoiRenderer`]：每帧先更新种子再重绘
//!
//! 渲染器只通过 [`ComputeBackend`] 分配资源和派发，不持有后端。

pub mod diagram;
pub mod moving;
pub mod seeds;
pub mod static_voronoi;
pub mod target;

pub use moving::MovingVoronoiRenderer;
pub use seeds::{Seed, StaticSeeds};
pub use static_voronoi::StaticVoronoiRenderer;
pub use target::RenderTarget;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{AppConfig, DemoMode, TextureSize};
use crate::core::error::{RenderError, RenderResult};
use crate::render::backend::{ComputeBackend, TextureHandle};

/// 渲染器公共接口
///
/// 每帧由驱动按 `tick` → `render` 的顺序调用。
/// `release` 之后 `tick` / `render` 返回 [`RenderError::InvalidState`]，
/// 再次 `release` 不做任何事。
pub trait VoronoiRenderer {
    /// 推进一帧
    fn tick(&mut self, backend: &mut dyn ComputeBackend, delta_seconds: f32) -> RenderResult<()>;

    /// 把目标纹理绘制到屏幕左上角（不缩放）
    fn render(&self, backend: &mut dyn ComputeBackend) -> RenderResult<()>;

    /// 释放全部 GPU 资源
    fn release(&mut self, backend: &mut dyn ComputeBackend) -> RenderResult<()>;

    /// 目标纹理
    fn texture(&self) -> Option<TextureHandle>;

    fn texture_size(&self) -> TextureSize;

    fn seed_count(&self) -> u32;

    fn is_released(&self) -> bool;

    fn name(&self) -> &'static str;
}

/// 按配置选择并创建渲染器
pub fn build_renderer(
    config: &AppConfig,
    backend: &mut dyn ComputeBackend,
) -> RenderResult<Box<dyn VoronoiRenderer>> {
    match config.demo {
        DemoMode::Static => {
            let mut rng = make_rng(config.static_voronoi.rng_seed);
            let renderer = StaticVoronoiRenderer::new(backend, &config.static_voronoi, &mut rng)?;
            Ok(Box::new(renderer))
        }
        DemoMode::Moving => {
            let mut rng = make_rng(config.moving_voronoi.rng_seed);
            let renderer = MovingVoronoiRenderer::new(backend, &config.moving_voronoi, &mut rng)?;
            Ok(Box::new(renderer))
        }
    }
}

/// 有种子时可复现，否则使用系统熵
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// 已释放渲染器的统一错误
pub(crate) fn released_error(renderer: &str) -> RenderError {
    RenderError::InvalidState(format!("{renderer} renderer used after release"))
}

/// 绘制目标纹理；已释放时报错
pub(crate) fn blit_target(
    target: &RenderTarget,
    backend: &mut dyn ComputeBackend,
    renderer: &str,
) -> RenderResult<()> {
    let texture = target.handle().ok_or_else(|| released_error(renderer))?;
    backend.draw_texture(
        crate::render::backend::ScreenRect::at_origin(target.size()),
        texture,
    )
}
