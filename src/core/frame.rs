//! 帧驱动
//!
//! 把一个渲染器和一个计算后端组合成每帧 `tick` → `render` → `present` 的循环。
//! 窗口事件循环和测试都通过它驱动渲染器。

use crate::core::error::RenderResult;
use crate::core::time::FrameTime;
use crate::render::backend::ComputeBackend;
use crate::voronoi::VoronoiRenderer;

/// 帧驱动
pub struct FrameDriver<B: ComputeBackend> {
    backend: B,
    renderer: Box<dyn VoronoiRenderer>,
    time: FrameTime,
}

impl<B: ComputeBackend> FrameDriver<B> {
    pub fn new(backend: B, renderer: Box<dyn VoronoiRenderer>) -> Self {
        Self {
            backend,
            renderer,
            time: FrameTime::new(),
        }
    }

    /// 按墙钟间隔执行一帧
    pub fn frame(&mut self) -> RenderResult<()> {
        let delta = self.time.advance();
        self.run_frame(delta)
    }

    /// 按固定间隔执行一帧
    pub fn frame_with_delta(&mut self, delta_seconds: f32) -> RenderResult<()> {
        let delta = self.time.advance_by(delta_seconds);
        self.run_frame(delta)
    }

    fn run_frame(&mut self, delta: f32) -> RenderResult<()> {
        self.renderer.tick(&mut self.backend, delta)?;
        self.renderer.render(&mut self.backend)?;
        self.backend.present()
    }

    /// 释放渲染器资源，返回后端
    pub fn shutdown(mut self) -> RenderResult<B> {
        tracing::info!(
            target: "app",
            renderer = self.renderer.name(),
            frames = self.time.frame_count,
            "shutting down renderer"
        );
        self.renderer.release(&mut self.backend)?;
        Ok(self.backend)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn renderer(&self) -> &dyn VoronoiRenderer {
        self.renderer.as_ref()
    }

    pub fn time(&self) -> &FrameTime {
        &self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MovingVoronoiConfig, TextureSize};
    use crate::render::software::{BackendEvent, SoftwareBackend};
    use crate::voronoi::MovingVoronoiRenderer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn driver() -> FrameDriver<SoftwareBackend> {
        let mut backend = SoftwareBackend::new();
        let config = MovingVoronoiConfig {
            texture_size: TextureSize::new(8, 8),
            ..Default::default()
        };
        let renderer =
            MovingVoronoiRenderer::new(&mut backend, &config, &mut StdRng::seed_from_u64(1))
                .unwrap();
        backend.clear_events();
        FrameDriver::new(backend, Box::new(renderer))
    }

    #[test]
    fn test_frame_order() {
        let mut driver = driver();
        driver.frame_with_delta(0.016).unwrap();

        let kinds: Vec<&str> = driver
            .backend()
            .events()
            .iter()
            .map(|event| match event {
                BackendEvent::ParamSet { .. } => "param",
                BackendEvent::Dispatched { kernel, .. } => *kernel,
                BackendEvent::Drawn { .. } => "draw",
                BackendEvent::Presented => "present",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "param",
                "param",
                "param",
                "UpdateSeeds",
                "MovingVoronoi",
                "draw",
                "present"
            ]
        );
        assert_eq!(driver.time().frame_count, 1);
        assert_eq!(driver.renderer().name(), "moving");
    }

    #[test]
    fn test_shutdown_releases_resources() {
        let mut driver = driver();
        driver.frame().unwrap();
        driver.frame_with_delta(0.02).unwrap();

        let backend = driver.shutdown().unwrap();
        assert_eq!(backend.frames_presented(), 2);
        assert_eq!(backend.live_texture_count(), 0);
        assert_eq!(backend.live_buffer_count(), 0);
    }
}
