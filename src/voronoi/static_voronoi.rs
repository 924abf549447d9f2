//! 静态 Voronoi 渲染器
//!
//! 创建时生成种子、上传、派发一次绘制内核，随后立即释放种子缓冲区；
//! 之后每帧只把结果纹理绘制到屏幕。

use rand::Rng;

use crate::config::{StaticVoronoiConfig, TextureSize};
use crate::core::error::{RenderError, RenderResult};
use crate::render::backend::{BufferDescriptor, ComputeBackend, TextureHandle};
use crate::render::dispatch::paint_group_count;
use crate::render::program::{kernel, property, ComputeProgram};

use super::seeds::{generate_static_seeds, StaticSeeds};
use super::target::RenderTarget;
use super::{blit_target, released_error, VoronoiRenderer};

const NAME: &str = "static";

/// 位置缓冲区步长（vec2<f32>）
const POSITION_STRIDE: u64 = 8;
/// 颜色缓冲区步长（vec4<f32>）
const COLOR_STRIDE: u64 = 16;

/// 静态 Voronoi 渲染器
#[derive(Debug)]
pub struct StaticVoronoiRenderer {
    target: RenderTarget,
    seed_count: u32,
    thread_group_size: [u32; 3],
}

impl StaticVoronoiRenderer {
    pub fn new<R: Rng + ?Sized>(
        backend: &mut dyn ComputeBackend,
        config: &StaticVoronoiConfig,
        rng: &mut R,
    ) -> RenderResult<Self> {
        config
            .validate()
            .map_err(|e| RenderError::InvalidState(e.to_string()))?;
        let mut target = RenderTarget::create(backend, config.texture_size, "static voronoi")?;
        let seeds = generate_static_seeds(rng, config.num_seeds);

        let thread_group_size = match Self::paint(backend, &target, &seeds) {
            Ok(size) => size,
            Err(e) => {
                if let Err(cleanup) = target.release(backend) {
                    tracing::warn!(target: "voronoi", %cleanup, "failed to release static target");
                }
                return Err(e);
            }
        };

        tracing::info!(
            target: "voronoi",
            width = config.texture_size.width,
            height = config.texture_size.height,
            seeds = config.num_seeds,
            "static voronoi computed"
        );

        Ok(Self {
            target,
            seed_count: config.num_seeds,
            thread_group_size,
        })
    }

    /// 上传种子并派发一次，返回内核的线程组大小
    fn paint(
        backend: &mut dyn ComputeBackend,
        target: &RenderTarget,
        seeds: &StaticSeeds,
    ) -> RenderResult<[u32; 3]> {
        let texture = target
            .handle()
            .ok_or_else(|| released_error(NAME))?;
        let voronoi = backend.find_kernel(ComputeProgram::Voronoi, kernel::VORONOI)?;
        let thread_group_size = backend.kernel_thread_group_size(voronoi);

        let count = seeds.len() as u32;
        let positions =
            backend.create_buffer(&BufferDescriptor::new("seed positions", count, POSITION_STRIDE))?;
        let colors = match backend
            .create_buffer(&BufferDescriptor::new("seed colors", count, COLOR_STRIDE))
        {
            Ok(colors) => colors,
            Err(e) => {
                backend.destroy_buffer(positions)?;
                return Err(e);
            }
        };

        let mut dispatch = || -> RenderResult<()> {
            backend.write_buffer(positions, bytemuck::cast_slice(&seeds.positions))?;
            backend.write_buffer(colors, bytemuck::cast_slice(&seeds.colors))?;
            backend.set_texture(voronoi, property::VORONOI_TEXTURE, texture)?;
            backend.set_buffer(voronoi, property::SEED_BUFFER, positions)?;
            backend.set_buffer(voronoi, property::SEED_COLORS, colors)?;
            backend.set_uint(ComputeProgram::Voronoi, property::SEED_COUNT, count)?;
            backend.dispatch(voronoi, paint_group_count(target.size(), thread_group_size))
        };
        let result = dispatch();

        // 种子缓冲区只在这一次派发中使用
        let destroy_positions = backend.destroy_buffer(positions);
        let destroy_colors = backend.destroy_buffer(colors);
        result
            .and(destroy_positions)
            .and(destroy_colors)
            .map(|_| thread_group_size)
    }

    /// 绘制内核的线程组大小
    pub fn thread_group_size(&self) -> [u32; 3] {
        self.thread_group_size
    }
}

impl VoronoiRenderer for StaticVoronoiRenderer {
    fn tick(&mut self, _backend: &mut dyn ComputeBackend, _delta_seconds: f32) -> RenderResult<()> {
        if self.target.is_released() {
            return Err(released_error(NAME));
        }
        Ok(())
    }

    fn render(&self, backend: &mut dyn ComputeBackend) -> RenderResult<()> {
        blit_target(&self.target, backend, NAME)
    }

    fn release(&mut self, backend: &mut dyn ComputeBackend) -> RenderResult<()> {
        if self.target.is_released() {
            return Ok(());
        }
        tracing::debug!(target: "voronoi", "releasing static voronoi");
        self.target.release(backend)
    }

    fn texture(&self) -> Option<TextureHandle> {
        self.target.handle()
    }

    fn texture_size(&self) -> TextureSize {
        self.target.size()
    }

    fn seed_count(&self) -> u32 {
        self.seed_count
    }

    fn is_released(&self) -> bool {
        self.target.is_released()
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{
        BufferDescriptor, BufferHandle, ScreenRect, StorageTextureDescriptor,
    };
    use crate::render::program::KernelHandle;
    use crate::render::software::{BackendEvent, SoftwareBackend};
    use glam::{Vec2, Vec4};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(width: u32, height: u32, num_seeds: u32) -> StaticVoronoiConfig {
        StaticVoronoiConfig {
            texture_size: TextureSize::new(width, height),
            num_seeds,
            rng_seed: None,
        }
    }

    fn build(
        backend: &mut SoftwareBackend,
        config: &StaticVoronoiConfig,
        seed: u64,
    ) -> StaticVoronoiRenderer {
        StaticVoronoiRenderer::new(backend, config, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_single_seed_fills_texture() {
        let mut backend = SoftwareBackend::new();
        let renderer = build(&mut backend, &config(4, 4, 1), 7);

        let expected = generate_static_seeds(&mut StdRng::seed_from_u64(7), 1).colors[0];
        let texels = backend.read_texture(renderer.texture().unwrap()).unwrap();
        assert_eq!(texels.len(), 16);
        assert!(texels.iter().all(|&texel| texel == expected));
    }

    #[test]
    fn test_texels_take_nearest_seed_color() {
        let mut backend = SoftwareBackend::new();
        let renderer = build(&mut backend, &config(16, 12, 6), 42);

        let seeds = generate_static_seeds(&mut StdRng::seed_from_u64(42), 6);
        let texels = backend.read_texture(renderer.texture().unwrap()).unwrap();
        let size = renderer.texture_size();
        for y in 0..size.height {
            for x in 0..size.width {
                let uv = crate::voronoi::diagram::texel_uv(x, y, size);
                let expected =
                    crate::voronoi::diagram::texel_color(uv, &seeds.positions, &seeds.colors);
                assert_eq!(texels[(y * size.width + x) as usize], expected);
            }
        }
    }

    #[test]
    fn test_setup_sequence() {
        let mut backend = SoftwareBackend::new();
        let renderer = build(&mut backend, &config(20, 9, 3), 1);
        let texture = renderer.texture().unwrap();

        let events = backend.events();
        assert!(matches!(events[0], BackendEvent::TextureCreated { .. }));

        let created: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                BackendEvent::BufferCreated {
                    element_count,
                    stride,
                    ..
                } => Some((*element_count, *stride)),
                _ => None,
            })
            .collect();
        assert_eq!(created, vec![(3, 8), (3, 16)]);

        let dispatch = events
            .iter()
            .position(|event| {
                *event
                    == BackendEvent::Dispatched {
                        kernel: kernel::VORONOI,
                        group_count: [3, 2, 1],
                    }
            })
            .unwrap();
        let destroyed: Vec<_> = events
            .iter()
            .enumerate()
            .filter(|(_, event)| matches!(event, BackendEvent::BufferDestroyed(_)))
            .map(|(index, _)| index)
            .collect();
        assert_eq!(destroyed.len(), 2);
        assert!(destroyed.iter().all(|&index| index > dispatch));

        assert_eq!(backend.live_buffer_count(), 0);
        assert_eq!(backend.read_texture(texture).unwrap().len(), 180);
        assert_eq!(renderer.thread_group_size(), [8, 8, 1]);
    }

    #[test]
    fn test_zero_seeds() {
        let mut backend = SoftwareBackend::new();
        let renderer = build(&mut backend, &config(8, 8, 0), 1);

        assert_eq!(renderer.seed_count(), 0);
        let texels = backend.read_texture(renderer.texture().unwrap()).unwrap();
        assert!(texels.iter().all(|&texel| texel == Vec4::ZERO));
        assert_eq!(backend.live_buffer_count(), 0);
    }

    #[test]
    fn test_tick_does_not_dispatch() {
        let mut backend = SoftwareBackend::new();
        let mut renderer = build(&mut backend, &config(4, 4, 2), 1);
        backend.clear_events();

        for _ in 0..3 {
            renderer.tick(&mut backend, 0.016).unwrap();
        }
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_render_blits_at_origin() {
        let mut backend = SoftwareBackend::new();
        let renderer = build(&mut backend, &config(64, 32, 2), 1);

        renderer.render(&mut backend).unwrap();
        backend.present().unwrap();

        let rect = ScreenRect::at_origin(TextureSize::new(64, 32));
        assert_eq!(
            backend.last_frame(),
            &[(renderer.texture().unwrap(), rect)]
        );
    }

    #[test]
    fn test_release_once_and_use_after_release() {
        let mut backend = SoftwareBackend::new();
        let mut renderer = build(&mut backend, &config(4, 4, 2), 1);

        renderer.release(&mut backend).unwrap();
        renderer.release(&mut backend).unwrap();
        let destroyed = backend
            .events()
            .iter()
            .filter(|event| matches!(event, BackendEvent::TextureDestroyed(_)))
            .count();
        assert_eq!(destroyed, 1);
        assert!(renderer.is_released());
        assert_eq!(backend.live_texture_count(), 0);

        backend.clear_events();
        assert!(matches!(
            renderer.tick(&mut backend, 0.016),
            Err(RenderError::InvalidState(_))
        ));
        assert!(matches!(
            renderer.render(&mut backend),
            Err(RenderError::InvalidState(_))
        ));
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_seed_positions_uploaded_verbatim() {
        let mut backend = SoftwareBackend::new();
        build(&mut backend, &config(2, 2, 4), 5);

        let seeds = generate_static_seeds(&mut StdRng::seed_from_u64(5), 4);
        assert!(seeds
            .positions
            .iter()
            .all(|p| p.cmpge(Vec2::ZERO).all() && p.cmple(Vec2::ONE).all()));
        let written: Vec<usize> = backend
            .events()
            .iter()
            .filter_map(|event| match event {
                BackendEvent::BufferWritten { bytes, .. } => Some(*bytes),
                _ => None,
            })
            .collect();
        assert_eq!(written, vec![32, 64]);
    }

    /// 第一次销毁缓冲区时失败的后端
    struct FlakyDestroy {
        inner: SoftwareBackend,
        failed: bool,
    }

    impl ComputeBackend for FlakyDestroy {
        fn create_storage_texture(
            &mut self,
            desc: &StorageTextureDescriptor,
        ) -> RenderResult<TextureHandle> {
            self.inner.create_storage_texture(desc)
        }

        fn destroy_texture(&mut self, texture: TextureHandle) -> RenderResult<()> {
            self.inner.destroy_texture(texture)
        }

        fn create_buffer(&mut self, desc: &BufferDescriptor) -> RenderResult<BufferHandle> {
            self.inner.create_buffer(desc)
        }

        fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> RenderResult<()> {
            self.inner.write_buffer(buffer, data)
        }

        fn destroy_buffer(&mut self, buffer: BufferHandle) -> RenderResult<()> {
            if !self.failed {
                self.failed = true;
                return Err(RenderError::InvalidHandle(format!("{buffer:?}")));
            }
            self.inner.destroy_buffer(buffer)
        }

        fn find_kernel(
            &mut self,
            program: ComputeProgram,
            entry_point: &str,
        ) -> RenderResult<KernelHandle> {
            self.inner.find_kernel(program, entry_point)
        }

        fn kernel_thread_group_size(&self, kernel: KernelHandle) -> [u32; 3] {
            self.inner.kernel_thread_group_size(kernel)
        }

        fn set_texture(
            &mut self,
            kernel: KernelHandle,
            name: &str,
            texture: TextureHandle,
        ) -> RenderResult<()> {
            self.inner.set_texture(kernel, name, texture)
        }

        fn set_buffer(
            &mut self,
            kernel: KernelHandle,
            name: &str,
            buffer: BufferHandle,
        ) -> RenderResult<()> {
            self.inner.set_buffer(kernel, name, buffer)
        }

        fn set_float(
            &mut self,
            program: ComputeProgram,
            name: &str,
            value: f32,
        ) -> RenderResult<()> {
            self.inner.set_float(program, name, value)
        }

        fn set_uint(&mut self, program: ComputeProgram, name: &str, value: u32) -> RenderResult<()> {
            self.inner.set_uint(program, name, value)
        }

        fn dispatch(&mut self, kernel: KernelHandle, group_count: [u32; 3]) -> RenderResult<()> {
            self.inner.dispatch(kernel, group_count)
        }

        fn draw_texture(&mut self, rect: ScreenRect, texture: TextureHandle) -> RenderResult<()> {
            self.inner.draw_texture(rect, texture)
        }

        fn present(&mut self) -> RenderResult<()> {
            self.inner.present()
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[test]
    fn test_failed_buffer_cleanup_still_frees_the_rest() {
        let mut backend = FlakyDestroy {
            inner: SoftwareBackend::new(),
            failed: false,
        };
        let result =
            StaticVoronoiRenderer::new(&mut backend, &config(4, 4, 3), &mut StdRng::seed_from_u64(1));

        assert!(matches!(result, Err(RenderError::InvalidHandle(_))));
        // 只有销毁失败的那个缓冲区残留
        assert_eq!(backend.inner.live_buffer_count(), 1);
        assert_eq!(backend.inner.live_texture_count(), 0);
    }

    #[test]
    fn test_invalid_config_rejected_before_allocation() {
        let mut backend = SoftwareBackend::new();
        let mut rng = StdRng::seed_from_u64(1);

        for bad in [
            config(8, 8, crate::config::MAX_SEED_COUNT + 1),
            config(8, 0, 3),
        ] {
            assert!(matches!(
                StaticVoronoiRenderer::new(&mut backend, &bad, &mut rng),
                Err(RenderError::InvalidState(_))
            ));
        }
        assert!(backend.events().is_empty());
    }
}
