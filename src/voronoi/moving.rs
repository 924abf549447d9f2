//! 移动 Voronoi 渲染器
//!
//! 种子常驻在一个读写缓冲区中。每帧：
//! 1. `UpdateSeeds`：每个种子一个工作组，按速度推进并处理越界
//! 2. `MovingVoronoi`：按最新种子位置重绘整张纹理
//!
//! 两次派发按顺序提交到同一队列，绘制总能看到本帧的更新结果。
//!
//! 绑定和程序参数由后端按程序共享，每帧派发前重新提交本实例的资源，
//! 同一后端上的多个实例互不干扰。

use rand::Rng;

use crate::config::{BoundaryPolicy, MovingVoronoiConfig, TextureSize};
use crate::core::error::{RenderError, RenderResult};
use crate::render::backend::{BufferDescriptor, BufferHandle, ComputeBackend, TextureHandle};
use crate::render::dispatch::{paint_group_count, update_group_count};
use crate::render::program::{kernel, property, ComputeProgram, GpuSeed, KernelHandle};

use super::seeds::{generate_moving_seeds, Seed};
use super::target::RenderTarget;
use super::{blit_target, released_error, VoronoiRenderer};

const NAME: &str = "moving";

/// 移动 Voronoi 渲染器
#[derive(Debug)]
pub struct MovingVoronoiRenderer {
    target: RenderTarget,
    seed_buffer: Option<BufferHandle>,
    update_kernel: KernelHandle,
    paint_kernel: KernelHandle,
    update_group_size: [u32; 3],
    paint_group_size: [u32; 3],
    seed_count: u32,
    boundary: BoundaryPolicy,
}

/// 已解析并绑定好的两个内核
struct Kernels {
    update: KernelHandle,
    paint: KernelHandle,
    update_group_size: [u32; 3],
    paint_group_size: [u32; 3],
}

impl MovingVoronoiRenderer {
    pub fn new<R: Rng + ?Sized>(
        backend: &mut dyn ComputeBackend,
        config: &MovingVoronoiConfig,
        rng: &mut R,
    ) -> RenderResult<Self> {
        config
            .validate()
            .map_err(|e| RenderError::InvalidState(e.to_string()))?;
        let mut target = RenderTarget::create(backend, config.texture_size, "moving voronoi")?;
        let seeds = generate_moving_seeds(rng, config.num_seeds, config.base_speed);

        let mut seed_buffer = None;
        let kernels = match Self::setup(backend, &target, &seeds, config, &mut seed_buffer) {
            Ok(kernels) => kernels,
            Err(e) => {
                if let Some(buffer) = seed_buffer {
                    if let Err(cleanup) = backend.destroy_buffer(buffer) {
                        tracing::warn!(target: "voronoi", %cleanup, "failed to release seed buffer");
                    }
                }
                if let Err(cleanup) = target.release(backend) {
                    tracing::warn!(target: "voronoi", %cleanup, "failed to release moving target");
                }
                return Err(e);
            }
        };

        tracing::info!(
            target: "voronoi",
            width = config.texture_size.width,
            height = config.texture_size.height,
            seeds = config.num_seeds,
            base_speed = config.base_speed,
            boundary = ?config.boundary,
            "moving voronoi ready"
        );

        Ok(Self {
            target,
            seed_buffer,
            update_kernel: kernels.update,
            paint_kernel: kernels.paint,
            update_group_size: kernels.update_group_size,
            paint_group_size: kernels.paint_group_size,
            seed_count: config.num_seeds,
            boundary: config.boundary,
        })
    }

    /// 解析内核、上传种子并完成全部绑定
    fn setup(
        backend: &mut dyn ComputeBackend,
        target: &RenderTarget,
        seeds: &[Seed],
        config: &MovingVoronoiConfig,
        seed_buffer: &mut Option<BufferHandle>,
    ) -> RenderResult<Kernels> {
        let texture = target.handle().ok_or_else(|| released_error(NAME))?;
        let program = ComputeProgram::MovingVoronoi;
        let paint = backend.find_kernel(program, kernel::MOVING_VORONOI)?;
        let update = backend.find_kernel(program, kernel::UPDATE_SEEDS)?;

        let count = seeds.len() as u32;
        let buffer = backend.create_buffer(&BufferDescriptor::new(
            "moving seeds",
            count,
            std::mem::size_of::<GpuSeed>() as u64,
        ))?;
        *seed_buffer = Some(buffer);

        let records: Vec<GpuSeed> = seeds.iter().map(Seed::to_gpu).collect();
        backend.write_buffer(buffer, bytemuck::cast_slice(&records))?;

        let kernels = Kernels {
            update,
            paint,
            update_group_size: backend.kernel_thread_group_size(update),
            paint_group_size: backend.kernel_thread_group_size(paint),
        };
        kernels.bind(backend, texture, buffer, count, config.boundary)?;
        Ok(kernels)
    }

    fn kernels(&self) -> Kernels {
        Kernels {
            update: self.update_kernel,
            paint: self.paint_kernel,
            update_group_size: self.update_group_size,
            paint_group_size: self.paint_group_size,
        }
    }

    /// 种子缓冲区
    pub fn seed_buffer(&self) -> Option<BufferHandle> {
        self.seed_buffer
    }

    /// 更新内核与绘制内核的线程组大小
    pub fn thread_group_sizes(&self) -> ([u32; 3], [u32; 3]) {
        (self.update_group_size, self.paint_group_size)
    }
}

impl Kernels {
    /// 提交本实例的纹理、种子缓冲区和程序参数
    fn bind(
        &self,
        backend: &mut dyn ComputeBackend,
        texture: TextureHandle,
        buffer: BufferHandle,
        count: u32,
        boundary: BoundaryPolicy,
    ) -> RenderResult<()> {
        let program = ComputeProgram::MovingVoronoi;
        backend.set_texture(self.paint, property::TEXTURE, texture)?;
        backend.set_buffer(self.paint, property::SEED_BUFFER, buffer)?;
        backend.set_buffer(self.update, property::SEED_BUFFER, buffer)?;
        backend.set_uint(program, property::SEED_COUNT, count)?;
        backend.set_uint(program, property::BOUNDARY, boundary.as_u32())
    }
}

impl VoronoiRenderer for MovingVoronoiRenderer {
    fn tick(&mut self, backend: &mut dyn ComputeBackend, delta_seconds: f32) -> RenderResult<()> {
        let (Some(texture), Some(buffer)) = (self.target.handle(), self.seed_buffer) else {
            return Err(released_error(NAME));
        };

        backend.set_float(
            ComputeProgram::MovingVoronoi,
            property::DELTA_TIME,
            delta_seconds,
        )?;
        self.kernels()
            .bind(backend, texture, buffer, self.seed_count, self.boundary)?;
        backend.dispatch(
            self.update_kernel,
            update_group_count(self.seed_count, self.update_group_size),
        )?;
        backend.dispatch(
            self.paint_kernel,
            paint_group_count(self.target.size(), self.paint_group_size),
        )
    }

    fn render(&self, backend: &mut dyn ComputeBackend) -> RenderResult<()> {
        blit_target(&self.target, backend, NAME)
    }

    fn release(&mut self, backend: &mut dyn ComputeBackend) -> RenderResult<()> {
        if self.is_released() {
            return Ok(());
        }
        tracing::debug!(target: "voronoi", "releasing moving voronoi");

        let texture = self.target.release(backend);
        let buffer = match self.seed_buffer.take() {
            Some(buffer) => backend.destroy_buffer(buffer),
            None => Ok(()),
        };
        texture.and(buffer)
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
        self.target.is_released() && self.seed_buffer.is_none()
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoundaryPolicy;
    use crate::core::error::RenderError;
    use crate::render::backend::ScreenRect;
    use crate::render::software::{BackendEvent, SoftwareBackend};
    use crate::voronoi::diagram::{texel_color, texel_uv};
    use crate::voronoi::seeds::advance_position;
    use glam::{Vec2, Vec4};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(width: u32, height: u32, num_seeds: u32, base_speed: f32) -> MovingVoronoiConfig {
        MovingVoronoiConfig {
            texture_size: TextureSize::new(width, height),
            num_seeds,
            base_speed,
            boundary: BoundaryPolicy::Wrap,
            rng_seed: None,
        }
    }

    fn build(
        backend: &mut SoftwareBackend,
        config: &MovingVoronoiConfig,
        seed: u64,
    ) -> MovingVoronoiRenderer {
        MovingVoronoiRenderer::new(backend, config, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    fn dispatched(backend: &SoftwareBackend) -> Vec<(&'static str, [u32; 3])> {
        backend
            .events()
            .iter()
            .filter_map(|event| match event {
                BackendEvent::Dispatched {
                    kernel,
                    group_count,
                } => Some((*kernel, *group_count)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_setup_allocates_one_seed_buffer() {
        let mut backend = SoftwareBackend::new();
        let renderer = build(&mut backend, &config(32, 32, 10, 0.0005), 3);

        assert_eq!(backend.live_texture_count(), 1);
        assert_eq!(backend.live_buffer_count(), 1);
        assert!(backend.events().contains(&BackendEvent::BufferCreated {
            buffer: renderer.seed_buffer().unwrap(),
            element_count: 10,
            stride: 32,
        }));
        // 创建时不派发
        assert!(dispatched(&backend).is_empty());
        assert_eq!(renderer.thread_group_sizes(), ([1, 1, 1], [8, 8, 1]));
    }

    #[test]
    fn test_update_precedes_paint_every_frame() {
        let mut backend = SoftwareBackend::new();
        let mut renderer = build(&mut backend, &config(100, 50, 7, 0.0005), 3);

        for _ in 0..3 {
            renderer.tick(&mut backend, 0.016).unwrap();
        }

        let expected = [
            (kernel::UPDATE_SEEDS, [7, 1, 1]),
            (kernel::MOVING_VORONOI, [13, 7, 1]),
        ];
        let dispatches = dispatched(&backend);
        assert_eq!(dispatches.len(), 6);
        for frame in dispatches.chunks(2) {
            assert_eq!(frame, expected);
        }
    }

    #[test]
    fn test_delta_time_set_before_update() {
        let mut backend = SoftwareBackend::new();
        let mut renderer = build(&mut backend, &config(8, 8, 2, 0.1), 3);
        backend.clear_events();

        renderer.tick(&mut backend, 0.25).unwrap();
        assert_eq!(
            backend.events()[0],
            BackendEvent::ParamSet {
                program: ComputeProgram::MovingVoronoi,
                name: property::DELTA_TIME,
            }
        );
        assert_eq!(
            backend.params(ComputeProgram::MovingVoronoi).f32_at(0),
            0.25
        );
    }

    #[test]
    fn test_seeds_move_by_velocity() {
        let mut backend = SoftwareBackend::new();
        let mut renderer = build(&mut backend, &config(16, 16, 5, 0.2), 11);
        let buffer = renderer.seed_buffer().unwrap();
        let before = backend.read_seeds(buffer).unwrap();

        renderer.tick(&mut backend, 0.5).unwrap();

        let after = backend.read_seeds(buffer).unwrap();
        for (old, new) in before.iter().zip(&after) {
            let (position, velocity) = advance_position(
                Vec2::from_array(old.position),
                Vec2::from_array(old.velocity),
                0.5,
                BoundaryPolicy::Wrap,
            );
            assert_eq!(Vec2::from_array(new.position), position);
            assert_eq!(Vec2::from_array(new.velocity), velocity);
            assert_eq!(new.color, old.color);
        }
    }

    #[test]
    fn test_paint_uses_updated_positions() {
        let mut backend = SoftwareBackend::new();
        let mut renderer = build(&mut backend, &config(24, 16, 4, 0.3), 19);

        renderer.tick(&mut backend, 0.5).unwrap();

        let seeds = backend.read_seeds(renderer.seed_buffer().unwrap()).unwrap();
        let positions: Vec<Vec2> = seeds.iter().map(|s| Vec2::from_array(s.position)).collect();
        let colors: Vec<Vec4> = seeds.iter().map(|s| Vec4::from_array(s.color)).collect();
        let texels = backend.read_texture(renderer.texture().unwrap()).unwrap();
        let size = renderer.texture_size();
        for y in 0..size.height {
            for x in 0..size.width {
                let expected = texel_color(texel_uv(x, y, size), &positions, &colors);
                assert_eq!(texels[(y * size.width + x) as usize], expected);
            }
        }
    }

    #[test]
    fn test_single_seed_fills_texture() {
        let mut backend = SoftwareBackend::new();
        let mut renderer = build(&mut backend, &config(4, 4, 1, 0.0005), 2);
        renderer.tick(&mut backend, 0.016).unwrap();

        let color = backend.read_seeds(renderer.seed_buffer().unwrap()).unwrap()[0].color;
        let texels = backend.read_texture(renderer.texture().unwrap()).unwrap();
        assert!(texels.iter().all(|&texel| texel == Vec4::from_array(color)));
    }

    #[test]
    fn test_zero_seeds() {
        let mut backend = SoftwareBackend::new();
        let mut renderer = build(&mut backend, &config(8, 8, 0, 0.0005), 2);
        renderer.tick(&mut backend, 0.016).unwrap();

        assert_eq!(
            dispatched(&backend),
            vec![
                (kernel::UPDATE_SEEDS, [0, 1, 1]),
                (kernel::MOVING_VORONOI, [1, 1, 1]),
            ]
        );
        let texels = backend.read_texture(renderer.texture().unwrap()).unwrap();
        assert!(texels.iter().all(|&texel| texel == Vec4::ZERO));
    }

    #[test]
    fn test_bounce_keeps_seeds_inside() {
        let mut backend = SoftwareBackend::new();
        let mut config = config(8, 8, 16, 3.0);
        config.boundary = BoundaryPolicy::Bounce;
        let mut renderer = build(&mut backend, &config, 5);

        for _ in 0..20 {
            renderer.tick(&mut backend, 0.1).unwrap();
        }
        let seeds = backend.read_seeds(renderer.seed_buffer().unwrap()).unwrap();
        for seed in seeds {
            let p = Vec2::from_array(seed.position);
            assert!(p.cmpge(Vec2::ZERO).all() && p.cmple(Vec2::ONE).all(), "{p:?}");
            assert!((Vec2::from_array(seed.velocity).length() - 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_render_blits_at_origin() {
        let mut backend = SoftwareBackend::new();
        let mut renderer = build(&mut backend, &config(40, 30, 3, 0.0005), 2);
        renderer.tick(&mut backend, 0.016).unwrap();
        renderer.render(&mut backend).unwrap();
        backend.present().unwrap();

        assert_eq!(
            backend.last_frame(),
            &[(
                renderer.texture().unwrap(),
                ScreenRect::at_origin(TextureSize::new(40, 30))
            )]
        );
    }

    #[test]
    fn test_release_once_and_use_after_release() {
        let mut backend = SoftwareBackend::new();
        let mut renderer = build(&mut backend, &config(8, 8, 4, 0.0005), 2);
        renderer.tick(&mut backend, 0.016).unwrap();

        renderer.release(&mut backend).unwrap();
        renderer.release(&mut backend).unwrap();
        assert!(renderer.is_released());
        assert_eq!(backend.live_texture_count(), 0);
        assert_eq!(backend.live_buffer_count(), 0);

        let destroyed = backend
            .events()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    BackendEvent::TextureDestroyed(_) | BackendEvent::BufferDestroyed(_)
                )
            })
            .count();
        assert_eq!(destroyed, 2);

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

    fn reference_texels(backend: &SoftwareBackend, renderer: &MovingVoronoiRenderer) -> Vec<Vec4> {
        let seeds = backend.read_seeds(renderer.seed_buffer().unwrap()).unwrap();
        let positions: Vec<Vec2> = seeds.iter().map(|s| Vec2::from_array(s.position)).collect();
        let colors: Vec<Vec4> = seeds.iter().map(|s| Vec4::from_array(s.color)).collect();
        let size = renderer.texture_size();
        (0..size.height)
            .flat_map(|y| (0..size.width).map(move |x| texel_uv(x, y, size)))
            .map(|uv| texel_color(uv, &positions, &colors))
            .collect()
    }

    #[test]
    fn test_instances_on_one_backend_stay_independent() {
        let mut backend = SoftwareBackend::new();
        let mut first = build(&mut backend, &config(12, 12, 3, 0.2), 21);
        let mut bounced = config(12, 12, 5, 0.2);
        bounced.boundary = BoundaryPolicy::Bounce;
        let mut second = build(&mut backend, &bounced, 22);

        let second_seeds = backend.read_seeds(second.seed_buffer().unwrap()).unwrap();
        first.tick(&mut backend, 0.1).unwrap();

        assert_eq!(
            backend.read_texture(first.texture().unwrap()).unwrap(),
            reference_texels(&backend, &first)
        );
        // 另一个实例的缓冲区和纹理保持不变
        assert_eq!(
            backend.read_seeds(second.seed_buffer().unwrap()).unwrap(),
            second_seeds
        );
        assert!(backend
            .read_texture(second.texture().unwrap())
            .unwrap()
            .iter()
            .all(|&texel| texel == Vec4::ZERO));

        second.tick(&mut backend, 0.1).unwrap();
        assert_eq!(
            backend.read_texture(second.texture().unwrap()).unwrap(),
            reference_texels(&backend, &second)
        );
        let params = backend.params(ComputeProgram::MovingVoronoi);
        assert_eq!(params.u32_at(4), 5);
        assert_eq!(params.u32_at(8), BoundaryPolicy::Bounce.as_u32());
    }

    #[test]
    fn test_invalid_config_rejected_before_allocation() {
        let mut backend = SoftwareBackend::new();
        let mut rng = StdRng::seed_from_u64(1);

        let too_many = config(8, 8, crate::config::MAX_SEED_COUNT + 1, 0.0005);
        assert!(matches!(
            MovingVoronoiRenderer::new(&mut backend, &too_many, &mut rng),
            Err(RenderError::InvalidState(_))
        ));
        let empty = config(0, 8, 4, 0.0005);
        assert!(matches!(
            MovingVoronoiRenderer::new(&mut backend, &empty, &mut rng),
            Err(RenderError::InvalidState(_))
        ));
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_same_seed_same_frames() {
        let run = |seed| {
            let mut backend = SoftwareBackend::new();
            let mut renderer = build(&mut backend, &config(16, 16, 6, 0.05), seed);
            for _ in 0..4 {
                renderer.tick(&mut backend, 0.1).unwrap();
            }
            backend.read_texture(renderer.texture().unwrap()).unwrap()
        };
        assert_eq!(run(8), run(8));
    }
}
