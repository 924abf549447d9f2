//! 软件计算后端
//!
//! 在 CPU 上逐线程执行与 WGSL 相同语义的内核，并记录所有后端调用。
//! 用于测试（资源生命周期、派发顺序、覆盖率）和无 GPU 环境。
//!
//! 派发严格按照 `工作组数 × 工作组大小` 枚举调用，网格不足时
//! 未覆盖的纹素会保持原值，与 GPU 行为一致。

use std::collections::HashMap;

use glam::{Vec2, Vec4};

use crate::config::{BoundaryPolicy, TextureSize};
use crate::core::error::{RenderError, RenderResult};
use crate::voronoi::diagram::{texel_color, texel_uv};
use crate::voronoi::seeds::advance_position;

use super::backend::{
    BindingTable, BufferDescriptor, BufferHandle, ComputeBackend, HandleAllocator,
    ResourceBinding, ScreenRect, StorageTextureDescriptor, TextureHandle,
};
use super::program::{
    kernel, property, ComputeProgram, GpuSeed, KernelHandle, ParamBlock, ParamKind, ResourceSlot,
};

/// 后端调用记录
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    TextureCreated {
        texture: TextureHandle,
        size: TextureSize,
    },
    TextureDestroyed(TextureHandle),
    BufferCreated {
        buffer: BufferHandle,
        element_count: u32,
        stride: u64,
    },
    BufferWritten {
        buffer: BufferHandle,
        bytes: usize,
    },
    BufferDestroyed(BufferHandle),
    ParamSet {
        program: ComputeProgram,
        name: &'static str,
    },
    Dispatched {
        kernel: &'static str,
        group_count: [u32; 3],
    },
    Drawn {
        texture: TextureHandle,
        rect: ScreenRect,
    },
    Presented,
}

struct SoftTexture {
    size: TextureSize,
    texels: Vec<Vec4>,
}

struct SoftBuffer {
    desc: BufferDescriptor,
    data: Vec<u8>,
}

/// CPU 计算后端
#[derive(Default)]
pub struct SoftwareBackend {
    ids: HandleAllocator,
    textures: HashMap<TextureHandle, SoftTexture>,
    buffers: HashMap<BufferHandle, SoftBuffer>,
    bindings: BindingTable,
    params: HashMap<ComputeProgram, ParamBlock>,
    pending_draws: Vec<(TextureHandle, ScreenRect)>,
    last_frame: Vec<(TextureHandle, ScreenRect)>,
    frames_presented: u64,
    events: Vec<BackendEvent>,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部调用记录
    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    /// 清空调用记录
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// 读取纹理内容（行优先）
    pub fn read_texture(&self, texture: TextureHandle) -> RenderResult<Vec<Vec4>> {
        self.texture(texture).map(|t| t.texels.clone())
    }

    /// 读取缓冲区原始字节
    pub fn read_buffer(&self, buffer: BufferHandle) -> RenderResult<&[u8]> {
        self.buffer(buffer).map(|b| b.data.as_slice())
    }

    /// 读取种子缓冲区
    pub fn read_seeds(&self, buffer: BufferHandle) -> RenderResult<Vec<GpuSeed>> {
        self.read_buffer(buffer).map(bytemuck::pod_collect_to_vec)
    }

    /// 当前存活的纹理数
    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// 当前存活的缓冲区数
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// 已呈现的帧数
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// 最近一次 `present` 绘制的内容
    pub fn last_frame(&self) -> &[(TextureHandle, ScreenRect)] {
        &self.last_frame
    }

    /// 程序当前的参数块
    pub fn params(&self, program: ComputeProgram) -> ParamBlock {
        self.params.get(&program).copied().unwrap_or_default()
    }

    fn texture(&self, texture: TextureHandle) -> RenderResult<&SoftTexture> {
        self.textures
            .get(&texture)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{texture:?}")))
    }

    fn buffer(&self, buffer: BufferHandle) -> RenderResult<&SoftBuffer> {
        self.buffers
            .get(&buffer)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{buffer:?}")))
    }

    fn set_param(
        &mut self,
        program: ComputeProgram,
        name: &str,
        kind: ParamKind,
        write: impl FnOnce(&mut ParamBlock, usize),
    ) -> RenderResult<()> {
        let slot = program
            .param(name)
            .filter(|slot| slot.kind == kind)
            .ok_or_else(|| RenderError::UnknownParam {
                program: program.name(),
                name: name.to_string(),
            })?;
        write(self.params.entry(program).or_default(), slot.offset);
        self.events.push(BackendEvent::ParamSet {
            program,
            name: slot.name,
        });
        Ok(())
    }

    /// 按名称取出已绑定资源
    fn bound(
        resolved: &[(&'static ResourceSlot, ResourceBinding)],
        name: &str,
    ) -> RenderResult<ResourceBinding> {
        resolved
            .iter()
            .find(|(slot, _)| slot.name == name)
            .map(|(_, binding)| *binding)
            .ok_or_else(|| RenderError::InvalidState(format!("slot '{name}' not resolved")))
    }

    fn bound_texture(
        resolved: &[(&'static ResourceSlot, ResourceBinding)],
        name: &str,
    ) -> RenderResult<TextureHandle> {
        match Self::bound(resolved, name)? {
            ResourceBinding::Texture(texture) => Ok(texture),
            other => Err(RenderError::InvalidState(format!(
                "slot '{name}' holds {other:?}"
            ))),
        }
    }

    fn bound_buffer(
        resolved: &[(&'static ResourceSlot, ResourceBinding)],
        name: &str,
    ) -> RenderResult<BufferHandle> {
        match Self::bound(resolved, name)? {
            ResourceBinding::Buffer(buffer) => Ok(buffer),
            other => Err(RenderError::InvalidState(format!(
                "slot '{name}' holds {other:?}"
            ))),
        }
    }

    /// 对网格中的每个调用执行 `invocation(global_id)`
    fn for_each_invocation(
        group_count: [u32; 3],
        group_size: [u32; 3],
        mut invocation: impl FnMut([u32; 3]),
    ) {
        for gz in 0..group_count[2] {
            for gy in 0..group_count[1] {
                for gx in 0..group_count[0] {
                    for lz in 0..group_size[2] {
                        for ly in 0..group_size[1] {
                            for lx in 0..group_size[0] {
                                invocation([
                                    gx * group_size[0] + lx,
                                    gy * group_size[1] + ly,
                                    gz * group_size[2] + lz,
                                ]);
                            }
                        }
                    }
                }
            }
        }
    }

    /// 用最近种子颜色绘制纹理
    fn paint(
        &mut self,
        target: TextureHandle,
        positions: &[Vec2],
        colors: &[Vec4],
        group_count: [u32; 3],
        group_size: [u32; 3],
    ) -> RenderResult<()> {
        let texture = self
            .textures
            .get_mut(&target)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{target:?}")))?;
        let size = texture.size;

        Self::for_each_invocation(group_count, group_size, |[x, y, _]| {
            if x >= size.width || y >= size.height {
                return;
            }
            let uv = texel_uv(x, y, size);
            texture.texels[(y * size.width + x) as usize] = texel_color(uv, positions, colors);
        });
        Ok(())
    }

    fn run_voronoi(
        &mut self,
        handle: KernelHandle,
        group_count: [u32; 3],
    ) -> RenderResult<()> {
        let resolved = self.bindings.resolve(handle)?;
        let target = Self::bound_texture(&resolved, property::VORONOI_TEXTURE)?;
        let position_buffer = Self::bound_buffer(&resolved, property::SEED_BUFFER)?;
        let color_buffer = Self::bound_buffer(&resolved, property::SEED_COLORS)?;

        let seed_count = self.params(handle.program).u32_at(0) as usize;
        let positions: Vec<Vec2> = bytemuck::pod_collect_to_vec::<u8, [f32; 2]>(
            &self.buffer(position_buffer)?.data,
        )
        .into_iter()
        .take(seed_count)
        .map(Vec2::from_array)
        .collect();
        let colors: Vec<Vec4> =
            bytemuck::pod_collect_to_vec::<u8, [f32; 4]>(&self.buffer(color_buffer)?.data)
                .into_iter()
                .take(seed_count)
                .map(Vec4::from_array)
                .collect();

        self.paint(
            target,
            &positions,
            &colors,
            group_count,
            handle.info().workgroup_size,
        )
    }

    fn run_update_seeds(
        &mut self,
        handle: KernelHandle,
        group_count: [u32; 3],
    ) -> RenderResult<()> {
        let resolved = self.bindings.resolve(handle)?;
        let seed_buffer = Self::bound_buffer(&resolved, property::SEED_BUFFER)?;

        let params = self.params(handle.program);
        let delta_time = params.f32_at(0);
        let seed_count = params.u32_at(4) as usize;
        let policy = BoundaryPolicy::from_u32(params.u32_at(8)).unwrap_or_default();

        let buffer = self
            .buffers
            .get_mut(&seed_buffer)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{seed_buffer:?}")))?;
        let mut seeds: Vec<GpuSeed> = bytemuck::pod_collect_to_vec(&buffer.data);
        let limit = seed_count.min(seeds.len());

        Self::for_each_invocation(group_count, handle.info().workgroup_size, |[x, y, z]| {
            let index = x as usize;
            if index >= limit || y != 0 || z != 0 {
                return;
            }
            let seed = &mut seeds[index];
            let (position, velocity) = advance_position(
                Vec2::from_array(seed.position),
                Vec2::from_array(seed.velocity),
                delta_time,
                policy,
            );
            seed.position = position.to_array();
            seed.velocity = velocity.to_array();
        });

        buffer.data = bytemuck::cast_slice::<GpuSeed, u8>(&seeds).to_vec();
        Ok(())
    }

    fn run_moving_voronoi(
        &mut self,
        handle: KernelHandle,
        group_count: [u32; 3],
    ) -> RenderResult<()> {
        let resolved = self.bindings.resolve(handle)?;
        let target = Self::bound_texture(&resolved, property::TEXTURE)?;
        let seed_buffer = Self::bound_buffer(&resolved, property::SEED_BUFFER)?;

        let seed_count = self.params(handle.program).u32_at(4) as usize;
        let seeds: Vec<GpuSeed> = self.read_seeds(seed_buffer)?;
        let (positions, colors): (Vec<Vec2>, Vec<Vec4>) = seeds
            .iter()
            .take(seed_count)
            .map(|seed| (Vec2::from_array(seed.position), Vec4::from_array(seed.color)))
            .unzip();

        self.paint(
            target,
            &positions,
            &colors,
            group_count,
            handle.info().workgroup_size,
        )
    }
}

impl ComputeBackend for SoftwareBackend {
    fn create_storage_texture(
        &mut self,
        desc: &StorageTextureDescriptor,
    ) -> RenderResult<TextureHandle> {
        let texture = TextureHandle(self.ids.next());
        self.textures.insert(
            texture,
            SoftTexture {
                size: desc.size,
                texels: vec![Vec4::ZERO; desc.size.texel_count()],
            },
        );
        self.events.push(BackendEvent::TextureCreated {
            texture,
            size: desc.size,
        });
        Ok(texture)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) -> RenderResult<()> {
        self.textures
            .remove(&texture)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{texture:?}")))?;
        self.events.push(BackendEvent::TextureDestroyed(texture));
        Ok(())
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> RenderResult<BufferHandle> {
        let buffer = BufferHandle(self.ids.next());
        self.buffers.insert(
            buffer,
            SoftBuffer {
                desc: desc.clone(),
                data: vec![0; desc.byte_size() as usize],
            },
        );
        self.events.push(BackendEvent::BufferCreated {
            buffer,
            element_count: desc.element_count,
            stride: desc.stride,
        });
        Ok(buffer)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> RenderResult<()> {
        let target = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{buffer:?}")))?;
        let expected = target.desc.byte_size();
        if data.len() as u64 != expected {
            return Err(RenderError::BufferSizeMismatch {
                expected,
                actual: data.len() as u64,
            });
        }
        target.data.copy_from_slice(data);
        self.events.push(BackendEvent::BufferWritten {
            buffer,
            bytes: data.len(),
        });
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> RenderResult<()> {
        self.buffers
            .remove(&buffer)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{buffer:?}")))?;
        self.events.push(BackendEvent::BufferDestroyed(buffer));
        Ok(())
    }

    fn find_kernel(
        &mut self,
        program: ComputeProgram,
        entry_point: &str,
    ) -> RenderResult<KernelHandle> {
        program
            .find_kernel(entry_point)
            .map(|(index, _)| KernelHandle { program, index })
            .ok_or_else(|| RenderError::KernelNotFound {
                program: program.name(),
                entry_point: entry_point.to_string(),
            })
    }

    fn kernel_thread_group_size(&self, kernel: KernelHandle) -> [u32; 3] {
        kernel.info().workgroup_size
    }

    fn set_texture(
        &mut self,
        kernel: KernelHandle,
        name: &str,
        texture: TextureHandle,
    ) -> RenderResult<()> {
        self.texture(texture)?;
        self.bindings
            .bind(kernel, name, ResourceBinding::Texture(texture))?;
        Ok(())
    }

    fn set_buffer(
        &mut self,
        kernel: KernelHandle,
        name: &str,
        buffer: BufferHandle,
    ) -> RenderResult<()> {
        let stride = self.buffer(buffer)?.desc.stride;
        let slot = BindingTable::slot(kernel, name, ResourceBinding::Buffer(buffer))?;
        if slot.stride != stride {
            return Err(RenderError::BufferSizeMismatch {
                expected: slot.stride,
                actual: stride,
            });
        }
        self.bindings
            .bind(kernel, name, ResourceBinding::Buffer(buffer))?;
        Ok(())
    }

    fn set_float(&mut self, program: ComputeProgram, name: &str, value: f32) -> RenderResult<()> {
        self.set_param(program, name, ParamKind::F32, |block, offset| {
            block.set_f32(offset, value)
        })
    }

    fn set_uint(&mut self, program: ComputeProgram, name: &str, value: u32) -> RenderResult<()> {
        self.set_param(program, name, ParamKind::U32, |block, offset| {
            block.set_u32(offset, value)
        })
    }

    fn dispatch(&mut self, handle: KernelHandle, group_count: [u32; 3]) -> RenderResult<()> {
        match handle.entry_point() {
            kernel::VORONOI => self.run_voronoi(handle, group_count)?,
            kernel::UPDATE_SEEDS => self.run_update_seeds(handle, group_count)?,
            kernel::MOVING_VORONOI => self.run_moving_voronoi(handle, group_count)?,
            other => {
                return Err(RenderError::KernelNotFound {
                    program: handle.program.name(),
                    entry_point: other.to_string(),
                })
            }
        }
        self.events.push(BackendEvent::Dispatched {
            kernel: handle.entry_point(),
            group_count,
        });
        Ok(())
    }

    fn draw_texture(&mut self, rect: ScreenRect, texture: TextureHandle) -> RenderResult<()> {
        self.texture(texture)?;
        self.pending_draws.push((texture, rect));
        self.events.push(BackendEvent::Drawn { texture, rect });
        Ok(())
    }

    fn present(&mut self) -> RenderResult<()> {
        self.last_frame = std::mem::take(&mut self.pending_draws);
        self.frames_presented += 1;
        self.events.push(BackendEvent::Presented);
        Ok(())
    }

    fn name(&self) -> &str {
        "software"
    }
}
