//! wgpu 计算后端
//!
//! - 每个计算程序编译一次着色器模块，内核管线在 `find_kernel` 时按需创建
//! - 每个内核使用显式 bind group 布局（来自程序描述表），binding 0 固定为参数 uniform
//! - 每次 `dispatch` 写入参数并单独提交一个命令缓冲区，队列顺序即执行顺序
//! - `draw_texture` 只记录绘制请求，`present` 时统一编码到一个渲染通道

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::config::{TextureSize, WindowConfig};
use crate::core::error::{RenderError, RenderResult};

use super::backend::{
    BindingTable, BufferDescriptor, BufferHandle, ComputeBackend, HandleAllocator,
    ResourceBinding, ScreenRect, StorageTextureDescriptor, TextureHandle, TARGET_FORMAT,
};
use super::program::{
    ComputeProgram, KernelHandle, KernelInfo, ParamBlock, ParamKind, ResourceKind,
    PARAMS_BINDING, PARAMS_SIZE,
};

/// Rgba32Float 每个纹素的字节数
const TEXEL_BYTES: u32 = 16;

/// 纹理绘制着色器：全屏三角形 + 按像素读取存储纹理
const BLIT_SHADER: &str = r#"
struct Rect {
    origin: vec2<f32>,
    size: vec2<f32>,
};

@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var<uniform> rect: Rect;

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    return vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
}

@fragment
fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let local = position.xy - rect.origin;
    if (any(local < vec2<f32>(0.0)) || any(local >= rect.size)) {
        discard;
    }
    let dims = vec2<f32>(textureDimensions(source));
    let texel = vec2<i32>(local * dims / rect.size);
    return textureLoad(source, texel, 0);
}
"#;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct RectUniform {
    origin: [f32; 2],
    size: [f32; 2],
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: TextureSize,
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    desc: BufferDescriptor,
}

struct GpuKernel {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

struct GpuProgram {
    module: wgpu::ShaderModule,
    params: ParamBlock,
    params_buffer: wgpu::Buffer,
    kernels: HashMap<usize, GpuKernel>,
}

struct BlitPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

struct SurfaceTarget {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

/// wgpu 计算后端
pub struct WgpuComputeBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: Option<SurfaceTarget>,
    ids: HandleAllocator,
    textures: HashMap<TextureHandle, GpuTexture>,
    buffers: HashMap<BufferHandle, GpuBuffer>,
    programs: HashMap<ComputeProgram, GpuProgram>,
    bindings: BindingTable,
    blit: Option<BlitPipeline>,
    pending_draws: Vec<(TextureHandle, ScreenRect)>,
}

impl WgpuComputeBackend {
    /// 创建绑定到窗口表面的后端
    pub async fn new(window: Arc<Window>, window_config: &WindowConfig) -> RenderResult<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::SurfaceCreation(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        let (device, queue) = Self::request_device(&adapter).await?;

        let mut config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .ok_or_else(|| {
                RenderError::SurfaceCreation("surface is not supported by the adapter".into())
            })?;
        config.present_mode = window_config.present_mode();
        surface.configure(&device, &config);

        tracing::info!(
            target: "render",
            adapter = %adapter.get_info().name,
            format = ?config.format,
            width = config.width,
            height = config.height,
            "wgpu compute backend ready"
        );

        Ok(Self::from_parts(
            device,
            queue,
            Some(SurfaceTarget { surface, config }),
        ))
    }

    /// 创建无窗口后端（只计算，`present` 不输出）
    pub async fn headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok_or(RenderError::NoAdapter)?;
        let (device, queue) = Self::request_device(&adapter).await?;

        tracing::info!(
            target: "render",
            adapter = %adapter.get_info().name,
            "headless wgpu compute backend ready"
        );
        Ok(Self::from_parts(device, queue, None))
    }

    async fn request_device(adapter: &wgpu::Adapter) -> RenderResult<(wgpu::Device, wgpu::Queue)> {
        adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("voronoi compute device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::DeviceRequest(e.to_string()))
    }

    fn from_parts(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: Option<SurfaceTarget>,
    ) -> Self {
        Self {
            device,
            queue,
            surface,
            ids: HandleAllocator::default(),
            textures: HashMap::new(),
            buffers: HashMap::new(),
            programs: HashMap::new(),
            bindings: BindingTable::new(),
            blit: None,
            pending_draws: Vec::new(),
        }
    }

    /// 调整表面大小（0 尺寸忽略）
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(target) = self.surface.as_mut() {
            target.config.width = width;
            target.config.height = height;
            target.surface.configure(&self.device, &target.config);
        }
    }

    /// 把纹理内容读回 CPU（阻塞，行优先 RGBA）
    pub fn read_texture(&self, texture: TextureHandle) -> RenderResult<Vec<[f32; 4]>> {
        let source = self.texture(texture)?;
        let TextureSize { width, height } = source.size;

        let unpadded = width * TEXEL_BYTES;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("voronoi readback"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("voronoi readback"),
            });
        encoder.copy_texture_to_buffer(
            source.texture.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            extent(source.size),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| RenderError::Readback(e.to_string()))?
            .map_err(|e| RenderError::Readback(e.to_string()))?;

        let texels = {
            let data = slice.get_mapped_range();
            data.chunks(padded as usize)
                .flat_map(|row| {
                    bytemuck::pod_collect_to_vec::<u8, [f32; 4]>(&row[..unpadded as usize])
                })
                .collect()
        };
        staging.unmap();
        Ok(texels)
    }

    fn texture(&self, texture: TextureHandle) -> RenderResult<&GpuTexture> {
        self.textures
            .get(&texture)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{texture:?}")))
    }

    fn buffer(&self, buffer: BufferHandle) -> RenderResult<&GpuBuffer> {
        self.buffers
            .get(&buffer)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{buffer:?}")))
    }

    /// 编译程序（每个程序只编译一次）
    fn program(&mut self, program: ComputeProgram) -> &mut GpuProgram {
        let device = &self.device;
        self.programs.entry(program).or_insert_with(|| {
            tracing::debug!(target: "render", %program, "compiling compute program");
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(program.name()),
                source: wgpu::ShaderSource::Wgsl(program.source().into()),
            });
            let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("voronoi params"),
                size: PARAMS_SIZE as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            GpuProgram {
                module,
                params: ParamBlock::new(),
                params_buffer,
                kernels: HashMap::new(),
            }
        })
    }

    fn bind_group_layout(device: &wgpu::Device, info: &KernelInfo) -> wgpu::BindGroupLayout {
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: PARAMS_BINDING,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(PARAMS_SIZE as u64),
            },
            count: None,
        }];
        entries.extend(info.resources.iter().map(|slot| wgpu::BindGroupLayoutEntry {
            binding: slot.binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: match slot.kind {
                ResourceKind::StorageTexture => wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: TARGET_FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                ResourceKind::ReadOnlyBuffer | ResourceKind::ReadWriteBuffer => {
                    wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage {
                            read_only: slot.kind == ResourceKind::ReadOnlyBuffer,
                        },
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(slot.stride),
                    }
                }
            },
            count: None,
        }));

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(info.entry_point),
            entries: &entries,
        })
    }

    fn blit_pipeline(&mut self) -> RenderResult<&BlitPipeline> {
        let format = self
            .surface
            .as_ref()
            .map(|target| target.config.format)
            .ok_or_else(|| RenderError::InvalidState("no surface to draw into".into()))?;
        let device = &self.device;
        Ok(self.blit.get_or_insert_with(|| {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("voronoi blit"),
                source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
            });
            let bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("voronoi blit"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("voronoi blit"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("voronoi blit"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: "vs_main",
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: "fs_main",
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });
            BlitPipeline {
                pipeline,
                bind_group_layout,
            }
        }))
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
        write(&mut self.program(program).params, slot.offset);
        Ok(())
    }
}

fn extent(size: TextureSize) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}

impl ComputeBackend for WgpuComputeBackend {
    fn create_storage_texture(
        &mut self,
        desc: &StorageTextureDescriptor,
    ) -> RenderResult<TextureHandle> {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: desc.label.as_deref(),
            size: extent(desc.size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let handle = TextureHandle(self.ids.next());
        self.textures.insert(
            handle,
            GpuTexture {
                texture,
                view,
                size: desc.size,
            },
        );
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) -> RenderResult<()> {
        let gpu = self
            .textures
            .remove(&texture)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{texture:?}")))?;
        gpu.texture.destroy();
        Ok(())
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> RenderResult<BufferHandle> {
        // 空缓冲区也至少分配一个元素，绑定要求非空
        let size = desc.byte_size().max(desc.stride).max(4);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: desc.label.as_deref(),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let handle = BufferHandle(self.ids.next());
        self.buffers.insert(
            handle,
            GpuBuffer {
                buffer,
                desc: desc.clone(),
            },
        );
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> RenderResult<()> {
        let target = self.buffer(buffer)?;
        let expected = target.desc.byte_size();
        if data.len() as u64 != expected {
            return Err(RenderError::BufferSizeMismatch {
                expected,
                actual: data.len() as u64,
            });
        }
        if !data.is_empty() {
            self.queue.write_buffer(&target.buffer, 0, data);
        }
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> RenderResult<()> {
        let gpu = self
            .buffers
            .remove(&buffer)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{buffer:?}")))?;
        gpu.buffer.destroy();
        Ok(())
    }

    fn find_kernel(
        &mut self,
        program: ComputeProgram,
        entry_point: &str,
    ) -> RenderResult<KernelHandle> {
        let (index, info) =
            program
                .find_kernel(entry_point)
                .ok_or_else(|| RenderError::KernelNotFound {
                    program: program.name(),
                    entry_point: entry_point.to_string(),
                })?;

        self.program(program);
        let device = &self.device;
        let Some(gpu_program) = self.programs.get_mut(&program) else {
            return Err(RenderError::InvalidState(format!("program {program} not loaded")));
        };
        if gpu_program.kernels.contains_key(&index) {
            return Ok(KernelHandle { program, index });
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout = Self::bind_group_layout(device, info);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(info.entry_point),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(info.entry_point),
            layout: Some(&layout),
            module: &gpu_program.module,
            entry_point: info.entry_point,
            compilation_options: Default::default(),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            tracing::error!(target: "render", %program, entry_point, %error, "kernel creation failed");
            return Err(RenderError::KernelNotFound {
                program: program.name(),
                entry_point: entry_point.to_string(),
            });
        }

        gpu_program.kernels.insert(
            index,
            GpuKernel {
                pipeline,
                bind_group_layout,
            },
        );
        tracing::debug!(target: "render", %program, entry_point, "kernel pipeline created");
        Ok(KernelHandle { program, index })
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

    fn dispatch(&mut self, kernel: KernelHandle, group_count: [u32; 3]) -> RenderResult<()> {
        let resolved = self.bindings.resolve(kernel)?;
        let gpu_program = self.programs.get(&kernel.program).ok_or_else(|| {
            RenderError::InvalidState(format!("program {} not loaded", kernel.program))
        })?;
        let gpu_kernel = gpu_program.kernels.get(&kernel.index).ok_or_else(|| {
            RenderError::InvalidState(format!("kernel {} not created", kernel.entry_point()))
        })?;

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: PARAMS_BINDING,
            resource: gpu_program.params_buffer.as_entire_binding(),
        }];
        for (slot, binding) in &resolved {
            let resource = match binding {
                ResourceBinding::Texture(texture) => {
                    wgpu::BindingResource::TextureView(&self.texture(*texture)?.view)
                }
                ResourceBinding::Buffer(buffer) => self.buffer(*buffer)?.buffer.as_entire_binding(),
            };
            entries.push(wgpu::BindGroupEntry {
                binding: slot.binding,
                resource,
            });
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.entry_point()),
            layout: &gpu_kernel.bind_group_layout,
            entries: &entries,
        });

        self.queue.write_buffer(
            &gpu_program.params_buffer,
            0,
            gpu_program.params.as_bytes(),
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(kernel.entry_point()),
            });
        if group_count.iter().all(|&count| count > 0) {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.entry_point()),
                timestamp_writes: None,
            });
            pass.set_pipeline(&gpu_kernel.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let [x, y, z] = group_count;
            pass.dispatch_workgroups(x, y, z);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        tracing::trace!(
            target: "render",
            kernel = kernel.entry_point(),
            ?group_count,
            "dispatched"
        );
        Ok(())
    }

    fn draw_texture(&mut self, rect: ScreenRect, texture: TextureHandle) -> RenderResult<()> {
        self.texture(texture)?;
        self.pending_draws.push((texture, rect));
        Ok(())
    }

    fn present(&mut self) -> RenderResult<()> {
        let draws = std::mem::take(&mut self.pending_draws);
        let Some(target) = self.surface.as_ref() else {
            return Ok(());
        };

        let frame = match target.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                tracing::debug!(target: "render", "surface outdated, reconfiguring");
                target.surface.configure(&self.device, &target.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!(target: "render", "surface acquire timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(RenderError::Surface(e.to_string())),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut bind_groups = Vec::with_capacity(draws.len());
        if !draws.is_empty() {
            self.blit_pipeline()?;
        }
        if let Some(blit) = self.blit.as_ref() {
            for (texture, rect) in &draws {
                let source = self.texture(*texture)?;
                let uniform = self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("voronoi blit rect"),
                        contents: bytemuck::bytes_of(&RectUniform {
                            origin: [rect.x, rect.y],
                            size: [rect.width, rect.height],
                        }),
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                bind_groups.push(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("voronoi blit"),
                    layout: &blit.bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&source.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: uniform.as_entire_binding(),
                        },
                    ],
                }));
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("voronoi present"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("voronoi present"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if let Some(blit) = self.blit.as_ref() {
                pass.set_pipeline(&blit.pipeline);
                for bind_group in &bind_groups {
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.draw(0..3, 0..1);
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn name(&self) -> &str {
        "wgpu"
    }
}
