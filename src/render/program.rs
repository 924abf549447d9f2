//! 计算程序描述表
//!
//! 每个计算程序（WGSL 源码）对应一张静态表，描述：
//! - 入口点名称与工作组大小（与 WGSL 中的 `@workgroup_size` 保持一致）
//! - 按名称绑定的资源槽位（纹理 / 存储缓冲区）及其 binding 编号
//! - 按名称设置的标量参数在 uniform 块中的偏移
//!
//! 后端通过这张表把"按名称绑定"翻译成 wgpu 的 bind group，
//! 软件后端也用它来校验绑定。

use std::fmt;

/// 资源与参数名称常量
pub mod property {
    /// 静态程序的输出纹理
    pub const VORONOI_TEXTURE: &str = "VoronoiTexture";
    /// 种子缓冲区（静态程序：位置；移动程序：完整种子记录）
    pub const SEED_BUFFER: &str = "SeedBuffer";
    /// 静态程序的种子颜色缓冲区
    pub const SEED_COLORS: &str = "SeedColors";
    /// 移动程序的输出纹理
    pub const TEXTURE: &str = "Texture";
    /// 帧间隔（秒）
    pub const DELTA_TIME: &str = "DeltaTime";
    /// 有效种子数量
    pub const SEED_COUNT: &str = "SeedCount";
    /// 越界策略编码
    pub const BOUNDARY: &str = "Boundary";
}

/// 内核入口点名称
pub mod kernel {
    pub const VORONOI: &str = "Voronoi";
    pub const UPDATE_SEEDS: &str = "UpdateSeeds";
    pub const MOVING_VORONOI: &str = "MovingVoronoi";
}

/// 参数 uniform 固定占用 binding 0
pub const PARAMS_BINDING: u32 = 0;

/// 参数 uniform 块大小（字节）
pub const PARAMS_SIZE: usize = 16;

/// 移动种子的 GPU 布局（对应 WGSL `struct Seed`）
///
/// 字段顺序为 position / velocity / color，使 WGSL 的对齐规则不引入填充。
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuSeed {
    /// 位置（归一化纹理空间）
    pub position: [f32; 2],
    /// 速度（单位/秒）
    pub velocity: [f32; 2],
    /// 颜色 RGBA
    pub color: [f32; 4],
}

const _: () = assert!(
    std::mem::size_of::<GpuSeed>() == 32,
    "size of GpuSeed does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(GpuSeed, velocity) == 8,
    "offset of GpuSeed.velocity does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(GpuSeed, color) == 16,
    "offset of GpuSeed.color does not match WGSL"
);

/// 资源槽位类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// 只写存储纹理（`texture_storage_2d<rgba32float, write>`）
    StorageTexture,
    /// 只读存储缓冲区
    ReadOnlyBuffer,
    /// 读写存储缓冲区
    ReadWriteBuffer,
}

impl ResourceKind {
    pub fn is_buffer(self) -> bool {
        !matches!(self, Self::StorageTexture)
    }
}

/// 按名称绑定的资源槽位
#[derive(Debug)]
pub struct ResourceSlot {
    /// 名称
    pub name: &'static str,
    /// WGSL binding 编号
    pub binding: u32,
    /// 类型
    pub kind: ResourceKind,
    /// 缓冲区元素步长（字节），纹理为 0
    pub stride: u64,
}

/// 标量参数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    F32,
    U32,
}

/// 标量参数槽位
#[derive(Debug)]
pub struct ParamSlot {
    pub name: &'static str,
    /// 在 uniform 块中的字节偏移
    pub offset: usize,
    pub kind: ParamKind,
}

/// 内核描述
#[derive(Debug)]
pub struct KernelInfo {
    /// 入口点名称
    pub entry_point: &'static str,
    /// 工作组大小
    pub workgroup_size: [u32; 3],
    /// 使用的资源槽位
    pub resources: &'static [ResourceSlot],
}

impl KernelInfo {
    /// 按名称查找资源槽位
    pub fn resource(&self, name: &str) -> Option<&'static ResourceSlot> {
        self.resources.iter().find(|slot| slot.name == name)
    }
}

/// 计算程序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeProgram {
    /// 静态 Voronoi：一个绘制内核
    Voronoi,
    /// 移动 Voronoi：种子更新 + 绘制
    MovingVoronoi,
}

impl ComputeProgram {
    /// 程序名
    pub fn name(self) -> &'static str {
        match self {
            Self::Voronoi => "Voronoi",
            Self::MovingVoronoi => "MovingVoronoi",
        }
    }

    /// WGSL 源码
    pub fn source(self) -> &'static str {
        match self {
            Self::Voronoi => VORONOI_SHADER,
            Self::MovingVoronoi => MOVING_VORONOI_SHADER,
        }
    }

    /// 全部内核
    pub fn kernels(self) -> &'static [KernelInfo] {
        match self {
            Self::Voronoi => VORONOI_KERNELS,
            Self::MovingVoronoi => MOVING_VORONOI_KERNELS,
        }
    }

    /// 按入口点查找内核，返回其下标与描述
    pub fn find_kernel(self, entry_point: &str) -> Option<(usize, &'static KernelInfo)> {
        self.kernels()
            .iter()
            .enumerate()
            .find(|(_, info)| info.entry_point == entry_point)
    }

    /// 全部标量参数
    pub fn params(self) -> &'static [ParamSlot] {
        match self {
            Self::Voronoi => VORONOI_PARAMS,
            Self::MovingVoronoi => MOVING_VORONOI_PARAMS,
        }
    }

    /// 按名称查找参数
    pub fn param(self, name: &str) -> Option<&'static ParamSlot> {
        self.params().iter().find(|slot| slot.name == name)
    }
}

impl fmt::Display for ComputeProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 内核句柄（程序 + 内核下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelHandle {
    pub program: ComputeProgram,
    pub index: usize,
}

impl KernelHandle {
    /// 内核描述
    pub fn info(&self) -> &'static KernelInfo {
        &self.program.kernels()[self.index]
    }

    pub fn entry_point(&self) -> &'static str {
        self.info().entry_point
    }
}

/// 参数 uniform 块的 CPU 副本
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParamBlock {
    bytes: [u8; PARAMS_SIZE],
}

impl ParamBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_f32(&mut self, offset: usize, value: f32) {
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
    }

    pub fn set_u32(&mut self, offset: usize, value: u32) {
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
    }

    pub fn f32_at(&self, offset: usize) -> f32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[offset..offset + 4]);
        f32::from_ne_bytes(raw)
    }

    pub fn u32_at(&self, offset: usize) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[offset..offset + 4]);
        u32::from_ne_bytes(raw)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

const VORONOI_KERNELS: &[KernelInfo] = &[KernelInfo {
    entry_point: kernel::VORONOI,
    workgroup_size: [8, 8, 1],
    resources: &[
        ResourceSlot {
            name: property::VORONOI_TEXTURE,
            binding: 1,
            kind: ResourceKind::StorageTexture,
            stride: 0,
        },
        ResourceSlot {
            name: property::SEED_BUFFER,
            binding: 2,
            kind: ResourceKind::ReadOnlyBuffer,
            stride: 8,
        },
        ResourceSlot {
            name: property::SEED_COLORS,
            binding: 3,
            kind: ResourceKind::ReadOnlyBuffer,
            stride: 16,
        },
    ],
}];

const VORONOI_PARAMS: &[ParamSlot] = &[ParamSlot {
    name: property::SEED_COUNT,
    offset: 0,
    kind: ParamKind::U32,
}];

const SEED_STRIDE: u64 = std::mem::size_of::<GpuSeed>() as u64;

const MOVING_VORONOI_KERNELS: &[KernelInfo] = &[
    KernelInfo {
        entry_point: kernel::UPDATE_SEEDS,
        workgroup_size: [1, 1, 1],
        resources: &[ResourceSlot {
            name: property::SEED_BUFFER,
            binding: 2,
            kind: ResourceKind::ReadWriteBuffer,
            stride: SEED_STRIDE,
        }],
    },
    KernelInfo {
        entry_point: kernel::MOVING_VORONOI,
        workgroup_size: [8, 8, 1],
        resources: &[
            ResourceSlot {
                name: property::TEXTURE,
                binding: 1,
                kind: ResourceKind::StorageTexture,
                stride: 0,
            },
            ResourceSlot {
                name: property::SEED_BUFFER,
                binding: 2,
                kind: ResourceKind::ReadWriteBuffer,
                stride: SEED_STRIDE,
            },
        ],
    },
];

const MOVING_VORONOI_PARAMS: &[ParamSlot] = &[
    ParamSlot {
        name: property::DELTA_TIME,
        offset: 0,
        kind: ParamKind::F32,
    },
    ParamSlot {
        name: property::SEED_COUNT,
        offset: 4,
        kind: ParamKind::U32,
    },
    ParamSlot {
        name: property::BOUNDARY,
        offset: 8,
        kind: ParamKind::U32,
    },
];

/// 静态 Voronoi 计算着色器
const VORONOI_SHADER: &str = r#"
struct Params {
    seed_count: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var voronoi_texture: texture_storage_2d<rgba32float, write>;
@group(0) @binding(2) var<storage, read> seed_positions: array<vec2<f32>>;
@group(0) @binding(3) var<storage, read> seed_colors: array<vec4<f32>>;

@compute @workgroup_size(8, 8, 1)
fn Voronoi(@builtin(global_invocation_id) id: vec3<u32>) {
    let dims = textureDimensions(voronoi_texture);
    if (id.x >= dims.x || id.y >= dims.y) {
        return;
    }

    let uv = (vec2<f32>(id.xy) + vec2<f32>(0.5, 0.5)) / vec2<f32>(dims);

    // 没有种子时输出透明黑色
    var color = vec4<f32>(0.0, 0.0, 0.0, 0.0);
    var best = 3.4e38;
    for (var i = 0u; i < params.seed_count; i++) {
        let offset = uv - seed_positions[i];
        let dist = dot(offset, offset);
        if (dist < best) {
            best = dist;
            color = seed_colors[i];
        }
    }

    textureStore(voronoi_texture, id.xy, color);
}
"#;

/// 移动 Voronoi 计算着色器（种子更新 + 绘制）
const MOVING_VORONOI_SHADER: &str = r#"
struct Params {
    delta_time: f32,
    seed_count: u32,
    boundary: u32,
    _pad: u32,
};

struct Seed {
    position: vec2<f32>,
    velocity: vec2<f32>,
    color: vec4<f32>,
};

const BOUNDARY_WRAP: u32 = 0u;
const BOUNDARY_CLAMP: u32 = 1u;
const BOUNDARY_BOUNCE: u32 = 2u;

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var output_texture: texture_storage_2d<rgba32float, write>;
@group(0) @binding(2) var<storage, read_write> seeds: array<Seed>;

// 单轴反射：返回 (位置, 速度)
fn bounce_axis(position: f32, velocity: f32) -> vec2<f32> {
    var p = position;
    var v = velocity;
    if (p < 0.0) {
        p = -p;
        v = abs(v);
    } else if (p > 1.0) {
        p = 2.0 - p;
        v = -abs(v);
    }
    return vec2<f32>(clamp(p, 0.0, 1.0), v);
}

@compute @workgroup_size(1, 1, 1)
fn UpdateSeeds(@builtin(global_invocation_id) id: vec3<u32>) {
    let index = id.x;
    if (index >= params.seed_count || id.y != 0u || id.z != 0u) {
        return;
    }

    let seed = seeds[index];
    var position = seed.position + seed.velocity * params.delta_time;
    var velocity = seed.velocity;

    switch params.boundary {
        case BOUNDARY_CLAMP: {
            position = clamp(position, vec2<f32>(0.0, 0.0), vec2<f32>(1.0, 1.0));
        }
        case BOUNDARY_BOUNCE: {
            let x = bounce_axis(position.x, velocity.x);
            let y = bounce_axis(position.y, velocity.y);
            position = vec2<f32>(x.x, y.x);
            velocity = vec2<f32>(x.y, y.y);
        }
        default: {
            position = position - floor(position);
        }
    }

    seeds[index].position = position;
    seeds[index].velocity = velocity;
}

@compute @workgroup_size(8, 8, 1)
fn MovingVoronoi(@builtin(global_invocation_id) id: vec3<u32>) {
    let dims = textureDimensions(output_texture);
    if (id.x >= dims.x || id.y >= dims.y) {
        return;
    }

    let uv = (vec2<f32>(id.xy) + vec2<f32>(0.5, 0.5)) / vec2<f32>(dims);

    var color = vec4<f32>(0.0, 0.0, 0.0, 0.0);
    var best = 3.4e38;
    for (var i = 0u; i < params.seed_count; i++) {
        let offset = uv - seeds[i].position;
        let dist = dot(offset, offset);
        if (dist < best) {
            best = dist;
            color = seeds[i].color;
        }
    }

    textureStore(output_texture, id.xy, color);
}
"#;
