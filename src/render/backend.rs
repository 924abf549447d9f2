//! 计算后端抽象
//!
//! 提供计算后端 trait 定义，渲染器只通过它分配资源、绑定和派发。
//!
//! ## 设计目标
//!
//! - 按名称绑定资源和参数（名称见 [`property`](super::program::property)）
//! - wgpu 与软件实现共用同一套绑定校验（[`BindingTable`]）
//! - 渲染器与宿主运行时解耦，便于测试

use std::collections::HashMap;

use crate::config::TextureSize;
use crate::core::error::{RenderError, RenderResult};

use super::program::{ComputeProgram, KernelHandle, ResourceKind, ResourceSlot};

/// 目标纹理格式（浮点 RGBA，支持存储写入）
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// 抽象纹理句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// 抽象缓冲区句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// 存储纹理描述符
#[derive(Debug, Clone)]
pub struct StorageTextureDescriptor {
    /// 标签
    pub label: Option<String>,
    /// 尺寸
    pub size: TextureSize,
}

/// 结构化缓冲区描述符
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    /// 标签
    pub label: Option<String>,
    /// 元素数量（可以为 0）
    pub element_count: u32,
    /// 元素步长（字节）
    pub stride: u64,
}

impl BufferDescriptor {
    pub fn new(label: &str, element_count: u32, stride: u64) -> Self {
        Self {
            label: Some(label.to_string()),
            element_count,
            stride,
        }
    }

    /// 逻辑字节大小
    pub fn byte_size(&self) -> u64 {
        self.element_count as u64 * self.stride
    }
}

/// 屏幕矩形（像素，原点在左上角）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    /// 位于原点、与纹理等大的矩形（不缩放）
    pub fn at_origin(size: TextureSize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: size.width as f32,
            height: size.height as f32,
        }
    }
}

/// 已绑定到内核槽位的资源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceBinding {
    Texture(TextureHandle),
    Buffer(BufferHandle),
}

/// 计算后端 Trait
///
/// 语义与常见引擎的 compute shader 接口一致：
/// 先 `find_kernel`，再按名称 `set_texture` / `set_buffer` / `set_float`，
/// 最后 `dispatch`。派发按调用顺序提交到同一队列。
///
/// # 示例
///
/// ```ignore
/// let kernel = backend.find_kernel(ComputeProgram::Voronoi, kernel::VORONOI)?;
/// let [gx, gy, gz] = backend.kernel_thread_group_size(kernel);
/// backend.set_texture(kernel, property::VORONOI_TEXTURE, texture)?;
/// backend.dispatch(kernel, [w.div_ceil(gx), h.div_ceil(gy), gz])?;
/// ```
pub trait ComputeBackend {
    /// 创建可随机写入的浮点纹理
    fn create_storage_texture(
        &mut self,
        desc: &StorageTextureDescriptor,
    ) -> RenderResult<TextureHandle>;

    /// 销毁纹理
    fn destroy_texture(&mut self, texture: TextureHandle) -> RenderResult<()>;

    /// 创建结构化缓冲区
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> RenderResult<BufferHandle>;

    /// 写入整个缓冲区（长度必须与描述符一致）
    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> RenderResult<()>;

    /// 销毁缓冲区
    fn destroy_buffer(&mut self, buffer: BufferHandle) -> RenderResult<()>;

    /// 查找内核入口点
    fn find_kernel(
        &mut self,
        program: ComputeProgram,
        entry_point: &str,
    ) -> RenderResult<KernelHandle>;

    /// 查询内核的线程组大小
    fn kernel_thread_group_size(&self, kernel: KernelHandle) -> [u32; 3];

    /// 按名称绑定纹理
    fn set_texture(
        &mut self,
        kernel: KernelHandle,
        name: &str,
        texture: TextureHandle,
    ) -> RenderResult<()>;

    /// 按名称绑定缓冲区
    fn set_buffer(
        &mut self,
        kernel: KernelHandle,
        name: &str,
        buffer: BufferHandle,
    ) -> RenderResult<()>;

    /// 设置程序级 f32 参数
    fn set_float(&mut self, program: ComputeProgram, name: &str, value: f32)
        -> RenderResult<()>;

    /// 设置程序级 u32 参数
    fn set_uint(&mut self, program: ComputeProgram, name: &str, value: u32) -> RenderResult<()>;

    /// 派发内核
    fn dispatch(&mut self, kernel: KernelHandle, group_count: [u32; 3]) -> RenderResult<()>;

    /// 把纹理绘制到屏幕矩形（在 `present` 时生效）
    fn draw_texture(&mut self, rect: ScreenRect, texture: TextureHandle) -> RenderResult<()>;

    /// 呈现帧
    fn present(&mut self) -> RenderResult<()>;

    /// 获取后端名称
    fn name(&self) -> &str;
}

/// 按内核记录的名称绑定表
///
/// 负责名称解析、类型检查和"派发前是否全部绑定"的校验，
/// 不关心资源是否仍然存活（由各后端在派发时检查）。
#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: HashMap<KernelHandle, HashMap<&'static str, ResourceBinding>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析槽位并检查资源类型
    pub fn slot(
        kernel: KernelHandle,
        name: &str,
        binding: ResourceBinding,
    ) -> RenderResult<&'static ResourceSlot> {
        let info = kernel.info();
        let slot = info
            .resource(name)
            .ok_or_else(|| RenderError::UnknownBinding {
                kernel: info.entry_point,
                name: name.to_string(),
            })?;

        let compatible = match binding {
            ResourceBinding::Texture(_) => slot.kind == ResourceKind::StorageTexture,
            ResourceBinding::Buffer(_) => slot.kind.is_buffer(),
        };
        if !compatible {
            return Err(RenderError::InvalidState(format!(
                "{binding:?} cannot be bound to {:?} slot '{}' of kernel '{}'",
                slot.kind, slot.name, info.entry_point
            )));
        }
        Ok(slot)
    }

    /// 绑定资源
    pub fn bind(
        &mut self,
        kernel: KernelHandle,
        name: &str,
        binding: ResourceBinding,
    ) -> RenderResult<&'static ResourceSlot> {
        let slot = Self::slot(kernel, name, binding)?;
        self.bindings
            .entry(kernel)
            .or_default()
            .insert(slot.name, binding);
        Ok(slot)
    }

    /// 返回内核全部槽位的绑定；有未绑定槽位时报错
    pub fn resolve(
        &self,
        kernel: KernelHandle,
    ) -> RenderResult<Vec<(&'static ResourceSlot, ResourceBinding)>> {
        let info = kernel.info();
        let bound = self.bindings.get(&kernel);
        info.resources
            .iter()
            .map(|slot| {
                bound
                    .and_then(|map| map.get(slot.name))
                    .map(|binding| (slot, *binding))
                    .ok_or(RenderError::UnboundResource {
                        kernel: info.entry_point,
                        name: slot.name,
                    })
            })
            .collect()
    }
}

/// 生成递增的资源 ID
#[derive(Debug)]
pub(crate) struct HandleAllocator {
    next_id: u64,
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl HandleAllocator {
    pub(crate) fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::program::{kernel, property};

    fn voronoi_kernel() -> KernelHandle {
        KernelHandle {
            program: ComputeProgram::Voronoi,
            index: 0,
        }
    }

    #[test]
    fn test_buffer_descriptor_size() {
        let desc = BufferDescriptor::new("seeds", 10, 32);
        assert_eq!(desc.byte_size(), 320);
        assert_eq!(BufferDescriptor::new("empty", 0, 32).byte_size(), 0);
    }

    #[test]
    fn test_screen_rect_at_origin() {
        let rect = ScreenRect::at_origin(TextureSize::new(640, 480));
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.y, 0.0);
        assert_eq!(rect.width, 640.0);
        assert_eq!(rect.height, 480.0);
    }

    #[test]
    fn test_binding_table_resolve() {
        let kernel = voronoi_kernel();
        let mut table = BindingTable::new();

        table
            .bind(kernel, property::VORONOI_TEXTURE, ResourceBinding::Texture(TextureHandle(1)))
            .unwrap();
        table
            .bind(kernel, property::SEED_BUFFER, ResourceBinding::Buffer(BufferHandle(2)))
            .unwrap();

        let err = table.resolve(kernel).unwrap_err();
        assert_eq!(
            err,
            RenderError::UnboundResource {
                kernel: kernel::VORONOI,
                name: property::SEED_COLORS,
            }
        );

        table
            .bind(kernel, property::SEED_COLORS, ResourceBinding::Buffer(BufferHandle(3)))
            .unwrap();
        let resolved = table.resolve(kernel).unwrap();
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[2].1, ResourceBinding::Buffer(BufferHandle(3)));
    }

    #[test]
    fn test_binding_table_rejects_unknown_and_mismatched() {
        let kernel = voronoi_kernel();
        let mut table = BindingTable::new();

        assert!(matches!(
            table.bind(kernel, "DeltaTime", ResourceBinding::Buffer(BufferHandle(1))),
            Err(RenderError::UnknownBinding { .. })
        ));
        assert!(matches!(
            table.bind(kernel, property::SEED_BUFFER, ResourceBinding::Texture(TextureHandle(1))),
            Err(RenderError::InvalidState(_))
        ));
    }

    #[test]
    fn test_handle_allocator() {
        let mut ids = HandleAllocator::default();
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
    }
}
