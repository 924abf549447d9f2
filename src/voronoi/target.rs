use crate::config::TextureSize;
use crate::core::error::RenderResult;
use crate::render::backend::{ComputeBackend, StorageTextureDescriptor, TextureHandle};

/// 渲染器持有的目标纹理
///
/// 释放后句柄被清空，重复释放不会再次调用后端。
#[derive(Debug)]
pub struct RenderTarget {
    /// 纹理句柄（释放后为 None）
    texture: Option<TextureHandle>,
    /// 尺寸
    size: TextureSize,
}

impl RenderTarget {
    /// 创建新的目标纹理
    pub fn create(
        backend: &mut dyn ComputeBackend,
        size: TextureSize,
        label: &str,
    ) -> RenderResult<Self> {
        let texture = backend.create_storage_texture(&StorageTextureDescriptor {
            label: Some(label.to_string()),
            size,
        })?;
        Ok(Self {
            texture: Some(texture),
            size,
        })
    }

    /// 纹理句柄
    pub fn handle(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn size(&self) -> TextureSize {
        self.size
    }

    pub fn is_released(&self) -> bool {
        self.texture.is_none()
    }

    /// 销毁纹理；已释放时什么也不做
    pub fn release(&mut self, backend: &mut dyn ComputeBackend) -> RenderResult<()> {
        match self.texture.take() {
            Some(texture) => backend.destroy_texture(texture),
            None => Ok(()),
        }
    }
}
