//! 计算后端与计算程序
//!
//! - `backend` - 计算后端 trait、资源句柄与描述符
//! - `program` - 计算程序描述表与 WGSL 源码
//! - `dispatch` - 派发网格计算
//! - `software` - CPU 后端（测试与无 GPU 环境）
//! - `wgpu_backend` - wgpu 后端

pub mod backend;
pub mod dispatch;
pub mod program;
pub mod software;
pub mod wgpu_backend;

pub use backend::{
    BufferDescriptor, BufferHandle, ComputeBackend, ScreenRect, StorageTextureDescriptor,
    TextureHandle, TARGET_FORMAT,
};
pub use program::{ComputeProgram, GpuSeed, KernelHandle};
pub use software::{BackendEvent, SoftwareBackend};
pub use wgpu_backend::WgpuComputeBackend;
