//! 核心宏定义
//!
//! 提供统一的宏来减少配置类型中的样板代码

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use voronoi_compute::impl_default;
///
/// struct TextureSize {
///     width: u32,
///     height: u32,
/// }
///
/// impl_default!(TextureSize {
///     width: 512,
///     height: 512,
/// });
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}
