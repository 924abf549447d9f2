//! 最近种子着色
//!
//! CPU 版本的 Voronoi 着色，供软件后端执行内核时使用。

use glam::{Vec2, Vec4};

use crate::config::TextureSize;

/// 纹素中心在归一化纹理空间中的坐标
pub fn texel_uv(x: u32, y: u32, size: TextureSize) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / size.width as f32,
        (y as f32 + 0.5) / size.height as f32,
    )
}

/// 距离 `uv` 最近的种子下标；距离相同时取下标较小者
pub fn nearest_seed<I>(uv: Vec2, positions: I) -> Option<usize>
where
    I: IntoIterator<Item = Vec2>,
{
    let mut best: Option<(usize, f32)> = None;
    for (index, position) in positions.into_iter().enumerate() {
        let dist = uv.distance_squared(position);
        if best.map_or(true, |(_, best_dist)| dist < best_dist) {
            best = Some((index, dist));
        }
    }
    best.map(|(index, _)| index)
}

/// 纹素颜色：最近种子的颜色，没有种子时为透明黑色
pub fn texel_color(uv: Vec2, positions: &[Vec2], colors: &[Vec4]) -> Vec4 {
    let count = positions.len().min(colors.len());
    nearest_seed(uv, positions[..count].iter().copied())
        .map(|index| colors[index])
        .unwrap_or(Vec4::ZERO)
}
