//! 种子数据与随机生成
//!
//! 所有生成函数都接收显式传入的随机数生成器，固定种子即可复现同一张图。

use glam::{Vec2, Vec4};
use rand::Rng;
use std::f32::consts::TAU;

use crate::config::BoundaryPolicy;
use crate::render::program::GpuSeed;

/// 移动种子
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed {
    /// 位置（[0,1]²）
    pub position: Vec2,
    /// 颜色 RGBA
    pub color: Vec4,
    /// 速度（单位/秒）
    pub velocity: Vec2,
}

impl Seed {
    /// 转换为 GPU 布局
    pub fn to_gpu(&self) -> GpuSeed {
        GpuSeed {
            position: self.position.to_array(),
            velocity: self.velocity.to_array(),
            color: self.color.to_array(),
        }
    }
}

impl From<GpuSeed> for Seed {
    fn from(seed: GpuSeed) -> Self {
        Self {
            position: Vec2::from_array(seed.position),
            color: Vec4::from_array(seed.color),
            velocity: Vec2::from_array(seed.velocity),
        }
    }
}

/// 静态种子：位置与颜色两个平行数组
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticSeeds {
    pub positions: Vec<Vec2>,
    pub colors: Vec<Vec4>,
}

impl StaticSeeds {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// 随机色相、饱和度和明度的不透明颜色
pub fn random_color_hsv<R: Rng + ?Sized>(rng: &mut R) -> Vec4 {
    let hue = rng.gen::<f32>();
    let saturation = rng.gen::<f32>();
    let value = rng.gen::<f32>();
    hsv_to_rgb(hue, saturation, value).extend(1.0)
}

/// HSV（各分量 [0,1]）转 RGB
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> glam::Vec3 {
    let h = (hue - hue.floor()) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));

    let (r, g, b) = match sector as u32 {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };
    glam::Vec3::new(r, g, b)
}

/// 单位圆上均匀分布的方向
pub fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    Vec2::from_angle(rng.gen_range(0.0..TAU))
}

/// 生成静态种子
pub fn generate_static_seeds<R: Rng + ?Sized>(rng: &mut R, count: u32) -> StaticSeeds {
    let mut seeds = StaticSeeds {
        positions: Vec::with_capacity(count as usize),
        colors: Vec::with_capacity(count as usize),
    };
    for _ in 0..count {
        seeds.positions.push(Vec2::new(rng.gen(), rng.gen()));
        seeds.colors.push(random_color_hsv(rng));
    }
    seeds
}

/// 生成移动种子，速度大小固定为 `base_speed`
pub fn generate_moving_seeds<R: Rng + ?Sized>(
    rng: &mut R,
    count: u32,
    base_speed: f32,
) -> Vec<Seed> {
    (0..count)
        .map(|_| Seed {
            position: Vec2::new(rng.gen(), rng.gen()),
            color: random_color_hsv(rng),
            velocity: random_direction(rng) * base_speed,
        })
        .collect()
}

/// 推进一步种子位置并应用越界策略，返回 (位置, 速度)
///
/// 与 `MovingVoronoi` 程序中的 `UpdateSeeds` 内核逐分量一致。
pub fn advance_position(
    position: Vec2,
    velocity: Vec2,
    delta_time: f32,
    policy: BoundaryPolicy,
) -> (Vec2, Vec2) {
    let moved = position + velocity * delta_time;
    match policy {
        BoundaryPolicy::Wrap => (moved - moved.floor(), velocity),
        BoundaryPolicy::Clamp => (moved.clamp(Vec2::ZERO, Vec2::ONE), velocity),
        BoundaryPolicy::Bounce => {
            let (px, vx) = bounce_axis(moved.x, velocity.x);
            let (py, vy) = bounce_axis(moved.y, velocity.y);
            (Vec2::new(px, py), Vec2::new(vx, vy))
        }
    }
}

fn bounce_axis(position: f32, velocity: f32) -> (f32, f32) {
    let (p, v) = if position < 0.0 {
        (-position, velocity.abs())
    } else if position > 1.0 {
        (2.0 - position, -velocity.abs())
    } else {
        (position, velocity)
    };
    (p.clamp(0.0, 1.0), v)
}
