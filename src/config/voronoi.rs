use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 纹理的最大边长（wgpu 默认限制 `max_texture_dimension_2d`）
pub const MAX_TEXTURE_DIMENSION: u32 = 8192;

/// 单轴最大工作组数（wgpu 默认限制 `max_compute_workgroups_per_dimension`）
///
/// 种子更新按每个种子一个工作组派发，因此种子数不能超过该值。
pub const MAX_SEED_COUNT: u32 = 65535;

/// 目标纹理尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureSize {
    /// 宽度
    pub width: u32,
    /// 高度
    pub height: u32,
}

impl_default!(TextureSize {
    width: 512,
    height: 512,
});

impl TextureSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 纹素总数
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn validate(&self, owner: &str) -> ConfigResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{owner}: texture size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_TEXTURE_DIMENSION || self.height > MAX_TEXTURE_DIMENSION {
            return Err(ConfigError::ValidationError(format!(
                "{owner}: texture size {}x{} exceeds {MAX_TEXTURE_DIMENSION}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// 种子越界处理策略
///
/// 数值与 WGSL 中的 `BOUNDARY_*` 常量一一对应。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// 取小数部分，从另一侧重新进入
    #[default]
    Wrap,
    /// 钳制在 [0, 1] 内
    Clamp,
    /// 反射位置并反转对应速度分量
    Bounce,
}

impl BoundaryPolicy {
    /// 传给着色器的编码
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Wrap => 0,
            Self::Clamp => 1,
            Self::Bounce => 2,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Wrap),
            1 => Some(Self::Clamp),
            2 => Some(Self::Bounce),
            _ => None,
        }
    }
}

impl FromStr for BoundaryPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wrap" => Ok(Self::Wrap),
            "clamp" => Ok(Self::Clamp),
            "bounce" => Ok(Self::Bounce),
            other => Err(ConfigError::ParseError(format!(
                "unknown boundary policy '{other}' (expected wrap, clamp or bounce)"
            ))),
        }
    }
}

/// 演示程序运行的渲染器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoMode {
    /// 一次性计算的静态 Voronoi 图
    Static,
    /// 每帧更新的移动 Voronoi 图
    #[default]
    Moving,
}

impl FromStr for DemoMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "moving" => Ok(Self::Moving),
            other => Err(ConfigError::ParseError(format!(
                "unknown demo mode '{other}' (expected static or moving)"
            ))),
        }
    }
}

impl fmt::Display for DemoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => f.write_str("static"),
            Self::Moving => f.write_str("moving"),
        }
    }
}

/// 静态 Voronoi 渲染器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticVoronoiConfig {
    /// 目标纹理尺寸
    pub texture_size: TextureSize,
    /// 种子数量
    pub num_seeds: u32,
    /// 随机数种子（None = 使用系统熵）
    pub rng_seed: Option<u64>,
}

impl_default!(StaticVoronoiConfig {
    texture_size: TextureSize::default(),
    num_seeds: 10,
    rng_seed: None,
});

impl StaticVoronoiConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.texture_size.validate("static_voronoi")?;
        validate_seed_count("static_voronoi", self.num_seeds)
    }
}

/// 移动 Voronoi 渲染器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovingVoronoiConfig {
    /// 目标纹理尺寸
    pub texture_size: TextureSize,
    /// 种子数量
    pub num_seeds: u32,
    /// 基础移动速度（归一化纹理空间，单位/秒）
    pub base_speed: f32,
    /// 越界策略
    pub boundary: BoundaryPolicy,
    /// 随机数种子（None = 使用系统熵）
    pub rng_seed: Option<u64>,
}

impl_default!(MovingVoronoiConfig {
    texture_size: TextureSize::default(),
    num_seeds: 10,
    base_speed: 0.0005,
    boundary: BoundaryPolicy::Wrap,
    rng_seed: None,
});

impl MovingVoronoiConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.texture_size.validate("moving_voronoi")?;
        validate_seed_count("moving_voronoi", self.num_seeds)?;
        if !self.base_speed.is_finite() || self.base_speed < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "moving_voronoi: base_speed must be finite and non-negative, got {}",
                self.base_speed
            )));
        }
        Ok(())
    }
}

fn validate_seed_count(owner: &str, num_seeds: u32) -> ConfigResult<()> {
    if num_seeds > MAX_SEED_COUNT {
        return Err(ConfigError::ValidationError(format!(
            "{owner}: num_seeds {num_seeds} exceeds {MAX_SEED_COUNT}"
        )));
    }
    Ok(())
}
