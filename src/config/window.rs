use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 窗口配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// 窗口标题
    pub title: String,
    /// 初始宽度（像素）
    pub width: u32,
    /// 初始高度（像素）
    pub height: u32,
    /// 垂直同步
    pub vsync: bool,
}

impl_default!(WindowConfig {
    title: "Voronoi Compute".to_string(),
    width: 512,
    height: 512,
    vsync: true,
});

impl WindowConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ValidationError(
                "Invalid window size".to_string(),
            ));
        }
        Ok(())
    }

    /// 根据垂直同步设置选择呈现模式
    pub fn present_mode(&self) -> wgpu::PresentMode {
        if self.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_validation() {
        assert!(WindowConfig::default().validate().is_ok());

        let config = WindowConfig {
            height: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_present_mode() {
        let mut config = WindowConfig::default();
        assert_eq!(config.present_mode(), wgpu::PresentMode::AutoVsync);
        config.vsync = false;
        assert_eq!(config.present_mode(), wgpu::PresentMode::AutoNoVsync);
    }
}
