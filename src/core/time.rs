use std::time::Instant;

/// 单帧最大间隔（秒），避免窗口拖动或断点后种子瞬移
pub const MAX_DELTA_SECONDS: f32 = 1.0 / 3.0;

/// 帧时间
#[derive(Debug, Clone, Copy)]
pub struct FrameTime {
    pub delta_seconds: f32,
    pub elapsed_seconds: f64,
    pub frame_count: u64,
    last: Instant,
}

impl Default for FrameTime {
    fn default() -> Self {
        Self {
            delta_seconds: 0.0,
            elapsed_seconds: 0.0,
            frame_count: 0,
            last: Instant::now(),
        }
    }
}

impl FrameTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按墙钟推进一帧，返回本帧间隔
    pub fn advance(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        self.advance_by(delta)
    }

    /// 按给定间隔推进一帧（负值和非有限值视为 0，超过上限时截断）
    pub fn advance_by(&mut self, delta_seconds: f32) -> f32 {
        let delta = if delta_seconds.is_finite() {
            delta_seconds.clamp(0.0, MAX_DELTA_SECONDS)
        } else {
            0.0
        };
        self.delta_seconds = delta;
        self.elapsed_seconds += delta as f64;
        self.frame_count += 1;
        delta
    }
}
