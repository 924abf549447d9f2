//! 派发网格计算

use crate::config::TextureSize;

/// 覆盖整张纹理所需的工作组数量
///
/// x/y 向上取整，z 直接使用工作组的 z 大小。
pub fn paint_group_count(size: TextureSize, thread_group_size: [u32; 3]) -> [u32; 3] {
    let [gx, gy, gz] = thread_group_size;
    [
        size.width.div_ceil(gx.max(1)),
        size.height.div_ceil(gy.max(1)),
        gz,
    ]
}

/// 种子更新的工作组数量：每个种子一个工作组
pub fn update_group_count(seed_count: u32, thread_group_size: [u32; 3]) -> [u32; 3] {
    let [_, gy, gz] = thread_group_size;
    [seed_count, gy, gz]
}

/// 网格是否覆盖了全部纹素
pub fn covers(size: TextureSize, thread_group_size: [u32; 3], group_count: [u32; 3]) -> bool {
    group_count[0] as u64 * thread_group_size[0] as u64 >= size.width as u64
        && group_count[1] as u64 * thread_group_size[1] as u64 >= size.height as u64
}
