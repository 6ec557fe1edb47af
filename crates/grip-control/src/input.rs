//! 输入映射
//!
//! 把多轴控制输入（每个手指分组一个标量）展开为逐关节段的弯曲命令。
//! 除死区外不做任何处理。

use grip_types::{InputConfig, SegmentId};
use tracing::trace;

/// 输入映射器
#[derive(Debug, Clone, PartialEq)]
pub struct InputMapper {
    groups: Vec<Vec<SegmentId>>,
    deadzone: f64,
}

impl InputMapper {
    /// 创建映射器
    ///
    /// `finger_groups` 为空时每个关节段独占一个输入轴。
    /// 越界索引由 `GraspController::new` 在此之前拒绝。
    pub fn new(config: &InputConfig, segment_count: usize) -> Self {
        let groups = if config.finger_groups.is_empty() {
            (0..segment_count).map(|i| vec![SegmentId(i)]).collect()
        } else {
            config
                .finger_groups
                .iter()
                .map(|group| group.iter().copied().map(SegmentId).collect())
                .collect()
        };
        Self {
            groups,
            deadzone: config.deadzone,
        }
    }

    /// 输入轴数
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> &[Vec<SegmentId>] {
        &self.groups
    }

    /// 展开输入
    ///
    /// 多余的输入轴被忽略，缺少的输入轴不产生命令。
    pub fn map(&self, axes: &[f64]) -> Vec<(SegmentId, f64)> {
        if axes.len() > self.groups.len() {
            trace!(
                axes = axes.len(),
                groups = self.groups.len(),
                "extra input axes ignored"
            );
        }
        self.groups
            .iter()
            .zip(axes)
            .flat_map(|(group, &value)| {
                let value = if value.abs() < self.deadzone { 0.0 } else { value };
                group.iter().map(move |segment| (*segment, value))
            })
            .collect()
    }
}
