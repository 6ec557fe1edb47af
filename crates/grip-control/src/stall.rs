//! 堵转检测
//!
//! 每个关节段独立的去抖分类器：
//!
//! - 跟踪误差 `|drive_target - current| > error_threshold` 且
//!   帧间移动 `|current - previous| < move_threshold` 计为一帧堵转
//! - 连续 `frames` 帧后判定为堵转，并把驱动目标快照到当前角度
//! - 任意一帧不满足条件立即恢复（恢复无去抖）
//!
//! 抓取保持期间（存在冻结角）整段跳过。

use crate::segment::Segment;
use grip_types::{Deg, DriveConfig, StallConfig};
use tracing::debug;

/// 堵转状态变化
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StallTransition {
    /// 本帧判定为堵转
    Stalled {
        /// 堵转时的角度（驱动目标快照）
        angle: Deg,
    },
    /// 本帧从堵转恢复
    Recovered,
}

/// 堵转检测器
#[derive(Debug, Clone, Copy)]
pub struct StallDetector {
    error_threshold: Deg,
    move_threshold: Deg,
    frames: u32,
    min_curl: Deg,
}

impl StallDetector {
    /// 从配置创建
    pub fn new(stall: &StallConfig, drive: &DriveConfig) -> Self {
        Self {
            error_threshold: stall.error_threshold(),
            move_threshold: stall.move_threshold(),
            frames: stall.frames,
            min_curl: drive.min_curl_angle(),
        }
    }

    /// 判定堵转所需的连续帧数
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// 本帧是否满足堵转条件
    pub fn is_obstructed(&self, segment: &Segment) -> bool {
        let error = segment.drive_target().distance(segment.current_angle());
        let movement = segment.current_angle().distance(segment.previous_angle());
        error > self.error_threshold && movement < self.move_threshold
    }

    /// 更新一个关节段的堵转状态
    ///
    /// 需在 `Segment::observe` 之后、驱动更新之前调用。
    ///
    /// # 返回
    ///
    /// 状态发生变化时返回对应的 `StallTransition`
    pub fn update(&self, segment: &mut Segment) -> Option<StallTransition> {
        if segment.frozen_angle().is_some() {
            return None;
        }

        if self.is_obstructed(segment) {
            segment.stall_counter = segment.stall_counter.saturating_add(1);
            if segment.stall_counter >= self.frames && !segment.stalled {
                let angle = segment.current_angle();
                segment.stalled = true;
                segment.drive_target = angle;
                // 弯曲目标一并停在堵转处，否则下一帧误差归零后又会继续顶向障碍
                segment.target_curl = angle.clamp(self.min_curl, Deg::ZERO);
                debug!(
                    segment = %segment.id(),
                    angle = %angle,
                    counter = segment.stall_counter,
                    "segment stalled"
                );
                return Some(StallTransition::Stalled { angle });
            }
            None
        } else {
            segment.stall_counter = 0;
            if segment.stalled {
                segment.stalled = false;
                debug!(segment = %segment.id(), "segment recovered from stall");
                return Some(StallTransition::Recovered);
            }
            None
        }
    }
}
