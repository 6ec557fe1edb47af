//! 接触计数
//!
//! 为每个候选刚体维护当前接触它的关节段集合。
//! 候选在首次接触时创建，集合变空时移除。

use crate::grabbable::GrabbablePolicy;
use grip_physics::BodyInfo;
use grip_types::{BodyHandle, SegmentId};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// 接触候选（至少有一个关节段正在接触的刚体）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactCandidate {
    touching: SmallVec<[SegmentId; 8]>,
}

impl ContactCandidate {
    /// 正在接触的关节段（按首次接触顺序）
    pub fn touching(&self) -> &[SegmentId] {
        &self.touching
    }

    /// 接触数
    pub fn count(&self) -> usize {
        self.touching.len()
    }

    pub fn contains(&self, segment: SegmentId) -> bool {
        self.touching.contains(&segment)
    }

    fn insert(&mut self, segment: SegmentId) -> bool {
        if self.contains(segment) {
            false
        } else {
            self.touching.push(segment);
            true
        }
    }

    fn remove(&mut self, segment: SegmentId) -> bool {
        match self.touching.iter().position(|s| *s == segment) {
            Some(index) => {
                self.touching.remove(index);
                true
            },
            None => false,
        }
    }
}

/// 接触事件被忽略的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgnoreReason {
    /// 非物理对象（事件不携带刚体）
    NotPhysical,
    /// 刚体已不存在
    UnknownBody,
    /// 不满足可抓取策略
    NotGrabbable,
    /// 从未登记的刚体
    Untracked,
    /// 已确认抓取，结束事件不影响计数
    HeldByGrasp,
}

/// 单个接触事件的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    /// 事件被忽略
    Ignored(IgnoreReason),
    /// 计数已更新，未跨越阈值
    Tracked {
        count: usize,
    },
    /// 接触数达到阈值，且该刚体尚无抓取记录
    ThresholdReached {
        count: usize,
    },
    /// 接触数降到阈值以下
    BelowThreshold {
        count: usize,
    },
}

/// 接触计数器
pub struct ContactTracker {
    candidates: HashMap<BodyHandle, ContactCandidate>,
    required: usize,
    policy: Box<dyn GrabbablePolicy>,
}

impl fmt::Debug for ContactTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContactTracker")
            .field("candidates", &self.candidates)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

impl ContactTracker {
    /// 创建接触计数器
    ///
    /// # 参数
    ///
    /// - `required`: 触发抓取所需的接触关节段数
    /// - `policy`: 可抓取识别策略
    pub fn new(required: usize, policy: impl GrabbablePolicy + 'static) -> Self {
        Self {
            candidates: HashMap::new(),
            required,
            policy: Box::new(policy),
        }
    }

    /// 替换识别策略（已登记的候选不受影响）
    pub fn set_policy(&mut self, policy: impl GrabbablePolicy + 'static) {
        self.policy = Box::new(policy);
    }

    pub fn required(&self) -> usize {
        self.required
    }

    /// 开始接触
    ///
    /// # 参数
    ///
    /// - `info`: 刚体信息；`None` 表示刚体已不存在
    /// - `engaged`: 该刚体是否已有抓取记录（等待或已确认）
    pub fn on_begin(
        &mut self,
        segment: SegmentId,
        body: BodyHandle,
        info: Option<&BodyInfo>,
        engaged: bool,
    ) -> ContactOutcome {
        let count = match self.admit(segment, body, info) {
            Ok(count) => count,
            Err(reason) => return ContactOutcome::Ignored(reason),
        };

        if count >= self.required && !engaged {
            ContactOutcome::ThresholdReached { count }
        } else {
            ContactOutcome::Tracked { count }
        }
    }

    /// 持续接触：幂等地重新登记，补偿丢失的开始事件
    ///
    /// 持续接触不会触发抓取，只有开始事件会。
    pub fn on_persist(
        &mut self,
        segment: SegmentId,
        body: BodyHandle,
        info: Option<&BodyInfo>,
    ) -> ContactOutcome {
        match self.admit(segment, body, info) {
            Ok(count) => ContactOutcome::Tracked { count },
            Err(reason) => ContactOutcome::Ignored(reason),
        }
    }

    /// 结束接触
    ///
    /// # 参数
    ///
    /// - `confirmed`: 该刚体是否已确认抓取；为 `true` 时计数保持不变
    pub fn on_end(&mut self, segment: SegmentId, body: BodyHandle, confirmed: bool) -> ContactOutcome {
        if confirmed {
            return ContactOutcome::Ignored(IgnoreReason::HeldByGrasp);
        }
        let Some(candidate) = self.candidates.get_mut(&body) else {
            return ContactOutcome::Ignored(IgnoreReason::Untracked);
        };

        candidate.remove(segment);
        let count = candidate.count();
        if count == 0 {
            self.candidates.remove(&body);
            trace!(%body, "contact candidate removed");
        }

        if count < self.required {
            ContactOutcome::BelowThreshold { count }
        } else {
            ContactOutcome::Tracked { count }
        }
    }

    /// 接触某个刚体的关节段数
    pub fn count(&self, body: BodyHandle) -> usize {
        self.candidates.get(&body).map_or(0, ContactCandidate::count)
    }

    pub fn candidate(&self, body: BodyHandle) -> Option<&ContactCandidate> {
        self.candidates.get(&body)
    }

    /// 正在跟踪的候选数
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// 移除某个刚体的全部接触记录
    pub fn remove(&mut self, body: BodyHandle) -> Option<ContactCandidate> {
        self.candidates.remove(&body)
    }

    /// 只保留满足条件的候选
    ///
    /// # 返回
    ///
    /// 被移除的刚体
    pub fn retain(&mut self, mut keep: impl FnMut(BodyHandle) -> bool) -> Vec<BodyHandle> {
        let mut removed = Vec::new();
        self.candidates.retain(|body, _| {
            let kept = keep(*body);
            if !kept {
                removed.push(*body);
            }
            kept
        });
        removed
    }

    /// 清空所有候选
    pub fn clear(&mut self) {
        self.candidates.clear();
    }

    fn admit(
        &mut self,
        segment: SegmentId,
        body: BodyHandle,
        info: Option<&BodyInfo>,
    ) -> Result<usize, IgnoreReason> {
        let info = info.ok_or(IgnoreReason::UnknownBody)?;
        if !self.policy.is_grabbable(info) {
            return Err(IgnoreReason::NotGrabbable);
        }

        let candidate = self.candidates.entry(body).or_default();
        if candidate.insert(segment) {
            trace!(%segment, %body, count = candidate.count(), "segment touching candidate");
        }
        Ok(candidate.count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grabbable::TagOrNamePolicy;
    use grip_types::GrabbableConfig;

    const CUBE: BodyHandle = BodyHandle(1);

    fn tracker() -> ContactTracker {
        ContactTracker::new(3, TagOrNamePolicy::new(&GrabbableConfig::default()))
    }

    fn cube() -> BodyInfo {
        BodyInfo::new("cube", Some("Grabbable"))
    }

    #[test]
    fn test_threshold_reached_exactly_at_required() {
        let mut tracker = tracker();
        let info = cube();

        assert_eq!(
            tracker.on_begin(SegmentId(0), CUBE, Some(&info), false),
            ContactOutcome::Tracked { count: 1 }
        );
        assert_eq!(
            tracker.on_begin(SegmentId(1), CUBE, Some(&info), false),
            ContactOutcome::Tracked { count: 2 }
        );
        assert_eq!(
            tracker.on_begin(SegmentId(2), CUBE, Some(&info), false),
            ContactOutcome::ThresholdReached { count: 3 }
        );
    }

    #[test]
    fn test_engaged_body_does_not_retrigger() {
        let mut tracker = tracker();
        let info = cube();
        for i in 0..3 {
            tracker.on_begin(SegmentId(i), CUBE, Some(&info), true);
        }
        assert_eq!(
            tracker.on_begin(SegmentId(3), CUBE, Some(&info), true),
            ContactOutcome::Tracked { count: 4 }
        );
    }

    #[test]
    fn test_duplicate_begin_is_idempotent() {
        let mut tracker = tracker();
        let info = cube();
        tracker.on_begin(SegmentId(0), CUBE, Some(&info), false);
        tracker.on_begin(SegmentId(0), CUBE, Some(&info), false);
        tracker.on_persist(SegmentId(0), CUBE, Some(&info));
        assert_eq!(tracker.count(CUBE), 1);
    }

    #[test]
    fn test_persist_never_triggers_onset() {
        let mut tracker = tracker();
        let info = cube();
        for i in 0..3 {
            assert_eq!(
                tracker.on_persist(SegmentId(i), CUBE, Some(&info)),
                ContactOutcome::Tracked { count: i + 1 }
            );
        }
        assert_eq!(tracker.count(CUBE), 3);
    }

    #[test]
    fn test_not_grabbable_or_vanished_is_ignored() {
        let mut tracker = tracker();
        let wall = BodyInfo::new("wall", None);
        assert_eq!(
            tracker.on_begin(SegmentId(0), BodyHandle(2), Some(&wall), false),
            ContactOutcome::Ignored(IgnoreReason::NotGrabbable)
        );
        assert_eq!(
            tracker.on_persist(SegmentId(0), BodyHandle(3), None),
            ContactOutcome::Ignored(IgnoreReason::UnknownBody)
        );
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_end_removes_and_reports_below_threshold() {
        let mut tracker = tracker();
        let info = cube();
        for i in 0..4 {
            tracker.on_begin(SegmentId(i), CUBE, Some(&info), false);
        }

        assert_eq!(
            tracker.on_end(SegmentId(3), CUBE, false),
            ContactOutcome::Tracked { count: 3 }
        );
        assert_eq!(
            tracker.on_end(SegmentId(2), CUBE, false),
            ContactOutcome::BelowThreshold { count: 2 }
        );
        tracker.on_end(SegmentId(1), CUBE, false);
        tracker.on_end(SegmentId(0), CUBE, false);
        assert!(tracker.candidate(CUBE).is_none());
    }

    #[test]
    fn test_end_for_confirmed_or_untracked_is_ignored() {
        let mut tracker = tracker();
        let info = cube();
        for i in 0..3 {
            tracker.on_begin(SegmentId(i), CUBE, Some(&info), false);
        }

        assert_eq!(
            tracker.on_end(SegmentId(0), CUBE, true),
            ContactOutcome::Ignored(IgnoreReason::HeldByGrasp)
        );
        assert_eq!(tracker.count(CUBE), 3);
        assert_eq!(
            tracker.on_end(SegmentId(0), BodyHandle(99), false),
            ContactOutcome::Ignored(IgnoreReason::Untracked)
        );
    }

    #[test]
    fn test_retain_drops_rejected_bodies() {
        let mut tracker = tracker();
        let info = cube();
        let ball = BodyHandle(2);
        tracker.on_begin(SegmentId(0), CUBE, Some(&info), false);
        tracker.on_begin(SegmentId(1), ball, Some(&info), false);

        let removed = tracker.retain(|body| body != ball);
        assert_eq!(removed, vec![ball]);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.count(CUBE), 1);
    }
}
