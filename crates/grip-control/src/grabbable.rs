//! 可抓取物体识别策略

use grip_physics::BodyInfo;
use grip_types::GrabbableConfig;

/// 可抓取识别策略 Trait
///
/// 对闭包有 blanket 实现，自定义策略可直接传入
/// `|info: &BodyInfo| info.name.starts_with("crate")`。
pub trait GrabbablePolicy: Send + Sync {
    /// 刚体是否可抓取
    fn is_grabbable(&self, info: &BodyInfo) -> bool;
}

impl<F> GrabbablePolicy for F
where
    F: Fn(&BodyInfo) -> bool + Send + Sync,
{
    fn is_grabbable(&self, info: &BodyInfo) -> bool {
        self(info)
    }
}

/// 默认策略：标签精确匹配，或名称（忽略大小写）包含关键字
#[derive(Debug, Clone, Default)]
pub struct TagOrNamePolicy {
    tags: Vec<String>,
    keywords: Vec<String>,
}

impl TagOrNamePolicy {
    pub fn new(config: &GrabbableConfig) -> Self {
        Self {
            tags: config.tags.clone(),
            keywords: config.name_keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

impl GrabbablePolicy for TagOrNamePolicy {
    fn is_grabbable(&self, info: &BodyInfo) -> bool {
        if let Some(tag) = &info.tag {
            if self.tags.iter().any(|t| t == tag) {
                return true;
            }
        }
        let name = info.name.to_lowercase();
        self.keywords.iter().any(|k| !k.is_empty() && name.contains(k.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_or_name_policy() {
        let policy = TagOrNamePolicy::new(&GrabbableConfig::default());

        assert!(policy.is_grabbable(&BodyInfo::new("cube", Some("Grabbable"))));
        assert!(policy.is_grabbable(&BodyInfo::new("Crate_GRABBABLE_01", None)));
        // 标签大小写敏感
        assert!(!policy.is_grabbable(&BodyInfo::new("cube", Some("grabbable_tag"))));
        assert!(!policy.is_grabbable(&BodyInfo::new("wall", Some("Static"))));
    }

    #[test]
    fn test_closure_policy() {
        let policy = |info: &BodyInfo| info.name.starts_with("ball");
        assert!(policy.is_grabbable(&BodyInfo::new("ball_7", None)));
        assert!(!policy.is_grabbable(&BodyInfo::new("cube", Some("Grabbable"))));
    }
}
