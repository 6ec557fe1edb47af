//! 配置错误类型定义

use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 数值超出允许范围
    #[error("Invalid value for `{field}`: {value} ({expected})")]
    InvalidValue {
        /// 字段路径（如 `stall.frames`）
        field: &'static str,
        /// 实际值
        value: String,
        /// 约束描述
        expected: &'static str,
    },

    /// 手指分组引用了空组
    #[error("Finger group {group} is empty")]
    EmptyFingerGroup {
        /// 分组序号
        group: usize,
    },

    /// TOML 解析失败
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML 序列化失败
    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// 文件读写失败
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(
        field: &'static str,
        value: impl ToString,
        expected: &'static str,
    ) -> Self {
        ConfigError::InvalidValue {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("stall.frames", 0, "must be >= 1");
        assert_eq!(
            format!("{}", err),
            "Invalid value for `stall.frames`: 0 (must be >= 1)"
        );

        let err = ConfigError::EmptyFingerGroup { group: 2 };
        assert_eq!(format!("{}", err), "Finger group 2 is empty");
    }
}
