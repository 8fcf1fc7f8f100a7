//! 中介者统一错误定义
//!
//! 仅覆盖订阅/退订阶段的调用方误用；这些错误都是本地、即时、不可重试的。
//! 预期内的结果（无订阅者、未订阅）通过返回值表达，而不是错误。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediatorError {
    // --- 订阅 ---
    #[error("invalid subscription: name={name}, reason={reason}")]
    InvalidSubscription { name: String, reason: String },
    #[error("missing callback: name={name}")]
    MissingCallback { name: String },

    // --- 退订 ---
    #[error("invalid unsubscribe target: name={name}, reason={reason}")]
    InvalidUnsubscribeTarget { name: String, reason: String },

    // --- 值转换 ---
    #[error("invalid priority: {value}")]
    InvalidPriority { value: String },
}

impl MediatorError {
    pub fn invalid_subscription(name: impl Into<String>, reason: impl Into<String>) -> Self {
        MediatorError::InvalidSubscription {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_unsubscribe_target(
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        MediatorError::InvalidUnsubscribeTarget {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// 在订阅边界把值转换错误归并为 `InvalidSubscription`
    pub(crate) fn into_subscription_error(self, name: &str) -> Self {
        match self {
            MediatorError::InvalidPriority { value } => MediatorError::InvalidSubscription {
                name: name.to_string(),
                reason: format!("priority out of range: {value}"),
            },
            other => other,
        }
    }
}

/// 统一 Result 类型别名
pub type MediatorResult<T> = Result<T, MediatorError>;

impl From<std::num::ParseIntError> for MediatorError {
    fn from(err: std::num::ParseIntError) -> Self {
        MediatorError::InvalidPriority {
            value: err.to_string(),
        }
    }
}
