//! 订阅优先级
//!
//! 数值越小越先触发；同一优先级内按注册顺序（FIFO）触发。
//!
use crate::error::MediatorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 优先级（0..=5）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Priority {
    Urgent = 0,
    Highest = 1,
    High = 2,
    #[default]
    Normal = 3,
    Low = 4,
    Lowest = 5,
}

impl Priority {
    /// 按触发顺序排列的全部优先级
    pub const ALL: [Priority; 6] = [
        Priority::Urgent,
        Priority::Highest,
        Priority::High,
        Priority::Normal,
        Priority::Low,
        Priority::Lowest,
    ];

    pub const fn value(self) -> u8 {
        self as u8
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Priority {
    type Error = MediatorError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Priority::ALL
            .get(value as usize)
            .copied()
            .ok_or(MediatorError::InvalidPriority {
                value: value.to_string(),
            })
    }
}

impl TryFrom<i64> for Priority {
    type Error = MediatorError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| MediatorError::InvalidPriority {
                value: value.to_string(),
            })
            .and_then(Priority::try_from)
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.value()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Urgent => write!(f, "urgent"),
            Self::Highest => write!(f, "highest"),
            Self::High => write!(f, "high"),
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
            Self::Lowest => write!(f, "lowest"),
        }
    }
}

impl FromStr for Priority {
    type Err = MediatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "urgent" => Ok(Self::Urgent),
            "highest" => Ok(Self::Highest),
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            "lowest" => Ok(Self::Lowest),
            digits if digits.chars().all(|c| c.is_ascii_digit()) && !digits.is_empty() => {
                Priority::try_from(digits.parse::<u8>()?)
            }
            _ => Err(MediatorError::InvalidPriority {
                value: s.to_string(),
            }),
        }
    }
}
