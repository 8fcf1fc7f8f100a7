//! 中介者配置
//!
use bon::Builder;
use serde::{Deserialize, Serialize};

/// 中介者配置
#[derive(Builder, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    /// 无订阅者时是否挂起事件，待订阅者出现后重放
    #[builder(default)]
    pub hold_unheard_events: bool,
    /// 挂起队列上限；满时丢弃最早挂起的事件。`None` 表示不限
    pub max_held_events: Option<usize>,
}

impl MediatorConfig {
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
