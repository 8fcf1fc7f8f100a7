use bon::Builder;
use herald_core::{Callback, Priority, Registration};

/// 监听者声明的一个处理器：事件名 + 回调，可选的优先级与强制标记
///
/// 未指定的优先级/强制标记在订阅时取 NORMAL / `false`。
#[derive(Builder, Clone, Debug)]
pub struct HandlerSpec {
    #[builder(start_fn, into)]
    name: String,
    #[builder(start_fn)]
    callback: Callback,
    priority: Option<Priority>,
    force: Option<bool>,
}

impl HandlerSpec {
    pub fn new(name: impl Into<String>, callback: Callback) -> Self {
        Self::builder(name, callback).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    pub fn priority(&self) -> Priority {
        self.priority.unwrap_or_default()
    }

    pub fn force(&self) -> bool {
        self.force.unwrap_or(false)
    }
}

impl From<HandlerSpec> for Registration {
    fn from(spec: HandlerSpec) -> Self {
        Registration {
            name: spec.name,
            callback: Some(spec.callback),
            priority: spec.priority,
            force: spec.force,
        }
    }
}
