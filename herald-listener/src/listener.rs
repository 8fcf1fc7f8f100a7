use crate::handler_spec::HandlerSpec;
use std::any::type_name;
use std::sync::Arc;

/// 监听者
///
/// 以显式清单声明要订阅的处理器。清单通常由对象方法构成：
///
/// ```
/// use herald_core::{Callback, Event};
/// use herald_listener::{HandlerSpec, Listener};
/// use serde_json::Value;
/// use std::sync::Arc;
///
/// struct Audit;
///
/// impl Audit {
///     fn record(&self, e: &mut Event) -> Value {
///         Value::from(e.name())
///     }
/// }
///
/// impl Listener for Audit {
///     fn handlers(self: &Arc<Self>) -> Vec<HandlerSpec> {
///         vec![HandlerSpec::new("all", Callback::method(self.clone(), Audit::record))]
///     }
/// }
///
/// assert_eq!(Arc::new(Audit).handlers().len(), 1);
/// ```
pub trait Listener: Send + Sync + 'static {
    /// 监听者名称（用于日志与错误）
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// 处理器清单；按顺序订阅
    fn handlers(self: &Arc<Self>) -> Vec<HandlerSpec>;
}
