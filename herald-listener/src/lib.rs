//! 监听者（Listener）胶水层
//!
//! 每个监听者在初始化时显式给出自己的处理器清单（事件名 → 回调、优先级、强制标记），
//! 由 `ListenerHandle` 整体订阅到某个中介者或整体退订，不依赖任何运行时反射。
//!
pub mod error;
pub mod handle;
pub mod handler_spec;
pub mod listener;

pub use error::{ListenerError, ListenerResult};
pub use handle::ListenerHandle;
pub use handler_spec::HandlerSpec;
pub use listener::Listener;
