//! 进程内发布/订阅中介者（herald-core）
//!
//! 各组件（订阅者）针对事件名注册回调；中介者把发布的事件按优先级依次分发给
//! 匹配的回调，并提供：
//! - 事件（`event`）：在一次发布的各回调之间传递，携带载荷、取消标记与前序结果
//! - 订阅（`subscription`）：回调句柄及其标识、批量订阅项、事件名解析
//! - 中介者（`mediator`）：注册表、分发折叠、挂起与重放、定时门控、退订匹配
//! - 优先级（`priority`）、时钟（`clock`）、配置（`config`）与错误（`error`）
//!
//! 执行模型是同步的：`publish` 在调用方线程上运行到结束，内部不创建线程或任务，
//! 也没有后台定时器。需要周期行为时，由嵌入方自行定期发布 `"timer"` 事件。
//!
//! 典型用法：
//! 1. 创建 `Mediator`（可通过 `MediatorConfig` 开启挂起）；
//! 2. 用 `Callback` 包装闭包或对象方法并 `subscribe`；
//! 3. 构造 `Event` 并 `publish`，得到最后一个回调的返回值；
//! 4. 保留 `Callback` 句柄，以便之后 `unsubscribe` / `is_subscribed`。
//!
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod mediator;
pub mod priority;
pub mod subscription;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MediatorConfig;
pub use error::{MediatorError, MediatorResult};
pub use event::{Caller, Event};
pub use mediator::Mediator;
pub use priority::Priority;
pub use subscription::{Callback, CallbackId, EventKey, Observer, Registration, Subscription};
