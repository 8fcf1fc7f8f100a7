//! 订阅（Subscription）
//!
//! - `Observer`：订阅者需要满足的最小能力，接收事件并返回一个结果；
//! - `Callback`：可克隆的回调句柄，以 (目标, 函数) 标识对比相等；
//! - `Subscription`：注册表中的订阅记录；
//! - `Registration`：批量订阅时的一条 `[名称, 回调, 优先级?, 强制?]`；
//! - `EventKey`：事件名解析结果（普通名称或 `timer:<毫秒>`）。
//!
use crate::clock::TimerGate;
use crate::event::Event;
use crate::priority::Priority;
use bon::Builder;
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 订阅者契约
pub trait Observer: Send + Sync {
    fn notify(&self, event: &mut Event) -> Value;
}

impl<F> Observer for F
where
    F: Fn(&mut Event) -> Value + Send + Sync,
{
    fn notify(&self, event: &mut Event) -> Value {
        self(event)
    }
}

/// 绑定到某个对象上的方法
struct MethodObserver<T> {
    target: Arc<T>,
    method: fn(&T, &mut Event) -> Value,
}

impl<T: Send + Sync> Observer for MethodObserver<T> {
    fn notify(&self, event: &mut Event) -> Value {
        (self.method)(&self.target, event)
    }
}

/// 回调标识：(目标地址, 函数地址)
///
/// 闭包回调的函数地址为 0，目标地址为其共享分配的地址。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallbackId {
    target: usize,
    function: usize,
}

/// 回调句柄
///
/// 退订与查询时按 `CallbackId` 比较，而不是按闭包内容比较；
/// 因此需要保留订阅时使用的 `Callback`（或以同一对象与方法重新构造）。
///
/// ```
/// use herald_core::event::Event;
/// use herald_core::subscription::Callback;
/// use serde_json::Value;
/// use std::sync::Arc;
///
/// struct Formatter;
/// impl Formatter {
///     fn bold(&self, _e: &mut Event) -> Value {
///         Value::from("<b>")
///     }
/// }
///
/// let target = Arc::new(Formatter);
/// let a = Callback::method(target.clone(), Formatter::bold);
/// let b = Callback::method(target, Formatter::bold);
/// assert_eq!(a, b);
/// ```
#[derive(Clone)]
pub struct Callback {
    observer: Arc<dyn Observer>,
    id: CallbackId,
}

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Event) -> Value + Send + Sync + 'static,
    {
        Self::from_arc(Arc::new(f))
    }

    /// 共享一个已有的订阅者对象；同一分配构造出的回调彼此相等
    pub fn from_arc<O: Observer + 'static>(observer: Arc<O>) -> Self {
        let id = CallbackId {
            target: Arc::as_ptr(&observer) as *const () as usize,
            function: 0,
        };
        Self { observer, id }
    }

    /// 对象方法回调
    pub fn method<T>(target: Arc<T>, method: fn(&T, &mut Event) -> Value) -> Self
    where
        T: Send + Sync + 'static,
    {
        let id = CallbackId {
            target: Arc::as_ptr(&target) as *const () as usize,
            function: method as usize,
        };
        Self {
            observer: Arc::new(MethodObserver { target, method }),
            id,
        }
    }

    pub fn id(&self) -> CallbackId {
        self.id
    }

    pub fn notify(&self, event: &mut Event) -> Value {
        self.observer.notify(event)
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Callback {}

impl Hash for Callback {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("target", &format_args!("{:#x}", self.id.target))
            .field("function", &format_args!("{:#x}", self.id.function))
            .finish()
    }
}

/// 注册表中的一条订阅记录
pub struct Subscription {
    callback: Callback,
    priority: Priority,
    force: bool,
    timer: Option<TimerGate>,
}

impl Subscription {
    pub(crate) fn new(
        callback: Callback,
        priority: Priority,
        force: bool,
        timer: Option<TimerGate>,
    ) -> Self {
        Self {
            callback,
            priority,
            force,
            timer,
        }
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// 是否忽略事件取消
    pub fn force(&self) -> bool {
        self.force
    }

    pub fn interval_ms(&self) -> Option<u64> {
        self.timer.as_ref().map(TimerGate::interval_ms)
    }

    /// 定时订阅下一次可触发的时间戳（毫秒）
    pub fn next_fire_at(&self) -> Option<i64> {
        self.timer.as_ref().map(TimerGate::next_fire_at)
    }

    pub(crate) fn timer(&self) -> Option<&TimerGate> {
        self.timer.as_ref()
    }

    /// 是否与退订/查询目标匹配；定时订阅还需间隔一致
    pub(crate) fn matches(&self, callback: &Callback, interval_ms: Option<u64>) -> bool {
        if self.callback != *callback {
            return false;
        }
        match interval_ms {
            Some(ms) => self.interval_ms() == Some(ms),
            None => true,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("callback", &self.callback)
            .field("priority", &self.priority)
            .field("force", &self.force)
            .field("interval_ms", &self.interval_ms())
            .field("next_fire_at", &self.next_fire_at())
            .finish()
    }
}

/// 批量订阅中的一项
///
/// 未设置的优先级/强制标记使用批量调用时给出的默认值。
#[derive(Builder, Clone, Debug)]
pub struct Registration {
    #[builder(into)]
    pub name: String,
    pub callback: Option<Callback>,
    pub priority: Option<Priority>,
    pub force: Option<bool>,
}

impl Registration {
    pub fn new(name: impl Into<String>, callback: Callback) -> Self {
        Self::builder().name(name).callback(callback).build()
    }
}

/// 解析后的事件名
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKey {
    Named(String),
    Timer { interval_ms: u64 },
}

impl EventKey {
    /// 在事件自身名称之前分发（贪婪）
    pub const ALL: &'static str = "all";
    /// 在事件自身名称之后分发（不单独计作“已处理”）
    pub const ANY: &'static str = "any";
    /// 所有定时订阅共用的桶
    pub const TIMER: &'static str = "timer";

    const TIMER_PREFIX: &'static str = "timer:";

    /// 解析事件名；失败时返回原因
    pub fn parse(name: &str) -> Result<Self, String> {
        if name.is_empty() {
            return Err("event name is empty".to_string());
        }

        let Some(interval) = name.strip_prefix(Self::TIMER_PREFIX) else {
            return Ok(EventKey::Named(name.to_string()));
        };

        if interval.is_empty() || !interval.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!(
                "timer interval must be a decimal integer, got `{interval}`"
            ));
        }

        interval
            .parse::<u64>()
            .map(|interval_ms| EventKey::Timer { interval_ms })
            .map_err(|e| format!("timer interval out of range: {e}"))
    }

    /// 实际存放订阅的桶名
    pub fn bucket(&self) -> &str {
        match self {
            EventKey::Named(name) => name,
            EventKey::Timer { .. } => Self::TIMER,
        }
    }

    pub fn interval_ms(&self) -> Option<u64> {
        match self {
            EventKey::Named(_) => None,
            EventKey::Timer { interval_ms } => Some(*interval_ms),
        }
    }

    pub fn is_timer(&self) -> bool {
        matches!(self, EventKey::Timer { .. })
    }
}
