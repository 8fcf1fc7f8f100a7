//! 事件（Event）
//!
//! 一次 `publish` 调用期间在各处理器之间传递的值对象：
//! - 标识（名称、载荷、发布者）在构造后不可变；
//! - 状态（取消标记、前序结果）只能通过显式访问器修改；
//! - 中介者反向引用仅由中介者在每次发布开始时绑定、结束时释放。
//!
use crate::mediator::Mediator;
use bon::Builder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::value::Index;
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

/// 发布者引用（不透明，可向下转型）
#[derive(Clone)]
pub struct Caller {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Caller {
    pub fn new<T: Any + Send + Sync>(caller: T) -> Self {
        Self {
            inner: Arc::new(caller),
            type_name: type_name::<T>(),
        }
    }

    /// 复用已有的共享对象作为发布者
    pub fn from_arc<T: Any + Send + Sync>(caller: Arc<T>) -> Self {
        Self {
            inner: caller,
            type_name: type_name::<T>(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Caller").field(&self.type_name).finish()
    }
}

/// 事件
///
/// ```
/// use herald_core::event::Event;
/// use serde_json::json;
///
/// let mut event = Event::builder()
///     .name("postCreated")
///     .data(json!({ "title": "hi" }))
///     .build();
///
/// assert_eq!(event.name(), "postCreated");
/// assert_eq!(event.data_field("title"), Some(&json!("hi")));
/// assert!(event.set_cancelled(true));
/// assert!(event.is_cancelled());
/// ```
#[derive(Builder)]
pub struct Event {
    #[builder(into)]
    name: String,
    #[builder(default)]
    data: Value,
    caller: Option<Caller>,
    #[builder(skip)]
    cancelled: bool,
    #[builder(skip)]
    previous_results: Vec<Value>,
    /// 当前这次折叠（fold）在 `previous_results` 中的起点
    #[builder(skip)]
    fold_start: usize,
    #[builder(skip)]
    mediator: Option<Mediator>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder().name(name).build()
    }

    pub fn with_data(name: impl Into<String>, data: Value) -> Self {
        Self::builder().name(name).data(data).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 完整载荷
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// 载荷中的单个字段：对象按键、数组按下标；不存在时返回 `None`
    pub fn data_field<I: Index>(&self, key: I) -> Option<&Value> {
        self.data.get(key)
    }

    /// 将载荷反序列化为具体类型
    pub fn data_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.data)
    }

    pub fn caller(&self) -> Option<&Caller> {
        self.caller.as_ref()
    }

    pub fn caller_as<T: Any>(&self) -> Option<&T> {
        self.caller.as_ref().and_then(Caller::downcast_ref)
    }

    /// 设置取消标记，返回设置后的值
    pub fn set_cancelled(&mut self, cancelled: bool) -> bool {
        self.cancelled = cancelled;
        self.cancelled
    }

    pub fn cancel(&mut self) -> bool {
        self.set_cancelled(true)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// 追加一个前序结果（只能追加）
    pub fn add_previous_result(&mut self, result: Value) -> &Value {
        self.previous_results.push(result);
        &self.previous_results[self.previous_results.len() - 1]
    }

    /// 当前折叠中最近一个处理器的结果；尚无处理器执行时为 `None`
    pub fn previous_result(&self) -> Option<&Value> {
        self.previous_results().last()
    }

    /// 当前折叠中所有已执行处理器的结果（按执行顺序）
    pub fn previous_results(&self) -> &[Value] {
        &self.previous_results[self.fold_start..]
    }

    /// 正在分发该事件的中介者；仅在 `publish` 期间存在
    pub fn mediator(&self) -> Option<&Mediator> {
        self.mediator.as_ref()
    }

    /// 开始新一轮折叠：绑定中介者，并将之前发布留下的结果移出可见范围
    pub(crate) fn bind(&mut self, mediator: &Mediator) {
        self.mediator = Some(mediator.clone());
        self.fold_start = self.previous_results.len();
    }

    /// 释放中介者引用（发布结束或进入挂起队列之前）
    pub(crate) fn unbind(&mut self) {
        self.mediator = None;
    }
}

impl Clone for Event {
    /// 克隆出的事件不绑定任何中介者
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            data: self.data.clone(),
            caller: self.caller.clone(),
            cancelled: self.cancelled,
            previous_results: self.previous_results.clone(),
            fold_start: self.fold_start,
            mediator: None,
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("data", &self.data)
            .field("caller", &self.caller)
            .field("cancelled", &self.cancelled)
            .field("previous_results", &self.previous_results())
            .field("bound", &self.mediator.is_some())
            .finish()
    }
}
