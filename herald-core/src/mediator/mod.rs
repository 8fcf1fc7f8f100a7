//! 中介者（Mediator）
//!
//! 持有订阅注册表与挂起队列，并实现分发折叠（fold）：
//! - 候选桶依次为 `"all"`、事件自身名称、`"any"`，空桶跳过；
//! - 桶内按优先级升序、同级按注册顺序调用回调，前一个回调的返回值作为
//!   下一个回调可见的 `previous_result`，最后一个返回值即发布结果；
//! - 已取消的事件只会继续交给强制（force）订阅；
//! - 定时订阅（`timer:<毫秒>`）仅在到期时触发，并顺延一个间隔；
//! - 没有任何订阅者时，可按配置挂起事件，待订阅出现后按 FIFO 重放。
//!
//! 分发前先对所有候选桶取 `Arc` 快照，调用回调时不持有任何锁，
//! 因此回调内部可以重入调用 `publish` / `subscribe` / `unsubscribe`：
//! 重入的订阅变更只影响之后的发布，不会打乱正在进行的折叠。
//!
//! ```
//! use herald_core::{Callback, Event, Mediator, Priority};
//! use serde_json::{Value, json};
//!
//! let mediator = Mediator::new();
//! let format = Callback::new(|e: &mut Event| {
//!     json!(format!("<p>{}</p>", e.data().as_str().unwrap_or_default()))
//! });
//! let fancify = Callback::new(|e: &mut Event| {
//!     let prev = e.previous_result().and_then(Value::as_str).unwrap_or_default();
//!     json!(prev.replace("<p>", "<p class=\"fancy\">"))
//! });
//! mediator.subscribe_with("postCreated", format, Priority::High, false)?;
//! mediator.subscribe("postCreated", fancify)?;
//!
//! let out = mediator.publish(Event::with_data("postCreated", json!("hi")));
//! assert_eq!(out, Some(json!("<p class=\"fancy\">hi</p>")));
//! # Ok::<(), herald_core::MediatorError>(())
//! ```
//!
mod held;
mod registry;

use self::held::HeldQueue;
use self::registry::Registry;
use crate::clock::{Clock, SystemClock, TimerGate};
use crate::config::MediatorConfig;
use crate::error::{MediatorError, MediatorResult};
use crate::event::Event;
use crate::priority::Priority;
use crate::subscription::{Callback, EventKey, Registration, Subscription};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace, warn};

/// 中介者句柄；克隆开销很小，所有克隆共享同一份注册表与挂起队列
#[derive(Clone)]
pub struct Mediator {
    inner: Arc<MediatorInner>,
}

struct MediatorInner {
    registry: Registry,
    held: HeldQueue,
    hold_unheard_events: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl Default for Mediator {
    fn default() -> Self {
        Self::new()
    }
}

impl Mediator {
    pub fn new() -> Self {
        Self::with_config(MediatorConfig::default())
    }

    pub fn with_config(config: MediatorConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// 指定时钟（定时订阅的门控依赖它）
    pub fn with_clock(config: MediatorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(MediatorInner {
                registry: Registry::default(),
                held: HeldQueue::new(config.max_held_events),
                hold_unheard_events: AtomicBool::new(config.hold_unheard_events),
                clock,
            }),
        }
    }

    // ---------------------------------------------------------------------
    // 订阅
    // ---------------------------------------------------------------------

    /// 以 NORMAL 优先级、非强制方式订阅；返回被重放的挂起事件的结果
    pub fn subscribe(&self, name: &str, callback: Callback) -> MediatorResult<Vec<Value>> {
        self.subscribe_with(name, callback, Priority::Normal, false)
    }

    pub fn subscribe_with(
        &self,
        name: &str,
        callback: Callback,
        priority: Priority,
        force: bool,
    ) -> MediatorResult<Vec<Value>> {
        let mut results = Vec::new();
        self.register(name, callback, priority, force, &mut results)?;
        Ok(results)
    }

    /// 优先级来自非类型化来源（配置、脚本等）时使用；越界视为无效订阅
    pub fn subscribe_raw(
        &self,
        name: &str,
        callback: Callback,
        priority: i64,
        force: bool,
    ) -> MediatorResult<Vec<Value>> {
        let priority =
            Priority::try_from(priority).map_err(|e| e.into_subscription_error(name))?;
        self.subscribe_with(name, callback, priority, force)
    }

    /// 按顺序处理一批订阅
    ///
    /// 未单独指定的优先级/强制标记使用 `priority` / `force`。
    /// 出错时立即返回，此前的订阅保持有效。
    pub fn subscribe_batch<I>(
        &self,
        registrations: I,
        priority: Priority,
        force: bool,
    ) -> MediatorResult<Vec<Value>>
    where
        I: IntoIterator<Item = Registration>,
    {
        let mut results = Vec::new();
        for reg in registrations {
            let Some(callback) = reg.callback else {
                return Err(MediatorError::MissingCallback { name: reg.name });
            };
            self.register(
                &reg.name,
                callback,
                reg.priority.unwrap_or(priority),
                reg.force.unwrap_or(force),
                &mut results,
            )?;
        }
        Ok(results)
    }

    fn register(
        &self,
        name: &str,
        callback: Callback,
        priority: Priority,
        force: bool,
        results: &mut Vec<Value>,
    ) -> MediatorResult<()> {
        let key = EventKey::parse(name)
            .map_err(|reason| MediatorError::invalid_subscription(name, reason))?;

        let timer = key
            .interval_ms()
            .map(|ms| TimerGate::new(ms, self.inner.clock.now_millis()));
        let subscription = Arc::new(Subscription::new(callback, priority, force, timer));
        self.inner.registry.insert(key.bucket(), subscription);
        debug!(event = name, %priority, force, "subscribed");

        // 定时事件从不挂起
        if key.is_timer() {
            return Ok(());
        }

        for held in self.inner.held.take_matching(key.bucket()) {
            debug!(event = held.name(), %priority, "replaying held event");
            if let Some(result) = self.publish_at(held, Some(priority)) {
                results.push(result);
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // 退订
    // ---------------------------------------------------------------------

    /// 退订
    ///
    /// - `callback` 为 `None`：移除整个事件名的订阅（`timer:<毫秒>` 只移除该间隔的定时订阅）；
    /// - 否则移除该事件名下所有优先级中与回调标识相同的订阅（定时订阅还需间隔一致）。
    pub fn unsubscribe(&self, name: &str, callback: Option<&Callback>) -> MediatorResult<()> {
        let key = EventKey::parse(name)
            .map_err(|reason| MediatorError::invalid_unsubscribe_target(name, reason))?;
        let interval = key.interval_ms();

        let removed = match (callback, interval) {
            (None, None) => self.inner.registry.remove_bucket(key.bucket()),
            (None, Some(ms)) => self
                .inner
                .registry
                .remove_where(key.bucket(), |s| s.interval_ms() == Some(ms)),
            (Some(cb), _) => self
                .inner
                .registry
                .remove_where(key.bucket(), |s| s.matches(cb, interval)),
        };
        debug!(event = name, removed, "unsubscribed");
        Ok(())
    }

    /// 按顺序退订一批；未携带回调的项移除整个事件名
    pub fn unsubscribe_batch<I>(&self, registrations: I) -> MediatorResult<()>
    where
        I: IntoIterator<Item = Registration>,
    {
        for reg in registrations {
            self.unsubscribe(&reg.name, reg.callback.as_ref())?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // 查询
    // ---------------------------------------------------------------------

    pub fn has_subscribers(&self, name: &str) -> bool {
        self.subscriber_count(name) > 0
    }

    /// 事件名下的存活订阅数；`timer:<毫秒>` 只统计该间隔
    pub fn subscriber_count(&self, name: &str) -> usize {
        match EventKey::parse(name) {
            Ok(EventKey::Named(name)) => self.inner.registry.count(&name),
            Ok(EventKey::Timer { interval_ms }) => self
                .inner
                .registry
                .snapshot(EventKey::TIMER, None)
                .map(|subs| {
                    subs.iter()
                        .filter(|s| s.interval_ms() == Some(interval_ms))
                        .count()
                })
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// 回调以哪个优先级订阅了该事件；未订阅返回 `None`
    pub fn is_subscribed(&self, name: &str, callback: &Callback) -> Option<Priority> {
        let key = EventKey::parse(name).ok()?;
        self.inner
            .registry
            .find(key.bucket(), callback, key.interval_ms())
    }

    /// 当前已注册的事件名（桶名，按字典序）
    pub fn event_names(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    // ---------------------------------------------------------------------
    // 挂起
    // ---------------------------------------------------------------------

    pub fn hold_unheard_events(&self) -> bool {
        self.inner.hold_unheard_events.load(Ordering::SeqCst)
    }

    /// 关闭挂起时立即清空挂起队列
    pub fn set_hold_unheard_events(&self, hold: bool) {
        self.inner.hold_unheard_events.store(hold, Ordering::SeqCst);
        if !hold {
            let dropped = self.inner.held.clear();
            if dropped > 0 {
                debug!(dropped, "hold disabled, held events cleared");
            }
        }
    }

    pub fn held_events(&self) -> usize {
        self.inner.held.len()
    }

    /// 挂起事件的名称（按挂起顺序）
    pub fn held_event_names(&self) -> Vec<String> {
        self.inner.held.names()
    }

    fn try_hold(&self, event: Event) {
        if !self.hold_unheard_events() || event.name() == EventKey::TIMER {
            trace!(event = event.name(), "no subscribers, dropped");
            return;
        }
        debug!(event = event.name(), "no subscribers, holding");
        if let Some(evicted) = self.inner.held.push(event) {
            warn!(event = evicted.name(), "held queue full, oldest event dropped");
        }
    }

    // ---------------------------------------------------------------------
    // 发布
    // ---------------------------------------------------------------------

    /// 发布事件；无订阅者时返回 `None`（并视配置挂起该事件）
    pub fn publish(&self, event: Event) -> Option<Value> {
        self.publish_at(event, None)
    }

    /// 发布事件；给定 `priority` 时只通知该优先级的订阅
    pub fn publish_at(&self, mut event: Event, priority: Option<Priority>) -> Option<Value> {
        let name = event.name().to_string();
        let plan = self.plan(&name, priority);
        if plan.is_empty() {
            self.try_hold(event);
            return None;
        }

        event.bind(self);
        let mut result = Value::Null;

        for (bucket, subscriptions) in plan {
            for subscription in subscriptions {
                if event.is_cancelled() && !subscription.force() {
                    trace!(event = event.name(), bucket, "cancelled, skipped");
                    continue;
                }

                if let Some(gate) = subscription.timer() {
                    if !gate.try_fire(self.inner.clock.now_millis()) {
                        trace!(
                            interval_ms = gate.interval_ms(),
                            next_fire_at = gate.next_fire_at(),
                            "timer not due"
                        );
                        continue;
                    }
                }

                trace!(
                    event = event.name(),
                    bucket,
                    priority = %subscription.priority(),
                    "invoking subscriber"
                );
                result = subscription.callback().notify(&mut event);
                event.add_previous_result(result.clone());
            }
        }

        event.unbind();
        Some(result)
    }

    /// 候选桶及其快照：`"all"`、事件自身名称、`"any"`
    ///
    /// 事件名本身就是 `"all"` / `"any"` 时不重复分发。
    fn plan<'a>(
        &self,
        name: &'a str,
        priority: Option<Priority>,
    ) -> Vec<(&'a str, Vec<Arc<Subscription>>)> {
        let own = match name {
            EventKey::ALL | EventKey::ANY => None,
            _ => Some(name),
        };

        [Some(EventKey::ALL), own, Some(EventKey::ANY)]
            .into_iter()
            .flatten()
            .filter_map(|bucket| {
                self.inner
                    .registry
                    .snapshot(bucket, priority)
                    .map(|subs| (bucket, subs))
            })
            .collect()
    }
}

impl fmt::Debug for Mediator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mediator")
            .field("events", &self.event_names())
            .field("held", &self.held_events())
            .field("hold_unheard_events", &self.hold_unheard_events())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;
    use std::sync::Mutex;

    fn constant(v: Value) -> Callback {
        Callback::new(move |_e: &mut Event| v.clone())
    }

    fn holding() -> Mediator {
        Mediator::with_config(MediatorConfig::builder().hold_unheard_events(true).build())
    }

    #[test]
    fn publish_without_subscribers_returns_none() {
        let mediator = Mediator::new();
        assert_eq!(mediator.publish(Event::new("nobody")), None);
        assert_eq!(mediator.held_events(), 0);
    }

    #[test]
    fn all_bucket_alone_counts_as_heard() {
        let mediator = holding();
        mediator.subscribe("all", constant(json!("seen"))).unwrap();
        assert_eq!(mediator.publish(Event::new("x")), Some(json!("seen")));
        assert_eq!(mediator.held_events(), 0);
    }

    #[test]
    fn reserved_names_are_not_dispatched_twice() {
        let mediator = Mediator::new();
        let calls = Arc::new(Mutex::new(0));
        let c = calls.clone();
        mediator
            .subscribe(
                "all",
                Callback::new(move |_e: &mut Event| {
                    *c.lock().unwrap() += 1;
                    Value::Null
                }),
            )
            .unwrap();
        mediator.publish(Event::new("all"));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn publish_at_filters_one_level() {
        let mediator = Mediator::new();
        mediator
            .subscribe_with("e", constant(json!("high")), Priority::High, false)
            .unwrap();
        mediator.subscribe("e", constant(json!("normal"))).unwrap();

        assert_eq!(
            mediator.publish_at(Event::new("e"), Some(Priority::High)),
            Some(json!("high"))
        );
        // 桶存在但该级为空：视为已处理，结果为 Null
        assert_eq!(
            mediator.publish_at(Event::new("e"), Some(Priority::Lowest)),
            Some(Value::Null)
        );
    }

    #[test]
    fn subscribe_raw_rejects_out_of_range_priority() {
        let mediator = Mediator::new();
        let err = mediator
            .subscribe_raw("e", constant(Value::Null), 6, false)
            .unwrap_err();
        assert!(matches!(err, MediatorError::InvalidSubscription { .. }));
        assert!(!mediator.has_subscribers("e"));

        mediator
            .subscribe_raw("e", constant(Value::Null), 0, false)
            .unwrap();
        assert!(mediator.has_subscribers("e"));
    }

    #[test]
    fn malformed_names_are_rejected() {
        let mediator = Mediator::new();
        let cb = constant(Value::Null);
        assert!(matches!(
            mediator.subscribe("timer:soon", cb.clone()),
            Err(MediatorError::InvalidSubscription { .. })
        ));
        assert!(matches!(
            mediator.unsubscribe("timer:soon", Some(&cb)),
            Err(MediatorError::InvalidUnsubscribeTarget { .. })
        ));
        assert!(matches!(
            mediator.unsubscribe("", None),
            Err(MediatorError::InvalidUnsubscribeTarget { .. })
        ));
        assert_eq!(mediator.is_subscribed("timer:soon", &cb), None);
    }

    #[test]
    fn timer_subscriptions_share_the_timer_bucket() {
        let clock = Arc::new(ManualClock::new(0));
        let mediator = Mediator::with_clock(MediatorConfig::default(), clock.clone());
        let fast = constant(json!("fast"));
        let slow = constant(json!("slow"));
        mediator.subscribe("timer:100", fast.clone()).unwrap();
        mediator.subscribe("timer:300", slow.clone()).unwrap();

        assert_eq!(mediator.event_names(), vec!["timer".to_string()]);
        assert_eq!(mediator.subscriber_count("timer"), 2);
        assert_eq!(mediator.subscriber_count("timer:100"), 1);
        assert_eq!(mediator.is_subscribed("timer:100", &fast), Some(Priority::Normal));
        assert_eq!(mediator.is_subscribed("timer:300", &fast), None);

        clock.set(100);
        assert_eq!(mediator.publish(Event::new("timer")), Some(json!("fast")));
        clock.set(300);
        assert_eq!(mediator.publish(Event::new("timer")), Some(json!("slow")));

        mediator.unsubscribe("timer:300", None).unwrap();
        assert_eq!(mediator.subscriber_count("timer"), 1);
        assert_eq!(mediator.is_subscribed("timer:100", &fast), Some(Priority::Normal));
    }

    #[test]
    fn hold_toggle() {
        let mediator = Mediator::new();
        assert!(!mediator.hold_unheard_events());
        mediator.set_hold_unheard_events(true);
        mediator.publish(Event::new("later"));
        mediator.publish(Event::new("timer"));
        assert_eq!(mediator.held_event_names(), vec!["later".to_string()]);

        mediator.set_hold_unheard_events(false);
        assert_eq!(mediator.held_events(), 0);
    }

    #[test]
    fn held_queue_limit_from_config() {
        let mediator = Mediator::with_config(
            MediatorConfig::builder()
                .hold_unheard_events(true)
                .max_held_events(1)
                .build(),
        );
        mediator.publish(Event::new("first"));
        mediator.publish(Event::new("second"));
        assert_eq!(mediator.held_event_names(), vec!["second".to_string()]);
    }

    #[test]
    fn clones_share_state() {
        let mediator = Mediator::new();
        let other = mediator.clone();
        other.subscribe("e", constant(json!(1))).unwrap();
        assert!(mediator.has_subscribers("e"));
        assert!(format!("{mediator:?}").contains("\"e\""));
    }
}
