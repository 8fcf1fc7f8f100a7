use crate::error::{ListenerError, ListenerResult};
use crate::handler_spec::HandlerSpec;
use crate::listener::Listener;
use herald_core::{EventKey, Mediator, MediatorError, Registration};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// 把一个监听者的整张处理器清单订阅到中介者上，或整体退订
///
/// - `subscribe`：先校验整张清单的事件名，再按顺序订阅，返回期间被重放的
///   挂起事件结果；校验失败时不做任何订阅，挂起队列保持不变；
/// - `unsubscribe`：精确移除本次订阅过的 (事件名, 回调)，不会影响他人的订阅。
pub struct ListenerHandle<L: Listener> {
    listener: Arc<L>,
    mediator: Mediator,
    registered: Vec<HandlerSpec>,
}

impl<L: Listener> ListenerHandle<L> {
    pub fn new(listener: L, mediator: Mediator) -> Self {
        Self::from_arc(Arc::new(listener), mediator)
    }

    pub fn from_arc(listener: Arc<L>, mediator: Mediator) -> Self {
        Self {
            listener,
            mediator,
            registered: Vec::new(),
        }
    }

    pub fn listener(&self) -> &Arc<L> {
        &self.listener
    }

    pub fn mediator(&self) -> &Mediator {
        &self.mediator
    }

    pub fn is_subscribed(&self) -> bool {
        !self.registered.is_empty()
    }

    /// 已订阅的处理器（按订阅顺序）
    pub fn registered(&self) -> &[HandlerSpec] {
        &self.registered
    }

    /// 订阅整张清单；已订阅时不重复订阅
    pub fn subscribe(&mut self) -> ListenerResult<Vec<Value>> {
        if self.is_subscribed() {
            debug!(listener = self.listener.name(), "already subscribed");
            return Ok(Vec::new());
        }

        let handlers = self.listener.handlers();
        if handlers.is_empty() {
            return Err(ListenerError::NoHandlers {
                listener: self.listener.name(),
            });
        }

        // 订阅会立即重放挂起事件，必须在任何订阅之前发现无效的事件名
        for spec in &handlers {
            EventKey::parse(spec.name())
                .map_err(|reason| MediatorError::invalid_subscription(spec.name(), reason))?;
        }

        let mut results = Vec::new();
        for spec in handlers {
            let replayed = match self.mediator.subscribe_with(
                spec.name(),
                spec.callback().clone(),
                spec.priority(),
                spec.force(),
            ) {
                Ok(replayed) => replayed,
                Err(err) => {
                    self.rollback();
                    return Err(err.into());
                }
            };
            results.extend(replayed);
            self.registered.push(spec);
        }

        debug!(
            listener = self.listener.name(),
            handlers = self.registered.len(),
            "listener subscribed"
        );
        Ok(results)
    }

    /// 退订本次订阅过的全部处理器；未订阅时无操作
    pub fn unsubscribe(&mut self) -> ListenerResult<()> {
        if !self.is_subscribed() {
            return Ok(());
        }

        let specs = std::mem::take(&mut self.registered);
        let count = specs.len();
        self.mediator
            .unsubscribe_batch(specs.into_iter().map(Registration::from))?;

        debug!(
            listener = self.listener.name(),
            handlers = count,
            "listener unsubscribed"
        );
        Ok(())
    }

    fn rollback(&mut self) {
        for spec in std::mem::take(&mut self.registered) {
            if let Err(err) = self.mediator.unsubscribe(spec.name(), Some(spec.callback())) {
                warn!(listener = self.listener.name(), event = spec.name(), %err, "rollback failed");
            }
        }
    }
}
