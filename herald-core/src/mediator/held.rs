//! 挂起队列：无订阅者时发布的事件按 FIFO 暂存，待对应订阅出现后重放。
//!
use crate::event::Event;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) struct HeldQueue {
    events: Mutex<VecDeque<Event>>,
    limit: Option<usize>,
}

impl HeldQueue {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            limit,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Event>> {
        // 持锁期间不会调用任何回调，中毒只可能来自内部 panic，数据仍然一致
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 入队；超出上限时返回被挤出的最早事件
    pub(crate) fn push(&self, event: Event) -> Option<Event> {
        let mut events = self.lock();
        let evicted = match self.limit {
            Some(0) => return Some(event),
            Some(limit) if events.len() >= limit => events.pop_front(),
            _ => None,
        };
        events.push_back(event);
        evicted
    }

    /// 取出所有同名事件，保持挂起顺序
    pub(crate) fn take_matching(&self, name: &str) -> Vec<Event> {
        let mut events = self.lock();
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(events.len());
        for event in events.drain(..) {
            if event.name() == name {
                taken.push(event);
            } else {
                kept.push_back(event);
            }
        }
        *events = kept;
        taken
    }

    pub(crate) fn clear(&self) -> usize {
        let mut events = self.lock();
        let n = events.len();
        events.clear();
        n
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.name().to_string()).collect()
    }
}
