//! 订阅注册表
//!
//! 事件名 → 桶（Bucket）。每个桶按优先级分为六条 FIFO 通道，并维护存活订阅数；
//! 计数归零时整个桶被移除。分发时只拿走 `Arc` 快照，调用回调前释放分片锁。
//!
use crate::priority::Priority;
use crate::subscription::{Callback, Subscription};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
pub(crate) struct Bucket {
    lanes: [Vec<Arc<Subscription>>; Priority::ALL.len()],
    count: usize,
}

impl Bucket {
    fn push(&mut self, subscription: Arc<Subscription>) {
        self.lanes[subscription.priority().index()].push(subscription);
        self.count += 1;
    }

    /// 按优先级升序、同级按注册顺序；给定 `level` 时只取该级
    fn snapshot(&self, level: Option<Priority>) -> Vec<Arc<Subscription>> {
        match level {
            Some(p) => self.lanes[p.index()].clone(),
            None => self.lanes.iter().flatten().cloned().collect(),
        }
    }

    fn remove_where(&mut self, pred: impl Fn(&Subscription) -> bool) -> usize {
        let before = self.count;
        for lane in &mut self.lanes {
            lane.retain(|s| !pred(&**s));
        }
        self.count = self.lanes.iter().map(Vec::len).sum();
        before - self.count
    }

    fn find(&self, callback: &Callback, interval_ms: Option<u64>) -> Option<Priority> {
        self.lanes
            .iter()
            .flatten()
            .find(|s| s.matches(callback, interval_ms))
            .map(|s| s.priority())
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    buckets: DashMap<String, Bucket>,
}

impl Registry {
    pub(crate) fn insert(&self, bucket: &str, subscription: Arc<Subscription>) {
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .push(subscription);
    }

    /// 桶存在（且有订阅者）时返回快照；按优先级过滤后快照可能为空
    pub(crate) fn snapshot(
        &self,
        bucket: &str,
        level: Option<Priority>,
    ) -> Option<Vec<Arc<Subscription>>> {
        self.buckets
            .get(bucket)
            .filter(|b| b.count > 0)
            .map(|b| b.snapshot(level))
    }

    pub(crate) fn count(&self, bucket: &str) -> usize {
        self.buckets.get(bucket).map(|b| b.count).unwrap_or(0)
    }

    pub(crate) fn remove_bucket(&self, bucket: &str) -> usize {
        self.buckets
            .remove(bucket)
            .map(|(_, b)| b.count)
            .unwrap_or(0)
    }

    pub(crate) fn remove_where(&self, bucket: &str, pred: impl Fn(&Subscription) -> bool) -> usize {
        let removed = match self.buckets.get_mut(bucket) {
            Some(mut b) => b.remove_where(pred),
            None => return 0,
        };
        self.buckets.remove_if(bucket, |_, b| b.count == 0);
        removed
    }

    pub(crate) fn find(
        &self,
        bucket: &str,
        callback: &Callback,
        interval_ms: Option<u64>,
    ) -> Option<Priority> {
        self.buckets
            .get(bucket)
            .and_then(|b| b.find(callback, interval_ms))
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buckets.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }
}
