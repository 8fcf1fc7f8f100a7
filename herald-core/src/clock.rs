//! 时钟与定时门控
//!
//! 中介者没有后台时钟线程：定时订阅只在某次 `publish` 扫描到 `"timer"` 桶时
//! 才有机会触发。`Clock` 只负责报告当前时间（毫秒）。
//!
use chrono::Utc;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// 当前时间来源（Unix 毫秒）
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// 系统时钟
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// 手动推进的时钟，便于嵌入方自行驱动时间或在测试中使用
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, millis: i64) -> i64 {
        self.now.fetch_add(millis, Ordering::SeqCst) + millis
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// 定时订阅的门控状态
///
/// 注册表与分发快照共享同一个 `TimerGate`，因此在快照上推进的下一次触发时间
/// 对注册表可见。
pub(crate) struct TimerGate {
    interval_ms: u64,
    next_fire: AtomicI64,
}

impl TimerGate {
    /// 首次触发不早于注册后的一个间隔
    pub(crate) fn new(interval_ms: u64, registered_at: i64) -> Self {
        Self {
            interval_ms,
            next_fire: AtomicI64::new(registered_at.saturating_add(Self::as_i64(interval_ms))),
        }
    }

    pub(crate) fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub(crate) fn next_fire_at(&self) -> i64 {
        self.next_fire.load(Ordering::SeqCst)
    }

    /// 到期则把下一次触发时间推后一个间隔并返回 `true`
    pub(crate) fn try_fire(&self, now: i64) -> bool {
        let interval = Self::as_i64(self.interval_ms);
        self.next_fire
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                (now >= next).then(|| next.saturating_add(interval))
            })
            .is_ok()
    }

    fn as_i64(ms: u64) -> i64 {
        i64::try_from(ms).unwrap_or(i64::MAX)
    }
}

impl fmt::Debug for TimerGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerGate")
            .field("interval_ms", &self.interval_ms)
            .field("next_fire", &self.next_fire_at())
            .finish()
    }
}
