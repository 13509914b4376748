//! 复用池事件观测接口。
//!
//! # 设计初衷（Why）
//! - 有界池在“复用命中”与“成功归还”时需要把缓冲容量报告给外部监控，
//!   但本 crate 不绑定任何具体的指标后端；
//! - 观测对象以 `Arc<dyn PoolMetrics>` 显式注入到池实例中，而不是注册到进程级全局变量。
//!
//! # 契约说明（What）
//! - 实现必须线程安全且不得 panic：回调发生在池的热路径上，可能被任意线程并发调用；
//! - 只有 [`LbPool`](crate::LbPool) 会调用这些方法。

use core::fmt;

/// 池事件观测者。
pub trait PoolMetrics: Send + Sync {
    /// 从池中复用了一个容量为 `capacity` 的缓冲。
    fn pool_acquire(&self, capacity: u64);

    /// 一个容量为 `capacity` 的缓冲被池接收保存。
    fn pool_release(&self, capacity: u64);
}

/// 默认的空实现，所有事件直接丢弃。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl PoolMetrics for NoopMetrics {
    fn pool_acquire(&self, _capacity: u64) {}

    fn pool_release(&self, _capacity: u64) {}
}

type Callback = Box<dyn Fn(u64) + Send + Sync>;

/// 以闭包形式接收池事件的适配器。
///
/// 适合只关心其中一类事件、或不想为此单独定义类型的调用方：
///
/// ```
/// use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
/// use spark_bytebuf::CallbackMetrics;
///
/// let acquired = Arc::new(AtomicU64::new(0));
/// let sink = Arc::clone(&acquired);
/// let metrics = CallbackMetrics::new().on_acquire(move |cap| {
///     sink.fetch_add(cap, Ordering::Relaxed);
/// });
/// # let _ = metrics;
/// ```
#[derive(Default)]
pub struct CallbackMetrics {
    acquire: Option<Callback>,
    release: Option<Callback>,
}

impl CallbackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置复用命中时的回调。
    pub fn on_acquire<F>(mut self, callback: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.acquire = Some(Box::new(callback));
        self
    }

    /// 设置缓冲被池接收时的回调。
    pub fn on_release<F>(mut self, callback: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.release = Some(Box::new(callback));
        self
    }
}

impl PoolMetrics for CallbackMetrics {
    fn pool_acquire(&self, capacity: u64) {
        if let Some(callback) = &self.acquire {
            callback(capacity);
        }
    }

    fn pool_release(&self, capacity: u64) {
        if let Some(callback) = &self.release {
            callback(capacity);
        }
    }
}

impl fmt::Debug for CallbackMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackMetrics")
            .field("acquire", &self.acquire.is_some())
            .field("release", &self.release.is_some())
            .finish()
    }
}
