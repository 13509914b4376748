use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crossbeam_queue::ArrayQueue;
use tracing::trace;

use crate::{
    buffer::ByteBuf,
    config::LbPoolConfig,
    error::ConfigError,
    metrics::{NoopMetrics, PoolMetrics},
};

/// `LbPool` 是容量固定的有界缓冲池，面向稳定的高吞吐场景。
///
/// # 模块角色（Why）
/// - 高吞吐下重分配成本占主导，归还时只做 [`ByteBuf::reset_len`] 软重置、保留内存块，
///   下一次 `get` 拿到的缓冲可以直接写入，代价是每个槽位都保留着峰值内存；
/// - 槽位数有上限，保证池本身的内存占用有界。
///
/// # 核心机制（How）
/// - 槽位是 `crossbeam_queue::ArrayQueue` 无锁环形队列，整个池只有这一个同步域；
/// - 环满时按 `release_factor` 掷骰：命中则淘汰最旧的缓冲（释放其内存）并让新归还者入环，
///   未命中则直接释放新归还者；
/// - 复用命中与成功入环分别以缓冲容量上报给注入的 [`PoolMetrics`]；
/// - `LbCounters` 以原子计数跟踪命中、未命中、归还、淘汰、丢弃，供 [`LbPool::stats`] 快照。
///
/// # 契约说明（What）
/// - `get`/`put` 可被任意线程并发调用；
/// - `put` 返回缓冲是否被池接收；返回 `false` 时缓冲内存已释放；
/// - 池内缓冲数量恒不超过 `size`。
pub struct LbPool {
    ring: ArrayQueue<ByteBuf>,
    release_factor: f32,
    metrics: Arc<dyn PoolMetrics>,
    counters: LbCounters,
}

/// 有界池的统计快照。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LbPoolStats {
    /// 当前保存的缓冲数量。
    pub size: usize,
    /// `get` 复用已存缓冲的次数。
    pub hits: u64,
    /// `get` 因池空而新建缓冲的次数。
    pub misses: u64,
    /// `put` 被接收的次数（含淘汰换入）。
    pub returns: u64,
    /// 环满时被淘汰的旧缓冲数量。
    pub evictions: u64,
    /// 环满时被直接释放的新归还缓冲数量。
    pub discards: u64,
}

impl LbPool {
    /// 按配置创建池，配置非法时返回错误。
    pub fn new(config: LbPoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// 注入池事件观测者，替换默认的 [`NoopMetrics`]。
    pub fn with_metrics(mut self, metrics: Arc<dyn PoolMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    fn from_valid(config: LbPoolConfig) -> Self {
        Self {
            ring: ArrayQueue::new(config.size),
            release_factor: config.release_factor,
            metrics: Arc::new(NoopMetrics),
            counters: LbCounters::default(),
        }
    }

    /// 取出一个已存缓冲，池空时返回新的空缓冲。
    pub fn get(&self) -> ByteBuf {
        match self.ring.pop() {
            Some(buf) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                self.metrics.pool_acquire(buf.capacity() as u64);
                buf
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                ByteBuf::new()
            }
        }
    }

    /// 归还缓冲，返回是否被池接收。
    pub fn put(&self, mut buf: ByteBuf) -> bool {
        if buf.capacity() == 0 {
            return false;
        }
        buf.reset_len();
        let capacity = buf.capacity() as u64;
        match self.ring.push(buf) {
            Ok(()) => {
                self.accept(capacity);
                true
            }
            Err(rejected) => self.settle_overflow(rejected, capacity),
        }
    }

    /// 配置的槽位上限。
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn release_factor(&self) -> f32 {
        self.release_factor
    }

    /// 当前保存的缓冲数量。
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn stats(&self) -> LbPoolStats {
        self.counters.snapshot(self.ring.len())
    }

    fn accept(&self, capacity: u64) {
        self.counters.returns.fetch_add(1, Ordering::Relaxed);
        self.metrics.pool_release(capacity);
    }

    /// 环满时的处理：按释放因子决定淘汰旧缓冲还是释放新缓冲。
    fn settle_overflow(&self, mut buf: ByteBuf, capacity: u64) -> bool {
        if !self.should_evict() {
            buf.release();
            self.counters.discards.fetch_add(1, Ordering::Relaxed);
            trace!(capacity, "lb pool full, released incoming buffer");
            return false;
        }
        if let Some(mut evicted) = self.ring.force_push(buf) {
            trace!(
                evicted_capacity = evicted.capacity(),
                capacity, "lb pool full, evicted oldest buffer"
            );
            evicted.release();
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.accept(capacity);
        true
    }

    fn should_evict(&self) -> bool {
        self.release_factor > 0.0 && rand::random::<f32>() < self.release_factor
    }
}

impl Default for LbPool {
    fn default() -> Self {
        Self::from_valid(LbPoolConfig::default())
    }
}

impl core::fmt::Debug for LbPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LbPool")
            .field("capacity", &self.ring.capacity())
            .field("len", &self.ring.len())
            .field("release_factor", &self.release_factor)
            .finish()
    }
}

#[derive(Default)]
struct LbCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    returns: AtomicU64,
    evictions: AtomicU64,
    discards: AtomicU64,
}

impl LbCounters {
    fn snapshot(&self, size: usize) -> LbPoolStats {
        LbPoolStats {
            size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            discards: self.discards.load(Ordering::Relaxed),
        }
    }
}
