use std::sync::OnceLock;

use tracing::debug;

use crate::{
    buffer::ByteBuf,
    config::{DEFAULT_SHARDS, MultiPoolConfig},
    error::ConfigError,
    pool::Pool,
    selector::{RandomSelector, ShardSelector},
};

/// `MultiPool` 把 N 个相互独立的 [`Pool`] 组成分片数组，用随机选择分摊锁竞争。
///
/// # 设计动机（Why）
/// - 大量线程同时 `get`/`put` 同一个池时，单一锁域会成为热点；
/// - 每次调用随机挑一个分片，把竞争打散到多个独立锁域，牺牲的只是复用的局部性。
///
/// # 行为描述（How）
/// - 分片数组在第一次访问时惰性创建；
/// - `put` 先 [`ByteBuf::reset`] 释放内存，再交给随机选中的分片；
///   归还的分片与取出时的分片无需相同，缓冲在分片之间自由流动；
/// - 选择策略可通过 [`MultiPool::with_selector`] 替换，测试中可注入确定性策略。
pub struct MultiPool {
    size: usize,
    shards: OnceLock<Box<[Pool]>>,
    selector: Box<dyn ShardSelector>,
}

impl MultiPool {
    /// 创建 `shards` 个分片的多池；`shards == 0` 时取默认值 16。
    pub fn new(shards: usize) -> Self {
        let size = if shards == 0 { DEFAULT_SHARDS } else { shards };
        Self {
            size,
            shards: OnceLock::new(),
            selector: Box::new(RandomSelector),
        }
    }

    pub fn from_config(config: &MultiPoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.shards))
    }

    /// 替换分片选择策略。
    pub fn with_selector<S>(mut self, selector: S) -> Self
    where
        S: ShardSelector + 'static,
    {
        self.selector = Box::new(selector);
        self
    }

    /// 从随机分片取出缓冲，分片为空时返回新的空缓冲。
    pub fn get(&self) -> ByteBuf {
        self.pick().get()
    }

    /// 释放缓冲内存后归还到随机分片。
    ///
    /// 从未分配过的缓冲直接丢弃，与 [`Pool::put`] 的判定一致；
    /// 判定发生在重置之前，否则所有缓冲都会因重置后容量为 0 而被丢弃。
    pub fn put(&self, mut buf: ByteBuf) {
        if buf.capacity() == 0 {
            return;
        }
        buf.reset();
        self.pick().store(buf);
    }

    /// 分片数量。
    pub fn shards(&self) -> usize {
        self.size
    }

    /// 各分片当前保存的缓冲数量。
    pub fn shard_lens(&self) -> Vec<usize> {
        self.pools().iter().map(Pool::len).collect()
    }

    /// 全部分片保存的缓冲总数。
    pub fn len(&self) -> usize {
        self.pools().iter().map(Pool::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pools(&self) -> &[Pool] {
        self.shards.get_or_init(|| {
            debug!(shards = self.size, "initializing multi-pool shards");
            (0..self.size).map(|_| Pool::new()).collect()
        })
    }

    fn pick(&self) -> &Pool {
        let pools = self.pools();
        &pools[self.selector.select(pools.len()) % pools.len()]
    }
}

impl Default for MultiPool {
    fn default() -> Self {
        Self::new(DEFAULT_SHARDS)
    }
}

impl core::fmt::Debug for MultiPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MultiPool")
            .field("shards", &self.size)
            .field("initialized", &self.shards.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::RoundRobinSelector;

    fn filled(len: usize) -> ByteBuf {
        let mut buf = ByteBuf::new();
        buf.write(&vec![b'x'; len]).expect("写入");
        buf
    }

    #[test]
    fn zero_shards_fall_back_to_default() {
        assert_eq!(MultiPool::new(0).shards(), 16);
        assert_eq!(MultiPool::default().shards(), 16);
    }

    #[test]
    fn shards_are_created_lazily() {
        let pool = MultiPool::new(4);
        assert!(format!("{pool:?}").contains("initialized: false"));
        let _ = pool.get();
        assert!(format!("{pool:?}").contains("initialized: true"));
        assert_eq!(pool.shard_lens(), vec![0; 4]);
    }

    #[test]
    fn put_releases_memory_and_spreads_across_shards() {
        let pool = MultiPool::new(3).with_selector(RoundRobinSelector::new());
        for len in 1..=6 {
            pool.put(filled(len));
        }
        assert_eq!(pool.shard_lens(), vec![2, 2, 2]);

        let buf = pool.get();
        assert_eq!(buf.capacity(), 0, "归还时已释放内存");
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn unallocated_buffers_are_dropped() {
        let pool = MultiPool::new(2);
        pool.put(ByteBuf::new());
        assert!(pool.is_empty());
    }

    #[test]
    fn from_config_validates_shards() {
        assert!(matches!(
            MultiPool::from_config(&MultiPoolConfig { shards: 0 }),
            Err(ConfigError::ZeroShards)
        ));
        let pool = MultiPool::from_config(&MultiPoolConfig { shards: 8 }).expect("合法配置");
        assert_eq!(pool.shards(), 8);
    }
}
