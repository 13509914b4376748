use core::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// 多池的分片选择策略。
///
/// # 契约说明（What）
/// - `select` 在 `shards > 0` 时被调用，返回值会再对 `shards` 取模，越界不会导致 panic；
/// - 实现需线程安全，每次 `get`/`put` 都会调用一次。
pub trait ShardSelector: Send + Sync {
    fn select(&self, shards: usize) -> usize;
}

/// 默认策略：每次调用均匀随机地挑选分片。
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomSelector;

impl ShardSelector for RandomSelector {
    fn select(&self, shards: usize) -> usize {
        rand::rng().random_range(0..shards)
    }
}

/// 确定性的轮询策略，主要供测试注入。
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    next: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShardSelector for RoundRobinSelector {
    fn select(&self, shards: usize) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % shards
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_cycles_through_every_shard() {
        let selector = RoundRobinSelector::new();
        let picks: Vec<usize> = (0..7).map(|_| selector.select(3)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn random_stays_in_range() {
        let selector = RandomSelector;
        for _ in 0..1_000 {
            assert!(selector.select(5) < 5);
        }
        assert_eq!(selector.select(1), 0);
    }
}
