use spin::Mutex;

use crate::buffer::ByteBuf;

/// `Pool` 是基于自由链表（Free List）的无界缓冲池。
///
/// # 模块角色（Why）
/// - 为“取出 → 写入 → 交付 → 归还”的循环提供最简单的复用入口，省去 `ByteBuf` 结构体本身的构造；
/// - 作为 [`MultiPool`](crate::MultiPool) 的分片实现，每个分片是一个独立的锁域。
///
/// # 核心机制（How）
/// - 内部维护 `spin::Mutex<Vec<ByteBuf>>`，`get` 弹出栈顶，栈空时构造新的空缓冲；
/// - `put` 先 [`ByteBuf::reset`] 释放内存再入栈：即使某次使用把缓冲撑得很大，
///   池也不会长期占住这块内存；缓冲记住的容量让下一次首写一步分配到位。
///
/// # 契约说明（What）
/// - **线程安全**：`get`/`put` 可被任意线程并发调用，不保证返回哪一个已存缓冲；
/// - **所有权**：`put` 按值接收缓冲，归还后调用方在编译期就无法再触碰它；
/// - **容量匹配**：不按请求大小挑选缓冲。
///
/// # 设计权衡（Trade-offs）
/// - 使用自旋锁而非 `parking_lot::Mutex`：临界区只有一次 `push`/`pop`，持锁时间极短；
/// - 池无上限，长期峰值流量后可调用 [`Pool::shrink_to_fit`] 丢弃积压的缓冲壳。
#[derive(Default)]
pub struct Pool {
    free_list: Mutex<Vec<ByteBuf>>,
}

impl Pool {
    /// 创建空池；`const` 以便直接用于 `static`。
    pub const fn new() -> Self {
        Self {
            free_list: Mutex::new(Vec::new()),
        }
    }

    /// 取出一个已存缓冲，池空时返回新的空缓冲。
    pub fn get(&self) -> ByteBuf {
        self.free_list.lock().pop().unwrap_or_default()
    }

    /// 归还缓冲。
    ///
    /// 从未分配过（或已被 [`ByteBuf::release`] 完全拆除）的缓冲直接丢弃。
    pub fn put(&self, mut buf: ByteBuf) {
        if buf.capacity() == 0 {
            return;
        }
        buf.reset();
        self.store(buf);
    }

    /// 当前保存的缓冲数量。
    pub fn len(&self) -> usize {
        self.free_list.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 丢弃全部已存缓冲，返回丢弃的数量。
    pub fn shrink_to_fit(&self) -> usize {
        let mut list = self.free_list.lock();
        let dropped = list.len();
        list.clear();
        list.shrink_to_fit();
        dropped
    }

    /// 直接入栈，不做检查与重置；调用方负责先释放缓冲内存。
    pub(crate) fn store(&self, buf: ByteBuf) {
        self.free_list.lock().push(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_stored_buffer_with_remembered_capacity() {
        let pool = Pool::new();
        let mut buf = pool.get();
        buf.write(&[1u8; 100]).expect("写入");
        pool.put(buf);
        assert_eq!(pool.len(), 1);

        let mut reused = pool.get();
        assert!(pool.is_empty());
        assert_eq!(reused.capacity(), 0, "归还时内存已释放");
        assert!(reused.is_empty());
        reused.write(b"z").expect("再次写入");
        assert_eq!(reused.capacity(), 200, "按记住的容量重新分配");
    }

    #[test]
    fn unallocated_buffers_are_not_stored() {
        let pool = Pool::new();
        pool.put(ByteBuf::new());
        let mut released = ByteBuf::new();
        released.write(b"abc").expect("写入");
        released.release();
        pool.put(released);
        assert!(pool.is_empty());
    }

    #[test]
    fn shrink_to_fit_drops_everything() {
        let pool = Pool::new();
        for _ in 0..3 {
            let mut buf = ByteBuf::new();
            buf.write(b"abc").expect("写入");
            pool.put(buf);
        }
        assert_eq!(pool.shrink_to_fit(), 3);
        assert!(pool.is_empty());
    }
}
