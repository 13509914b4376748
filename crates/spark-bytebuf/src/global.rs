//! 进程级默认池。
//!
//! # 生命周期（What）
//! - 每个默认池都是一个 `OnceLock`：要么由 `install_*` 显式安装，要么在第一次访问时按默认配置创建；
//! - 安装只能成功一次且必须先于第一次访问，之后的安装请求会原样退回传入的池；
//! - 默认池在进程结束前不会被销毁，其中保存的缓冲也随进程一同回收。
//!
//! 库内部从不隐式使用这些默认池。需要隔离（例如测试、多租户）的调用方应自行构造池并传递引用。

use std::sync::OnceLock;

use tracing::debug;

use crate::{buffer::ByteBuf, lb_pool::LbPool, multi_pool::MultiPool, pool::Pool};

static SIMPLE_POOL: Pool = Pool::new();
static LB_POOL: OnceLock<LbPool> = OnceLock::new();
static MULTI_POOL: OnceLock<MultiPool> = OnceLock::new();

/// 默认的简单池。
pub fn simple_pool() -> &'static Pool {
    &SIMPLE_POOL
}

/// 默认的有界池；未安装时按 [`LbPoolConfig::default`](crate::LbPoolConfig) 创建（1000 槽位）。
pub fn lb_pool() -> &'static LbPool {
    LB_POOL.get_or_init(LbPool::default)
}

/// 安装默认有界池。已安装或已被访问过时返回 `Err(pool)`。
pub fn install_lb_pool(pool: LbPool) -> Result<&'static LbPool, LbPool> {
    LB_POOL.set(pool)?;
    debug!("installed process-wide lb pool");
    Ok(lb_pool())
}

/// 从默认有界池取出缓冲。
pub fn lb_acquire() -> ByteBuf {
    lb_pool().get()
}

/// 归还缓冲到默认有界池，返回是否被接收。
pub fn lb_release(buf: ByteBuf) -> bool {
    lb_pool().put(buf)
}

/// 默认的多池；未安装时按 16 个分片创建。
pub fn multi_pool() -> &'static MultiPool {
    MULTI_POOL.get_or_init(MultiPool::default)
}

/// 安装默认多池。已安装或已被访问过时返回 `Err(pool)`。
pub fn install_multi_pool(pool: MultiPool) -> Result<&'static MultiPool, MultiPool> {
    MULTI_POOL.set(pool)?;
    debug!("installed process-wide multi-pool");
    Ok(multi_pool())
}
