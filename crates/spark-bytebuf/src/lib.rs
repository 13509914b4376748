//! `spark-bytebuf` 提供显式管理内存生命周期的可增长字节缓冲，以及分层的缓冲复用池。
//!
//! # 模块定位（Why）
//! - 编码、序列化等热路径反复“写满 → 交付 → 丢弃”缓冲，分配器往返成本不可忽视；
//! - [`ByteBuf`] 自己掌控 `alloc`/`realloc`/`dealloc`，扩容策略、拷贝策略与释放时机都可预测；
//! - 三级复用池在不同并发强度下摊薄分配成本：
//!   [`Pool`]（无界自由链表）、[`LbPool`]（有界环形槽位 + 释放因子）、
//!   [`MultiPool`]（随机分片，分散锁竞争）。
//!
//! # 设计概要（How）
//! - 所有权即契约：`put` 按值接收缓冲，归还后原持有者在编译期即无法再访问；
//! - 观测（[`PoolMetrics`]）、序列化（[`MarshalTo`]）、分片选择（[`ShardSelector`]）均为 trait，
//!   以显式注入的方式接入，默认实现为空操作或均匀随机；
//! - 进程级默认池集中在 [`global`] 模块，只在显式调用时才会创建。
//!
//! # 快速上手
//! ```
//! use spark_bytebuf::{ByteBuf, Pool};
//!
//! let pool = Pool::new();
//! let mut buf = pool.get();
//! buf.write_string("foo")?;
//! buf.write_int(42)?;
//! assert_eq!(buf.to_str()?, "foo42");
//! pool.put(buf);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod buffer;
mod config;
mod copy;
mod error;
pub mod global;
mod lb_pool;
mod marshal;
mod metrics;
mod multi_pool;
mod pool;
mod selector;

pub use buffer::ByteBuf;
pub use config::{
    DEFAULT_LB_POOL_SIZE, DEFAULT_SHARDS, LbPoolConfig, MultiPoolConfig, PoolConfig,
};
pub use error::{BoxError, ByteBufError, ConfigError, ErrorKind, Result};
pub use lb_pool::{LbPool, LbPoolStats};
pub use marshal::MarshalTo;
pub use metrics::{CallbackMetrics, NoopMetrics, PoolMetrics};
pub use multi_pool::MultiPool;
pub use pool::Pool;
pub use selector::{RandomSelector, RoundRobinSelector, ShardSelector};
