//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义缓冲与复用池对外暴露的错误语义，保证调用方能够精确区分
//!   “分配失败”“负容量请求”“数据源违约”“缺失序列化对象”四类哨兵错误；
//! - 流式读写与序列化回调产生的下游错误原样透传，不在本层吞掉或改写。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 `thiserror::Error`，兼容 `std::error::Error` 生态；
//! - 任何错误都直接返回给调用方：本 crate 不做自动重试，也不在内部打印日志；
//! - [`ByteBufError::kind`] 提供无字段的 [`ErrorKind`]，便于在不解构上下文的前提下做分支判断。

use std::{error::Error as StdError, io};

use thiserror::Error;

/// 序列化回调返回的动态错误。
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// 缓冲操作的统一结果别名。
pub type Result<T, E = ByteBufError> = core::result::Result<T, E>;

/// 缓冲层错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把四类哨兵错误与两类透传错误放在同一枚举中，调用方可以用 `?` 一路传播；
/// - **契约 (What)**：
///   - `BadAlloc`、`NegativeCap`、`NilMarshaler` 失败时缓冲的 `len`/`cap` 与调用前一致；
///   - `InvalidRead` 与 `Io` 出现在 `read_from` 中途时，之前已读入的字节保留在缓冲内；
/// - **风险 (Trade-offs)**：`Io`/`Marshal` 携带外部错误对象，因此本枚举不实现 `Clone`/`PartialEq`，
///   测试中请使用 [`ByteBufError::kind`] 断言。
#[derive(Debug, Error)]
pub enum ByteBufError {
    /// 分配器无法满足指定大小的请求，或请求大小超出地址空间上限。
    #[error("bad alloc on buffer init or grow: {requested} bytes requested")]
    BadAlloc { requested: usize },

    /// 请求的目标容量为负数，在任何分配动作之前即被拒绝。
    #[error("negative cap on the grow: {requested}")]
    NegativeCap { requested: isize },

    /// 数据源报告的读取字节数超出了交给它的目标区域。
    ///
    /// `usize` 无法表达负数，因此“读到的比给出的还多”是唯一仍可检测的计数违约。
    #[doc(alias = "NegativeRead")]
    #[error("reader returned invalid count from read: {reported} reported, {available} available")]
    InvalidRead { reported: usize, available: usize },

    /// `write_marshaler_to` 未收到序列化对象。
    #[error("marshaller object is nil")]
    NilMarshaler,

    /// 流式数据源或数据汇返回的错误。
    #[error("stream i/o failed: {0}")]
    Io(#[from] io::Error),

    /// 序列化对象在写入缓冲时失败。
    #[error("marshaller failed: {0}")]
    Marshal(#[source] BoxError),
}

/// [`ByteBufError`] 的无字段分类，用于稳定的分支判断。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    BadAlloc,
    NegativeCap,
    /// 数据源计数违约，对应 [`ByteBufError::InvalidRead`]。
    #[doc(alias = "NegativeRead")]
    InvalidRead,
    NilMarshaler,
    Io,
    Marshal,
}

impl ByteBufError {
    /// 返回错误所属的分类。
    pub fn kind(&self) -> ErrorKind {
        match self {
            ByteBufError::BadAlloc { .. } => ErrorKind::BadAlloc,
            ByteBufError::NegativeCap { .. } => ErrorKind::NegativeCap,
            ByteBufError::InvalidRead { .. } => ErrorKind::InvalidRead,
            ByteBufError::NilMarshaler => ErrorKind::NilMarshaler,
            ByteBufError::Io(_) => ErrorKind::Io,
            ByteBufError::Marshal(_) => ErrorKind::Marshal,
        }
    }
}

/// 让 `std::io::Write` 实现可以把缓冲错误折算为 `io::Error`。
impl From<ByteBufError> for io::Error {
    fn from(err: ByteBufError) -> Self {
        match err {
            ByteBufError::Io(inner) => inner,
            ByteBufError::BadAlloc { .. } => io::Error::new(io::ErrorKind::OutOfMemory, err),
            ByteBufError::NegativeCap { .. } | ByteBufError::NilMarshaler => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            ByteBufError::InvalidRead { .. } => io::Error::new(io::ErrorKind::InvalidData, err),
            ByteBufError::Marshal(_) => io::Error::other(err),
        }
    }
}

/// 池配置解析与校验错误。
///
/// - **意图 (Why)**：配置来自 TOML 文本或代码构造，二者共用同一套校验；
/// - **契约 (What)**：校验失败时不会构造任何池实例。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 有界池的槽位数必须大于 0。
    #[error("bounded pool size must be greater than zero")]
    ZeroPoolSize,

    /// 释放因子必须是 `[0.0, 1.0]` 内的有限数。
    #[error("release factor must be within [0.0, 1.0], got {0}")]
    InvalidReleaseFactor(f32),

    /// 多池的分片数必须大于 0。
    #[error("multi-pool shard count must be greater than zero")]
    ZeroShards,

    /// TOML 文本无法解析。
    #[error("failed to parse pool configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
