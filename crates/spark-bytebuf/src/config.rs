//! # config 模块说明
//!
//! ## 角色定位（Why）
//! - 有界池的槽位数与释放因子、多池的分片数都属于部署期调优参数，
//!   需要既能在代码中直接构造，也能从 TOML 配置文件加载；
//! - 两条路径共用同一套 `validate`，避免“文件里合法、代码里非法”的分叉。
//!
//! ## 配置形态（What）
//! ```toml
//! [lb]
//! size = 1000
//! release_factor = 0.25
//!
//! [multi]
//! shards = 16
//! ```
//! 缺省字段取默认值：`size = 1000`、`release_factor = 0.0`、`shards = 16`。

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 有界池默认保留的缓冲数量。
pub const DEFAULT_LB_POOL_SIZE: usize = 1000;
/// 多池默认分片数。
pub const DEFAULT_SHARDS: usize = 16;

/// 有界（负载均衡）池的配置。
///
/// - `size`：最多保留的缓冲数量；
/// - `release_factor`：池已满时淘汰最旧缓冲、为新归还者腾位的概率，
///   `0.0` 表示从不淘汰（新归还者直接释放），`1.0` 表示总是淘汰。
///
/// 释放因子只决定环满时释放的是最旧的缓冲还是新归还的缓冲，每次溢出都恰好释放一个；
/// 池内保留的缓冲数量始终以 `size` 为上限，不随释放因子变化。
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LbPoolConfig {
    pub size: usize,
    pub release_factor: f32,
}

impl Default for LbPoolConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_LB_POOL_SIZE,
            release_factor: 0.0,
        }
    }
}

impl LbPoolConfig {
    pub fn new(size: usize, release_factor: f32) -> Self {
        Self {
            size,
            release_factor,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::ZeroPoolSize);
        }
        if !(0.0..=1.0).contains(&self.release_factor) {
            // NaN 同样无法落入区间。
            return Err(ConfigError::InvalidReleaseFactor(self.release_factor));
        }
        Ok(())
    }
}

/// 多池配置。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MultiPoolConfig {
    pub shards: usize,
}

impl Default for MultiPoolConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
        }
    }
}

impl MultiPoolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shards == 0 {
            return Err(ConfigError::ZeroShards);
        }
        Ok(())
    }
}

/// 池层整体配置。
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    pub lb: LbPoolConfig,
    pub multi: MultiPoolConfig,
}

impl PoolConfig {
    /// 解析并校验 TOML 文本。
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PoolConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lb.validate()?;
        self.multi.validate()
    }
}
