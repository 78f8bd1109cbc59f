// crates/sg_workflow/src/error.rs

//! 驱动器错误

use sg_config::ConfigError;
use sg_foundation::SgError;
use thiserror::Error;

use crate::driver::DriverState;

/// 驱动器错误
#[derive(Debug, Error)]
pub enum DriverError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 计算或数据错误
    #[error("{0}")]
    Foundation(#[from] SgError),

    /// 数据源在完成全部时间步前耗尽
    #[error("数据源耗尽: 需要 {requested} 个时间步, 仅完成 {completed} 个")]
    SourceExhausted {
        /// 请求的时间步数
        requested: usize,
        /// 已完成的时间步数
        completed: usize,
    },

    /// 运行被取消
    #[error("运行在完成 {completed} 个时间步后被取消")]
    Cancelled {
        /// 已完成的时间步数
        completed: usize,
    },

    /// 状态不允许该操作
    #[error("驱动器状态错误: 期望 {expected}, 实际 {actual:?}")]
    InvalidState {
        /// 期望状态
        expected: &'static str,
        /// 实际状态
        actual: DriverState,
    },
}

/// 驱动器结果类型
pub type DriverResult<T> = Result<T, DriverError>;
