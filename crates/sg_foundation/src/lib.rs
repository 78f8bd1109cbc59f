// crates/sg_foundation/src/lib.rs

//! SlopeGuard Foundation Layer
//!
//! 基础层，提供整个项目共享的错误类型和统计工具。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `SgError` 与 `SgResult`
//! - [`stats`]: 跳过 NaN 的栅格统计
//!
//! # 示例
//!
//! ```
//! use sg_foundation::error::{SgError, SgResult};
//! use sg_foundation::stats::FieldStatistics;
//!
//! fn check(n: usize) -> SgResult<()> {
//!     SgError::check_size("layers", 4, n)
//! }
//!
//! assert!(check(4).is_ok());
//! let stats = FieldStatistics::from_values(&[1.0, f64::NAN, 3.0]);
//! assert_eq!(stats.valid_count, 2);
//! assert!((stats.mean - 2.0).abs() < 1e-12);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod stats;

// 重导出常用类型
pub use error::{SgError, SgResult};
pub use stats::FieldStatistics;
