// crates/sg_workflow/src/lib.rs

//! SlopeGuard 时间步驱动模块
//!
//! 将重网格、地下流水深与安全系数计算串联为逐时间步的运行流程。
//!
//! # 模块结构
//!
//! - [`settings`]: 由运行配置得到的驱动器参数
//! - [`driver`]: 时间步状态机
//! - [`cancel`]: 取消令牌
//! - [`error`]: 驱动器错误
//!
//! # 示例
//!
//! ```rust,ignore
//! use sg_workflow::{CancelToken, Driver, DriverSettings};
//!
//! let settings = DriverSettings::from_config(&config)?;
//! let mut driver = Driver::new(settings);
//! driver.initialize(&elevation, &soil_depth)?;
//! let summary = driver.run(&mut forcing, &mut sink, &CancelToken::new())?;
//! driver.series().write_csv(Path::new("series.csv"))?;
//! ```

pub mod cancel;
pub mod driver;
pub mod error;
pub mod settings;

// 重导出核心类型
pub use cancel::CancelToken;
pub use driver::{
    Driver, DriverState, ReferenceSnapshot, RunSummary, StaticFields, StepOutput, StepReport,
};
pub use error::{DriverError, DriverResult};
pub use settings::DriverSettings;
