// crates/sg_config/src/lib.rs

//! SlopeGuard Config Layer
//!
//! 配置层，定义一次运行所需的全部参数（研究区网格、岩土常数、
//! 土层方案、掩膜阈值、输出选项）。所有数值使用 f64 并可 JSON 序列化，
//! 由 `sg_workflow` 在初始化阶段转换为各计算模块的参数类型。
//!
//! # 模块概览
//!
//! - [`run_config`]: `RunConfig` 及其子配置
//! - [`error`]: 配置错误类型

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod run_config;

// 重导出核心类型
pub use error::ConfigError;
pub use run_config::{
    GridConfig, HydrologyConfig, LayerPolicy, MaskConfig, OutputConfig, RegridMethod, RunConfig,
    RunSettings, StabilityConfig,
};
