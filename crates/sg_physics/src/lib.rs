// crates/sg_physics/src/lib.rs

//! 物理计算模块
//!
//! 提供滑坡易发性计算的两个物理环节：
//! - 土层水文 (hydrology): 由分层土壤含水量计算等效饱和水深
//! - 坡体稳定性 (stability): 无限坡安全系数、有效性掩膜与易发性
//!
//! 两者都是逐单元的纯函数，不持有跨时间步状态。

pub mod hydrology;
pub mod stability;

// 重导出常用类型
pub use hydrology::{LayerThicknessPolicy, SoilProfile};
pub use stability::{
    safety_factor, SafetyFactorCalculator, StabilityClass, StabilityField, StabilityParams,
    ValidityMask,
};
