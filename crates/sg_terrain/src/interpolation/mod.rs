// crates/sg_terrain/src/interpolation/mod.rs

//! 插值模块
//!
//! 提供规则网格之间的空间插值（重网格）。
//!
//! | 方法 | 权重数 | 光滑性 | 适用场景 |
//! |------|-------|--------|---------|
//! | Nearest | 1 | 低 | 分类数据、保持原值 |
//! | Bilinear | ≤4 | 中 | 连续场（降水、土壤水、土深） |

pub mod regrid;

pub use regrid::{regrid_field, RegridConfig, RegridMethod, Regridder};
