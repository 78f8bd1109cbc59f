// crates/sg_terrain/src/lib.rs

//! 网格与地形数据管理
//!
//! 提供规则经纬度网格、栅格场、重网格插值和坡度计算。
//!
//! # 模块
//!
//! - `grid`: 规则（直线）经纬度网格
//! - `raster`: 二维栅格场与多层场
//! - `interpolation`: 网格间空间插值（重网格）
//! - `slope`: 由高程计算坡度角
//! - `provider`: 静态数据提供者（高程、土深）

pub mod grid;
pub mod interpolation;
pub mod provider;
pub mod raster;
pub mod slope;

// 重导出常用类型
pub use grid::{AxisOrder, RectilinearGrid};
pub use interpolation::{regrid_field, RegridConfig, RegridMethod, Regridder};
pub use provider::{ElevationProvider, SoilDepthProvider};
pub use raster::{Field2, GriddedField, LayeredField};
pub use slope::{slope_angle, CoordinateUnits, EARTH_RADIUS};
