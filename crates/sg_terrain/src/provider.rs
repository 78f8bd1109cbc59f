// crates/sg_terrain/src/provider.rs

//! 静态数据提供者
//!
//! 抽象高程与土深数据的获取接口。两者在一次运行中只读取一次，
//! 与时间无关。

use sg_foundation::error::SgResult;

use crate::raster::GriddedField;

/// 高程数据提供者 trait
pub trait ElevationProvider {
    /// 获取高程场 [m] 及其网格
    fn elevation(&self) -> SgResult<GriddedField>;
}

/// 土深数据提供者 trait
pub trait SoilDepthProvider {
    /// 获取土深场 [m] 及其网格
    fn soil_depth(&self) -> SgResult<GriddedField>;
}

impl ElevationProvider for GriddedField {
    fn elevation(&self) -> SgResult<GriddedField> {
        Ok(self.clone())
    }
}

impl SoilDepthProvider for GriddedField {
    fn soil_depth(&self) -> SgResult<GriddedField> {
        Ok(self.clone())
    }
}
