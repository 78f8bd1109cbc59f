// crates/sg_io/src/source/synthetic.rs

//! 确定性合成数据
//!
//! 无需下载数据即可演示完整流程：
//!
//! - [`SyntheticTerrain`]: 椭圆形岛屿高程，海面平坦，海区土深超过开阔
//!   水体阈值；
//! - [`SyntheticForcingSource`]: 单峰风暴过程，降水呈高斯脉冲，各层含水量
//!   随累计降雨按逻辑斯蒂曲线上升，深层响应较弱。
//!
//! 所有值都是坐标和时间步的纯函数，同样的参数总是得到同样的结果。

use chrono::{DateTime, Utc};
use sg_foundation::error::SgResult;
use sg_terrain::{ElevationProvider, Field2, GriddedField, RectilinearGrid, SoilDepthProvider};

use super::{exhausted, ForcingSource, TimeMetadata, PRECIPITATION, SOIL_WATER_LAYERS};
use crate::error::IoError;

/// 合成岛屿地形
#[derive(Debug, Clone)]
pub struct SyntheticTerrain {
    grid: RectilinearGrid,
    /// 最高峰高程 [m]
    pub peak_elevation: f64,
    /// 海区土深 [m]
    pub sea_soil_depth: f64,
}

impl SyntheticTerrain {
    /// 在给定网格上创建
    pub fn new(grid: RectilinearGrid) -> Self {
        Self {
            grid,
            peak_elevation: 1300.0,
            sea_soil_depth: 2.5,
        }
    }

    /// 归一化半径平方，岛内小于 1
    fn radius_sq(&self, lon: f64, lat: f64) -> f64 {
        let (lon_min, lon_max, lat_min, lat_max) = self.grid.bounds();
        let c_lon = 0.5 * (lon_min + lon_max);
        let c_lat = 0.5 * (lat_min + lat_max);
        let a = (0.42 * (lon_max - lon_min)).max(f64::EPSILON);
        let b = (0.40 * (lat_max - lat_min)).max(f64::EPSILON);
        ((lon - c_lon) / a).powi(2) + ((lat - c_lat) / b).powi(2)
    }

    fn elevation_at(&self, lon: f64, lat: f64) -> f64 {
        let r2 = self.radius_sq(lon, lat);
        // 海面恰为 0
        if r2 >= 1.0 {
            0.0
        } else {
            self.peak_elevation * (1.0 - r2).powf(1.5)
        }
    }

    fn soil_depth_at(&self, lon: f64, lat: f64) -> f64 {
        let r2 = self.radius_sq(lon, lat);
        if r2 >= 1.0 {
            self.sea_soil_depth
        } else {
            // 山顶土层薄，海岸土层厚
            0.4 + 1.4 * r2
        }
    }

    fn build(&self, f: impl Fn(f64, f64) -> f64) -> SgResult<GriddedField> {
        let data = self
            .grid
            .lat()
            .iter()
            .flat_map(|&lat| self.grid.lon().iter().map(move |&lon| (lon, lat)))
            .map(|(lon, lat)| f(lon, lat))
            .collect();
        let field = Field2::from_vec(data, self.grid.n_lat(), self.grid.n_lon())?;
        GriddedField::new(self.grid.clone(), field)
    }
}

impl ElevationProvider for SyntheticTerrain {
    fn elevation(&self) -> SgResult<GriddedField> {
        self.build(|lon, lat| self.elevation_at(lon, lat))
    }
}

impl SoilDepthProvider for SyntheticTerrain {
    fn soil_depth(&self) -> SgResult<GriddedField> {
        self.build(|lon, lat| self.soil_depth_at(lon, lat))
    }
}

/// 合成风暴参数
#[derive(Debug, Clone, PartialEq)]
pub struct StormParams {
    /// 峰值小时降水 [m]
    pub peak_precipitation: f64,
    /// 峰值所在时间步
    pub peak_step: f64,
    /// 脉冲宽度 [步]
    pub width: f64,
    /// 各层初始含水量
    pub initial_moisture: [f64; 4],
    /// 各层风暴后含水量增量
    pub moisture_gain: [f64; 4],
}

impl Default for StormParams {
    fn default() -> Self {
        Self {
            peak_precipitation: 0.02,
            peak_step: 18.0,
            width: 6.0,
            initial_moisture: [0.22, 0.24, 0.26, 0.28],
            moisture_gain: [0.22, 0.18, 0.10, 0.04],
        }
    }
}

/// 合成强迫数据源
#[derive(Debug, Clone)]
pub struct SyntheticForcingSource {
    grid: RectilinearGrid,
    metadata: TimeMetadata,
    storm: StormParams,
    position: usize,
}

impl SyntheticForcingSource {
    /// 创建逐小时合成数据源
    pub fn new(grid: RectilinearGrid, start: DateTime<Utc>, n_steps: usize, storm: StormParams) -> Self {
        Self {
            grid,
            metadata: TimeMetadata::hourly(start, n_steps),
            storm,
            position: 0,
        }
    }

    /// 风暴参数
    pub fn storm(&self) -> &StormParams {
        &self.storm
    }

    /// 风暴中心自西向东移动，返回 [0, 1] 的空间权重
    fn spatial_weight(&self, step: usize, lon: f64, lat: f64) -> f64 {
        let (lon_min, lon_max, lat_min, lat_max) = self.grid.bounds();
        let span_lon = (lon_max - lon_min).max(f64::EPSILON);
        let span_lat = (lat_max - lat_min).max(f64::EPSILON);
        let progress = step as f64 / self.metadata.n_steps.max(1) as f64;
        let x = (lon - lon_min) / span_lon - progress;
        let y = (lat - lat_min) / span_lat - 0.5;
        (-(x * x + y * y) / 0.18).exp()
    }

    fn precipitation_at(&self, step: usize, lon: f64, lat: f64) -> f64 {
        let t = (step as f64 - self.storm.peak_step) / self.storm.width;
        self.storm.peak_precipitation * (-t * t).exp() * self.spatial_weight(step, lon, lat)
    }

    fn moisture_at(&self, layer: usize, step: usize, lon: f64, lat: f64) -> f64 {
        let t = (step as f64 - self.storm.peak_step) / self.storm.width;
        let wetting = 1.0 / (1.0 + (-t).exp());
        let local = 0.5 + 0.5 * self.spatial_weight(step, lon, lat);
        self.storm.initial_moisture[layer] + self.storm.moisture_gain[layer] * wetting * local
    }

    fn build(&self, f: impl Fn(f64, f64) -> f64) -> SgResult<GriddedField> {
        let data = self
            .grid
            .lat()
            .iter()
            .flat_map(|&lat| self.grid.lon().iter().map(move |&lon| (lon, lat)))
            .map(|(lon, lat)| f(lon, lat))
            .collect();
        let field = Field2::from_vec(data, self.grid.n_lat(), self.grid.n_lon())?;
        GriddedField::new(self.grid.clone(), field)
    }
}

impl ForcingSource for SyntheticForcingSource {
    fn metadata(&self) -> &TimeMetadata {
        &self.metadata
    }

    fn position(&self) -> usize {
        self.position
    }

    fn fetch(&self, variable: &str) -> SgResult<GriddedField> {
        let step = self.position;
        if step >= self.metadata.n_steps {
            return Err(exhausted(step, self.metadata.n_steps));
        }
        if variable == PRECIPITATION {
            return self.build(|lon, lat| self.precipitation_at(step, lon, lat));
        }
        match SOIL_WATER_LAYERS.iter().position(|&v| v == variable) {
            Some(layer) => self.build(|lon, lat| self.moisture_at(layer, step, lon, lat)),
            None => Err(IoError::UnknownVariable {
                variable: variable.to_string(),
            }
            .into()),
        }
    }

    fn advance(&mut self) -> SgResult<()> {
        if self.position >= self.metadata.n_steps {
            return Err(exhausted(self.position, self.metadata.n_steps));
        }
        self.position += 1;
        Ok(())
    }
}
