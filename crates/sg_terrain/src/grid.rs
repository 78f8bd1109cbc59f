// crates/sg_terrain/src/grid.rs

//! 规则经纬度网格
//!
//! 网格由一维经度、纬度坐标数组定义，每个轴各自严格单调
//! （递增或递减均可）。定义在网格上的场以 `[lat, lon]` 行优先存储。

use sg_foundation::ensure;
use sg_foundation::error::{SgError, SgResult};

/// 坐标轴方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// 严格递增
    Ascending,
    /// 严格递减
    Descending,
}

impl AxisOrder {
    /// 检查坐标数组的单调性
    ///
    /// 空数组、非有限值或非严格单调时返回错误。单元素数组视为递增。
    pub fn detect(name: &str, coords: &[f64]) -> SgResult<Self> {
        if coords.is_empty() {
            return Err(SgError::invalid_grid(format!("{name} 坐标为空")));
        }
        if let Some(i) = coords.iter().position(|c| !c.is_finite()) {
            return Err(SgError::invalid_grid(format!(
                "{name} 坐标第 {i} 项非有限值: {}",
                coords[i]
            )));
        }
        if coords.len() == 1 {
            return Ok(Self::Ascending);
        }

        if coords.windows(2).all(|w| w[1] > w[0]) {
            Ok(Self::Ascending)
        } else if coords.windows(2).all(|w| w[1] < w[0]) {
            Ok(Self::Descending)
        } else {
            Err(SgError::invalid_grid(format!("{name} 坐标非严格单调")))
        }
    }
}

/// 规则经纬度网格
#[derive(Debug, Clone, PartialEq)]
pub struct RectilinearGrid {
    lon: Vec<f64>,
    lat: Vec<f64>,
    lon_order: AxisOrder,
    lat_order: AxisOrder,
}

impl RectilinearGrid {
    /// 从坐标数组创建网格
    pub fn new(lon: Vec<f64>, lat: Vec<f64>) -> SgResult<Self> {
        let lon_order = AxisOrder::detect("lon", &lon)?;
        let lat_order = AxisOrder::detect("lat", &lat)?;
        Ok(Self {
            lon,
            lat,
            lon_order,
            lat_order,
        })
    }

    /// 按范围和间距创建等间距递增网格
    ///
    /// 端点包含 `min`，在不超过 `max` 的前提下尽量覆盖整个范围。
    pub fn uniform(
        lon_min: f64,
        lon_max: f64,
        lat_min: f64,
        lat_max: f64,
        spacing: f64,
    ) -> SgResult<Self> {
        ensure!(
            spacing > 0.0,
            SgError::invalid_grid(format!("网格间距必须为正: {spacing}"))
        );
        let lon = uniform_axis("lon", lon_min, lon_max, spacing)?;
        let lat = uniform_axis("lat", lat_min, lat_max, spacing)?;
        Self::new(lon, lat)
    }

    /// 经度坐标
    #[inline]
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// 纬度坐标
    #[inline]
    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// 经度方向点数
    #[inline]
    pub fn n_lon(&self) -> usize {
        self.lon.len()
    }

    /// 纬度方向点数
    #[inline]
    pub fn n_lat(&self) -> usize {
        self.lat.len()
    }

    /// 场形状 (n_lat, n_lon)
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// 单元总数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.lat.len() * self.lon.len()
    }

    /// 经度轴方向
    #[inline]
    pub fn lon_order(&self) -> AxisOrder {
        self.lon_order
    }

    /// 纬度轴方向
    #[inline]
    pub fn lat_order(&self) -> AxisOrder {
        self.lat_order
    }

    /// 经纬度范围 (lon_min, lon_max, lat_min, lat_max)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let (lon_a, lon_b) = (self.lon[0], self.lon[self.lon.len() - 1]);
        let (lat_a, lat_b) = (self.lat[0], self.lat[self.lat.len() - 1]);
        (lon_a.min(lon_b), lon_a.max(lon_b), lat_a.min(lat_b), lat_a.max(lat_b))
    }
}

fn uniform_axis(name: &str, min: f64, max: f64, spacing: f64) -> SgResult<Vec<f64>> {
    ensure!(
        min.is_finite() && max.is_finite() && min <= max,
        SgError::invalid_grid(format!("{name} 范围无效: [{min}, {max}]"))
    );
    // 1e-9 吸收浮点误差，使 (max - min) 恰为整数倍间距时包含 max
    let n = ((max - min) / spacing + 1e-9).floor() as usize + 1;
    Ok((0..n).map(|i| min + i as f64 * spacing).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_order_detection() {
        assert_eq!(AxisOrder::detect("lon", &[0.0, 1.0, 2.0]).unwrap(), AxisOrder::Ascending);
        assert_eq!(AxisOrder::detect("lat", &[2.0, 1.0, 0.0]).unwrap(), AxisOrder::Descending);
        assert_eq!(AxisOrder::detect("lat", &[5.0]).unwrap(), AxisOrder::Ascending);
    }

    #[test]
    fn test_non_monotonic_rejected() {
        assert!(RectilinearGrid::new(vec![0.0, 2.0, 1.0], vec![0.0, 1.0]).is_err());
        assert!(RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 0.0]).is_err());
        assert!(RectilinearGrid::new(vec![], vec![0.0]).is_err());
        assert!(RectilinearGrid::new(vec![0.0, f64::NAN], vec![0.0]).is_err());
    }

    #[test]
    fn test_uniform_grid() {
        let grid = RectilinearGrid::uniform(-67.0, -66.0, 18.0, 18.5, 0.25).unwrap();
        assert_eq!(grid.n_lon(), 5);
        assert_eq!(grid.n_lat(), 3);
        assert_eq!(grid.shape(), (3, 5));
        assert!((grid.lon()[4] - (-66.0)).abs() < 1e-12);
        assert!((grid.lat()[2] - 18.5).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_rejects_bad_spacing() {
        assert!(RectilinearGrid::uniform(0.0, 1.0, 0.0, 1.0, 0.0).is_err());
        assert!(RectilinearGrid::uniform(1.0, 0.0, 0.0, 1.0, 0.1).is_err());
        assert!(RectilinearGrid::uniform(0.0, 1.0, 0.0, 1.0, f64::NAN).is_err());
        assert!(matches!(
            RectilinearGrid::uniform(0.0, f64::INFINITY, 0.0, 1.0, 0.1),
            Err(SgError::InvalidGrid { .. })
        ));
    }

    #[test]
    fn test_bounds_descending() {
        let grid = RectilinearGrid::new(vec![0.0, 1.0], vec![18.5, 18.0]).unwrap();
        assert_eq!(grid.lat_order(), AxisOrder::Descending);
        assert_eq!(grid.bounds(), (0.0, 1.0, 18.0, 18.5));
    }
}
