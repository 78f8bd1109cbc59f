// crates/sg_terrain/src/slope.rs

//! 坡度角计算
//!
//! 由高程场计算坡度角（弧度）。内部单元使用中心差分，边界单元使用
//! 单侧差分；某一方向只有一个点时该方向梯度为零。
//!
//! 经纬度坐标按平均地球半径换算为米，经度间距随纬度余弦缩放。

use sg_foundation::error::{SgError, SgResult};

use crate::grid::RectilinearGrid;
use crate::raster::Field2;

/// 地球平均半径 [m]
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// 网格坐标单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateUnits {
    /// 经纬度（度）
    #[default]
    Degrees,
    /// 投影坐标（米）
    Meters,
}

/// 计算坡度角 [rad]
///
/// 任一参与差分的高程为 NaN 时该单元坡度为 NaN。完全平坦的区域
/// 坡度恰为 0。
pub fn slope_angle(
    grid: &RectilinearGrid,
    elevation: &Field2,
    units: CoordinateUnits,
) -> SgResult<Field2> {
    SgError::check_shape("elevation", grid.shape(), elevation.shape())?;

    let (n_lat, n_lon) = grid.shape();
    let lon = grid.lon();
    let lat = grid.lat();

    let deg_to_m = EARTH_RADIUS * std::f64::consts::PI / 180.0;
    let mut slope = Field2::missing(n_lat, n_lon);
    let mut nan_count = 0usize;

    for i in 0..n_lat {
        let (lon_scale, lat_scale) = match units {
            CoordinateUnits::Degrees => (deg_to_m * lat[i].to_radians().cos(), deg_to_m),
            CoordinateUnits::Meters => (1.0, 1.0),
        };

        for j in 0..n_lon {
            let dz_dx = derivative(n_lon, j, |k| lon[k] * lon_scale, |k| value(elevation, i, k));
            let dz_dy = derivative(n_lat, i, |k| lat[k] * lat_scale, |k| value(elevation, k, j));

            let s = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan();
            if s.is_nan() {
                nan_count += 1;
            }
            slope.set(i, j, s);
        }
    }

    if nan_count > 0 {
        log::debug!("坡度计算: {} 个单元因高程缺测为 NaN", nan_count);
    }

    Ok(slope)
}

#[inline]
fn value(field: &Field2, i: usize, j: usize) -> f64 {
    field.get(i, j).unwrap_or(f64::NAN)
}

/// 沿一个轴的一阶导数
#[inline]
fn derivative(
    n: usize,
    k: usize,
    coord: impl Fn(usize) -> f64,
    z: impl Fn(usize) -> f64,
) -> f64 {
    if n < 2 {
        return 0.0;
    }
    let (a, b) = if k == 0 {
        (0, 1)
    } else if k == n - 1 {
        (n - 2, n - 1)
    } else {
        (k - 1, k + 1)
    };
    (z(b) - z(a)) / (coord(b) - coord(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_terrain_is_exactly_zero() {
        let grid = RectilinearGrid::uniform(-67.0, -66.9, 18.0, 18.1, 0.05).unwrap();
        let elevation = Field2::filled(grid.n_lat(), grid.n_lon(), 120.0);
        let slope = slope_angle(&grid, &elevation, CoordinateUnits::Degrees).unwrap();
        assert!(slope.values().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_planar_ramp_in_meters() {
        // z = x，坡度 45°
        let grid = RectilinearGrid::new(vec![0.0, 10.0, 20.0, 30.0], vec![0.0, 10.0, 20.0]).unwrap();
        let mut elevation = Field2::filled(3, 4, 0.0);
        for i in 0..3 {
            for j in 0..4 {
                elevation.set(i, j, grid.lon()[j]);
            }
        }
        let slope = slope_angle(&grid, &elevation, CoordinateUnits::Meters).unwrap();
        for &s in slope.values() {
            assert!((s - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
        }
    }

    #[test]
    fn test_degree_spacing_converted_to_meters() {
        // 沿纬度方向每 0.01° 升高 deg_to_m * 0.01 米，坡度 45°
        let grid = RectilinearGrid::new(vec![0.0], vec![0.0, 0.01, 0.02]).unwrap();
        let rise = EARTH_RADIUS * std::f64::consts::PI / 180.0 * 0.01;
        let elevation = Field2::from_vec(vec![0.0, rise, 2.0 * rise], 3, 1).unwrap();
        let slope = slope_angle(&grid, &elevation, CoordinateUnits::Degrees).unwrap();
        for &s in slope.values() {
            assert!((s - std::f64::consts::FRAC_PI_4).abs() < 1e-9);
        }
    }

    #[test]
    fn test_nan_elevation_propagates() {
        let grid = RectilinearGrid::new(vec![0.0, 1.0, 2.0], vec![0.0]).unwrap();
        let elevation = Field2::from_vec(vec![0.0, f64::NAN, 2.0], 1, 3).unwrap();
        let slope = slope_angle(&grid, &elevation, CoordinateUnits::Meters).unwrap();
        // 中心单元两侧高程有效
        assert!((slope.values()[1] - 1.0f64.atan()).abs() < 1e-12);
        assert!(slope.values()[0].is_nan());
        assert!(slope.values()[2].is_nan());
    }

    #[test]
    fn test_shape_mismatch() {
        let grid = RectilinearGrid::new(vec![0.0, 1.0], vec![0.0]).unwrap();
        let elevation = Field2::filled(2, 1, 0.0);
        assert!(slope_angle(&grid, &elevation, CoordinateUnits::Meters).is_err());
    }
}
