// crates/sg_terrain/src/raster.rs

//! 栅格场
//!
//! `Field2` 是 `[lat, lon]` 行优先存储的二维场，`LayeredField` 是按土层
//! 排列的同形状二维场序列，`GriddedField` 将场与其网格绑定。

use sg_foundation::error::{SgError, SgResult};
use sg_foundation::stats::FieldStatistics;

use crate::grid::RectilinearGrid;

/// 二维栅格场
#[derive(Debug, Clone, PartialEq)]
pub struct Field2 {
    data: Vec<f64>,
    n_lat: usize,
    n_lon: usize,
}

impl Field2 {
    /// 创建以常数填充的场
    pub fn filled(n_lat: usize, n_lon: usize, value: f64) -> Self {
        Self {
            data: vec![value; n_lat * n_lon],
            n_lat,
            n_lon,
        }
    }

    /// 创建以 NaN 填充的场
    pub fn missing(n_lat: usize, n_lon: usize) -> Self {
        Self::filled(n_lat, n_lon, f64::NAN)
    }

    /// 从行优先数据创建
    pub fn from_vec(data: Vec<f64>, n_lat: usize, n_lon: usize) -> SgResult<Self> {
        if data.len() != n_lat * n_lon {
            return Err(SgError::size_mismatch("field data", n_lat * n_lon, data.len()));
        }
        Ok(Self { data, n_lat, n_lon })
    }

    /// 从按行嵌套的数组创建
    pub fn from_rows(rows: &[Vec<f64>]) -> SgResult<Self> {
        let n_lat = rows.len();
        let n_lon = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_lat * n_lon);
        for row in rows {
            SgError::check_size("field row", n_lon, row.len())?;
            data.extend_from_slice(row);
        }
        Ok(Self { data, n_lat, n_lon })
    }

    /// 形状 (n_lat, n_lon)
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_lat, self.n_lon)
    }

    /// 纬度方向点数
    #[inline]
    pub fn n_lat(&self) -> usize {
        self.n_lat
    }

    /// 经度方向点数
    #[inline]
    pub fn n_lon(&self) -> usize {
        self.n_lon
    }

    /// 单元总数
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 获取单元值
    #[inline]
    pub fn get(&self, i_lat: usize, i_lon: usize) -> Option<f64> {
        if i_lat < self.n_lat && i_lon < self.n_lon {
            Some(self.data[i_lat * self.n_lon + i_lon])
        } else {
            None
        }
    }

    /// 设置单元值，越界时忽略
    #[inline]
    pub fn set(&mut self, i_lat: usize, i_lon: usize, value: f64) {
        if i_lat < self.n_lat && i_lon < self.n_lon {
            self.data[i_lat * self.n_lon + i_lon] = value;
        }
    }

    /// 行优先数据
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// 可变行优先数据
    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// 取出内部数据
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// 逐单元映射
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self {
            data: self.data.iter().map(|&v| f(v)).collect(),
            n_lat: self.n_lat,
            n_lon: self.n_lon,
        }
    }

    /// 与同形状场逐单元组合
    pub fn zip_map<F: Fn(f64, f64) -> f64>(&self, other: &Self, f: F) -> SgResult<Self> {
        SgError::check_shape("zip_map", self.shape(), other.shape())?;
        Ok(Self {
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
            n_lat: self.n_lat,
            n_lon: self.n_lon,
        })
    }

    /// 统计量（跳过 NaN）
    pub fn statistics(&self) -> FieldStatistics {
        FieldStatistics::from_values(&self.data)
    }

    /// 均值（跳过 NaN）
    pub fn mean(&self) -> f64 {
        self.statistics().mean
    }
}

/// 多层场，层顺序与土层顺序一致
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredField {
    layers: Vec<Field2>,
}

impl LayeredField {
    /// 从各层场创建，要求所有层形状一致且至少一层
    pub fn new(layers: Vec<Field2>) -> SgResult<Self> {
        let first = layers
            .first()
            .ok_or_else(|| SgError::invalid_input("多层场至少需要一层"))?;
        let shape = first.shape();
        for layer in &layers[1..] {
            SgError::check_shape("layer", shape, layer.shape())?;
        }
        Ok(Self { layers })
    }

    /// 层数
    #[inline]
    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    /// 每层形状
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.layers[0].shape()
    }

    /// 获取某一层
    #[inline]
    pub fn layer(&self, index: usize) -> Option<&Field2> {
        self.layers.get(index)
    }

    /// 所有层
    #[inline]
    pub fn layers(&self) -> &[Field2] {
        &self.layers
    }

    /// 逐层均值（跳过 NaN）
    pub fn layer_means(&self) -> Vec<f64> {
        self.layers.iter().map(Field2::mean).collect()
    }
}

/// 绑定网格的二维场
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedField {
    /// 网格
    pub grid: RectilinearGrid,
    /// 场
    pub field: Field2,
}

impl GriddedField {
    /// 创建并检查场形状与网格一致
    pub fn new(grid: RectilinearGrid, field: Field2) -> SgResult<Self> {
        SgError::check_shape("gridded field", grid.shape(), field.shape())?;
        Ok(Self { grid, field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_size_check() {
        assert!(Field2::from_vec(vec![0.0; 6], 2, 3).is_ok());
        assert!(Field2::from_vec(vec![0.0; 5], 2, 3).is_err());
    }

    #[test]
    fn test_row_major_indexing() {
        let field = Field2::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(field.shape(), (2, 3));
        assert_eq!(field.get(1, 0), Some(4.0));
        assert_eq!(field.get(0, 2), Some(3.0));
        assert_eq!(field.get(2, 0), None);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(Field2::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_err());
    }

    #[test]
    fn test_zip_map_shape_mismatch() {
        let a = Field2::filled(2, 2, 1.0);
        let b = Field2::filled(2, 3, 1.0);
        assert!(a.zip_map(&b, |x, y| x + y).is_err());
    }

    #[test]
    fn test_layered_field_requires_uniform_shape() {
        let ok = LayeredField::new(vec![Field2::filled(2, 2, 0.1), Field2::filled(2, 2, 0.2)]);
        assert_eq!(ok.unwrap().layer_means(), vec![0.1, 0.2]);

        let bad = LayeredField::new(vec![Field2::filled(2, 2, 0.1), Field2::filled(3, 2, 0.2)]);
        assert!(bad.is_err());
        assert!(LayeredField::new(Vec::new()).is_err());
    }

    #[test]
    fn test_gridded_field_shape_check() {
        let grid = RectilinearGrid::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0]).unwrap();
        assert!(GriddedField::new(grid.clone(), Field2::filled(2, 3, 0.0)).is_ok());
        assert!(GriddedField::new(grid, Field2::filled(3, 2, 0.0)).is_err());
    }
}
