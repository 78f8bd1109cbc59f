// crates/sg_foundation/src/stats.rs

//! 栅格统计
//!
//! 所有统计量跳过 NaN（缺测）单元。

use serde::{Deserialize, Serialize};

/// 栅格统计信息
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    /// 总单元数
    pub n_cells: usize,
    /// 有效（非 NaN）单元数
    pub valid_count: usize,
    /// 最小值
    pub min: f64,
    /// 最大值
    pub max: f64,
    /// 平均值
    pub mean: f64,
}

impl Default for FieldStatistics {
    fn default() -> Self {
        Self {
            n_cells: 0,
            valid_count: 0,
            min: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
        }
    }
}

impl FieldStatistics {
    /// 从数值计算统计量
    ///
    /// 没有有效单元时 min/max/mean 为 NaN。
    pub fn from_values(values: &[f64]) -> Self {
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut valid = 0usize;

        for &v in values {
            if v.is_nan() {
                continue;
            }
            sum += v;
            min = min.min(v);
            max = max.max(v);
            valid += 1;
        }

        if valid == 0 {
            return Self {
                n_cells: values.len(),
                ..Default::default()
            };
        }

        Self {
            n_cells: values.len(),
            valid_count: valid,
            min,
            max,
            mean: sum / valid as f64,
        }
    }

    /// 缺测单元数
    #[inline]
    pub fn missing_count(&self) -> usize {
        self.n_cells - self.valid_count
    }

    /// 是否存在有效单元
    #[inline]
    pub fn has_valid(&self) -> bool {
        self.valid_count > 0
    }
}
