// crates/sg_io/src/timeseries.rs

//! 时间序列表
//!
//! 每个时间步追加一行 `{时间, 平均降水, 各层平均含水量}`，行一旦追加
//! 不再修改。支持导出为 CSV：
//!
//! ```text
//! timestamp,mean_precipitation,mean_swvl1,mean_swvl2,mean_swvl3,mean_swvl4
//! 2017-09-20T00:00:00Z,0.0012,0.31,0.30,0.28,0.27
//! ```
//!
//! 缺测均值（整场 NaN）在 CSV 中写为空字段。

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sg_foundation::error::SgResult;

use crate::error::IoError;

/// 时间序列行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    /// 时间
    pub timestamp: DateTime<Utc>,
    /// 平均降水 [m]
    pub mean_precipitation: f64,
    /// 各层平均体积含水量
    pub mean_soil_water: Vec<f64>,
}

/// 只追加的时间序列表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeSeriesTable {
    n_layers: usize,
    rows: Vec<TimeSeriesRow>,
}

impl TimeSeriesTable {
    /// 创建空表
    pub fn new(n_layers: usize) -> Self {
        Self {
            n_layers,
            rows: Vec::new(),
        }
    }

    /// 追加一行
    pub fn push(&mut self, row: TimeSeriesRow) -> SgResult<()> {
        if row.mean_soil_water.len() != self.n_layers {
            return Err(IoError::LayerCountMismatch {
                expected: self.n_layers,
                actual: row.mean_soil_water.len(),
            }
            .into());
        }
        self.rows.push(row);
        Ok(())
    }

    /// 层数
    pub fn n_layers(&self) -> usize {
        self.n_layers
    }

    /// 所有行
    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    /// 行数
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 最后一行
    pub fn last(&self) -> Option<&TimeSeriesRow> {
        self.rows.last()
    }

    /// 平均降水序列
    pub fn precipitation_series(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.mean_precipitation).collect()
    }

    /// 第 `layer` 层平均含水量序列
    pub fn soil_water_series(&self, layer: usize) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| r.mean_soil_water.get(layer).copied().unwrap_or(f64::NAN))
            .collect()
    }

    /// CSV 表头
    pub fn csv_header(&self) -> String {
        let mut header = String::from("timestamp,mean_precipitation");
        for layer in 1..=self.n_layers {
            let _ = write!(header, ",mean_swvl{layer}");
        }
        header
    }

    /// 导出为 CSV 字符串
    pub fn to_csv_string(&self) -> String {
        let mut out = self.csv_header();
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true));
            out.push(',');
            out.push_str(&csv_value(row.mean_precipitation));
            for &v in &row.mean_soil_water {
                out.push(',');
                out.push_str(&csv_value(v));
            }
            out.push('\n');
        }
        out
    }

    /// 写出 CSV 文件
    pub fn write_csv(&self, path: &Path) -> SgResult<()> {
        fs::write(path, self.to_csv_string())?;
        log::info!("写出时间序列 {} ({} 行)", path.display(), self.rows.len());
        Ok(())
    }
}

fn csv_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}
