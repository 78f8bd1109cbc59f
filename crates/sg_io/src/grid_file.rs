// crates/sg_io/src/grid_file.rs

//! JSON 网格文件
//!
//! 静态二维数据（高程、土深）的文件格式：
//!
//! ```json
//! {
//!   "lon": [-67.0, -66.9],
//!   "lat": [18.5, 18.4, 18.3],
//!   "units": "m",
//!   "values": [[1.0, 2.0], [null, 3.0], [4.0, 5.0]]
//! }
//! ```
//!
//! `values` 按纬度行排列，`null` 表示缺测（读入为 NaN）。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sg_foundation::error::{SgError, SgResult};
use sg_terrain::{ElevationProvider, Field2, GriddedField, RectilinearGrid, SoilDepthProvider};

use crate::error::IoError;

/// 网格文件内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridFile {
    /// 经度坐标
    pub lon: Vec<f64>,
    /// 纬度坐标
    pub lat: Vec<f64>,
    /// 单位标签
    #[serde(default)]
    pub units: Option<String>,
    /// 按纬度行排列的值
    pub values: Vec<Vec<Option<f64>>>,
}

impl GridFile {
    /// 从网格场构造
    pub fn from_gridded(gridded: &GriddedField, units: Option<&str>) -> Self {
        Self {
            lon: gridded.grid.lon().to_vec(),
            lat: gridded.grid.lat().to_vec(),
            units: units.map(str::to_string),
            values: rows_to_json(&gridded.field),
        }
    }

    /// 转换为网格场，检查秩与形状
    pub fn into_gridded(self, source: &str) -> SgResult<GriddedField> {
        let grid = RectilinearGrid::new(self.lon, self.lat)?;
        let field = rows_from_json(&self.values, source)?;
        GriddedField::new(grid, field)
    }
}

/// 读取网格文件
pub fn load_grid_file(path: &Path) -> SgResult<GriddedField> {
    if !path.exists() {
        return Err(SgError::file_not_found(path));
    }
    let content = fs::read_to_string(path)?;
    let file: GridFile = serde_json::from_str(&content)
        .map_err(|e| IoError::parse(path.display().to_string(), e))?;
    let gridded = file.into_gridded(&path.display().to_string())?;
    log::debug!(
        "读取网格文件 {}: {}x{}",
        path.display(),
        gridded.grid.n_lat(),
        gridded.grid.n_lon()
    );
    Ok(gridded)
}

/// 写出网格文件
pub fn save_grid_file(path: &Path, gridded: &GriddedField, units: Option<&str>) -> SgResult<()> {
    let file = GridFile::from_gridded(gridded, units);
    let content = serde_json::to_string(&file).map_err(|e| SgError::serialization(e.to_string()))?;
    fs::write(path, content)?;
    Ok(())
}

/// 嵌套行转换为场，`null` 读为 NaN
pub(crate) fn rows_from_json(rows: &[Vec<Option<f64>>], source: &str) -> SgResult<Field2> {
    let n_lon = rows.first().map_or(0, Vec::len);
    if let Some(i) = rows.iter().position(|r| r.len() != n_lon) {
        return Err(IoError::parse(
            source,
            format!("第 {i} 行长度 {} 与首行长度 {n_lon} 不一致", rows[i].len()),
        )
        .into());
    }
    let data = rows
        .iter()
        .flat_map(|r| r.iter().map(|v| v.unwrap_or(f64::NAN)))
        .collect();
    Field2::from_vec(data, rows.len(), n_lon)
}

/// 场转换为嵌套行，NaN 写为 `null`
pub(crate) fn rows_to_json(field: &Field2) -> Vec<Vec<Option<f64>>> {
    let n_lon = field.n_lon().max(1);
    field
        .values()
        .chunks(n_lon)
        .map(|row| {
            row.iter()
                .map(|&v| if v.is_nan() { None } else { Some(v) })
                .collect()
        })
        .collect()
}

/// 基于网格文件的静态数据提供者
///
/// 同一类型既可作为高程也可作为土深来源，取决于文件内容。
#[derive(Debug, Clone)]
pub struct GridFileProvider {
    path: PathBuf,
}

impl GridFileProvider {
    /// 创建提供者
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ElevationProvider for GridFileProvider {
    fn elevation(&self) -> SgResult<GriddedField> {
        load_grid_file(&self.path)
    }
}

impl SoilDepthProvider for GridFileProvider {
    fn soil_depth(&self) -> SgResult<GriddedField> {
        load_grid_file(&self.path)
    }
}
