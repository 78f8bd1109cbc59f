// crates/sg_io/src/source/frames.rs

//! JSON 帧文件
//!
//! ```json
//! {
//!   "start": "2017-09-20T00:00:00Z",
//!   "step_seconds": 3600,
//!   "lon": [...],
//!   "lat": [...],
//!   "frames": [
//!     {"tp": [[...]], "swvl1": [[...]], "swvl2": [[...]], "swvl3": [[...]], "swvl4": [[...]]}
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sg_foundation::error::{SgError, SgResult};
use sg_terrain::{Field2, RectilinearGrid};

use super::memory::{ForcingFrame, MemoryForcingSource};
use crate::error::IoError;
use crate::grid_file::{rows_from_json, rows_to_json};

fn default_step_seconds() -> i64 {
    3600
}

/// 帧文件内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForcingFrameFile {
    /// 第一帧时间
    pub start: DateTime<Utc>,
    /// 帧间隔 [s]
    #[serde(default = "default_step_seconds")]
    pub step_seconds: i64,
    /// 经度坐标
    pub lon: Vec<f64>,
    /// 纬度坐标
    pub lat: Vec<f64>,
    /// 按时间排列的帧
    pub frames: Vec<BTreeMap<String, Vec<Vec<Option<f64>>>>>,
}

impl ForcingFrameFile {
    /// 转换为内存数据源
    pub fn into_source(self, source: &str) -> SgResult<MemoryForcingSource> {
        if self.step_seconds <= 0 {
            return Err(IoError::parse(
                source,
                format!("step_seconds 必须为正: {}", self.step_seconds),
            )
            .into());
        }
        let grid = RectilinearGrid::new(self.lon, self.lat)?;
        let frames = self
            .frames
            .iter()
            .map(|frame| {
                frame
                    .iter()
                    .map(|(name, rows)| -> SgResult<(String, Field2)> {
                        Ok((name.clone(), rows_from_json(rows, source)?))
                    })
                    .collect::<SgResult<ForcingFrame>>()
            })
            .collect::<SgResult<Vec<_>>>()?;
        let step = Duration::try_seconds(self.step_seconds).ok_or_else(|| {
            IoError::parse(source, format!("step_seconds 超出范围: {}", self.step_seconds))
        })?;
        MemoryForcingSource::new(grid, self.start, step, frames)
    }

    /// 从内存数据源构造
    pub fn from_source(source: &MemoryForcingSource) -> Self {
        let meta = super::ForcingSource::metadata(source);
        Self {
            start: meta.start,
            step_seconds: meta.step.num_seconds(),
            lon: source.grid().lon().to_vec(),
            lat: source.grid().lat().to_vec(),
            frames: source
                .frames()
                .iter()
                .map(|frame| {
                    frame
                        .iter()
                        .map(|(name, field)| (name.clone(), rows_to_json(field)))
                        .collect()
                })
                .collect(),
        }
    }
}

/// 读取帧文件
pub fn load_forcing_frames(path: &Path) -> SgResult<MemoryForcingSource> {
    if !path.exists() {
        return Err(SgError::file_not_found(path));
    }
    let name = path.display().to_string();
    let content = fs::read_to_string(path)?;
    let file: ForcingFrameFile =
        serde_json::from_str(&content).map_err(|e| IoError::parse(name.clone(), e))?;
    let n_frames = file.frames.len();
    let source = file.into_source(&name)?;
    log::info!("读取强迫帧文件 {}: {} 帧", name, n_frames);
    Ok(source)
}

/// 写出帧文件
pub fn save_forcing_frames(path: &Path, source: &MemoryForcingSource) -> SgResult<()> {
    let file = ForcingFrameFile::from_source(source);
    let content = serde_json::to_string(&file).map_err(|e| SgError::serialization(e.to_string()))?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ForcingSource;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "start": "2017-09-20T06:00:00Z",
        "lon": [0.0, 1.0],
        "lat": [1.0, 0.0],
        "frames": [
            {"tp": [[0.001, 0.002], [null, 0.0]], "swvl1": [[0.3, 0.3], [0.3, 0.3]]},
            {"tp": [[0.004, 0.002], [0.001, 0.0]], "swvl1": [[0.35, 0.3], [0.3, 0.3]]}
        ]
    }"#;

    #[test]
    fn test_load_frames() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forcing.json");
        fs::write(&path, SAMPLE).unwrap();

        let mut src = load_forcing_frames(&path).unwrap();
        assert_eq!(src.metadata().n_steps, 2);
        assert_eq!(src.metadata().step, Duration::hours(1));

        let tp = src.fetch("tp").unwrap();
        assert!(tp.field.values()[2].is_nan());
        src.advance().unwrap();
        assert_eq!(src.fetch("swvl1").unwrap().field.values()[0], 0.35);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forcing.json");
        fs::write(&path, SAMPLE).unwrap();
        let src = load_forcing_frames(&path).unwrap();

        let copy = dir.path().join("copy.json");
        save_forcing_frames(&copy, &src).unwrap();
        let reloaded = load_forcing_frames(&copy).unwrap();
        assert_eq!(reloaded.metadata(), src.metadata());
        assert_eq!(reloaded.grid(), src.grid());
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forcing.json");
        fs::write(
            &path,
            r#"{"start": "2017-09-20T00:00:00Z", "lon": [0.0], "lat": [0.0], "frames": [{"t2m": [[1.0]]}]}"#,
        )
        .unwrap();
        assert!(load_forcing_frames(&path).is_err());
    }

    #[test]
    fn test_out_of_range_step_rejected() {
        let file: ForcingFrameFile = serde_json::from_str(
            r#"{"start": "2017-09-20T00:00:00Z", "step_seconds": 9223372036854775807,
                "lon": [0.0], "lat": [0.0], "frames": [{"tp": [[0.0]]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            file.into_source("forcing.json"),
            Err(SgError::Serialization { .. })
        ));
    }
}
