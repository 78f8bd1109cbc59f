// crates/sg_io/src/source/mod.rs

//! 时变强迫数据源
//!
//! 再分析数据（降水、分层土壤含水量）以"当前时间指针"的方式读取：
//! `fetch` 返回指针所在时间步的场，`advance` 将指针后移一步。
//!
//! # 变量
//!
//! | 名称 | 含义 | 单位 |
//! |------|------|------|
//! | `tp` | 总降水 | m |
//! | `swvl1`..`swvl4` | 第 1..4 层体积含水量 | m³/m³ |
//!
//! # 实现
//!
//! - [`MemoryForcingSource`]: 内存帧序列（测试、JSON 帧文件）
//! - [`SyntheticForcingSource`]: 确定性合成降雨过程（演示）

pub mod frames;
pub mod memory;
pub mod synthetic;

use chrono::{DateTime, Duration, Utc};
use sg_foundation::error::{SgError, SgResult};
use sg_terrain::GriddedField;

pub use frames::{load_forcing_frames, save_forcing_frames, ForcingFrameFile};
pub use memory::MemoryForcingSource;
pub use synthetic::{StormParams, SyntheticForcingSource, SyntheticTerrain};

/// 降水变量名
pub const PRECIPITATION: &str = "tp";

/// 分层土壤含水量变量名，按土层由浅到深
pub const SOIL_WATER_LAYERS: [&str; 4] = ["swvl1", "swvl2", "swvl3", "swvl4"];

/// 数据源时间元数据
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMetadata {
    /// 第一个时间步
    pub start: DateTime<Utc>,
    /// 时间步长
    pub step: Duration,
    /// 时间步数
    pub n_steps: usize,
    /// 步长单位标签
    pub unit: String,
}

impl TimeMetadata {
    /// 逐小时元数据
    pub fn hourly(start: DateTime<Utc>, n_steps: usize) -> Self {
        Self {
            start,
            step: Duration::hours(1),
            n_steps,
            unit: "hours".to_string(),
        }
    }

    /// 第 `index` 个时间步的时间，超出可表示范围时返回错误
    pub fn time_at(&self, index: usize) -> SgResult<DateTime<Utc>> {
        i32::try_from(index)
            .ok()
            .and_then(|i| self.step.checked_mul(i))
            .and_then(|offset| self.start.checked_add_signed(offset))
            .ok_or_else(|| {
                SgError::invalid_input(format!("时间步 {index} 超出可表示的时间范围"))
            })
    }

    /// 最后一个时间步，空序列时为 `None`
    pub fn end(&self) -> SgResult<Option<DateTime<Utc>>> {
        self.n_steps
            .checked_sub(1)
            .map(|last| self.time_at(last))
            .transpose()
    }
}

/// 强迫数据源 trait
pub trait ForcingSource {
    /// 时间元数据
    fn metadata(&self) -> &TimeMetadata;

    /// 当前时间指针（已消费的时间步数）
    fn position(&self) -> usize;

    /// 读取当前时间步的变量场
    fn fetch(&self, variable: &str) -> SgResult<GriddedField>;

    /// 时间指针后移一步
    fn advance(&mut self) -> SgResult<()>;

    /// 剩余可读时间步数
    fn remaining(&self) -> usize {
        self.metadata().n_steps.saturating_sub(self.position())
    }

    /// 当前时间，耗尽时为 `None`
    fn current_time(&self) -> SgResult<Option<DateTime<Utc>>> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        self.metadata().time_at(self.position()).map(Some)
    }

    /// 按土层顺序读取全部土壤含水量场
    fn fetch_soil_water(&self) -> SgResult<Vec<GriddedField>> {
        SOIL_WATER_LAYERS.iter().map(|v| self.fetch(v)).collect()
    }
}

/// 变量名是否受支持
pub fn is_known_variable(variable: &str) -> bool {
    variable == PRECIPITATION || SOIL_WATER_LAYERS.contains(&variable)
}

/// 数据源耗尽错误
pub(crate) fn exhausted(position: usize, n_steps: usize) -> SgError {
    SgError::source_exhausted(position + 1, n_steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_hourly_metadata() {
        let start = Utc.with_ymd_and_hms(2017, 9, 20, 0, 0, 0).unwrap();
        let meta = TimeMetadata::hourly(start, 24);
        assert_eq!(
            meta.time_at(3).unwrap(),
            Utc.with_ymd_and_hms(2017, 9, 20, 3, 0, 0).unwrap()
        );
        assert_eq!(
            meta.end().unwrap(),
            Some(Utc.with_ymd_and_hms(2017, 9, 20, 23, 0, 0).unwrap())
        );
        assert_eq!(TimeMetadata::hourly(start, 0).end().unwrap(), None);
    }

    #[test]
    fn test_time_at_overflow_is_an_error() {
        let start = Utc.with_ymd_and_hms(2017, 9, 20, 0, 0, 0).unwrap();
        let meta = TimeMetadata::hourly(start, usize::MAX);
        // 超出 i32 的序号不截断
        let wrapped = (1usize << 32) + 3;
        assert!(matches!(meta.time_at(wrapped), Err(SgError::InvalidInput { .. })));
        assert!(meta.end().is_err());

        let mut yearly = TimeMetadata::hourly(start, 10);
        yearly.step = Duration::days(365_000_000);
        assert!(yearly.time_at(1).is_err());
        assert!(yearly.time_at(0).is_ok());
    }

    #[test]
    fn test_known_variables() {
        assert!(is_known_variable("tp"));
        assert!(is_known_variable("swvl4"));
        assert!(!is_known_variable("swvl5"));
    }
}
