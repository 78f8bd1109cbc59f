// crates/sg_io/src/source/memory.rs

//! 内存帧序列数据源

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use sg_foundation::error::{SgError, SgResult};
use sg_terrain::{Field2, GriddedField, RectilinearGrid};

use super::{exhausted, is_known_variable, ForcingSource, TimeMetadata};
use crate::error::IoError;

/// 单个时间步的变量场
pub type ForcingFrame = BTreeMap<String, Field2>;

/// 内存帧序列数据源
///
/// 所有帧共享同一网格，每帧可以只包含部分变量。
#[derive(Debug, Clone)]
pub struct MemoryForcingSource {
    grid: RectilinearGrid,
    metadata: TimeMetadata,
    frames: Vec<ForcingFrame>,
    position: usize,
}

impl MemoryForcingSource {
    /// 创建数据源，检查每个场的形状与网格一致
    pub fn new(
        grid: RectilinearGrid,
        start: DateTime<Utc>,
        step: Duration,
        frames: Vec<ForcingFrame>,
    ) -> SgResult<Self> {
        for (k, frame) in frames.iter().enumerate() {
            for (name, field) in frame {
                if !is_known_variable(name) {
                    return Err(IoError::UnknownVariable {
                        variable: format!("{name} (帧 {k})"),
                    }
                    .into());
                }
                SgError::check_shape("forcing frame", grid.shape(), field.shape())?;
            }
        }
        let metadata = TimeMetadata {
            start,
            step,
            n_steps: frames.len(),
            unit: unit_label(step),
        };
        Ok(Self {
            grid,
            metadata,
            frames,
            position: 0,
        })
    }

    /// 网格
    pub fn grid(&self) -> &RectilinearGrid {
        &self.grid
    }

    /// 所有帧
    pub fn frames(&self) -> &[ForcingFrame] {
        &self.frames
    }
}

impl ForcingSource for MemoryForcingSource {
    fn metadata(&self) -> &TimeMetadata {
        &self.metadata
    }

    fn position(&self) -> usize {
        self.position
    }

    fn fetch(&self, variable: &str) -> SgResult<GriddedField> {
        let frame = self
            .frames
            .get(self.position)
            .ok_or_else(|| exhausted(self.position, self.frames.len()))?;
        let field = frame.get(variable).ok_or_else(|| IoError::UnknownVariable {
            variable: variable.to_string(),
        })?;
        GriddedField::new(self.grid.clone(), field.clone())
    }

    fn advance(&mut self) -> SgResult<()> {
        if self.position >= self.frames.len() {
            return Err(exhausted(self.position, self.frames.len()));
        }
        self.position += 1;
        Ok(())
    }
}

/// 步长单位标签
pub(crate) fn unit_label(step: Duration) -> String {
    let seconds = step.num_seconds();
    if seconds % 86_400 == 0 {
        "days"
    } else if seconds % 3600 == 0 {
        "hours"
    } else if seconds % 60 == 0 {
        "minutes"
    } else {
        "seconds"
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source(n: usize) -> MemoryForcingSource {
        let grid = RectilinearGrid::new(vec![0.0, 1.0], vec![0.0]).unwrap();
        let frames = (0..n)
            .map(|k| {
                let mut frame = ForcingFrame::new();
                frame.insert("tp".into(), Field2::filled(1, 2, k as f64));
                frame
            })
            .collect();
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        MemoryForcingSource::new(grid, start, Duration::hours(1), frames).unwrap()
    }

    #[test]
    fn test_fetch_follows_pointer() {
        let mut src = source(3);
        assert_eq!(src.metadata().unit, "hours");
        assert_eq!(src.fetch("tp").unwrap().field.values()[0], 0.0);
        src.advance().unwrap();
        assert_eq!(src.fetch("tp").unwrap().field.values()[0], 1.0);
        assert_eq!(src.remaining(), 2);
    }

    #[test]
    fn test_exhaustion() {
        let mut src = source(1);
        src.advance().unwrap();
        assert_eq!(src.remaining(), 0);
        assert_eq!(src.current_time().unwrap(), None);
        assert!(matches!(src.fetch("tp"), Err(SgError::SourceExhausted { .. })));
        assert!(src.advance().is_err());
    }

    #[test]
    fn test_missing_variable() {
        let src = source(1);
        assert!(matches!(src.fetch("swvl1"), Err(SgError::NotFound { .. })));
    }

    #[test]
    fn test_shape_checked() {
        let grid = RectilinearGrid::new(vec![0.0, 1.0], vec![0.0]).unwrap();
        let mut frame = ForcingFrame::new();
        frame.insert("tp".into(), Field2::filled(2, 2, 0.0));
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert!(MemoryForcingSource::new(grid, start, Duration::hours(1), vec![frame]).is_err());
    }
}
