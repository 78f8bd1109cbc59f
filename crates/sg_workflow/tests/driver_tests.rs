// tests/driver_tests.rs

//! 时间步驱动器集成测试
//!
//! # 测试覆盖
//!
//! - 端到端固定算例（单元安全系数、流水深、掩膜）
//! - 时间序列行数与顺序
//! - 参考快照在后续时间步中保持不变
//! - 数据源耗尽与取消
//! - 由合成地形初始化并经重网格运行
//! - PNG 帧、GIF 动画与 CSV 输出

use chrono::{DateTime, Duration, TimeZone, Utc};
use sg_foundation::{SgError, SgResult};
use sg_io::render::{FrameKind, FrameRenderer, FrameSink, PngFrameSink, StepFrame};
use sg_io::source::memory::ForcingFrame;
use sg_io::source::{
    MemoryForcingSource, StormParams, SyntheticForcingSource, SyntheticTerrain, SOIL_WATER_LAYERS,
};
use sg_io::video::{assemble_gif, collect_frames};
use sg_terrain::{Field2, RectilinearGrid};
use sg_workflow::{CancelToken, Driver, DriverError, DriverSettings, DriverState, StaticFields};

// ============================================================================
// 测试辅助
// ============================================================================

const MOISTURE: [f64; 4] = [0.30, 0.32, 0.28, 0.25];

/// 记录输出帧的 sink，可在写出若干帧后触发取消
#[derive(Default)]
struct CollectingSink {
    frames: Vec<(usize, FrameKind, Vec<f64>)>,
    cancel_after: Option<(usize, CancelToken)>,
}

impl FrameSink for CollectingSink {
    fn write_frame(&mut self, frame: &StepFrame<'_>) -> SgResult<()> {
        self.frames
            .push((frame.step, frame.kind, frame.susceptibility.values().to_vec()));
        if let Some((n, token)) = &self.cancel_after {
            if self.frames.len() >= *n {
                token.cancel();
            }
        }
        Ok(())
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 9, 20, 0, 0, 0).unwrap()
}

fn fixture_grid() -> RectilinearGrid {
    RectilinearGrid::new(vec![-66.5, -66.4, -66.3], vec![18.1, 18.2]).unwrap()
}

/// 2x3 静态场，(0, 2) 为平坦深土（开阔水体）
fn fixture_statics() -> StaticFields {
    let slope = Field2::from_rows(&[vec![0.5, 0.5, 0.0], vec![0.5, 0.5, 0.5]]).unwrap();
    let depth = Field2::from_rows(&[vec![1.0, 1.0, 2.5], vec![1.0, 1.0, 1.0]]).unwrap();
    StaticFields::new(fixture_grid(), slope, depth).unwrap()
}

fn frame(tp: f64, moisture: [f64; 4]) -> ForcingFrame {
    let mut f = ForcingFrame::new();
    f.insert("tp".to_string(), Field2::filled(2, 3, tp));
    for (name, m) in SOIL_WATER_LAYERS.iter().zip(moisture) {
        f.insert(name.to_string(), Field2::filled(2, 3, m));
    }
    f
}

/// 第 k 帧降水 0.001·k，含水量随 k 增加
fn varying_source(n_frames: usize) -> MemoryForcingSource {
    let frames = (0..n_frames)
        .map(|k| {
            let dk = 0.01 * k as f64;
            frame(
                0.001 * k as f64,
                [MOISTURE[0] + dk, MOISTURE[1] + dk, MOISTURE[2] + dk, MOISTURE[3] + dk],
            )
        })
        .collect();
    MemoryForcingSource::new(fixture_grid(), start(), Duration::hours(1), frames).unwrap()
}

fn fixture_driver(n_steps: usize) -> Driver {
    let mut driver = Driver::new(DriverSettings::new(fixture_grid(), n_steps));
    driver.initialize_with(fixture_statics()).unwrap();
    driver
}

// ============================================================================
// 端到端
// ============================================================================

#[test]
fn test_end_to_end_fixture() {
    let frames = (0..3).map(|_| frame(0.002, MOISTURE)).collect();
    let mut source =
        MemoryForcingSource::new(fixture_grid(), start(), Duration::hours(1), frames).unwrap();
    let mut driver = fixture_driver(3);
    let mut sink = CollectingSink::default();

    let summary = driver
        .run(&mut source, &mut sink, &CancelToken::new())
        .unwrap();
    assert_eq!(summary.steps_completed, 3);
    assert_eq!(driver.state(), DriverState::Done);

    let latest = driver.latest().unwrap();
    let h_w = latest.flow_depth.get(0, 0).unwrap();
    assert!((h_w - 0.5796).abs() < 1e-12);

    let fs = latest.stability.safety_factor.get(1, 1).unwrap();
    assert!((fs - 2.34649793621393).abs() < 1e-9);
    assert_eq!(latest.stability.susceptibility.get(1, 1).unwrap(), 1.0 / fs);

    // 开阔水体单元
    assert!(latest.stability.safety_factor.get(0, 2).unwrap().is_nan());
    assert!(latest.stability.susceptibility.get(0, 2).unwrap().is_nan());
    assert_eq!(summary.reports[0].n_masked, 1);
    assert_eq!(summary.reports[0].n_valid, 5);
    assert_eq!(summary.reports[0].n_unstable, 0);
}

#[test]
fn test_series_rows_in_order() {
    let mut source = varying_source(5);
    let mut driver = fixture_driver(5);
    let mut sink = CollectingSink::default();
    driver
        .run(&mut source, &mut sink, &CancelToken::new())
        .unwrap();

    let rows = driver.series().rows();
    assert_eq!(rows.len(), 5);
    for (k, row) in rows.iter().enumerate() {
        assert_eq!(row.timestamp, start() + Duration::hours(k as i64));
        assert!((row.mean_precipitation - 0.001 * k as f64).abs() < 1e-12);
        assert!((row.mean_soil_water[0] - (0.30 + 0.01 * k as f64)).abs() < 1e-12);
        assert_eq!(row.mean_soil_water.len(), 4);
    }
}

#[test]
fn test_reference_snapshot_unchanged() {
    let mut source = varying_source(4);
    let mut driver = fixture_driver(4);
    let mut sink = CollectingSink::default();

    driver.step(&mut source, &mut sink).unwrap();
    let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<u64>>();
    let reference = driver.reference().unwrap().clone();
    let sus_bits = bits(reference.susceptibility.values());
    let flow_bits = bits(reference.flow_depth.values());

    driver
        .run(&mut source, &mut sink, &CancelToken::new())
        .unwrap();

    let after = driver.reference().unwrap();
    assert_eq!(after.timestamp, start());
    assert_eq!(bits(after.susceptibility.values()), sus_bits);
    assert_eq!(bits(after.flow_depth.values()), flow_bits);

    // 首帧为绝对值，其余为差值
    assert_eq!(sink.frames.len(), 4);
    assert_eq!(sink.frames[0].1, FrameKind::Absolute);
    assert_eq!(sink.frames[0].2[0], reference.susceptibility.values()[0]);
    for (k, (step, kind, values)) in sink.frames.iter().enumerate().skip(1) {
        assert_eq!(*step, k);
        assert_eq!(*kind, FrameKind::Difference);
        // 含水量上升，易发性增加
        assert!(values[0] > 0.0);
        assert!(values[2].is_nan());
    }
}

// ============================================================================
// 失败与取消
// ============================================================================

#[test]
fn test_source_exhaustion_is_an_error() {
    let mut source = varying_source(2);
    let mut driver = fixture_driver(4);
    let mut sink = CollectingSink::default();

    let err = driver
        .run(&mut source, &mut sink, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(
        err,
        DriverError::SourceExhausted {
            requested: 4,
            completed: 2
        }
    ));
    assert_eq!(driver.series().len(), 2);
    assert_eq!(sink.frames.len(), 2);
    assert_eq!(driver.state(), DriverState::Stepping(2));
}

#[test]
fn test_cancel_before_start() {
    let mut source = varying_source(3);
    let mut driver = fixture_driver(3);
    let mut sink = CollectingSink::default();
    let token = CancelToken::new();
    token.cancel();

    let err = driver.run(&mut source, &mut sink, &token).unwrap_err();
    assert!(matches!(err, DriverError::Cancelled { completed: 0 }));
    assert!(driver.series().is_empty());
    assert_eq!(source_position(&source), 0);
}

#[test]
fn test_cancel_between_steps_keeps_output() {
    let mut source = varying_source(5);
    let mut driver = fixture_driver(5);
    let token = CancelToken::new();
    let mut sink = CollectingSink {
        cancel_after: Some((2, token.clone())),
        ..Default::default()
    };

    let err = driver.run(&mut source, &mut sink, &token).unwrap_err();
    assert!(matches!(err, DriverError::Cancelled { completed: 2 }));
    assert_eq!(driver.series().len(), 2);
    assert_eq!(sink.frames.len(), 2);
    // 每步恰好前进一次
    assert_eq!(source_position(&source), 2);
}

#[test]
fn test_step_requires_initialization() {
    let mut driver = Driver::new(DriverSettings::new(fixture_grid(), 2));
    let mut source = varying_source(2);
    let mut sink = CollectingSink::default();
    assert!(matches!(
        driver.step(&mut source, &mut sink),
        Err(DriverError::InvalidState { .. })
    ));
    assert!(driver
        .run(&mut source, &mut sink, &CancelToken::new())
        .is_err());
}

#[test]
fn test_initialize_twice_rejected() {
    let mut driver = fixture_driver(2);
    assert!(matches!(
        driver.initialize_with(fixture_statics()),
        Err(DriverError::InvalidState { .. })
    ));
}

/// 第一次写帧失败，之后正常记录
#[derive(Default)]
struct FailOnceSink {
    failed: bool,
    steps: Vec<usize>,
}

impl FrameSink for FailOnceSink {
    fn write_frame(&mut self, frame: &StepFrame<'_>) -> SgResult<()> {
        if !self.failed {
            self.failed = true;
            return Err(SgError::io("磁盘已满"));
        }
        self.steps.push(frame.step);
        Ok(())
    }
}

#[test]
fn test_failed_step_leaves_no_trace() {
    let mut source = varying_source(2);
    let mut driver = fixture_driver(2);
    let mut sink = FailOnceSink::default();

    assert!(driver.step(&mut source, &mut sink).is_err());
    assert!(driver.series().is_empty());
    assert!(driver.reference().is_none());
    assert!(driver.latest().is_none());
    assert_eq!(driver.state(), DriverState::Stepping(0));
    assert_eq!(source_position(&source), 0);

    // 重试后行数与步数一致
    let summary = driver
        .run(&mut source, &mut sink, &CancelToken::new())
        .unwrap();
    assert_eq!(summary.steps_completed, 2);
    assert_eq!(sink.steps, vec![0, 1]);
    let rows = driver.series().rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].timestamp, start());
    assert_eq!(rows[1].timestamp, start() + Duration::hours(1));
    assert_eq!(driver.reference().unwrap().timestamp, start());
}

fn source_position(source: &MemoryForcingSource) -> usize {
    use sg_io::source::ForcingSource;
    source.position()
}

// ============================================================================
// 合成地形 + 重网格
// ============================================================================

#[test]
fn test_synthetic_run_with_regridding() {
    let source_grid = RectilinearGrid::uniform(-67.3, -65.2, 17.9, 18.55, 0.05).unwrap();
    let target_grid = RectilinearGrid::uniform(-67.3, -65.2, 17.9, 18.55, 0.1).unwrap();

    let terrain = SyntheticTerrain::new(source_grid.clone());
    let mut forcing = SyntheticForcingSource::new(source_grid, start(), 6, StormParams::default());

    let mut driver = Driver::new(DriverSettings::new(target_grid.clone(), 3));
    driver.initialize(&terrain, &terrain).unwrap();

    let statics = driver.statics().unwrap();
    assert_eq!(statics.slope.shape(), target_grid.shape());
    assert_eq!(statics.slope.get(0, 0), Some(0.0));
    assert!(statics.soil_depth.get(0, 0).unwrap() > 2.0);

    let mut sink = CollectingSink::default();
    let summary = driver
        .run(&mut forcing, &mut sink, &CancelToken::new())
        .unwrap();
    assert_eq!(summary.steps_completed, 3);

    let latest = driver.latest().unwrap();
    assert_eq!(latest.precipitation.shape(), target_grid.shape());
    assert!(latest.stability.susceptibility.get(0, 0).unwrap().is_nan());
    assert!(summary.reports[2].n_masked > 0);
    assert!(summary.reports[2].n_valid > 0);
    // 数据源比运行长，剩余部分不消费
    assert_eq!(driver.series().len(), 3);
}

// ============================================================================
// 文件输出
// ============================================================================

#[test]
fn test_frames_animation_and_csv() {
    let dir = tempfile::TempDir::new().unwrap();
    let frames_dir = dir.path().join("frames");

    let mut source = varying_source(3);
    let mut driver = fixture_driver(3);
    let mut sink = PngFrameSink::new(&frames_dir, FrameRenderer::default()).unwrap();
    driver
        .run(&mut source, &mut sink, &CancelToken::new())
        .unwrap();
    assert_eq!(sink.frames().len(), 3);

    let gif = dir.path().join("animation.gif");
    assemble_gif(&sink.frame_paths(), &gif, 100).unwrap();
    assert!(gif.exists());

    let csv = dir.path().join("series.csv");
    driver.series().write_csv(&csv).unwrap();
    let content = std::fs::read_to_string(&csv).unwrap();
    assert_eq!(content.lines().count(), 4);
}

#[test]
fn test_rerun_into_same_directory_uses_only_new_frames() {
    let dir = tempfile::TempDir::new().unwrap();
    let frames_dir = dir.path().join("frames");

    let mut driver = fixture_driver(5);
    let mut sink = PngFrameSink::new(&frames_dir, FrameRenderer::default()).unwrap();
    driver
        .run(&mut varying_source(5), &mut sink, &CancelToken::new())
        .unwrap();
    assert_eq!(collect_frames(&frames_dir).unwrap().len(), 5);

    let mut driver = fixture_driver(2);
    let mut sink = PngFrameSink::new(&frames_dir, FrameRenderer::default()).unwrap();
    driver
        .run(&mut varying_source(2), &mut sink, &CancelToken::new())
        .unwrap();

    let on_disk: Vec<usize> = collect_frames(&frames_dir)
        .unwrap()
        .into_iter()
        .map(|(step, _)| step)
        .collect();
    assert_eq!(on_disk, vec![0, 1]);
    assert_eq!(sink.frame_paths().len(), 2);
    assemble_gif(&sink.frame_paths(), &dir.path().join("animation.gif"), 100).unwrap();
}
