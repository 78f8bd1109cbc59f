// crates/sg_workflow/src/driver.rs

//! 时间步驱动器
//!
//! 状态机：
//!
//! ```text
//! Initializing --initialize--> Stepping(0) --step--> Stepping(1) ... --step--> Done
//! ```
//!
//! `initialize` 计算目标网格上的坡度角与土深，之后只读。每个时间步
//! 按顺序执行：
//!
//! 1. 读取当前时间步的降水与分层含水量；
//! 2. 重网格到目标网格；
//! 3. 计算区域均值并向时间序列追加一行；
//! 4. 计算地下流水深；
//! 5. 计算安全系数与易发性；
//! 6. 第 0 步保存参考快照并输出绝对值帧，之后输出相对参考的差值帧；
//! 7. 数据源前进一步。
//!
//! 数据源在完成全部时间步前耗尽时返回 [`DriverError::SourceExhausted`]，
//! 不会截断运行。

use chrono::{DateTime, Utc};
use sg_foundation::error::SgError;
use sg_foundation::require;
use sg_io::render::{FrameKind, FrameSink, StepFrame};
use sg_io::source::{ForcingSource, PRECIPITATION};
use sg_io::timeseries::{TimeSeriesRow, TimeSeriesTable};
use sg_physics::StabilityField;
use sg_terrain::{
    slope_angle, ElevationProvider, Field2, GriddedField, LayeredField, RectilinearGrid, Regridder,
    SoilDepthProvider,
};

use crate::cancel::CancelToken;
use crate::error::{DriverError, DriverResult};
use crate::settings::DriverSettings;

/// 驱动器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// 等待静态数据
    Initializing,
    /// 即将执行第 k 个时间步
    Stepping(usize),
    /// 全部时间步完成
    Done,
}

/// 目标网格上的静态场，初始化后只读
#[derive(Debug, Clone)]
pub struct StaticFields {
    /// 目标网格
    pub grid: RectilinearGrid,
    /// 坡度角 [rad]
    pub slope: Field2,
    /// 土深 [m]
    pub soil_depth: Field2,
}

impl StaticFields {
    /// 直接由目标网格上的场构造
    pub fn new(grid: RectilinearGrid, slope: Field2, soil_depth: Field2) -> DriverResult<Self> {
        SgError::check_shape("slope", grid.shape(), slope.shape())?;
        SgError::check_shape("soil depth", grid.shape(), soil_depth.shape())?;
        Ok(Self {
            grid,
            slope,
            soil_depth,
        })
    }
}

/// 第 0 步的参考快照
#[derive(Debug, Clone)]
pub struct ReferenceSnapshot {
    /// 时间
    pub timestamp: DateTime<Utc>,
    /// 易发性
    pub susceptibility: Field2,
    /// 地下流水深
    pub flow_depth: Field2,
}

/// 单个时间步的计算结果
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// 时间步序号
    pub step: usize,
    /// 时间
    pub timestamp: DateTime<Utc>,
    /// 目标网格上的降水
    pub precipitation: Field2,
    /// 地下流水深
    pub flow_depth: Field2,
    /// 安全系数与易发性
    pub stability: StabilityField,
}

/// 单个时间步的摘要
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// 时间步序号
    pub step: usize,
    /// 时间
    pub timestamp: DateTime<Utc>,
    /// 平均降水 [m]
    pub mean_precipitation: f64,
    /// 平均地下流水深 [m]
    pub mean_flow_depth: f64,
    /// 平均易发性
    pub mean_susceptibility: f64,
    /// 有效单元数
    pub n_valid: usize,
    /// 掩膜单元数
    pub n_masked: usize,
    /// 易失稳单元数
    pub n_unstable: usize,
}

/// 运行摘要
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// 完成的时间步数
    pub steps_completed: usize,
    /// 逐步摘要
    pub reports: Vec<StepReport>,
}

/// 时间步驱动器
#[derive(Debug)]
pub struct Driver {
    settings: DriverSettings,
    state: DriverState,
    statics: Option<StaticFields>,
    forcing_regridder: Option<(RectilinearGrid, Regridder)>,
    reference: Option<ReferenceSnapshot>,
    series: TimeSeriesTable,
    latest: Option<StepOutput>,
}

impl Driver {
    /// 创建驱动器
    pub fn new(settings: DriverSettings) -> Self {
        let series = TimeSeriesTable::new(settings.profile.n_layers());
        Self {
            settings,
            state: DriverState::Initializing,
            statics: None,
            forcing_regridder: None,
            reference: None,
            series,
            latest: None,
        }
    }

    /// 当前状态
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// 参数
    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// 静态场
    pub fn statics(&self) -> Option<&StaticFields> {
        self.statics.as_ref()
    }

    /// 参考快照
    pub fn reference(&self) -> Option<&ReferenceSnapshot> {
        self.reference.as_ref()
    }

    /// 时间序列
    pub fn series(&self) -> &TimeSeriesTable {
        &self.series
    }

    /// 最近一个时间步的结果
    pub fn latest(&self) -> Option<&StepOutput> {
        self.latest.as_ref()
    }

    /// 由高程与土深数据初始化
    ///
    /// 高程先重网格到目标网格再求坡度，土深直接重网格。
    pub fn initialize(
        &mut self,
        elevation: &dyn ElevationProvider,
        soil_depth: &dyn SoilDepthProvider,
    ) -> DriverResult<()> {
        self.expect_state(DriverState::Initializing, "Initializing")?;
        let grid = self.settings.target_grid.clone();

        let elevation = elevation.elevation()?;
        let elevation = self.regrid_static(&elevation, &grid)?;
        let slope = slope_angle(&grid, &elevation, self.settings.coordinate_units)?;

        let soil_depth = soil_depth.soil_depth()?;
        let soil_depth = self.regrid_static(&soil_depth, &grid)?;

        tracing::info!(
            "初始化完成: 目标网格 {}x{}, 平均坡度 {:.4} rad, 平均土深 {:.3} m",
            grid.n_lat(),
            grid.n_lon(),
            slope.mean(),
            soil_depth.mean()
        );

        self.initialize_with(StaticFields::new(grid, slope, soil_depth)?)
    }

    /// 由目标网格上的现成静态场初始化
    pub fn initialize_with(&mut self, statics: StaticFields) -> DriverResult<()> {
        self.expect_state(DriverState::Initializing, "Initializing")?;
        SgError::check_shape("static fields", self.settings.target_grid.shape(), statics.grid.shape())?;
        self.statics = Some(statics);
        self.state = if self.settings.n_steps == 0 {
            DriverState::Done
        } else {
            DriverState::Stepping(0)
        };
        Ok(())
    }

    /// 执行全部剩余时间步
    ///
    /// 每步开始前检查取消令牌；取消或出错时已输出的帧和时间序列保持不变。
    pub fn run(
        &mut self,
        source: &mut dyn ForcingSource,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> DriverResult<RunSummary> {
        if self.state == DriverState::Initializing {
            return Err(DriverError::InvalidState {
                expected: "Stepping",
                actual: self.state,
            });
        }

        tracing::info!(
            "开始运行: {} 个时间步, 数据源剩余 {} 步",
            self.settings.n_steps,
            source.remaining()
        );

        let mut reports = Vec::new();
        while let DriverState::Stepping(k) = self.state {
            if cancel.is_cancelled() {
                tracing::warn!("运行在第 {} 步前被取消", k);
                return Err(DriverError::Cancelled { completed: k });
            }
            reports.push(self.step(source, sink)?);
        }
        sink.finish()?;

        tracing::info!("运行完成: {} 个时间步", reports.len());
        Ok(RunSummary {
            steps_completed: reports.len(),
            reports,
        })
    }

    /// 执行一个时间步
    pub fn step(
        &mut self,
        source: &mut dyn ForcingSource,
        sink: &mut dyn FrameSink,
    ) -> DriverResult<StepReport> {
        let k = match self.state {
            DriverState::Stepping(k) => k,
            actual => {
                return Err(DriverError::InvalidState {
                    expected: "Stepping",
                    actual,
                })
            }
        };
        let n_steps = self.settings.n_steps;
        if source.remaining() == 0 {
            tracing::error!("数据源在第 {} 步耗尽 (共需 {} 步)", k, n_steps);
            return Err(DriverError::SourceExhausted {
                requested: n_steps,
                completed: k,
            });
        }
        let timestamp = require!(
            source.current_time()?,
            SgError::internal("数据源有剩余时间步但没有当前时间")
        );

        // (a)(b) 读取并重网格
        let precipitation = source.fetch(PRECIPITATION)?;
        let precipitation = self.regrid_forcing(&precipitation)?;
        let moisture = source
            .fetch_soil_water()?
            .iter()
            .map(|layer| self.regrid_forcing(layer))
            .collect::<DriverResult<Vec<_>>>()?;
        let moisture = LayeredField::new(moisture)?;

        let statics = require!(
            self.statics.as_ref(),
            SgError::internal("驱动器处于 Stepping 状态但缺少静态场")
        );

        // (c) 区域均值，写入暂存表，本步全部成功后再提交
        let mean_precipitation = precipitation.mean();
        let mut series = self.series.clone();
        series.push(TimeSeriesRow {
            timestamp,
            mean_precipitation,
            mean_soil_water: moisture.layer_means(),
        })?;

        // (d)(e) 物理计算
        let flow_depth = self
            .settings
            .profile
            .subsurface_flow_depth(&statics.soil_depth, &moisture)?;
        let stability = self
            .settings
            .calculator
            .compute(&statics.slope, &flow_depth, &statics.soil_depth)?;

        // (f) 参考快照与输出帧
        let new_reference = (k == 0).then(|| ReferenceSnapshot {
            timestamp,
            susceptibility: stability.susceptibility.clone(),
            flow_depth: flow_depth.clone(),
        });
        let reference = require!(
            new_reference.as_ref().or(self.reference.as_ref()),
            SgError::internal("缺少参考快照")
        );
        if k == 0 {
            sink.write_frame(&StepFrame {
                step: k,
                timestamp,
                kind: FrameKind::Absolute,
                grid: &statics.grid,
                susceptibility: &stability.susceptibility,
                flow_depth: &flow_depth,
                series: &series,
            })?;
        } else {
            let d_sus = stability
                .susceptibility
                .zip_map(&reference.susceptibility, |a, b| a - b)?;
            let d_flow = flow_depth.zip_map(&reference.flow_depth, |a, b| a - b)?;
            sink.write_frame(&StepFrame {
                step: k,
                timestamp,
                kind: FrameKind::Difference,
                grid: &statics.grid,
                susceptibility: &d_sus,
                flow_depth: &d_flow,
                series: &series,
            })?;
        }

        let report = StepReport {
            step: k,
            timestamp,
            mean_precipitation,
            mean_flow_depth: flow_depth.mean(),
            mean_susceptibility: stability.susceptibility.mean(),
            n_valid: stability.mask.n_valid(),
            n_masked: stability.mask.n_masked(),
            n_unstable: stability.n_unstable(),
        };

        // (g) 数据源前进
        source.advance()?;

        // 提交：失败的时间步不留下任何行、快照或状态变化
        self.series = series;
        if let Some(reference) = new_reference {
            self.reference = Some(reference);
        }

        tracing::info!(
            "步 {}/{} {}: 平均降水 {:.3e} m, 平均流水深 {:.4} m, 平均易发性 {:.4}, 失稳单元 {}",
            k + 1,
            n_steps,
            timestamp.format("%Y-%m-%d %H:%M"),
            report.mean_precipitation,
            report.mean_flow_depth,
            report.mean_susceptibility,
            report.n_unstable
        );

        self.latest = Some(StepOutput {
            step: k,
            timestamp,
            precipitation,
            flow_depth,
            stability,
        });
        self.state = if k + 1 >= n_steps {
            DriverState::Done
        } else {
            DriverState::Stepping(k + 1)
        };

        Ok(report)
    }

    fn expect_state(&self, expected: DriverState, name: &'static str) -> DriverResult<()> {
        if self.state != expected {
            return Err(DriverError::InvalidState {
                expected: name,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn regrid_static(&self, source: &GriddedField, grid: &RectilinearGrid) -> DriverResult<Field2> {
        let regridder = Regridder::new(&source.grid, grid, self.settings.regrid.clone())?;
        Ok(regridder.regrid(&source.field)?)
    }

    /// 强迫场重网格，源网格不变时复用权重
    fn regrid_forcing(&mut self, source: &GriddedField) -> DriverResult<Field2> {
        let cached = matches!(&self.forcing_regridder, Some((grid, _)) if *grid == source.grid);
        if !cached {
            tracing::debug!(
                "构建强迫场重网格权重: {}x{} -> {}x{}",
                source.grid.n_lat(),
                source.grid.n_lon(),
                self.settings.target_grid.n_lat(),
                self.settings.target_grid.n_lon()
            );
            let regridder = Regridder::new(
                &source.grid,
                &self.settings.target_grid,
                self.settings.regrid.clone(),
            )?;
            self.forcing_regridder = Some((source.grid.clone(), regridder));
        }
        let (_, regridder) = require!(
            self.forcing_regridder.as_ref(),
            SgError::internal("重网格权重缺失")
        );
        Ok(regridder.regrid(&source.field)?)
    }
}
