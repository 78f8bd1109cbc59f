// crates/sg_workflow/src/settings.rs

//! 驱动器参数
//!
//! 将 JSON 配置层的 `RunConfig` 转换为各计算模块的参数类型。

use sg_config::{LayerPolicy, RegridMethod as ConfigRegridMethod, RunConfig};
use sg_physics::{LayerThicknessPolicy, SafetyFactorCalculator, SoilProfile, StabilityParams};
use sg_terrain::{CoordinateUnits, RectilinearGrid, RegridConfig, RegridMethod};

use crate::error::DriverResult;

/// 驱动器参数
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// 目标网格
    pub target_grid: RectilinearGrid,
    /// 重网格参数
    pub regrid: RegridConfig,
    /// 土壤剖面
    pub profile: SoilProfile,
    /// 安全系数计算器
    pub calculator: SafetyFactorCalculator,
    /// 高程网格坐标单位
    pub coordinate_units: CoordinateUnits,
    /// 时间步数
    pub n_steps: usize,
}

impl DriverSettings {
    /// 默认物理参数
    pub fn new(target_grid: RectilinearGrid, n_steps: usize) -> Self {
        Self {
            target_grid,
            regrid: RegridConfig::default(),
            profile: SoilProfile::default(),
            calculator: SafetyFactorCalculator::default(),
            coordinate_units: CoordinateUnits::Degrees,
            n_steps,
        }
    }

    /// 从运行配置构造，先执行配置校验
    pub fn from_config(config: &RunConfig) -> DriverResult<Self> {
        config.validate()?;

        let g = &config.grid;
        let target_grid =
            RectilinearGrid::uniform(g.lon_min, g.lon_max, g.lat_min, g.lat_max, g.resolution_deg)?;

        let policy = match config.hydrology.policy {
            LayerPolicy::Clipped => LayerThicknessPolicy::Clipped,
            LayerPolicy::Proportional => LayerThicknessPolicy::Proportional,
            LayerPolicy::Nominal => LayerThicknessPolicy::Nominal,
        };
        let profile = SoilProfile::new(
            config.hydrology.layer_boundaries.clone(),
            config.hydrology.porosity,
            policy,
        )?;

        let s = &config.stability;
        let params = StabilityParams {
            root_cohesion: s.root_cohesion,
            soil_cohesion: s.soil_cohesion,
            soil_bulk_density: s.soil_bulk_density,
            water_density: s.water_density,
            gravity: s.gravity,
            friction_angle_deg: s.friction_angle_deg,
        };

        let method = match config.run.regrid_method {
            ConfigRegridMethod::Nearest => RegridMethod::Nearest,
            ConfigRegridMethod::Bilinear => RegridMethod::Bilinear,
        };

        Ok(Self {
            target_grid,
            regrid: RegridConfig::with_method(method),
            profile,
            calculator: SafetyFactorCalculator::new(params, config.mask.open_water_depth),
            coordinate_units: CoordinateUnits::Degrees,
            n_steps: config.run.steps,
        })
    }
}
