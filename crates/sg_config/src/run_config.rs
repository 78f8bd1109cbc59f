// crates/sg_config/src/run_config.rs

//! RunConfig - 单次运行配置（全 f64）
//!
//! 默认值对应波多黎各研究区、ERA5-Land 四层土壤水方案以及
//! 常用的无限坡稳定性参数。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// 运行配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunConfig {
    /// 目标网格（研究区）
    #[serde(default)]
    pub grid: GridConfig,

    /// 岩土稳定性参数
    #[serde(default)]
    pub stability: StabilityConfig,

    /// 土层与孔隙度
    #[serde(default)]
    pub hydrology: HydrologyConfig,

    /// 有效性掩膜
    #[serde(default)]
    pub mask: MaskConfig,

    /// 时间步进
    #[serde(default)]
    pub run: RunSettings,

    /// 输出
    #[serde(default)]
    pub output: OutputConfig,
}

/// 目标网格配置（经纬度，度）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// 西边界经度
    #[serde(default = "default_lon_min")]
    pub lon_min: f64,
    /// 东边界经度
    #[serde(default = "default_lon_max")]
    pub lon_max: f64,
    /// 南边界纬度
    #[serde(default = "default_lat_min")]
    pub lat_min: f64,
    /// 北边界纬度
    #[serde(default = "default_lat_max")]
    pub lat_max: f64,
    /// 网格间距 [度]
    #[serde(default = "default_resolution")]
    pub resolution_deg: f64,
}

fn default_lon_min() -> f64 { -67.3 }
fn default_lon_max() -> f64 { -65.2 }
fn default_lat_min() -> f64 { 17.9 }
fn default_lat_max() -> f64 { 18.55 }
fn default_resolution() -> f64 { 0.01 }

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            lon_min: default_lon_min(),
            lon_max: default_lon_max(),
            lat_min: default_lat_min(),
            lat_max: default_lat_max(),
            resolution_deg: default_resolution(),
        }
    }
}

/// 无限坡稳定性参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// 根系黏聚力 [Pa]
    #[serde(default = "default_cohesion")]
    pub root_cohesion: f64,
    /// 土体黏聚力 [Pa]
    #[serde(default = "default_cohesion")]
    pub soil_cohesion: f64,
    /// 土体容重 [kg/m³]
    #[serde(default = "default_bulk_density")]
    pub soil_bulk_density: f64,
    /// 水密度 [kg/m³]
    #[serde(default = "default_water_density")]
    pub water_density: f64,
    /// 重力加速度 [m/s²]
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    /// 内摩擦角 [度]
    #[serde(default = "default_friction_angle")]
    pub friction_angle_deg: f64,
}

fn default_cohesion() -> f64 { 5000.0 }
fn default_bulk_density() -> f64 { 1300.0 }
fn default_water_density() -> f64 { 1000.0 }
fn default_gravity() -> f64 { 9.806 }
fn default_friction_angle() -> f64 { 35.0 }

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            root_cohesion: default_cohesion(),
            soil_cohesion: default_cohesion(),
            soil_bulk_density: default_bulk_density(),
            water_density: default_water_density(),
            gravity: default_gravity(),
            friction_angle_deg: default_friction_angle(),
        }
    }
}

/// 土层厚度方案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayerPolicy {
    /// 按土层边界截断土深
    #[default]
    Clipped,
    /// 按土深与剖面总深之比缩放边界
    Proportional,
    /// 固定名义厚度
    Nominal,
}

/// 土层配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydrologyConfig {
    /// 土层边界深度 [m]，首项为 0
    #[serde(default = "default_layer_boundaries")]
    pub layer_boundaries: Vec<f64>,
    /// 有效孔隙度
    #[serde(default = "default_porosity")]
    pub porosity: f64,
    /// 厚度方案
    #[serde(default)]
    pub policy: LayerPolicy,
}

fn default_layer_boundaries() -> Vec<f64> { vec![0.0, 0.07, 0.28, 1.0, 2.89] }
fn default_porosity() -> f64 { 0.5 }

impl Default for HydrologyConfig {
    fn default() -> Self {
        Self {
            layer_boundaries: default_layer_boundaries(),
            porosity: default_porosity(),
            policy: LayerPolicy::default(),
        }
    }
}

/// 有效性掩膜配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskConfig {
    /// 开阔水体土深阈值 [m]
    #[serde(default = "default_open_water_depth")]
    pub open_water_depth: f64,
}

fn default_open_water_depth() -> f64 { 2.0 }

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            open_water_depth: default_open_water_depth(),
        }
    }
}

/// 重网格方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegridMethod {
    /// 最近源单元
    Nearest,
    /// 双线性
    #[default]
    Bilinear,
}

/// 时间步进配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    /// 时间步数
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// 重网格方法
    #[serde(default)]
    pub regrid_method: RegridMethod,
}

fn default_steps() -> usize { 48 }

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            regrid_method: RegridMethod::default(),
        }
    }
}

/// 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 输出目录
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// 是否输出逐步 PNG 帧
    #[serde(default = "default_true")]
    pub frames: bool,
    /// 是否合成 GIF 动画
    #[serde(default = "default_true")]
    pub animation: bool,
    /// 是否导出时间序列 CSV
    #[serde(default = "default_true")]
    pub csv: bool,
    /// 动画帧间隔 [ms]
    #[serde(default = "default_frame_delay")]
    pub frame_delay_ms: u32,
}

fn default_output_dir() -> PathBuf { PathBuf::from("output") }
fn default_true() -> bool { true }
fn default_frame_delay() -> u32 { 250 }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            frames: true,
            animation: true,
            csv: true,
            frame_delay_ms: default_frame_delay(),
        }
    }
}

impl RunConfig {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json(&content)
    }

    /// 从 JSON 字符串解析并验证
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.grid;
        if !(g.lon_min < g.lon_max) {
            return Err(ConfigError::invalid("grid.lon_min", g.lon_min, "必须小于 lon_max"));
        }
        if !(g.lat_min < g.lat_max) {
            return Err(ConfigError::invalid("grid.lat_min", g.lat_min, "必须小于 lat_max"));
        }
        if !(g.resolution_deg > 0.0) {
            return Err(ConfigError::invalid("grid.resolution_deg", g.resolution_deg, "必须为正"));
        }

        let s = &self.stability;
        if !(s.soil_bulk_density > 0.0) {
            return Err(ConfigError::invalid(
                "stability.soil_bulk_density",
                s.soil_bulk_density,
                "必须为正",
            ));
        }
        if !(s.water_density > 0.0) {
            return Err(ConfigError::invalid("stability.water_density", s.water_density, "必须为正"));
        }
        if !(s.gravity > 0.0) {
            return Err(ConfigError::invalid("stability.gravity", s.gravity, "必须为正"));
        }
        if !(0.0..90.0).contains(&s.friction_angle_deg) {
            return Err(ConfigError::invalid(
                "stability.friction_angle_deg",
                s.friction_angle_deg,
                "必须在 [0, 90) 范围内",
            ));
        }

        let h = &self.hydrology;
        if !(h.porosity > 0.0) {
            return Err(ConfigError::invalid("hydrology.porosity", h.porosity, "必须为正"));
        }
        if h.layer_boundaries.len() < 2 {
            return Err(ConfigError::invalid(
                "hydrology.layer_boundaries",
                format!("{:?}", h.layer_boundaries),
                "至少需要两个边界",
            ));
        }
        if h.layer_boundaries[0] != 0.0 {
            return Err(ConfigError::invalid(
                "hydrology.layer_boundaries",
                format!("{:?}", h.layer_boundaries),
                "首个边界必须为 0",
            ));
        }
        if h.layer_boundaries.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(ConfigError::invalid(
                "hydrology.layer_boundaries",
                format!("{:?}", h.layer_boundaries),
                "边界必须严格递增",
            ));
        }

        if !(self.mask.open_water_depth > 0.0) {
            return Err(ConfigError::invalid(
                "mask.open_water_depth",
                self.mask.open_water_depth,
                "必须为正",
            ));
        }

        if self.run.steps == 0 {
            return Err(ConfigError::invalid("run.steps", 0, "至少需要一个时间步"));
        }

        Ok(())
    }

    /// 土层数
    #[inline]
    pub fn n_layers(&self) -> usize {
        self.hydrology.layer_boundaries.len().saturating_sub(1)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_layers(), 4);
        assert_eq!(config.run.steps, 48);
        assert_eq!(config.hydrology.policy, LayerPolicy::Clipped);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RunConfig::from_json(r#"{"run": {"steps": 6}, "mask": {}}"#).unwrap();
        assert_eq!(config.run.steps, 6);
        assert!((config.mask.open_water_depth - 2.0).abs() < 1e-12);
        assert!((config.stability.gravity - 9.806).abs() < 1e-12);
    }

    #[test]
    fn test_policy_lowercase() {
        let config =
            RunConfig::from_json(r#"{"hydrology": {"policy": "proportional"}}"#).unwrap();
        assert_eq!(config.hydrology.policy, LayerPolicy::Proportional);
    }

    #[test]
    fn test_invalid_porosity() {
        let mut config = RunConfig::default();
        config.hydrology.porosity = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_monotonic_boundaries() {
        let mut config = RunConfig::default();
        config.hydrology.layer_boundaries = vec![0.0, 0.28, 0.07, 1.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_steps() {
        let mut config = RunConfig::default();
        config.run.steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_extent() {
        let mut config = RunConfig::default();
        config.grid.lat_min = 19.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");

        let mut config = RunConfig::default();
        config.run.steps = 12;
        config.run.regrid_method = RegridMethod::Nearest;
        config.save_to_file(&path).unwrap();

        let loaded = RunConfig::from_file(&path).unwrap();
        assert_eq!(loaded.run.steps, 12);
        assert_eq!(loaded.run.regrid_method, RegridMethod::Nearest);
    }
}
