// crates/sg_physics/src/stability.rs

//! 无限坡稳定性
//!
//! 安全系数（Factor of Safety）：
//!
//! ```text
//! FS = (C_r + C_s) / (h_s · ρ_s · g · sin θ)
//!    + cos θ · tan φ · (1 − (h_w / h_s) · ρ_w / ρ_s) / sin θ
//! ```
//!
//! 易发性为 `1 / FS`。FS > 1 稳定，FS < 1 易失稳，这只是诊断分类，
//! 不是概率。
//!
//! # 两阶段计算
//!
//! 1. 先由坡度和土深构造有效性掩膜：坡度恰为 0 且土深超过开阔水体
//!    阈值的单元、以及任一输入为 NaN 的单元无效；
//! 2. 仅对有效单元求值，公式结果为 NaN（例如 0/0）的单元同样标记为无效。
//!
//! 无效单元的安全系数与易发性均为 NaN（缺测），不会作为错误上抛。

use sg_foundation::error::{SgError, SgResult};
use sg_terrain::Field2;

/// 岩土参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityParams {
    /// 根系黏聚力 C_r [Pa]
    pub root_cohesion: f64,
    /// 土体黏聚力 C_s [Pa]
    pub soil_cohesion: f64,
    /// 土体容重 ρ_s [kg/m³]
    pub soil_bulk_density: f64,
    /// 水密度 ρ_w [kg/m³]
    pub water_density: f64,
    /// 重力加速度 g [m/s²]
    pub gravity: f64,
    /// 内摩擦角 φ [度]
    pub friction_angle_deg: f64,
}

impl Default for StabilityParams {
    fn default() -> Self {
        Self {
            root_cohesion: 5000.0,
            soil_cohesion: 5000.0,
            soil_bulk_density: 1300.0,
            water_density: 1000.0,
            gravity: 9.806,
            friction_angle_deg: 35.0,
        }
    }
}

impl StabilityParams {
    /// tan φ
    #[inline]
    pub fn tan_phi(&self) -> f64 {
        (self.friction_angle_deg * std::f64::consts::PI / 180.0).tan()
    }

    /// 总黏聚力 C_r + C_s
    #[inline]
    pub fn total_cohesion(&self) -> f64 {
        self.root_cohesion + self.soil_cohesion
    }
}

/// 单点安全系数
///
/// 不对除零做保护：θ = 0 得到 ±∞ 或 NaN，由调用方的掩膜处理。
#[inline]
pub fn safety_factor(slope: f64, flow_depth: f64, soil_depth: f64, params: &StabilityParams) -> f64 {
    let sin_theta = slope.sin();
    let relative_wetness = flow_depth / soil_depth;

    let left = params.total_cohesion()
        / (soil_depth * params.soil_bulk_density * params.gravity)
        / sin_theta;
    let right = slope.cos()
        * params.tan_phi()
        * (1.0 - relative_wetness * params.water_density / params.soil_bulk_density)
        / sin_theta;

    left + right
}

/// 稳定性分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityClass {
    /// FS ≥ 1
    Stable,
    /// FS < 1
    Unstable,
    /// 缺测
    Missing,
}

impl StabilityClass {
    /// 由安全系数分类
    #[inline]
    pub fn from_safety_factor(fs: f64) -> Self {
        if fs.is_nan() {
            Self::Missing
        } else if fs < 1.0 {
            Self::Unstable
        } else {
            Self::Stable
        }
    }
}

/// 有效性掩膜
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityMask {
    valid: Vec<bool>,
    shape: (usize, usize),
}

impl ValidityMask {
    /// 由坡度和土深构造掩膜
    ///
    /// 坡度恰为 0 且土深大于 `open_water_depth` 的单元视为开阔水体/无数据；
    /// 坡度或土深为 NaN 的单元同样无效。
    pub fn from_terrain(slope: &Field2, soil_depth: &Field2, open_water_depth: f64) -> SgResult<Self> {
        SgError::check_shape("validity mask", slope.shape(), soil_depth.shape())?;
        let valid = slope
            .values()
            .iter()
            .zip(soil_depth.values())
            .map(|(&s, &d)| !(s.is_nan() || d.is_nan() || (s == 0.0 && d > open_water_depth)))
            .collect();
        Ok(Self {
            valid,
            shape: slope.shape(),
        })
    }

    /// 单元是否有效
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        self.valid[idx]
    }

    /// 标记单元无效
    #[inline]
    pub fn invalidate(&mut self, idx: usize) {
        self.valid[idx] = false;
    }

    /// 有效单元数
    pub fn n_valid(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// 无效单元数
    pub fn n_masked(&self) -> usize {
        self.valid.len() - self.n_valid()
    }

    /// 形状
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// 原始标记
    #[inline]
    pub fn as_slice(&self) -> &[bool] {
        &self.valid
    }
}

/// 稳定性计算结果
#[derive(Debug, Clone)]
pub struct StabilityField {
    /// 安全系数
    pub safety_factor: Field2,
    /// 易发性 (1 / FS)
    pub susceptibility: Field2,
    /// 最终有效性掩膜
    pub mask: ValidityMask,
}

impl StabilityField {
    /// 易失稳单元数 (FS < 1)
    pub fn n_unstable(&self) -> usize {
        self.safety_factor
            .values()
            .iter()
            .filter(|&&fs| StabilityClass::from_safety_factor(fs) == StabilityClass::Unstable)
            .count()
    }

    /// 单元分类
    pub fn class_at(&self, i_lat: usize, i_lon: usize) -> StabilityClass {
        self.safety_factor
            .get(i_lat, i_lon)
            .map_or(StabilityClass::Missing, StabilityClass::from_safety_factor)
    }
}

/// 安全系数计算器
#[derive(Debug, Clone)]
pub struct SafetyFactorCalculator {
    params: StabilityParams,
    open_water_depth: f64,
}

impl SafetyFactorCalculator {
    /// 默认开阔水体土深阈值 [m]
    pub const DEFAULT_OPEN_WATER_DEPTH: f64 = 2.0;

    /// 创建计算器
    pub fn new(params: StabilityParams, open_water_depth: f64) -> Self {
        Self {
            params,
            open_water_depth,
        }
    }

    /// 岩土参数
    pub fn params(&self) -> &StabilityParams {
        &self.params
    }

    /// 开阔水体阈值
    pub fn open_water_depth(&self) -> f64 {
        self.open_water_depth
    }

    /// 计算安全系数与易发性
    pub fn compute(
        &self,
        slope: &Field2,
        flow_depth: &Field2,
        soil_depth: &Field2,
    ) -> SgResult<StabilityField> {
        SgError::check_shape("flow depth", slope.shape(), flow_depth.shape())?;
        let mut mask = ValidityMask::from_terrain(slope, soil_depth, self.open_water_depth)?;

        let (n_lat, n_lon) = slope.shape();
        let mut fs_field = Field2::missing(n_lat, n_lon);
        let mut sus_field = Field2::missing(n_lat, n_lon);

        let theta = slope.values();
        let h_w = flow_depth.values();
        let h_s = soil_depth.values();
        let mut degenerate = 0usize;

        {
            let fs_out = fs_field.values_mut();
            let sus_out = sus_field.values_mut();
            for idx in 0..theta.len() {
                if !mask.is_valid(idx) {
                    continue;
                }
                let fs = safety_factor(theta[idx], h_w[idx], h_s[idx], &self.params);
                if fs.is_nan() {
                    mask.invalidate(idx);
                    degenerate += 1;
                    continue;
                }
                fs_out[idx] = fs;
                sus_out[idx] = 1.0 / fs;
            }
        }

        log::debug!(
            "稳定性: {} 有效, {} 掩膜 (其中 {} 个退化单元)",
            mask.n_valid(),
            mask.n_masked(),
            degenerate
        );

        Ok(StabilityField {
            safety_factor: fs_field,
            susceptibility: sus_field,
            mask,
        })
    }
}

impl Default for SafetyFactorCalculator {
    fn default() -> Self {
        Self::new(StabilityParams::default(), Self::DEFAULT_OPEN_WATER_DEPTH)
    }
}
