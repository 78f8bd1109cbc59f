// crates/sg_physics/src/hydrology.rs

//! 土层水文：地下流水深
//!
//! 将分层体积含水量换算为等效的饱和水柱深度：
//!
//! ```text
//! h_w = Σ_i  θ_i · t_i(h_s) / n
//! ```
//!
//! 其中 `θ_i` 为第 i 层体积含水量，`n` 为有效孔隙度，`t_i(h_s)` 为由
//! 局部土深推得的层厚，具体取决于 [`LayerThicknessPolicy`]。
//!
//! 输入不做物理范围校验：负土深或超出 [0, 1] 的含水量按算术传播，
//! NaN 输入得到 NaN 输出。
//!
//! # 示例
//!
//! ```
//! use sg_physics::hydrology::SoilProfile;
//!
//! let profile = SoilProfile::era5_land();
//! let h_w = profile.flow_depth_at(1.0, &[0.30, 0.32, 0.28, 0.25]);
//! assert!((h_w - 0.5796).abs() < 1e-12);
//! ```

use sg_foundation::ensure;
use sg_foundation::error::{SgError, SgResult};
use sg_terrain::{Field2, LayeredField};

/// 土层厚度方案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerThicknessPolicy {
    /// 层厚 = clamp(h_s, 上界, 下界) − 上界，土深以下的层贡献为零
    #[default]
    Clipped,
    /// 边界按 h_s / 剖面总深 等比缩放
    Proportional,
    /// 固定名义层厚，与土深无关
    Nominal,
}

impl LayerThicknessPolicy {
    /// 获取方案名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clipped => "clipped",
            Self::Proportional => "proportional",
            Self::Nominal => "nominal",
        }
    }
}

/// 土壤剖面
#[derive(Debug, Clone, PartialEq)]
pub struct SoilProfile {
    boundaries: Vec<f64>,
    porosity: f64,
    policy: LayerThicknessPolicy,
}

impl SoilProfile {
    /// 创建剖面
    ///
    /// `boundaries` 为层边界深度 [m]，首项为 0 且严格递增。
    pub fn new(boundaries: Vec<f64>, porosity: f64, policy: LayerThicknessPolicy) -> SgResult<Self> {
        ensure!(
            boundaries.len() >= 2,
            SgError::invalid_config(
                "layer_boundaries",
                format!("{boundaries:?}"),
                "至少需要两个边界",
            )
        );
        ensure!(
            boundaries[0] == 0.0 && boundaries.windows(2).all(|w| w[1] > w[0]),
            SgError::invalid_config(
                "layer_boundaries",
                format!("{boundaries:?}"),
                "边界必须从 0 开始严格递增",
            )
        );
        ensure!(
            porosity > 0.0,
            SgError::invalid_config("porosity", porosity.to_string(), "必须为正")
        );
        Ok(Self {
            boundaries,
            porosity,
            policy,
        })
    }

    /// ERA5-Land 四层方案（0–7, 7–28, 28–100, 100–289 cm），孔隙度 0.5
    pub fn era5_land() -> Self {
        Self {
            boundaries: vec![0.0, 0.07, 0.28, 1.0, 2.89],
            porosity: 0.5,
            policy: LayerThicknessPolicy::Clipped,
        }
    }

    /// 替换厚度方案
    pub fn with_policy(mut self, policy: LayerThicknessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 层数
    #[inline]
    pub fn n_layers(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// 剖面总深 [m]
    #[inline]
    pub fn total_depth(&self) -> f64 {
        self.boundaries[self.boundaries.len() - 1]
    }

    /// 层边界
    #[inline]
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// 有效孔隙度
    #[inline]
    pub fn porosity(&self) -> f64 {
        self.porosity
    }

    /// 厚度方案
    #[inline]
    pub fn policy(&self) -> LayerThicknessPolicy {
        self.policy
    }

    /// 第 `layer` 层在给定土深下的厚度 [m]
    #[inline]
    pub fn layer_thickness(&self, layer: usize, soil_depth: f64) -> f64 {
        let top = self.boundaries[layer];
        let bottom = self.boundaries[layer + 1];
        match self.policy {
            LayerThicknessPolicy::Clipped => {
                // clamp 对 NaN 返回 NaN
                soil_depth.clamp(top, bottom) - top
            }
            LayerThicknessPolicy::Proportional => {
                (bottom - top) * soil_depth / self.total_depth()
            }
            LayerThicknessPolicy::Nominal => bottom - top,
        }
    }

    /// 单点地下流水深 [m]
    ///
    /// `moisture` 长度须等于层数，调用方负责保证。
    #[inline]
    pub fn flow_depth_at(&self, soil_depth: f64, moisture: &[f64]) -> f64 {
        moisture
            .iter()
            .enumerate()
            .map(|(layer, &theta)| theta * self.layer_thickness(layer, soil_depth) / self.porosity)
            .sum()
    }

    /// 计算地下流水深场 [m]
    pub fn subsurface_flow_depth(
        &self,
        soil_depth: &Field2,
        moisture: &LayeredField,
    ) -> SgResult<Field2> {
        SgError::check_size("soil moisture layers", self.n_layers(), moisture.n_layers())?;
        SgError::check_shape("soil moisture", soil_depth.shape(), moisture.shape())?;

        let (n_lat, n_lon) = soil_depth.shape();
        let depth = soil_depth.values();
        let layers = moisture.layers();
        let mut theta = vec![0.0; self.n_layers()];

        let data = (0..depth.len())
            .map(|idx| {
                for (t, layer) in theta.iter_mut().zip(layers) {
                    *t = layer.values()[idx];
                }
                self.flow_depth_at(depth[idx], &theta)
            })
            .collect();

        Field2::from_vec(data, n_lat, n_lon)
    }
}

impl Default for SoilProfile {
    fn default() -> Self {
        Self::era5_land()
    }
}
