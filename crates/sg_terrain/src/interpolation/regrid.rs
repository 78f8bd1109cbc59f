// crates/sg_terrain/src/interpolation/regrid.rs

//! 重网格插值器
//!
//! 将定义在一个规则经纬度网格上的场插值到另一个规则网格。
//! 构造时预计算每个目标单元的源单元权重，之后可对任意多个
//! 同网格的场（多个变量、多个时间步）重复使用。
//!
//! # 外推策略
//!
//! 目标坐标落在源坐标范围之外时，按轴截断到最近的源边界坐标
//! （nearest-edge clamp），所有方法统一使用该策略，因此不会产生
//! 因外推导致的 NaN。
//!
//! # 示例
//!
//! ```
//! use sg_terrain::{Field2, RectilinearGrid, RegridConfig, Regridder};
//!
//! let src = RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
//! let dst = RectilinearGrid::new(vec![0.5], vec![0.5]).unwrap();
//! let field = Field2::from_rows(&[vec![0.0, 1.0], vec![10.0, 11.0]]).unwrap();
//!
//! let regridder = Regridder::new(&src, &dst, RegridConfig::default()).unwrap();
//! let out = regridder.regrid(&field).unwrap();
//! assert!((out.values()[0] - 5.5).abs() < 1e-12);
//! ```

use rayon::prelude::*;
use sg_foundation::error::{SgError, SgResult};

use crate::grid::{AxisOrder, RectilinearGrid};
use crate::raster::{Field2, LayeredField};

/// 插值方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegridMethod {
    /// 最近源单元
    Nearest,
    /// 双线性
    #[default]
    Bilinear,
}

impl RegridMethod {
    /// 获取方法名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
        }
    }

    /// 并行阈值（目标单元数）
    pub fn parallel_threshold(&self) -> usize {
        match self {
            Self::Nearest => 20000,
            Self::Bilinear => 5000,
        }
    }

    /// 每个目标单元的最大权重数
    pub fn expected_weights(&self) -> usize {
        match self {
            Self::Nearest => 1,
            Self::Bilinear => 4,
        }
    }
}

/// 重网格配置
#[derive(Debug, Clone)]
pub struct RegridConfig {
    /// 插值方法
    pub method: RegridMethod,
    /// 是否启用并行
    pub parallel_enabled: bool,
    /// 并行阈值，`None` 时使用方法默认值
    pub parallel_threshold: Option<usize>,
}

impl Default for RegridConfig {
    fn default() -> Self {
        Self {
            method: RegridMethod::Bilinear,
            parallel_enabled: true,
            parallel_threshold: None,
        }
    }
}

impl RegridConfig {
    /// 指定方法的默认配置
    pub fn with_method(method: RegridMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }
}

/// 插值权重
#[derive(Debug, Clone, Copy)]
struct Weight {
    /// 源单元索引
    src_idx: u32,
    /// 权重值
    val: f64,
}

/// 单轴上的插值位置：最多两个源索引及其权重
#[derive(Debug, Clone, Copy)]
struct AxisStencil {
    idx: [usize; 2],
    w: [f64; 2],
}

impl AxisStencil {
    fn single(i: usize) -> Self {
        Self {
            idx: [i, i],
            w: [1.0, 0.0],
        }
    }
}

/// 重网格插值器
///
/// 预计算目标网格到源网格的插值权重。
#[derive(Debug)]
pub struct Regridder {
    /// 展平的权重数组
    flat_weights: Vec<Weight>,
    /// 每个目标单元的权重偏移
    offsets: Vec<usize>,
    /// 源场形状 (n_lat, n_lon)
    src_shape: (usize, usize),
    /// 目标场形状 (n_lat, n_lon)
    dst_shape: (usize, usize),
    /// 配置
    config: RegridConfig,
}

impl Regridder {
    /// 从源网格和目标网格创建插值器
    pub fn new(
        source: &RectilinearGrid,
        target: &RectilinearGrid,
        config: RegridConfig,
    ) -> SgResult<Self> {
        if source.n_cells() > u32::MAX as usize {
            return Err(SgError::invalid_grid("源网格单元数超过 u32 索引范围"));
        }

        let method = config.method;
        let lon_stencils: Vec<AxisStencil> = target
            .lon()
            .iter()
            .map(|&x| axis_stencil(source.lon(), source.lon_order(), x, method))
            .collect();
        let lat_stencils: Vec<AxisStencil> = target
            .lat()
            .iter()
            .map(|&y| axis_stencil(source.lat(), source.lat_order(), y, method))
            .collect();

        let src_n_lon = source.n_lon();
        let n_targets = target.n_cells();
        let mut flat_weights = Vec::with_capacity(n_targets * method.expected_weights());
        let mut offsets = Vec::with_capacity(n_targets + 1);
        offsets.push(0);

        for sy in &lat_stencils {
            for sx in &lon_stencils {
                for (&iy, &wy) in sy.idx.iter().zip(&sy.w) {
                    for (&ix, &wx) in sx.idx.iter().zip(&sx.w) {
                        let w = wy * wx;
                        // 零权重不参与计算，避免相邻 NaN 污染
                        if w > 0.0 {
                            flat_weights.push(Weight {
                                src_idx: (iy * src_n_lon + ix) as u32,
                                val: w,
                            });
                        }
                    }
                }
                offsets.push(flat_weights.len());
            }
        }

        log::debug!(
            "重网格权重: {} {:?} -> {:?}, {} 个权重",
            method.name(),
            source.shape(),
            target.shape(),
            flat_weights.len()
        );

        Ok(Self {
            flat_weights,
            offsets,
            src_shape: source.shape(),
            dst_shape: target.shape(),
            config,
        })
    }

    /// 从坐标数组创建插值器
    pub fn from_coords(
        src_lon: &[f64],
        src_lat: &[f64],
        dst_lon: &[f64],
        dst_lat: &[f64],
        config: RegridConfig,
    ) -> SgResult<Self> {
        let source = RectilinearGrid::new(src_lon.to_vec(), src_lat.to_vec())?;
        let target = RectilinearGrid::new(dst_lon.to_vec(), dst_lat.to_vec())?;
        Self::new(&source, &target, config)
    }

    /// 插值单个二维场
    pub fn regrid(&self, source: &Field2) -> SgResult<Field2> {
        let (n_lat, n_lon) = self.dst_shape;
        let mut output = Field2::missing(n_lat, n_lon);
        self.regrid_into(source, &mut output)?;
        Ok(output)
    }

    /// 插值到已分配的输出场
    pub fn regrid_into(&self, source: &Field2, output: &mut Field2) -> SgResult<()> {
        SgError::check_shape("regrid source", self.src_shape, source.shape())?;
        SgError::check_shape("regrid output", self.dst_shape, output.shape())?;

        let src = source.values();
        let out = output.values_mut();
        let threshold = self
            .config
            .parallel_threshold
            .unwrap_or_else(|| self.config.method.parallel_threshold());

        if self.config.parallel_enabled && out.len() >= threshold {
            out.par_iter_mut()
                .enumerate()
                .for_each(|(i, v)| *v = self.evaluate(i, src));
        } else {
            for (i, v) in out.iter_mut().enumerate() {
                *v = self.evaluate(i, src);
            }
        }

        Ok(())
    }

    /// 逐层插值多层场，保持层顺序
    pub fn regrid_layers(&self, source: &LayeredField) -> SgResult<LayeredField> {
        let layers = source
            .layers()
            .iter()
            .map(|layer| self.regrid(layer))
            .collect::<SgResult<Vec<_>>>()?;
        LayeredField::new(layers)
    }

    /// 计算单个目标单元
    ///
    /// NaN 源值被跳过，其余权重重新归一化；全部为 NaN 时结果为 NaN。
    #[inline]
    fn evaluate(&self, i: usize, src: &[f64]) -> f64 {
        let start = self.offsets[i];
        let end = self.offsets[i + 1];

        let mut sum = 0.0;
        let mut weight_sum = 0.0;
        for w in &self.flat_weights[start..end] {
            let val = src[w.src_idx as usize];
            if val.is_nan() {
                continue;
            }
            sum += val * w.val;
            weight_sum += w.val;
        }

        if weight_sum > 0.0 {
            sum / weight_sum
        } else {
            f64::NAN
        }
    }

    /// 源场形状
    pub fn src_shape(&self) -> (usize, usize) {
        self.src_shape
    }

    /// 目标场形状
    pub fn dst_shape(&self) -> (usize, usize) {
        self.dst_shape
    }

    /// 获取总权重数量
    pub fn n_weights(&self) -> usize {
        self.flat_weights.len()
    }

    /// 获取配置
    pub fn config(&self) -> &RegridConfig {
        &self.config
    }
}

/// 一次性重网格
///
/// 适用于只插值一次的静态场（如土深）；多次插值请复用 [`Regridder`]。
pub fn regrid_field(
    source_grid: &RectilinearGrid,
    source: &Field2,
    target_grid: &RectilinearGrid,
    method: RegridMethod,
) -> SgResult<Field2> {
    Regridder::new(source_grid, target_grid, RegridConfig::with_method(method))?.regrid(source)
}

/// 计算目标坐标在源轴上的模板
fn axis_stencil(coords: &[f64], order: AxisOrder, x: f64, method: RegridMethod) -> AxisStencil {
    let n = coords.len();
    if n == 1 {
        return AxisStencil::single(0);
    }

    // 统一按递增位置处理，递减轴在返回前映射回原索引
    let at = |k: usize| match order {
        AxisOrder::Ascending => coords[k],
        AxisOrder::Descending => coords[n - 1 - k],
    };
    let to_index = |k: usize| match order {
        AxisOrder::Ascending => k,
        AxisOrder::Descending => n - 1 - k,
    };

    let lo = at(0);
    let hi = at(n - 1);
    let xc = x.clamp(lo, hi);

    // 第一个大于 xc 的位置
    let mut upper = 0;
    let mut count = n;
    while count > 0 {
        let step = count / 2;
        if at(upper + step) <= xc {
            upper += step + 1;
            count -= step + 1;
        } else {
            count = step;
        }
    }
    let k0 = upper.saturating_sub(1).min(n - 2);
    let k1 = k0 + 1;
    let frac = (xc - at(k0)) / (at(k1) - at(k0));

    match method {
        RegridMethod::Nearest => {
            let k = if frac <= 0.5 { k0 } else { k1 };
            AxisStencil::single(to_index(k))
        }
        RegridMethod::Bilinear => AxisStencil {
            idx: [to_index(k0), to_index(k1)],
            w: [1.0 - frac, frac],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_field() -> (RectilinearGrid, Field2) {
        // 4x4 场，值 = i_lon + i_lat * 10
        let grid = RectilinearGrid::new(
            vec![0.0, 10.0, 20.0, 30.0],
            vec![0.0, 10.0, 20.0, 30.0],
        )
        .unwrap();
        let mut data = Vec::with_capacity(16);
        for y in 0..4 {
            for x in 0..4 {
                data.push((x + y * 10) as f64);
            }
        }
        (grid, Field2::from_vec(data, 4, 4).unwrap())
    }

    #[test]
    fn test_identity_regrid() {
        let (grid, field) = create_test_field();
        for method in [RegridMethod::Bilinear, RegridMethod::Nearest] {
            let out = regrid_field(&grid, &field, &grid, method).unwrap();
            for (a, b) in out.values().iter().zip(field.values()) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_bilinear_center() {
        let (grid, field) = create_test_field();
        // (5, 5) 位于 0, 1, 10, 11 四点中心
        let dst = RectilinearGrid::new(vec![5.0], vec![5.0]).unwrap();
        let out = regrid_field(&grid, &field, &dst, RegridMethod::Bilinear).unwrap();
        assert!((out.values()[0] - 5.5).abs() < 1e-12);
    }

    #[test]
    fn test_nearest() {
        let (grid, field) = create_test_field();
        // (14, 26) -> 最近 (10, 30) = 1 + 30 = 31
        let dst = RectilinearGrid::new(vec![14.0], vec![26.0]).unwrap();
        let out = regrid_field(&grid, &field, &dst, RegridMethod::Nearest).unwrap();
        assert!((out.values()[0] - 31.0).abs() < 1e-12);
    }

    #[test]
    fn test_edge_clamp_extrapolation() {
        let (grid, field) = create_test_field();
        // 完全在源范围之外：截断到最近角点 (30, 30) = 33
        let dst = RectilinearGrid::new(vec![100.0, -50.0], vec![100.0]).unwrap();
        let out = regrid_field(&grid, &field, &dst, RegridMethod::Bilinear).unwrap();
        assert!((out.values()[0] - 33.0).abs() < 1e-12);
        // (-50 -> 0, 100 -> 30) = 30
        assert!((out.values()[1] - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_output_shape_follows_target() {
        let (grid, field) = create_test_field();
        let dst = RectilinearGrid::uniform(0.0, 30.0, 0.0, 15.0, 2.5).unwrap();
        let out = regrid_field(&grid, &field, &dst, RegridMethod::Bilinear).unwrap();
        assert_eq!(out.shape(), (dst.n_lat(), dst.n_lon()));
        assert_eq!(out.shape(), (7, 13));
    }

    #[test]
    fn test_descending_source_axis() {
        // 纬度递减的源网格与递增网格给出相同结果
        let asc = RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        let desc = RectilinearGrid::new(vec![0.0, 1.0], vec![1.0, 0.0]).unwrap();
        let f_asc = Field2::from_rows(&[vec![0.0, 1.0], vec![10.0, 11.0]]).unwrap();
        let f_desc = Field2::from_rows(&[vec![10.0, 11.0], vec![0.0, 1.0]]).unwrap();
        let dst = RectilinearGrid::new(vec![0.25, 0.75], vec![0.2, 0.9]).unwrap();

        let a = regrid_field(&asc, &f_asc, &dst, RegridMethod::Bilinear).unwrap();
        let b = regrid_field(&desc, &f_desc, &dst, RegridMethod::Bilinear).unwrap();
        for (x, y) in a.values().iter().zip(b.values()) {
            assert!((x - y).abs() < 1e-12);
        }
        // (0.25, 0.2): 0.25 + 0.2 * 10
        assert!((a.values()[0] - 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_nan_source_renormalized() {
        let grid = RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        let field = Field2::from_rows(&[vec![f64::NAN, 2.0], vec![2.0, 2.0]]).unwrap();
        let dst = RectilinearGrid::new(vec![0.5], vec![0.5]).unwrap();
        let out = regrid_field(&grid, &field, &dst, RegridMethod::Bilinear).unwrap();
        assert!((out.values()[0] - 2.0).abs() < 1e-12);

        let all_nan = Field2::missing(2, 2);
        let out = regrid_field(&grid, &all_nan, &dst, RegridMethod::Bilinear).unwrap();
        assert!(out.values()[0].is_nan());
    }

    #[test]
    fn test_source_shape_mismatch() {
        let (grid, _) = create_test_field();
        let regridder = Regridder::new(&grid, &grid, RegridConfig::default()).unwrap();
        assert!(regridder.regrid(&Field2::filled(3, 4, 0.0)).is_err());
    }

    #[test]
    fn test_from_coords_rejects_non_monotonic() {
        let result = Regridder::from_coords(
            &[0.0, 1.0],
            &[0.0, 1.0],
            &[0.0, 0.5, 0.2],
            &[0.0],
            RegridConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_regrid_layers_preserves_order() {
        let (grid, field) = create_test_field();
        let doubled = field.map(|v| v * 2.0);
        let layers = LayeredField::new(vec![field.clone(), doubled]).unwrap();
        let dst = RectilinearGrid::new(vec![5.0], vec![5.0]).unwrap();
        let regridder = Regridder::new(&grid, &dst, RegridConfig::default()).unwrap();

        let out = regridder.regrid_layers(&layers).unwrap();
        assert_eq!(out.n_layers(), 2);
        assert!((out.layer(0).unwrap().values()[0] - 5.5).abs() < 1e-12);
        assert!((out.layer(1).unwrap().values()[0] - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let (grid, field) = create_test_field();
        let dst = RectilinearGrid::uniform(-5.0, 35.0, -5.0, 35.0, 0.5).unwrap();

        let serial = Regridder::new(
            &grid,
            &dst,
            RegridConfig {
                parallel_enabled: false,
                ..Default::default()
            },
        )
        .unwrap();
        let parallel = Regridder::new(
            &grid,
            &dst,
            RegridConfig {
                parallel_threshold: Some(1),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(
            serial.regrid(&field).unwrap().values(),
            parallel.regrid(&field).unwrap().values()
        );
    }
}
