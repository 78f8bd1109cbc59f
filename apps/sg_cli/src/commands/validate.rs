// apps/sg_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 验证运行配置、静态网格文件与强迫帧文件。

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Args;
use sg_config::RunConfig;
use sg_io::source::load_forcing_frames;
use sg_io::{load_grid_file, ForcingSource};
use tracing::{error, info, warn};

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 高程或土深网格文件（可重复）
    #[arg(short, long)]
    pub grid: Vec<PathBuf>,

    /// 强迫帧文件
    #[arg(short, long)]
    pub forcing: Option<PathBuf>,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 验证结果
#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn is_ok_strict(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== SlopeGuard 配置验证 ===");

    if args.config.is_none() && args.grid.is_empty() && args.forcing.is_none() {
        println!("用法: sg_cli validate --config <配置文件> [--grid <网格文件>]... [--forcing <强迫帧文件>]");
        return Ok(());
    }

    let mut result = ValidationResult::default();
    let mut config = None;

    if let Some(path) = &args.config {
        config = validate_config(path, &mut result);
    }
    for path in &args.grid {
        validate_grid(path, config.as_ref(), &mut result);
    }
    if let Some(path) = &args.forcing {
        validate_forcing(path, config.as_ref(), &mut result);
    }

    print_validation_result(&result, args.strict)
}

fn validate_config(path: &Path, result: &mut ValidationResult) -> Option<RunConfig> {
    println!("\n检查配置文件: {}", path.display());

    if !path.exists() {
        result.add_error(format!("配置文件不存在: {}", path.display()));
        return None;
    }

    let config = match RunConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            result.add_error(format!("配置无效: {}", e));
            return None;
        }
    };

    check_config_ranges(&config, result);
    println!("  ✓ 配置文件格式有效");
    Some(config)
}

/// 合法但可疑的取值
fn check_config_ranges(config: &RunConfig, result: &mut ValidationResult) {
    let s = &config.stability;
    if (s.gravity - 9.81).abs() > 1.0 {
        result.add_warning(format!("重力加速度 {} 偏离地球标准值较大", s.gravity));
    }
    if s.friction_angle_deg < 10.0 || s.friction_angle_deg > 60.0 {
        result.add_warning(format!("内摩擦角 {}° 超出常见土体范围", s.friction_angle_deg));
    }
    if s.soil_bulk_density <= s.water_density {
        result.add_warning("土体容重不大于水密度");
    }

    let h = &config.hydrology;
    if h.porosity > 1.0 {
        result.add_warning(format!("有效孔隙度 {} 大于 1", h.porosity));
    }
    if config.n_layers() != 4 {
        result.add_warning(format!(
            "土层数为 {}, 强迫数据需提供相同层数的土壤含水量",
            config.n_layers()
        ));
    }

    let g = &config.grid;
    let n_lon = ((g.lon_max - g.lon_min) / g.resolution_deg).round() as usize + 1;
    let n_lat = ((g.lat_max - g.lat_min) / g.resolution_deg).round() as usize + 1;
    if n_lon * n_lat > 4_000_000 {
        result.add_warning(format!("目标网格 {}x{} 较大，帧渲染可能较慢", n_lat, n_lon));
    }

    if config.output.frame_delay_ms == 0 {
        result.add_warning("帧间隔为 0 ms");
    }
}

fn validate_grid(path: &Path, config: Option<&RunConfig>, result: &mut ValidationResult) {
    println!("\n检查网格文件: {}", path.display());

    let gridded = match load_grid_file(path) {
        Ok(g) => g,
        Err(e) => {
            result.add_error(format!("{}: {}", path.display(), e));
            return;
        }
    };

    let stats = gridded.field.statistics();
    if stats.valid_count == 0 {
        result.add_error(format!("{}: 没有有效值", path.display()));
        return;
    }
    if stats.missing_count() > 0 {
        result.add_warning(format!("{}: {} 个缺测单元", path.display(), stats.missing_count()));
    }

    if let Some(config) = config {
        check_coverage(path, gridded.grid.lon(), gridded.grid.lat(), config, result);
    }

    println!(
        "  ✓ {}x{} 网格, 值域 [{:.3}, {:.3}]",
        gridded.grid.n_lat(),
        gridded.grid.n_lon(),
        stats.min,
        stats.max
    );
}

fn validate_forcing(path: &Path, config: Option<&RunConfig>, result: &mut ValidationResult) {
    println!("\n检查强迫帧文件: {}", path.display());

    let source = match load_forcing_frames(path) {
        Ok(s) => s,
        Err(e) => {
            result.add_error(format!("{}: {}", path.display(), e));
            return;
        }
    };

    let meta = source.metadata();
    if let Some(config) = config {
        if meta.n_steps < config.run.steps {
            result.add_warning(format!(
                "强迫数据只有 {} 步, 配置要求 {} 步",
                meta.n_steps, config.run.steps
            ));
        }
        check_coverage(path, source.grid().lon(), source.grid().lat(), config, result);
    }

    println!("  ✓ {} 个时间步, 起始 {}", meta.n_steps, meta.start);
}

/// 数据范围应覆盖研究区，否则边缘按最近边界外推
fn check_coverage(
    path: &Path,
    lon: &[f64],
    lat: &[f64],
    config: &RunConfig,
    result: &mut ValidationResult,
) {
    let span = |v: &[f64]| {
        v.iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
    };
    let (lon_lo, lon_hi) = span(lon);
    let (lat_lo, lat_hi) = span(lat);
    let g = &config.grid;
    if lon_lo > g.lon_min || lon_hi < g.lon_max || lat_lo > g.lat_min || lat_hi < g.lat_max {
        result.add_warning(format!(
            "{}: 数据范围未完全覆盖研究区，边缘将按最近值外推",
            path.display()
        ));
    }
}

fn print_validation_result(result: &ValidationResult, strict: bool) -> Result<()> {
    println!("\n=== 验证结果 ===");

    if !result.errors.is_empty() {
        println!("\n错误 ({}):", result.errors.len());
        for err in &result.errors {
            error!("  ✗ {}", err);
            println!("  ✗ {}", err);
        }
    }

    if !result.warnings.is_empty() {
        println!("\n警告 ({}):", result.warnings.len());
        for warning in &result.warnings {
            warn!("  ⚠ {}", warning);
            println!("  ⚠ {}", warning);
        }
    }

    let success = if strict {
        result.is_ok_strict()
    } else {
        result.is_ok()
    };

    if success {
        println!("\n✓ 验证通过");
        Ok(())
    } else {
        println!("\n✗ 验证失败");
        bail!(
            "验证失败：发现 {} 个错误，{} 个警告",
            result.errors.len(),
            result.warnings.len()
        )
    }
}
