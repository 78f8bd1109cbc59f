// apps/sg_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 显示系统信息、默认配置及其派生量。

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use sg_config::RunConfig;
use sg_physics::{SafetyFactorCalculator, StabilityParams};
use sg_workflow::DriverSettings;
use tracing::info;

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 显示系统信息
    #[arg(long)]
    pub system: bool,

    /// 以 JSON 输出配置
    #[arg(long)]
    pub json: bool,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("=== SlopeGuard 信息 ===");

    if args.system {
        print_system_info();
        println!();
    }

    let config = match &args.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("无法加载配置文件: {}", path.display()))?,
        None => RunConfig::default(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    print_config(&config, args.config.is_none())
}

fn print_system_info() {
    println!("=== 系统信息 ===");
    println!("SlopeGuard CLI 版本: {}", env!("CARGO_PKG_VERSION"));
    println!("目标平台: {}", std::env::consts::ARCH);
    println!("操作系统: {}", std::env::consts::OS);
}

fn print_config(config: &RunConfig, is_default: bool) -> Result<()> {
    println!("=== {} ===", if is_default { "默认配置" } else { "运行配置" });

    let settings = DriverSettings::from_config(config).context("配置无效")?;
    let g = &config.grid;
    println!("研究区: 经度 [{}, {}], 纬度 [{}, {}]", g.lon_min, g.lon_max, g.lat_min, g.lat_max);
    println!(
        "目标网格: {} 行 x {} 列, 分辨率 {}°",
        settings.target_grid.n_lat(),
        settings.target_grid.n_lon(),
        g.resolution_deg
    );
    println!("重网格方法: {}", settings.regrid.method.name());
    println!("时间步数: {}", settings.n_steps);

    let s = &config.stability;
    let params = settings.calculator.params();
    println!("\n稳定性参数:");
    println!("  根系黏聚力: {} Pa", s.root_cohesion);
    println!("  土体黏聚力: {} Pa", s.soil_cohesion);
    println!("  土体容重: {} kg/m³", s.soil_bulk_density);
    println!("  水密度: {} kg/m³", s.water_density);
    println!("  重力加速度: {} m/s²", s.gravity);
    println!("  内摩擦角: {}° (tan = {:.4})", s.friction_angle_deg, params.tan_phi());
    println!("  开阔水体阈值: {} m", settings.calculator.open_water_depth());

    let profile = &settings.profile;
    println!("\n土壤剖面 ({} 层, {}):", profile.n_layers(), profile.policy().name());
    for (i, pair) in profile.boundaries().windows(2).enumerate() {
        println!("  第 {} 层: {:.2} ~ {:.2} m", i + 1, pair[0], pair[1]);
    }
    println!("  剖面总深: {} m", profile.total_depth());
    println!("  有效孔隙度: {}", profile.porosity());

    if *params != StabilityParams::default()
        || settings.calculator.open_water_depth() != SafetyFactorCalculator::DEFAULT_OPEN_WATER_DEPTH
    {
        println!("\n注意: 稳定性参数与内置默认值不同");
    }

    let o = &config.output;
    println!("\n输出:");
    println!("  目录: {}", o.directory.display());
    println!("  逐步帧: {}, 动画: {}, CSV: {}", o.frames, o.animation, o.csv);
    println!("  帧间隔: {} ms", o.frame_delay_ms);

    Ok(())
}
