// apps/sg_cli/src/commands/run.rs

//! 运行命令
//!
//! 读取配置，准备静态数据与强迫数据源，逐时间步计算易发性，
//! 最后写出时间序列 CSV 并合成动画。
//!
//! 未指定数据文件时使用确定性合成数据：地形网格 0.05°，强迫网格 0.1°
//! （与再分析数据分辨率相当），均覆盖配置的研究区。

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::Args;
use sg_config::RunConfig;
use sg_io::render::{FrameRenderer, FrameSink, NullFrameSink, PngFrameSink};
use sg_io::source::{
    load_forcing_frames, ForcingSource, StormParams, SyntheticForcingSource, SyntheticTerrain,
};
use sg_io::video::assemble_gif;
use sg_io::GridFileProvider;
use sg_terrain::{ElevationProvider, RectilinearGrid, SoilDepthProvider};
use sg_workflow::{CancelToken, Driver, DriverError, DriverSettings};
use tracing::{info, warn};

const SYNTHETIC_TERRAIN_SPACING: f64 = 0.05;
const SYNTHETIC_FORCING_SPACING: f64 = 0.1;

/// 运行参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 输出目录（覆盖配置）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 时间步数（覆盖配置）
    #[arg(short = 'n', long)]
    pub steps: Option<usize>,

    /// 高程网格文件 (JSON)
    #[arg(long)]
    pub elevation: Option<PathBuf>,

    /// 土深网格文件 (JSON)
    #[arg(long)]
    pub soil_depth: Option<PathBuf>,

    /// 强迫帧文件 (JSON)
    #[arg(long)]
    pub forcing: Option<PathBuf>,

    /// 不输出逐步帧与动画
    #[arg(long)]
    pub no_frames: bool,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== SlopeGuard 运行启动 ===");

    let mut config = match &args.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("无法加载配置文件: {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(steps) = args.steps {
        config.run.steps = steps;
    }
    if let Some(output) = &args.output {
        config.output.directory = output.clone();
    }
    if args.no_frames {
        config.output.frames = false;
        config.output.animation = false;
    }

    let settings = DriverSettings::from_config(&config).context("配置无效")?;
    info!(
        "目标网格: {}x{} ({}°), 时间步数: {}, 土层方案: {}",
        settings.target_grid.n_lat(),
        settings.target_grid.n_lon(),
        config.grid.resolution_deg,
        settings.n_steps,
        settings.profile.policy().name()
    );

    let output_dir = config.output.directory.clone();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("无法创建输出目录: {}", output_dir.display()))?;

    // 静态数据
    let g = &config.grid;
    let terrain_grid = RectilinearGrid::uniform(
        g.lon_min,
        g.lon_max,
        g.lat_min,
        g.lat_max,
        SYNTHETIC_TERRAIN_SPACING,
    )?;
    let synthetic = SyntheticTerrain::new(terrain_grid);
    let elevation: Box<dyn ElevationProvider> = match &args.elevation {
        Some(path) => Box::new(GridFileProvider::new(path)),
        None => Box::new(synthetic.clone()),
    };
    let soil_depth: Box<dyn SoilDepthProvider> = match &args.soil_depth {
        Some(path) => Box::new(GridFileProvider::new(path)),
        None => Box::new(synthetic),
    };

    // 强迫数据源
    let mut forcing: Box<dyn ForcingSource> = match &args.forcing {
        Some(path) => Box::new(
            load_forcing_frames(path)
                .with_context(|| format!("无法读取强迫帧文件: {}", path.display()))?,
        ),
        None => {
            let grid = RectilinearGrid::uniform(
                g.lon_min,
                g.lon_max,
                g.lat_min,
                g.lat_max,
                SYNTHETIC_FORCING_SPACING,
            )?;
            let start = Utc
                .with_ymd_and_hms(2017, 9, 20, 0, 0, 0)
                .single()
                .context("无效的起始时间")?;
            info!("使用合成强迫数据 ({} 步)", settings.n_steps);
            Box::new(SyntheticForcingSource::new(
                grid,
                start,
                settings.n_steps,
                StormParams::default(),
            ))
        }
    };
    let meta = forcing.metadata();
    info!(
        "强迫数据: {} 步, 步长 {} s, 起始 {}",
        meta.n_steps,
        meta.step.num_seconds(),
        meta.start
    );
    if meta.n_steps < settings.n_steps {
        warn!("强迫数据只有 {} 步, 少于请求的 {} 步", meta.n_steps, settings.n_steps);
    }

    let mut driver = Driver::new(settings);
    driver
        .initialize(elevation.as_ref(), soil_depth.as_ref())
        .context("初始化失败")?;

    let mut png_sink = if config.output.frames {
        Some(PngFrameSink::new(output_dir.join("frames"), FrameRenderer::default())?)
    } else {
        None
    };
    let mut null_sink = NullFrameSink;
    let sink: &mut dyn FrameSink = match png_sink.as_mut() {
        Some(sink) => sink,
        None => &mut null_sink,
    };

    let start = Instant::now();
    let cancel = CancelToken::new();
    let result = driver.run(forcing.as_mut(), sink, &cancel);
    let elapsed = start.elapsed();

    // 运行失败时也保留已完成的时间序列
    if config.output.csv {
        let csv_path = output_dir.join("time_series.csv");
        driver.series().write_csv(&csv_path)?;
        info!("时间序列: {}", csv_path.display());
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e @ DriverError::SourceExhausted { .. }) => {
            return Err(e).context("强迫数据不足以完成全部时间步");
        }
        Err(e) => return Err(e).context("运行失败"),
    };

    // 只使用本次运行写出的帧
    if let Some(png_sink) = png_sink.as_ref().filter(|_| config.output.animation) {
        let gif_path = output_dir.join("animation.gif");
        let frames = png_sink.frame_paths();
        assemble_gif(&frames, &gif_path, config.output.frame_delay_ms)
            .context("动画合成失败")?;
        info!("动画: {} ({} 帧)", gif_path.display(), frames.len());
    }

    print_summary(&driver, summary.steps_completed, elapsed.as_secs_f64(), &output_dir);
    Ok(())
}

fn print_summary(driver: &Driver, steps: usize, seconds: f64, output_dir: &Path) {
    println!("\n=== 运行完成 ===");
    println!("时间步数: {}", steps);
    println!("耗时: {:.2} s", seconds);
    if let Some(latest) = driver.latest() {
        let sus = latest.stability.susceptibility.statistics();
        println!("最终时间: {}", latest.timestamp);
        println!(
            "易发性: 均值 {:.4}, 最大 {:.4}, 有效单元 {}/{}",
            sus.mean, sus.max, sus.valid_count, sus.n_cells
        );
        println!("失稳单元 (FS < 1): {}", latest.stability.n_unstable());
    }
    if let Some(reference) = driver.reference() {
        println!("参考时间: {}", reference.timestamp);
    }
    println!("输出目录: {}", output_dir.display());
}
