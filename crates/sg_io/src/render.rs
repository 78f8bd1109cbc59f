// crates/sg_io/src/render.rs

//! 逐时间步帧渲染
//!
//! 每帧由四块组成：
//!
//! ```text
//! +----------------+----------------+
//! |  易发性图       |  地下流水深图   |
//! +----------------+----------------+
//! |  平均降水曲线   |  各层含水量曲线  |
//! +----------------+----------------+
//! ```
//!
//! 第一个时间步绘制绝对值（顺序色带），之后绘制相对参考快照的差值
//! （发散色带，零值居中）。缺测单元为灰色。图像第一行对应最北的纬度。

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use sg_foundation::error::SgResult;
use sg_terrain::{AxisOrder, Field2, RectilinearGrid};

use crate::error::IoError;
use crate::timeseries::TimeSeriesTable;
use crate::video::collect_frames;

const MISSING_COLOR: Rgb<u8> = Rgb([190, 190, 190]);
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS_COLOR: Rgb<u8> = Rgb([90, 90, 90]);

/// 各层曲线颜色
const LAYER_COLORS: [Rgb<u8>; 4] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([148, 103, 189]),
];

/// 帧类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// 绝对值（参考时间步）
    Absolute,
    /// 相对参考快照的差值
    Difference,
}

/// 一帧的输入数据
#[derive(Debug, Clone, Copy)]
pub struct StepFrame<'a> {
    /// 时间步序号
    pub step: usize,
    /// 时间
    pub timestamp: DateTime<Utc>,
    /// 帧类型
    pub kind: FrameKind,
    /// 目标网格
    pub grid: &'a RectilinearGrid,
    /// 易发性（或其差值）
    pub susceptibility: &'a Field2,
    /// 地下流水深（或其差值）
    pub flow_depth: &'a Field2,
    /// 截至当前的时间序列
    pub series: &'a TimeSeriesTable,
}

/// 帧输出 trait
pub trait FrameSink {
    /// 输出一帧
    fn write_frame(&mut self, frame: &StepFrame<'_>) -> SgResult<()>;

    /// 全部帧输出完毕
    fn finish(&mut self) -> SgResult<()> {
        Ok(())
    }
}

/// 丢弃所有帧
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFrameSink;

impl FrameSink for NullFrameSink {
    fn write_frame(&mut self, _frame: &StepFrame<'_>) -> SgResult<()> {
        Ok(())
    }
}

/// 色带
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRamp {
    /// 顺序色带（深紫 → 黄）
    Sequential,
    /// 发散色带（蓝 → 白 → 红）
    Diverging,
}

impl ColorRamp {
    fn stops(&self) -> &'static [[u8; 3]] {
        match self {
            Self::Sequential => &[
                [68, 1, 84],
                [59, 82, 139],
                [33, 145, 140],
                [94, 201, 98],
                [253, 231, 37],
            ],
            Self::Diverging => &[[33, 102, 172], [247, 247, 247], [178, 24, 43]],
        }
    }

    /// 归一化值 `t ∈ [0, 1]` 对应的颜色，超出范围时截断
    pub fn color(&self, t: f64) -> Rgb<u8> {
        if t.is_nan() {
            return MISSING_COLOR;
        }
        let stops = self.stops();
        let pos = t.clamp(0.0, 1.0) * (stops.len() - 1) as f64;
        let k = (pos.floor() as usize).min(stops.len() - 2);
        let frac = pos - k as f64;
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        Rgb([
            lerp(stops[k][0], stops[k + 1][0]),
            lerp(stops[k][1], stops[k + 1][1]),
            lerp(stops[k][2], stops[k + 1][2]),
        ])
    }

    /// 场的显示范围
    ///
    /// 发散色带取关于零对称的范围。无有效值或范围退化时返回单位宽度范围。
    pub fn value_range(&self, field: &Field2) -> (f64, f64) {
        let stats = field.statistics();
        if !stats.has_valid() {
            return (0.0, 1.0);
        }
        match self {
            Self::Sequential => {
                if stats.max > stats.min && (stats.max - stats.min).is_finite() {
                    (stats.min, stats.max)
                } else {
                    (stats.min - 0.5, stats.min + 0.5)
                }
            }
            Self::Diverging => {
                let m = stats.min.abs().max(stats.max.abs());
                if m > 0.0 && m.is_finite() {
                    (-m, m)
                } else {
                    (-1.0, 1.0)
                }
            }
        }
    }
}

/// 渲染参数
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// 每个网格单元的像素边长
    pub cell_size: u32,
    /// 曲线图高度 [px]
    pub chart_height: u32,
    /// 面板间距 [px]
    pub margin: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cell_size: 4,
            chart_height: 120,
            margin: 6,
        }
    }
}

/// 帧渲染器
#[derive(Debug, Clone, Default)]
pub struct FrameRenderer {
    config: RenderConfig,
}

impl FrameRenderer {
    /// 创建渲染器
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// 帧尺寸 (宽, 高)
    pub fn frame_size(&self, grid: &RectilinearGrid) -> (u32, u32) {
        let (map_w, map_h) = self.map_size(grid);
        let m = self.config.margin;
        (2 * map_w + 3 * m, map_h + self.config.chart_height + 3 * m)
    }

    fn map_size(&self, grid: &RectilinearGrid) -> (u32, u32) {
        let cell = self.config.cell_size.max(1);
        (grid.n_lon() as u32 * cell, grid.n_lat() as u32 * cell)
    }

    /// 渲染一帧
    pub fn render(&self, frame: &StepFrame<'_>) -> RgbImage {
        let (width, height) = self.frame_size(frame.grid);
        let (map_w, map_h) = self.map_size(frame.grid);
        let m = self.config.margin;
        let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

        let ramp = match frame.kind {
            FrameKind::Absolute => ColorRamp::Sequential,
            FrameKind::Difference => ColorRamp::Diverging,
        };
        self.draw_map(&mut img, (m, m), frame.grid, frame.susceptibility, ramp);
        self.draw_map(&mut img, (2 * m + map_w, m), frame.grid, frame.flow_depth, ramp);

        let chart_y = 2 * m + map_h;
        let chart = |x| Panel {
            x,
            y: chart_y,
            w: map_w,
            h: self.config.chart_height,
        };
        draw_chart(&mut img, chart(m), &[(frame.series.precipitation_series(), LAYER_COLORS[0])]);
        let layers: Vec<_> = (0..frame.series.n_layers())
            .map(|l| (frame.series.soil_water_series(l), LAYER_COLORS[l % LAYER_COLORS.len()]))
            .collect();
        draw_chart(&mut img, chart(2 * m + map_w), &layers);

        img
    }

    fn draw_map(
        &self,
        img: &mut RgbImage,
        origin: (u32, u32),
        grid: &RectilinearGrid,
        field: &Field2,
        ramp: ColorRamp,
    ) {
        let (lo, hi) = ramp.value_range(field);
        let cell = self.config.cell_size.max(1);
        let (n_lat, n_lon) = field.shape();

        for row in 0..n_lat {
            // 图像自北向南
            let i_lat = match grid.lat_order() {
                AxisOrder::Ascending => n_lat - 1 - row,
                AxisOrder::Descending => row,
            };
            for j in 0..n_lon {
                let v = field.get(i_lat, j).unwrap_or(f64::NAN);
                let color = ramp.color((v - lo) / (hi - lo));
                for dy in 0..cell {
                    for dx in 0..cell {
                        put(img, origin.0 + j as u32 * cell + dx, origin.1 + row as u32 * cell + dy, color);
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Panel {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// 绘制折线图，所有序列共用纵轴范围
fn draw_chart(img: &mut RgbImage, panel: Panel, series: &[(Vec<f64>, Rgb<u8>)]) {
    if panel.w < 2 || panel.h < 2 {
        return;
    }
    let bottom = panel.y + panel.h - 1;
    for x in panel.x..panel.x + panel.w {
        put(img, x, bottom, AXIS_COLOR);
    }
    for y in panel.y..=bottom {
        put(img, panel.x, y, AXIS_COLOR);
    }

    let values = series.iter().flat_map(|(s, _)| s.iter().copied()).filter(|v| v.is_finite());
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return;
    }
    let span = if hi > lo { hi - lo } else { 1.0 };
    let n = series.iter().map(|(s, _)| s.len()).max().unwrap_or(0);

    let to_px = |k: usize, v: f64| -> (f64, f64) {
        let fx = if n > 1 { k as f64 / (n - 1) as f64 } else { 0.0 };
        let fy = (v - lo) / span;
        (
            panel.x as f64 + 1.0 + fx * (panel.w - 2) as f64,
            bottom as f64 - 1.0 - fy * (panel.h - 2) as f64,
        )
    };

    for (s, color) in series {
        let mut prev: Option<(f64, f64)> = None;
        for (k, &v) in s.iter().enumerate() {
            if !v.is_finite() {
                prev = None;
                continue;
            }
            let p = to_px(k, v);
            match prev {
                Some(q) => draw_line(img, q, p, *color),
                None => put(img, p.0.round() as u32, p.1.round() as u32, *color),
            }
            prev = Some(p);
        }
    }
}

fn draw_line(img: &mut RgbImage, a: (f64, f64), b: (f64, f64), color: Rgb<u8>) {
    let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = a.0 + (b.0 - a.0) * t;
        let y = a.1 + (b.1 - a.1) * t;
        put(img, x.round() as u32, y.round() as u32, color);
    }
}

#[inline]
fn put(img: &mut RgbImage, x: u32, y: u32, color: Rgb<u8>) {
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, color);
    }
}

/// 帧文件名，按零填充的时间步序号
pub fn frame_file_name(step: usize) -> String {
    format!("frame_{step:05}.png")
}

/// 由帧文件名解析时间步序号
pub fn parse_frame_index(name: &str) -> Option<usize> {
    name.strip_prefix("frame_")?.strip_suffix(".png")?.parse().ok()
}

/// 写出 PNG 图像
pub fn write_png(img: &RgbImage, path: &Path) -> SgResult<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    PngEncoder::new(writer)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .map_err(IoError::from)?;
    Ok(())
}

/// 逐帧写出 PNG 文件
#[derive(Debug)]
pub struct PngFrameSink {
    directory: PathBuf,
    renderer: FrameRenderer,
    written: Vec<(usize, PathBuf)>,
}

impl PngFrameSink {
    /// 创建输出目录，清除目录中已有的帧文件
    pub fn new(directory: impl Into<PathBuf>, renderer: FrameRenderer) -> SgResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        let stale = collect_frames(&directory)?;
        for (_, path) in &stale {
            fs::remove_file(path)?;
        }
        if !stale.is_empty() {
            log::info!("清除 {} 个旧帧: {}", stale.len(), directory.display());
        }
        Ok(Self {
            directory,
            renderer,
            written: Vec::new(),
        })
    }

    /// 已写出的帧 (时间步, 路径)，按时间步排序
    pub fn frames(&self) -> Vec<(usize, PathBuf)> {
        let mut frames = self.written.clone();
        frames.sort_by_key(|(step, _)| *step);
        frames
    }

    /// 已写出的帧路径，按时间步排序
    pub fn frame_paths(&self) -> Vec<PathBuf> {
        self.frames().into_iter().map(|(_, path)| path).collect()
    }
}

impl FrameSink for PngFrameSink {
    fn write_frame(&mut self, frame: &StepFrame<'_>) -> SgResult<()> {
        let img = self.renderer.render(frame);
        let path = self.directory.join(frame_file_name(frame.step));
        write_png(&img, &path)?;
        log::debug!("写出帧 {}", path.display());
        self.written.push((frame.step, path));
        Ok(())
    }
}
