// crates/sg_io/src/lib.rs

//! SlopeGuard IO 模块
//!
//! 提供数据输入输出功能。
//!
//! # 模块
//!
//! - [`source`]: 时变强迫数据源（内存、JSON 帧文件、合成）
//! - [`grid_file`]: JSON 网格文件（高程、土深）
//! - [`timeseries`]: 只追加的时间序列表与 CSV 导出
//! - [`render`]: 逐步 PNG 帧渲染
//! - [`video`]: GIF 动画合成
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use sg_io::source::{ForcingSource, load_forcing_frames};
//!
//! let mut source = load_forcing_frames(Path::new("forcing.json"))?;
//! let tp = source.fetch("tp")?;
//! source.advance()?;
//! ```

pub mod error;
pub mod grid_file;
pub mod render;
pub mod source;
pub mod timeseries;
pub mod video;

// 重导出常用类型
pub use error::IoError;
pub use grid_file::{load_grid_file, save_grid_file, GridFile, GridFileProvider};
pub use render::{
    FrameKind, FrameRenderer, FrameSink, NullFrameSink, PngFrameSink, RenderConfig, StepFrame,
};
pub use source::{
    ForcingSource, MemoryForcingSource, SyntheticForcingSource, SyntheticTerrain, TimeMetadata,
};
pub use timeseries::{TimeSeriesRow, TimeSeriesTable};
pub use video::{assemble_gif, collect_frames};
