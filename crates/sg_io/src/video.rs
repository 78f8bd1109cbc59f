// crates/sg_io/src/video.rs

//! 动画合成
//!
//! 将逐步 PNG 帧按时间步序号（而非文件名字典序）合成为循环 GIF。

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use sg_foundation::ensure;
use sg_foundation::error::{SgError, SgResult};

use crate::error::IoError;
use crate::render::parse_frame_index;

/// 扫描目录中的帧文件，按时间步序号排序
pub fn collect_frames(directory: &Path) -> SgResult<Vec<(usize, PathBuf)>> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        let index = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_frame_index);
        if let Some(index) = index {
            frames.push((index, path));
        }
    }
    frames.sort_by_key(|(index, _)| *index);
    Ok(frames)
}

/// 合成 GIF 动画
///
/// `frames` 按给定顺序写入，`delay_ms` 为每帧显示时间。
pub fn assemble_gif(frames: &[PathBuf], output: &Path, delay_ms: u32) -> SgResult<()> {
    ensure!(!frames.is_empty(), SgError::invalid_input("没有可合成的帧"));

    let file = File::create(output)?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder.set_repeat(Repeat::Infinite).map_err(IoError::from)?;

    let delay = Delay::from_numer_denom_ms(delay_ms, 1);
    for path in frames {
        let rgba = image::open(path).map_err(IoError::from)?.to_rgba8();
        encoder
            .encode_frame(Frame::from_parts(rgba, 0, 0, delay))
            .map_err(IoError::from)?;
    }

    log::info!("合成动画 {} ({} 帧)", output.display(), frames.len());
    Ok(())
}
