// crates/sg_io/src/error.rs
//! IO 错误类型定义
//!
//! 所有错误最终可转换为 SgError 以实现跨层错误传递。

use sg_foundation::SgError;
use thiserror::Error;

/// IO 错误枚举
#[derive(Error, Debug)]
pub enum IoError {
    /// 底层 IO 错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// 文件解析错误
    #[error("文件解析错误: {file} - {message}")]
    ParseError { file: String, message: String },

    /// 变量不存在
    #[error("变量不存在: {variable}")]
    UnknownVariable { variable: String },

    /// 时间序列列数不一致
    #[error("时间序列列数不一致: 期望 {expected} 层, 实际 {actual} 层")]
    LayerCountMismatch { expected: usize, actual: usize },

    /// 图像编码错误
    #[error("图像编码错误: {0}")]
    Image(#[from] image::ImageError),

    /// 基础层错误转换
    #[error("基础层错误: {0}")]
    Foundation(#[from] SgError),
}

impl IoError {
    /// 解析错误
    pub fn parse(file: impl Into<String>, message: impl ToString) -> Self {
        Self::ParseError {
            file: file.into(),
            message: message.to_string(),
        }
    }
}

impl From<IoError> for SgError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io(e) => SgError::from(e),
            IoError::ParseError { file, message } => {
                SgError::serialization(format!("文件解析错误 [{file}]: {message}"))
            }
            IoError::UnknownVariable { variable } => SgError::not_found(variable),
            IoError::LayerCountMismatch { expected, actual } => {
                SgError::size_mismatch("time series layers", expected, actual)
            }
            IoError::Image(e) => SgError::io(format!("图像编码错误: {e}")),
            IoError::Foundation(sg_err) => sg_err,
        }
    }
}
