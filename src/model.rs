// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::PathBuf;

use thiserror::Error;

use crate::frame::{RGB_CHANNELS, RgbNhwcFrame};

mod filter;
mod ssd;
#[cfg(feature = "tflite")]
mod tflite;

pub use self::filter::{SsdOutputs, filter_detections};
pub use self::ssd::{
  DEFAULT_THRESHOLD, SSD_BOXES_INDEX, SSD_CLASSES_INDEX, SSD_COUNT_INDEX, SSD_NUM_OUTPUTS,
  SSD_SCORES_INDEX, SsdDetector,
};
#[cfg(feature = "tflite")]
pub use self::tflite::{TfliteBuilder, TfliteEngine};

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型文件读取错误 {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("模型加载错误: {0}")]
  Load(String),
  #[error("模型输入形状不可用: {0:?}")]
  ShapeMismatch(Vec<usize>),
  #[error("模型输出数量不足: 期望至少 {expected}, 实际为 {actual}")]
  OutputMismatch { expected: usize, actual: usize },
  #[error("不支持的模型输入类型: {0}")]
  UnsupportedInputType(String),
  #[error("输入帧尺寸 {actual:?} 与模型输入 {expected:?} 不一致")]
  InputSizeMismatch {
    expected: (usize, usize),
    actual: (usize, usize),
  },
  #[error("张量错误: {0}")]
  Tensor(String),
  #[cfg(feature = "tflite")]
  #[error("TFLite 错误: {0}")]
  Tflite(#[from] tflitec::Error),
}

/// 模型输入形状（NHWC 中的 H、W、C）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
  pub height: usize,
  pub width: usize,
  pub channels: usize,
}

impl InputShape {
  /// 从 `[1, H, W, C]` 维度构造，只接受单批次的 RGB 输入
  pub fn from_dims(dims: &[usize]) -> Result<Self, ModelError> {
    match *dims {
      [1, height, width, channels] if height > 0 && width > 0 && channels == RGB_CHANNELS => {
        Ok(Self {
          height,
          width,
          channels,
        })
      }
      _ => Err(ModelError::ShapeMismatch(dims.to_vec())),
    }
  }
}

/// 推理引擎：设置输入、执行推理、按序号读取输出
pub trait Engine {
  fn input_shape(&self) -> InputShape;
  fn num_outputs(&self) -> usize;
  fn set_input(&mut self, frame: &RgbNhwcFrame) -> Result<(), ModelError>;
  fn invoke(&mut self) -> Result<(), ModelError>;
  fn output_f32(&self, index: usize) -> Result<Vec<f32>, ModelError>;
}

pub trait Model {
  type Error;

  fn input_shape(&self) -> InputShape;
  fn infer(&mut self, input: &RgbNhwcFrame) -> Result<DetectResult, Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [y_min, x_min, y_max, x_max]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectItem> {
    self.items.iter()
  }
}

impl FromIterator<DetectItem> for DetectResult {
  fn from_iter<I: IntoIterator<Item = DetectItem>>(iter: I) -> Self {
    Self {
      items: iter.into_iter().collect(),
    }
  }
}
