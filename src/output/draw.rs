// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  label::{LabelLookupMiss, LabelMap},
  model::{DetectItem, DetectResult},
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 24.0;
const LABEL_OFFSET_X: i32 = 5;
const LABEL_BASELINE_OFFSET_Y: i32 = 30; // 基线相对框左上角的偏移
const LABEL_THICKNESS: i32 = 2;
const BOX_THICKNESS: i32 = 3;
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色

// DejaVu Sans，许可见 assets/FONT-LICENSE
const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/font.ttf");

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("标签查找失败: {0}")]
  LabelLookupMiss(#[from] LabelLookupMiss),
}

#[derive(Error, Debug)]
pub enum FontError {
  #[error("无法读取字体文件 {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("无效的字体文件: {0}")]
  Invalid(PathBuf),
  #[error("无法加载嵌入的字体")]
  Embedded,
}

/// 类别编号不在标签表中时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMissPolicy {
  /// 使用 `#<id>` 作为标签
  #[default]
  Placeholder,
  /// 返回错误
  Error,
}

/// 像素坐标的检测框
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
  pub xmin: i32,
  pub ymin: i32,
  pub xmax: i32,
  pub ymax: i32,
}

/// 将归一化的 [y_min, x_min, y_max, x_max] 按帧尺寸转换为像素坐标（截断取整）
pub fn pixel_box(bbox: &[f32; 4], width: u32, height: u32) -> PixelBox {
  let [ymin, xmin, ymax, xmax] = *bbox;
  let (w, h) = (width as f32, height as f32);
  PixelBox {
    xmin: (xmin * w) as i32,
    ymin: (ymin * h) as i32,
    xmax: (xmax * w) as i32,
    ymax: (ymax * h) as i32,
  }
}

pub fn load_font<P: AsRef<Path>>(path: P) -> Result<FontArc, FontError> {
  let path = path.as_ref();
  let data = std::fs::read(path).map_err(|source| FontError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let font = FontArc::try_from_vec(data).map_err(|_| FontError::Invalid(path.to_path_buf()))?;
  info!("使用字体: {}", path.display());
  Ok(font)
}

/// 随程序一起编译的默认字体
pub fn embedded_font() -> Result<FontArc, FontError> {
  FontArc::try_from_slice(EMBEDDED_FONT).map_err(|_| FontError::Embedded)
}

pub struct Draw {
  font: FontArc,
  font_size: f32,
  color: [u8; 3],
  box_thickness: i32,
  miss_policy: LabelMissPolicy,
}

impl Draw {
  pub fn new(font: FontArc) -> Self {
    Self {
      font,
      font_size: LABEL_FONT_SIZE,
      color: BOX_COLOR,
      box_thickness: BOX_THICKNESS,
      miss_policy: LabelMissPolicy::default(),
    }
  }

  pub fn with_embedded_font() -> Result<Self, FontError> {
    Ok(Self::new(embedded_font()?))
  }

  pub fn with_miss_policy(mut self, miss_policy: LabelMissPolicy) -> Self {
    self.miss_policy = miss_policy;
    self
  }

  pub fn label_text(&self, labels: &LabelMap, item: &DetectItem) -> Result<String, DrawError> {
    let name = match labels.get(item.class_id) {
      Ok(name) => name.to_string(),
      Err(miss) => match self.miss_policy {
        LabelMissPolicy::Placeholder => {
          warn!("{}, 使用占位标签", miss);
          format!("#{}", item.class_id)
        }
        LabelMissPolicy::Error => return Err(miss.into()),
      },
    };
    Ok(format!("{} {:.2}", name, item.score))
  }

  /// 在帧上原地绘制检测框与标签，并返回该帧
  pub fn annotate<'i>(
    &self,
    image: &'i mut RgbImage,
    result: &DetectResult,
    labels: &LabelMap,
  ) -> Result<&'i mut RgbImage, DrawError> {
    // 先生成全部标签，查找失败时帧保持不变
    let texts = result
      .iter()
      .map(|item| self.label_text(labels, item))
      .collect::<Result<Vec<_>, _>>()?;

    let (width, height) = image.dimensions();
    for (item, text) in result.iter().zip(texts) {
      let pb = pixel_box(&item.bbox, width, height);
      debug!("绘制 {} at {:?}", text, pb);
      self.draw_box(image, pb);
      self.draw_label(image, pb, &text);
    }

    Ok(image)
  }

  fn draw_box(&self, image: &mut RgbImage, pb: PixelBox) {
    let t = self.box_thickness;
    // 限制在帧外 t 像素以内，帧外的边仍然不可见
    let (w_max, h_max) = (image.width() as i32 - 1 + t, image.height() as i32 - 1 + t);
    let (xmin, xmax) = (pb.xmin.clamp(-t, w_max), pb.xmax.clamp(-t, w_max));
    let (ymin, ymax) = (pb.ymin.clamp(-t, h_max), pb.ymax.clamp(-t, h_max));
    let (x0, x1) = (xmin.min(xmax), xmin.max(xmax));
    let (y0, y1) = (ymin.min(ymax), ymin.max(ymax));

    for i in 0..t {
      let w = x1 - x0 + 1 - 2 * i;
      let h = y1 - y0 + 1 - 2 * i;
      if w <= 0 || h <= 0 {
        break;
      }
      let rect = Rect::at(x0 + i, y0 + i).of_size(w as u32, h as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.color));
    }
  }

  fn draw_label(&self, image: &mut RgbImage, pb: PixelBox, text: &str) {
    let scale = PxScale::from(self.font_size);
    let x = pb.xmin.saturating_add(LABEL_OFFSET_X);
    let y = pb
      .ymin
      .saturating_add(LABEL_BASELINE_OFFSET_Y - self.font_size as i32);

    // 完全落在帧外的标签不绘制
    let (text_w, text_h) = text_size(scale, &self.font, text);
    let (width, height) = image.dimensions();
    if x >= width as i32
      || y >= height as i32
      || x.saturating_add(text_w as i32 + LABEL_THICKNESS) <= 0
      || y.saturating_add(text_h as i32) <= 0
    {
      return;
    }

    // 横向错开一个像素重复绘制以加粗
    for dx in 0..LABEL_THICKNESS {
      draw_text_mut(image, Rgb(self.color), x + dx, y, scale, &self.font, text);
    }
  }
}
