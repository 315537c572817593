// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/filter.rs - 检测结果阈值过滤
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

use tracing::{debug, warn};

use crate::model::{DetectItem, DetectResult};

/// SSD 后处理模型的原始输出
#[derive(Debug, Clone, Copy)]
pub struct SsdOutputs<'a> {
  /// N x 4，[y_min, x_min, y_max, x_max]
  pub boxes: &'a [f32],
  pub classes: &'a [f32],
  pub scores: &'a [f32],
  /// 有效检测数量，超出部分的数据不可读
  pub count: usize,
}

impl SsdOutputs<'_> {
  fn valid_count(&self) -> usize {
    let available = self
      .scores
      .len()
      .min(self.classes.len())
      .min(self.boxes.len() / 4);
    if self.count > available {
      warn!(
        "检测数量 {} 超出输出张量容量 {}, 已截断",
        self.count, available
      );
    }
    self.count.min(available)
  }
}

/// 按引擎输出顺序保留得分不低于阈值的检测
pub fn filter_detections(outputs: &SsdOutputs, threshold: f32) -> DetectResult {
  let count = outputs.valid_count();

  let result: DetectResult = (0..count)
    .filter(|&i| outputs.scores[i] >= threshold)
    .map(|i| {
      let b = &outputs.boxes[i * 4..i * 4 + 4];
      DetectItem {
        class_id: outputs.classes[i] as u32,
        score: outputs.scores[i],
        bbox: [b[0], b[1], b[2], b[3]],
      }
    })
    .collect();

  debug!("检测数量 {}, 阈值过滤后 {}", count, result.len());
  result
}
