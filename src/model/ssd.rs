// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/ssd.rs - SSD 检测模型
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

use tracing::{debug, error};

use crate::{
  frame::RgbNhwcFrame,
  model::{DetectResult, Engine, InputShape, Model, ModelError, SsdOutputs, filter_detections},
};

// 输出顺序由 SSD 后处理算子固定
pub const SSD_BOXES_INDEX: usize = 0;
pub const SSD_CLASSES_INDEX: usize = 1;
pub const SSD_SCORES_INDEX: usize = 2;
pub const SSD_COUNT_INDEX: usize = 3;
pub const SSD_NUM_OUTPUTS: usize = 4;

pub const DEFAULT_THRESHOLD: f32 = 0.5;

pub struct SsdDetector<E> {
  engine: E,
  threshold: f32,
}

impl<E: Engine> SsdDetector<E> {
  pub fn new(engine: E, threshold: f32) -> Result<Self, ModelError> {
    let num_outputs = engine.num_outputs();
    if num_outputs < SSD_NUM_OUTPUTS {
      error!(
        "预期模型输出数量至少为 {}, 实际为 {}",
        SSD_NUM_OUTPUTS, num_outputs
      );
      return Err(ModelError::OutputMismatch {
        expected: SSD_NUM_OUTPUTS,
        actual: num_outputs,
      });
    }

    Ok(Self { engine, threshold })
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }
}

impl<E: Engine> Model for SsdDetector<E> {
  type Error = ModelError;

  fn input_shape(&self) -> InputShape {
    self.engine.input_shape()
  }

  fn infer(&mut self, input: &RgbNhwcFrame) -> Result<DetectResult, Self::Error> {
    let shape = self.engine.input_shape();
    if (input.width(), input.height()) != (shape.width, shape.height) {
      return Err(ModelError::InputSizeMismatch {
        expected: (shape.width, shape.height),
        actual: (input.width(), input.height()),
      });
    }

    debug!("设置模型输入");
    self.engine.set_input(input)?;

    debug!("执行模型推理");
    self.engine.invoke()?;

    debug!("获取模型输出");
    let boxes = self.engine.output_f32(SSD_BOXES_INDEX)?;
    let classes = self.engine.output_f32(SSD_CLASSES_INDEX)?;
    let scores = self.engine.output_f32(SSD_SCORES_INDEX)?;
    let count = self
      .engine
      .output_f32(SSD_COUNT_INDEX)?
      .first()
      .copied()
      .ok_or_else(|| ModelError::Tensor("检测数量输出为空".to_string()))?;

    // 负数与 NaN 转换后为 0
    let outputs = SsdOutputs {
      boxes: &boxes,
      classes: &classes,
      scores: &scores,
      count: count as usize,
    };

    Ok(filter_detections(&outputs, self.threshold))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct FakeEngine {
    outputs: Vec<Vec<f32>>,
    last_input: Option<Vec<u8>>,
    invoked: usize,
  }

  impl FakeEngine {
    fn new(outputs: Vec<Vec<f32>>) -> Self {
      Self {
        outputs,
        last_input: None,
        invoked: 0,
      }
    }
  }

  impl Engine for FakeEngine {
    fn input_shape(&self) -> InputShape {
      InputShape {
        height: 2,
        width: 2,
        channels: 3,
      }
    }

    fn num_outputs(&self) -> usize {
      self.outputs.len()
    }

    fn set_input(&mut self, frame: &RgbNhwcFrame) -> Result<(), ModelError> {
      self.last_input = Some(frame.as_nhwc().to_vec());
      Ok(())
    }

    fn invoke(&mut self) -> Result<(), ModelError> {
      self.invoked += 1;
      Ok(())
    }

    fn output_f32(&self, index: usize) -> Result<Vec<f32>, ModelError> {
      self
        .outputs
        .get(index)
        .cloned()
        .ok_or_else(|| ModelError::Tensor(format!("no output {index}")))
    }
  }

  fn ssd_outputs(scores: Vec<f32>, count: f32) -> Vec<Vec<f32>> {
    let n = scores.len();
    vec![
      (0..n).flat_map(|i| [0.1 * i as f32, 0.2, 0.5, 0.6]).collect(),
      (0..n).map(|i| i as f32).collect(),
      scores,
      vec![count],
    ]
  }

  #[test]
  fn reads_outputs_by_fixed_index() {
    let engine = FakeEngine::new(ssd_outputs(vec![0.9, 0.4, 0.6], 3.0));
    let mut detector = SsdDetector::new(engine, 0.5).unwrap();
    let frame = RgbNhwcFrame::with_shape(2, 2);

    let result = detector.infer(&frame).unwrap();
    let ids: Vec<u32> = result.iter().map(|item| item.class_id).collect();
    assert_eq!(ids, vec![0, 2]);
    assert_eq!(result.items[1].bbox, [0.2, 0.2, 0.5, 0.6]);
    assert_eq!(detector.engine().invoked, 1);
    assert_eq!(detector.engine().last_input.as_deref(), Some(&[0u8; 12][..]));
  }

  #[test]
  fn negative_count_is_empty() {
    let engine = FakeEngine::new(ssd_outputs(vec![0.9], -1.0));
    let mut detector = SsdDetector::new(engine, 0.5).unwrap();
    let result = detector.infer(&RgbNhwcFrame::with_shape(2, 2)).unwrap();
    assert!(result.is_empty());
  }

  #[test]
  fn rejects_models_with_too_few_outputs() {
    let engine = FakeEngine::new(vec![vec![], vec![]]);
    assert!(matches!(
      SsdDetector::new(engine, 0.5),
      Err(ModelError::OutputMismatch {
        expected: 4,
        actual: 2
      })
    ));
  }

  #[test]
  fn rejects_wrong_input_size() {
    let engine = FakeEngine::new(ssd_outputs(vec![0.9], 1.0));
    let mut detector = SsdDetector::new(engine, 0.5).unwrap();
    let err = detector.infer(&RgbNhwcFrame::with_shape(3, 2)).unwrap_err();
    assert!(matches!(err, ModelError::InputSizeMismatch { .. }));
    assert_eq!(detector.engine().invoked, 0);
  }
}
