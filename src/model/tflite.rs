// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/tflite.rs - TensorFlow Lite 推理引擎
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

use std::path::{Path, PathBuf};

use tflitec::{
  interpreter::{Interpreter, Options},
  tensor::DataType,
};
use tracing::{debug, error, info};

use crate::{
  frame::RgbNhwcFrame,
  model::{Engine, InputShape, ModelError},
};

const TFLITE_NUM_INPUTS: usize = 1;
const TFLITE_INPUT_INDEX: usize = 0;

pub struct TfliteBuilder {
  model_path: PathBuf,
  threads: i32,
}

impl TfliteBuilder {
  pub fn new<P: AsRef<Path>>(model_path: P) -> Self {
    Self {
      model_path: model_path.as_ref().to_path_buf(),
      threads: 1,
    }
  }

  pub fn threads(mut self, threads: i32) -> Self {
    self.threads = threads;
    self
  }

  pub fn build(self) -> Result<TfliteEngine, ModelError> {
    info!("加载模型文件: {}", self.model_path.display());
    let metadata = std::fs::metadata(&self.model_path).map_err(|source| ModelError::Io {
      path: self.model_path.clone(),
      source,
    })?;
    debug!(
      "模型文件大小: {:.2} MB",
      metadata.len() as f64 / (1024.0 * 1024.0)
    );

    let path = self
      .model_path
      .to_str()
      .ok_or_else(|| ModelError::Load(format!("模型路径不是有效的 UTF-8: {:?}", self.model_path)))?;

    info!("创建 TFLite 解释器，线程数 {}", self.threads);
    let options = Options {
      thread_count: self.threads,
      ..Default::default()
    };
    let interpreter = Interpreter::with_model_path(path, Some(options))?;
    interpreter.allocate_tensors()?;

    let num_inputs = interpreter.input_tensor_count();
    let num_outputs = interpreter.output_tensor_count();
    debug!("模型输入数量: {}", num_inputs);
    debug!("模型输出数量: {}", num_outputs);

    if num_inputs != TFLITE_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        TFLITE_NUM_INPUTS, num_inputs
      );
      return Err(ModelError::Load(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        TFLITE_NUM_INPUTS, num_inputs
      )));
    }

    let (input_shape, input_type) = {
      let input = interpreter.input(TFLITE_INPUT_INDEX)?;
      let dims = input.shape().dimensions().clone();
      debug!("模型输入形状: {:?}, 类型: {:?}", dims, input.data_type());
      (InputShape::from_dims(&dims)?, input.data_type())
    };

    let input_kind = match input_type {
      DataType::Uint8 => InputKind::Quantized,
      DataType::Float32 => InputKind::Float,
      other => return Err(ModelError::UnsupportedInputType(format!("{:?}", other))),
    };

    info!(
      "模型加载完成，输入 {}x{}，{}",
      input_shape.width,
      input_shape.height,
      match input_kind {
        InputKind::Quantized => "量化模型",
        InputKind::Float => "浮点模型",
      }
    );

    Ok(TfliteEngine {
      interpreter,
      input_shape,
      input_kind,
      num_outputs,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
  Quantized,
  Float,
}

pub struct TfliteEngine {
  interpreter: Interpreter,
  input_shape: InputShape,
  input_kind: InputKind,
  num_outputs: usize,
}

impl Engine for TfliteEngine {
  fn input_shape(&self) -> InputShape {
    self.input_shape
  }

  fn num_outputs(&self) -> usize {
    self.num_outputs
  }

  fn set_input(&mut self, frame: &RgbNhwcFrame) -> Result<(), ModelError> {
    match self.input_kind {
      InputKind::Quantized => self
        .interpreter
        .copy(frame.as_nhwc(), TFLITE_INPUT_INDEX)?,
      InputKind::Float => {
        let data: Vec<f32> = frame
          .as_nhwc()
          .iter()
          .map(|&v| (v as f32 - 127.5) / 127.5)
          .collect();
        self.interpreter.copy(&data[..], TFLITE_INPUT_INDEX)?
      }
    }
    Ok(())
  }

  fn invoke(&mut self) -> Result<(), ModelError> {
    self.interpreter.invoke()?;
    Ok(())
  }

  fn output_f32(&self, index: usize) -> Result<Vec<f32>, ModelError> {
    let tensor = self.interpreter.output(index)?;
    if tensor.data_type() != DataType::Float32 {
      return Err(ModelError::Tensor(format!(
        "第 {} 个输出类型为 {:?}, 期望 Float32",
        index,
        tensor.data_type()
      )));
    }
    Ok(tensor.data::<f32>().to_vec())
  }
}
