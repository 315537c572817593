// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 采集、推理、显示循环
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

use std::{sync::mpsc::Receiver, time::Instant};

use anyhow::Context;
use tracing::{error, info, warn};

use crate::{
  frame::RgbNhwcFrame,
  input::FrameSource,
  label::LabelMap,
  model::Model,
  output::{Draw, QuitEvent, Render},
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 循环停止的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
  QuitKey,
  WindowClosed,
  Interrupted,
  FrameLimit,
}

impl From<QuitEvent> for StopReason {
  fn from(event: QuitEvent) -> Self {
    match event {
      QuitEvent::QuitKey => StopReason::QuitKey,
      QuitEvent::WindowClosed => StopReason::WindowClosed,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
  Running,
  Stopped(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
  pub reason: StopReason,
  pub frames: usize,
  pub detections: usize,
}

/// 逐帧处理摄像头画面，直到按下退出键、窗口关闭、收到中断或达到帧数限制
pub struct ContinuousTask {
  labels: LabelMap,
  draw: Draw,
  frame_number: Option<usize>,
  interrupt: Option<Receiver<()>>,
}

impl ContinuousTask {
  pub fn new(labels: LabelMap, draw: Draw) -> Self {
    Self {
      labels,
      draw,
      frame_number: None,
      interrupt: None,
    }
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_interrupt(mut self, interrupt: Receiver<()>) -> Self {
    self.interrupt = Some(interrupt);
    self
  }

  fn step<I, M, O>(
    &self,
    input: &mut I,
    model: &mut M,
    output: &mut O,
    summary: &mut TaskSummary,
  ) -> anyhow::Result<LoopState>
  where
    I: FrameSource,
    M: Model,
    M::Error: std::error::Error + Send + Sync + 'static,
    O: Render,
  {
    let mut frame = input.next_frame().map_err(|e| {
      error!("读取摄像头帧失败: {}", e);
      anyhow::Error::new(e).context("读取摄像头帧失败")
    })?;

    let shape = model.input_shape();
    let tensor = RgbNhwcFrame::resized_from(&frame, shape.width as u32, shape.height as u32);

    let now = Instant::now();
    let result = model.infer(&tensor).context("模型推理失败")?;
    let elapsed = now.elapsed();
    info!("elapsed [ms]: {:.1}", elapsed.as_secs_f64() * 1000.0);

    self
      .draw
      .annotate(&mut frame, &result, &self.labels)
      .context("绘制检测结果失败")?;
    output.render_frame(&frame).context("显示画面失败")?;

    summary.frames += 1;
    summary.detections += result.len();

    if let Some(event) = output.poll_quit() {
      info!("收到退出请求: {:?}", event);
      return Ok(LoopState::Stopped(event.into()));
    }
    if self.frame_number.is_some_and(|n| summary.frames >= n) {
      info!("达到指定帧数 {}, 退出任务循环", summary.frames);
      return Ok(LoopState::Stopped(StopReason::FrameLimit));
    }
    if self
      .interrupt
      .as_ref()
      .is_some_and(|rx| rx.try_recv().is_ok())
    {
      warn!("中断信号接收，退出任务循环");
      return Ok(LoopState::Stopped(StopReason::Interrupted));
    }

    Ok(LoopState::Running)
  }
}

impl<I, M, O> Task<I, M, O> for ContinuousTask
where
  I: FrameSource,
  M: Model,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render,
{
  type Output = TaskSummary;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut model: M, mut output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let (width, height) = input.dimensions();
    let shape = model.input_shape();
    info!(
      "画面 {}x{}, 模型输入 {}x{}",
      width, height, shape.width, shape.height
    );

    let mut summary = TaskSummary {
      reason: StopReason::FrameLimit,
      frames: 0,
      detections: 0,
    };

    let outcome = loop {
      match self.step(&mut input, &mut model, &mut output, &mut summary) {
        Ok(LoopState::Running) => continue,
        Ok(LoopState::Stopped(reason)) => break Ok(reason),
        Err(e) => break Err(e),
      }
    };

    // 无论正常退出还是出错都释放窗口和摄像头
    drop(output);
    drop(input);
    info!("已释放摄像头与预览窗口");

    let reason = outcome?;
    summary.reason = reason;
    info!(
      "任务完成，共 {} 帧，{} 个检测，退出原因: {:?}",
      summary.frames, summary.detections, reason
    );
    Ok(summary)
  }
}
